use std::collections::HashSet;

/// Strip all markup from citizen/admin supplied text, keeping the readable content.
/// `<script>`/`<style>` bodies are dropped entirely.
pub fn strip_markup(input: &str) -> String {
    let cleaned = ammonia::Builder::default()
        .tags(HashSet::new())
        .clean(input)
        .to_string();
    decode_basic_entities(&cleaned).trim().to_string()
}

/// Trimmed, stripped text; blank input becomes `None`.
pub fn optional_text(input: Option<&str>) -> Option<String> {
    input.map(strip_markup).filter(|s| !s.is_empty())
}

fn decode_basic_entities(input: &str) -> String {
    input
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_but_keeps_text() {
        assert_eq!(strip_markup("<b>Big</b> pothole"), "Big pothole");
    }

    #[test]
    fn drops_script_bodies() {
        assert_eq!(strip_markup("Leak<script>alert(1)</script>"), "Leak");
    }

    #[test]
    fn keeps_ampersands_readable() {
        assert_eq!(strip_markup("Main & 5th"), "Main & 5th");
    }

    #[test]
    fn blank_optional_text_is_none() {
        assert_eq!(optional_text(Some("   ")), None);
        assert_eq!(optional_text(None), None);
        assert_eq!(optional_text(Some(" crew ")), Some("crew".to_string()));
    }
}
