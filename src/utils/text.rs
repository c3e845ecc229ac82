//! Text normalization and token-set similarity primitives.

use std::collections::HashSet;

/// Lowercase, replace every non-alphanumeric character with a space and collapse whitespace.
pub fn normalize(input: &str) -> String {
    let mapped: String = input
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn tokens(normalized: &str) -> HashSet<String> {
    normalized.split_whitespace().map(str::to_string).collect()
}

/// Character 3-grams of each token, padded with one space on either side so that
/// prefixes and suffixes ("st" / "street") still share grams.
pub fn trigrams(tokens: &HashSet<String>) -> HashSet<String> {
    let mut grams = HashSet::new();
    for token in tokens {
        let padded: Vec<char> = std::iter::once(' ')
            .chain(token.chars())
            .chain(std::iter::once(' '))
            .collect();
        for window in padded.windows(3) {
            grams.insert(window.iter().collect::<String>());
        }
    }
    grams
}

pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Pre-tokenized view of a report's free text.
#[derive(Debug, Clone, Default)]
pub struct TextProfile {
    tokens: HashSet<String>,
    trigrams: HashSet<String>,
}

impl TextProfile {
    pub fn new(title: &str, description: &str) -> Self {
        let normalized = normalize(&format!("{} {}", title, description));
        let tokens = tokens(&normalized);
        let trigrams = trigrams(&tokens);
        Self { tokens, trigrams }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Equal blend of word overlap and trigram overlap, in `[0, 1]`.
    pub fn similarity(&self, other: &TextProfile) -> f64 {
        if self.is_empty() || other.is_empty() {
            return 0.0;
        }
        let score = 0.5 * jaccard(&self.tokens, &other.tokens)
            + 0.5 * jaccard(&self.trigrams, &other.trigrams);
        score.clamp(0.0, 1.0)
    }
}

/// True for keyboard-mash style noise: no alphanumeric content at all, or at least
/// four alphanumeric characters drawn from two or fewer distinct characters.
pub fn is_repetitive_noise(input: &str) -> bool {
    let chars: Vec<char> = input
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();

    if chars.is_empty() {
        return true;
    }
    if chars.len() < 4 {
        return false;
    }
    let distinct: HashSet<char> = chars.iter().copied().collect();
    distinct.len() <= 2
}
