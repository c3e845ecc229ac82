/// Render a response time the way the admin dashboard shows it:
/// `"2 days 3 hours"` from one day upwards, `"5 hours"` below that.
pub fn humanize_response_time(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;

    if days > 0 {
        format!("{} {} {} {}", days, plural(days, "day"), hours, plural(hours, "hour"))
    } else {
        format!("{} {}", hours, plural(hours, "hour"))
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        unit.to_string()
    } else {
        format!("{}s", unit)
    }
}
