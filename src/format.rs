// Display formatting for prices, counts and dates (Indian conventions).

use chrono::{DateTime, Utc};

/// Groups digits the Indian way: last three, then pairs. `4500000` -> `45,00,000`.
pub fn number(value: u64) -> String {
    let digits = value.to_string();
    if digits.len() <= 3 {
        return digits;
    }
    let (head, tail) = digits.split_at(digits.len() - 3);

    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();
    format!("{},{}", groups.join(","), tail)
}

pub fn currency(amount: u64) -> String {
    format!("₹{}", number(amount))
}

// "2 March 2024"
pub fn date(at: &DateTime<Utc>) -> String {
    at.format("%-d %B %Y").to_string()
}

pub fn relative_time(at: &DateTime<Utc>) -> String {
    relative_time_from(at, Utc::now())
}

pub fn relative_time_from(at: &DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - *at).num_seconds();
    let ago = |n: i64, unit: &str| format!("{} {}{} ago", n, unit, if n > 1 { "s" } else { "" });
    match seconds {
        s if s < 60 => "Just now".to_string(),
        s if s < 3_600 => ago(s / 60, "minute"),
        s if s < 86_400 => ago(s / 3_600, "hour"),
        s if s < 2_592_000 => ago(s / 86_400, "day"),
        _ => date(at),
    }
}

pub fn capitalize(input: &str) -> String {
    let mut chars = input.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
