use chrono::Utc;
use rand::{Rng, distr::Alphanumeric};

pub const STATE_TOKEN_LEN: usize = 32;

pub fn generate_state_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_TOKEN_LEN)
        .map(char::from)
        .collect()
}

pub fn unix_timestamp() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

/// Splits a comma separated scope list, dropping empty entries.
pub fn parse_scopes(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Formats a duration in milliseconds the way request logs print it.
pub fn format_elapsed(elapsed: std::time::Duration) -> String {
    let millis = elapsed.as_millis();
    if millis >= 1000 {
        format!("{:.2}s", elapsed.as_secs_f64())
    } else {
        format!("{}ms", millis)
    }
}

/// Returns `true` if both strings are equal, comparing every byte.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
