//! Bold the label of `Label: value` lines and render them as list items

use super::FenceTracker;
use regex::Regex;
use std::sync::LazyLock;

/// Colon must be followed by whitespace so URLs and times are left alone
static FIELD_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*-?\s*(\w[\w\s]*?):\s+(\S.*)$").unwrap());

pub fn format_structured_lists(text: &str) -> String {
    let mut fences = FenceTracker::default();

    text.split('\n')
        .map(|line| {
            if fences.observe(line) {
                return line.to_string();
            }
            match FIELD_LINE.captures(line) {
                Some(caps) => format!("- **{}:** {}", caps[1].trim_end(), &caps[2]),
                None => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
