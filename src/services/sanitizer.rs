//! Response Sanitizer
//!
//! Models are told to return raw file content but often wrap it in a
//! markdown fence anyway. `sanitize` strips a leading fence line and a
//! trailing fence line and trims the result, repeating until neither end
//! carries a fence so that sanitizing twice never changes the output.

use std::sync::LazyLock;

use regex::Regex;

static OPENING_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^```\w*\s*\n").expect("valid opening fence pattern")
});

static CLOSING_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\n```$").expect("valid closing fence pattern")
});

fn strip_once(text: &str) -> String {
    let without_open = OPENING_FENCE.replace(text, "");
    // A bare "```lang\n```" block leaves only the closing marker behind.
    if without_open == "```" {
        return String::new();
    }
    CLOSING_FENCE.replace(&without_open, "").trim().to_string()
}

/// Strip surrounding code fences from model output.
pub fn sanitize(raw: &str) -> String {
    let mut current = raw.trim().to_string();
    loop {
        let next = strip_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}
