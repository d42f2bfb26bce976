//! Display-name and label shaping.

/// Longest display name kept verbatim, in characters.
pub const MAX_DISPLAY_NAME_CHARS: usize = 50;

/// Longest option label kept verbatim, in characters.
pub const MAX_LABEL_CHARS: usize = 20;

/// Builds a bounded display name from transport-supplied name parts.
#[must_use]
pub fn sanitize_display_name(first_name: Option<&str>, last_name: Option<&str>) -> String {
    let first = first_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or("Anonymous");
    let mut full = first.to_owned();
    if let Some(last) = last_name.map(str::trim).filter(|name| !name.is_empty()) {
        full.push(' ');
        full.push_str(last);
    }
    truncate_chars(&full, MAX_DISPLAY_NAME_CHARS, "...")
}

/// Shortens an option to fit on a button.
#[must_use]
pub fn option_label(option: &str) -> String {
    truncate_chars(option, MAX_LABEL_CHARS, "..")
}

fn truncate_chars(text: &str, max_chars: usize, ellipsis: &str) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let keep = max_chars.saturating_sub(ellipsis.chars().count());
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(ellipsis);
    truncated
}
