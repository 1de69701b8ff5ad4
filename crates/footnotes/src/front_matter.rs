use crate::consts::FRONT_MATTER_REGEX;

/// Returns `text` without its leading metadata block, if it has one.
pub fn strip_front_matter(text: &str) -> &str {
    match FRONT_MATTER_REGEX.find(text) {
        Some(found) => &text[found.end()..],
        None => text,
    }
}
