/// Segment that starts every rate-limit history key.
pub const HISTORY_SEGMENT: &str = "hist";

/// Logical key of the event history for one `(subject, action)` pair.
///
/// The format is `hist:{subject}:{action}`.
pub fn history_key(subject: &str, action: &str) -> String {
    format!("{HISTORY_SEGMENT}:{subject}:{action}")
}

/// Apply a deployment prefix to a logical key.
///
/// An empty prefix leaves the logical key untouched, so the default layout is
/// byte-compatible with clients that use bare keys.
pub fn render_key(prefix: &str, logical: &str) -> String {
    if prefix.is_empty() {
        logical.to_owned()
    } else {
        format!("{prefix}:{logical}")
    }
}
