//! Bounded-length previews of long text bodies.

/// Maximum number of words kept in a preview.
pub const PREVIEW_WORDS: usize = 100;

/// Appended when words were dropped.
pub const TRUNCATION_MARKER: &str = "...";

/// Collapse whitespace and keep at most [`PREVIEW_WORDS`] words.
///
/// The marker is glued to the last kept word, so a truncated preview is still
/// [`PREVIEW_WORDS`] whitespace-separated tokens.
///
/// ```
/// use glimpse_web::summarize::summarize;
///
/// assert_eq!(summarize("  hello \n\t world "), "hello world");
/// assert!(summarize(&"word ".repeat(150)).ends_with("word..."));
/// ```
pub fn summarize(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut preview = words
        .iter()
        .take(PREVIEW_WORDS)
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    if words.len() > PREVIEW_WORDS {
        preview.push_str(TRUNCATION_MARKER);
    }
    preview
}
