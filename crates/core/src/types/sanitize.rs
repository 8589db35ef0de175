//! Free-text sanitization.

/// Characters removed from free text before it is stored.
const STRIPPED: [char; 4] = ['<', '>', '"', '\''];

/// Strip markup-significant characters and surrounding whitespace.
///
/// Applied to every free-text field a caller supplies (names, branch,
/// tracking location, transaction ids) so stored values are safe to render.
///
/// ```
/// use fashion_hub_core::sanitize_text;
///
/// assert_eq!(sanitize_text("  <b>Koramangala</b> "), "bKoramangala/b");
/// ```
#[must_use]
pub fn sanitize_text(input: &str) -> String {
    input
        .chars()
        .filter(|c| !STRIPPED.contains(c))
        .collect::<String>()
        .trim()
        .to_owned()
}
