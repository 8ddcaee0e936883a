//! Filename and media type helpers for uploaded content.
//!
//! Stored images are written under names derived from a random identifier
//! plus a sanitized form of the client-supplied name, so nothing in this
//! module ever trusts a filename as a path.

/// Longest sanitized name kept from a client-supplied filename.
pub const MAX_FILENAME_LEN: usize = 100;

/// Name used when nothing usable survives sanitization.
const FALLBACK_NAME: &str = "image";

/// Check whether a declared media type names an image.
///
/// Parameters (`; charset=...`) are ignored and the comparison is
/// case-insensitive.
///
/// # Examples
///
/// ```
/// use synedrius_common::paths::is_image_media_type;
///
/// assert!(is_image_media_type("image/jpeg"));
/// assert!(is_image_media_type("IMAGE/PNG; q=1"));
/// assert!(!is_image_media_type("text/html"));
/// ```
pub fn is_image_media_type(media_type: &str) -> bool {
    let essence = media_type.split(';').next().unwrap_or("").trim();
    essence.len() > "image/".len()
        && essence
            .get(..6)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
}

/// Reduce a client-supplied filename to a safe, flat file name.
///
/// Any directory components are dropped, characters outside
/// `[A-Za-z0-9._-]` become `_`, leading dots are stripped and the result is
/// truncated to [`MAX_FILENAME_LEN`] characters.
///
/// # Examples
///
/// ```
/// use synedrius_common::paths::sanitize_filename;
///
/// assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
/// assert_eq!(sanitize_filename("team logo (1).png"), "team_logo__1_.png");
/// assert_eq!(sanitize_filename(".."), "image");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("");

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    let truncated: String = trimmed.chars().take(MAX_FILENAME_LEN).collect();

    if truncated.is_empty() || truncated.chars().all(|c| c == '_') {
        FALLBACK_NAME.to_string()
    } else {
        truncated
    }
}

/// Derive a filename from the last path segment of a URL path.
///
/// Query strings and fragments are ignored; the result is sanitized.
///
/// # Examples
///
/// ```
/// use synedrius_common::paths::filename_from_url_path;
///
/// assert_eq!(filename_from_url_path("/img/logo.png?size=2"), "logo.png");
/// assert_eq!(filename_from_url_path("/"), "image");
/// ```
pub fn filename_from_url_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or("");
    let segment = path.rsplit('/').find(|s| !s.is_empty()).unwrap_or("");
    sanitize_filename(segment)
}
