//! Utility functions for filenames and display formatting

/// Characters stripped from provider titles before they become filenames
const FORBIDDEN: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|', '\0'];

/// Maximum filename stem length, leaving room for an extension
const MAX_STEM_LEN: usize = 120;

/// Turn a provider title into a safe filename stem.
///
/// Strips path separators and other characters that are invalid on common
/// filesystems, collapses whitespace, drops leading dots (the stem must
/// never name a hidden file, and dotted names are reserved for staged
/// intermediates), and bounds the length. Falls back to `"track"` when
/// nothing printable survives.
pub fn sanitize_filename(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| if FORBIDDEN.contains(&c) { ' ' } else { c })
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let bounded: String = collapsed.chars().take(MAX_STEM_LEN).collect();
    let trimmed = bounded.trim().trim_start_matches('.').trim().to_string();
    if trimmed.is_empty() {
        "track".to_string()
    } else {
        trimmed
    }
}

/// Format a duration in seconds as `"M:SS"` or `"H:MM:SS"`
pub fn format_duration(total_seconds: u32) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Normalize an uploader name into a performer label.
///
/// Auto-generated music channels carry a `" - Topic"` suffix that is noise
/// in track metadata; missing or blank uploaders become `"Unknown"`.
pub fn normalize_performer(uploader: Option<&str>) -> String {
    let name = uploader.unwrap_or("").trim();
    let name = name.strip_suffix(" - Topic").unwrap_or(name).trim();
    if name.is_empty() {
        "Unknown".to_string()
    } else {
        name.to_string()
    }
}
