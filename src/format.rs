// Small display helpers shared by the CLI and the interactive browser.

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Convert a byte count to a human readable size, e.g. `1.50 KB`.
pub fn format_size(size: u64) -> String {
    let mut value = size as f64;
    for unit in UNITS {
        if value < 1024.0 {
            return format!("{value:.2} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.2} PB")
}

/// Make a remote name safe to use as a local filename: keep word
/// characters, whitespace, dots and hyphens, then join the words with `_`.
pub fn sanitize_filename(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || matches!(c, '_' | '.' | '-'))
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join("_")
}
