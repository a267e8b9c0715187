/// Flattens an upstream body onto one line and caps its length, so that an HTML
/// error page from a gateway does not flood an error message or a log line.
pub fn truncate_body(s: &str, limit: usize) -> String {
    let flat = s.split_whitespace().collect::<Vec<_>>().join(" ");
    let char_count = flat.chars().count();
    if char_count <= limit {
        flat
    } else {
        let truncated: String = flat.chars().take(limit).collect();
        let remaining = char_count - limit;
        format!("{truncated}...({remaining} more chars)")
    }
}
