/// Splits pasted name text into one entry per non-empty line.
/// No duplicate detection: two identical lines produce two entries.
pub fn parse_names(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
