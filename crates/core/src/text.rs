/// Replaces full-width digits (`０`..=`９`) with their ASCII counterparts.
pub fn normalize_digits(input: &str) -> String {
    input
        .chars()
        .map(|ch| match ch {
            '０'..='９' => char::from_u32(u32::from(ch) - u32::from('０') + u32::from('0')).unwrap_or(ch),
            other => other,
        })
        .collect()
}

/// Parses a whole number from form text, accepting full-width digits and
/// thousands separators.
pub fn parse_count(input: &str) -> Option<i64> {
    let cleaned: String = normalize_digits(input)
        .chars()
        .filter(|ch| !matches!(ch, ',' | '，' | ' ' | '\u{3000}'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}
