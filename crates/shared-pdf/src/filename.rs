use chrono::NaiveDate;

const MAX_STEM_LEN: usize = 80;

/// `<sanitized-title>_<YYYY-MM-DD>.pdf`
///
/// Titles are reduced to ASCII letters, digits, `-` and `_`; runs of anything
/// else collapse to one underscore. An empty result falls back to `document`.
pub fn export_file_name(title: &str, date: NaiveDate) -> String {
    let mut stem = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() || c == '-' {
            stem.push(c);
        } else if !stem.ends_with('_') {
            stem.push('_');
        }
    }
    let mut stem: String = stem.trim_matches('_').chars().take(MAX_STEM_LEN).collect();
    while stem.ends_with('_') {
        stem.pop();
    }
    if stem.is_empty() {
        stem.push_str("document");
    }
    format!("{}_{}.pdf", stem, date.format("%Y-%m-%d"))
}
