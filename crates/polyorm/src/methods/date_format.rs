//! Conversion of `yyyy-MM-dd`-style format strings into engine format tokens.
//!
//! Tables are ordered longest token first. [`translate`] looks up the first
//! occurrence of each token in the original string and skips occurrences that
//! overlap a token already claimed, then rebuilds the string in one pass. A
//! token repeated in the format is therefore translated once (`"dd-dd"` becomes
//! `"%d-dd"` for MySQL).

/// MySQL `DATE_FORMAT` tokens.
pub const MYSQL_TOKENS: &[(&str, &str)] = &[
    ("yyyy", "%Y"),
    ("MMMM", "%M"),
    ("dddd", "%W"),
    ("MMM", "%b"),
    ("ddd", "%a"),
    ("fff", "%f"),
    ("yy", "%y"),
    ("MM", "%m"),
    ("dd", "%d"),
    ("HH", "%H"),
    ("hh", "%h"),
    ("mm", "%i"),
    ("ss", "%s"),
    ("tt", "%p"),
    ("M", "%c"),
    ("d", "%e"),
    ("H", "%k"),
    ("h", "%l"),
];

/// SQLite `STRFTIME` tokens.
pub const SQLITE_TOKENS: &[(&str, &str)] = &[
    ("yyyy", "%Y"),
    ("fff", "%f"),
    ("MM", "%m"),
    ("dd", "%d"),
    ("HH", "%H"),
    ("mm", "%M"),
    ("ss", "%S"),
];

/// Translate `format` with a token table.
pub fn translate(format: &str, tokens: &[(&str, &str)]) -> String {
    let mut claims: Vec<(usize, usize, &str)> = Vec::new();
    for &(token, replacement) in tokens {
        let Some(start) = format.find(token) else {
            continue;
        };
        let end = start + token.len();
        if claims.iter().any(|&(s, e, _)| start < e && s < end) {
            continue;
        }
        claims.push((start, end, replacement));
    }
    claims.sort_by_key(|&(start, _, _)| start);

    let mut out = String::with_capacity(format.len() + claims.len());
    let mut last = 0;
    for (start, end, replacement) in claims {
        out.push_str(&format[last..start]);
        out.push_str(replacement);
        last = end;
    }
    out.push_str(&format[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_tokens_win_over_short_ones() {
        assert_eq!(translate("yyyy-MM-dd", MYSQL_TOKENS), "%Y-%m-%d");
        assert_eq!(translate("yy/M/d", MYSQL_TOKENS), "%y/%c/%e");
    }

    #[test]
    fn time_tokens() {
        assert_eq!(translate("dd/MM/yyyy HH:mm:ss", MYSQL_TOKENS), "%d/%m/%Y %H:%i:%s");
        assert_eq!(translate("yyyy-MM-dd HH:mm:ss", SQLITE_TOKENS), "%Y-%m-%d %H:%M:%S");
    }

    #[test]
    fn repeated_tokens_translate_first_occurrence_only() {
        assert_eq!(translate("dd-dd", MYSQL_TOKENS), "%d-dd");
    }

    #[test]
    fn unknown_text_is_kept() {
        assert_eq!(translate("Week of yyyy", SQLITE_TOKENS), "Week of %Y");
        assert_eq!(translate("", MYSQL_TOKENS), "");
    }
}
