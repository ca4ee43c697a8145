//! Date format specifier conversion

use regex::Regex;
use std::sync::OnceLock;

fn specifier() -> &'static Regex {
    static SPECIFIER: OnceLock<Regex> = OnceLock::new();
    SPECIFIER.get_or_init(|| Regex::new(r"%[A-Za-z]").expect("specifier pattern is valid"))
}

/// Trino spelling of a workflow date specifier, if it differs or is known
fn trino_specifier(spec: &str) -> Option<&'static str> {
    Some(match spec {
        "%Y" => "%Y",
        "%y" => "%y",
        "%m" => "%m",
        "%d" => "%d",
        "%H" => "%H",
        "%M" => "%i",
        "%S" => "%s",
        "%B" => "%M",
        "%b" => "%b",
        "%A" => "%W",
        "%a" => "%a",
        "%p" => "%p",
        "%I" => "%I",
        _ => return None,
    })
}

/// Rewrite a date format string for Trino's `date_format`/`date_parse`.
///
/// Specifiers are replaced in one left-to-right pass, so `%M` becoming
/// `%i` and `%B` becoming `%M` never interfere. Unknown specifiers are
/// left unchanged.
pub fn convert_date_format(format: &str) -> String {
    specifier()
        .replace_all(format, |caps: &regex::Captures<'_>| {
            let spec = &caps[0];
            trino_specifier(spec).unwrap_or(spec).to_string()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn minutes_and_seconds() {
        assert_eq!(convert_date_format("%H:%M:%S"), "%H:%i:%s");
    }

    #[test]
    fn month_names_do_not_chain() {
        assert_eq!(convert_date_format("%B %d, %Y at %M"), "%M %d, %Y at %i");
    }

    #[test]
    fn weekday_and_unknown_specifiers() {
        assert_eq!(convert_date_format("%A %a %Q"), "%W %a %Q");
    }

    #[test]
    fn plain_text_untouched() {
        assert_eq!(convert_date_format("yyyy-mm-dd"), "yyyy-mm-dd");
    }
}
