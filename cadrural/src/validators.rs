use email_address::EmailAddress;
use once_cell::sync::Lazy;
use regex::Regex;

static UF_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{2}$").expect("static pattern"));

/// Returns `true` if the provided string is a syntactically valid email address.
pub fn is_valid_email(value: &str) -> bool {
    EmailAddress::is_valid(value)
}

/// Returns `true` for a two-letter uppercase state abbreviation.
pub fn is_valid_uf(value: &str) -> bool {
    UF_PATTERN.is_match(value)
}

/// Length in characters (not bytes), as user-facing limits are expressed.
pub fn char_len(value: &str) -> usize {
    value.chars().count()
}
