//! Text rules for animation names and export prefixes.

use crate::config::limits;
use crate::error::ValidationFailure;

/// Title-case a name: the first letter after any non-letter is upper-cased,
/// every other letter lower-cased.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut boundary = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if boundary {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            boundary = false;
        } else {
            out.push(c);
            boundary = true;
        }
    }
    out
}

/// Key used for uniqueness checks: lower-cased with all whitespace removed.
pub fn uniqueness_key(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Whether two names collide, ignoring case and whitespace.
pub fn names_collide(a: &str, b: &str) -> bool {
    uniqueness_key(a) == uniqueness_key(b)
}

/// Validate a trimmed animation name candidate.
pub fn validate_entry_name(candidate: &str) -> Result<(), ValidationFailure> {
    let invalid = |reason: &str| ValidationFailure::InvalidName {
        candidate: candidate.to_string(),
        reason: reason.to_string(),
    };

    if candidate.is_empty() {
        return Err(invalid("name is empty"));
    }
    let len = candidate.chars().count();
    if len < limits::NAME_MIN || len > limits::NAME_MAX {
        return Err(invalid(&format!(
            "must be {} to {} characters",
            limits::NAME_MIN,
            limits::NAME_MAX
        )));
    }
    if let Some(bad) = candidate
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-')))
    {
        return Err(invalid(&format!("character '{}' is not allowed", bad)));
    }
    Ok(())
}

/// Validate a trimmed export prefix candidate.
pub fn validate_prefix(candidate: &str) -> Result<(), ValidationFailure> {
    let invalid = |reason: String| ValidationFailure::InvalidPrefix {
        candidate: candidate.to_string(),
        reason,
    };

    let len = candidate.chars().count();
    if len <= limits::PREFIX_MIN_EXCLUSIVE || len >= limits::PREFIX_MAX_EXCLUSIVE {
        return Err(invalid(format!(
            "must be longer than {} and shorter than {} characters",
            limits::PREFIX_MIN_EXCLUSIVE,
            limits::PREFIX_MAX_EXCLUSIVE
        )));
    }
    if candidate.contains(limits::NAME_SEPARATOR) {
        return Err(invalid(format!(
            "'{}' is reserved as the filename separator",
            limits::NAME_SEPARATOR
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("run cycle", "Run Cycle" ; "words")]
    #[test_case("WALK", "Walk" ; "upper")]
    #[test_case("anim_1", "Anim_1" ; "underscore")]
    #[test_case("jump-start", "Jump-Start" ; "hyphen")]
    fn test_title_case(input: &str, expected: &str) {
        assert_eq!(title_case(input), expected);
    }

    #[test]
    fn test_names_collide() {
        assert!(names_collide("Run Cycle", "runcycle"));
        assert!(names_collide("RUN", "run"));
        assert!(!names_collide("Run", "Run2"));
    }

    #[test_case("Run", true ; "plain")]
    #[test_case("Anim_12", true ; "generated")]
    #[test_case("R", false ; "too short")]
    #[test_case("Run!", false ; "bad char")]
    #[test_case("", false ; "empty")]
    fn test_validate_entry_name(candidate: &str, ok: bool) {
        assert_eq!(validate_entry_name(candidate).is_ok(), ok);
    }

    #[test]
    fn test_validate_entry_name_max_length() {
        assert!(validate_entry_name(&"a".repeat(80)).is_ok());
        assert!(validate_entry_name(&"a".repeat(81)).is_err());
    }

    #[test_case("Hero", true ; "plain")]
    #[test_case("ab", false ; "two chars")]
    #[test_case("abc", true ; "three chars")]
    #[test_case("Hero@Run", false ; "separator")]
    fn test_validate_prefix(candidate: &str, ok: bool) {
        assert_eq!(validate_prefix(candidate).is_ok(), ok);
    }

    #[test]
    fn test_validate_prefix_upper_bound() {
        assert!(validate_prefix(&"a".repeat(29)).is_ok());
        assert!(validate_prefix(&"a".repeat(30)).is_err());
    }
}
