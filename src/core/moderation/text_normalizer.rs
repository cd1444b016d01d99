// Produces the comparison form of a chat message.

use super::rule_set::RuleSet;
use std::borrow::Cow;

/// Normalize a raw message for rule evaluation.
///
/// When the rule set ignores spaces, every U+0020 space is removed so that
/// "s h i t" compares like "shit". Case is preserved; the blocked-term check
/// lowercases on its own, while the repeat and caps checks work on the
/// case-preserving form.
pub fn normalize<'a>(raw: &'a str, rules: &RuleSet) -> Cow<'a, str> {
    if rules.ignore_spaces_when_matching() && raw.contains(' ') {
        Cow::Owned(raw.replace(' ', ""))
    } else {
        Cow::Borrowed(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::RuleSettings;

    fn rules(ignore_spaces: bool) -> RuleSet {
        RuleSettings {
            ignore_spaces_when_matching: ignore_spaces,
            ..Default::default()
        }
        .build()
        .unwrap()
    }

    #[test]
    fn test_strips_spaces_but_keeps_case() {
        assert_eq!(normalize("S h I t", &rules(true)), "ShIt");
    }

    #[test]
    fn test_only_plain_spaces_are_removed() {
        // Tabs and newlines are not spaces as far as matching is concerned
        assert_eq!(normalize("a\tb c\n", &rules(true)), "a\tbc\n");
    }

    #[test]
    fn test_untouched_when_spaces_matter() {
        let normalized = normalize("hello there", &rules(false));
        assert_eq!(normalized, "hello there");
        assert!(matches!(normalized, Cow::Borrowed(_)));
    }
}
