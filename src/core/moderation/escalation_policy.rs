// Escalation policy - turns a user's violation count into a kick or ban.

use super::moderation_models::EscalationAction;
use super::rule_set::RuleSet;

/// Decide what happens after a user's `count`-th violation.
///
/// Thresholds compare with exact equality, so each one fires once per
/// crossing. A threshold of 0 is disabled. When both thresholds match the
/// same count, the kick wins.
pub fn on_violation(count: u32, rules: &RuleSet) -> EscalationAction {
    let kick_at = rules.kick_at_violation_count();
    let ban_at = rules.ban_at_violation_count();

    if kick_at > 0 && count == kick_at {
        EscalationAction::kick()
    } else if ban_at > 0 && count == ban_at {
        EscalationAction::ban()
    } else {
        EscalationAction::None
    }
}

impl EscalationAction {
    /// Whether the user's violation counter goes back to 0 after this action.
    pub fn resets_violations(&self, rules: &RuleSet) -> bool {
        match self {
            EscalationAction::None => false,
            EscalationAction::Kick { .. } => rules.reset_violations_after_kick(),
            EscalationAction::Ban { .. } => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::RuleSettings;

    fn rules(kick: u32, ban: u32, reset_after_kick: bool) -> RuleSet {
        RuleSettings {
            kick_at_violation_count: kick,
            ban_at_violation_count: ban,
            reset_violations_after_kick: reset_after_kick,
            ..Default::default()
        }
        .build()
        .unwrap()
    }

    #[test]
    fn test_disabled_thresholds_never_fire() {
        let rules = rules(0, 0, true);
        for count in 0..10 {
            assert_eq!(on_violation(count, &rules), EscalationAction::None);
        }
    }

    #[test]
    fn test_exact_equality_not_at_least() {
        let rules = rules(3, 6, false);

        assert_eq!(on_violation(2, &rules), EscalationAction::None);
        assert_eq!(on_violation(3, &rules), EscalationAction::kick());
        assert_eq!(on_violation(4, &rules), EscalationAction::None);
        assert_eq!(on_violation(6, &rules), EscalationAction::ban());
        assert_eq!(on_violation(7, &rules), EscalationAction::None);
    }

    #[test]
    fn test_kick_wins_over_ban_on_same_count() {
        let rules = rules(4, 4, false);
        assert_eq!(on_violation(4, &rules), EscalationAction::kick());
    }

    #[test]
    fn test_reset_rules() {
        let resetting = rules(3, 6, true);
        let keeping = rules(3, 6, false);

        assert!(EscalationAction::kick().resets_violations(&resetting));
        assert!(!EscalationAction::kick().resets_violations(&keeping));
        // A ban always starts the counter over
        assert!(EscalationAction::ban().resets_violations(&keeping));
        assert!(!EscalationAction::None.resets_violations(&resetting));
    }
}
