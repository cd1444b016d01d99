// Rule evaluators - the individual checks a message has to pass.
//
// Each evaluator is a pure predicate over the normalized message and the
// sender's current state. They run in a fixed order and the first one that
// fires decides the verdict. The engine owns the ordering and the state
// updates; nothing in here mutates anything.

use super::moderation_models::{BypassCapability, BypassSet, ReasonKind, UserModerationState};
use super::rule_set::RuleSet;
use chrono::{DateTime, Utc};

/// Everything an evaluator is allowed to look at for one message.
pub struct MessageContext<'a> {
    /// The message as the user typed it
    pub raw: &'a str,
    /// The message after normalization (spaces stripped if configured)
    pub normalized: &'a str,
    pub state: &'a UserModerationState,
    pub now: DateTime<Utc>,
}

/// One rule that can block a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluator {
    BannedTerm,
    RepeatMessage,
    RateLimit,
    ExcessiveCaps,
}

impl Evaluator {
    /// Evaluation order. First match wins.
    pub const ORDER: [Evaluator; 4] = [
        Evaluator::BannedTerm,
        Evaluator::RepeatMessage,
        Evaluator::RateLimit,
        Evaluator::ExcessiveCaps,
    ];

    /// The capability that exempts a user from this evaluator.
    pub fn bypass(&self) -> BypassCapability {
        match self {
            Evaluator::BannedTerm => BypassCapability::Swear,
            Evaluator::RepeatMessage => BypassCapability::Same,
            Evaluator::RateLimit => BypassCapability::Spam,
            Evaluator::ExcessiveCaps => BypassCapability::Caps,
        }
    }

    pub fn check(&self, message: &MessageContext<'_>, rules: &RuleSet) -> Option<ReasonKind> {
        match self {
            Evaluator::BannedTerm => find_banned_term(message.normalized, rules)
                .map(|term| ReasonKind::BannedTerm {
                    term: term.to_string(),
                }),
            Evaluator::RepeatMessage => {
                is_repeat(message.normalized, message.state).then_some(ReasonKind::RepeatMessage)
            }
            Evaluator::RateLimit => {
                is_rate_limited(message.state, message.now).then_some(ReasonKind::RateLimited)
            }
            Evaluator::ExcessiveCaps => has_excessive_caps(message.raw, message.normalized, rules)
                .then_some(ReasonKind::ExcessiveCaps),
        }
    }
}

/// Run the evaluators in order, skipping the ones the caller may bypass.
/// Returns the first reason found, or `None` if the message passes.
pub fn first_violation(
    message: &MessageContext<'_>,
    rules: &RuleSet,
    bypass: &BypassSet,
) -> Option<ReasonKind> {
    Evaluator::ORDER
        .iter()
        .filter(|evaluator| !bypass.contains(evaluator.bypass()))
        .find_map(|evaluator| evaluator.check(message, rules))
}

// ============================================================================
// INDIVIDUAL CHECKS
// ============================================================================

/// First configured term contained in the lowercased message.
pub fn find_banned_term<'r>(normalized: &str, rules: &'r RuleSet) -> Option<&'r str> {
    let lowered = normalized.to_lowercase();
    rules
        .blocked_terms()
        .iter()
        .find(|term| lowered.contains(term.as_str()))
        .map(String::as_str)
}

/// Exact, case-sensitive match against the last accepted message.
pub fn is_repeat(normalized: &str, state: &UserModerationState) -> bool {
    state.last_message_normalized.as_deref() == Some(normalized)
}

/// The throttle is active until the stored deadline has passed.
pub fn is_rate_limited(state: &UserModerationState, now: DateTime<Utc>) -> bool {
    state
        .next_eligible_time
        .is_some_and(|deadline| now < deadline)
}

/// Uppercase letters are counted over the raw message but divided by the
/// length of the normalized one. With spaces stripped the two differ; the
/// pairing is kept as-is.
pub fn has_excessive_caps(raw: &str, normalized: &str, rules: &RuleSet) -> bool {
    let length = normalized.chars().count();
    if length <= rules.minimum_length_for_caps_check() {
        return false;
    }

    let uppercase = count_uppercase(raw);
    (uppercase as f64 / length as f64) >= rules.uppercase_ratio_threshold()
}

/// Counts ASCII uppercase letters (A-Z only).
pub fn count_uppercase(text: &str) -> usize {
    text.chars().filter(char::is_ascii_uppercase).count()
}
