// Moderation engine - core business logic of the chat filter.
//
// This service handles:
// - Running the rule evaluators in order (first match wins)
// - Keeping per-user state (last message, throttle deadline, violations)
// - Asking the escalation policy what to do after a violation
// - Swapping in new rule snapshots while messages are being evaluated
//
// NO Discord dependencies here - the host decides how to enforce the outcome.

use super::escalation_policy;
use super::moderation_models::{BypassSet, ModerationOutcome, UserModerationState, Verdict};
use super::rule_evaluators::{first_violation, MessageContext};
use super::rule_set::RuleSet;
use super::text_normalizer::normalize;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

/// The next-eligible deadline could not be computed.
///
/// Never leaves `evaluate`: the message is blocked instead (fail closed).
#[derive(Debug, Error)]
#[error("Cannot schedule the next message {seconds}s after {now}")]
pub struct TimeArithmeticFailure {
    pub seconds: u64,
    pub now: DateTime<Utc>,
}

/// `now + minimum_seconds_between_messages`, or an error if that overflows.
pub fn next_eligible_time(
    now: DateTime<Utc>,
    rules: &RuleSet,
) -> Result<DateTime<Utc>, TimeArithmeticFailure> {
    let seconds = rules.minimum_seconds_between_messages();
    let failure = || TimeArithmeticFailure { seconds, now };

    let interval = i64::try_from(seconds)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .ok_or_else(failure)?;

    now.checked_add_signed(interval).ok_or_else(failure)
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Per-user state cell. Each user gets their own lock so that messages from
/// different users never wait on each other, while messages from the same
/// user are handled one at a time.
type UserSlot = Arc<Mutex<UserModerationState>>;

/// The chat filter's decision engine.
///
/// **Shared state:**
/// - `rules`: the current immutable snapshot. Readers clone the `Arc` and
///   release the lock right away; reloads replace the whole `Arc`.
/// - `users`: user id -> state slot. The map is only touched to look up or
///   create a slot; evaluation itself runs under the slot's own mutex.
pub struct ModerationEngine {
    rules: RwLock<Arc<RuleSet>>,
    users: DashMap<String, UserSlot>,
}

impl ModerationEngine {
    pub fn new(rules: impl Into<Arc<RuleSet>>) -> Self {
        Self {
            rules: RwLock::new(rules.into()),
            users: DashMap::new(),
        }
    }

    /// The rule snapshot new evaluations will use.
    pub fn rules(&self) -> Arc<RuleSet> {
        let rules = self.rules.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&rules)
    }

    /// Atomically swap in a new rule snapshot.
    /// Evaluations already running finish with the snapshot they started on.
    pub fn replace_rules(&self, rules: Arc<RuleSet>) {
        let mut current = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        *current = rules;
    }

    fn slot(&self, user_id: &str) -> UserSlot {
        if let Some(slot) = self.users.get(user_id) {
            return Arc::clone(slot.value());
        }

        Arc::clone(self.users.entry(user_id.to_string()).or_default().value())
    }

    /// Evaluate one message.
    ///
    /// # Arguments
    /// * `user_id` - Stable identity of the sender
    /// * `raw_message` - The message exactly as it was typed
    /// * `bypass` - Capabilities exempting the sender from specific rules
    /// * `now` - Arrival time of the message
    ///
    /// # Returns
    /// The verdict plus the escalation the host should carry out. This never
    /// fails: if the message cannot be accepted safely it is blocked.
    pub fn evaluate(
        &self,
        user_id: &str,
        raw_message: &str,
        bypass: &BypassSet,
        now: DateTime<Utc>,
    ) -> ModerationOutcome {
        let rules = self.rules();
        let slot = self.slot(user_id);
        // A panic elsewhere can't leave the state half-updated, so a poisoned
        // lock is still safe to use.
        let mut state = slot.lock().unwrap_or_else(PoisonError::into_inner);

        let normalized = normalize(raw_message, &rules);
        let message = MessageContext {
            raw: raw_message,
            normalized: &normalized,
            state: &state,
            now,
        };

        let verdict = match first_violation(&message, &rules, bypass) {
            Some(reason) => Verdict::blocked(reason),
            None => match next_eligible_time(now, &rules) {
                Ok(deadline) => {
                    // Always recorded on allow, bypasses or not.
                    state.next_eligible_time = Some(deadline);
                    state.last_message_normalized = Some(normalized.into_owned());
                    return ModerationOutcome::allowed();
                }
                Err(err) => {
                    tracing::warn!(user_id, error = %err, "Failing closed on chat message");
                    Verdict::Blocked { reason: None }
                }
            },
        };

        state.violation_count = state.violation_count.saturating_add(1);
        let violations = state.violation_count;
        let escalation = escalation_policy::on_violation(violations, &rules);

        if escalation.resets_violations(&rules) {
            state.violation_count = 0;
        }

        let reason = verdict
            .reason()
            .map(ToString::to_string)
            .unwrap_or_else(|| "Unspecified".to_string());
        tracing::info!(
            user_id,
            reason = %reason,
            violations,
            escalation = ?escalation,
            "Chat message blocked"
        );

        ModerationOutcome {
            verdict,
            escalation,
        }
    }

    /// Current violation count for a user (0 if we've never seen them).
    pub fn violation_count(&self, user_id: &str) -> u32 {
        let Some(slot) = self.users.get(user_id).map(|slot| Arc::clone(slot.value())) else {
            return 0;
        };

        let state = slot.lock().unwrap_or_else(PoisonError::into_inner);
        state.violation_count
    }

    /// Clear a user's violations (moderator action). Returns the old count.
    pub fn pardon(&self, user_id: &str) -> u32 {
        let Some(slot) = self.users.get(user_id).map(|slot| Arc::clone(slot.value())) else {
            return 0;
        };

        let mut state = slot.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut state.violation_count)
    }

    /// Drop everything we know about a user (moderator action).
    ///
    /// An evaluation that already picked up the user's slot finishes before
    /// this returns, so its update lands in the record being dropped rather
    /// than racing past it. The next message starts from a fresh record.
    pub fn forget(&self, user_id: &str) -> bool {
        let Some((_, slot)) = self.users.remove(user_id) else {
            return false;
        };

        drop(slot.lock().unwrap_or_else(PoisonError::into_inner));
        true
    }

    /// Number of users with state in the table.
    pub fn tracked_users(&self) -> usize {
        self.users.len()
    }

    #[cfg(test)]
    fn state_of(&self, user_id: &str) -> Option<UserModerationState> {
        let slot = self.users.get(user_id).map(|slot| Arc::clone(slot.value()))?;
        let state = slot.lock().unwrap_or_else(PoisonError::into_inner);
        Some(state.clone())
    }
}

impl Default for ModerationEngine {
    fn default() -> Self {
        Self::new(RuleSet::default())
    }
}

// ============================================================================
// TESTS
// ============================================================================
