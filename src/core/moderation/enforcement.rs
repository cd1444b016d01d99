// Enforcement - turning a moderation outcome into host actions.
//
// The engine only returns values. Whoever hosts the filter (a Discord bot, a
// game server, a test) implements `ModerationHost` and `TextResolver`, and
// `enforce` drives them: discard the message, tell the user why, then kick or
// ban if the escalation policy asked for it.

use super::moderation_models::{EscalationAction, ModerationOutcome, ReasonKind, Verdict};
use super::rule_set::RuleSet;
use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum HostError {
    #[error("Failed to deliver message: {0}")]
    Delivery(String),

    #[error("Failed to suspend user: {0}")]
    Suspension(String),
}

// ============================================================================
// HOST PORTS
// ============================================================================

/// Actions the host platform performs on behalf of the filter.
///
/// One value of this trait is bound to one incoming message, so the methods
/// don't take user or channel ids.
#[async_trait]
pub trait ModerationHost: Send + Sync {
    /// Keep the blocked message from reaching other users.
    async fn discard_message(&self) -> Result<(), HostError>;

    /// Show a notice to the author of the message.
    async fn send_notice(&self, text: &str) -> Result<(), HostError>;

    /// Temporarily remove the author (kick).
    async fn suspend_user(&self, reason: &str) -> Result<(), HostError>;

    /// Permanently ban the author.
    async fn ban_user(&self, reason: &str) -> Result<(), HostError>;
}

/// Looks up user-facing text by message key.
pub trait TextResolver: Send + Sync {
    /// Render `key`, replacing `{name}` placeholders with the given values.
    fn resolve_text(&self, key: &str, substitutions: &[(&str, &str)]) -> String;
}

// ============================================================================
// NOTICE KEYS
// ============================================================================

pub const NOTICE_BLOCKED: &str = "blocked.message";
pub const NOTICE_BLOCKED_WITH_TERM: &str = "blocked.messagewithblocked";
pub const NOTICE_REPEAT: &str = "blocked.lastwritten";
pub const NOTICE_RATE_LIMITED: &str = "blocked.timewritten";
pub const NOTICE_CAPS: &str = "blocked.caps";

/// Render the notice for a blocked verdict. `None` for allowed messages.
pub fn render_notice<R: TextResolver + ?Sized>(
    verdict: &Verdict,
    rules: &RuleSet,
    resolver: &R,
) -> Option<String> {
    let Verdict::Blocked { reason } = verdict else {
        return None;
    };

    let text = match reason {
        Some(ReasonKind::BannedTerm { term }) if rules.show_matched_term() => {
            resolver.resolve_text(NOTICE_BLOCKED_WITH_TERM, &[("blocked", term.as_str())])
        }
        Some(ReasonKind::BannedTerm { .. }) | None => resolver.resolve_text(NOTICE_BLOCKED, &[]),
        Some(ReasonKind::RepeatMessage) => resolver.resolve_text(NOTICE_REPEAT, &[]),
        Some(ReasonKind::RateLimited) => resolver.resolve_text(NOTICE_RATE_LIMITED, &[]),
        Some(ReasonKind::ExcessiveCaps) => resolver.resolve_text(NOTICE_CAPS, &[]),
    };

    Some(text)
}

/// Carry out a moderation outcome through the host.
///
/// Every step is attempted even if an earlier one fails (a notice that can't
/// be delivered must not save the user from a kick). Failures are logged and
/// the first one is returned.
pub async fn enforce<H, R>(
    host: &H,
    resolver: &R,
    rules: &RuleSet,
    outcome: &ModerationOutcome,
) -> Result<(), HostError>
where
    H: ModerationHost + ?Sized,
    R: TextResolver + ?Sized,
{
    if !outcome.verdict.is_blocked() {
        return Ok(());
    }

    let mut first_error: Option<HostError> = None;
    let mut record = |result: Result<(), HostError>, step: &str| {
        if let Err(err) = result {
            tracing::warn!(step, error = %err, "Moderation step failed");
            first_error.get_or_insert(err);
        }
    };

    record(host.discard_message().await, "discard_message");

    if let Some(notice) = render_notice(&outcome.verdict, rules, resolver) {
        record(host.send_notice(&notice).await, "send_notice");
    }

    match &outcome.escalation {
        EscalationAction::None => {}
        EscalationAction::Kick { message_key } => {
            let reason = resolver.resolve_text(message_key, &[]);
            record(host.suspend_user(&reason).await, "suspend_user");
        }
        EscalationAction::Ban { message_key } => {
            let reason = resolver.resolve_text(message_key, &[]);
            record(host.ban_user(&reason).await, "ban_user");
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::RuleSettings;
    use std::sync::Mutex;

    /// Host that records every call instead of talking to a platform
    #[derive(Default)]
    struct RecordingHost {
        calls: Mutex<Vec<String>>,
        fail_notices: bool,
    }

    impl RecordingHost {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModerationHost for RecordingHost {
        async fn discard_message(&self) -> Result<(), HostError> {
            self.calls.lock().unwrap().push("discard".to_string());
            Ok(())
        }

        async fn send_notice(&self, text: &str) -> Result<(), HostError> {
            if self.fail_notices {
                return Err(HostError::Delivery("channel gone".to_string()));
            }
            self.calls.lock().unwrap().push(format!("notice:{}", text));
            Ok(())
        }

        async fn suspend_user(&self, reason: &str) -> Result<(), HostError> {
            self.calls.lock().unwrap().push(format!("kick:{}", reason));
            Ok(())
        }

        async fn ban_user(&self, reason: &str) -> Result<(), HostError> {
            self.calls.lock().unwrap().push(format!("ban:{}", reason));
            Ok(())
        }
    }

    /// Resolver that echoes keys back, with substitutions appended
    struct KeyResolver;

    impl TextResolver for KeyResolver {
        fn resolve_text(&self, key: &str, substitutions: &[(&str, &str)]) -> String {
            substitutions
                .iter()
                .fold(key.to_string(), |text, (name, value)| {
                    format!("{}[{}={}]", text, name, value)
                })
        }
    }

    fn blocked(reason: Option<ReasonKind>, escalation: EscalationAction) -> ModerationOutcome {
        ModerationOutcome {
            verdict: Verdict::Blocked { reason },
            escalation,
        }
    }

    #[tokio::test]
    async fn test_allowed_message_touches_nothing() {
        let host = RecordingHost::default();

        enforce(&host, &KeyResolver, &RuleSet::default(), &ModerationOutcome::allowed())
            .await
            .unwrap();

        assert!(host.calls().is_empty());
    }

    #[tokio::test]
    async fn test_notice_keys_per_reason() {
        let rules = RuleSet::default();
        let cases = [
            (
                Some(ReasonKind::BannedTerm {
                    term: "shit".to_string(),
                }),
                "blocked.message",
            ),
            (Some(ReasonKind::RepeatMessage), "blocked.lastwritten"),
            (Some(ReasonKind::RateLimited), "blocked.timewritten"),
            (Some(ReasonKind::ExcessiveCaps), "blocked.caps"),
            (None, "blocked.message"),
        ];

        for (reason, key) in cases {
            let host = RecordingHost::default();
            enforce(&host, &KeyResolver, &rules, &blocked(reason, EscalationAction::None))
                .await
                .unwrap();

            assert_eq!(host.calls(), vec!["discard".to_string(), format!("notice:{}", key)]);
        }
    }

    #[tokio::test]
    async fn test_matched_term_shown_when_configured() {
        let rules = RuleSettings {
            show_matched_term: true,
            ..Default::default()
        }
        .build()
        .unwrap();
        let host = RecordingHost::default();
        let outcome = blocked(
            Some(ReasonKind::BannedTerm {
                term: "bitch".to_string(),
            }),
            EscalationAction::None,
        );

        enforce(&host, &KeyResolver, &rules, &outcome).await.unwrap();

        assert_eq!(
            host.calls()[1],
            "notice:blocked.messagewithblocked[blocked=bitch]"
        );
    }

    #[tokio::test]
    async fn test_kick_and_ban_use_their_message_keys() {
        let rules = RuleSet::default();

        let host = RecordingHost::default();
        let outcome = blocked(Some(ReasonKind::RateLimited), EscalationAction::kick());
        enforce(&host, &KeyResolver, &rules, &outcome).await.unwrap();
        assert_eq!(host.calls().last().map(String::as_str), Some("kick:kick"));

        let host = RecordingHost::default();
        let outcome = blocked(Some(ReasonKind::RateLimited), EscalationAction::ban());
        enforce(&host, &KeyResolver, &rules, &outcome).await.unwrap();
        assert_eq!(host.calls().last().map(String::as_str), Some("ban:ban"));
    }

    #[tokio::test]
    async fn test_failed_notice_still_kicks() {
        let host = RecordingHost {
            fail_notices: true,
            ..Default::default()
        };
        let outcome = blocked(Some(ReasonKind::ExcessiveCaps), EscalationAction::kick());

        let result = enforce(&host, &KeyResolver, &RuleSet::default(), &outcome).await;

        assert!(matches!(result, Err(HostError::Delivery(_))));
        assert_eq!(host.calls(), vec!["discard", "kick:kick"]);
    }
}
