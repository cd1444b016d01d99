// Moderation domain models - the values the chat filter hands back to its host.
//
// These are pure domain types with no Discord dependencies.
// The Discord layer converts them into message deletes, notices, kicks and bans.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::str::FromStr;

/// Why a message was blocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReasonKind {
    /// The message contained a configured blocked term
    BannedTerm { term: String },
    /// The message was identical to the user's previous accepted message
    RepeatMessage,
    /// The user wrote again before their waiting time ran out
    RateLimited,
    /// Too large a share of the message was uppercase
    ExcessiveCaps,
}

impl std::fmt::Display for ReasonKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReasonKind::BannedTerm { .. } => write!(f, "Banned Term"),
            ReasonKind::RepeatMessage => write!(f, "Repeat Message"),
            ReasonKind::RateLimited => write!(f, "Rate Limited"),
            ReasonKind::ExcessiveCaps => write!(f, "Excessive Caps"),
        }
    }
}

/// The allow/block outcome of evaluating one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    /// `reason` is `None` when the engine failed closed (no rule fired,
    /// but the message could not be accepted either).
    Blocked { reason: Option<ReasonKind> },
}

impl Verdict {
    pub fn blocked(reason: ReasonKind) -> Self {
        Verdict::Blocked {
            reason: Some(reason),
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Verdict::Blocked { .. })
    }

    /// The reason attached to a block, if any.
    pub fn reason(&self) -> Option<&ReasonKind> {
        match self {
            Verdict::Blocked { reason } => reason.as_ref(),
            Verdict::Allowed => None,
        }
    }
}

/// What the host should do to the user after a violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscalationAction {
    None,
    /// Suspend the user (kick them from the chat)
    Kick { message_key: &'static str },
    /// Ban the user permanently
    Ban { message_key: &'static str },
}

impl EscalationAction {
    pub const KICK_MESSAGE_KEY: &'static str = "kick";
    pub const BAN_MESSAGE_KEY: &'static str = "ban";

    pub fn kick() -> Self {
        EscalationAction::Kick {
            message_key: Self::KICK_MESSAGE_KEY,
        }
    }

    pub fn ban() -> Self {
        EscalationAction::Ban {
            message_key: Self::BAN_MESSAGE_KEY,
        }
    }
}

/// Result of running one message through the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationOutcome {
    pub verdict: Verdict,
    pub escalation: EscalationAction,
}

impl ModerationOutcome {
    /// Create an "allowed" outcome
    pub fn allowed() -> Self {
        Self {
            verdict: Verdict::Allowed,
            escalation: EscalationAction::None,
        }
    }
}

// ============================================================================
// BYPASS CAPABILITIES
// ============================================================================

/// A permission flag that exempts a user from exactly one evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BypassCapability {
    /// Skip the blocked-term check
    Swear,
    /// Skip the repeat-message check
    Same,
    /// Skip the rate limit
    Spam,
    /// Skip the caps check
    Caps,
}

impl BypassCapability {
    pub const ALL: [BypassCapability; 4] = [
        BypassCapability::Swear,
        BypassCapability::Same,
        BypassCapability::Spam,
        BypassCapability::Caps,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            BypassCapability::Swear => "bypass.swear",
            BypassCapability::Same => "bypass.same",
            BypassCapability::Spam => "bypass.spam",
            BypassCapability::Caps => "bypass.caps",
        }
    }
}

impl FromStr for BypassCapability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BypassCapability::ALL
            .into_iter()
            .find(|cap| cap.tag() == s)
            .ok_or_else(|| format!("Unknown bypass capability: {}", s))
    }
}

/// The set of bypass capabilities a caller holds for one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BypassSet {
    capabilities: HashSet<BypassCapability>,
}

impl BypassSet {
    /// No bypasses: every evaluator runs.
    #[cfg(test)]
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        BypassCapability::ALL.into_iter().collect()
    }

    /// Build a set from capability tags such as `"bypass.caps"`.
    /// Tags this filter does not know about are ignored.
    #[cfg(test)]
    pub fn from_tags<'a>(tags: impl IntoIterator<Item = &'a str>) -> Self {
        tags.into_iter()
            .filter_map(|tag| tag.parse::<BypassCapability>().ok())
            .collect()
    }

    pub fn contains(&self, capability: BypassCapability) -> bool {
        self.capabilities.contains(&capability)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

impl FromIterator<BypassCapability> for BypassSet {
    fn from_iter<I: IntoIterator<Item = BypassCapability>>(iter: I) -> Self {
        Self {
            capabilities: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// PER-USER STATE
// ============================================================================

/// Mutable moderation record for one user.
/// Created lazily on the user's first message and kept for the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserModerationState {
    /// Until when the user is throttled. `None` = never throttled yet.
    pub next_eligible_time: Option<DateTime<Utc>>,
    /// Normalized text of the last accepted message
    pub last_message_normalized: Option<String>,
    pub violation_count: u32,
}
