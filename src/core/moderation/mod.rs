// Core moderation module - contains the chat filter's business logic.
// Rules, per-user state and escalation live here; enforcement is delegated to the host.

pub mod enforcement;
pub mod escalation_policy;
pub mod moderation_engine;
pub mod moderation_models;
pub mod rule_evaluators;
pub mod rule_set;
pub mod text_normalizer;

pub use enforcement::{enforce, HostError, ModerationHost, TextResolver};
pub use moderation_engine::ModerationEngine;
pub use moderation_models::*;
pub use rule_set::{ConfigError, RuleSet, RuleSettings};
