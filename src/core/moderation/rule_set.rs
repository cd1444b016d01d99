// The rule set is the immutable configuration snapshot every evaluator reads.
//
// A snapshot is validated once when it is built and then shared behind an Arc.
// Changing the configuration means building a new snapshot and swapping it in;
// nothing ever mutates a RuleSet that evaluations might be reading.

use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

/// Problems found while loading or validating filter configuration.
///
/// These surface when configuration is (re)loaded, never from `evaluate`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Malformed configuration: {0}")]
    Parse(String),

    #[error("Uppercase ratio must be between 0 and 1, got {0}")]
    InvalidRatio(f64),

    #[error("Blocked term at position {0} is empty")]
    EmptyTerm(usize),

    #[error("Default language bundle is missing: {0}")]
    MissingDefaultLanguage(String),
}

// ============================================================================
// SETTINGS (UNVALIDATED INPUT)
// ============================================================================

/// Raw filter settings, as read from configuration.
///
/// Defaults match what the filter ships with: three blocked terms, spaces
/// ignored while matching, 75% caps over more than 3 characters, 2 seconds
/// between messages, and no automatic kicks or bans.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSettings {
    pub blocked_terms: Vec<String>,
    pub ignore_spaces_when_matching: bool,
    pub show_matched_term: bool,
    pub uppercase_ratio_threshold: f64,
    pub minimum_length_for_caps_check: usize,
    pub minimum_seconds_between_messages: u64,
    /// 0 disables kicking
    pub kick_at_violation_count: u32,
    /// 0 disables banning
    pub ban_at_violation_count: u32,
    pub reset_violations_after_kick: bool,
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self {
            blocked_terms: vec!["fuck".to_string(), "shit".to_string(), "bitch".to_string()],
            ignore_spaces_when_matching: true,
            show_matched_term: false,
            uppercase_ratio_threshold: 0.75,
            minimum_length_for_caps_check: 3,
            minimum_seconds_between_messages: 2,
            kick_at_violation_count: 0,
            ban_at_violation_count: 0,
            reset_violations_after_kick: true,
        }
    }
}

impl RuleSettings {
    /// Validate the settings and freeze them into a [`RuleSet`].
    pub fn build(self) -> Result<RuleSet, ConfigError> {
        RuleSet::try_from(self)
    }
}

// ============================================================================
// RULE SET (VALIDATED SNAPSHOT)
// ============================================================================

/// A validated, read-only rule snapshot.
///
/// Blocked terms are lowercase and deduplicated, in configured order.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    blocked_terms: Vec<String>,
    ignore_spaces_when_matching: bool,
    show_matched_term: bool,
    uppercase_ratio_threshold: f64,
    minimum_length_for_caps_check: usize,
    minimum_seconds_between_messages: u64,
    kick_at_violation_count: u32,
    ban_at_violation_count: u32,
    reset_violations_after_kick: bool,
}

impl TryFrom<RuleSettings> for RuleSet {
    type Error = ConfigError;

    fn try_from(settings: RuleSettings) -> Result<Self, Self::Error> {
        let ratio = settings.uppercase_ratio_threshold;
        if !(0.0..=1.0).contains(&ratio) {
            // Also rejects NaN, which fails every range check.
            return Err(ConfigError::InvalidRatio(ratio));
        }

        let mut blocked_terms: Vec<String> = Vec::with_capacity(settings.blocked_terms.len());
        for (position, term) in settings.blocked_terms.iter().enumerate() {
            if term.is_empty() {
                return Err(ConfigError::EmptyTerm(position));
            }
            let term = term.to_lowercase();
            if !blocked_terms.contains(&term) {
                blocked_terms.push(term);
            }
        }

        Ok(Self {
            blocked_terms,
            ignore_spaces_when_matching: settings.ignore_spaces_when_matching,
            show_matched_term: settings.show_matched_term,
            uppercase_ratio_threshold: ratio,
            minimum_length_for_caps_check: settings.minimum_length_for_caps_check,
            minimum_seconds_between_messages: settings.minimum_seconds_between_messages,
            kick_at_violation_count: settings.kick_at_violation_count,
            ban_at_violation_count: settings.ban_at_violation_count,
            reset_violations_after_kick: settings.reset_violations_after_kick,
        })
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        // Default settings are already lowercase, unique and in range.
        let settings = RuleSettings::default();
        Self {
            blocked_terms: settings.blocked_terms,
            ignore_spaces_when_matching: settings.ignore_spaces_when_matching,
            show_matched_term: settings.show_matched_term,
            uppercase_ratio_threshold: settings.uppercase_ratio_threshold,
            minimum_length_for_caps_check: settings.minimum_length_for_caps_check,
            minimum_seconds_between_messages: settings.minimum_seconds_between_messages,
            kick_at_violation_count: settings.kick_at_violation_count,
            ban_at_violation_count: settings.ban_at_violation_count,
            reset_violations_after_kick: settings.reset_violations_after_kick,
        }
    }
}

impl RuleSet {
    pub fn blocked_terms(&self) -> &[String] {
        &self.blocked_terms
    }

    pub fn ignore_spaces_when_matching(&self) -> bool {
        self.ignore_spaces_when_matching
    }

    pub fn show_matched_term(&self) -> bool {
        self.show_matched_term
    }

    pub fn uppercase_ratio_threshold(&self) -> f64 {
        self.uppercase_ratio_threshold
    }

    pub fn minimum_length_for_caps_check(&self) -> usize {
        self.minimum_length_for_caps_check
    }

    pub fn minimum_seconds_between_messages(&self) -> u64 {
        self.minimum_seconds_between_messages
    }

    pub fn kick_at_violation_count(&self) -> u32 {
        self.kick_at_violation_count
    }

    pub fn ban_at_violation_count(&self) -> u32 {
        self.ban_at_violation_count
    }

    pub fn reset_violations_after_kick(&self) -> bool {
        self.reset_violations_after_kick
    }
}
