// JSON-backed filter configuration.
//
// The file holds everything a server admin can tune: blocked terms, caps and
// rate thresholds, kick/ban escalation, the notice language, and which Discord
// roles bypass which checks. Loading validates the rules into a RuleSet, so a
// bad file is reported at startup (or on /chatfilter reload) and never reaches
// message evaluation.

use crate::core::moderation::{BypassCapability, BypassSet, ConfigError, RuleSet, RuleSettings};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

// ============================================================================
// FILE FORMAT
// ============================================================================

/// On-disk layout of the filter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfigFile {
    /// Language bundle used for notices, e.g. "en" or "de"
    pub language: String,
    pub blocked_terms: Vec<String>,
    pub ignore_spaces: bool,
    /// Tell users which term got their message blocked
    pub show_blocked: bool,
    pub uppercase_percentage: f64,
    pub minimum_chars: usize,
    pub waiting_time_secs: u64,
    pub violations: ViolationsSection,
    pub bypass_roles: BypassRolesSection,
    /// Roles that bypass every check
    pub bypass_all_roles: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViolationsSection {
    /// Kick at this many violations (0 = never)
    pub kick: u32,
    /// Ban at this many violations (0 = never)
    pub ban: u32,
    pub reset_after_kick: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BypassRolesSection {
    pub swear: Vec<u64>,
    pub same: Vec<u64>,
    pub spam: Vec<u64>,
    pub caps: Vec<u64>,
}

impl Default for FilterConfigFile {
    fn default() -> Self {
        let rules = RuleSettings::default();
        Self {
            language: "en".to_string(),
            blocked_terms: rules.blocked_terms,
            ignore_spaces: rules.ignore_spaces_when_matching,
            show_blocked: rules.show_matched_term,
            uppercase_percentage: rules.uppercase_ratio_threshold,
            minimum_chars: rules.minimum_length_for_caps_check,
            waiting_time_secs: rules.minimum_seconds_between_messages,
            violations: ViolationsSection::default(),
            bypass_roles: BypassRolesSection::default(),
            bypass_all_roles: Vec::new(),
        }
    }
}

impl Default for ViolationsSection {
    fn default() -> Self {
        let rules = RuleSettings::default();
        Self {
            kick: rules.kick_at_violation_count,
            ban: rules.ban_at_violation_count,
            reset_after_kick: rules.reset_violations_after_kick,
        }
    }
}

// ============================================================================
// LOADED CONFIGURATION
// ============================================================================

/// Which Discord roles grant which bypass capabilities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BypassRoles {
    grants: Vec<(u64, BypassCapability)>,
    all: Vec<u64>,
}

impl BypassRoles {
    pub fn new(section: &BypassRolesSection, all: &[u64]) -> Self {
        let grants = [
            (&section.swear, BypassCapability::Swear),
            (&section.same, BypassCapability::Same),
            (&section.spam, BypassCapability::Spam),
            (&section.caps, BypassCapability::Caps),
        ]
        .into_iter()
        .flat_map(|(roles, capability)| roles.iter().map(move |role| (*role, capability)))
        .collect();

        Self {
            grants,
            all: all.to_vec(),
        }
    }

    /// Capabilities held by a member with the given roles.
    pub fn capabilities_for(&self, member_roles: &[u64]) -> BypassSet {
        if member_roles.iter().any(|role| self.all.contains(role)) {
            return BypassSet::all();
        }

        self.grants
            .iter()
            .filter(|(role, _)| member_roles.contains(role))
            .map(|(_, capability)| *capability)
            .collect()
    }
}

/// A validated configuration, ready to hand to the engine and the host.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub rules: RuleSet,
    pub language: String,
    pub bypass_roles: BypassRoles,
}

impl TryFrom<FilterConfigFile> for FilterConfig {
    type Error = ConfigError;

    fn try_from(file: FilterConfigFile) -> Result<Self, Self::Error> {
        let rules = RuleSettings {
            blocked_terms: file.blocked_terms,
            ignore_spaces_when_matching: file.ignore_spaces,
            show_matched_term: file.show_blocked,
            uppercase_ratio_threshold: file.uppercase_percentage,
            minimum_length_for_caps_check: file.minimum_chars,
            minimum_seconds_between_messages: file.waiting_time_secs,
            kick_at_violation_count: file.violations.kick,
            ban_at_violation_count: file.violations.ban,
            reset_violations_after_kick: file.violations.reset_after_kick,
        }
        .build()?;

        Ok(Self {
            rules,
            language: file.language,
            bypass_roles: BypassRoles::new(&file.bypass_roles, &file.bypass_all_roles),
        })
    }
}

// ============================================================================
// STORE
// ============================================================================

/// Reads the filter configuration from a JSON file.
pub struct JsonFilterConfigStore {
    path: PathBuf,
}

impl JsonFilterConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and validate the configuration.
    ///
    /// If the file doesn't exist yet, the defaults are written to it first so
    /// admins have something to edit.
    pub fn load(&self) -> Result<FilterConfig, ConfigError> {
        let file = if self.path.exists() {
            self.read()?
        } else {
            tracing::info!(path = %self.path.display(), "No filter config found, writing defaults");
            let defaults = FilterConfigFile::default();
            self.write(&defaults)?;
            defaults
        };

        FilterConfig::try_from(file)
    }

    fn read(&self) -> Result<FilterConfigFile, ConfigError> {
        let file = File::open(&self.path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", self.path.display(), e)))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| ConfigError::Parse(format!("{}: {}", self.path.display(), e)))
    }

    fn write(&self, contents: &FilterConfigFile) -> Result<(), ConfigError> {
        let io_error = |e: std::io::Error| ConfigError::Io(format!("{}: {}", self.path.display(), e));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let file = File::create(&self.path).map_err(io_error)?;
        serde_json::to_writer_pretty(file, contents)
            .map_err(|e| ConfigError::Io(format!("{}: {}", self.path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_config(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("filter_config.json");
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("filter_config.json");
        let store = JsonFilterConfigStore::new(&path);

        let config = store.load().unwrap();

        assert!(path.exists());
        assert_eq!(config.rules, RuleSet::default());
        assert_eq!(config.language, "en");

        // The written file loads back to the same thing
        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.rules, config.rules);
    }

    #[test]
    fn test_partial_file_uses_defaults_for_the_rest() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"{
                "language": "de",
                "blocked_terms": ["Mist"],
                "violations": { "kick": 3, "ban": 6 }
            }"#,
        );

        let config = JsonFilterConfigStore::new(path).load().unwrap();

        assert_eq!(config.language, "de");
        assert_eq!(config.rules.blocked_terms(), ["mist"]);
        assert_eq!(config.rules.kick_at_violation_count(), 3);
        assert_eq!(config.rules.ban_at_violation_count(), 6);
        assert!(config.rules.reset_violations_after_kick());
        assert_eq!(config.rules.minimum_seconds_between_messages(), 2);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = tempdir().unwrap();

        let path = write_config(dir.path(), r#"{ "uppercase_percentage": 1.5 }"#);
        let result = JsonFilterConfigStore::new(path).load();
        assert!(matches!(result, Err(ConfigError::InvalidRatio(_))));

        let path = write_config(dir.path(), r#"{ "waiting_time_secs": -1 }"#);
        let result = JsonFilterConfigStore::new(path).load();
        assert!(matches!(result, Err(ConfigError::Parse(_))));

        let path = write_config(dir.path(), r#"{ "badwords": ["typo"] }"#);
        let result = JsonFilterConfigStore::new(path).load();
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_bypass_roles() {
        let section = BypassRolesSection {
            swear: vec![10],
            caps: vec![10, 20],
            ..Default::default()
        };
        let roles = BypassRoles::new(&section, &[99]);

        let set = roles.capabilities_for(&[10]);
        assert!(set.contains(BypassCapability::Swear));
        assert!(set.contains(BypassCapability::Caps));
        assert!(!set.contains(BypassCapability::Spam));

        let set = roles.capabilities_for(&[20, 30]);
        assert!(set.contains(BypassCapability::Caps));
        assert!(!set.contains(BypassCapability::Swear));

        assert_eq!(roles.capabilities_for(&[99]), BypassSet::all());
        assert!(roles.capabilities_for(&[]).is_empty());
    }
}
