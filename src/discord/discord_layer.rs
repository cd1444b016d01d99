// Discord layer - commands and event handlers.
//
// Everything here translates between Discord and the core chat filter.
// The shared `Data` lives here too, since both the message hook and the
// slash commands need it.

#[path = "moderation/mod.rs"]
pub mod moderation;

use crate::core::moderation::{ConfigError, ModerationEngine, ModerationOutcome, RuleSet};
use crate::infra::moderation::{BypassRoles, JsonFilterConfigStore, MessageCatalog};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Everything one reload produces. Rules, texts and bypass roles are only
/// ever swapped together.
pub struct FilterSnapshot {
    pub rules: Arc<RuleSet>,
    pub catalog: MessageCatalog,
    pub bypass_roles: BypassRoles,
}

/// Shared state handed to every command and event handler.
pub struct Data {
    pub engine: Arc<ModerationEngine>,
    config_store: JsonFilterConfigStore,
    languages_dir: PathBuf,
    // Held for writing while the engine's rules are replaced, so readers
    // always see the engine and the snapshot agree.
    snapshot: RwLock<Arc<FilterSnapshot>>,
}

impl Data {
    /// Load configuration and language bundles and build the shared state.
    pub fn load(
        config_store: JsonFilterConfigStore,
        languages_dir: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let languages_dir = languages_dir.into();
        let snapshot = Self::load_snapshot(&config_store, &languages_dir)?;

        Ok(Self {
            engine: Arc::new(ModerationEngine::new(Arc::clone(&snapshot.rules))),
            config_store,
            languages_dir,
            snapshot: RwLock::new(Arc::new(snapshot)),
        })
    }

    fn load_snapshot(
        config_store: &JsonFilterConfigStore,
        languages_dir: &Path,
    ) -> Result<FilterSnapshot, ConfigError> {
        let config = config_store.load()?;
        let catalog = MessageCatalog::load(languages_dir, &config.language)?;

        Ok(FilterSnapshot {
            rules: Arc::new(config.rules),
            catalog,
            bypass_roles: config.bypass_roles,
        })
    }

    pub fn snapshot(&self) -> Arc<FilterSnapshot> {
        let snapshot = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&snapshot)
    }

    /// Run a member's message through the engine.
    ///
    /// Returns the snapshot the verdict was reached with, so notices are
    /// rendered with the same rules and texts even if a reload lands while
    /// enforcement is still running.
    pub fn evaluate(
        &self,
        member_key: &str,
        raw_message: &str,
        member_roles: &[u64],
        now: DateTime<Utc>,
    ) -> (Arc<FilterSnapshot>, ModerationOutcome) {
        let snapshot = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        let bypass = snapshot.bypass_roles.capabilities_for(member_roles);
        let outcome = self.engine.evaluate(member_key, raw_message, &bypass, now);

        (Arc::clone(&snapshot), outcome)
    }

    /// Re-read everything from disk and swap it in.
    ///
    /// Nothing changes unless both the config and the language bundles load.
    pub fn reload(&self) -> Result<Arc<FilterSnapshot>, ConfigError> {
        let fresh = Arc::new(Self::load_snapshot(&self.config_store, &self.languages_dir)?);

        let mut current = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        self.engine.replace_rules(Arc::clone(&fresh.rules));
        *current = Arc::clone(&fresh);
        drop(current);

        tracing::debug!(path = %self.config_store.path().display(), "Chat filter snapshot swapped");
        Ok(fresh)
    }
}
