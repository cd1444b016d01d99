// Language bundles for the notices the filter shows to users.
//
// Bundles are nested JSON objects looked up with dotted keys, so
// "blocked.caps" reads `{"blocked": {"caps": "..."}}`.
// Lookup order: selected language -> default language -> the raw key.

use crate::core::moderation::{ConfigError, TextResolver};
use serde_json::Value;
use std::path::Path;

pub const DEFAULT_LANGUAGE: &str = "en";

pub struct MessageCatalog {
    language: String,
    selected: Value,
    fallback: Value,
}

impl MessageCatalog {
    /// Build a catalog from already-parsed bundles.
    pub fn new(language: impl Into<String>, selected: Value, fallback: Value) -> Self {
        Self {
            language: language.into(),
            selected,
            fallback,
        }
    }

    /// Load `<dir>/<language>.json` on top of `<dir>/en.json`.
    ///
    /// The default bundle must exist. A missing selected bundle only logs a
    /// warning; every lookup then falls through to the default language.
    pub fn load(dir: impl AsRef<Path>, language: &str) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();

        let fallback_path = dir.join(format!("{}.json", DEFAULT_LANGUAGE));
        if !fallback_path.exists() {
            return Err(ConfigError::MissingDefaultLanguage(
                fallback_path.display().to_string(),
            ));
        }
        let fallback = read_bundle(&fallback_path)?;

        if language == DEFAULT_LANGUAGE {
            return Ok(Self::new(language, fallback.clone(), fallback));
        }

        let selected_path = dir.join(format!("{}.json", language));
        let selected = if selected_path.exists() {
            read_bundle(&selected_path)?
        } else {
            tracing::warn!(
                language,
                path = %selected_path.display(),
                "Language bundle not found, using the default language"
            );
            Value::Null
        };

        Ok(Self::new(language, selected, fallback))
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    fn lookup<'a>(bundle: &'a Value, key: &str) -> Option<&'a str> {
        key.split('.')
            .try_fold(bundle, |node, part| node.get(part))
            .and_then(Value::as_str)
    }
}

fn read_bundle(path: &Path) -> Result<Value, ConfigError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&contents)
        .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))
}

impl TextResolver for MessageCatalog {
    fn resolve_text(&self, key: &str, substitutions: &[(&str, &str)]) -> String {
        // An empty translation counts as missing; an empty default does not.
        let raw = Self::lookup(&self.selected, key)
            .filter(|text| !text.is_empty())
            .or_else(|| Self::lookup(&self.fallback, key));

        let Some(raw) = raw else {
            return key.to_string();
        };

        substitutions
            .iter()
            .fold(raw.to_string(), |text, (name, value)| {
                text.replace(&format!("{{{}}}", name), value)
            })
    }
}
