// Moderation infra - configuration file and language bundles for the chat filter.

pub mod json_filter_config;
pub mod message_catalog;

pub use json_filter_config::{BypassRoles, JsonFilterConfigStore};
pub use message_catalog::MessageCatalog;
