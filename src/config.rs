use crate::render::ViewMode;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for field '{field}': {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required field: {field}")]
    MissingRequired { field: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Navigator service configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct NavConfig {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Items per page when a user has no stored preference
    pub default_per_page: usize,
    /// Result cap for the parent jump search
    pub search_limit: usize,
    /// Document kind the navigator browses
    pub document_kind: String,
    /// Render mode, affects link construction only
    pub view_mode: ViewMode,
    /// Base URL prefix for every emitted link
    pub base_url: String,
}

impl Default for NavConfig {
    fn default() -> Self {
        NavConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            default_per_page: 10,
            search_limit: 10,
            document_kind: "page".to_string(),
            view_mode: ViewMode::Standalone,
            base_url: "/admin".to_string(),
        }
    }
}

impl NavConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.host.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "host".to_string(),
            });
        }
        if self.default_per_page == 0 {
            return Err(ConfigError::InvalidValue {
                field: "default_per_page".to_string(),
                value: self.default_per_page.to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }
        if self.search_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "search_limit".to_string(),
                value: self.search_limit.to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }
        if self.document_kind.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "document_kind".to_string(),
            });
        }
        if !self.base_url.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "base_url".to_string(),
                value: self.base_url.clone(),
                reason: "Must start with '/'".to_string(),
            });
        }
        Ok(())
    }
}
