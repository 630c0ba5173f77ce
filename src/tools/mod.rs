//! Tool functions exposed to the agent
//!
//! Every tool returns a [`ToolResponse`]; errors never escape a tool and are
//! reported as `status: "error"` with the error text.

pub mod corpus;
pub mod documents;
pub mod hsn;

use crate::config::Config;
use crate::corpus::{create_service, CorpusService};
use crate::error::{Error, Result};
use crate::session::Session;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Outcome class of a tool call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Success,
    Info,
    Warning,
    Error,
    PatternSuggestions,
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::PatternSuggestions => "pattern_suggestions",
        };
        f.write_str(name)
    }
}

/// Structured result handed back to the agent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResponse {
    pub status: ToolStatus,
    pub message: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ToolResponse {
    pub fn new(status: ToolStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            fields: Map::new(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(ToolStatus::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(ToolStatus::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(ToolStatus::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ToolStatus::Error, message)
    }

    /// Attach a payload field
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn is_error(&self) -> bool {
        self.status == ToolStatus::Error
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Everything a tool call can touch
pub struct ToolContext {
    pub config: Config,
    pub session: Session,
    service: std::result::Result<Arc<dyn CorpusService>, String>,
}

impl ToolContext {
    /// Build a context with the corpus service selected by `config`
    ///
    /// A service that cannot be built only disables the corpus tools; the
    /// HSN tools keep working.
    pub fn new(config: Config) -> Self {
        let service = create_service(&config).map_err(|e| {
            warn!("Corpus service unavailable: {}", e);
            e.to_string()
        });
        Self::build(config, service)
    }

    /// Build a context around an existing service
    pub fn with_service(config: Config, service: Arc<dyn CorpusService>) -> Self {
        Self::build(config, Ok(service))
    }

    fn build(
        config: Config,
        service: std::result::Result<Arc<dyn CorpusService>, String>,
    ) -> Self {
        let session = Session::new(&config.hsn.master_path);
        Self {
            config,
            session,
            service,
        }
    }

    pub fn service(&self) -> Result<&dyn CorpusService> {
        match &self.service {
            Ok(service) => Ok(service.as_ref()),
            Err(reason) => Err(Error::Other(format!(
                "Corpus service unavailable: {}",
                reason
            ))),
        }
    }
}
