// Copyright 2025 Cowboy AI, LLC.

//! Engine configuration
//!
//! Every section has serde defaults, so an empty JSON object is a valid
//! configuration.
//!
//! ```rust
//! use blueprint_workflow::WorkflowConfig;
//!
//! let config = WorkflowConfig::from_json_str(r#"{
//!     "bus": { "historyCapacity": 500 },
//!     "executor": { "ruleTimeoutMs": 2000 },
//!     "rules": [ { "id": "task-auto-complete", "enabled": false } ]
//! }"#).unwrap();
//!
//! assert_eq!(config.bus.history_capacity, 500);
//! assert_eq!(config.rules.len(), 1);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{WorkflowError, WorkflowResult};
use crate::infrastructure::BusConfig;
use crate::integration::BridgeConfig;
use crate::workflow::{ExecutorConfig, RuleSetting};

/// Configuration for a [`WorkflowEngine`](crate::WorkflowEngine)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkflowConfig {
    /// Bus settings
    pub bus: BusConfig,

    /// Executor policy
    pub executor: ExecutorConfig,

    /// Domain event bridge settings
    pub bridge: BridgeConfig,

    /// Overrides applied after the standard rules are registered
    pub rules: Vec<RuleSetting>,
}

impl WorkflowConfig {
    /// Parse from a JSON document
    pub fn from_json_str(json: &str) -> WorkflowResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| WorkflowError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from an already decoded JSON value
    pub fn from_json_value(value: serde_json::Value) -> WorkflowResult<Self> {
        let config: Self = serde_json::from_value(value)
            .map_err(|e| WorkflowError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde accepts but the engine cannot run with
    pub fn validate(&self) -> WorkflowResult<()> {
        self.executor.validate()
    }

    /// Read and parse a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> WorkflowResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            WorkflowError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }
}
