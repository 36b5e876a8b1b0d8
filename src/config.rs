// In: src/config.rs

//! The single source of truth for pipeline tuning.
//!
//! `PipelineConfig` is created once at the application boundary (from a JSON
//! document, a Python keyword set, or `Default`) and handed to the pipeline
//! constructors by reference. Every field has a serde default so a partial
//! document such as `{"cursor_capacity": 4096}` is valid.

use serde::{Deserialize, Serialize};

use crate::error::Fault;

/// Default size of the cursor buffer and the per-stage output scratch.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Upper sanity bound for any configured buffer (32 MiB).
pub const MAX_BUFFER_SIZE: usize = 32 * 1024 * 1024;

//==================================================================================
// I. Policies
//==================================================================================

/// How the top-level driver treats `Signal::NeedsRetry`.
///
/// Faults are never retried; only the transient signal is re-issued, and only
/// at the top of the chain.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct RetryPolicy {
    /// Number of immediate re-issues before `NeedsRetry` is handed to the caller.
    #[serde(default)]
    pub max_retries: u32,
}

//==================================================================================
// II. The Unified PipelineConfig
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Capacity of the `BufferedCursor` in front of every stage.
    #[serde(default = "default_buffer_size")]
    pub cursor_capacity: usize,

    /// Size of each stage's decoded-output scratch buffer.
    #[serde(default = "default_buffer_size")]
    pub stage_buffer_size: usize,

    #[serde(default)]
    pub retry: RetryPolicy,

    /// When set, the CRC-32 of the pipeline output is checked at end of stream.
    #[serde(default)]
    pub expected_crc32: Option<u32>,

    /// When set, the source is wrapped in a `DeadlineSource` with this budget.
    #[serde(default)]
    pub read_timeout_ms: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cursor_capacity: default_buffer_size(),
            stage_buffer_size: default_buffer_size(),
            retry: RetryPolicy::default(),
            expected_crc32: None,
            read_timeout_ms: None,
        }
    }
}

impl PipelineConfig {
    /// Parses and validates a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, Fault> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Fault> {
        check_buffer("cursor_capacity", self.cursor_capacity)?;
        check_buffer("stage_buffer_size", self.stage_buffer_size)?;
        if self.read_timeout_ms == Some(0) {
            return Err(Fault::invalid_config("read_timeout_ms must be positive"));
        }
        Ok(())
    }
}

fn check_buffer(field: &str, value: usize) -> Result<(), Fault> {
    if value == 0 || value > MAX_BUFFER_SIZE {
        return Err(Fault::invalid_config(format!(
            "{} must be in 1..={}, got {}",
            field, MAX_BUFFER_SIZE, value
        )));
    }
    Ok(())
}

/// Helper for `serde` to provide a default for the buffer sizes.
fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}
