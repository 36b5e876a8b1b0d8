// In: src/pipeline/plan.rs

//! Stage lists: what a `Pipeline` is built from.
//!
//! A `ChainPlan` lists codec methods in the order bytes flow away from the
//! source. An encoder built from a plan produces a stream that a decoder built
//! from `plan.inverse()` turns back into the original bytes.

use serde::{Deserialize, Serialize};

use crate::error::{Fault, FaultKind};
use crate::kernels::deflate;
use crate::kernels::delta::{MAX_DISTANCE, MIN_DISTANCE};
use crate::types::CodecKind;

fn default_zstd_level() -> i32 {
    3
}

fn default_deflate_level() -> u32 {
    6
}

//==================================================================================
// 1. CodecMethod
//==================================================================================

/// One codec plus its parameters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum CodecMethod {
    Copy,
    Delta {
        distance: u16,
    },
    Zstd {
        /// Only used when encoding.
        #[serde(default = "default_zstd_level")]
        level: i32,
    },
    Deflate {
        /// Only used when encoding.
        #[serde(default = "default_deflate_level")]
        level: u32,
    },
}

impl CodecMethod {
    pub fn kind(&self) -> CodecKind {
        match self {
            Self::Copy => CodecKind::Copy,
            Self::Delta { .. } => CodecKind::Delta,
            Self::Zstd { .. } => CodecKind::Zstd,
            Self::Deflate { .. } => CodecKind::Deflate,
        }
    }

    pub fn validate(&self) -> Result<(), Fault> {
        match self {
            Self::Copy => Ok(()),
            Self::Delta { distance } => {
                if (MIN_DISTANCE..=MAX_DISTANCE).contains(distance) {
                    Ok(())
                } else {
                    Err(Fault::invalid_config(format!(
                        "delta distance {} outside {}..={}",
                        distance, MIN_DISTANCE, MAX_DISTANCE
                    )))
                }
            }
            Self::Zstd { level } => {
                let range = zstd::compression_level_range();
                if range.contains(level) {
                    Ok(())
                } else {
                    Err(Fault::invalid_config(format!(
                        "zstd level {} outside {}..={}",
                        level,
                        range.start(),
                        range.end()
                    )))
                }
            }
            Self::Deflate { level } => {
                if *level <= deflate::MAX_LEVEL {
                    Ok(())
                } else {
                    Err(Fault::invalid_config(format!(
                        "deflate level {} above {}",
                        level,
                        deflate::MAX_LEVEL
                    )))
                }
            }
        }
    }

    /// Resolves an archive coder descriptor (7z method id plus property bytes).
    ///
    /// # Errors
    /// `UnsupportedMethod` for an id this crate has no codec for, and
    /// `InvalidConfig` for malformed properties.
    pub fn from_method_id(id: u64, props: &[u8]) -> Result<Self, Fault> {
        let kind = CodecKind::from_method_id(id).ok_or_else(|| {
            Fault::new(
                FaultKind::UnsupportedMethod,
                format!("no codec for method id {:#x}", id),
            )
        })?;
        let method = match kind {
            CodecKind::Copy => Self::Copy,
            CodecKind::Delta => match props {
                // The single property byte stores `distance - 1`.
                [b] => Self::Delta {
                    distance: u16::from(*b) + 1,
                },
                _ => {
                    return Err(Fault::invalid_config(format!(
                        "delta expects 1 property byte, got {}",
                        props.len()
                    )))
                }
            },
            CodecKind::Zstd => Self::Zstd {
                level: default_zstd_level(),
            },
            CodecKind::Deflate => Self::Deflate {
                level: default_deflate_level(),
            },
        };
        Ok(method)
    }
}

//==================================================================================
// 2. ChainPlan
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainPlan {
    pub stages: Vec<CodecMethod>,
}

impl ChainPlan {
    pub fn new(stages: Vec<CodecMethod>) -> Self {
        Self { stages }
    }

    /// Builds a plan from an ordered list of archive coder descriptors.
    pub fn from_coders(coders: &[(u64, Vec<u8>)]) -> Result<Self, Fault> {
        let stages = coders
            .iter()
            .map(|(id, props)| CodecMethod::from_method_id(*id, props))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { stages })
    }

    pub fn from_json(json: &str) -> Result<Self, Fault> {
        let plan: ChainPlan = serde_json::from_str(json)?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn to_json(&self) -> Result<String, Fault> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), Fault> {
        if self.stages.is_empty() {
            return Err(Fault::invalid_config("a chain needs at least one stage"));
        }
        self.stages.iter().try_for_each(CodecMethod::validate)
    }

    /// The same methods in reverse order: the decode chain for an encode chain.
    pub fn inverse(&self) -> Self {
        Self {
            stages: self.stages.iter().rev().cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl From<Vec<CodecMethod>> for ChainPlan {
    fn from(stages: Vec<CodecMethod>) -> Self {
        Self::new(stages)
    }
}
