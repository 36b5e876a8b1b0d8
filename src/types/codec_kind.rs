//! This module defines the canonical identifiers for the codecs a pipeline can
//! be built from.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 7z coder ids for the methods this crate implements.
pub mod method_ids {
    pub const COPY: u64 = 0x00;
    pub const DELTA: u64 = 0x03;
    pub const DEFLATE: u64 = 0x04_01_08;
    pub const ZSTD: u64 = 0x04_F7_11_01;
}

/// Every codec a `CodecStage` can wrap.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CodecKind {
    Copy,
    Delta,
    Zstd,
    Deflate,
}

impl CodecKind {
    /// The 7z coder id for this codec.
    pub fn method_id(&self) -> u64 {
        match self {
            Self::Copy => method_ids::COPY,
            Self::Delta => method_ids::DELTA,
            Self::Zstd => method_ids::ZSTD,
            Self::Deflate => method_ids::DEFLATE,
        }
    }

    /// Looks up a codec by 7z coder id.
    pub fn from_method_id(id: u64) -> Option<Self> {
        match id {
            method_ids::COPY => Some(Self::Copy),
            method_ids::DELTA => Some(Self::Delta),
            method_ids::ZSTD => Some(Self::Zstd),
            method_ids::DEFLATE => Some(Self::Deflate),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Delta => "delta",
            Self::Zstd => "zstd",
            Self::Deflate => "deflate",
        }
    }

    /// Filters reshape bytes without changing their count.
    pub fn is_filter(&self) -> bool {
        matches!(self, Self::Copy | Self::Delta)
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a stage expands (decodes) or produces (encodes) a coded stream.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Decode,
    Encode,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode => f.write_str("decode"),
            Self::Encode => f.write_str("encode"),
        }
    }
}
