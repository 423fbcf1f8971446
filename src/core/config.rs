use serde::{Deserialize, Serialize};
use crate::core::error::Result;
use crate::text::encoding::Encoding;

/// Lexemes handed to the builder must be shorter than this many bytes.
/// Wire receive accepts lexemes up to and including this length.
pub const MAXSTRLEN: usize = 1 << 11;

/// Upper bound of the shared byte area (lexemes, padding and positions).
pub const MAXSTRPOS: usize = (1 << 30) - 1;

/// Position offsets live in `0..MAXENTRYPOS`.
pub const MAXENTRYPOS: u16 = 1 << 14;

/// Maximum number of positions kept for one lexeme.
pub const MAXNUMPOS: usize = 256;

/// Header bytes in front of the entry array (total size + count word).
pub const HEADER_SIZE: usize = 8;

/// Size of one packed entry, current and legacy alike.
pub const ENTRY_SIZE: usize = 4;

/// Size of one packed position.
pub const POS_SIZE: usize = 2;

/// Largest entry count a vector can carry without its entry array alone
/// overflowing the byte-area ceiling.
pub const MAX_ENTRIES: usize = MAXSTRPOS / ENTRY_SIZE;

/// Tuning knobs. Size limits are the constants above and are not configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub initial_token_capacity: usize,   // Builder staged-token slots
    pub initial_buffer_capacity: usize,  // Builder staged-byte buffer
    pub encoding: Encoding,              // Character rule used when escaping text output
}

impl Default for Config {
    fn default() -> Self {
        Config {
            initial_token_capacity: 64,
            initial_buffer_capacity: 256,
            encoding: Encoding::Utf8,
        }
    }
}

impl Config {
    /// Load from a JSON document; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
