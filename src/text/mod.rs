pub mod encoding;
pub mod output;
pub mod scanner;

use std::str::FromStr;
use log::debug;
use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::vector::builder::VectorBuilder;
use crate::vector::compact::CompactVector;

pub use encoding::{CharWidth, Encoding};
pub use output::to_text;
pub use scanner::{ScannedToken, Scanner};

/// Parse the text form with default settings.
pub fn parse(input: &str) -> Result<CompactVector> {
    parse_with(input, &Config::default())
}

/// Parse the text form. The first scanner or builder error aborts the parse.
pub fn parse_with(input: &str, config: &Config) -> Result<CompactVector> {
    let mut builder = VectorBuilder::with_config(config);
    let mut scanner = Scanner::new(input);
    while let Some(token) = scanner.next_token()? {
        builder.push(&token.lexeme, &token.positions)?;
    }
    debug!("parsed {} tokens from {} bytes of text", builder.len(), input.len());
    builder.finish()
}

/// Render with the encoding named in `config`.
pub fn to_text_with(vector: &CompactVector, config: &Config) -> Vec<u8> {
    to_text(vector, &config.encoding)
}

impl FromStr for CompactVector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse(s)
    }
}
