use log::{debug, trace};
use crate::core::config::{Config, MAXENTRYPOS, MAXNUMPOS, MAXSTRLEN, MAXSTRPOS, POS_SIZE};
use crate::core::error::{Error, ErrorKind, Result};
use crate::vector::compact::{CompactVector, VectorWriter};
use crate::vector::entry::align2;
use crate::vector::position::WordPos;

/// Staged token: where its bytes sit in the builder buffer, plus positions.
#[derive(Debug, Clone)]
struct StagedToken {
    offset: usize,
    len: usize,
    positions: Vec<WordPos>,
}

/// Accumulates (lexeme, positions) pairs and emits a sorted, deduplicated
/// [`CompactVector`].
///
/// Sorting and merging happen once in [`VectorBuilder::finish`]; size limits
/// are checked as tokens arrive so oversized input fails early.
pub struct VectorBuilder {
    buffer: Vec<u8>,
    tokens: Vec<StagedToken>,
}

impl VectorBuilder {
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    pub fn with_config(config: &Config) -> Self {
        VectorBuilder {
            buffer: Vec::with_capacity(config.initial_buffer_capacity),
            tokens: Vec::with_capacity(config.initial_token_capacity),
        }
    }

    /// Stage one token. Fails with `TokenTooLong` if the lexeme has
    /// `MAXSTRLEN` bytes or more, `PayloadTooLong` once the staged bytes pass
    /// `MAXSTRPOS`.
    pub fn push(&mut self, lexeme: &[u8], positions: &[WordPos]) -> Result<()> {
        if lexeme.len() >= MAXSTRLEN {
            return Err(Error::new(
                ErrorKind::TokenTooLong,
                format!("word is too long ({} bytes, max {} bytes)", lexeme.len(), MAXSTRLEN - 1),
            ));
        }
        self.stage(lexeme, positions.to_vec())
    }

    /// Stage without the per-token length rule. Wire receive admits lexemes
    /// of exactly `MAXSTRLEN` bytes and repairs entry order through here.
    pub(crate) fn stage(&mut self, lexeme: &[u8], positions: Vec<WordPos>) -> Result<()> {
        let staged = self.buffer.len() + lexeme.len();
        if staged > MAXSTRPOS {
            return Err(Error::new(
                ErrorKind::PayloadTooLong,
                format!("string is too long for tsvector ({} bytes, max {} bytes)", staged, MAXSTRPOS),
            ));
        }
        self.tokens.push(StagedToken {
            offset: self.buffer.len(),
            len: lexeme.len(),
            positions,
        });
        self.buffer.extend_from_slice(lexeme);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Lexeme bytes staged so far, duplicates included.
    pub fn staged_bytes(&self) -> usize {
        self.buffer.len()
    }

    pub fn finish(self) -> Result<CompactVector> {
        if self.tokens.is_empty() {
            return Ok(CompactVector::empty());
        }
        let staged = self.tokens.len();
        let (unique, payload_len) = unique_entries(&self.buffer, self.tokens);
        debug!("merged {} staged tokens into {} lexemes ({} payload bytes)", staged, unique.len(), payload_len);

        if payload_len > MAXSTRPOS {
            return Err(Error::new(
                ErrorKind::PayloadTooLong,
                format!("string is too long for tsvector ({} bytes, max {} bytes)", payload_len, MAXSTRPOS),
            ));
        }

        let mut writer = VectorWriter::new(unique.len(), payload_len)?;
        for token in &unique {
            writer.push(&self.buffer[token.offset..token.offset + token.len], &token.positions)?;
        }
        Ok(writer.finish())
    }
}

impl Default for VectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable-sort tokens by lexeme bytes, merge equal neighbours and normalize
/// every position list. Returns the survivors and the byte-area size they need.
fn unique_entries(buffer: &[u8], mut tokens: Vec<StagedToken>) -> (Vec<StagedToken>, usize) {
    let bytes_of = |t: &StagedToken| &buffer[t.offset..t.offset + t.len];
    tokens.sort_by(|a, b| bytes_of(a).cmp(bytes_of(b)));

    let mut unique: Vec<StagedToken> = Vec::with_capacity(tokens.len());
    for token in tokens {
        match unique.last_mut() {
            Some(last) if bytes_of(&*last) == bytes_of(&token) => {
                last.positions.extend_from_slice(&token.positions);
            }
            _ => unique.push(token),
        }
    }

    let mut payload_len = 0;
    for token in &mut unique {
        payload_len += token.len;
        if !token.positions.is_empty() {
            unique_positions(&mut token.positions);
            payload_len = align2(payload_len) + token.positions.len() * POS_SIZE;
        }
    }
    (unique, payload_len)
}

/// Sort by offset and collapse duplicate offsets, keeping the highest weight.
///
/// The list is cut silently at `MAXNUMPOS` positions, and nothing is kept
/// after the largest representable offset.
fn unique_positions(positions: &mut Vec<WordPos>) {
    if positions.len() <= 1 {
        return;
    }
    positions.sort_by(|a, b| a.cmp_offset(b));

    let total = positions.len();
    let mut kept = 1;
    for i in 1..total {
        let current = positions[i];
        let last = positions[kept - 1];
        if current.same_token(&last) {
            if current.weight() > last.weight() {
                positions[kept - 1] = last.with_weight(current.weight());
            }
            continue;
        }
        if kept >= MAXNUMPOS || last.offset() == MAXENTRYPOS - 1 {
            trace!("dropping {} positions past the per-lexeme limit", total - i);
            break;
        }
        positions[kept] = current;
        kept += 1;
    }
    positions.truncate(kept);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::position::Weight;

    fn pos(offset: u16, weight: Weight) -> WordPos {
        WordPos::new(offset, weight).unwrap()
    }

    fn collect(vector: &CompactVector) -> Vec<(Vec<u8>, Vec<WordPos>)> {
        vector
            .iter()
            .map(|lex| (lex.bytes().to_vec(), lex.positions().collect()))
            .collect()
    }

    #[test]
    fn sorts_by_raw_bytes() {
        let mut builder = VectorBuilder::new();
        builder.push(b"dog", &[]).unwrap();
        builder.push(b"Zebra", &[]).unwrap();
        builder.push(b"ab", &[]).unwrap();
        builder.push(b"abc", &[]).unwrap();
        let vector = builder.finish().unwrap();
        let lexemes: Vec<_> = collect(&vector).into_iter().map(|(b, _)| b).collect();
        assert_eq!(lexemes, vec![b"Zebra".to_vec(), b"ab".to_vec(), b"abc".to_vec(), b"dog".to_vec()]);
    }

    #[test]
    fn merging_keeps_the_higher_weight() {
        let mut builder = VectorBuilder::new();
        builder.push(b"cat", &[pos(2, Weight::B)]).unwrap();
        builder.push(b"cat", &[pos(2, Weight::A)]).unwrap();
        let vector = builder.finish().unwrap();
        assert_eq!(collect(&vector), vec![(b"cat".to_vec(), vec![pos(2, Weight::A)])]);
    }

    #[test]
    fn merging_with_an_unpositioned_duplicate() {
        let mut builder = VectorBuilder::new();
        builder.push(b"cat", &[]).unwrap();
        builder.push(b"cat", &[pos(4, Weight::D), pos(1, Weight::C)]).unwrap();
        builder.push(b"cat", &[]).unwrap();
        let vector = builder.finish().unwrap();
        assert_eq!(
            collect(&vector),
            vec![(b"cat".to_vec(), vec![pos(1, Weight::C), pos(4, Weight::D)])]
        );
    }

    #[test]
    fn single_token_positions_are_normalized() {
        let mut builder = VectorBuilder::new();
        builder.push(b"a", &[pos(3, Weight::D), pos(1, Weight::D), pos(3, Weight::C)]).unwrap();
        let vector = builder.finish().unwrap();
        assert_eq!(collect(&vector), vec![(b"a".to_vec(), vec![pos(1, Weight::D), pos(3, Weight::C)])]);
    }

    #[test]
    fn merged_positions_are_truncated_silently() {
        let mut builder = VectorBuilder::new();
        let first: Vec<_> = (1..=200).map(|i| pos(i, Weight::D)).collect();
        let second: Vec<_> = (150..=400).map(|i| pos(i, Weight::B)).collect();
        builder.push(b"many", &first).unwrap();
        builder.push(b"many", &second).unwrap();
        let vector = builder.finish().unwrap();

        let (_, positions) = &collect(&vector)[0];
        assert_eq!(positions.len(), MAXNUMPOS);
        assert_eq!(positions.first().unwrap().offset(), 1);
        assert_eq!(positions.last().unwrap().offset(), MAXNUMPOS as u16);
        // Overlapping offsets picked up the heavier weight before the cut
        assert_eq!(positions[149].weight(), Weight::B);
        assert_eq!(positions[148].weight(), Weight::D);
    }

    #[test]
    fn nothing_follows_the_largest_offset() {
        let mut positions = vec![pos(WordPos::MAX_OFFSET, Weight::C), pos(WordPos::MAX_OFFSET, Weight::A)];
        unique_positions(&mut positions);
        assert_eq!(positions, vec![pos(WordPos::MAX_OFFSET, Weight::A)]);
    }

    #[test]
    fn too_long_token_fails() {
        let mut builder = VectorBuilder::new();
        let word = vec![b'x'; MAXSTRLEN];
        let err = builder.push(&word, &[]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenTooLong);

        let word = vec![b'x'; MAXSTRLEN - 1];
        assert!(builder.push(&word, &[]).is_ok());
    }

    #[test]
    fn empty_builder_gives_empty_vector() {
        let vector = VectorBuilder::new().finish().unwrap();
        assert!(vector.is_empty());
        assert_eq!(vector, CompactVector::empty());
    }

    #[test]
    fn payload_length_accounts_for_padding() {
        let mut builder = VectorBuilder::new();
        builder.push(b"abc", &[pos(1, Weight::D)]).unwrap();
        builder.push(b"de", &[]).unwrap();
        builder.push(b"f", &[pos(2, Weight::D)]).unwrap();
        let vector = builder.finish().unwrap();
        // abc(3) pad(1) pos(2) de(2) f(1) pad(1) pos(2)
        assert_eq!(vector.payload_len(), 12);
    }
}
