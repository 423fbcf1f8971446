use std::fmt;
use crate::text::encoding::{CharWidth, Encoding};
use crate::vector::compact::CompactVector;
use crate::vector::entry::Lexeme;

/// Render a vector in its text form: `'lexeme':1A,3 'other'`.
///
/// Every lexeme is quoted; `'` and `\` inside are doubled. Escaping walks the
/// lexeme character by character using `encoding`, so a multi-byte character
/// whose trailing bytes happen to match a quote is copied untouched.
pub fn to_text<E: CharWidth + ?Sized>(vector: &CompactVector, encoding: &E) -> Vec<u8> {
    let mut out = Vec::with_capacity(text_capacity(vector));
    for (i, lexeme) in vector.iter().enumerate() {
        if i > 0 {
            out.push(b' ');
        }
        write_lexeme(&mut out, &lexeme, encoding);
    }
    out
}

/// Upper bound on the rendered size: every byte escaped, every position at
/// full width (5 digits plus weight letter plus separator).
fn text_capacity(vector: &CompactVector) -> usize {
    vector
        .iter()
        .map(|l| l.bytes().len() * 2 + 3 + l.num_positions() * 7)
        .sum()
}

fn write_lexeme<E: CharWidth + ?Sized>(out: &mut Vec<u8>, lexeme: &Lexeme<'_>, encoding: &E) {
    out.push(b'\'');
    let mut rest = lexeme.bytes();
    while !rest.is_empty() {
        let width = encoding.char_len(rest);
        let (ch, tail) = rest.split_at(width);
        if width == 1 && (ch[0] == b'\'' || ch[0] == b'\\') {
            out.push(ch[0]);
        }
        out.extend_from_slice(ch);
        rest = tail;
    }
    out.push(b'\'');

    for (i, pos) in lexeme.positions().enumerate() {
        out.push(if i == 0 { b':' } else { b',' });
        out.extend_from_slice(pos.to_string().as_bytes());
    }
}

impl fmt::Display for CompactVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&to_text(self, &Encoding::Utf8)))
    }
}
