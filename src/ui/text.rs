//! Display-width helpers for styled text.
//!
//! Widget content carries ANSI styling (from crossterm `StyledContent`), so
//! byte or char counts are useless for layout. Everything here measures in
//! terminal columns: escape sequences are zero-width and wide characters
//! take two columns.

use unicode_width::UnicodeWidthChar;

const ESC: char = '\x1b';

/// Byte length of the escape sequence at the start of `s` (which begins
/// with ESC). Handles CSI, OSC/DCS/PM/APC string sequences and plain
/// two-character escapes. Unterminated sequences consume the rest.
fn escape_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let len = bytes.len();
    if len < 2 {
        return len;
    }
    match bytes[1] {
        b'[' => {
            let mut i = 2;
            while i < len {
                let b = bytes[i];
                if (0x40..=0x7E).contains(&b) {
                    return i + 1;
                }
                if !(0x20..=0x7E).contains(&b) {
                    return i;
                }
                i += 1;
            }
            len
        }
        b']' | b'P' | b'^' | b'_' => {
            let mut i = 2;
            while i < len {
                match bytes[i] {
                    0x07 => return i + 1,
                    0x1B if i + 1 < len && bytes[i + 1] == b'\\' => return i + 2,
                    _ => i += 1,
                }
            }
            len
        }
        // ESC is ASCII, so the following char boundary is at 1 + its width
        _ => 1 + s[1..].chars().next().map(char::len_utf8).unwrap_or(0),
    }
}

/// A piece of styled text: either an escape sequence or a visible char
enum Token<'a> {
    Escape(&'a str),
    Char(char),
}

fn tokens(s: &str) -> impl Iterator<Item = Token<'_>> {
    let mut rest = s;
    std::iter::from_fn(move || {
        let c = rest.chars().next()?;
        if c == ESC {
            let n = escape_len(rest);
            let (seq, tail) = rest.split_at(n);
            rest = tail;
            Some(Token::Escape(seq))
        } else {
            rest = &rest[c.len_utf8()..];
            Some(Token::Char(c))
        }
    })
}

/// Column width of a single visible char; control chars take none
fn char_width(c: char) -> usize {
    c.width().unwrap_or(0)
}

/// Number of terminal columns `s` occupies
pub fn display_width(s: &str) -> usize {
    tokens(s)
        .map(|t| match t {
            Token::Escape(_) => 0,
            Token::Char(c) => char_width(c),
        })
        .sum()
}

/// Right-pad `s` with spaces up to `width` columns
pub fn pad_to_width(s: &str, width: usize) -> String {
    let w = display_width(s);
    let mut out = String::with_capacity(s.len() + width.saturating_sub(w));
    out.push_str(s);
    out.extend(std::iter::repeat(' ').take(width.saturating_sub(w)));
    out
}

/// Cut the columns `[skip, skip + width)` out of `s`.
///
/// Escape sequences are kept wherever they occur so styling that starts
/// before the window, or a reset after it, still applies. A wide char cut
/// by either edge becomes spaces. The result is at most `width` columns;
/// pad it with [`pad_to_width`] to get an exact fit.
pub fn slice_columns(s: &str, skip: usize, width: usize) -> String {
    let end = skip + width;
    let mut out = String::with_capacity(s.len());
    let mut col = 0;

    for token in tokens(s) {
        match token {
            Token::Escape(seq) => out.push_str(seq),
            Token::Char(c) => {
                let w = char_width(c);
                if w == 0 {
                    continue;
                }
                let next = col + w;
                if col >= skip && next <= end {
                    out.push(c);
                } else if col < skip && next > skip {
                    // Straddles the left edge
                    let visible = (next - skip).min(width);
                    out.extend(std::iter::repeat(' ').take(visible));
                } else if col < end && next > end {
                    // Straddles the right edge
                    out.extend(std::iter::repeat(' ').take(end - col));
                }
                col = next;
            }
        }
    }
    out
}

/// Fit a content line into a row: scroll `skip` columns, then pad or cut
/// to exactly `width` columns.
pub fn fit_to_width(s: &str, skip: usize, width: usize) -> String {
    pad_to_width(&slice_columns(s, skip, width), width)
}
