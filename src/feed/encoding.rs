// src/feed/encoding.rs

//! Recovery of punctuation lost to a lossy re-encoding.
//!
//! Somewhere upstream the feed text went through an encoding pass that
//! replaced em dashes, curly apostrophes and inch marks with U+FFFD. The
//! original character is gone, so each marker is repaired by a guess from
//! its surrounding context. The guess is intentionally frozen; downstream
//! content depends on this exact behavior.

/// The generic replacement character left behind by the corruption.
pub const MARKER: char = '\u{FFFD}';

const EM_DASH: char = '\u{2014}';
const DOUBLE_PRIME: char = '\u{2033}';
const RIGHT_SINGLE_QUOTE: char = '\u{2019}';

/// Repair every replacement marker in `input`.
///
/// Context for each marker is read from the original string, never from
/// partially substituted output, so neighboring markers cannot cascade.
/// Strings without a marker are returned unchanged.
pub fn recover_text(input: &str) -> String {
    if !input.contains(MARKER) {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut prev: Option<char> = None;
    for (pos, c) in input.char_indices() {
        if c == MARKER {
            let after = &input[pos + MARKER.len_utf8()..];
            out.push(guess(prev, after));
        } else {
            out.push(c);
        }
        prev = Some(c);
    }

    // The corruption also left stray spaces before punctuation.
    out.replace(" ,", ",").replace(" .", ".")
}

/// Pick a replacement from the characters around a marker.
fn guess(before: Option<char>, after: &str) -> char {
    let next = after.chars().next();
    match before {
        // "word <marker> word": spaced em dash
        Some(' ') if after.starts_with(' ') => EM_DASH,
        // "20<marker> wheels": a number followed by an inch mark
        Some(b) if b.is_ascii_digit() && is_unit_boundary(next) => DOUBLE_PRIME,
        // contractions and possessives: don't, dealer's
        Some(b) if b.is_alphabetic() => RIGHT_SINGLE_QUOTE,
        // elided decades: '90s
        _ if next.is_some_and(|c| c.is_ascii_digit()) => RIGHT_SINGLE_QUOTE,
        _ => RIGHT_SINGLE_QUOTE,
    }
}

fn is_unit_boundary(next: Option<char>) -> bool {
    match next {
        None => true,
        Some(c) => c.is_whitespace() || matches!(c, '"' | '\'' | ',' | '.' | ')'),
    }
}
