//! Symbolic-character escape for host identifiers.
//!
//! Operator characters are rewritten to `$`-prefixed opcodes so that any
//! source name becomes a valid host identifier. `decode` is the exact
//! inverse on encoded input; unknown `$`-runs pass through unchanged.

use std::borrow::Cow;

const OPCODES: &[(char, &str)] = &[
    ('~', "$tilde"),
    ('=', "$eq"),
    ('<', "$less"),
    ('>', "$greater"),
    ('!', "$bang"),
    ('#', "$hash"),
    ('%', "$percent"),
    ('^', "$up"),
    ('&', "$amp"),
    ('|', "$bar"),
    ('*', "$times"),
    ('/', "$div"),
    ('+', "$plus"),
    ('-', "$minus"),
    (':', "$colon"),
    ('\\', "$bslash"),
    ('?', "$qmark"),
    ('@', "$at"),
];

fn opcode_for(ch: char) -> Option<&'static str> {
    OPCODES.iter().find(|&&(c, _)| c == ch).map(|&(_, op)| op)
}

/// Escape symbolic characters in an identifier fragment.
pub fn encode(text: &str) -> Cow<'_, str> {
    let first = match text.char_indices().find(|&(_, ch)| opcode_for(ch).is_some()) {
        Some((index, _)) => index,
        None => return Cow::Borrowed(text),
    };
    let mut out = String::with_capacity(text.len() + 8);
    out.push_str(&text[..first]);
    for ch in text[first..].chars() {
        match opcode_for(ch) {
            Some(op) => out.push_str(op),
            None => out.push(ch),
        }
    }
    Cow::Owned(out)
}

/// Undo `encode`. Opcode spellings not produced by `encode` are left
/// untouched.
pub fn decode(text: &str) -> Cow<'_, str> {
    if !text.contains('$') {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    'outer: while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        for &(ch, op) in OPCODES {
            if tail.starts_with(op) {
                out.push(ch);
                rest = &tail[op.len()..];
                continue 'outer;
            }
        }
        out.push('$');
        rest = &tail[1..];
    }
    out.push_str(rest);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_identifiers_borrow() {
        assert!(matches!(encode("foo"), Cow::Borrowed("foo")));
        assert!(matches!(decode("foo"), Cow::Borrowed("foo")));
    }

    #[test]
    fn operators_encode() {
        assert_eq!(encode("+"), "$plus");
        assert_eq!(encode("::"), "$colon$colon");
        assert_eq!(encode("<init>"), "$lessinit$greater");
        assert_eq!(encode("unary_-"), "unary_$minus");
    }

    #[test]
    fn round_trip_is_exact() {
        for text in ["+", "::", "<init>", "unary_-", "<=", "&&", "|@|", "a*b/c"] {
            assert_eq!(decode(&encode(text)), text);
        }
    }

    #[test]
    fn unknown_dollar_runs_pass_through() {
        assert_eq!(decode("Foo$1"), "Foo$1");
        assert_eq!(decode("x$default$1"), "x$default$1");
    }
}
