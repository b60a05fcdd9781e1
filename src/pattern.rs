// Minimal pattern language for `find`/`find_loop`, spec §4.3. §4.3's
// prose ("a small pattern language over the printed form") is the only
// guidance; resolved per DESIGN.md as literal text matching against the
// deterministic printer's output, with `_` as a single-token wildcard and
// `...` as a gap matching zero or more tokens. Tokenization follows the
// printer's own whitespace/punctuation conventions so a pattern written
// against `print_stmt`'s output round-trips without surprises.

use crate::error::ParseFragmentError;

#[derive(Clone, Debug, PartialEq)]
enum Tok {
    Wildcard,
    Gap,
    Lit(String),
}

/// A compiled pattern: a sequence of tokens to match against a
/// whitespace-tokenized rendering of a printed statement or expression.
#[derive(Clone, Debug)]
pub struct Pattern {
    toks: Vec<Tok>,
}

pub fn parse(src: &str) -> Result<Pattern, ParseFragmentError> {
    if src.trim().is_empty() {
        return Err(ParseFragmentError { pattern: src.to_string(), reason: "empty pattern".to_string() });
    }
    let toks = tokenize(src)
        .into_iter()
        .map(|t| match t.as_str() {
            "_" => Tok::Wildcard,
            "..." => Tok::Gap,
            other => Tok::Lit(other.to_string()),
        })
        .collect();
    Ok(Pattern { toks })
}

fn tokenize(src: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let flush = |cur: &mut String, out: &mut Vec<String>| {
        if !cur.is_empty() {
            out.push(std::mem::take(cur));
        }
    };
    let mut chars = src.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => flush(&mut cur, &mut out),
            '(' | ')' | '[' | ']' | ':' | ',' => {
                flush(&mut cur, &mut out);
                out.push(c.to_string());
            }
            '.' if chars.peek() == Some(&'.') => {
                flush(&mut cur, &mut out);
                chars.next();
                chars.next();
                out.push("...".to_string());
            }
            _ => cur.push(c),
        }
    }
    flush(&mut cur, &mut out);
    out
}

impl Pattern {
    /// Does the tokenized form of `text` match this pattern? `_` consumes
    /// exactly one token; `...` consumes a minimal run of zero or more.
    pub fn matches(&self, text: &str) -> bool {
        let tokens = tokenize(text);
        match_from(&self.toks, &tokens)
    }
}

fn match_from(pat: &[Tok], toks: &[String]) -> bool {
    match pat.first() {
        None => toks.is_empty(),
        Some(Tok::Lit(s)) => match toks.first() {
            Some(t) if t == s => match_from(&pat[1..], &toks[1..]),
            _ => false,
        },
        Some(Tok::Wildcard) => {
            if toks.is_empty() {
                false
            } else {
                match_from(&pat[1..], &toks[1..])
            }
        }
        Some(Tok::Gap) => {
            for split in 0..=toks.len() {
                if match_from(&pat[1..], &toks[split..]) {
                    return true;
                }
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_pattern_matches_exact_text() {
        let p = parse("x = 0").unwrap();
        assert!(p.matches("x = 0"));
        assert!(!p.matches("x = 1"));
    }

    #[test]
    fn wildcard_matches_single_token() {
        let p = parse("_ = 0").unwrap();
        assert!(p.matches("x = 0"));
        assert!(!p.matches("x y = 0"));
    }

    #[test]
    fn gap_matches_any_run_of_tokens() {
        let p = parse("for i in seq ( 0 , ... ) :").unwrap();
        assert!(p.matches("for i in seq(0, N):"));
        assert!(p.matches("for i in seq(0, (N + 1)):"));
    }

    #[test]
    fn empty_pattern_is_rejected() {
        assert!(parse("").is_err());
    }
}
