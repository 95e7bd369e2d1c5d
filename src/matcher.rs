//! Mask matching primitives for X-lines.
//!
//! Two matching modes are supported:
//! - **Wildcards**: `*` matches any run of characters (including none),
//!   `?` matches exactly one character.
//! - **Regular expressions**: compiled once when the X-line is built and
//!   always evaluated as a full-string match.
//!
//! Everything here is pure. Nothing panics on odd input and nothing compiles
//! a pattern on the matching path.

use regex::{Regex, RegexBuilder};

/// Convert a single character to IRC lowercase using RFC 1459 case mapping.
///
/// In addition to ASCII lowercase conversion, this maps:
/// - `[` → `{`
/// - `]` → `}`
/// - `\` → `|`
/// - `~` → `^`
#[inline]
pub const fn irc_lower_char(c: char) -> char {
    match c {
        'A'..='Z' => c.to_ascii_lowercase(),
        '[' => '{',
        ']' => '}',
        '\\' => '|',
        '~' => '^',
        _ => c,
    }
}

/// Convert a string to IRC lowercase using RFC 1459 case mapping.
pub fn irc_to_lower(s: &str) -> String {
    s.chars().map(irc_lower_char).collect()
}

/// Compare two strings using RFC 1459 case-insensitive comparison.
pub fn irc_eq(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .chars()
            .zip(b.chars())
            .all(|(ca, cb)| irc_lower_char(ca) == irc_lower_char(cb))
}

/// Match `candidate` against a wildcard `pattern`.
///
/// - `case_sensitive`: compare characters exactly.
/// - `channel_style`: fold with RFC 1459 casemapping instead of Unicode
///   lowercasing. Channel names and realnames are compared this way.
pub fn match_mask(candidate: &str, pattern: &str, case_sensitive: bool, channel_style: bool) -> bool {
    let fold = |s: &str| -> Vec<char> {
        if case_sensitive {
            s.chars().collect()
        } else if channel_style {
            s.chars().map(irc_lower_char).collect()
        } else {
            s.chars().flat_map(char::to_lowercase).collect()
        }
    };

    glob(&fold(pattern), &fold(candidate))
}

/// Case-insensitive wildcard match, the default for nick/ident/host fields.
#[inline]
pub fn wildcard_match(candidate: &str, pattern: &str) -> bool {
    match_mask(candidate, pattern, false, false)
}

/// Compile an X-line regex so that it only ever matches the whole input.
pub fn compile_anchored(source: &str, case_insensitive: bool) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&format!("^(?:{source})$"))
        .case_insensitive(case_insensitive)
        .build()
}

/// Full-string match against a regex built by [`compile_anchored`].
#[inline]
pub fn regex_match(candidate: &str, compiled: &Regex) -> bool {
    compiled.is_match(candidate)
}

/// Iterative glob matcher with single-star backtracking.
fn glob(pattern: &[char], text: &[char]) -> bool {
    let (mut p, mut t) = (0, 0);
    // (pattern index after the last '*', text index it was tried at)
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                p += 1;
                backtrack = Some((p, t));
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star_p, star_t)) => {
                    p = star_p;
                    t = star_t + 1;
                    backtrack = Some((star_p, t));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_basics() {
        assert!(wildcard_match("anything", "*"));
        assert!(wildcard_match("", "*"));
        assert!(wildcard_match("baduser", "bad*"));
        assert!(wildcard_match("unittest", "*test"));
        assert!(wildcard_match("test", "te?t"));
        assert!(!wildcard_match("tests", "te?t"));
        assert!(!wildcard_match("", "?"));
        assert!(wildcard_match("node1.evil.example", "*.evil.example"));
        assert!(!wildcard_match("evil.example", "*.evil.example"));
    }

    #[test]
    fn test_wildcard_backtracking() {
        assert!(wildcard_match("abcabcabd", "*abd"));
        assert!(wildcard_match("aaa", "a*a*a"));
        assert!(!wildcard_match("aa", "a*a*a"));
        assert!(wildcard_match("mississippi", "m*iss*ppi"));
    }

    #[test]
    fn test_case_handling() {
        assert!(wildcard_match("BadUser", "bad*"));
        assert!(!match_mask("BadUser", "bad*", true, false));
        assert!(match_mask("BadUser", "Bad*", true, false));
        assert!(match_mask("Ünïcode", "ü*", false, false));
    }

    #[test]
    fn test_channel_style_casemap() {
        assert!(match_mask("#Chan[1]", "#chan{*}", false, true));
        assert!(!match_mask("#Chan[1]", "#chan{*}", false, false));
        assert!(match_mask("#EVILCHAN", "#evil*", false, true));
    }

    #[test]
    fn test_irc_casemap_helpers() {
        assert_eq!(irc_to_lower("Nick\\Away[1]~"), "nick|away{1}^");
        assert!(irc_eq("#channel[1]", "#CHANNEL{1}"));
        assert!(!irc_eq("short", "longer"));
    }

    #[test]
    fn test_regex_is_full_match() {
        let re = compile_anchored("bad", false).unwrap();
        assert!(regex_match("bad", &re));
        assert!(!regex_match("baduser", &re));

        let re = compile_anchored("a|ab", false).unwrap();
        assert!(regex_match("ab", &re));

        let re = compile_anchored("^H4x0r$", true).unwrap();
        assert!(regex_match("h4x0r", &re));
    }

    #[test]
    fn test_compile_rejects_bad_source() {
        assert!(compile_anchored("(unclosed", false).is_err());
    }
}
