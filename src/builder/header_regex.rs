use super::BuildError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderMatchKind {
    Exact,
    Prefix,
    Contains,
}

/// Interprets the restricted regex subset the mesh header matching can
/// express. Hand-written on purpose: the grammar is small enough that a full
/// regex engine would only obscure which inputs are accepted.
///
/// Accepted shapes, after an optional leading `(?i)` that clears the
/// case-sensitive flag:
///
/// * `^literal$` -> exact
/// * `^literal`  -> prefix
/// * `literal`   -> contains
/// * `$` or `^$` -> exact empty value
/// * `^` or ``   -> case-insensitive prefix of the empty value
///
/// where `literal` is `[A-Za-z0-9_-]+`. Anything else (groups, alternation,
/// quantifiers, escapes, spaces, a trailing-only anchor) is rejected.
pub fn parse_header_regex(pattern: &str) -> Result<(HeaderMatchKind, bool, String), BuildError> {
    let (case_sensitive, rest) = match pattern.strip_prefix("(?i)") {
        Some(rest) => (false, rest),
        None => (true, pattern),
    };

    match rest {
        "" | "^" => return Ok((HeaderMatchKind::Prefix, false, String::new())),
        "$" | "^$" => return Ok((HeaderMatchKind::Exact, false, String::new())),
        _ => {},
    }

    let (kind, literal) = match rest.strip_prefix('^') {
        Some(anchored) => match anchored.strip_suffix('$') {
            Some(literal) => (HeaderMatchKind::Exact, literal),
            None => (HeaderMatchKind::Prefix, anchored),
        },
        None => (HeaderMatchKind::Contains, rest),
    };

    if literal.is_empty() || !literal.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-') {
        return Err(BuildError::UnsupportedHeaderRegex(pattern.to_owned()));
    }

    Ok((kind, case_sensitive, literal.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_patterns() {
        let cases = [
            ("^foo", HeaderMatchKind::Prefix, true, "foo"),
            ("foo", HeaderMatchKind::Contains, true, "foo"),
            ("^baz$", HeaderMatchKind::Exact, true, "baz"),
            ("(?i)^foo", HeaderMatchKind::Prefix, false, "foo"),
            ("(?i)bAr", HeaderMatchKind::Contains, false, "bAr"),
            ("(?i)^baz$", HeaderMatchKind::Exact, false, "baz"),
            ("123fooABC", HeaderMatchKind::Contains, true, "123fooABC"),
            ("123456", HeaderMatchKind::Contains, true, "123456"),
            ("(?i)my-header-value", HeaderMatchKind::Contains, false, "my-header-value"),
            ("^my_header_value", HeaderMatchKind::Prefix, true, "my_header_value"),
        ];
        for (pattern, kind, case_sensitive, literal) in cases {
            assert_eq!(parse_header_regex(pattern), Ok((kind, case_sensitive, literal.to_owned())), "pattern {pattern}");
        }
    }

    #[test]
    fn rejected_patterns() {
        let cases = [
            "(?i)foo(bar)",
            "foo|bar",
            "foo$",
            "^foo(bar)",
            "[a-z]+",
            "foo*",
            "foo+",
            "\\d{3}",
            "\\bfoo",
            "foo\\nbar",
            "just a string",
            "^just a string",
            "^just a string$",
        ];
        for pattern in cases {
            assert!(parse_header_regex(pattern).is_err(), "pattern {pattern} should be rejected");
        }
    }

    #[test]
    fn empty_value_edge_cases() {
        assert_eq!(parse_header_regex(""), Ok((HeaderMatchKind::Prefix, false, String::new())));
        assert_eq!(parse_header_regex("^"), Ok((HeaderMatchKind::Prefix, false, String::new())));
        assert_eq!(parse_header_regex("$"), Ok((HeaderMatchKind::Exact, false, String::new())));
        assert_eq!(parse_header_regex("^$"), Ok((HeaderMatchKind::Exact, false, String::new())));
        assert_eq!(parse_header_regex("(?i)^$"), Ok((HeaderMatchKind::Exact, false, String::new())));
    }

    // Re-building the canonical pattern for a parsed triple and parsing it
    // again lands on the same triple.
    #[test]
    fn parse_is_invertible() {
        let patterns = ["^foo", "(?i)^foo", "bar", "(?i)bar", "^baz$", "(?i)^baz$"];
        for pattern in patterns {
            let (kind, case_sensitive, literal) = parse_header_regex(pattern).unwrap();
            let mut canonical = String::new();
            if !case_sensitive {
                canonical.push_str("(?i)");
            }
            match kind {
                HeaderMatchKind::Exact => canonical.push_str(&format!("^{literal}$")),
                HeaderMatchKind::Prefix => canonical.push_str(&format!("^{literal}")),
                HeaderMatchKind::Contains => canonical.push_str(&literal),
            }
            assert_eq!(parse_header_regex(&canonical), Ok((kind, case_sensitive, literal)), "pattern {pattern}");
        }
    }
}
