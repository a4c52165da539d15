use super::{
    header_regex::{parse_header_regex, HeaderMatchKind},
    BuildError, MAX_HEADER_MATCHES,
};
use crate::{
    common::{HeaderMatchInput, HeaderMatchInputKind, PathMatch, RouteRule},
    mesh::{HeaderMatch, HeaderMatchType},
};

#[derive(Debug, Default, PartialEq)]
pub(crate) struct TranslatedMatch {
    pub path: Option<PathMatch>,
    pub method: Option<String>,
    pub headers: Vec<HeaderMatch>,
}

/// Translates a route rule's match section into the mesh shape. Gateway API
/// allows several match blocks per rule (OR semantics); the mesh rule model
/// has exactly one, so more than one block is rejected outright.
pub(crate) fn translate_rule_match(rule: &RouteRule) -> Result<TranslatedMatch, BuildError> {
    if rule.matches.len() > 1 {
        return Err(BuildError::MultipleMatchesUnsupported);
    }

    let Some(m) = rule.matches.first() else {
        return Ok(TranslatedMatch::default());
    };

    if m.headers.len() > MAX_HEADER_MATCHES {
        return Err(BuildError::TooManyHeaderMatches);
    }

    Ok(TranslatedMatch {
        path: m.path.clone(),
        method: m.method.clone(),
        headers: m.headers.iter().map(translate_header).collect::<Result<_, _>>()?,
    })
}

fn translate_header(header: &HeaderMatchInput) -> Result<HeaderMatch, BuildError> {
    match header.kind {
        HeaderMatchInputKind::Exact => Ok(HeaderMatch {
            name: header.name.clone(),
            match_type: HeaderMatchType::Exact(header.value.clone()),
            case_sensitive: false,
        }),
        HeaderMatchInputKind::Regex => {
            let (kind, case_sensitive, literal) = parse_header_regex(&header.value)?;
            Ok(HeaderMatch {
                name: header.name.clone(),
                match_type: match kind {
                    HeaderMatchKind::Exact => HeaderMatchType::Exact(literal),
                    HeaderMatchKind::Prefix => HeaderMatchType::Prefix(literal),
                    HeaderMatchKind::Contains => HeaderMatchType::Contains(literal),
                },
                case_sensitive,
            })
        },
    }
}
