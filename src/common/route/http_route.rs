use gateway_api::apis::standard::httproutes::{
    HTTPRoute, HTTPRouteRules, HTTPRouteRulesMatches, HTTPRouteRulesMatchesHeadersType, HTTPRouteRulesMatchesMethod,
    HTTPRouteRulesMatchesPathType,
};
use kube::{Resource, ResourceExt};

use super::{
    rule_name, BackendKind, BackendRef, HeaderMatchInput, HeaderMatchInputKind, PathMatch, Route, RouteConversionError, RouteRule,
    RouteRuleMatch, RouteType,
};
use crate::common::{ResourceKey, RouteRefKey};

impl TryFrom<&HTTPRoute> for Route {
    type Error = RouteConversionError;

    fn try_from(kube_route: &HTTPRoute) -> Result<Self, Self::Error> {
        let key = ResourceKey::from(kube_route);
        let local_namespace = key.namespace.clone();
        let parents = kube_route
            .spec
            .parent_refs
            .as_ref()
            .map(|parents| parents.iter().map(|p| RouteRefKey::from((p, local_namespace.clone()))).collect())
            .unwrap_or_default();

        let empty_rules: Vec<HTTPRouteRules> = vec![];
        let rules = kube_route
            .spec
            .rules
            .as_ref()
            .unwrap_or(&empty_rules)
            .iter()
            .enumerate()
            .map(|(i, rr)| {
                let matches = match rr.matches.as_ref() {
                    None => vec![default_match()],
                    Some(matches) if matches.is_empty() => vec![default_match()],
                    Some(matches) => matches.iter().map(convert_match).collect::<Result<Vec<_>, _>>()?,
                };
                Ok(RouteRule {
                    name: rule_name(&kube_route.name_any(), i),
                    matches,
                    backends: rr
                        .backend_refs
                        .as_ref()
                        .unwrap_or(&vec![])
                        .iter()
                        .map(|br| BackendRef {
                            kind: match br.kind.as_deref() {
                                None | Some("Service") => BackendKind::Service,
                                Some("ServiceImport") => BackendKind::ServiceImport,
                                Some(other) => BackendKind::Unsupported(other.to_owned()),
                            },
                            name: br.name.clone(),
                            namespace: br.namespace.clone(),
                            port: br.port,
                            weight: br.weight.map_or(1, i64::from),
                        })
                        .collect(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Route {
            resource_key: key,
            route_type: RouteType::Http,
            parents,
            hostnames: kube_route.spec.hostnames.clone().unwrap_or_default(),
            rules,
            is_deleted: kube_route.meta().deletion_timestamp.is_some(),
        })
    }
}

fn default_match() -> RouteRuleMatch {
    RouteRuleMatch {
        path: Some(PathMatch::Prefix("/".to_owned())),
        method: None,
        headers: vec![],
    }
}

fn convert_match(m: &HTTPRouteRulesMatches) -> Result<RouteRuleMatch, RouteConversionError> {
    let path = m
        .path
        .as_ref()
        .map(|path| {
            let value = path.value.clone().unwrap_or("/".to_owned());
            match path.r#type.as_ref().unwrap_or(&HTTPRouteRulesMatchesPathType::PathPrefix) {
                HTTPRouteRulesMatchesPathType::Exact => Ok(PathMatch::Exact(value)),
                HTTPRouteRulesMatchesPathType::PathPrefix => Ok(PathMatch::Prefix(value)),
                HTTPRouteRulesMatchesPathType::RegularExpression => {
                    Err(RouteConversionError::UnsupportedPathMatchType("RegularExpression".to_owned()))
                },
            }
        })
        .transpose()?;

    Ok(RouteRuleMatch {
        path,
        method: m.method.as_ref().map(method_name),
        headers: m
            .headers
            .as_ref()
            .unwrap_or(&vec![])
            .iter()
            .map(|h| HeaderMatchInput {
                name: h.name.clone(),
                kind: match h.r#type.as_ref().unwrap_or(&HTTPRouteRulesMatchesHeadersType::Exact) {
                    HTTPRouteRulesMatchesHeadersType::Exact => HeaderMatchInputKind::Exact,
                    HTTPRouteRulesMatchesHeadersType::RegularExpression => HeaderMatchInputKind::Regex,
                },
                value: h.value.clone(),
            })
            .collect(),
    })
}

fn method_name(method: &HTTPRouteRulesMatchesMethod) -> String {
    match method {
        HTTPRouteRulesMatchesMethod::Get => "GET",
        HTTPRouteRulesMatchesMethod::Head => "HEAD",
        HTTPRouteRulesMatchesMethod::Post => "POST",
        HTTPRouteRulesMatchesMethod::Put => "PUT",
        HTTPRouteRulesMatchesMethod::Delete => "DELETE",
        HTTPRouteRulesMatchesMethod::Connect => "CONNECT",
        HTTPRouteRulesMatchesMethod::Options => "OPTIONS",
        HTTPRouteRulesMatchesMethod::Trace => "TRACE",
        HTTPRouteRulesMatchesMethod::Patch => "PATCH",
    }
    .to_owned()
}
