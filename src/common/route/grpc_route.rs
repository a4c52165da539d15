use gateway_api::apis::standard::grpcroutes::{GRPCRoute, GRPCRouteRules, GRPCRouteRulesMatches, GRPCRouteRulesMatchesHeadersType};
use kube::{Resource, ResourceExt};

use super::{
    rule_name, BackendKind, BackendRef, HeaderMatchInput, HeaderMatchInputKind, PathMatch, Route, RouteConversionError, RouteRule,
    RouteRuleMatch, RouteType,
};
use crate::common::{ResourceKey, RouteRefKey};

impl TryFrom<&GRPCRoute> for Route {
    type Error = RouteConversionError;

    fn try_from(kube_route: &GRPCRoute) -> Result<Self, Self::Error> {
        let key = ResourceKey::from(kube_route);
        let local_namespace = key.namespace.clone();
        let parents = kube_route
            .spec
            .parent_refs
            .as_ref()
            .map(|parents| parents.iter().map(|p| RouteRefKey::from((p, local_namespace.clone()))).collect())
            .unwrap_or_default();

        let empty_rules: Vec<GRPCRouteRules> = vec![];
        let rules = kube_route
            .spec
            .rules
            .as_ref()
            .unwrap_or(&empty_rules)
            .iter()
            .enumerate()
            .map(|(i, rr)| RouteRule {
                name: rule_name(&kube_route.name_any(), i),
                matches: match rr.matches.as_ref() {
                    None => vec![default_match()],
                    Some(matches) if matches.is_empty() => vec![default_match()],
                    Some(matches) => matches.iter().map(convert_match).collect(),
                },
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
            .collect();

        Ok(Route {
            resource_key: key,
            route_type: RouteType::Grpc,
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
        method: Some("POST".to_owned()),
        headers: vec![],
    }
}

// gRPC requests are always POST; the service/method pair maps onto the
// request path the way gRPC encodes it on the wire.
fn convert_match(m: &GRPCRouteRulesMatches) -> RouteRuleMatch {
    let path = match m.method.as_ref().map(|method| (method.service.as_ref(), method.method.as_ref())) {
        Some((Some(service), Some(method))) => PathMatch::Exact(format!("/{service}/{method}")),
        Some((Some(service), None)) => PathMatch::Prefix(format!("/{service}/")),
        _ => PathMatch::Prefix("/".to_owned()),
    };

    RouteRuleMatch {
        path: Some(path),
        method: Some("POST".to_owned()),
        headers: m
            .headers
            .as_ref()
            .unwrap_or(&vec![])
            .iter()
            .map(|h| HeaderMatchInput {
                name: h.name.clone(),
                kind: match h.r#type.as_ref().unwrap_or(&GRPCRouteRulesMatchesHeadersType::Exact) {
                    GRPCRouteRulesMatchesHeadersType::Exact => HeaderMatchInputKind::Exact,
                    GRPCRouteRulesMatchesHeadersType::RegularExpression => HeaderMatchInputKind::Regex,
                },
                value: h.value.clone(),
            })
            .collect(),
    }
}
