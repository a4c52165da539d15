use gateway_api::apis::experimental::tlsroutes::TLSRoute;
use kube::{Resource, ResourceExt};

use super::{rule_name, BackendKind, BackendRef, Route, RouteConversionError, RouteRule, RouteType};
use crate::common::{ResourceKey, RouteRefKey};

// TLS routes carry no match section; the single rule forwards everything
// arriving on the listener.
impl TryFrom<&TLSRoute> for Route {
    type Error = RouteConversionError;

    fn try_from(kube_route: &TLSRoute) -> Result<Self, Self::Error> {
        let key = ResourceKey::from(kube_route);
        let local_namespace = key.namespace.clone();
        let parents = kube_route
            .spec
            .parent_refs
            .as_ref()
            .map(|parents| parents.iter().map(|p| RouteRefKey::from((p, local_namespace.clone()))).collect())
            .unwrap_or_default();

        let rules = kube_route
            .spec
            .rules
            .iter()
            .enumerate()
            .map(|(i, rr)| RouteRule {
                name: rule_name(&kube_route.name_any(), i),
                matches: vec![],
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
            route_type: RouteType::Tls,
            parents,
            hostnames: kube_route.spec.hostnames.clone().unwrap_or_default(),
            rules,
            is_deleted: kube_route.meta().deletion_timestamp.is_some(),
        })
    }
}
