use std::fmt::Display;

use gateway_api::apis::{
    experimental::tlsroutes::{TLSRoute, TLSRouteParentRefs, TLSRouteRulesBackendRefs},
    standard::{
        gateways::Gateway,
        grpcroutes::{GRPCRoute, GRPCRouteParentRefs, GRPCRouteRulesBackendRefs},
        httproutes::{HTTPRoute, HTTPRouteParentRefs, HTTPRouteRulesBackendRefs},
    },
};
use k8s_openapi::api::core::v1::Service;
use kube::{Resource, ResourceExt};

pub const DEFAULT_GROUP_NAME: &str = "gateway.networking.k8s.io";
pub const DEFAULT_NAMESPACE_NAME: &str = "default";
pub const DEFAULT_KIND_NAME: &str = "Gateway";
pub const DEFAULT_ROUTE_HOSTNAME: &str = "*";

#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ResourceKey {
    pub group: String,
    pub namespace: String,
    pub name: String,
    pub kind: String,
}

#[allow(dead_code)]
impl ResourceKey {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    pub fn namespaced(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_owned(),
            namespace: namespace.to_owned(),
            ..Default::default()
        }
    }
}

impl Default for ResourceKey {
    fn default() -> Self {
        Self {
            group: DEFAULT_GROUP_NAME.to_owned(),
            namespace: DEFAULT_NAMESPACE_NAME.to_owned(),
            name: String::default(),
            kind: DEFAULT_KIND_NAME.to_owned(),
        }
    }
}

impl Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

impl From<&Gateway> for ResourceKey {
    fn from(value: &Gateway) -> Self {
        let namespace = value.meta().namespace.clone().unwrap_or(DEFAULT_NAMESPACE_NAME.to_owned());

        Self {
            group: DEFAULT_GROUP_NAME.to_owned(),
            namespace,
            name: value.name_any(),
            kind: "Gateway".to_owned(),
        }
    }
}

impl From<&HTTPRoute> for ResourceKey {
    fn from(value: &HTTPRoute) -> Self {
        let namespace = value.meta().namespace.clone().unwrap_or(DEFAULT_NAMESPACE_NAME.to_owned());

        Self {
            group: DEFAULT_GROUP_NAME.to_owned(),
            namespace,
            name: value.name_any(),
            kind: "HTTPRoute".to_owned(),
        }
    }
}

impl From<&GRPCRoute> for ResourceKey {
    fn from(value: &GRPCRoute) -> Self {
        let namespace = value.meta().namespace.clone().unwrap_or(DEFAULT_NAMESPACE_NAME.to_owned());

        Self {
            group: DEFAULT_GROUP_NAME.to_owned(),
            namespace,
            name: value.name_any(),
            kind: "GRPCRoute".to_owned(),
        }
    }
}

impl From<&TLSRoute> for ResourceKey {
    fn from(value: &TLSRoute) -> Self {
        let namespace = value.meta().namespace.clone().unwrap_or(DEFAULT_NAMESPACE_NAME.to_owned());

        Self {
            group: DEFAULT_GROUP_NAME.to_owned(),
            namespace,
            name: value.name_any(),
            kind: "TLSRoute".to_owned(),
        }
    }
}

impl From<&Service> for ResourceKey {
    fn from(service: &Service) -> Self {
        let value = &service.metadata;
        let namespace = value.namespace.clone().unwrap_or(DEFAULT_NAMESPACE_NAME.to_owned());

        Self {
            group: String::new(),
            namespace,
            name: value.name.clone().unwrap_or_default(),
            kind: "Service".to_owned(),
        }
    }
}

impl From<(&HTTPRouteRulesBackendRefs, String)> for ResourceKey {
    fn from((value, route_namespace): (&HTTPRouteRulesBackendRefs, String)) -> Self {
        let namespace = value.namespace.clone().unwrap_or(route_namespace);

        Self {
            group: value.group.clone().unwrap_or_default(),
            namespace,
            name: value.name.clone(),
            kind: value.kind.clone().unwrap_or("Service".to_owned()),
        }
    }
}

impl From<(&GRPCRouteRulesBackendRefs, String)> for ResourceKey {
    fn from((value, route_namespace): (&GRPCRouteRulesBackendRefs, String)) -> Self {
        let namespace = value.namespace.clone().unwrap_or(route_namespace);

        Self {
            group: value.group.clone().unwrap_or_default(),
            namespace,
            name: value.name.clone(),
            kind: value.kind.clone().unwrap_or("Service".to_owned()),
        }
    }
}

impl From<(&TLSRouteRulesBackendRefs, String)> for ResourceKey {
    fn from((value, route_namespace): (&TLSRouteRulesBackendRefs, String)) -> Self {
        let namespace = value.namespace.clone().unwrap_or(route_namespace);

        Self {
            group: value.group.clone().unwrap_or_default(),
            namespace,
            name: value.name.clone(),
            kind: value.kind.clone().unwrap_or("Service".to_owned()),
        }
    }
}

/// Reference from a route to one of its parent Gateways, together with the
/// optional listener selector carried by the route.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Default)]
pub struct RouteRefKey {
    pub resource_key: ResourceKey,
    pub section_name: Option<String>,
    pub port: Option<i32>,
}

impl From<(&HTTPRouteParentRefs, String)> for RouteRefKey {
    fn from((route_parent, route_namespace): (&HTTPRouteParentRefs, String)) -> Self {
        Self {
            resource_key: ResourceKey {
                group: route_parent.group.clone().unwrap_or(DEFAULT_GROUP_NAME.to_owned()),
                namespace: route_parent.namespace.clone().unwrap_or(route_namespace),
                name: route_parent.name.clone(),
                kind: route_parent.kind.clone().unwrap_or(DEFAULT_KIND_NAME.to_owned()),
            },
            section_name: route_parent.section_name.clone(),
            port: route_parent.port,
        }
    }
}

impl From<(&GRPCRouteParentRefs, String)> for RouteRefKey {
    fn from((route_parent, route_namespace): (&GRPCRouteParentRefs, String)) -> Self {
        Self {
            resource_key: ResourceKey {
                group: route_parent.group.clone().unwrap_or(DEFAULT_GROUP_NAME.to_owned()),
                namespace: route_parent.namespace.clone().unwrap_or(route_namespace),
                name: route_parent.name.clone(),
                kind: route_parent.kind.clone().unwrap_or(DEFAULT_KIND_NAME.to_owned()),
            },
            section_name: route_parent.section_name.clone(),
            port: route_parent.port,
        }
    }
}

impl From<(&TLSRouteParentRefs, String)> for RouteRefKey {
    fn from((route_parent, route_namespace): (&TLSRouteParentRefs, String)) -> Self {
        Self {
            resource_key: ResourceKey {
                group: route_parent.group.clone().unwrap_or(DEFAULT_GROUP_NAME.to_owned()),
                namespace: route_parent.namespace.clone().unwrap_or(route_namespace),
                name: route_parent.name.clone(),
                kind: route_parent.kind.clone().unwrap_or(DEFAULT_KIND_NAME.to_owned()),
            },
            section_name: route_parent.section_name.clone(),
            port: route_parent.port,
        }
    }
}

impl AsRef<ResourceKey> for RouteRefKey {
    fn as_ref(&self) -> &ResourceKey {
        &self.resource_key
    }
}
