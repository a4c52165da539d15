mod grpc_route;
mod http_route;
mod tls_route;

use thiserror::Error;

use super::{ResourceKey, RouteRefKey};

#[derive(Error, Debug, PartialEq)]
pub enum RouteConversionError {
    #[error("unsupported path match type: {0}")]
    UnsupportedPathMatchType(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RouteType {
    Http,
    Grpc,
    Tls,
}

impl RouteType {
    pub fn kind(self) -> &'static str {
        match self {
            RouteType::Http => "HTTPRoute",
            RouteType::Grpc => "GRPCRoute",
            RouteType::Tls => "TLSRoute",
        }
    }
}

/// Read-only view over the three supported route kinds. Conversion flattens
/// the kind-specific rule shapes into one; the builders never see the
/// underlying Kubernetes type again.
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    pub resource_key: ResourceKey,
    pub route_type: RouteType,
    pub parents: Vec<RouteRefKey>,
    pub hostnames: Vec<String>,
    pub rules: Vec<RouteRule>,
    pub is_deleted: bool,
}

impl Route {
    pub fn name(&self) -> &str {
        &self.resource_key.name
    }

    pub fn namespace(&self) -> &str {
        &self.resource_key.namespace
    }

    pub fn parents(&self) -> &[RouteRefKey] {
        &self.parents
    }

    pub fn hostnames(&self) -> &[String] {
        &self.hostnames
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    pub fn route_type(&self) -> RouteType {
        self.route_type
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RouteRule {
    pub name: String,
    pub matches: Vec<RouteRuleMatch>,
    pub backends: Vec<BackendRef>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RouteRuleMatch {
    pub path: Option<PathMatch>,
    pub method: Option<String>,
    pub headers: Vec<HeaderMatchInput>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PathMatch {
    Exact(String),
    Prefix(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeaderMatchInput {
    pub name: String,
    pub kind: HeaderMatchInputKind,
    pub value: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderMatchInputKind {
    Exact,
    Regex,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BackendRef {
    pub kind: BackendKind,
    pub name: String,
    pub namespace: Option<String>,
    pub port: Option<i32>,
    pub weight: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum BackendKind {
    Service,
    ServiceImport,
    Unsupported(String),
}

pub(crate) fn rule_name(route_name: &str, index: usize) -> String {
    format!("{route_name}-{index}")
}
