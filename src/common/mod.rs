mod resource_key;
mod route;

pub use resource_key::{ResourceKey, RouteRefKey, DEFAULT_GROUP_NAME, DEFAULT_NAMESPACE_NAME, DEFAULT_ROUTE_HOSTNAME};
pub use route::{
    BackendKind, BackendRef, HeaderMatchInput, HeaderMatchInputKind, PathMatch, Route, RouteConversionError, RouteRule, RouteRuleMatch,
    RouteType,
};
