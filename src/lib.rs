//! Reconciliation core of a Kubernetes Gateway API controller that projects
//! Gateways and Routes into a managed cloud service mesh.
//!
//! The crate turns Kubernetes inputs into a typed stack of intended mesh
//! resources ([`model::Stack`]) and synthesizes that stack against the live
//! mesh API with idempotent managers, orphan cleanup and retry semantics.
//! The controller-runtime shell (informers, status patching, the concrete
//! mesh SDK) lives outside and reaches in through [`mesh::MeshClient`] and
//! [`cluster::ClusterReader`].

pub mod builder;
pub mod cluster;
mod common;
pub mod config;
pub mod deploy;
pub mod mesh;
pub mod model;
pub mod policy;

pub use common::{
    BackendKind, BackendRef, HeaderMatchInput, HeaderMatchInputKind, PathMatch, ResourceKey, Route, RouteConversionError, RouteRefKey,
    RouteRule, RouteRuleMatch, RouteType, DEFAULT_NAMESPACE_NAME,
};
pub use config::MeshConfig;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;
