mod header_regex;
mod route;
mod rule;
mod service_network;
mod target_group;
mod targets;

use thiserror::Error;

pub use header_regex::{parse_header_regex, HeaderMatchKind};
pub use route::{RouteBuildOutput, RouteStackBuilder};
pub use service_network::{ServiceNetworkBuildOutput, ServiceNetworkBuilder};
pub use target_group::BackendTargetGroupBuilder;

use crate::{cluster::ClusterError, common::RouteConversionError};

pub const MAX_HEADER_MATCHES: usize = 5;

#[derive(Error, Debug, PartialEq)]
pub enum BuildError {
    #[error("unsupported header regex: {0}")]
    UnsupportedHeaderRegex(String),
    #[error("rule has more than {MAX_HEADER_MATCHES} header matches")]
    TooManyHeaderMatches,
    #[error("multiple match blocks per rule are not supported")]
    MultipleMatchesUnsupported,
    #[error("unsupported listener protocol {0}")]
    UnsupportedListenerProtocol(String),
    #[error(transparent)]
    Route(#[from] RouteConversionError),
    #[error(transparent)]
    Cluster(#[from] ClusterError),
    #[error("{}", join_errors(.0))]
    Multiple(Vec<BuildError>),
}

impl BuildError {
    /// Cluster read failures should be retried; everything else is a
    /// validation failure that stays until the input changes.
    pub fn is_transient(&self) -> bool {
        match self {
            BuildError::Cluster(_) => true,
            BuildError::Multiple(errors) => errors.iter().any(BuildError::is_transient),
            _ => false,
        }
    }
}

fn join_errors(errors: &[BuildError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}
