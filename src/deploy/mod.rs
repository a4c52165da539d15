mod backoff;
mod deployer;
pub mod managers;
pub mod synthesizers;

use thiserror::Error;

pub use backoff::BackoffSchedule;
pub use deployer::Deployer;

use crate::{builder::BuildError, mesh::MeshError, model::StackError};

#[derive(Error, Debug, PartialEq)]
pub enum DeployError {
    /// The mesh is converging towards a previous request; requeue the
    /// reconcile unchanged instead of fighting it.
    #[error("mesh state is still converging, requeue")]
    MeshRetry,
    #[error("operation canceled")]
    Canceled,
    #[error("TLS passthrough listener needs exactly one rule, found {0}")]
    InvalidTlsPassthroughConfig(usize),
    #[error("rule target group id missing after resolution")]
    MissingRuleTargetGroupId,
    #[error("no target group found for service export {namespace}/{name}")]
    ServiceExportTargetGroupNotFound { namespace: String, name: String },
    #[error(transparent)]
    Mesh(#[from] MeshError),
    #[error(transparent)]
    Stack(#[from] StackError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("{}", join_errors(.0))]
    Multiple(Vec<DeployError>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Requeue with backoff; the input is fine.
    Transient,
    /// Surface as a status condition; retrying without an input change is
    /// pointless.
    Validation,
    /// Authorization problem; requeue on the long schedule.
    Permission,
}

impl DeployError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DeployError::MeshRetry | DeployError::Canceled => ErrorCategory::Transient,
            DeployError::Mesh(MeshError::Throttled | MeshError::Network(_) | MeshError::Conflict(_) | MeshError::AlreadyExists(_) | MeshError::NotFound) => {
                ErrorCategory::Transient
            },
            DeployError::Mesh(MeshError::AccessDenied(_)) => ErrorCategory::Permission,
            DeployError::Build(e) if e.is_transient() => ErrorCategory::Transient,
            DeployError::Multiple(errors) => errors
                .iter()
                .map(DeployError::category)
                .find(|category| *category != ErrorCategory::Validation)
                .unwrap_or(ErrorCategory::Validation),
            _ => ErrorCategory::Validation,
        }
    }
}

fn join_errors(errors: &[DeployError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}
