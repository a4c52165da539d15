mod listener;
mod rule;
mod service;
mod service_network;
mod target_group;
mod targets;

pub use listener::ListenerSynthesizer;
pub use rule::RuleSynthesizer;
pub use service::ServiceSynthesizer;
pub use service_network::ServiceNetworkSynthesizer;
pub use target_group::TargetGroupSynthesizer;
pub use targets::TargetsSynthesizer;

use tokio_util::sync::CancellationToken;

use super::DeployError;

/// A stage fails as a whole but keeps processing independent siblings, so
/// one bad resource cannot shadow the rest of its kind.
pub(crate) fn collect_stage_errors(errors: Vec<DeployError>) -> Result<(), DeployError> {
    let mut errors = errors;
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(DeployError::Multiple(errors)),
    }
}

pub(crate) fn ensure_not_cancelled(token: &CancellationToken) -> Result<(), DeployError> {
    if token.is_cancelled() {
        return Err(DeployError::Canceled);
    }
    Ok(())
}
