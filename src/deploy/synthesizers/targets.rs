use futures::{stream, StreamExt};
use tokio_util::sync::CancellationToken;

use super::{collect_stage_errors, ensure_not_cancelled};
use crate::{
    deploy::{managers::TargetsManager, DeployError},
    model::{Stack, TargetGroup, Targets},
};

/// Registrations for different groups are independent, so they fan out with
/// a fixed bound rather than serialising on every round trip.
const REGISTRATION_FAN_OUT: usize = 8;

pub struct TargetsSynthesizer<'a> {
    manager: &'a TargetsManager,
}

impl<'a> TargetsSynthesizer<'a> {
    pub fn new(manager: &'a TargetsManager) -> Self {
        Self { manager }
    }

    pub async fn synthesize(&self, stack: &Stack, token: &CancellationToken) -> Result<(), DeployError> {
        ensure_not_cancelled(token)?;

        let mut work = vec![];
        for targets in stack.list::<Targets>() {
            let Ok(target_group) = stack.get::<TargetGroup>(&targets.spec.stack_target_group_id) else {
                continue;
            };
            if target_group.spec.is_deleted {
                continue;
            }
            let Some(mesh_target_group_id) = target_group.status.as_ref().map(|s| s.id.clone()) else {
                return Err(DeployError::MeshRetry);
            };
            work.push((targets.spec.clone(), mesh_target_group_id));
        }

        let errors: Vec<DeployError> = stream::iter(work)
            .map(|(spec, target_group_id)| async move { self.manager.upsert(&spec, &target_group_id).await })
            .buffer_unordered(REGISTRATION_FAN_OUT)
            .filter_map(|result| async move { result.err() })
            .collect()
            .await;

        collect_stage_errors(errors)
    }
}
