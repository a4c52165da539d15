use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{collect_stage_errors, ensure_not_cancelled};
use crate::{
    cluster::ClusterReader,
    common::ResourceKey,
    deploy::{managers::TargetGroupManager, DeployError},
    model::{Stack, StackResource, TargetGroup, TargetGroupSourceType},
};

pub struct TargetGroupSynthesizer<'a> {
    manager: &'a TargetGroupManager,
    cluster: &'a dyn ClusterReader,
    cluster_name: &'a str,
}

impl<'a> TargetGroupSynthesizer<'a> {
    pub fn new(manager: &'a TargetGroupManager, cluster: &'a dyn ClusterReader, cluster_name: &'a str) -> Self {
        Self { manager, cluster, cluster_name }
    }

    pub async fn synthesize(&self, stack: &mut Stack, token: &CancellationToken) -> Result<(), DeployError> {
        let entries: Vec<_> = stack.list::<TargetGroup>().into_iter().map(|tg| (tg.id().to_owned(), tg.spec.clone())).collect();

        let mut errors = vec![];
        for (id, spec) in entries {
            ensure_not_cancelled(token)?;
            if spec.is_deleted {
                match self.manager.find(&spec).await {
                    Ok(Some(summary)) => {
                        if let Err(e) = self.manager.delete(&summary.id).await {
                            errors.push(e);
                        }
                    },
                    Ok(None) => {},
                    Err(e) => errors.push(e),
                }
                continue;
            }
            match self.manager.upsert(&spec).await {
                Ok(status) => {
                    if let Ok(target_group) = stack.get_mut::<TargetGroup>(&id) {
                        target_group.status = Some(status);
                    }
                },
                Err(e) => errors.push(e),
            }
        }

        collect_stage_errors(errors)
    }

    /// Deletes route-sourced groups this controller created whose backing
    /// Kubernetes Service no longer exists and which the current stack does
    /// not intend. Failures here are logged, not fatal; the group is picked
    /// up again on the next reconcile.
    pub async fn cleanup(&self, stack: &Stack, token: &CancellationToken) -> Result<(), DeployError> {
        let intended: Vec<String> = stack.list::<TargetGroup>().into_iter().map(|tg| tg.spec.mesh_name()).collect();

        for summary in self.manager.list().await? {
            ensure_not_cancelled(token)?;
            if intended.contains(&summary.name) {
                continue;
            }
            let Some(tags) = self.manager.decoded_tags(&summary.arn).await? else {
                continue;
            };
            if tags.cluster_name != self.cluster_name || tags.source_type != TargetGroupSourceType::Route {
                continue;
            }

            let service_key = ResourceKey {
                group: String::new(),
                namespace: tags.service_namespace.clone(),
                name: tags.service_name.clone(),
                kind: "Service".to_owned(),
            };
            match self.cluster.get_service(&service_key).await {
                Ok(Some(_)) => {},
                Ok(None) => {
                    info!("deleting orphaned target group {}", summary.name);
                    if let Err(e) = self.manager.delete(&summary.id).await {
                        warn!("failed to delete orphaned target group {}: {e}", summary.name);
                    }
                },
                Err(e) => warn!("skipping orphan check for {}: {e}", summary.name),
            }
        }

        Ok(())
    }
}
