use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    config::MeshConfig,
    deploy::DeployError,
    mesh::{target_group_tags, CreateTargetGroup, MeshClient, MeshError, TargetGroupSummary, TargetGroupTagFilter, TargetGroupTags},
    model::{
        RuleAction, ServiceImportTargetGroup, Stack, TargetGroup, TargetGroupRef, TargetGroupSpec, TargetGroupStatus, INVALID_BACKEND_REF_TG,
    },
};

pub struct TargetGroupManager {
    config: MeshConfig,
    client: Arc<dyn MeshClient>,
}

impl TargetGroupManager {
    pub fn new(config: MeshConfig, client: Arc<dyn MeshClient>) -> Self {
        Self { config, client }
    }

    pub async fn find(&self, spec: &TargetGroupSpec) -> Result<Option<TargetGroupSummary>, DeployError> {
        let name = spec.mesh_name();
        Ok(self.client.list_target_groups().await?.into_iter().find(|tg| tg.name == name))
    }

    pub async fn upsert(&self, spec: &TargetGroupSpec) -> Result<TargetGroupStatus, DeployError> {
        let summary = match self.find(spec).await? {
            Some(summary) => summary,
            None => {
                let input = CreateTargetGroup {
                    name: spec.mesh_name(),
                    vpc_id: spec.vpc_id.clone(),
                    port: spec.port,
                    protocol: spec.protocol.to_string(),
                    protocol_version: spec.protocol_version.to_string(),
                    health_check: spec.health_check.clone(),
                    tags: target_group_tags(&self.config, spec),
                };
                info!("creating target group {}", input.name);
                match self.client.create_target_group(&input).await {
                    Ok(summary) => summary,
                    Err(MeshError::AlreadyExists(_)) => self.find(spec).await?.ok_or(DeployError::Mesh(MeshError::NotFound))?,
                    Err(e) => return Err(e.into()),
                }
            },
        };

        Ok(TargetGroupStatus {
            name: summary.name,
            arn: summary.arn,
            id: summary.id,
        })
    }

    /// Targets must be drained before the mesh accepts group deletion.
    pub async fn delete(&self, target_group_id: &str) -> Result<(), DeployError> {
        let registered = match self.client.list_targets(target_group_id).await {
            Ok(registered) => registered,
            Err(MeshError::NotFound) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        if !registered.is_empty() {
            self.client.deregister_targets(target_group_id, &registered).await?;
        }
        info!("deleting target group {target_group_id}");
        match self.client.delete_target_group(target_group_id).await {
            Ok(()) | Err(MeshError::NotFound) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list(&self) -> Result<Vec<TargetGroupSummary>, DeployError> {
        Ok(self.client.list_target_groups().await?)
    }

    pub async fn decoded_tags(&self, target_group_arn: &str) -> Result<Option<TargetGroupTags>, DeployError> {
        let tags = self.client.list_tags(target_group_arn).await?;
        Ok(TargetGroupTags::try_from(&tags).ok())
    }

    /// Locates the target group another cluster materialised for a
    /// ServiceExport, by tags. The tag filter runs client-side over the full
    /// listing.
    pub async fn find_service_export_tg(&self, import: &ServiceImportTargetGroup) -> Result<TargetGroupSummary, DeployError> {
        let filter = TargetGroupTagFilter {
            service_name: import.service_name.clone(),
            service_namespace: import.service_namespace.clone(),
            cluster_name: import.cluster_name.clone(),
            vpc_id: import.vpc_id.clone(),
        };

        for summary in self.client.list_target_groups().await? {
            let Some(tags) = self.decoded_tags(&summary.arn).await? else {
                continue;
            };
            if filter.matches(&tags, summary.vpc_id.as_deref()) {
                return Ok(summary);
            }
        }

        Err(DeployError::ServiceExportTargetGroupNotFound {
            namespace: import.service_namespace.clone(),
            name: import.service_name.clone(),
        })
    }

    /// Rewrites every target group reference in the action to the mesh id it
    /// resolved to: in-stack groups through their synthesized status,
    /// ServiceImports through the tag search. The invalid-backend sentinel
    /// passes through untouched so the mesh rejects the rule and the failure
    /// lands on the route status.
    pub async fn resolve_rule_tg_ids(&self, action: &mut RuleAction, stack: &Stack) -> Result<(), DeployError> {
        for rule_target_group in &mut action.target_groups {
            let resolved = match &rule_target_group.target_group {
                TargetGroupRef::Mesh(id) if id.is_empty() => return Err(DeployError::MissingRuleTargetGroupId),
                TargetGroupRef::Mesh(id) => id.clone(),
                TargetGroupRef::Stack(id) if id == INVALID_BACKEND_REF_TG => id.clone(),
                TargetGroupRef::Stack(id) => {
                    let target_group = stack.get::<TargetGroup>(id)?;
                    let mesh_id = target_group.status.as_ref().map(|s| s.id.clone()).unwrap_or_default();
                    if mesh_id.is_empty() {
                        return Err(DeployError::MissingRuleTargetGroupId);
                    }
                    mesh_id
                },
                TargetGroupRef::ServiceImport(import) => {
                    debug!("resolving service export target group {}/{}", import.service_namespace, import.service_name);
                    self.find_service_export_tg(import).await?.id
                },
            };
            rule_target_group.target_group = TargetGroupRef::Mesh(resolved);
        }
        Ok(())
    }
}
