use std::sync::Arc;

use tracing::{debug, info};

use super::same_id_set;
use crate::{
    config::MeshConfig,
    deploy::DeployError,
    mesh::{service_network_tags, MeshClient, ServiceNetworkSummary, Tags, VpcAssociation, VpcAssociationStatus, TAG_SERVICE_NETWORK_OWNED_BY_VPC},
    model::{ServiceNetworkSpec, ServiceNetworkStatus},
};

/// Drives a service network and its association with this controller's VPC
/// towards the spec. Ownership is recorded in the
/// `K8SServiceNetworkOwnedByVPC` tag; networks created by other writers are
/// joined but never deleted.
pub struct ServiceNetworkManager {
    config: MeshConfig,
    client: Arc<dyn MeshClient>,
}

impl ServiceNetworkManager {
    pub fn new(config: MeshConfig, client: Arc<dyn MeshClient>) -> Self {
        Self { config, client }
    }

    pub async fn find(&self, name: &str) -> Result<Option<(ServiceNetworkSummary, Tags)>, DeployError> {
        for summary in self.client.list_service_networks().await? {
            if summary.name == name {
                let tags = self.client.list_tags(&summary.arn).await?;
                return Ok(Some((summary, tags)));
            }
        }
        Ok(None)
    }

    pub async fn upsert(&self, spec: &ServiceNetworkSpec) -> Result<ServiceNetworkStatus, DeployError> {
        let (summary, freshly_created) = match self.find(&spec.name).await? {
            Some((summary, _)) => (summary, false),
            None => {
                info!("creating service network {}", spec.name);
                let created = self.client.create_service_network(&spec.name, &service_network_tags(&self.config)).await?;
                (created, true)
            },
        };

        let association = if freshly_created { None } else { self.current_vpc_association(&summary.id).await? };

        if !spec.associate_to_vpc {
            return match association.map(|a| (a.status, a.id)) {
                Some((VpcAssociationStatus::Active, id)) => {
                    info!("dissociating service network {} from vpc {}", spec.name, self.config.vpc_id);
                    self.client.delete_vpc_association(&id).await?;
                    Err(DeployError::MeshRetry)
                },
                Some((VpcAssociationStatus::CreateInProgress | VpcAssociationStatus::UpdateInProgress | VpcAssociationStatus::DeleteInProgress, _)) => {
                    Err(DeployError::MeshRetry)
                },
                _ => Ok(status(&summary, vec![])),
            };
        }

        match association {
            None => {
                let security_group_ids = self.create_association(&summary.id, &spec.security_group_ids).await?;
                Ok(status(&summary, security_group_ids))
            },
            Some(association) => match association.status {
                VpcAssociationStatus::Active => {
                    let live = self.client.get_vpc_association(&association.id).await?;
                    if same_id_set(&live.security_group_ids, &spec.security_group_ids) {
                        Ok(status(&summary, live.security_group_ids))
                    } else {
                        debug!("updating security groups on association {} to {:?}", association.id, spec.security_group_ids);
                        let updated = self.client.update_vpc_association(&association.id, &spec.security_group_ids).await?;
                        Ok(status(&summary, updated.security_group_ids))
                    }
                },
                VpcAssociationStatus::CreateFailed | VpcAssociationStatus::DeleteFailed => {
                    let security_group_ids = self.create_association(&summary.id, &spec.security_group_ids).await?;
                    Ok(status(&summary, security_group_ids))
                },
                VpcAssociationStatus::CreateInProgress | VpcAssociationStatus::UpdateInProgress | VpcAssociationStatus::DeleteInProgress => {
                    Err(DeployError::MeshRetry)
                },
            },
        }
    }

    pub async fn delete(&self, name: &str) -> Result<(), DeployError> {
        let Some((summary, tags)) = self.find(name).await? else {
            return Ok(());
        };
        let created_by_us = tags.get(TAG_SERVICE_NETWORK_OWNED_BY_VPC) == Some(&self.config.vpc_id);

        let associations = self.client.list_vpc_associations(Some(&summary.id), None).await?;
        if let Some(ours) = associations.iter().find(|a| a.vpc_id == self.config.vpc_id) {
            match ours.status {
                VpcAssociationStatus::Active => {
                    info!("deleting vpc association {} of service network {name}", ours.id);
                    self.client.delete_vpc_association(&ours.id).await?;
                    return Err(DeployError::MeshRetry);
                },
                VpcAssociationStatus::CreateInProgress | VpcAssociationStatus::UpdateInProgress | VpcAssociationStatus::DeleteInProgress => {
                    return Err(DeployError::MeshRetry);
                },
                VpcAssociationStatus::CreateFailed | VpcAssociationStatus::DeleteFailed => {},
            }
        }

        let foreign_associations = associations.iter().any(|a| a.vpc_id != self.config.vpc_id);
        match (foreign_associations, created_by_us) {
            // other VPCs still attached to a network we own, wait for them
            (true, true) => Err(DeployError::MeshRetry),
            (false, true) => {
                info!("deleting service network {name}");
                self.client.delete_service_network(&summary.id).await?;
                Ok(())
            },
            (_, false) => Ok(()),
        }
    }

    async fn current_vpc_association(&self, service_network_id: &str) -> Result<Option<VpcAssociation>, DeployError> {
        let associations = self.client.list_vpc_associations(Some(service_network_id), Some(&self.config.vpc_id)).await?;
        Ok(associations.into_iter().find(|a| a.vpc_id == self.config.vpc_id))
    }

    async fn create_association(&self, service_network_id: &str, security_group_ids: &[String]) -> Result<Vec<String>, DeployError> {
        info!("associating service network {service_network_id} with vpc {}", self.config.vpc_id);
        let created = self
            .client
            .create_vpc_association(service_network_id, &self.config.vpc_id, security_group_ids, &service_network_tags(&self.config))
            .await?;
        match created.status {
            VpcAssociationStatus::Active => Ok(created.security_group_ids),
            _ => Err(DeployError::MeshRetry),
        }
    }
}

fn status(summary: &ServiceNetworkSummary, snva_security_group_ids: Vec<String>) -> ServiceNetworkStatus {
    ServiceNetworkStatus {
        arn: summary.arn.clone(),
        id: summary.id.clone(),
        snva_security_group_ids,
    }
}
