use std::sync::Arc;

use tracing::info;

use crate::{
    config::MeshConfig,
    deploy::DeployError,
    mesh::{CreateListener, ListenerSummary, MeshClient, MeshError, RuleAction, Tags, TAG_CLUSTER_NAME},
    model::{ListenerSpec, ListenerStatus},
};

pub struct ListenerManager {
    config: MeshConfig,
    client: Arc<dyn MeshClient>,
}

impl ListenerManager {
    pub fn new(config: MeshConfig, client: Arc<dyn MeshClient>) -> Self {
        Self { config, client }
    }

    /// `(port, protocol)` is unique per service on the mesh side, so that
    /// pair is the listener's identity here as well.
    pub async fn upsert(&self, spec: &ListenerSpec, service_id: &str, default_action: &RuleAction) -> Result<ListenerStatus, DeployError> {
        let protocol = spec.protocol.to_string();
        let existing = self
            .client
            .list_listeners(service_id)
            .await?
            .into_iter()
            .find(|l| l.port == spec.port && l.protocol == protocol);

        let summary = match existing {
            Some(summary) => {
                self.client.update_listener(service_id, &summary.id, default_action).await?;
                summary
            },
            None => {
                let input = CreateListener {
                    service_id: service_id.to_owned(),
                    name: listener_name(spec),
                    port: spec.port,
                    protocol,
                    default_action: default_action.clone(),
                    tags: Tags::from([(TAG_CLUSTER_NAME.to_owned(), self.config.cluster_name.clone())]),
                };
                info!("creating listener {} on service {service_id}", input.name);
                match self.client.create_listener(&input).await {
                    Ok(summary) => summary,
                    Err(MeshError::AlreadyExists(_)) => self
                        .client
                        .list_listeners(service_id)
                        .await?
                        .into_iter()
                        .find(|l| l.port == spec.port && l.protocol == input.protocol)
                        .ok_or(DeployError::Mesh(MeshError::NotFound))?,
                    Err(e) => return Err(e.into()),
                }
            },
        };

        Ok(ListenerStatus {
            name: summary.name,
            arn: summary.arn,
            id: summary.id,
            service_id: service_id.to_owned(),
        })
    }

    pub async fn delete(&self, service_id: &str, listener_id: &str) -> Result<(), DeployError> {
        match self.client.delete_listener(service_id, listener_id).await {
            Ok(()) | Err(MeshError::NotFound) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list(&self, service_id: &str) -> Result<Vec<ListenerSummary>, DeployError> {
        Ok(self.client.list_listeners(service_id).await?)
    }

    pub async fn is_controller_owned(&self, listener_arn: &str) -> Result<bool, DeployError> {
        let tags = self.client.list_tags(listener_arn).await?;
        Ok(tags.get(TAG_CLUSTER_NAME) == Some(&self.config.cluster_name))
    }
}

fn listener_name(spec: &ListenerSpec) -> String {
    format!("k8s-{}-{}", spec.port, spec.protocol.to_string().to_lowercase().replace('_', "-"))
}
