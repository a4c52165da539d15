use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    config::MeshConfig,
    deploy::DeployError,
    mesh::{service_tags, CreateService, MeshClient, MeshError, ServiceSummary},
    model::{ServiceSpec, ServiceStatus},
};

pub struct ServiceManager {
    config: MeshConfig,
    client: Arc<dyn MeshClient>,
}

impl ServiceManager {
    pub fn new(config: MeshConfig, client: Arc<dyn MeshClient>) -> Self {
        Self { config, client }
    }

    pub async fn find(&self, spec: &ServiceSpec) -> Result<Option<ServiceSummary>, DeployError> {
        let name = spec.mesh_service_name(&self.config.cluster_name);
        Ok(self.client.list_services().await?.into_iter().find(|s| s.name == name))
    }

    pub async fn upsert(&self, spec: &ServiceSpec) -> Result<ServiceStatus, DeployError> {
        let summary = match self.find(spec).await? {
            Some(summary) => {
                if let Some(certificate_arn) = spec.certificate_arn.as_deref() {
                    debug!("refreshing certificate on service {}", summary.name);
                    self.client.update_service(&summary.id, Some(certificate_arn)).await?;
                }
                summary
            },
            None => {
                let input = CreateService {
                    name: spec.mesh_service_name(&self.config.cluster_name),
                    custom_domain_name: spec.custom_domain_name.clone(),
                    certificate_arn: spec.certificate_arn.clone(),
                    tags: service_tags(&self.config, spec),
                };
                info!("creating service {}", input.name);
                match self.client.create_service(&input).await {
                    Ok(summary) => summary,
                    // another reconcile got there first, adopt its result
                    Err(MeshError::AlreadyExists(_)) => self.find(spec).await?.ok_or(DeployError::Mesh(MeshError::NotFound))?,
                    Err(e) => return Err(e.into()),
                }
            },
        };

        Ok(ServiceStatus {
            arn: summary.arn,
            id: summary.id,
            dns_name: summary.dns_name,
        })
    }

    /// Deleting the service cascades to its listeners and rules on the mesh
    /// side; already-absent services succeed.
    pub async fn delete(&self, spec: &ServiceSpec) -> Result<(), DeployError> {
        let Some(summary) = self.find(spec).await? else {
            return Ok(());
        };
        info!("deleting service {}", summary.name);
        match self.client.delete_service(&summary.id).await {
            Ok(()) | Err(MeshError::NotFound) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{common::RouteType, mesh::MockMeshClient};

    fn config() -> MeshConfig {
        MeshConfig::builder()
            .account_id("123456789012".to_owned())
            .vpc_id("vpc-1".to_owned())
            .cluster_name("cluster-1".to_owned())
            .build()
    }

    fn spec() -> ServiceSpec {
        ServiceSpec {
            route_type: RouteType::Http,
            route_name: "orders".to_owned(),
            route_namespace: "shop".to_owned(),
            service_network_names: vec!["gw1".to_owned()],
            custom_domain_name: Some("orders.example.com".to_owned()),
            certificate_arn: None,
            is_deleted: false,
        }
    }

    fn summary(name: &str) -> ServiceSummary {
        ServiceSummary {
            id: "svc-1".to_owned(),
            arn: "arn:svc-1".to_owned(),
            name: name.to_owned(),
            dns_name: Some("svc-1.mesh.example".to_owned()),
            custom_domain_name: Some("orders.example.com".to_owned()),
        }
    }

    #[tokio::test]
    async fn creates_service_with_identity_tags() {
        let mut client = MockMeshClient::new();
        client.expect_list_services().returning(|| Ok(vec![]));
        client
            .expect_create_service()
            .withf(|input| {
                input.custom_domain_name.as_deref() == Some("orders.example.com")
                    && input.tags.get(crate::mesh::TAG_ROUTE_NAME).map(String::as_str) == Some("orders")
                    && input.tags.get(crate::mesh::TAG_ROUTE_KIND).map(String::as_str) == Some("HTTPRoute")
            })
            .returning(|input| Ok(summary(&input.name)));

        let manager = ServiceManager::new(config(), Arc::new(client));
        let status = manager.upsert(&spec()).await.unwrap();
        assert_eq!(status.id, "svc-1");
        assert_eq!(status.dns_name.as_deref(), Some("svc-1.mesh.example"));
    }

    #[tokio::test]
    async fn concurrent_creator_is_adopted() {
        let name = spec().mesh_service_name("cluster-1");
        let mut client = MockMeshClient::new();
        let lose_once = name.clone();
        client.expect_list_services().times(1).returning(|| Ok(vec![]));
        client
            .expect_create_service()
            .returning(move |_| Err(MeshError::AlreadyExists(lose_once.clone())));
        client.expect_list_services().returning(move || Ok(vec![summary(&name)]));

        let manager = ServiceManager::new(config(), Arc::new(client));
        let status = manager.upsert(&spec()).await.unwrap();
        assert_eq!(status.id, "svc-1");
    }

    #[tokio::test]
    async fn delete_of_absent_service_succeeds() {
        let mut client = MockMeshClient::new();
        client.expect_list_services().returning(|| Ok(vec![]));

        let manager = ServiceManager::new(config(), Arc::new(client));
        assert!(manager.delete(&spec()).await.is_ok());
    }
}
