use async_trait::async_trait;
use k8s_openapi::api::{core::v1::Service, discovery::v1::EndpointSlice};
use kube::{
    api::{Api, ApiResource, DynamicObject, ListParams},
    core::GroupVersionKind,
    Client,
};
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::{
    common::ResourceKey,
    mesh::HealthCheckConfig,
    policy::{AccessLogPolicyConfig, IamAuthPolicyConfig, PolicyAttachment, TargetGroupPolicyConfig, VpcAssociationPolicyConfig},
};

const SERVICE_NAME_LABEL: &str = "kubernetes.io/service-name";
const POLICY_GROUP: &str = "meshwork.io";
const POLICY_VERSION: &str = "v1alpha1";
const SERVICE_IMPORT_GROUP: &str = "multicluster.x-k8s.io";
const SERVICE_IMPORT_VERSION: &str = "v1alpha1";
const ANNOTATION_CLUSTER_NAME: &str = "meshwork.io/cluster-name";
const ANNOTATION_VPC_ID: &str = "meshwork.io/vpc";

pub type ClusterResult<T> = std::result::Result<T, ClusterError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusterError {
    #[error("cluster api error: {0}")]
    Api(String),
}

impl From<kube::Error> for ClusterError {
    fn from(value: kube::Error) -> Self {
        ClusterError::Api(value.to_string())
    }
}

/// A ServiceImport reduced to what target-group resolution needs: the
/// exported identity plus the optional cluster / VPC scoping annotations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ServiceImportRef {
    pub name: String,
    pub namespace: String,
    pub cluster_name: Option<String>,
    pub vpc_id: Option<String>,
}

/// Read access to the cluster state the builders need. The informer caches
/// live outside this crate; tests substitute the mock.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterReader: Send + Sync {
    async fn get_service(&self, key: &ResourceKey) -> ClusterResult<Option<Service>>;
    async fn list_endpoint_slices(&self, service: &ResourceKey) -> ClusterResult<Vec<EndpointSlice>>;
    async fn get_service_import(&self, key: &ResourceKey) -> ClusterResult<Option<ServiceImportRef>>;
    async fn target_group_policies(&self, service: &ResourceKey) -> ClusterResult<Vec<PolicyAttachment<TargetGroupPolicyConfig>>>;
    async fn vpc_association_policies(&self, gateway: &ResourceKey) -> ClusterResult<Vec<PolicyAttachment<VpcAssociationPolicyConfig>>>;
    async fn iam_auth_policies(&self, target: &ResourceKey) -> ClusterResult<Vec<PolicyAttachment<IamAuthPolicyConfig>>>;
    async fn access_log_policies(&self, target: &ResourceKey) -> ClusterResult<Vec<PolicyAttachment<AccessLogPolicyConfig>>>;
}

/// Direct-read implementation over a [`kube::Client`]. Policy kinds and
/// ServiceImport are consumed through the dynamic API so their schemas stay
/// outside this crate.
#[derive(Clone)]
pub struct KubeClusterReader {
    client: Client,
}

impl KubeClusterReader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn dynamic_api(&self, namespace: &str, group: &str, version: &str, kind: &str) -> Api<DynamicObject> {
        let gvk = GroupVersionKind::gvk(group, version, kind);
        let resource = ApiResource::from_gvk(&gvk);
        Api::namespaced_with(self.client.clone(), namespace, &resource)
    }

    async fn policies<T, S>(&self, kind: &str, target: &ResourceKey) -> ClusterResult<Vec<PolicyAttachment<T>>>
    where
        S: for<'de> Deserialize<'de> + PolicySpec<Config = T>,
    {
        let api = self.dynamic_api(&target.namespace, POLICY_GROUP, POLICY_VERSION, kind);
        let policies = api.list(&ListParams::default()).await?;

        let mut attachments = vec![];
        for object in policies {
            let name = object.metadata.name.clone().unwrap_or_default();
            let spec: S = match serde_json::from_value(object.data.get("spec").cloned().unwrap_or_default()) {
                Ok(spec) => spec,
                Err(e) => {
                    debug!("ignoring malformed {kind} {name}: {e}");
                    continue;
                },
            };
            if !spec.targets(target) {
                continue;
            }
            attachments.push(PolicyAttachment {
                name,
                namespace: object.metadata.namespace.clone().unwrap_or_default(),
                creation_timestamp: object.metadata.creation_timestamp.clone(),
                config: spec.into_config(),
            });
        }
        Ok(attachments)
    }
}

trait PolicySpec {
    type Config;

    fn targets(&self, target: &ResourceKey) -> bool;
    fn into_config(self) -> Self::Config;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetRef {
    kind: String,
    name: String,
}

impl TargetRef {
    fn matches(&self, target: &ResourceKey) -> bool {
        self.kind == target.kind && self.name == target.name
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetGroupPolicySpec {
    target_ref: TargetRef,
    protocol: Option<String>,
    protocol_version: Option<String>,
    health_check: Option<HealthCheckConfig>,
}

impl PolicySpec for TargetGroupPolicySpec {
    type Config = TargetGroupPolicyConfig;

    fn targets(&self, target: &ResourceKey) -> bool {
        self.target_ref.matches(target)
    }

    fn into_config(self) -> TargetGroupPolicyConfig {
        TargetGroupPolicyConfig {
            protocol: self.protocol,
            protocol_version: self.protocol_version,
            health_check: self.health_check,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VpcAssociationPolicySpec {
    target_ref: TargetRef,
    associate_with_vpc: Option<bool>,
    #[serde(default)]
    security_group_ids: Vec<String>,
}

impl PolicySpec for VpcAssociationPolicySpec {
    type Config = VpcAssociationPolicyConfig;

    fn targets(&self, target: &ResourceKey) -> bool {
        self.target_ref.matches(target)
    }

    fn into_config(self) -> VpcAssociationPolicyConfig {
        VpcAssociationPolicyConfig {
            associate_with_vpc: self.associate_with_vpc,
            security_group_ids: self.security_group_ids,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IamAuthPolicySpec {
    target_ref: TargetRef,
    #[serde(default)]
    policy: String,
}

impl PolicySpec for IamAuthPolicySpec {
    type Config = IamAuthPolicyConfig;

    fn targets(&self, target: &ResourceKey) -> bool {
        self.target_ref.matches(target)
    }

    fn into_config(self) -> IamAuthPolicyConfig {
        IamAuthPolicyConfig { policy: self.policy }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessLogPolicySpec {
    target_ref: TargetRef,
    #[serde(default)]
    destination_arn: String,
}

impl PolicySpec for AccessLogPolicySpec {
    type Config = AccessLogPolicyConfig;

    fn targets(&self, target: &ResourceKey) -> bool {
        self.target_ref.matches(target)
    }

    fn into_config(self) -> AccessLogPolicyConfig {
        AccessLogPolicyConfig {
            destination_arn: self.destination_arn,
        }
    }
}

#[async_trait]
impl ClusterReader for KubeClusterReader {
    async fn get_service(&self, key: &ResourceKey) -> ClusterResult<Option<Service>> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), &key.namespace);
        Ok(api.get_opt(&key.name).await?)
    }

    async fn list_endpoint_slices(&self, service: &ResourceKey) -> ClusterResult<Vec<EndpointSlice>> {
        let api: Api<EndpointSlice> = Api::namespaced(self.client.clone(), &service.namespace);
        let slices = api.list(&ListParams::default().labels(&format!("{SERVICE_NAME_LABEL}={}", service.name))).await?;
        Ok(slices.items)
    }

    async fn get_service_import(&self, key: &ResourceKey) -> ClusterResult<Option<ServiceImportRef>> {
        let api = self.dynamic_api(&key.namespace, SERVICE_IMPORT_GROUP, SERVICE_IMPORT_VERSION, "ServiceImport");
        let Some(import) = api.get_opt(&key.name).await? else {
            return Ok(None);
        };

        let annotations = import.metadata.annotations.unwrap_or_default();
        Ok(Some(ServiceImportRef {
            name: key.name.clone(),
            namespace: key.namespace.clone(),
            cluster_name: annotations.get(ANNOTATION_CLUSTER_NAME).cloned(),
            vpc_id: annotations.get(ANNOTATION_VPC_ID).cloned(),
        }))
    }

    async fn target_group_policies(&self, service: &ResourceKey) -> ClusterResult<Vec<PolicyAttachment<TargetGroupPolicyConfig>>> {
        self.policies::<_, TargetGroupPolicySpec>("TargetGroupPolicy", service).await
    }

    async fn vpc_association_policies(&self, gateway: &ResourceKey) -> ClusterResult<Vec<PolicyAttachment<VpcAssociationPolicyConfig>>> {
        self.policies::<_, VpcAssociationPolicySpec>("VpcAssociationPolicy", gateway).await
    }

    async fn iam_auth_policies(&self, target: &ResourceKey) -> ClusterResult<Vec<PolicyAttachment<IamAuthPolicyConfig>>> {
        self.policies::<_, IamAuthPolicySpec>("IAMAuthPolicy", target).await
    }

    async fn access_log_policies(&self, target: &ResourceKey) -> ClusterResult<Vec<PolicyAttachment<AccessLogPolicyConfig>>> {
        self.policies::<_, AccessLogPolicySpec>("AccessLogPolicy", target).await
    }
}
