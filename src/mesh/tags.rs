use thiserror::Error;

use super::api::Tags;
use crate::{
    config::MeshConfig,
    model::{ServiceSpec, TargetGroupSourceType, TargetGroupSpec},
};

// Identity is persisted on the cloud resources themselves; the controller
// holds no database and reconstructs ownership from these keys on every
// reconcile. A resource missing the expected keys is not ours and must not
// be mutated or deleted.
pub const TAG_CLUSTER_NAME: &str = "K8SClusterName";
pub const TAG_SERVICE_NAME: &str = "K8SServiceName";
pub const TAG_SERVICE_NAMESPACE: &str = "K8SServiceNamespace";
pub const TAG_ROUTE_NAME: &str = "K8SRouteName";
pub const TAG_ROUTE_NAMESPACE: &str = "K8SRouteNamespace";
pub const TAG_ROUTE_KIND: &str = "K8SRouteKind";
pub const TAG_SOURCE_TYPE: &str = "K8SSourceType";
pub const TAG_PROTOCOL: &str = "K8SProtocol";
pub const TAG_PROTOCOL_VERSION: &str = "K8SProtocolVersion";
pub const TAG_PORT: &str = "K8SPort";
pub const TAG_SERVICE_NETWORK_OWNED_BY_VPC: &str = "K8SServiceNetworkOwnedByVPC";

pub const SOURCE_TYPE_ROUTE: &str = "Route";
pub const SOURCE_TYPE_SERVICE_EXPORT: &str = "ServiceExport";

#[derive(Error, Debug, PartialEq)]
pub enum TagDecodeError {
    #[error("missing tag {0}")]
    MissingTag(&'static str),
    #[error("unknown source type {0}")]
    UnknownSourceType(String),
}

pub fn service_network_tags(config: &MeshConfig) -> Tags {
    Tags::from([
        (TAG_SERVICE_NETWORK_OWNED_BY_VPC.to_owned(), config.vpc_id.clone()),
        (TAG_CLUSTER_NAME.to_owned(), config.cluster_name.clone()),
    ])
}

pub fn service_tags(config: &MeshConfig, spec: &ServiceSpec) -> Tags {
    Tags::from([
        (TAG_CLUSTER_NAME.to_owned(), config.cluster_name.clone()),
        (TAG_ROUTE_NAME.to_owned(), spec.route_name.clone()),
        (TAG_ROUTE_NAMESPACE.to_owned(), spec.route_namespace.clone()),
        (TAG_ROUTE_KIND.to_owned(), spec.route_type.kind().to_owned()),
    ])
}

pub fn target_group_tags(config: &MeshConfig, spec: &TargetGroupSpec) -> Tags {
    Tags::from([
        (TAG_CLUSTER_NAME.to_owned(), config.cluster_name.clone()),
        (TAG_SERVICE_NAME.to_owned(), spec.k8s_service_name.clone()),
        (TAG_SERVICE_NAMESPACE.to_owned(), spec.k8s_service_namespace.clone()),
        (
            TAG_SOURCE_TYPE.to_owned(),
            match spec.source_type {
                TargetGroupSourceType::Route => SOURCE_TYPE_ROUTE.to_owned(),
                TargetGroupSourceType::ServiceExport => SOURCE_TYPE_SERVICE_EXPORT.to_owned(),
            },
        ),
        (TAG_PROTOCOL.to_owned(), spec.protocol.to_string()),
        (TAG_PROTOCOL_VERSION.to_owned(), spec.protocol_version.to_string()),
        (TAG_PORT.to_owned(), spec.port.to_string()),
    ])
}

/// Identity decoded back out of a live target group's tags.
#[derive(Clone, Debug, PartialEq)]
pub struct TargetGroupTags {
    pub cluster_name: String,
    pub service_name: String,
    pub service_namespace: String,
    pub source_type: TargetGroupSourceType,
    pub protocol: Option<String>,
    pub protocol_version: Option<String>,
    pub port: Option<i64>,
}

impl TryFrom<&Tags> for TargetGroupTags {
    type Error = TagDecodeError;

    fn try_from(tags: &Tags) -> Result<Self, Self::Error> {
        let required = |key: &'static str| tags.get(key).cloned().ok_or(TagDecodeError::MissingTag(key));

        let source_type = match required(TAG_SOURCE_TYPE)?.as_str() {
            SOURCE_TYPE_ROUTE => TargetGroupSourceType::Route,
            SOURCE_TYPE_SERVICE_EXPORT => TargetGroupSourceType::ServiceExport,
            other => return Err(TagDecodeError::UnknownSourceType(other.to_owned())),
        };

        Ok(Self {
            cluster_name: required(TAG_CLUSTER_NAME)?,
            service_name: required(TAG_SERVICE_NAME)?,
            service_namespace: required(TAG_SERVICE_NAMESPACE)?,
            source_type,
            protocol: tags.get(TAG_PROTOCOL).cloned(),
            protocol_version: tags.get(TAG_PROTOCOL_VERSION).cloned(),
            port: tags.get(TAG_PORT).and_then(|p| p.parse().ok()),
        })
    }
}

/// Client-side filter used to locate the target group a ServiceImport points
/// at. Empty cluster/vpc filters match anything.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TargetGroupTagFilter {
    pub service_name: String,
    pub service_namespace: String,
    pub cluster_name: Option<String>,
    pub vpc_id: Option<String>,
}

impl TargetGroupTagFilter {
    pub fn matches(&self, tags: &TargetGroupTags, target_group_vpc_id: Option<&str>) -> bool {
        if tags.source_type != TargetGroupSourceType::ServiceExport {
            return false;
        }
        if tags.service_name != self.service_name || tags.service_namespace != self.service_namespace {
            return false;
        }
        if let Some(cluster) = self.cluster_name.as_ref() {
            if *cluster != tags.cluster_name {
                return false;
            }
        }
        if let Some(vpc) = self.vpc_id.as_ref() {
            if target_group_vpc_id != Some(vpc.as_str()) {
                return false;
            }
        }
        true
    }
}
