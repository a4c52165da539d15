use super::{name_fingerprint, truncate, Protocol, ProtocolVersion, StackResource};
use crate::mesh::HealthCheckConfig;

#[derive(Clone, Debug, PartialEq)]
pub struct TargetGroup {
    id: String,
    pub spec: TargetGroupSpec,
    pub status: Option<TargetGroupStatus>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TargetGroupSpec {
    pub k8s_service_name: String,
    pub k8s_service_namespace: String,
    pub k8s_cluster_name: String,
    pub source_type: TargetGroupSourceType,
    pub vpc_id: String,
    pub protocol: Protocol,
    pub protocol_version: ProtocolVersion,
    pub port: i64,
    pub health_check: Option<HealthCheckConfig>,
    pub is_deleted: bool,
}

/// What created the target group: a Route in this cluster, or a
/// ServiceExport whose group was materialised by another cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetGroupSourceType {
    Route,
    ServiceExport,
}

impl std::fmt::Display for TargetGroupSourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetGroupSourceType::Route => write!(f, "Route"),
            TargetGroupSourceType::ServiceExport => write!(f, "ServiceExport"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TargetGroupStatus {
    pub name: String,
    pub arn: String,
    pub id: String,
}

impl TargetGroup {
    pub fn new(id: String, spec: TargetGroupSpec) -> Self {
        Self { id, spec, status: None }
    }
}

impl TargetGroupSpec {
    /// Cloud-side name. The identity tuple is hashed in so two groups that
    /// differ only in port or protocol never collide within a VPC, while the
    /// plaintext identity stays readable in the tags.
    pub fn mesh_name(&self) -> String {
        let identity = format!(
            "{}/{}/{}/{}/{}/{}/{}",
            self.k8s_service_name, self.k8s_service_namespace, self.k8s_cluster_name, self.vpc_id, self.protocol, self.protocol_version, self.port
        );
        let fingerprint = name_fingerprint(&identity, 10);
        format!("k8s-{}-{}-{fingerprint}", truncate(&self.k8s_service_name, 16), truncate(&self.k8s_service_namespace, 8))
    }
}

impl StackResource for TargetGroup {
    const KIND: &'static str = "Mesh::TargetGroup";

    fn id(&self) -> &str {
        &self.id
    }
}
