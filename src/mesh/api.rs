use std::collections::BTreeMap;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::common::PathMatch;

pub type Tags = BTreeMap<String, String>;

pub type MeshResult<T> = std::result::Result<T, MeshError>;

/// Error shape every concrete mesh SDK adapter maps onto. Managers branch on
/// these variants for idempotency (`NotFound`, `AlreadyExists`) and the
/// deployer for retry classification.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    #[error("resource not found")]
    NotFound,
    #[error("resource already exists: {0}")]
    AlreadyExists(String),
    #[error("conflicting concurrent modification: {0}")]
    Conflict(String),
    #[error("request throttled")]
    Throttled,
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("network failure: {0}")]
    Network(String),
    #[error("invalid request: {0}")]
    Invalid(String),
}

impl MeshError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, MeshError::NotFound)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeaderMatch {
    pub name: String,
    pub match_type: HeaderMatchType,
    pub case_sensitive: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum HeaderMatchType {
    Exact(String),
    Prefix(String),
    Contains(String),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuleMatch {
    pub path: Option<PathMatch>,
    pub method: Option<String>,
    pub headers: Vec<HeaderMatch>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RuleAction {
    FixedResponse { status_code: i64 },
    Forward(ForwardAction),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ForwardAction {
    pub target_groups: Vec<WeightedTargetGroup>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WeightedTargetGroup {
    pub target_group_id: String,
    pub weight: i64,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthCheckConfig {
    pub enabled: Option<bool>,
    pub interval_seconds: Option<i64>,
    pub timeout_seconds: Option<i64>,
    pub healthy_threshold_count: Option<i64>,
    pub unhealthy_threshold_count: Option<i64>,
    pub path: Option<String>,
    pub port: Option<i64>,
    pub protocol: Option<String>,
    pub protocol_version: Option<String>,
    pub status_match: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ServiceNetworkSummary {
    pub id: String,
    pub arn: String,
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VpcAssociationStatus {
    CreateInProgress,
    Active,
    UpdateInProgress,
    DeleteInProgress,
    CreateFailed,
    DeleteFailed,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VpcAssociation {
    pub id: String,
    pub arn: String,
    pub service_network_id: String,
    pub vpc_id: String,
    pub status: VpcAssociationStatus,
    pub security_group_ids: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ServiceSummary {
    pub id: String,
    pub arn: String,
    pub name: String,
    pub dns_name: Option<String>,
    pub custom_domain_name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListenerSummary {
    pub id: String,
    pub arn: String,
    pub name: String,
    pub port: i64,
    pub protocol: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RuleSummary {
    pub id: String,
    pub arn: String,
    pub name: String,
    pub priority: i64,
    pub is_default: bool,
    pub rule_match: Option<RuleMatch>,
    pub action: Option<RuleAction>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TargetGroupSummary {
    pub id: String,
    pub arn: String,
    pub name: String,
    pub port: Option<i64>,
    pub protocol: Option<String>,
    pub vpc_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetAddress {
    pub ip: String,
    pub port: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreateService {
    pub name: String,
    pub custom_domain_name: Option<String>,
    pub certificate_arn: Option<String>,
    pub tags: Tags,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreateListener {
    pub service_id: String,
    pub name: String,
    pub port: i64,
    pub protocol: String,
    pub default_action: RuleAction,
    pub tags: Tags,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreateTargetGroup {
    pub name: String,
    pub vpc_id: String,
    pub port: i64,
    pub protocol: String,
    pub protocol_version: String,
    pub health_check: Option<HealthCheckConfig>,
    pub tags: Tags,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RuleUpdate {
    pub name: String,
    pub priority: i64,
    pub rule_match: RuleMatch,
    pub action: RuleAction,
    pub tags: Tags,
}

/// The mesh control-plane surface this controller drives. One adapter per
/// SDK; thread-safe and connection-pooled behind `Arc`.
///
/// Listing operations return everything visible to the caller; identity
/// filters are always applied client-side by the managers so partial
/// pagination on the SDK side cannot hide a resource from the tag checks.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MeshClient: Send + Sync {
    async fn create_service_network(&self, name: &str, tags: &Tags) -> MeshResult<ServiceNetworkSummary>;
    async fn delete_service_network(&self, service_network_id: &str) -> MeshResult<()>;
    async fn list_service_networks(&self) -> MeshResult<Vec<ServiceNetworkSummary>>;
    async fn create_vpc_association(&self, service_network_id: &str, vpc_id: &str, security_group_ids: &[String], tags: &Tags) -> MeshResult<VpcAssociation>;
    async fn get_vpc_association(&self, association_id: &str) -> MeshResult<VpcAssociation>;
    async fn update_vpc_association(&self, association_id: &str, security_group_ids: &[String]) -> MeshResult<VpcAssociation>;
    async fn delete_vpc_association(&self, association_id: &str) -> MeshResult<()>;
    async fn list_vpc_associations<'a>(&self, service_network_id: Option<&'a str>, vpc_id: Option<&'a str>) -> MeshResult<Vec<VpcAssociation>>;
    async fn list_tags(&self, arn: &str) -> MeshResult<Tags>;

    async fn create_service(&self, input: &CreateService) -> MeshResult<ServiceSummary>;
    async fn update_service<'a>(&self, service_id: &str, certificate_arn: Option<&'a str>) -> MeshResult<()>;
    async fn delete_service(&self, service_id: &str) -> MeshResult<()>;
    async fn list_services(&self) -> MeshResult<Vec<ServiceSummary>>;

    async fn create_listener(&self, input: &CreateListener) -> MeshResult<ListenerSummary>;
    async fn update_listener(&self, service_id: &str, listener_id: &str, default_action: &RuleAction) -> MeshResult<()>;
    async fn delete_listener(&self, service_id: &str, listener_id: &str) -> MeshResult<()>;
    async fn list_listeners(&self, service_id: &str) -> MeshResult<Vec<ListenerSummary>>;

    async fn create_rule(&self, service_id: &str, listener_id: &str, rule: &RuleUpdate) -> MeshResult<RuleSummary>;
    async fn update_rule(&self, service_id: &str, listener_id: &str, rule_id: &str, rule: &RuleUpdate) -> MeshResult<()>;
    async fn delete_rule(&self, service_id: &str, listener_id: &str, rule_id: &str) -> MeshResult<()>;
    async fn list_rules(&self, service_id: &str, listener_id: &str) -> MeshResult<Vec<RuleSummary>>;
    async fn batch_update_rule_priorities(&self, service_id: &str, listener_id: &str, priorities: &[(String, i64)]) -> MeshResult<()>;

    async fn create_target_group(&self, input: &CreateTargetGroup) -> MeshResult<TargetGroupSummary>;
    async fn delete_target_group(&self, target_group_id: &str) -> MeshResult<()>;
    async fn list_target_groups(&self) -> MeshResult<Vec<TargetGroupSummary>>;

    async fn register_targets(&self, target_group_id: &str, targets: &[TargetAddress]) -> MeshResult<()>;
    async fn deregister_targets(&self, target_group_id: &str, targets: &[TargetAddress]) -> MeshResult<()>;
    async fn list_targets(&self, target_group_id: &str) -> MeshResult<Vec<TargetAddress>>;
}
