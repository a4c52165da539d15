mod api;
mod tags;

pub use api::{
    CreateListener, CreateService, CreateTargetGroup, ForwardAction, HeaderMatch, HeaderMatchType, HealthCheckConfig, ListenerSummary,
    MeshClient, MeshError, MeshResult, RuleAction, RuleMatch, RuleSummary, RuleUpdate, ServiceNetworkSummary, ServiceSummary, Tags,
    TargetAddress, TargetGroupSummary, VpcAssociation, VpcAssociationStatus, WeightedTargetGroup,
};
#[cfg(test)]
pub use api::MockMeshClient;
pub use tags::{
    service_network_tags, service_tags, target_group_tags, TagDecodeError, TargetGroupTagFilter, TargetGroupTags, SOURCE_TYPE_ROUTE,
    SOURCE_TYPE_SERVICE_EXPORT, TAG_CLUSTER_NAME, TAG_PORT, TAG_PROTOCOL, TAG_PROTOCOL_VERSION, TAG_ROUTE_KIND, TAG_ROUTE_NAME,
    TAG_ROUTE_NAMESPACE, TAG_SERVICE_NAME, TAG_SERVICE_NAMESPACE, TAG_SERVICE_NETWORK_OWNED_BY_VPC, TAG_SOURCE_TYPE,
};
