use super::StackResource;

pub const SERVICE_NETWORK_RESOURCE_ID: &str = "service-network";

/// One per Gateway. The mesh-side grouping the Gateway's services join.
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceNetwork {
    pub spec: ServiceNetworkSpec,
    pub status: Option<ServiceNetworkStatus>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ServiceNetworkSpec {
    pub name: String,
    pub associate_to_vpc: bool,
    pub security_group_ids: Vec<String>,
    pub is_deleted: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ServiceNetworkStatus {
    pub arn: String,
    pub id: String,
    pub snva_security_group_ids: Vec<String>,
}

impl ServiceNetwork {
    pub fn new(spec: ServiceNetworkSpec) -> Self {
        Self { spec, status: None }
    }
}

impl StackResource for ServiceNetwork {
    const KIND: &'static str = "Mesh::ServiceNetwork";

    fn id(&self) -> &str {
        SERVICE_NETWORK_RESOURCE_ID
    }
}
