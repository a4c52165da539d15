use super::StackResource;
use crate::common::RouteType;

pub const SERVICE_RESOURCE_ID: &str = "service";

/// One per Route. Owns the listeners carved out of the parent Gateway.
#[derive(Clone, Debug, PartialEq)]
pub struct Service {
    pub spec: ServiceSpec,
    pub status: Option<ServiceStatus>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ServiceSpec {
    pub route_type: RouteType,
    pub route_name: String,
    pub route_namespace: String,
    pub service_network_names: Vec<String>,
    pub custom_domain_name: Option<String>,
    pub certificate_arn: Option<String>,
    pub is_deleted: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ServiceStatus {
    pub arn: String,
    pub id: String,
    pub dns_name: Option<String>,
}

impl Service {
    pub fn new(spec: ServiceSpec) -> Self {
        Self { spec, status: None }
    }
}

impl ServiceSpec {
    /// Cloud-side name: route kind, name and namespace stay readable, the
    /// cluster disambiguation lives in the fingerprint so two clusters
    /// projecting the same route never collide.
    pub fn mesh_service_name(&self, cluster_name: &str) -> String {
        let kind = match self.route_type {
            RouteType::Http => "http",
            RouteType::Grpc => "grpc",
            RouteType::Tls => "tls",
        };
        let identity = format!("{cluster_name}/{kind}/{}/{}", self.route_namespace, self.route_name);
        let fingerprint = super::name_fingerprint(&identity, 10);
        format!("{kind}-{}-{}-{fingerprint}", super::truncate(&self.route_name, 16), super::truncate(&self.route_namespace, 8))
    }
}

impl StackResource for Service {
    const KIND: &'static str = "Mesh::Service";

    fn id(&self) -> &str {
        SERVICE_RESOURCE_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_name_disambiguates_cluster_and_kind() {
        let spec = ServiceSpec {
            route_type: RouteType::Http,
            route_name: "orders".to_owned(),
            route_namespace: "shop".to_owned(),
            service_network_names: vec![],
            custom_domain_name: None,
            certificate_arn: None,
            is_deleted: false,
        };
        let name = spec.mesh_service_name("cluster-1");
        assert!(name.starts_with("http-orders-shop-"));
        assert_eq!(name, spec.mesh_service_name("cluster-1"));
        assert_ne!(name, spec.mesh_service_name("cluster-2"));

        let grpc = ServiceSpec {
            route_type: RouteType::Grpc,
            ..spec
        };
        assert_ne!(grpc.mesh_service_name("cluster-1"), name);
    }
}
