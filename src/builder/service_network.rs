use std::sync::Arc;

use gateway_api::apis::standard::gateways::Gateway;
use kube::Resource;

use super::BuildError;
use crate::{
    cluster::ClusterReader,
    common::ResourceKey,
    model::{ServiceNetwork, ServiceNetworkSpec, Stack},
    policy::{resolve_conflicts, PolicyConflict},
};

#[derive(Debug)]
pub struct ServiceNetworkBuildOutput {
    pub stack: Stack,
    pub service_network: ServiceNetworkSpec,
    pub policy_conflicts: Vec<PolicyConflict>,
}

/// Builds the service-network stack for a Gateway. A VpcAssociationPolicy
/// attached to the Gateway contributes the association flag and security
/// groups; without one the network is associated to this controller's VPC
/// with no security groups.
pub struct ServiceNetworkBuilder {
    cluster: Arc<dyn ClusterReader>,
}

impl ServiceNetworkBuilder {
    pub fn new(cluster: Arc<dyn ClusterReader>) -> Self {
        Self { cluster }
    }

    pub async fn build(&self, gateway: &Gateway) -> Result<ServiceNetworkBuildOutput, BuildError> {
        let gateway_key = ResourceKey::from(gateway);
        let (policy, policy_conflicts) = resolve_conflicts(self.cluster.vpc_association_policies(&gateway_key).await?);

        let (associate_to_vpc, security_group_ids) = match policy {
            Some(policy) => (policy.config.associate_with_vpc.unwrap_or(true), policy.config.security_group_ids),
            None => (true, vec![]),
        };

        let spec = ServiceNetworkSpec {
            name: gateway_key.name,
            associate_to_vpc,
            security_group_ids,
            is_deleted: gateway.meta().deletion_timestamp.is_some(),
        };

        let mut stack = Stack::new();
        stack.add(ServiceNetwork::new(spec.clone()));

        Ok(ServiceNetworkBuildOutput {
            stack,
            service_network: spec,
            policy_conflicts,
        })
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::{
        apimachinery::pkg::apis::meta::v1::Time,
        chrono::{TimeZone, Utc},
    };

    use super::*;
    use crate::{
        cluster::MockClusterReader,
        policy::{PolicyAttachment, VpcAssociationPolicyConfig},
    };

    fn gateway(deleted: bool) -> Gateway {
        let mut gateway: Gateway = serde_yaml::from_str(
            r"
apiVersion: gateway.networking.k8s.io/v1
kind: Gateway
metadata:
  name: gw1
  namespace: default
spec:
  gatewayClassName: mesh
  listeners:
  - name: http
    port: 80
    protocol: HTTP
",
        )
        .unwrap();
        if deleted {
            gateway.metadata.deletion_timestamp = Some(Time(Utc.timestamp_opt(1_700_000_000, 0).unwrap()));
        }
        gateway
    }

    fn policy(name: &str, secs: i64, security_group_ids: &[&str]) -> PolicyAttachment<VpcAssociationPolicyConfig> {
        PolicyAttachment {
            name: name.to_owned(),
            namespace: "default".to_owned(),
            creation_timestamp: Some(Time(Utc.timestamp_opt(secs, 0).unwrap())),
            config: VpcAssociationPolicyConfig {
                associate_with_vpc: Some(true),
                security_group_ids: security_group_ids.iter().map(|s| (*s).to_owned()).collect(),
            },
        }
    }

    #[tokio::test]
    async fn gateway_without_policy_associates_with_no_security_groups() {
        let mut cluster = MockClusterReader::new();
        cluster.expect_vpc_association_policies().returning(|_| Ok(vec![]));

        let output = ServiceNetworkBuilder::new(Arc::new(cluster)).build(&gateway(false)).await.unwrap();
        assert_eq!(output.service_network.name, "gw1");
        assert!(output.service_network.associate_to_vpc);
        assert!(output.service_network.security_group_ids.is_empty());
        assert!(!output.service_network.is_deleted);
        assert_eq!(output.stack.list::<ServiceNetwork>().len(), 1);
    }

    #[tokio::test]
    async fn oldest_policy_contributes_security_groups_and_losers_surface() {
        let mut cluster = MockClusterReader::new();
        cluster
            .expect_vpc_association_policies()
            .returning(|_| Ok(vec![policy("newer", 200, &["sg-9"]), policy("older", 100, &["sg-1", "sg-2"])]));

        let output = ServiceNetworkBuilder::new(Arc::new(cluster)).build(&gateway(false)).await.unwrap();
        assert_eq!(output.service_network.security_group_ids, vec!["sg-1".to_owned(), "sg-2".to_owned()]);
        assert_eq!(output.policy_conflicts.len(), 1);
        assert_eq!(output.policy_conflicts[0].name, "newer");
    }

    #[tokio::test]
    async fn deletion_timestamp_marks_the_network_deleted() {
        let mut cluster = MockClusterReader::new();
        cluster.expect_vpc_association_policies().returning(|_| Ok(vec![]));

        let output = ServiceNetworkBuilder::new(Arc::new(cluster)).build(&gateway(true)).await.unwrap();
        assert!(output.service_network.is_deleted);
    }
}
