use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{
    managers::{ListenerManager, RuleManager, ServiceManager, ServiceNetworkManager, TargetGroupManager, TargetsManager},
    synthesizers::{
        ListenerSynthesizer, RuleSynthesizer, ServiceNetworkSynthesizer, ServiceSynthesizer, TargetGroupSynthesizer, TargetsSynthesizer,
    },
    DeployError,
};
use crate::{cluster::ClusterReader, config::MeshConfig, mesh::MeshClient, model::Stack};

/// Runs one reconcile's stack against the live mesh, stage by stage. Target
/// groups go first so their ids exist when rules resolve; orphan cleanup
/// runs last, in reverse stage order, and never fails the reconcile.
///
/// A [`DeployError::MeshRetry`] from any stage halts the pipeline; the
/// caller requeues the reconcile on the backoff schedule.
pub struct Deployer {
    service_network_manager: ServiceNetworkManager,
    service_manager: ServiceManager,
    listener_manager: ListenerManager,
    rule_manager: RuleManager,
    target_group_manager: TargetGroupManager,
    targets_manager: TargetsManager,
    cluster: Arc<dyn ClusterReader>,
    cluster_name: String,
}

impl Deployer {
    pub fn new(config: MeshConfig, client: Arc<dyn MeshClient>, cluster: Arc<dyn ClusterReader>) -> Self {
        Self {
            service_network_manager: ServiceNetworkManager::new(config.clone(), Arc::clone(&client)),
            service_manager: ServiceManager::new(config.clone(), Arc::clone(&client)),
            listener_manager: ListenerManager::new(config.clone(), Arc::clone(&client)),
            rule_manager: RuleManager::new(config.clone(), Arc::clone(&client)),
            target_group_manager: TargetGroupManager::new(config.clone(), Arc::clone(&client)),
            targets_manager: TargetsManager::new(client),
            cluster,
            cluster_name: config.cluster_name,
        }
    }

    pub async fn deploy(&self, stack: &mut Stack, token: &CancellationToken) -> Result<(), DeployError> {
        let target_group_synthesizer = TargetGroupSynthesizer::new(&self.target_group_manager, self.cluster.as_ref(), &self.cluster_name);
        let targets_synthesizer = TargetsSynthesizer::new(&self.targets_manager);
        let service_network_synthesizer = ServiceNetworkSynthesizer::new(&self.service_network_manager);
        let service_synthesizer = ServiceSynthesizer::new(&self.service_manager);
        let listener_synthesizer = ListenerSynthesizer::new(&self.listener_manager, &self.target_group_manager);
        let rule_synthesizer = RuleSynthesizer::new(&self.rule_manager, &self.target_group_manager);

        debug!("synthesizing target groups");
        target_group_synthesizer.synthesize(stack, token).await?;
        debug!("synthesizing target registrations");
        targets_synthesizer.synthesize(stack, token).await?;
        debug!("synthesizing service network");
        service_network_synthesizer.synthesize(stack, token).await?;
        debug!("synthesizing service");
        service_synthesizer.synthesize(stack, token).await?;
        debug!("synthesizing listeners");
        listener_synthesizer.synthesize(stack, token).await?;
        debug!("synthesizing rules");
        rule_synthesizer.synthesize(stack, token).await?;

        // reverse stage order; a failed cleanup is retried next reconcile
        if let Err(e) = listener_synthesizer.cleanup(stack, token).await {
            warn!("listener orphan cleanup failed: {e}");
        }
        if let Err(e) = target_group_synthesizer.cleanup(stack, token).await {
            warn!("target group orphan cleanup failed: {e}");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cluster::MockClusterReader,
        common::{PathMatch, RouteType},
        mesh::{
            ListenerSummary, MockMeshClient, RuleSummary, ServiceSummary, TargetAddress, TargetGroupSummary,
        },
        model::{
            DefaultAction, Listener, ListenerSpec, Protocol, ProtocolVersion, Rule, RuleAction, RuleSpec, RuleTargetGroup, Service,
            ServiceSpec, Target, TargetGroup, TargetGroupRef, TargetGroupSourceType, TargetGroupSpec, Targets, TargetsSpec,
            SERVICE_RESOURCE_ID,
        },
    };

    fn config() -> MeshConfig {
        MeshConfig::builder()
            .account_id("123456789012".to_owned())
            .vpc_id("vpc-1".to_owned())
            .cluster_name("cluster-1".to_owned())
            .build()
    }

    fn route_stack() -> Stack {
        let mut stack = Stack::new();
        stack.add(Service::new(ServiceSpec {
            route_type: RouteType::Http,
            route_name: "service1".to_owned(),
            route_namespace: "default".to_owned(),
            service_network_names: vec!["gw1".to_owned()],
            custom_domain_name: None,
            certificate_arn: None,
            is_deleted: false,
        }));
        stack.add(Listener::new(ListenerSpec {
            stack_service_id: SERVICE_RESOURCE_ID.to_owned(),
            port: 80,
            protocol: Protocol::Http,
            protocol_version: Some(ProtocolVersion::Http1),
            default_action: DefaultAction::FixedResponse { status_code: 404 },
        }));
        stack.add(Rule::new(
            "rule-80-0".to_owned(),
            RuleSpec {
                stack_listener_id: Listener::stack_id(80, Protocol::Http),
                path_match: Some(PathMatch::Prefix("/".to_owned())),
                method: None,
                matched_headers: vec![],
                action: RuleAction {
                    target_groups: vec![RuleTargetGroup {
                        target_group: TargetGroupRef::Stack("tg-0".to_owned()),
                        weight: 10,
                    }],
                },
            },
        ));
        stack.add(TargetGroup::new(
            "tg-0".to_owned(),
            TargetGroupSpec {
                k8s_service_name: "tg1".to_owned(),
                k8s_service_namespace: "default".to_owned(),
                k8s_cluster_name: "cluster-1".to_owned(),
                source_type: TargetGroupSourceType::Route,
                vpc_id: "vpc-1".to_owned(),
                protocol: Protocol::Http,
                protocol_version: ProtocolVersion::Http1,
                port: 8080,
                health_check: None,
                is_deleted: false,
            },
        ));
        stack.add(Targets::new(TargetsSpec {
            stack_target_group_id: "tg-0".to_owned(),
            targets: vec![Target {
                ip: "10.0.0.1".to_owned(),
                port: 8080,
                availability_zone: None,
            }],
        }));
        stack
    }

    #[tokio::test]
    async fn deploys_a_route_stack_end_to_end() {
        let mut stack = route_stack();
        let tg_name_for_cleanup = stack.get::<TargetGroup>("tg-0").unwrap().spec.mesh_name();

        let mut client = MockMeshClient::new();
        client.expect_list_target_groups().times(1).returning(|| Ok(vec![]));
        client.expect_create_target_group().returning(move |input| {
            Ok(TargetGroupSummary {
                id: "mesh-tg-1".to_owned(),
                arn: "arn:mesh-tg-1".to_owned(),
                name: input.name.clone(),
                port: Some(input.port),
                protocol: Some(input.protocol.clone()),
                vpc_id: Some(input.vpc_id.clone()),
            })
        });
        client.expect_list_targets().returning(|_| Ok(vec![]));
        client
            .expect_register_targets()
            .withf(|tg_id, targets| tg_id == "mesh-tg-1" && targets == [TargetAddress { ip: "10.0.0.1".to_owned(), port: 8080 }])
            .returning(|_, _| Ok(()));
        client.expect_list_services().returning(|| Ok(vec![]));
        client.expect_create_service().returning(|input| {
            Ok(ServiceSummary {
                id: "svc-1".to_owned(),
                arn: "arn:svc-1".to_owned(),
                name: input.name.clone(),
                dns_name: Some("svc-1.mesh.example".to_owned()),
                custom_domain_name: None,
            })
        });
        client.expect_list_listeners().times(1).returning(|_| Ok(vec![]));
        client.expect_create_listener().returning(|input| {
            Ok(ListenerSummary {
                id: "listener-1".to_owned(),
                arn: "arn:listener-1".to_owned(),
                name: input.name.clone(),
                port: input.port,
                protocol: input.protocol.clone(),
            })
        });
        client.expect_list_rules().returning(|_, _| Ok(vec![]));
        client.expect_create_rule().withf(|service_id, listener_id, rule| {
            service_id == "svc-1" && listener_id == "listener-1" && rule.priority == 1
        }).returning(|_, _, rule| {
            Ok(RuleSummary {
                id: "rule-1".to_owned(),
                arn: "arn:rule-1".to_owned(),
                name: rule.name.clone(),
                priority: rule.priority,
                is_default: false,
                rule_match: Some(rule.rule_match.clone()),
                action: Some(rule.action.clone()),
            })
        });
        // cleanup passes see exactly the intended resources, nothing to do
        client.expect_list_listeners().returning(|_| {
            Ok(vec![ListenerSummary {
                id: "listener-1".to_owned(),
                arn: "arn:listener-1".to_owned(),
                name: "k8s-80-http".to_owned(),
                port: 80,
                protocol: "HTTP".to_owned(),
            }])
        });
        client.expect_list_target_groups().returning(move || {
            Ok(vec![TargetGroupSummary {
                id: "mesh-tg-1".to_owned(),
                arn: "arn:mesh-tg-1".to_owned(),
                name: tg_name_for_cleanup.clone(),
                port: Some(8080),
                protocol: Some("HTTP".to_owned()),
                vpc_id: Some("vpc-1".to_owned()),
            }])
        });

        let deployer = Deployer::new(config(), Arc::new(client), Arc::new(MockClusterReader::new()));
        deployer.deploy(&mut stack, &CancellationToken::new()).await.unwrap();

        assert_eq!(stack.get::<TargetGroup>("tg-0").unwrap().status.as_ref().map(|s| s.id.as_str()), Some("mesh-tg-1"));
        let service = stack.get::<Service>(SERVICE_RESOURCE_ID).unwrap();
        assert_eq!(service.status.as_ref().map(|s| s.id.as_str()), Some("svc-1"));
        let listener = stack.get::<Listener>(&Listener::stack_id(80, Protocol::Http)).unwrap();
        assert_eq!(listener.status.as_ref().map(|s| s.id.as_str()), Some("listener-1"));
        let rule = stack.get::<Rule>("rule-80-0").unwrap();
        assert_eq!(rule.status.as_ref().map(|s| s.id.as_str()), Some("rule-1"));
    }

    #[tokio::test]
    async fn cancellation_halts_the_pipeline_without_mutation() {
        let token = CancellationToken::new();
        token.cancel();

        let mut stack = route_stack();
        let deployer = Deployer::new(config(), Arc::new(MockMeshClient::new()), Arc::new(MockClusterReader::new()));
        let err = deployer.deploy(&mut stack, &token).await.unwrap_err();
        assert_eq!(err, DeployError::Canceled);
        assert!(stack.get::<TargetGroup>("tg-0").unwrap().status.is_none());
    }

    #[tokio::test]
    async fn mesh_retry_from_a_stage_halts_the_pipeline() {
        let mut stack = route_stack();

        let mut client = MockMeshClient::new();
        client.expect_list_target_groups().returning(|| Ok(vec![]));
        client.expect_create_target_group().returning(|input| {
            Ok(TargetGroupSummary {
                id: "mesh-tg-1".to_owned(),
                arn: "arn:mesh-tg-1".to_owned(),
                name: input.name.clone(),
                port: Some(input.port),
                protocol: Some(input.protocol.clone()),
                vpc_id: Some(input.vpc_id.clone()),
            })
        });
        client.expect_list_targets().returning(|_| Ok(vec![]));
        client.expect_register_targets().returning(|_, _| Ok(()));
        client.expect_list_services().returning(|| Ok(vec![]));
        client
            .expect_create_service()
            .returning(|_| Err(crate::mesh::MeshError::Throttled));

        let deployer = Deployer::new(config(), Arc::new(client), Arc::new(MockClusterReader::new()));
        let err = deployer.deploy(&mut stack, &CancellationToken::new()).await.unwrap_err();
        assert_eq!(err, DeployError::Mesh(crate::mesh::MeshError::Throttled));
        // later stages never ran
        assert!(stack.get::<Listener>(&Listener::stack_id(80, Protocol::Http)).unwrap().status.is_none());
    }
}
