use std::sync::Arc;

use gateway_api::apis::standard::gateways::{Gateway, GatewayListeners, GatewayListenersTlsMode};
use tracing::debug;

use super::{rule::translate_rule_match, target_group::BackendTargetGroupBuilder, targets::build_targets, BuildError};
use crate::{
    cluster::ClusterReader,
    common::{ResourceKey, Route, RouteType},
    config::MeshConfig,
    model::{
        DefaultAction, Listener, ListenerSpec, Protocol, ProtocolVersion, Rule, RuleAction, RuleSpec, Service, ServiceSpec, Stack,
        SERVICE_RESOURCE_ID,
    },
    policy::PolicyConflict,
};

const CERTIFICATE_ARN_OPTION: &str = "meshwork.io/certificate-arn";

#[derive(Debug)]
pub struct RouteBuildOutput {
    pub stack: Stack,
    pub policy_conflicts: Vec<PolicyConflict>,
}

/// Translates one Route plus its parent Gateway into the stack of intended
/// mesh resources: one service, a listener per matched Gateway listener, a
/// rule per route rule and a target group per unique Service backend.
pub struct RouteStackBuilder {
    config: MeshConfig,
    cluster: Arc<dyn ClusterReader>,
}

impl RouteStackBuilder {
    pub fn new(config: MeshConfig, cluster: Arc<dyn ClusterReader>) -> Self {
        Self { config, cluster }
    }

    pub async fn build(&self, route: &Route, gateway: &Gateway) -> Result<RouteBuildOutput, BuildError> {
        let mut stack = Stack::new();
        let matched = matched_listeners(route, gateway);
        if matched.is_empty() {
            debug!("route {} matches no listener on gateway {}", route.resource_key, ResourceKey::from(gateway));
        }

        stack.add(Service::new(ServiceSpec {
            route_type: route.route_type(),
            route_name: route.name().to_owned(),
            route_namespace: route.namespace().to_owned(),
            service_network_names: vec![ResourceKey::from(gateway).name],
            custom_domain_name: route.hostnames().iter().find(|h| !h.contains('*')).cloned(),
            certificate_arn: matched.iter().find_map(|l| certificate_arn(l)),
            is_deleted: route.is_deleted,
        }));

        let mut tg_builder = BackendTargetGroupBuilder::new(&self.config, self.cluster.as_ref());
        let mut rule_errors = vec![];

        for gateway_listener in &matched {
            let protocol = listener_protocol(gateway_listener)?;
            let port = i64::from(gateway_listener.port);
            let listener_id = Listener::stack_id(port, protocol);

            let mut rules = vec![];
            for (index, route_rule) in route.rules().iter().enumerate() {
                let translated = match translate_rule_match(route_rule) {
                    Ok(translated) => translated,
                    Err(e) => {
                        rule_errors.push(e);
                        continue;
                    },
                };

                let mut target_groups = vec![];
                for backend in &route_rule.backends {
                    target_groups.push(tg_builder.build(route, backend, &mut stack).await?);
                }

                rules.push(Rule::new(
                    format!("rule-{port}-{index}"),
                    RuleSpec {
                        stack_listener_id: listener_id.clone(),
                        path_match: translated.path,
                        method: translated.method,
                        matched_headers: translated.headers,
                        action: RuleAction { target_groups },
                    },
                ));
            }

            // TLS_PASSTHROUGH cannot answer with a fixed response; it forwards
            // straight to its single rule's targets. A wrong rule count is
            // caught during listener synthesis.
            let default_action = match protocol {
                Protocol::TlsPassthrough => DefaultAction::Forward(rules.first().map(|r| r.spec.action.clone()).unwrap_or_default()),
                _ => DefaultAction::FixedResponse { status_code: 404 },
            };

            stack.add(Listener::new(ListenerSpec {
                stack_service_id: SERVICE_RESOURCE_ID.to_owned(),
                port,
                protocol,
                protocol_version: match route.route_type() {
                    RouteType::Http => Some(ProtocolVersion::Http1),
                    RouteType::Grpc => Some(ProtocolVersion::Grpc),
                    RouteType::Tls => None,
                },
                default_action,
            }));

            for rule in rules {
                stack.add(rule);
            }
        }

        match rule_errors.len() {
            0 => {},
            1 => return Err(rule_errors.remove(0)),
            _ => return Err(BuildError::Multiple(rule_errors)),
        }

        build_targets(self.cluster.as_ref(), &mut stack).await?;

        Ok(RouteBuildOutput {
            stack,
            policy_conflicts: tg_builder.into_policy_conflicts(),
        })
    }
}

fn matched_listeners<'a>(route: &Route, gateway: &'a Gateway) -> Vec<&'a GatewayListeners> {
    let gateway_key = ResourceKey::from(gateway);
    let selectors: Vec<_> = route
        .parents()
        .iter()
        .filter(|parent| parent.resource_key.name == gateway_key.name && parent.resource_key.namespace == gateway_key.namespace)
        .collect();

    gateway
        .spec
        .listeners
        .iter()
        .filter(|listener| compatible_protocol(route.route_type(), &listener.protocol))
        .filter(|listener| {
            selectors.iter().any(|selector| {
                let section_ok = selector.section_name.as_ref().map_or(true, |section| *section == listener.name);
                let port_ok = selector.port.map_or(true, |port| port == listener.port);
                section_ok && port_ok
            })
        })
        .collect()
}

fn compatible_protocol(route_type: RouteType, listener_protocol: &str) -> bool {
    match route_type {
        RouteType::Http | RouteType::Grpc => matches!(listener_protocol, "HTTP" | "HTTPS"),
        RouteType::Tls => listener_protocol == "TLS",
    }
}

fn listener_protocol(listener: &GatewayListeners) -> Result<Protocol, BuildError> {
    match listener.protocol.as_str() {
        "HTTP" => Ok(Protocol::Http),
        "HTTPS" => Ok(Protocol::Https),
        "TLS" => match listener.tls.as_ref().and_then(|tls| tls.mode.as_ref()) {
            Some(GatewayListenersTlsMode::Terminate) => Ok(Protocol::Https),
            _ => Ok(Protocol::TlsPassthrough),
        },
        other => Err(BuildError::UnsupportedListenerProtocol(other.to_owned())),
    }
}

fn certificate_arn(listener: &GatewayListeners) -> Option<String> {
    listener.tls.as_ref().and_then(|tls| tls.options.as_ref()).and_then(|options| options.get(CERTIFICATE_ARN_OPTION).cloned())
}

#[cfg(test)]
mod tests {
    use gateway_api::apis::{experimental::tlsroutes::TLSRoute, standard::{grpcroutes::GRPCRoute, httproutes::HTTPRoute}};

    use super::*;
    use crate::{
        cluster::MockClusterReader,
        common::PathMatch,
        mesh::{HeaderMatch, HeaderMatchType},
        model::{Rule, RuleTargetGroup, Service, ServiceImportTargetGroup, StackResource, TargetGroup, TargetGroupRef, Targets},
    };

    fn config() -> MeshConfig {
        MeshConfig::builder()
            .account_id("123456789012".to_owned())
            .vpc_id("vpc-1".to_owned())
            .cluster_name("cluster-1".to_owned())
            .build()
    }

    fn reader() -> MockClusterReader {
        let mut reader = MockClusterReader::new();
        reader.expect_get_service().returning(|_| Ok(None));
        reader.expect_get_service_import().returning(|_| Ok(None));
        reader.expect_target_group_policies().returning(|_| Ok(vec![]));
        reader.expect_list_endpoint_slices().returning(|_| Ok(vec![]));
        reader
    }

    fn builder() -> RouteStackBuilder {
        RouteStackBuilder::new(config(), Arc::new(reader()))
    }

    fn http_gateway() -> Gateway {
        serde_yaml::from_str(
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
        .unwrap()
    }

    fn http_route(yaml: &str) -> Route {
        let kube_route: HTTPRoute = serde_yaml::from_str(yaml).unwrap();
        Route::try_from(&kube_route).unwrap()
    }

    fn stack_target_group_ref(rule: &Rule, index: usize) -> (&TargetGroupRef, i64) {
        let tg = &rule.spec.action.target_groups[index];
        (&tg.target_group, tg.weight)
    }

    // S1: one rule, one Service backend, no matches.
    #[tokio::test]
    async fn default_forward_rule() {
        let route = http_route(
            r"
apiVersion: gateway.networking.k8s.io/v1
kind: HTTPRoute
metadata:
  name: service1
  namespace: default
spec:
  parentRefs:
  - name: gw1
    sectionName: http
  rules:
  - backendRefs:
    - name: tg1
      kind: Service
      port: 8080
      weight: 10
",
        );

        let output = builder().build(&route, &http_gateway()).await.unwrap();
        let stack = output.stack;

        assert_eq!(stack.list::<Service>().len(), 1);
        let listeners = stack.list::<Listener>();
        assert_eq!(listeners.len(), 1);
        assert_eq!(listeners[0].spec.port, 80);
        assert_eq!(listeners[0].spec.protocol, Protocol::Http);
        assert_eq!(listeners[0].spec.default_action, DefaultAction::FixedResponse { status_code: 404 });

        let rules = stack.list::<Rule>();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].spec.path_match, Some(PathMatch::Prefix("/".to_owned())));
        assert_eq!(
            stack_target_group_ref(rules[0], 0),
            (&TargetGroupRef::Stack("tg-0".to_owned()), 10)
        );

        let target_groups = stack.list::<TargetGroup>();
        assert_eq!(target_groups.len(), 1);
        assert_eq!(target_groups[0].id(), "tg-0");
        assert_eq!(target_groups[0].spec.port, 8080);
    }

    // S2: path + method + header matches.
    #[tokio::test]
    async fn path_method_and_header_matches() {
        let route = http_route(
            r"
apiVersion: gateway.networking.k8s.io/v1
kind: HTTPRoute
metadata:
  name: service1
  namespace: default
spec:
  parentRefs:
  - name: gw1
    sectionName: http
  rules:
  - matches:
    - path:
        type: Exact
        value: /ver1
      method: GET
      headers:
      - name: env1
        type: Exact
        value: test1
    backendRefs:
    - name: tg1
      kind: Service
      port: 8080
      weight: 10
",
        );

        let output = builder().build(&route, &http_gateway()).await.unwrap();
        let rules = output.stack.list::<Rule>();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].spec.path_match, Some(PathMatch::Exact("/ver1".to_owned())));
        assert_eq!(rules[0].spec.method.as_deref(), Some("GET"));
        assert_eq!(
            rules[0].spec.matched_headers,
            vec![HeaderMatch {
                name: "env1".to_owned(),
                match_type: HeaderMatchType::Exact("test1".to_owned()),
                case_sensitive: false,
            }]
        );
        assert_eq!(
            stack_target_group_ref(rules[0], 0),
            (&TargetGroupRef::Stack("tg-0".to_owned()), 10)
        );
    }

    // S3: gRPC service + method synthesize the exact path, POST only.
    #[tokio::test]
    async fn grpc_service_and_method() {
        let kube_route: GRPCRoute = serde_yaml::from_str(
            r"
apiVersion: gateway.networking.k8s.io/v1
kind: GRPCRoute
metadata:
  name: service1
  namespace: default
spec:
  parentRefs:
  - name: gw1
    sectionName: http
  rules:
  - matches:
    - method:
        type: Exact
        service: service
        method: method1
    backendRefs:
    - name: tg1
      kind: Service
      port: 8080
      weight: 10
",
        )
        .unwrap();
        let route = Route::try_from(&kube_route).unwrap();

        let output = builder().build(&route, &http_gateway()).await.unwrap();
        let rules = output.stack.list::<Rule>();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].spec.path_match, Some(PathMatch::Exact("/service/method1".to_owned())));
        assert_eq!(rules[0].spec.method.as_deref(), Some("POST"));
        assert_eq!(
            stack_target_group_ref(rules[0], 0),
            (&TargetGroupRef::Stack("tg-0".to_owned()), 10)
        );

        let listeners = output.stack.list::<Listener>();
        assert_eq!(listeners[0].spec.protocol_version, Some(ProtocolVersion::Grpc));
    }

    // S4: weighted Service + cross-namespace ServiceImport backends.
    #[tokio::test]
    async fn weighted_cross_namespace_service_import() {
        let route = http_route(
            r"
apiVersion: gateway.networking.k8s.io/v1
kind: HTTPRoute
metadata:
  name: service1
  namespace: default
spec:
  parentRefs:
  - name: gw1
    sectionName: http
  rules:
  - backendRefs:
    - name: tg1
      kind: Service
      port: 8080
      weight: 10
    - name: tg2
      kind: ServiceImport
      namespace: testnamespace
      weight: 90
",
        );

        let output = builder().build(&route, &http_gateway()).await.unwrap();
        let rules = output.stack.list::<Rule>();
        assert_eq!(rules.len(), 1);
        assert_eq!(
            rules[0].spec.action.target_groups,
            vec![
                RuleTargetGroup {
                    target_group: TargetGroupRef::Stack("tg-0".to_owned()),
                    weight: 10,
                },
                RuleTargetGroup {
                    target_group: TargetGroupRef::ServiceImport(ServiceImportTargetGroup {
                        service_name: "tg2".to_owned(),
                        service_namespace: "testnamespace".to_owned(),
                        cluster_name: None,
                        vpc_id: None,
                    }),
                    weight: 90,
                },
            ]
        );
        // only the Service backend materialises a stack target group
        assert_eq!(output.stack.list::<TargetGroup>().len(), 1);
    }

    #[tokio::test]
    async fn unsupported_backend_kind_yields_the_sentinel() {
        let route = http_route(
            r"
apiVersion: gateway.networking.k8s.io/v1
kind: HTTPRoute
metadata:
  name: service1
  namespace: default
spec:
  parentRefs:
  - name: gw1
    sectionName: http
  rules:
  - backendRefs:
    - name: somepod
      kind: Pod
      weight: 1
",
        );

        let output = builder().build(&route, &http_gateway()).await.unwrap();
        let rules = output.stack.list::<Rule>();
        assert_eq!(
            stack_target_group_ref(rules[0], 0),
            (&TargetGroupRef::Stack(crate::model::INVALID_BACKEND_REF_TG.to_owned()), 1)
        );
    }

    #[tokio::test]
    async fn duplicate_backends_share_one_target_group() {
        let route = http_route(
            r"
apiVersion: gateway.networking.k8s.io/v1
kind: HTTPRoute
metadata:
  name: service1
  namespace: default
spec:
  parentRefs:
  - name: gw1
    sectionName: http
  rules:
  - backendRefs:
    - name: tg1
      kind: Service
      port: 8080
  - backendRefs:
    - name: tg1
      kind: Service
      port: 8080
",
        );

        let output = builder().build(&route, &http_gateway()).await.unwrap();
        assert_eq!(output.stack.list::<TargetGroup>().len(), 1);
        assert_eq!(output.stack.list::<Rule>().len(), 2);
    }

    #[tokio::test]
    async fn tls_passthrough_listener_forwards_its_single_rule() {
        let gateway: Gateway = serde_yaml::from_str(
            r"
apiVersion: gateway.networking.k8s.io/v1
kind: Gateway
metadata:
  name: gw1
  namespace: default
spec:
  gatewayClassName: mesh
  listeners:
  - name: tls
    port: 443
    protocol: TLS
    tls:
      mode: Passthrough
",
        )
        .unwrap();
        let kube_route: TLSRoute = serde_yaml::from_str(
            r"
apiVersion: gateway.networking.k8s.io/v1alpha2
kind: TLSRoute
metadata:
  name: tls1
  namespace: default
spec:
  parentRefs:
  - name: gw1
    sectionName: tls
  rules:
  - backendRefs:
    - name: tg1
      kind: Service
      port: 443
",
        )
        .unwrap();
        let route = Route::try_from(&kube_route).unwrap();

        let output = builder().build(&route, &gateway).await.unwrap();
        let listeners = output.stack.list::<Listener>();
        assert_eq!(listeners.len(), 1);
        assert_eq!(listeners[0].spec.protocol, Protocol::TlsPassthrough);

        let rules = output.stack.list::<Rule>();
        assert_eq!(rules.len(), 1);
        assert!(rules[0].spec.matched_headers.is_empty());
        assert_eq!(rules[0].spec.path_match, None);
        assert_eq!(listeners[0].spec.default_action, DefaultAction::Forward(rules[0].spec.action.clone()));

        let target_groups = output.stack.list::<TargetGroup>();
        assert_eq!(target_groups[0].spec.protocol, Protocol::Tcp);
    }

    #[tokio::test]
    async fn building_twice_produces_the_same_stack() {
        let route = http_route(
            r"
apiVersion: gateway.networking.k8s.io/v1
kind: HTTPRoute
metadata:
  name: service1
  namespace: default
spec:
  parentRefs:
  - name: gw1
    sectionName: http
  rules:
  - matches:
    - path:
        type: PathPrefix
        value: /v2
    backendRefs:
    - name: tg1
      kind: Service
      port: 8080
",
        );

        let first = builder().build(&route, &http_gateway()).await.unwrap().stack;
        let second = builder().build(&route, &http_gateway()).await.unwrap().stack;

        assert_eq!(first.list::<Service>(), second.list::<Service>());
        assert_eq!(first.list::<Listener>(), second.list::<Listener>());
        assert_eq!(first.list::<Rule>(), second.list::<Rule>());
        assert_eq!(first.list::<TargetGroup>(), second.list::<TargetGroup>());
        assert_eq!(first.list::<Targets>(), second.list::<Targets>());
    }

    // every rule's listener reference resolves inside the same stack
    #[tokio::test]
    async fn rule_listener_references_resolve() {
        let route = http_route(
            r"
apiVersion: gateway.networking.k8s.io/v1
kind: HTTPRoute
metadata:
  name: service1
  namespace: default
spec:
  parentRefs:
  - name: gw1
    sectionName: http
  rules:
  - backendRefs:
    - name: tg1
      kind: Service
      port: 8080
  - matches:
    - path:
        type: Exact
        value: /other
    backendRefs:
    - name: tg2
      kind: Service
      port: 8080
",
        );

        let output = builder().build(&route, &http_gateway()).await.unwrap();
        for rule in output.stack.list::<Rule>() {
            assert!(output.stack.get::<Listener>(&rule.spec.stack_listener_id).is_ok());
        }
        assert_eq!(output.stack.list::<Rule>().len(), route.rules().len());
    }
}
