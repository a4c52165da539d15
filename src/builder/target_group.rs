use std::collections::HashMap;

use tracing::debug;

use super::BuildError;
use crate::{
    cluster::ClusterReader,
    common::{BackendKind, BackendRef, ResourceKey, Route, RouteType},
    config::MeshConfig,
    model::{
        Protocol, ProtocolVersion, RuleTargetGroup, ServiceImportTargetGroup, Stack, TargetGroup, TargetGroupRef, TargetGroupSourceType,
        TargetGroupSpec, INVALID_BACKEND_REF_TG,
    },
    policy::{resolve_conflicts, PolicyConflict},
};

/// Builds one target group per unique `(Service, port)` backend a route
/// references and hands back rule-scoped references. ServiceImport backends
/// are not materialised here; they resolve against live mesh state during
/// synthesis.
pub struct BackendTargetGroupBuilder<'a> {
    config: &'a MeshConfig,
    cluster: &'a dyn ClusterReader,
    assigned: HashMap<(ResourceKey, Option<i32>), String>,
    next_index: usize,
    policy_conflicts: Vec<PolicyConflict>,
}

impl<'a> BackendTargetGroupBuilder<'a> {
    pub fn new(config: &'a MeshConfig, cluster: &'a dyn ClusterReader) -> Self {
        Self {
            config,
            cluster,
            assigned: HashMap::new(),
            next_index: 0,
            policy_conflicts: vec![],
        }
    }

    pub fn into_policy_conflicts(self) -> Vec<PolicyConflict> {
        self.policy_conflicts
    }

    pub async fn build(&mut self, route: &Route, backend: &BackendRef, stack: &mut Stack) -> Result<RuleTargetGroup, BuildError> {
        let target_group = match &backend.kind {
            BackendKind::Service => TargetGroupRef::Stack(self.build_service_target_group(route, backend, stack).await?),
            BackendKind::ServiceImport => TargetGroupRef::ServiceImport(self.build_service_import_reference(route, backend).await?),
            BackendKind::Unsupported(kind) => {
                debug!("route {} references unsupported backend kind {kind}", route.resource_key);
                TargetGroupRef::Stack(INVALID_BACKEND_REF_TG.to_owned())
            },
        };

        Ok(RuleTargetGroup {
            target_group,
            weight: backend.weight,
        })
    }

    async fn build_service_target_group(&mut self, route: &Route, backend: &BackendRef, stack: &mut Stack) -> Result<String, BuildError> {
        let service_key = backend_service_key(route, backend, "Service");
        let cache_key = (service_key.clone(), backend.port);
        if let Some(id) = self.assigned.get(&cache_key) {
            return Ok(id.clone());
        }

        let service = self.cluster.get_service(&service_key).await?;
        if service.is_none() {
            debug!("backing service {service_key} not found yet, building target group without it");
        }

        let (policy, conflicts) = resolve_conflicts(self.cluster.target_group_policies(&service_key).await?);
        self.policy_conflicts.extend(conflicts);

        let (mut protocol, mut protocol_version) = match route.route_type() {
            RouteType::Http => (Protocol::Http, ProtocolVersion::Http1),
            RouteType::Grpc => (Protocol::Http, ProtocolVersion::Grpc),
            RouteType::Tls => (Protocol::Tcp, ProtocolVersion::Http1),
        };
        let mut health_check = None;
        if let Some(policy) = policy {
            if let Some(configured) = policy.config.protocol.as_deref().map(Protocol::try_from) {
                match configured {
                    Ok(p) => protocol = p,
                    Err(e) => debug!("ignoring target group policy protocol: {e}"),
                }
            }
            if let Some(configured) = policy.config.protocol_version.as_deref().map(ProtocolVersion::try_from) {
                match configured {
                    Ok(v) => protocol_version = v,
                    Err(e) => debug!("ignoring target group policy protocol version: {e}"),
                }
            }
            health_check = policy.config.health_check;
        }

        let port = backend
            .port
            .map(i64::from)
            .or_else(|| first_service_port(service.as_ref()))
            .unwrap_or_default();

        let id = format!("tg-{}", self.next_index);
        self.next_index += 1;

        stack.add(TargetGroup::new(
            id.clone(),
            TargetGroupSpec {
                k8s_service_name: service_key.name.clone(),
                k8s_service_namespace: service_key.namespace.clone(),
                k8s_cluster_name: self.config.cluster_name.clone(),
                source_type: TargetGroupSourceType::Route,
                vpc_id: self.config.vpc_id.clone(),
                protocol,
                protocol_version,
                port,
                health_check,
                is_deleted: route.is_deleted,
            },
        ));

        self.assigned.insert(cache_key, id.clone());
        Ok(id)
    }

    async fn build_service_import_reference(&mut self, route: &Route, backend: &BackendRef) -> Result<ServiceImportTargetGroup, BuildError> {
        let import_key = backend_service_key(route, backend, "ServiceImport");
        let import = self.cluster.get_service_import(&import_key).await?;

        Ok(ServiceImportTargetGroup {
            service_name: import_key.name,
            service_namespace: import_key.namespace,
            cluster_name: import.as_ref().and_then(|i| i.cluster_name.clone()),
            vpc_id: import.and_then(|i| i.vpc_id),
        })
    }
}

fn backend_service_key(route: &Route, backend: &BackendRef, kind: &str) -> ResourceKey {
    ResourceKey {
        group: String::new(),
        namespace: backend.namespace.clone().unwrap_or_else(|| route.namespace().to_owned()),
        name: backend.name.clone(),
        kind: kind.to_owned(),
    }
}

fn first_service_port(service: Option<&k8s_openapi::api::core::v1::Service>) -> Option<i64> {
    service
        .and_then(|s| s.spec.as_ref())
        .and_then(|spec| spec.ports.as_ref())
        .and_then(|ports| ports.first())
        .map(|p| i64::from(p.port))
}
