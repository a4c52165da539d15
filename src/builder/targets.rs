use itertools::Itertools;
use k8s_openapi::api::discovery::v1::EndpointSlice;

use super::BuildError;
use crate::{
    cluster::ClusterReader,
    common::ResourceKey,
    model::{Stack, StackResource, Target, TargetGroup, TargetGroupSourceType, Targets, TargetsSpec},
};

/// Derives the registration set for every route-sourced target group in the
/// stack from the EndpointSlices of its backing Service. Deleted groups get
/// no registration entry; deregistration happens through group deletion.
pub(crate) async fn build_targets(cluster: &dyn ClusterReader, stack: &mut Stack) -> Result<(), BuildError> {
    let groups: Vec<(String, ResourceKey, i64)> = stack
        .list::<TargetGroup>()
        .into_iter()
        .filter(|tg| tg.spec.source_type == TargetGroupSourceType::Route && !tg.spec.is_deleted)
        .map(|tg| {
            (
                tg.id().to_owned(),
                ResourceKey {
                    group: String::new(),
                    namespace: tg.spec.k8s_service_namespace.clone(),
                    name: tg.spec.k8s_service_name.clone(),
                    kind: "Service".to_owned(),
                },
                tg.spec.port,
            )
        })
        .collect();

    for (stack_target_group_id, service_key, fallback_port) in groups {
        let slices = cluster.list_endpoint_slices(&service_key).await?;
        let targets = collect_targets(&slices, fallback_port);
        stack.add(Targets::new(TargetsSpec {
            stack_target_group_id,
            targets,
        }));
    }

    Ok(())
}

fn collect_targets(slices: &[EndpointSlice], fallback_port: i64) -> Vec<Target> {
    slices
        .iter()
        .flat_map(|slice| {
            let port = slice
                .ports
                .as_ref()
                .and_then(|ports| ports.iter().find_map(|p| p.port))
                .map_or(fallback_port, i64::from);

            slice
                .endpoints
                .iter()
                .filter(|endpoint| endpoint.conditions.as_ref().and_then(|c| c.ready).unwrap_or(true))
                .flat_map(move |endpoint| {
                    let zone = endpoint.zone.clone();
                    endpoint.addresses.iter().map(move |address| Target {
                        ip: address.clone(),
                        port,
                        availability_zone: zone.clone(),
                    })
                })
        })
        .sorted()
        .dedup()
        .collect()
}
