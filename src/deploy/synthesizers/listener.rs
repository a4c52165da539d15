use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{collect_stage_errors, ensure_not_cancelled};
use crate::{
    deploy::{
        managers::{ListenerManager, TargetGroupManager},
        DeployError,
    },
    mesh::{ForwardAction, RuleAction as WireRuleAction, WeightedTargetGroup},
    model::{DefaultAction, Listener, Protocol, Rule, Service, Stack, StackResource, TargetGroupRef},
};

pub struct ListenerSynthesizer<'a> {
    listener_manager: &'a ListenerManager,
    target_group_manager: &'a TargetGroupManager,
}

impl<'a> ListenerSynthesizer<'a> {
    pub fn new(listener_manager: &'a ListenerManager, target_group_manager: &'a TargetGroupManager) -> Self {
        Self {
            listener_manager,
            target_group_manager,
        }
    }

    pub async fn synthesize(&self, stack: &mut Stack, token: &CancellationToken) -> Result<(), DeployError> {
        let entries: Vec<_> = stack.list::<Listener>().into_iter().map(|l| (l.id().to_owned(), l.spec.clone())).collect();

        let mut errors = vec![];
        for (id, spec) in entries {
            ensure_not_cancelled(token)?;

            let service = stack.get::<Service>(&spec.stack_service_id)?;
            if service.spec.is_deleted {
                // service deletion cascades to its listeners
                continue;
            }
            let service_id = service.status.as_ref().map(|s| s.id.clone()).unwrap_or_default();
            if service_id.is_empty() {
                // service synthesis has not produced an id yet
                errors.push(DeployError::MeshRetry);
                continue;
            }

            let default_action = match self.default_action(&id, &spec.protocol, &spec.default_action, stack).await {
                Ok(action) => action,
                Err(e) => {
                    errors.push(e);
                    continue;
                },
            };

            match self.listener_manager.upsert(&spec, &service_id, &default_action).await {
                Ok(status) => {
                    if let Ok(listener) = stack.get_mut::<Listener>(&id) {
                        listener.status = Some(status);
                    }
                },
                Err(e) => errors.push(e),
            }
        }

        collect_stage_errors(errors)
    }

    /// Non-passthrough listeners answer 404 when nothing matches. A
    /// TLS_PASSTHROUGH listener has no rule set on the mesh side at all, so
    /// its single stack rule becomes the default forward, with target group
    /// references resolved here.
    async fn default_action(&self, listener_id: &str, protocol: &Protocol, action: &DefaultAction, stack: &Stack) -> Result<WireRuleAction, DeployError> {
        if *protocol == Protocol::TlsPassthrough {
            let rule_count = stack.list::<Rule>().into_iter().filter(|r| r.spec.stack_listener_id == listener_id).count();
            if rule_count != 1 {
                return Err(DeployError::InvalidTlsPassthroughConfig(rule_count));
            }
        }

        match action {
            DefaultAction::FixedResponse { status_code } => Ok(WireRuleAction::FixedResponse { status_code: *status_code }),
            DefaultAction::Forward(forward) => {
                let mut forward = forward.clone();
                self.target_group_manager.resolve_rule_tg_ids(&mut forward, stack).await?;
                let target_groups = forward
                    .target_groups
                    .iter()
                    .map(|tg| match &tg.target_group {
                        TargetGroupRef::Mesh(id) => Ok(WeightedTargetGroup {
                            target_group_id: id.clone(),
                            weight: tg.weight,
                        }),
                        _ => Err(DeployError::MissingRuleTargetGroupId),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(WireRuleAction::Forward(ForwardAction { target_groups }))
            },
        }
    }

    /// Orphan pass: live listeners on the stack's services that no stack
    /// entry claims by `(port, protocol)` are deleted, provided this
    /// controller created them.
    pub async fn cleanup(&self, stack: &Stack, token: &CancellationToken) -> Result<(), DeployError> {
        let intended: Vec<(i64, String)> = stack
            .list::<Listener>()
            .into_iter()
            .map(|l| (l.spec.port, l.spec.protocol.to_string()))
            .collect();

        for service in stack.list::<Service>() {
            if service.spec.is_deleted {
                continue;
            }
            let Some(service_id) = service.status.as_ref().map(|s| s.id.clone()) else {
                continue;
            };

            for live in self.listener_manager.list(&service_id).await? {
                ensure_not_cancelled(token)?;
                if intended.iter().any(|(port, protocol)| *port == live.port && *protocol == live.protocol) {
                    continue;
                }
                match self.listener_manager.is_controller_owned(&live.arn).await {
                    Ok(true) => {
                        info!("deleting orphaned listener {} on service {service_id}", live.name);
                        if let Err(e) = self.listener_manager.delete(&service_id, &live.id).await {
                            warn!("failed to delete orphaned listener {}: {e}", live.name);
                        }
                    },
                    Ok(false) => {},
                    Err(e) => warn!("skipping ownership check for listener {}: {e}", live.name),
                }
            }
        }

        Ok(())
    }
}
