use tokio_util::sync::CancellationToken;

use super::{collect_stage_errors, ensure_not_cancelled};
use crate::{
    deploy::{
        managers::{DesiredRule, RuleManager, TargetGroupManager},
        DeployError,
    },
    mesh::{ForwardAction, RuleAction as WireRuleAction, RuleMatch, WeightedTargetGroup},
    model::{Listener, Protocol, Rule, Service, Stack, StackResource, TargetGroupRef},
};

pub struct RuleSynthesizer<'a> {
    rule_manager: &'a RuleManager,
    target_group_manager: &'a TargetGroupManager,
}

impl<'a> RuleSynthesizer<'a> {
    pub fn new(rule_manager: &'a RuleManager, target_group_manager: &'a TargetGroupManager) -> Self {
        Self {
            rule_manager,
            target_group_manager,
        }
    }

    pub async fn synthesize(&self, stack: &mut Stack, token: &CancellationToken) -> Result<(), DeployError> {
        let deleted_services: Vec<String> = stack
            .list::<Service>()
            .into_iter()
            .filter(|s| s.spec.is_deleted)
            .map(|s| s.id().to_owned())
            .collect();

        let listeners: Vec<_> = stack
            .list::<Listener>()
            .into_iter()
            .filter(|l| l.spec.protocol != Protocol::TlsPassthrough)
            .filter(|l| !deleted_services.contains(&l.spec.stack_service_id))
            .map(|l| (l.id().to_owned(), l.status.clone()))
            .collect();

        let mut errors = vec![];
        for (listener_id, listener_status) in listeners {
            ensure_not_cancelled(token)?;

            let Some(listener_status) = listener_status else {
                errors.push(DeployError::MeshRetry);
                continue;
            };

            let rule_entries: Vec<_> = stack
                .list::<Rule>()
                .into_iter()
                .filter(|r| r.spec.stack_listener_id == listener_id)
                .map(|r| (r.id().to_owned(), r.spec.clone()))
                .collect();

            let mut desired = vec![];
            for (rule_id, rule_spec) in rule_entries {
                let mut action = rule_spec.action.clone();
                match self.target_group_manager.resolve_rule_tg_ids(&mut action, stack).await {
                    Ok(()) => {},
                    Err(e) => {
                        errors.push(e);
                        continue;
                    },
                }

                let target_groups = action
                    .target_groups
                    .iter()
                    .map(|tg| match &tg.target_group {
                        TargetGroupRef::Mesh(id) => Ok(WeightedTargetGroup {
                            target_group_id: id.clone(),
                            weight: tg.weight,
                        }),
                        _ => Err(DeployError::MissingRuleTargetGroupId),
                    })
                    .collect::<Result<Vec<_>, DeployError>>();
                let target_groups = match target_groups {
                    Ok(target_groups) => target_groups,
                    Err(e) => {
                        errors.push(e);
                        continue;
                    },
                };

                desired.push(DesiredRule {
                    stack_rule_id: rule_id,
                    rule_match: RuleMatch {
                        path: rule_spec.path_match.clone(),
                        method: rule_spec.method.clone(),
                        headers: rule_spec.matched_headers.clone(),
                    },
                    action: WireRuleAction::Forward(ForwardAction { target_groups }),
                });
            }

            match self.rule_manager.upsert(&desired, &listener_status.service_id, &listener_status.id).await {
                Ok(statuses) => {
                    for (stack_rule_id, status) in statuses {
                        if let Ok(rule) = stack.get_mut::<Rule>(&stack_rule_id) {
                            rule.status = Some(status);
                        }
                    }
                },
                Err(e) => errors.push(e),
            }
        }

        collect_stage_errors(errors)
    }
}
