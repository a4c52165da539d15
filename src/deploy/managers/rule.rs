use std::{cmp::Reverse, collections::BTreeSet, sync::Arc};

use tracing::{debug, info};

use crate::{
    common::PathMatch,
    config::MeshConfig,
    deploy::DeployError,
    mesh::{MeshClient, RuleAction, RuleMatch, RuleSummary, RuleUpdate, Tags, TAG_CLUSTER_NAME},
    model::RuleStatus,
};

/// Fully resolved rule content, ready for the wire: target group references
/// have already been rewritten to mesh ids.
#[derive(Clone, Debug, PartialEq)]
pub struct DesiredRule {
    pub stack_rule_id: String,
    pub rule_match: RuleMatch,
    pub action: RuleAction,
}

pub struct RuleManager {
    config: MeshConfig,
    client: Arc<dyn MeshClient>,
}

impl RuleManager {
    pub fn new(config: MeshConfig, client: Arc<dyn MeshClient>) -> Self {
        Self { config, client }
    }

    /// Reconciles the listener's rule set to exactly `desired`.
    ///
    /// Priorities always end up as the contiguous set `1..=N`: an unchanged
    /// live rule keeps its priority when that priority still fits, everything
    /// else takes the smallest unused slot in specificity order (exact path
    /// before prefix before none, more headers before fewer, insertion order
    /// among equals). Live rules the controller does not own are left alone.
    pub async fn upsert(&self, desired: &[DesiredRule], service_id: &str, listener_id: &str) -> Result<Vec<(String, RuleStatus)>, DeployError> {
        let mut live = vec![];
        for summary in self.client.list_rules(service_id, listener_id).await? {
            if summary.is_default {
                continue;
            }
            let owned = self.client.list_tags(&summary.arn).await?.get(TAG_CLUSTER_NAME) == Some(&self.config.cluster_name);
            live.push((summary, owned));
        }

        let capacity = i64::try_from(desired.len()).unwrap_or(i64::MAX);
        let mut order: Vec<usize> = (0..desired.len()).collect();
        order.sort_by_key(|&i| (specificity(&desired[i].rule_match), i));

        let mut used_priorities = BTreeSet::new();
        let mut consumed_live: BTreeSet<usize> = BTreeSet::new();
        let mut statuses: Vec<Option<(String, RuleStatus)>> = vec![None; desired.len()];
        let mut pending: Vec<usize> = vec![];
        let mut priority_moves: Vec<(String, i64)> = vec![];

        // unchanged rules first so their live priorities stay stable
        for &index in &order {
            let rule = &desired[index];
            let matched = live.iter().enumerate().find(|(live_index, (summary, owned))| {
                *owned
                    && !consumed_live.contains(live_index)
                    && summary.rule_match.as_ref() == Some(&rule.rule_match)
                    && summary.action.as_ref() == Some(&rule.action)
            });
            match matched {
                Some((live_index, (summary, _))) if (1..=capacity).contains(&summary.priority) && !used_priorities.contains(&summary.priority) => {
                    used_priorities.insert(summary.priority);
                    consumed_live.insert(live_index);
                    statuses[index] = Some((rule.stack_rule_id.clone(), status(summary)));
                },
                _ => pending.push(index),
            }
        }

        for index in pending {
            let rule = &desired[index];
            let priority = (1..=capacity).find(|p| !used_priorities.contains(p)).unwrap_or(capacity);
            used_priorities.insert(priority);

            let matched = live
                .iter()
                .enumerate()
                .find(|(live_index, (summary, owned))| {
                    *owned && !consumed_live.contains(live_index) && summary.rule_match.as_ref() == Some(&rule.rule_match)
                })
                .map(|(live_index, (summary, _))| (live_index, summary.clone()));

            let summary = match matched {
                Some((live_index, summary)) => {
                    consumed_live.insert(live_index);
                    if summary.action.as_ref() == Some(&rule.action) {
                        // content is current, only the priority needs to move
                        priority_moves.push((summary.id.clone(), priority));
                    } else {
                        debug!("updating rule {} to priority {priority}", summary.id);
                        self.client.update_rule(service_id, listener_id, &summary.id, &self.rule_update(rule, priority)).await?;
                    }
                    summary
                },
                None => {
                    info!("creating rule {} at priority {priority}", rule.stack_rule_id);
                    self.client.create_rule(service_id, listener_id, &self.rule_update(rule, priority)).await?
                },
            };
            statuses[index] = Some((rule.stack_rule_id.clone(), status(&summary)));
        }

        if !priority_moves.is_empty() {
            self.client.batch_update_rule_priorities(service_id, listener_id, &priority_moves).await?;
        }

        // stale owned rules have no matching desired entry left
        for (live_index, (summary, owned)) in live.iter().enumerate() {
            if *owned && !consumed_live.contains(&live_index) {
                info!("deleting stale rule {}", summary.id);
                self.client.delete_rule(service_id, listener_id, &summary.id).await?;
            }
        }

        Ok(statuses.into_iter().flatten().collect())
    }

    pub async fn list(&self, service_id: &str, listener_id: &str) -> Result<Vec<RuleSummary>, DeployError> {
        Ok(self.client.list_rules(service_id, listener_id).await?)
    }

    fn rule_update(&self, rule: &DesiredRule, priority: i64) -> RuleUpdate {
        RuleUpdate {
            name: format!("k8s-{}", rule.stack_rule_id),
            priority,
            rule_match: rule.rule_match.clone(),
            action: rule.action.clone(),
            tags: Tags::from([(TAG_CLUSTER_NAME.to_owned(), self.config.cluster_name.clone())]),
        }
    }
}

fn specificity(rule_match: &RuleMatch) -> (u8, Reverse<usize>) {
    let path_rank = match rule_match.path {
        Some(PathMatch::Exact(_)) => 0,
        Some(PathMatch::Prefix(_)) => 1,
        None => 2,
    };
    (path_rank, Reverse(rule_match.headers.len()))
}

fn status(summary: &RuleSummary) -> RuleStatus {
    RuleStatus {
        name: summary.name.clone(),
        arn: summary.arn.clone(),
        id: summary.id.clone(),
    }
}
