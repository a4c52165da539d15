use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use thiserror::Error;

use crate::mesh::HealthCheckConfig;

/// A policy custom resource attached to some target, reduced to the
/// attributes the pipeline consumes. The CRD schemas live outside this
/// crate; [`crate::cluster::ClusterReader`] produces these.
#[derive(Clone, Debug, PartialEq)]
pub struct PolicyAttachment<T> {
    pub name: String,
    pub namespace: String,
    pub creation_timestamp: Option<Time>,
    pub config: T,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TargetGroupPolicyConfig {
    pub protocol: Option<String>,
    pub protocol_version: Option<String>,
    pub health_check: Option<HealthCheckConfig>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VpcAssociationPolicyConfig {
    pub associate_with_vpc: Option<bool>,
    pub security_group_ids: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct IamAuthPolicyConfig {
    pub policy: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AccessLogPolicyConfig {
    pub destination_arn: String,
}

/// Condition payload for a policy that lost conflict resolution. The caller
/// writes it onto the losing policy's status; the winner's attributes are the
/// only ones applied.
#[derive(Error, Clone, Debug, PartialEq)]
#[error("policy {namespace}/{name} conflicts with older policy {winner_namespace}/{winner_name} on the same target")]
pub struct PolicyConflict {
    pub name: String,
    pub namespace: String,
    pub winner_name: String,
    pub winner_namespace: String,
}

/// Oldest creation timestamp wins; name breaks ties so the outcome does not
/// depend on list order.
pub fn resolve_conflicts<T>(mut policies: Vec<PolicyAttachment<T>>) -> (Option<PolicyAttachment<T>>, Vec<PolicyConflict>) {
    if policies.is_empty() {
        return (None, vec![]);
    }

    policies.sort_by(|a, b| {
        match (a.creation_timestamp.as_ref(), b.creation_timestamp.as_ref()) {
            (None, None) => std::cmp::Ordering::Equal,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (Some(_), None) => std::cmp::Ordering::Less,
            (Some(this), Some(other)) => this.cmp(other),
        }
        .then_with(|| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)))
    });

    let mut policies = policies.into_iter();
    let winner = policies.next();
    let conflicts = match winner.as_ref() {
        Some(winner) => policies
            .map(|loser| PolicyConflict {
                name: loser.name,
                namespace: loser.namespace,
                winner_name: winner.name.clone(),
                winner_namespace: winner.namespace.clone(),
            })
            .collect(),
        None => vec![],
    };

    (winner, conflicts)
}

#[cfg(test)]
mod tests {
    use k8s_openapi::chrono::{TimeZone, Utc};

    use super::*;

    fn attachment(name: &str, secs: i64) -> PolicyAttachment<VpcAssociationPolicyConfig> {
        PolicyAttachment {
            name: name.to_owned(),
            namespace: "default".to_owned(),
            creation_timestamp: Some(Time(Utc.timestamp_opt(secs, 0).unwrap())),
            config: VpcAssociationPolicyConfig::default(),
        }
    }

    #[test]
    fn oldest_policy_wins() {
        let (winner, conflicts) = resolve_conflicts(vec![attachment("newer", 200), attachment("oldest", 100), attachment("newest", 300)]);
        assert_eq!(winner.map(|w| w.name), Some("oldest".to_owned()));
        let losers: Vec<_> = conflicts.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(losers, vec!["newer", "newest"]);
        assert!(conflicts.iter().all(|c| c.winner_name == "oldest"));
    }

    #[test]
    fn single_policy_has_no_conflicts() {
        let (winner, conflicts) = resolve_conflicts(vec![attachment("only", 100)]);
        assert!(winner.is_some());
        assert!(conflicts.is_empty());
    }

    #[test]
    fn missing_timestamp_loses_to_any_timestamp() {
        let mut unstamped = attachment("unstamped", 0);
        unstamped.creation_timestamp = None;
        let (winner, _) = resolve_conflicts(vec![unstamped, attachment("stamped", 500)]);
        assert_eq!(winner.map(|w| w.name), Some("stamped".to_owned()));
    }

    #[test]
    fn no_policies_no_winner() {
        let (winner, conflicts) = resolve_conflicts::<TargetGroupPolicyConfig>(vec![]);
        assert!(winner.is_none());
        assert!(conflicts.is_empty());
    }
}
