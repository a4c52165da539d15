use super::StackResource;
use crate::{common::PathMatch, mesh::HeaderMatch};

#[derive(Clone, Debug, PartialEq)]
pub struct Rule {
    id: String,
    pub spec: RuleSpec,
    pub status: Option<RuleStatus>,
}

/// Match specification plus forward action. Priority is not part of the
/// model; it is assigned during synthesis against the listener's live rules.
#[derive(Clone, Debug, PartialEq)]
pub struct RuleSpec {
    pub stack_listener_id: String,
    pub path_match: Option<PathMatch>,
    pub method: Option<String>,
    pub matched_headers: Vec<HeaderMatch>,
    pub action: RuleAction,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuleStatus {
    pub name: String,
    pub arn: String,
    pub id: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuleAction {
    pub target_groups: Vec<RuleTargetGroup>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RuleTargetGroup {
    pub target_group: TargetGroupRef,
    pub weight: i64,
}

/// Where a rule's target group comes from. Built rules carry `Stack` or
/// `ServiceImport`; synthesis resolves both into `Mesh` before the rule is
/// written to the cloud.
#[derive(Clone, Debug, PartialEq)]
pub enum TargetGroupRef {
    Stack(String),
    ServiceImport(ServiceImportTargetGroup),
    Mesh(String),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ServiceImportTargetGroup {
    pub service_name: String,
    pub service_namespace: String,
    pub cluster_name: Option<String>,
    pub vpc_id: Option<String>,
}

impl Rule {
    pub fn new(id: String, spec: RuleSpec) -> Self {
        Self { id, spec, status: None }
    }
}

impl StackResource for Rule {
    const KIND: &'static str = "Mesh::Rule";

    fn id(&self) -> &str {
        &self.id
    }
}
