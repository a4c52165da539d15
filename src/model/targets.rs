use super::StackResource;

/// Registration set for one target group, derived from the EndpointSlices of
/// the backing Kubernetes Service.
#[derive(Clone, Debug, PartialEq)]
pub struct Targets {
    id: String,
    pub spec: TargetsSpec,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TargetsSpec {
    pub stack_target_group_id: String,
    pub targets: Vec<Target>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Target {
    pub ip: String,
    pub port: i64,
    pub availability_zone: Option<String>,
}

impl Targets {
    pub fn new(spec: TargetsSpec) -> Self {
        let id = format!("targets-{}", spec.stack_target_group_id);
        Self { id, spec }
    }
}

impl StackResource for Targets {
    const KIND: &'static str = "Mesh::Targets";

    fn id(&self) -> &str {
        &self.id
    }
}
