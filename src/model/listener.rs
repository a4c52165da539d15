use super::{Protocol, ProtocolVersion, RuleAction, StackResource};

#[derive(Clone, Debug, PartialEq)]
pub struct Listener {
    id: String,
    pub spec: ListenerSpec,
    pub status: Option<ListenerStatus>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListenerSpec {
    pub stack_service_id: String,
    pub port: i64,
    pub protocol: Protocol,
    pub protocol_version: Option<ProtocolVersion>,
    pub default_action: DefaultAction,
}

/// Listener fallback when no rule matches. TLS_PASSTHROUGH listeners cannot
/// answer with a fixed response, they forward to their single rule's targets.
#[derive(Clone, Debug, PartialEq)]
pub enum DefaultAction {
    FixedResponse { status_code: i64 },
    Forward(RuleAction),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListenerStatus {
    pub name: String,
    pub arn: String,
    pub id: String,
    pub service_id: String,
}

impl Listener {
    pub fn new(spec: ListenerSpec) -> Self {
        let id = Self::stack_id(spec.port, spec.protocol);
        Self { id, spec, status: None }
    }

    pub fn stack_id(port: i64, protocol: Protocol) -> String {
        format!("listener-{port}-{protocol}")
    }
}

impl StackResource for Listener {
    const KIND: &'static str = "Mesh::Listener";

    fn id(&self) -> &str {
        &self.id
    }
}
