mod listener;
mod rule;
mod service;
mod service_network;
mod stack;
mod target_group;
mod targets;

use std::fmt::Display;

use aws_lc_rs::digest::{digest, SHA256};

pub use listener::{DefaultAction, Listener, ListenerSpec, ListenerStatus};
pub use rule::{Rule, RuleAction, RuleSpec, RuleStatus, RuleTargetGroup, ServiceImportTargetGroup, TargetGroupRef};
pub use service::{Service, ServiceSpec, ServiceStatus, SERVICE_RESOURCE_ID};
pub use service_network::{ServiceNetwork, ServiceNetworkSpec, ServiceNetworkStatus};
pub use stack::{Stack, StackError, StackResource};
pub use target_group::{TargetGroup, TargetGroupSourceType, TargetGroupSpec, TargetGroupStatus};
pub use targets::{Target, Targets, TargetsSpec};

/// Sentinel stack target group id produced for backend references the
/// translation cannot resolve. It survives to rule synthesis where the mesh
/// rejects it, which is what surfaces the condition on the route.
pub const INVALID_BACKEND_REF_TG: &str = "INVALID_BACKEND_REF_TG";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Protocol {
    Http,
    Https,
    TlsPassthrough,
    Tcp,
}

impl Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Http => write!(f, "HTTP"),
            Protocol::Https => write!(f, "HTTPS"),
            Protocol::TlsPassthrough => write!(f, "TLS_PASSTHROUGH"),
            Protocol::Tcp => write!(f, "TCP"),
        }
    }
}

impl TryFrom<&str> for Protocol {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "HTTP" => Ok(Protocol::Http),
            "HTTPS" => Ok(Protocol::Https),
            "TLS_PASSTHROUGH" => Ok(Protocol::TlsPassthrough),
            "TCP" => Ok(Protocol::Tcp),
            other => Err(format!("unknown protocol {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    Http1,
    Http2,
    Grpc,
}

impl Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolVersion::Http1 => write!(f, "HTTP1"),
            ProtocolVersion::Http2 => write!(f, "HTTP2"),
            ProtocolVersion::Grpc => write!(f, "GRPC"),
        }
    }
}

impl TryFrom<&str> for ProtocolVersion {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "HTTP1" => Ok(ProtocolVersion::Http1),
            "HTTP2" => Ok(ProtocolVersion::Http2),
            "GRPC" => Ok(ProtocolVersion::Grpc),
            other => Err(format!("unknown protocol version {other}")),
        }
    }
}

pub(crate) fn truncate(value: &str, max: usize) -> &str {
    &value[..value.len().min(max)]
}

/// Short stable fingerprint folded into cloud resource names so identity
/// tuples never collide within an account and VPC.
pub(crate) fn name_fingerprint(input: &str, len: usize) -> String {
    let digest = digest(&SHA256, input.as_bytes());
    let mut out = String::new();
    for byte in digest.as_ref() {
        out.push_str(&format!("{byte:02x}"));
        if out.len() >= len {
            break;
        }
    }
    out.truncate(len);
    out
}
