mod listener;
mod rule;
mod service;
mod service_network;
mod target_group;
mod targets;

pub use listener::ListenerManager;
pub use rule::{DesiredRule, RuleManager};
pub use service::ServiceManager;
pub use service_network::ServiceNetworkManager;
pub use target_group::TargetGroupManager;
pub use targets::TargetsManager;

use itertools::Itertools;

/// Order-insensitive set equality used when diffing id lists such as
/// security groups.
pub(crate) fn same_id_set(this: &[String], other: &[String]) -> bool {
    this.iter().sorted().eq(other.iter().sorted())
}
