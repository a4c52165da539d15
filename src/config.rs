use serde::Deserialize;
use thiserror::Error;
use typed_builder::TypedBuilder;

/// Immutable controller-wide configuration, plumbed by value into managers
/// at construction time.
#[derive(Clone, Debug, TypedBuilder, Deserialize)]
pub struct MeshConfig {
    pub account_id: String,
    pub vpc_id: String,
    pub cluster_name: String,
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigurationError {
    #[error("account id must be not empty")]
    AccountId,
    #[error("vpc id must be not empty")]
    VpcId,
    #[error("cluster name must be not empty")]
    ClusterName,
}

impl MeshConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.account_id.is_empty() {
            return Err(ConfigurationError::AccountId);
        }
        if self.vpc_id.is_empty() {
            return Err(ConfigurationError::VpcId);
        }
        if self.cluster_name.is_empty() {
            return Err(ConfigurationError::ClusterName);
        }
        Ok(())
    }
}
