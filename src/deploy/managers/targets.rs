use std::{collections::BTreeSet, sync::Arc};

use tracing::debug;

use crate::{
    deploy::DeployError,
    mesh::{MeshClient, TargetAddress},
    model::TargetsSpec,
};

pub struct TargetsManager {
    client: Arc<dyn MeshClient>,
}

impl TargetsManager {
    pub fn new(client: Arc<dyn MeshClient>) -> Self {
        Self { client }
    }

    /// Diffs the desired registration set against the live one. Additions
    /// register before removals deregister so a rolling update never drops
    /// to zero targets.
    pub async fn upsert(&self, spec: &TargetsSpec, target_group_id: &str) -> Result<(), DeployError> {
        let desired: BTreeSet<TargetAddress> = spec
            .targets
            .iter()
            .map(|t| TargetAddress {
                ip: t.ip.clone(),
                port: t.port,
            })
            .collect();
        let live: BTreeSet<TargetAddress> = self.client.list_targets(target_group_id).await?.into_iter().collect();

        let to_register: Vec<_> = desired.difference(&live).cloned().collect();
        let to_deregister: Vec<_> = live.difference(&desired).cloned().collect();
        debug!("target group {target_group_id}: {} to register, {} to deregister", to_register.len(), to_deregister.len());

        if !to_register.is_empty() {
            self.client.register_targets(target_group_id, &to_register).await?;
        }
        if !to_deregister.is_empty() {
            self.client.deregister_targets(target_group_id, &to_deregister).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mesh::MockMeshClient,
        model::Target,
    };

    fn spec(ips: &[&str]) -> TargetsSpec {
        TargetsSpec {
            stack_target_group_id: "tg-0".to_owned(),
            targets: ips
                .iter()
                .map(|ip| Target {
                    ip: (*ip).to_owned(),
                    port: 8080,
                    availability_zone: None,
                })
                .collect(),
        }
    }

    fn address(ip: &str) -> TargetAddress {
        TargetAddress {
            ip: ip.to_owned(),
            port: 8080,
        }
    }

    #[tokio::test]
    async fn registers_additions_before_deregistering_removals() {
        let mut client = MockMeshClient::new();
        let mut sequence = mockall::Sequence::new();
        client
            .expect_list_targets()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(vec![address("10.0.0.1"), address("10.0.0.9")]));
        client
            .expect_register_targets()
            .withf(|_, targets| targets == [address("10.0.0.2")])
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _| Ok(()));
        client
            .expect_deregister_targets()
            .withf(|_, targets| targets == [address("10.0.0.9")])
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _| Ok(()));

        let manager = TargetsManager::new(Arc::new(client));
        manager.upsert(&spec(&["10.0.0.1", "10.0.0.2"]), "mesh-tg-1").await.unwrap();
    }

    #[tokio::test]
    async fn steady_state_makes_no_registration_calls() {
        let mut client = MockMeshClient::new();
        client.expect_list_targets().returning(|_| Ok(vec![address("10.0.0.1")]));

        let manager = TargetsManager::new(Arc::new(client));
        manager.upsert(&spec(&["10.0.0.1"]), "mesh-tg-1").await.unwrap();
    }
}
