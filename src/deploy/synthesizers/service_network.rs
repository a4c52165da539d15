use tokio_util::sync::CancellationToken;

use super::{collect_stage_errors, ensure_not_cancelled};
use crate::{
    deploy::{managers::ServiceNetworkManager, DeployError},
    model::{ServiceNetwork, Stack},
};

pub struct ServiceNetworkSynthesizer<'a> {
    manager: &'a ServiceNetworkManager,
}

impl<'a> ServiceNetworkSynthesizer<'a> {
    pub fn new(manager: &'a ServiceNetworkManager) -> Self {
        Self { manager }
    }

    pub async fn synthesize(&self, stack: &mut Stack, token: &CancellationToken) -> Result<(), DeployError> {
        let specs: Vec<_> = stack.list::<ServiceNetwork>().into_iter().map(|sn| sn.spec.clone()).collect();

        let mut errors = vec![];
        for spec in specs {
            ensure_not_cancelled(token)?;
            if spec.is_deleted {
                if let Err(e) = self.manager.delete(&spec.name).await {
                    errors.push(e);
                }
                continue;
            }
            match self.manager.upsert(&spec).await {
                Ok(status) => {
                    for service_network in stack.list_mut::<ServiceNetwork>() {
                        if service_network.spec.name == spec.name {
                            service_network.status = Some(status.clone());
                        }
                    }
                },
                Err(e) => errors.push(e),
            }
        }

        collect_stage_errors(errors)
    }
}
