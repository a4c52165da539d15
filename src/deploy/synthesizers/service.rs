use tokio_util::sync::CancellationToken;

use super::ensure_not_cancelled;
use crate::{
    deploy::{managers::ServiceManager, DeployError},
    model::{Service, Stack},
};

pub struct ServiceSynthesizer<'a> {
    manager: &'a ServiceManager,
}

impl<'a> ServiceSynthesizer<'a> {
    pub fn new(manager: &'a ServiceManager) -> Self {
        Self { manager }
    }

    pub async fn synthesize(&self, stack: &mut Stack, token: &CancellationToken) -> Result<(), DeployError> {
        let specs: Vec<_> = stack.list::<Service>().into_iter().map(|s| s.spec.clone()).collect();

        for spec in specs {
            ensure_not_cancelled(token)?;
            if spec.is_deleted {
                self.manager.delete(&spec).await?;
                continue;
            }
            let status = self.manager.upsert(&spec).await?;
            for service in stack.list_mut::<Service>() {
                if service.spec == spec {
                    service.status = Some(status.clone());
                }
            }
        }

        Ok(())
    }
}
