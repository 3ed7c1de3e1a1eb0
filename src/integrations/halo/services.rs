//! Halo service handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::errors::EngineResult;
use crate::domain::models::{
    EntityType, ParamMetadata, ServiceHandler, ServiceInvocation, ServiceSpec, TargetSpec,
    TargetType,
};

use super::client::HaloClient;

struct SetButtonValue {
    client: Arc<HaloClient>,
}

#[async_trait]
impl ServiceHandler for SetButtonValue {
    async fn call(&self, invocation: &ServiceInvocation) -> EngineResult<()> {
        let value = invocation.int_param("value")?;
        for target in &invocation.targets {
            self.client
                .update_button_value(&target.external_id, value.clamp(0, 100))
                .await?;
        }
        Ok(())
    }
}

struct DisplayNotification {
    client: Arc<HaloClient>,
}

#[async_trait]
impl ServiceHandler for DisplayNotification {
    async fn call(&self, invocation: &ServiceInvocation) -> EngineResult<()> {
        let title = invocation.str_param("title")?;
        let subtitle = invocation
            .str_param("subtitle")
            .unwrap_or_default();
        self.client.display_notification(title, subtitle).await
    }
}

pub fn export_services(client: &Arc<HaloClient>) -> HashMap<String, ServiceSpec> {
    let mut services = HashMap::new();

    services.insert(
        "set_button_value".to_string(),
        ServiceSpec {
            handler: Arc::new(SetButtonValue {
                client: client.clone(),
            }),
            required_params: HashMap::from([(
                "value".to_string(),
                ParamMetadata {
                    data_type: "int".to_string(),
                    description: "button value between 0 and 100".to_string(),
                },
            )]),
            allowed_targets: TargetSpec {
                types: vec![TargetType::Entity],
                entity_types: vec![EntityType::Button],
            },
        },
    );
    services.insert(
        "display_notification".to_string(),
        ServiceSpec {
            handler: Arc::new(DisplayNotification {
                client: client.clone(),
            }),
            required_params: HashMap::from([(
                "title".to_string(),
                ParamMetadata {
                    data_type: "string".to_string(),
                    description: "notification title".to_string(),
                },
            )]),
            allowed_targets: TargetSpec::default(),
        },
    );

    services
}
