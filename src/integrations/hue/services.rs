//! Hue service handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{
    EntityType, ParamMetadata, ServiceHandler, ServiceInvocation, ServiceSpec, TargetSpec,
    TargetType,
};

use super::client::HueClient;

struct TurnOn {
    client: Arc<HueClient>,
}

#[async_trait]
impl ServiceHandler for TurnOn {
    async fn call(&self, invocation: &ServiceInvocation) -> EngineResult<()> {
        for target in &invocation.targets {
            self.client.set_light_on(&target.external_id, true).await?;
        }
        Ok(())
    }
}

struct TurnOff {
    client: Arc<HueClient>,
}

#[async_trait]
impl ServiceHandler for TurnOff {
    async fn call(&self, invocation: &ServiceInvocation) -> EngineResult<()> {
        for target in &invocation.targets {
            self.client.set_light_on(&target.external_id, false).await?;
        }
        Ok(())
    }
}

struct SetBrightness {
    client: Arc<HueClient>,
}

#[async_trait]
impl ServiceHandler for SetBrightness {
    async fn call(&self, invocation: &ServiceInvocation) -> EngineResult<()> {
        let brightness = invocation.float_param("brightness")?;
        for target in &invocation.targets {
            self.client
                .set_light_brightness(&target.external_id, brightness)
                .await?;
        }
        Ok(())
    }
}

struct StepBrightness {
    client: Arc<HueClient>,
}

#[async_trait]
impl ServiceHandler for StepBrightness {
    async fn call(&self, invocation: &ServiceInvocation) -> EngineResult<()> {
        let step = invocation.float_param("step")?;
        let direction = invocation.str_param("direction")?;
        if direction != "up" && direction != "down" {
            return Err(EngineError::InvalidParam {
                key: "direction".to_string(),
                expected: "\"up\" or \"down\"",
            });
        }
        for target in &invocation.targets {
            self.client
                .step_light_brightness(&target.external_id, step, direction)
                .await?;
        }
        Ok(())
    }
}

struct ActivateScene {
    client: Arc<HueClient>,
}

#[async_trait]
impl ServiceHandler for ActivateScene {
    async fn call(&self, invocation: &ServiceInvocation) -> EngineResult<()> {
        for target in &invocation.targets {
            self.client.recall_scene(&target.external_id).await?;
        }
        Ok(())
    }
}

fn light_targets() -> TargetSpec {
    TargetSpec {
        types: vec![TargetType::Entity],
        entity_types: vec![EntityType::Light],
    }
}

fn param(data_type: &str, description: &str) -> ParamMetadata {
    ParamMetadata {
        data_type: data_type.to_string(),
        description: description.to_string(),
    }
}

/// Build the service specs this integration registers.
pub fn export_services(client: &Arc<HueClient>) -> HashMap<String, ServiceSpec> {
    let mut services = HashMap::new();

    services.insert(
        "turn_on".to_string(),
        ServiceSpec {
            handler: Arc::new(TurnOn {
                client: client.clone(),
            }),
            required_params: HashMap::new(),
            allowed_targets: light_targets(),
        },
    );
    services.insert(
        "turn_off".to_string(),
        ServiceSpec {
            handler: Arc::new(TurnOff {
                client: client.clone(),
            }),
            required_params: HashMap::new(),
            allowed_targets: light_targets(),
        },
    );
    services.insert(
        "set_brightness".to_string(),
        ServiceSpec {
            handler: Arc::new(SetBrightness {
                client: client.clone(),
            }),
            required_params: HashMap::from([(
                "brightness".to_string(),
                param("float", "target brightness percentage"),
            )]),
            allowed_targets: light_targets(),
        },
    );
    services.insert(
        "step_brightness".to_string(),
        ServiceSpec {
            handler: Arc::new(StepBrightness {
                client: client.clone(),
            }),
            required_params: HashMap::from([
                ("step".to_string(), param("float", "brightness delta")),
                (
                    "direction".to_string(),
                    param("string", "up or down"),
                ),
            ]),
            allowed_targets: light_targets(),
        },
    );
    services.insert(
        "activate_scene".to_string(),
        ServiceSpec {
            handler: Arc::new(ActivateScene {
                client: client.clone(),
            }),
            required_params: HashMap::new(),
            allowed_targets: TargetSpec {
                types: vec![TargetType::Entity],
                entity_types: vec![EntityType::Scene],
            },
        },
    );

    services
}
