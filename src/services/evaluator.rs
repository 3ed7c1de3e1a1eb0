//! Automation evaluator.
//!
//! For every enabled automation: OR over triggers, AND over conditions,
//! then build one task with a fully resolved copy of each action. Template
//! and target resolution happen here, at task-build time, so retries run
//! against the values that caused the trigger.

use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{
    Action, Automation, Event, ResolvedTarget, ServiceInvocation,
};
use crate::domain::ports::{EntityResolver, StateStore};
use crate::services::task_queue::AutomationTask;
use crate::services::template::TemplateResolver;

pub struct AutomationEvaluator {
    /// Swapped atomically on reload; evaluation reads the current Arc and
    /// holds no long-term references.
    automations: RwLock<Arc<Vec<Automation>>>,
    templates: TemplateResolver,
}

impl AutomationEvaluator {
    pub fn new() -> Self {
        Self {
            automations: RwLock::new(Arc::new(Vec::new())),
            templates: TemplateResolver::new(),
        }
    }

    /// Replace the automation set (startup and reload).
    pub fn swap(&self, automations: Vec<Automation>) {
        *self
            .automations
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Arc::new(automations);
    }

    pub fn current(&self) -> Arc<Vec<Automation>> {
        self.automations
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Match the event against every enabled automation and build tasks
    /// for the ones that fire. A task-building failure skips only the
    /// affected automation.
    pub fn evaluate(
        &self,
        event: &Event,
        cache: &dyn StateStore,
        entities: &dyn EntityResolver,
    ) -> Vec<AutomationTask> {
        let automations = self.current();
        let mut tasks = Vec::new();

        for automation in automations.iter() {
            if !automation.enabled {
                continue;
            }
            if !automation.triggers.iter().any(|t| t.evaluate(event)) {
                continue;
            }
            if !automation
                .conditions
                .iter()
                .all(|c| c.matches(cache.get(&c.entity).as_ref()))
            {
                debug!(automation = %automation.alias, "conditions not met");
                continue;
            }

            match self.build_task(automation, event, cache, entities) {
                Ok(task) => tasks.push(task),
                Err(err) => {
                    warn!(
                        automation = %automation.alias,
                        error = %err,
                        "failed to build task, skipping automation"
                    );
                }
            }
        }
        tasks
    }

    fn build_task(
        &self,
        automation: &Automation,
        event: &Event,
        cache: &dyn StateStore,
        entities: &dyn EntityResolver,
    ) -> EngineResult<AutomationTask> {
        let mut invocations = Vec::with_capacity(automation.actions.len());
        for action in &automation.actions {
            invocations.push(self.resolve_action(action, event, cache, entities)?);
        }
        Ok(AutomationTask {
            automation_id: automation.id,
            alias: automation.alias.clone(),
            event: event.clone(),
            invocations,
        })
    }

    fn resolve_action(
        &self,
        action: &Action,
        event: &Event,
        cache: &dyn StateStore,
        entities: &dyn EntityResolver,
    ) -> EngineResult<ServiceInvocation> {
        let (domain, service) = action
            .service_parts()
            .ok_or_else(|| EngineError::UnknownService(action.service.clone()))?;

        let params = self.templates.resolve_params(&action.params, cache)?;

        let mut targets = Vec::with_capacity(action.targets.len());
        for target in &action.targets {
            let external_id = entities
                .resolve_external(&target.entity_id)
                .ok_or_else(|| EngineError::UnknownEntity(target.entity_id.clone()))?;
            targets.push(ResolvedTarget {
                entity_id: target.entity_id.clone(),
                external_id,
            });
        }

        Ok(ServiceInvocation {
            domain: domain.to_string(),
            service: service.to_string(),
            targets,
            params,
            blocking: action.blocking,
            context: event.context.clone(),
        })
    }
}

impl Default for AutomationEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{
        Condition, Context, State, StateTrigger, Target, TriggerSpec,
    };
    use crate::services::entity_registry::EntityRegistry;
    use crate::services::state_cache::StateCache;
    use serde_json::{json, Map};

    fn automation(triggers: Vec<TriggerSpec>, conditions: Vec<Condition>, actions: Vec<Action>) -> Automation {
        Automation {
            id: 1,
            alias: "test".into(),
            description: String::new(),
            triggers,
            conditions,
            actions,
            enabled: true,
            last_triggered: None,
        }
    }

    fn brightness_event(old: f64, new: f64) -> Event {
        let old_state = State::new("light.desk", json!("on"), Context::new())
            .with_attribute("brightness", json!(old));
        let new_state = State::new("light.desk", json!("on"), Context::new())
            .with_attribute("brightness", json!(new));
        Event::state_changed("light.desk", Some(old_state), Some(new_state), Context::new())
    }

    fn action_with_template() -> Action {
        let mut params = Map::new();
        params.insert(
            "brightness".into(),
            json!("{{ state_attr('light.desk', 'brightness') }}"),
        );
        Action {
            service: "hue.set_brightness".into(),
            targets: vec![Target {
                entity_id: "light.desk".into(),
            }],
            params,
            blocking: true,
        }
    }

    fn wired() -> (StateCache, EntityRegistry) {
        let cache = StateCache::new();
        cache.set(
            "light.desk",
            State::new("light.desk", json!("on"), Context::new())
                .with_attribute("brightness", json!(70)),
        );
        let registry = EntityRegistry::new();
        registry.register("hue-uuid-1", "light.desk");
        (cache, registry)
    }

    #[test]
    fn test_trigger_and_resolution() {
        let (cache, registry) = wired();
        let evaluator = AutomationEvaluator::new();
        evaluator.swap(vec![automation(
            vec![TriggerSpec::State(StateTrigger {
                entity_id: "light.desk".into(),
                attribute: Some("brightness".into()),
                from: None,
                to: None,
            })],
            vec![],
            vec![action_with_template()],
        )]);

        let event = brightness_event(50.0, 70.0);
        let tasks = evaluator.evaluate(&event, &cache, &registry);
        assert_eq!(tasks.len(), 1);

        let invocation = &tasks[0].invocations[0];
        assert_eq!(invocation.domain, "hue");
        assert_eq!(invocation.service, "set_brightness");
        assert_eq!(invocation.params["brightness"], json!(70));
        assert_eq!(invocation.targets[0].external_id, "hue-uuid-1");
        assert_eq!(invocation.context, event.context);
    }

    #[test]
    fn test_disabled_automation_is_skipped() {
        let (cache, registry) = wired();
        let evaluator = AutomationEvaluator::new();
        let mut disabled = automation(
            vec![TriggerSpec::State(StateTrigger {
                entity_id: "light.desk".into(),
                attribute: Some("brightness".into()),
                from: None,
                to: None,
            })],
            vec![],
            vec![action_with_template()],
        );
        disabled.enabled = false;
        evaluator.swap(vec![disabled]);

        assert!(evaluator
            .evaluate(&brightness_event(50.0, 70.0), &cache, &registry)
            .is_empty());
    }

    #[test]
    fn test_failed_condition_blocks_task() {
        let (cache, registry) = wired();
        let evaluator = AutomationEvaluator::new();
        evaluator.swap(vec![automation(
            vec![TriggerSpec::State(StateTrigger {
                entity_id: "light.desk".into(),
                attribute: Some("brightness".into()),
                from: None,
                to: None,
            })],
            vec![Condition {
                entity: "light.desk".into(),
                field: "brightness".into(),
                equals: None,
                not_equals: None,
                gt: Some(90.0),
                lt: None,
            }],
            vec![action_with_template()],
        )]);

        assert!(evaluator
            .evaluate(&brightness_event(50.0, 70.0), &cache, &registry)
            .is_empty());
    }

    #[test]
    fn test_bad_template_skips_only_that_automation() {
        let (cache, registry) = wired();
        let evaluator = AutomationEvaluator::new();

        let mut bad_params = Map::new();
        bad_params.insert("value".into(), json!("{{ state('light.missing') }}"));
        let bad = automation(
            vec![TriggerSpec::State(StateTrigger {
                entity_id: "light.desk".into(),
                attribute: Some("brightness".into()),
                from: None,
                to: None,
            })],
            vec![],
            vec![Action {
                service: "hue.set_brightness".into(),
                targets: vec![],
                params: bad_params,
                blocking: true,
            }],
        );
        let mut good = automation(
            vec![TriggerSpec::State(StateTrigger {
                entity_id: "light.desk".into(),
                attribute: Some("brightness".into()),
                from: None,
                to: None,
            })],
            vec![],
            vec![action_with_template()],
        );
        good.id = 2;
        good.alias = "good".into();
        evaluator.swap(vec![bad, good]);

        let tasks = evaluator.evaluate(&brightness_event(50.0, 70.0), &cache, &registry);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].alias, "good");
    }

    #[test]
    fn test_unmapped_target_skips_automation() {
        let (cache, _) = wired();
        let empty_registry = EntityRegistry::new();
        let evaluator = AutomationEvaluator::new();
        evaluator.swap(vec![automation(
            vec![TriggerSpec::State(StateTrigger {
                entity_id: "light.desk".into(),
                attribute: Some("brightness".into()),
                from: None,
                to: None,
            })],
            vec![],
            vec![action_with_template()],
        )]);

        assert!(evaluator
            .evaluate(&brightness_event(50.0, 70.0), &cache, &empty_registry)
            .is_empty());
    }
}
