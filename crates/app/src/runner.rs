//! Rule runner — resolves actions, dispatches handlers, records outcomes.
//!
//! The runner owns the execution lifecycle for a single fired rule:
//! `Pending → Running → terminal`, with the action resolved from its
//! template (if any), dispatched through the handler registry under a
//! deadline, and every outcome captured in the execution record. Failures
//! stay inside the record — a failing rule never propagates an error to
//! sibling rules or to the caller that raised the event.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{info, warn};

use wareflow_domain::error::{ActionError, WareflowError};
use wareflow_domain::execution::{ExecutionStatus, FiredBy, RuleExecution};
use wareflow_domain::id::RuleId;
use wareflow_domain::rule::{evaluate_all, ActionConfig, ActionOutput, ActionSpec, AutomationRule};
use wareflow_domain::snapshot::Snapshot;

use crate::config::EngineConfig;
use crate::ports::{ExecutionStore, RuleRepository, TemplateRepository};
use crate::recorder::ExecutionRecorder;
use crate::registry::{ActionContext, ActionRegistry};

/// Executes fired rules end to end.
pub struct RuleRunner<R, X, T> {
    rules: R,
    recorder: ExecutionRecorder<X>,
    templates: T,
    registry: Arc<ActionRegistry>,
    config: EngineConfig,
}

impl<R, X, T> RuleRunner<R, X, T>
where
    R: RuleRepository + Send + Sync,
    X: ExecutionStore + Send + Sync,
    T: TemplateRepository + Send + Sync,
{
    /// Create a runner over the given ports and handler registry.
    pub fn new(
        rules: R,
        recorder: ExecutionRecorder<X>,
        templates: T,
        registry: Arc<ActionRegistry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            rules,
            recorder,
            templates,
            registry,
            config,
        }
    }

    /// Borrow the rule repository (shared with the dispatcher and
    /// scheduler, which are built around this runner).
    pub fn rules(&self) -> &R {
        &self.rules
    }

    /// Borrow the execution recorder for read APIs.
    pub fn recorder(&self) -> &ExecutionRecorder<X> {
        &self.recorder
    }

    /// Borrow the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create and persist the pending execution for a fired-and-matched
    /// rule. Recording happens before any action side effect so a crash
    /// mid-run still leaves an auditable record.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub async fn prepare(
        &self,
        rule: &AutomationRule,
        snapshot: Snapshot,
        fired_by: FiredBy,
        trigger_entity_type: Option<String>,
    ) -> Result<RuleExecution, WareflowError> {
        let execution = RuleExecution::pending(
            rule.id,
            rule.tenant_id,
            fired_by,
            trigger_entity_type,
            snapshot,
        );
        self.recorder.record_pending(&execution).await?;
        Ok(execution)
    }

    /// Run a prepared execution to its terminal status.
    ///
    /// # Errors
    ///
    /// Returns storage/transition errors only; action failures terminate
    /// in the execution record instead.
    pub async fn execute_prepared(
        &self,
        rule: &AutomationRule,
        execution: RuleExecution,
    ) -> Result<RuleExecution, WareflowError> {
        self.execute_prepared_at_depth(rule, execution, 0).await
    }

    /// Prepare and run in one step — the path used by the scheduler loop,
    /// manual triggers, and rule chaining.
    ///
    /// # Errors
    ///
    /// Returns storage/transition errors only.
    pub async fn run_rule(
        &self,
        rule: &AutomationRule,
        snapshot: Snapshot,
        fired_by: FiredBy,
        trigger_entity_type: Option<String>,
    ) -> Result<RuleExecution, WareflowError> {
        let execution = self
            .prepare(rule, snapshot, fired_by, trigger_entity_type)
            .await?;
        self.execute_prepared_at_depth(rule, execution, 0).await
    }

    /// Resolve a rule's [`ActionSpec`] into a concrete [`ActionConfig`],
    /// fetching and merging its template when referenced. Also used by the
    /// dry-run preview, which stops after this step.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::TemplateNotFound`] or
    /// [`ActionError::InvalidTemplateConfig`].
    pub async fn resolve_action(
        &self,
        rule: &AutomationRule,
    ) -> Result<ActionConfig, ActionError> {
        match &rule.action {
            ActionSpec::Inline { config } => Ok(config.clone()),
            ActionSpec::Template { code, overrides } => {
                let template = self
                    .templates
                    .find_by_code(rule.tenant_id, code.clone())
                    .await
                    .map_err(|err| ActionError::Handler(err.to_string()))?
                    .ok_or_else(|| ActionError::TemplateNotFound { code: code.clone() })?;
                template.resolve(overrides)
            }
        }
    }

    async fn execute_prepared_at_depth(
        &self,
        rule: &AutomationRule,
        mut execution: RuleExecution,
        depth: u32,
    ) -> Result<RuleExecution, WareflowError> {
        self.recorder.mark_running(&mut execution).await?;

        match self.perform(rule, &execution, depth).await {
            Ok((output, status)) => {
                info!(
                    rule_id = %rule.id,
                    execution_id = %execution.id,
                    %status,
                    "rule action completed"
                );
                self.recorder
                    .finish(&mut execution, status, Some(output), None)
                    .await?;
            }
            Err(err) => {
                warn!(
                    rule_id = %rule.id,
                    execution_id = %execution.id,
                    error = %err,
                    "rule action failed"
                );
                self.recorder
                    .finish(
                        &mut execution,
                        ExecutionStatus::Failed,
                        None,
                        Some(err.to_string()),
                    )
                    .await?;
            }
        }
        Ok(execution)
    }

    /// Resolve and execute the rule's action, returning the output and the
    /// terminal status it implies.
    async fn perform(
        &self,
        rule: &AutomationRule,
        execution: &RuleExecution,
        depth: u32,
    ) -> Result<(ActionOutput, ExecutionStatus), ActionError> {
        let config = self.resolve_action(rule).await?;

        // Chaining is the engine's own behavior, not a pluggable side
        // effect: the depth guard and the child execution record live here.
        if let ActionConfig::TriggerRule { rule_id } = config {
            return self.chain(execution, rule_id, depth).await;
        }

        let handler = self.registry.get(config.kind())?;
        let ctx = ActionContext {
            tenant_id: rule.tenant_id,
            rule_id: rule.id,
            execution_id: execution.id,
            snapshot: execution.snapshot.clone(),
            depth,
        };
        match tokio::time::timeout(self.config.action_timeout, handler.execute(&config, &ctx))
            .await
        {
            Ok(result) => result.map(|output| (output, ExecutionStatus::Succeeded)),
            Err(_) => Err(ActionError::Timeout(self.config.action_timeout)),
        }
    }

    /// Fire another rule as this rule's action, bounded by the chain-depth
    /// counter. The chained rule gets its own execution record; a chained
    /// failure degrades the parent to `PartiallyFailed`.
    async fn chain(
        &self,
        execution: &RuleExecution,
        target_id: RuleId,
        depth: u32,
    ) -> Result<(ActionOutput, ExecutionStatus), ActionError> {
        let next_depth = depth + 1;
        if next_depth > self.config.max_chain_depth {
            return Err(ActionError::ChainTooDeep {
                max_depth: self.config.max_chain_depth,
            });
        }

        let target = self
            .rules
            .get_by_id(target_id)
            .await
            .map_err(|err| ActionError::Handler(err.to_string()))?
            .ok_or_else(|| ActionError::Handler(format!("chained rule {target_id} not found")))?;

        if !target.is_active {
            return Ok((
                ActionOutput::with_data(serde_json::json!({
                    "chained_rule": target_id,
                    "skipped": "inactive",
                })),
                ExecutionStatus::Succeeded,
            ));
        }

        let snapshot = execution.snapshot.clone();
        if !evaluate_all(&target.conditions, &snapshot) {
            return Ok((
                ActionOutput::with_data(serde_json::json!({
                    "chained_rule": target_id,
                    "skipped": "conditions",
                })),
                ExecutionStatus::Succeeded,
            ));
        }

        let child = self
            .run_at_depth(target, snapshot, next_depth)
            .await
            .map_err(|err| ActionError::Handler(err.to_string()))?;

        let status = if child.status == ExecutionStatus::Succeeded {
            ExecutionStatus::Succeeded
        } else {
            ExecutionStatus::PartiallyFailed
        };
        let mut output = ActionOutput::with_data(serde_json::json!({
            "chained_rule": target_id,
            "chained_execution": child.id,
            "chained_status": child.status,
        }));
        output.chained_execution = Some(child.id);
        Ok((output, status))
    }

    /// Boxed indirection so the chain recursion has a finite future type.
    fn run_at_depth<'a>(
        &'a self,
        rule: AutomationRule,
        snapshot: Snapshot,
        depth: u32,
    ) -> Pin<Box<dyn Future<Output = Result<RuleExecution, WareflowError>> + Send + 'a>> {
        Box::pin(async move {
            let execution = self
                .prepare(&rule, snapshot, FiredBy::Chain, None)
                .await?;
            self.execute_prepared_at_depth(&rule, execution, depth).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use wareflow_domain::id::TenantId;
    use wareflow_domain::rule::{ActionKind, Condition, Operator, Trigger, ValueType};
    use wareflow_domain::template::ActionTemplate;

    use crate::fakes::{InMemoryExecutionStore, InMemoryRuleRepo, InMemoryTemplateRepo};
    use crate::registry::ActionHandler;

    struct CountingHandler {
        calls: AtomicU32,
        result: fn() -> Result<ActionOutput, ActionError>,
    }

    impl CountingHandler {
        fn succeeding() -> Self {
            Self {
                calls: AtomicU32::new(0),
                result: || Ok(ActionOutput::with_data(serde_json::json!({"ok": true}))),
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicU32::new(0),
                result: || Err(ActionError::Handler("delivery refused".to_string())),
            }
        }
    }

    #[async_trait::async_trait]
    impl ActionHandler for CountingHandler {
        async fn execute(
            &self,
            _config: &ActionConfig,
            _ctx: &ActionContext,
        ) -> Result<ActionOutput, ActionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    struct SleepingHandler;

    #[async_trait::async_trait]
    impl ActionHandler for SleepingHandler {
        async fn execute(
            &self,
            _config: &ActionConfig,
            _ctx: &ActionContext,
        ) -> Result<ActionOutput, ActionError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(ActionOutput::default())
        }
    }

    fn notify_config() -> ActionConfig {
        ActionConfig::SendNotification {
            recipient: "ops@example.com".to_string(),
            subject: "fired".to_string(),
            body: String::new(),
        }
    }

    fn manual_rule(tenant_id: TenantId, action: ActionSpec) -> AutomationRule {
        AutomationRule::builder()
            .tenant_id(tenant_id)
            .name("Test rule")
            .trigger(Trigger::Manual)
            .action(action)
            .build()
            .unwrap()
    }

    fn runner_with(
        rules: Vec<AutomationRule>,
        templates: Vec<ActionTemplate>,
        registry: ActionRegistry,
        config: EngineConfig,
    ) -> RuleRunner<InMemoryRuleRepo, InMemoryExecutionStore, InMemoryTemplateRepo> {
        RuleRunner::new(
            InMemoryRuleRepo::with(rules),
            ExecutionRecorder::new(InMemoryExecutionStore::default()),
            InMemoryTemplateRepo::with(templates),
            Arc::new(registry),
            config,
        )
    }

    #[tokio::test]
    async fn should_record_succeeded_execution_with_output() {
        let tenant = TenantId::new();
        let rule = manual_rule(tenant, ActionSpec::inline(notify_config()));
        let mut registry = ActionRegistry::new();
        registry.register(
            ActionKind::SendNotification,
            Arc::new(CountingHandler::succeeding()),
        );
        let runner = runner_with(vec![rule.clone()], vec![], registry, EngineConfig::default());

        let execution = runner
            .run_rule(&rule, Snapshot::new(), FiredBy::Manual, None)
            .await
            .unwrap();

        assert_eq!(execution.status, ExecutionStatus::Succeeded);
        assert_eq!(execution.result_data, serde_json::json!({"ok": true}));
        let stored = runner.recorder().get(execution.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ExecutionStatus::Succeeded);
        assert!(stored.started_at.is_some());
        assert!(stored.completed_at.is_some());
    }

    #[tokio::test]
    async fn should_record_failed_execution_with_handler_error() {
        let tenant = TenantId::new();
        let rule = manual_rule(tenant, ActionSpec::inline(notify_config()));
        let mut registry = ActionRegistry::new();
        registry.register(
            ActionKind::SendNotification,
            Arc::new(CountingHandler::failing()),
        );
        let runner = runner_with(vec![rule.clone()], vec![], registry, EngineConfig::default());

        let execution = runner
            .run_rule(&rule, Snapshot::new(), FiredBy::Manual, None)
            .await
            .unwrap();

        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert_eq!(execution.error_message.as_deref(), Some("delivery refused"));
    }

    #[tokio::test]
    async fn should_fail_with_unsupported_kind_when_handler_missing() {
        let tenant = TenantId::new();
        let rule = manual_rule(tenant, ActionSpec::inline(notify_config()));
        let runner = runner_with(
            vec![rule.clone()],
            vec![],
            ActionRegistry::new(),
            EngineConfig::default(),
        );

        let execution = runner
            .run_rule(&rule, Snapshot::new(), FiredBy::Manual, None)
            .await
            .unwrap();

        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert!(
            execution
                .error_message
                .as_deref()
                .unwrap()
                .contains("unsupported action kind")
        );
    }

    #[tokio::test]
    async fn should_fail_with_timeout_when_handler_exceeds_deadline() {
        let tenant = TenantId::new();
        let rule = manual_rule(tenant, ActionSpec::inline(notify_config()));
        let mut registry = ActionRegistry::new();
        registry.register(ActionKind::SendNotification, Arc::new(SleepingHandler));
        let config = EngineConfig {
            action_timeout: Duration::from_millis(50),
            ..EngineConfig::default()
        };
        let runner = runner_with(vec![rule.clone()], vec![], registry, config);

        let execution = runner
            .run_rule(&rule, Snapshot::new(), FiredBy::Manual, None)
            .await
            .unwrap();

        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert!(
            execution
                .error_message
                .as_deref()
                .unwrap()
                .contains("timed out")
        );
    }

    #[tokio::test]
    async fn should_resolve_template_action_before_executing() {
        let tenant = TenantId::new();
        let template = ActionTemplate::new(
            tenant,
            "notify-ops",
            serde_json::json!({
                "type": "send_notification",
                "recipient": "ops@example.com",
                "subject": "from template",
            }),
        );
        let mut overrides = serde_json::Map::new();
        overrides.insert("subject".to_string(), serde_json::json!("overridden"));
        let rule = manual_rule(
            tenant,
            ActionSpec::Template {
                code: "notify-ops".to_string(),
                overrides,
            },
        );
        let mut registry = ActionRegistry::new();
        registry.register(
            ActionKind::SendNotification,
            Arc::new(CountingHandler::succeeding()),
        );
        let runner = runner_with(
            vec![rule.clone()],
            vec![template],
            registry,
            EngineConfig::default(),
        );

        let resolved = runner.resolve_action(&rule).await.unwrap();
        assert!(matches!(
            resolved,
            ActionConfig::SendNotification { subject, .. } if subject == "overridden"
        ));

        let execution = runner
            .run_rule(&rule, Snapshot::new(), FiredBy::Manual, None)
            .await
            .unwrap();
        assert_eq!(execution.status, ExecutionStatus::Succeeded);
    }

    #[tokio::test]
    async fn should_fail_when_template_is_missing() {
        let tenant = TenantId::new();
        let rule = manual_rule(
            tenant,
            ActionSpec::Template {
                code: "missing".to_string(),
                overrides: serde_json::Map::new(),
            },
        );
        let runner = runner_with(
            vec![rule.clone()],
            vec![],
            ActionRegistry::new(),
            EngineConfig::default(),
        );

        let execution = runner
            .run_rule(&rule, Snapshot::new(), FiredBy::Manual, None)
            .await
            .unwrap();

        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert!(
            execution
                .error_message
                .as_deref()
                .unwrap()
                .contains("template `missing` not found")
        );
    }

    #[tokio::test]
    async fn should_execute_chained_rule_with_its_own_record() {
        let tenant = TenantId::new();
        let target = manual_rule(tenant, ActionSpec::inline(notify_config()));
        let parent = manual_rule(
            tenant,
            ActionSpec::inline(ActionConfig::TriggerRule { rule_id: target.id }),
        );
        let mut registry = ActionRegistry::new();
        registry.register(
            ActionKind::SendNotification,
            Arc::new(CountingHandler::succeeding()),
        );
        let runner = runner_with(
            vec![parent.clone(), target.clone()],
            vec![],
            registry,
            EngineConfig::default(),
        );

        let execution = runner
            .run_rule(&parent, Snapshot::new(), FiredBy::Manual, None)
            .await
            .unwrap();

        assert_eq!(execution.status, ExecutionStatus::Succeeded);
        let child_id = execution.result_data["chained_execution"]
            .as_str()
            .unwrap()
            .parse()
            .unwrap();
        let child = runner.recorder().get(child_id).await.unwrap().unwrap();
        assert_eq!(child.rule_id, target.id);
        assert_eq!(child.status, ExecutionStatus::Succeeded);
        assert_eq!(child.fired_by, FiredBy::Chain);
    }

    #[tokio::test]
    async fn should_mark_parent_partially_failed_when_chained_rule_fails() {
        let tenant = TenantId::new();
        let target = manual_rule(tenant, ActionSpec::inline(notify_config()));
        let parent = manual_rule(
            tenant,
            ActionSpec::inline(ActionConfig::TriggerRule { rule_id: target.id }),
        );
        let mut registry = ActionRegistry::new();
        registry.register(
            ActionKind::SendNotification,
            Arc::new(CountingHandler::failing()),
        );
        let runner = runner_with(
            vec![parent.clone(), target.clone()],
            vec![],
            registry,
            EngineConfig::default(),
        );

        let execution = runner
            .run_rule(&parent, Snapshot::new(), FiredBy::Manual, None)
            .await
            .unwrap();

        assert_eq!(execution.status, ExecutionStatus::PartiallyFailed);
    }

    #[tokio::test]
    async fn should_skip_chained_rule_that_is_inactive() {
        let tenant = TenantId::new();
        let mut target = manual_rule(tenant, ActionSpec::inline(notify_config()));
        target.is_active = false;
        let parent = manual_rule(
            tenant,
            ActionSpec::inline(ActionConfig::TriggerRule { rule_id: target.id }),
        );
        let runner = runner_with(
            vec![parent.clone(), target.clone()],
            vec![],
            ActionRegistry::new(),
            EngineConfig::default(),
        );

        let execution = runner
            .run_rule(&parent, Snapshot::new(), FiredBy::Manual, None)
            .await
            .unwrap();

        assert_eq!(execution.status, ExecutionStatus::Succeeded);
        assert_eq!(execution.result_data["skipped"], "inactive");
        // No child execution was created.
        assert!(
            runner
                .recorder()
                .by_rule(target.id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn should_skip_chained_rule_whose_conditions_fail() {
        let tenant = TenantId::new();
        let mut target = manual_rule(tenant, ActionSpec::inline(notify_config()));
        target.conditions = vec![Condition::new(
            "status",
            Operator::Equals,
            "Cancelled",
            ValueType::String,
        )];
        let parent = manual_rule(
            tenant,
            ActionSpec::inline(ActionConfig::TriggerRule { rule_id: target.id }),
        );
        let runner = runner_with(
            vec![parent.clone(), target.clone()],
            vec![],
            ActionRegistry::new(),
            EngineConfig::default(),
        );

        let execution = runner
            .run_rule(&parent, Snapshot::new(), FiredBy::Manual, None)
            .await
            .unwrap();

        assert_eq!(execution.status, ExecutionStatus::Succeeded);
        assert_eq!(execution.result_data["skipped"], "conditions");
    }

    #[tokio::test]
    async fn should_stop_self_chaining_rule_at_max_depth() {
        let tenant = TenantId::new();
        let rule_id = wareflow_domain::id::RuleId::new();
        let rule = AutomationRule::builder()
            .id(rule_id)
            .tenant_id(tenant)
            .name("Self chain")
            .trigger(Trigger::Manual)
            .action(ActionSpec::inline(ActionConfig::TriggerRule { rule_id }))
            .build()
            .unwrap();
        let config = EngineConfig {
            max_chain_depth: 3,
            ..EngineConfig::default()
        };
        let runner = runner_with(vec![rule.clone()], vec![], ActionRegistry::new(), config);

        let execution = runner
            .run_rule(&rule, Snapshot::new(), FiredBy::Manual, None)
            .await
            .unwrap();

        // The deepest link fails with the chain guard; every ancestor is
        // partially failed. One execution per link, root included.
        assert_eq!(execution.status, ExecutionStatus::PartiallyFailed);
        let executions = runner.recorder().by_rule(rule_id).await.unwrap();
        assert_eq!(executions.len(), 4);
        let deepest_failure = executions
            .iter()
            .find(|e| e.status == ExecutionStatus::Failed)
            .unwrap();
        assert!(
            deepest_failure
                .error_message
                .as_deref()
                .unwrap()
                .contains("action chain too deep")
        );
    }

    #[tokio::test]
    async fn should_persist_pending_record_before_any_side_effect() {
        let tenant = TenantId::new();
        let rule = manual_rule(tenant, ActionSpec::inline(notify_config()));
        let runner = runner_with(
            vec![rule.clone()],
            vec![],
            ActionRegistry::new(),
            EngineConfig::default(),
        );
        let execution = runner
            .prepare(&rule, Snapshot::new(), FiredBy::Manual, None)
            .await
            .unwrap();
        assert_eq!(execution.status, ExecutionStatus::Pending);
        let stored = runner.recorder().get(execution.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ExecutionStatus::Pending);
    }
}
