//! In-memory port implementations shared by the engine's unit tests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use wareflow_domain::error::WareflowError;
use wareflow_domain::event::EventKind;
use wareflow_domain::execution::{ExecutionStatus, RuleExecution};
use wareflow_domain::id::{ExecutionId, JobId, RuleId, TemplateId, TenantId};
use wareflow_domain::job::{JobStatus, ScheduledJob};
use wareflow_domain::rule::{AutomationRule, EntityRef, Trigger};
use wareflow_domain::template::ActionTemplate;
use wareflow_domain::time::Timestamp;

use crate::ports::{
    EntityCommands, ExecutionStore, Notification, Notifier, RuleRepository,
    ScheduledJobRepository, TemplateRepository, WebhookClient, WebhookDeliveryError,
    WebhookRequest, WebhookResponse,
};

// ── In-memory rule repo ────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryRuleRepo {
    store: Mutex<HashMap<RuleId, AutomationRule>>,
}

impl InMemoryRuleRepo {
    pub fn with(rules: Vec<AutomationRule>) -> Self {
        let map: HashMap<_, _> = rules.into_iter().map(|r| (r.id, r)).collect();
        Self {
            store: Mutex::new(map),
        }
    }
}

impl RuleRepository for InMemoryRuleRepo {
    fn create(
        &self,
        rule: AutomationRule,
    ) -> impl Future<Output = Result<AutomationRule, WareflowError>> + Send {
        let mut store = self.store.lock().unwrap();
        store.insert(rule.id, rule.clone());
        async { Ok(rule) }
    }

    fn get_by_id(
        &self,
        id: RuleId,
    ) -> impl Future<Output = Result<Option<AutomationRule>, WareflowError>> + Send {
        let store = self.store.lock().unwrap();
        let result = store.get(&id).cloned();
        async { Ok(result) }
    }

    fn get_all(
        &self,
        tenant_id: TenantId,
    ) -> impl Future<Output = Result<Vec<AutomationRule>, WareflowError>> + Send {
        let store = self.store.lock().unwrap();
        let result: Vec<_> = store
            .values()
            .filter(|r| r.tenant_id == tenant_id)
            .cloned()
            .collect();
        async { Ok(result) }
    }

    fn find_active_event_rules(
        &self,
        tenant_id: TenantId,
        entity_type: String,
        event: EventKind,
    ) -> impl Future<Output = Result<Vec<AutomationRule>, WareflowError>> + Send {
        let store = self.store.lock().unwrap();
        let result: Vec<_> = store
            .values()
            .filter(|r| r.tenant_id == tenant_id && r.is_active)
            .filter(|r| {
                matches!(
                    &r.trigger,
                    Trigger::EntityEvent { entity_type: et, event: ev }
                        if et == &entity_type && ev == &event
                )
            })
            .cloned()
            .collect();
        async { Ok(result) }
    }

    fn update(
        &self,
        rule: AutomationRule,
    ) -> impl Future<Output = Result<AutomationRule, WareflowError>> + Send {
        let mut store = self.store.lock().unwrap();
        store.insert(rule.id, rule.clone());
        async { Ok(rule) }
    }

    fn delete(&self, id: RuleId) -> impl Future<Output = Result<(), WareflowError>> + Send {
        let mut store = self.store.lock().unwrap();
        store.remove(&id);
        async { Ok(()) }
    }

    fn set_next_scheduled(
        &self,
        id: RuleId,
        next: Option<Timestamp>,
    ) -> impl Future<Output = Result<(), WareflowError>> + Send {
        let mut store = self.store.lock().unwrap();
        if let Some(rule) = store.get_mut(&id) {
            rule.next_scheduled_at = next;
        }
        async { Ok(()) }
    }
}

// ── In-memory job repo ─────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryJobRepo {
    store: Mutex<HashMap<JobId, ScheduledJob>>,
}

impl InMemoryJobRepo {
    pub fn jobs(&self) -> Vec<ScheduledJob> {
        self.store.lock().unwrap().values().cloned().collect()
    }
}

impl ScheduledJobRepository for InMemoryJobRepo {
    fn upsert_next(
        &self,
        job: ScheduledJob,
    ) -> impl Future<Output = Result<ScheduledJob, WareflowError>> + Send {
        let mut store = self.store.lock().unwrap();
        store.retain(|_, existing| {
            existing.rule_id != job.rule_id || existing.status != JobStatus::Pending
        });
        store.insert(job.id, job.clone());
        async { Ok(job) }
    }

    fn find_due(
        &self,
        now: Timestamp,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<ScheduledJob>, WareflowError>> + Send {
        let store = self.store.lock().unwrap();
        let mut due: Vec<_> = store.values().filter(|j| j.is_due(now)).cloned().collect();
        due.sort_by_key(|j| j.scheduled_for);
        due.truncate(limit as usize);
        async { Ok(due) }
    }

    fn claim(
        &self,
        id: JobId,
        at: Timestamp,
    ) -> impl Future<Output = Result<bool, WareflowError>> + Send {
        let mut store = self.store.lock().unwrap();
        let claimed = match store.get_mut(&id) {
            Some(job) if job.status == JobStatus::Pending => {
                job.status = JobStatus::Claimed;
                job.claimed_at = Some(at);
                true
            }
            _ => false,
        };
        async move { Ok(claimed) }
    }

    fn mark_done(
        &self,
        id: JobId,
        note: Option<String>,
    ) -> impl Future<Output = Result<(), WareflowError>> + Send {
        let mut store = self.store.lock().unwrap();
        if let Some(job) = store.get_mut(&id) {
            job.status = JobStatus::Done;
            job.error_message = note;
        }
        async { Ok(()) }
    }

    fn mark_failed(
        &self,
        id: JobId,
        error: String,
    ) -> impl Future<Output = Result<(), WareflowError>> + Send {
        let mut store = self.store.lock().unwrap();
        if let Some(job) = store.get_mut(&id) {
            job.status = JobStatus::Failed;
            job.error_message = Some(error);
        }
        async { Ok(()) }
    }

    fn release_expired(
        &self,
        cutoff: Timestamp,
    ) -> impl Future<Output = Result<u64, WareflowError>> + Send {
        let mut store = self.store.lock().unwrap();
        let mut released = 0;
        for job in store.values_mut() {
            if job.status == JobStatus::Claimed && job.claimed_at.is_some_and(|at| at < cutoff) {
                job.status = JobStatus::Pending;
                job.claimed_at = None;
                released += 1;
            }
        }
        async move { Ok(released) }
    }

    fn delete_for_rule(
        &self,
        rule_id: RuleId,
    ) -> impl Future<Output = Result<(), WareflowError>> + Send {
        let mut store = self.store.lock().unwrap();
        store.retain(|_, job| job.rule_id != rule_id);
        async { Ok(()) }
    }

    fn get_by_id(
        &self,
        id: JobId,
    ) -> impl Future<Output = Result<Option<ScheduledJob>, WareflowError>> + Send {
        let store = self.store.lock().unwrap();
        let result = store.get(&id).cloned();
        async { Ok(result) }
    }
}

// ── In-memory execution store ──────────────────────────────────────

#[derive(Default)]
pub struct InMemoryExecutionStore {
    store: Mutex<HashMap<ExecutionId, RuleExecution>>,
}

impl InMemoryExecutionStore {
    pub fn executions(&self) -> Vec<RuleExecution> {
        self.store.lock().unwrap().values().cloned().collect()
    }
}

impl ExecutionStore for InMemoryExecutionStore {
    fn insert(
        &self,
        execution: RuleExecution,
    ) -> impl Future<Output = Result<(), WareflowError>> + Send {
        let mut store = self.store.lock().unwrap();
        store.insert(execution.id, execution);
        async { Ok(()) }
    }

    fn update(
        &self,
        execution: RuleExecution,
    ) -> impl Future<Output = Result<(), WareflowError>> + Send {
        let mut store = self.store.lock().unwrap();
        store.insert(execution.id, execution);
        async { Ok(()) }
    }

    fn get_by_id(
        &self,
        id: ExecutionId,
    ) -> impl Future<Output = Result<Option<RuleExecution>, WareflowError>> + Send {
        let store = self.store.lock().unwrap();
        let result = store.get(&id).cloned();
        async { Ok(result) }
    }

    fn find_by_rule(
        &self,
        rule_id: RuleId,
    ) -> impl Future<Output = Result<Vec<RuleExecution>, WareflowError>> + Send {
        let store = self.store.lock().unwrap();
        let mut result: Vec<_> = store
            .values()
            .filter(|e| e.rule_id == rule_id)
            .cloned()
            .collect();
        result.sort_by_key(|e| std::cmp::Reverse(e.created_at));
        async { Ok(result) }
    }

    fn find_by_status(
        &self,
        tenant_id: TenantId,
        status: ExecutionStatus,
    ) -> impl Future<Output = Result<Vec<RuleExecution>, WareflowError>> + Send {
        let store = self.store.lock().unwrap();
        let mut result: Vec<_> = store
            .values()
            .filter(|e| e.tenant_id == tenant_id && e.status == status)
            .cloned()
            .collect();
        result.sort_by_key(|e| std::cmp::Reverse(e.created_at));
        async { Ok(result) }
    }
}

// ── In-memory template repo ────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryTemplateRepo {
    store: Mutex<HashMap<TemplateId, ActionTemplate>>,
}

impl InMemoryTemplateRepo {
    pub fn with(templates: Vec<ActionTemplate>) -> Self {
        let map: HashMap<_, _> = templates.into_iter().map(|t| (t.id, t)).collect();
        Self {
            store: Mutex::new(map),
        }
    }
}

impl TemplateRepository for InMemoryTemplateRepo {
    fn create(
        &self,
        template: ActionTemplate,
    ) -> impl Future<Output = Result<ActionTemplate, WareflowError>> + Send {
        let mut store = self.store.lock().unwrap();
        store.insert(template.id, template.clone());
        async { Ok(template) }
    }

    fn get_by_id(
        &self,
        id: TemplateId,
    ) -> impl Future<Output = Result<Option<ActionTemplate>, WareflowError>> + Send {
        let store = self.store.lock().unwrap();
        let result = store.get(&id).cloned();
        async { Ok(result) }
    }

    fn find_by_code(
        &self,
        tenant_id: TenantId,
        code: String,
    ) -> impl Future<Output = Result<Option<ActionTemplate>, WareflowError>> + Send {
        let store = self.store.lock().unwrap();
        let result = store
            .values()
            .find(|t| t.tenant_id == tenant_id && t.code == code)
            .cloned();
        async { Ok(result) }
    }

    fn get_all(
        &self,
        tenant_id: TenantId,
    ) -> impl Future<Output = Result<Vec<ActionTemplate>, WareflowError>> + Send {
        let store = self.store.lock().unwrap();
        let result: Vec<_> = store
            .values()
            .filter(|t| t.tenant_id == tenant_id)
            .cloned()
            .collect();
        async { Ok(result) }
    }

    fn update(
        &self,
        template: ActionTemplate,
    ) -> impl Future<Output = Result<ActionTemplate, WareflowError>> + Send {
        let mut store = self.store.lock().unwrap();
        store.insert(template.id, template.clone());
        async { Ok(template) }
    }

    fn delete(&self, id: TemplateId) -> impl Future<Output = Result<(), WareflowError>> + Send {
        let mut store = self.store.lock().unwrap();
        store.remove(&id);
        async { Ok(()) }
    }
}

// ── Spy integrations ───────────────────────────────────────────────

pub type CreatedRecord = (String, std::collections::BTreeMap<String, serde_json::Value>);
pub type UpdatedField = (String, String, String, serde_json::Value);

#[derive(Default)]
pub struct RecordingEntityCommands {
    pub created: Mutex<Vec<CreatedRecord>>,
    pub updated: Mutex<Vec<UpdatedField>>,
}

impl EntityCommands for RecordingEntityCommands {
    fn create_record(
        &self,
        _tenant_id: TenantId,
        entity_type: String,
        fields: std::collections::BTreeMap<String, serde_json::Value>,
    ) -> impl Future<Output = Result<EntityRef, WareflowError>> + Send {
        let entity_id = format!("{}-{}", entity_type.to_lowercase(), fields.len());
        self.created
            .lock()
            .unwrap()
            .push((entity_type.clone(), fields));
        async move {
            Ok(EntityRef {
                entity_type,
                entity_id,
            })
        }
    }

    fn update_field(
        &self,
        _tenant_id: TenantId,
        entity_type: String,
        entity_id: String,
        field: String,
        value: serde_json::Value,
    ) -> impl Future<Output = Result<(), WareflowError>> + Send {
        self.updated
            .lock()
            .unwrap()
            .push((entity_type, entity_id, field, value));
        async { Ok(()) }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

impl Notifier for RecordingNotifier {
    fn notify(
        &self,
        notification: Notification,
    ) -> impl Future<Output = Result<(), WareflowError>> + Send {
        self.sent.lock().unwrap().push(notification);
        async { Ok(()) }
    }
}

pub type WebhookOutcome = Result<WebhookResponse, WebhookDeliveryError>;

/// Webhook client that pops one scripted outcome per call, repeating the
/// last one when the script runs out.
pub struct ScriptedWebhookClient {
    script: Mutex<Vec<WebhookOutcome>>,
    pub attempts: AtomicU32,
    pub requests: Mutex<Vec<WebhookRequest>>,
}

impl ScriptedWebhookClient {
    pub fn new(script: Vec<WebhookOutcome>) -> Self {
        Self {
            script: Mutex::new(script),
            attempts: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl WebhookClient for ScriptedWebhookClient {
    fn post(
        &self,
        request: WebhookRequest,
    ) -> impl Future<Output = Result<WebhookResponse, WebhookDeliveryError>> + Send {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        let mut script = self.script.lock().unwrap();
        let outcome = if script.len() > 1 {
            script.remove(0)
        } else {
            script
                .first()
                .cloned()
                .unwrap_or(Ok(WebhookResponse { status: 200 }))
        };
        async move { outcome }
    }
}
