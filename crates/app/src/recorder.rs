//! Execution recorder — append-only writes of execution transitions.
//!
//! The recorder is the only component that persists execution state. It
//! drives the domain state machine first, so an illegal transition (e.g.
//! mutating a terminal record) is rejected before any write happens.

use wareflow_domain::error::WareflowError;
use wareflow_domain::execution::{ExecutionStatus, RuleExecution};
use wareflow_domain::id::{ExecutionId, RuleId, TenantId};
use wareflow_domain::rule::ActionOutput;
use wareflow_domain::time;

use crate::ports::ExecutionStore;

/// Records execution lifecycle transitions through an [`ExecutionStore`].
pub struct ExecutionRecorder<X> {
    store: X,
}

impl<X: ExecutionStore> ExecutionRecorder<X> {
    /// Create a recorder backed by the given store.
    pub fn new(store: X) -> Self {
        Self { store }
    }

    /// Persist a freshly created pending execution.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub async fn record_pending(&self, execution: &RuleExecution) -> Result<(), WareflowError> {
        self.store.insert(execution.clone()).await
    }

    /// Transition `Pending → Running` and persist.
    ///
    /// # Errors
    ///
    /// Returns [`WareflowError::Transition`] for an illegal transition, or
    /// a storage error.
    pub async fn mark_running(&self, execution: &mut RuleExecution) -> Result<(), WareflowError> {
        execution.start(time::now())?;
        self.store.update(execution.clone()).await
    }

    /// Transition into a terminal status with the action's output and
    /// persist. Terminal records are never mutated again.
    ///
    /// # Errors
    ///
    /// Returns [`WareflowError::Transition`] for an illegal transition, or
    /// a storage error.
    pub async fn finish(
        &self,
        execution: &mut RuleExecution,
        status: ExecutionStatus,
        output: Option<ActionOutput>,
        error: Option<String>,
    ) -> Result<(), WareflowError> {
        if let Some(output) = output {
            execution.result_data = output.result_data;
            execution.created_entity = output.created_entity;
        }
        execution.error_message = error;
        execution.finish(status, time::now())?;
        self.store.update(execution.clone()).await
    }

    /// Fetch one execution.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub async fn get(&self, id: ExecutionId) -> Result<Option<RuleExecution>, WareflowError> {
        self.store.get_by_id(id).await
    }

    /// Executions for one rule, newest first.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub async fn by_rule(&self, rule_id: RuleId) -> Result<Vec<RuleExecution>, WareflowError> {
        self.store.find_by_rule(rule_id).await
    }

    /// Executions for a tenant in a given status, newest first.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub async fn by_status(
        &self,
        tenant_id: TenantId,
        status: ExecutionStatus,
    ) -> Result<Vec<RuleExecution>, WareflowError> {
        self.store.find_by_status(tenant_id, status).await
    }
}
