//! Execution store port — durable rule-execution history.

use std::future::Future;

use wareflow_domain::error::WareflowError;
use wareflow_domain::execution::{ExecutionStatus, RuleExecution};
use wareflow_domain::id::{ExecutionId, RuleId, TenantId};

/// Storage for [`RuleExecution`] records.
///
/// The store persists whatever state it is handed; transition legality is
/// enforced by the [`ExecutionRecorder`](crate::recorder::ExecutionRecorder)
/// through the domain state machine before `update` is called.
pub trait ExecutionStore {
    /// Insert a freshly created execution.
    fn insert(
        &self,
        execution: RuleExecution,
    ) -> impl Future<Output = Result<(), WareflowError>> + Send;

    /// Persist an execution's current state.
    fn update(
        &self,
        execution: RuleExecution,
    ) -> impl Future<Output = Result<(), WareflowError>> + Send;

    /// Fetch an execution by id.
    fn get_by_id(
        &self,
        id: ExecutionId,
    ) -> impl Future<Output = Result<Option<RuleExecution>, WareflowError>> + Send;

    /// Executions for one rule, newest first.
    fn find_by_rule(
        &self,
        rule_id: RuleId,
    ) -> impl Future<Output = Result<Vec<RuleExecution>, WareflowError>> + Send;

    /// Executions for a tenant in a given status, newest first.
    fn find_by_status(
        &self,
        tenant_id: TenantId,
        status: ExecutionStatus,
    ) -> impl Future<Output = Result<Vec<RuleExecution>, WareflowError>> + Send;
}

impl<T: ExecutionStore + Send + Sync> ExecutionStore for std::sync::Arc<T> {
    fn insert(
        &self,
        execution: RuleExecution,
    ) -> impl Future<Output = Result<(), WareflowError>> + Send {
        (**self).insert(execution)
    }

    fn update(
        &self,
        execution: RuleExecution,
    ) -> impl Future<Output = Result<(), WareflowError>> + Send {
        (**self).update(execution)
    }

    fn get_by_id(
        &self,
        id: ExecutionId,
    ) -> impl Future<Output = Result<Option<RuleExecution>, WareflowError>> + Send {
        (**self).get_by_id(id)
    }

    fn find_by_rule(
        &self,
        rule_id: RuleId,
    ) -> impl Future<Output = Result<Vec<RuleExecution>, WareflowError>> + Send {
        (**self).find_by_rule(rule_id)
    }

    fn find_by_status(
        &self,
        tenant_id: TenantId,
        status: ExecutionStatus,
    ) -> impl Future<Output = Result<Vec<RuleExecution>, WareflowError>> + Send {
        (**self).find_by_status(tenant_id, status)
    }
}
