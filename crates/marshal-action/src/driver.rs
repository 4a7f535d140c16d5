//! Batch execution.
//!
//! Runs an ordered list of actions one at a time in arrival order. A failing
//! action is logged and recorded in the report; it never stops the batch.

use std::fmt;

use tracing::Instrument;
use uuid::Uuid;

use crate::error::ActionError;
use crate::router::ActionRouter;
use crate::types::{Action, ActionEffect, AnalysisEnvelope, RejectedAction};

/// The result of one action within a batch.
#[derive(Debug)]
pub struct ActionOutcome {
    /// Zero-based position in the batch.
    pub index: usize,
    pub action_type: String,
    pub target: String,
    pub result: Result<ActionEffect, ActionError>,
}

/// Per-action results of a batch run.
#[derive(Debug)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub outcomes: Vec<ActionOutcome>,
}

impl BatchReport {
    pub fn applied(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ActionOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "applied {} of {} actions with {} failures",
            self.applied(),
            self.outcomes.len(),
            self.failures().count()
        )
    }
}

/// Runs action batches through an [`ActionRouter`].
pub struct ExecutionDriver {
    router: ActionRouter,
}

impl ExecutionDriver {
    pub fn new(router: ActionRouter) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &ActionRouter {
        &self.router
    }

    /// Execute `actions` sequentially. Each action's outcome is independent
    /// of the ones before it.
    pub async fn run(&self, actions: &[Action]) -> BatchReport {
        let batch_id = Uuid::new_v4();
        let span = tracing::info_span!("batch", %batch_id, size = actions.len());

        async {
            let mut outcomes = Vec::with_capacity(actions.len());
            for (index, action) in actions.iter().enumerate() {
                outcomes.push(self.execute_at(index, action).await);
            }
            finish(batch_id, outcomes)
        }
        .instrument(span)
        .await
    }

    /// Execute a parsed analysis result.
    ///
    /// Outcomes carry each element's position in the original array, and
    /// elements that failed to parse are reported as malformed failures in
    /// their place.
    pub async fn run_envelope(&self, envelope: &AnalysisEnvelope) -> BatchReport {
        let batch_id = Uuid::new_v4();
        let span = tracing::info_span!("batch", %batch_id, size = envelope.len());

        async {
            let mut outcomes = Vec::with_capacity(envelope.len());
            let mut rejected = envelope.rejected.iter().peekable();
            for (index, action) in &envelope.actions {
                while let Some(r) = rejected.next_if(|r| r.index < *index) {
                    outcomes.push(malformed(r));
                }
                outcomes.push(self.execute_at(*index, action).await);
            }
            outcomes.extend(rejected.map(malformed));
            finish(batch_id, outcomes)
        }
        .instrument(span)
        .await
    }

    async fn execute_at(&self, index: usize, action: &Action) -> ActionOutcome {
        let result = self.router.execute(action).await;
        match &result {
            Ok(effect) => tracing::debug!(index, effect = %effect, "Action applied"),
            Err(err) => tracing::warn!(
                index,
                action_type = %action.action_type,
                target = %action.target,
                kind = %err.kind(),
                error = %err,
                rollback = ?action.rollback,
                "Action failed"
            ),
        }
        ActionOutcome {
            index,
            action_type: action.action_type.clone(),
            target: action.target.clone(),
            result,
        }
    }
}

fn malformed(rejected: &RejectedAction) -> ActionOutcome {
    let err = ActionError::Malformed(rejected.reason.clone());
    tracing::warn!(
        index = rejected.index,
        action_type = %rejected.action_type,
        kind = %err.kind(),
        error = %err,
        "Action failed"
    );
    ActionOutcome {
        index: rejected.index,
        action_type: rejected.action_type.clone(),
        target: rejected.target.clone(),
        result: Err(err),
    }
}

fn finish(batch_id: Uuid, outcomes: Vec<ActionOutcome>) -> BatchReport {
    let report = BatchReport { batch_id, outcomes };
    tracing::info!("{}", report);
    report
}
