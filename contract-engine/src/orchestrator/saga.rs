//! Saga recorder
//!
//! A compound operation registers each committed step together with a typed
//! compensation closure. On a mid-sequence failure the recorder runs the
//! compensations of the already-committed steps in reverse order, marks each
//! step, and reports whether every compensation succeeded.
//!
//! One tagged status per step; no parallel bookkeeping fields anywhere else.

use futures::future::BoxFuture;
use tracing::{error, info};

/// Outcome of one saga step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    Done,
    Failed(String),
    Compensated,
}

type Compensation = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), String>> + Send>;

pub struct SagaStep {
    pub name: &'static str,
    pub status: StepStatus,
    compensation: Option<Compensation>,
}

/// Step list for one operation run. Not persisted; lives exactly as long
/// as the operation.
pub struct Saga {
    operation: &'static str,
    steps: Vec<SagaStep>,
}

impl Saga {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            steps: Vec::new(),
        }
    }

    /// Record a committed step with no compensation (read-only or
    /// fire-and-forget)
    pub fn done(&mut self, name: &'static str) {
        self.steps.push(SagaStep {
            name,
            status: StepStatus::Done,
            compensation: None,
        });
    }

    /// Record a committed step that must be undone if a later step fails
    pub fn done_with<F>(&mut self, name: &'static str, compensation: F)
    where
        F: FnOnce() -> BoxFuture<'static, Result<(), String>> + Send + 'static,
    {
        self.steps.push(SagaStep {
            name,
            status: StepStatus::Done,
            compensation: Some(Box::new(compensation)),
        });
    }

    /// Record the step that broke the sequence
    pub fn failed(&mut self, name: &'static str, reason: impl Into<String>) {
        self.steps.push(SagaStep {
            name,
            status: StepStatus::Failed(reason.into()),
            compensation: None,
        });
    }

    /// Run compensations of all `Done` steps in reverse order. Returns true
    /// when every compensation succeeded (or none existed).
    pub async fn compensate(&mut self) -> bool {
        let mut all_ok = true;
        for step in self.steps.iter_mut().rev() {
            if step.status != StepStatus::Done {
                continue;
            }
            let Some(compensation) = step.compensation.take() else {
                continue;
            };
            match compensation().await {
                Ok(()) => {
                    info!(
                        operation = self.operation,
                        step = step.name,
                        "Compensation applied"
                    );
                    step.status = StepStatus::Compensated;
                }
                Err(e) => {
                    error!(
                        operation = self.operation,
                        step = step.name,
                        "Compensation failed: {e}"
                    );
                    all_ok = false;
                }
            }
        }
        all_ok
    }

    pub fn steps(&self) -> &[SagaStep] {
        &self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_compensations_run_in_reverse_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut saga = Saga::new("test");

        for name in ["first", "second", "third"] {
            let order = order.clone();
            saga.done_with(name, move || {
                Box::pin(async move {
                    order.lock().unwrap().push(name);
                    Ok(())
                })
            });
        }
        saga.failed("fourth", "boom");

        assert!(saga.compensate().await);
        assert_eq!(*order.lock().unwrap(), vec!["third", "second", "first"]);
        assert!(saga
            .steps()
            .iter()
            .take(3)
            .all(|s| s.status == StepStatus::Compensated));
        assert_eq!(saga.steps()[3].status, StepStatus::Failed("boom".into()));
    }

    #[tokio::test]
    async fn test_steps_without_compensation_are_skipped() {
        let ran = Arc::new(AtomicBool::new(false));
        let mut saga = Saga::new("test");
        saga.done("read_only");
        let flag = ran.clone();
        saga.done_with("mutation", move || {
            Box::pin(async move {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
        });

        assert!(saga.compensate().await);
        assert!(ran.load(Ordering::SeqCst));
        assert_eq!(saga.steps()[0].status, StepStatus::Done);
        assert_eq!(saga.steps()[1].status, StepStatus::Compensated);
    }

    #[tokio::test]
    async fn test_failed_compensation_reported() {
        let mut saga = Saga::new("test");
        saga.done_with("mutation", || Box::pin(async { Err("db gone".to_string()) }));
        assert!(!saga.compensate().await);
        // The step stays Done so the failure is visible
        assert_eq!(saga.steps()[0].status, StepStatus::Done);
    }
}
