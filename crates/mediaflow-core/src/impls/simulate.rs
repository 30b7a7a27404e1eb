//! SimulateProcessor - 一定ステップ進めるだけの処理
//!
//! Sleeps through a fixed number of steps. It reports progress after each
//! step and checks the cancellation flag before each one.
//!
//! Per-task overrides in `TaskSpec::config`:
//! - `steps`: number of steps (default 100)
//! - `step_ms`: delay per step in milliseconds
//! - `fail_at`: fail when this step is reached

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::Payload;
use crate::ports::{Processor, ProcessorError};
use crate::queue::TaskContext;

pub const DEFAULT_STEPS: u64 = 100;

#[derive(Debug, Clone)]
pub struct SimulateProcessor {
    steps: u64,
    step_delay: Duration,
}

impl Default for SimulateProcessor {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS,
            step_delay: Duration::from_millis(10),
        }
    }
}

impl SimulateProcessor {
    pub fn new(steps: u64, step_delay: Duration) -> Self {
        Self { steps, step_delay }
    }
}

fn config_u64(config: &Payload, key: &str) -> Option<u64> {
    config.get(key).and_then(Value::as_u64)
}

#[async_trait]
impl Processor for SimulateProcessor {
    fn name(&self) -> &str {
        "simulate"
    }

    fn description(&self) -> &str {
        "sleeps through a fixed number of steps, reporting progress"
    }

    async fn process(&self, ctx: &TaskContext) -> Result<Payload, ProcessorError> {
        let config = ctx.config();
        let steps = config_u64(config, "steps").unwrap_or(self.steps);
        let step_delay = config_u64(config, "step_ms")
            .map(Duration::from_millis)
            .unwrap_or(self.step_delay);
        let fail_at = config_u64(config, "fail_at");

        for step in 0..steps {
            if ctx.is_cancelled() {
                tracing::debug!(step, "simulate stopped on cancel");
                return Err(ProcessorError::Cancelled);
            }
            if fail_at == Some(step) {
                return Err(ProcessorError::Failed(format!("simulated failure at step {step}")));
            }
            tokio::time::sleep(step_delay).await;
            ctx.progress().step(step + 1, steps).await;
        }

        let mut result = Payload::new();
        result.insert("success".into(), Value::Bool(true));
        result.insert(
            "processed_file".into(),
            Value::String(ctx.output_path().display().to_string()),
        );
        result.insert("task_id".into(), Value::String(ctx.task_id().to_string()));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TaskId, TaskSpec};
    use crate::queue::{CancelToken, cancel_pair};
    use serde_json::json;
    use ulid::Ulid;

    fn ctx(spec: TaskSpec, cancel: CancelToken) -> TaskContext {
        TaskContext::detached(TaskId::from_ulid(Ulid::new()), spec, cancel)
    }

    #[tokio::test]
    async fn runs_to_completion() {
        let spec = TaskSpec::new("simulate", "in.png", "out.png").with_config("step_ms", json!(0));
        let ctx = ctx(spec, CancelToken::never());

        let result = SimulateProcessor::default().process(&ctx).await.unwrap();
        assert_eq!(result["success"], json!(true));
        assert_eq!(result["processed_file"], json!("out.png"));
        assert_eq!(result["task_id"], json!(ctx.task_id().to_string()));
    }

    #[tokio::test]
    async fn stops_when_cancelled() {
        let (handle, token) = cancel_pair();
        handle.cancel();
        let ctx = ctx(TaskSpec::new("simulate", "in", "out"), token);

        let err = SimulateProcessor::default().process(&ctx).await.unwrap_err();
        assert!(matches!(err, ProcessorError::Cancelled));
    }

    #[tokio::test]
    async fn fail_at_is_reported() {
        let spec = TaskSpec::new("simulate", "in", "out")
            .with_config("step_ms", json!(0))
            .with_config("fail_at", json!(3));
        let ctx = ctx(spec, CancelToken::never());

        let err = SimulateProcessor::default().process(&ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "simulated failure at step 3");
    }
}
