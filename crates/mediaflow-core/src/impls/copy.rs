//! CopyProcessor - input_path を output_path にコピー

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::Payload;
use crate::ports::{Processor, ProcessorError};
use crate::queue::TaskContext;

#[derive(Debug, Clone, Copy, Default)]
pub struct CopyProcessor;

#[async_trait]
impl Processor for CopyProcessor {
    fn name(&self) -> &str {
        "copy"
    }

    fn description(&self) -> &str {
        "copies the input file to the output path"
    }

    async fn process(&self, ctx: &TaskContext) -> Result<Payload, ProcessorError> {
        if ctx.is_cancelled() {
            return Err(ProcessorError::Cancelled);
        }
        if let Some(parent) = ctx.output_path().parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = tokio::fs::copy(ctx.input_path(), ctx.output_path()).await?;
        ctx.progress().report(1.0).await;

        let mut result = Payload::new();
        result.insert("success".into(), Value::Bool(true));
        result.insert(
            "processed_file".into(),
            Value::String(ctx.output_path().display().to_string()),
        );
        result.insert("bytes".into(), Value::from(bytes));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TaskId, TaskSpec};
    use crate::queue::CancelToken;
    use serde_json::json;
    use ulid::Ulid;

    #[tokio::test]
    async fn copies_into_a_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("nested").join("out.txt");
        tokio::fs::write(&input, b"frame data").await.unwrap();

        let spec = TaskSpec::new("copy", &input, &output);
        let ctx = TaskContext::detached(TaskId::from_ulid(Ulid::new()), spec, CancelToken::never());
        let result = CopyProcessor.process(&ctx).await.unwrap();

        assert_eq!(result["bytes"], json!(10));
        assert_eq!(tokio::fs::read(&output).await.unwrap(), b"frame data");
    }

    #[tokio::test]
    async fn missing_input_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let spec = TaskSpec::new("copy", dir.path().join("nope"), dir.path().join("out"));
        let ctx = TaskContext::detached(TaskId::from_ulid(Ulid::new()), spec, CancelToken::never());

        let err = CopyProcessor.process(&ctx).await.unwrap_err();
        assert!(matches!(err, ProcessorError::Io(_)));
    }
}
