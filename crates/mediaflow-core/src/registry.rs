use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::error::MediaflowError;
use crate::ports::Processor;

/// Name and description of a registered processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessorInfo {
    pub name: String,
    pub description: String,
}

/// Registry of processors (name -> processor).
///
/// Design:
/// - Built during initialization by explicit `register` calls (mutable).
/// - Shared behind an `Arc` once the queue is created (immutable).
#[derive(Default)]
pub struct ProcessorRegistry {
    processors: HashMap<String, Arc<dyn Processor>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self {
            processors: HashMap::new(),
        }
    }

    /// Register a processor under its own `name()`.
    pub fn register(&mut self, processor: Arc<dyn Processor>) -> Result<(), MediaflowError> {
        let name = processor.name().to_string();
        if self.processors.contains_key(&name) {
            return Err(MediaflowError::DuplicateProcessor(name));
        }
        tracing::debug!(processor = %name, "registered processor");
        self.processors.insert(name, processor);
        Ok(())
    }

    /// Builder-style `register`.
    pub fn with(mut self, processor: Arc<dyn Processor>) -> Result<Self, MediaflowError> {
        self.register(processor)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Processor>> {
        self.processors.get(name)
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Processor>, MediaflowError> {
        self.get(name)
            .cloned()
            .ok_or_else(|| MediaflowError::ProcessorNotFound(name.to_string()))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.processors.keys().cloned().collect();
        names.sort();
        names
    }

    /// Name and description of every processor, sorted by name.
    pub fn describe(&self) -> Vec<ProcessorInfo> {
        let mut infos: Vec<ProcessorInfo> = self
            .processors
            .values()
            .map(|p| ProcessorInfo {
                name: p.name().to_string(),
                description: p.description().to_string(),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Payload;
    use crate::ports::ProcessorError;
    use crate::queue::TaskContext;
    use async_trait::async_trait;

    struct Named(&'static str);

    #[async_trait]
    impl Processor for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            if self.0 == "rename" { "renames files" } else { "" }
        }

        async fn process(&self, _ctx: &TaskContext) -> Result<Payload, ProcessorError> {
            Ok(Payload::new())
        }
    }

    #[test]
    fn register_and_resolve() {
        let reg = ProcessorRegistry::new()
            .with(Arc::new(Named("rename")))
            .unwrap()
            .with(Arc::new(Named("convert")))
            .unwrap();

        assert_eq!(reg.len(), 2);
        assert_eq!(reg.names(), vec!["convert".to_string(), "rename".to_string()]);
        assert_eq!(reg.resolve("rename").unwrap().name(), "rename");
    }

    #[test]
    fn describe_lists_name_and_description() {
        let reg = ProcessorRegistry::new()
            .with(Arc::new(Named("rename")))
            .unwrap()
            .with(Arc::new(Named("convert")))
            .unwrap();

        let infos = reg.describe();
        assert_eq!(
            infos,
            vec![
                ProcessorInfo { name: "convert".into(), description: String::new() },
                ProcessorInfo { name: "rename".into(), description: "renames files".into() },
            ]
        );
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut reg = ProcessorRegistry::new();
        reg.register(Arc::new(Named("rename"))).unwrap();

        let err = reg.register(Arc::new(Named("rename"))).unwrap_err();
        assert!(matches!(err, MediaflowError::DuplicateProcessor(name) if name == "rename"));
    }

    #[test]
    fn missing_processor_is_an_error() {
        let reg = ProcessorRegistry::new();
        assert!(reg.is_empty());
        let err = reg.resolve("missing").err().unwrap();
        assert_eq!(err.to_string(), "processor not found: missing");
    }
}
