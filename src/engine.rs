//! Engine facade for relcore
//!
//! Ties the storage boundary, the compilation service and execution
//! together. Callers build a plan with `CompilableProvider`, then compile,
//! execute or explain it here.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::compiler::{CompilationService, LocalCompiler, ProviderCompiler};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::executor::{ExecutableProvider, RecordSet};
use crate::index::IndexStorage;
use crate::plan::{CompilableProvider, ExplainPlan};
use crate::tuple::Tuple;

/// Query engine over one index storage
pub struct Engine {
    /// Validated configuration
    config: EngineConfig,

    /// Physical index resolution
    storage: Arc<dyn IndexStorage>,

    /// Strategy chain ending with the local compiler
    compiler: CompilationService,
}

impl Engine {
    /// Create an engine with the local compiler as its only strategy
    pub fn new(storage: Arc<dyn IndexStorage>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let local = LocalCompiler::new(storage.clone(), config.clone());
        let compiler =
            CompilationService::new(config.compilation.clone()).with_strategy(Box::new(local));
        Ok(Self {
            config,
            storage,
            compiler,
        })
    }

    /// Create an engine configured from a JSON file
    pub fn from_config_file(storage: Arc<dyn IndexStorage>, path: impl AsRef<Path>) -> Result<Self> {
        let config = EngineConfig::from_file(path)?;
        Self::new(storage, config)
    }

    /// Registers a strategy tried before the existing ones
    pub fn with_strategy(mut self, strategy: Box<dyn ProviderCompiler>) -> Self {
        self.compiler.prepend_strategy(strategy);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn IndexStorage> {
        &self.storage
    }

    pub fn compiler(&self) -> &CompilationService {
        &self.compiler
    }

    pub fn compile(&self, plan: &Arc<CompilableProvider>) -> Result<Arc<dyn ExecutableProvider>> {
        Ok(self.compiler.compile(plan)?)
    }

    /// Compiles `plan` and opens a cursor over its rows
    pub fn execute(&self, plan: &Arc<CompilableProvider>) -> Result<RecordSet> {
        let root = self.compile(plan)?;
        debug!(plan = %plan.id(), executable = root.name(), "executing plan");
        Ok(RecordSet::new(root, self.config.execution.max_apply_depth))
    }

    /// Runs `plan` to completion
    pub fn query(&self, plan: &Arc<CompilableProvider>) -> Result<Vec<Tuple>> {
        Ok(self.execute(plan)?.to_vec()?)
    }

    /// Explains the logical plan
    pub fn explain(&self, plan: &Arc<CompilableProvider>) -> ExplainPlan {
        ExplainPlan::from_plan(plan)
    }

    /// Explains the executable tree `plan` compiles to
    pub fn explain_compiled(&self, plan: &Arc<CompilableProvider>) -> Result<ExplainPlan> {
        let root = self.compile(plan)?;
        Ok(ExplainPlan::from_node(&root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::error::Error;
    use crate::index::{Direction, MemoryIndex, MemoryStorage};
    use crate::plan::{RecordHeader, SortOrder};
    use crate::tuple::{FieldType, TupleDescriptor, Value};
    use crate::virtual_index::IndexInfo;

    fn engine() -> Engine {
        let desc = TupleDescriptor::create(vec![FieldType::Int]);
        let rows = [3, 1, 2].map(|v| Tuple::from_values([Value::Int(v)]));
        let index = MemoryIndex::from_rows("n", desc, &[(0, Direction::Positive)], rows).unwrap();
        let storage = Arc::new(MemoryStorage::new().with_index(index));
        Engine::new(storage, EngineConfig::default()).unwrap()
    }

    fn numbers() -> Arc<CompilableProvider> {
        let header = RecordHeader::new([("n", FieldType::Int)])
            .with_order(SortOrder::ascending(&[0]))
            .unwrap();
        CompilableProvider::index(IndexInfo::physical("n"), header)
    }

    #[test]
    fn test_query_reads_index_in_order() {
        let rows = engine().query(&numbers()).unwrap();
        let values: Vec<_> = rows.iter().map(|r| r.value(0).cloned()).collect();
        assert_eq!(
            values,
            vec![Some(Value::Int(1)), Some(Value::Int(2)), Some(Value::Int(3))]
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.execution.max_apply_depth = 0;
        let result = Engine::new(Arc::new(MemoryStorage::new()), config);
        assert!(matches!(result, Err(Error::Config(ConfigError::Invalid(_)))));
    }

    #[test]
    fn test_explain_compiled_shows_transfer() {
        let explain = engine().explain_compiled(&numbers().distinct()).unwrap();
        assert!(explain.lines[0].1.starts_with("Transfer"));
        assert_eq!(explain.lines[1].0, 1);
        assert!(explain.lines[1].1.starts_with("Distinct"));
        assert!(explain.lines[2].1.starts_with("Index"));
    }
}
