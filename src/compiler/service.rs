//! Strategy chain and compiled plan cache

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::config::CompilationConfig;
use crate::executor::ExecutableProvider;
use crate::plan::{CompilableProvider, ProviderId};

use super::compiler::{Compiler, ProviderCompiler};
use super::errors::{CompileError, CompileResult};

/// Bounded FIFO cache of compiled roots
#[derive(Default)]
struct PlanCache {
    plans: HashMap<ProviderId, Arc<dyn ExecutableProvider>>,
    order: VecDeque<ProviderId>,
}

impl PlanCache {
    fn get(&self, id: ProviderId) -> Option<Arc<dyn ExecutableProvider>> {
        self.plans.get(&id).cloned()
    }

    fn insert(&mut self, id: ProviderId, plan: Arc<dyn ExecutableProvider>, capacity: usize) {
        if self.plans.insert(id, plan).is_some() {
            return;
        }
        self.order.push_back(id);
        while self.order.len() > capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.plans.remove(&evicted);
                trace!(plan = %evicted, "evicted compiled plan");
            }
        }
    }

    fn clear(&mut self) {
        self.plans.clear();
        self.order.clear();
    }
}

/// Compiles plans with an ordered chain of strategies.
///
/// Strategies are tried most specific first; the first one that compiles
/// the whole tree wins.
pub struct CompilationService {
    strategies: Vec<Box<dyn ProviderCompiler>>,
    config: CompilationConfig,
    cache: RefCell<PlanCache>,
}

impl CompilationService {
    pub fn new(config: CompilationConfig) -> Self {
        Self {
            strategies: Vec::new(),
            config,
            cache: RefCell::new(PlanCache::default()),
        }
    }

    /// Appends a strategy, tried after the ones already registered
    pub fn with_strategy(mut self, strategy: Box<dyn ProviderCompiler>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Inserts a strategy ahead of the ones already registered
    pub fn prepend_strategy(&mut self, strategy: Box<dyn ProviderCompiler>) {
        self.strategies.insert(0, strategy);
        self.cache.borrow_mut().clear();
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn cached_plans(&self) -> usize {
        self.cache.borrow().plans.len()
    }

    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    /// Compiles `root` with the first strategy that handles every node
    pub fn compile(&self, root: &Arc<CompilableProvider>) -> CompileResult<Arc<dyn ExecutableProvider>> {
        if self.config.cache_plans {
            if let Some(plan) = self.cache.borrow().get(root.id()) {
                trace!(plan = %root.id(), "compiled plan cache hit");
                return Ok(plan);
            }
        }

        for strategy in &self.strategies {
            match Compiler::new(strategy.as_ref()).compile(root)? {
                Some(plan) => {
                    debug!(
                        plan = %root.id(),
                        strategy = strategy.name(),
                        executable = plan.name(),
                        "compiled plan"
                    );
                    if self.config.cache_plans {
                        self.cache.borrow_mut().insert(
                            root.id(),
                            plan.clone(),
                            self.config.max_cached_plans,
                        );
                    }
                    return Ok(plan);
                }
                None => debug!(
                    plan = %root.id(),
                    strategy = strategy.name(),
                    "strategy did not compile plan, falling back"
                ),
            }
        }

        Err(CompileError::not_compiled(root.id(), &self.strategy_names()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{CompileErrorCode, Compiled, LocalCompiler};
    use crate::config::EngineConfig;
    use crate::executor::NodeInfo;
    use crate::index::{Direction, IndexStorage, MemoryIndex, MemoryStorage};
    use crate::plan::{Expr, JoinAlgorithm, JoinType, RecordHeader, SortOrder};
    use crate::tuple::{FieldType, Tuple, TupleDescriptor, Value};
    use crate::virtual_index::IndexInfo;

    fn storage() -> Arc<dyn IndexStorage> {
        let desc = TupleDescriptor::create(vec![FieldType::Int, FieldType::Text]);
        let rows = [(1, "ann"), (2, "bob")]
            .iter()
            .map(|&(id, name)| Tuple::from_values([Value::Int(id), Value::Text(name.into())]));
        let people =
            MemoryIndex::from_rows("people", desc, &[(0, Direction::Positive)], rows).unwrap();
        Arc::new(MemoryStorage::new().with_index(people))
    }

    fn people() -> Arc<CompilableProvider> {
        let header = RecordHeader::new([("id", FieldType::Int), ("name", FieldType::Text)])
            .with_order(SortOrder::ascending(&[0]))
            .unwrap();
        CompilableProvider::index(IndexInfo::physical("people"), header)
    }

    fn ids(values: &[i64]) -> Arc<CompilableProvider> {
        let header = RecordHeader::new([("id", FieldType::Int)]);
        let rows = values
            .iter()
            .map(|&v| Tuple::from_values([Value::Int(v)]))
            .collect();
        CompilableProvider::raw(header, rows).unwrap()
    }

    fn local() -> Box<dyn ProviderCompiler> {
        Box::new(LocalCompiler::new(storage(), EngineConfig::default()))
    }

    fn service(config: CompilationConfig) -> CompilationService {
        CompilationService::new(config).with_strategy(local())
    }

    /// Handles index leaves and filters only
    struct IndexFilterOnly(LocalCompiler);

    impl ProviderCompiler for IndexFilterOnly {
        fn name(&self) -> &'static str {
            "index-filter"
        }

        fn compile_index(&self, node: NodeInfo, info: &IndexInfo) -> CompileResult<Compiled> {
            self.0.compile_index(node, info)
        }

        fn compile_filter(&self, node: NodeInfo, predicate: &Expr) -> CompileResult<Compiled> {
            self.0.compile_filter(node, predicate)
        }
    }

    fn index_filter_only() -> Box<dyn ProviderCompiler> {
        Box::new(IndexFilterOnly(LocalCompiler::new(
            storage(),
            EngineConfig::default(),
        )))
    }

    #[test]
    fn test_first_complete_strategy_wins() {
        let plan = people()
            .filter(Expr::column(0).equal(Expr::literal(Value::Int(2))))
            .unwrap();
        let service = CompilationService::new(CompilationConfig::default())
            .with_strategy(index_filter_only())
            .with_strategy(local());

        let compiled = service.compile(&plan).unwrap();
        // Filter runs at storage, so the root is moved to the local site
        assert_eq!(compiled.name(), "Transfer");
        assert_eq!(compiled.sources()[0].name(), "Filter");
    }

    #[test]
    fn test_falls_back_on_partial_strategy() {
        let plan = people().distinct();
        let service = CompilationService::new(CompilationConfig::default())
            .with_strategy(index_filter_only())
            .with_strategy(local());

        let compiled = service.compile(&plan).unwrap();
        assert_eq!(compiled.sources()[0].name(), "Distinct");
    }

    #[test]
    fn test_not_compiled_names_strategies() {
        let plan = people().distinct();
        let service =
            CompilationService::new(CompilationConfig::default()).with_strategy(index_filter_only());

        let err = service.compile(&plan).unwrap_err();
        assert_eq!(err.code(), CompileErrorCode::NotCompiled);
        assert_eq!(err.provider(), Some(plan.id()));
        assert!(err.message().contains("index-filter"));
    }

    #[test]
    fn test_cache_returns_same_executable() {
        let plan = ids(&[1, 2]).distinct();
        let service = service(CompilationConfig::default());

        let first = service.compile(&plan).unwrap();
        let second = service.compile(&plan).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(service.cached_plans(), 1);
    }

    #[test]
    fn test_cache_disabled() {
        let config = CompilationConfig {
            cache_plans: false,
            ..CompilationConfig::default()
        };
        let plan = ids(&[1]).distinct();
        let service = service(config);

        let first = service.compile(&plan).unwrap();
        let second = service.compile(&plan).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(service.cached_plans(), 0);
    }

    #[test]
    fn test_cache_evicts_oldest() {
        let config = CompilationConfig {
            cache_plans: true,
            max_cached_plans: 2,
        };
        let service = service(config);
        let plans: Vec<_> = (0..3).map(|i| ids(&[i])).collect();
        for plan in &plans {
            service.compile(plan).unwrap();
        }
        assert_eq!(service.cached_plans(), 2);
        assert!(service.cache.borrow().get(plans[0].id()).is_none());
        assert!(service.cache.borrow().get(plans[2].id()).is_some());
    }

    #[test]
    fn test_mixed_sites_are_transferred() {
        let plan = ids(&[2, 3])
            .join(&people(), JoinAlgorithm::Hash, JoinType::Inner, vec![(0, 0)])
            .unwrap();
        let compiled = service(CompilationConfig::default()).compile(&plan).unwrap();

        assert_eq!(compiled.name(), "Join");
        assert_eq!(compiled.sources()[0].name(), "Raw");
        let right = &compiled.sources()[1];
        assert_eq!(right.name(), "Transfer");
        assert_eq!(right.sources()[0].name(), "Index");
    }

    #[test]
    fn test_header_mismatch_rejected() {
        let header = RecordHeader::new([("id", FieldType::Int)]);
        let plan = CompilableProvider::index(IndexInfo::physical("people"), header);
        let err = service(CompilationConfig::default())
            .compile(&plan)
            .unwrap_err();
        assert_eq!(err.code(), CompileErrorCode::Incompatible);
    }

    #[test]
    fn test_shared_node_compiled_once() {
        let shared = ids(&[1, 2]);
        let plan = shared
            .join(&shared, JoinAlgorithm::Hash, JoinType::Inner, vec![(0, 0)])
            .unwrap();
        let compiled = service(CompilationConfig::default()).compile(&plan).unwrap();
        assert!(Arc::ptr_eq(&compiled.sources()[0], &compiled.sources()[1]));
    }
}
