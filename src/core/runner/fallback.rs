use crate::core::entities::OperationContext;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

/// Degraded-mode replacement for a failing operation.
///
/// Strategies are looked up by operation name when the recovery policy asks
/// for a fallback. A strategy that itself fails ends the operation.
#[async_trait]
pub trait FallbackStrategy: Send + Sync + 'static {
    async fn recover(&self, context: &OperationContext) -> crate::Result<Value>;
}

/// Fallback that returns a canned value, typically a reduced or cached
/// version of the real operation's output.
pub struct StaticFallback {
    value: Value,
}

impl StaticFallback {
    pub fn new(value: Value) -> Self {
        StaticFallback { value }
    }
}

#[async_trait]
impl FallbackStrategy for StaticFallback {
    async fn recover(&self, _context: &OperationContext) -> crate::Result<Value> {
        Ok(self.value.clone())
    }
}

/// Name-keyed registry of fallback strategies shared across the runner.
#[derive(Default)]
pub struct FallbackRegistry {
    strategies: DashMap<String, Arc<dyn FallbackStrategy>>,
}

impl FallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, operation: impl Into<String>, strategy: Arc<dyn FallbackStrategy>) {
        let operation = operation.into();
        tracing::debug!(operation = %operation, "registered fallback strategy");
        self.strategies.insert(operation, strategy);
    }

    pub fn get(&self, operation: &str) -> Option<Arc<dyn FallbackStrategy>> {
        self.strategies
            .get(operation)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}
