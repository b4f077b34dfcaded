use serde_json::Value;
use std::sync::Arc;

/// A derived, read-only cell.
///
/// The computation runs on every read. Caching a computed value requires
/// dependency tracking, which lives in the host reactive engine; recomputing
/// keeps this layer deterministic.
#[derive(Clone)]
pub struct Computed {
    compute: Arc<dyn Fn() -> Value + Send + Sync>,
}

impl Computed {
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self {
            compute: Arc::new(compute),
        }
    }

    /// Evaluate the computation.
    pub fn get(&self) -> Value {
        (self.compute)()
    }
}

/// Create a derived cell, typically from inside a setup function.
pub fn computed<F>(compute: F) -> Computed
where
    F: Fn() -> Value + Send + Sync + 'static,
{
    Computed::new(compute)
}
