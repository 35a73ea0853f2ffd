//! Compiled-expression cache.
//!
//! Compilation is pure, so compiled trees are shared across instances and
//! threads. The cache is the only shared mutable state in the engine: two
//! threads racing on the same expression text may both compile it, but the
//! trees are immutable and equivalent, so the race only costs a duplicate
//! parse.

use std::sync::Arc;

use fhirbind_fhirpath::{parse, Expression, FhirPathError};

/// Concurrent cache of compiled expressions keyed by expression text.
#[derive(Default)]
pub struct ExpressionCache {
    compiled: papaya::HashMap<String, Arc<Expression>>,
}

impl ExpressionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the compiled form of `text`, compiling and caching it on first
    /// use. Compilation failures are not cached; a broken expression fails
    /// each time it is offered.
    pub fn get_or_compile(&self, text: &str) -> Result<Arc<Expression>, FhirPathError> {
        let compiled = self.compiled.pin();
        if let Some(found) = compiled.get(text) {
            return Ok(found.clone());
        }
        let expression = Arc::new(parse(text)?);
        compiled.insert(text.to_string(), expression.clone());
        Ok(expression)
    }

    /// Number of cached expressions.
    pub fn len(&self) -> usize {
        self.compiled.pin().len()
    }

    /// True when nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_by_expression_text() {
        let cache = ExpressionCache::new();
        let first = cache.get_or_compile("code.exists()").unwrap();
        let second = cache.get_or_compile("code.exists()").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        cache.get_or_compile("status.exists()").unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn failures_are_not_cached() {
        let cache = ExpressionCache::new();
        assert!(cache.get_or_compile("code.exists(").is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_population_converges() {
        let cache = Arc::new(ExpressionCache::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                std::thread::spawn(move || cache.get_or_compile("code.exists()").unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 1);
    }
}
