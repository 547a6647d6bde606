//! Trace and span correlation per execution context.
//!
//! Contexts are keyed by an [`ExecutionKey`]. Code running inside
//! [`TraceContextManager::scope`] (or `sync_scope`) gets a task-local key of
//! its own. Code outside any scope falls back to its OS thread. Concurrent
//! requests handled in one process therefore never share a trace.
//!
//! # Example
//!
//! ```rust
//! use logshield_core::trace::TraceContextManager;
//!
//! let traces = TraceContextManager::new();
//! let root = traces.get_trace_context();
//! let span = traces.create_span();
//! assert_eq!(span.trace_id, root.trace_id);
//! assert_eq!(span.parent_span_id.as_deref(), Some(root.span_id.as_str()));
//! ```

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::thread::{self, ThreadId};
use tokio::task_local;
use uuid::Uuid;

task_local! {
    static EXECUTION_KEY: Uuid;
}

/// Identifies the execution context a trace belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionKey {
    /// Inside a trace scope
    Scoped(Uuid),
    /// Outside any scope. The entry outlives the thread unless the thread
    /// calls [`TraceContextManager::clear_current`] before it exits.
    Thread(ThreadId),
}

impl ExecutionKey {
    pub fn current() -> Self {
        EXECUTION_KEY
            .try_with(|id| Self::Scoped(*id))
            .unwrap_or_else(|_| Self::Thread(thread::current().id()))
    }

    pub fn is_scoped(&self) -> bool {
        matches!(self, Self::Scoped(_))
    }
}

/// Active trace/span pair of one execution context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceContext {
    pub trace_id: String,
    pub span_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
}

impl TraceContext {
    pub fn new(
        trace_id: impl Into<String>,
        span_id: impl Into<String>,
        parent_span_id: Option<String>,
    ) -> Self {
        Self {
            trace_id: trace_id.into(),
            span_id: span_id.into(),
            parent_span_id,
        }
    }

    /// Fresh root context with random ids
    pub fn new_root() -> Self {
        Self::new(Uuid::new_v4().to_string(), Uuid::new_v4().to_string(), None)
    }

    /// Child span in the same trace
    pub fn child(&self) -> Self {
        Self::new(
            self.trace_id.clone(),
            Uuid::new_v4().to_string(),
            Some(self.span_id.clone()),
        )
    }
}

/// Keyed store of active trace contexts
#[derive(Debug, Default)]
pub struct TraceContextManager {
    contexts: DashMap<ExecutionKey, TraceContext>,
}

impl TraceContextManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_key(&self) -> ExecutionKey {
        ExecutionKey::current()
    }

    /// Context for the current key, created on first read.
    pub fn get_trace_context(&self) -> TraceContext {
        self.contexts
            .entry(ExecutionKey::current())
            .or_insert_with(TraceContext::new_root)
            .clone()
    }

    /// Overwrite the current context. Ids are not validated.
    pub fn set_trace_context(
        &self,
        trace_id: impl Into<String>,
        span_id: impl Into<String>,
        parent_span_id: Option<String>,
    ) {
        self.install(TraceContext::new(trace_id, span_id, parent_span_id));
    }

    pub fn install(&self, context: TraceContext) {
        self.contexts.insert(ExecutionKey::current(), context);
    }

    /// Derive a child span from the current context and make it current.
    pub fn create_span(&self) -> TraceContext {
        let mut entry = self
            .contexts
            .entry(ExecutionKey::current())
            .or_insert_with(TraceContext::new_root);
        let span = entry.child();
        *entry = span.clone();
        span
    }

    /// Drop the current key's context. The next read creates a new root.
    ///
    /// Scoped keys are removed when their scope ends. Thread keys are not, so
    /// a short-lived thread that reads or writes a context outside a scope
    /// should call this before it exits.
    pub fn clear_current(&self) -> Option<TraceContext> {
        self.contexts
            .remove(&ExecutionKey::current())
            .map(|(_, context)| context)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Run `fut` under a fresh execution key with a lazily created root.
    pub async fn scope<F: Future>(&self, fut: F) -> F::Output {
        self.run_scoped(None, fut).await
    }

    /// Run `fut` under a fresh execution key seeded with `context`.
    pub async fn scope_with<F: Future>(&self, context: TraceContext, fut: F) -> F::Output {
        self.run_scoped(Some(context), fut).await
    }

    pub fn sync_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        self.run_sync_scoped(None, f)
    }

    pub fn sync_scope_with<R>(&self, context: TraceContext, f: impl FnOnce() -> R) -> R {
        self.run_sync_scoped(Some(context), f)
    }

    async fn run_scoped<F: Future>(&self, seed: Option<TraceContext>, fut: F) -> F::Output {
        let id = Uuid::new_v4();
        let _guard = self.enter(id, seed);
        EXECUTION_KEY.scope(id, fut).await
    }

    fn run_sync_scoped<R>(&self, seed: Option<TraceContext>, f: impl FnOnce() -> R) -> R {
        let id = Uuid::new_v4();
        let _guard = self.enter(id, seed);
        EXECUTION_KEY.sync_scope(id, f)
    }

    fn enter(&self, id: Uuid, seed: Option<TraceContext>) -> ScopeGuard<'_> {
        let key = ExecutionKey::Scoped(id);
        if let Some(context) = seed {
            self.contexts.insert(key, context);
        }
        ScopeGuard {
            contexts: &self.contexts,
            key,
        }
    }
}

/// Removes a scope's entry when the scope ends, including on cancellation.
struct ScopeGuard<'a> {
    contexts: &'a DashMap<ExecutionKey, TraceContext>,
    key: ExecutionKey,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.contexts.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_uuid(value: &str) -> bool {
        Uuid::parse_str(value).is_ok()
    }

    #[test]
    fn test_lazy_creation() {
        let traces = TraceContextManager::new();
        assert!(traces.is_empty());

        let context = traces.get_trace_context();
        assert!(is_uuid(&context.trace_id));
        assert!(is_uuid(&context.span_id));
        assert!(context.parent_span_id.is_none());
        assert_eq!(traces.len(), 1);

        // Second read returns the stored context
        assert_eq!(traces.get_trace_context(), context);
    }

    #[test]
    fn test_set_trace_context_skips_validation() {
        let traces = TraceContextManager::new();
        traces.set_trace_context("trace-abc", "span-1", Some("span-0".to_string()));

        let context = traces.get_trace_context();
        assert_eq!(context.trace_id, "trace-abc");
        assert_eq!(context.span_id, "span-1");
        assert_eq!(context.parent_span_id.as_deref(), Some("span-0"));
    }

    #[test]
    fn test_create_span_derivation() {
        let traces = TraceContextManager::new();
        let before = traces.get_trace_context();

        let span = traces.create_span();

        assert_eq!(span.trace_id, before.trace_id);
        assert_ne!(span.span_id, before.span_id);
        assert_eq!(span.parent_span_id, Some(before.span_id.clone()));
        assert_eq!(traces.get_trace_context(), span);
    }

    #[test]
    fn test_spans_form_a_chain() {
        let traces = TraceContextManager::new();
        let root = traces.get_trace_context();
        let a = traces.create_span();
        let b = traces.create_span();

        assert_eq!(a.parent_span_id.as_deref(), Some(root.span_id.as_str()));
        assert_eq!(b.parent_span_id.as_deref(), Some(a.span_id.as_str()));
        assert_eq!(b.trace_id, root.trace_id);
    }

    #[test]
    fn test_threads_get_distinct_contexts() {
        let traces = std::sync::Arc::new(TraceContextManager::new());
        let main = traces.get_trace_context();

        let other = {
            let traces = traces.clone();
            std::thread::spawn(move || traces.get_trace_context())
                .join()
                .unwrap()
        };

        assert_ne!(main.trace_id, other.trace_id);
        assert_eq!(traces.len(), 2);
    }

    #[test]
    fn test_sync_scope_isolated_and_cleaned_up() {
        let traces = TraceContextManager::new();
        let outer = traces.get_trace_context();

        let inner = traces.sync_scope(|| {
            assert!(traces.current_key().is_scoped());
            traces.get_trace_context()
        });

        assert_ne!(inner.trace_id, outer.trace_id);
        assert_eq!(traces.len(), 1);
        assert_eq!(traces.get_trace_context(), outer);
    }

    #[test]
    fn test_sync_scope_with_seed() {
        let traces = TraceContextManager::new();
        let seed = TraceContext::new("t", "s", None);

        let seen = traces.sync_scope_with(seed.clone(), || traces.get_trace_context());

        assert_eq!(seen, seed);
        assert!(traces.is_empty());
    }

    #[test]
    fn test_clear_current() {
        let traces = TraceContextManager::new();
        let first = traces.get_trace_context();
        assert_eq!(traces.clear_current(), Some(first.clone()));
        assert_ne!(traces.get_trace_context().trace_id, first.trace_id);
    }

    #[test]
    fn test_thread_entry_remains_until_cleared() {
        let traces = std::sync::Arc::new(TraceContextManager::new());

        let worker = traces.clone();
        std::thread::spawn(move || {
            worker.get_trace_context();
        })
        .join()
        .unwrap();
        assert_eq!(traces.len(), 1);

        let worker = traces.clone();
        std::thread::spawn(move || {
            worker.get_trace_context();
            assert!(worker.clear_current().is_some());
        })
        .join()
        .unwrap();
        assert_eq!(traces.len(), 1);
    }

    #[tokio::test]
    async fn test_async_scope_keeps_context_across_await() {
        let traces = TraceContextManager::new();

        traces
            .scope(async {
                let before = traces.get_trace_context();
                tokio::task::yield_now().await;
                assert_eq!(traces.get_trace_context(), before);
            })
            .await;

        assert!(traces.is_empty());
    }

    #[test]
    fn test_trace_context_serialization() {
        let context = TraceContext::new("t", "s", Some("p".to_string()));
        let json = serde_json::to_value(&context).unwrap();
        assert_eq!(json, serde_json::json!({"traceId": "t", "spanId": "s", "parentSpanId": "p"}));

        let root = TraceContext::new("t", "s", None);
        let json = serde_json::to_value(&root).unwrap();
        assert!(json.get("parentSpanId").is_none());
    }
}
