//! Active context selection.
//!
//! The arbiter never receives a context id with each request. It asks a
//! [`ContextSelector`] which context is active for the calling thread.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use thread_local::ThreadLocal;

/// Static thread-local storage for the active context id
static CURRENT_CONTEXT_ID: Lazy<ThreadLocal<RwLock<Option<String>>>> = Lazy::new(ThreadLocal::new);

/// Supplies the id of the policy context active for the caller.
pub trait ContextSelector: Send + Sync {
    /// The active context id, if any
    fn current_context_id(&self) -> Option<String>;
}

/// Selects the context bound to the calling thread.
///
/// # Examples
///
/// ```
/// use warden_policy::{ContextSelector, ThreadContextSelector};
///
/// let selector = ThreadContextSelector;
/// assert_eq!(selector.current_context_id(), None);
///
/// ThreadContextSelector::with_context("app", || {
///     assert_eq!(selector.current_context_id().as_deref(), Some("app"));
/// });
/// assert_eq!(selector.current_context_id(), None);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadContextSelector;

impl ThreadContextSelector {
    /// Get the context id bound to the current thread
    pub fn current() -> Option<String> {
        CURRENT_CONTEXT_ID.get_or(|| RwLock::new(None)).read().clone()
    }

    // Slots outlive their thread and are handed to later threads, so every
    // binding must be undone before the scope that made it returns.
    fn set_current(id: Option<String>) {
        *CURRENT_CONTEXT_ID.get_or(|| RwLock::new(None)).write() = id;
    }

    /// Execute a function with `id` bound to the current thread
    ///
    /// The previous binding is restored afterwards, including when `f` panics.
    pub fn with_context<F, R>(id: impl Into<String>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _restore = Restore(Self::current());
        Self::set_current(Some(id.into()));
        f()
    }
}

impl ContextSelector for ThreadContextSelector {
    fn current_context_id(&self) -> Option<String> {
        Self::current()
    }
}

/// Puts back the previous thread binding on drop.
struct Restore(Option<String>);

impl Drop for Restore {
    fn drop(&mut self) {
        ThreadContextSelector::set_current(self.0.take());
    }
}

/// Always selects the same context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedContextSelector(Option<String>);

impl FixedContextSelector {
    /// Select `id` for every caller
    pub fn new(id: impl Into<String>) -> Self {
        Self(Some(id.into()))
    }

    /// Select no context
    pub fn none() -> Self {
        Self(None)
    }
}

impl ContextSelector for FixedContextSelector {
    fn current_context_id(&self) -> Option<String> {
        self.0.clone()
    }
}
