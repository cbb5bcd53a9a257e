// Package scope provides the cancellation and deadline surface of a request
// plus the timing wrapper whose elapsed time ends up in spans.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

/// Reason a scope stopped accepting work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    #[error("scope cancelled")]
    Cancelled,
    #[error("scope deadline exceeded")]
    DeadlineExceeded,
}

/// Capability surface of a request scope: deadline query, cancellation
/// signal, cancellation error and key/value lookup.
///
/// Handlers that only use these contract points cannot tell a wrapper
/// from the scope it wraps.
pub trait Scope: Send + Sync {
    /// Deadline after which work on this scope should be abandoned, if any.
    fn deadline(&self) -> Option<Instant>;

    /// Token observed by consumers interested in cancellation.
    fn cancellation(&self) -> &CancellationToken;

    /// Why the scope ended, or None while it is live.
    fn err(&self) -> Option<ScopeError>;

    /// Request-scoped value lookup.
    fn value(&self, key: &str) -> Option<String>;
}

/// Root scope of one inbound request.
#[derive(Debug, Default)]
pub struct RequestScope {
    token: CancellationToken,
    deadline: Option<Instant>,
    values: HashMap<String, String>,
}

impl RequestScope {
    /// Creates a live scope with no deadline and no values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scope driven by an externally owned cancellation token.
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            ..Self::default()
        }
    }

    /// Sets the absolute deadline of the scope.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Attaches a request-scoped value.
    pub fn with_value(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

impl Scope for RequestScope {
    fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn cancellation(&self) -> &CancellationToken {
        &self.token
    }

    fn err(&self) -> Option<ScopeError> {
        if self.token.is_cancelled() {
            return Some(ScopeError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Some(ScopeError::DeadlineExceeded);
            }
        }
        None
    }

    fn value(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Wrapper over a parent scope that captures its construction time.
///
/// Every `Scope` method forwards to the parent, so consumers unaware of
/// timing keep working unchanged. Cloning shares identity: all clones
/// refer to the same wrapped scope and report the same start time.
#[derive(Clone)]
pub struct TimingScope {
    inner: Arc<TimingInner>,
}

struct TimingInner {
    parent: Arc<dyn Scope>,
    started_at: Instant,
}

impl TimingScope {
    /// Wraps the parent scope, capturing the current instant.
    pub fn new(parent: Arc<dyn Scope>) -> Self {
        Self {
            inner: Arc::new(TimingInner {
                parent,
                started_at: Instant::now(),
            }),
        }
    }

    /// Instant at which this scope was created.
    pub fn start_time(&self) -> Instant {
        self.inner.started_at
    }

    /// Time since creation, computed at call time.
    pub fn elapsed(&self) -> Duration {
        self.inner.started_at.elapsed()
    }

    /// True when both handles wrap the same underlying scope.
    pub fn same(&self, other: &TimingScope) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Scope for TimingScope {
    fn deadline(&self) -> Option<Instant> {
        self.inner.parent.deadline()
    }

    fn cancellation(&self) -> &CancellationToken {
        self.inner.parent.cancellation()
    }

    fn err(&self) -> Option<ScopeError> {
        self.inner.parent.err()
    }

    fn value(&self, key: &str) -> Option<String> {
        self.inner.parent.value(key)
    }
}

impl std::fmt::Debug for TimingScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimingScope")
            .field("started_at", &self.inner.started_at)
            .finish()
    }
}
