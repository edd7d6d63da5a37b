//! Per-session submission throttle.
//!
//! The counter lives in an explicit [`SessionState`] owned by the hosting
//! layer. [`SessionStore`] is an in-memory store for hosts without one;
//! it locks per entry, so calls on the same session are serialized.

use dashmap::DashMap;

/// Submissions allowed per session.
pub const DEFAULT_SUBMISSION_LIMIT: u32 = 3;

/// Opaque session identifier issued by the hosting layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Mutable per-session data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    usage_count: u32,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn usage_count(&self) -> u32 {
        self.usage_count
    }
}

/// Outcome of a throttle check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Denied,
}

impl Admission {
    pub fn is_allowed(self) -> bool {
        self == Admission::Allowed
    }
}

/// Caps the number of submissions per session.
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    limit: u32,
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(DEFAULT_SUBMISSION_LIMIT)
    }
}

impl Throttle {
    pub fn new(limit: u32) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Count one submission, or deny without touching the counter.
    pub fn check_and_increment(&self, state: &mut SessionState) -> Admission {
        if state.usage_count >= self.limit {
            log::info!(
                "submission denied: session used {}/{}",
                state.usage_count,
                self.limit
            );
            return Admission::Denied;
        }
        state.usage_count += 1;
        log::debug!("submission {}/{} accepted", state.usage_count, self.limit);
        Admission::Allowed
    }

    /// Submissions left before denial.
    pub fn remaining(&self, state: &SessionState) -> u32 {
        self.limit.saturating_sub(state.usage_count)
    }
}

/// In-memory session store.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<SessionId, SessionState>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with exclusive access to the session, creating it on first
    /// touch.
    pub fn with_session<R>(&self, id: &SessionId, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut entry = self.sessions.entry(id.clone()).or_default();
        f(entry.value_mut())
    }

    /// Snapshot of a session, if it was ever touched.
    pub fn get(&self, id: &SessionId) -> Option<SessionState> {
        self.sessions.get(id).map(|s| s.value().clone())
    }

    /// Drop a session's state.
    pub fn remove(&self, id: &SessionId) -> Option<SessionState> {
        self.sessions.remove(id).map(|(_, state)| state)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
