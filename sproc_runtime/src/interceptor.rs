use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use thiserror::Error;

/// Hook pair wrapped around every generated DAO call when an interceptor is
/// configured. `before` runs ahead of the procedure call and its token is
/// handed back to `after` once the call has returned.
pub trait Interceptor {
    type Token;

    fn before(procedure: &str, args: &[&dyn fmt::Debug]) -> Self::Token;

    fn after(token: Self::Token, procedure: &str, args: &[&dyn fmt::Debug]);
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InterceptorError {
    #[error("no pending call for token #{0}")]
    UnknownToken(u64),
}

/// Environment variable overriding the slow-call threshold, in milliseconds.
pub const SLOW_CALL_ENV: &str = "SPROC_SLOW_CALL_MS";

pub const DEFAULT_SLOW_CALL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallToken(u64);

impl CallToken {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Start times of calls in flight, keyed by a process-unique id.
///
/// An entry lives from `begin` until `finish` or `discard`. Generated DAO
/// methods hand the token back even when the call fails; code that drives
/// the registry by hand must do the same or the entry stays pending.
#[derive(Debug)]
pub struct CallRegistry {
    next_id: AtomicU64,
    pending: DashMap<u64, Instant>,
    slow_threshold: Duration,
}

impl CallRegistry {
    pub fn new(slow_threshold: Duration) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: DashMap::new(),
            slow_threshold,
        }
    }

    pub fn slow_threshold(&self) -> Duration {
        self.slow_threshold
    }

    pub fn begin(&self) -> CallToken {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.pending.insert(id, Instant::now());
        CallToken(id)
    }

    /// Ends the call and returns how long it ran. Each token finishes once.
    pub fn finish(&self, token: CallToken) -> Result<Duration, InterceptorError> {
        self.pending
            .remove(&token.0)
            .map(|(_, started)| started.elapsed())
            .ok_or(InterceptorError::UnknownToken(token.0))
    }

    /// Drops a pending call without timing it. Returns whether it was pending.
    pub fn discard(&self, token: CallToken) -> bool {
        self.pending.remove(&token.0).is_some()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_slow(&self, elapsed: Duration) -> bool {
        elapsed > self.slow_threshold
    }
}

/// Parses a threshold in milliseconds, falling back to the default when the
/// value is absent or malformed.
pub fn parse_slow_threshold(raw: Option<&str>) -> Duration {
    match raw.map(str::trim) {
        Some(value) => match value.parse::<u64>() {
            Ok(millis) => Duration::from_millis(millis),
            Err(_) => {
                tracing::error!(
                    value,
                    "{SLOW_CALL_ENV} is not a number of milliseconds, using {}ms",
                    DEFAULT_SLOW_CALL.as_millis()
                );
                DEFAULT_SLOW_CALL
            }
        },
        None => DEFAULT_SLOW_CALL,
    }
}

static CALLS: LazyLock<CallRegistry> = LazyLock::new(|| {
    let raw = std::env::var(SLOW_CALL_ENV).ok();
    CallRegistry::new(parse_slow_threshold(raw.as_deref()))
});

fn describe_call(procedure: &str, args: &[&dyn fmt::Debug], token: CallToken) -> String {
    format!("{procedure}{args:?}{token}")
}

/// Interceptor that times every call. Each completed call is logged at trace
/// level as `<ms> ms <procedure>[<args>]#<id>`; calls over the slow threshold
/// are repeated at warn level.
pub struct CallTimer;

impl CallTimer {
    pub fn registry() -> &'static CallRegistry {
        &CALLS
    }
}

impl Interceptor for CallTimer {
    type Token = CallToken;

    fn before(procedure: &str, args: &[&dyn fmt::Debug]) -> CallToken {
        let token = CALLS.begin();
        tracing::trace!(target: "sproc::calls", "start {}", describe_call(procedure, args, token));
        token
    }

    fn after(token: CallToken, procedure: &str, args: &[&dyn fmt::Debug]) {
        match CALLS.finish(token) {
            Ok(elapsed) => {
                let line = format!("{} ms {}", elapsed.as_millis(), describe_call(procedure, args, token));
                tracing::trace!(target: "sproc::calls", "{line}");
                if CALLS.is_slow(elapsed) {
                    tracing::warn!(target: "sproc::calls", "slow call: {line}");
                }
            }
            Err(err) => {
                tracing::error!(target: "sproc::calls", procedure, "{err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_finish_once() {
        let registry = CallRegistry::new(DEFAULT_SLOW_CALL);
        let first = registry.begin();
        let second = registry.begin();
        assert_ne!(first, second);
        assert_eq!(registry.pending(), 2);

        assert!(registry.finish(first).is_ok());
        assert_eq!(registry.finish(first), Err(InterceptorError::UnknownToken(first.id())));
        assert_eq!(registry.pending(), 1);
    }

    #[test]
    fn discarded_calls_leave_the_registry() {
        let registry = CallRegistry::new(DEFAULT_SLOW_CALL);
        let token = registry.begin();
        assert!(registry.discard(token));
        assert!(!registry.discard(token));
        assert_eq!(registry.pending(), 0);
        assert_eq!(registry.finish(token), Err(InterceptorError::UnknownToken(token.id())));
    }

    #[test]
    fn threshold_parsing_falls_back() {
        assert_eq!(parse_slow_threshold(None), DEFAULT_SLOW_CALL);
        assert_eq!(parse_slow_threshold(Some("50")), Duration::from_millis(50));
        assert_eq!(parse_slow_threshold(Some(" 75 ")), Duration::from_millis(75));
        assert_eq!(parse_slow_threshold(Some("fast")), DEFAULT_SLOW_CALL);
    }

    #[test]
    fn call_description_lists_arguments() {
        let id = 7i64;
        let name = "bob";
        let line = describe_call("sp_get_user", &[&id, &name], CallToken(3));
        assert_eq!(line, "sp_get_user[7, \"bob\"]#3");
    }

    #[test]
    fn timer_balances_pairs() {
        let before = CallTimer::registry().pending();
        let token = CallTimer::before("sp_ping", &[]);
        CallTimer::after(token, "sp_ping", &[]);
        assert!(CallTimer::registry().pending() <= before);
    }
}
