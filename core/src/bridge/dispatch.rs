//! Delayed, fire-and-forget hotkey dispatch
//!
//! Each transition event schedules one independent task. Later events
//! never cancel earlier ones, so rapid scene flips replay the
//! animation instead of dropping it; with differing delays, dispatches
//! can complete out of arrival order.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// How the pre-fire delay is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayPolicy {
    /// The configured `transition_delay_ms`, regardless of the event
    Fixed(u64),
    /// Half of the transition's reported duration
    HalfTransition,
}

impl DelayPolicy {
    pub fn from_flags(transition_delay_half: bool, transition_delay_ms: u64) -> Self {
        if transition_delay_half {
            DelayPolicy::HalfTransition
        } else {
            DelayPolicy::Fixed(transition_delay_ms)
        }
    }

    pub fn delay(&self, transition_duration_ms: u64) -> Duration {
        let millis = match self {
            DelayPolicy::Fixed(millis) => *millis,
            DelayPolicy::HalfTransition => transition_duration_ms / 2,
        };
        Duration::from_millis(millis)
    }
}

/// What happens to an in-flight dispatch when a new event arrives.
///
/// Only `FireAndForget` exists: a cancel-on-new-event policy would
/// change observable behavior for rapid re-triggers, which today just
/// replay the animation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DispatchPolicy {
    #[default]
    FireAndForget,
}

/// Schedule `action` to run after `delay`. Zero delay runs the action
/// without suspending first. The returned handle is informational;
/// nothing awaits it and shutdown abandons pending dispatches.
pub fn schedule<F>(policy: DispatchPolicy, delay: Duration, action: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let DispatchPolicy::FireAndForget = policy;
    tokio::spawn(async move {
        if !delay.is_zero() {
            log::info!("Waiting {}ms before firing hotkey...", delay.as_millis());
            tokio::time::sleep(delay).await;
        }
        action.await;
    })
}
