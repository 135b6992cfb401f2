//! Purpose: Debounce session-expiry notifications raised by authorization failures.
//! Exports: `SessionMonitor`, `SessionState`, `Timer`, `ThreadTimer`, `Notifier`,
//! `TracingNotifier`, `StderrNotifier`.
//! Role: One instance per application session, shared by every dispatcher clone.
//! Invariants: At most one pending notification timer exists at any time.
//! Invariants: Check-then-arm is a single compare-and-swap; concurrent 401/403s never stack.
//! Invariants: Only the timer firing (or failing to schedule) returns to `Idle`; there is no cancel.

use super::config::ClientConfig;
use crate::core::error::{ApiResult, Error, ErrorKind};
use crate::notice::{Notice, notice_json};
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionState {
    Idle,
    NotificationArmed,
}

pub type TimerTask = Box<dyn FnOnce() + Send + 'static>;

/// One-shot delayed execution. An error means the task will never run.
pub trait Timer: Send + Sync {
    fn schedule(&self, delay: Duration, task: TimerTask) -> ApiResult<()>;
}

/// Runs each task on a detached thread after sleeping for the delay.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadTimer;

impl Timer for ThreadTimer {
    fn schedule(&self, delay: Duration, task: TimerTask) -> ApiResult<()> {
        std::thread::Builder::new()
            .name("fsgate-session-timer".to_string())
            .spawn(move || {
                std::thread::sleep(delay);
                task();
            })
            .map(|_| ())
            .map_err(|err| {
                Error::new(ErrorKind::Internal)
                    .with_message("failed to spawn session timer thread")
                    .with_source(err)
            })
    }
}

/// Surfaces a notice to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        tracing::warn!(kind = notice.kind.as_str(), "{}", notice.message);
    }
}

/// Writes one JSON line per notice to stderr.
#[derive(Clone, Copy, Debug, Default)]
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, notice: Notice) {
        let mut stderr = std::io::stderr().lock();
        let _ = write_notice_line(&mut stderr, &notice);
    }
}

fn write_notice_line(out: &mut impl Write, notice: &Notice) -> std::io::Result<()> {
    writeln!(out, "{}", notice_json(notice))
}

pub struct SessionMonitor {
    armed: Arc<AtomicBool>,
    delay: Duration,
    timer: Arc<dyn Timer>,
    notifier: Arc<dyn Notifier>,
}

impl SessionMonitor {
    pub fn new(delay: Duration, timer: Arc<dyn Timer>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            armed: Arc::new(AtomicBool::new(false)),
            delay,
            timer,
            notifier,
        }
    }

    /// Uses the configured notice delay with the given timer and notifier.
    pub fn with_config(
        config: &ClientConfig,
        timer: Arc<dyn Timer>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::new(config.session_notice_delay, timer, notifier)
    }

    /// Thread timer plus tracing notifier.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::with_config(config, Arc::new(ThreadTimer), Arc::new(TracingNotifier))
    }

    pub fn state(&self) -> SessionState {
        if self.armed.load(Ordering::Acquire) {
            SessionState::NotificationArmed
        } else {
            SessionState::Idle
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Arms the expiry notification unless one is already pending.
    ///
    /// Returns `true` when this call armed the timer.
    pub fn on_auth_failure(&self) -> bool {
        if self
            .armed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("session expiry notice already pending");
            return false;
        }

        tracing::debug!(delay_ms = self.delay.as_millis() as u64, "arming session expiry notice");
        let armed = Arc::clone(&self.armed);
        let notifier = Arc::clone(&self.notifier);
        let scheduled = self.timer.schedule(
            self.delay,
            Box::new(move || {
                notifier.notify(Notice::session_expired());
                armed.store(false, Ordering::Release);
            }),
        );
        if let Err(err) = scheduled {
            tracing::error!(error = %err, "session expiry notice not scheduled");
            self.armed.store(false, Ordering::Release);
            return false;
        }
        true
    }
}

impl std::fmt::Debug for SessionMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMonitor")
            .field("state", &self.state())
            .field("delay", &self.delay)
            .finish()
    }
}
