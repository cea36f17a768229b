//! A cloneable handle for aborting and observing sends from external code.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio_util::sync::CancellationToken;

/// A cloneable handle for poking the controller from external code.
///
/// All fields are `Arc`-wrapped, so cloning is cheap. A Ctrl-C handler can
/// hold one and call [`ChatHandle::abort`] while the send streams.
#[derive(Clone)]
pub struct ChatHandle {
    pub(crate) cancel: Arc<Mutex<CancellationToken>>,
    pub(crate) idle_notify: Arc<tokio::sync::Notify>,
    pub(crate) is_running: Arc<AtomicBool>,
}

impl ChatHandle {
    pub(crate) fn new() -> Self {
        Self {
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
            idle_notify: Arc::new(tokio::sync::Notify::new()),
            is_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Mark a send as in flight and install a fresh cancellation token.
    pub(crate) fn begin(&self) -> Result<(InFlightGuard, CancellationToken)> {
        if self
            .is_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::SendInFlight);
        }

        let token = CancellationToken::new();
        *self.cancel.lock() = token.clone();
        Ok((
            InFlightGuard {
                handle: self.clone(),
            },
            token,
        ))
    }

    /// Abort the current send. No further events are delivered for it.
    pub fn abort(&self) {
        self.cancel.lock().cancel();
    }

    /// Wait until no send is in flight.
    pub async fn wait_for_idle(&self) {
        let notified = self.idle_notify.notified();
        if !self.is_running.load(Ordering::Acquire) {
            return;
        }
        notified.await;
    }

    /// Wait until idle, with a timeout.
    /// Returns `true` if idle was reached, `false` on timeout.
    pub async fn wait_for_idle_timeout(&self, timeout: std::time::Duration) -> bool {
        if !self.is_running.load(Ordering::Acquire) {
            return true;
        }
        tokio::time::timeout(timeout, self.wait_for_idle())
            .await
            .is_ok()
    }

    /// Whether a send is currently in flight.
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }
}

/// Clears the in-flight flag when the send's event stream goes away
pub(crate) struct InFlightGuard {
    handle: ChatHandle,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.handle.is_running.store(false, Ordering::Release);
        self.handle.idle_notify.notify_waiters();
    }
}
