use std::cell::{Cell, RefCell};
use std::sync::Arc;
use std::time::Duration;

use futures_util::task::AtomicWaker;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// A re-armable one-shot timer. Arming again before it fires replaces the
/// pending firing, so a burst of arms produces a single run.
///
/// The timer never runs anything itself: the owner polls [`DeferredTask::take_due`]
/// from its own loop, which keeps all work on the owning thread.
pub struct DeferredTask {
    handle: Handle,
    delay: Duration,
    generation: Cell<u64>,
    armed: Cell<bool>,
    task: RefCell<Option<JoinHandle<()>>>,
    fired_tx: UnboundedSender<u64>,
    fired_rx: RefCell<UnboundedReceiver<u64>>,
    waker: Arc<AtomicWaker>,
}

impl DeferredTask {
    /// Must be called from inside a tokio runtime.
    pub fn new(delay: Duration) -> Self {
        Self::with_handle(Handle::current(), delay, Arc::new(AtomicWaker::new()))
    }

    pub fn with_handle(handle: Handle, delay: Duration, waker: Arc<AtomicWaker>) -> Self {
        let (fired_tx, fired_rx) = unbounded_channel();
        Self {
            handle,
            delay,
            generation: Cell::new(0),
            armed: Cell::new(false),
            task: RefCell::new(None),
            fired_tx,
            fired_rx: RefCell::new(fired_rx),
            waker,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.get()
    }

    pub fn arm(&self) {
        self.abort_pending();
        let generation = self.generation.get().wrapping_add(1);
        self.generation.set(generation);
        self.armed.set(true);

        let tx = self.fired_tx.clone();
        let waker = Arc::clone(&self.waker);
        let delay = self.delay;
        let join = self.handle.spawn(async move {
            if !delay.is_zero() {
                sleep(delay).await;
            }
            if tx.send(generation).is_ok() {
                waker.wake();
            }
        });
        *self.task.borrow_mut() = Some(join);
    }

    pub fn disarm(&self) {
        self.abort_pending();
        // Invalidate anything already queued by the aborted task.
        self.generation.set(self.generation.get().wrapping_add(1));
        self.armed.set(false);
    }

    /// True once per arming, after the latest arming has fired.
    pub fn take_due(&self) -> bool {
        let current = self.generation.get();
        let mut due = false;
        {
            let mut rx = self.fired_rx.borrow_mut();
            while let Ok(generation) = rx.try_recv() {
                if generation == current {
                    due = true;
                }
            }
        }

        if due && self.armed.get() {
            self.armed.set(false);
            self.task.borrow_mut().take();
            return true;
        }
        false
    }

    fn abort_pending(&self) {
        if let Some(task) = self.task.borrow_mut().take() {
            task.abort();
        }
    }
}

impl Drop for DeferredTask {
    fn drop(&mut self) {
        self.abort_pending();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn settle() {
        sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn fires_once_per_arming() {
        let task = DeferredTask::new(Duration::ZERO);
        assert!(!task.take_due());

        task.arm();
        settle().await;
        assert!(task.take_due());
        assert!(!task.take_due());
    }

    #[tokio::test]
    async fn rapid_arms_coalesce() {
        let task = DeferredTask::new(Duration::ZERO);
        task.arm();
        task.arm();
        task.arm();
        settle().await;
        assert!(task.take_due());
        settle().await;
        assert!(!task.take_due());
    }

    #[tokio::test]
    async fn disarm_drops_pending_firing() {
        let task = DeferredTask::new(Duration::from_millis(5));
        task.arm();
        task.disarm();
        settle().await;
        assert!(!task.is_armed());
        assert!(!task.take_due());
    }
}
