use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::{sync::mpsc, task::JoinHandle, time::sleep};
use tracing::debug;

struct DebouncerInner {
    window: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
    trigger: mpsc::Sender<()>,
}

/// Collapses bursts of change notifications into one trigger, sent once no notification has
/// arrived for the whole quiescence window.
///
/// The trigger channel holds a single slot: while a trigger waits to be consumed, further
/// triggers are folded into it.
#[derive(Clone)]
pub struct Debouncer {
    inner: Arc<DebouncerInner>,
}

impl Debouncer {
    pub fn new(window: Duration) -> (Self, mpsc::Receiver<()>) {
        let (trigger, receiver) = mpsc::channel(1);
        let inner = DebouncerInner { window, pending: Mutex::new(None), trigger };
        (Self { inner: Arc::new(inner) }, receiver)
    }

    /// Restarts the quiescence window. Must be called from within a tokio runtime.
    pub fn notify(&self) {
        let mut pending = self.inner.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = pending.take() {
            timer.abort();
        }

        let window = self.inner.window;
        let trigger = self.inner.trigger.clone();
        *pending = Some(tokio::spawn(async move {
            sleep(window).await;
            if trigger.try_send(()).is_err() {
                debug!("reconciliation already pending, trigger folded");
            }
        }));
    }

    /// Drops a pending trigger that has not fired yet.
    pub fn cancel(&self) {
        let mut pending = self.inner.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = pending.take() {
            timer.abort();
        }
    }
}
