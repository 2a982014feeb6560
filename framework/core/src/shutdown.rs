use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast::{error::RecvError, error::TryRecvError, Receiver, Sender};
use tokio::sync::Mutex;

/// Requests that a running launch is interrupted.
///
/// Clones share the same state, so the handle can be given to a signal listener while the
/// launcher keeps a listener of its own. A request made before a listener subscribes is still
/// observed by that listener.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Sender<()>,
    requested: Arc<AtomicBool>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self {
            sender: tokio::sync::broadcast::channel(1).0,
            requested: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn shutdown(&self) {
        self.requested.store(true, Ordering::SeqCst);
        if let Err(e) = self.sender.send(()) {
            // Nobody is listening yet, the flag above covers late subscribers.
            log::trace!("No shutdown listeners registered: {e:?}");
        }
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub fn new_listener(&self) -> DelegatedShutdownListener {
        DelegatedShutdownListener::new(self.sender.subscribe(), self.requested.clone())
    }
}

#[derive(Clone, Debug)]
pub struct DelegatedShutdownListener {
    receiver: Arc<Mutex<Receiver<()>>>,
    requested: Arc<AtomicBool>,
}

impl DelegatedShutdownListener {
    pub(crate) fn new(receiver: Receiver<()>, requested: Arc<AtomicBool>) -> Self {
        Self {
            receiver: Arc::new(Mutex::new(receiver)),
            requested,
        }
    }

    /// Point in time check for a shutdown request.
    pub fn should_shutdown(&mut self) -> bool {
        if self.requested.load(Ordering::SeqCst) {
            return true;
        }

        match self.receiver.try_lock() {
            Ok(mut guard) => match guard.try_recv() {
                Ok(_) => true,
                Err(TryRecvError::Closed) => true,
                Err(_) => false,
            },
            Err(_) => false,
        }
    }

    /// Wait until a shutdown is requested.
    ///
    /// Safe to race against other futures with `tokio::select!`. If every [ShutdownHandle] is
    /// dropped without a request then this never resolves.
    pub async fn wait_for_shutdown(&mut self) {
        if self.requested.load(Ordering::SeqCst) {
            return;
        }

        let mut receiver = self.receiver.lock().await;
        loop {
            match receiver.recv().await {
                Ok(()) | Err(RecvError::Lagged(_)) => return,
                Err(RecvError::Closed) => std::future::pending::<()>().await,
            }
        }
    }
}
