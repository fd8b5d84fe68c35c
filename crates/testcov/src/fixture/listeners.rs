//! Event listener dispatcher
//!
//! Listeners are registered per event name. A single-dispatch listener is
//! removed once it has fired; a multi-dispatch listener stays until it is
//! removed explicitly. Every executable line carries a coverage probe.

use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use testcov_tracer::{branch, probe, Probe};
use tokio::sync::oneshot;

/// Path of this file as seen by the probes
pub const SOURCE_FILE: &str = file!();

/// Text of this file, scanned for probe sites
pub const SOURCE: &str = include_str!("listeners.rs");

/// Positional and keyword arguments of one dispatch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventArgs {
    /// Positional arguments
    pub args: Vec<String>,
    /// Keyword arguments
    pub kwargs: BTreeMap<String, String>,
}

impl EventArgs {
    /// With a positional argument
    #[must_use]
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(value.into());
        self
    }

    /// With a keyword argument
    #[must_use]
    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }
}

/// Async listener callback
pub type Handler = Arc<dyn Fn(EventArgs) -> BoxFuture<'static, Result<(), String>> + Send + Sync>;

/// Wrap an async closure as a [`Handler`]
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(EventArgs) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<(), String>> + Send + 'static,
{
    Arc::new(move |args: EventArgs| -> BoxFuture<'static, Result<(), String>> {
        Box::pin(f(args))
    })
}

/// Whether a listener survives its first dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Removed after firing once
    Single,
    /// Kept after firing
    Multi,
}

/// Listener registration and dispatch failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ListenerError {
    /// A listener was registered without a callback
    #[error("listener for `{event}` has no handler")]
    MissingHandler {
        /// Event name
        event: String,
    },
    /// A callback returned an error
    #[error("listener for `{event}` failed: {message}")]
    Handler {
        /// Event name
        event: String,
        /// Callback message
        message: String,
    },
}

/// Registered listener
pub struct Listener {
    id: u64,
    event: String,
    mode: DispatchMode,
    handler: Handler,
    dispatched: AtomicBool,
    last_args: Mutex<Option<EventArgs>>,
}

impl Listener {
    /// Registration id
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Event this listener is attached to
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Dispatch mode
    #[must_use]
    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Whether the listener has fired at least once
    #[must_use]
    pub fn dispatched(&self) -> bool {
        self.dispatched.load(Ordering::Acquire)
    }

    /// Arguments of the most recent dispatch
    #[must_use]
    pub fn last_args(&self) -> Option<EventArgs> {
        self.last_args.lock().clone()
    }

    async fn fire(&self, args: EventArgs, probe: &Probe) -> Result<(), ListenerError> {
        probe!(probe);
        let outcome = (self.handler)(args.clone()).await;
        *self.last_args.lock() = Some(args);
        self.dispatched.store(true, Ordering::Release);
        match outcome {
            Ok(()) => {
                branch!(probe, 0);
                Ok(())
            }
            Err(message) => {
                branch!(probe, 1);
                Err(ListenerError::Handler {
                    event: self.event.clone(),
                    message,
                })
            }
        }
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("event", &self.event)
            .field("mode", &self.mode)
            .field("dispatched", &self.dispatched())
            .finish_non_exhaustive()
    }
}

/// Event name to listeners, with dispatch
#[derive(Debug)]
pub struct EventBus {
    listeners: Mutex<BTreeMap<String, Vec<Arc<Listener>>>>,
    next_id: AtomicU64,
    probe: Probe,
}

impl EventBus {
    /// Create an empty bus reporting coverage through `probe`
    #[must_use]
    pub fn new(probe: Probe) -> Self {
        probe!(probe);
        Self {
            listeners: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            probe,
        }
    }

    /// Register a listener
    ///
    /// # Errors
    /// Returns `ListenerError::MissingHandler` if `handler` is `None`.
    pub fn add_listener(
        &self,
        event: &str,
        mode: DispatchMode,
        handler: Option<Handler>,
    ) -> Result<Arc<Listener>, ListenerError> {
        probe!(self.probe);
        let Some(handler) = handler else {
            branch!(self.probe, 0);
            return Err(ListenerError::MissingHandler {
                event: event.to_string(),
            });
        };
        branch!(self.probe, 1);
        let listener = Arc::new(Listener {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            event: event.to_string(),
            mode,
            handler,
            dispatched: AtomicBool::new(false),
            last_args: Mutex::new(None),
        });
        self.listeners
            .lock()
            .entry(event.to_string())
            .or_default()
            .push(Arc::clone(&listener));
        Ok(listener)
    }

    /// Register a listener removed after its first dispatch
    ///
    /// # Errors
    /// See [`add_listener`](Self::add_listener).
    pub fn add_single_listener(
        &self,
        event: &str,
        handler: Option<Handler>,
    ) -> Result<Arc<Listener>, ListenerError> {
        self.add_listener(event, DispatchMode::Single, handler)
    }

    /// Register a listener kept across dispatches
    ///
    /// # Errors
    /// See [`add_listener`](Self::add_listener).
    pub fn add_multi_listener(
        &self,
        event: &str,
        handler: Option<Handler>,
    ) -> Result<Arc<Listener>, ListenerError> {
        self.add_listener(event, DispatchMode::Multi, handler)
    }

    /// Remove a listener by id; returns whether it was registered
    pub fn remove(&self, id: u64) -> bool {
        probe!(self.probe);
        let mut listeners = self.listeners.lock();
        let mut removed = false;
        for registered in listeners.values_mut() {
            let before = registered.len();
            registered.retain(|l| l.id != id);
            removed |= registered.len() != before;
        }
        removed
    }

    /// Number of listeners attached to `event`
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.lock().get(event).map_or(0, Vec::len)
    }

    /// Whether a listener with `id` is attached to `event`
    #[must_use]
    pub fn contains(&self, event: &str, id: u64) -> bool {
        self.listeners
            .lock()
            .get(event)
            .is_some_and(|registered| registered.iter().any(|l| l.id == id))
    }

    /// Fire every listener of `event` with `args`, in registration order
    ///
    /// Single-dispatch listeners are detached before they run, so a
    /// listener that re-dispatches the same event cannot fire twice.
    /// Returns the number of listeners fired.
    ///
    /// # Errors
    /// Returns the first handler failure; later listeners still run.
    pub async fn dispatch(&self, event: &str, args: EventArgs) -> Result<usize, ListenerError> {
        probe!(self.probe);
        let fired: Vec<Arc<Listener>> = {
            let mut listeners = self.listeners.lock();
            match listeners.get_mut(event) {
                Some(registered) => {
                    branch!(self.probe, 0);
                    let fired = registered.clone();
                    registered.retain(|l| l.mode == DispatchMode::Multi);
                    fired
                }
                None => {
                    branch!(self.probe, 1);
                    Vec::new()
                }
            }
        };

        let mut first_error = None;
        for listener in &fired {
            if let Err(err) = listener.fire(args.clone(), &self.probe).await {
                probe!(self.probe);
                first_error.get_or_insert(err);
            }
        }
        tracing::debug!(event, fired = fired.len(), "event dispatched");
        match first_error {
            Some(err) => Err(err),
            None => Ok(fired.len()),
        }
    }

    /// Resolve with the arguments of the next dispatch of `event`
    pub async fn wait_for(&self, event: &str) -> Option<EventArgs> {
        probe!(self.probe);
        let (tx, rx) = oneshot::channel();
        let tx = Arc::new(Mutex::new(Some(tx)));
        let registered = self.add_single_listener(
            event,
            Some(handler(move |args: EventArgs| {
                let tx = Arc::clone(&tx);
                async move {
                    if let Some(tx) = tx.lock().take() {
                        let _ = tx.send(args);
                    }
                    Ok(())
                }
            })),
        );
        match registered {
            Ok(_) => rx.await.ok(),
            Err(_) => None,
        }
    }
}
