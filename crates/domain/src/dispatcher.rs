//! In-process notification dispatcher.
//!
//! [`Dispatcher::publish`] never runs handler code itself. It turns every
//! matching subscription into a job on an unbounded queue and returns
//! immediately. A dedicated [`DispatchWorker`] drains the queue and runs each
//! job as its own task, so one slow saga never holds up another. Every queued
//! or running job is counted, which lets callers wait for quiescence with
//! [`Dispatcher::wait_idle`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::{Notify, mpsc, oneshot};
use tokio::task::{JoinError, JoinSet};

use crate::events::{EventName, Notification};

/// Error type returned by event handlers. The dispatcher only logs it.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A subscriber that reacts to notifications.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Returns the handler name used in logs.
    fn name(&self) -> &'static str;

    /// Handles a single notification.
    async fn handle(&self, event: Notification) -> Result<(), HandlerError>;
}

type Filter = Box<dyn Fn(&Notification) -> bool + Send + Sync>;

enum Subscription {
    Handler(Arc<dyn EventHandler>),
    Once {
        filter: Filter,
        sender: oneshot::Sender<Notification>,
    },
}

/// Counts queued and running jobs.
#[derive(Default)]
struct Tracker {
    pending: AtomicUsize,
    idle: Notify,
}

/// Keeps one unit of work counted until dropped.
struct PendingGuard(Arc<Tracker>);

impl PendingGuard {
    fn new(tracker: &Arc<Tracker>) -> Self {
        tracker.pending.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(tracker))
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.0.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

struct Job {
    handler: Arc<dyn EventHandler>,
    event: Notification,
    guard: PendingGuard,
}

struct Inner {
    subscriptions: Mutex<HashMap<EventName, Vec<Subscription>>>,
    queue: mpsc::UnboundedSender<Job>,
    tracker: Arc<Tracker>,
}

/// Publish/subscribe hub shared by all components of one application.
///
/// Cloning is cheap; all clones share the same subscriptions and queue.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    /// Creates a dispatcher and the worker that must be driven for handlers to run.
    pub fn new() -> (Self, DispatchWorker) {
        let (queue, jobs) = mpsc::unbounded_channel();
        let dispatcher = Self {
            inner: Arc::new(Inner {
                subscriptions: Mutex::new(HashMap::new()),
                queue,
                tracker: Arc::new(Tracker::default()),
            }),
        };
        (dispatcher, DispatchWorker { jobs })
    }

    /// Creates a dispatcher and spawns its worker on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn start() -> Self {
        let (dispatcher, worker) = Self::new();
        tokio::spawn(worker.run());
        dispatcher
    }

    /// Registers a handler for every future notification named `name`.
    pub fn subscribe(&self, name: EventName, handler: Arc<dyn EventHandler>) {
        tracing::debug!(event = %name, handler = handler.name(), "handler subscribed");
        self.lock_subscriptions()
            .entry(name)
            .or_default()
            .push(Subscription::Handler(handler));
    }

    /// Returns a receiver for the next notification named `name`.
    ///
    /// The subscription removes itself after the first delivery.
    pub fn subscribe_once(&self, name: EventName) -> oneshot::Receiver<Notification> {
        self.subscribe_once_where(name, |_| true)
    }

    /// Like [`subscribe_once`](Self::subscribe_once), but only fires for the
    /// first notification accepted by `filter`.
    ///
    /// `filter` runs inside `publish` and must be cheap.
    pub fn subscribe_once_where<F>(
        &self,
        name: EventName,
        filter: F,
    ) -> oneshot::Receiver<Notification>
    where
        F: Fn(&Notification) -> bool + Send + Sync + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        self.lock_subscriptions()
            .entry(name)
            .or_default()
            .push(Subscription::Once {
                filter: Box::new(filter),
                sender,
            });
        receiver
    }

    /// Schedules every subscription for `event`, in subscription order, and
    /// returns the number of deliveries scheduled.
    ///
    /// Handler completion is not awaited and handler errors are not returned.
    pub fn publish(&self, event: Notification) -> usize {
        let name = event.name();
        metrics::counter!("notifications_published_total", "event" => name.as_str()).increment(1);

        let mut subscriptions = self.lock_subscriptions();
        let Some(list) = subscriptions.get_mut(&name) else {
            tracing::trace!(event = %name, "no subscribers");
            return 0;
        };

        let mut scheduled = 0;
        let mut kept = Vec::with_capacity(list.len());
        for subscription in list.drain(..) {
            match subscription {
                Subscription::Handler(handler) => {
                    let job = Job {
                        handler: Arc::clone(&handler),
                        event: event.clone(),
                        guard: PendingGuard::new(&self.inner.tracker),
                    };
                    if self.inner.queue.send(job).is_ok() {
                        scheduled += 1;
                    } else {
                        tracing::error!(event = %name, handler = handler.name(), "dispatch worker is not running");
                    }
                    kept.push(Subscription::Handler(handler));
                }
                Subscription::Once { filter, sender } => {
                    if sender.is_closed() {
                        continue;
                    }
                    if filter(&event) {
                        if sender.send(event.clone()).is_ok() {
                            scheduled += 1;
                        }
                    } else {
                        kept.push(Subscription::Once { filter, sender });
                    }
                }
            }
        }
        *list = kept;

        tracing::debug!(event = %name, scheduled, "notification published");
        scheduled
    }

    /// Returns the number of live subscriptions for `name`.
    pub fn subscriber_count(&self, name: EventName) -> usize {
        self.lock_subscriptions()
            .get(&name)
            .map(|list| {
                list.iter()
                    .filter(|s| match s {
                        Subscription::Handler(_) => true,
                        Subscription::Once { sender, .. } => !sender.is_closed(),
                    })
                    .count()
            })
            .unwrap_or(0)
    }

    /// Returns the number of handler jobs queued or running.
    pub fn pending(&self) -> usize {
        self.inner.tracker.pending.load(Ordering::SeqCst)
    }

    /// Waits until no handler jobs are queued or running.
    ///
    /// Jobs published by running handlers are counted before their publisher
    /// finishes, so a chain of notifications is waited for as a whole.
    pub async fn wait_idle(&self) {
        let tracker = &self.inner.tracker;
        loop {
            let notified = tracker.idle.notified();
            if tracker.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    fn lock_subscriptions(&self) -> MutexGuard<'_, HashMap<EventName, Vec<Subscription>>> {
        self.inner
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drains the dispatcher's queue and runs each job as its own task.
///
/// Stops once the queue closes, which happens when the last [`Dispatcher`]
/// clone is dropped, and then waits for the jobs still in flight. A subscribed
/// handler that holds a `Dispatcher` keeps the queue open, so in a wired
/// system the worker lives as long as the runtime; use
/// [`Dispatcher::wait_idle`] to drain it before shutting down.
pub struct DispatchWorker {
    jobs: mpsc::UnboundedReceiver<Job>,
}

impl DispatchWorker {
    pub async fn run(mut self) {
        let mut running = JoinSet::new();

        loop {
            tokio::select! {
                job = self.jobs.recv() => match job {
                    Some(job) => {
                        running.spawn(run_job(job));
                    }
                    None => break,
                },
                Some(result) = running.join_next(), if !running.is_empty() => {
                    log_join_result(result);
                }
            }
        }

        while let Some(result) = running.join_next().await {
            log_join_result(result);
        }
        tracing::debug!("dispatch worker stopped");
    }
}

async fn run_job(job: Job) {
    let Job {
        handler,
        event,
        guard: _guard,
    } = job;
    let name = event.name();

    if let Err(error) = handler.handle(event).await {
        metrics::counter!("notification_handler_failures_total", "event" => name.as_str())
            .increment(1);
        tracing::error!(handler = handler.name(), event = %name, %error, "event handler failed");
    }
}

fn log_join_result(result: Result<(), JoinError>) {
    if let Err(e) = result
        && e.is_panic()
    {
        tracing::error!(error = %e, "event handler panicked");
    }
}
