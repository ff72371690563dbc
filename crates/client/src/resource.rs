//! Reusable async read slot ("hook") with latest-request-wins semantics.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::watch;

use hospital_rbac_core::ApiResult;

/// Observable state of one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceState<T> {
    pub data: Option<T>,

    /// True while the latest request for this slot is outstanding.
    pub loading: bool,

    pub error: Option<String>,
}

impl<T> ResourceState<T> {
    fn initial(loading: bool) -> Self {
        Self {
            data: None,
            loading,
            error: None,
        }
    }
}

pub(crate) type Producer<A, T> = Arc<dyn Fn(A) -> BoxFuture<'static, ApiResult<T>> + Send + Sync>;

pub(crate) fn boxed_producer<A, T, F, Fut>(producer: F) -> Producer<A, T>
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ApiResult<T>> + Send + 'static,
{
    Arc::new(move |args| producer(args).boxed())
}

struct Inner<T, A, D> {
    producer: Producer<A, T>,
    state: watch::Sender<ResourceState<T>>,

    /// Ticket of the most recently started request. Only advanced while the
    /// state lock is held.
    generation: AtomicU64,

    deps: Mutex<D>,
}

/// One asynchronous read bound to a producer.
///
/// Every call takes a generation ticket when it starts; its result is applied
/// only if no newer call has started since. Superseded calls run to
/// completion and are discarded.
///
/// - `T`: payload
/// - `A`: explicit arguments passed to [`refetch`](Self::refetch)
/// - `D`: dependency value; changing it through [`set_deps`](Self::set_deps)
///   triggers a new fetch
pub struct Resource<T, A = (), D = ()> {
    inner: Arc<Inner<T, A, D>>,
}

impl<T, A, D> Clone for Resource<T, A, D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: core::fmt::Debug, A, D> core::fmt::Debug for Resource<T, A, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Resource")
            .field("state", &*self.inner.state.borrow())
            .field("generation", &self.inner.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl<T, A> Resource<T, A, ()>
where
    T: Clone + Send + Sync + 'static,
    A: Default + Send + 'static,
{
    /// Slot without dependencies that fetches immediately.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<F, Fut>(producer: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<T>> + Send + 'static,
    {
        Self::with_deps(producer, (), true)
    }

    /// Slot without dependencies that waits for the first [`refetch`](Self::refetch).
    pub fn lazy<F, Fut>(producer: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<T>> + Send + 'static,
    {
        Self::with_deps(producer, (), false)
    }
}

impl<T, A, D> Resource<T, A, D>
where
    T: Clone + Send + Sync + 'static,
    A: Default + Send + 'static,
    D: PartialEq + Send + 'static,
{
    /// Slot bound to `deps`; fetches with `A::default()` at creation when
    /// `immediate`.
    ///
    /// # Panics
    ///
    /// With `immediate`, must be called from within a tokio runtime.
    pub fn with_deps<F, Fut>(producer: F, deps: D, immediate: bool) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<T>> + Send + 'static,
    {
        let (state, _rx) = watch::channel(ResourceState::initial(immediate));
        let resource = Self {
            inner: Arc::new(Inner {
                producer: boxed_producer(producer),
                state,
                generation: AtomicU64::new(0),
                deps: Mutex::new(deps),
            }),
        };

        if immediate {
            resource.spawn_fetch(A::default());
        }
        resource
    }

    /// Replace the dependency value. A different value starts a new fetch
    /// with `A::default()`; returns whether it did.
    ///
    /// # Panics
    ///
    /// With a changed value, must be called from within a tokio runtime.
    pub fn set_deps(&self, deps: D) -> bool {
        let changed = {
            let mut current = self.inner.deps.lock().unwrap_or_else(PoisonError::into_inner);
            if *current == deps {
                false
            } else {
                *current = deps;
                true
            }
        };

        if changed {
            self.spawn_fetch(A::default());
        }
        changed
    }

    fn spawn_fetch(&self, args: A) {
        let this = self.clone();
        tokio::spawn(async move {
            this.refetch(args).await;
        });
    }

    pub fn state(&self) -> ResourceState<T> {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResourceState<T>> {
        self.inner.state.subscribe()
    }

    pub fn data(&self) -> Option<T> {
        self.inner.state.borrow().data.clone()
    }

    pub fn loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.inner.state.borrow().error.clone()
    }

    /// Run the producer with `args` and update the slot.
    ///
    /// Returns the fetched data when this call was still the latest one and
    /// succeeded; `None` on failure or when a newer call superseded it.
    pub async fn refetch(&self, args: A) -> Option<T> {
        let mut ticket = 0;
        self.inner.state.send_modify(|s| {
            ticket = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            s.loading = true;
            s.error = None;
        });

        // Clears `loading` if this future is dropped before it settles.
        let _pending = PendingTicket {
            state: &self.inner.state,
            generation: &self.inner.generation,
            ticket,
        };

        let outcome = (self.inner.producer)(args).await;

        let applied = self.inner.state.send_if_modified(|s| {
            if self.inner.generation.load(Ordering::SeqCst) != ticket {
                return false;
            }

            s.loading = false;
            match &outcome {
                Ok(data) => {
                    s.data = Some(data.clone());
                    s.error = None;
                }
                Err(e) => {
                    // Previous data stays visible next to the error.
                    s.error = Some(e.to_string());
                }
            }
            true
        });

        if !applied {
            tracing::debug!(ticket, "discarding superseded resource result");
            return None;
        }

        outcome.ok()
    }
}

struct PendingTicket<'a, T> {
    state: &'a watch::Sender<ResourceState<T>>,
    generation: &'a AtomicU64,
    ticket: u64,
}

impl<T> Drop for PendingTicket<'_, T> {
    fn drop(&mut self) {
        self.state.send_if_modified(|s| {
            if s.loading && self.generation.load(Ordering::SeqCst) == self.ticket {
                s.loading = false;
                true
            } else {
                false
            }
        });
    }
}
