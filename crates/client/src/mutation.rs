//! Write-side counterpart of [`Resource`](crate::resource::Resource).

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::watch;

use hospital_rbac_auth::Permission;
use hospital_rbac_core::{ApiError, ApiResult};

use crate::resource::{Producer, boxed_producer};
use crate::session::SessionHandle;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationState {
    /// True while at least one call is outstanding.
    pub loading: bool,

    /// Message of the most recent failed call, cleared when a call starts.
    pub error: Option<String>,
}

struct Guard {
    session: SessionHandle,
    permission: Permission,
}

/// A create/update/delete operation with `{ loading, error }` tracking.
pub struct Mutation<A, T> {
    producer: Producer<A, T>,
    state: Arc<watch::Sender<MutationState>>,
    in_flight: Arc<AtomicUsize>,
    guard: Option<Arc<Guard>>,
}

impl<A, T> Clone for Mutation<A, T> {
    fn clone(&self) -> Self {
        Self {
            producer: Arc::clone(&self.producer),
            state: Arc::clone(&self.state),
            in_flight: Arc::clone(&self.in_flight),
            guard: self.guard.clone(),
        }
    }
}

impl<A, T> core::fmt::Debug for Mutation<A, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Mutation")
            .field("state", &*self.state.borrow())
            .field("permission", &self.guard.as_ref().map(|g| g.permission))
            .finish_non_exhaustive()
    }
}

impl<A, T> Mutation<A, T>
where
    A: Send + 'static,
    T: Send + 'static,
{
    pub fn new<F, Fut>(producer: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<T>> + Send + 'static,
    {
        let (state, _rx) = watch::channel(MutationState::default());
        Self {
            producer: boxed_producer(producer),
            state: Arc::new(state),
            in_flight: Arc::new(AtomicUsize::new(0)),
            guard: None,
        }
    }

    /// Refuse calls, before any network traffic, unless the signed-in role
    /// holds `permission` at call time.
    pub fn require(mut self, session: SessionHandle, permission: Permission) -> Self {
        self.guard = Some(Arc::new(Guard {
            session,
            permission,
        }));
        self
    }

    pub fn state(&self) -> MutationState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MutationState> {
        self.state.subscribe()
    }

    pub async fn mutate(&self, args: A) -> ApiResult<T> {
        if let Some(guard) = &self.guard {
            let session = guard.session.snapshot();
            let Permission { resource, action } = guard.permission;
            if !session.can_perform(resource, action) {
                let err = ApiError::validation(format!(
                    "your role is not permitted to {} {}",
                    action, resource
                ));
                self.state.send_modify(|s| s.error = Some(err.to_string()));
                return Err(err);
            }
        }

        self.state.send_modify(|s| {
            self.in_flight.fetch_add(1, Ordering::SeqCst);
            s.loading = true;
            s.error = None;
        });

        let outcome = (self.producer)(args).await;

        self.state.send_modify(|s| {
            let remaining = self.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
            s.loading = remaining > 0;
            if let Err(e) = &outcome {
                s.error = Some(e.to_string());
            }
        });

        outcome
    }
}
