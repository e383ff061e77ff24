//! In-process, name-keyed publish/subscribe.
//!
//! Feature modules register handlers for named events at startup and other
//! modules dispatch to them without a compile-time dependency on each other.
//! Handlers for one event run one after another in registration order; the
//! first failure aborts the dispatch.

pub mod contracts;

use dashmap::DashMap;
use futures::future::BoxFuture;
use std::any::{Any, TypeId};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use thiserror::Error;

pub use contracts::{UserGetById, UserLookup};

/// A named event together with the payload it carries and the value each
/// handler may return.
pub trait Event: 'static {
    const NAME: &'static str;
    type Payload: Clone + Send + 'static;
    type Output: Send + 'static;
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("handler for event '{event}' failed: {source}")]
    Handler {
        event: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("event '{event}' has handlers registered with a different payload or output type")]
    TypeMismatch { event: &'static str },
}

impl From<EventError> for crate::error::AppError {
    fn from(err: EventError) -> Self {
        crate::error::AppError::InternalError(anyhow::Error::new(err))
    }
}

type ErasedOutput = Option<Box<dyn Any + Send>>;
type ErasedHandler =
    Arc<dyn Fn(Box<dyn Any + Send>) -> BoxFuture<'static, anyhow::Result<ErasedOutput>> + Send + Sync>;

#[derive(Clone)]
struct Registration {
    id: u64,
    signature: TypeId,
    handler: ErasedHandler,
}

type Registry = DashMap<&'static str, Vec<Registration>>;

/// Process-wide event registry. Cheap to clone; clones share registrations.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Registry>,
    next_id: Arc<AtomicU64>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("events", &self.registry.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `handler` to the handlers of `E`. Registering the same handler
    /// twice yields two independent entries.
    pub fn register<E, F, Fut>(&self, handler: F) -> Subscription
    where
        E: Event,
        F: Fn(E::Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<E::Output>>> + Send + 'static,
    {
        let erased: ErasedHandler = Arc::new(move |payload: Box<dyn Any + Send>| {
            let call = payload.downcast::<E::Payload>().map(|p| handler(*p));
            let fut: BoxFuture<'static, anyhow::Result<ErasedOutput>> = Box::pin(async move {
                let output = match call {
                    Ok(fut) => fut.await?,
                    Err(_) => anyhow::bail!("payload type mismatch for event '{}'", E::NAME),
                };
                Ok(output.map(|o| Box::new(o) as Box<dyn Any + Send>))
            });
            fut
        });

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.entry(E::NAME).or_default().push(Registration {
            id,
            signature: TypeId::of::<(E::Payload, E::Output)>(),
            handler: erased,
        });

        tracing::debug!(event = E::NAME, handler_id = id, "Event handler registered");

        Subscription {
            registry: Arc::downgrade(&self.registry),
            event: E::NAME,
            id,
        }
    }

    /// Invokes every handler of `E` in registration order, awaiting each one
    /// before the next. Handlers returning `None` contribute nothing.
    pub async fn dispatch<E: Event>(&self, payload: E::Payload) -> Result<Vec<E::Output>, EventError> {
        let handlers: Vec<Registration> = match self.registry.get(E::NAME) {
            Some(entry) => entry.value().clone(),
            None => Vec::new(),
        };

        if handlers.is_empty() {
            tracing::trace!(event = E::NAME, "No handlers registered");
            return Ok(Vec::new());
        }

        let signature = TypeId::of::<(E::Payload, E::Output)>();
        if handlers.iter().any(|r| r.signature != signature) {
            return Err(EventError::TypeMismatch { event: E::NAME });
        }

        let mut results = Vec::with_capacity(handlers.len());
        for registration in handlers {
            let output = (registration.handler)(Box::new(payload.clone()))
                .await
                .map_err(|source| {
                    tracing::error!(
                        event = E::NAME,
                        handler_id = registration.id,
                        error = ?source,
                        "Event handler failed"
                    );
                    EventError::Handler {
                        event: E::NAME,
                        source,
                    }
                })?;

            if let Some(output) = output {
                let output = output
                    .downcast::<E::Output>()
                    .map_err(|_| EventError::TypeMismatch { event: E::NAME })?;
                results.push(*output);
            }
        }

        Ok(results)
    }

    pub fn handler_count(&self, event: &str) -> usize {
        self.registry.get(event).map(|e| e.len()).unwrap_or(0)
    }
}

/// Handle returned by [`EventBus::register`]; revokes exactly that
/// registration.
#[derive(Debug)]
pub struct Subscription {
    registry: Weak<Registry>,
    event: &'static str,
    id: u64,
}

impl Subscription {
    pub fn event(&self) -> &'static str {
        self.event
    }

    /// Removes the registration. Returns false when it was already gone or
    /// the bus has been dropped.
    pub fn unsubscribe(self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };

        let removed = match registry.get_mut(self.event) {
            Some(mut handlers) => {
                let before = handlers.len();
                handlers.retain(|r| r.id != self.id);
                before != handlers.len()
            }
            None => false,
        };
        registry.remove_if(self.event, |_, handlers| handlers.is_empty());

        if removed {
            tracing::debug!(event = self.event, handler_id = self.id, "Event handler removed");
        }
        removed
    }
}
