//! In-process event bus.
//!
//! Handlers subscribe to a [`Topic`]. Publishing spawns one task per
//! handler, in registration order, and returns immediately. A handler that
//! errors or panics is logged and never affects its siblings or the
//! publisher. The returned [`PublishHandle`] lets callers (mostly tests)
//! wait for every handler and inspect how each one finished.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::RwLock;
use tokio::task::JoinHandle;

use super::event::{DomainEvent, Topic};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Name used in logs and outcomes.
    fn name(&self) -> &str;

    async fn handle(&self, event: Arc<DomainEvent>) -> Result<(), AppError>;
}

/// Adapter turning an async closure into an [`EventHandler`].
pub struct FnHandler<F> {
    name: String,
    func: F,
}

impl<F> FnHandler<F> {
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(Arc<DomainEvent>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), AppError>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: Arc<DomainEvent>) -> Result<(), AppError> {
        (self.func)(event).await
    }
}

/// How a single handler invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    Completed { handler: String },
    Failed { handler: String, error: String },
    Panicked { handler: String, message: String },
}

impl HandlerOutcome {
    pub fn handler(&self) -> &str {
        match self {
            Self::Completed { handler }
            | Self::Failed { handler, .. }
            | Self::Panicked { handler, .. } => handler,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Awaitable result of one publish call.
#[must_use = "dropping the handle is fine; handlers keep running"]
pub struct PublishHandle {
    tasks: Vec<(String, JoinHandle<HandlerOutcome>)>,
}

impl PublishHandle {
    pub fn handler_count(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every handler, returning outcomes in registration order.
    pub async fn outcomes(self) -> Vec<HandlerOutcome> {
        let mut outcomes = Vec::with_capacity(self.tasks.len());
        for (handler, task) in self.tasks {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(e) => HandlerOutcome::Panicked {
                    handler,
                    message: e.to_string(),
                },
            };
            outcomes.push(outcome);
        }
        outcomes
    }
}

#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<Topic, Vec<Arc<dyn EventHandler>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler to a topic. Duplicates are allowed and each
    /// registration is invoked.
    pub fn subscribe(&self, topic: Topic, handler: Arc<dyn EventHandler>) {
        tracing::debug!(topic = %topic, handler = handler.name(), "Handler subscribed");
        self.handlers.write().entry(topic).or_default().push(handler);
    }

    /// Subscribe an async closure.
    pub fn on<F, Fut>(&self, topic: Topic, name: impl Into<String>, func: F)
    where
        F: Fn(Arc<DomainEvent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), AppError>> + Send + 'static,
    {
        self.subscribe(topic, Arc::new(FnHandler::new(name, func)));
    }

    pub fn handler_count(&self, topic: Topic) -> usize {
        self.handlers.read().get(&topic).map_or(0, Vec::len)
    }

    /// Dispatch `event` to every handler of its topic.
    ///
    /// Must be called from within a tokio runtime.
    pub fn publish(&self, event: DomainEvent) -> PublishHandle {
        let topic = event.topic();
        let handlers: Vec<Arc<dyn EventHandler>> = self
            .handlers
            .read()
            .get(&topic)
            .cloned()
            .unwrap_or_default();

        metrics::record_event_published(topic.as_str());

        if handlers.is_empty() {
            tracing::debug!(topic = %topic, "Event published with no handlers");
            return PublishHandle { tasks: Vec::new() };
        }

        let event = Arc::new(event);
        let tasks = handlers
            .into_iter()
            .map(|handler| {
                let name = handler.name().to_string();
                let event = Arc::clone(&event);
                let task = tokio::spawn(run_handler(topic, handler, event));
                (name, task)
            })
            .collect();

        PublishHandle { tasks }
    }
}

async fn run_handler(
    topic: Topic,
    handler: Arc<dyn EventHandler>,
    event: Arc<DomainEvent>,
) -> HandlerOutcome {
    let name = handler.name().to_string();
    match AssertUnwindSafe(handler.handle(event)).catch_unwind().await {
        Ok(Ok(())) => HandlerOutcome::Completed { handler: name },
        Ok(Err(e)) => {
            tracing::warn!(topic = %topic, handler = %name, error = %e, "Event handler failed");
            metrics::record_handler_failure(topic.as_str());
            HandlerOutcome::Failed {
                handler: name,
                error: e.to_string(),
            }
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!(topic = %topic, handler = %name, panic = %message, "Event handler panicked");
            metrics::record_handler_failure(topic.as_str());
            HandlerOutcome::Panicked {
                handler: name,
                message,
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::events::{Collection, UpdateNotification};
    use crate::domain::{CompositeId, EntityKind};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    fn notification() -> DomainEvent {
        DomainEvent::Updated(UpdateNotification::new(
            CompositeId::new(EntityKind::Category, 1),
            Collection::Category,
        ))
    }

    #[tokio::test]
    async fn test_publish_without_handlers() {
        let bus = EventBus::new();
        let handle = bus.publish(notification());
        assert_eq!(handle.handler_count(), 0);
        assert!(handle.outcomes().await.is_empty());
    }

    #[tokio::test]
    async fn test_failure_and_panic_are_isolated() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = Arc::clone(&seen);
        bus.on(Topic::UpdateNotification, "first", move |_| {
            let s = Arc::clone(&s);
            async move {
                s.lock().push("first");
                Ok::<(), AppError>(())
            }
        });
        bus.on(Topic::UpdateNotification, "failing", |_| async {
            Err::<(), AppError>(AppError::Internal("boom".into()))
        });
        bus.on(Topic::UpdateNotification, "panicking", |_| async {
            let explode = true;
            if explode {
                panic!("handler exploded");
            }
            Ok::<(), AppError>(())
        });
        let s = Arc::clone(&seen);
        bus.on(Topic::UpdateNotification, "last", move |_| {
            let s = Arc::clone(&s);
            async move {
                s.lock().push("last");
                Ok::<(), AppError>(())
            }
        });

        let outcomes = bus.publish(notification()).outcomes().await;

        let names: Vec<&str> = outcomes.iter().map(HandlerOutcome::handler).collect();
        assert_eq!(names, vec!["first", "failing", "panicking", "last"]);
        assert!(outcomes[0].is_completed());
        assert!(matches!(outcomes[1], HandlerOutcome::Failed { .. }));
        assert_eq!(
            outcomes[2],
            HandlerOutcome::Panicked {
                handler: "panicking".into(),
                message: "handler exploded".into()
            }
        );
        assert!(outcomes[3].is_completed());

        let mut seen = seen.lock().clone();
        seen.sort();
        assert_eq!(seen, vec!["first", "last"]);
    }

    #[tokio::test]
    async fn test_duplicate_registration_runs_twice() {
        let bus = EventBus::new();
        let calls = Arc::new(Mutex::new(0));
        for _ in 0..2 {
            let c = Arc::clone(&calls);
            bus.on(Topic::MessageCreation, "counter", move |_| {
                let c = Arc::clone(&c);
                async move {
                    *c.lock() += 1;
                    Ok::<(), AppError>(())
                }
            });
        }
        assert_eq!(bus.handler_count(Topic::MessageCreation), 2);

        let event = DomainEvent::MessageCreated(crate::application::dto::MessageDto::from(
            &crate::domain::Message::new(
                1,
                crate::domain::MessageType::Text,
                "hi",
                1,
                crate::domain::RoomKey::channel(10),
            ),
        ));
        let outcomes = bus.publish(event).outcomes().await;
        assert_eq!(outcomes.len(), 2);
        assert_eq!(*calls.lock(), 2);
    }

    #[tokio::test]
    async fn test_topics_are_independent() {
        let bus = EventBus::new();
        bus.on(Topic::MessageDeletion, "deletion", |_| async { Ok::<(), AppError>(()) });
        let handle = bus.publish(notification());
        assert_eq!(handle.handler_count(), 0);
    }
}
