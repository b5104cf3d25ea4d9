// Explicitly owned orchestration session
//
// The application bootstrap creates one context and hands clones of it to
// every consumer. All clones share one registry. The context is
// single-threaded: it lives on the thread that created it, and every
// mutation runs to completion before the next one starts.

use std::cell::RefCell;
use std::rc::Rc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::errors::{RegistryError, RegistryResult};
use super::registry::OrchestrationRegistry;
use crate::config::RegistryConfig;
use crate::domain::events::OrchestrationEvent;

struct ContextInner {
    registry: RefCell<OrchestrationRegistry>,
    shutdown: CancellationToken,
}

/// Shared handle to the session's registry
#[derive(Clone)]
pub struct OrchestrationContext {
    inner: Rc<ContextInner>,
}

impl OrchestrationContext {
    pub fn new(config: RegistryConfig) -> Self {
        Self::from_registry(OrchestrationRegistry::new(config))
    }

    pub fn from_registry(registry: OrchestrationRegistry) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                registry: RefCell::new(registry),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Runs a read against the registry
    pub fn read<R>(&self, f: impl FnOnce(&OrchestrationRegistry) -> R) -> R {
        f(&self.inner.registry.borrow())
    }

    /// Runs a mutation against the registry
    ///
    /// Fails with [`RegistryError::ShutDown`] once the context is shut down.
    pub fn mutate<R>(
        &self,
        f: impl FnOnce(&mut OrchestrationRegistry) -> RegistryResult<R>,
    ) -> RegistryResult<R> {
        if self.is_shut_down() {
            return Err(RegistryError::ShutDown);
        }
        f(&mut self.inner.registry.borrow_mut())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrchestrationEvent> {
        self.read(|registry| registry.subscribe())
    }

    /// Ends the session; idempotent
    ///
    /// Loops waiting on [`shutdown_token`](Self::shutdown_token) stop and
    /// later mutations are refused. Reads keep working.
    pub fn shutdown(&self) {
        if !self.inner.shutdown.is_cancelled() {
            info!("Shutting down orchestration context");
            self.inner.shutdown.cancel();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.clone()
    }

    /// Whether two handles share one registry
    pub fn same_session(&self, other: &OrchestrationContext) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for OrchestrationContext {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::AgentRegistration;
    use crate::domain::task::TaskDefinition;

    #[test]
    fn clones_share_one_registry() {
        let context = OrchestrationContext::default();
        let other = context.clone();

        context
            .mutate(|r| r.register_agent(AgentRegistration::new("a", 1)))
            .unwrap();

        assert!(context.same_session(&other));
        assert_eq!(other.read(|r| r.metrics().total_agents), 1);
    }

    #[test]
    fn shutdown_refuses_mutations_but_allows_reads() {
        let context = OrchestrationContext::default();
        context
            .mutate(|r| Ok(r.create_task(TaskDefinition::new("before"))))
            .unwrap();

        context.shutdown();
        context.shutdown();

        let err = context
            .mutate(|r| Ok(r.create_task(TaskDefinition::new("after"))))
            .unwrap_err();
        assert_eq!(err, RegistryError::ShutDown);
        assert!(context.shutdown_token().is_cancelled());
        assert_eq!(context.read(|r| r.queue_size()), 1);
    }
}
