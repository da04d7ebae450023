//! Adapter construction per broker family

use crate::adapter::memory::{MemoryAdapter, MemoryBroker};
use crate::adapter::traits::{Capabilities, QueueAdapter};
use crate::config::{BrokerFamily, ConfigError, ConfigResult, QueueEndpoint};
use std::collections::HashMap;
use std::sync::Arc;

/// Builds adapters for one broker family
pub trait AdapterProvider: Send + Sync {
    fn family(&self) -> BrokerFamily;

    /// Build an unconnected adapter for `endpoint`
    fn create(&self, endpoint: &QueueEndpoint) -> ConfigResult<Arc<dyn QueueAdapter>>;
}

/// Providers keyed by broker family
///
/// Constructed once by the host and passed to whatever needs adapters.
#[derive(Default)]
pub struct AdapterRegistry {
    providers: HashMap<BrokerFamily, Arc<dyn AdapterProvider>>,
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut families: Vec<_> = self.providers.keys().collect();
        families.sort();
        f.debug_struct("AdapterRegistry")
            .field("families", &families)
            .finish()
    }
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider. Each family can have only one.
    pub fn register(&mut self, provider: Arc<dyn AdapterProvider>) -> ConfigResult<()> {
        let family = provider.family();
        if self.providers.contains_key(&family) {
            return Err(ConfigError::DuplicateProvider { broker: family });
        }
        log::debug!("Registered adapter provider for '{}'", family);
        self.providers.insert(family, provider);
        Ok(())
    }

    pub fn has_provider(&self, family: BrokerFamily) -> bool {
        self.providers.contains_key(&family)
    }

    /// Validate `endpoint` and build its adapter
    pub fn resolve(&self, endpoint: &QueueEndpoint) -> ConfigResult<Arc<dyn QueueAdapter>> {
        let provider = self
            .providers
            .get(&endpoint.broker)
            .ok_or(ConfigError::UnknownProvider {
                broker: endpoint.broker,
            })?;
        endpoint.validate()?;
        provider.create(endpoint)
    }
}

/// Builds [`MemoryAdapter`]s on a shared broker
///
/// The capability set comes from the endpoint: `transactional` from its flag,
/// push and duplex support from the `push` and `duplex` params (both on unless
/// set to false).
#[derive(Debug, Clone)]
pub struct MemoryProvider {
    family: BrokerFamily,
    broker: MemoryBroker,
}

impl MemoryProvider {
    pub fn new(broker: MemoryBroker) -> Self {
        Self::for_family(BrokerFamily::Memory, broker)
    }

    /// Serve another family's endpoints from the memory broker
    pub fn for_family(family: BrokerFamily, broker: MemoryBroker) -> Self {
        Self { family, broker }
    }

    pub fn capabilities_for(endpoint: &QueueEndpoint) -> Capabilities {
        Capabilities {
            subscribing: endpoint.flag_param("push", true),
            transactional: endpoint.transactional,
            duplex: endpoint.flag_param("duplex", true),
        }
    }
}

impl AdapterProvider for MemoryProvider {
    fn family(&self) -> BrokerFamily {
        self.family
    }

    fn create(&self, endpoint: &QueueEndpoint) -> ConfigResult<Arc<dyn QueueAdapter>> {
        let capabilities = Self::capabilities_for(endpoint);
        log::debug!(
            "Creating memory adapter for '{}' ({})",
            endpoint.id,
            capabilities
        );
        Ok(Arc::new(MemoryAdapter::new(
            endpoint.clone(),
            self.broker.clone(),
            capabilities,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessingMode;

    #[test]
    fn test_resolve_unknown_family() {
        let registry = AdapterRegistry::new();
        let endpoint = QueueEndpoint::new("orders", BrokerFamily::Kafka, ProcessingMode::Subscribe);

        let err = registry.resolve(&endpoint).err().unwrap();
        assert_eq!(
            err,
            ConfigError::UnknownProvider {
                broker: BrokerFamily::Kafka
            }
        );
    }

    #[test]
    fn test_duplicate_provider_rejected() {
        let broker = MemoryBroker::new();
        let mut registry = AdapterRegistry::new();
        registry
            .register(Arc::new(MemoryProvider::new(broker.clone())))
            .unwrap();
        assert!(registry.has_provider(BrokerFamily::Memory));
        assert!(!registry.has_provider(BrokerFamily::Kafka));

        let err = registry
            .register(Arc::new(MemoryProvider::new(broker)))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::DuplicateProvider {
                broker: BrokerFamily::Memory
            }
        );
    }

    #[test]
    fn test_memory_capabilities_follow_endpoint() {
        let broker = MemoryBroker::new();
        let mut registry = AdapterRegistry::new();
        registry
            .register(Arc::new(MemoryProvider::new(broker)))
            .unwrap();

        let plain = QueueEndpoint::new("a", BrokerFamily::Memory, ProcessingMode::ThreadPolling)
            .with_param("push", "false")
            .with_param("duplex", "false");
        assert_eq!(registry.resolve(&plain).unwrap().capabilities(), Capabilities::NONE);

        let transacted = QueueEndpoint::new("b", BrokerFamily::Memory, ProcessingMode::Subscribe)
            .with_transactional(true);
        assert_eq!(
            registry.resolve(&transacted).unwrap().capabilities(),
            Capabilities::ALL
        );
    }

    #[test]
    fn test_resolve_validates_endpoint() {
        let broker = MemoryBroker::new();
        let mut registry = AdapterRegistry::new();
        registry
            .register(Arc::new(MemoryProvider::for_family(BrokerFamily::RabbitMq, broker)))
            .unwrap();

        let endpoint = QueueEndpoint::new("orders", BrokerFamily::RabbitMq, ProcessingMode::Subscribe)
            .with_param("host", "amqp://localhost");

        assert!(matches!(
            registry.resolve(&endpoint),
            Err(ConfigError::MissingParameter { .. })
        ));
    }
}
