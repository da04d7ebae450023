//! Loading and validating the set of configured queues

use crate::config::endpoint::{
    BrokerFamily, ProcessingMode, QueueEndpoint, DEFAULT_POLL_INTERVAL, DEFAULT_REPLY_TIMEOUT,
};
use crate::config::error::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    queue: Vec<RawEndpoint>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEndpoint {
    id: Option<String>,
    broker: Option<String>,
    processing_mode: Option<String>,
    poll_interval_ms: Option<u64>,
    reply_timeout_ms: Option<u64>,
    transactional: Option<bool>,
    #[serde(default)]
    params: BTreeMap<String, toml::Value>,
}

impl RawEndpoint {
    fn into_endpoint(self, index: usize) -> ConfigResult<QueueEndpoint> {
        let id = match self.id {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            Some(_) => return Err(ConfigError::EmptyId { index }),
            None => {
                return Err(ConfigError::MissingField {
                    queue_id: format!("#{index}"),
                    field: "id".to_string(),
                })
            }
        };

        let broker_name = self.broker.ok_or_else(|| ConfigError::MissingField {
            queue_id: id.clone(),
            field: "broker".to_string(),
        })?;
        let broker =
            BrokerFamily::from_str(broker_name.trim()).map_err(|_| ConfigError::InvalidValue {
                queue_id: id.clone(),
                field: "broker".to_string(),
                value: broker_name.clone(),
                reason: "expected one of memory, rabbitmq, kafka, activemq, servicebus"
                    .to_string(),
            })?;

        let mode_name = self.processing_mode.ok_or_else(|| ConfigError::MissingField {
            queue_id: id.clone(),
            field: "processing_mode".to_string(),
        })?;
        let processing_mode =
            ProcessingMode::from_str(mode_name.trim()).map_err(|_| ConfigError::InvalidValue {
                queue_id: id.clone(),
                field: "processing_mode".to_string(),
                value: mode_name.clone(),
                reason: "expected thread_polling, subscribe or subscribe_and_reply".to_string(),
            })?;

        let params = self
            .params
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    toml::Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect();

        let endpoint = QueueEndpoint {
            id,
            broker,
            processing_mode,
            poll_interval: self
                .poll_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_POLL_INTERVAL),
            reply_timeout: self
                .reply_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_REPLY_TIMEOUT),
            transactional: self.transactional.unwrap_or(false),
            params,
        };
        Ok(endpoint)
    }
}

/// Validated, immutable collection of queue endpoints
///
/// Built once at startup. Lookups are by queue id; iteration keeps the order
/// the endpoints were configured in.
#[derive(Debug, Clone, Default)]
pub struct EndpointSet {
    endpoints: Vec<QueueEndpoint>,
    index: HashMap<String, usize>,
}

impl EndpointSet {
    /// Validate endpoints built in code
    pub fn from_endpoints(endpoints: Vec<QueueEndpoint>) -> ConfigResult<Self> {
        let mut index = HashMap::with_capacity(endpoints.len());
        for (position, endpoint) in endpoints.iter().enumerate() {
            if endpoint.id.trim().is_empty() {
                return Err(ConfigError::EmptyId { index: position });
            }
            endpoint.validate()?;
            if index.insert(endpoint.id.clone(), position).is_some() {
                return Err(ConfigError::DuplicateId {
                    queue_id: endpoint.id.clone(),
                });
            }
        }
        log::debug!("Validated {} queue endpoint(s)", endpoints.len());
        Ok(Self { endpoints, index })
    }

    /// Parse a `[[queue]]` TOML document
    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        Self::parse(contents, "<inline>")
    }

    /// Read and parse a TOML configuration file
    pub async fn load(path: &Path) -> ConfigResult<Self> {
        let display = path.display().to_string();
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| ConfigError::FileRead {
                    path: display.clone(),
                    message: e.to_string(),
                })?;
        log::debug!("Loaded queue configuration from {}", display);
        Self::parse(&contents, &display)
    }

    fn parse(contents: &str, origin: &str) -> ConfigResult<Self> {
        let raw: RawConfig = toml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.message().to_string(),
        })?;

        let endpoints = raw
            .queue
            .into_iter()
            .enumerate()
            .map(|(index, entry)| entry.into_endpoint(index))
            .collect::<ConfigResult<Vec<_>>>()?;

        Self::from_endpoints(endpoints)
    }

    pub fn get(&self, queue_id: &str) -> Option<&QueueEndpoint> {
        self.index.get(queue_id).map(|&i| &self.endpoints[i])
    }

    /// Lookup that reports unknown ids as configuration errors
    pub fn require(&self, queue_id: &str) -> ConfigResult<&QueueEndpoint> {
        self.get(queue_id).ok_or_else(|| ConfigError::UnknownQueue {
            queue_id: queue_id.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueueEndpoint> {
        self.endpoints.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.endpoints.iter().map(|e| e.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
