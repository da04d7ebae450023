//! Per-queue endpoint settings

use crate::config::error::{ConfigError, ConfigResult};
use std::collections::BTreeMap;
use std::time::Duration;
use strum_macros::{Display, EnumIter, EnumString};

/// Default wait used by polling reactors between empty receives
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default time a requester waits for a reply
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(30);

/// Broker technology behind a queue endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BrokerFamily {
    Memory,
    RabbitMq,
    Kafka,
    ActiveMq,
    ServiceBus,
}

impl BrokerFamily {
    /// Opaque parameters an endpoint of this family must carry
    pub fn required_params(&self) -> &'static [&'static str] {
        match self {
            BrokerFamily::Memory => &[],
            BrokerFamily::RabbitMq => &["host", "queue"],
            BrokerFamily::Kafka => &["bootstrap_servers", "topic", "group_id"],
            BrokerFamily::ActiveMq => &["broker_uri", "destination"],
            BrokerFamily::ServiceBus => &["connection_string", "entity_path"],
        }
    }
}

/// How the queue wants to be consumed
///
/// A transactional adapter overrides this and always gets polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum ProcessingMode {
    #[strum(to_string = "thread_polling", serialize = "polling")]
    ThreadPolling,
    #[strum(to_string = "subscribe")]
    Subscribe,
    #[strum(to_string = "subscribe_and_reply", serialize = "reply")]
    SubscribeAndReply,
}

/// Immutable settings for one queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEndpoint {
    pub id: String,
    pub broker: BrokerFamily,
    pub processing_mode: ProcessingMode,
    pub poll_interval: Duration,
    pub reply_timeout: Duration,
    pub transactional: bool,
    /// Broker-specific settings, passed through to the adapter untouched
    pub params: BTreeMap<String, String>,
}

impl QueueEndpoint {
    pub fn new(id: impl Into<String>, broker: BrokerFamily, processing_mode: ProcessingMode) -> Self {
        Self {
            id: id.into(),
            broker,
            processing_mode,
            poll_interval: DEFAULT_POLL_INTERVAL,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            transactional: false,
            params: BTreeMap::new(),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_reply_timeout(mut self, reply_timeout: Duration) -> Self {
        self.reply_timeout = reply_timeout;
        self
    }

    pub fn with_transactional(mut self, transactional: bool) -> Self {
        self.transactional = transactional;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Boolean parameter lookup; anything other than true/false falls back to `default`
    pub fn flag_param(&self, key: &str, default: bool) -> bool {
        match self.param(key).map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "true" || v == "yes" || v == "1" => true,
            Some(v) if v == "false" || v == "no" || v == "0" => false,
            _ => default,
        }
    }

    /// Check the endpoint on its own, before any network I/O
    pub fn validate(&self) -> ConfigResult<()> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroDuration {
                queue_id: self.id.clone(),
                field: "poll_interval".to_string(),
            });
        }
        if self.reply_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration {
                queue_id: self.id.clone(),
                field: "reply_timeout".to_string(),
            });
        }

        for parameter in self.broker.required_params() {
            let present = self.param(parameter).is_some_and(|v| !v.trim().is_empty());
            if !present {
                return Err(ConfigError::MissingParameter {
                    queue_id: self.id.clone(),
                    broker: self.broker,
                    parameter: parameter.to_string(),
                });
            }
        }
        Ok(())
    }
}
