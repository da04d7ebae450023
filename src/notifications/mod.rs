//! Lifecycle notifications
//!
//! Reactors report start, stop and dispatch failures as [`Event`]s. The host
//! (or a test) subscribes with an [`EventFilter`] and reads events from an
//! unbounded channel. The manager is an ordinary value handed to the
//! components that publish; there is no global instance.

mod error;
mod event;
mod manager;
mod statistics;

pub use error::NotificationError;
pub use event::{
    Event, EventFilter, ReactorEvent, ReactorEventType, SystemEvent, SystemEventType,
};
pub use manager::AsyncNotificationManager;
pub use statistics::SubscriberStatistics;
