//! Event types for the notification system

use crate::reactor::ReactorKind;
use std::time::SystemTime;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReactorEventType {
    Started,
    Stopped,
    HandlerFailed,
    ReplySuppressed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SystemEventType {
    Startup,
    Shutdown,
}

/// Lifecycle or dispatch event raised by a reactor
#[derive(Clone, Debug)]
pub struct ReactorEvent {
    pub event_type: ReactorEventType,
    pub timestamp: SystemTime,
    pub queue_id: String,
    pub reactor: ReactorKind,
    pub message: Option<String>,
}

impl ReactorEvent {
    pub fn new(event_type: ReactorEventType, queue_id: String, reactor: ReactorKind) -> Self {
        Self {
            event_type,
            timestamp: SystemTime::now(),
            queue_id,
            reactor,
            message: None,
        }
    }

    pub fn with_message(
        event_type: ReactorEventType,
        queue_id: String,
        reactor: ReactorKind,
        message: String,
    ) -> Self {
        Self {
            event_type,
            timestamp: SystemTime::now(),
            queue_id,
            reactor,
            message: Some(message),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SystemEvent {
    pub event_type: SystemEventType,
    pub timestamp: SystemTime,
    pub message: Option<String>,
}

impl SystemEvent {
    pub fn new(event_type: SystemEventType) -> Self {
        Self {
            event_type,
            timestamp: SystemTime::now(),
            message: None,
        }
    }

    pub fn with_message(event_type: SystemEventType, message: String) -> Self {
        Self {
            event_type,
            timestamp: SystemTime::now(),
            message: Some(message),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Event {
    Reactor(ReactorEvent),
    System(SystemEvent),
}

impl Event {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Event::Reactor(_) => "Reactor",
            Event::System(_) => "System",
        }
    }
}

/// Which events a subscriber wants
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventFilter {
    ReactorOnly,
    SystemOnly,
    /// Reactor events for one queue
    Queue(String),
    All,
}

impl EventFilter {
    pub fn accepts(&self, event: &Event) -> bool {
        match (self, event) {
            (EventFilter::All, _) => true,
            (EventFilter::ReactorOnly, Event::Reactor(_)) => true,
            (EventFilter::SystemOnly, Event::System(_)) => true,
            (EventFilter::Queue(queue_id), Event::Reactor(e)) => &e.queue_id == queue_id,
            _ => false,
        }
    }
}
