//! Message envelope types
//!
//! Every adapter speaks [`Envelope`]. Broker-specific message shapes are the
//! adapter's concern; nothing above the adapter sees them.

mod envelope;
mod properties;

pub use envelope::{Envelope, Payload};
pub use properties::{Properties, PropertyValue};
