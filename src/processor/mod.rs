//! Processor Registry
//!
//! A processor is the application's handler for one queue. It either consumes
//! messages ([`Processor::Consume`]) or answers them ([`Processor::Reply`]).
//!
//! ```rust
//! use queuebridge::processor::{Processor, ProcessorRegistry};
//!
//! let registry = ProcessorRegistry::new();
//! registry
//!     .register(
//!         "orders",
//!         Processor::reply_fn(|request| async move { Ok(request.reply_with("accepted")) }),
//!     )
//!     .unwrap();
//!
//! assert!(registry.register("orders", Processor::consume_fn(|_| async { Ok(()) })).is_err());
//! ```

mod error;
mod registry;
mod traits;

pub use error::{RegistryError, RegistryResult};
pub use registry::{Processor, ProcessorKind, ProcessorRegistry, RegistrationHandle};
pub use traits::{
    ConsumeFn, HandlerError, HandlerResult, MessageHandler, ReplyFn, ReplyHandler,
};

#[cfg(test)]
mod tests;
