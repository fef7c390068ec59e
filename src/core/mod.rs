//! Core module: Type-Keyed Broker
//!
//! Prinsip desain:
//! - Satu broker per tipe data, dimiliki oleh [`Registry`] yang eksplisit
//! - Fixed capacity: tabel subscriber tidak tumbuh setelah dibuat
//! - Synchronous dispatch: tidak ada queue, tidak ada deferred delivery

mod broker;
mod handle;
pub mod identity;
mod registry;

pub use broker::{Broker, SubscriberToken, Subscribe, DEFAULT_MAX_SUBSCRIBERS};
pub use handle::{publish, FnSubscriber, Publisher, Publishes, Subscription};
pub use registry::{Registry, RegistryConfig};
