//! Sub0Pub - Type-Keyed Publish/Subscribe Broker
//!
//! Arsitektur:
//! - Type-Keyed: satu broker per tipe data, routing di compile time
//! - Synchronous: `publish()` memanggil semua subscriber sebelum return
//! - Fixed Capacity: tabel subscriber dan buffer dialokasikan sekali
//! - Stream Bridging: broker lokal bisa di-bridge ke byte stream (file, TCP, serial)
//!
//! ```
//! use sub0pub::core::Registry;
//!
//! let registry = Registry::new();
//! let _sub = registry.subscribe_fn::<u32, _>(|v| println!("got {v}")).unwrap();
//! registry.publisher::<u32>().publish(&3141);
//! ```

pub mod bridge;
pub mod core;
pub mod error;
pub mod protocol;
pub mod transport;

mod contract;

pub use crate::core::{publish, Publisher, Publishes, Registry, Subscribe, Subscription};
pub use crate::error::{BrokerError, StreamError};
pub use crate::protocol::{Message, StreamDeserializer, StreamSerializer};
