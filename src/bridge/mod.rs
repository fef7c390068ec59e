//! Forwarding adapters antara broker lokal dan byte stream
//!
//! - Outbound: [`ForwardSubscriber`] subscribe `T` lokal, tulis setiap data ke serializer
//! - Inbound: [`ForwardPublisher`] menerima frame `T` dari deserializer, publish lokal
//!
//! Keduanya komposisi biasa: adapter memegang `Rc<StreamSerializer>` atau memiliki
//! `Publisher<T>`, tanpa inheritance.

mod inbound;
mod outbound;

pub use inbound::ForwardPublisher;
pub use outbound::ForwardSubscriber;
