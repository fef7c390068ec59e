//! Inbound bridge: stream -> broker lokal
//!
//! Payload frame ditulis langsung ke buffer `T` milik adapter, lalu
//! di-publish ulang sebagai publikasi lokal biasa.

use std::fmt;
use std::mem;


use crate::core::{Publisher, Registry};
use crate::error::BrokerResult;
use crate::protocol::{DataBuffer, Message};

/// Publisher yang diisi dari stream
///
/// Payload frame ditulis langsung ke buffer `T` milik adapter ini; saat frame
/// selesai, isinya di-publish ke broker lokal seperti publikasi biasa.
pub struct ForwardPublisher<T: Message> {
    publisher: Publisher<T>,
    buffer: T,
}

impl<T: Message> ForwardPublisher<T> {
    pub fn new(registry: &Registry) -> Self {
        Self {
            publisher: registry.publisher::<T>(),
            buffer: T::new_zeroed(),
        }
    }

    /// Sama dengan [`new`](Self::new), sekaligus set nama tipe untuk type id
    pub fn named(registry: &Registry, name: &'static str) -> BrokerResult<Self> {
        Ok(Self {
            publisher: registry.publisher_named::<T>(name)?,
            buffer: T::new_zeroed(),
        })
    }

    /// Nilai terakhir yang diterima (zero sebelum frame pertama)
    pub fn last(&self) -> &T {
        &self.buffer
    }

    pub fn publisher(&self) -> &Publisher<T> {
        &self.publisher
    }
}

impl<T: Message> DataBuffer for ForwardPublisher<T> {
    fn type_id(&self) -> u32 {
        self.publisher.type_id()
    }

    fn type_name(&self) -> &'static str {
        self.publisher.type_name()
    }

    #[inline(always)]
    fn buffer(&mut self) -> &mut [u8] {
        self.buffer.as_mut_bytes()
    }

    fn buffer_len(&self) -> usize {
        mem::size_of::<T>()
    }

    #[inline]
    fn complete(&mut self) {
        self.publisher.publish(&self.buffer);
    }
}

impl<T: Message> fmt::Debug for ForwardPublisher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardPublisher")
            .field("type_name", &self.publisher.type_name())
            .field("type_id", &self.publisher.type_id())
            .finish()
    }
}
