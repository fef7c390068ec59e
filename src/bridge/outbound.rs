//! Outbound bridge: broker lokal -> stream
//!
//! Subscriber yang `receive()`-nya persis `serializer.forward(data)`.

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::core::Subscribe;
use crate::protocol::{Message, StreamSerializer};
use crate::transport::ByteSink;

/// Subscriber yang meneruskan setiap `T` ke stream
///
/// `receive()` tidak bisa mengembalikan error, jadi kegagalan tulis di-log dan
/// dihitung di [`ForwardSubscriber::failures`] (juga di stats serializer).
///
/// Serializer memegang clone [`Registry`](crate::core::Registry), dan broker
/// memegang subscriber ini: siklus `Rc` diputus saat `Subscription` di-drop.
pub struct ForwardSubscriber<T, W: ByteSink> {
    serializer: Rc<StreamSerializer<W>>,
    failures: Cell<u64>,
    _marker: PhantomData<fn(&T)>,
}

impl<T: Message, W: ByteSink> ForwardSubscriber<T, W> {
    pub fn new(serializer: Rc<StreamSerializer<W>>) -> Self {
        Self {
            serializer,
            failures: Cell::new(0),
            _marker: PhantomData,
        }
    }

    pub fn serializer(&self) -> &Rc<StreamSerializer<W>> {
        &self.serializer
    }

    /// Jumlah forward yang gagal
    pub fn failures(&self) -> u64 {
        self.failures.get()
    }
}

impl<T: Message, W: ByteSink> Subscribe<T> for ForwardSubscriber<T, W> {
    #[inline]
    fn receive(&self, data: &T) {
        if let Err(e) = self.serializer.forward(data) {
            self.failures.set(self.failures.get() + 1);
            tracing::warn!(
                type_name = self.serializer.registry().type_name::<T>(),
                error = %e,
                "forward failed"
            );
        }
    }
}

impl<T: Message, W: ByteSink> fmt::Debug for ForwardSubscriber<T, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardSubscriber")
            .field("type_name", &self.serializer.registry().type_name::<T>())
            .field("failures", &self.failures.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Registry;
    use crate::protocol::FrameConfig;

    #[test]
    fn test_published_data_is_framed() {
        let registry = Registry::new();
        registry.set_identity::<u16>(Some(0x42), None).unwrap();
        let serializer = Rc::new(StreamSerializer::new(&registry, Vec::new()));
        let _bridge = serializer.forward_subscribe::<u16>().unwrap();

        let publisher = registry.publisher::<u16>();
        assert_eq!(publisher.publish(&5), 1);
        assert_eq!(publisher.publish(&6), 1);

        let frame_len = FrameConfig::default().frame_len(2);
        assert_eq!(serializer.with_sink(|sink| sink.len()), frame_len * 2);
        assert_eq!(serializer.stats().frames_written, 2);
    }

    #[test]
    fn test_drop_stops_forwarding() {
        let registry = Registry::new();
        let serializer = Rc::new(StreamSerializer::new(&registry, Vec::new()));
        let bridge = serializer.forward_subscribe::<u8>().unwrap();

        registry.publisher::<u8>().publish(&1);
        drop(bridge);
        assert_eq!(registry.publisher::<u8>().publish(&2), 0);

        assert_eq!(serializer.stats().frames_written, 1);
        // Siklus sudah putus: hanya `serializer` yang memegang Rc
        assert_eq!(Rc::strong_count(&serializer), 1);
    }

    #[test]
    fn test_failure_is_counted() {
        struct Closed;

        impl std::io::Write for Closed {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::ErrorKind::BrokenPipe.into())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let registry = Registry::new();
        let serializer = Rc::new(StreamSerializer::new(&registry, Closed));
        let forward = Rc::new(ForwardSubscriber::<u32, _>::new(Rc::clone(&serializer)));
        let _sub = registry.subscribe::<u32, _>(Rc::clone(&forward)).unwrap();

        registry.publisher::<u32>().publish(&9);
        assert_eq!(forward.failures(), 1);
        assert_eq!(serializer.stats().failed_writes, 1);
    }
}
