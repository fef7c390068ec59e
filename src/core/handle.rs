//! Publisher/Subscription handles
//!
//! Handle mengikat diri ke broker saat dibuat:
//! - [`Publisher`] hanya divalidasi, tidak menempati tabel subscriber
//! - [`Subscription`] adalah RAII guard, drop = deregistrasi

use std::fmt;
use std::rc::Rc;

use super::broker::{Broker, SubscriberToken, Subscribe};

/// Capability untuk mem-publish data bertipe `T`
pub struct Publisher<T: 'static> {
    broker: Rc<Broker<T>>,
}

impl<T: 'static> Publisher<T> {
    pub(crate) fn new(broker: Rc<Broker<T>>) -> Self {
        broker.register_publisher();
        Self { broker }
    }

    /// Publish data ke semua subscriber tipe `T`
    ///
    /// Returns jumlah subscriber yang menerima.
    #[inline(always)]
    pub fn publish(&self, data: &T) -> usize {
        tracing::trace!(broker = self.broker.type_name(), "publish");
        self.broker.publish(data)
    }

    pub fn type_id(&self) -> u32 {
        self.broker.type_id()
    }

    pub fn type_name(&self) -> &'static str {
        self.broker.type_name()
    }

    pub fn broker(&self) -> &Rc<Broker<T>> {
        &self.broker
    }
}

impl<T: 'static> Clone for Publisher<T> {
    fn clone(&self) -> Self {
        Self::new(Rc::clone(&self.broker))
    }
}

impl<T: 'static> fmt::Debug for Publisher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Publisher<{}>", self.type_name())
    }
}

/// Registrasi subscriber yang aktif
///
/// Drop guard ini menghapus subscriber dari broker. Jangan drop dari dalam
/// `receive()` broker yang sama (re-entrant removal tidak didukung).
#[must_use = "dropping a Subscription unregisters the subscriber immediately"]
pub struct Subscription<T: 'static> {
    broker: Rc<Broker<T>>,
    token: SubscriberToken,
}

impl<T: 'static> Subscription<T> {
    pub(crate) fn new(broker: Rc<Broker<T>>, token: SubscriberToken) -> Self {
        Self { broker, token }
    }

    pub fn token(&self) -> SubscriberToken {
        self.token
    }

    pub fn type_id(&self) -> u32 {
        self.broker.type_id()
    }

    pub fn type_name(&self) -> &'static str {
        self.broker.type_name()
    }
}

impl<T: 'static> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Err(err) = self.broker.unregister_subscriber(self.token) {
            tracing::warn!(error = %err, "subscription drop failed to unregister");
        }
    }
}

impl<T: 'static> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subscription<{}>#{}", self.type_name(), self.token.value())
    }
}

/// Subscriber dari closure
pub struct FnSubscriber<F>(pub F);

impl<T, F: Fn(&T)> Subscribe<T> for FnSubscriber<F> {
    #[inline(always)]
    fn receive(&self, data: &T) {
        (self.0)(data)
    }
}

/// Producer yang memegang satu atau lebih [`Publisher`] sebagai field
///
/// Implementasikan sekali per tipe, lalu pakai [`publish`] untuk memilih
/// publisher berdasarkan tipe data.
pub trait Publishes<T: 'static> {
    fn publisher(&self) -> &Publisher<T>;
}

/// Publish lewat capability `Publisher<T>` milik producer
///
/// Tipe `T` dari `data` yang menentukan publisher mana yang dipakai.
#[inline(always)]
pub fn publish<T: 'static, P: Publishes<T> + ?Sized>(producer: &P, data: &T) -> usize {
    producer.publisher().publish(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_subscription_drop_unregisters() {
        let broker = Rc::new(Broker::<u32>::new(2));
        let hits = Rc::new(Cell::new(0u32));

        let sink = Rc::clone(&hits);
        let token = broker
            .register_subscriber(Rc::new(FnSubscriber(move |d: &u32| {
                sink.set(sink.get() + d)
            })))
            .unwrap();
        let subscription = Subscription::new(Rc::clone(&broker), token);
        let publisher = Publisher::new(Rc::clone(&broker));

        publisher.publish(&5);
        drop(subscription);
        publisher.publish(&5);

        assert_eq!(hits.get(), 5);
        assert_eq!(broker.subscriber_count(), 0);
    }

    #[test]
    fn test_publish_helper_selects_by_type() {
        struct Producer {
            floats: Publisher<f32>,
            ints: Publisher<i32>,
        }

        impl Publishes<f32> for Producer {
            fn publisher(&self) -> &Publisher<f32> {
                &self.floats
            }
        }

        impl Publishes<i32> for Producer {
            fn publisher(&self) -> &Publisher<i32> {
                &self.ints
            }
        }

        let floats = Rc::new(Broker::<f32>::new(1));
        let ints = Rc::new(Broker::<i32>::new(1));
        let total = Rc::new(Cell::new(0.0f32));

        let t = Rc::clone(&total);
        floats
            .register_subscriber(Rc::new(FnSubscriber(move |d: &f32| t.set(t.get() + d))))
            .unwrap();
        let t = Rc::clone(&total);
        ints.register_subscriber(Rc::new(FnSubscriber(move |d: &i32| {
            t.set(t.get() + *d as f32)
        })))
        .unwrap();

        let producer = Producer {
            floats: Publisher::new(Rc::clone(&floats)),
            ints: Publisher::new(Rc::clone(&ints)),
        };

        assert_eq!(publish(&producer, &1.5f32), 1);
        assert_eq!(publish(&producer, &2i32), 1);
        assert_eq!(total.get(), 3.5);
    }
}
