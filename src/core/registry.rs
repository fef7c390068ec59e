//! Registry: satu broker per tipe, eksplisit (bukan static tersembunyi)
//!
//! Registry di-clone murah (Rc) dan dioper ke setiap konstruktor publisher,
//! subscriber, serializer, dan deserializer. Setiap test bisa membuat registry
//! sendiri tanpa kebocoran state antar test.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::broker::{Broker, Subscribe, DEFAULT_MAX_SUBSCRIBERS};
use super::handle::{FnSubscriber, Publisher, Subscription};
use crate::error::BrokerResult;

/// Konfigurasi registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Kapasitas tabel subscriber untuk setiap broker baru
    pub max_subscribers: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_subscribers: DEFAULT_MAX_SUBSCRIBERS,
        }
    }
}

struct Inner {
    config: RegistryConfig,
    brokers: RefCell<HashMap<TypeId, Rc<dyn Any>>>,
}

/// Process-wide (atau per-thread) registry broker
#[derive(Clone)]
pub struct Registry {
    inner: Rc<Inner>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            inner: Rc::new(Inner {
                config,
                brokers: RefCell::new(HashMap::new()),
            }),
        }
    }

    pub fn config(&self) -> RegistryConfig {
        self.inner.config
    }

    /// Broker untuk tipe `T`, dibuat saat pertama kali diminta
    pub fn broker<T: 'static>(&self) -> Rc<Broker<T>> {
        let mut brokers = self.inner.brokers.borrow_mut();
        let entry = brokers.entry(TypeId::of::<T>()).or_insert_with(|| {
            tracing::trace!(broker = std::any::type_name::<T>(), "broker created");
            Rc::new(Broker::<T>::new(self.inner.config.max_subscribers)) as Rc<dyn Any>
        });

        match Rc::clone(entry).downcast::<Broker<T>>() {
            Ok(broker) => broker,
            // Key TypeId::of::<T>() selalu menyimpan Broker<T>
            Err(_) => unreachable!("broker table holds a foreign type for {}", std::any::type_name::<T>()),
        }
    }

    /// Set identitas tipe `T` (id eksplisit dan/atau nama)
    pub fn set_identity<T: 'static>(
        &self,
        id: Option<u32>,
        name: Option<&'static str>,
    ) -> BrokerResult<()> {
        self.broker::<T>().set_identity(id, name)
    }

    pub fn type_id<T: 'static>(&self) -> u32 {
        // Bukan `Any::type_id`
        Broker::type_id(&self.broker::<T>())
    }

    pub fn type_name<T: 'static>(&self) -> &'static str {
        self.broker::<T>().type_name()
    }

    /// Buat publisher untuk `T`
    pub fn publisher<T: 'static>(&self) -> Publisher<T> {
        Publisher::new(self.broker::<T>())
    }

    /// Buat publisher dan sekaligus set nama tipe (portable untuk inter-process)
    pub fn publisher_named<T: 'static>(&self, name: &'static str) -> BrokerResult<Publisher<T>> {
        let broker = self.broker::<T>();
        broker.set_identity(None, Some(name))?;
        Ok(Publisher::new(broker))
    }

    /// Daftarkan subscriber untuk `T`
    ///
    /// Objek yang sama boleh didaftarkan ke beberapa tipe (satu `Rc`, beberapa `Subscription`).
    pub fn subscribe<T, S>(&self, subscriber: Rc<S>) -> BrokerResult<Subscription<T>>
    where
        T: 'static,
        S: Subscribe<T> + 'static,
    {
        let broker = self.broker::<T>();
        let token = broker.register_subscriber(subscriber)?;
        Ok(Subscription::new(broker, token))
    }

    /// Daftarkan subscriber dan set nama tipe
    pub fn subscribe_named<T, S>(
        &self,
        subscriber: Rc<S>,
        name: &'static str,
    ) -> BrokerResult<Subscription<T>>
    where
        T: 'static,
        S: Subscribe<T> + 'static,
    {
        self.broker::<T>().set_identity(None, Some(name))?;
        self.subscribe(subscriber)
    }

    /// Daftarkan closure sebagai subscriber
    pub fn subscribe_fn<T, F>(&self, f: F) -> BrokerResult<Subscription<T>>
    where
        T: 'static,
        F: Fn(&T) + 'static,
    {
        self.subscribe::<T, _>(Rc::new(FnSubscriber(f)))
    }

    /// Jumlah broker yang sudah dibuat
    pub fn broker_count(&self) -> usize {
        self.inner.brokers.borrow().len()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.inner.config)
            .field("brokers", &self.broker_count())
            .finish()
    }
}
