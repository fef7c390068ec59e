//! Per-Type Broker: tabel subscriber berkapasitas tetap + dispatch sinkron
//!
//! Prinsip desain:
//! - Fixed capacity: tabel dialokasikan sekali saat broker dibuat
//! - Synchronous fan-out: semua `receive()` selesai sebelum `publish()` return
//! - Deterministic order: subscriber dipanggil sesuai urutan registrasi
//!
//! Broker tidak thread-safe (Rc/RefCell). Satu broker = satu logical thread.

use std::any::type_name;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::identity::djb2;
use crate::contract::violation;
use crate::error::{BrokerError, BrokerResult};

/// Batas default subscriber per tipe
pub const DEFAULT_MAX_SUBSCRIBERS: usize = 8;

/// Capability untuk menerima data bertipe `T`
///
/// `receive` dipanggil di dalam konteks publisher, jadi harus cepat dan tidak blocking.
/// Jangan drop [`Subscription`](super::Subscription) broker yang sama dari dalam `receive`.
pub trait Subscribe<T> {
    /// Terima data yang di-publish
    fn receive(&self, data: &T);

    /// Filter sebelum dispatch. Default: terima semua.
    fn accepts(&self, _data: &T) -> bool {
        true
    }
}

/// Token registrasi subscriber, dipakai untuk deregistrasi
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberToken(u32);

impl SubscriberToken {
    pub fn value(self) -> u32 {
        self.0
    }
}

/// Slot dalam tabel subscriber
struct Slot<T> {
    token: SubscriberToken,
    subscriber: Rc<dyn Subscribe<T>>,
}

/// Broker untuk satu tipe data
pub struct Broker<T: 'static> {
    // Pre-allocated: Vec::with_capacity(capacity), tidak pernah tumbuh
    slots: RefCell<Vec<Slot<T>>>,
    capacity: usize,
    next_token: Cell<u32>,
    type_id: Cell<Option<u32>>,
    type_name: Cell<Option<&'static str>>,
    published: Cell<u64>,
}

impl<T: 'static> Broker<T> {
    /// Membuat broker dengan kapasitas subscriber tertentu
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: RefCell::new(Vec::with_capacity(capacity)),
            capacity,
            next_token: Cell::new(0),
            type_id: Cell::new(None),
            type_name: Cell::new(None),
            published: Cell::new(0),
        }
    }

    /// Daftarkan subscriber di akhir tabel
    ///
    /// Gagal dengan [`BrokerError::CapacityExceeded`] jika tabel penuh.
    pub fn register_subscriber(
        &self,
        subscriber: Rc<dyn Subscribe<T>>,
    ) -> BrokerResult<SubscriberToken> {
        let mut slots = self
            .slots
            .try_borrow_mut()
            .map_err(|_| self.dispatch_in_progress())?;

        if slots.len() >= self.capacity {
            return Err(violation(BrokerError::CapacityExceeded {
                type_name: self.type_name(),
                capacity: self.capacity,
            }));
        }

        let token = SubscriberToken(self.next_token.get());
        self.next_token.set(token.0.wrapping_add(1));
        slots.push(Slot { token, subscriber });

        tracing::trace!(
            broker = self.type_name(),
            token = token.0,
            subscribers = slots.len(),
            "subscriber registered"
        );
        Ok(token)
    }

    /// Hapus subscriber, urutan sisa subscriber tetap
    pub fn unregister_subscriber(&self, token: SubscriberToken) -> BrokerResult<()> {
        let mut slots = self
            .slots
            .try_borrow_mut()
            .map_err(|_| self.dispatch_in_progress())?;

        let Some(index) = slots.iter().position(|slot| slot.token == token) else {
            return Err(violation(BrokerError::UnknownToken {
                type_name: self.type_name(),
                token: token.0,
            }));
        };
        slots.remove(index);

        tracing::trace!(
            broker = self.type_name(),
            token = token.0,
            subscribers = slots.len(),
            "subscriber removed"
        );
        Ok(())
    }

    /// Validasi publisher. Tidak ada catatan publisher yang disimpan.
    pub fn register_publisher(&self) {
        tracing::trace!(broker = self.type_name(), "publisher registered");
    }

    /// Kirim data ke semua subscriber yang menerima (accepts == true)
    ///
    /// Returns jumlah subscriber yang menerima data.
    #[inline(always)]
    pub fn publish(&self, data: &T) -> usize {
        self.published.set(self.published.get() + 1);

        let slots = self.slots.borrow();
        let mut delivered = 0;
        for slot in slots.iter() {
            if slot.subscriber.accepts(data) {
                slot.subscriber.receive(data);
                delivered += 1;
            }
        }
        delivered
    }

    /// Set identitas tipe (sekali saja)
    ///
    /// Nama tanpa id menghasilkan `id = djb2(name)`. Set ulang dengan nilai yang sama
    /// diperbolehkan, nilai berbeda adalah contract violation.
    pub fn set_identity(&self, id: Option<u32>, name: Option<&'static str>) -> BrokerResult<()> {
        if let (Some(existing), Some(requested)) = (self.type_name.get(), name) {
            if existing != requested {
                return Err(violation(BrokerError::NameConflict {
                    existing,
                    requested,
                }));
            }
        }

        // Id dari hash nama hanya jika belum ada id sama sekali
        let id = match (id, self.type_id.get()) {
            (Some(id), _) => Some(id),
            (None, Some(_)) => None,
            (None, None) => name.map(djb2),
        };
        if let (Some(existing), Some(requested)) = (self.type_id.get(), id) {
            if existing != requested {
                return Err(violation(BrokerError::IdConflict {
                    type_name: self.type_name(),
                    existing,
                    requested,
                }));
            }
        }

        if name.is_some() {
            self.type_name.set(name);
        }
        if id.is_some() {
            self.type_id.set(id);
        }

        tracing::debug!(
            broker = type_name::<T>(),
            type_id = self.type_id(),
            type_name = self.type_name(),
            "type identity assigned"
        );
        Ok(())
    }

    /// Type id untuk framing. Fallback ke hash `type_name::<T>()` (non-portable).
    #[inline]
    pub fn type_id(&self) -> u32 {
        self.type_id
            .get()
            .unwrap_or_else(|| djb2(type_name::<T>()))
    }

    /// Nama tipe. Fallback ke `type_name::<T>()`.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name.get().unwrap_or_else(type_name::<T>)
    }

    /// True jika id atau nama sudah diset eksplisit (aman untuk inter-process)
    pub fn has_explicit_identity(&self) -> bool {
        self.type_id.get().is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.slots.borrow().len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Jumlah panggilan publish() sejak broker dibuat
    pub fn published_count(&self) -> u64 {
        self.published.get()
    }

    fn dispatch_in_progress(&self) -> BrokerError {
        violation(BrokerError::DispatchInProgress {
            type_name: self.type_name(),
        })
    }
}

impl<T: 'static> fmt::Debug for Broker<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broker")
            .field("type_name", &self.type_name())
            .field("type_id", &format_args!("{:#010x}", self.type_id()))
            .field("subscribers", &self.slots.try_borrow().map(|s| s.len()).ok())
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Subscriber yang mencatat urutan pemanggilan ke log bersama
    struct Recorder {
        id: u32,
        log: Rc<RefCell<Vec<(u32, u32)>>>,
    }

    impl Subscribe<u32> for Recorder {
        fn receive(&self, data: &u32) {
            self.log.borrow_mut().push((self.id, *data));
        }
    }

    struct EvenOnly(Cell<u32>);

    impl Subscribe<u32> for EvenOnly {
        fn receive(&self, data: &u32) {
            self.0.set(self.0.get() + data);
        }

        fn accepts(&self, data: &u32) -> bool {
            data % 2 == 0
        }
    }

    fn recorder(id: u32, log: &Rc<RefCell<Vec<(u32, u32)>>>) -> Rc<dyn Subscribe<u32>> {
        Rc::new(Recorder {
            id,
            log: Rc::clone(log),
        })
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let broker: Broker<u32> = Broker::new(DEFAULT_MAX_SUBSCRIBERS);
        let log = Rc::new(RefCell::new(Vec::new()));

        for id in 1..=4 {
            broker.register_subscriber(recorder(id, &log)).unwrap();
        }

        assert_eq!(broker.publish(&7), 4);
        assert_eq!(*log.borrow(), vec![(1, 7), (2, 7), (3, 7), (4, 7)]);
    }

    #[test]
    fn test_filter_skips_only_rejecting_subscriber() {
        let broker: Broker<u32> = Broker::new(4);
        let log = Rc::new(RefCell::new(Vec::new()));
        let even = Rc::new(EvenOnly(Cell::new(0)));

        broker.register_subscriber(even.clone()).unwrap();
        broker.register_subscriber(recorder(1, &log)).unwrap();

        assert_eq!(broker.publish(&3), 1);
        assert_eq!(broker.publish(&4), 2);

        assert_eq!(even.0.get(), 4);
        assert_eq!(*log.borrow(), vec![(1, 3), (1, 4)]);
    }

    #[test]
    fn test_unregister_preserves_order() {
        let broker: Broker<u32> = Broker::new(4);
        let log = Rc::new(RefCell::new(Vec::new()));

        let tokens: Vec<_> = (1..=3)
            .map(|id| broker.register_subscriber(recorder(id, &log)).unwrap())
            .collect();

        broker.unregister_subscriber(tokens[1]).unwrap();
        broker.publish(&9);

        assert_eq!(*log.borrow(), vec![(1, 9), (3, 9)]);
        assert_eq!(broker.subscriber_count(), 2);
    }

    #[cfg(not(feature = "fatal-violations"))]
    #[test]
    fn test_capacity_is_enforced() {
        let broker: Broker<u32> = Broker::new(2);
        let log = Rc::new(RefCell::new(Vec::new()));

        broker.register_subscriber(recorder(1, &log)).unwrap();
        broker.register_subscriber(recorder(2, &log)).unwrap();
        let err = broker.register_subscriber(recorder(3, &log)).unwrap_err();

        assert!(matches!(err, BrokerError::CapacityExceeded { capacity: 2, .. }));
        // Subscriber ke-3 tidak menimpa slot mana pun
        broker.publish(&1);
        assert_eq!(*log.borrow(), vec![(1, 1), (2, 1)]);
    }

    #[cfg(feature = "fatal-violations")]
    #[test]
    #[should_panic(expected = "contract violation")]
    fn test_capacity_is_fatal() {
        let broker: Broker<u32> = Broker::new(1);
        let log = Rc::new(RefCell::new(Vec::new()));
        broker.register_subscriber(recorder(1, &log)).unwrap();
        let _ = broker.register_subscriber(recorder(2, &log));
    }

    #[cfg(not(feature = "fatal-violations"))]
    #[test]
    fn test_unknown_token() {
        let broker: Broker<u32> = Broker::new(2);
        let log = Rc::new(RefCell::new(Vec::new()));
        let token = broker.register_subscriber(recorder(1, &log)).unwrap();

        broker.unregister_subscriber(token).unwrap();
        assert!(matches!(
            broker.unregister_subscriber(token),
            Err(BrokerError::UnknownToken { .. })
        ));
    }

    #[test]
    fn test_identity_by_name() {
        let broker: Broker<f32> = Broker::new(1);
        assert!(!broker.has_explicit_identity());
        assert_eq!(broker.type_name(), "f32");
        assert_eq!(broker.type_id(), djb2("f32"));

        broker.set_identity(None, Some("float")).unwrap();
        assert_eq!(broker.type_name(), "float");
        assert_eq!(broker.type_id(), djb2("float"));

        // Nilai sama: boleh
        broker.set_identity(None, Some("float")).unwrap();
        broker.set_identity(None, None).unwrap();
        assert!(broker.has_explicit_identity());
    }

    #[test]
    fn test_identity_explicit_id_wins_over_name_hash() {
        let broker: Broker<f32> = Broker::new(1);
        broker.set_identity(Some(42), Some("float")).unwrap();
        assert_eq!(broker.type_id(), 42);
        assert_eq!(broker.type_name(), "float");
    }

    #[test]
    fn test_same_name_after_explicit_id_is_noop() {
        let broker: Broker<u32> = Broker::new(1);
        broker.set_identity(Some(42), Some("Tick")).unwrap();

        broker.set_identity(None, Some("Tick")).unwrap();
        assert_eq!(broker.type_id(), 42);
        assert_eq!(broker.type_name(), "Tick");

        // Id eksplisit dulu, nama belakangan: id tetap
        let late: Broker<u16> = Broker::new(1);
        late.set_identity(Some(7), None).unwrap();
        late.set_identity(None, Some("Short")).unwrap();
        assert_eq!(late.type_id(), 7);
        assert_eq!(late.type_name(), "Short");
    }

    #[cfg(not(feature = "fatal-violations"))]
    #[test]
    fn test_identity_conflict() {
        let broker: Broker<f32> = Broker::new(1);
        broker.set_identity(None, Some("float")).unwrap();

        assert!(matches!(
            broker.set_identity(None, Some("single")),
            Err(BrokerError::NameConflict { .. })
        ));
        assert!(matches!(
            broker.set_identity(Some(1), None),
            Err(BrokerError::IdConflict { .. })
        ));
        // Identitas lama tidak berubah
        assert_eq!(broker.type_name(), "float");
        assert_eq!(broker.type_id(), djb2("float"));
    }

    #[test]
    fn test_nested_publish_is_allowed() {
        struct Chain {
            broker: Rc<Broker<u32>>,
            seen: Cell<u32>,
        }

        impl Subscribe<u32> for Chain {
            fn receive(&self, data: &u32) {
                self.seen.set(self.seen.get() + 1);
                if *data > 0 {
                    self.broker.publish(&(data - 1));
                }
            }
        }

        let broker = Rc::new(Broker::<u32>::new(1));
        let chain = Rc::new(Chain {
            broker: Rc::clone(&broker),
            seen: Cell::new(0),
        });
        let token = broker.register_subscriber(chain.clone()).unwrap();

        broker.publish(&3);
        assert_eq!(chain.seen.get(), 4);
        assert_eq!(broker.published_count(), 4);

        // Putus cycle Rc broker <-> chain
        broker.unregister_subscriber(token).unwrap();
    }
}
