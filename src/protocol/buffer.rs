//! Buffer registry sisi penerima
//!
//! Mapping `type_id -> buffer` yang selalu terurut, sehingga lookup saat header
//! selesai dibaca cukup binary search O(log n). Insert memakai shift (bukan
//! append + sort) dan kapasitas dialokasikan sekali di awal.

use crate::contract::violation;
use crate::error::{StreamError, StreamResult};

/// Batas default jumlah tipe per deserializer
pub const DEFAULT_MAX_BUFFERS: usize = 64;

/// Tujuan payload untuk satu type id
///
/// Deserializer menulis payload langsung ke [`DataBuffer::buffer`], lalu memanggil
/// [`DataBuffer::complete`] setelah frame utuh (termasuk postfix) diterima.
pub trait DataBuffer {
    /// Type id yang dilayani buffer ini
    fn type_id(&self) -> u32;

    /// Nama untuk diagnostik
    fn type_name(&self) -> &'static str {
        "<raw>"
    }

    /// Buffer tujuan, panjangnya harus sama dengan `buffer_len()`
    fn buffer(&mut self) -> &mut [u8];

    fn buffer_len(&self) -> usize;

    /// Notifikasi buffer sudah terisi penuh
    fn complete(&mut self);
}

/// Buffer mentah + callback completion
pub struct CallbackBuffer<F> {
    type_id: u32,
    bytes: Box<[u8]>,
    on_complete: F,
}

impl<F: FnMut(&[u8])> CallbackBuffer<F> {
    /// Alokasi buffer `len` bytes (sekali, saat setup)
    pub fn new(type_id: u32, len: usize, on_complete: F) -> Self {
        Self {
            type_id,
            bytes: vec![0u8; len].into_boxed_slice(),
            on_complete,
        }
    }
}

impl<F: FnMut(&[u8])> DataBuffer for CallbackBuffer<F> {
    fn type_id(&self) -> u32 {
        self.type_id
    }

    fn buffer(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    fn buffer_len(&self) -> usize {
        self.bytes.len()
    }

    fn complete(&mut self) {
        (self.on_complete)(&self.bytes[..])
    }
}

/// Entry registry. Type id dan panjang di-cache saat registrasi.
struct Entry {
    type_id: u32,
    len: usize,
    buffer: Box<dyn DataBuffer>,
}

/// Registry buffer terurut berdasarkan type id
pub struct BufferRegistry {
    entries: Vec<Entry>,
    capacity: usize,
}

impl BufferRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Sorted insert
    ///
    /// Type id duplikat atau registry penuh adalah contract violation.
    pub fn register(&mut self, buffer: Box<dyn DataBuffer>) -> StreamResult<()> {
        if self.entries.len() >= self.capacity {
            return Err(violation(StreamError::RegistryFull(self.capacity)));
        }

        let type_id = buffer.type_id();
        match self.entries.binary_search_by_key(&type_id, |e| e.type_id) {
            Ok(_) => Err(violation(StreamError::DuplicateType(type_id))),
            Err(pos) => {
                tracing::trace!(
                    type_id,
                    type_name = buffer.type_name(),
                    len = buffer.buffer_len(),
                    "buffer registered"
                );
                self.entries.insert(
                    pos,
                    Entry {
                        type_id,
                        len: buffer.buffer_len(),
                        buffer,
                    },
                );
                Ok(())
            }
        }
    }

    /// Binary search, `None` jika type id tidak terdaftar
    #[inline(always)]
    pub fn lookup(&self, type_id: u32) -> Option<usize> {
        self.entries
            .binary_search_by_key(&type_id, |e| e.type_id)
            .ok()
    }

    #[inline(always)]
    pub(crate) fn len_of(&self, index: usize) -> usize {
        self.entries[index].len
    }

    #[inline(always)]
    pub(crate) fn buffer_mut(&mut self, index: usize) -> &mut [u8] {
        self.entries[index].buffer.buffer()
    }

    #[inline]
    pub(crate) fn complete(&mut self, index: usize) {
        self.entries[index].buffer.complete()
    }

    pub(crate) fn name_of(&self, index: usize) -> &'static str {
        self.entries[index].buffer.type_name()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Type id terdaftar, terurut naik
    pub fn type_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().map(|e| e.type_id)
    }
}
