//! Frame encoder dan stream serializer
//!
//! Encode langsung ke pre-allocated buffer, lalu satu kali write ke sink.
//! Tidak ada alokasi setelah inisialisasi dan tidak ada buffering antar frame.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use zerocopy::IntoBytes;

use super::message::{FrameConfig, FrameHeader, Message, HEADER_SIZE, PREFIX_SIZE};
use crate::bridge::ForwardSubscriber;
use crate::core::{Registry, Subscription};
use crate::error::{BrokerResult, StreamError, StreamResult};
use crate::transport::{write_all_bytes, ByteSink};

/// Default kapasitas buffer encoder (64KB payload + overhead)
pub const DEFAULT_ENCODER_CAPACITY: usize = 64 * 1024 + 16;

#[inline(always)]
fn payload_len_field(payload: &[u8]) -> StreamResult<u32> {
    u32::try_from(payload.len()).map_err(|_| StreamError::PayloadTooLarge(payload.len()))
}

/// Tulis satu frame ke sink: prefix, header, payload, postfix
///
/// Partial write diulang sampai selesai. Returns jumlah byte frame.
pub fn write_frame<W: ByteSink + ?Sized>(
    sink: &mut W,
    config: &FrameConfig,
    type_id: u32,
    payload: &[u8],
) -> StreamResult<usize> {
    let header = FrameHeader::new(type_id, payload_len_field(payload)?);

    if let Some(prefix) = config.prefix {
        write_all_bytes(sink, &prefix.to_ne_bytes())?;
    }
    write_all_bytes(sink, header.as_bytes())?;
    write_all_bytes(sink, payload)?;
    if let Some(postfix) = config.postfix {
        write_all_bytes(sink, &[postfix])?;
    }

    Ok(config.frame_len(payload.len()))
}

/// Pre-allocated frame encoder
pub struct FrameEncoder {
    buffer: Box<[u8]>,
    config: FrameConfig,
}

impl FrameEncoder {
    /// Membuat encoder dengan buffer size tertentu
    pub fn new(capacity: usize, config: FrameConfig) -> Self {
        Self {
            buffer: vec![0u8; capacity].into_boxed_slice(),
            config,
        }
    }

    /// Encode satu frame ke buffer internal
    ///
    /// Returns slice ke frame, atau None jika frame lebih besar dari buffer.
    #[inline(always)]
    pub fn encode(&mut self, type_id: u32, payload: &[u8]) -> Option<&[u8]> {
        let total = self.config.frame_len(payload.len());
        if total > self.buffer.len() {
            return None;
        }
        let payload_len = u32::try_from(payload.len()).ok()?;

        let mut pos = 0;
        if let Some(prefix) = self.config.prefix {
            self.buffer[..PREFIX_SIZE].copy_from_slice(&prefix.to_ne_bytes());
            pos = PREFIX_SIZE;
        }

        let header = FrameHeader::new(type_id, payload_len);
        self.buffer[pos..pos + HEADER_SIZE].copy_from_slice(header.as_bytes());
        pos += HEADER_SIZE;

        self.buffer[pos..pos + payload.len()].copy_from_slice(payload);
        pos += payload.len();

        if let Some(postfix) = self.config.postfix {
            self.buffer[pos] = postfix;
            pos += 1;
        }

        Some(&self.buffer[..pos])
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}

/// Konfigurasi serializer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializerConfig {
    pub frame: FrameConfig,
    /// Ukuran buffer encoder; frame yang lebih besar ditulis per bagian
    pub encoder_capacity: usize,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            encoder_capacity: DEFAULT_ENCODER_CAPACITY,
        }
    }
}

/// Statistik serializer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerializerStats {
    pub frames_written: u64,
    pub bytes_written: u64,
    pub failed_writes: u64,
}

/// Serialisasi data bertipe ke byte sink, satu frame per `forward()`
///
/// Pasangannya adalah [`StreamDeserializer`](super::StreamDeserializer) dengan
/// [`FrameConfig`] yang sama.
pub struct StreamSerializer<W: ByteSink> {
    registry: Registry,
    sink: RefCell<W>,
    encoder: RefCell<FrameEncoder>,
    stats: Cell<SerializerStats>,
}

impl<W: ByteSink> StreamSerializer<W> {
    pub fn new(registry: &Registry, sink: W) -> Self {
        Self::with_config(registry, sink, SerializerConfig::default())
    }

    pub fn with_config(registry: &Registry, sink: W, config: SerializerConfig) -> Self {
        Self {
            registry: registry.clone(),
            sink: RefCell::new(sink),
            encoder: RefCell::new(FrameEncoder::new(config.encoder_capacity, config.frame)),
            stats: Cell::new(SerializerStats::default()),
        }
    }

    /// Frame dan tulis `data` ke sink
    ///
    /// Type id diambil dari registry. Error transport dikembalikan apa adanya.
    pub fn forward<T: Message>(&self, data: &T) -> StreamResult<usize> {
        let type_id = self.registry.type_id::<T>();
        let result = self.write(type_id, data.as_bytes());

        let mut stats = self.stats.get();
        match &result {
            Ok(n) => {
                stats.frames_written += 1;
                stats.bytes_written += *n as u64;
                tracing::trace!(
                    type_name = self.registry.type_name::<T>(),
                    type_id,
                    bytes = *n,
                    "frame written"
                );
            }
            Err(_) => stats.failed_writes += 1,
        }
        self.stats.set(stats);
        result
    }

    fn write(&self, type_id: u32, payload: &[u8]) -> StreamResult<usize> {
        let mut encoder = self.encoder.borrow_mut();
        let mut sink = self.sink.borrow_mut();
        let config = *encoder.config();

        match encoder.encode(type_id, payload) {
            Some(frame) => {
                write_all_bytes(&mut *sink, frame)?;
                Ok(frame.len())
            }
            // Frame lebih besar dari buffer encoder: tulis per bagian
            None => write_frame(&mut *sink, &config, type_id, payload),
        }
    }

    /// Flush sink
    pub fn flush(&self) -> StreamResult<()> {
        self.sink.borrow_mut().flush_bytes()?;
        Ok(())
    }

    /// Buat outbound bridge: setiap `T` yang di-publish lokal diteruskan ke stream ini
    pub fn forward_subscribe<T: Message>(self: &Rc<Self>) -> BrokerResult<Subscription<T>>
    where
        W: 'static,
    {
        self.registry
            .subscribe::<T, _>(Rc::new(ForwardSubscriber::<T, W>::new(Rc::clone(self))))
    }

    pub fn stats(&self) -> SerializerStats {
        self.stats.get()
    }

    pub fn frame_config(&self) -> FrameConfig {
        *self.encoder.borrow().config()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Akses sink (misal untuk inspeksi pada test)
    pub fn with_sink<R>(&self, f: impl FnOnce(&mut W) -> R) -> R {
        f(&mut *self.sink.borrow_mut())
    }

    pub fn into_inner(self) -> W {
        self.sink.into_inner()
    }
}
