//! Incremental stream deserializer
//!
//! State machine siklik `Prefix -> Header -> Data -> Postfix -> Prefix`.
//! Setiap fase punya target buffer dengan ukuran tetap; byte dari source
//! ditulis langsung ke target itu (payload langsung ke buffer tujuan, tanpa
//! staging). Short read diakumulasi antar panggilan `feed()`.

use zerocopy::IntoBytes;

use super::buffer::{BufferRegistry, CallbackBuffer, DataBuffer, DEFAULT_MAX_BUFFERS};
use super::message::{FrameConfig, FrameHeader, Message, POSTFIX_SIZE, PREFIX_SIZE};
use crate::bridge::ForwardPublisher;
use crate::contract::violation;
use crate::core::Registry;
use crate::error::{StreamError, StreamResult};
use crate::transport::ByteSource;

const DISCARD_CHUNK: usize = 64;

/// Fase deserializer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Prefix,
    Header,
    Data,
    Postfix,
    /// Membuang payload frame yang ditolak (hanya pada [`CorruptionPolicy::Resync`])
    Discard,
    /// Stream rusak, menunggu `reset()`
    Faulted,
}

/// Reaksi terhadap data rusak di stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CorruptionPolicy {
    /// Error dan berhenti sampai `reset()`
    #[default]
    Fatal,
    /// Buang data rusak dan cari frame berikutnya
    Resync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeserializerConfig {
    pub frame: FrameConfig,
    pub max_buffers: usize,
    pub policy: CorruptionPolicy,
}

impl Default for DeserializerConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            max_buffers: DEFAULT_MAX_BUFFERS,
            policy: CorruptionPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeserializerStats {
    pub frames_completed: u64,
    pub frames_discarded: u64,
    pub bytes_consumed: u64,
    /// Byte yang dilewati saat mencari magic prefix
    pub resync_bytes: u64,
}

/// Rekonstruksi frame dari byte stream dan routing payload ke buffer per tipe
pub struct StreamDeserializer {
    config: DeserializerConfig,
    buffers: BufferRegistry,
    phase: Phase,
    /// Byte yang sudah terisi di fase aktif
    filled: usize,
    prefix: [u8; PREFIX_SIZE],
    header: FrameHeader,
    postfix: [u8; POSTFIX_SIZE],
    /// Index buffer untuk frame aktif
    current: Option<usize>,
    discard_remaining: usize,
    discard: [u8; DISCARD_CHUNK],
    started: bool,
    stats: DeserializerStats,
}

impl Default for StreamDeserializer {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamDeserializer {
    pub fn new() -> Self {
        Self::with_config(DeserializerConfig::default())
    }

    pub fn with_config(config: DeserializerConfig) -> Self {
        Self {
            config,
            buffers: BufferRegistry::new(config.max_buffers),
            phase: Self::start_phase(&config.frame),
            filled: 0,
            prefix: [0; PREFIX_SIZE],
            header: FrameHeader::default(),
            postfix: [0; POSTFIX_SIZE],
            current: None,
            discard_remaining: 0,
            discard: [0; DISCARD_CHUNK],
            started: false,
            stats: DeserializerStats::default(),
        }
    }

    #[inline(always)]
    fn start_phase(frame: &FrameConfig) -> Phase {
        if frame.prefix.is_some() {
            Phase::Prefix
        } else {
            Phase::Header
        }
    }

    /// Daftarkan buffer tujuan untuk satu type id
    ///
    /// Hanya sebelum `feed()` pertama.
    pub fn register(&mut self, buffer: Box<dyn DataBuffer>) -> StreamResult<()> {
        if self.started {
            return Err(violation(StreamError::RegistrationClosed));
        }
        self.buffers.register(buffer)
    }

    /// Daftarkan buffer mentah `len` bytes dengan callback completion
    pub fn register_callback<F>(&mut self, type_id: u32, len: usize, on_complete: F) -> StreamResult<()>
    where
        F: FnMut(&[u8]) + 'static,
    {
        self.register(Box::new(CallbackBuffer::new(type_id, len, on_complete)))
    }

    /// Inbound bridge: setiap frame `T` yang diterima di-publish ke `registry`
    pub fn forward_publish<T: Message>(&mut self, registry: &Registry) -> StreamResult<()> {
        self.register(Box::new(ForwardPublisher::<T>::new(registry)))
    }

    /// Baca dari `source` sampai satu frame selesai atau source kosong
    ///
    /// Returns `true` jika satu frame selesai pada panggilan ini, `false` jika
    /// source tidak punya data lagi. Progress parsial disimpan untuk panggilan berikutnya.
    pub fn feed<S: ByteSource + ?Sized>(&mut self, source: &mut S) -> StreamResult<bool> {
        if self.phase == Phase::Faulted {
            return Err(StreamError::Faulted);
        }
        self.started = true;

        loop {
            let filled = self.filled;
            let target = self.current_target();
            let len = target.len();
            let n = source.read_bytes(&mut target[filled..])?;
            if n == 0 {
                return Ok(false);
            }

            self.stats.bytes_consumed += n as u64;
            self.filled += n;
            if self.filled == len && self.advance()? {
                return Ok(true);
            }
        }
    }

    /// Target buffer untuk fase aktif
    ///
    /// Data: buffer hasil lookup type id di header. Faulted: slice kosong.
    pub fn current_target(&mut self) -> &mut [u8] {
        match self.phase {
            Phase::Prefix => &mut self.prefix,
            Phase::Header => self.header.as_mut_bytes(),
            Phase::Data => match self.current {
                Some(index) => self.buffers.buffer_mut(index),
                None => &mut [],
            },
            Phase::Postfix => &mut self.postfix,
            Phase::Discard => {
                let n = self.discard_remaining.min(DISCARD_CHUNK);
                &mut self.discard[..n]
            }
            Phase::Faulted => &mut [],
        }
    }

    /// Transisi setelah target fase aktif terisi penuh
    ///
    /// Returns `true` jika transisi ini menyelesaikan satu frame.
    pub fn advance(&mut self) -> StreamResult<bool> {
        self.filled = 0;
        match self.phase {
            Phase::Prefix => self.after_prefix(),
            Phase::Header => self.after_header(),
            Phase::Data => {
                if self.config.frame.postfix.is_some() {
                    self.phase = Phase::Postfix;
                    Ok(false)
                } else {
                    Ok(self.complete())
                }
            }
            Phase::Postfix => self.after_postfix(),
            Phase::Discard => {
                let chunk = self.discard_remaining.min(DISCARD_CHUNK);
                self.discard_remaining -= chunk;
                if self.discard_remaining == 0 {
                    self.next_frame();
                }
                Ok(false)
            }
            Phase::Faulted => Err(StreamError::Faulted),
        }
    }

    fn after_prefix(&mut self) -> StreamResult<bool> {
        let Some(expected) = self.config.frame.prefix else {
            self.phase = Phase::Header;
            return Ok(false);
        };
        let found = u32::from_ne_bytes(self.prefix);
        if found == expected {
            self.phase = Phase::Header;
            return Ok(false);
        }

        match self.config.policy {
            CorruptionPolicy::Fatal => Err(self.fault(StreamError::BadPrefix { expected, found })),
            CorruptionPolicy::Resync => {
                // Geser window satu byte
                self.prefix.copy_within(1.., 0);
                self.filled = PREFIX_SIZE - 1;
                self.stats.resync_bytes += 1;
                tracing::debug!(found = format_args!("{found:#010x}"), "resyncing on prefix");
                Ok(false)
            }
        }
    }

    fn after_header(&mut self) -> StreamResult<bool> {
        let type_id = self.header.type_id;
        let payload_len = self.header.payload_len();

        let rejected = match self.buffers.lookup(type_id) {
            None => StreamError::UnknownType(type_id),
            Some(index) if self.buffers.len_of(index) != payload_len => StreamError::SizeMismatch {
                type_id,
                type_name: self.buffers.name_of(index),
                expected: self.buffers.len_of(index),
                found: payload_len,
            },
            Some(index) => {
                self.current = Some(index);
                self.phase = Phase::Data;
                // Payload kosong: langsung ke fase berikutnya
                if payload_len == 0 {
                    return self.advance();
                }
                return Ok(false);
            }
        };

        match self.config.policy {
            CorruptionPolicy::Fatal => Err(self.fault(violation(rejected))),
            CorruptionPolicy::Resync => {
                tracing::warn!(error = %rejected, "discarding frame");
                self.stats.frames_discarded += 1;
                self.current = None;
                let postfix = if self.config.frame.postfix.is_some() {
                    POSTFIX_SIZE
                } else {
                    0
                };
                self.discard_remaining = payload_len + postfix;
                if self.discard_remaining == 0 {
                    self.next_frame();
                } else {
                    self.phase = Phase::Discard;
                }
                Ok(false)
            }
        }
    }

    fn after_postfix(&mut self) -> StreamResult<bool> {
        let Some(expected) = self.config.frame.postfix else {
            return Ok(self.complete());
        };
        let found = self.postfix[0];
        if found == expected {
            return Ok(self.complete());
        }

        match self.config.policy {
            CorruptionPolicy::Fatal => Err(self.fault(StreamError::BadPostfix { expected, found })),
            CorruptionPolicy::Resync => {
                tracing::warn!(
                    type_id = self.header.type_id,
                    found,
                    "bad postfix, dropping frame"
                );
                self.stats.frames_discarded += 1;
                self.next_frame();
                Ok(false)
            }
        }
    }

    /// Frame utuh: panggil completion buffer
    fn complete(&mut self) -> bool {
        let Some(index) = self.current else {
            self.next_frame();
            return false;
        };
        tracing::trace!(
            type_id = self.header.type_id,
            type_name = self.buffers.name_of(index),
            "frame received"
        );
        self.buffers.complete(index);
        self.stats.frames_completed += 1;
        self.next_frame();
        true
    }

    #[inline(always)]
    fn next_frame(&mut self) {
        self.phase = Self::start_phase(&self.config.frame);
        self.filled = 0;
        self.current = None;
        self.discard_remaining = 0;
    }

    fn fault(&mut self, err: StreamError) -> StreamError {
        tracing::error!(error = %err, "stream faulted");
        self.phase = Phase::Faulted;
        self.current = None;
        err
    }

    /// Kembali ke awal frame dan buang progress parsial
    ///
    /// Registrasi buffer dan statistik tidak berubah.
    pub fn reset(&mut self) {
        self.next_frame();
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_faulted(&self) -> bool {
        self.phase == Phase::Faulted
    }

    pub fn stats(&self) -> DeserializerStats {
        self.stats
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Lookup index buffer untuk type id
    pub fn lookup(&self, type_id: u32) -> Option<usize> {
        self.buffers.lookup(type_id)
    }

    pub fn config(&self) -> DeserializerConfig {
        self.config
    }
}
