//! Wire Frame Format
//!
//! Layout (native endian, tanpa negosiasi):
//! ┌──────────────────────────────────────────────┐
//! │ Prefix: 4 bytes, magic "SUB0"                │
//! ├──────────────────────────────────────────────┤
//! │ FrameHeader: type_id u32 + payload_len u32   │
//! ├──────────────────────────────────────────────┤
//! │ Payload: payload_len bytes (raw record image)│
//! ├──────────────────────────────────────────────┤
//! │ Postfix: 1 byte, '\n'                        │
//! └──────────────────────────────────────────────┘
//!
//! Kedua sisi harus punya byte order yang sama (limitasi portabilitas yang disengaja).
//! Ukuran payload per type id konstan: message adalah record fixed-size.

use std::mem;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::core::identity::fourcc;

/// Magic prefix "SUB0"
pub const PREFIX_MAGIC: u32 = fourcc(b'S', b'U', b'B', b'0');
/// Delimiter di akhir setiap frame
pub const POSTFIX_DELIMITER: u8 = b'\n';

pub const PREFIX_SIZE: usize = mem::size_of::<u32>();
pub const HEADER_SIZE: usize = mem::size_of::<FrameHeader>();
pub const POSTFIX_SIZE: usize = mem::size_of::<u8>();

/// Data yang bisa dikirim lewat wire
///
/// Record fixed-size tanpa padding yang image memorinya = payload.
/// Otomatis terpenuhi oleh tipe primitif dan struct `#[repr(C)]` dengan
/// `#[derive(FromBytes, IntoBytes, Immutable)]`.
pub trait Message: FromBytes + IntoBytes + Immutable + Copy + 'static {}

impl<T> Message for T where T: FromBytes + IntoBytes + Immutable + Copy + 'static {}

/// Header frame - fixed 8 bytes
///
/// Dapat di-cast langsung dari/ke raw bytes (zero-copy).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct FrameHeader {
    /// Type identifier (routing key)
    pub type_id: u32,
    /// Panjang payload dalam bytes
    pub payload_len: u32,
}

impl FrameHeader {
    #[inline(always)]
    pub fn new(type_id: u32, payload_len: u32) -> Self {
        Self {
            type_id,
            payload_len,
        }
    }

    #[inline(always)]
    pub fn payload_len(&self) -> usize {
        self.payload_len as usize
    }
}

/// Fase framing yang aktif
///
/// Default: prefix dan postfix aktif. Encoder dan decoder harus memakai config yang sama.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    /// Magic prefix, `None` = tanpa fase prefix
    pub prefix: Option<u32>,
    /// Delimiter postfix, `None` = tanpa fase postfix
    pub postfix: Option<u8>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            prefix: Some(PREFIX_MAGIC),
            postfix: Some(POSTFIX_DELIMITER),
        }
    }
}

impl FrameConfig {
    /// Header + payload saja
    pub const fn bare() -> Self {
        Self {
            prefix: None,
            postfix: None,
        }
    }

    /// Overhead framing per pesan (tanpa payload)
    #[inline(always)]
    pub fn overhead(&self) -> usize {
        let prefix = if self.prefix.is_some() { PREFIX_SIZE } else { 0 };
        let postfix = if self.postfix.is_some() { POSTFIX_SIZE } else { 0 };
        prefix + HEADER_SIZE + postfix
    }

    /// Total ukuran frame untuk payload tertentu
    #[inline(always)]
    pub fn frame_len(&self, payload_len: usize) -> usize {
        self.overhead() + payload_len
    }
}
