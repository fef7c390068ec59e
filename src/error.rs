//! Error types untuk broker dan stream protocol
//!
//! Dua keluarga error:
//! - [`BrokerError`]: pelanggaran kontrak pada registry/broker (kapasitas, identitas)
//! - [`StreamError`]: framing, registry buffer, dan error transport

use std::io;

use thiserror::Error;

/// Error pada operasi broker
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// Tabel subscriber sudah penuh
    #[error("subscriber table for `{type_name}` is full (capacity {capacity})")]
    CapacityExceeded {
        type_name: &'static str,
        capacity: usize,
    },

    /// Token tidak dikenal oleh broker
    #[error("subscriber token {token} is not registered with `{type_name}`")]
    UnknownToken { type_name: &'static str, token: u32 },

    /// Registrasi/deregistrasi dipanggil dari dalam publish() broker yang sama
    #[error("broker for `{type_name}` is dispatching, subscribers cannot be removed from inside receive()")]
    DispatchInProgress { type_name: &'static str },

    #[error("type id conflict for `{type_name}`: already {existing:#010x}, requested {requested:#010x}")]
    IdConflict {
        type_name: &'static str,
        existing: u32,
        requested: u32,
    },

    #[error("type name conflict: already `{existing}`, requested `{requested}`")]
    NameConflict {
        existing: &'static str,
        requested: &'static str,
    },
}

/// Error pada serializer/deserializer
#[derive(Debug, Error)]
pub enum StreamError {
    /// Error dari transport (read/write). Core tidak melakukan retry.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),

    #[error("bad frame prefix {found:#010x}, expected {expected:#010x}")]
    BadPrefix { expected: u32, found: u32 },

    #[error("bad frame postfix {found:#04x}, expected {expected:#04x}")]
    BadPostfix { expected: u8, found: u8 },

    /// Header menyebut type id yang tidak punya buffer terdaftar
    #[error("no buffer registered for type id {0:#010x}")]
    UnknownType(u32),

    /// payload_len di header tidak sama dengan ukuran buffer (version skew)
    #[error("payload size mismatch for `{type_name}` ({type_id:#010x}): expected {expected} bytes, got {found}")]
    SizeMismatch {
        type_id: u32,
        type_name: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("payload of {0} bytes does not fit the u32 length field")]
    PayloadTooLarge(usize),

    #[error("buffer registry is full (capacity {0})")]
    RegistryFull(usize),

    #[error("type id {0:#010x} already has a registered buffer")]
    DuplicateType(u32),

    /// Registrasi buffer setelah feed() pertama
    #[error("buffer registration is closed once the stream has been read")]
    RegistrationClosed,

    #[error("deserializer is faulted, call reset() before feeding more data")]
    Faulted,

    #[error(transparent)]
    Broker(#[from] BrokerError),
}

impl StreamError {
    /// True untuk kerusakan data di stream (bukan kesalahan setup/transport)
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::BadPrefix { .. }
                | Self::BadPostfix { .. }
                | Self::UnknownType(_)
                | Self::SizeMismatch { .. }
        )
    }
}

pub type BrokerResult<T> = Result<T, BrokerError>;
pub type StreamResult<T> = Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corruption_classification() {
        assert!(StreamError::UnknownType(7).is_corruption());
        assert!(StreamError::BadPostfix {
            expected: b'\n',
            found: 0
        }
        .is_corruption());
        assert!(!StreamError::RegistrationClosed.is_corruption());
        assert!(!StreamError::from(io::Error::from(io::ErrorKind::BrokenPipe)).is_corruption());
    }

    #[test]
    fn test_messages_render_hex() {
        let err = StreamError::BadPrefix {
            expected: 0x3042_5553,
            found: 0,
        };
        assert_eq!(
            err.to_string(),
            "bad frame prefix 0x00000000, expected 0x30425553"
        );
    }
}
