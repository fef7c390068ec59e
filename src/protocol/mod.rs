//! Protocol Layer: Framing dan Stream Codec
//!
//! Prinsip desain:
//! - Flat Binary: payload adalah image memori record, tanpa parsing
//! - Fixed-size header: layout memori bisa diprediksi
//! - No allocation: buffer dialokasikan saat setup, encode/decode langsung ke sana

mod buffer;
mod decoder;
mod encoder;
mod message;

pub use buffer::{BufferRegistry, CallbackBuffer, DataBuffer, DEFAULT_MAX_BUFFERS};
pub use decoder::{CorruptionPolicy, DeserializerConfig, DeserializerStats, Phase, StreamDeserializer};
pub use encoder::{
    write_frame, FrameEncoder, SerializerConfig, SerializerStats, StreamSerializer,
    DEFAULT_ENCODER_CAPACITY,
};
pub use message::{
    FrameConfig, FrameHeader, Message, HEADER_SIZE, POSTFIX_DELIMITER, POSTFIX_SIZE, PREFIX_MAGIC,
    PREFIX_SIZE,
};
