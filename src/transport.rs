//! Byte stream contract untuk serializer/deserializer
//!
//! Core tidak tahu transport konkret (file, TCP, serial). Yang dibutuhkan hanya:
//! - [`ByteSource`]: baca *hingga* N bytes, boleh kurang; 0 = belum ada data
//! - [`ByteSink`]: tulis bytes, boleh partial
//!
//! Semua `std::io::Read`/`std::io::Write` otomatis memenuhi kontrak ini.
//! Untuk non-blocking socket, `WouldBlock` dipetakan ke "0 bytes tersedia".
//! End-of-stream adalah urusan transport, bukan core.

use std::io::{self, ErrorKind, Read, Write};

/// Sumber bytes non-blocking-friendly
pub trait ByteSource {
    /// Baca ke `buf`, return jumlah byte yang dibaca (0 = tidak ada data saat ini)
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Tujuan bytes
pub trait ByteSink {
    /// Tulis dari `buf`, return jumlah byte yang diterima sink
    fn write_bytes(&mut self, buf: &[u8]) -> io::Result<usize>;

    fn flush_bytes(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<R: Read + ?Sized> ByteSource for R {
    #[inline]
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => Ok(0),
            Err(e) => Err(e),
        }
    }
}

impl<W: Write + ?Sized> ByteSink for W {
    #[inline]
    fn write_bytes(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write(buf)
    }

    fn flush_bytes(&mut self) -> io::Result<()> {
        self.flush()
    }
}

/// Tulis seluruh `bytes`, ulangi partial write
///
/// Sink yang menerima 0 bytes menghasilkan `ErrorKind::WriteZero`.
/// `Interrupted` diulang, error lain langsung dikembalikan (tidak ada retry policy di core).
pub fn write_all_bytes<W: ByteSink + ?Sized>(sink: &mut W, mut bytes: &[u8]) -> io::Result<()> {
    while !bytes.is_empty() {
        match sink.write_bytes(bytes) {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::WriteZero,
                    "byte sink accepted no data",
                ));
            }
            Ok(n) => bytes = &bytes[n..],
            Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reader yang selalu WouldBlock
    struct Starved;

    impl Read for Starved {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(ErrorKind::WouldBlock.into())
        }
    }

    /// Writer yang hanya menerima 3 bytes per panggilan
    struct Trickle(Vec<u8>);

    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(3);
            self.0.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Full;

    impl Write for Full {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_would_block_means_no_data() {
        let mut buf = [0u8; 8];
        assert_eq!(Starved.read_bytes(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_slice_source_drains() {
        let data = [1u8, 2, 3];
        let mut source: &[u8] = &data;
        let mut buf = [0u8; 2];

        assert_eq!(source.read_bytes(&mut buf).unwrap(), 2);
        assert_eq!(source.read_bytes(&mut buf).unwrap(), 1);
        assert_eq!(source.read_bytes(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_write_all_handles_partial_writes() {
        let mut sink = Trickle(Vec::new());
        write_all_bytes(&mut sink, b"hello world").unwrap();
        assert_eq!(sink.0, b"hello world");
    }

    #[test]
    fn test_write_zero_is_error() {
        let err = write_all_bytes(&mut Full, b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WriteZero);
    }
}
