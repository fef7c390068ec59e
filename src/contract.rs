//! Contract violation handling
//!
//! Kapasitas penuh, konflik identitas, type id tidak dikenal, dsb adalah
//! pelanggaran kontrak (bukan kondisi runtime normal). Perilakunya dipilih saat build:
//! - default: dicatat lewat `tracing::error!` lalu dikembalikan sebagai `Err`
//! - feature `fatal-violations`: panic di tempat (abort pada profile release)
//!
//! Tidak ada mode di mana violation diabaikan diam-diam.

/// Laporkan violation dan kembalikan error-nya ke caller
#[inline]
#[track_caller]
pub(crate) fn violation<E: std::error::Error>(err: E) -> E {
    if cfg!(feature = "fatal-violations") {
        panic!("sub0pub contract violation: {err}");
    }
    tracing::error!(error = %err, "contract violation");
    err
}
