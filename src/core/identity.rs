//! Identitas tipe: hash nama dan packing FourCC
//!
//! Type id dipakai sebagai routing key di header frame. Sumbernya:
//! 1. id numerik eksplisit
//! 2. djb2 dari nama eksplisit (portable antar-program)
//! 3. djb2 dari `std::any::type_name` (fallback, TIDAK portable antar-compiler/build)

/// Pack 4 karakter ke u32 (byte pertama = byte paling rendah)
///
/// Ditulis native-endian, di mesin little-endian hasilnya muncul di wire sebagai `abcd`.
#[inline(always)]
pub const fn fourcc(a: u8, b: u8, c: u8, d: u8) -> u32 {
    ((d as u32) << 24) | ((c as u32) << 16) | ((b as u32) << 8) | (a as u32)
}

/// djb2 string hash: `h = 5381; h = h * 33 + c` per byte, wrapping u32
pub const fn djb2(name: &str) -> u32 {
    let bytes = name.as_bytes();
    let mut hash: u32 = 5381;
    let mut i = 0;
    while i < bytes.len() {
        hash = (hash << 5).wrapping_add(hash).wrapping_add(bytes[i] as u32);
        i += 1;
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_djb2_known_values() {
        assert_eq!(djb2(""), 5381);
        assert_eq!(djb2("a"), 5381 * 33 + 97);
        // Wrapping harus stabil untuk nama panjang
        assert_eq!(djb2("telemetry.sample"), djb2("telemetry.sample"));
        assert_ne!(djb2("float"), djb2("int"));
    }

    #[test]
    fn test_djb2_is_const() {
        const ID: u32 = djb2("ab");
        assert_eq!(ID, (5381 * 33 + 97) * 33 + 98);
    }

    #[test]
    fn test_fourcc_byte_order() {
        let magic = fourcc(b'S', b'U', b'B', b'0');
        assert_eq!(magic.to_le_bytes(), *b"SUB0");
    }
}
