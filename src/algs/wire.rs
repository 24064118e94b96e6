//! Fixed, little-endian wire types for the ghost exchange paths.
//!
//! Multi-byte integers are stored pre-LE with `.to_le()` and decoded with
//! `from_le()`, so buffers can be cast to bytes and shipped as-is.

use bytemuck::{Pod, Zeroable};
use std::mem::size_of;

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

pub fn cast_slice_mut<T: Pod>(v: &mut [T]) -> &mut [u8] {
    bytemuck::cast_slice_mut(v)
}

pub fn cast_slice_from<T: Pod>(v: &[u8]) -> &[T] {
    bytemuck::cast_slice(v)
}

/// Count header preceding a batch of fixed-width records.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireCount {
    pub n_le: u32,
}

impl WireCount {
    pub fn new(n: usize) -> Self {
        Self {
            n_le: (n as u32).to_le(),
        }
    }

    pub fn get(&self) -> usize {
        u32::from_le(self.n_le) as usize
    }
}

// ===== Compile-time sanity checks =========================================

const _: () = {
    // Pod/Zeroable ensures no padding contains uninit when cast to bytes.
    assert!(size_of::<WireCount>() == 4);
};

#[cfg(test)]
mod tests {
    use super::*;
    use static_assertions::assert_eq_size;

    assert_eq_size!(WireCount, u32);

    #[test]
    fn count_roundtrip() {
        let count = WireCount::new(42);
        let bytes: Vec<u8> = cast_slice(std::slice::from_ref(&count)).to_vec();
        let decoded: &[WireCount] = cast_slice_from(&bytes);
        assert_eq!(decoded[0].get(), 42);
    }

    #[test]
    fn u64_slice_roundtrip() {
        let words: Vec<u64> = vec![1u64.to_le(), 2u64.to_le(), u64::MAX.to_le()];
        let bytes = cast_slice(&words).to_vec();
        let decoded: &[u64] = cast_slice_from(&bytes);
        assert_eq!(u64::from_le(decoded[2]), u64::MAX);
    }
}
