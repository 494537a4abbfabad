//! A fixed-width, byte-backed bitfield.

use crate::types::NdtmError;

/// Number of bytes needed to hold `bits` bits.
pub fn bytes_for(bits: usize) -> usize {
    (bits >> 3) + usize::from(bits & 7 != 0)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bitfield {
    bytes: Vec<u8>,
    len: usize,
}

impl Bitfield {
    /// Creates a bitfield of `len` cleared bits.
    pub fn with_len(len: usize) -> Result<Self, NdtmError> {
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(bytes_for(len))?;
        bytes.resize(bytes_for(len), 0);
        Ok(Self { bytes, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Storage footprint in bytes.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Extends the bitfield to at least `len` bits. New bits are cleared.
    pub fn grow(&mut self, len: usize) -> Result<(), NdtmError> {
        if len <= self.len {
            return Ok(());
        }
        let needed = bytes_for(len);
        if needed > self.bytes.len() {
            self.bytes.try_reserve_exact(needed - self.bytes.len())?;
            self.bytes.resize(needed, 0);
        }
        self.len = len;
        Ok(())
    }

    /// Sets bit `i`. Out of range indices are ignored.
    pub fn set(&mut self, i: usize) {
        if i < self.len {
            self.bytes[i >> 3] |= 1 << (i & 7);
        }
    }

    /// Clears bit `i`. Out of range indices are ignored.
    pub fn unset(&mut self, i: usize) {
        if i < self.len {
            self.bytes[i >> 3] &= !(1 << (i & 7));
        }
    }

    /// Returns bit `i`; bits past the end read as cleared.
    pub fn get(&self, i: usize) -> bool {
        i < self.len && self.bytes[i >> 3] & (1 << (i & 7)) != 0
    }

    /// Returns the first cleared bit at or after `start`, or `len()` if there is none.
    pub fn next_clear(&self, start: usize) -> usize {
        let mut i = start;
        while i < self.len {
            let byte = self.bytes[i >> 3];
            if byte == u8::MAX {
                // Whole byte taken, jump to the next boundary.
                i = (i | 7) + 1;
                continue;
            }
            if byte & (1 << (i & 7)) == 0 {
                return i;
            }
            i += 1;
        }
        self.len
    }

    /// Iterates over the indices of set bits in ascending order.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |&i| self.get(i))
    }
}
