// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixed-size bit vector over property slots.

use smallvec::{SmallVec, smallvec};

/// One bit per property slot. Classes with up to 64 properties stay inline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SlotBits {
    words: SmallVec<[u64; 1]>,
}

impl SlotBits {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            words: smallvec![0; len.div_ceil(64)],
        }
    }

    /// Sets a bit and returns its previous value.
    #[inline]
    pub(crate) fn set(&mut self, slot: usize, value: bool) -> bool {
        let word = &mut self.words[slot / 64];
        let mask = 1_u64 << (slot % 64);
        let old = *word & mask != 0;
        if value {
            *word |= mask;
        } else {
            *word &= !mask;
        }
        old
    }

    pub(crate) fn any(&self) -> bool {
        self.words.iter().any(|word| *word != 0)
    }

    pub(crate) fn clear(&mut self) {
        self.words.iter_mut().for_each(|word| *word = 0);
    }

    /// Set slots in ascending order.
    pub(crate) fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(index, &word)| {
            let mut bits = word;
            core::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let offset = bits.trailing_zeros() as usize;
                bits &= bits - 1; // Clear the lowest set bit
                Some(index * 64 + offset)
            })
        })
    }
}
