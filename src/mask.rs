//! One-hot brightness bit-plane selector.
//!
//! Binary Code Modulation shows bit-plane `k` of every pixel for `2^k` ticks.
//! The mask selects which plane is being shifted out and, through its delayed
//! copy, how long the previously latched plane stays lit.

use crate::BITS;

const FIELD: u8 = (1 << BITS) - 1;

/// Brightness bit-plane mask: exactly one of the low [`BITS`] bits set, or
/// the zero value seen only between reset and the first rotation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct BitPlaneMask(u8);

impl BitPlaneMask {
    /// Invalid reset value.
    pub const ZERO: Self = Self(0);
    /// Least significant (dimmest) plane.
    pub const LOWEST: Self = Self(1);
    /// Most significant (brightest) plane.
    pub const BRIGHTEST: Self = Self(1 << (BITS - 1));

    /// Mask selecting bit-plane `plane`, if it exists.
    #[must_use]
    pub const fn for_plane(plane: u8) -> Option<Self> {
        if plane < BITS {
            Some(Self(1 << plane))
        } else {
            None
        }
    }

    /// Mask from its raw bits. Only one-hot values within the field are accepted.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Option<Self> {
        if bits & !FIELD == 0 && bits.count_ones() == 1 {
            Some(Self(bits))
        } else {
            None
        }
    }

    /// Raw bits as driven on the `brightness_mask` output.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True unless this is the zero reset value.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// Index of the selected plane, `None` for the zero value.
    #[must_use]
    pub const fn plane(self) -> Option<u8> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros() as u8)
        }
    }

    /// True for the most significant plane.
    #[must_use]
    pub const fn is_brightest(self) -> bool {
        self.0 & Self::BRIGHTEST.0 != 0
    }

    /// Output-enable width in ticks for this plane: `2^k`, or 0 for the zero value.
    #[must_use]
    pub const fn pulse_width(self) -> u8 {
        match self.plane() {
            Some(plane) => 1 << plane,
            None => 0,
        }
    }

    /// Next plane, rotating left with the brightest plane wrapping to the lowest.
    ///
    /// The zero value does not rotate: it is forced to [`Self::LOWEST`].
    #[must_use]
    pub const fn rotate(self) -> Self {
        if self.0 == 0 {
            return Self::LOWEST;
        }
        Self(((self.0 << 1) | (self.0 >> (BITS - 1))) & FIELD)
    }

    /// All valid planes from dimmest to brightest.
    pub fn planes() -> impl Iterator<Item = Self> {
        (0..BITS).map(|plane| Self(1 << plane))
    }
}

impl From<BitPlaneMask> for u8 {
    fn from(mask: BitPlaneMask) -> Self {
        mask.0
    }
}
