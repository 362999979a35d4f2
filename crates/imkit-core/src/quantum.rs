//! Quantum depth of the pixel store.
//!
//! The quantum is the storage type of one channel sample inside the pixel
//! cache. It is fixed at compile time through cargo features:
//!
//! | Feature | Depth | Sample | Max |
//! |---------|-------|--------|-----|
//! | `q8` | [`QuantumDepth::Q8`] | `u8` | 255 |
//! | `q16` (default) | [`QuantumDepth::Q16`] | `u16` | 65535 |
//! | `hdri` | [`QuantumDepth::Q16Hdri`] | `f32` | 65535.0, unclamped |
//!
//! Header probing reports the depth stored in the file; callers combine it
//! with [`QuantumDepth::CURRENT`] to know what survives a decode.

use std::fmt;

/// Compile-time pixel sample depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuantumDepth {
    /// 8-bit integer samples.
    Q8,
    /// 16-bit integer samples.
    Q16,
    /// 16-bit range stored as floating point (high dynamic range).
    Q16Hdri,
}

impl QuantumDepth {
    /// Depth selected by the enabled cargo features.
    #[cfg(feature = "hdri")]
    pub const CURRENT: QuantumDepth = QuantumDepth::Q16Hdri;
    /// Depth selected by the enabled cargo features.
    #[cfg(all(feature = "q8", not(feature = "hdri")))]
    pub const CURRENT: QuantumDepth = QuantumDepth::Q8;
    /// Depth selected by the enabled cargo features.
    #[cfg(not(any(feature = "q8", feature = "hdri")))]
    pub const CURRENT: QuantumDepth = QuantumDepth::Q16;

    /// Bits per channel sample.
    #[inline]
    pub const fn bits(self) -> u32 {
        match self {
            Self::Q8 => 8,
            Self::Q16 | Self::Q16Hdri => 16,
        }
    }

    /// Bytes per channel sample in the pixel store.
    #[inline]
    pub const fn bytes_per_sample(self) -> u64 {
        match self {
            Self::Q8 => 1,
            Self::Q16 => 2,
            Self::Q16Hdri => 4,
        }
    }

    /// Largest in-range sample value (`QuantumRange`).
    #[inline]
    pub const fn max(self) -> f64 {
        match self {
            Self::Q8 => 255.0,
            Self::Q16 | Self::Q16Hdri => 65535.0,
        }
    }

    /// Whether samples are floating point and may exceed [`Self::max`].
    #[inline]
    pub const fn is_hdri(self) -> bool {
        matches!(self, Self::Q16Hdri)
    }

    /// Depth a file sample of `file_depth` bits keeps once stored.
    ///
    /// Integer stores truncate to their own depth. HDRI keeps the file depth.
    #[inline]
    pub const fn effective_depth(self, file_depth: u32) -> u32 {
        if self.is_hdri() || file_depth <= self.bits() {
            file_depth
        } else {
            self.bits()
        }
    }

    /// Short name as used in version strings.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Q8 => "Q8",
            Self::Q16 => "Q16",
            Self::Q16Hdri => "Q16-HDRI",
        }
    }
}

impl fmt::Display for QuantumDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
