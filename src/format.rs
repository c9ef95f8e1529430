//! Stream metadata: sample formats, channel layouts and block addressing.

use core::fmt;

use crate::error::{Error, Result};

/// Samples per block unless a stream is created with something else.
pub const DEFAULT_BLOCK_SIZE: usize = 3072;

/// Whether samples are stored as integers or floating point.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SampleType {
    Integer,
    Float,
}

/// A named channel slot, identified by its bit position in a [`ChannelLayout`].
///
/// The first 18 positions follow the WAVEFORMATEXTENSIBLE speaker order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Channel(pub u8);

impl Channel {
    pub const FRONT_LEFT: Channel = Channel(0);
    pub const FRONT_RIGHT: Channel = Channel(1);
    pub const FRONT_CENTER: Channel = Channel(2);
    pub const LOW_FREQUENCY: Channel = Channel(3);
    pub const BACK_LEFT: Channel = Channel(4);
    pub const BACK_RIGHT: Channel = Channel(5);
    pub const FRONT_LEFT_OF_CENTER: Channel = Channel(6);
    pub const FRONT_RIGHT_OF_CENTER: Channel = Channel(7);
    pub const BACK_CENTER: Channel = Channel(8);
    pub const SIDE_LEFT: Channel = Channel(9);
    pub const SIDE_RIGHT: Channel = Channel(10);
    pub const TOP_CENTER: Channel = Channel(11);
    pub const TOP_FRONT_LEFT: Channel = Channel(12);
    pub const TOP_FRONT_CENTER: Channel = Channel(13);
    pub const TOP_FRONT_RIGHT: Channel = Channel(14);
    pub const TOP_BACK_LEFT: Channel = Channel(15);
    pub const TOP_BACK_CENTER: Channel = Channel(16);
    pub const TOP_BACK_RIGHT: Channel = Channel(17);
    pub const STEREO_LEFT: Channel = Channel(29);
    pub const STEREO_RIGHT: Channel = Channel(30);
    pub const LOW_FREQUENCY2: Channel = Channel(35);

    /// Highest representable slot.
    pub const MAX: u8 = 63;

    #[inline]
    fn bit(self) -> u64 {
        1u64 << (self.0 & Self::MAX)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ordered set of channels, stored as a bitmask.
///
/// Channels appear in blocks in ascending bit order, so the plane index of a
/// channel is its [`rank`](Self::rank) within the layout.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChannelLayout(pub u64);

impl ChannelLayout {
    pub const MONO: ChannelLayout = ChannelLayout(1 << 0);
    pub const STEREO: ChannelLayout = ChannelLayout((1 << 0) | (1 << 1));

    pub fn from_channels(channels: impl IntoIterator<Item = Channel>) -> Self {
        Self(
            channels
                .into_iter()
                .filter(|ch| ch.0 <= Channel::MAX)
                .fold(0, |mask, ch| mask | ch.bit()),
        )
    }

    #[inline]
    pub fn bits(self) -> u64 {
        self.0
    }

    /// Number of channels in the layout.
    #[inline]
    pub fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether `channel` is a member of this layout.
    #[inline]
    pub fn contains(self, channel: Channel) -> bool {
        channel.0 <= Channel::MAX && self.0 & channel.bit() != 0
    }

    /// Position of `channel` among the layout's channels, if present.
    #[inline]
    pub fn rank(self, channel: Channel) -> Option<usize> {
        if !self.contains(channel) {
            return None;
        }
        let below = channel.bit() - 1;
        Some((self.0 & below).count_ones() as usize)
    }

    /// The `index`-th channel of the layout.
    pub fn nth(self, index: usize) -> Option<Channel> {
        self.iter().nth(index)
    }

    pub fn iter(self) -> impl Iterator<Item = Channel> {
        let mut mask = self.0;
        core::iter::from_fn(move || {
            if mask == 0 {
                return None;
            }
            let pos = mask.trailing_zeros() as u8;
            mask &= mask - 1;
            Some(Channel(pos))
        })
    }
}

impl fmt::Debug for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(|c| c.0)).finish()
    }
}

/// How samples of a format are held in memory.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Storage {
    I16,
    I32,
    F32,
}

/// Sample type, precision and channel layout of a stream.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct AudioFormat {
    sample_type: SampleType,
    bits_per_sample: u8,
    layout: ChannelLayout,
}

impl AudioFormat {
    /// Integers of 16 to 32 bits, or 32-bit float, over a non-empty layout.
    pub fn new(sample_type: SampleType, bits_per_sample: u8, layout: ChannelLayout) -> Result<Self> {
        let valid = match sample_type {
            SampleType::Integer => (16..=32).contains(&bits_per_sample),
            SampleType::Float => bits_per_sample == 32,
        };
        if !valid {
            return Err(Error::InvalidFormat {
                sample_type,
                bits: bits_per_sample,
            });
        }
        if layout.is_empty() {
            return Err(Error::InvalidLayout);
        }
        Ok(Self {
            sample_type,
            bits_per_sample,
            layout,
        })
    }

    pub fn int16(layout: ChannelLayout) -> Result<Self> {
        Self::new(SampleType::Integer, 16, layout)
    }

    pub fn int32(layout: ChannelLayout) -> Result<Self> {
        Self::new(SampleType::Integer, 32, layout)
    }

    pub fn float32(layout: ChannelLayout) -> Result<Self> {
        Self::new(SampleType::Float, 32, layout)
    }

    /// Same sample type and precision over a different layout.
    pub fn with_layout(self, layout: ChannelLayout) -> Result<Self> {
        Self::new(self.sample_type, self.bits_per_sample, layout)
    }

    #[inline]
    pub fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    #[inline]
    pub fn bits_per_sample(&self) -> u8 {
        self.bits_per_sample
    }

    #[inline]
    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.layout.count()
    }

    #[inline]
    pub fn storage(&self) -> Storage {
        match (self.sample_type, self.bits_per_sample) {
            (SampleType::Float, _) => Storage::F32,
            (SampleType::Integer, 16) => Storage::I16,
            (SampleType::Integer, _) => Storage::I32,
        }
    }

    #[inline]
    pub fn bytes_per_sample(&self) -> usize {
        match self.storage() {
            Storage::I16 => 2,
            Storage::I32 | Storage::F32 => 4,
        }
    }

    /// True when both formats store samples identically (layout aside).
    #[inline]
    pub fn same_sample_kind(&self, other: &AudioFormat) -> bool {
        self.sample_type == other.sample_type && self.bits_per_sample == other.bits_per_sample
    }
}

/// Immutable description of a stream: format, rate, length and block size.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AudioInfo {
    pub format: AudioFormat,
    pub sample_rate: u32,
    pub num_samples: u64,
    pub block_size: usize,
}

impl AudioInfo {
    pub fn new(format: AudioFormat, sample_rate: u32, num_samples: u64, block_size: usize) -> Result<Self> {
        let info = Self {
            format,
            sample_rate,
            num_samples,
            block_size,
        };
        info.validate()?;
        Ok(info)
    }

    /// Check the invariants [`new`](Self::new) enforces, for descriptors
    /// built field by field.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::InvalidSampleRate(self.sample_rate));
        }
        if self.num_samples == 0 {
            return Err(Error::InvalidSampleCount(self.num_samples));
        }
        if self.block_size == 0 {
            return Err(Error::InvalidBlockSize(self.block_size));
        }
        Ok(())
    }

    /// Number of blocks, the last of which may be short. Zero for a zero
    /// block size.
    #[inline]
    pub fn num_blocks(&self) -> usize {
        let bs = self.block_size as u64;
        if bs == 0 {
            return 0;
        }
        (self.num_samples / bs + u64::from(self.num_samples % bs != 0)) as usize
    }

    /// Index of the first sample of block `n`.
    #[inline]
    pub fn block_start(&self, n: usize) -> u64 {
        n as u64 * self.block_size as u64
    }

    /// Number of samples in block `n`; zero past the end.
    #[inline]
    pub fn block_len(&self, n: usize) -> usize {
        let start = self.block_start(n);
        if start >= self.num_samples {
            return 0;
        }
        (self.num_samples - start).min(self.block_size as u64) as usize
    }

    #[inline]
    pub fn is_last_block(&self, n: usize) -> bool {
        n + 1 == self.num_blocks()
    }

    /// Format, sample rate and block size agree; lengths may differ.
    pub fn same_layout_and_rate(&self, other: &AudioInfo) -> bool {
        self.format == other.format
            && self.sample_rate == other.sample_rate
            && self.block_size == other.block_size
    }
}
