//! Blocks: planar sample storage for one run of a stream.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt::Debug;
use core::ops::Range;

use dasp_sample::Sample;

use crate::error::{Error, Result};
use crate::format::{AudioFormat, Storage};

/// Shared, immutable block as handed between nodes.
pub type BlockRef = Arc<Block>;

/// Channel-major sample storage; channel `c` occupies `c * len .. (c + 1) * len`.
#[derive(Clone, PartialEq, Debug)]
pub enum Planes {
    I16(Vec<i16>),
    I32(Vec<i32>),
    F32(Vec<f32>),
}

/// A sample type a block can hold, and how the mixer converts it.
pub trait PcmSample: Sample + Copy + PartialEq + Debug + Send + Sync + 'static {
    const STORAGE: Storage;

    fn plane(planes: &Planes) -> Option<&[Self]>;
    fn plane_mut(planes: &mut Planes) -> Option<&mut [Self]>;
    fn wrap(samples: Vec<Self>) -> Planes;

    /// Raw value widened for accumulation (no normalisation).
    fn to_accumulator(self) -> f64;

    /// Narrow an accumulated value back into this sample type.
    fn from_accumulator(acc: f64, bits_per_sample: u8) -> Self;
}

impl PcmSample for i16 {
    const STORAGE: Storage = Storage::I16;

    fn plane(planes: &Planes) -> Option<&[Self]> {
        match planes {
            Planes::I16(v) => Some(v),
            _ => None,
        }
    }

    fn plane_mut(planes: &mut Planes) -> Option<&mut [Self]> {
        match planes {
            Planes::I16(v) => Some(v),
            _ => None,
        }
    }

    fn wrap(samples: Vec<Self>) -> Planes {
        Planes::I16(samples)
    }

    #[inline]
    fn to_accumulator(self) -> f64 {
        self as f64
    }

    /// Truncates toward zero.
    #[inline]
    fn from_accumulator(acc: f64, _bits_per_sample: u8) -> Self {
        acc as i16
    }
}

impl PcmSample for i32 {
    const STORAGE: Storage = Storage::I32;

    fn plane(planes: &Planes) -> Option<&[Self]> {
        match planes {
            Planes::I32(v) => Some(v),
            _ => None,
        }
    }

    fn plane_mut(planes: &mut Planes) -> Option<&mut [Self]> {
        match planes {
            Planes::I32(v) => Some(v),
            _ => None,
        }
    }

    fn wrap(samples: Vec<Self>) -> Planes {
        Planes::I32(samples)
    }

    #[inline]
    fn to_accumulator(self) -> f64 {
        self as f64
    }

    /// Clamps only the upper bound to the format's maximum before truncating.
    #[inline]
    fn from_accumulator(acc: f64, bits_per_sample: u8) -> Self {
        let max = ((1i64 << (bits_per_sample - 1)) - 1) as f64;
        acc.min(max) as i32
    }
}

impl PcmSample for f32 {
    const STORAGE: Storage = Storage::F32;

    fn plane(planes: &Planes) -> Option<&[Self]> {
        match planes {
            Planes::F32(v) => Some(v),
            _ => None,
        }
    }

    fn plane_mut(planes: &mut Planes) -> Option<&mut [Self]> {
        match planes {
            Planes::F32(v) => Some(v),
            _ => None,
        }
    }

    fn wrap(samples: Vec<Self>) -> Planes {
        Planes::F32(samples)
    }

    #[inline]
    fn to_accumulator(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_accumulator(acc: f64, _bits_per_sample: u8) -> Self {
        acc as f32
    }
}

/// A run of samples for every channel of a stream's layout.
#[derive(Clone, PartialEq, Debug)]
pub struct Block {
    format: AudioFormat,
    len: usize,
    planes: Planes,
}

impl Block {
    /// Allocate a block of `len` samples per channel, all at equilibrium.
    pub fn zeroed(format: AudioFormat, len: usize) -> Self {
        let total = len * format.channels();
        let planes = match format.storage() {
            Storage::I16 => Planes::I16(vec![i16::EQUILIBRIUM; total]),
            Storage::I32 => Planes::I32(vec![i32::EQUILIBRIUM; total]),
            Storage::F32 => Planes::F32(vec![f32::EQUILIBRIUM; total]),
        };
        Self { format, len, planes }
    }

    /// Build a block from one slice per channel, in layout order.
    pub fn from_channels<S: PcmSample>(format: AudioFormat, channels: &[&[S]]) -> Result<Self> {
        if format.storage() != S::STORAGE {
            return Err(mismatch(format!("{:?} samples for {:?} format", S::STORAGE, format.storage())));
        }
        if channels.len() != format.channels() {
            return Err(mismatch(format!(
                "{} channel slices for {} channels",
                channels.len(),
                format.channels()
            )));
        }
        let len = channels.first().map_or(0, |c| c.len());
        if channels.iter().any(|c| c.len() != len) {
            return Err(mismatch("channel slices differ in length".into()));
        }
        let samples = channels.iter().flat_map(|c| c.iter().copied()).collect();
        Ok(Self {
            format,
            len,
            planes: S::wrap(samples),
        })
    }

    #[inline]
    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    /// Samples per channel.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.format.channels()
    }

    pub fn planes(&self) -> &Planes {
        &self.planes
    }

    pub fn into_ref(self) -> BlockRef {
        Arc::new(self)
    }

    fn plane_range(&self, channel: usize) -> Result<Range<usize>> {
        if channel >= self.channels() {
            return Err(mismatch(format!(
                "channel index {} of a {}-channel block",
                channel,
                self.channels()
            )));
        }
        Ok(channel * self.len..(channel + 1) * self.len)
    }

    /// Samples of the channel at plane index `channel`.
    pub fn channel<S: PcmSample>(&self, channel: usize) -> Result<&[S]> {
        let range = self.plane_range(channel)?;
        let plane = S::plane(&self.planes)
            .ok_or_else(|| mismatch(format!("read {:?} from {:?} block", S::STORAGE, self.format.storage())))?;
        Ok(&plane[range])
    }

    pub fn channel_mut<S: PcmSample>(&mut self, channel: usize) -> Result<&mut [S]> {
        let range = self.plane_range(channel)?;
        let storage = self.format.storage();
        let plane = S::plane_mut(&mut self.planes)
            .ok_or_else(|| mismatch(format!("write {:?} into {:?} block", S::STORAGE, storage)))?;
        Ok(&mut plane[range])
    }

    /// Copy `count` samples of `src` channel `src_ch` starting at `src_offset`
    /// into channel `dst_ch` of this block at `dst_offset`.
    pub fn copy_from(
        &mut self,
        dst_ch: usize,
        dst_offset: usize,
        src: &Block,
        src_ch: usize,
        src_offset: usize,
        count: usize,
    ) -> Result<()> {
        if !self.format.same_sample_kind(&src.format) {
            return Err(mismatch(format!(
                "copy {:?} samples into {:?} block",
                src.format.storage(),
                self.format.storage()
            )));
        }
        let dst = Span { ch: dst_ch, offset: dst_offset, count };
        let src_span = Span { ch: src_ch, offset: src_offset, count };
        match self.format.storage() {
            Storage::I16 => copy_samples::<i16>(self, dst, src, src_span),
            Storage::I32 => copy_samples::<i32>(self, dst, src, src_span),
            Storage::F32 => copy_samples::<f32>(self, dst, src, src_span),
        }
    }
}

/// Build a block of `length` samples from `first` starting at `offset`,
/// continuing at the start of `second` once `first` runs out.
pub(crate) fn join(
    format: AudioFormat,
    first: &Block,
    offset: usize,
    second: Option<&Block>,
    length: usize,
) -> Result<Block> {
    let head = first.len().saturating_sub(offset).min(length);
    let rest = length - head;
    let mut out = Block::zeroed(format, length);
    for ch in 0..format.channels() {
        out.copy_from(ch, 0, first, ch, offset, head)?;
    }
    if rest > 0 {
        let second = second.ok_or_else(|| mismatch(format!("{} samples missing after block end", rest)))?;
        for ch in 0..format.channels() {
            out.copy_from(ch, head, second, ch, 0, rest)?;
        }
    }
    Ok(out)
}

#[derive(Clone, Copy)]
struct Span {
    ch: usize,
    offset: usize,
    count: usize,
}

fn copy_samples<S: PcmSample>(dst: &mut Block, d: Span, src: &Block, s: Span) -> Result<()> {
    if s.count == 0 {
        return Ok(());
    }
    let from = src
        .channel::<S>(s.ch)?
        .get(s.offset..s.offset + s.count)
        .ok_or_else(|| mismatch(format!("source range {}..{} of {}", s.offset, s.offset + s.count, src.len)))?;
    let dst_len = dst.len;
    let to = dst
        .channel_mut::<S>(d.ch)?
        .get_mut(d.offset..d.offset + d.count)
        .ok_or_else(|| mismatch(format!("target range {}..{} of {}", d.offset, d.offset + d.count, dst_len)))?;
    to.copy_from_slice(from);
    Ok(())
}

fn mismatch(detail: String) -> Error {
    Error::BlockMismatch { op: "Block", detail }
}
