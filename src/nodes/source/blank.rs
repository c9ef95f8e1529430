//! Silence generator

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::block::{Block, BlockRef};
use crate::error::Result;
use crate::format::{AudioFormat, AudioInfo, ChannelLayout, SampleType, DEFAULT_BLOCK_SIZE};
use crate::node::{AudioNode, Inputs, Requests, Stream};

/// Parameters for [`BlankAudio`].
///
/// Defaults to one hour of 16-bit stereo silence at 44.1 kHz.
#[derive(Clone, Copy, Debug)]
pub struct BlankOptions {
    pub layout: ChannelLayout,
    pub sample_type: SampleType,
    pub bits_per_sample: u8,
    pub sample_rate: u32,
    /// Length in samples; `None` means one hour at `sample_rate`.
    pub length: Option<u64>,
    /// Share one allocated block between all requests.
    pub keep: bool,
    pub block_size: usize,
}

impl Default for BlankOptions {
    fn default() -> Self {
        Self {
            layout: ChannelLayout::STEREO,
            sample_type: SampleType::Integer,
            bits_per_sample: 16,
            sample_rate: 44100,
            length: None,
            keep: false,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl BlankOptions {
    pub fn with_layout(mut self, layout: ChannelLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_format(mut self, sample_type: SampleType, bits_per_sample: u8) -> Self {
        self.sample_type = sample_type;
        self.bits_per_sample = bits_per_sample;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_length(mut self, samples: u64) -> Self {
        self.length = Some(samples);
        self
    }

    pub fn with_keep(mut self, keep: bool) -> Self {
        self.keep = keep;
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub(crate) fn info(&self) -> Result<AudioInfo> {
        let format = AudioFormat::new(self.sample_type, self.bits_per_sample, self.layout)?;
        let length = self
            .length
            .unwrap_or_else(|| u64::from(self.sample_rate) * 60 * 60);
        AudioInfo::new(format, self.sample_rate, length, self.block_size)
    }
}

/// Produces silent blocks.
///
/// With [`keep`](BlankOptions::keep) set, the full-length block and the shorter
/// final block are each allocated at most once and then handed out by
/// reference. Concurrent first requests wait on the slot's lock, so every
/// caller sees the same allocation.
pub struct BlankAudio {
    info: AudioInfo,
    keep: bool,
    full: Mutex<Option<BlockRef>>,
    tail: Mutex<Option<BlockRef>>,
}

impl BlankAudio {
    pub fn new(options: BlankOptions) -> Result<Self> {
        let info = options.info()?;
        debug!(?info, keep = options.keep, "blank audio created");
        Ok(Self {
            info,
            keep: options.keep,
            full: Mutex::new(None),
            tail: Mutex::new(None),
        })
    }

    pub fn create(options: BlankOptions) -> Result<Stream> {
        Self::new(options).map(Stream::new)
    }
}

impl AudioNode for BlankAudio {
    fn name(&self) -> &'static str {
        "BlankAudio"
    }

    fn info(&self) -> &AudioInfo {
        &self.info
    }

    fn request(&self, _n: usize, _requests: &mut Requests) {}

    fn assemble(&self, n: usize, _inputs: &Inputs) -> Result<BlockRef> {
        let len = self.info.block_len(n);
        if !self.keep {
            return Ok(Block::zeroed(self.info.format, len).into_ref());
        }

        let slot = if len == self.info.block_size {
            &self.full
        } else {
            &self.tail
        };
        let mut slot = slot.lock();
        if let Some(block) = slot.as_ref() {
            return Ok(block.clone());
        }
        trace!(index = n, len, "allocating retained silence");
        let block = Block::zeroed(self.info.format, len).into_ref();
        *slot = Some(block.clone());
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::sync::Arc;

    #[test]
    fn defaults_to_an_hour_of_stereo() {
        let blank = BlankAudio::new(BlankOptions::default()).unwrap();
        assert_eq!(blank.info().num_samples, 44100 * 3600);
        assert_eq!(blank.info().format.channels(), 2);
        assert_eq!(blank.info().block_size, DEFAULT_BLOCK_SIZE);
    }

    #[test]
    fn keep_shares_blocks_by_length() {
        let options = BlankOptions::default().with_length(250).with_block_size(100).with_keep(true);
        let blank = BlankAudio::new(options).unwrap();
        let inputs = Inputs::new();

        let a = blank.assemble(0, &inputs).unwrap();
        let b = blank.assemble(1, &inputs).unwrap();
        let tail = blank.assemble(2, &inputs).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.len(), 100);
        assert_eq!(tail.len(), 50);
        assert!(Arc::ptr_eq(&tail, &blank.assemble(2, &inputs).unwrap()));
        assert!(tail.channel::<i16>(1).unwrap().iter().all(|&s| s == 0));
    }

    #[test]
    fn without_keep_blocks_are_fresh() {
        let options = BlankOptions::default().with_length(250).with_block_size(100);
        let blank = BlankAudio::new(options).unwrap();
        let inputs = Inputs::new();
        let a = blank.assemble(0, &inputs).unwrap();
        let b = blank.assemble(0, &inputs).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_invalid_options() {
        assert!(BlankAudio::new(BlankOptions::default().with_sample_rate(0)).is_err());
        assert!(BlankAudio::new(BlankOptions::default().with_length(0)).is_err());
        assert!(BlankAudio::new(BlankOptions::default().with_format(SampleType::Float, 16)).is_err());
        assert!(BlankAudio::new(BlankOptions::default().with_layout(ChannelLayout(0))).is_err());
    }
}
