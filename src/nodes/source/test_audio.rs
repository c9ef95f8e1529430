//! Deterministic ramp generator for checking pipelines end to end

use tracing::debug;

use crate::block::{Block, BlockRef};
use crate::error::{Error, Result};
use crate::format::{AudioFormat, AudioInfo, ChannelLayout, SampleType, Storage, DEFAULT_BLOCK_SIZE};
use crate::node::{AudioNode, Inputs, Requests, Stream};

/// Parameters for [`TestAudio`]. Same defaults as [`BlankOptions`](super::BlankOptions).
#[derive(Clone, Copy, Debug)]
pub struct TestOptions {
    pub layout: ChannelLayout,
    pub sample_type: SampleType,
    pub bits_per_sample: u8,
    pub sample_rate: u32,
    pub length: Option<u64>,
    pub block_size: usize,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            layout: ChannelLayout::STEREO,
            sample_type: SampleType::Integer,
            bits_per_sample: 16,
            sample_rate: 44100,
            length: None,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl TestOptions {
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

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }
}

/// Emits `(sample index mod 65536)` as a 16-bit pattern on every channel.
pub struct TestAudio {
    info: AudioInfo,
}

impl TestAudio {
    pub fn new(options: TestOptions) -> Result<Self> {
        let format = AudioFormat::new(options.sample_type, options.bits_per_sample, options.layout)?;
        if format.storage() != Storage::I16 {
            return Err(Error::TestAudioBits);
        }
        let length = options
            .length
            .unwrap_or_else(|| u64::from(options.sample_rate) * 60 * 60);
        let info = AudioInfo::new(format, options.sample_rate, length, options.block_size)?;
        debug!(?info, "test audio created");
        Ok(Self { info })
    }

    pub fn create(options: TestOptions) -> Result<Stream> {
        Self::new(options).map(Stream::new)
    }

    /// Value of the sample at absolute position `index`.
    #[inline]
    pub fn sample_at(index: u64) -> i16 {
        (index % 65536) as u16 as i16
    }
}

impl AudioNode for TestAudio {
    fn name(&self) -> &'static str {
        "TestAudio"
    }

    fn info(&self) -> &AudioInfo {
        &self.info
    }

    fn request(&self, _n: usize, _requests: &mut Requests) {}

    fn assemble(&self, n: usize, _inputs: &Inputs) -> Result<BlockRef> {
        let len = self.info.block_len(n);
        let start = self.info.block_start(n);
        let mut block = Block::zeroed(self.info.format, len);
        for ch in 0..self.info.format.channels() {
            for (i, sample) in block.channel_mut::<i16>(ch)?.iter_mut().enumerate() {
                *sample = Self::sample_at(start + i as u64);
            }
        }
        Ok(block.into_ref())
    }
}
