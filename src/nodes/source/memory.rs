//! Stream over pre-decoded, in-memory samples

use alloc::vec::Vec;

use tracing::debug;

use crate::block::{Block, BlockRef, PcmSample};
use crate::error::{Error, Result};
use crate::format::{AudioFormat, AudioInfo};
use crate::node::{AudioNode, Inputs, Requests, Stream};

/// Plays back planar samples held in memory, cut into blocks up front.
pub struct MemorySource {
    info: AudioInfo,
    blocks: Vec<BlockRef>,
}

impl MemorySource {
    /// Create a source from one sample vector per channel of `format`'s layout.
    ///
    /// All channels must have the same, non-zero length.
    pub fn new<S: PcmSample>(
        format: AudioFormat,
        sample_rate: u32,
        block_size: usize,
        channels: &[Vec<S>],
    ) -> Result<Self> {
        if channels.len() != format.channels() {
            return Err(Error::BlockMismatch {
                op: "MemorySource",
                detail: format!("{} channel buffers for {} channels", channels.len(), format.channels()),
            });
        }
        let num_samples = channels.first().map_or(0, |c| c.len()) as u64;
        if channels.iter().any(|c| c.len() as u64 != num_samples) {
            return Err(Error::InputMismatch {
                op: "MemorySource",
                what: "length",
            });
        }
        let info = AudioInfo::new(format, sample_rate, num_samples, block_size)?;

        let mut blocks = Vec::with_capacity(info.num_blocks());
        for n in 0..info.num_blocks() {
            let start = info.block_start(n) as usize;
            let end = start + info.block_len(n);
            let slices: Vec<&[S]> = channels.iter().map(|c| &c[start..end]).collect();
            blocks.push(Block::from_channels(format, &slices)?.into_ref());
        }

        debug!(?format, sample_rate, num_samples, block_size, "memory source created");
        Ok(Self { info, blocks })
    }

    pub fn create<S: PcmSample>(
        format: AudioFormat,
        sample_rate: u32,
        block_size: usize,
        channels: &[Vec<S>],
    ) -> Result<Stream> {
        Self::new(format, sample_rate, block_size, channels).map(Stream::new)
    }
}

impl AudioNode for MemorySource {
    fn name(&self) -> &'static str {
        "MemorySource"
    }

    fn info(&self) -> &AudioInfo {
        &self.info
    }

    fn request(&self, _n: usize, _requests: &mut Requests) {}

    fn assemble(&self, n: usize, _inputs: &Inputs) -> Result<BlockRef> {
        self.blocks.get(n).cloned().ok_or(Error::BlockOutOfRange {
            index: n,
            count: self.blocks.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ChannelLayout;

    #[test]
    fn cuts_into_blocks() {
        let format = AudioFormat::int16(ChannelLayout::STEREO).unwrap();
        let left: Vec<i16> = (0..10).collect();
        let right: Vec<i16> = (100..110).collect();
        let source = MemorySource::new(format, 8000, 4, &[left, right]).unwrap();

        assert_eq!(source.info().num_blocks(), 3);
        let last = source.assemble(2, &Inputs::new()).unwrap();
        assert_eq!(last.len(), 2);
        assert_eq!(last.channel::<i16>(0).unwrap(), &[8, 9]);
        assert_eq!(last.channel::<i16>(1).unwrap(), &[108, 109]);
    }

    #[test]
    fn rejects_ragged_channels() {
        let format = AudioFormat::float32(ChannelLayout::STEREO).unwrap();
        let err = MemorySource::new(format, 8000, 4, &[vec![0.0f32; 3], vec![0.0; 4]]).err();
        assert!(matches!(err, Some(Error::InputMismatch { .. })));
        let err = MemorySource::new(format, 8000, 4, &[vec![0.0f32; 3]]).err();
        assert!(matches!(err, Some(Error::BlockMismatch { .. })));
    }
}
