//! Splitting a stream into one stream per channel

use alloc::vec::Vec;

use tracing::debug;

use crate::block::{Block, BlockRef};
use crate::error::Result;
use crate::format::{AudioInfo, ChannelLayout};
use crate::node::{AudioNode, Inputs, Requests, Stream};

const OP: &str = "SplitChannels";

/// One channel of a split stream.
///
/// All outputs of one split request the same source block, so a caching host
/// fetches it once for every channel.
pub struct SplitChannels {
    source: Stream,
    info: AudioInfo,
    plane: usize,
}

impl SplitChannels {
    /// One mono stream per channel of `source`, in layout order. Each output
    /// keeps the channel it was taken from as its layout.
    pub fn create(source: &Stream) -> Result<Vec<Stream>> {
        let source_info = *source.info();
        let outputs = source_info
            .format
            .layout()
            .iter()
            .enumerate()
            .map(|(plane, channel)| {
                let format = source_info
                    .format
                    .with_layout(ChannelLayout::from_channels([channel]))?;
                Ok(Stream::new(Self {
                    source: source.clone(),
                    info: AudioInfo { format, ..source_info },
                    plane,
                }))
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(node = source.name(), outputs = outputs.len(), "split created");
        Ok(outputs)
    }
}

impl AudioNode for SplitChannels {
    fn name(&self) -> &'static str {
        OP
    }

    fn info(&self) -> &AudioInfo {
        &self.info
    }

    fn request(&self, n: usize, requests: &mut Requests) {
        requests.push(&self.source, n);
    }

    fn assemble(&self, n: usize, inputs: &Inputs) -> Result<BlockRef> {
        let src = inputs.get(&self.source, n)?;
        let mut out = Block::zeroed(self.info.format, src.len());
        out.copy_from(0, 0, &src, self.plane, 0, src.len())?;
        Ok(out.into_ref())
    }
}
