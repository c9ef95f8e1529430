//! Channel routing: reorder, duplicate and combine channels of several streams

use alloc::vec::Vec;

use tracing::{debug, trace};

use super::binding::{bind_channels, distinct_streams, resolve, BoundChannel, SourceBinding};
use crate::block::{Block, BlockRef};
use crate::error::{Error, Result};
use crate::format::{AudioInfo, Channel, ChannelLayout};
use crate::node::{AudioNode, Inputs, Requests, Stream};

const OP: &str = "ShuffleChannels";

/// Builds a stream whose `k`-th channel is a copy of one bound input channel.
///
/// Inputs may differ in length; the output is as long as the longest, and
/// channels whose source has run out are filled with silence.
pub struct ShuffleChannels {
    info: AudioInfo,
    inputs: Vec<BoundChannel>,
    streams: Vec<Stream>,
}

impl ShuffleChannels {
    /// Route `channels` into `layout`; the `i`-th channel is read from
    /// `streams[min(i, streams.len() - 1)]`.
    pub fn create(streams: &[Stream], channels: &[Channel], layout: ChannelLayout) -> Result<Stream> {
        let bindings = bind_channels(OP, streams, channels)?;
        Self::from_bindings(&bindings, layout)
    }

    /// Route explicit bindings, one per channel of `layout` in layout order.
    pub fn from_bindings(bindings: &[SourceBinding], layout: ChannelLayout) -> Result<Stream> {
        let first = bindings.first().ok_or(Error::NoInputs { op: OP })?;
        if layout.count() != bindings.len() {
            return Err(Error::ChannelCountMismatch {
                op: OP,
                inputs: bindings.len(),
                outputs: layout.count(),
            });
        }

        let reference = *first.stream.info();
        let mut num_samples = reference.num_samples;
        let mut inputs = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let bound = resolve(OP, binding)?;
            let info = bound.stream.info();
            if info.sample_rate != reference.sample_rate
                || info.block_size != reference.block_size
                || !info.format.same_sample_kind(&reference.format)
            {
                return Err(Error::InputMismatch {
                    op: OP,
                    what: "sample rate, block size, bits per sample and sample type",
                });
            }
            num_samples = num_samples.max(info.num_samples);
            inputs.push(bound);
        }

        let info = AudioInfo {
            format: reference.format.with_layout(layout)?,
            num_samples,
            ..reference
        };
        let streams = distinct_streams(inputs.iter().map(|b| &b.stream));
        debug!(channels = inputs.len(), streams = streams.len(), num_samples, "shuffle created");
        Ok(Stream::new(Self { info, inputs, streams }))
    }
}

impl AudioNode for ShuffleChannels {
    fn name(&self) -> &'static str {
        OP
    }

    fn info(&self) -> &AudioInfo {
        &self.info
    }

    fn request(&self, n: usize, requests: &mut Requests) {
        for stream in &self.streams {
            if n < stream.info().num_blocks() {
                requests.push(stream, n);
            }
        }
    }

    fn assemble(&self, n: usize, inputs: &Inputs) -> Result<BlockRef> {
        let length = self.info.block_len(n);
        let mut out = Block::zeroed(self.info.format, length);
        for (dst_ch, input) in self.inputs.iter().enumerate() {
            if n >= input.stream.info().num_blocks() {
                continue;
            }
            let src = inputs.get(&input.stream, n)?;
            let copy = length.min(src.len());
            out.copy_from(dst_ch, 0, &src, input.plane, 0, copy)?;
            if copy < length {
                trace!(index = n, channel = dst_ch, silence = length - copy, "shuffle zero-fill");
            }
        }
        Ok(out.into_ref())
    }
}
