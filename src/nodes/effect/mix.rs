//! Weighted channel mixing

use alloc::vec::Vec;

use itertools::Itertools;
use tracing::{debug, trace};

use super::binding::{bind_channels, distinct_streams, resolve, BoundChannel, SourceBinding};
use crate::block::{Block, BlockRef, PcmSample};
use crate::error::{Error, Result};
use crate::format::{AudioInfo, Channel, ChannelLayout, Storage};
use crate::node::{AudioNode, Inputs, Requests, Stream};

const OP: &str = "AudioMix";

struct MixInput {
    bound: BoundChannel,
    /// One weight per output channel.
    weights: Vec<f32>,
}

/// Combines selected input channels into a new layout through a weight matrix.
///
/// Weights are laid out per output channel: `matrix[out * inputs + in]` scales
/// input channel `in` into output channel `out`. Sums are accumulated in
/// `f64`; float output stores the sum, 16-bit output truncates it, and wider
/// integer output first caps it at the format's positive maximum.
pub struct Mix {
    info: AudioInfo,
    inputs: Vec<MixInput>,
    streams: Vec<Stream>,
}

impl Mix {
    /// Mix explicitly bound channels into `layout`.
    pub fn new(bindings: &[SourceBinding], matrix: &[f32], layout: ChannelLayout) -> Result<Stream> {
        let first = bindings.first().ok_or(Error::NoInputs { op: OP })?;
        let streams = distinct_streams(bindings.iter().map(|b| &b.stream));
        let in_channels = bindings.len();
        let out_channels = layout.count();
        if in_channels * out_channels != matrix.len() {
            return Err(Error::WeightCount {
                op: OP,
                expected: in_channels * out_channels,
                got: matrix.len(),
            });
        }

        let reference = *first.stream.info();
        let mut inputs = Vec::with_capacity(in_channels);
        for (i, binding) in bindings.iter().enumerate() {
            let bound = resolve(OP, binding)?;
            let info = bound.stream.info();
            if info.num_samples != reference.num_samples
                || info.sample_rate != reference.sample_rate
                || info.block_size != reference.block_size
                || !info.format.same_sample_kind(&reference.format)
            {
                return Err(Error::InputMismatch {
                    op: OP,
                    what: "length, sample rate, block size, bits per sample and sample type",
                });
            }
            let weights = (0..out_channels).map(|out| matrix[out * in_channels + i]).collect();
            inputs.push(MixInput { bound, weights });
        }

        let info = AudioInfo {
            format: reference.format.with_layout(layout)?,
            ..reference
        };
        debug!(in_channels, out_channels, streams = streams.len(), "mix created");
        Ok(Stream::new(Self { info, inputs, streams }))
    }

    /// Mix every channel of every stream, in order, into `layout`.
    pub fn from_streams(streams: &[Stream], matrix: &[f32], layout: ChannelLayout) -> Result<Stream> {
        let bindings: Vec<_> = streams.iter().flat_map(SourceBinding::all).collect();
        Self::new(&bindings, matrix, layout)
    }

    /// Mix `channels`, the `i`-th taken from `streams[min(i, streams.len() - 1)]`.
    pub fn select(streams: &[Stream], channels: &[Channel], matrix: &[f32], layout: ChannelLayout) -> Result<Stream> {
        let bindings = bind_channels(OP, streams, channels)?;
        Self::new(&bindings, matrix, layout)
    }

    fn mix_block<S: PcmSample>(&self, n: usize, inputs: &Inputs) -> Result<BlockRef> {
        let blocks = self
            .inputs
            .iter()
            .map(|input| inputs.get(&input.bound.stream, n))
            .collect::<Result<Vec<_>>>()?;
        let sources = self
            .inputs
            .iter()
            .zip_eq(&blocks)
            .map(|(input, block)| block.channel::<S>(input.bound.plane))
            .collect::<Result<Vec<_>>>()?;

        let len = blocks.iter().map(|b| b.len()).min().unwrap_or(0);
        let bits = self.info.format.bits_per_sample();
        let mut out = Block::zeroed(self.info.format, len);

        for dst_ch in 0..self.info.format.channels() {
            let dst = out.channel_mut::<S>(dst_ch)?;
            for (i, sample) in dst.iter_mut().enumerate() {
                let acc: f64 = self
                    .inputs
                    .iter()
                    .zip(&sources)
                    .map(|(input, src)| src[i].to_accumulator() * f64::from(input.weights[dst_ch]))
                    .sum();
                *sample = S::from_accumulator(acc, bits);
            }
        }
        Ok(out.into_ref())
    }
}

impl AudioNode for Mix {
    fn name(&self) -> &'static str {
        OP
    }

    fn info(&self) -> &AudioInfo {
        &self.info
    }

    fn request(&self, n: usize, requests: &mut Requests) {
        for stream in &self.streams {
            requests.push(stream, n);
        }
    }

    fn assemble(&self, n: usize, inputs: &Inputs) -> Result<BlockRef> {
        trace!(index = n, upstream = self.streams.len(), "mixing block");
        match self.info.format.storage() {
            Storage::I16 => self.mix_block::<i16>(n, inputs),
            Storage::I32 => self.mix_block::<i32>(n, inputs),
            Storage::F32 => self.mix_block::<f32>(n, inputs),
        }
    }
}
