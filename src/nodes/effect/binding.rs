//! Channel selection shared by mixing and channel routing

use alloc::vec::Vec;

use hashbrown::HashSet;

use crate::error::{Error, Result};
use crate::format::Channel;
use crate::node::Stream;

/// One input channel: a stream and a channel of its layout.
#[derive(Clone, Debug)]
pub struct SourceBinding {
    pub stream: Stream,
    pub channel: Channel,
}

impl SourceBinding {
    pub fn new(stream: &Stream, channel: Channel) -> Self {
        Self {
            stream: stream.clone(),
            channel,
        }
    }

    /// One binding per channel of `stream`, in layout order.
    pub fn all(stream: &Stream) -> impl Iterator<Item = SourceBinding> + '_ {
        stream
            .info()
            .format
            .layout()
            .iter()
            .map(move |channel| SourceBinding::new(stream, channel))
    }
}

/// Pair each of `channels` with a stream: the `i`-th channel comes from
/// `streams[i]`, or from the last stream once the list runs out.
pub fn bind_channels(op: &'static str, streams: &[Stream], channels: &[Channel]) -> Result<Vec<SourceBinding>> {
    if streams.is_empty() || channels.is_empty() {
        return Err(Error::NoInputs { op });
    }
    if streams.len() > channels.len() {
        return Err(Error::TooManyInputs { op });
    }
    Ok(channels
        .iter()
        .enumerate()
        .map(|(i, &channel)| SourceBinding::new(&streams[i.min(streams.len() - 1)], channel))
        .collect())
}

/// A binding checked against its stream's layout.
#[derive(Clone, Debug)]
pub(crate) struct BoundChannel {
    pub stream: Stream,
    /// Plane index of the channel inside the stream's blocks.
    pub plane: usize,
}

pub(crate) fn resolve(op: &'static str, binding: &SourceBinding) -> Result<BoundChannel> {
    let layout = binding.stream.info().format.layout();
    let plane = layout.rank(binding.channel).ok_or(Error::ChannelNotPresent {
        op,
        channel: binding.channel,
    })?;
    Ok(BoundChannel {
        stream: binding.stream.clone(),
        plane,
    })
}

/// Each underlying stream once, in first-use order.
pub(crate) fn distinct_streams<'a>(streams: impl IntoIterator<Item = &'a Stream>) -> Vec<Stream> {
    let mut seen = HashSet::new();
    streams
        .into_iter()
        .filter(|s| seen.insert(s.id()))
        .cloned()
        .collect()
}
