//! Concatenation of streams

use tracing::{debug, trace};

use crate::block::{join, BlockRef};
use crate::error::{Error, Result};
use crate::format::AudioInfo;
use crate::node::{AudioNode, Inputs, Requests, Stream};

const OP: &str = "AudioSplice";

/// Two streams played back to back.
///
/// If the first stream ends on a block boundary every output block is an
/// upstream block passed through. Otherwise the block holding the seam is
/// stitched from the end of the first stream and the start of the second,
/// and every later block straddles two blocks of the second stream at a
/// constant offset.
pub struct Splice {
    first: Stream,
    second: Stream,
    info: AudioInfo,
    first_blocks: usize,
    /// Samples of the second stream's block `k` that precede output block `first_blocks + k`.
    offset: usize,
    aligned: bool,
}

impl Splice {
    /// Concatenate `streams` in order by folding pairwise splices.
    ///
    /// A single stream is returned unchanged.
    pub fn create(streams: &[Stream]) -> Result<Stream> {
        let (head, rest) = streams.split_first().ok_or(Error::NoInputs { op: OP })?;
        rest.iter()
            .try_fold(head.clone(), |acc, next| Self::pair(&acc, next))
    }

    pub fn pair(first: &Stream, second: &Stream) -> Result<Stream> {
        let a = first.info();
        let b = second.info();
        a.validate()?;
        b.validate()?;
        if !a.same_layout_and_rate(b) {
            return Err(Error::FormatMismatch { op: OP });
        }
        let num_samples = a
            .num_samples
            .checked_add(b.num_samples)
            .ok_or(Error::TooLong { op: OP })?;
        let info = AudioInfo { num_samples, ..*a };

        let tail = (a.num_samples % a.block_size as u64) as usize;
        let aligned = tail == 0;
        let offset = if aligned { 0 } else { a.block_size - tail };

        debug!(
            first = first.name(),
            second = second.name(),
            num_samples,
            aligned,
            "splice created"
        );
        Ok(Stream::new(Self {
            first: first.clone(),
            second: second.clone(),
            info,
            first_blocks: a.num_blocks(),
            offset,
            aligned,
        }))
    }

    /// Whether output block `n` also needs the block after its primary one.
    fn needs_next(&self, n: usize) -> bool {
        let length = self.info.block_len(n);
        if n + 1 == self.first_blocks {
            self.first.info().block_len(n) < length
        } else {
            let k = n - self.first_blocks;
            self.second.info().block_len(k).saturating_sub(self.offset) < length
        }
    }
}

impl AudioNode for Splice {
    fn name(&self) -> &'static str {
        OP
    }

    fn info(&self) -> &AudioInfo {
        &self.info
    }

    fn request(&self, n: usize, requests: &mut Requests) {
        if self.aligned {
            if n < self.first_blocks {
                requests.push(&self.first, n);
            } else {
                requests.push(&self.second, n - self.first_blocks);
            }
            return;
        }

        if n + 1 < self.first_blocks {
            requests.push(&self.first, n);
        } else if n + 1 == self.first_blocks {
            requests.push(&self.first, n);
            if self.needs_next(n) {
                requests.push(&self.second, 0);
            }
        } else {
            let k = n - self.first_blocks;
            requests.push(&self.second, k);
            if self.needs_next(n) {
                requests.push(&self.second, k + 1);
            }
        }
    }

    fn assemble(&self, n: usize, inputs: &Inputs) -> Result<BlockRef> {
        if self.aligned {
            return if n < self.first_blocks {
                inputs.get(&self.first, n)
            } else {
                inputs.get(&self.second, n - self.first_blocks)
            };
        }

        if n + 1 < self.first_blocks {
            return inputs.get(&self.first, n);
        }

        let length = self.info.block_len(n);
        let block = if n + 1 == self.first_blocks {
            trace!(index = n, "splice seam");
            let head = inputs.get(&self.first, n)?;
            let next = if self.needs_next(n) {
                Some(inputs.get(&self.second, 0)?)
            } else {
                None
            };
            join(self.info.format, &head, 0, next.as_deref(), length)?
        } else {
            let k = n - self.first_blocks;
            trace!(index = n, upstream = k, offset = self.offset, "splice past seam");
            let head = inputs.get(&self.second, k)?;
            let next = if self.needs_next(n) {
                Some(inputs.get(&self.second, k + 1)?)
            } else {
                None
            };
            join(self.info.format, &head, self.offset, next.as_deref(), length)?
        };
        Ok(block.into_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{AudioFormat, ChannelLayout};
    use crate::nodes::source::{BlankAudio, BlankOptions, MemorySource};

    fn mono(samples: u64, block_size: usize) -> Stream {
        BlankAudio::create(
            BlankOptions::default()
                .with_layout(ChannelLayout::MONO)
                .with_length(samples)
                .with_block_size(block_size),
        )
        .unwrap()
    }

    #[test]
    fn single_stream_passes_through() {
        let a = mono(10, 4);
        assert!(Splice::create(&[a.clone()]).unwrap().ptr_eq(&a));
        assert_eq!(Splice::create(&[]).err(), Some(Error::NoInputs { op: OP }));
    }

    #[test]
    fn rejects_mismatched_formats() {
        let mono_a = mono(10, 4);
        let stereo = BlankAudio::create(BlankOptions::default().with_length(10).with_block_size(4)).unwrap();
        let other_block = mono(10, 5);
        assert_eq!(Splice::pair(&mono_a, &stereo).err(), Some(Error::FormatMismatch { op: OP }));
        assert_eq!(Splice::pair(&mono_a, &other_block).err(), Some(Error::FormatMismatch { op: OP }));
    }

    #[test]
    fn rejects_overflowing_length() {
        let huge = mono(u64::MAX - 5, 4);
        let small = mono(10, 4);
        assert_eq!(Splice::pair(&huge, &small).err(), Some(Error::TooLong { op: OP }));
    }

    #[test]
    fn requests_follow_the_seam() {
        let format = AudioFormat::int16(ChannelLayout::MONO).unwrap();
        let a = MemorySource::create(format, 8000, 4, &[vec![0i16; 6]]).unwrap();
        let b = MemorySource::create(format, 8000, 4, &[vec![0i16; 7]]).unwrap();
        let spliced = Splice::pair(&a, &b).unwrap();
        assert_eq!(spliced.info().num_samples, 13);
        assert_eq!(spliced.info().num_blocks(), 4);

        let indices = |n: usize| {
            let mut r = Requests::new();
            spliced.node().request(n, &mut r);
            r.iter().map(|addr| (addr.stream.ptr_eq(&a), addr.index)).collect::<Vec<_>>()
        };
        assert_eq!(indices(0), vec![(true, 0)]);
        assert_eq!(indices(1), vec![(true, 1), (false, 0)]);
        // offset 2 into b's block 0 plus the head of block 1
        assert_eq!(indices(2), vec![(false, 0), (false, 1)]);
        // last output block: one sample, entirely inside b's block 1
        assert_eq!(indices(3), vec![(false, 1)]);
    }
}
