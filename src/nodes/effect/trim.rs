//! Range extraction

use tracing::{debug, trace};

use crate::block::{join, BlockRef};
use crate::error::{Error, Result};
use crate::format::AudioInfo;
use crate::node::{AudioNode, Inputs, Requests, Stream};

const OP: &str = "AudioTrim";

/// Which samples to keep. At most one of `last` and `length` may be set;
/// with neither, the range runs to the end of the source.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct TrimRange {
    pub first: Option<u64>,
    /// Inclusive index of the last kept sample.
    pub last: Option<u64>,
    pub length: Option<u64>,
}

impl TrimRange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples `first..=last`.
    pub fn between(first: u64, last: u64) -> Self {
        Self {
            first: Some(first),
            last: Some(last),
            length: None,
        }
    }

    pub fn with_first(mut self, first: u64) -> Self {
        self.first = Some(first);
        self
    }

    pub fn with_last(mut self, last: u64) -> Self {
        self.last = Some(last);
        self
    }

    pub fn with_length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    fn is_empty(&self) -> bool {
        self.first.is_none() && self.last.is_none() && self.length.is_none()
    }

    /// Number of samples kept from a source of `total` samples.
    fn resolve(&self, total: u64) -> Result<u64> {
        let first = self.first.unwrap_or(0);
        if self.last.is_some() && self.length.is_some() {
            return Err(Error::BothLastAndLength { op: OP });
        }
        if matches!(self.last, Some(last) if last < first) {
            return Err(Error::LastBeforeFirst { op: OP });
        }
        if self.length == Some(0) {
            return Err(Error::InvalidLength { op: OP });
        }

        let beyond_last = matches!(self.last, Some(last) if last >= total);
        let beyond_length = matches!(self.length, Some(len) if first.checked_add(len).map_or(true, |end| end > total));
        if beyond_last || beyond_length || first >= total {
            return Err(Error::BeyondEnd { op: OP });
        }

        Ok(match (self.last, self.length) {
            (Some(last), _) => last - first + 1,
            (None, Some(length)) => length,
            (None, None) => total - first,
        })
    }
}

/// Where output block `n` comes from in the source.
struct Segment {
    block: usize,
    offset: usize,
    length: usize,
    /// The range spills into `block + 1`.
    straddles: bool,
}

/// A sub-range of a source stream.
pub struct Trim {
    source: Stream,
    info: AudioInfo,
    first: u64,
}

impl Trim {
    /// Trim `source` to `range`.
    ///
    /// An empty range, or one covering the whole source, returns `source`
    /// itself rather than a new node.
    pub fn create(source: &Stream, range: TrimRange) -> Result<Stream> {
        let source_info = *source.info();
        source_info.validate()?;
        let length = range.resolve(source_info.num_samples)?;

        if range.is_empty() || length == source_info.num_samples {
            debug!(node = source.name(), "trim covers whole source, passing through");
            return Ok(source.clone());
        }

        let first = range.first.unwrap_or(0);
        let info = AudioInfo {
            num_samples: length,
            ..source_info
        };
        debug!(first, length, aligned = first % info.block_size as u64 == 0, "trim created");
        Ok(Stream::new(Self {
            source: source.clone(),
            info,
            first,
        }))
    }

    fn segment(&self, n: usize) -> Segment {
        let block_size = self.info.block_size as u64;
        let start = self.info.block_start(n) + self.first;
        let block = (start / block_size) as usize;
        let offset = (start % block_size) as usize;
        let length = self.info.block_len(n);
        let available = self.source.info().block_len(block).saturating_sub(offset);
        Segment {
            block,
            offset,
            length,
            straddles: available < length,
        }
    }
}

impl AudioNode for Trim {
    fn name(&self) -> &'static str {
        OP
    }

    fn info(&self) -> &AudioInfo {
        &self.info
    }

    fn request(&self, n: usize, requests: &mut Requests) {
        let seg = self.segment(n);
        requests.push(&self.source, seg.block);
        if seg.straddles {
            requests.push(&self.source, seg.block + 1);
        }
    }

    fn assemble(&self, n: usize, inputs: &Inputs) -> Result<BlockRef> {
        let seg = self.segment(n);
        let src = inputs.get(&self.source, seg.block)?;

        if seg.offset == 0 && !self.info.is_last_block(n) && src.len() == seg.length {
            trace!(index = n, upstream = seg.block, "trim pass-through");
            return Ok(src);
        }

        let next = if seg.straddles {
            Some(inputs.get(&self.source, seg.block + 1)?)
        } else {
            None
        };
        trace!(index = n, upstream = seg.block, offset = seg.offset, straddles = seg.straddles, "trim copy");
        let block = join(self.info.format, &src, seg.offset, next.as_deref(), seg.length)?;
        Ok(block.into_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(first: Option<u64>, last: Option<u64>, length: Option<u64>) -> TrimRange {
        TrimRange { first, last, length }
    }

    #[test]
    fn resolve_lengths() {
        assert_eq!(range(Some(30), Some(69), None).resolve(100), Ok(40));
        assert_eq!(range(Some(30), None, Some(5)).resolve(100), Ok(5));
        assert_eq!(range(Some(30), None, None).resolve(100), Ok(70));
        assert_eq!(range(None, Some(99), None).resolve(100), Ok(100));
    }

    #[test]
    fn resolve_errors() {
        assert_eq!(
            range(None, Some(5), Some(5)).resolve(100),
            Err(Error::BothLastAndLength { op: OP })
        );
        assert_eq!(
            range(Some(10), Some(5), None).resolve(100),
            Err(Error::LastBeforeFirst { op: OP })
        );
        assert_eq!(range(None, None, Some(0)).resolve(100), Err(Error::InvalidLength { op: OP }));
        assert_eq!(range(None, Some(100), None).resolve(100), Err(Error::BeyondEnd { op: OP }));
        assert_eq!(range(Some(90), None, Some(11)).resolve(100), Err(Error::BeyondEnd { op: OP }));
        assert_eq!(range(Some(100), None, None).resolve(100), Err(Error::BeyondEnd { op: OP }));
        assert_eq!(
            range(Some(1), None, Some(u64::MAX)).resolve(100),
            Err(Error::BeyondEnd { op: OP })
        );
    }
}
