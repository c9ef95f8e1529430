//! Sample rate relabeling

use tracing::debug;

use crate::block::BlockRef;
use crate::error::{Error, Result};
use crate::format::AudioInfo;
use crate::node::{AudioNode, Inputs, Requests, Stream};

/// Where [`AssumeSampleRate`] takes its new rate from.
#[derive(Clone, Debug)]
pub enum RateSource {
    Explicit(u32),
    /// Use the rate of another stream.
    From(Stream),
}

/// Changes only the declared sample rate; blocks pass through untouched.
pub struct AssumeSampleRate {
    source: Stream,
    info: AudioInfo,
}

impl AssumeSampleRate {
    pub fn create(source: &Stream, rate: RateSource) -> Result<Stream> {
        let sample_rate = match rate {
            RateSource::Explicit(rate) => rate,
            RateSource::From(other) => other.info().sample_rate,
        };
        if sample_rate < 1 {
            return Err(Error::InvalidSampleRate(sample_rate));
        }
        let info = AudioInfo {
            sample_rate,
            ..*source.info()
        };
        debug!(from = source.info().sample_rate, to = sample_rate, "sample rate assumed");
        Ok(Stream::new(Self {
            source: source.clone(),
            info,
        }))
    }
}

impl AudioNode for AssumeSampleRate {
    fn name(&self) -> &'static str {
        "AssumeSampleRate"
    }

    fn info(&self) -> &AudioInfo {
        &self.info
    }

    fn request(&self, n: usize, requests: &mut Requests) {
        requests.push(&self.source, n);
    }

    fn assemble(&self, n: usize, inputs: &Inputs) -> Result<BlockRef> {
        inputs.get(&self.source, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::source::{TestAudio, TestOptions};

    #[test]
    fn relabels_rate_only() {
        let tone = TestAudio::create(TestOptions::default().with_length(100)).unwrap();
        let fast = TestAudio::create(TestOptions::default().with_length(10).with_sample_rate(96000)).unwrap();

        let relabeled = AssumeSampleRate::create(&tone, RateSource::Explicit(48000)).unwrap();
        assert_eq!(relabeled.info().sample_rate, 48000);
        assert_eq!(relabeled.info().num_samples, 100);

        let copied = AssumeSampleRate::create(&tone, RateSource::From(fast)).unwrap();
        assert_eq!(copied.info().sample_rate, 96000);

        assert_eq!(
            AssumeSampleRate::create(&tone, RateSource::Explicit(0)).err(),
            Some(Error::InvalidSampleRate(0))
        );
    }
}
