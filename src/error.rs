//! Error type shared by node construction and block production.

use crate::format::Channel;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Everything that can go wrong while building or rendering a stream.
///
/// Construction errors are returned before any [`Stream`](crate::Stream) is
/// created. Production errors surface from [`Renderer`](crate::Renderer) and are
/// passed downstream unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("invalid sample format: {sample_type:?} with {bits} bits per sample")]
    InvalidFormat {
        sample_type: crate::format::SampleType,
        bits: u8,
    },

    #[error("invalid output channel configuration (empty layout)")]
    InvalidLayout,

    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    #[error("invalid block size: {0}")]
    InvalidBlockSize(usize),

    #[error("invalid sample count: {0}")]
    InvalidSampleCount(u64),

    #[error("{op}: both last sample and length specified")]
    BothLastAndLength { op: &'static str },

    #[error("{op}: invalid last sample specified (last is less than first)")]
    LastBeforeFirst { op: &'static str },

    #[error("{op}: invalid length specified (less than 1)")]
    InvalidLength { op: &'static str },

    #[error("{op}: last sample beyond stream end")]
    BeyondEnd { op: &'static str },

    #[error("{op}: format mismatch")]
    FormatMismatch { op: &'static str },

    #[error("{op}: the resulting stream is too long")]
    TooLong { op: &'static str },

    #[error("{op}: no input streams given")]
    NoInputs { op: &'static str },

    #[error("{op}: cannot have more input streams than selected input channels")]
    TooManyInputs { op: &'static str },

    #[error("{op}: matrix weight count mismatch: expected {expected}, got {got}")]
    WeightCount {
        op: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{op}: channel {channel} not present in input")]
    ChannelNotPresent { op: &'static str, channel: Channel },

    #[error("{op}: all inputs must have the same {what}")]
    InputMismatch {
        op: &'static str,
        what: &'static str,
    },

    #[error("{op}: number of input channels ({inputs}) doesn't match number of outputs ({outputs})")]
    ChannelCountMismatch {
        op: &'static str,
        inputs: usize,
        outputs: usize,
    },

    #[error("TestAudio: bits must be 16 and samples must be integers")]
    TestAudioBits,

    #[error("block {index} out of range (stream has {count} blocks)")]
    BlockOutOfRange { index: usize, count: usize },

    #[error("block {index} of node {node} was not requested")]
    MissingInput { node: u64, index: usize },

    #[error("{op}: unexpected block: {detail}")]
    BlockMismatch {
        op: &'static str,
        detail: String,
    },

    #[error("block production failed: {0}")]
    Produce(String),
}
