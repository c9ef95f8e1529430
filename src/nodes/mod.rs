//! Built-in audio nodes.
//!
//! Nodes are organized into two categories:
//!
//! ## Sources ([`source`])
//!
//! Generate blocks with no upstream streams:
//! - [`BlankAudio`] - Silence, optionally sharing one allocation per block length
//! - [`TestAudio`] - Deterministic 16-bit ramp for pipeline checks
//! - [`MemorySource`] - Serve samples already held in memory
//!
//! ## Effects ([`effect`])
//!
//! Derive a stream from one or more others:
//! - [`Trim`] - Extract a sample range
//! - [`Splice`] - Concatenate streams
//! - [`Mix`] - Weighted combination of channels into a new layout
//! - [`ShuffleChannels`] - Reorder, duplicate or merge channels
//! - [`SplitChannels`] - One mono stream per channel
//! - [`AssumeSampleRate`] - Relabel the sample rate
//!
//! Every constructor validates its arguments and returns a [`Stream`](crate::Stream),
//! or an [`Error`](crate::Error) without creating anything.

pub mod effect;
pub mod source;

pub use effect::{
    bind_channels, AssumeSampleRate, Mix, RateSource, ShuffleChannels, SourceBinding, Splice, SplitChannels,
    Trim, TrimRange,
};
pub use source::{BlankAudio, BlankOptions, MemorySource, TestAudio, TestOptions};
