//! Sample-accurate editing of block-based audio streams.
//!
//! Every stream is a sequence of fixed-size blocks; only the last block of a
//! stream may be shorter. Nodes in [`nodes`] cut, join, mix and route streams
//! without regard for where their block boundaries fall, working out per
//! output block which upstream blocks to fetch and how to stitch them.
//!
//! ```
//! use schnitt::{Renderer, nodes::{Splice, TestAudio, TestOptions, Trim, TrimRange}};
//!
//! let tone = TestAudio::create(TestOptions::default().with_length(1000).with_block_size(64)).unwrap();
//! let middle = Trim::create(&tone, TrimRange::between(100, 899)).unwrap();
//! let twice = Splice::create(&[middle.clone(), middle]).unwrap();
//!
//! let samples = Renderer::new().collect_channel::<i16>(&twice, 0).unwrap();
//! assert_eq!(samples.len(), 1600);
//! assert_eq!(samples[800], 100);
//! ```

extern crate alloc;

mod block;
mod error;
mod format;
mod graph;
mod node;
pub mod nodes;

pub use block::{Block, BlockRef, PcmSample, Planes};
pub use error::{Error, Result};
pub use format::{AudioFormat, AudioInfo, Channel, ChannelLayout, SampleType, Storage, DEFAULT_BLOCK_SIZE};
pub use graph::Renderer;
pub use node::{AudioNode, BlockAddress, Inputs, NodeId, Requests, Stream};
