//! Core node trait, stream handles and the two-phase block protocol.

use alloc::sync::Arc;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use crate::block::BlockRef;
use crate::error::{Error, Result};
use crate::format::AudioInfo;

/// Unique identifier for a node, assigned when it is wrapped in a [`Stream`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        NodeId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

/// The core trait for block-producing nodes.
///
/// Producing block `n` happens in two phases, driven by the host:
///
/// 1. [`request`](Self::request) declares which upstream blocks are needed.
/// 2. Once all of them are available, [`assemble`](Self::assemble) builds the
///    output block from them.
///
/// Both phases may be called concurrently, for any block index and in any
/// order, so implementations keep their configuration immutable after
/// construction.
///
/// ```
/// use schnitt::{AudioInfo, AudioNode, BlockRef, Inputs, Requests, Result, Stream};
///
/// /// Passes its input through unchanged.
/// struct Identity {
///     source: Stream,
/// }
///
/// impl AudioNode for Identity {
///     fn name(&self) -> &'static str { "Identity" }
///
///     fn info(&self) -> &AudioInfo { self.source.info() }
///
///     fn request(&self, n: usize, requests: &mut Requests) {
///         requests.push(&self.source, n);
///     }
///
///     fn assemble(&self, n: usize, inputs: &Inputs) -> Result<BlockRef> {
///         inputs.get(&self.source, n)
///     }
/// }
/// ```
pub trait AudioNode: Send + Sync + 'static {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Descriptor of the stream this node produces.
    fn info(&self) -> &AudioInfo;

    /// Phase one: declare the upstream blocks needed for output block `n`.
    ///
    /// Generators request nothing.
    fn request(&self, n: usize, requests: &mut Requests);

    /// Phase two: build output block `n` from the requested blocks.
    fn assemble(&self, n: usize, inputs: &Inputs) -> Result<BlockRef>;
}

/// Shared handle to a node.
///
/// Cloning is cheap and keeps the node alive; identity is the [`NodeId`], so
/// two clones of one handle compare equal and distinct nodes never do.
#[derive(Clone)]
pub struct Stream {
    id: NodeId,
    node: Arc<dyn AudioNode>,
}

impl Stream {
    pub fn new<N: AudioNode>(node: N) -> Self {
        Self {
            id: NodeId::next(),
            node: Arc::new(node),
        }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    pub fn info(&self) -> &AudioInfo {
        self.node.info()
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.node.name()
    }

    #[inline]
    pub fn node(&self) -> &dyn AudioNode {
        &*self.node
    }

    /// Same node as `other`.
    #[inline]
    pub fn ptr_eq(&self, other: &Stream) -> bool {
        self.id == other.id
    }
}

impl PartialEq for Stream {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Stream {}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("id", &self.id.0)
            .field("name", &self.name())
            .field("info", self.info())
            .finish()
    }
}

/// One upstream block: a stream and a block index within it.
#[derive(Clone, Debug)]
pub struct BlockAddress {
    pub stream: Stream,
    pub index: usize,
}

/// Upstream blocks declared during [`AudioNode::request`].
///
/// Repeated requests for the same block are collapsed.
#[derive(Default, Debug)]
pub struct Requests {
    pending: SmallVec<[BlockAddress; 2]>,
}

impl Requests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stream: &Stream, index: usize) {
        let seen = self
            .pending
            .iter()
            .any(|a| a.stream.id() == stream.id() && a.index == index);
        if !seen {
            self.pending.push(BlockAddress {
                stream: stream.clone(),
                index,
            });
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockAddress> {
        self.pending.iter()
    }
}

impl IntoIterator for Requests {
    type Item = BlockAddress;
    type IntoIter = smallvec::IntoIter<[BlockAddress; 2]>;

    fn into_iter(self) -> Self::IntoIter {
        self.pending.into_iter()
    }
}

/// Upstream blocks made available to [`AudioNode::assemble`].
#[derive(Default, Debug)]
pub struct Inputs {
    ready: SmallVec<[(NodeId, usize, BlockRef); 2]>,
}

impl Inputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, stream: &Stream, index: usize, block: BlockRef) {
        self.ready.push((stream.id(), index, block));
    }

    /// The block `index` of `stream`, which must have been requested.
    pub fn get(&self, stream: &Stream, index: usize) -> Result<BlockRef> {
        self.ready
            .iter()
            .find(|(id, i, _)| *id == stream.id() && *i == index)
            .map(|(_, _, block)| block.clone())
            .ok_or(Error::MissingInput {
                node: stream.id().0,
                index,
            })
    }

    pub fn len(&self) -> usize {
        self.ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }
}
