//! Renderer - drives nodes through the two-phase block protocol

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use hashbrown::HashMap;
use itertools::Itertools;
use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::trace;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::block::{BlockRef, PcmSample};
use crate::error::{Error, Result};
use crate::node::{Inputs, NodeId, Requests, Stream};

const DEFAULT_CACHE_CAPACITY: usize = 256;

struct BlockCache {
    blocks: HashMap<(NodeId, usize), BlockRef>,
    order: VecDeque<(NodeId, usize)>,
    capacity: usize,
}

impl BlockCache {
    fn get(&self, key: &(NodeId, usize)) -> Option<BlockRef> {
        self.blocks.get(key).cloned()
    }

    fn insert(&mut self, key: (NodeId, usize), block: &BlockRef) {
        if self.capacity == 0 || self.blocks.contains_key(&key) {
            return;
        }
        // oldest first
        while self.blocks.len() >= self.capacity {
            match self.order.pop_front() {
                Some(old) => {
                    self.blocks.remove(&old);
                }
                None => break,
            }
        }
        self.blocks.insert(key, block.clone());
        self.order.push_back(key);
    }
}

type Key = (NodeId, usize);

/// A block whose upstream requests are known but not yet all satisfied.
struct Pending {
    stream: Stream,
    index: usize,
    requests: Requests,
    /// Requested blocks not yet produced.
    waiting: usize,
}

impl Pending {
    fn key(&self) -> Key {
        (self.stream.id(), self.index)
    }

    fn assemble(&self, ready: &HashMap<Key, BlockRef>) -> Result<BlockRef> {
        let mut inputs = Inputs::new();
        for address in self.requests.iter() {
            let block = ready
                .get(&(address.stream.id(), address.index))
                .ok_or(Error::MissingInput {
                    node: address.stream.id().get(),
                    index: address.index,
                })?;
            inputs.insert(&address.stream, address.index, block.clone());
        }
        let block = self.stream.node().assemble(self.index, &inputs)?;
        verify(&self.stream, self.index, &block)?;
        Ok(block)
    }
}

#[derive(Default)]
struct Walk {
    pending: Vec<Pending>,
    /// Blocks available to pending assemblies, from the cache or this walk.
    ready: HashMap<Key, BlockRef>,
    dependents: HashMap<Key, SmallVec<[usize; 2]>>,
}

fn check_index(stream: &Stream, n: usize) -> Result<()> {
    let info = stream.info();
    info.validate()?;
    let count = info.num_blocks();
    if n >= count {
        return Err(Error::BlockOutOfRange { index: n, count });
    }
    Ok(())
}

fn verify(stream: &Stream, n: usize, block: &BlockRef) -> Result<()> {
    let info = stream.info();
    let expected = info.block_len(n);
    if block.len() != expected || *block.format() != info.format {
        return Err(Error::BlockMismatch {
            op: stream.name(),
            detail: format!(
                "block {} has {} samples of {:?}, expected {} of {:?}",
                n,
                block.len(),
                block.format(),
                expected,
                info.format
            ),
        });
    }
    Ok(())
}

/// Pull-based host for a graph of [`Stream`]s.
///
/// [`block`](Self::block) first asks every node involved which upstream
/// blocks it needs, then assembles blocks bottom-up, each one only after all
/// of its inputs exist. If any upstream block fails, the failure is
/// returned as-is and the node is never asked to assemble.
///
/// A `Renderer` is `Sync`; several threads may render from one instance.
///
/// ```
/// use schnitt::{Renderer, nodes::{TestAudio, TestOptions}};
///
/// let tone = TestAudio::create(TestOptions::default().with_length(10_000)).unwrap();
/// let blocks = Renderer::new().render(&tone).unwrap();
/// assert_eq!(blocks.iter().map(|b| b.len()).sum::<usize>(), 10_000);
/// ```
pub struct Renderer {
    cache: Mutex<BlockCache>,
    #[cfg(feature = "parallel")]
    parallel_inputs: bool,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(BlockCache {
                blocks: HashMap::new(),
                order: VecDeque::new(),
                capacity: DEFAULT_CACHE_CAPACITY,
            }),
            #[cfg(feature = "parallel")]
            parallel_inputs: false,
        }
    }

    /// Keep at most `blocks` finished blocks around (0 disables caching).
    pub fn with_cache_capacity(self, blocks: usize) -> Self {
        self.cache.lock().capacity = blocks;
        self
    }

    /// Assemble upstream blocks that do not depend on each other on the rayon pool.
    #[cfg(feature = "parallel")]
    pub fn with_parallel_inputs(mut self, enabled: bool) -> Self {
        self.parallel_inputs = enabled;
        self
    }

    pub fn clear_cache(&self) {
        let mut cache = self.cache.lock();
        cache.blocks.clear();
        cache.order.clear();
    }

    /// Produce block `n` of `stream`.
    ///
    /// The graph is walked with an explicit work list, so graph depth is not
    /// bounded by the call stack.
    pub fn block(&self, stream: &Stream, n: usize) -> Result<BlockRef> {
        check_index(stream, n)?;
        let root = (stream.id(), n);
        if let Some(block) = self.cache.lock().get(&root) {
            return Ok(block);
        }

        let mut walk = self.discover(stream, n)?;
        let mut batch: Vec<usize> = (0..walk.pending.len())
            .filter(|&slot| walk.pending[slot].waiting == 0)
            .collect();

        while !batch.is_empty() {
            let blocks = self.assemble_batch(&walk.pending, &batch, &walk.ready)?;
            let mut next = Vec::new();
            for (slot, block) in batch.into_iter().zip_eq(blocks) {
                let key = walk.pending[slot].key();
                self.cache.lock().insert(key, &block);
                for dependent in walk.dependents.remove(&key).unwrap_or_default() {
                    let pending = &mut walk.pending[dependent];
                    pending.waiting -= 1;
                    if pending.waiting == 0 {
                        next.push(dependent);
                    }
                }
                walk.ready.insert(key, block);
            }
            batch = next;
        }

        walk.ready.remove(&root).ok_or(Error::MissingInput {
            node: root.0.get(),
            index: n,
        })
    }

    /// Request phase for every block `stream[n]` transitively depends on that
    /// is not cached yet.
    fn discover(&self, stream: &Stream, n: usize) -> Result<Walk> {
        let mut walk = Walk::default();
        let mut slots: HashMap<Key, usize> = HashMap::new();
        let mut stack = vec![(stream.clone(), n)];

        while let Some((stream, n)) = stack.pop() {
            let key = (stream.id(), n);
            if slots.contains_key(&key) || walk.ready.contains_key(&key) {
                continue;
            }
            check_index(&stream, n)?;
            if let Some(block) = self.cache.lock().get(&key) {
                walk.ready.insert(key, block);
                continue;
            }

            let mut requests = Requests::new();
            stream.node().request(n, &mut requests);
            trace!(node = stream.name(), index = n, upstream = requests.len(), "requesting block");
            stack.extend(requests.iter().map(|a| (a.stream.clone(), a.index)));
            slots.insert(key, walk.pending.len());
            walk.pending.push(Pending {
                stream,
                index: n,
                requests,
                waiting: 0,
            });
        }

        for slot in 0..walk.pending.len() {
            let upstream: SmallVec<[Key; 2]> = walk.pending[slot]
                .requests
                .iter()
                .map(|a| (a.stream.id(), a.index))
                .filter(|key| !walk.ready.contains_key(key))
                .collect();
            walk.pending[slot].waiting = upstream.len();
            for key in upstream {
                walk.dependents.entry(key).or_default().push(slot);
            }
        }
        Ok(walk)
    }

    fn assemble_batch(
        &self,
        pending: &[Pending],
        batch: &[usize],
        ready: &HashMap<Key, BlockRef>,
    ) -> Result<Vec<BlockRef>> {
        #[cfg(feature = "parallel")]
        {
            if self.parallel_inputs && batch.len() > 1 {
                return batch.par_iter().map(|&slot| pending[slot].assemble(ready)).collect();
            }
        }

        batch.iter().map(|&slot| pending[slot].assemble(ready)).collect()
    }

    /// Every block of `stream`, in order.
    pub fn render(&self, stream: &Stream) -> Result<Vec<BlockRef>> {
        (0..stream.info().num_blocks())
            .map(|n| self.block(stream, n))
            .collect()
    }

    /// Every block of `stream`, rendered on the rayon pool.
    #[cfg(feature = "parallel")]
    pub fn render_parallel(&self, stream: &Stream) -> Result<Vec<BlockRef>> {
        (0..stream.info().num_blocks())
            .into_par_iter()
            .map(|n| self.block(stream, n))
            .collect()
    }

    /// The whole stream's samples for plane index `channel`, concatenated.
    pub fn collect_channel<S: PcmSample>(&self, stream: &Stream, channel: usize) -> Result<Vec<S>> {
        let mut samples = Vec::new();
        for n in 0..stream.info().num_blocks() {
            let block = self.block(stream, n)?;
            samples.extend_from_slice(block.channel::<S>(channel)?);
        }
        Ok(samples)
    }
}
