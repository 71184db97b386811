use crate::clock::TfTime;
use crate::error::{TransformError, TransformResult};
use crate::registry::{FrameId, FrameRegistry};
use crate::transform::{BufferStore, TransformSample};
use std::collections::{HashMap, HashSet};

/// One hop of an ancestor walk: the frame whose buffer resolved the hop,
/// and the sample giving that frame's pose in `sample.parent`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AncestorHop {
    pub frame: FrameId,
    pub sample: TransformSample,
}

/// Walks ancestor chains against the instantaneous graph implied by the
/// samples most relevant to the query time. The graph is never assumed
/// acyclic: every walk carries a visited set and a hop ceiling, because
/// parent assignment can change across time.
pub struct PathResolver<'a> {
    store: &'a BufferStore,
    registry: &'a FrameRegistry,
    max_depth: usize,
}

impl<'a> PathResolver<'a> {
    pub fn new(store: &'a BufferStore, registry: &'a FrameRegistry, max_depth: usize) -> Self {
        Self {
            store,
            registry,
            max_depth,
        }
    }

    fn display(&self, id: FrameId) -> String {
        self.registry
            .name_of(id)
            .map(|name| name.to_string())
            .unwrap_or_else(|| id.to_string())
    }

    /// Resolve the chain from `frame` up to its root at `time` (`None` =
    /// each buffer's newest sample). Hop 0 is `frame` itself; the walk stops
    /// at the first frame without a buffer, which is a root.
    pub fn ancestors_of(
        &self,
        frame: FrameId,
        time: Option<TfTime>,
    ) -> TransformResult<Vec<AncestorHop>> {
        let mut hops = Vec::new();
        let mut visited = HashSet::new();
        let mut current = frame;

        loop {
            if !visited.insert(current) {
                return Err(TransformError::CyclicTree(self.display(current)));
            }
            let Some(buffer) = self.store.get(current) else {
                break;
            };
            if hops.len() >= self.max_depth {
                // a chain this deep is indistinguishable from a cycle
                return Err(TransformError::CyclicTree(self.display(frame)));
            }
            let sample = buffer.sample_at(time)?;
            hops.push(AncestorHop {
                frame: current,
                sample,
            });
            current = sample.parent;
        }

        Ok(hops)
    }

    /// Lowest common ancestor of `a` and `b` at `time`, together with the
    /// hop chains from each frame up to (but excluding) the LCA. Picks the
    /// shared frame with minimal combined hop count, not merely any common
    /// ancestor.
    #[allow(clippy::type_complexity)]
    pub fn find_common_ancestor(
        &self,
        a: FrameId,
        b: FrameId,
        time: Option<TfTime>,
    ) -> TransformResult<(FrameId, Vec<AncestorHop>, Vec<AncestorHop>)> {
        let hops_a = self.ancestors_of(a, time)?;
        let hops_b = self.ancestors_of(b, time)?;

        // frames on A's chain, keyed to how many hops it takes A to reach them
        let mut a_depth = HashMap::new();
        a_depth.insert(a, 0usize);
        for (i, hop) in hops_a.iter().enumerate() {
            a_depth.entry(hop.sample.parent).or_insert(i + 1);
        }

        // walking outward from B, the first frame A's chain contains is the
        // common ancestor closest to both
        let b_nodes =
            std::iter::once(b).chain(hops_b.iter().map(|hop| hop.sample.parent));
        for (j, node) in b_nodes.enumerate() {
            if let Some(&i) = a_depth.get(&node) {
                return Ok((node, hops_a[..i].to_vec(), hops_b[..j].to_vec()));
            }
        }

        Err(TransformError::NotConnected {
            from: self.display(a),
            to: self.display(b),
        })
    }
}
