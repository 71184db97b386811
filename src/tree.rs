use crate::clock::{TfDuration, TfTime};
use crate::compose;
use crate::error::{TransformError, TransformResult};
use crate::registry::{FrameId, FrameRegistry};
use crate::resolver::PathResolver;
use crate::transform::{BufferStore, StampedTransform, Transform, TransformSample};
use std::fmt::Write;
use tracing::trace;

/// Tuning knobs for the transform tree.
#[derive(Clone, Copy, Debug)]
pub struct TransformerConfig {
    /// How far back samples are retained, relative to each frame's newest
    /// stamp.
    pub retention: TfDuration,
    /// Ancestor-walk hop ceiling; a walk that exceeds it is reported as a
    /// cycle.
    pub max_walk_depth: usize,
    /// When set, queries outside a buffer's retained range clamp to the
    /// nearest sample instead of failing with an extrapolation error.
    pub allow_extrapolation: bool,
}

impl Default for TransformerConfig {
    fn default() -> Self {
        Self {
            retention: TfDuration::from_secs(10),
            max_walk_depth: 1000,
            allow_extrapolation: false,
        }
    }
}

/// The core ingestion and lookup surface. Extensions wrap a value
/// implementing this trait instead of subclassing the engine.
pub trait TransformSource {
    fn set_transform(&self, transform: &StampedTransform) -> TransformResult<()>;

    fn lookup_transform(
        &self,
        target: &str,
        source: &str,
        time: Option<TfTime>,
    ) -> TransformResult<Transform>;

    /// Non-throwing probe variant: any failure collapses to `false`.
    fn can_transform(&self, target: &str, source: &str, time: Option<TfTime>) -> bool {
        self.lookup_transform(target, source, time).is_ok()
    }
}

/// The transform tree façade. Producers insert pose samples and consumers
/// query relative poses, concurrently; all methods take `&self` and every
/// operation is synchronous and bounded.
///
/// Connectivity is evaluated per query against the instantaneous graph
/// implied by the most relevant samples, so two frames can be connected at
/// one query time and disconnected at another after a re-parenting or an
/// eviction.
pub struct Transformer {
    registry: FrameRegistry,
    store: BufferStore,
    config: TransformerConfig,
}

impl Transformer {
    pub fn new() -> Self {
        Self::with_config(TransformerConfig::default())
    }

    pub fn with_config(config: TransformerConfig) -> Self {
        Self {
            registry: FrameRegistry::new(),
            store: BufferStore::new(config.retention, config.allow_extrapolation),
            config,
        }
    }

    pub fn config(&self) -> &TransformerConfig {
        &self.config
    }

    fn resolver(&self) -> PathResolver<'_> {
        PathResolver::new(&self.store, &self.registry, self.config.max_walk_depth)
    }

    /// Queries never create frames: an unknown name is a lookup failure.
    fn resolve_frame(&self, name: &str) -> TransformResult<FrameId> {
        self.registry
            .lookup(name)
            .ok_or_else(|| TransformError::FrameNotFound(name.to_string()))
    }

    /// Ingest one pose sample for `child_frame` relative to `parent_frame`.
    ///
    /// Both frames are created on first reference. The rotation is
    /// normalized before storage; non-finite components or a zero-norm
    /// rotation fail with [`TransformError::InvalidArgument`] without
    /// touching any state.
    pub fn set_transform(&self, st: &StampedTransform) -> TransformResult<()> {
        if !st.transform.translation.is_finite() {
            return Err(TransformError::InvalidArgument(format!(
                "non-finite translation {:?} for frame '{}'",
                st.transform.translation, st.child_frame
            )));
        }
        if !st.transform.rotation.is_finite() {
            return Err(TransformError::InvalidArgument(format!(
                "non-finite rotation {:?} for frame '{}'",
                st.transform.rotation, st.child_frame
            )));
        }
        let norm = st.transform.rotation.length();
        if norm == 0.0 {
            return Err(TransformError::InvalidArgument(format!(
                "zero-norm rotation for frame '{}'",
                st.child_frame
            )));
        }
        if st.child_frame == st.parent_frame {
            return Err(TransformError::InvalidArgument(format!(
                "frame '{}' cannot be its own parent",
                st.child_frame
            )));
        }

        let child = self.registry.id_for(&st.child_frame)?;
        let parent = self.registry.id_for(&st.parent_frame)?;

        let buffer = self.store.get_or_create(child, st.child_frame);
        buffer.insert(TransformSample {
            stamp: st.stamp,
            parent,
            transform: Transform::new(st.transform.translation, st.transform.rotation / norm),
        });
        trace!(
            child = %st.child_frame,
            parent = %st.parent_frame,
            stamp = %st.stamp,
            "stored transform sample"
        );
        Ok(())
    }

    /// Pose of `source` expressed in `target` at `time`. `None` means
    /// "latest available", resolved per buffer independently: each hop uses
    /// its own newest sample rather than a single global instant.
    pub fn lookup_transform(
        &self,
        target: &str,
        source: &str,
        time: Option<TfTime>,
    ) -> TransformResult<Transform> {
        let target_id = self.resolve_frame(target)?;
        let source_id = self.resolve_frame(source)?;
        if target_id == source_id {
            return Ok(Transform::IDENTITY);
        }

        let (_lca, target_chain, source_chain) =
            self.resolver()
                .find_common_ancestor(target_id, source_id, time)?;
        Ok(compose::between(&target_chain, &source_chain))
    }

    /// Non-throwing probe variant of [`Self::lookup_transform`].
    pub fn can_transform(&self, target: &str, source: &str, time: Option<TfTime>) -> bool {
        match self.lookup_transform(target, source, time) {
            Ok(_) => true,
            Err(error) => {
                trace!(%target, %source, %error, "can_transform probe failed");
                false
            }
        }
    }

    /// The most recent instant at which every edge on the path connecting
    /// `a` and `b` has known data: the minimum over each touched buffer's
    /// newest stamp.
    pub fn latest_common_time(&self, a: &str, b: &str) -> TransformResult<TfTime> {
        let a_id = self.resolve_frame(a)?;
        let b_id = self.resolve_frame(b)?;
        if a_id == b_id {
            // a frame relative to itself: its own newest stamp, zero for a
            // frame that has only ever been a parent
            let newest = self.store.get(a_id).and_then(|buffer| buffer.newest_stamp());
            return Ok(newest.unwrap_or_default());
        }

        let (_lca, chain_a, chain_b) = self.resolver().find_common_ancestor(a_id, b_id, None)?;

        // resolved at "latest", every hop's stamp is its buffer's newest
        chain_a
            .iter()
            .chain(chain_b.iter())
            .map(|hop| hop.sample.stamp)
            .min()
            .ok_or_else(|| TransformError::NotConnected {
                from: a.to_string(),
                to: b.to_string(),
            })
    }

    /// Debug dump of the frame graph: every frame with recorded data, its
    /// most recently recorded parent and its buffer's time extent. For
    /// diagnostics, not for queries.
    pub fn all_frames_as_string(&self) -> String {
        let mut out = String::new();
        for (id, name) in self.registry.all() {
            let Some(buffer) = self.store.get(id) else {
                continue;
            };
            let (Some(latest), Some(range)) = (buffer.latest(), buffer.time_range()) else {
                continue;
            };
            let parent = self
                .registry
                .name_of(latest.parent)
                .map(|n| n.to_string())
                .unwrap_or_else(|| latest.parent.to_string());
            let _ = writeln!(
                out,
                "Frame {name} exists with parent {parent} over [{} .. {}].",
                range.start, range.end
            );
        }
        out
    }
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformSource for Transformer {
    fn set_transform(&self, transform: &StampedTransform) -> TransformResult<()> {
        Transformer::set_transform(self, transform)
    }

    fn lookup_transform(
        &self,
        target: &str,
        source: &str,
        time: Option<TfTime>,
    ) -> TransformResult<Transform> {
        Transformer::lookup_transform(self, target, source, time)
    }

    fn can_transform(&self, target: &str, source: &str, time: Option<TfTime>) -> bool {
        Transformer::can_transform(self, target, source, time)
    }
}
