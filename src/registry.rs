use crate::error::{TransformError, TransformResult};
use crate::{FrameIdString, MAX_FRAME_NAME};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::RwLock;

/// Stable small-integer handle for an interned frame name.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct FrameId(pub(crate) u32);

impl FrameId {
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl Display for FrameId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

#[derive(Default)]
struct RegistryInner {
    ids: HashMap<FrameIdString, FrameId>,
    names: Vec<FrameIdString>,
}

/// Interns frame names to stable identifiers. A frame is created the first
/// time its name is seen and is never removed.
#[derive(Default)]
pub struct FrameRegistry {
    inner: RwLock<RegistryInner>,
}

impl FrameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn validate(name: &str) -> TransformResult<FrameIdString> {
        if name.is_empty() {
            return Err(TransformError::InvalidArgument(
                "frame name is empty".to_string(),
            ));
        }
        FrameIdString::from(name).map_err(|_| {
            TransformError::InvalidArgument(format!(
                "frame name '{name}' exceeds {MAX_FRAME_NAME} bytes"
            ))
        })
    }

    /// Returns the existing id for `name` or allocates a new one. Idempotent.
    pub fn id_for(&self, name: &str) -> TransformResult<FrameId> {
        let key = Self::validate(name)?;

        if let Some(id) = self.inner.read().unwrap().ids.get(&key) {
            return Ok(*id);
        }

        let mut inner = self.inner.write().unwrap();
        // another writer may have interned it between the locks
        if let Some(id) = inner.ids.get(&key) {
            return Ok(*id);
        }
        let id = FrameId(inner.names.len() as u32);
        inner.names.push(key);
        inner.ids.insert(key, id);
        Ok(id)
    }

    /// Non-creating probe, used by queries: a lookup must never register a
    /// frame as a side effect.
    pub fn lookup(&self, name: &str) -> Option<FrameId> {
        let key = FrameIdString::from(name).ok()?;
        self.inner.read().unwrap().ids.get(&key).copied()
    }

    /// Inverse lookup for debug output.
    pub fn name_of(&self, id: FrameId) -> Option<FrameIdString> {
        self.inner.read().unwrap().names.get(id.index()).copied()
    }

    /// Every known frame, in allocation order.
    pub fn all(&self) -> Vec<(FrameId, FrameIdString)> {
        self.inner
            .read()
            .unwrap()
            .names
            .iter()
            .enumerate()
            .map(|(i, name)| (FrameId(i as u32), *name))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
