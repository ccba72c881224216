//! Keyed scene cache and the per-pass delta against it.
//!
//! The cache is the only state that survives between update passes. Each
//! pass compares the freshly built [`Scene`] with the cached entries by
//! logical key: unknown keys are created, vanished keys removed, and keys
//! present on both sides keep their handle. A change of any spacing setting
//! first removes every entry, so the rest of the pass rebuilds from scratch
//! through the ordinary creation path.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::settings::Settings;

use super::build::Scene;
use super::key::{LogicalKey, PrimitiveKind};
use super::primitive::Primitive;

/// Opaque renderer-side identity of a cache entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EntryHandle(u64);

impl EntryHandle {
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EntryMetadata {
    created_generation: u64,
    primitive: Primitive,
}

impl EntryMetadata {
    pub fn created_generation(&self) -> u64 {
        self.created_generation
    }

    pub fn primitive(&self) -> &Primitive {
        &self.primitive
    }

    pub fn kind(&self) -> PrimitiveKind {
        self.primitive.kind()
    }
}

/// One cached drawable. Only the reconciler mutates entries; everyone else
/// gets read-only access.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneEntry {
    logical_key: LogicalKey,
    handle: EntryHandle,
    last_seen_generation: u64,
    metadata: EntryMetadata,
}

impl SceneEntry {
    pub fn logical_key(&self) -> &LogicalKey {
        &self.logical_key
    }

    pub fn handle(&self) -> EntryHandle {
        self.handle
    }

    pub fn last_seen_generation(&self) -> u64 {
        self.last_seen_generation
    }

    pub fn metadata(&self) -> &EntryMetadata {
        &self.metadata
    }
}

#[derive(Clone, Debug, Default)]
pub struct SceneCache {
    entries: BTreeMap<LogicalKey, SceneEntry>,
    next_handle: u64,
    generation: u64,
}

impl SceneCache {
    pub fn get(&self, key: &LogicalKey) -> Option<&SceneEntry> {
        self.entries.get(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = &SceneEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn allocate_handle(&mut self) -> EntryHandle {
        self.next_handle += 1;
        EntryHandle(self.next_handle)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PreviousState {
    pub settings: Settings,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DeltaEntry {
    pub handle: EntryHandle,
    pub primitive: Primitive,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HandleEntry {
    pub key: LogicalKey,
    pub handle: EntryHandle,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SceneDelta {
    pub generation: u64,
    /// Every entry was dropped because spacing changed.
    pub invalidated: bool,
    pub to_add: Vec<DeltaEntry>,
    /// Same key and handle, new primitive content.
    pub to_update: Vec<DeltaEntry>,
    pub to_remove: Vec<HandleEntry>,
    pub to_keep: Vec<HandleEntry>,
}

impl SceneDelta {
    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty() && self.to_update.is_empty() && self.to_remove.is_empty()
    }
}

/// Brings `cache` in line with `scene` and reports what changed.
pub fn reconcile(
    previous: Option<&PreviousState>,
    scene: &Scene,
    settings: &Settings,
    cache: &mut SceneCache,
) -> SceneDelta {
    cache.generation += 1;
    let generation = cache.generation;

    let invalidated =
        previous.is_some_and(|previous| previous.settings.spacing() != settings.spacing());

    let mut delta = SceneDelta {
        generation,
        invalidated,
        ..SceneDelta::default()
    };

    if invalidated {
        delta.to_remove.extend(
            std::mem::take(&mut cache.entries)
                .into_values()
                .map(|entry| HandleEntry {
                    key: entry.logical_key,
                    handle: entry.handle,
                }),
        );
    }

    for (key, primitive) in scene.iter() {
        match cache.entries.get_mut(key) {
            Some(entry) => {
                entry.last_seen_generation = generation;
                if entry.metadata.primitive == *primitive {
                    delta.to_keep.push(HandleEntry {
                        key: key.clone(),
                        handle: entry.handle,
                    });
                } else {
                    entry.metadata.primitive = primitive.clone();
                    delta.to_update.push(DeltaEntry {
                        handle: entry.handle,
                        primitive: primitive.clone(),
                    });
                }
            }
            None => {
                let handle = cache.allocate_handle();
                cache.entries.insert(
                    key.clone(),
                    SceneEntry {
                        logical_key: key.clone(),
                        handle,
                        last_seen_generation: generation,
                        metadata: EntryMetadata {
                            created_generation: generation,
                            primitive: primitive.clone(),
                        },
                    },
                );
                delta.to_add.push(DeltaEntry {
                    handle,
                    primitive: primitive.clone(),
                });
            }
        }
    }

    let stale = cache
        .entries
        .iter()
        .filter(|(_, entry)| entry.last_seen_generation != generation)
        .map(|(key, _)| key.clone())
        .collect::<Vec<_>>();
    for key in stale {
        if let Some(entry) = cache.entries.remove(&key) {
            delta.to_remove.push(HandleEntry {
                key,
                handle: entry.handle,
            });
        }
    }

    delta
}
