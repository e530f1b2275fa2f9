//! Copy/cut/paste buffer.
//!
//! Holds allow-listed descriptors rather than live shapes, so a copied
//! shape stays pasteable after the original is gone. Each paste gets
//! fresh ids and lands `padding` pixels below-right of the previous copy.
//! A cut buffer is consumed by its first paste.

use fc_core::snapshot::{self, ShapeDescriptor, describe_ids};
use fc_core::{Scene, ShapeId};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    objects: Vec<ShapeDescriptor>,
    cut: bool,
}

impl Clipboard {
    /// Copy `ids` (grid excluded). Returns how many shapes were copied.
    pub fn copy(&mut self, scene: &Scene, ids: &[ShapeId]) -> usize {
        self.objects = describe_ids(scene, ids);
        self.cut = false;
        self.objects.len()
    }

    /// Like `copy`, but the next paste empties the clipboard. Removing the
    /// originals is up to the caller.
    pub fn cut(&mut self, scene: &Scene, ids: &[ShapeId]) -> usize {
        let n = self.copy(scene, ids);
        self.cut = n > 0;
        n
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn is_cut(&self) -> bool {
        self.cut
    }

    pub fn objects(&self) -> &[ShapeDescriptor] {
        &self.objects
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.cut = false;
    }

    /// Descriptors for the next paste: offset by `padding`, with fresh ids.
    /// Empty when there is nothing to paste.
    pub fn take_for_paste(&mut self, padding: f64) -> Vec<ShapeDescriptor> {
        if self.objects.is_empty() {
            return Vec::new();
        }
        for desc in &mut self.objects {
            offset(desc, padding);
        }
        let pasted = with_fresh_ids(&self.objects);
        if self.cut {
            self.clear();
        }
        pasted
    }

    pub fn to_json(&self) -> Result<String, String> {
        snapshot::to_json(&self.objects)
    }

    /// Load descriptors exported by `to_json` (or a saved template).
    pub fn load_json(&mut self, json: &str) -> Result<usize, String> {
        self.objects = snapshot::from_json(json)?;
        self.cut = false;
        Ok(self.objects.len())
    }
}

/// Shift a top-level descriptor. Group members are relative to their
/// group and move with it.
fn offset(desc: &mut ShapeDescriptor, d: f64) {
    desc.left += d;
    desc.top += d;
    for p in &mut desc.points {
        p.x += d;
        p.y += d;
    }
}

/// Clone descriptors under new ids. Connector bindings to shapes inside
/// the copied set follow the copies; bindings to anything else are dropped.
pub fn with_fresh_ids(descriptors: &[ShapeDescriptor]) -> Vec<ShapeDescriptor> {
    let mut renamed = HashMap::new();
    for desc in descriptors {
        collect_ids(desc, &mut renamed);
    }
    descriptors.iter().map(|d| rename(d, &renamed)).collect()
}

fn collect_ids(desc: &ShapeDescriptor, out: &mut HashMap<ShapeId, ShapeId>) {
    out.insert(desc.id, ShapeId::with_prefix(desc.shape_type.as_str()));
    for child in &desc.objects {
        collect_ids(child, out);
    }
}

fn rename(desc: &ShapeDescriptor, renamed: &HashMap<ShapeId, ShapeId>) -> ShapeDescriptor {
    let mut out = desc.clone();
    out.id = renamed.get(&desc.id).copied().unwrap_or(desc.id);
    let from = desc.from_target.and_then(|t| renamed.get(&t).copied());
    if from.is_none() {
        out.from_anchor = None;
    }
    out.from_target = from;
    let to = desc.to_target.and_then(|t| renamed.get(&t).copied());
    if to.is_none() {
        out.to_anchor = None;
    }
    out.to_target = to;
    out.objects = desc.objects.iter().map(|c| rename(c, renamed)).collect();
    out
}
