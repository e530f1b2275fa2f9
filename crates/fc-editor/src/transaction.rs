//! Undo/redo history.
//!
//! Each entry is a full MessagePack snapshot of the canvas objects (grid
//! excluded). `save` pushes the state being left onto the undo stack,
//! tagged with the kind of edit that left it; undo and redo swap the
//! current state with the top of the respective stack and replay it.
//!
//! Replaying clears and re-inserts the whole scene. Two scoped guards
//! keep that from feeding back: `ReplayGuard` marks the handler active so
//! saves are skipped, and `RenderBatch` suspends render-on-mutate so the
//! replay costs a single render.

use crate::timing::Throttle;
use fc_core::snapshot::restore;
use fc_core::{Scene, Snapshot, TransactionType};
use std::cell::Cell;
use std::ops::{Deref, DerefMut};

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    kind: TransactionType,
    bytes: Vec<u8>,
}

pub struct TransactionHandler {
    undos: Vec<Entry>,
    redos: Vec<Entry>,
    current: Option<Entry>,
    max_history: usize,
    undo_throttle: Throttle,
    redo_throttle: Throttle,
    active: Cell<bool>,
}

impl TransactionHandler {
    pub fn new(max_history: usize, throttle_ms: u64) -> Self {
        Self {
            undos: Vec::new(),
            redos: Vec::new(),
            current: None,
            max_history,
            undo_throttle: Throttle::new(throttle_ms),
            redo_throttle: Throttle::new(throttle_ms),
            active: Cell::new(false),
        }
    }

    /// Forget all history and take `scene` as the starting state.
    pub fn initialize(&mut self, scene: &Scene) -> Result<(), String> {
        let bytes = Snapshot::capture(scene, TransactionType::Initialize).encode()?;
        self.undos.clear();
        self.redos.clear();
        self.current = Some(Entry {
            kind: TransactionType::Initialize,
            bytes,
        });
        Ok(())
    }

    /// True while a replay is rebuilding the scene.
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn can_undo(&self) -> bool {
        !self.undos.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redos.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undos.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redos.len()
    }

    /// Record the scene after an edit of kind `kind`. Skipped during
    /// replay. On a serialization failure nothing is recorded, although
    /// the edit itself stays applied.
    pub fn save(&mut self, scene: &Scene, kind: TransactionType) -> Result<(), String> {
        if self.is_active() {
            return Ok(());
        }
        let bytes = Snapshot::capture(scene, kind).encode().map_err(|e| {
            log::warn!("history entry for {kind:?} dropped: {e}");
            format!("cannot record {kind:?}: {e}")
        })?;
        let previous = self.current.replace(Entry { kind, bytes });
        if let Some(previous) = previous {
            self.undos.push(Entry {
                kind,
                bytes: previous.bytes,
            });
            if self.undos.len() > self.max_history {
                self.undos.remove(0);
            }
        }
        self.redos.clear();
        log::debug!("saved {kind:?} ({} undo entries)", self.undos.len());
        Ok(())
    }

    /// Step back one edit. `Ok(None)` when there is nothing to undo or
    /// the call is throttled. A failed replay leaves both stacks and the
    /// scene as they were.
    pub fn undo(&mut self, scene: &mut Scene, now_ms: u64) -> Result<Option<TransactionType>, String> {
        if self.undos.is_empty() || !self.undo_throttle.try_acquire(now_ms) {
            return Ok(None);
        }
        let Some(entry) = self.undos.pop() else {
            return Ok(None);
        };
        let kind = entry.kind;
        match self.swap_in(scene, entry) {
            Ok(previous) => {
                if let Some(previous) = previous {
                    self.redos.push(Entry {
                        kind,
                        bytes: previous.bytes,
                    });
                }
                log::debug!("undid {kind:?}");
                Ok(Some(kind))
            }
            Err((entry, e)) => {
                self.undos.push(entry);
                Err(format!("cannot undo {kind:?}: {e}"))
            }
        }
    }

    /// Re-apply the last undone edit.
    pub fn redo(&mut self, scene: &mut Scene, now_ms: u64) -> Result<Option<TransactionType>, String> {
        if self.redos.is_empty() || !self.redo_throttle.try_acquire(now_ms) {
            return Ok(None);
        }
        let Some(entry) = self.redos.pop() else {
            return Ok(None);
        };
        let kind = entry.kind;
        match self.swap_in(scene, entry) {
            Ok(previous) => {
                if let Some(previous) = previous {
                    self.undos.push(Entry {
                        kind,
                        bytes: previous.bytes,
                    });
                }
                log::debug!("redid {kind:?}");
                Ok(Some(kind))
            }
            Err((entry, e)) => {
                self.redos.push(entry);
                Err(format!("cannot redo {kind:?}: {e}"))
            }
        }
    }

    /// Replay `entry` and make it current, returning the state it replaced.
    /// On failure the scene is rebuilt from the current state and `entry`
    /// is handed back.
    fn swap_in(&mut self, scene: &mut Scene, entry: Entry) -> Result<Option<Entry>, (Entry, String)> {
        let replayed = Snapshot::decode(&entry.bytes).and_then(|snapshot| self.replay(scene, &snapshot));
        if let Err(e) = replayed {
            self.roll_back(scene);
            return Err((entry, e));
        }
        Ok(self.current.replace(entry))
    }

    fn roll_back(&self, scene: &mut Scene) {
        let Some(current) = &self.current else {
            return;
        };
        let restored = Snapshot::decode(&current.bytes).and_then(|snapshot| self.replay(scene, &snapshot));
        if let Err(e) = restored {
            log::warn!("scene left partially restored: {e}");
        }
    }

    /// Rebuild the scene from `snapshot`, keeping the grid.
    pub fn replay(&self, scene: &mut Scene, snapshot: &Snapshot) -> Result<(), String> {
        let _guard = ReplayGuard::acquire(&self.active);
        let mut batch = RenderBatch::begin(scene);
        batch.clear(true);
        restore(&mut batch, &snapshot.objects)?;
        Ok(())
    }
}

// ─── Scoped guards ────────────────────────────────────────────────────────

/// Marks a replay in progress; released on every exit path.
struct ReplayGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> ReplayGuard<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self { flag }
    }
}

impl Drop for ReplayGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

/// Suspends per-mutation renders; on drop restores the flag and requests
/// exactly one render.
struct RenderBatch<'a> {
    scene: &'a mut Scene,
    previous: bool,
}

impl<'a> RenderBatch<'a> {
    fn begin(scene: &'a mut Scene) -> Self {
        let previous = scene.render_on_mutate;
        scene.render_on_mutate = false;
        Self { scene, previous }
    }
}

impl Deref for RenderBatch<'_> {
    type Target = Scene;

    fn deref(&self) -> &Scene {
        self.scene
    }
}

impl DerefMut for RenderBatch<'_> {
    fn deref_mut(&mut self) -> &mut Scene {
        self.scene
    }
}

impl Drop for RenderBatch<'_> {
    fn drop(&mut self) {
        self.scene.render_on_mutate = self.previous;
        self.scene.request_render();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fc_core::model::{Frame, GridSpec, Shape, ShapeKind};
    use fc_core::snapshot::describe;
    use fc_core::{ShapeId, Vec2, grid_shape};

    fn scene() -> Scene {
        let mut scene = Scene::new();
        scene
            .add(grid_shape(GridSpec {
                left: 0.0,
                top: 0.0,
                width: 500.0,
                height: 500.0,
                size: 10.0,
            }))
            .unwrap();
        scene
    }

    fn add(scene: &mut Scene, id: &str, x: f64) {
        scene
            .add(Shape::new(ShapeId::intern(id), ShapeKind::Activity, Frame::new(x, 50.0, 40.0, 30.0)))
            .unwrap();
    }

    #[test]
    fn undo_then_redo_restores_states() {
        let mut scene = scene();
        let mut history = TransactionHandler::new(50, 100);
        history.initialize(&scene).unwrap();
        let empty = describe(&scene);

        add(&mut scene, "t-a", 100.0);
        history.save(&scene, TransactionType::Add).unwrap();
        let after = describe(&scene);

        assert_eq!(history.undo(&mut scene, 1_000).unwrap(), Some(TransactionType::Add));
        assert_eq!(describe(&scene), empty);
        assert!(scene.grid().is_some(), "grid survives replay");

        assert_eq!(history.redo(&mut scene, 2_000).unwrap(), Some(TransactionType::Add));
        assert_eq!(describe(&scene), after);
    }

    #[test]
    fn new_edit_clears_redo() {
        let mut scene = scene();
        let mut history = TransactionHandler::new(50, 100);
        history.initialize(&scene).unwrap();
        add(&mut scene, "t-b", 100.0);
        history.save(&scene, TransactionType::Add).unwrap();
        history.undo(&mut scene, 1_000).unwrap();
        assert!(history.can_redo());

        add(&mut scene, "t-c", 200.0);
        history.save(&scene, TransactionType::Add).unwrap();
        assert!(!history.can_redo());
        assert_eq!(history.redo(&mut scene, 3_000).unwrap(), None);
    }

    #[test]
    fn empty_stacks_are_no_ops() {
        let mut scene = scene();
        let mut history = TransactionHandler::new(50, 100);
        history.initialize(&scene).unwrap();
        let renders = scene.render_requests();
        assert_eq!(history.undo(&mut scene, 0).unwrap(), None);
        assert_eq!(history.redo(&mut scene, 0).unwrap(), None);
        assert_eq!(scene.render_requests(), renders);
    }

    #[test]
    fn undo_is_throttled() {
        let mut scene = scene();
        let mut history = TransactionHandler::new(50, 100);
        history.initialize(&scene).unwrap();
        for (i, id) in ["t-d", "t-e"].into_iter().enumerate() {
            add(&mut scene, id, 100.0 * (i as f64 + 1.0));
            history.save(&scene, TransactionType::Add).unwrap();
        }
        assert!(history.undo(&mut scene, 1_000).unwrap().is_some());
        assert_eq!(history.undo(&mut scene, 1_050).unwrap(), None);
        assert_eq!(history.undo_len(), 1);
        assert!(history.undo(&mut scene, 1_100).unwrap().is_some());
    }

    #[test]
    fn history_is_capped() {
        let mut scene = scene();
        let mut history = TransactionHandler::new(3, 100);
        history.initialize(&scene).unwrap();
        add(&mut scene, "t-f", 100.0);
        for _ in 0..5 {
            scene.translate(ShapeId::intern("t-f"), Vec2::new(5.0, 0.0));
            history.save(&scene, TransactionType::Moved).unwrap();
        }
        assert_eq!(history.undo_len(), 3);
    }

    #[test]
    fn replay_renders_once_and_releases_guard() {
        let mut scene = scene();
        let mut history = TransactionHandler::new(50, 100);
        history.initialize(&scene).unwrap();
        for id in ["t-g", "t-h", "t-i"] {
            add(&mut scene, id, 100.0);
        }
        history.save(&scene, TransactionType::Add).unwrap();
        history.undo(&mut scene, 1_000).unwrap();

        let before = scene.render_requests();
        history.redo(&mut scene, 2_000).unwrap();
        assert_eq!(scene.render_requests(), before + 1);
        assert!(scene.render_on_mutate);
        assert!(!history.is_active());
    }

    #[test]
    fn failed_replay_still_releases_guards() {
        let mut scene = scene();
        let history = TransactionHandler::new(50, 100);
        let mut bad = Snapshot::capture(&scene, TransactionType::Paste);
        let shape = Shape::new(ShapeId::intern("t-dup"), ShapeKind::Event, Frame::new(0.0, 0.0, 10.0, 10.0));
        let mut tmp = Scene::new();
        tmp.add(shape).unwrap();
        let desc = describe(&tmp);
        bad.objects = vec![desc[0].clone(), desc[0].clone()];

        assert!(history.replay(&mut scene, &bad).is_err());
        assert!(!history.is_active());
        assert!(scene.render_on_mutate);
    }

    #[test]
    fn failed_undo_keeps_history_and_scene() {
        let mut scene = scene();
        let mut history = TransactionHandler::new(50, 100);
        history.initialize(&scene).unwrap();
        add(&mut scene, "t-k", 100.0);
        history.save(&scene, TransactionType::Add).unwrap();
        add(&mut scene, "t-l", 200.0);
        history.save(&scene, TransactionType::Add).unwrap();
        let after = describe(&scene);

        // An entry holding the same id twice cannot be restored.
        let mut tmp = Scene::new();
        add(&mut tmp, "t-k", 100.0);
        let mut bad = Snapshot::capture(&tmp, TransactionType::Add);
        bad.objects.push(bad.objects[0].clone());
        history.undos[1].bytes = bad.encode().unwrap();

        assert!(history.undo(&mut scene, 1_000).is_err());
        assert_eq!(history.undo_len(), 2);
        assert_eq!(history.redo_len(), 0);
        assert_eq!(describe(&scene), after);
        assert!(!history.is_active());
        assert!(scene.render_on_mutate);

        // The untouched entry below still undoes cleanly.
        history.undos.pop();
        assert_eq!(history.undo(&mut scene, 2_000).unwrap(), Some(TransactionType::Add));
        assert!(describe(&scene).is_empty());
        assert_eq!(history.redo_len(), 1);
    }

    #[test]
    fn saves_are_skipped_while_active() {
        let mut scene = scene();
        let mut history = TransactionHandler::new(50, 100);
        history.initialize(&scene).unwrap();
        let guard = ReplayGuard::acquire(&history.active);
        drop(guard);
        assert!(!history.is_active());

        history.active.set(true);
        add(&mut scene, "t-j", 100.0);
        history.save(&scene, TransactionType::Add).unwrap();
        assert!(!history.can_undo());
        history.active.set(false);
    }
}
