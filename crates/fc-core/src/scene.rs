//! Shape arena.
//!
//! Shapes live in a `StableDiGraph`; an edge `parent → child` means the
//! child is a member of the parent group (or a top-level shape when the
//! parent is the root). Membership order is kept explicitly so paint order
//! and group order survive removals. Connection bindings are plain ids, so
//! a removed shape can never leave a dangling reference behind.

use crate::anchor::AnchorPosition;
use crate::connection::{Binding, LineEnd};
use crate::geometry::{bounding_rect, decompose_matrix, invert, transformed_corners};
use crate::id::ShapeId;
use crate::model::{Frame, GridSpec, Shape, ShapeKind};
use kurbo::{Affine, Point, Rect, Vec2};
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct Scene {
    pub graph: StableDiGraph<Shape, ()>,
    pub root: NodeIndex,
    /// Index from ShapeId → NodeIndex. The root is not indexed.
    pub id_index: HashMap<ShapeId, NodeIndex>,
    /// Members of each parent, back to front.
    child_order: HashMap<NodeIndex, Vec<NodeIndex>>,
    /// When set, every structural mutation requests a render.
    pub render_on_mutate: bool,
    render_requests: u64,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        let mut graph = StableDiGraph::new();
        let root = graph.add_node(Shape::root());
        Self {
            graph,
            root,
            id_index: HashMap::new(),
            child_order: HashMap::new(),
            render_on_mutate: true,
            render_requests: 0,
        }
    }

    // ─── Rendering requests ──────────────────────────────────────────────

    pub fn request_render(&mut self) {
        self.render_requests += 1;
    }

    /// Total renders requested so far.
    pub fn render_requests(&self) -> u64 {
        self.render_requests
    }

    fn mutated(&mut self) {
        if self.render_on_mutate {
            self.render_requests += 1;
        }
    }

    // ─── Insertion & removal ─────────────────────────────────────────────

    /// Add a top-level shape. A grid always goes to the back.
    pub fn add(&mut self, shape: Shape) -> Result<NodeIndex, String> {
        self.insert(self.root, shape)
    }

    /// Add a shape as the front-most member of group `parent`.
    pub fn add_to(&mut self, parent: ShapeId, shape: Shape) -> Result<NodeIndex, String> {
        let parent_idx = self
            .index_of(parent)
            .ok_or_else(|| format!("unknown group `{parent}`"))?;
        if !self.graph[parent_idx].is_group() {
            return Err(format!("`{parent}` is not a group"));
        }
        if shape.is_grid() {
            return Err("the grid cannot be a group member".to_string());
        }
        self.insert(parent_idx, shape)
    }

    fn insert(&mut self, parent: NodeIndex, shape: Shape) -> Result<NodeIndex, String> {
        if matches!(shape.kind, ShapeKind::Root) {
            return Err("cannot insert a root shape".to_string());
        }
        if self.id_index.contains_key(&shape.id) {
            return Err(format!("duplicate shape id `{}`", shape.id));
        }
        if shape.is_grid() && self.grid_id().is_some() {
            return Err("the canvas already has a grid".to_string());
        }
        let id = shape.id;
        let is_grid = shape.is_grid();
        let idx = self.graph.add_node(shape);
        self.graph.add_edge(parent, idx, ());
        let order = self.child_order.entry(parent).or_default();
        if is_grid {
            order.insert(0, idx);
        } else {
            order.push(idx);
        }
        self.id_index.insert(id, idx);
        log::trace!("added {id:?}");
        self.mutated();
        Ok(idx)
    }

    /// Remove a shape. Group members go with their group, and every
    /// connection bound to a removed shape loses that binding.
    pub fn remove(&mut self, id: ShapeId) -> Option<Shape> {
        let idx = self.index_of(id)?;
        if let Some(parent) = self.parent(idx)
            && let Some(order) = self.child_order.get_mut(&parent)
        {
            order.retain(|c| *c != idx);
        }

        let mut doomed = Vec::new();
        self.collect_subtree(idx, &mut doomed);
        let mut removed_ids = Vec::with_capacity(doomed.len());
        let mut removed = None;
        for node in doomed {
            self.child_order.remove(&node);
            if let Some(shape) = self.graph.remove_node(node) {
                self.id_index.remove(&shape.id);
                removed_ids.push(shape.id);
                if node == idx {
                    removed = Some(shape);
                }
            }
        }

        let lines: Vec<NodeIndex> = self.graph.node_indices().collect();
        for n in lines {
            let shape = &mut self.graph[n];
            let line_id = shape.id;
            if let Some(line) = shape.as_connector_mut() {
                let mut changed = false;
                for target in &removed_ids {
                    changed |= line.unbind_target(*target);
                }
                if changed {
                    log::debug!("{line_id:?} unbound from removed shape {id:?}");
                }
            }
        }

        self.mutated();
        removed
    }

    /// Remove every top-level shape, optionally keeping the grid.
    pub fn clear(&mut self, keep_grid: bool) {
        for id in self.top_level() {
            if keep_grid && self.get(id).is_some_and(Shape::is_grid) {
                continue;
            }
            self.remove(id);
        }
    }

    fn collect_subtree(&self, idx: NodeIndex, out: &mut Vec<NodeIndex>) {
        out.push(idx);
        for child in self.children(idx) {
            self.collect_subtree(child, out);
        }
    }

    // ─── Lookup ──────────────────────────────────────────────────────────

    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    pub fn get_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        self.id_index
            .get(&id)
            .copied()
            .map(|idx| &mut self.graph[idx])
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.id_index.contains_key(&id)
    }

    pub fn index_of(&self, id: ShapeId) -> Option<NodeIndex> {
        self.id_index.get(&id).copied()
    }

    /// Number of shapes, all nesting levels included.
    pub fn len(&self) -> usize {
        self.id_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_index.is_empty()
    }

    pub fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .next()
    }

    /// The group that owns `id`, or `None` for top-level shapes.
    pub fn parent_of(&self, id: ShapeId) -> Option<ShapeId> {
        let parent = self.parent(self.index_of(id)?)?;
        (parent != self.root).then(|| self.graph[parent].id)
    }

    /// Children of a node, back to front.
    pub fn children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.child_order.get(&idx).cloned().unwrap_or_default()
    }

    /// Top-level shape ids, back to front.
    pub fn top_level(&self) -> Vec<ShapeId> {
        self.ids_of(self.root)
    }

    /// Members of a group, back to front. Empty for non-groups.
    pub fn members(&self, group: ShapeId) -> Vec<ShapeId> {
        self.index_of(group)
            .map(|idx| self.ids_of(idx))
            .unwrap_or_default()
    }

    fn ids_of(&self, idx: NodeIndex) -> Vec<ShapeId> {
        self.child_order
            .get(&idx)
            .map(|order| order.iter().map(|c| self.graph[*c].id).collect())
            .unwrap_or_default()
    }

    /// Every shape in paint order (depth-first, back to front).
    pub fn paint_order(&self) -> Vec<ShapeId> {
        let mut nodes = Vec::new();
        for child in self.children(self.root) {
            self.collect_subtree(child, &mut nodes);
        }
        nodes.into_iter().map(|n| self.graph[n].id).collect()
    }

    /// `id` and all of its descendants.
    pub fn subtree(&self, id: ShapeId) -> Vec<ShapeId> {
        let mut nodes = Vec::new();
        if let Some(idx) = self.index_of(id) {
            self.collect_subtree(idx, &mut nodes);
        }
        nodes.into_iter().map(|n| self.graph[n].id).collect()
    }

    // ─── Grid ────────────────────────────────────────────────────────────

    pub fn grid_id(&self) -> Option<ShapeId> {
        self.top_level()
            .into_iter()
            .find(|id| self.get(*id).is_some_and(Shape::is_grid))
    }

    pub fn grid(&self) -> Option<&GridSpec> {
        match &self.get(self.grid_id()?)?.kind {
            ShapeKind::Grid(spec) => Some(spec),
            _ => None,
        }
    }

    /// Grow the grid so `corner` fits. Returns whether it grew.
    pub fn grow_grid(&mut self, corner: Point, margin: f64) -> bool {
        let Some(id) = self.grid_id() else {
            return false;
        };
        let Some(shape) = self.get_mut(id) else {
            return false;
        };
        let grew = match &mut shape.kind {
            ShapeKind::Grid(spec) => spec.grow_to_fit(corner, margin),
            _ => false,
        };
        if grew {
            shape.sync_frame();
            log::debug!("grid grew to {:?}", shape.frame);
        }
        grew
    }

    // ─── Geometry ────────────────────────────────────────────────────────

    /// Product of all enclosing groups' matrices: maps the shape's parent
    /// space to canvas space.
    pub fn group_matrix(&self, id: ShapeId) -> Affine {
        let mut m = Affine::IDENTITY;
        let Some(mut cur) = self.index_of(id) else {
            return m;
        };
        while let Some(parent) = self.parent(cur) {
            if parent == self.root {
                break;
            }
            m = self.graph[parent].own_matrix() * m;
            cur = parent;
        }
        m
    }

    /// Maps the shape's local space to canvas space.
    pub fn absolute_matrix(&self, id: ShapeId) -> Affine {
        let own = self.get(id).map(Shape::own_matrix).unwrap_or(Affine::IDENTITY);
        self.group_matrix(id) * own
    }

    /// Canvas-space corners in `tl, tr, br, bl` order.
    pub fn corners(&self, id: ShapeId) -> Option<[Point; 4]> {
        let shape = self.get(id)?;
        Some(match &shape.kind {
            ShapeKind::Connector(line) => {
                let g = self.group_matrix(id);
                let points: Vec<Point> = line.points.iter().map(|p| g * *p).collect();
                rect_corners(bounding_rect(&points))
            }
            ShapeKind::Grid(spec) => rect_corners(spec.rect()),
            _ => transformed_corners(&self.absolute_matrix(id), shape.frame.width, shape.frame.height),
        })
    }

    /// Axis-aligned canvas-space bounding box.
    pub fn bounding_rect(&self, id: ShapeId) -> Option<Rect> {
        self.corners(id).map(|c| bounding_rect(&c))
    }

    /// Union of every top-level shape's bounds, grid excluded.
    pub fn content_bounds(&self) -> Option<Rect> {
        self.top_level()
            .into_iter()
            .filter(|id| self.get(*id).is_some_and(|s| !s.is_grid()))
            .filter_map(|id| self.bounding_rect(id))
            .reduce(|a, b| a.union(b))
    }

    /// Canvas-space positions of every anchor of `id`, in declaration order.
    pub fn anchor_points(&self, id: ShapeId) -> SmallVec<[(AnchorPosition, Point); 4]> {
        let Some(shape) = self.get(id) else {
            return SmallVec::new();
        };
        let m = self.absolute_matrix(id);
        shape
            .anchors
            .iter()
            .map(|a| (a.position, a.canvas_point(&m, shape.frame.width, shape.frame.height)))
            .collect()
    }

    pub fn anchor_point(&self, id: ShapeId, position: AnchorPosition) -> Option<Point> {
        self.anchor_points(id)
            .into_iter()
            .find(|(p, _)| *p == position)
            .map(|(_, pt)| pt)
    }

    // ─── Transforms ──────────────────────────────────────────────────────

    pub fn translate(&mut self, id: ShapeId, delta: Vec2) -> bool {
        let Some(shape) = self.get_mut(id) else {
            return false;
        };
        shape.translate(delta);
        true
    }

    // ─── Connections ─────────────────────────────────────────────────────

    /// Connectors with at least one end bound to `target`.
    pub fn connectors_bound_to(&self, target: ShapeId) -> Vec<ShapeId> {
        self.graph
            .node_indices()
            .filter(|n| {
                self.graph[*n]
                    .as_connector()
                    .is_some_and(|line| line.is_bound_to(target))
            })
            .map(|n| self.graph[n].id)
            .collect()
    }

    /// Bind one end of `line` to `target`'s `anchor`.
    pub fn bind_endpoint(
        &mut self,
        line: ShapeId,
        end: LineEnd,
        target: ShapeId,
        anchor: AnchorPosition,
    ) -> Result<(), String> {
        if line == target {
            return Err(format!("`{line}` cannot bind to itself"));
        }
        if !self.get(target).is_some_and(|s| s.kind.is_connectable()) {
            return Err(format!("`{target}` is not connectable"));
        }
        let point = self
            .anchor_point(target, anchor)
            .ok_or_else(|| format!("`{target}` has no {anchor:?} anchor"))?;
        let to_local = invert(&self.group_matrix(line));
        let shape = self
            .get_mut(line)
            .ok_or_else(|| format!("unknown connector `{line}`"))?;
        let connector = shape
            .as_connector_mut()
            .ok_or_else(|| format!("`{line}` is not a connector"))?;
        connector.bind(
            end,
            Binding {
                target,
                anchor,
                point: to_local * point,
            },
        );
        shape.sync_frame();
        log::debug!("{line:?} {end:?} bound to {target:?}.{anchor:?}");
        Ok(())
    }

    /// Clear one end's binding. Returns whether a binding was removed.
    pub fn unbind_endpoint(&mut self, line: ShapeId, end: LineEnd) -> bool {
        let unbound = self
            .get_mut(line)
            .and_then(Shape::as_connector_mut)
            .and_then(|l| l.unbind(end))
            .is_some();
        if unbound {
            log::debug!("{line:?} {end:?} unbound");
        }
        unbound
    }

    /// Move a free endpoint to a canvas-space point.
    pub fn set_endpoint(&mut self, line: ShapeId, end: LineEnd, canvas_point: Point) -> bool {
        let to_local = invert(&self.group_matrix(line));
        let Some(shape) = self.get_mut(line) else {
            return false;
        };
        let Some(connector) = shape.as_connector_mut() else {
            return false;
        };
        connector.set_endpoint(end, to_local * canvas_point);
        shape.sync_frame();
        true
    }

    /// Re-snap every connector bound to a moved shape (or to a member of a
    /// moved group) onto the target's live anchor. Bound connectors that sit
    /// inside a moved group are re-snapped too, since the group carries their
    /// points away from targets outside it. Returns the refreshed connectors.
    pub fn refresh_connections(&mut self, moved: &[ShapeId]) -> Vec<ShapeId> {
        let moved: HashSet<ShapeId> = moved.iter().flat_map(|id| self.subtree(*id)).collect();
        self.refresh_where(|line, target| moved.contains(&line) || moved.contains(&target))
    }

    /// Re-snap every bound connector.
    pub fn refresh_all_connections(&mut self) -> Vec<ShapeId> {
        self.refresh_where(|_, _| true)
    }

    /// `affected(line, target)` decides per bound end whether `line` needs
    /// re-snapping.
    fn refresh_where(&mut self, affected: impl Fn(ShapeId, ShapeId) -> bool) -> Vec<ShapeId> {
        let lines: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|n| {
                let id = self.graph[*n].id;
                self.graph[*n].as_connector().is_some_and(|line| {
                    line.from.is_some_and(|b| affected(id, b.target)) || line.to.is_some_and(|b| affected(id, b.target))
                })
            })
            .collect();

        let mut refreshed = Vec::with_capacity(lines.len());
        for n in lines {
            let line_id = self.graph[n].id;
            let Some((from, to)) = self.graph[n].as_connector().map(|l| (l.from, l.to)) else {
                continue;
            };
            let to_local = invert(&self.group_matrix(line_id));
            let from = from.and_then(|b| self.live_binding(b, &to_local));
            let to = to.and_then(|b| self.live_binding(b, &to_local));
            let shape = &mut self.graph[n];
            if let Some(line) = shape.as_connector_mut() {
                line.from = from;
                line.to = to;
                line.recompute_points();
            }
            shape.sync_frame();
            refreshed.push(line_id);
        }
        if !refreshed.is_empty() {
            log::trace!("refreshed connections {refreshed:?}");
        }
        refreshed
    }

    fn live_binding(&self, binding: Binding, to_local: &Affine) -> Option<Binding> {
        let point = self.anchor_point(binding.target, binding.anchor)?;
        Some(Binding {
            point: *to_local * point,
            ..binding
        })
    }

    // ─── Grouping ────────────────────────────────────────────────────────

    /// Wrap top-level shapes in a new group sized to their union bounds.
    /// The group takes the z-position of its front-most member; members
    /// keep their relative order and their canvas appearance.
    pub fn group(&mut self, ids: &[ShapeId], group_id: ShapeId) -> Result<ShapeId, String> {
        let mut unique: Vec<ShapeId> = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(id) {
                unique.push(*id);
            }
        }
        let ids = unique.as_slice();
        if ids.len() < 2 {
            return Err("a group needs at least two members".to_string());
        }
        if self.contains(group_id) {
            return Err(format!("duplicate shape id `{group_id}`"));
        }
        for id in ids {
            let shape = self.get(*id).ok_or_else(|| format!("unknown shape `{id}`"))?;
            if shape.is_grid() {
                return Err("the grid cannot be grouped".to_string());
            }
            if self.parent_of(*id).is_some() {
                return Err(format!("`{id}` already belongs to a group"));
            }
        }

        let union = ids
            .iter()
            .filter_map(|id| self.bounding_rect(*id))
            .reduce(|a, b| a.union(b))
            .unwrap_or(Rect::ZERO);

        let root_order = self.children(self.root);
        let wanted: HashSet<ShapeId> = ids.iter().copied().collect();
        let members: Vec<NodeIndex> = root_order
            .iter()
            .copied()
            .filter(|n| wanted.contains(&self.graph[*n].id))
            .collect();
        let front = root_order
            .iter()
            .rposition(|n| wanted.contains(&self.graph[*n].id))
            .unwrap_or(root_order.len());
        let slot = front + 1 - members.len();

        let mut group = Shape::new(group_id, ShapeKind::Group, Frame::from_rect(union));
        group.style.fill = None;
        group.style.stroke = None;
        let to_group = invert(&group.own_matrix());
        let group_idx = self.graph.add_node(group);
        self.id_index.insert(group_id, group_idx);

        let root = self.root;
        if let Some(order) = self.child_order.get_mut(&root) {
            order.retain(|n| !members.contains(n));
            order.insert(slot.min(order.len()), group_idx);
        }
        self.graph.add_edge(root, group_idx, ());
        for &m in &members {
            self.reparent(m, group_idx);
            realize(&mut self.graph[m], &to_group);
        }
        self.child_order.insert(group_idx, members);

        log::debug!("grouped {ids:?} into {group_id:?}");
        self.mutated();
        Ok(group_id)
    }

    /// Dissolve a group, baking its transform into each member. Members
    /// take the group's place in its parent. Returns the former members.
    pub fn ungroup(&mut self, group_id: ShapeId) -> Result<Vec<ShapeId>, String> {
        let idx = self
            .index_of(group_id)
            .ok_or_else(|| format!("unknown group `{group_id}`"))?;
        if !self.graph[idx].is_group() {
            return Err(format!("`{group_id}` is not a group"));
        }
        let parent = self.parent(idx).unwrap_or(self.root);
        let group_matrix = self.graph[idx].own_matrix();
        let members = self.children(idx);

        for &m in &members {
            self.reparent(m, parent);
            realize(&mut self.graph[m], &group_matrix);
        }
        if let Some(order) = self.child_order.get_mut(&parent)
            && let Some(pos) = order.iter().position(|n| *n == idx)
        {
            order.splice(pos..=pos, members.iter().copied());
        }
        self.child_order.remove(&idx);
        self.graph.remove_node(idx);
        self.id_index.remove(&group_id);

        let ids: Vec<ShapeId> = members.iter().map(|m| self.graph[*m].id).collect();
        log::debug!("ungrouped {group_id:?} into {ids:?}");
        self.mutated();
        Ok(ids)
    }

    fn reparent(&mut self, child: NodeIndex, new_parent: NodeIndex) {
        if let Some(old_parent) = self.parent(child)
            && let Some(edge) = self.graph.find_edge(old_parent, child)
        {
            self.graph.remove_edge(edge);
        }
        self.graph.add_edge(new_parent, child, ());
    }

    // ─── Z-order ─────────────────────────────────────────────────────────

    pub fn bring_forward(&mut self, id: ShapeId) -> bool {
        self.restack(id, |pos, len| (pos + 1 < len).then_some(pos + 1))
    }

    pub fn send_backward(&mut self, id: ShapeId) -> bool {
        self.restack(id, |pos, _| pos.checked_sub(1))
    }

    pub fn bring_to_front(&mut self, id: ShapeId) -> bool {
        self.restack(id, |pos, len| (pos + 1 < len).then_some(len - 1))
    }

    /// Move to the back, but never behind the grid.
    pub fn send_to_back(&mut self, id: ShapeId) -> bool {
        let floor = usize::from(self.parent_of(id).is_none() && self.grid_id().is_some());
        self.restack(id, |pos, _| (pos > floor).then_some(floor))
    }

    fn restack(&mut self, id: ShapeId, target: impl Fn(usize, usize) -> Option<usize>) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        if self.graph[idx].is_grid() {
            return false;
        }
        let Some(parent) = self.parent(idx) else {
            return false;
        };
        let Some(order) = self.child_order.get_mut(&parent) else {
            return false;
        };
        let Some(pos) = order.iter().position(|n| *n == idx) else {
            return false;
        };
        let Some(to) = target(pos, order.len()) else {
            return false;
        };
        let node = order.remove(pos);
        order.insert(to, node);
        self.mutated();
        true
    }
}

fn rect_corners(r: Rect) -> [Point; 4] {
    [
        Point::new(r.x0, r.y0),
        Point::new(r.x1, r.y0),
        Point::new(r.x1, r.y1),
        Point::new(r.x0, r.y1),
    ]
}

/// Re-express a shape through `m` (bake a group transform in, or take one out).
fn realize(shape: &mut Shape, m: &Affine) {
    match &mut shape.kind {
        ShapeKind::Connector(line) => {
            for p in &mut line.points {
                *p = *m * *p;
            }
            for binding in [&mut line.from, &mut line.to].into_iter().flatten() {
                binding.point = *m * binding.point;
            }
        }
        ShapeKind::Grid(_) | ShapeKind::Root => return,
        _ => {
            let parts = decompose_matrix(&(*m * shape.frame.own_matrix()));
            shape.frame.apply_parts(&parts);
            return;
        }
    }
    shape.sync_frame();
}

/// The canvas grid entity, under its well-known id.
pub fn grid_shape(spec: GridSpec) -> Shape {
    Shape::grid(ShapeId::intern("grid"), spec)
}
