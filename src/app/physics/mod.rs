mod forces;
mod quadtree;

use std::collections::HashMap;

use eframe::egui::{Vec2, vec2};

use crate::util::stable_pair;
use forces::{Repulsion, Spring, centering};
pub(in crate::app) use quadtree::QuadtreeCell;
use quadtree::QuadNode;

#[derive(Clone, Copy, Debug)]
pub(crate) struct LayoutConfig {
    pub repulsion: f32,
    pub softening: f32,
    pub link_distance: f32,
    pub link_strength: f32,
    pub link_damping: f32,
    pub center_strength: f32,
    /// Fraction of velocity lost per tick.
    pub velocity_decay: f32,
    pub max_speed: f32,
    pub alpha_min: f32,
    pub alpha_decay: f32,
    /// Energy the simulation is raised to when the node set changes.
    pub reheat_alpha: f32,
    pub drag_alpha_target: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let alpha_min = 0.001;
        Self {
            repulsion: 36_000.0,
            softening: 620.0,
            link_distance: 110.0,
            link_strength: 0.06,
            link_damping: 0.22,
            center_strength: 0.002,
            velocity_decay: 0.4,
            max_speed: 24.0,
            alpha_min,
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            reheat_alpha: 0.5,
            drag_alpha_target: 0.3,
        }
    }
}

impl LayoutConfig {
    pub(crate) fn with_intensity(intensity: f32) -> Self {
        let intensity = intensity.clamp(0.2, 2.5);
        let base = Self::default();
        Self {
            repulsion: base.repulsion * intensity,
            link_strength: base.link_strength * intensity,
            max_speed: base.max_speed * intensity.sqrt(),
            ..base
        }
    }
}

pub(crate) struct LayoutNode {
    pub id: String,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Set while the node is dragged; the solver leaves it alone.
    pub pin: Option<Vec2>,
}

#[derive(Default)]
struct Scratch {
    forces: Vec<Vec2>,
    positions: Vec<Vec2>,
}

/// Force-directed positions for the current host set.
pub(crate) struct LayoutEngine {
    config: LayoutConfig,
    nodes: Vec<LayoutNode>,
    index_by_id: HashMap<String, usize>,
    edges: Vec<(usize, usize)>,
    alpha: f32,
    alpha_target: f32,
    scratch: Scratch,
}

fn spawn_direction(id: &str, index: usize) -> Vec2 {
    let (jx, jy) = stable_pair(id);
    let direction = vec2(jx, jy);
    if direction.length_sq() <= 0.0001 {
        let angle = ((index as f32) * 0.618_034 + 0.11) * std::f32::consts::TAU;
        vec2(angle.cos(), angle.sin())
    } else {
        direction.normalized()
    }
}

impl LayoutEngine {
    pub(crate) fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            nodes: Vec::new(),
            index_by_id: HashMap::new(),
            edges: Vec::new(),
            alpha: 0.0,
            alpha_target: 0.0,
            scratch: Scratch::default(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn nodes(&self) -> &[LayoutNode] {
        &self.nodes
    }

    pub(crate) fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    pub(crate) fn alpha(&self) -> f32 {
        self.alpha
    }

    pub(crate) fn position(&self, id: &str) -> Option<Vec2> {
        self.index_by_id
            .get(id)
            .map(|&index| self.nodes[index].position)
    }

    pub(crate) fn is_settled(&self) -> bool {
        self.alpha < self.config.alpha_min && self.alpha_target < self.config.alpha_min
    }

    /// Merges a new node/link set into the simulation. Known nodes keep their
    /// position and velocity; the simulation is reheated to a bounded alpha
    /// only when something actually changed. Returns whether it did.
    pub(crate) fn add_or_update_node_set(&mut self, node_ids: &[&str], links: &[(&str, &str)]) -> bool {
        let mut prior = std::mem::take(&mut self.nodes)
            .into_iter()
            .map(|node| (node.id.clone(), node))
            .collect::<HashMap<_, _>>();

        let mut nodes = Vec::with_capacity(node_ids.len());
        let mut index_by_id = HashMap::with_capacity(node_ids.len());
        let mut spawned = Vec::new();
        for &id in node_ids {
            if index_by_id.contains_key(id) {
                continue;
            }
            let index = nodes.len();
            let node = prior.remove(id).unwrap_or_else(|| {
                spawned.push(index);
                LayoutNode {
                    id: id.to_owned(),
                    position: Vec2::ZERO,
                    velocity: Vec2::ZERO,
                    pin: None,
                }
            });
            index_by_id.insert(id.to_owned(), index);
            nodes.push(node);
        }
        let removed = !prior.is_empty();

        let mut edges = links
            .iter()
            .filter_map(|&(from, to)| {
                let from = *index_by_id.get(from)?;
                let to = *index_by_id.get(to)?;
                (from != to).then(|| (from.min(to), from.max(to)))
            })
            .collect::<Vec<_>>();
        edges.sort_unstable();
        edges.dedup();

        let changed = removed || !spawned.is_empty() || edges != self.edges;
        self.nodes = nodes;
        self.index_by_id = index_by_id;
        self.edges = edges;
        self.place_spawned(&spawned);

        if self.nodes.iter().all(|node| node.pin.is_none()) {
            self.alpha_target = 0.0;
        }
        if changed {
            self.alpha = self.alpha.max(self.config.reheat_alpha);
        }
        changed
    }

    /// Puts new nodes next to an already placed neighbour, or on a ring
    /// around the current centroid.
    fn place_spawned(&mut self, spawned: &[usize]) {
        if spawned.is_empty() {
            return;
        }

        let mut placed = vec![true; self.nodes.len()];
        for &index in spawned {
            placed[index] = false;
        }

        for &index in spawned {
            let direction = spawn_direction(&self.nodes[index].id, index);
            let neighbour = self.edges.iter().find_map(|&(a, b)| {
                if a == index && placed[b] {
                    Some(b)
                } else if b == index && placed[a] {
                    Some(a)
                } else {
                    None
                }
            });

            let placed_count = placed.iter().filter(|&&is_placed| is_placed).count();
            let position = if let Some(neighbour) = neighbour {
                self.nodes[neighbour].position + direction * (self.config.link_distance * 0.6)
            } else if placed_count == 0 {
                Vec2::ZERO
            } else {
                let centroid = self
                    .nodes
                    .iter()
                    .zip(&placed)
                    .filter(|(_, is_placed)| **is_placed)
                    .fold(Vec2::ZERO, |sum, (node, _)| sum + node.position)
                    / placed_count as f32;
                let ring = self.config.link_distance * (1.0 + (placed_count as f32).sqrt() * 0.5);
                centroid + direction * ring
            };

            self.nodes[index].position = position;
            self.nodes[index].velocity = Vec2::ZERO;
            placed[index] = true;
        }
    }

    /// Raises the simulation energy back to the reheat level without
    /// touching positions.
    pub(crate) fn reheat(&mut self) {
        if !self.nodes.is_empty() {
            self.alpha = self.alpha.max(self.config.reheat_alpha);
        }
    }

    pub(crate) fn begin_drag(&mut self, id: &str) {
        let Some(&index) = self.index_by_id.get(id) else {
            return;
        };
        let node = &mut self.nodes[index];
        node.pin = Some(node.position);
        node.velocity = Vec2::ZERO;
        self.alpha_target = self.config.drag_alpha_target;
    }

    pub(crate) fn drag_to(&mut self, id: &str, position: Vec2) {
        let Some(&index) = self.index_by_id.get(id) else {
            return;
        };
        let node = &mut self.nodes[index];
        if node.pin.is_some() {
            node.pin = Some(position);
            node.position = position;
        }
    }

    pub(crate) fn end_drag(&mut self, id: &str) {
        if let Some(&index) = self.index_by_id.get(id) {
            self.nodes[index].pin = None;
        }
        if self.nodes.iter().all(|node| node.pin.is_none()) {
            self.alpha_target = 0.0;
        }
    }

    pub(crate) fn quadtree_cells(&mut self, cells: &mut Vec<QuadtreeCell>) {
        cells.clear();
        let positions = &mut self.scratch.positions;
        positions.clear();
        positions.extend(self.nodes.iter().map(|node| node.position));
        if let Some(tree) = QuadNode::build(positions) {
            tree.collect_cells(0, cells);
        }
    }

    /// Advances the simulation by one tick. Returns `false` once it has
    /// cooled down and nothing is being dragged.
    pub(crate) fn step(&mut self) -> bool {
        if self.nodes.is_empty() || self.is_settled() {
            return false;
        }

        let config = self.config;
        self.alpha += (self.alpha_target - self.alpha) * config.alpha_decay;
        let alpha = self.alpha;
        let node_count = self.nodes.len();

        let scratch = &mut self.scratch;
        scratch.forces.clear();
        scratch.forces.resize(node_count, Vec2::ZERO);
        scratch.positions.clear();
        scratch
            .positions
            .extend(self.nodes.iter().map(|node| node.position));
        let forces = &mut scratch.forces;
        let positions = &scratch.positions;

        if node_count > 1
            && let Some(tree) = QuadNode::build(positions)
        {
            let repulsion = Repulsion {
                strength: config.repulsion,
                softening: config.softening,
            };
            for (index, force) in forces.iter_mut().enumerate() {
                repulsion.accumulate(&tree, index, positions, force);
            }
        }

        let spring = Spring {
            rest_length: config.link_distance,
            stiffness: config.link_strength,
            damping: config.link_damping,
        };
        for &(from, to) in &self.edges {
            let (a, b) = (&self.nodes[from], &self.nodes[to]);
            if let Some(pull) = spring.pull(a.position, b.position, a.velocity, b.velocity) {
                forces[from] += pull;
                forces[to] -= pull;
            }
        }

        for (force, node) in forces.iter_mut().zip(&self.nodes) {
            *force += centering(node.position, config.center_strength);
        }

        let retain = 1.0 - config.velocity_decay.clamp(0.0, 1.0);
        let max_speed_sq = config.max_speed * config.max_speed;
        let mut free_count = 0usize;
        let mut free_centroid = Vec2::ZERO;
        for (node, force) in self.nodes.iter_mut().zip(forces.iter()) {
            if let Some(pin) = node.pin {
                node.position = pin;
                node.velocity = Vec2::ZERO;
                continue;
            }

            let mut velocity = (node.velocity + *force * alpha) * retain;
            let speed_sq = velocity.length_sq();
            if speed_sq > max_speed_sq {
                velocity *= config.max_speed / speed_sq.sqrt();
            }
            node.velocity = velocity;
            node.position += velocity;
            free_count += 1;
            free_centroid += node.position;
        }

        // Keep the cloud around the origin unless something is pinned there.
        if free_count == node_count {
            free_centroid /= free_count as f32;
            if free_centroid.length_sq() > 0.000_001 {
                for node in &mut self.nodes {
                    node.position -= free_centroid;
                }
            }
        }

        true
    }
}
