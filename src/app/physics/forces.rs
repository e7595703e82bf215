use eframe::egui::{Vec2, vec2};

use super::quadtree::QuadNode;

const BARNES_HUT_THETA: f32 = 0.72;
const MIN_DISTANCE: f32 = 0.0001;

/// Direction used when two points coincide. Antisymmetric in `(a, b)` so
/// the pair still pushes apart.
fn separation_axis(a: usize, b: usize) -> Vec2 {
    let (low, high, sign) = if a < b { (a, b, 1.0) } else { (b, a, -1.0) };
    let angle = ((low as f32) * 0.618_034 + (high as f32) * 0.414_214) * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin()) * sign
}

#[derive(Clone, Copy)]
pub(super) struct Repulsion {
    pub(super) strength: f32,
    pub(super) softening: f32,
}

impl Repulsion {
    fn push(self, delta: Vec2, mass: f32) -> Vec2 {
        let distance_sq = delta.length_sq();
        let distance = distance_sq.sqrt().max(MIN_DISTANCE);
        (delta / distance) * (self.strength * mass / (distance_sq + self.softening))
    }

    /// Adds the repulsion every other node applies to `index`, approximating
    /// distant cells by their center of mass.
    pub(super) fn accumulate(
        self,
        cell: &QuadNode,
        index: usize,
        positions: &[Vec2],
        force: &mut Vec2,
    ) {
        if cell.mass <= 0.0 {
            return;
        }

        let point = positions[index];
        if cell.is_leaf() {
            for &other in &cell.members {
                if other == index {
                    continue;
                }
                let delta = point - positions[other];
                *force += if delta.length_sq() <= MIN_DISTANCE * MIN_DISTANCE {
                    separation_axis(index, other) * (self.strength / self.softening)
                } else {
                    self.push(delta, 1.0)
                };
            }
            return;
        }

        let delta = point - cell.center_of_mass;
        let distance = delta.length().max(MIN_DISTANCE);
        if !cell.region.contains(point) && cell.region.side() / distance < BARNES_HUT_THETA {
            *force += self.push(delta, cell.mass);
            return;
        }

        for child in cell.children() {
            self.accumulate(child, index, positions, force);
        }
    }
}

#[derive(Clone, Copy)]
pub(super) struct Spring {
    pub(super) rest_length: f32,
    pub(super) stiffness: f32,
    pub(super) damping: f32,
}

impl Spring {
    /// Force on `from`; `to` receives the opposite.
    pub(super) fn pull(
        self,
        from: Vec2,
        to: Vec2,
        from_velocity: Vec2,
        to_velocity: Vec2,
    ) -> Option<Vec2> {
        let delta = from - to;
        let distance = delta.length();
        if distance <= MIN_DISTANCE {
            return None;
        }

        let direction = delta / distance;
        let stretch = (distance - self.rest_length) * self.stiffness;
        let closing = (from_velocity - to_velocity).dot(direction) * self.damping;
        Some(-direction * (stretch + closing))
    }
}

pub(super) fn centering(position: Vec2, strength: f32) -> Vec2 {
    -position * strength
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coincident_points_are_pushed_in_opposite_directions() {
        let positions = [Vec2::ZERO, Vec2::ZERO];
        let tree = QuadNode::build(&positions).unwrap();
        let repulsion = Repulsion {
            strength: 1000.0,
            softening: 100.0,
        };

        let mut first = Vec2::ZERO;
        let mut second = Vec2::ZERO;
        repulsion.accumulate(&tree, 0, &positions, &mut first);
        repulsion.accumulate(&tree, 1, &positions, &mut second);

        assert!(first.length() > 0.0);
        assert!((first + second).length() < 1e-4);
    }

    #[test]
    fn stretched_spring_pulls_endpoints_together() {
        let spring = Spring {
            rest_length: 10.0,
            stiffness: 0.5,
            damping: 0.0,
        };
        let force = spring
            .pull(vec2(30.0, 0.0), Vec2::ZERO, Vec2::ZERO, Vec2::ZERO)
            .unwrap();
        assert!(force.x < 0.0);
        assert_eq!(force.y, 0.0);
    }
}
