use std::f32::consts::TAU;

use bevy::math::Vec2;

use super::{even_split, exact_match};

/// Children placed by direction around an optional center child, blended inside the triangle
/// formed by the origin and the two angularly nearest children.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleDirectional2D {
    pub parameters: [usize; 2],
    positions: Vec<Vec2>,
    center: Option<usize>,
}

const CENTER_EPSILON: f32 = 1e-5;

impl SimpleDirectional2D {
    pub fn new(parameters: [usize; 2], positions: Vec<Vec2>) -> Self {
        let center = positions
            .iter()
            .position(|position| position.length_squared() < CENTER_EPSILON * CENTER_EPSILON);
        Self {
            parameters,
            positions,
            center,
        }
    }

    pub fn positions(&self) -> &[Vec2] {
        &self.positions
    }

    pub fn weights(&self, query: Vec2, out: &mut [f32]) {
        out.fill(0.);
        if exact_match(&self.positions, query, out) {
            return;
        }

        let query_angle = query.to_angle();
        let mut ccw: Option<(usize, f32)> = None;
        let mut cw: Option<(usize, f32)> = None;
        for (index, position) in self.positions.iter().enumerate() {
            if Some(index) == self.center {
                continue;
            }
            let delta = (position.to_angle() - query_angle).rem_euclid(TAU);
            if ccw.is_none_or(|(_, best)| delta < best) {
                ccw = Some((index, delta));
            }
            if cw.is_none_or(|(_, best)| delta > best) {
                cw = Some((index, delta));
            }
        }

        let (Some((a, _)), Some((b, _))) = (ccw, cw) else {
            even_split(out);
            return;
        };
        if a == b {
            even_split(out);
            return;
        }

        let (pa, pb) = (self.positions[a], self.positions[b]);
        let det = pa.perp_dot(pb);
        if det.abs() < 1e-6 {
            even_split(out);
            return;
        }
        let mut wa = (query.perp_dot(pb) / det).max(0.);
        let mut wb = (pa.perp_dot(query) / det).max(0.);
        let sum = wa + wb;

        match self.center {
            Some(center) if sum <= 1. => {
                out[center] = 1. - sum;
            }
            _ => {
                if sum <= f32::EPSILON {
                    even_split(out);
                    return;
                }
                wa /= sum;
                wb /= sum;
            }
        }
        out[a] = wa;
        out[b] = wb;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn cross() -> SimpleDirectional2D {
        SimpleDirectional2D::new(
            [0, 1],
            vec![
                Vec2::ZERO,
                Vec2::new(0., 1.),
                Vec2::new(1., 0.),
                Vec2::new(0., -1.),
                Vec2::new(-1., 0.),
            ],
        )
    }

    #[test]
    fn test_exact_positions() {
        let blend = cross();
        let mut out = [0.; 5];
        for (index, position) in blend.positions().to_vec().into_iter().enumerate() {
            blend.weights(position, &mut out);
            for (other, weight) in out.iter().enumerate() {
                assert_eq!(*weight, if other == index { 1. } else { 0. });
            }
        }
    }

    #[test]
    fn test_inside_triangle() {
        let blend = cross();
        let mut out = [0.; 5];
        blend.weights(Vec2::new(0.25, 0.5), &mut out);
        assert!((out[1] - 0.5).abs() < 1e-5);
        assert!((out[2] - 0.25).abs() < 1e-5);
        assert!((out[0] - 0.25).abs() < 1e-5);
        assert_eq!(out[3] + out[4], 0.);
    }

    #[test]
    fn test_outside_is_normalized() {
        let blend = cross();
        let mut out = [0.; 5];
        blend.weights(Vec2::new(2., 2.), &mut out);
        assert!((out[1] - 0.5).abs() < 1e-5);
        assert!((out[2] - 0.5).abs() < 1e-5);
        assert_eq!(out[0], 0.);
    }

    #[test]
    fn test_single_direction_is_even_split() {
        let blend = SimpleDirectional2D::new([0, 1], vec![Vec2::ZERO, Vec2::X]);
        let mut out = [0.; 2];
        blend.weights(Vec2::new(0.3, 0.3), &mut out);
        assert_eq!(out, [0.5, 0.5]);
    }
}
