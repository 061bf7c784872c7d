//! Gradient-band interpolation over freely placed 2D children.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use super::{even_split, exact_match};

/// Samples per axis of the grid used to find each child's significant neighbors.
const NEIGHBOR_GRID: usize = 32;
/// Weight of the angular component against the magnitude component in polar space.
const DIRECTIONAL_INFLUENCE: f32 = 2.;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FreeformMode {
    /// Positions are velocities: children are compared by magnitude and direction.
    #[default]
    Directional,
    /// Positions are plain points in the plane.
    Cartesian,
}

/// Precomputed term of the pair (i, j): the gradient band from child i towards child j.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PairTerm {
    /// Separating vector in the blend space of the mode.
    separation: Vec2,
    inverse_length_squared: f32,
    /// Average magnitude of the pair, used by the polar space.
    average_magnitude: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Freeform2D {
    pub parameters: [usize; 2],
    pub mode: FreeformMode,
    positions: Vec<Vec2>,
    /// Row-major `n * n` pair table; `None` for the diagonal and coincident children.
    pairs: Vec<Option<PairTerm>>,
    neighbors: Vec<Vec<usize>>,
}

fn signed_angle(from: Vec2, to: Vec2) -> f32 {
    if from.length_squared() < 1e-10 || to.length_squared() < 1e-10 {
        return 0.;
    }
    from.perp_dot(to).atan2(from.dot(to))
}

impl Freeform2D {
    pub fn new(parameters: [usize; 2], mode: FreeformMode, positions: Vec<Vec2>) -> Self {
        let count = positions.len();
        let mut freeform = Self {
            parameters,
            mode,
            positions,
            pairs: vec![None; count * count],
            neighbors: vec![vec![]; count],
        };
        for i in 0..count {
            for j in 0..count {
                if i != j {
                    freeform.pairs[i * count + j] = freeform.pair_term(i, j);
                }
            }
        }
        freeform.neighbors = freeform.find_neighbors();
        freeform
    }

    pub fn positions(&self) -> &[Vec2] {
        &self.positions
    }

    /// Significant neighbors of a child, as found on the sample grid.
    pub fn neighbors(&self, child: usize) -> &[usize] {
        self.neighbors.get(child).map(Vec::as_slice).unwrap_or(&[])
    }

    fn pair_term(&self, i: usize, j: usize) -> Option<PairTerm> {
        let (pi, pj) = (self.positions[i], self.positions[j]);
        let (separation, average_magnitude) = match self.mode {
            FreeformMode::Cartesian => (pj - pi, 1.),
            FreeformMode::Directional => {
                let average = (pi.length() + pj.length()) * 0.5;
                if average < 1e-6 {
                    return None;
                }
                (
                    Vec2::new(
                        (pj.length() - pi.length()) / average,
                        signed_angle(pi, pj) * DIRECTIONAL_INFLUENCE,
                    ),
                    average,
                )
            }
        };
        let length_squared = separation.length_squared();
        if length_squared < 1e-10 {
            return None;
        }
        Some(PairTerm {
            separation,
            inverse_length_squared: length_squared.recip(),
            average_magnitude,
        })
    }

    /// Clamped influence of child `i` at `query` with respect to child `j`.
    fn term(&self, i: usize, j: usize, query: Vec2) -> f32 {
        let Some(pair) = self.pairs[i * self.positions.len() + j] else {
            return 1.;
        };
        let pi = self.positions[i];
        let offset = match self.mode {
            FreeformMode::Cartesian => query - pi,
            FreeformMode::Directional => Vec2::new(
                (query.length() - pi.length()) / pair.average_magnitude,
                signed_angle(pi, query) * DIRECTIONAL_INFLUENCE,
            ),
        };
        (1. - offset.dot(pair.separation) * pair.inverse_length_squared).clamp(0., 1.)
    }

    fn find_neighbors(&self) -> Vec<Vec<usize>> {
        let count = self.positions.len();
        let mut significant = vec![false; count * count];
        if count < 2 {
            return vec![vec![]; count];
        }

        let (mut min, mut max) = (self.positions[0], self.positions[0]);
        for position in &self.positions {
            min = min.min(*position);
            max = max.max(*position);
        }
        let margin = (max - min) * 0.1 + Vec2::splat(1e-3);
        let (min, max) = (min - margin, max + margin);
        let step = (max - min) / (NEIGHBOR_GRID - 1) as f32;

        let grid = (0..NEIGHBOR_GRID * NEIGHBOR_GRID).map(|sample| {
            let (x, y) = (sample % NEIGHBOR_GRID, sample / NEIGHBOR_GRID);
            min + step * Vec2::new(x as f32, y as f32)
        });
        let samples = grid.chain(self.positions.iter().copied());

        for query in samples {
            for i in 0..count {
                let lowest = (0..count)
                    .filter(|j| *j != i)
                    .map(|j| self.term(i, j, query))
                    .fold(1_f32, f32::min);
                if lowest >= 1. {
                    continue;
                }
                for j in (0..count).filter(|j| *j != i) {
                    if self.term(i, j, query) <= lowest + 1e-6 {
                        significant[i * count + j] = true;
                    }
                }
            }
        }

        (0..count)
            .map(|i| {
                (0..count)
                    .filter(|j| significant[i * count + j])
                    .collect()
            })
            .collect()
    }

    pub fn weights(&self, query: Vec2, out: &mut [f32]) {
        out.fill(0.);
        if exact_match(&self.positions, query, out) {
            return;
        }
        let mut sum = 0.;
        for (i, weight) in out.iter_mut().enumerate() {
            *weight = self.neighbors[i]
                .iter()
                .map(|j| self.term(i, *j, query))
                .fold(1_f32, f32::min);
            sum += *weight;
        }
        if sum <= f32::EPSILON {
            even_split(out);
            return;
        }
        out.iter_mut().for_each(|weight| *weight /= sum);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn positions() -> Vec<Vec2> {
        vec![
            Vec2::ZERO,
            Vec2::new(0., 1.),
            Vec2::new(0., 3.),
            Vec2::new(1., 0.5),
            Vec2::new(-1., 0.5),
            Vec2::new(0., -1.),
        ]
    }

    #[test]
    fn test_exact_positions_in_both_modes() {
        for mode in [FreeformMode::Cartesian, FreeformMode::Directional] {
            let blend = Freeform2D::new([0, 1], mode, positions());
            let mut out = [0.; 6];
            for (index, position) in positions().into_iter().enumerate() {
                blend.weights(position, &mut out);
                for (other, weight) in out.iter().enumerate() {
                    let expected = if other == index { 1. } else { 0. };
                    assert!((weight - expected).abs() < 1e-5, "{mode:?} {index}: {out:?}");
                }
            }
        }
    }

    #[test]
    fn test_weights_are_normalized() {
        for mode in [FreeformMode::Cartesian, FreeformMode::Directional] {
            let blend = Freeform2D::new([0, 1], mode, positions());
            let mut out = [0.; 6];
            for query in [Vec2::new(0.3, 0.7), Vec2::new(-0.6, 2.), Vec2::new(5., -5.)] {
                blend.weights(query, &mut out);
                let sum: f32 = out.iter().sum();
                assert!((sum - 1.).abs() < 1e-5);
                assert!(out.iter().all(|weight| *weight >= 0.));
            }
        }
    }

    #[test]
    fn test_cartesian_midpoint() {
        let blend = Freeform2D::new(
            [0, 1],
            FreeformMode::Cartesian,
            vec![Vec2::ZERO, Vec2::X],
        );
        let mut out = [0.; 2];
        blend.weights(Vec2::new(0.25, 0.), &mut out);
        assert!((out[0] - 0.75).abs() < 1e-5);
        assert!((out[1] - 0.25).abs() < 1e-5);
        assert_eq!(blend.neighbors(0), &[1]);
    }

    #[test]
    fn test_directional_speed_band() {
        let blend = Freeform2D::new(
            [0, 1],
            FreeformMode::Directional,
            vec![Vec2::new(0., 1.), Vec2::new(0., 3.)],
        );
        let mut out = [0.; 2];
        blend.weights(Vec2::new(0., 2.), &mut out);
        assert!((out[0] - 0.5).abs() < 1e-5);
        assert!((out[1] - 0.5).abs() < 1e-5);
    }
}
