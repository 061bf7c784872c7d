/// Children placed on a scalar axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Blend1D {
    pub parameter: usize,
    thresholds: Vec<f32>,
    /// Child indices sorted by threshold.
    order: Vec<usize>,
}

impl Blend1D {
    pub fn new(parameter: usize, thresholds: Vec<f32>) -> Self {
        let mut order: Vec<usize> = (0..thresholds.len()).collect();
        order.sort_by(|a, b| thresholds[*a].total_cmp(&thresholds[*b]));
        Self {
            parameter,
            thresholds,
            order,
        }
    }

    pub fn thresholds(&self) -> &[f32] {
        &self.thresholds
    }

    /// Piecewise-linear weights between the two thresholds around `value`, clamped at the ends.
    pub fn weights(&self, value: f32, out: &mut [f32]) {
        out.fill(0.);
        let (Some(&first), Some(&last)) = (self.order.first(), self.order.last()) else {
            return;
        };
        if self.order.len() == 1 || !value.is_finite() {
            out[first] = 1.;
            return;
        }
        let value = value.clamp(self.thresholds[first], self.thresholds[last]);
        for pair in self.order.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let (low, high) = (self.thresholds[a], self.thresholds[b]);
            if value < low || value > high {
                continue;
            }
            let span = high - low;
            if span <= f32::EPSILON {
                out[a] = 0.5;
                out[b] = 0.5;
            } else {
                let t = (value - low) / span;
                out[a] = 1. - t;
                out[b] = t;
            }
            return;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_weights_between_neighbors() {
        let blend = Blend1D::new(0, vec![0., 0.5, 1.]);
        let mut out = [0.; 3];
        blend.weights(0.25, &mut out);
        assert_eq!(out, [0.5, 0.5, 0.]);
        blend.weights(0.5, &mut out);
        assert_eq!(out, [0., 1., 0.]);
        blend.weights(0.75, &mut out);
        assert_eq!(out, [0., 0.5, 0.5]);
    }

    #[test]
    fn test_clamped_outside_range() {
        let blend = Blend1D::new(0, vec![0., 0.5, 1.]);
        let mut out = [0.; 3];
        blend.weights(-3., &mut out);
        assert_eq!(out, [1., 0., 0.]);
        blend.weights(7., &mut out);
        assert_eq!(out, [0., 0., 1.]);
    }

    #[test]
    fn test_weights_sum_to_one() {
        let blend = Blend1D::new(0, vec![1., -2., 0.3, 4.]);
        let mut out = [0.; 4];
        for step in 0..=60 {
            let value = -2. + step as f32 * 0.1;
            blend.weights(value, &mut out);
            let sum: f32 = out.iter().sum();
            assert!((sum - 1.).abs() < 1e-5, "{value}: {out:?}");
        }
    }

    #[test]
    fn test_unsorted_thresholds() {
        let blend = Blend1D::new(0, vec![1., 0.]);
        let mut out = [0.; 2];
        blend.weights(0.25, &mut out);
        assert_eq!(out, [0.25, 0.75]);
    }

    #[test]
    fn test_zero_span_is_even_split() {
        let blend = Blend1D::new(0, vec![0.5, 0.5]);
        let mut out = [0.; 2];
        blend.weights(0.5, &mut out);
        assert_eq!(out, [0.5, 0.5]);
    }
}
