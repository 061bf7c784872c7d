pub mod additive;
pub mod difference;
pub mod linear;

pub use additive::AdditiveInterpolator;
pub use difference::DifferenceInterpolator;
pub use linear::{InterpolateLinear, LinearInterpolator};
