mod rig_error;
mod validation_error;

pub use rig_error::*;
pub use validation_error::*;
