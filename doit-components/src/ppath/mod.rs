//! Propagation path steppers
//!
//! Each stepper moves a one-point path from a grid point to the next grid surface crossed
//! by the line of sight.

mod one_d;
mod three_d;

pub use one_d::GeometricPpath1D;
pub use three_d::GeometricPpath3D;
