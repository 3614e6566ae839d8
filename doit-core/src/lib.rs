//! Core of the Discrete Ordinate Iterative (DOIT) method.
//!
//! The crate holds the radiation field of a cloudbox, the geometry and interpolation helpers
//! needed to follow short propagation path steps through it, and the iteration loop that
//! alternates field sweeps with scattering source updates until convergence.
//!
//! Physics (gas absorption, particle properties, surface reflection, path geometry,
//! the scattering integral and the convergence test) is injected through the agenda traits
//! in [`agenda`]. Reference implementations live in the `doit-components` crate.

pub mod agenda;
pub mod atmosphere;
pub mod cloudbox;
pub mod coefficients;
pub mod config;
pub mod context;
pub mod errors;
pub mod field;
pub mod field_interp;
pub mod interpolate;
pub mod iteration;
pub mod optical;
pub mod ppath;
pub mod rte;
pub mod solver;
pub mod stepper;
#[cfg(test)]
pub(crate) mod test_utils;
pub mod update;
pub mod za_grid;

/// Floating point type used for every physical quantity in the solver.
pub type FloatValue = f64;

/// Conversion factor from degrees to radians
pub const DEG2RAD: FloatValue = std::f64::consts::PI / 180.0;
/// Conversion factor from radians to degrees
pub const RAD2DEG: FloatValue = 180.0 / std::f64::consts::PI;
