//! Reference agendas for the DOIT cloudbox solver
//!
//! These implementations cover the physics hooks the solver needs to run end to end:
//! gas absorption, particle optical properties, surface reflection, propagation paths,
//! scattering sources and convergence tests. They are deliberately simple and are intended
//! for testing and as templates for more detailed physics.

pub mod convergence;
pub mod gas;
pub mod particles;
pub mod ppath;
pub mod scattering;
pub mod surface;

pub use convergence::AbsoluteConvergence;
pub use gas::{ScalarGasOpticalProperties, SpeciesAbsorption};
pub use particles::{NumberDensityWeightedSum, UniformParticles};
pub use ppath::{GeometricPpath1D, GeometricPpath3D};
pub use scattering::IsotropicScattering;
pub use surface::SpecularSurface;
