//! Physical constants (SI) and the simulation length unit.

/// Simulation length unit in metres (1 µm). Lengths in the run configuration
/// (layer thickness, lattice vectors, FDTD distances) are multiples of this.
pub const UNIT_MAGNITUDE: f64 = 1e-6;

/// Speed of light in vacuum (m/s).
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Vacuum permittivity (F/m).
pub const EPS_0: f64 = 8.854_187_812_8e-12;

/// Vacuum permeability (H/m).
pub const MU_0: f64 = 1.256_637_062_12e-6;

pub const PI: f64 = std::f64::consts::PI;
