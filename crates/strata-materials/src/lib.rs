//! # Strata Materials
//!
//! Material property providers for the Strata inverse-design framework. All
//! materials implement the [`MaterialProvider`](provider::MaterialProvider)
//! trait, which returns the complex relative permittivity at a physical
//! wavelength in metres.
//!
//! ## Available models
//!
//! | Model | Module | Materials |
//! |-------|--------|-----------|
//! | Sellmeier dispersion | [`sellmeier`] | TiO₂, ZnO, GaAs, Si₃N₄ |
//! | Drude free-electron | [`drude`] | Au, Ag, Al, Zr |
//!
//! Materials are looked up by identifier through [`catalogue::by_name`].
//! The library is consumed by setup code that populates permittivity grids;
//! the spectrum solvers never query it directly.

pub mod catalogue;
pub mod drude;
pub mod provider;
pub mod sellmeier;

pub use catalogue::{available, by_name};
pub use provider::{MaterialError, MaterialProvider};
