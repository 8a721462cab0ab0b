//! The simulation volume: an owned aggregate of grid, objects, source,
//! detectors and boundaries, built for one run and then dropped.
//!
//! Layout along the propagation axis (µm, rounded to cells):
//!
//! | Region | Extent |
//! |--------|--------|
//! | absorbing layer | `depth = max(pml, λ_max)` |
//! | source | at `depth + free/2` |
//! | reflection detector | at `depth + free` |
//! | layer stack | from `depth + 2·free` |
//! | transmission detector | `free` past the last layer |
//! | absorbing layer | after a further `free` |
//!
//! The graded absorber reflects noticeably once it is much thinner than the
//! wavelength, so along the propagation axis it spans at least the longest
//! target wavelength. Lateral padding keeps the configured `pml` thickness.

use std::ops::Range;

use log::trace;
use ndarray::Array2;

use super::waveform::Waveform;
use super::yee::{Side, YeeGrid};
use super::{FdtdParams, LateralBoundary};
use crate::constants::{SPEED_OF_LIGHT, UNIT_MAGNITUDE};
use crate::solver::SolverError;

/// Cell positions along the propagation axis plus lateral extent.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    /// Cell size in metres.
    pub dx: f64,
    /// Cells along the propagation axis.
    pub length: usize,
    /// Lateral cells `(y, z)` including any absorbing padding.
    pub lateral: (usize, usize),
    /// Lateral window holding the structure.
    pub window: (Range<usize>, Range<usize>),
    /// Absorber depth at both ends of the propagation axis.
    pub absorber_cells: usize,
    /// Absorber depth on each lateral side (zero when periodic).
    pub lateral_absorber_cells: usize,
    pub source_x: usize,
    pub reflection_x: usize,
    pub transmission_x: usize,
    pub layer_spans: Vec<Range<usize>>,
}

/// Largest number of cells along any one axis.
const MAX_AXIS_CELLS: f64 = 1e7;

/// Largest number of cells in the whole volume.
const MAX_TOTAL_CELLS: usize = 1 << 28;

impl Layout {
    /// Place a stack of `thicknesses` (µm) over a `columns = (Nx, Ny)` lateral
    /// grid, with the axial absorber sized for `longest_wavelength` (µm).
    pub fn new(
        params: &FdtdParams,
        thicknesses: &[f64],
        columns: (usize, usize),
        longest_wavelength: f64,
    ) -> Result<Self, SolverError> {
        let per_unit = params.gridpoints_per_unit as f64;
        let cell = |um: f64| -> Result<usize, SolverError> {
            let cells = (um * per_unit).round();
            if cells.is_finite() && (0.0..=MAX_AXIS_CELLS).contains(&cells) {
                Ok(cells as usize)
            } else {
                Err(SolverError::GeometryInvariant(format!(
                    "{um} µm at {per_unit} cells/µm is not a representable cell count"
                )))
            }
        };
        let pml = params.pml_thickness;
        let free = params.free_space_distance;
        if !(pml.is_finite() && longest_wavelength.is_finite()) {
            return Err(SolverError::GeometryInvariant(format!(
                "absorber depth from pml {pml} µm and wavelength {longest_wavelength} µm is not finite"
            )));
        }
        let depth = pml.max(longest_wavelength);

        let mut cursor = depth + 2.0 * free;
        let mut layer_spans = Vec::with_capacity(thicknesses.len());
        for t in thicknesses {
            layer_spans.push(cell(cursor)?..cell(cursor + t)?);
            cursor += t;
        }
        let transmission_um = cursor + free;

        let lateral_absorber_cells = match params.lateral_boundary {
            LateralBoundary::Periodic => 0,
            LateralBoundary::Pml => cell(pml)?,
        };
        let pad = lateral_absorber_cells;
        let layout = Self {
            dx: UNIT_MAGNITUDE / per_unit,
            length: cell(transmission_um + free + depth)?,
            lateral: (columns.0 + 2 * pad, columns.1 + 2 * pad),
            window: (pad..pad + columns.0, pad..pad + columns.1),
            absorber_cells: cell(depth)?,
            lateral_absorber_cells,
            source_x: cell(depth + 0.5 * free)?,
            reflection_x: cell(depth + free)?,
            transmission_x: cell(transmission_um)?,
            layer_spans,
        };

        let total = layout
            .length
            .checked_mul(layout.lateral.0)
            .and_then(|n| n.checked_mul(layout.lateral.1));
        match total {
            Some(n) if n <= MAX_TOTAL_CELLS => Ok(layout),
            _ => Err(SolverError::GeometryInvariant(format!(
                "volume of {} x {} x {} cells is too large",
                layout.length, layout.lateral.0, layout.lateral.1
            ))),
        }
    }
}

/// One layer of the stack as a rectangular slab.
#[derive(Debug, Clone, PartialEq)]
pub struct SlabObject {
    pub layer: usize,
    /// Cells along the propagation axis.
    pub x: Range<usize>,
    /// Relative permittivity per lateral column.
    pub permittivity: Array2<f64>,
    /// Conductivity (S/m) per lateral column.
    pub conductivity: Array2<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorSide {
    Reflection,
    Transmission,
}

/// Records the lateral mean of Ez at one plane, once per step.
#[derive(Debug, Clone, PartialEq)]
pub struct Detector {
    pub side: DetectorSide,
    pub x: usize,
    trace: Vec<f64>,
}

impl Detector {
    fn new(side: DetectorSide, x: usize) -> Self {
        Self {
            side,
            x,
            trace: Vec::new(),
        }
    }

    pub fn trace(&self) -> &[f64] {
        &self.trace
    }
}

/// Soft plane source on Ez.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneSource {
    pub x: usize,
    pub waveform: Waveform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridAxis {
    X,
    Y,
    Z,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Boundary {
    Absorbing { axis: GridAxis, side: Side, cells: usize },
    Periodic { axis: GridAxis },
}

#[derive(Debug, Clone)]
pub struct SimulationVolume {
    layout: Layout,
    grid: YeeGrid,
    objects: Vec<SlabObject>,
    sources: Vec<PlaneSource>,
    detectors: Vec<Detector>,
    boundaries: Vec<Boundary>,
}

impl SimulationVolume {
    /// Assemble the volume. `objects` may be empty for a reference run.
    pub fn build(
        params: &FdtdParams,
        layout: Layout,
        objects: Vec<SlabObject>,
        waveform: Waveform,
    ) -> Self {
        let dt = params.courant * layout.dx / SPEED_OF_LIGHT;
        let periodic = params.lateral_boundary == LateralBoundary::Periodic;
        let mut grid = YeeGrid::new(
            (layout.length, layout.lateral.0, layout.lateral.1),
            layout.dx,
            dt,
            periodic,
        );

        let mut boundaries = vec![
            Boundary::Absorbing { axis: GridAxis::X, side: Side::Low, cells: layout.absorber_cells },
            Boundary::Absorbing { axis: GridAxis::X, side: Side::High, cells: layout.absorber_cells },
        ];
        if periodic {
            boundaries.push(Boundary::Periodic { axis: GridAxis::Y });
            boundaries.push(Boundary::Periodic { axis: GridAxis::Z });
        } else {
            for axis in [GridAxis::Y, GridAxis::Z] {
                for side in [Side::Low, Side::High] {
                    boundaries.push(Boundary::Absorbing {
                        axis,
                        side,
                        cells: layout.lateral_absorber_cells,
                    });
                }
            }
        }
        for boundary in &boundaries {
            if let Boundary::Absorbing { axis, side, cells } = *boundary {
                let index = match axis {
                    GridAxis::X => 0,
                    GridAxis::Y => 1,
                    GridAxis::Z => 2,
                };
                grid.add_absorber(index, side, cells);
            }
        }

        let (wy, wz) = layout.window.clone();
        for object in &objects {
            grid.set_material(
                object.x.clone(),
                wy.clone(),
                wz.clone(),
                object.permittivity.view(),
                object.conductivity.view(),
            );
        }

        let detectors = vec![
            Detector::new(DetectorSide::Reflection, layout.reflection_x),
            Detector::new(DetectorSide::Transmission, layout.transmission_x),
        ];
        let sources = vec![PlaneSource {
            x: layout.source_x,
            waveform,
        }];

        Self {
            layout,
            grid,
            objects,
            sources,
            detectors,
            boundaries,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn objects(&self) -> &[SlabObject] {
        &self.objects
    }

    pub fn sources(&self) -> &[PlaneSource] {
        &self.sources
    }

    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }

    pub fn boundaries(&self) -> &[Boundary] {
        &self.boundaries
    }

    pub fn dt(&self) -> f64 {
        self.grid.dt()
    }

    pub fn detector(&self, side: DetectorSide) -> Option<&Detector> {
        self.detectors.iter().find(|d| d.side == side)
    }

    /// Placement rules that must hold before stepping.
    pub fn check_invariants(&self) -> Result<(), SolverError> {
        let fail = |msg: String| Err(SolverError::GeometryInvariant(msg));
        let l = &self.layout;

        if l.absorber_cells == 0 {
            return fail("absorbing layer is thinner than one cell".into());
        }
        if self.sources.len() != 1 || self.detectors.len() != 2 || self.boundaries.len() < 2 {
            return fail(format!(
                "expected 1 source, 2 detectors and at least 2 boundaries, found {}, {}, {}",
                self.sources.len(),
                self.detectors.len(),
                self.boundaries.len()
            ));
        }
        if let Some(object) = self.objects.iter().find(|o| o.x.is_empty()) {
            return fail(format!("layer {} is thinner than one cell", object.layer));
        }

        let inner = l.absorber_cells..l.length.saturating_sub(l.absorber_cells);
        let source_x = self.sources[0].x;
        for (what, x) in [
            ("source", source_x),
            ("reflection detector", l.reflection_x),
            ("transmission detector", l.transmission_x),
        ] {
            if !inner.contains(&x) {
                return fail(format!("{what} at cell {x} lies inside the absorbing frame"));
            }
        }
        if let (Some(first), Some(last)) = (self.objects.first(), self.objects.last()) {
            if l.reflection_x > first.x.start {
                return fail(format!(
                    "reflection detector at cell {} is past the first object start {}",
                    l.reflection_x, first.x.start
                ));
            }
            if l.transmission_x < last.x.end {
                return fail(format!(
                    "transmission detector at cell {} is before the last object end {}",
                    l.transmission_x, last.x.end
                ));
            }
            if source_x >= first.x.start {
                return fail(format!("source at cell {source_x} lies inside the layer stack"));
            }
            if last.x.end > inner.end {
                return fail("layer stack reaches into the absorbing frame".into());
            }
        }
        Ok(())
    }

    /// Step the fields `niter` times, recording both detectors.
    pub fn run(&mut self, niter: usize) -> Result<(), SolverError> {
        let dt = self.grid.dt();
        let (wy, wz) = self.layout.window.clone();
        for detector in &mut self.detectors {
            detector.trace = Vec::with_capacity(niter);
        }

        for n in 0..niter {
            self.grid.update_h();
            self.grid.update_e();
            let t = n as f64 * dt;
            for source in &self.sources {
                self.grid.inject_ez(source.x, source.waveform.value(t));
            }
            for detector in &mut self.detectors {
                detector
                    .trace
                    .push(self.grid.mean_ez(detector.x, wy.clone(), wz.clone()));
            }
        }
        trace!(
            "FDTD run: {niter} steps on {:?} cells, final energy {:.3e}",
            self.grid.shape(),
            self.grid.energy()
        );

        if !self.grid.fields_finite() {
            return Err(SolverError::Numerical {
                index: 0,
                reason: format!("fields diverged within {niter} steps"),
            });
        }
        Ok(())
    }

    /// Largest local Courant number, for the stability check.
    pub fn max_local_courant(&self) -> f64 {
        self.grid.max_local_courant()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::fdtd::Excitation;

    fn params() -> FdtdParams {
        FdtdParams {
            niter: 100,
            gridpoints_per_unit: 20,
            pml_thickness: 1.0,
            free_space_distance: 1.0,
            excitation: Excitation::Pulse,
            lateral_boundary: LateralBoundary::Periodic,
            courant: 0.5,
        }
    }

    fn slab(layer: usize, x: Range<usize>, eps: f64) -> SlabObject {
        SlabObject {
            layer,
            x,
            permittivity: Array2::from_elem((1, 1), eps),
            conductivity: Array2::zeros((1, 1)),
        }
    }

    #[test]
    fn test_layout_positions() {
        let layout = Layout::new(&params(), &[0.5, 1.0], (1, 1), 0.5).unwrap();
        assert_eq!(layout.absorber_cells, 20);
        assert_eq!(layout.source_x, 30);
        assert_eq!(layout.reflection_x, 40);
        assert_eq!(layout.layer_spans, vec![60..70, 70..90]);
        assert_eq!(layout.transmission_x, 110);
        assert_eq!(layout.length, 150);
        assert_eq!(layout.window, (0..1, 0..1));
    }

    #[test]
    fn test_axial_absorber_spans_longest_wavelength() {
        let mut p = params();
        p.lateral_boundary = LateralBoundary::Pml;
        let layout = Layout::new(&p, &[1.0], (1, 1), 10.0).unwrap();
        assert_eq!(layout.absorber_cells, 200);
        assert_eq!(layout.lateral_absorber_cells, 20);
        assert_eq!(layout.reflection_x, 220);
        assert_eq!(layout.length, 200 + 40 + 20 + 40 + 200);

        let volume = SimulationVolume::build(&p, layout, Vec::new(), Waveform::continuous(1e14));
        assert!(volume.check_invariants().is_ok());
    }

    #[test]
    fn test_unrepresentable_extent_is_rejected() {
        let p = params();
        assert!(matches!(
            Layout::new(&p, &[f64::INFINITY], (1, 1), 0.5),
            Err(SolverError::GeometryInvariant(_))
        ));
        assert!(matches!(
            Layout::new(&p, &[1e12], (1, 1), 0.5),
            Err(SolverError::GeometryInvariant(_))
        ));
        assert!(matches!(
            Layout::new(&p, &[1.0], (1, 1), f64::NAN),
            Err(SolverError::GeometryInvariant(_))
        ));
        // Each axis fits, the volume does not.
        assert!(Layout::new(&p, &[1.0], (100_000, 100_000), 0.5).is_err());
    }

    #[test]
    fn test_lateral_absorber_pads_the_window() {
        let mut p = params();
        p.lateral_boundary = LateralBoundary::Pml;
        let layout = Layout::new(&p, &[1.0], (3, 2), 0.5).unwrap();
        assert_eq!(layout.lateral, (43, 42));
        assert_eq!(layout.window, (20..23, 20..22));

        let volume = SimulationVolume::build(&p, layout, Vec::new(), Waveform::continuous(1e14));
        assert_eq!(volume.boundaries().len(), 6);
        assert!(volume.check_invariants().is_ok());
    }

    #[test]
    fn test_valid_volume_passes_invariants() {
        let p = params();
        let layout = Layout::new(&p, &[1.0], (1, 1), 0.5).unwrap();
        let objects = vec![slab(0, layout.layer_spans[0].clone(), 4.0)];
        let volume = SimulationVolume::build(&p, layout, objects, Waveform::continuous(1e14));
        assert!(volume.check_invariants().is_ok());
        assert_eq!(volume.sources().len(), 1);
        assert_eq!(volume.detectors().len(), 2);
        assert_eq!(volume.boundaries().len(), 4);
    }

    #[test]
    fn test_sub_cell_layer_is_rejected() {
        let p = params();
        let layout = Layout::new(&p, &[0.01], (1, 1), 0.5).unwrap();
        let objects = vec![slab(0, layout.layer_spans[0].clone(), 4.0)];
        let volume = SimulationVolume::build(&p, layout, objects, Waveform::continuous(1e14));
        assert!(matches!(
            volume.check_invariants(),
            Err(SolverError::GeometryInvariant(msg)) if msg.contains("thinner than one cell")
        ));
    }

    #[test]
    fn test_detector_inside_stack_is_rejected() {
        let p = params();
        let mut layout = Layout::new(&p, &[1.0], (1, 1), 0.5).unwrap();
        layout.reflection_x = layout.layer_spans[0].start + 1;
        let objects = vec![slab(0, layout.layer_spans[0].clone(), 4.0)];
        let volume = SimulationVolume::build(&p, layout, objects, Waveform::continuous(1e14));
        assert!(matches!(volume.check_invariants(), Err(SolverError::GeometryInvariant(_))));
    }

    #[test]
    fn test_zero_width_absorber_is_rejected() {
        let mut p = params();
        p.pml_thickness = 0.01;
        let layout = Layout::new(&p, &[1.0], (1, 1), 0.0).unwrap();
        let volume = SimulationVolume::build(&p, layout, Vec::new(), Waveform::continuous(1e14));
        assert!(volume.check_invariants().is_err());
    }
}
