//! Real- and reciprocal-space lattice plus Fourier-order truncation.
//!
//! For a lattice with row vectors $\mathbf{a}_1, \mathbf{a}_2$ the reciprocal
//! vectors satisfy $\mathbf{a}_i \cdot \mathbf{b}_j = 2\pi\delta_{ij}$:
//!
//! $$
//! \mathbf{b}_1 = \frac{2\pi}{\det A}(a_{2y}, -a_{2x}), \qquad
//! \mathbf{b}_2 = \frac{2\pi}{\det A}(-a_{1y}, a_{1x})
//! $$

use std::f64::consts::PI;

/// Relative tolerance when grouping orders into |G| shells.
const SHELL_TOLERANCE: f64 = 1e-9;

/// Smallest |det A| (µm²) of a usable lattice. Anything below is collinear.
pub const MIN_LATTICE_DET: f64 = f64::EPSILON;

/// A 2-D Bravais lattice (lengths in µm).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lattice {
    pub a1: [f64; 2],
    pub a2: [f64; 2],
    pub b1: [f64; 2],
    pub b2: [f64; 2],
}

impl Lattice {
    /// Build from the rows of a 2×2 lattice matrix. `None` if
    /// |det A| < [`MIN_LATTICE_DET`].
    pub fn from_rows(rows: [[f64; 2]; 2]) -> Option<Self> {
        let [a1, a2] = rows;
        let det = a1[0] * a2[1] - a1[1] * a2[0];
        if !(det.abs() >= MIN_LATTICE_DET) {
            return None;
        }
        let s = 2.0 * PI / det;
        Some(Self {
            a1,
            a2,
            b1: [s * a2[1], -s * a2[0]],
            b2: [-s * a1[1], s * a1[0]],
        })
    }

    /// Reciprocal vector $m\mathbf{b}_1 + n\mathbf{b}_2$.
    pub fn g_vector(&self, (m, n): (i32, i32)) -> [f64; 2] {
        let (m, n) = (m as f64, n as f64);
        [
            m * self.b1[0] + n * self.b2[0],
            m * self.b1[1] + n * self.b2[1],
        ]
    }

    /// Fourier orders retained under circular truncation.
    ///
    /// Orders are sorted by $|\mathbf{G}|$ and whole shells of equal length are
    /// added while the total stays at or below `max_orders`. The zeroth order
    /// is always first.
    pub fn truncated_orders(&self, max_orders: usize) -> Vec<(i32, i32)> {
        let reach = max_orders.max(1) as i32;
        let mut candidates: Vec<((i32, i32), f64)> = (-reach..=reach)
            .flat_map(|m| (-reach..=reach).map(move |n| (m, n)))
            .map(|mn| {
                let g = self.g_vector(mn);
                (mn, g[0].hypot(g[1]))
            })
            .collect();
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        let mut orders = Vec::with_capacity(max_orders.max(1));
        let mut start = 0;
        while start < candidates.len() {
            let radius = candidates[start].1;
            let end = candidates[start..]
                .iter()
                .position(|(_, r)| (r - radius).abs() > SHELL_TOLERANCE * radius.max(1.0))
                .map_or(candidates.len(), |offset| start + offset);
            if !orders.is_empty() && orders.len() + (end - start) > max_orders {
                break;
            }
            orders.extend(candidates[start..end].iter().map(|(mn, _)| *mn));
            start = end;
        }
        orders
    }
}
