//! Permittivity convolution matrices from 2-D FFTs of a layer slice.
//!
//! The slice $\varepsilon[i, j]$ samples one unit cell, $i$ along
//! $\mathbf{a}_1$ and $j$ along $\mathbf{a}_2$. Its Fourier coefficients are
//!
//! $$
//! \varepsilon_{m,n} = \frac{1}{N_x N_y}\sum_{i,j} \varepsilon[i,j]\,
//! e^{-2\pi i (m i / N_x + n j / N_y)}
//! $$
//!
//! and the convolution (Toeplitz) matrix is
//! $[\![\varepsilon]\!]_{pq} = \varepsilon_{m_p - m_q,\, n_p - n_q}$.
//! Differences the sampling cannot resolve are set to zero instead of aliasing.

use nalgebra::DMatrix;
use ndarray::{Array2, ArrayView2, Axis};
use num_complex::Complex64;
use rustfft::FftPlanner;

/// Normalised 2-D DFT of a real-space slice.
pub fn fft2(slice: ArrayView2<'_, Complex64>) -> Array2<Complex64> {
    let (nx, ny) = slice.dim();
    let mut data = slice.to_owned();
    let mut planner = FftPlanner::<f64>::new();

    let row_fft = planner.plan_fft_forward(ny);
    for mut row in data.axis_iter_mut(Axis(0)) {
        let mut buffer = row.to_vec();
        row_fft.process(&mut buffer);
        row.iter_mut().zip(buffer).for_each(|(dst, src)| *dst = src);
    }

    let col_fft = planner.plan_fft_forward(nx);
    for mut col in data.axis_iter_mut(Axis(1)) {
        let mut buffer = col.to_vec();
        col_fft.process(&mut buffer);
        col.iter_mut().zip(buffer).for_each(|(dst, src)| *dst = src);
    }

    let norm = (nx * ny) as f64;
    data.mapv_inplace(|c| c / norm);
    data
}

/// Index of harmonic `k` in a length-`n` DFT, if representable.
fn harmonic_index(k: i32, n: usize) -> Option<usize> {
    let n = n as i32;
    let lo = -(n - 1) / 2;
    let hi = n / 2;
    (lo..=hi).contains(&k).then(|| k.rem_euclid(n) as usize)
}

/// Convolution matrix over the retained `orders`.
pub fn convolution_matrix(slice: ArrayView2<'_, Complex64>, orders: &[(i32, i32)]) -> DMatrix<Complex64> {
    let (nx, ny) = slice.dim();
    let coeffs = fft2(slice);
    DMatrix::from_fn(orders.len(), orders.len(), |p, q| {
        let dm = orders[p].0 - orders[q].0;
        let dn = orders[p].1 - orders[q].1;
        match (harmonic_index(dm, nx), harmonic_index(dn, ny)) {
            (Some(i), Some(j)) => coeffs[[i, j]],
            _ => Complex64::new(0.0, 0.0),
        }
    })
}
