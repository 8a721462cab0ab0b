//! Spectrum runner: ties together configuration, materials, and solver.

use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use serde::Serialize;

use strata_core::layers::LayerBuilder;
use strata_core::types::SpectrumResult;
use strata_core::{compute_spectrum, RunConfig};
use strata_materials::{available, by_name, MaterialProvider};

/// Build a uniform layer per material and compute the spectrum.
pub fn run_spectrum(cfg: &RunConfig, layers: &[String]) -> Result<SpectrumResult> {
    if layers.len() != cfg.n_layers() {
        anyhow::bail!(
            "{} material(s) given but the configuration has N_layers = {}",
            layers.len(),
            cfg.n_layers()
        );
    }

    let materials = layers
        .iter()
        .map(|name| by_name(name).with_context(|| format!("Valid identifiers: {}", available().join(", "))))
        .collect::<Result<Vec<_>>>()?;
    for (i, m) in materials.iter().enumerate() {
        println!("  Layer {i}: {} ({} µm)", m.name(), cfg.per_layer_thickness(i));
    }

    let refs: Vec<&dyn MaterialProvider> = materials.iter().map(|m| m.as_ref()).collect();
    let grid = LayerBuilder::new(cfg)
        .stack(&refs)
        .context("Could not build the layer stack")?;

    info!("Solving {} frequencies with {}", cfg.n_freq(), cfg.solver().kind());
    let result = compute_spectrum(&grid, cfg).context("Spectrum computation failed")?;

    for (i, wl) in cfg.target_frequencies().physical_wavelengths().iter().enumerate() {
        println!(
            "  [{}/{}] λ={:.4} µm: R={:.6}, T={:.6}",
            i + 1,
            result.len(),
            wl * 1e6,
            result.reflectance[i],
            result.transmittance[i]
        );
    }
    Ok(result)
}

/// Print the target frequencies alongside their physical wavelengths.
pub fn print_frequencies(cfg: &RunConfig) {
    let spectral = cfg.spectral();
    println!(
        "{} target frequencies ({} over [{:e}, {:e}] m):",
        cfg.n_freq(),
        spectral.distribution,
        spectral.physical_wavelength_range[0],
        spectral.physical_wavelength_range[1]
    );
    let wavelengths = cfg.target_frequencies().physical_wavelengths();
    for (i, (f, wl)) in cfg.target_frequencies().iter().zip(&wavelengths).enumerate() {
        println!("  {i:>4}  f = {f:.6}  λ = {wl:.6e} m");
    }
}

/// Print the material catalogue with application windows.
pub fn print_materials() {
    println!("Available materials:");
    println!();
    for name in available() {
        // Catalogue names always resolve.
        if let Ok(m) = by_name(name) {
            let (lo, hi) = m.wavelength_range();
            println!("  {name:<18} {:.2}–{:.2} µm", lo * 1e6, hi * 1e6);
        }
    }
}

/// Write the spectrum to a CSV file with a metadata header.
pub fn write_spectrum_csv(result: &SpectrumResult, path: &Path, cfg: &RunConfig, layers: &[String]) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::File::create(path)?;

    writeln!(file, "# Strata Spectrum Solver: Reflectance/Transmittance")?;
    writeln!(file, "# Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(file, "# config: {}", cfg.name())?;
    writeln!(file, "# solver: {}", cfg.solver().kind())?;
    for (i, name) in layers.iter().enumerate() {
        writeln!(file, "# layer {i}: material={name}, thickness={} um", cfg.per_layer_thickness(i))?;
    }
    writeln!(file, "#")?;
    writeln!(file, "frequency,wavelength_m,reflectance,transmittance,absorptance")?;

    let wavelengths = cfg.target_frequencies().physical_wavelengths();
    let absorptance = result.absorptance();
    for (i, f) in cfg.target_frequencies().iter().enumerate() {
        writeln!(
            file,
            "{:.8},{:.6e},{:.8},{:.8},{:.8}",
            f, wavelengths[i], result.reflectance[i], result.transmittance[i], absorptance[i]
        )?;
    }

    println!("Spectrum written to: {}", path.display());
    Ok(())
}

#[derive(Serialize)]
struct SpectrumRecord<'a> {
    name: &'a str,
    solver: String,
    frequencies: &'a [f64],
    wavelengths_m: Vec<f64>,
    #[serde(flatten)]
    spectrum: &'a SpectrumResult,
}

/// Write the spectrum and its frequency axis to a JSON file.
pub fn write_spectrum_json(result: &SpectrumResult, path: &Path, cfg: &RunConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let record = SpectrumRecord {
        name: cfg.name(),
        solver: cfg.solver().kind().to_string(),
        frequencies: cfg.target_frequencies().as_slice(),
        wavelengths_m: cfg.target_frequencies().physical_wavelengths(),
        spectrum: result,
    };
    let json = serde_json::to_string_pretty(&record).context("JSON serialisation error")?;
    std::fs::write(path, json)?;

    println!("Spectrum (JSON) written to: {}", path.display());
    Ok(())
}
