//! Integration test: loading run configurations from TOML files.

use std::path::PathBuf;

use strata_core::config::{ConfigError, RawConfig, RunConfig};
use strata_core::frequencies::FreqDistribution;
use strata_core::solver::{Solver, SolverKind};
use strata_core::load_config;

/// Write `content` to a uniquely named file in the system temp directory.
fn write_temp(name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("strata-{}-{name}.toml", std::process::id()));
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_file_overrides_are_layered_over_defaults() {
    let path = write_temp(
        "override",
        r#"
name = "tio2_slab"
solver = "FDTD"
N_freq = 3
freq_distribution = "log"
target_reflectance_spectrum = [0.1, 0.2, 0.3]
target_transmittance_spectrum = [0.9, 0.8, 0.7]
FDTD_niter = 2000
"#,
    );
    let cfg = load_config(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(cfg.name(), "tio2_slab");
    assert_eq!(cfg.n_freq(), 3);
    assert_eq!(cfg.spectral().distribution, FreqDistribution::Log);
    assert_eq!(cfg.solver().kind(), SolverKind::Fdtd);
    let Solver::Fdtd(params) = cfg.solver() else {
        panic!("expected FDTD settings");
    };
    assert_eq!(params.niter, 2000);
    // Untouched keys keep their defaults.
    assert_eq!(cfg.nx(), 1);
    assert_eq!(cfg.target_frequencies().len(), 3);
}

#[test]
fn test_every_violation_in_a_file_is_reported() {
    let path = write_temp(
        "invalid",
        r#"
Nx = 0
N_freq = 4
solver = "TRCWA"
TRCWA_NG = -3
"#,
    );
    let err = load_config(&path).unwrap_err();
    std::fs::remove_file(&path).ok();

    let keys: Vec<&str> = err.violations().iter().map(|v| v.key.as_str()).collect();
    eprintln!("{err}");
    assert!(keys.contains(&"Nx"));
    assert!(keys.contains(&"TRCWA_NG"));
    assert!(keys.contains(&"target_reflectance_spectrum"));
    assert!(keys.contains(&"target_transmittance_spectrum"));
}

#[test]
fn test_missing_file_is_an_io_error() {
    let path = std::env::temp_dir().join("strata-does-not-exist.toml");
    assert!(matches!(load_config(&path), Err(ConfigError::Io { .. })));
}

#[test]
fn test_malformed_toml_is_a_parse_error() {
    let err = RawConfig::layered_over_defaults("Nx = [1,").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
    assert!(err.violations().is_empty());
}

#[test]
fn test_document_without_defaults_is_incomplete() {
    let raw = RawConfig::from_toml_str("Nx = 4\nNy = 4\n").unwrap();
    let err = RunConfig::from_raw(&raw).unwrap_err();
    assert!(err.violations().len() > 10);
    assert!(err.violations().iter().all(|v| v.message == "missing required key"));
}
