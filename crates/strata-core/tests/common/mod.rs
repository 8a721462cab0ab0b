//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use strata_core::config::{RawConfig, RunConfig};
use strata_core::layers::LayerBuilder;
use strata_core::types::PermittivityGrid;
use strata_materials::{by_name, MaterialProvider};
use toml::Value;

/// Defaults with `overrides` applied, validated.
pub fn config_with(overrides: &[(&str, Value)]) -> RunConfig {
    let mut raw = RawConfig::defaults();
    for (key, value) in overrides {
        raw.set(key, value.clone());
    }
    RunConfig::from_raw(&raw).expect("test configuration must validate")
}

/// FDTD configuration over [1, 10] µm with `n_layers` 1 µm layers.
pub fn fdtd_config(n_layers: usize, niter: i64) -> RunConfig {
    config_with(&[
        ("solver", Value::from("FDTD")),
        ("N_layers", Value::from(n_layers as i64)),
        ("PER_LAYER_THICKNESS", Value::from(vec![1.0])),
        ("FDTD_niter", Value::from(niter)),
    ])
}

/// Grid of uniform layers, one per named material.
pub fn material_stack(cfg: &RunConfig, names: &[&str]) -> PermittivityGrid {
    let materials: Vec<_> = names
        .iter()
        .map(|n| by_name(n).expect("material in catalogue"))
        .collect();
    let refs: Vec<&dyn MaterialProvider> = materials.iter().map(|m| m.as_ref()).collect();
    LayerBuilder::new(cfg)
        .stack(&refs)
        .expect("materials cover the target band")
}
