//! Schema validation: presence, types, then cross-field rules.
//!
//! Each pass collects every violation it finds. Cross-field rules only run
//! once the presence and type passes are clean, because they operate on
//! typed values.

use std::fmt;

use toml::{Table, Value};

use super::{
    ConfigError, Geometry, ModelSettings, PermittivityBounds, RawConfig, RunConfig,
    SpectralSettings, TargetSpectra, TaskType, TrainingSettings,
};
use crate::frequencies::{compute_target_frequencies, FreqDistribution};
use crate::solver::fdtd::{Excitation, FdtdParams, LateralBoundary};
use crate::solver::trcwa::lattice::MIN_LATTICE_DET;
use crate::solver::trcwa::TrcwaParams;
use crate::solver::{Solver, SolverKind};

/// A single failed rule, naming the offending key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub key: String,
    pub message: String,
}

impl Violation {
    fn new(key: &str, message: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Integer,
    Float,
    Boolean,
    Str,
    FloatList,
    Matrix2,
}

const BASE_KEYS: &[(&str, Kind)] = &[
    ("name", Kind::Str),
    ("seed", Kind::Integer),
    ("eps_oversampling", Kind::Integer),
    ("real_min_eps", Kind::Float),
    ("real_max_eps", Kind::Float),
    ("imag_min_eps", Kind::Float),
    ("imag_max_eps", Kind::Float),
    ("Nx", Kind::Integer),
    ("Ny", Kind::Integer),
    ("N_layers", Kind::Integer),
    ("PER_LAYER_THICKNESS", Kind::FloatList),
    ("physical_wavelength_range", Kind::FloatList),
    ("N_freq", Kind::Integer),
    ("model_type", Kind::Str),
    ("encoding_dim", Kind::Integer),
    ("siren_omega", Kind::Float),
    ("n_neurons", Kind::Integer),
    ("hidden_layers", Kind::Integer),
    ("learning_rate", Kind::Float),
    ("iterations", Kind::Integer),
    ("L", Kind::Float),
    ("absorption_loss", Kind::Boolean),
    ("type", Kind::Str),
    ("use_regularization_loss", Kind::Boolean),
    ("reg_loss_weight", Kind::Float),
    ("add_noise", Kind::Boolean),
    ("noise_scale", Kind::Float),
    ("target_reflectance_spectrum", Kind::FloatList),
    ("target_transmittance_spectrum", Kind::FloatList),
    ("freq_distribution", Kind::Str),
    ("use_gpu", Kind::Boolean),
    ("avoid_zero_eps", Kind::Boolean),
    ("solver", Kind::Str),
];

const TRCWA_KEYS: &[(&str, Kind)] = &[
    ("TRCWA_L_grid", Kind::Matrix2),
    ("TRCWA_NG", Kind::Integer),
    ("TRCWA_TOP_LAYER_EPS", Kind::Float),
    ("TRCWA_BOTTOM_LAYER_EPS", Kind::Float),
    ("TRCWA_theta", Kind::Float),
    ("TRCWA_phi", Kind::Float),
    ("TRCWA_s_amplitude", Kind::Float),
    ("TRCWA_p_amplitude", Kind::Float),
];

const FDTD_KEYS: &[(&str, Kind)] = &[
    ("FDTD_niter", Kind::Integer),
    ("FDTD_gridpoints_per_unit_magnitude", Kind::Integer),
    ("FDTD_pml_thickness", Kind::Float),
    ("FDTD_free_space_distance", Kind::Float),
    ("FDTD_excitation", Kind::Str),
    ("FDTD_lateral_boundary", Kind::Str),
    ("FDTD_courant_number", Kind::Float),
];

/// Validate `raw` and build the typed [`RunConfig`].
///
/// Returns [`ConfigError::Invalid`] listing every violation of the first
/// failing pass.
pub fn validate(raw: &RawConfig) -> Result<RunConfig, ConfigError> {
    let table = raw.table();

    // Pass 1: presence. Solver-specific keys are only required for the
    // selected solver.
    let selected = table
        .get("solver")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<SolverKind>().ok());
    let mut required: Vec<&(&str, Kind)> = BASE_KEYS.iter().collect();
    match selected {
        Some(SolverKind::Trcwa) => required.extend(TRCWA_KEYS),
        Some(SolverKind::Fdtd) => required.extend(FDTD_KEYS),
        None => {}
    }
    let missing: Vec<Violation> = required
        .iter()
        .filter(|(key, _)| !table.contains_key(*key))
        .map(|(key, _)| Violation::new(key, "missing required key"))
        .collect();
    if !missing.is_empty() {
        return Err(ConfigError::Invalid(missing));
    }

    // Pass 2: types, including any unselected solver keys that are present.
    let type_errors: Vec<Violation> = BASE_KEYS
        .iter()
        .chain(TRCWA_KEYS)
        .chain(FDTD_KEYS)
        .filter_map(|(key, kind)| table.get(*key).and_then(|v| check_type(key, v, *kind)))
        .collect();
    if !type_errors.is_empty() {
        return Err(ConfigError::Invalid(type_errors));
    }

    // Pass 3: cross-field rules on typed values.
    let mut rules = Rules {
        table,
        violations: Vec::new(),
    };
    let config = rules.build();
    match config {
        Some(cfg) if rules.violations.is_empty() => Ok(cfg),
        _ => Err(ConfigError::Invalid(rules.violations)),
    }
}

fn check_type(key: &str, value: &Value, kind: Kind) -> Option<Violation> {
    let is_number = |v: &Value| matches!(v, Value::Integer(_) | Value::Float(_));
    let ok = match kind {
        Kind::Integer => value.is_integer(),
        Kind::Float => is_number(value),
        Kind::Boolean => value.is_bool(),
        Kind::Str => value.is_str(),
        Kind::FloatList => value
            .as_array()
            .map_or(false, |items| items.iter().all(is_number)),
        Kind::Matrix2 => value.as_array().map_or(false, |rows| {
            rows.len() == 2
                && rows.iter().all(|row| {
                    row.as_array()
                        .map_or(false, |r| r.len() == 2 && r.iter().all(is_number))
                })
        }),
    };
    if ok {
        return None;
    }
    let expected = match kind {
        Kind::Integer => "must be an integer",
        Kind::Float => "must be a float",
        Kind::Boolean => "must be a boolean",
        Kind::Str => "must be a string",
        Kind::FloatList => "must be a list of numbers",
        Kind::Matrix2 => "must be a 2x2 matrix of numbers",
    };
    Some(Violation::new(key, expected))
}

fn as_f64(value: &Value) -> f64 {
    match value {
        Value::Integer(i) => *i as f64,
        Value::Float(f) => *f,
        _ => f64::NAN,
    }
}

/// Typed reads (infallible after the type pass) plus rule bookkeeping.
struct Rules<'a> {
    table: &'a Table,
    violations: Vec<Violation>,
}

impl Rules<'_> {
    fn fail(&mut self, key: &str, message: impl Into<String>) {
        self.violations.push(Violation::new(key, message));
    }

    fn check(&mut self, ok: bool, key: &str, message: &str) {
        if !ok {
            self.fail(key, message);
        }
    }

    fn int(&self, key: &str) -> i64 {
        self.table.get(key).and_then(Value::as_integer).unwrap_or(0)
    }

    fn float(&self, key: &str) -> f64 {
        self.table.get(key).map_or(f64::NAN, as_f64)
    }

    fn boolean(&self, key: &str) -> bool {
        self.table.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    fn string(&self, key: &str) -> &str {
        self.table.get(key).and_then(Value::as_str).unwrap_or("")
    }

    fn float_list(&self, key: &str) -> Vec<f64> {
        self.table
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().map(as_f64).collect())
            .unwrap_or_default()
    }

    fn matrix2(&self, key: &str) -> [[f64; 2]; 2] {
        let mut out = [[f64::NAN; 2]; 2];
        if let Some(rows) = self.table.get(key).and_then(Value::as_array) {
            for (i, row) in rows.iter().take(2).enumerate() {
                if let Some(cols) = row.as_array() {
                    for (j, v) in cols.iter().take(2).enumerate() {
                        out[i][j] = as_f64(v);
                    }
                }
            }
        }
        out
    }

    /// Integer that must be strictly positive.
    fn positive_count(&mut self, key: &str) -> usize {
        let v = self.int(key);
        if v <= 0 {
            self.fail(key, "must be a positive integer");
            return 0;
        }
        v as usize
    }

    /// Integer that must not be negative.
    fn count(&mut self, key: &str) -> usize {
        let v = self.int(key);
        if v < 0 {
            self.fail(key, "must not be negative");
            return 0;
        }
        v as usize
    }

    fn positive_float(&mut self, key: &str) -> f64 {
        let v = self.float(key);
        if !(v > 0.0) {
            self.fail(key, "must be a positive number");
        }
        v
    }

    fn build(&mut self) -> Option<RunConfig> {
        let geometry = self.geometry();
        let bounds = self.bounds();
        let spectral = self.spectral();
        let model = self.model();
        let training = self.training();
        let targets = self.targets(spectral.n_freq);
        self.lattice_grid();
        let solver = self.solver();

        if self.violations.is_empty() {
            let range = spectral.physical_wavelength_range;
            match compute_target_frequencies(range[0], range[1], spectral.n_freq, spectral.distribution) {
                Ok(target_frequencies) => {
                    return solver.map(|solver| RunConfig {
                        name: self.string("name").to_string(),
                        seed: self.int("seed"),
                        geometry,
                        bounds,
                        spectral,
                        model,
                        training,
                        targets,
                        solver,
                        target_frequencies,
                    });
                }
                Err(e) => self.fail("physical_wavelength_range", e.to_string()),
            }
        }
        None
    }

    fn geometry(&mut self) -> Geometry {
        let nx = self.positive_count("Nx");
        let ny = self.positive_count("Ny");
        let eps_oversampling = self.positive_count("eps_oversampling");
        let n_layers = self.positive_count("N_layers");
        if eps_oversampling > 0 {
            self.check(nx % eps_oversampling == 0, "Nx", "must be a multiple of eps_oversampling");
            self.check(ny % eps_oversampling == 0, "Ny", "must be a multiple of eps_oversampling");
        }

        let per_layer_thickness = self.float_list("PER_LAYER_THICKNESS");
        self.check(
            per_layer_thickness.len() == 1 || per_layer_thickness.len() == n_layers,
            "PER_LAYER_THICKNESS",
            "must have length 1 or N_layers",
        );
        self.check(
            per_layer_thickness.iter().all(|&t| t > 0.0),
            "PER_LAYER_THICKNESS",
            "thickness must be a positive number",
        );

        Geometry {
            nx,
            ny,
            eps_oversampling,
            n_layers,
            per_layer_thickness,
        }
    }

    fn bounds(&mut self) -> PermittivityBounds {
        let bounds = PermittivityBounds {
            real_min: self.float("real_min_eps"),
            real_max: self.float("real_max_eps"),
            imag_min: self.float("imag_min_eps"),
            imag_max: self.float("imag_max_eps"),
            avoid_zero_eps: self.boolean("avoid_zero_eps"),
        };
        self.check(
            bounds.real_min <= bounds.real_max,
            "real_min_eps",
            "real_min_eps must be less than or equal to real_max_eps",
        );
        self.check(
            bounds.imag_min <= bounds.imag_max,
            "imag_min_eps",
            "imag_min_eps must be less than or equal to imag_max_eps",
        );
        bounds
    }

    fn spectral(&mut self) -> SpectralSettings {
        let range = self.float_list("physical_wavelength_range");
        let mut physical_wavelength_range = [f64::NAN; 2];
        if range.len() == 2 {
            physical_wavelength_range = [range[0], range[1]];
            self.check(
                range[0] > 0.0 && range[0] < range[1],
                "physical_wavelength_range",
                "must be positive and ordered from low to high",
            );
        } else {
            self.fail("physical_wavelength_range", "must have exactly two entries");
        }

        let n_freq = self.positive_count("N_freq");
        let distribution = match self.string("freq_distribution").parse::<FreqDistribution>() {
            Ok(d) => d,
            Err(_) => {
                self.fail("freq_distribution", "must be either 'linear' or 'log'");
                FreqDistribution::Linear
            }
        };

        SpectralSettings {
            physical_wavelength_range,
            n_freq,
            distribution,
        }
    }

    fn model(&mut self) -> ModelSettings {
        ModelSettings {
            model_type: self.string("model_type").to_string(),
            encoding_dim: self.count("encoding_dim"),
            siren_omega: self.float("siren_omega"),
            n_neurons: self.positive_count("n_neurons"),
            hidden_layers: self.count("hidden_layers"),
        }
    }

    fn training(&mut self) -> TrainingSettings {
        let task = match self.string("type").parse::<TaskType>() {
            Ok(t) => t,
            Err(_) => {
                self.fail("type", "must be either 'classification' or 'regression'");
                TaskType::Regression
            }
        };
        TrainingSettings {
            task,
            learning_rate: self.positive_float("learning_rate"),
            iterations: self.positive_count("iterations"),
            l: self.positive_float("L"),
            absorption_loss: self.boolean("absorption_loss"),
            use_regularization_loss: self.boolean("use_regularization_loss"),
            reg_loss_weight: self.positive_float("reg_loss_weight"),
            add_noise: self.boolean("add_noise"),
            noise_scale: self.positive_float("noise_scale"),
            use_gpu: self.boolean("use_gpu"),
        }
    }

    fn targets(&mut self, n_freq: usize) -> TargetSpectra {
        let reflectance = self.float_list("target_reflectance_spectrum");
        let transmittance = self.float_list("target_transmittance_spectrum");
        for (key, spectrum) in [
            ("target_reflectance_spectrum", &reflectance),
            ("target_transmittance_spectrum", &transmittance),
        ] {
            self.check(spectrum.len() == n_freq, key, "must have length N_freq");
            self.check(spectrum.iter().all(|&v| v >= 0.0), key, "must not contain negative values");
        }
        TargetSpectra {
            reflectance,
            transmittance,
        }
    }

    fn solver(&mut self) -> Option<Solver> {
        match self.string("solver").parse::<SolverKind>() {
            Ok(SolverKind::Trcwa) => Some(Solver::Trcwa(self.trcwa())),
            Ok(SolverKind::Fdtd) => Some(Solver::Fdtd(self.fdtd())),
            Err(e) => {
                self.fail("solver", e.to_string());
                None
            }
        }
    }

    /// Ordering rules on `TRCWA_L_grid`, applied whenever the key is set
    /// regardless of the selected solver.
    fn lattice_grid(&mut self) {
        if !self.table.contains_key("TRCWA_L_grid") {
            return;
        }
        let lattice = self.matrix2("TRCWA_L_grid");
        self.check(
            lattice[0][0] > lattice[0][1],
            "TRCWA_L_grid",
            "TRCWA_L_grid dim0 must be ordered from high to low",
        );
        self.check(
            lattice[1][0] < lattice[1][1],
            "TRCWA_L_grid",
            "TRCWA_L_grid dim1 must be ordered from low to high",
        );
        self.check(
            lattice.iter().flatten().all(|&v| v >= 0.0),
            "TRCWA_L_grid",
            "TRCWA_L_grid entries must not be negative",
        );
    }

    fn trcwa(&mut self) -> TrcwaParams {
        let lattice = self.matrix2("TRCWA_L_grid");
        let det = lattice[0][0] * lattice[1][1] - lattice[0][1] * lattice[1][0];
        self.check(
            det.abs() >= MIN_LATTICE_DET,
            "TRCWA_L_grid",
            "lattice vectors must not be collinear",
        );

        let theta = self.float("TRCWA_theta");
        self.check(
            (0.0..std::f64::consts::FRAC_PI_2).contains(&theta),
            "TRCWA_theta",
            "incidence angle must lie in [0, π/2) radians",
        );
        let s_amplitude = self.float("TRCWA_s_amplitude");
        let p_amplitude = self.float("TRCWA_p_amplitude");
        self.check(
            s_amplitude * s_amplitude + p_amplitude * p_amplitude > 0.0,
            "TRCWA_s_amplitude",
            "s and p amplitudes must not both be zero",
        );

        TrcwaParams {
            lattice,
            ng: self.positive_count("TRCWA_NG"),
            top_eps: self.positive_float("TRCWA_TOP_LAYER_EPS"),
            bottom_eps: self.positive_float("TRCWA_BOTTOM_LAYER_EPS"),
            theta,
            phi: self.float("TRCWA_phi"),
            s_amplitude,
            p_amplitude,
        }
    }

    fn fdtd(&mut self) -> FdtdParams {
        let courant = self.float("FDTD_courant_number");
        self.check(
            courant > 0.0 && courant <= 1.0 / 3f64.sqrt(),
            "FDTD_courant_number",
            "must lie in (0, 1/√3] for a stable 3-D update",
        );
        let excitation = match self.string("FDTD_excitation").parse::<Excitation>() {
            Ok(e) => e,
            Err(_) => {
                self.fail("FDTD_excitation", "must be either 'pulse' or 'continuous'");
                Excitation::Pulse
            }
        };
        let lateral_boundary = match self.string("FDTD_lateral_boundary").parse::<LateralBoundary>() {
            Ok(b) => b,
            Err(_) => {
                self.fail("FDTD_lateral_boundary", "must be either 'periodic' or 'pml'");
                LateralBoundary::Periodic
            }
        };

        FdtdParams {
            niter: self.positive_count("FDTD_niter"),
            gridpoints_per_unit: self.positive_count("FDTD_gridpoints_per_unit_magnitude"),
            pml_thickness: self.positive_float("FDTD_pml_thickness"),
            free_space_distance: self.positive_float("FDTD_free_space_distance"),
            excitation,
            lateral_boundary,
            courant,
        }
    }
}
