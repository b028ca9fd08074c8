use serde::{Deserialize, Serialize};
use simple_error::SimpleError;

use crate::types::HashMap;

pub const ELECTRICAL_TICK: usize = 8;
pub const BIOCHEMICAL_TICK: usize = 18;
pub const ELECTRICAL_DT: f64 = 1e-4;
pub const BIOCHEMICAL_DT: f64 = 1.0;

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct SimulationParams {
    pub clock: ClockParams,
    pub recorders: Vec<RecorderSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockParams {
    pub tick_dts: Vec<TickDt>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TickDt {
    pub tick: usize,
    pub dt: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderSpec {
    pub path: String,
    pub kind: RecorderKind,
    pub tick: Option<usize>,
    pub params: RecorderParams,
}

/// The two recorder variants behave identically and only differ in the tick
/// group they are scheduled on by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RecorderKind {
    #[default]
    Electrical,
    Biochemical,
}

impl RecorderKind {
    pub fn default_tick(&self) -> usize {
        match self {
            RecorderKind::Electrical => ELECTRICAL_TICK,
            RecorderKind::Biochemical => BIOCHEMICAL_TICK,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderParams {
    pub threshold: f64,
    pub use_streamer: bool,
    pub use_spike_mode: bool,
    pub datafile: Option<String>,
    pub format: String,
    pub column_name: Option<String>,
    pub flush_period: f64,
    pub flush_size: usize,
    pub retain_on_failure: bool,
}

/// Dynamically typed value for by-name field access.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Float(f64),
    Bool(bool),
    Text(String),
}

impl ParamValue {
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl Default for ClockParams {
    fn default() -> Self {
        Self {
            tick_dts: vec![
                TickDt {
                    tick: ELECTRICAL_TICK,
                    dt: ELECTRICAL_DT,
                },
                TickDt {
                    tick: BIOCHEMICAL_TICK,
                    dt: BIOCHEMICAL_DT,
                },
            ],
        }
    }
}

impl Default for RecorderParams {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            use_streamer: false,
            use_spike_mode: false,
            datafile: None,
            format: "csv".to_owned(),
            column_name: None,
            flush_period: 5.0,
            flush_size: 10_000,
            retain_on_failure: false,
        }
    }
}

impl RecorderSpec {
    pub fn new(path: &str, kind: RecorderKind) -> Self {
        Self {
            path: path.to_owned(),
            kind,
            tick: None,
            params: RecorderParams::default(),
        }
    }

    pub fn effective_tick(&self) -> usize {
        self.tick.unwrap_or_else(|| self.kind.default_tick())
    }
}

pub fn validate_simulation_params(params: &SimulationParams) -> Result<(), SimpleError> {
    let mut tick_dts = HashMap::default();

    for tick_dt in &params.clock.tick_dts {
        if !(tick_dt.dt > 0.0) || !tick_dt.dt.is_finite() {
            return Err(SimpleError::new(format!(
                "dt of tick {} must be strictly positive",
                tick_dt.tick
            )));
        }

        if tick_dts.insert(tick_dt.tick, tick_dt.dt).is_some() {
            return Err(SimpleError::new(format!(
                "duplicate dt for tick {}",
                tick_dt.tick
            )));
        }
    }

    let mut seen_paths = HashMap::default();

    for (index, spec) in params.recorders.iter().enumerate() {
        if spec.path.is_empty() {
            return Err(SimpleError::new(format!(
                "recorder {} has an empty path",
                index
            )));
        }

        if let Some(previous) = seen_paths.insert(spec.path.as_str(), index) {
            return Err(SimpleError::new(format!(
                "recorders {} and {} share the path {}",
                previous, index, spec.path
            )));
        }

        let tick = spec.effective_tick();
        if !tick_dts.contains_key(&tick) {
            return Err(SimpleError::new(format!(
                "recorder {} is scheduled on tick {} which has no dt",
                spec.path, tick
            )));
        }

        validate_recorder_params(&spec.params)?;
    }

    Ok(())
}

pub fn validate_recorder_params(params: &RecorderParams) -> Result<(), SimpleError> {
    if !params.threshold.is_finite() {
        return Err(SimpleError::new("threshold must be finite"));
    }

    if !(params.flush_period > 0.0) || !params.flush_period.is_finite() {
        return Err(SimpleError::new("flush_period must be strictly positive"));
    }

    if params.flush_size == 0 {
        return Err(SimpleError::new("flush_size must be strictly positive"));
    }

    if let Some(datafile) = &params.datafile {
        if datafile.is_empty() {
            return Err(SimpleError::new("datafile must not be empty"));
        }
    }

    Ok(())
}
