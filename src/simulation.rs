use crate::clock::Clock;
use crate::params;
use crate::params::{ClockParams, RecorderKind, SimulationParams};
use crate::recorder::Recorder;
use crate::source::SampleSource;
use itertools::Itertools;
use simple_error::SimpleResult;
use simple_error::{try_with, SimpleError};

pub type RecorderId = usize;

pub fn create_simulation(params: SimulationParams) -> Result<Simulation, SimpleError> {
    try_with!(
        params::validate_simulation_params(&params),
        "invalid simulation parameters"
    );

    let mut simulation = Simulation::new(&params.clock);

    for spec in &params.recorders {
        let mut recorder = Recorder::with_params(&spec.path, spec.kind, &spec.params)?;
        recorder.set_tick(spec.effective_tick());
        simulation.add_recorder(recorder);
    }

    Ok(simulation)
}

#[derive(Debug)]
pub struct FlushFailure {
    pub recorder_id: RecorderId,
    pub error: SimpleError,
}

#[derive(Debug)]
pub struct TickResult {
    pub t: f64,
    pub processed: usize,
    pub flush_failures: Vec<FlushFailure>,
}

/// Owns the clock and the recorders it drives. Recorders are processed in
/// the order they were added, one tick at a time.
pub struct Simulation {
    clock: Clock,
    recorders: Vec<Recorder>,
}

impl Simulation {
    pub fn new(clock_params: &ClockParams) -> Self {
        Self {
            clock: Clock::new(clock_params),
            recorders: Vec::new(),
        }
    }

    pub fn add_recorder(&mut self, recorder: Recorder) -> RecorderId {
        self.recorders.push(recorder);
        self.recorders.len() - 1
    }

    pub fn create_recorder(&mut self, path: &str, kind: RecorderKind) -> RecorderId {
        self.add_recorder(Recorder::new(path, kind))
    }

    pub fn find_recorder(&self, path: &str) -> Option<RecorderId> {
        self.recorders
            .iter()
            .position(|recorder| recorder.path() == path)
    }

    pub fn recorder(&self, id: RecorderId) -> Option<&Recorder> {
        self.recorders.get(id)
    }

    pub fn recorder_mut(&mut self, id: RecorderId) -> Option<&mut Recorder> {
        self.recorders.get_mut(id)
    }

    pub fn get_num_recorders(&self) -> usize {
        self.recorders.len()
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    pub fn attach_source(
        &mut self,
        id: RecorderId,
        source: Box<dyn SampleSource>,
    ) -> SimpleResult<()> {
        self.get_recorder_mut(id)?.add_source(source);
        Ok(())
    }

    pub fn push(&mut self, id: RecorderId, v: f64) -> SimpleResult<()> {
        self.get_recorder_mut(id)?.input(v);
        Ok(())
    }

    pub fn push_spike(&mut self, id: RecorderId, v: f64) -> SimpleResult<()> {
        self.get_recorder_mut(id)?.spike(v);
        Ok(())
    }

    fn get_recorder_mut(&mut self, id: RecorderId) -> SimpleResult<&mut Recorder> {
        self.recorders
            .get_mut(id)
            .ok_or_else(|| SimpleError::new(format!("Invalid recorder id: {}", id)))
    }

    /// Rewinds the clock and reinitializes every recorder. A recorder whose
    /// initial write fails is reported without stopping the others; a clock
    /// that cannot schedule the recorders is an error.
    pub fn reinit(&mut self) -> SimpleResult<Vec<FlushFailure>> {
        let active_ticks: Vec<usize> = self
            .recorders
            .iter()
            .map(|recorder| recorder.tick())
            .unique()
            .collect();

        self.clock.reinit(&active_ticks)?;

        let clock = &self.clock;
        let flush_failures = self
            .recorders
            .iter_mut()
            .enumerate()
            .filter_map(|(recorder_id, recorder)| {
                recorder
                    .reinit(clock)
                    .err()
                    .map(|error| FlushFailure { recorder_id, error })
            })
            .collect();

        Ok(flush_failures)
    }

    pub fn tick(&mut self) -> TickResult {
        self.clock.advance();

        let t = self.clock.current_time();
        let mut processed = 0;
        let mut flush_failures = Vec::new();

        for (recorder_id, recorder) in self.recorders.iter_mut().enumerate() {
            if !self.clock.is_due(recorder.tick()) {
                continue;
            }

            let ctx = match self.clock.context(recorder.tick()) {
                Ok(ctx) => ctx,
                Err(error) => {
                    flush_failures.push(FlushFailure { recorder_id, error });
                    continue;
                }
            };

            processed += 1;
            if let Err(error) = recorder.process(&ctx) {
                flush_failures.push(FlushFailure { recorder_id, error });
            }
        }

        TickResult {
            t,
            processed,
            flush_failures,
        }
    }

    /// Ticks until the clock reaches `t` and hands back every failure on the
    /// way.
    pub fn run_until(&mut self, t: f64) -> Vec<FlushFailure> {
        let mut flush_failures = Vec::new();

        if self.clock.base_dt() <= 0.0 {
            return flush_failures;
        }

        let target_step = (t / self.clock.base_dt()).round() as u64;
        while self.clock.step() < target_step {
            flush_failures.extend(self.tick().flush_failures);
        }

        flush_failures
    }

    pub fn get_time(&self) -> f64 {
        self.clock.current_time()
    }

    /// Writes out what every recorder still holds.
    pub fn close(&mut self) -> Vec<FlushFailure> {
        self.recorders
            .iter_mut()
            .enumerate()
            .filter_map(|(recorder_id, recorder)| {
                recorder
                    .close()
                    .err()
                    .map(|error| FlushFailure { recorder_id, error })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{RecorderSpec, TickDt, BIOCHEMICAL_TICK, ELECTRICAL_TICK};
    use crate::source::{FnSource, ScriptedSource};
    use float_cmp::assert_approx_eq;

    fn clock_params() -> ClockParams {
        ClockParams {
            tick_dts: vec![
                TickDt {
                    tick: ELECTRICAL_TICK,
                    dt: 0.5,
                },
                TickDt {
                    tick: BIOCHEMICAL_TICK,
                    dt: 1.0,
                },
            ],
        }
    }

    #[test]
    fn empty_simulation() {
        let mut simulation = Simulation::new(&clock_params());
        assert!(simulation.reinit().unwrap().is_empty());

        let tick_result = simulation.tick();
        assert_eq!(tick_result.processed, 0);
        assert!(simulation.run_until(10.0).is_empty());
    }

    #[test]
    fn tick_groups() {
        let mut simulation = Simulation::new(&clock_params());
        let fast = simulation.create_recorder("/fast", RecorderKind::Electrical);
        let slow = simulation.create_recorder("/slow", RecorderKind::Biochemical);
        simulation
            .attach_source(fast, Box::new(FnSource(|| 1.0)))
            .unwrap();
        simulation
            .attach_source(slow, Box::new(FnSource(|| 2.0)))
            .unwrap();

        simulation.reinit().unwrap();

        let tick_result = simulation.tick();
        assert_approx_eq!(f64, tick_result.t, 0.5);
        assert_eq!(tick_result.processed, 1);

        let tick_result = simulation.tick();
        assert_approx_eq!(f64, tick_result.t, 1.0);
        assert_eq!(tick_result.processed, 2);

        simulation.run_until(3.0);
        assert_approx_eq!(f64, simulation.get_time(), 3.0);

        let fast = simulation.recorder(fast).unwrap();
        assert_eq!(fast.times(), [0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0]);
        let slow = simulation.recorder(slow).unwrap();
        assert_eq!(slow.times(), [0.0, 1.0, 2.0, 3.0]);
        assert_approx_eq!(f64, slow.dt(), 1.0);
    }

    #[test]
    fn push_path() {
        let mut simulation = Simulation::new(&clock_params());
        let id = simulation.create_recorder("/spikes", RecorderKind::Biochemical);
        simulation
            .recorder_mut(id)
            .unwrap()
            .set_use_spike_mode(true);
        simulation.reinit().unwrap();

        simulation.tick();
        simulation.tick();
        simulation.push_spike(id, 1.0).unwrap();
        simulation.push(id, 42.0).unwrap();
        simulation.tick();

        // only the slow group is active, so the clock steps by 1.0
        let recorder = simulation.recorder(id).unwrap();
        assert_eq!(recorder.values(), [2.0, 42.0]);
        assert_eq!(recorder.times(), [2.0, 3.0]);
    }

    #[test]
    fn invalid_recorder_id() {
        let mut simulation = Simulation::new(&clock_params());
        let result = simulation.push(3, 1.0);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().as_str(), "Invalid recorder id: 3");
        assert!(simulation
            .attach_source(0, Box::new(ScriptedSource::default()))
            .is_err());
    }

    #[test]
    fn unschedulable_recorder() {
        let mut simulation = Simulation::new(&clock_params());
        let id = simulation.create_recorder("/x", RecorderKind::Electrical);
        simulation.recorder_mut(id).unwrap().set_tick(4);

        let result = simulation.reinit();
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().as_str(), "no dt assigned to tick 4");
    }

    #[test]
    fn from_params() {
        let mut params = SimulationParams::default();
        params.clock = clock_params();
        params
            .recorders
            .push(RecorderSpec::new("/model/soma/Vm", RecorderKind::Electrical));
        let mut spec = RecorderSpec::new("/model/ca", RecorderKind::Electrical);
        spec.tick = Some(BIOCHEMICAL_TICK);
        spec.params.threshold = 2.0;
        params.recorders.push(spec);

        let simulation = create_simulation(params).unwrap();
        assert_eq!(simulation.get_num_recorders(), 2);

        let id = simulation.find_recorder("/model/ca").unwrap();
        let recorder = simulation.recorder(id).unwrap();
        assert_eq!(recorder.tick(), BIOCHEMICAL_TICK);
        assert_eq!(recorder.get_threshold(), 2.0);
        assert!(simulation.find_recorder("/nope").is_none());
    }

    #[test]
    fn invalid_params() {
        let mut params = SimulationParams::default();
        params.recorders.push(RecorderSpec::new("", RecorderKind::Electrical));

        let result = create_simulation(params);
        assert!(result.is_err());
        assert_eq!(
            result.err().unwrap().as_str(),
            "invalid simulation parameters, recorder 0 has an empty path"
        );
    }
}
