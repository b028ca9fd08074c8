use float_cmp::approx_eq;
use simple_error::{SimpleError, SimpleResult};

use crate::params::ClockParams;
use crate::types::HashMap;

/// What a tick hands to the elements it processes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessContext {
    pub current_time: f64,
    pub dt: f64,
}

/// Simulated time source. Every tick group has its own dt; the clock steps by
/// the smallest active dt and a group is due whenever its dt divides the
/// elapsed time.
#[derive(Debug, Clone)]
pub struct Clock {
    tick_dts: HashMap<usize, f64>,
    strides: HashMap<usize, u64>,
    base_dt: f64,
    step: u64,
}

impl Clock {
    pub fn new(params: &ClockParams) -> Self {
        Self {
            tick_dts: params
                .tick_dts
                .iter()
                .map(|tick_dt| (tick_dt.tick, tick_dt.dt))
                .collect(),
            strides: HashMap::default(),
            base_dt: 0.0,
            step: 0,
        }
    }

    pub fn set_tick_dt(&mut self, tick: usize, dt: f64) -> SimpleResult<()> {
        if !(dt > 0.0) || !dt.is_finite() {
            return Err(SimpleError::new(format!(
                "dt of tick {} must be strictly positive",
                tick
            )));
        }

        self.tick_dts.insert(tick, dt);
        Ok(())
    }

    pub fn get_tick_dt(&self, tick: usize) -> SimpleResult<f64> {
        self.tick_dts
            .get(&tick)
            .copied()
            .ok_or_else(|| SimpleError::new(format!("no dt assigned to tick {}", tick)))
    }

    /// Rewinds to time zero and schedules `active_ticks`.
    pub fn reinit(&mut self, active_ticks: &[usize]) -> SimpleResult<()> {
        self.step = 0;
        self.strides.clear();

        let mut base_dt = f64::INFINITY;
        for tick in active_ticks {
            base_dt = base_dt.min(self.get_tick_dt(*tick)?);
        }

        if active_ticks.is_empty() {
            self.base_dt = 0.0;
            return Ok(());
        }

        for tick in active_ticks {
            let ratio = self.get_tick_dt(*tick)? / base_dt;
            let stride = ratio.round();

            if !approx_eq!(f64, ratio, stride, epsilon = 1e-9, ulps = 4) {
                return Err(SimpleError::new(format!(
                    "dt of tick {} is not a multiple of the base dt {}",
                    tick, base_dt
                )));
            }

            self.strides.insert(*tick, stride as u64);
        }

        self.base_dt = base_dt;
        log::debug!(
            "clock reinitialized with base dt {} for {} tick groups",
            base_dt,
            self.strides.len()
        );

        Ok(())
    }

    pub fn base_dt(&self) -> f64 {
        self.base_dt
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    /// Computed from the step count rather than accumulated, so times that
    /// should be round numbers stay round.
    pub fn current_time(&self) -> f64 {
        self.step as f64 * self.base_dt
    }

    pub fn is_due(&self, tick: usize) -> bool {
        match self.strides.get(&tick) {
            Some(stride) => self.step % stride == 0,
            None => false,
        }
    }

    pub fn context(&self, tick: usize) -> SimpleResult<ProcessContext> {
        Ok(ProcessContext {
            current_time: self.current_time(),
            dt: self.get_tick_dt(tick)?,
        })
    }

    pub fn advance(&mut self) {
        self.step += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{TickDt, BIOCHEMICAL_TICK, ELECTRICAL_TICK};
    use float_cmp::assert_approx_eq;

    fn params() -> ClockParams {
        ClockParams {
            tick_dts: vec![
                TickDt { tick: 0, dt: 0.1 },
                TickDt { tick: 1, dt: 0.5 },
                TickDt { tick: 2, dt: 0.25 },
            ],
        }
    }

    #[test]
    fn default_tick_groups() {
        let sut = Clock::new(&ClockParams::default());
        assert_approx_eq!(f64, sut.get_tick_dt(ELECTRICAL_TICK).unwrap(), 1e-4);
        assert_approx_eq!(f64, sut.get_tick_dt(BIOCHEMICAL_TICK).unwrap(), 1.0);

        let result = sut.get_tick_dt(3);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().as_str(), "no dt assigned to tick 3");
    }

    #[test]
    fn strides() {
        let mut sut = Clock::new(&params());
        sut.reinit(&[0, 1]).unwrap();
        assert_approx_eq!(f64, sut.base_dt(), 0.1);

        let mut due_slow = Vec::new();
        for _ in 0..11 {
            assert!(sut.is_due(0));
            if sut.is_due(1) {
                due_slow.push(sut.step());
            }
            sut.advance();
        }

        assert_eq!(due_slow, [0, 5, 10]);
        assert!(!sut.is_due(2));
    }

    #[test]
    fn exact_times() {
        let mut sut = Clock::new(&params());
        sut.reinit(&[0]).unwrap();

        for _ in 0..50 {
            sut.advance();
        }

        assert_eq!(sut.current_time(), 5.0);
        assert_eq!(sut.current_time() % 5.0, 0.0);
    }

    #[test]
    fn incommensurate_dts() {
        let mut sut = Clock::new(&params());
        sut.set_tick_dt(3, 0.15).unwrap();

        let result = sut.reinit(&[0, 3]);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().as_str(),
            "dt of tick 3 is not a multiple of the base dt 0.1"
        );
    }

    #[test]
    fn reinit_rewinds() {
        let mut sut = Clock::new(&params());
        sut.reinit(&[1]).unwrap();
        sut.advance();
        sut.advance();
        assert_approx_eq!(f64, sut.current_time(), 1.0);

        sut.reinit(&[1]).unwrap();
        assert_eq!(sut.step(), 0);
        assert_eq!(sut.current_time(), 0.0);

        let ctx = sut.context(1).unwrap();
        assert_eq!(ctx.current_time, 0.0);
        assert_approx_eq!(f64, ctx.dt, 0.5);
    }

    #[test]
    fn invalid_dt() {
        let mut sut = Clock::new(&params());
        let result = sut.set_tick_dt(4, -1.0);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().as_str(),
            "dt of tick 4 must be strictly positive"
        );
    }

    #[test]
    fn no_active_ticks() {
        let mut sut = Clock::new(&params());
        sut.reinit(&[]).unwrap();
        assert!(!sut.is_due(0));
        assert_eq!(sut.current_time(), 0.0);
    }
}
