use std::time::Instant;

use rand::{prelude::Distribution, rngs::StdRng, SeedableRng};
use sim_recorder::simulation::{self, Simulation};
use sim_recorder::source::SampleSource;
use statrs::distribution::{Normal, Poisson};

#[path = "../scenario_params.rs"]
mod scenario_params;

const RESTING_VOLTAGE: f64 = -0.065;
const PEAK_VOLTAGE: f64 = 0.03;

/// Leaky membrane kicked by Poisson input, producing occasional spikes.
struct NoisyMembrane {
    rng: StdRng,
    noise: Normal,
    input: Poisson,
    voltage: f64,
}

impl NoisyMembrane {
    fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            noise: Normal::new(0.0, 0.0005).unwrap(),
            input: Poisson::new(0.2).unwrap(),
            voltage: RESTING_VOLTAGE,
        }
    }
}

impl SampleSource for NoisyMembrane {
    fn sample(&mut self, out: &mut Vec<f64>) {
        if self.voltage >= PEAK_VOLTAGE {
            self.voltage = RESTING_VOLTAGE;
        }

        let kicks = self.input.sample(&mut self.rng);
        self.voltage += 0.01 * kicks + self.noise.sample(&mut self.rng);
        self.voltage += 0.05 * (RESTING_VOLTAGE - self.voltage);

        if self.voltage > -0.04 {
            self.voltage = PEAK_VOLTAGE;
        }

        out.push(self.voltage);
    }
}

fn attach(simulation: &mut Simulation, path: &str, seed: u64) {
    let id = simulation.find_recorder(path).unwrap();
    simulation
        .attach_source(id, Box::new(NoisyMembrane::new(seed)))
        .unwrap();
}

fn main() {
    let mut simulation =
        simulation::create_simulation(scenario_params::get_scenario_params()).unwrap();

    attach(&mut simulation, "/model/soma[0]/Vm", 0);
    attach(&mut simulation, "/model/soma[0]/spikes", 0);
    attach(&mut simulation, "/model/dend[0]/Ca", 1);

    let num_recorders = simulation.get_num_recorders();
    let t_stop = 20.0;
    let poll_period = 1000;

    let wall_start = Instant::now();

    assert!(simulation.reinit().unwrap().is_empty());

    let mut polled_samples = 0usize;
    let mut checksum = 0.0;
    let mut tick_count = 0usize;

    while simulation.get_time() < t_stop {
        let tick_result = simulation.tick();
        assert!(tick_result.flush_failures.is_empty());
        tick_count += 1;

        if tick_count % poll_period == 0 {
            for id in 0..num_recorders {
                let recorder = simulation.recorder_mut(id).unwrap();
                let fresh = recorder.collect(false, false);
                polled_samples += fresh.len();
                checksum += fresh.iter().sum::<f64>();

                if recorder.len() > 100_000 {
                    recorder.collect(false, true);
                }
            }
        }
    }

    let wall_time = wall_start.elapsed();

    for id in 0..num_recorders {
        let recorder = simulation.recorder_mut(id).unwrap();
        let rest = recorder.collect(false, true);
        polled_samples += rest.len();
        checksum += rest.iter().sum::<f64>();
    }

    let throughput = tick_count as f64 / wall_time.as_secs_f64();

    eprintln!("Ticks: {}", tick_count);
    eprintln!("Recorded samples: {}", polled_samples);
    eprintln!(
        "Tick throughput: {:.3e} ({:.3} ns per tick)",
        throughput,
        1e9 / throughput
    );
    eprintln!("Checksum: {}", checksum);
}
