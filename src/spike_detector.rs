/// Rising-edge detector turning an analog signal into threshold-crossing events.
#[derive(Debug, Default, Clone)]
pub struct SpikeDetector {
    fired: bool,
}

impl SpikeDetector {
    /// Feeds one sample and reports whether it is a rising edge. Both
    /// comparisons are strict, so a sample equal to the threshold never
    /// changes the state.
    pub fn on_sample(&mut self, v: f64, threshold: f64) -> bool {
        if self.fired {
            if v < threshold {
                self.fired = false;
            }
            false
        } else if v > threshold {
            self.fired = true;
            true
        } else {
            false
        }
    }

    pub fn is_fired(&self) -> bool {
        self.fired
    }

    pub fn reset(&mut self) {
        self.fired = false;
    }
}
