use std::collections::VecDeque;

/// Anything a recorder can pull from at tick time. The reply is appended to
/// `out` and may hold any number of values, including none.
pub trait SampleSource {
    fn sample(&mut self, out: &mut Vec<f64>);
}

/// Wraps a closure returning a single value per request.
pub struct FnSource<F: FnMut() -> f64>(pub F);

impl<F: FnMut() -> f64> SampleSource for FnSource<F> {
    fn sample(&mut self, out: &mut Vec<f64>) {
        out.push((self.0)());
    }
}

/// Replays a fixed reply per request, then stays silent.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    replies: VecDeque<Vec<f64>>,
}

impl ScriptedSource {
    pub fn new(replies: Vec<Vec<f64>>) -> Self {
        Self {
            replies: replies.into(),
        }
    }

    /// One single-value reply per entry.
    pub fn from_values(values: &[f64]) -> Self {
        Self::new(values.iter().map(|value| vec![*value]).collect())
    }

    pub fn remaining(&self) -> usize {
        self.replies.len()
    }
}

impl SampleSource for ScriptedSource {
    fn sample(&mut self, out: &mut Vec<f64>) {
        if let Some(reply) = self.replies.pop_front() {
            out.extend(reply);
        }
    }
}

/// Everything that can feed values into a recorder.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Unsolicited raw value, timestamped by the next tick.
    Pushed(f64),
    /// Unsolicited value run through spike detection.
    Spike(f64),
    /// Reply to the tick's pull request.
    TickSample(Vec<f64>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fn_source() {
        let mut counter = 0.0;
        let mut sut = FnSource(move || {
            counter += 1.0;
            counter
        });

        let mut out = Vec::new();
        sut.sample(&mut out);
        sut.sample(&mut out);
        assert_eq!(out, [1.0, 2.0]);
    }

    #[test]
    fn scripted_source() {
        let mut sut = ScriptedSource::new(vec![vec![1.0], vec![], vec![2.0, 3.0]]);
        let mut out = Vec::new();

        sut.sample(&mut out);
        assert_eq!(out, [1.0]);

        out.clear();
        sut.sample(&mut out);
        assert!(out.is_empty());

        sut.sample(&mut out);
        assert_eq!(out, [2.0, 3.0]);
        assert_eq!(sut.remaining(), 0);

        out.clear();
        sut.sample(&mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn from_values() {
        let sut = ScriptedSource::from_values(&[0.5, 1.5]);
        assert_eq!(sut.remaining(), 2);
    }
}
