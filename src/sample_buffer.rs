use crate::export::ExportedSeries;

/// Parallel time and value series plus the incremental export cursor.
#[derive(Debug, Default, Clone)]
pub struct SampleBuffer {
    times: Vec<f64>,
    values: Vec<f64>,
    cursor: usize,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(debug_assertions)]
    fn is_aligned(&self) -> bool {
        self.times.len() == self.values.len() && self.cursor <= self.values.len()
    }

    pub fn push(&mut self, t: f64, value: f64) {
        self.times.push(t);
        self.values.push(value);

        #[cfg(debug_assertions)]
        assert!(self.is_aligned());
    }

    /// Appends a group of values sharing one timestamp.
    pub fn extend(&mut self, t: f64, values: &[f64]) {
        self.times.extend(std::iter::repeat(t).take(values.len()));
        self.values.extend_from_slice(values);

        #[cfg(debug_assertions)]
        assert!(self.is_aligned());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn clear(&mut self) {
        self.times.clear();
        self.values.clear();
        self.cursor = 0;
    }

    /// Appends `[t0, v0, t1, v1, ...]` to `out`.
    pub fn merge_with_time(&self, out: &mut Vec<f64>) {
        out.reserve(2 * self.values.len());
        for (t, value) in self.times.iter().zip(&self.values) {
            out.push(*t);
            out.push(*value);
        }
    }

    /// With `clear` the whole buffer is exported and then dropped. Without it
    /// only the samples past the cursor are exported and the cursor moves to
    /// the end.
    pub fn export(&mut self, with_time: bool, clear: bool) -> ExportedSeries {
        if clear {
            self.cursor = 0;
        }

        let range = self.cursor..self.values.len();

        let result = if with_time {
            ExportedSeries::Pairs(
                self.times[range.clone()]
                    .iter()
                    .zip(&self.values[range])
                    .map(|(t, value)| [*t, *value])
                    .collect(),
            )
        } else {
            ExportedSeries::Values(self.values[range].to_vec())
        };

        if clear {
            self.clear();
        } else {
            self.cursor = self.values.len();
        }

        result
    }
}

#[cfg(test)]
mod tests {

    use super::SampleBuffer;
    use crate::export::{split_interleaved, ExportedSeries};
    use itertools::assert_equal;
    use rand::{distributions::Uniform, prelude::Distribution, rngs::StdRng, SeedableRng};

    #[test]
    fn empty() {
        let mut sut = SampleBuffer::new();
        assert!(sut.is_empty());
        assert_eq!(sut.export(true, false), ExportedSeries::Pairs(Vec::new()));
        assert_eq!(sut.export(false, true), ExportedSeries::Values(Vec::new()));
    }

    #[test]
    fn group_shares_timestamp() {
        let mut sut = SampleBuffer::new();
        sut.push(0.0, 1.0);
        sut.extend(0.5, &[2.0, 3.0]);
        sut.extend(1.0, &[]);

        assert_equal(sut.times(), &[0.0, 0.5, 0.5]);
        assert_equal(sut.values(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn merge_interleaves() {
        let mut sut = SampleBuffer::new();
        sut.push(0.0, 10.0);
        sut.push(0.1, 11.0);

        let mut out = vec![-1.0];
        sut.merge_with_time(&mut out);
        assert_eq!(out, [-1.0, 0.0, 10.0, 0.1, 11.0]);
    }

    #[test]
    fn incremental_export() {
        let mut sut = SampleBuffer::new();
        sut.push(0.0, 1.0);
        sut.push(1.0, 2.0);

        assert_eq!(sut.export(false, false), ExportedSeries::Values(vec![1.0, 2.0]));
        assert_eq!(sut.cursor(), 2);
        assert!(sut.export(false, false).is_empty());

        sut.push(2.0, 3.0);
        assert_eq!(
            sut.export(true, false),
            ExportedSeries::Pairs(vec![[2.0, 3.0]])
        );

        // nothing was dropped
        assert_eq!(sut.len(), 3);
    }

    #[test]
    fn clearing_export_starts_from_zero() {
        let mut sut = SampleBuffer::new();
        sut.push(0.0, 1.0);
        sut.push(1.0, 2.0);
        sut.export(false, false);

        assert_eq!(
            sut.export(true, true),
            ExportedSeries::Pairs(vec![[0.0, 1.0], [1.0, 2.0]])
        );
        assert!(sut.is_empty());
        assert_eq!(sut.cursor(), 0);
    }

    #[test]
    fn randomized_merge_round_trip() {
        let mut sut = SampleBuffer::new();
        let mut expected = Vec::new();
        let mut rng = StdRng::seed_from_u64(0);
        let group_size_dist = Uniform::from(0..4);
        let value_dist = Uniform::from(-100.0..100.0);

        for step in 0..500 {
            let t = step as f64 * 0.25;
            let group: Vec<f64> = (0..group_size_dist.sample(&mut rng))
                .map(|_| value_dist.sample(&mut rng))
                .collect();
            sut.extend(t, &group);
            expected.extend(group.into_iter().map(|value| (t, value)));
        }

        let mut merged = Vec::new();
        sut.merge_with_time(&mut merged);
        assert_eq!(split_interleaved(&merged).unwrap(), expected);
    }
}
