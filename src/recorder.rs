use std::path::Path;

use simple_error::{try_with, SimpleError, SimpleResult};

use crate::clock::{Clock, ProcessContext};
use crate::export::{ExportedSeries, RecorderSnapshot, Sample};
use crate::params::{self, ParamValue, RecorderKind, RecorderParams};
use crate::sample_buffer::SampleBuffer;
use crate::source::{Inbound, SampleSource};
use crate::spike_detector::SpikeDetector;
use crate::streamer::{self, CsvStreamWriter, DataFormat, StreamWriter, WriteMode};
use crate::util;

/// Records one scalar quantity per tick, either as raw values or as spike
/// times, and optionally streams the series to a file.
///
/// Every retained value carries the time of the tick that retained it, so
/// `times().len() == values().len()` after every call. A tick that yields no
/// value retains nothing; a tick that yields several values stamps all of them
/// with the same time.
pub struct Recorder {
    path: String,
    kind: RecorderKind,
    tick: usize,
    threshold: f64,
    use_streamer: bool,
    use_spike_mode: bool,
    datafile: Option<String>,
    format: DataFormat,
    column_name: Option<String>,
    columns: Vec<String>,
    flush_period: f64,
    flush_size: usize,
    retain_on_failure: bool,
    detector: SpikeDetector,
    last_time: f64,
    dt: f64,
    buffer: SampleBuffer,
    staged: Vec<f64>,
    pulled: Vec<f64>,
    flush_buffer: Vec<f64>,
    sources: Vec<Box<dyn SampleSource>>,
    writer: Box<dyn StreamWriter>,
}

impl Recorder {
    pub fn new(path: &str, kind: RecorderKind) -> Self {
        let mut recorder = Self {
            path: path.to_owned(),
            kind,
            tick: kind.default_tick(),
            threshold: 0.0,
            use_streamer: false,
            use_spike_mode: false,
            datafile: None,
            format: DataFormat::Csv,
            column_name: None,
            columns: Vec::new(),
            flush_period: 5.0,
            flush_size: 10_000,
            retain_on_failure: false,
            detector: SpikeDetector::default(),
            last_time: 0.0,
            dt: 0.0,
            buffer: SampleBuffer::new(),
            staged: Vec::new(),
            pulled: Vec::new(),
            flush_buffer: Vec::new(),
            sources: Vec::new(),
            writer: Box::new(CsvStreamWriter::new()),
        };
        recorder.refresh_columns();
        recorder
    }

    pub fn with_params(
        path: &str,
        kind: RecorderKind,
        params: &RecorderParams,
    ) -> SimpleResult<Self> {
        try_with!(
            params::validate_recorder_params(params),
            "invalid parameters for recorder {}",
            path
        );

        let mut recorder = Self::new(path, kind);
        recorder.threshold = params.threshold;
        recorder.use_spike_mode = params.use_spike_mode;
        recorder.use_streamer = params.use_streamer;
        recorder.set_format(&params.format);
        if let Some(column_name) = &params.column_name {
            recorder.set_column_name(column_name);
        }
        if let Some(datafile) = &params.datafile {
            recorder.set_datafile(datafile);
        }
        recorder.flush_period = params.flush_period;
        recorder.flush_size = params.flush_size;
        recorder.retain_on_failure = params.retain_on_failure;

        Ok(recorder)
    }

    pub fn with_writer(mut self, writer: Box<dyn StreamWriter>) -> Self {
        self.writer = writer;
        self
    }

    pub fn add_source(&mut self, source: Box<dyn SampleSource>) {
        self.sources.push(source);
    }

    pub fn reinit(&mut self, clock: &Clock) -> SimpleResult<()> {
        self.dt = clock.get_tick_dt(self.tick)?;
        self.detector.reset();
        self.refresh_columns();

        if self.use_streamer && self.datafile.is_none() {
            self.assign_default_datafile();
        }

        self.buffer.clear();
        self.staged.clear();
        self.flush_buffer.clear();
        self.last_time = 0.0;

        log::debug!(
            "reinit recorder {} on tick {} (dt {}, streaming {})",
            self.path,
            self.tick,
            self.dt,
            self.use_streamer
        );

        self.pull_and_append();

        if self.use_streamer {
            self.flush_with(WriteMode::Overwrite)?;
        }

        Ok(())
    }

    pub fn process(&mut self, ctx: &ProcessContext) -> SimpleResult<()> {
        #[cfg(debug_assertions)]
        assert!(ctx.current_time >= self.last_time);

        self.last_time = ctx.current_time;
        self.pull_and_append();

        if self.use_streamer && self.is_flush_due() {
            self.flush_with(WriteMode::Append)?;
        }

        Ok(())
    }

    /// Raw value from an unsolicited sender. It is timestamped by the next
    /// `process` call.
    pub fn input(&mut self, v: f64) {
        self.accept(Inbound::Pushed(v));
    }

    /// Value from an unsolicited sender, recorded as the current time if it
    /// crosses the threshold upwards.
    pub fn spike(&mut self, v: f64) {
        self.accept(Inbound::Spike(v));
    }

    pub fn accept(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Pushed(v) => self.staged.push(v),
            Inbound::Spike(v) => self.record_spike(v),
            Inbound::TickSample(values) => self.append_tick(&values),
        }
    }

    fn pull_and_append(&mut self) {
        let mut pulled = std::mem::take(&mut self.pulled);
        pulled.clear();

        for source in &mut self.sources {
            source.sample(&mut pulled);
        }

        self.append_tick(&pulled);
        self.pulled = pulled;
    }

    fn append_tick(&mut self, values: &[f64]) {
        if !self.staged.is_empty() {
            self.buffer.extend(self.last_time, &self.staged);
            self.staged.clear();
        }

        if self.use_spike_mode {
            for v in values {
                self.record_spike(*v);
            }
        } else {
            self.buffer.extend(self.last_time, values);
        }
    }

    fn record_spike(&mut self, v: f64) {
        if self.detector.on_sample(v, self.threshold) {
            self.buffer.push(self.last_time, self.last_time);
        }
    }

    fn is_flush_due(&self) -> bool {
        self.last_time % self.flush_period == 0.0 || self.buffer.len() >= self.flush_size
    }

    /// Appends everything buffered to the data file right away.
    pub fn flush(&mut self) -> SimpleResult<()> {
        if !self.use_streamer {
            return Err(SimpleError::new(format!(
                "recorder {} has no data file to flush to",
                self.path
            )));
        }

        self.flush_with(WriteMode::Append)
    }

    /// Writes out whatever is still buffered. Called on drop as well, but only
    /// an explicit call reports a failed write.
    pub fn close(&mut self) -> SimpleResult<()> {
        if !self.staged.is_empty() {
            self.buffer.extend(self.last_time, &self.staged);
            self.staged.clear();
        }

        if self.use_streamer && !self.buffer.is_empty() {
            self.flush_with(WriteMode::Append)?;
        }

        Ok(())
    }

    fn flush_with(&mut self, mode: WriteMode) -> SimpleResult<()> {
        let datafile = self.assign_default_datafile();

        self.flush_buffer.clear();
        self.buffer.merge_with_time(&mut self.flush_buffer);
        let num_samples = self.buffer.len();

        let result = self.writer.write(
            Path::new(&datafile),
            self.format,
            mode,
            &self.flush_buffer,
            &self.columns,
        );

        match result {
            Ok(()) => {
                log::trace!(
                    "recorder {} wrote {} samples to {} ({:?})",
                    self.path,
                    num_samples,
                    datafile,
                    mode
                );
                self.clear_all();
                Ok(())
            }
            Err(err) => {
                if self.retain_on_failure {
                    self.flush_buffer.clear();
                } else {
                    self.clear_all();
                }

                let err = SimpleError::new(format!(
                    "recorder {} failed to write {} samples to {}: {}",
                    self.path, num_samples, datafile, err
                ));
                log::error!("{}", err);
                Err(err)
            }
        }
    }

    fn clear_all(&mut self) {
        self.buffer.clear();
        self.flush_buffer.clear();
    }

    fn assign_default_datafile(&mut self) -> String {
        match &self.datafile {
            Some(datafile) => datafile.clone(),
            None => {
                let datafile = format!(
                    "{}.{}",
                    util::path_to_user_path(&self.path),
                    self.format.extension()
                );
                self.set_datafile(&datafile);
                self.datafile.clone().unwrap_or(datafile)
            }
        }
    }

    fn refresh_columns(&mut self) {
        let column_name = match &self.column_name {
            Some(column_name) => column_name.clone(),
            None => util::path_to_column_name(&self.path),
        };
        self.columns = vec!["time".to_owned(), column_name];
    }

    pub fn collect(&mut self, with_time: bool, clear: bool) -> Vec<f64> {
        self.buffer.export(with_time, clear).into_flat()
    }

    pub fn to_serializable(&mut self, with_time: bool, clear: bool) -> ExportedSeries {
        self.buffer.export(with_time, clear)
    }

    pub fn to_json(&mut self, with_time: bool, clear: bool) -> SimpleResult<String> {
        let series = self.buffer.export(with_time, clear);
        Ok(try_with!(
            serde_json::to_string(&series),
            "cannot serialize recorder {}",
            self.path
        ))
    }

    /// Full view of the buffer that leaves the cursor alone.
    pub fn snapshot(&self) -> RecorderSnapshot {
        RecorderSnapshot {
            path: self.path.clone(),
            column_name: self.column_name(),
            dt: self.dt,
            cursor: self.buffer.cursor(),
            samples: self
                .buffer
                .times()
                .iter()
                .zip(self.buffer.values())
                .map(|(t, value)| Sample {
                    t: *t,
                    value: *value,
                })
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> SimpleResult<ParamValue> {
        let value = match name {
            "threshold" => ParamValue::Float(self.threshold),
            "useStreamer" => ParamValue::Bool(self.use_streamer),
            "useSpikeMode" => ParamValue::Bool(self.use_spike_mode),
            "datafile" | "outfile" => ParamValue::Text(self.datafile.clone().unwrap_or_default()),
            "format" => ParamValue::Text(self.format.to_string()),
            "columnName" => ParamValue::Text(self.column_name()),
            "dt" => ParamValue::Float(self.dt),
            "path" => ParamValue::Text(self.path.clone()),
            _ => {
                return Err(SimpleError::new(format!(
                    "recorder has no field named {}",
                    name
                )))
            }
        };

        Ok(value)
    }

    pub fn set(&mut self, name: &str, value: ParamValue) -> SimpleResult<()> {
        let mismatch = || SimpleError::new(format!("wrong value type for field {}", name));

        match name {
            "threshold" => self.set_threshold(value.as_float().ok_or_else(mismatch)?),
            "useStreamer" => self.set_use_streamer(value.as_bool().ok_or_else(mismatch)?),
            "useSpikeMode" => self.set_use_spike_mode(value.as_bool().ok_or_else(mismatch)?),
            "datafile" | "outfile" => self.set_datafile(value.as_text().ok_or_else(mismatch)?),
            "format" => self.set_format(value.as_text().ok_or_else(mismatch)?),
            "columnName" => self.set_column_name(value.as_text().ok_or_else(mismatch)?),
            "dt" | "path" => {
                return Err(SimpleError::new(format!("field {} is read-only", name)));
            }
            _ => {
                return Err(SimpleError::new(format!(
                    "recorder has no field named {}",
                    name
                )));
            }
        }

        Ok(())
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
    }

    pub fn get_threshold(&self) -> f64 {
        self.threshold
    }

    pub fn set_use_streamer(&mut self, use_streamer: bool) {
        self.use_streamer = use_streamer;
    }

    pub fn get_use_streamer(&self) -> bool {
        self.use_streamer
    }

    pub fn set_use_spike_mode(&mut self, use_spike_mode: bool) {
        self.use_spike_mode = use_spike_mode;
    }

    pub fn get_use_spike_mode(&self) -> bool {
        self.use_spike_mode
    }

    /// Also switches streaming on and takes the format from the extension.
    pub fn set_datafile(&mut self, datafile: &str) {
        if datafile.is_empty() {
            log::warn!("ignoring empty data file name for recorder {}", self.path);
            return;
        }

        let datafile = util::prepare_datafile(datafile);
        self.format = streamer::infer_format(&datafile);
        self.datafile = Some(datafile);
        self.use_streamer = true;
    }

    pub fn get_datafile(&self) -> Option<&str> {
        self.datafile.as_deref()
    }

    pub fn set_format(&mut self, format: &str) {
        match format.parse() {
            Ok(format) => self.format = format,
            Err(err) => log::warn!("{} (recorder {})", err, self.path),
        }
    }

    pub fn get_format(&self) -> DataFormat {
        self.format
    }

    pub fn set_column_name(&mut self, column_name: &str) {
        self.column_name = Some(column_name.to_owned());
        self.refresh_columns();
    }

    pub fn column_name(&self) -> String {
        match &self.column_name {
            Some(column_name) => column_name.clone(),
            None => util::path_to_column_name(&self.path),
        }
    }

    pub fn set_tick(&mut self, tick: usize) {
        self.tick = tick;
    }

    pub fn tick(&self) -> usize {
        self.tick
    }

    pub fn kind(&self) -> RecorderKind {
        self.kind
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn last_time(&self) -> f64 {
        self.last_time
    }

    pub fn is_fired(&self) -> bool {
        self.detector.is_fired()
    }

    pub fn values(&self) -> &[f64] {
        self.buffer.values()
    }

    pub fn times(&self) -> &[f64] {
        self.buffer.times()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.buffer.cursor()
    }

    /// Pushed values still waiting for a tick to timestamp them.
    pub fn pending_pushed(&self) -> &[f64] {
        &self.staged
    }

    pub fn params(&self) -> RecorderParams {
        RecorderParams {
            threshold: self.threshold,
            use_streamer: self.use_streamer,
            use_spike_mode: self.use_spike_mode,
            datafile: self.datafile.clone(),
            format: self.format.to_string(),
            column_name: self.column_name.clone(),
            flush_period: self.flush_period,
            flush_size: self.flush_size,
            retain_on_failure: self.retain_on_failure,
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.close().ok();
    }
}
