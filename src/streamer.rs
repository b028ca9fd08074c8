//! Storage boundary: the writer trait recorders flush through and the CSV
//! implementation backing it by default.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use itertools::Itertools;
use simple_error::{try_with, SimpleError, SimpleResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Append,
    Overwrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataFormat {
    #[default]
    Csv,
}

impl DataFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            DataFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for DataFormat {
    type Err = SimpleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(DataFormat::Csv),
            _ => Err(SimpleError::new(format!(
                "Unsupported format {}, only csv is supported for a single recorder",
                s
            ))),
        }
    }
}

/// Format implied by the file extension, csv when there is none or it is not
/// supported.
pub fn infer_format(path: &str) -> DataFormat {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| ext.to_ascii_lowercase().parse().ok())
        .unwrap_or_default()
}

pub trait StreamWriter {
    /// `data` is interleaved `[t0, v0, t1, v1, ...]`, `columns` labels the
    /// two columns.
    fn write(
        &mut self,
        path: &Path,
        format: DataFormat,
        mode: WriteMode,
        data: &[f64],
        columns: &[String],
    ) -> SimpleResult<()>;
}

#[derive(Debug, Default, Clone)]
pub struct CsvStreamWriter;

impl CsvStreamWriter {
    pub fn new() -> Self {
        Self
    }
}

impl StreamWriter for CsvStreamWriter {
    fn write(
        &mut self,
        path: &Path,
        format: DataFormat,
        mode: WriteMode,
        data: &[f64],
        columns: &[String],
    ) -> SimpleResult<()> {
        debug_assert_eq!(format, DataFormat::Csv);

        if data.len() % 2 != 0 {
            return Err(SimpleError::new(format!(
                "refusing to write odd-length data ({} values) to {}",
                data.len(),
                path.display()
            )));
        }

        let write_header = mode == WriteMode::Overwrite || !path.exists();

        let file = match mode {
            WriteMode::Overwrite => File::create(path),
            WriteMode::Append => OpenOptions::new().create(true).append(true).open(path),
        };
        let file = try_with!(file, "cannot open {}", path.display());
        let mut out = BufWriter::new(file);

        if write_header {
            try_with!(
                writeln!(out, "{}", columns.iter().join(",")),
                "cannot write header to {}",
                path.display()
            );
        }

        for pair in data.chunks_exact(2) {
            try_with!(
                writeln!(out, "{},{}", pair[0], pair[1]),
                "cannot write to {}",
                path.display()
            );
        }

        try_with!(out.flush(), "cannot flush {}", path.display());

        Ok(())
    }
}

/// Reads a stream file back as its header and interleaved data.
pub fn read_csv(path: &Path) -> SimpleResult<(Vec<String>, Vec<f64>)> {
    let file = try_with!(File::open(path), "cannot open {}", path.display());
    let mut lines = BufReader::new(file).lines();

    let header = match lines.next() {
        Some(line) => try_with!(line, "cannot read {}", path.display())
            .split(',')
            .map(str::to_owned)
            .collect(),
        None => Vec::new(),
    };

    let mut data = Vec::new();
    for (index, line) in lines.enumerate() {
        let line = try_with!(line, "cannot read {}", path.display());
        if line.is_empty() {
            continue;
        }
        for field in line.split(',') {
            let value: f64 = try_with!(
                field.trim().parse(),
                "invalid number on line {} of {}",
                index + 2,
                path.display()
            );
            data.push(value);
        }
    }

    Ok((header, data))
}
