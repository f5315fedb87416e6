//! Consumers of finalized bucket summaries.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::summary::BucketSummary;

/// Receives one summary per finalized bucket.
pub trait SummarySink {
    /// # Errors
    /// Implementation specific, typically I/O.
    fn emit(&mut self, summary: &BucketSummary) -> Result<()>;
}

impl SummarySink for Vec<BucketSummary> {
    fn emit(&mut self, summary: &BucketSummary) -> Result<()> {
        self.push(summary.clone());
        Ok(())
    }
}

/// Writes each summary as one JSON object per line.
pub struct JsonLinesSink<W: Write> {
    writer: BufWriter<W>,
}

impl JsonLinesSink<File> {
    /// Creates (or truncates) the file at `path`.
    ///
    /// # Errors
    /// I/O errors from creating the file.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: BufWriter::new(inner),
        }
    }

    /// # Errors
    /// I/O errors from the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flushes and returns the underlying writer.
    ///
    /// # Errors
    /// I/O errors from the final flush.
    pub fn into_inner(self) -> Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error().into())
    }
}

impl<W: Write> SummarySink for JsonLinesSink<W> {
    fn emit(&mut self, summary: &BucketSummary) -> Result<()> {
        serde_json::to_writer(&mut self.writer, summary)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::NamedTempFile;

    fn sample(k: usize) -> BucketSummary {
        BucketSummary {
            center: 1.5,
            noise: 0.25,
            mean_diameter: 2.0,
            k,
            timestamp: 1_700_000_000,
            itemcount: 16,
        }
    }

    #[test]
    fn test_json_lines_in_memory() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.emit(&sample(2)).unwrap();
        sink.emit(&sample(3)).unwrap();
        let bytes = sink.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: BucketSummary = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed, sample(3));
    }

    #[test]
    fn test_json_lines_file() {
        let file = NamedTempFile::new().unwrap();
        let mut sink = JsonLinesSink::create(file.path()).unwrap();
        sink.emit(&sample(4)).unwrap();
        sink.flush().unwrap();
        let text = fs::read_to_string(file.path()).unwrap();
        assert!(text.ends_with('\n'));
        assert!(text.contains("\"k\":4"));
    }

    #[test]
    fn test_vec_sink() {
        let mut sink: Vec<BucketSummary> = Vec::new();
        sink.emit(&sample(1)).unwrap();
        assert_eq!(sink.len(), 1);
    }
}
