//! The delta oracle: the blocking request/response exchange that supplies
//! aggregated temperature deltas.

use std::collections::VecDeque;
use std::io::BufRead;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One aggregated delta observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaResponse {
    /// Temperature delta summed over the considered samples.
    pub result: f64,
    /// Number of samples behind `result`; zero means no fresh data.
    pub considered: u32,
    /// Observation time in seconds since the epoch.
    pub timestamp: i64,
}

impl DeltaResponse {
    #[must_use]
    pub fn new(timestamp: i64, result: f64, considered: u32) -> Self {
        Self {
            result,
            considered,
            timestamp,
        }
    }

    /// Delta per sample, `None` when nothing was considered.
    #[must_use]
    pub fn rate(&self) -> Option<f64> {
        (self.considered > 0).then(|| self.result / f64::from(self.considered))
    }
}

#[derive(Error, Debug)]
pub enum OracleError {
    /// No further data will ever arrive.
    #[error("oracle closed")]
    Closed,

    /// A single exchange failed; the caller may retry.
    #[error("request failed: {0}")]
    Request(String),
}

/// Source of delta observations.
pub trait DeltaOracle {
    /// Requests the deltas of the last `window_secs` seconds. Blocks until
    /// the oracle answers.
    ///
    /// # Errors
    /// [`OracleError::Closed`] once the source is exhausted.
    fn request(&mut self, window_secs: u32) -> std::result::Result<Vec<DeltaResponse>, OracleError>;
}

/// Replays recorded responses, a fixed number per request.
#[derive(Debug, Clone, Default)]
pub struct ReplayOracle {
    responses: VecDeque<DeltaResponse>,
    per_request: usize,
}

impl ReplayOracle {
    /// Replays `responses` one per request.
    #[must_use]
    pub fn new(responses: Vec<DeltaResponse>) -> Self {
        Self {
            responses: responses.into(),
            per_request: 1,
        }
    }

    /// Hands out up to `per_request` responses per request.
    #[must_use]
    pub fn with_chunk(mut self, per_request: usize) -> Self {
        self.per_request = per_request.max(1);
        self
    }

    /// Parses `timestamp,result,considered` lines. Blank lines and lines
    /// starting with `#` are skipped.
    ///
    /// # Errors
    /// [`Error::Parse`] for a malformed line, [`Error::Io`] on read failure.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut responses = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            responses.push(parse_line(trimmed, idx + 1)?);
        }
        Ok(Self::new(responses))
    }

    /// Responses not yet handed out.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.responses.len()
    }
}

fn parse_line(line: &str, number: usize) -> Result<DeltaResponse> {
    let parse_error = |message: String| Error::Parse {
        line: number,
        message,
    };
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [timestamp, result, considered] = fields.as_slice() else {
        return Err(parse_error(format!(
            "expected 3 comma-separated fields, found {}",
            fields.len()
        )));
    };
    let timestamp = timestamp
        .parse::<i64>()
        .map_err(|e| parse_error(format!("invalid timestamp {timestamp:?}: {e}")))?;
    let result = result
        .parse::<f64>()
        .map_err(|e| parse_error(format!("invalid result {result:?}: {e}")))?;
    let considered = considered
        .parse::<u32>()
        .map_err(|e| parse_error(format!("invalid sample count {considered:?}: {e}")))?;
    Ok(DeltaResponse::new(timestamp, result, considered))
}

impl DeltaOracle for ReplayOracle {
    fn request(&mut self, _window_secs: u32) -> std::result::Result<Vec<DeltaResponse>, OracleError> {
        if self.responses.is_empty() {
            return Err(OracleError::Closed);
        }
        let take = self.per_request.min(self.responses.len());
        Ok(self.responses.drain(..take).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rate() {
        assert_relative_eq!(DeltaResponse::new(1, 14.0, 7).rate().unwrap(), 2.0);
        assert!(DeltaResponse::new(1, 14.0, 0).rate().is_none());
    }

    #[test]
    fn test_replay_chunks_then_closes() {
        let mut oracle = ReplayOracle::new(vec![
            DeltaResponse::new(1, 1.0, 1),
            DeltaResponse::new(2, 2.0, 1),
            DeltaResponse::new(3, 3.0, 1),
        ])
        .with_chunk(2);
        assert_eq!(oracle.request(14).unwrap().len(), 2);
        assert_eq!(oracle.request(14).unwrap().len(), 1);
        assert!(matches!(oracle.request(14), Err(OracleError::Closed)));
    }

    #[test]
    fn test_from_reader() {
        let text = "# recorded deltas\n100, 28.0, 14\n\n114,-7,7\n";
        let oracle = ReplayOracle::from_reader(text.as_bytes()).unwrap();
        assert_eq!(oracle.remaining(), 2);
    }

    #[test]
    fn test_from_reader_rejects_bad_lines() {
        let err = ReplayOracle::from_reader("100,1.0\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 1, .. }));
        let err = ReplayOracle::from_reader("# x\nabc,1.0,2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }));
    }
}
