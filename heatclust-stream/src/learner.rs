//! Stream learner: batches delta observations, clusters each full batch
//! into a bucket and feeds it into the bucket hierarchy.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::bucket::Bucket;
use crate::collection::BucketCollection;
use crate::config::LearnerConfig;
use crate::error::Result;
use crate::oracle::{DeltaOracle, DeltaResponse, OracleError};
use crate::sink::SummarySink;
use crate::summary::BucketSummary;
use heatclust_algorithms::agglomerative_best_level;
use heatclust_core::arena::PointArena;
use heatclust_core::point::DeltaPoint;
use log::{debug, info, warn};

/// Outcome of a single observation.
#[derive(Debug, Clone, PartialEq)]
pub enum Observed {
    /// No fresh data: zero samples considered or a repeated timestamp.
    Skipped,
    /// Added to the pending batch.
    Buffered,
    /// Completed a batch; the summary of the new bucket.
    Finalized(BucketSummary),
}

pub struct StreamLearner {
    config: LearnerConfig,
    collection: BucketCollection,
    pending: Vec<DeltaPoint>,
    last_timestamp: Option<i64>,
    history: VecDeque<BucketSummary>,
}

impl StreamLearner {
    /// # Errors
    /// [`crate::Error::Config`] for an invalid configuration.
    pub fn new(config: LearnerConfig) -> Result<Self> {
        config.validate()?;
        info!(
            "stream learner: K={}, p={}, window {}s every {}s, horizon {}s",
            config.max_clusters,
            config.batch_size,
            config.sampling_period_secs,
            config.request_interval_secs(),
            config.time_horizon_secs()
        );
        Ok(Self {
            collection: BucketCollection::new(config.clone()),
            pending: Vec::with_capacity(config.batch_size),
            history: VecDeque::with_capacity(config.summary_history),
            last_timestamp: None,
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    #[must_use]
    pub fn collection(&self) -> &BucketCollection {
        &self.collection
    }

    /// Observations waiting for the current batch to fill.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Recent bucket summaries, newest first.
    pub fn history(&self) -> impl Iterator<Item = &BucketSummary> + '_ {
        self.history.iter()
    }

    /// Feeds one oracle response.
    ///
    /// The observed value is the delta per considered sample. Once
    /// `batch_size` observations are pending they are clustered into a new
    /// bucket.
    ///
    /// # Errors
    /// Clustering or merge errors. The batch is consumed either way.
    pub fn observe(&mut self, response: &DeltaResponse) -> Result<Observed> {
        let Some(rate) = response.rate() else {
            return Ok(Observed::Skipped);
        };
        if self.last_timestamp == Some(response.timestamp) {
            return Ok(Observed::Skipped);
        }
        self.last_timestamp = Some(response.timestamp);
        self.pending.push(DeltaPoint::new(rate, response.timestamp));
        if self.pending.len() < self.config.batch_size {
            return Ok(Observed::Buffered);
        }

        let batch = std::mem::replace(&mut self.pending, Vec::with_capacity(self.config.batch_size));
        self.finalize(&batch).map(Observed::Finalized)
    }

    /// Feeds a batch of responses in order, stopping at the first one without
    /// fresh data. Finalized summaries go to `sink`.
    ///
    /// Returns the number of buckets finalized.
    ///
    /// # Errors
    /// Clustering, merge or sink errors.
    pub fn observe_all<S: SummarySink>(&mut self, responses: &[DeltaResponse], sink: &mut S) -> Result<usize> {
        let mut finalized = 0;
        for response in responses {
            match self.observe(response)? {
                Observed::Skipped => {
                    debug!("no fresh data at {}, dropping the rest of the response", response.timestamp);
                    break;
                }
                Observed::Buffered => {}
                Observed::Finalized(summary) => {
                    sink.emit(&summary)?;
                    finalized += 1;
                }
            }
        }
        Ok(finalized)
    }

    /// Pulls responses from `oracle` back to back until it closes.
    ///
    /// # Errors
    /// See [`StreamLearner::run_with_interval`].
    pub fn run<O: DeltaOracle, S: SummarySink>(&mut self, oracle: &mut O, sink: &mut S) -> Result<usize> {
        self.run_with_interval(oracle, sink, &AtomicBool::new(false), Duration::ZERO)
    }

    /// Sleeps `interval`, then requests one sampling window from `oracle`,
    /// until the oracle closes or `stop` is raised. Failed requests are
    /// logged and retried on the next tick.
    ///
    /// Returns the number of buckets finalized.
    ///
    /// # Errors
    /// Clustering, merge or sink errors.
    pub fn run_with_interval<O: DeltaOracle, S: SummarySink>(
        &mut self,
        oracle: &mut O,
        sink: &mut S,
        stop: &AtomicBool,
        interval: Duration,
    ) -> Result<usize> {
        let mut finalized = 0;
        while !stop.load(Ordering::Relaxed) {
            if !interval.is_zero() {
                thread::sleep(interval);
                if stop.load(Ordering::Relaxed) {
                    break;
                }
            }
            match oracle.request(self.config.sampling_period_secs) {
                Ok(responses) => finalized += self.observe_all(&responses, sink)?,
                Err(OracleError::Closed) => {
                    debug!("oracle closed");
                    break;
                }
                Err(err) => warn!("{err}"),
            }
        }
        Ok(finalized)
    }

    fn finalize(&mut self, batch: &[DeltaPoint]) -> Result<BucketSummary> {
        let arena = PointArena::from_deltas(batch);
        let clusters = agglomerative_best_level(&arena, &self.config.algorithm_params())?;
        let bucket = Bucket::from_clusters(arena, &clusters, self.config.retains_points(batch.len()))?;
        let summary = bucket.summary();
        info!(
            "bucket at {}: k={} center={:.3} noise={:.3} diameter={:.3}",
            summary.timestamp, summary.k, summary.center, summary.noise, summary.mean_diameter
        );
        self.history.push_front(summary.clone());
        self.history.truncate(self.config.summary_history);
        self.collection.ingest(bucket)?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::ReplayOracle;

    fn config() -> LearnerConfig {
        LearnerConfig::default()
            .with_batch_size(4)
            .with_max_bucket_size(16)
            .with_max_clusters(2)
            .with_seed(1)
    }

    #[test]
    fn test_invalid_config() {
        assert!(StreamLearner::new(LearnerConfig::default().with_batch_size(0)).is_err());
    }

    #[test]
    fn test_skips_stale_responses() {
        let mut learner = StreamLearner::new(config()).unwrap();
        assert_eq!(learner.observe(&DeltaResponse::new(10, 5.0, 0)).unwrap(), Observed::Skipped);
        assert_eq!(learner.observe(&DeltaResponse::new(10, 5.0, 5)).unwrap(), Observed::Buffered);
        assert_eq!(learner.observe(&DeltaResponse::new(10, 6.0, 5)).unwrap(), Observed::Skipped);
        assert_eq!(learner.pending(), 1);
    }

    #[test]
    fn test_observe_all_stops_at_skipped() {
        let mut learner = StreamLearner::new(config()).unwrap();
        let mut sink = Vec::new();
        let responses = [
            DeltaResponse::new(1, 2.0, 1),
            DeltaResponse::new(2, 2.0, 0),
            DeltaResponse::new(3, 2.0, 1),
        ];
        learner.observe_all(&responses, &mut sink).unwrap();
        assert_eq!(learner.pending(), 1);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_batches_become_buckets() {
        let mut learner = StreamLearner::new(config()).unwrap();
        let mut sink = Vec::new();
        let responses: Vec<_> = (0..12)
            .map(|i| DeltaResponse::new(100 + i, if i % 2 == 0 { 10.0 } else { -10.0 }, 2))
            .collect();
        let mut oracle = ReplayOracle::new(responses).with_chunk(3);
        let finalized = learner.run(&mut oracle, &mut sink).unwrap();
        assert_eq!(finalized, 3);
        assert_eq!(sink.len(), 3);
        assert!(sink.iter().all(|s| s.itemcount == 4 && s.k <= 2));
        // newest first
        let stamps: Vec<i64> = learner.history().map(|s| s.timestamp).collect();
        assert_eq!(stamps, vec![111, 107, 103]);
        assert_eq!(learner.collection().residents(8).len(), 1);
        assert_eq!(learner.collection().residents(4).len(), 1);
    }

    #[test]
    fn test_history_is_capped() {
        let mut config = config();
        config.summary_history = 2;
        let mut learner = StreamLearner::new(config).unwrap();
        for i in 0..16 {
            learner.observe(&DeltaResponse::new(i, i as f64, 1)).unwrap();
        }
        assert_eq!(learner.history().count(), 2);
    }

    #[test]
    fn test_stop_flag() {
        let mut learner = StreamLearner::new(config()).unwrap();
        let mut oracle = ReplayOracle::new(vec![DeltaResponse::new(1, 1.0, 1)]);
        let stop = AtomicBool::new(true);
        let mut sink = Vec::new();
        let n = learner
            .run_with_interval(&mut oracle, &mut sink, &stop, Duration::from_millis(1))
            .unwrap();
        assert_eq!(n, 0);
        assert_eq!(oracle.remaining(), 1);
    }
}
