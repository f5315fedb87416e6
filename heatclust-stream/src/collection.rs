//! Size-classed bucket hierarchy with time decay.
//!
//! Buckets are keyed by their item count. A class holds at most two
//! residents: when a third bucket arrives the two oldest residents are
//! merged and the result is inserted one class up, like a carry in a binary
//! counter. Buckets older than the time horizon are evicted on every ingest.

use std::collections::BTreeMap;

use crate::bucket::Bucket;
use crate::config::LearnerConfig;
use crate::error::Result;
use crate::merge::merge_buckets;
use log::{debug, warn};

#[derive(Debug, Clone)]
pub struct BucketCollection {
    classes: BTreeMap<usize, Vec<Bucket>>,
    config: LearnerConfig,
    horizon: i64,
    now: i64,
}

impl BucketCollection {
    #[must_use]
    pub fn new(config: LearnerConfig) -> Self {
        let horizon = config.time_horizon_secs();
        Self {
            classes: BTreeMap::new(),
            config,
            horizon,
            now: i64::MIN,
        }
    }

    #[must_use]
    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    /// Maximum bucket age in seconds.
    #[must_use]
    pub fn time_horizon(&self) -> i64 {
        self.horizon
    }

    /// Largest bucket timestamp seen so far.
    #[must_use]
    pub fn now(&self) -> i64 {
        self.now
    }

    fn cutoff(&self) -> i64 {
        self.now.saturating_sub(self.horizon)
    }

    /// Adds a bucket, cascading merges up the size classes.
    ///
    /// The clock advances to the bucket's timestamp (it never moves back) and
    /// every resident older than the horizon is evicted first. Buckets
    /// larger than `max_bucket_size`, or already older than the horizon, are
    /// discarded.
    ///
    /// # Errors
    /// Propagates merge errors. A failed merge leaves the two residents in
    /// place and the new bucket is not stored.
    pub fn ingest(&mut self, bucket: Bucket) -> Result<()> {
        self.now = self.now.max(bucket.timestamp);
        self.evict();
        if bucket.timestamp < self.cutoff() {
            debug!(
                "discarding bucket of {} items at {}: older than the horizon",
                bucket.itemcount, bucket.timestamp
            );
            return Ok(());
        }
        self.insert(bucket)
    }

    fn evict(&mut self) {
        let cutoff = self.cutoff();
        for (class, residents) in &mut self.classes {
            let before = residents.len();
            residents.retain(|b| b.timestamp >= cutoff);
            if residents.len() < before {
                debug!("evicted {} buckets of size {class}", before - residents.len());
            }
        }
        self.classes.retain(|_, residents| !residents.is_empty());
    }

    fn insert(&mut self, bucket: Bucket) -> Result<()> {
        let class = bucket.itemcount;
        let ceiling = self.config.max_bucket_size;
        if class > ceiling {
            warn!("discarding bucket of {class} items: exceeds the maximum bucket size {ceiling}");
            return Ok(());
        }

        let residents = self.classes.entry(class).or_default();
        if residents.len() >= 2 {
            if class < ceiling {
                let (older, newer) = two_oldest(residents);
                let merged = merge_buckets(&residents[older], &residents[newer], &self.config)?;
                let (first, second) = (older.min(newer), older.max(newer));
                let later = residents.remove(second);
                let earlier = residents.remove(first);
                debug!("merged two buckets of size {class} into {} clusters", merged.k());
                if let Err(err) = self.insert(merged) {
                    // put both residents back where they were
                    let residents = self.classes.entry(class).or_default();
                    residents.insert(first, earlier);
                    residents.insert(second, later);
                    return Err(err);
                }
            } else if let Some(oldest) = oldest(residents) {
                let dropped = residents.remove(oldest);
                debug!("dropping bucket at {} from the ceiling class", dropped.timestamp);
            }
        }
        self.classes.entry(class).or_default().push(bucket);
        Ok(())
    }

    /// Residents of one size class, in insertion order.
    #[must_use]
    pub fn residents(&self, class: usize) -> &[Bucket] {
        self.classes.get(&class).map_or(&[], Vec::as_slice)
    }

    /// Occupied size classes in ascending order.
    pub fn classes(&self) -> impl Iterator<Item = (usize, &[Bucket])> + '_ {
        self.classes.iter().map(|(&class, residents)| (class, residents.as_slice()))
    }

    /// All resident buckets, smallest class first.
    pub fn iter(&self) -> impl Iterator<Item = &Bucket> + '_ {
        self.classes.values().flatten()
    }

    /// Number of resident buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn oldest(residents: &[Bucket]) -> Option<usize> {
    residents
        .iter()
        .enumerate()
        .min_by_key(|(_, b)| b.timestamp)
        .map(|(i, _)| i)
}

/// Indices of the two oldest residents; earlier insertion wins ties.
fn two_oldest(residents: &[Bucket]) -> (usize, usize) {
    let mut order: Vec<usize> = (0..residents.len()).collect();
    order.sort_by_key(|&i| (residents[i].timestamp, i));
    (order[0], order[1])
}
