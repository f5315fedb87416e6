//! heatclust-stream: multi-resolution summaries of a temperature-delta
//! stream under a bounded memory budget.
//!
//! Observations are batched, each batch is clustered into a [`Bucket`],
//! and buckets are kept in a [`BucketCollection`] of doubling size classes
//! where equal-sized buckets are merged and old ones decay away. The
//! [`StreamLearner`] drives this from a [`DeltaOracle`] and reports one
//! [`BucketSummary`] per finalized bucket to a [`SummarySink`].
//!
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc
)]

pub mod bucket;
pub mod collection;
pub mod config;
pub mod error;
pub mod learner;
pub mod merge;
pub mod oracle;
pub mod sink;
pub mod summary;

pub use bucket::Bucket;
pub use collection::BucketCollection;
pub use config::LearnerConfig;
pub use error::{Error, Result};
pub use learner::{Observed, StreamLearner};
pub use merge::{cost_matrix, identity_merge, merge_buckets, recluster_summaries};
pub use oracle::{DeltaOracle, DeltaResponse, OracleError, ReplayOracle};
pub use sink::{JsonLinesSink, SummarySink};
pub use summary::{BucketSummary, ClusterSummary};
