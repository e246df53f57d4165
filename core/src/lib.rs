//! Free and disposable mail provider detection.
//!
//! Remote provider lists are downloaded by the [`SourceManager`], categorized
//! and counted by the [`parser`], persisted as one [`DomainIndex`] per
//! category, and queried through a [`Classifier`].

pub mod checker;
pub mod config;
pub mod domain;
pub mod error;
pub mod index;
pub mod parser;
pub mod persist;
pub mod sources;

pub use checker::{CandidateWeights, CheckResult, Classifier, Reason, Snapshot, SuffixEntries};
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use index::{Category, DomainIndex, Weight, Weights};
pub use sources::{Fetcher, HttpFetcher, RunReport, SourceManager};

/// Build a classifier for `config`, downloading and indexing sources as needed.
pub async fn initialize(config: &Config, refresh: bool) -> Result<Classifier> {
    let manager = SourceManager::new(config)?;
    Classifier::setup(manager, refresh).await
}
