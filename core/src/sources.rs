use crate::config::Config;
use crate::error::{Error, Result};
use crate::index::{Category, DomainIndex};
use crate::parser::{Aggregated, SourceParser};
use crate::persist::{save_meta, write_atomic, IndexPaths, MetaFile, FORMAT_VERSION};
use async_trait::async_trait;
use reqwest::Client;
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use walkdir::WalkDir;

pub type FetchError = Box<dyn std::error::Error + Send + Sync>;

/// Retrieves the raw body of a remote source list.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(std::io::Error::other)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
        let resp = self.client.get(url).send().await?.error_for_status()?;
        Ok(resp.bytes().await?.to_vec())
    }
}

/// Stable identifier of a source URL, used as its file stem.
pub fn source_id(url: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(url.trim().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Counts produced by a rebuild.
#[derive(Debug, Clone, Default)]
pub struct BuildStats {
    pub sources: usize,
    pub free: usize,
    pub disposable: usize,
    pub ignored: Vec<String>,
}

/// Outcome of [`SourceManager::run`].
#[derive(Debug, Default)]
pub struct RunReport {
    /// Number of configured sources.
    pub total: usize,
    /// Ids of sources fetched during this run.
    pub fetched: Vec<String>,
    /// Sources that could not be fetched; always [`Error::SourceFetch`].
    pub failed: Vec<Error>,
    /// Present when the indices were rebuilt.
    pub stats: Option<BuildStats>,
}

impl RunReport {
    pub fn rebuilt(&self) -> bool {
        self.stats.is_some()
    }
}

pub struct SourceManager {
    sources_path: PathBuf,
    directory: PathBuf,
    concurrency: usize,
    fetcher: Arc<dyn Fetcher>,
}

impl SourceManager {
    pub fn new(config: &Config) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(config)?);
        Ok(Self::with_fetcher(config, fetcher))
    }

    pub fn with_fetcher(config: &Config, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            sources_path: config.sources_path.clone(),
            directory: config.data_dir.clone(),
            concurrency: config.concurrent_downloads.max(1),
            fetcher,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Configured sources, keyed by id.
    pub fn sources(&self) -> Result<BTreeMap<String, String>> {
        let text = fs::read_to_string(&self.sources_path)
            .map_err(|source| Error::SourceList { path: self.sources_path.clone(), source })?;
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(|url| (source_id(url), url.to_string()))
            .collect())
    }

    /// Source files materialized in the data directory, keyed by id.
    pub fn available(&self) -> BTreeMap<String, PathBuf> {
        WalkDir::new(&self.directory)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("txt"))
            .filter_map(|e| {
                let stem = e.path().file_stem()?.to_str()?.to_string();
                Some((stem, e.into_path()))
            })
            .collect()
    }

    /// Configured sources that are not yet materialized.
    pub fn reconcile(&self) -> Result<BTreeMap<String, String>> {
        let available = self.available();
        Ok(self.sources()?.into_iter().filter(|(id, _)| !available.contains_key(id)).collect())
    }

    /// Fetch missing sources and rebuild the indices when anything was missing.
    /// Fetch failures are collected in the report rather than returned.
    pub async fn run(&self, refresh: bool) -> Result<RunReport> {
        let sources = self.sources()?;
        let missing = if refresh { sources.clone() } else { self.reconcile()? };
        let mut report = RunReport { total: sources.len(), ..Default::default() };

        if missing.is_empty() {
            return Ok(report);
        }

        fs::create_dir_all(&self.directory)?;
        let (fetched, failed) = self.download(missing).await?;
        report.fetched = fetched;
        report.failed = failed;
        // Nothing on disk to build from; leave any previous index untouched.
        if self.available().is_empty() {
            warn!(failed = report.failed.len(), "no materialized sources, skipping rebuild");
            return Ok(report);
        }
        report.stats = Some(self.rebuild(report.total)?);
        Ok(report)
    }

    async fn download(&self, missing: BTreeMap<String, String>) -> Result<(Vec<String>, Vec<Error>)> {
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(missing.len());
        for (id, url) in missing {
            let fetcher = self.fetcher.clone();
            let permits = permits.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permits.acquire_owned().await;
                info!(%url, "downloading source");
                let body = fetcher.fetch(&url).await;
                (id, url, body)
            }));
        }

        let paths = IndexPaths::new(&self.directory);
        let mut fetched = Vec::new();
        let mut failed = Vec::new();
        for handle in handles {
            let (id, url, body) = handle.await.map_err(std::io::Error::other)?;
            match body {
                Ok(bytes) => {
                    write_atomic(&paths.source(&id), &bytes)?;
                    fetched.push(id);
                }
                Err(e) => {
                    warn!(%url, error = %e, "failed to fetch source");
                    failed.push(Error::SourceFetch { id, url, reason: e.to_string() });
                }
            }
        }
        Ok((fetched, failed))
    }

    /// Aggregate every materialized source and persist both indices.
    pub fn rebuild(&self, total: usize) -> Result<BuildStats> {
        let data = self.aggregate()?;
        let paths = IndexPaths::new(&self.directory);
        let free = DomainIndex::from_entries(Category::Free, data.free);
        let disposable = DomainIndex::from_entries(Category::Disposable, data.disposable);
        free.save(&self.directory)?;
        disposable.save(&self.directory)?;

        let meta = MetaFile {
            free: free.len(),
            disposable: disposable.len(),
            sources: total,
            created_at: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
            version: FORMAT_VERSION,
        };
        save_meta(&paths, &meta)?;
        info!(free = free.len(), disposable = disposable.len(), ignored = data.ignored.len(), "index build complete");

        Ok(BuildStats { sources: total, free: free.len(), disposable: disposable.len(), ignored: data.ignored })
    }

    fn aggregate(&self) -> Result<Aggregated> {
        let mut parser = SourceParser::new();
        for (id, path) in self.available() {
            let bytes = fs::read(&path)?;
            parser.add(&id, &String::from_utf8_lossy(&bytes));
        }
        Ok(parser.finish())
    }
}
