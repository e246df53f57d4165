//! Query-time classification of email domains.
//!
//! A submitted domain is expanded into its candidate hierarchy (most specific
//! first, registrable domain last), every candidate is looked up in both
//! indices, and the surviving candidates are reduced to one match and a score
//! normalized against the weights of the anchor providers.

use crate::domain::{self, ParsedDomain};
use crate::error::{Error, Result};
use crate::index::{Category, DomainIndex, Weight, Weights};
use crate::parser::anchors;
use crate::sources::{RunReport, SourceManager};
use parking_lot::RwLock;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// Both category indices as loaded from one build.
pub struct Snapshot {
    free: DomainIndex,
    disposable: DomainIndex,
    max_entries: OnceLock<Weights>,
}

impl Snapshot {
    pub fn new(free: DomainIndex, disposable: DomainIndex) -> Self {
        Self { free, disposable, max_entries: OnceLock::new() }
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let free = DomainIndex::load(Category::Free, dir)?;
        let disposable = DomainIndex::load(Category::Disposable, dir)?;
        Ok(Self::new(free, disposable))
    }

    pub fn free(&self) -> &DomainIndex { &self.free }
    pub fn disposable(&self) -> &DomainIndex { &self.disposable }

    pub fn get(&self, domain: &str) -> Weights {
        Weights::new(self.free.get(domain), self.disposable.get(domain))
    }

    /// Strongest anchor weight per category, computed on first use.
    pub fn max_entries(&self) -> Weights {
        *self.max_entries.get_or_init(|| {
            let max = |index: &DomainIndex| anchors(index.category()).iter().map(|a| index.get(a)).max().unwrap_or(0);
            Weights::new(max(&self.free), max(&self.disposable))
        })
    }

    /// Positive for free providers, negative for disposable ones, in `[-1, 1]`.
    pub fn score(&self, weights: Weights) -> f64 {
        let max = self.max_entries();
        let raw = ratio(weights.free, max.free) - ratio(weights.disposable, max.disposable);
        // Adding 0.0 turns a rounded -0.0 into 0.0.
        (raw.clamp(-1.0, 1.0) * 10_000.0).round() / 10_000.0 + 0.0
    }
}

fn ratio(weight: Weight, max: Weight) -> f64 {
    if max == 0 {
        0.0
    } else {
        weight as f64 / max as f64
    }
}

/// How the reported weights were matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    /// The full submitted domain is listed.
    Entry,
    /// A subdomain of the registrable domain is listed.
    Subdomain,
    /// Only the registrable domain is listed.
    Domain,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateWeights {
    pub domain: String,
    #[serde(flatten)]
    pub weights: Weights,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    /// ASCII form of the submitted domain.
    pub provided: String,
    pub unicode: String,
    pub domain: String,
    pub unicode_domain: String,
    pub suffix: String,
    pub summarize: bool,
    /// Candidates looked up.
    pub total: usize,
    /// Candidates that carried any weight.
    pub matched: usize,
    pub success: bool,
    pub reason: Reason,
    pub weights: Option<Weights>,
    pub score: Option<f64>,
    /// Directly matched weights of every candidate with signal, most specific first.
    pub candidates: Vec<CandidateWeights>,
}

/// Lookup keys for `parsed`, from the full domain down to the registrable domain.
pub fn candidate_hierarchy(parsed: &ParsedDomain) -> Vec<String> {
    let mut candidates = Vec::new();
    if let Some(sub) = &parsed.subdomain {
        let labels: Vec<&str> = sub.split('.').collect();
        for i in 0..labels.len() {
            candidates.push(format!("{}.{}", labels[i..].join("."), parsed.registrable));
        }
    }
    candidates.push(parsed.registrable.clone());
    candidates
}

/// Carry each candidate's weights into the less specific candidates it sits under.
fn summarize_candidates(found: &[CandidateWeights]) -> Vec<CandidateWeights> {
    let mut out: Vec<CandidateWeights> = Vec::with_capacity(found.len());
    for c in found {
        let mut weights = c.weights;
        if let Some(prev) = out.last() {
            if prev.domain.ends_with(&format!(".{}", c.domain)) {
                weights += prev.weights;
            }
        }
        out.push(CandidateWeights { domain: c.domain.clone(), weights });
    }
    out
}

fn resolve(parsed: &ParsedDomain, data: &[CandidateWeights]) -> (Reason, Option<Weights>) {
    let lookup = |domain: &str| data.iter().find(|c| c.domain == domain).map(|c| c.weights);

    if let Some(w) = lookup(&parsed.name) {
        return (Reason::Entry, Some(w));
    }
    if let Some(first) = data.first() {
        if first.domain != parsed.registrable {
            return (Reason::Subdomain, Some(first.weights));
        }
    }
    match lookup(&parsed.registrable) {
        Some(w) => (Reason::Domain, Some(w)),
        None => (Reason::NotFound, None),
    }
}

/// Entries ending with a suffix, per category.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SuffixEntries {
    pub free: Vec<(String, Weight)>,
    pub disposable: Vec<(String, Weight)>,
}

pub struct Classifier {
    manager: Option<SourceManager>,
    snapshot: RwLock<Arc<Snapshot>>,
}

impl Classifier {
    /// Load the indices, building them once from the sources when they cannot be loaded.
    pub async fn setup(manager: SourceManager, refresh: bool) -> Result<Self> {
        let mut forced = refresh;
        loop {
            let report = manager.run(forced).await?;
            if report.rebuilt() {
                info!(total = report.total, fetched = report.fetched.len(), failed = report.failed.len(), "sources updated");
            }
            match Snapshot::load(manager.directory()) {
                Ok(snapshot) => return Ok(Self { manager: Some(manager), snapshot: RwLock::new(Arc::new(snapshot)) }),
                Err(e @ Error::IndexLoad { .. }) if !forced => {
                    warn!(error = %e, "index unavailable, rebuilding from sources");
                    forced = true;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Classifier over indices that are already in memory. It cannot refresh.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self { manager: None, snapshot: RwLock::new(Arc::new(snapshot)) }
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.read().clone()
    }

    pub fn get(&self, domain: &str) -> Weights {
        self.snapshot().get(domain)
    }

    pub fn check(&self, input: &str, summarize: bool) -> Result<CheckResult> {
        let host = input.rsplit('@').next().unwrap_or(input).trim();
        let parsed = domain::parse(&domain::to_ascii(host))?;
        let snapshot = self.snapshot();

        let candidates = candidate_hierarchy(&parsed);
        let total = candidates.len();
        let found: Vec<CandidateWeights> = candidates
            .into_iter()
            .map(|domain| {
                let weights = snapshot.get(&domain);
                CandidateWeights { domain, weights }
            })
            .filter(|c| !c.weights.is_empty())
            .collect();

        let (reason, weights) = if summarize {
            resolve(&parsed, &summarize_candidates(&found))
        } else {
            resolve(&parsed, &found)
        };
        let score = weights.map(|w| snapshot.score(w));
        debug!(provided = %parsed.name, total, matched = found.len(), ?reason, ?score, "checked domain");

        Ok(CheckResult {
            unicode: domain::to_unicode(&parsed.name),
            unicode_domain: domain::to_unicode(&parsed.registrable),
            suffix: domain::to_unicode(&parsed.suffix),
            domain: parsed.registrable,
            provided: parsed.name,
            summarize,
            total,
            matched: found.len(),
            success: reason != Reason::NotFound,
            reason,
            weights,
            score,
            candidates: found,
        })
    }

    pub fn entries_with_suffix(&self, suffix: &str) -> SuffixEntries {
        let snapshot = self.snapshot();
        let suffix = domain::to_ascii(suffix.trim());
        let owned = |index: &DomainIndex| {
            index.entries_with_suffix(&suffix).into_iter().map(|(d, w)| (d.to_string(), w)).collect()
        };
        SuffixEntries { free: owned(snapshot.free()), disposable: owned(snapshot.disposable()) }
    }

    /// Re-fetch every source, rebuild, and swap in the new indices.
    pub async fn refresh(&self) -> Result<RunReport> {
        let manager = self.manager.as_ref().ok_or(Error::NoSources)?;
        let report = manager.run(true).await?;
        let snapshot = Snapshot::load(manager.directory())?;
        *self.snapshot.write() = Arc::new(snapshot);
        info!(total = report.total, failed = report.failed.len(), "indices swapped");
        Ok(report)
    }
}
