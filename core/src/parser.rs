//! Turns raw provider lists into weighted, categorized domain counts.

use crate::domain;
use crate::index::{Category, Weight};
use std::collections::{HashMap, HashSet};
use tracing::info;

/// Globally recognized free-mail providers.
pub const FREE_ANCHORS: &[&str] = &["gmail.com", "hotmail.com", "outlook.com", "yahoo.com"];

/// Globally recognized disposable-mail providers.
pub const DISPOSABLE_ANCHORS: &[&str] = &["mailinator.com", "temp-mail.ru", "maildrop.cc", "10minutemail.com"];

pub fn anchors(category: Category) -> &'static [&'static str] {
    match category {
        Category::Free => FREE_ANCHORS,
        Category::Disposable => DISPOSABLE_ANCHORS,
        Category::Unknown => &[],
    }
}

/// Normalize one line of a source list into a domain, or `None` when it carries no domain.
pub fn sanitize(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let ascii = domain::to_ascii(line);
    let stripped = ascii
        .strip_prefix("www.")
        .or_else(|| ascii.strip_prefix('.'))
        .unwrap_or(&ascii);
    domain::parse(stripped).ok().map(|d| d.name)
}

/// Unique sanitized domains of a source, in order of first appearance.
/// A single-line source is treated as a comma separated list.
pub fn read_domains(content: &str) -> Vec<String> {
    let lines: Vec<&str> = content.lines().collect();
    let raw: Vec<&str> = if lines.len() == 1 { lines[0].split(',').collect() } else { lines };

    let mut seen = HashSet::new();
    raw.into_iter()
        .filter_map(sanitize)
        .filter(|d| seen.insert(d.clone()))
        .collect()
}

/// Category whose anchor domains, and only whose, appear in `domains`.
pub fn classify<S: AsRef<str>>(domains: &[S]) -> Category {
    let present: HashSet<&str> = domains.iter().map(AsRef::as_ref).collect();
    let mut matched = Category::INDEXED
        .into_iter()
        .filter(|category| anchors(*category).iter().any(|a| present.contains(a)));

    match (matched.next(), matched.next()) {
        (Some(category), None) => category,
        _ => Category::Unknown,
    }
}

/// Weighted entries for one category, heaviest first.
pub type Entries = Vec<(String, Weight)>;

#[derive(Debug, Default, Clone)]
pub struct Aggregated {
    pub free: Entries,
    pub disposable: Entries,
    /// Sources that could not be categorized.
    pub ignored: Vec<String>,
}

#[derive(Default)]
struct Counter {
    // domain -> (sources listing it, first appearance)
    counts: HashMap<String, (Weight, usize)>,
}

impl Counter {
    fn add(&mut self, domains: Vec<String>) {
        for d in domains {
            let next = self.counts.len();
            self.counts.entry(d).or_insert((0, next)).0 += 1;
        }
    }

    fn into_entries(self) -> Entries {
        let mut entries: Vec<(String, (Weight, usize))> = self.counts.into_iter().collect();
        entries.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
        entries.into_iter().map(|(d, (w, _))| (d, w)).collect()
    }
}

/// Accumulates sources one at a time.
#[derive(Default)]
pub struct SourceParser {
    free: Counter,
    disposable: Counter,
    ignored: Vec<String>,
}

impl SourceParser {
    pub fn new() -> Self { Self::default() }

    /// Parse, classify and count one source. Returns the category it was filed under.
    pub fn add(&mut self, key: &str, content: &str) -> Category {
        let domains = read_domains(content);
        let category = classify(&domains);
        match category {
            Category::Free => self.free.add(domains),
            Category::Disposable => self.disposable.add(domains),
            Category::Unknown => {
                info!(source = key, domains = domains.len(), "ignoring source");
                self.ignored.push(key.to_string());
            }
        }
        category
    }

    pub fn finish(self) -> Aggregated {
        Aggregated { free: self.free.into_entries(), disposable: self.disposable.into_entries(), ignored: self.ignored }
    }
}

/// Aggregate `(key, content)` pairs into per-category weights.
pub fn aggregate<'a, I>(sources: I) -> Aggregated
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut parser = SourceParser::new();
    for (key, content) in sources {
        parser.add(key, content);
    }
    parser.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_normalizes_and_rejects() {
        assert_eq!(sanitize("  WWW.Gmail.com \n").as_deref(), Some("gmail.com"));
        assert_eq!(sanitize(".mailinator.com").as_deref(), Some("mailinator.com"));
        assert_eq!(sanitize("mx.temp-mail.ru").as_deref(), Some("mx.temp-mail.ru"));
        assert_eq!(sanitize("# comment"), None);
        assert_eq!(sanitize("   "), None);
        assert_eq!(sanitize("co.uk"), None);
        assert_eq!(sanitize("bad..domain"), None);
    }

    #[test]
    fn single_line_source_is_comma_separated() {
        assert_eq!(read_domains("a.com,b.com,c.com\n"), vec!["a.com", "b.com", "c.com"]);
    }

    #[test]
    fn duplicates_collapse_within_a_source() {
        let domains = read_domains("gmail.com\nGMAIL.com\nwww.gmail.com\nyahoo.com\n");
        assert_eq!(domains, vec!["gmail.com", "yahoo.com"]);
    }

    #[test]
    fn classification_needs_exactly_one_category() {
        assert_eq!(classify(&["gmail.com", "x.com"]), Category::Free);
        assert_eq!(classify(&["maildrop.cc"]), Category::Disposable);
        assert_eq!(classify(&["gmail.com", "maildrop.cc"]), Category::Unknown);
        assert_eq!(classify(&["x.com", "y.com"]), Category::Unknown);
        assert_eq!(classify::<&str>(&[]), Category::Unknown);
    }

    #[test]
    fn weights_count_distinct_sources() {
        let agg = aggregate([
            ("s1", "gmail.com\nfoo.com\nfoo.com\n"),
            ("s2", "gmail.com\nyahoo.com\n"),
            ("s3", "mailinator.com\nfoo.com\n"),
            ("s4", "gmail.com\nmailinator.com\n"),
        ]);
        assert_eq!(agg.free, vec![("gmail.com".to_string(), 2), ("foo.com".to_string(), 1), ("yahoo.com".to_string(), 1)]);
        assert_eq!(agg.disposable, vec![("mailinator.com".to_string(), 1), ("foo.com".to_string(), 1)]);
        assert_eq!(agg.ignored, vec!["s4".to_string()]);
    }
}
