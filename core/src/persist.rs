use crate::error::{Error, Result};
use crate::index::{Category, DomainIndex, Weight};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub free: usize,
    pub disposable: usize,
    pub sources: usize,
    pub created_at: String,
    pub version: u32,
}

#[derive(Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    category: Category,
    entries: Vec<(String, Weight)>,
}

/// File locations inside the data directory.
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn index(&self, category: Category) -> PathBuf { self.root.join(format!("{category}.bin")) }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    pub fn source(&self, id: &str) -> PathBuf { self.root.join(format!("{id}.txt")) }
}

/// Write `bytes` to a temporary file next to `path` and rename it into place.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

pub fn save_index(paths: &IndexPaths, index: &DomainIndex) -> Result<()> {
    let mut entries: Vec<(String, Weight)> = index
        .entries_where(|_| true)
        .into_iter()
        .map(|(domain, weight)| (domain.to_string(), weight))
        .collect();
    entries.sort();
    let file = IndexFile { version: FORMAT_VERSION, category: index.category(), entries };
    let bytes = bincode::serialize(&file)?;
    write_atomic(&paths.index(index.category()), &bytes)
}

pub fn load_index(paths: &IndexPaths, category: Category) -> Result<DomainIndex> {
    let path = paths.index(category);
    let fail = |reason: String| Error::IndexLoad { path: path.clone(), reason };

    let mut f = File::open(&path).map_err(|e| fail(e.to_string()))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf).map_err(|e| fail(e.to_string()))?;
    let file: IndexFile = bincode::deserialize(&buf).map_err(|e| fail(e.to_string()))?;
    if file.version != FORMAT_VERSION {
        return Err(fail(format!("unsupported format version {}", file.version)));
    }
    if file.category != category {
        return Err(fail(format!("file holds {} entries", file.category)));
    }
    Ok(DomainIndex::from_entries(category, file.entries))
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    let json = serde_json::to_string_pretty(meta).map_err(std::io::Error::other)?;
    write_atomic(&paths.meta(), json.as_bytes())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf).map_err(std::io::Error::other)?;
    Ok(meta)
}
