use crate::storage::{StorageError, StorageResult};
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const PAGES_DIR: &str = "pages";
const LISTINGS_DIR: &str = "annonces";

/// Root of the corpus, one directory per city slug
#[derive(Debug, Clone)]
pub struct CorpusStore {
    root: PathBuf,
}

impl CorpusStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the corpus of one city; nothing is created on disk yet
    pub fn city(&self, slug: &str) -> CityCorpus {
        CityCorpus {
            slug: slug.to_string(),
            base: self.root.join(slug),
        }
    }

    /// Lists the city slugs that already have a directory, sorted
    pub fn list_cities(&self) -> StorageResult<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.root).map_err(|source| StorageError::Io {
            path: self.root.clone(),
            source,
        })?;

        let mut slugs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StorageError::Io {
                path: self.root.clone(),
                source,
            })?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    slugs.push(name.to_string());
                }
            }
        }
        slugs.sort();
        Ok(slugs)
    }
}

/// Pages and listings stored for a single city
#[derive(Debug, Clone)]
pub struct CityCorpus {
    slug: String,
    base: PathBuf,
}

impl CityCorpus {
    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    pub fn pages_dir(&self) -> PathBuf {
        self.base.join(PAGES_DIR)
    }

    pub fn listings_dir(&self) -> PathBuf {
        self.base.join(LISTINGS_DIR)
    }

    /// Creates the `pages/` and `annonces/` directories if missing
    pub fn ensure_dirs(&self) -> StorageResult<()> {
        for dir in [self.pages_dir(), self.listings_dir()] {
            fs::create_dir_all(&dir).map_err(|source| StorageError::Io { path: dir, source })?;
        }
        Ok(())
    }

    pub fn page_path(&self, page: u32) -> PathBuf {
        self.pages_dir().join(format!("page_{}.json", page))
    }

    pub fn listing_path(&self, id: &str) -> PathBuf {
        self.listings_dir().join(format!("{}.json", id))
    }

    pub fn has_page(&self, page: u32) -> bool {
        self.page_path(page).is_file()
    }

    /// A stored listing file is proof of a prior successful fetch
    pub fn has_listing(&self, id: &str) -> bool {
        self.listing_path(id).is_file()
    }

    pub fn write_page<T: Serialize + ?Sized>(&self, page: u32, document: &T) -> StorageResult<PathBuf> {
        let path = self.page_path(page);
        write_json_atomic(&path, document)?;
        Ok(path)
    }

    pub fn write_listing<T: Serialize + ?Sized>(&self, id: &str, document: &T) -> StorageResult<PathBuf> {
        let path = self.listing_path(id);
        write_json_atomic(&path, document)?;
        Ok(path)
    }

    /// Highest page number recorded on disk, or 0 when none is
    ///
    /// Only `page_<n>.json` names with `n < u32::MAX` count; anything else
    /// in the directory is ignored.
    pub fn last_page(&self) -> StorageResult<u32> {
        Ok(self.page_numbers()?.into_iter().max().unwrap_or(0))
    }

    pub fn count_pages(&self) -> StorageResult<usize> {
        Ok(self.page_numbers()?.len())
    }

    pub fn count_listings(&self) -> StorageResult<usize> {
        let dir = self.listings_dir();
        Ok(json_file_stems(&dir)?.len())
    }

    fn page_numbers(&self) -> StorageResult<Vec<u32>> {
        let dir = self.pages_dir();
        Ok(json_file_stems(&dir)?
            .iter()
            .filter_map(|stem| stem.strip_prefix("page_"))
            .filter_map(|n| n.parse::<u32>().ok())
            .filter(|&n| n < u32::MAX)
            .collect())
    }
}

/// File stems of every `*.json` file directly under `dir`
fn json_file_stems(dir: &Path) -> StorageResult<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|source| StorageError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut stems = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| StorageError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") || !path.is_file() {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            stems.push(stem.to_string());
        }
    }
    Ok(stems)
}

/// Writes pretty-printed UTF-8 JSON so that `path` is either absent or complete
///
/// The document goes to a temporary file in the destination directory, is
/// synced, then renamed over `path`.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, document: &T) -> StorageResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
        path: dir.clone(),
        source,
    })?;

    let tmp = NamedTempFile::new_in(&dir).map_err(|source| StorageError::Io {
        path: dir.clone(),
        source,
    })?;

    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer_pretty(&mut writer, document).map_err(|source| {
            StorageError::Serialization {
                path: path.to_path_buf(),
                source,
            }
        })?;
        writer.flush().map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    }

    tmp.as_file().sync_all().map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    tmp.persist(path).map_err(|e| StorageError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    Ok(())
}
