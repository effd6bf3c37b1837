//! File-backed asset cache generations.
//!
//! A generation is a named directory under the caches root holding an
//! `index.json` (request key to body file, status, content type) plus one
//! body file per cached asset. Staging directories let an install populate
//! a whole generation and commit it with a single rename.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Index file name inside a generation directory.
const INDEX_FILE: &str = "index.json";

/// Directory-name prefix for install staging areas. Staging areas are never
/// reported as generations and are swept before reuse.
const STAGING_PREFIX: &str = ".staging-";

/// A cached response as stored and served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheIndex {
    entries: Vec<IndexEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexEntry {
    url: String,
    file: String,
    status: u16,
    content_type: Option<String>,
}

/// All cache generations under one root directory.
pub struct CacheStorage {
    root: PathBuf,
}

impl CacheStorage {
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .with_context(|| format!("failed to create cache root {}", root.display()))?;
        Ok(Self { root })
    }

    /// Names of every committed generation, staging areas excluded.
    pub fn generation_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(STAGING_PREFIX) {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    /// Delete a generation. Returns whether it existed.
    pub fn delete(&self, name: &str) -> Result<bool> {
        let dir = self.root.join(name);
        if !dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir)
            .with_context(|| format!("failed to delete cache generation {name}"))?;
        Ok(true)
    }

    /// Open a generation, creating it when absent.
    pub fn open_generation(&self, name: &str) -> Result<AssetCache> {
        let dir = self.root.join(name);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create cache generation {name}"))?;
        Ok(AssetCache { dir })
    }

    /// An already-committed generation, or `None` when it was never
    /// installed.
    pub fn generation(&self, name: &str) -> Option<AssetCache> {
        let dir = self.root.join(name);
        dir.is_dir().then_some(AssetCache { dir })
    }

    /// Fresh staging area for an atomic install. Any leftover from a
    /// previously failed install is swept first.
    pub fn staging(&self, name: &str) -> Result<AssetCache> {
        let dir = self.root.join(format!("{STAGING_PREFIX}{name}"));
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir_all(&dir)?;
        Ok(AssetCache { dir })
    }

    /// Promote a fully populated staging area to the named generation. The
    /// rename is the commit point; an interrupted install leaves the
    /// previous generation (or nothing) in place.
    pub fn commit(&self, staging: AssetCache, name: &str) -> Result<()> {
        let target = self.root.join(name);
        if target.exists() {
            fs::remove_dir_all(&target)?;
        }
        fs::rename(&staging.dir, &target)
            .with_context(|| format!("failed to commit cache generation {name}"))?;
        Ok(())
    }

    /// Drop a staging area after a failed install.
    pub fn discard(&self, staging: AssetCache) -> Result<()> {
        if staging.dir.exists() {
            fs::remove_dir_all(&staging.dir)?;
        }
        Ok(())
    }
}

/// One generation's cached assets.
pub struct AssetCache {
    dir: PathBuf,
}

impl AssetCache {
    fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    fn load_index(&self) -> Result<CacheIndex> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(CacheIndex::default());
        }
        let contents = fs::read_to_string(&path).context("failed to read cache index")?;
        serde_json::from_str(&contents).context("failed to parse cache index")
    }

    fn save_index(&self, index: &CacheIndex) -> Result<()> {
        let contents = serde_json::to_string(index)?;
        fs::write(self.index_path(), contents).context("failed to write cache index")
    }

    /// Body file name derived from the request key, so a re-put overwrites
    /// in place.
    fn body_file_name(url: &str) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        url.hash(&mut hasher);
        format!("{:016x}.bin", hasher.finish())
    }

    /// Store a response under the given request key (insert-or-replace).
    pub fn put(&self, url: &str, response: &CachedResponse) -> Result<()> {
        let file = Self::body_file_name(url);
        fs::write(self.dir.join(&file), &response.body)
            .with_context(|| format!("failed to write cached body for {url}"))?;

        let mut index = self.load_index()?;
        index.entries.retain(|e| e.url != url);
        index.entries.push(IndexEntry {
            url: url.to_string(),
            file,
            status: response.status,
            content_type: response.content_type.clone(),
        });
        self.save_index(&index)
    }

    /// Look up a cached response by request key.
    pub fn lookup(&self, url: &str) -> Result<Option<CachedResponse>> {
        let index = self.load_index()?;
        let Some(entry) = index.entries.iter().find(|e| e.url == url) else {
            return Ok(None);
        };
        let body = fs::read(self.dir.join(&entry.file))
            .with_context(|| format!("failed to read cached body for {url}"))?;
        Ok(Some(CachedResponse {
            status: entry.status,
            content_type: entry.content_type.clone(),
            body,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn response(body: &str) -> CachedResponse {
        CachedResponse {
            status: 200,
            content_type: Some("text/html".to_string()),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn put_then_lookup_round_trips() {
        let root = TempDir::new().unwrap();
        let storage = CacheStorage::open(root.path()).unwrap();
        let cache = storage.open_generation("gen-1").unwrap();

        cache.put("/index.html", &response("<html>")).unwrap();
        let hit = cache.lookup("/index.html").unwrap().unwrap();
        assert_eq!(hit, response("<html>"));
        assert!(cache.lookup("/missing.css").unwrap().is_none());
    }

    #[test]
    fn re_put_replaces_the_entry() {
        let root = TempDir::new().unwrap();
        let storage = CacheStorage::open(root.path()).unwrap();
        let cache = storage.open_generation("gen-1").unwrap();

        cache.put("/a", &response("old")).unwrap();
        cache.put("/a", &response("new")).unwrap();
        cache.put("/b", &response("other")).unwrap();

        assert_eq!(cache.lookup("/a").unwrap().unwrap().body, b"new");
        assert_eq!(cache.lookup("/b").unwrap().unwrap().body, b"other");
    }

    #[test]
    fn staging_is_invisible_until_committed() {
        let root = TempDir::new().unwrap();
        let storage = CacheStorage::open(root.path()).unwrap();

        let staging = storage.staging("gen-1").unwrap();
        staging.put("/a", &response("body")).unwrap();
        assert!(storage.generation_names().unwrap().is_empty());
        assert!(storage.generation("gen-1").is_none());

        storage.commit(staging, "gen-1").unwrap();
        assert_eq!(storage.generation_names().unwrap(), vec!["gen-1"]);
        let cache = storage.generation("gen-1").unwrap();
        assert_eq!(cache.lookup("/a").unwrap().unwrap().body, b"body");
    }

    #[test]
    fn discarded_staging_leaves_nothing_behind() {
        let root = TempDir::new().unwrap();
        let storage = CacheStorage::open(root.path()).unwrap();

        let staging = storage.staging("gen-1").unwrap();
        staging.put("/a", &response("body")).unwrap();
        storage.discard(staging).unwrap();

        assert!(storage.generation_names().unwrap().is_empty());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn delete_reports_existence() {
        let root = TempDir::new().unwrap();
        let storage = CacheStorage::open(root.path()).unwrap();
        storage.open_generation("gen-1").unwrap();

        assert!(storage.delete("gen-1").unwrap());
        assert!(!storage.delete("gen-1").unwrap());
    }
}
