// catalog.rs
use arc_swap::ArcSwap;
use async_trait::async_trait;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use thiserror::Error;
use tokio::{fs, sync::Mutex};
use tracing::{debug, error, info, warn};

/// Names starting with this marker are never served.
pub const HIDDEN_MARKER: char = '.';

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to scan catalog source {location}: {source}")]
    Scan {
        location: String,
        #[source]
        source: std::io::Error,
    },
    #[error("catalog source {location} contains no servable files")]
    Empty { location: String },
}

// --- File descriptor ---
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    name: String,
    size: u64,
    path: PathBuf,
}

impl FileEntry {
    pub fn new(name: impl Into<String>, size: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            size,
            path: path.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Where the bytes live on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// One immutable point-in-time view of the catalog. An entry's position
/// is its identity, and only within this snapshot.
#[derive(Debug, Default)]
pub struct CatalogSnapshot {
    generation: u64,
    entries: Vec<FileEntry>,
}

impl CatalogSnapshot {
    pub fn new(generation: u64, entries: Vec<FileEntry>) -> Self {
        Self { generation, entries }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FileEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }
}

// ──────────────────────────────────────────────────────
// CatalogSource trait
// ──────────────────────────────────────────────────────
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Lists every servable entry, in the order that defines the index space.
    async fn scan(&self) -> Result<Vec<FileEntry>, CatalogError>;

    /// Human readable location, used in logs and errors.
    fn describe(&self) -> String;
}

/// Serves the regular files of a single directory (no recursion).
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn scan_error(&self, source: std::io::Error) -> CatalogError {
        CatalogError::Scan {
            location: self.describe(),
            source,
        }
    }
}

#[async_trait]
impl CatalogSource for DirectorySource {
    async fn scan(&self) -> Result<Vec<FileEntry>, CatalogError> {
        let mut dir = fs::read_dir(&self.root)
            .await
            .map_err(|e| self.scan_error(e))?;

        let mut entries = Vec::new();
        while let Some(dir_entry) = dir.next_entry().await.map_err(|e| self.scan_error(e))? {
            let Some(name) = dir_entry.file_name().to_str().map(str::to_owned) else {
                warn!(path = %dir_entry.path().display(), "skipping non UTF-8 file name");
                continue;
            };
            if name.starts_with(HIDDEN_MARKER) {
                continue;
            }

            let path = dir_entry.path();
            // follow symlinks so linked images are served like regular ones
            let meta = match fs::metadata(&path).await {
                Ok(meta) => meta,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(path = %path.display(), "entry vanished during scan");
                    continue;
                }
                Err(e) => return Err(self.scan_error(e)),
            };
            if !meta.is_file() {
                continue;
            }

            entries.push(FileEntry::new(name, meta.len(), path));
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// A fixed list of entries.
pub struct StaticSource {
    entries: Vec<FileEntry>,
}

impl StaticSource {
    pub fn new(entries: Vec<FileEntry>) -> Self {
        Self { entries }
    }
}

#[async_trait]
impl CatalogSource for StaticSource {
    async fn scan(&self) -> Result<Vec<FileEntry>, CatalogError> {
        Ok(self.entries.clone())
    }

    fn describe(&self) -> String {
        format!("static({} entries)", self.entries.len())
    }
}

// ──────────────────────────────────────────────────────
// Catalog
// ──────────────────────────────────────────────────────
pub struct Catalog {
    source: Arc<dyn CatalogSource>,
    current: ArcSwap<CatalogSnapshot>,
    generation: AtomicU64,
    // Serializes reloads so an older scan never overwrites a newer one.
    reload_lock: Mutex<()>,
}

impl Catalog {
    /// Initial load. Any failure here means the process must not serve.
    pub async fn load(source: Arc<dyn CatalogSource>) -> Result<Self, CatalogError> {
        let entries = source.scan().await?;
        if entries.is_empty() {
            return Err(CatalogError::Empty {
                location: source.describe(),
            });
        }

        info!(source = %source.describe(), entries = entries.len(), "catalog loaded");
        Ok(Self {
            source,
            current: ArcSwap::from_pointee(CatalogSnapshot::new(1, entries)),
            generation: AtomicU64::new(1),
            reload_lock: Mutex::new(()),
        })
    }

    /// The snapshot in effect right now. Unaffected by later reloads.
    pub fn current(&self) -> Arc<CatalogSnapshot> {
        self.current.load_full()
    }

    /// Live reload. On failure the previous snapshot stays published and the
    /// error is returned for the caller to report. Returns the new size.
    pub async fn reload(&self) -> Result<usize, CatalogError> {
        let _guard = self.reload_lock.lock().await;

        let entries = match self.source.scan().await {
            Ok(entries) => entries,
            Err(e) => {
                error!(error = %e, "catalog reload failed; keeping previous snapshot");
                return Err(e);
            }
        };

        let previous = self.current.load();
        if entries.is_empty() && !previous.is_empty() {
            warn!(
                source = %self.source.describe(),
                previous_entries = previous.len(),
                "catalog reload found no servable files; keeping previous snapshot"
            );
            return Err(CatalogError::Empty {
                location: self.source.describe(),
            });
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let len = entries.len();
        self.current
            .store(Arc::new(CatalogSnapshot::new(generation, entries)));

        info!(generation, entries = len, "catalog reloaded");
        Ok(len)
    }

    pub fn describe(&self) -> String {
        self.source.describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use tempfile::tempdir;

    /// Source whose scan result can be swapped between calls.
    struct ScriptedSource {
        next: StdMutex<Option<Result<Vec<FileEntry>, std::io::ErrorKind>>>,
    }

    impl ScriptedSource {
        fn new(first: Vec<FileEntry>) -> Self {
            Self {
                next: StdMutex::new(Some(Ok(first))),
            }
        }

        fn set(&self, next: Result<Vec<FileEntry>, std::io::ErrorKind>) {
            *self.next.lock().unwrap() = Some(next);
        }
    }

    #[async_trait]
    impl CatalogSource for ScriptedSource {
        async fn scan(&self) -> Result<Vec<FileEntry>, CatalogError> {
            match self.next.lock().unwrap().clone().unwrap() {
                Ok(entries) => Ok(entries),
                Err(kind) => Err(CatalogError::Scan {
                    location: self.describe(),
                    source: std::io::Error::from(kind),
                }),
            }
        }

        fn describe(&self) -> String {
            "scripted".into()
        }
    }

    fn entries(names: &[&str]) -> Vec<FileEntry> {
        names
            .iter()
            .map(|n| FileEntry::new(*n, 1, format!("/tmp/{n}")))
            .collect()
    }

    #[tokio::test]
    async fn directory_scan_skips_hidden_entries_and_directories() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("b.bin"), b"bbbb").unwrap();
        std::fs::write(temp.path().join("a.bin"), b"aa").unwrap();
        std::fs::write(temp.path().join(".hidden"), b"x").unwrap();
        std::fs::create_dir(temp.path().join("nested")).unwrap();
        std::fs::write(temp.path().join("nested").join("c.bin"), b"c").unwrap();

        let found = DirectorySource::new(temp.path()).scan().await.unwrap();
        let names: Vec<_> = found.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["a.bin", "b.bin"]);
        assert_eq!(found[0].size(), 2);
        assert_eq!(found[1].size(), 4);
        assert_eq!(found[1].path(), temp.path().join("b.bin"));
    }

    #[tokio::test]
    async fn missing_directory_is_fatal_at_startup() {
        let temp = tempdir().unwrap();
        let source = Arc::new(DirectorySource::new(temp.path().join("missing")));
        let err = Catalog::load(source).await.err().unwrap();
        assert!(matches!(err, CatalogError::Scan { .. }));
    }

    #[tokio::test]
    async fn empty_directory_is_fatal_at_startup() {
        let temp = tempdir().unwrap();
        let source = Arc::new(DirectorySource::new(temp.path()));
        let err = Catalog::load(source).await.err().unwrap();
        assert!(matches!(err, CatalogError::Empty { .. }));
    }

    #[tokio::test]
    async fn reload_publishes_a_new_snapshot() {
        let source = Arc::new(ScriptedSource::new(entries(&["a", "b"])));
        let catalog = Catalog::load(source.clone()).await.unwrap();
        assert_eq!(catalog.current().len(), 2);
        assert_eq!(catalog.current().generation(), 1);

        source.set(Ok(entries(&["a", "b", "c"])));
        assert_eq!(catalog.reload().await.unwrap(), 3);
        let snap = catalog.current();
        assert_eq!(snap.len(), 3);
        assert_eq!(snap.generation(), 2);
        assert_eq!(snap.get(2).unwrap().name(), "c");
    }

    #[tokio::test]
    async fn captured_snapshot_survives_reload() {
        let source = Arc::new(ScriptedSource::new(entries(&["a", "b", "c", "d"])));
        let catalog = Catalog::load(source.clone()).await.unwrap();
        let before = catalog.current();

        source.set(Ok(entries(&["z"])));
        catalog.reload().await.unwrap();

        assert_eq!(before.len(), 4);
        assert_eq!(before.get(3).unwrap().name(), "d");
        assert_eq!(catalog.current().len(), 1);
    }

    #[tokio::test]
    async fn failed_reload_keeps_previous_snapshot() {
        let source = Arc::new(ScriptedSource::new(entries(&["a", "b"])));
        let catalog = Catalog::load(source.clone()).await.unwrap();

        source.set(Err(std::io::ErrorKind::PermissionDenied));
        assert!(matches!(
            catalog.reload().await,
            Err(CatalogError::Scan { .. })
        ));
        assert_eq!(catalog.current().len(), 2);
        assert_eq!(catalog.current().generation(), 1);
    }

    #[tokio::test]
    async fn empty_reload_keeps_previous_snapshot() {
        let source = Arc::new(ScriptedSource::new(entries(&["a"])));
        let catalog = Catalog::load(source.clone()).await.unwrap();

        source.set(Ok(Vec::new()));
        assert!(matches!(
            catalog.reload().await,
            Err(CatalogError::Empty { .. })
        ));
        assert_eq!(catalog.current().len(), 1);
    }

    #[tokio::test]
    async fn static_source_round_trips_entries() {
        let source = Arc::new(StaticSource::new(entries(&["x", "y"])));
        let catalog = Catalog::load(source).await.unwrap();
        assert_eq!(catalog.current().entries(), entries(&["x", "y"]).as_slice());
        assert_eq!(catalog.describe(), "static(2 entries)");
    }
}
