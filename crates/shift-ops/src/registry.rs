//! Persistent registry of running copy jobs.
//!
//! Every job that reaches `JobQueued` is recorded so that it can be resumed
//! after the process exits. The registry is a single JSON array stored under
//! [`RUNNING_JOBS_KEY`].

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use shift_core::{CopyJobHandle, CopyJobRequest, ShiftError, ShiftResult, Site};
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

/// Storage key of the running-jobs array.
pub const RUNNING_JOBS_KEY: &str = "y365RunningJobs";

/// A store of named JSON blobs.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> ShiftResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> ShiftResult<()>;
    fn remove(&self, key: &str) -> ShiftResult<()>;
}

/// One file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> ShiftResult<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ShiftError::storage(path, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> ShiftResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| ShiftError::storage(&self.dir, e))?;

        // Write to a sibling file first so readers never see a torn blob.
        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        let mut file = fs::File::create(&tmp).map_err(|e| ShiftError::storage(&tmp, e))?;
        file.write_all(value.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| ShiftError::storage(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| ShiftError::storage(&path, e))
    }

    fn remove(&self, key: &str) -> ShiftResult<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ShiftError::storage(path, e)),
        }
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map is still a valid map.
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> ShiftResult<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ShiftResult<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ShiftResult<()> {
        self.lock().remove(key);
        Ok(())
    }
}

/// A persisted running job.
///
/// `copy_job_info` includes the job's encryption key in cleartext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    pub copy_job_info: CopyJobHandle,
    /// Site the job was submitted to and is polled on.
    pub site: Site,
    pub request: CopyJobRequest,
    pub submitted_at: DateTime<Utc>,
}

impl RegistryEntry {
    pub fn new(site: Site, copy_job_info: CopyJobHandle, request: CopyJobRequest) -> Self {
        Self {
            copy_job_info,
            site,
            request,
            submitted_at: Utc::now(),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.copy_job_info.job_id
    }
}

/// Running jobs keyed by job id.
///
/// Read-modify-write cycles are serialised within the process and run on
/// the blocking pool. Two processes sharing a store can still overwrite
/// each other's changes.
pub struct JobRegistry {
    store: Arc<dyn KeyValueStore>,
    lock: AsyncMutex<()>,
}

impl std::fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRegistry").finish_non_exhaustive()
    }
}

impl JobRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            lock: AsyncMutex::new(()),
        }
    }

    /// All persisted entries, oldest first.
    pub async fn entries(&self) -> ShiftResult<Vec<RegistryEntry>> {
        self.with_store(|store| Ok(load(store)?.into_values().collect()))
            .await
    }

    pub async fn contains(&self, job_id: &str) -> ShiftResult<bool> {
        let job_id = job_id.to_string();
        self.with_store(move |store| Ok(load(store)?.contains_key(&job_id)))
            .await
    }

    /// Record an entry, replacing any entry with the same job id.
    pub async fn insert(&self, entry: RegistryEntry) -> ShiftResult<()> {
        debug!(job_id = entry.job_id(), "registering job");
        self.with_store(move |store| {
            let mut entries = load(store)?;
            entries.insert(entry.job_id().to_string(), entry);
            save(store, &entries)
        })
        .await
    }

    /// Remove the entry for `job_id`. Returns whether one was present.
    pub async fn remove(&self, job_id: &str) -> ShiftResult<bool> {
        let job_id = job_id.to_string();
        self.with_store(move |store| {
            let mut entries = load(store)?;
            if entries.shift_remove(&job_id).is_none() {
                return Ok(false);
            }
            debug!(job_id = %job_id, "unregistering job");
            save(store, &entries)?;
            Ok(true)
        })
        .await
    }

    /// Drop every entry. Returns how many were removed.
    pub async fn clear(&self) -> ShiftResult<usize> {
        self.with_store(|store| {
            let count = load(store)?.len();
            store.remove(RUNNING_JOBS_KEY)?;
            Ok(count)
        })
        .await
    }

    /// Run `op` against the store on the blocking pool, holding the registry lock.
    async fn with_store<T, F>(&self, op: F) -> ShiftResult<T>
    where
        F: FnOnce(&dyn KeyValueStore) -> ShiftResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let _guard = self.lock.lock().await;
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .map_err(|e| ShiftError::storage(RUNNING_JOBS_KEY, std::io::Error::other(e)))?
    }
}

fn load(store: &dyn KeyValueStore) -> ShiftResult<IndexMap<String, RegistryEntry>> {
    let Some(text) = store.get(RUNNING_JOBS_KEY)? else {
        return Ok(IndexMap::new());
    };
    if text.trim().is_empty() {
        return Ok(IndexMap::new());
    }
    let list: Vec<RegistryEntry> = serde_json::from_str(&text)?;
    Ok(list
        .into_iter()
        .map(|entry| (entry.job_id().to_string(), entry))
        .collect())
}

fn save(store: &dyn KeyValueStore, entries: &IndexMap<String, RegistryEntry>) -> ShiftResult<()> {
    if entries.is_empty() {
        return store.remove(RUNNING_JOBS_KEY);
    }
    let list: Vec<&RegistryEntry> = entries.values().collect();
    store.set(RUNNING_JOBS_KEY, &serde_json::to_string(&list)?)
}

#[cfg(test)]
mod tests {
    use shift_core::ConflictPolicy;

    use super::*;

    fn entry(job_id: &str) -> RegistryEntry {
        let site = Site::parse("https://contoso.example/sites/hr").unwrap();
        RegistryEntry::new(
            site,
            CopyJobHandle {
                job_id: job_id.to_string(),
                encryption_key: "secret".to_string(),
                job_queue_uri: "https://queue.example/q".to_string(),
            },
            CopyJobRequest::new(
                vec!["https://contoso.example/sites/hr/Docs/a.txt".to_string()],
                "https://contoso.example/sites/hr/Archive",
                ConflictPolicy::Fail,
            ),
        )
    }

    #[tokio::test]
    async fn test_insert_and_remove_by_job_id() {
        let store = Arc::new(MemoryStore::new());
        let registry = JobRegistry::new(store.clone());

        registry.insert(entry("job-1")).await.unwrap();
        registry.insert(entry("job-2")).await.unwrap();
        registry.insert(entry("job-1")).await.unwrap();

        let ids: Vec<String> = registry
            .entries()
            .await
            .unwrap()
            .iter()
            .map(|e| e.job_id().to_string())
            .collect();
        assert_eq!(ids, vec!["job-1", "job-2"]);

        assert!(registry.remove("job-1").await.unwrap());
        assert!(!registry.remove("job-1").await.unwrap());
        assert!(registry.contains("job-2").await.unwrap());

        assert!(registry.remove("job-2").await.unwrap());
        assert_eq!(store.get(RUNNING_JOBS_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_blob_format() {
        let store = Arc::new(MemoryStore::new());
        let registry = JobRegistry::new(store.clone());
        registry.insert(entry("job-1")).await.unwrap();

        let blob = store.get(RUNNING_JOBS_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&blob).unwrap();
        let first = &value.as_array().unwrap()[0];
        assert_eq!(first["copyJobInfo"]["JobId"], "job-1");
        assert_eq!(first["copyJobInfo"]["EncryptionKey"], "secret");
        assert_eq!(
            first["request"]["destinationUri"],
            "https://contoso.example/sites/hr/Archive"
        );
        assert!(first["submittedAt"].is_string());
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();

        let registry = JobRegistry::new(Arc::new(FileStore::new(dir.path())));
        registry.insert(entry("job-9")).await.unwrap();
        drop(registry);

        let reopened = JobRegistry::new(Arc::new(FileStore::new(dir.path())));
        let entries = reopened.entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].job_id(), "job-9");

        assert_eq!(reopened.clear().await.unwrap(), 1);
        assert!(reopened.entries().await.unwrap().is_empty());
        assert!(!dir.path().join("y365RunningJobs.json").exists());
    }

    #[test]
    fn test_file_store_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));
        assert_eq!(store.get("absent").unwrap(), None);
        store.remove("absent").unwrap();
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    /// Records the thread each store call runs on.
    #[derive(Default)]
    struct ThreadRecordingStore {
        inner: MemoryStore,
        threads: Mutex<Vec<std::thread::ThreadId>>,
    }

    impl ThreadRecordingStore {
        fn note(&self) {
            self.threads.lock().unwrap().push(std::thread::current().id());
        }
    }

    impl KeyValueStore for ThreadRecordingStore {
        fn get(&self, key: &str) -> ShiftResult<Option<String>> {
            self.note();
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> ShiftResult<()> {
            self.note();
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> ShiftResult<()> {
            self.note();
            self.inner.remove(key)
        }
    }

    #[tokio::test]
    async fn test_store_calls_leave_the_async_thread() {
        let store = Arc::new(ThreadRecordingStore::default());
        let registry = JobRegistry::new(store.clone());

        registry.insert(entry("job-1")).await.unwrap();
        assert!(registry.contains("job-1").await.unwrap());
        assert!(registry.remove("job-1").await.unwrap());

        let runtime_thread = std::thread::current().id();
        let threads = store.threads.lock().unwrap();
        assert!(threads.len() >= 4);
        assert!(threads.iter().all(|id| *id != runtime_thread));
    }

    #[test]
    fn test_debug_hides_key() {
        let rendered = format!("{:?}", entry("job-1"));
        assert!(rendered.contains("job-1"));
        assert!(!rendered.contains("secret"));
    }
}
