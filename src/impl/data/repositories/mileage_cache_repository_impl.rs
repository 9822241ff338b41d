use std::{path::Path, sync::Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fractic_server_error::ServerError;
use tracing::{debug, info, warn};

use crate::{
    config::CacheStoreConfig,
    data::{
        datasources::mileage_sqlite_datasource::{MileageSqliteDatasource, NewMileageEntry},
        models::cache_sync_metadata_model::CacheSyncMetadataModel,
    },
    domain::repositories::mileage_cache_repository::MileageCacheRepository,
    entities::{
        CacheKey, CacheSyncMetadata, CloseOutcome, DistanceResolver, MileageCacheEntry,
        MileageCacheEntryId, OverrideUpdate, RemoteMirror, SyncConflictResolver, SyncDecision,
        SyncPhase,
    },
    errors::{
        CacheDatabaseError, CacheEntryNotFound, CacheStoreClosed, InvalidCacheMetadata,
        ReadError, SyncAborted, WriteError,
    },
};

/// SQLite-backed mileage cache mirrored to a remote object store.
///
/// `open` pulls the remote snapshot over the local file before anything is
/// read, and `close` pushes the file back together with fresh metadata. A
/// store that could not download its snapshot is local-only and never
/// uploads, so a stale local file cannot overwrite the remote copy.
pub struct MileageCacheStore<M, D, S>
where
    M: RemoteMirror,
    D: DistanceResolver,
    S: SyncConflictResolver,
{
    config: CacheStoreConfig,
    mirror: M,
    distance: D,
    resolver: S,
    db: Mutex<Option<MileageSqliteDatasource>>,
    remote_metadata: Option<CacheSyncMetadata>,
    local_only: bool,
}

/// Remote state fetched during open. `None` fields mean the object does not
/// exist on the mirror yet.
struct RemoteSnapshot {
    database: Option<Vec<u8>>,
    metadata: Option<CacheSyncMetadata>,
}

impl<M, D, S> MileageCacheStore<M, D, S>
where
    M: RemoteMirror,
    D: DistanceResolver,
    S: SyncConflictResolver,
{
    pub async fn open(
        config: CacheStoreConfig,
        mirror: M,
        distance: D,
        resolver: S,
    ) -> Result<Self, ServerError> {
        config.validate()?;
        if let Some(dir) = config.local_db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| WriteError::with_debug(&e))?;
        }

        let (local_only, remote_metadata) = loop {
            let error = match Self::download(&config, &mirror).await {
                Ok(snapshot) => {
                    if let Some(metadata) = &snapshot.metadata {
                        write_metadata(&config, metadata).await?;
                    }
                    if let Some(bytes) = snapshot.database {
                        replace_atomically(&config.local_db_path, &bytes).await?;
                        info!(
                            object = %config.remote_db_object,
                            bytes = bytes.len(),
                            version = snapshot.metadata.as_ref().map(|m| m.version),
                            "restored mileage cache from remote mirror"
                        );
                    } else {
                        info!(
                            object = %config.remote_db_object,
                            "no remote mileage cache yet, using local database"
                        );
                    }
                    break (false, snapshot.metadata);
                }
                Err(e) => e,
            };
            match resolver.decide(SyncPhase::Download, &error).await {
                SyncDecision::Retry => {
                    warn!(error = ?error, "mileage cache download failed, retrying");
                }
                SyncDecision::Continue => {
                    warn!(
                        error = ?error,
                        "mileage cache download failed, continuing local-only; \
                         changes from this session will not be uploaded"
                    );
                    break (true, None);
                }
                SyncDecision::Abort => {
                    return Err(SyncAborted::with_debug(
                        &SyncPhase::Download.to_string(),
                        &error,
                    ));
                }
            }
        };

        let db = MileageSqliteDatasource::open(&config.local_db_path)?;
        Ok(Self {
            config,
            mirror,
            distance,
            resolver,
            db: Mutex::new(Some(db)),
            remote_metadata,
            local_only,
        })
    }

    /// True if the remote snapshot could not be downloaded on open.
    pub fn is_local_only(&self) -> bool {
        self.local_only
    }

    /// Ends the session. On `Aborted` the store stays usable and `close` may
    /// be called again; every other outcome releases the database, after
    /// which all operations fail with `CacheStoreClosed`.
    pub async fn close(&mut self) -> Result<CloseOutcome, ServerError> {
        self.with_db(|_| Ok(()))?;

        if self.local_only {
            self.release()?;
            warn!(
                path = %self.config.local_db_path.display(),
                "mileage cache was local-only, changes were not uploaded"
            );
            return Ok(CloseOutcome::NotSynced);
        }

        let (metadata, metadata_json) = self.write_local_metadata().await?;
        let database = tokio::fs::read(&self.config.local_db_path)
            .await
            .map_err(|e| ReadError::with_debug(&e))?;

        loop {
            let error = match self.upload(&database, &metadata_json).await {
                Ok(()) => {
                    self.release()?;
                    info!(
                        version = metadata.version,
                        bytes = metadata.file_size,
                        "uploaded mileage cache to remote mirror"
                    );
                    self.remote_metadata = Some(metadata.clone());
                    return Ok(CloseOutcome::Synced(metadata));
                }
                Err(e) => e,
            };
            match self.resolver.decide(SyncPhase::Upload, &error).await {
                SyncDecision::Retry => {
                    warn!(error = ?error, "mileage cache upload failed, retrying");
                }
                SyncDecision::Continue => {
                    self.release()?;
                    warn!(
                        error = ?error,
                        "mileage cache closed without remote backup"
                    );
                    return Ok(CloseOutcome::ClosedWithoutBackup);
                }
                SyncDecision::Abort => {
                    warn!(error = ?error, "mileage cache upload aborted, store left open");
                    return Ok(CloseOutcome::Aborted);
                }
            }
        }
    }

    // Synchronization helpers.
    // ---

    async fn download(config: &CacheStoreConfig, mirror: &M) -> Result<RemoteSnapshot, ServerError> {
        let database = mirror.download(&config.remote_db_object).await?;
        let metadata = match mirror.download(&config.remote_metadata_object).await? {
            Some(bytes) => Some(parse_metadata(&config.remote_metadata_object, &bytes)?),
            None => None,
        };
        Ok(RemoteSnapshot { database, metadata })
    }

    async fn upload(&self, database: &[u8], metadata_json: &[u8]) -> Result<(), ServerError> {
        self.mirror
            .upload(&self.config.remote_db_object, database.to_vec())
            .await?;
        self.mirror
            .upload(&self.config.remote_metadata_object, metadata_json.to_vec())
            .await
    }

    /// Computes the next metadata from the local file and writes it next to
    /// the database.
    async fn write_local_metadata(&self) -> Result<(CacheSyncMetadata, Vec<u8>), ServerError> {
        let file = tokio::fs::metadata(&self.config.local_db_path)
            .await
            .map_err(|e| ReadError::with_debug(&e))?;
        let last_modified: DateTime<Utc> = file
            .modified()
            .map(DateTime::from)
            .unwrap_or_else(|_| Utc::now());
        let metadata =
            CacheSyncMetadata::next(self.remote_metadata.as_ref(), last_modified, file.len());
        let json = write_metadata(&self.config, &metadata).await?;
        Ok((metadata, json))
    }

    // Database access.
    // ---

    /// Statements run inline on the calling task and the lock is released
    /// before returning, so it is never held across an await. Not wrapped in
    /// `block_in_place`, which panics on a current-thread runtime.
    fn with_db<T, F>(&self, f: F) -> Result<T, ServerError>
    where
        F: FnOnce(&MileageSqliteDatasource) -> Result<T, ServerError>,
    {
        let guard = self
            .db
            .lock()
            .map_err(|e| CacheDatabaseError::with_debug("lock", &e.to_string()))?;
        let db = guard.as_ref().ok_or_else(|| CacheStoreClosed::new())?;
        f(db)
    }

    fn release(&self) -> Result<(), ServerError> {
        let db = self
            .db
            .lock()
            .map_err(|e| CacheDatabaseError::with_debug("lock", &e.to_string()))?
            .take()
            .ok_or_else(|| CacheStoreClosed::new())?;
        db.close()
    }

    /// Distance for one leg, falling back to the reported value if the
    /// oracle cannot answer.
    async fn resolve_leg(&self, leg: &str, from: &str, to: &str, fallback: f64) -> f64 {
        if from.is_empty() || to.is_empty() {
            warn!(leg, from, to, "incomplete addresses, using reported mileage");
            return fallback;
        }
        match self.distance.distance_miles(from, to).await {
            Ok(miles) if miles.is_finite() && miles >= 0.0 => miles,
            Ok(miles) => {
                warn!(leg, from, to, miles, "distance oracle returned an unusable value, using reported mileage");
                fallback
            }
            Err(e) => {
                warn!(leg, from, to, error = ?e, "distance oracle unavailable, using reported mileage");
                fallback
            }
        }
    }
}

#[async_trait]
impl<M, D, S> MileageCacheRepository for MileageCacheStore<M, D, S>
where
    M: RemoteMirror,
    D: DistanceResolver,
    S: SyncConflictResolver,
{
    async fn find_entry(&self, key: &CacheKey) -> Result<Option<MileageCacheEntry>, ServerError> {
        self.with_db(|db| db.find(key))
    }

    async fn create_entry(
        &self,
        key: &CacheKey,
        source_miles: f64,
        source_dead_miles: f64,
    ) -> Result<MileageCacheEntry, ServerError> {
        self.with_db(|_| Ok(()))?;
        let resolved_miles = self
            .resolve_leg("trip", key.pickup_address(), key.dropoff_address(), source_miles)
            .await;
        let resolved_dead_miles = self
            .resolve_leg(
                "dead",
                &self.config.company_address,
                key.pickup_address(),
                source_dead_miles,
            )
            .await;
        let entry = self.with_db(|db| {
            db.insert(NewMileageEntry {
                key,
                source_miles,
                resolved_miles,
                source_dead_miles,
                resolved_dead_miles,
            })
        })?;
        debug!(
            id = entry.id.0,
            last_name = key.last_name(),
            first_name = key.first_name(),
            source_miles,
            resolved_miles,
            source_dead_miles,
            resolved_dead_miles,
            "created mileage cache entry"
        );
        Ok(entry)
    }

    async fn update_override(
        &self,
        id: MileageCacheEntryId,
        update: OverrideUpdate,
    ) -> Result<MileageCacheEntry, ServerError> {
        let entry = self
            .with_db(|db| db.update_override(id, update))?
            .ok_or_else(|| CacheEntryNotFound::new(id.0))?;
        info!(
            id = id.0,
            override_miles = update.override_miles,
            override_dead_miles = update.override_dead_miles,
            "updated mileage override"
        );
        Ok(entry)
    }

    async fn list_entries(&self) -> Result<Vec<MileageCacheEntry>, ServerError> {
        self.with_db(|db| db.list())
    }
}

// --

fn parse_metadata(object: &str, bytes: &[u8]) -> Result<CacheSyncMetadata, ServerError> {
    let model: CacheSyncMetadataModel =
        serde_json::from_slice(bytes).map_err(|e| InvalidCacheMetadata::with_debug(object, &e))?;
    model.try_into()
}

/// Writes `metadata` next to the local database and returns the JSON bytes.
async fn write_metadata(
    config: &CacheStoreConfig,
    metadata: &CacheSyncMetadata,
) -> Result<Vec<u8>, ServerError> {
    let json = serde_json::to_vec_pretty(&CacheSyncMetadataModel::from(metadata))
        .map_err(|e| CacheDatabaseError::with_debug("serialize metadata", &e))?;
    tokio::fs::write(config.local_metadata_path(), &json)
        .await
        .map_err(|e| WriteError::with_debug(&e))?;
    Ok(json)
}

/// Writes to a sibling temp file first, so an interrupted transfer never
/// leaves a truncated database behind.
async fn replace_atomically(path: &Path, bytes: &[u8]) -> Result<(), ServerError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".download");
    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| WriteError::with_debug(&e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| WriteError::with_debug(&e))
}

#[cfg(test)]
mod tests {
    use std::{
        collections::{HashMap, VecDeque},
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };

    use tempfile::TempDir;

    use super::*;
    use crate::errors::{DistanceUnavailable, SyncUnavailable};

    /// In-memory mirror that can be told to fail a number of transfers.
    #[derive(Clone, Default)]
    struct FakeMirror {
        objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
        failing_downloads: Arc<AtomicUsize>,
        failing_uploads: Arc<AtomicUsize>,
        uploads: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RemoteMirror for FakeMirror {
        async fn download(&self, object: &str) -> Result<Option<Vec<u8>>, ServerError> {
            if take_failure(&self.failing_downloads) {
                return Err(SyncUnavailable::new("download", object));
            }
            Ok(self.objects.lock().unwrap().get(object).cloned())
        }

        async fn upload(&self, object: &str, bytes: Vec<u8>) -> Result<(), ServerError> {
            if take_failure(&self.failing_uploads) {
                return Err(SyncUnavailable::new("upload", object));
            }
            self.uploads.fetch_add(1, Ordering::SeqCst);
            self.objects.lock().unwrap().insert(object.to_string(), bytes);
            Ok(())
        }
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Answers with a queue of decisions, then `Continue`.
    #[derive(Clone, Default)]
    struct ScriptedResolver {
        decisions: Arc<Mutex<VecDeque<SyncDecision>>>,
        asked: Arc<AtomicUsize>,
    }

    impl ScriptedResolver {
        fn with(decisions: &[SyncDecision]) -> Self {
            Self {
                decisions: Arc::new(Mutex::new(decisions.iter().copied().collect())),
                asked: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl SyncConflictResolver for ScriptedResolver {
        async fn decide(&self, _phase: SyncPhase, _error: &ServerError) -> SyncDecision {
            self.asked.fetch_add(1, Ordering::SeqCst);
            self.decisions
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(SyncDecision::Continue)
        }
    }

    /// 11.6 miles for any trip, 14.4 from the depot, unless disabled.
    struct FakeDistance {
        available: bool,
    }

    #[async_trait]
    impl DistanceResolver for FakeDistance {
        async fn distance_miles(&self, from: &str, to: &str) -> Result<f64, ServerError> {
            if !self.available {
                return Err(DistanceUnavailable::new(from, to));
            }
            Ok(if from == "1 DEPOT RD" { 14.4 } else { 11.6 })
        }
    }

    fn config(dir: &TempDir) -> CacheStoreConfig {
        CacheStoreConfig {
            local_db_path: dir.path().join("cache").join("mileage_cache.db"),
            company_address: "1 DEPOT RD".to_string(),
            ..CacheStoreConfig::default()
        }
    }

    async fn open(
        dir: &TempDir,
        mirror: &FakeMirror,
        resolver: &ScriptedResolver,
    ) -> Result<MileageCacheStore<FakeMirror, FakeDistance, ScriptedResolver>, ServerError> {
        MileageCacheStore::open(
            config(dir),
            mirror.clone(),
            FakeDistance { available: true },
            resolver.clone(),
        )
        .await
    }

    fn trip() -> CacheKey {
        CacheKey::new("Doe", "Jane", "10 Main Street", "20 Clinic Road")
    }

    #[tokio::test]
    async fn missing_remote_snapshot_starts_fresh_and_syncs_version_one() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = FakeMirror::default();
        let resolver = ScriptedResolver::default();

        let mut store = open(&dir, &mirror, &resolver).await.unwrap();
        assert!(!store.is_local_only());
        let entry = store.find_or_create(&trip(), 9.0, 3.0).await.unwrap();
        assert_eq!(entry.resolved_mileage(), 12);
        assert_eq!(entry.resolved_dead_mileage(), 14);

        let metadata = match store.close().await.unwrap() {
            CloseOutcome::Synced(metadata) => metadata,
            other => panic!("expected a synced close, got {:?}", other),
        };
        assert_eq!(metadata.version, 1);
        assert_eq!(resolver.asked.load(Ordering::SeqCst), 0);

        let objects = mirror.objects.lock().unwrap();
        let database = &objects["mileage_cache.db"];
        assert_eq!(metadata.file_size, database.len() as u64);
        let remote: serde_json::Value =
            serde_json::from_slice(&objects["mileage_cache_metadata.json"]).unwrap();
        assert_eq!(remote["version"], 1);
        assert!(dir.path().join("cache/mileage_cache_metadata.json").exists());
    }

    #[tokio::test]
    async fn reopen_restores_remote_entries_and_bumps_version() {
        let mirror = FakeMirror::default();
        let resolver = ScriptedResolver::default();

        let first_dir = tempfile::tempdir().unwrap();
        let mut store = open(&first_dir, &mirror, &resolver).await.unwrap();
        let created = store.find_or_create(&trip(), 9.0, 3.0).await.unwrap();
        store.close().await.unwrap();

        // A different machine with an empty working directory.
        let second_dir = tempfile::tempdir().unwrap();
        let mut store = open(&second_dir, &mirror, &resolver).await.unwrap();
        let local: serde_json::Value = serde_json::from_slice(
            &std::fs::read(second_dir.path().join("cache/mileage_cache_metadata.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(local["version"], 1);
        let found = store
            .find_entry(&CacheKey::new("DOE", "JANE", "10 main st", "20 clinic rd"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);

        match store.close().await.unwrap() {
            CloseOutcome::Synced(metadata) => assert_eq!(metadata.version, 2),
            other => panic!("expected a synced close, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn local_only_store_never_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = FakeMirror::default();
        mirror.failing_downloads.store(1, Ordering::SeqCst);
        let resolver = ScriptedResolver::with(&[SyncDecision::Continue]);

        let mut store = open(&dir, &mirror, &resolver).await.unwrap();
        assert!(store.is_local_only());
        store.find_or_create(&trip(), 9.0, 3.0).await.unwrap();

        assert_eq!(store.close().await.unwrap(), CloseOutcome::NotSynced);
        assert_eq!(mirror.uploads.load(Ordering::SeqCst), 0);
        assert!(mirror.objects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn aborted_download_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = FakeMirror::default();
        mirror.failing_downloads.store(1, Ordering::SeqCst);
        let resolver = ScriptedResolver::with(&[SyncDecision::Abort]);

        assert!(open(&dir, &mirror, &resolver).await.is_err());
        assert!(!dir.path().join("cache/mileage_cache.db").exists());
    }

    #[tokio::test]
    async fn retried_download_succeeds_once_mirror_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = FakeMirror::default();
        mirror.failing_downloads.store(2, Ordering::SeqCst);
        let resolver = ScriptedResolver::with(&[SyncDecision::Retry, SyncDecision::Retry]);

        let store = open(&dir, &mirror, &resolver).await.unwrap();
        assert!(!store.is_local_only());
        assert_eq!(resolver.asked.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn aborted_upload_keeps_store_open_for_another_close() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = FakeMirror::default();
        let resolver = ScriptedResolver::with(&[SyncDecision::Abort]);
        let mut store = open(&dir, &mirror, &resolver).await.unwrap();
        store.find_or_create(&trip(), 9.0, 3.0).await.unwrap();

        mirror.failing_uploads.store(1, Ordering::SeqCst);
        assert_eq!(store.close().await.unwrap(), CloseOutcome::Aborted);
        assert_eq!(store.list_entries().await.unwrap().len(), 1);

        assert!(matches!(
            store.close().await.unwrap(),
            CloseOutcome::Synced(_)
        ));
    }

    #[tokio::test]
    async fn continued_upload_failure_closes_without_backup() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = FakeMirror::default();
        let resolver = ScriptedResolver::with(&[SyncDecision::Continue]);
        let mut store = open(&dir, &mirror, &resolver).await.unwrap();

        mirror.failing_uploads.store(1, Ordering::SeqCst);
        assert_eq!(
            store.close().await.unwrap(),
            CloseOutcome::ClosedWithoutBackup
        );
        assert_eq!(mirror.uploads.load(Ordering::SeqCst), 0);
        assert!(store.find_entry(&trip()).await.is_err());
        assert!(store.close().await.is_err());
    }

    #[tokio::test]
    async fn unavailable_oracle_falls_back_to_reported_miles() {
        let dir = tempfile::tempdir().unwrap();
        let store = MileageCacheStore::open(
            config(&dir),
            FakeMirror::default(),
            FakeDistance { available: false },
            ScriptedResolver::default(),
        )
        .await
        .unwrap();

        let entry = store.create_entry(&trip(), 9.4, 3.0).await.unwrap();
        assert_eq!(entry.resolved_miles, 9.4);
        assert_eq!(entry.resolved_dead_miles, 3.0);
        assert_eq!(entry.resolved_mileage(), 9);
    }

    #[tokio::test]
    async fn override_outranks_resolved_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir, &FakeMirror::default(), &ScriptedResolver::default())
            .await
            .unwrap();
        let entry = store.create_entry(&trip(), 9.0, 3.0).await.unwrap();

        let updated = store
            .update_override(
                entry.id,
                OverrideUpdate {
                    override_miles: Some(4.0),
                    override_dead_miles: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.resolved_mileage(), 4);
        assert!(updated.has_mileage_override());
        assert_eq!(updated.resolved_dead_mileage(), 14);

        let missing = store
            .update_override(MileageCacheEntryId(404), OverrideUpdate::default())
            .await;
        assert!(missing.is_err());
    }
}
