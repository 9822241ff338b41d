use std::path::Path;

use chrono::Utc;
use fractic_server_error::ServerError;
use rusqlite::{params, Connection, OptionalExtension as _};

use crate::{
    data::models::mileage_cache_entry_model::MileageCacheEntryModel,
    entities::{CacheKey, MileageCacheEntry, MileageCacheEntryId, OverrideUpdate},
    errors::CacheDatabaseError,
};

// The database file is uploaded as a single object, so the rollback journal
// must stay in DELETE mode (a WAL would hold committed rows outside the file).
const SCHEMA: &str = "
    PRAGMA journal_mode = DELETE;
    CREATE TABLE IF NOT EXISTS mileage_cache (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        passenger_last_name TEXT NOT NULL,
        passenger_first_name TEXT NOT NULL,
        PU_address TEXT NOT NULL,
        DO_address TEXT NOT NULL,
        RG_miles REAL NOT NULL,
        Google_miles REAL NOT NULL,
        overwrite_miles REAL,
        RG_dead_miles REAL NOT NULL,
        Google_dead_miles REAL NOT NULL,
        overwrite_dead_miles REAL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE UNIQUE INDEX IF NOT EXISTS mileage_cache_lookup
        ON mileage_cache (passenger_last_name, passenger_first_name, PU_address, DO_address);
";

/// Values written once when an entry is created.
pub(crate) struct NewMileageEntry<'a> {
    pub key: &'a CacheKey,
    pub source_miles: f64,
    pub resolved_miles: f64,
    pub source_dead_miles: f64,
    pub resolved_dead_miles: f64,
}

pub(crate) struct MileageSqliteDatasource {
    conn: Connection,
}

fn db_error(operation: &str) -> impl Fn(rusqlite::Error) -> ServerError + '_ {
    move |e| CacheDatabaseError::with_debug(operation, &e)
}

impl MileageSqliteDatasource {
    pub(crate) fn open<P: AsRef<Path>>(path: P) -> Result<Self, ServerError> {
        let conn = Connection::open(path).map_err(db_error("open"))?;
        conn.execute_batch(SCHEMA).map_err(db_error("migrate"))?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self, ServerError> {
        let conn = Connection::open_in_memory().map_err(db_error("open"))?;
        conn.execute_batch(SCHEMA).map_err(db_error("migrate"))?;
        Ok(Self { conn })
    }

    pub(crate) fn find(&self, key: &CacheKey) -> Result<Option<MileageCacheEntry>, ServerError> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM mileage_cache WHERE passenger_last_name = ?1 \
                     AND passenger_first_name = ?2 AND PU_address = ?3 AND DO_address = ?4",
                    MileageCacheEntryModel::COLUMNS
                ),
                params![
                    key.last_name(),
                    key.first_name(),
                    key.pickup_address(),
                    key.dropoff_address()
                ],
                MileageCacheEntryModel::from_row,
            )
            .optional()
            .map_err(db_error("find"))?
            .map(MileageCacheEntry::try_from)
            .transpose()
    }

    pub(crate) fn get(&self, id: MileageCacheEntryId) -> Result<Option<MileageCacheEntry>, ServerError> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM mileage_cache WHERE id = ?1",
                    MileageCacheEntryModel::COLUMNS
                ),
                params![id.0],
                MileageCacheEntryModel::from_row,
            )
            .optional()
            .map_err(db_error("get"))?
            .map(MileageCacheEntry::try_from)
            .transpose()
    }

    pub(crate) fn insert(&self, entry: NewMileageEntry<'_>) -> Result<MileageCacheEntry, ServerError> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO mileage_cache (passenger_last_name, passenger_first_name, \
                 PU_address, DO_address, RG_miles, Google_miles, overwrite_miles, \
                 RG_dead_miles, Google_dead_miles, overwrite_dead_miles, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7, ?8, NULL, ?9, ?9)",
                params![
                    entry.key.last_name(),
                    entry.key.first_name(),
                    entry.key.pickup_address(),
                    entry.key.dropoff_address(),
                    entry.source_miles,
                    entry.resolved_miles,
                    entry.source_dead_miles,
                    entry.resolved_dead_miles,
                    now,
                ],
            )
            .map_err(db_error("insert"))?;
        let id = MileageCacheEntryId(self.conn.last_insert_rowid());
        self.get(id)?
            .ok_or_else(|| CacheDatabaseError::new("read back inserted entry"))
    }

    /// Returns `None` if no entry has the given id.
    pub(crate) fn update_override(
        &self,
        id: MileageCacheEntryId,
        update: OverrideUpdate,
    ) -> Result<Option<MileageCacheEntry>, ServerError> {
        let changed = self
            .conn
            .execute(
                "UPDATE mileage_cache SET overwrite_miles = ?1, overwrite_dead_miles = ?2, \
                 updated_at = ?3 WHERE id = ?4",
                params![
                    update.override_miles,
                    update.override_dead_miles,
                    Utc::now().to_rfc3339(),
                    id.0
                ],
            )
            .map_err(db_error("update override"))?;
        if changed == 0 {
            return Ok(None);
        }
        self.get(id)
    }

    pub(crate) fn list(&self) -> Result<Vec<MileageCacheEntry>, ServerError> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {} FROM mileage_cache \
                 ORDER BY passenger_last_name, passenger_first_name, id",
                MileageCacheEntryModel::COLUMNS
            ))
            .map_err(db_error("list"))?;
        let models = stmt
            .query_map([], MileageCacheEntryModel::from_row)
            .map_err(db_error("list"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_error("list"))?;
        models.into_iter().map(MileageCacheEntry::try_from).collect()
    }

    pub(crate) fn close(self) -> Result<(), ServerError> {
        self.conn
            .close()
            .map_err(|(_, e)| CacheDatabaseError::with_debug("close", &e))
    }
}
