use std::str::FromStr as _;

use fractic_server_error::ServerError;
use rusqlite::Row;

use crate::{
    data::models::timestamp_model::TimestampModel,
    entities::{CacheKey, MileageCacheEntry, MileageCacheEntryId},
};

/// Column-for-column image of a `mileage_cache` row.
#[derive(Debug)]
pub(crate) struct MileageCacheEntryModel {
    pub id: i64,
    pub passenger_last_name: String,
    pub passenger_first_name: String,
    pub pu_address: String,
    pub do_address: String,
    pub rg_miles: f64,
    pub google_miles: f64,
    pub overwrite_miles: Option<f64>,
    pub rg_dead_miles: f64,
    pub google_dead_miles: f64,
    pub overwrite_dead_miles: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

impl MileageCacheEntryModel {
    pub(crate) const COLUMNS: &'static str = "id, passenger_last_name, passenger_first_name, \
        PU_address, DO_address, RG_miles, Google_miles, overwrite_miles, RG_dead_miles, \
        Google_dead_miles, overwrite_dead_miles, created_at, updated_at";

    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            passenger_last_name: row.get("passenger_last_name")?,
            passenger_first_name: row.get("passenger_first_name")?,
            pu_address: row.get("PU_address")?,
            do_address: row.get("DO_address")?,
            rg_miles: row.get("RG_miles")?,
            google_miles: row.get("Google_miles")?,
            overwrite_miles: row.get("overwrite_miles")?,
            rg_dead_miles: row.get("RG_dead_miles")?,
            google_dead_miles: row.get("Google_dead_miles")?,
            overwrite_dead_miles: row.get("overwrite_dead_miles")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

impl TryFrom<MileageCacheEntryModel> for MileageCacheEntry {
    type Error = ServerError;
    fn try_from(model: MileageCacheEntryModel) -> Result<Self, Self::Error> {
        Ok(MileageCacheEntry {
            id: MileageCacheEntryId(model.id),
            created_at: TimestampModel::from_str(&model.created_at)?.into(),
            updated_at: TimestampModel::from_str(&model.updated_at)?.into(),
            key: CacheKey::from_normalized(
                model.passenger_last_name,
                model.passenger_first_name,
                model.pu_address,
                model.do_address,
            ),
            source_miles: model.rg_miles,
            resolved_miles: model.google_miles,
            override_miles: model.overwrite_miles,
            source_dead_miles: model.rg_dead_miles,
            resolved_dead_miles: model.google_dead_miles,
            override_dead_miles: model.overwrite_dead_miles,
        })
    }
}
