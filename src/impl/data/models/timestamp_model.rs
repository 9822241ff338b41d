use std::str::FromStr;

use chrono::{DateTime, Utc};
use fractic_server_error::ServerError;

use crate::errors::InvalidTimestamp;

/// RFC 3339 timestamp as stored in the cache table and the metadata object.
#[derive(Debug)]
pub(crate) struct TimestampModel(DateTime<Utc>);

impl FromStr for TimestampModel {
    type Err = ServerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DateTime::parse_from_rfc3339(s)
            .map(|d| TimestampModel(d.with_timezone(&Utc)))
            .map_err(|e| InvalidTimestamp::with_debug(s, &e))
    }
}

impl Into<DateTime<Utc>> for TimestampModel {
    fn into(self) -> DateTime<Utc> {
        self.0
    }
}
