use std::str::FromStr;

use chrono::NaiveDate;
use fractic_server_error::ServerError;

use crate::errors::InvalidServiceDate;

/// Formats the scheduling export has been seen to use for dates of service.
const SERVICE_DATE_FORMATS: [&str; 2] = ["%m/%d/%Y", "%Y-%m-%d"];

#[derive(Debug)]
pub(crate) struct ServiceDateModel(NaiveDate);

impl FromStr for ServiceDateModel {
    type Err = ServerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Some exports append a time of day.
        let date_part = s.split_whitespace().next().unwrap_or("");
        SERVICE_DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
            .map(ServiceDateModel)
            .ok_or_else(|| InvalidServiceDate::new(s))
    }
}

impl Into<NaiveDate> for ServiceDateModel {
    fn into(self) -> NaiveDate {
        self.0
    }
}
