use std::{collections::HashMap, fs, str::FromStr as _};

use csv::StringRecord;
use fractic_server_error::ServerError;
use tracing::warn;

use crate::{
    data::models::{quantity_model::QuantityModel, service_date_model::ServiceDateModel},
    entities::{BillingRow, BillingRowId, DetailFields, DetailGroup, OrderItemFields},
    errors::{InvalidCsv, MissingCsvColumn, ReadError},
};

pub(crate) trait BillingCsvDatasource {
    fn from_string(&self, s: &str) -> Result<Vec<BillingRow>, ServerError>;

    fn from_file<P>(&self, path: P) -> Result<Vec<BillingRow>, ServerError>
    where
        P: AsRef<std::path::Path>;
}

pub(crate) struct BillingCsvDatasourceImpl;

impl BillingCsvDatasourceImpl {
    pub(crate) fn new() -> Self {
        Self
    }
}

/// Column positions resolved once from the header row.
struct Columns {
    first_name: usize,
    last_name: usize,
    pickup_address: usize,
    dropoff_address: usize,
    payer: usize,
    order_id: usize,
    client_authorization: usize,
    service_date: usize,
    detail_groups: Vec<(DetailGroup, [usize; 4])>,
    custom_service_codes: usize,
    order_items: usize,
    order_item_service_codes: usize,
    order_item_modifiers: usize,
    case_worker: Option<usize>,
    case_worker_email: Option<usize>,
    billing_frequency: Option<usize>,
    trip_miles: Option<usize>,
    dead_miles: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, ServerError> {
        let index: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_lowercase(), i))
            .collect();
        let optional = |name: &str| index.get(&name.to_lowercase()).copied();
        let required =
            |name: &str| optional(name).ok_or_else(|| MissingCsvColumn::new(name));

        let detail_groups = DetailGroup::ALL
            .iter()
            .map(|group| -> Result<(DetailGroup, [usize; 4]), ServerError> {
                let prefix = group.column_prefix();
                Ok((
                    *group,
                    [
                        required(&format!("{} Service Code", prefix))?,
                        required(&format!("{} Modifier", prefix))?,
                        required(&format!("{} Quantity", prefix))?,
                        required(&format!("{} Cost", prefix))?,
                    ],
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            first_name: required("Passenger First Name")?,
            last_name: required("Passenger Last Name")?,
            pickup_address: required("PU Address")?,
            dropoff_address: required("DO Address")?,
            payer: required("Payer")?,
            order_id: required("Order ID")?,
            client_authorization: required("Client Authorization")?,
            service_date: required("Date of Service")?,
            detail_groups,
            custom_service_codes: required("Custom Service Codes")?,
            order_items: required("Order Items")?,
            order_item_service_codes: required("Order Item Service Codes")?,
            order_item_modifiers: required("Order Item Modifiers")?,
            case_worker: optional("Case Worker"),
            case_worker_email: optional("Case Worker Email"),
            billing_frequency: optional("Billing Frequency"),
            trip_miles: optional("Trip Miles"),
            dead_miles: optional("Dead Miles"),
        })
    }
}

fn cell(r: &StringRecord, i: usize) -> &str {
    r.get(i).unwrap_or("").trim()
}

fn optional_cell(r: &StringRecord, i: Option<usize>) -> Option<String> {
    i.map(|i| cell(r, i))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn optional_miles(r: &StringRecord, i: Option<usize>, row: usize) -> Option<f64> {
    let raw = optional_cell(r, i)?;
    match QuantityModel::from_str(&raw) {
        Ok(miles) => Some(miles.into()),
        Err(e) => {
            warn!(row, value = %raw, error = ?e, "ignoring unreadable mileage cell");
            None
        }
    }
}

/// The export starts with a title line; the real header is on the second
/// physical line.
fn skip_title_line(s: &str) -> &str {
    match s.find('\n') {
        Some(i) => &s[i + 1..],
        None => "",
    }
}

impl BillingCsvDatasource for BillingCsvDatasourceImpl {
    fn from_string(&self, s: &str) -> Result<Vec<BillingRow>, ServerError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(skip_title_line(s).as_bytes());
        let headers = reader
            .headers()
            .map_err(|e| InvalidCsv::with_debug(&e))?
            .clone();
        let columns = Columns::from_headers(&headers)?;

        reader
            .records()
            .enumerate()
            .filter_map(|(i, r)| {
                match r.map_err(|e| InvalidCsv::with_debug(&e)) {
                    Err(e) => Some(Err(e)),
                    // Blank and footer rows carry neither a passenger nor an order.
                    Ok(r) if cell(&r, columns.first_name).is_empty()
                        && cell(&r, columns.last_name).is_empty()
                        && cell(&r, columns.order_id).is_empty() =>
                    {
                        None
                    }
                    Ok(r) => Some(Ok(Self::build_row(&columns, i, &r))),
                }
            })
            .collect()
    }

    fn from_file<P>(&self, path: P) -> Result<Vec<BillingRow>, ServerError>
    where
        P: AsRef<std::path::Path>,
    {
        self.from_string(&fs::read_to_string(path).map_err(|e| ReadError::with_debug(&e))?)
    }
}

impl BillingCsvDatasourceImpl {
    fn build_row(columns: &Columns, i: usize, r: &StringRecord) -> BillingRow {
        let raw_service_date = cell(r, columns.service_date);
        let service_date = if raw_service_date.is_empty() {
            None
        } else {
            match ServiceDateModel::from_str(raw_service_date) {
                Ok(date) => Some(date.into()),
                Err(e) => {
                    warn!(row = i, value = raw_service_date, error = ?e, "ignoring unreadable date of service");
                    None
                }
            }
        };

        let detail_groups = columns
            .detail_groups
            .iter()
            .map(|(group, [codes, modifiers, quantities, costs])| {
                (
                    *group,
                    DetailFields {
                        service_codes: cell(r, *codes).to_string(),
                        modifiers: cell(r, *modifiers).to_string(),
                        quantities: cell(r, *quantities).to_string(),
                        costs: cell(r, *costs).to_string(),
                    },
                )
            })
            .collect();

        BillingRow {
            id: BillingRowId(i as u64),
            first_name: cell(r, columns.first_name).to_string(),
            last_name: cell(r, columns.last_name).to_string(),
            pickup_address: cell(r, columns.pickup_address).to_string(),
            dropoff_address: cell(r, columns.dropoff_address).to_string(),
            payer: cell(r, columns.payer).to_string(),
            order_id: optional_cell(r, Some(columns.order_id)),
            client_authorization: optional_cell(r, Some(columns.client_authorization)),
            service_date,
            case_worker: optional_cell(r, columns.case_worker),
            case_worker_email: optional_cell(r, columns.case_worker_email),
            billing_frequency: optional_cell(r, columns.billing_frequency),
            trip_miles: optional_miles(r, columns.trip_miles, i),
            dead_miles: optional_miles(r, columns.dead_miles, i),
            detail_groups,
            custom_service_codes: cell(r, columns.custom_service_codes).to_string(),
            order_items: OrderItemFields {
                items: cell(r, columns.order_items).to_string(),
                service_codes: cell(r, columns.order_item_service_codes).to_string(),
                modifiers: cell(r, columns.order_item_modifiers).to_string(),
            },
        }
    }
}
