use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BillingRowId(pub(crate) u64);

/// The fixed detail column groups of the export. Each group carries four
/// comma-joined columns describing (code, modifier, quantity, cost) tuples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetailGroup {
    LoadFee,
    Mileage,
    FlatRate,
    NoShow,
    WaitTime,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailFields {
    pub service_codes: String,
    pub modifiers: String,
    pub quantities: String,
    pub costs: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderItemFields {
    pub items: String,
    pub service_codes: String,
    pub modifiers: String,
}

/// One trip record of the billing export.
#[derive(Debug, Clone)]
pub struct BillingRow {
    pub id: BillingRowId,
    pub first_name: String,
    pub last_name: String,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub payer: String,
    pub order_id: Option<String>,
    pub client_authorization: Option<String>,
    pub service_date: Option<NaiveDate>,
    pub case_worker: Option<String>,
    pub case_worker_email: Option<String>,
    pub billing_frequency: Option<String>,
    /// Trip distance as reported by the scheduling system, if exported.
    pub trip_miles: Option<f64>,
    /// Dead-leg distance as reported by the scheduling system, if exported.
    pub dead_miles: Option<f64>,
    pub detail_groups: Vec<(DetailGroup, DetailFields)>,
    pub custom_service_codes: String,
    pub order_items: OrderItemFields,
}

// --

impl DetailGroup {
    pub const ALL: [DetailGroup; 5] = [
        DetailGroup::LoadFee,
        DetailGroup::Mileage,
        DetailGroup::FlatRate,
        DetailGroup::NoShow,
        DetailGroup::WaitTime,
    ];

    /// Column header prefix used by the export.
    pub fn column_prefix(&self) -> &'static str {
        match self {
            DetailGroup::LoadFee => "Load Fee",
            DetailGroup::Mileage => "Mileage",
            DetailGroup::FlatRate => "Flat Rate",
            DetailGroup::NoShow => "No Show",
            DetailGroup::WaitTime => "Wait Time",
        }
    }
}

impl std::fmt::Display for BillingRowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl BillingRow {
    pub fn detail_fields(&self, group: DetailGroup) -> Option<&DetailFields> {
        self.detail_groups
            .iter()
            .find(|(g, _)| *g == group)
            .map(|(_, fields)| fields)
    }
}
