/// One index across the four comma-joined columns of a detail group.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailTuple {
    pub service_code: String,
    pub modifier: String,
    pub quantity: f64,
    pub cost: f64,
}

/// One `Service code: .., Modifier: .., Quantity: .., Cost: ..` occurrence
/// of the custom service codes field.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomServiceCode {
    pub service_code: String,
    pub modifier: String,
    pub quantity: f64,
    pub cost: f64,
}

/// One `<description> (<qty>@$<unit cost>)` entry of the order items field.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub description: String,
    pub quantity: f64,
    pub unit_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentErrorKind {
    MissingField(&'static str),
    InvalidNumber { field: &'static str, value: String },
    MissingQuantityPattern,
}

/// A segment of free text that did not match its grammar and was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentParseError {
    pub segment: String,
    pub kind: SegmentErrorKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSegments<T> {
    pub tokens: Vec<T>,
    pub errors: Vec<SegmentParseError>,
}

// --

impl<T> Default for ParsedSegments<T> {
    fn default() -> Self {
        Self {
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl std::fmt::Display for SegmentErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentErrorKind::MissingField(field) => write!(f, "missing field '{}'", field),
            SegmentErrorKind::InvalidNumber { field, value } => {
                write!(f, "invalid number '{}' for field '{}'", value, field)
            }
            SegmentErrorKind::MissingQuantityPattern => {
                write!(f, "missing '(<qty>@$<cost>)' pattern")
            }
        }
    }
}
