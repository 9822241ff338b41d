use std::str::FromStr;

use fractic_server_error::ServerError;

use crate::errors::InvalidQuantity;

/// Numeric export value (cell or service text field). Accepts currency
/// symbols, thousands separators and stray spaces.
#[derive(Debug)]
pub(crate) struct QuantityModel(pub f64);

impl FromStr for QuantityModel {
    type Err = ServerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '$' && *c != ',')
            .collect();
        let quantity = raw
            .parse::<f64>()
            .ok()
            .filter(|q| q.is_finite())
            .ok_or_else(|| InvalidQuantity::new(s))?;
        Ok(QuantityModel(quantity))
    }
}

impl Into<f64> for QuantityModel {
    fn into(self) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Option<f64> {
        QuantityModel::from_str(s).ok().map(Into::into)
    }

    #[test]
    fn currency_and_separators_are_ignored() {
        assert_eq!(parse(" $1,250.50 "), Some(1250.5));
        assert_eq!(parse("$ 15"), Some(15.0));
        assert_eq!(parse("8"), Some(8.0));
    }

    #[test]
    fn empty_and_non_numeric_values_are_rejected() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("  "), None);
        assert_eq!(parse("three"), None);
        assert_eq!(parse("inf"), None);
    }
}
