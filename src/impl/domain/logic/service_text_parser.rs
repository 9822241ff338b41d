use std::{str::FromStr as _, sync::LazyLock};

use regex::Regex;

use crate::{
    data::models::quantity_model::QuantityModel,
    entities::{
        CustomServiceCode, DetailFields, DetailTuple, OrderItem, ParsedSegments,
        SegmentErrorKind, SegmentParseError,
    },
};

static FIELD_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(service\s*code|modifier|quantity|cost)\s*:")
        .expect("field label pattern should be valid")
});

static ORDER_ITEM_QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\s*([0-9][0-9.,]*)\s*@\s*\$?\s*([0-9][0-9.,]*)\s*\)")
        .expect("order item pattern should be valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    ServiceCode,
    Modifier,
    Quantity,
    Cost,
}

/// A labelled value of the custom service codes field, with the byte offset
/// of its label in the source text.
#[derive(Debug)]
struct Field<'a> {
    label: Label,
    value: &'a str,
    start: usize,
}

#[derive(Debug, Default)]
struct PartialCode<'a> {
    service_code: Option<&'a str>,
    modifier: Option<&'a str>,
    quantity: Option<&'a str>,
    cost: Option<&'a str>,
}

// Lexing.
// ---

fn label_of(raw: &str) -> Label {
    let lower = raw.to_lowercase();
    if lower.starts_with("service") {
        Label::ServiceCode
    } else if lower.starts_with("modifier") {
        Label::Modifier
    } else if lower.starts_with("quantity") {
        Label::Quantity
    } else {
        Label::Cost
    }
}

fn trim_value(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_whitespace() || c == ',' || c == ';')
}

fn lex_fields(text: &str) -> (Vec<Field<'_>>, &str) {
    let matches: Vec<_> = FIELD_LABEL.captures_iter(text).collect();
    let leading = match matches.first().and_then(|c| c.get(0)) {
        Some(m) => &text[..m.start()],
        None => text,
    };
    let fields = matches
        .iter()
        .enumerate()
        .filter_map(|(i, caps)| {
            let whole = caps.get(0)?;
            let value_end = matches
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map(|m| m.start())
                .unwrap_or(text.len());
            Some(Field {
                label: label_of(caps.get(1)?.as_str()),
                value: trim_value(&text[whole.end()..value_end]),
                start: whole.start(),
            })
        })
        .collect();
    (fields, leading)
}

// Numbers.
// ---

fn required_number(
    segment: &str,
    field: &'static str,
    raw: Option<&str>,
) -> Result<f64, SegmentParseError> {
    let raw = raw.ok_or_else(|| SegmentParseError {
        segment: segment.to_string(),
        kind: SegmentErrorKind::MissingField(field),
    })?;
    QuantityModel::from_str(raw).map(Into::into).map_err(|_| SegmentParseError {
        segment: segment.to_string(),
        kind: SegmentErrorKind::InvalidNumber {
            field,
            value: raw.to_string(),
        },
    })
}

// Grammars.
// ---

/// Parses repeated `Service code: <code>, Modifier: <mod>, Quantity:<qty>,
/// Cost: <cost>` occurrences. Occurrences that do not satisfy the grammar
/// are reported and skipped; the remaining ones are still returned.
pub fn parse_custom_service_codes(text: &str) -> ParsedSegments<CustomServiceCode> {
    let mut parsed = ParsedSegments::default();
    if text.trim().is_empty() {
        return parsed;
    }

    let (fields, leading) = lex_fields(text);
    if !trim_value(leading).is_empty() {
        parsed.errors.push(SegmentParseError {
            segment: leading.trim().to_string(),
            kind: SegmentErrorKind::MissingField("Service code"),
        });
    }

    // Group fields into occurrences, each opened by a service code label.
    let mut groups: Vec<(usize, PartialCode<'_>)> = Vec::new();
    for field in fields {
        match field.label {
            Label::ServiceCode => groups.push((
                field.start,
                PartialCode {
                    service_code: Some(field.value),
                    ..Default::default()
                },
            )),
            label => {
                if groups.is_empty() {
                    groups.push((field.start, PartialCode::default()));
                }
                if let Some((_, partial)) = groups.last_mut() {
                    let slot = match label {
                        Label::Modifier => &mut partial.modifier,
                        Label::Quantity => &mut partial.quantity,
                        Label::Cost => &mut partial.cost,
                        Label::ServiceCode => unreachable!(),
                    };
                    slot.get_or_insert(field.value);
                }
            }
        }
    }

    let group_ends: Vec<usize> = groups
        .iter()
        .skip(1)
        .map(|(start, _)| *start)
        .chain(std::iter::once(text.len()))
        .collect();
    for ((start, partial), end) in groups.into_iter().zip(group_ends) {
        let segment = text[start..end].trim();
        match build_custom_code(segment, partial) {
            Ok(code) => parsed.tokens.push(code),
            Err(e) => parsed.errors.push(e),
        }
    }
    parsed
}

fn build_custom_code(
    segment: &str,
    partial: PartialCode<'_>,
) -> Result<CustomServiceCode, SegmentParseError> {
    let service_code = partial
        .service_code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| SegmentParseError {
            segment: segment.to_string(),
            kind: SegmentErrorKind::MissingField("Service code"),
        })?;
    Ok(CustomServiceCode {
        service_code: service_code.to_string(),
        modifier: partial.modifier.unwrap_or("").to_string(),
        quantity: required_number(segment, "Quantity", partial.quantity)?,
        cost: required_number(segment, "Cost", partial.cost)?,
    })
}

/// Parses `<description> (<qty>@$<unit cost>)` entries separated by commas.
pub fn parse_order_items(text: &str) -> ParsedSegments<OrderItem> {
    let mut parsed = ParsedSegments::default();
    let mut cursor = 0;
    for caps in ORDER_ITEM_QUANTITY.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let mut pieces: Vec<&str> = text[cursor..whole.start()]
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        cursor = whole.end();
        let description = pieces.pop().unwrap_or("").to_string();
        parsed
            .errors
            .extend(pieces.into_iter().map(|p| SegmentParseError {
                segment: p.to_string(),
                kind: SegmentErrorKind::MissingQuantityPattern,
            }));

        let segment = format!("{} {}", description, whole.as_str());
        let quantity = required_number(&segment, "Quantity", caps.get(1).map(|m| m.as_str()));
        let unit_cost = required_number(&segment, "Cost", caps.get(2).map(|m| m.as_str()));
        match (quantity, unit_cost) {
            (Ok(quantity), Ok(unit_cost)) => parsed.tokens.push(OrderItem {
                description,
                quantity,
                unit_cost,
            }),
            (Err(e), _) | (_, Err(e)) => parsed.errors.push(e),
        }
    }
    parsed.errors.extend(
        text[cursor..]
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| SegmentParseError {
                segment: p.to_string(),
                kind: SegmentErrorKind::MissingQuantityPattern,
            }),
    );
    parsed
}

/// Splits a comma-joined export column into trimmed values.
pub(crate) fn split_list(raw: &str) -> Vec<&str> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    raw.split(',').map(str::trim).collect()
}

/// Value at `i`, or the last available value if the list is shorter.
pub(crate) fn clamped<'a>(values: &[&'a str], i: usize) -> Option<&'a str> {
    values.get(i.min(values.len().saturating_sub(1))).copied()
}

/// Zips the four columns of a detail group by index. Lists shorter than the
/// service code list are index-clamped rather than rejected.
pub fn parse_detail_tuples(fields: &DetailFields) -> ParsedSegments<DetailTuple> {
    let mut parsed = ParsedSegments::default();
    let codes = split_list(&fields.service_codes);
    let modifiers = split_list(&fields.modifiers);
    let quantities = split_list(&fields.quantities);
    let costs = split_list(&fields.costs);

    for (i, code) in codes.iter().enumerate() {
        let modifier = clamped(&modifiers, i).unwrap_or("");
        let raw_quantity = clamped(&quantities, i).unwrap_or("0");
        let raw_cost = clamped(&costs, i).unwrap_or("0");
        let segment = format!("{}/{}/{}/{}", code, modifier, raw_quantity, raw_cost);
        let quantity = if raw_quantity.is_empty() {
            Ok(0.0)
        } else {
            required_number(&segment, "Quantity", Some(raw_quantity))
        };
        let cost = if raw_cost.is_empty() {
            Ok(0.0)
        } else {
            required_number(&segment, "Cost", Some(raw_cost))
        };
        match (quantity, cost) {
            (Ok(quantity), Ok(cost)) => parsed.tokens.push(DetailTuple {
                service_code: code.to_string(),
                modifier: modifier.to_string(),
                quantity,
                cost,
            }),
            (Err(e), _) | (_, Err(e)) => parsed.errors.push(e),
        }
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_codes_parse_repeated_occurrences() {
        let parsed = parse_custom_service_codes(
            "Service code: T2049, Modifier: U1, Quantity:12, Cost: $24.00 \
             Service code: A0100, Modifier: , Quantity:1, Cost: 30",
        );
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        assert_eq!(
            parsed.tokens,
            vec![
                CustomServiceCode {
                    service_code: "T2049".into(),
                    modifier: "U1".into(),
                    quantity: 12.0,
                    cost: 24.0,
                },
                CustomServiceCode {
                    service_code: "A0100".into(),
                    modifier: "".into(),
                    quantity: 1.0,
                    cost: 30.0,
                },
            ]
        );
    }

    #[test]
    fn malformed_custom_code_is_skipped_not_fatal() {
        let parsed = parse_custom_service_codes(
            "Service code: T2049, Modifier: U1, Quantity:abc, Cost: 2 \
             Service code: A0100, Modifier: U2, Quantity:2, Cost: 4",
        );
        assert_eq!(parsed.tokens.len(), 1);
        assert_eq!(parsed.tokens[0].service_code, "A0100");
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(
            parsed.errors[0].kind,
            SegmentErrorKind::InvalidNumber {
                field: "Quantity",
                value: "abc".into()
            }
        );
    }

    #[test]
    fn custom_code_without_cost_reports_missing_field() {
        let parsed = parse_custom_service_codes("Service code: T2049, Modifier: U1, Quantity:3");
        assert!(parsed.tokens.is_empty());
        assert_eq!(
            parsed.errors[0].kind,
            SegmentErrorKind::MissingField("Cost")
        );
    }

    #[test]
    fn leading_garbage_is_reported() {
        let parsed = parse_custom_service_codes(
            "n/a Service code: T2049, Modifier: U1, Quantity:3, Cost: 1",
        );
        assert_eq!(parsed.tokens.len(), 1);
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].segment, "n/a");
    }

    #[test]
    fn empty_custom_codes_yield_nothing() {
        let parsed = parse_custom_service_codes("   ");
        assert!(parsed.tokens.is_empty());
        assert!(parsed.errors.is_empty());
    }

    #[test]
    fn order_items_parse_quantity_and_unit_cost() {
        let parsed = parse_order_items("Wheelchair Rental (2@$15.00), Escort Fee (1@$10)");
        assert!(parsed.errors.is_empty());
        assert_eq!(
            parsed.tokens,
            vec![
                OrderItem {
                    description: "Wheelchair Rental".into(),
                    quantity: 2.0,
                    unit_cost: 15.0,
                },
                OrderItem {
                    description: "Escort Fee".into(),
                    quantity: 1.0,
                    unit_cost: 10.0,
                },
            ]
        );
    }

    #[test]
    fn order_items_without_pattern_are_reported() {
        let parsed = parse_order_items("Oxygen, Escort Fee (1@$10), Stair Chair");
        assert_eq!(parsed.tokens.len(), 1);
        let segments: Vec<_> = parsed.errors.iter().map(|e| e.segment.as_str()).collect();
        assert_eq!(segments, vec!["Oxygen", "Stair Chair"]);
    }

    #[test]
    fn detail_tuples_clamp_short_lists() {
        let parsed = parse_detail_tuples(&DetailFields {
            service_codes: "A0100, S0215".into(),
            modifiers: "U1".into(),
            quantities: "1, 8".into(),
            costs: "25".into(),
        });
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.tokens.len(), 2);
        assert_eq!(parsed.tokens[1].modifier, "U1");
        assert_eq!(parsed.tokens[1].quantity, 8.0);
        assert_eq!(parsed.tokens[1].cost, 25.0);
    }

    #[test]
    fn detail_tuples_with_missing_lists_default_to_zero() {
        let parsed = parse_detail_tuples(&DetailFields {
            service_codes: "A0100".into(),
            ..Default::default()
        });
        assert_eq!(parsed.tokens[0].quantity, 0.0);
        assert_eq!(parsed.tokens[0].modifier, "");
    }
}
