use fractic_server_error::ServerError;
use futures::{stream, TryStreamExt};
use tracing::{debug, info, warn};

use crate::{
    domain::{
        logic::{
            normalizer::normalize_name,
            payer_rules::{
                apply_short_trip_floor, dead_mileage_eligibility, effective_authorization,
                normalize_payer, DEAD_MILEAGE_SERVICE_CODE, MILEAGE_SERVICE_CODE,
            },
            service_text_parser::{
                clamped, parse_custom_service_codes, parse_detail_tuples, parse_order_items,
                split_list,
            },
        },
        repositories::mileage_cache_repository::MileageCacheRepository,
    },
    entities::{
        AggregationResult, BillingRow, BucketExclusion, CacheKey, DetailGroup, PassengerAggregate,
        PassengerAggregateKey, SegmentErrorKind, SegmentParseError, ServiceItemKey,
    },
};

/// Mileage of one trip after cache resolution.
#[derive(Debug, Clone, Copy)]
struct ResolvedTrip {
    miles: f64,
    has_override: bool,
    dead_miles: f64,
    has_dead_override: bool,
}

/// Accumulates billing rows into per passenger-authorization buckets.
///
/// Rows are processed strictly in order, and each cache lookup (which may
/// create an entry and call the distance oracle) completes before the next
/// row starts.
pub struct AggregationEngine<'a, R: MileageCacheRepository> {
    cache: &'a R,
}

impl<'a, R: MileageCacheRepository> AggregationEngine<'a, R> {
    pub fn new(cache: &'a R) -> Self {
        Self { cache }
    }

    pub async fn process(&self, rows: Vec<BillingRow>) -> Result<AggregationResult, ServerError> {
        let row_count = rows.len();
        let result = stream::iter(rows.into_iter().map(Ok::<_, ServerError>))
            .try_fold(AggregationResult::default(), |mut result, row| async move {
                let trip = self.resolve_trip(&row).await?;
                Self::accumulate_row(&mut result, &row, trip);
                Ok::<_, ServerError>(result)
            })
            .await?;
        info!(
            rows = row_count,
            groups = result.aggregates.len(),
            exclusions = result.exclusions.len(),
            parse_errors = result.parse_errors.len(),
            "aggregated billing rows"
        );
        Ok(result)
    }

    async fn resolve_trip(&self, row: &BillingRow) -> Result<Option<ResolvedTrip>, ServerError> {
        let key = CacheKey::from_row(row);
        if !key.is_complete() {
            warn!(
                row = %row.id,
                order_id = row.order_id.as_deref().unwrap_or(""),
                "missing address data, using reported mileage"
            );
            return Ok(None);
        }
        let entry = self
            .cache
            .find_or_create(&key, source_trip_miles(row), source_dead_miles(row))
            .await?;
        Ok(Some(ResolvedTrip {
            miles: entry.resolved_mileage() as f64,
            has_override: entry.has_mileage_override(),
            dead_miles: entry.resolved_dead_mileage() as f64,
            has_dead_override: entry.has_dead_mileage_override(),
        }))
    }

    fn accumulate_row(result: &mut AggregationResult, row: &BillingRow, trip: Option<ResolvedTrip>) {
        let payer = normalize_payer(&row.payer);
        let key = PassengerAggregateKey {
            first_name: normalize_name(&row.first_name),
            last_name: normalize_name(&row.last_name),
            client_authorization: effective_authorization(row.client_authorization.as_deref()),
        };
        let order_id = row
            .order_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());

        let aggregate = result
            .aggregates
            .entry(key.clone())
            .or_insert_with(|| PassengerAggregate::new(display_name(row)));
        aggregate.original_payers.insert(row.payer.trim().to_string());
        if let Some(date) = row.service_date {
            aggregate.observe_service_date(date);
        }
        if aggregate.case_worker.is_none() {
            aggregate.case_worker = row.case_worker.clone();
        }
        if aggregate.case_worker_email.is_none() {
            aggregate.case_worker_email = row.case_worker_email.clone();
        }
        if aggregate.billing_frequency.is_none() {
            aggregate.billing_frequency = row.billing_frequency.clone();
        }

        let item = |service_code: &str, modifier: &str| ServiceItemKey {
            service_code: service_code.to_string(),
            modifier: modifier.to_string(),
            normalized_payer: payer.clone(),
        };
        let mut parse_errors: Vec<SegmentParseError> = Vec::new();

        // Detail field groups.
        for (group, fields) in &row.detail_groups {
            let parsed = parse_detail_tuples(fields);
            parse_errors.extend(parsed.errors);
            for tuple in parsed.tokens {
                if tuple.service_code.is_empty() || tuple.quantity == 0.0 {
                    continue;
                }
                let mut quantity = tuple.quantity;
                if tuple.service_code == MILEAGE_SERVICE_CODE {
                    if let (DetailGroup::Mileage, Some(trip)) = (group, trip) {
                        quantity = trip.miles;
                    }
                    let has_override = trip.map(|t| t.has_override).unwrap_or(false);
                    quantity = apply_short_trip_floor(&payer, quantity, has_override);
                }
                aggregate
                    .bucket_mut(item(&tuple.service_code, &tuple.modifier))
                    .accumulate(quantity, tuple.cost, order_id);
            }
        }

        // Custom service codes.
        let parsed = parse_custom_service_codes(&row.custom_service_codes);
        parse_errors.extend(parsed.errors);
        for code in parsed.tokens {
            let service_item = item(&code.service_code, &code.modifier);
            if code.service_code != DEAD_MILEAGE_SERVICE_CODE {
                aggregate
                    .bucket_mut(service_item)
                    .accumulate(code.quantity, code.cost, order_id);
                continue;
            }
            let quantity = trip.map(|t| t.dead_miles).unwrap_or(code.quantity);
            let has_override = trip.map(|t| t.has_dead_override).unwrap_or(false);
            match dead_mileage_eligibility(&payer, quantity, has_override) {
                Ok(()) => aggregate
                    .bucket_mut(service_item)
                    .accumulate(quantity, code.cost, order_id),
                Err(reason) => {
                    debug!(row = %row.id, payer = %payer, quantity, ?reason, "dead mileage excluded");
                    result.exclusions.push(BucketExclusion {
                        row: row.id,
                        key: key.clone(),
                        item: service_item,
                        quantity,
                        reason,
                    });
                }
            }
        }

        // Order items.
        let parsed = parse_order_items(&row.order_items.items);
        parse_errors.extend(parsed.errors);
        let codes = split_list(&row.order_items.service_codes);
        let modifiers = split_list(&row.order_items.modifiers);
        for (i, order_item) in parsed.tokens.into_iter().enumerate() {
            let description = order_item.description.to_uppercase();
            let matched = codes
                .iter()
                .position(|c| !c.is_empty() && description.contains(&c.to_uppercase()));
            let (service_code, modifier) = match matched {
                Some(j) => (codes[j], clamped(&modifiers, j).unwrap_or("")),
                None => (
                    clamped(&codes, i).unwrap_or(""),
                    modifiers.first().copied().unwrap_or(""),
                ),
            };
            if service_code.is_empty() {
                parse_errors.push(SegmentParseError {
                    segment: order_item.description,
                    kind: SegmentErrorKind::MissingField("Service code"),
                });
                continue;
            }
            aggregate.bucket_mut(item(service_code, modifier)).accumulate(
                order_item.quantity,
                order_item.quantity * order_item.unit_cost,
                order_id,
            );
        }

        for error in parse_errors {
            warn!(row = %row.id, segment = %error.segment, reason = %error.kind, "skipped unparseable segment");
            result.parse_errors.push((row.id, error));
        }
    }
}

fn display_name(row: &BillingRow) -> String {
    let first = row.first_name.split_whitespace().collect::<Vec<_>>().join(" ");
    let last = row.last_name.split_whitespace().collect::<Vec<_>>().join(" ");
    match (last.is_empty(), first.is_empty()) {
        (true, _) => first,
        (false, true) => last,
        (false, false) => format!("{}, {}", last, first),
    }
}

/// Trip miles reported by the export: the dedicated column if present,
/// otherwise the first mileage-code quantity of the mileage group.
fn source_trip_miles(row: &BillingRow) -> f64 {
    row.trip_miles
        .or_else(|| {
            let fields = row.detail_fields(DetailGroup::Mileage)?;
            parse_detail_tuples(fields)
                .tokens
                .into_iter()
                .find(|t| t.service_code == MILEAGE_SERVICE_CODE)
                .map(|t| t.quantity)
        })
        .unwrap_or(0.0)
}

/// Dead miles reported by the export: the dedicated column if present,
/// otherwise the dead-mileage code quantity of the custom service codes.
fn source_dead_miles(row: &BillingRow) -> f64 {
    row.dead_miles
        .or_else(|| {
            parse_custom_service_codes(&row.custom_service_codes)
                .tokens
                .into_iter()
                .find(|c| c.service_code == DEAD_MILEAGE_SERVICE_CODE)
                .map(|c| c.quantity)
        })
        .unwrap_or(0.0)
}
