use billing_aggregator::{
    config::{AggregationConfig, CacheStoreConfig},
    entities::{CloseOutcome, ExclusionReason, OutputRecord, OverrideUpdate},
    ext::{
        standard_distances::DistanceTable, standard_mirrors::DirectoryMirror,
        standard_resolvers::AlwaysContinue,
    },
    repositories::{MileageCacheRepository as _, MileageCacheStore},
    util::BillingAggregatorUtil,
};
use chrono::NaiveDate;

const HEADER: &str = "Passenger First Name,Passenger Last Name,PU Address,DO Address,Payer,Order ID,Client Authorization,Date of Service,Case Worker,Trip Miles,\
Load Fee Service Code,Load Fee Modifier,Load Fee Quantity,Load Fee Cost,\
Mileage Service Code,Mileage Modifier,Mileage Quantity,Mileage Cost,\
Flat Rate Service Code,Flat Rate Modifier,Flat Rate Quantity,Flat Rate Cost,\
No Show Service Code,No Show Modifier,No Show Quantity,No Show Cost,\
Wait Time Service Code,Wait Time Modifier,Wait Time Quantity,Wait Time Cost,\
Custom Service Codes,Order Items,Order Item Service Codes,Order Item Modifiers";

fn export() -> String {
    [
        "Trip Billing Export - March 2025",
        HEADER,
        "Jane,Doe,10 Main Street,20 Clinic Road,I,ORD-1,AUTH1,03/03/2025,Pat,8,\
A0100,U1,1,25,S0215,U1,8,20,,,,,,,,,,,,,\
\"Service code: T2049, Modifier: U1, Quantity:3, Cost: 2\",,,",
        "jane , DOE,10 Main St,20 Clinic Rd,I,ORD-2,AUTH1,03/10/2025,Pat,8,\
A0100,U1,1,25,S0215,U1,8,20,,,,,,,,,,,,,\
\"Service code: T2049, Modifier: U1, Quantity:3, Cost: 2\",,,",
        "John,Roe,5 Elm Avenue,20 Clinic Road,MCW,ORD-3,9999999999999999,03/04/2025,,4,\
A0100,U2,1,25,S0215,U2,4,10,,,,,,,,,,,,,\
\"Service code: T2049, Modifier: U2, Quantity:2, Cost: 1\",,,",
    ]
    .join("\n")
}

fn distances() -> DistanceTable {
    DistanceTable::new()
        .with_distance("10 Main St", "20 Clinic Rd", 11.6)
        .with_distance("1 Depot Rd", "10 Main St", 16.2)
        .with_distance("5 Elm Ave", "20 Clinic Rd", 4.2)
        .with_distance("1 Depot Rd", "5 Elm Ave", 9.0)
}

fn cache_config(dir: &std::path::Path) -> CacheStoreConfig {
    CacheStoreConfig {
        local_db_path: dir.join("work").join("mileage_cache.db"),
        company_address: "1 Depot Road".to_string(),
        ..CacheStoreConfig::default()
    }
}

fn find<'a>(records: &'a [OutputRecord], code: &str, last_name: &str) -> &'a OutputRecord {
    records
        .iter()
        .find(|r| r.service_code == code && r.last_name == last_name)
        .unwrap_or_else(|| panic!("no {} record for {}", code, last_name))
}

#[tokio::test]
async fn billing_run_aggregates_and_syncs_cache() {
    let dir = tempfile::tempdir().unwrap();
    let mirror = DirectoryMirror::new(dir.path().join("share"));
    let util = BillingAggregatorUtil::new(&AggregationConfig {
        invoice_number_base: 100,
    });

    let mut store = MileageCacheStore::open(
        cache_config(dir.path()),
        mirror.clone(),
        distances(),
        AlwaysContinue,
    )
    .await
    .unwrap();
    let run = util.from_string(&export(), &store).await.unwrap();

    // Jane's two rows collapse into one invoice group.
    let numbers: Vec<_> = run
        .records
        .iter()
        .map(|r| (r.last_name.as_str(), r.invoice_number.0))
        .collect();
    assert_eq!(
        numbers,
        vec![("DOE", 100), ("DOE", 100), ("DOE", 100), ("ROE", 101), ("ROE", 101)]
    );

    let mileage = find(&run.records, "S0215", "DOE");
    assert_eq!(mileage.quantity, 24.0);
    assert_eq!(mileage.cost, 40.0);
    assert_eq!(mileage.customer_display_name, "Doe, Jane");
    assert_eq!(mileage.client_authorization.as_deref(), Some("AUTH1"));
    assert_eq!(mileage.order_ids, vec!["ORD-1".to_string(), "ORD-2".to_string()]);
    assert_eq!(mileage.service_date_start, NaiveDate::from_ymd_opt(2025, 3, 3));
    assert_eq!(mileage.service_date_end, NaiveDate::from_ymd_opt(2025, 3, 10));

    let dead = find(&run.records, "T2049", "DOE");
    assert_eq!(dead.quantity, 32.0);
    assert_eq!(dead.cost, 4.0);

    // The placeholder authorization is treated as absent, and MCW dead
    // mileage under the threshold is excluded.
    let john = find(&run.records, "S0215", "ROE");
    assert_eq!(john.client_authorization, None);
    assert_eq!(john.quantity, 4.0);
    assert_eq!(run.exclusions.len(), 1);
    assert_eq!(
        run.exclusions[0].reason,
        ExclusionReason::DeadMileageBelowThreshold
    );
    assert!(run.parse_errors.is_empty());

    // Two distinct trips were cached.
    assert_eq!(store.list_entries().await.unwrap().len(), 2);
    assert!(matches!(store.close().await.unwrap(), CloseOutcome::Synced(_)));
    assert!(dir.path().join("share/mileage_cache.db").exists());
    assert!(dir.path().join("share/mileage_cache_metadata.json").exists());
}

#[tokio::test]
async fn override_from_a_previous_session_wins() {
    let dir = tempfile::tempdir().unwrap();
    let mirror = DirectoryMirror::new(dir.path().join("share"));
    let util = BillingAggregatorUtil::new(&AggregationConfig::default());

    // First session caches the trips and corrects John's dead mileage.
    let mut store = MileageCacheStore::open(
        cache_config(dir.path()),
        mirror.clone(),
        distances(),
        AlwaysContinue,
    )
    .await
    .unwrap();
    util.from_string(&export(), &store).await.unwrap();
    let john = store
        .list_entries()
        .await
        .unwrap()
        .into_iter()
        .find(|e| e.key.last_name() == "ROE")
        .unwrap();
    store
        .update_override(
            john.id,
            OverrideUpdate {
                override_miles: None,
                override_dead_miles: Some(9.0),
            },
        )
        .await
        .unwrap();
    store.close().await.unwrap();

    // Second session on a fresh working directory, with no oracle data.
    let second = tempfile::tempdir().unwrap();
    let mut store = MileageCacheStore::open(
        cache_config(second.path()),
        mirror,
        DistanceTable::new(),
        AlwaysContinue,
    )
    .await
    .unwrap();
    let run = util.from_string(&export(), &store).await.unwrap();

    assert!(run.exclusions.is_empty());
    assert_eq!(find(&run.records, "T2049", "ROE").quantity, 9.0);
    assert_eq!(find(&run.records, "S0215", "DOE").quantity, 24.0);
    assert_eq!(run.records[0].invoice_number.0, 1);
    match store.close().await.unwrap() {
        CloseOutcome::Synced(metadata) => assert_eq!(metadata.version, 2),
        other => panic!("expected a synced close, got {:?}", other),
    }
}
