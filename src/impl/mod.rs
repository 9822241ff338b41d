// Crate-internal.
// ---

pub(crate) mod data {
    pub(crate) mod datasources {
        pub(crate) mod billing_csv_datasource;
        pub(crate) mod mileage_sqlite_datasource;
    }
    pub(crate) mod models {
        pub(crate) mod cache_sync_metadata_model;
        pub(crate) mod mileage_cache_entry_model;
        pub(crate) mod quantity_model;
        pub(crate) mod service_date_model;
        pub(crate) mod timestamp_model;
    }
    pub(crate) mod repositories {
        pub(crate) mod billing_rows_repository_impl;
        pub(crate) mod mileage_cache_repository_impl;
    }
}

pub(crate) mod domain {
    pub(crate) mod entities {
        pub(crate) mod billing_row;
        pub(crate) mod cache_key;
        pub(crate) mod handlers;
        pub(crate) mod mileage_cache_entry;
        pub(crate) mod output_record;
        pub(crate) mod passenger_aggregate;
        pub(crate) mod service_token;
    }
    pub(crate) mod logic {
        pub(crate) mod aggregation_engine;
        pub(crate) mod flattener;
        pub(crate) mod normalizer;
        pub(crate) mod payer_rules;
        pub(crate) mod service_text_parser;
    }
    pub(crate) mod repositories {
        pub(crate) mod billing_rows_repository;
        pub(crate) mod mileage_cache_repository;
    }
    pub(crate) mod usecases {
        pub(crate) mod invoice_usecase;
    }
}

// Public exports.
// ---

#[doc(hidden)]
#[allow(unused_imports)]
pub mod exports {
    // This mod represents how clients see the library, and can differ from the
    // internal structure.
    //
    // The contents of this mod are re-exported in the root of the crate.

    pub mod entities {
        pub use crate::domain::entities::billing_row::*;
        pub use crate::domain::entities::cache_key::*;
        pub use crate::domain::entities::handlers::*;
        pub use crate::domain::entities::mileage_cache_entry::*;
        pub use crate::domain::entities::output_record::*;
        pub use crate::domain::entities::passenger_aggregate::*;
        pub use crate::domain::entities::service_token::*;
    }

    pub mod logic {
        pub use crate::domain::logic::aggregation_engine::AggregationEngine;
        pub use crate::domain::logic::flattener::Flattener;
        pub use crate::domain::logic::normalizer::*;
        pub use crate::domain::logic::payer_rules::*;
        pub use crate::domain::logic::service_text_parser::{
            parse_custom_service_codes, parse_detail_tuples, parse_order_items,
        };
    }

    pub mod repositories {
        pub use crate::data::repositories::mileage_cache_repository_impl::MileageCacheStore;
        pub use crate::domain::repositories::mileage_cache_repository::*;
    }
}
