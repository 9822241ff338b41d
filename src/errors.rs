use fractic_server_error::{define_client_error, define_internal_error};

// IO-related.
define_client_error!(ReadError, "Error reading file.");
define_client_error!(WriteError, "Error writing file.");

// Configuration-related.
define_client_error!(InvalidConfig, "Invalid billing configuration: {details}.", { details: &str });

// Parsing-related.
define_client_error!(InvalidCsv, "Invalid CSV format.");
define_client_error!(MissingCsvColumn, "Billing export is missing required column '{column}'.", { column: &str });
define_client_error!(InvalidServiceDate, "Invalid date of service: '{date}'.", { date: &str });
define_client_error!(InvalidQuantity, "Invalid quantity: '{value}'.", { value: &str });
define_client_error!(InvalidTimestamp, "Invalid timestamp: '{value}'.", { value: &str });

// Mileage cache.
define_internal_error!(
    CacheDatabaseError,
    "Mileage cache database error during '{operation}'.",
    { operation: &str }
);
define_client_error!(
    CacheEntryNotFound,
    "No mileage cache entry with id {id}.",
    { id: i64 }
);
define_client_error!(
    CacheStoreClosed,
    "Mileage cache store has already been closed."
);
define_client_error!(
    InvalidCacheMetadata,
    "Mileage cache metadata object '{object}' is not valid JSON metadata.",
    { object: &str }
);
define_client_error!(
    DistanceUnavailable,
    "No driving distance available from '{from}' to '{to}'.",
    { from: &str, to: &str }
);

// Remote synchronization.
define_client_error!(
    SyncUnavailable,
    "Remote mileage cache mirror unreachable during {phase} of '{object}'.",
    { phase: &str, object: &str }
);
define_client_error!(
    SyncAborted,
    "Mileage cache synchronization aborted by operator during {phase}.",
    { phase: &str }
);
