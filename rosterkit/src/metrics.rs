use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge_vec, HistogramVec,
    IntCounterVec, IntGaugeVec,
};

lazy_static! {
    pub static ref DATABASE_OPERATION_DURATION: HistogramVec = register_histogram_vec!(
        "roster_database_operation_duration_seconds",
        "Database operation duration in seconds",
        &["operation", "database", "status"]
    )
    .expect("operation duration histogram registers once");

    pub static ref OPERATION_COUNTER: IntCounterVec = register_int_counter_vec!(
        "roster_operations_total",
        "Total number of database operations",
        &["operation", "status"]
    )
    .expect("operation counter registers once");

    pub static ref ROWS_FETCHED: IntCounterVec = register_int_counter_vec!(
        "roster_rows_fetched_total",
        "Rows returned by paged queries",
        &["database"]
    )
    .expect("rows fetched counter registers once");

    pub static ref ACTIVE_CONNECTIONS: IntGaugeVec = register_int_gauge_vec!(
        "roster_active_connections",
        "Number of open database sessions",
        &["database"]
    )
    .expect("active connections gauge registers once");
}

pub fn record_operation(operation: &str, database: &str, success: bool, duration: f64) {
    let status = if success { "success" } else { "failure" };
    DATABASE_OPERATION_DURATION
        .with_label_values(&[operation, database, status])
        .observe(duration);
    OPERATION_COUNTER
        .with_label_values(&[operation, status])
        .inc();
}

pub fn record_rows_fetched(database: &str, rows: usize) {
    ROWS_FETCHED
        .with_label_values(&[database])
        .inc_by(rows as u64);
}
