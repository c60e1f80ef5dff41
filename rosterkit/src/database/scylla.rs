use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use scylla::cql_to_rust::FromRow;
use scylla::frame::response::result::Row;
use scylla::query::Query;
use scylla::serialize::row::SerializeRow;
use scylla::speculative_execution::SimpleSpeculativeExecutionPolicy;
use scylla::statement::{PagingState, PagingStateResponse};
use scylla::transport::execution_profile::ExecutionProfile;
use scylla::transport::session::PoolSize;
use scylla::{QueryResult, Session, SessionBuilder};
use tracing::{debug, error, info};

use crate::config::DatabaseConfig;
use crate::database::pager::PageSource;
use crate::errors::RosterError;
use crate::metrics;
use crate::types::{ContinuationToken, Page, QueryDescriptor};

const DATABASE_LABEL: &str = "scylla";

/// ScyllaDB/Cassandra session wrapper
pub struct ScyllaConnection {
    session: Arc<Session>,
}

impl ScyllaConnection {
    /// Open a session against the configured contact points.
    ///
    /// The keyspace is not selected here so that it can be created first; call
    /// [`ScyllaConnection::use_keyspace`] once it exists.
    pub async fn new(config: &DatabaseConfig) -> Result<Self, RosterError> {
        let contact_points = config.contact_points();
        info!("Connecting to cluster: {:?}", contact_points);

        let pool_size = NonZeroUsize::new(config.pool_size as usize).unwrap_or(NonZeroUsize::MIN);

        let mut profile = ExecutionProfile::builder()
            .consistency(config.consistency.into())
            .request_timeout(Some(config.request_timeout()));

        if config.speculative_execution {
            info!("Speculative execution enabled (delay: {}ms)", config.speculative_delay_ms);
            let policy = SimpleSpeculativeExecutionPolicy {
                max_retry_count: 2,
                retry_interval: Duration::from_millis(config.speculative_delay_ms),
            };
            profile = profile.speculative_execution_policy(Some(Arc::new(policy)));
        }

        let mut session_builder = SessionBuilder::new()
            .known_nodes(&contact_points)
            .pool_size(PoolSize::PerShard(pool_size))
            .connection_timeout(config.connection_timeout())
            .default_execution_profile_handle(profile.build().into_handle());

        if let Some((username, password)) = config.credentials() {
            session_builder = session_builder.user(username, password);
        }

        let session = session_builder.build().await.map_err(|e| {
            error!("Failed to connect to cluster: {}", e);
            RosterError::from(e)
        })?;

        metrics::ACTIVE_CONNECTIONS
            .with_label_values(&[DATABASE_LABEL])
            .inc();
        info!(
            "Connected OK (consistency: {:?}, pool: {} per shard)",
            config.consistency, pool_size
        );

        Ok(Self {
            session: Arc::new(session),
        })
    }

    /// Get the underlying Scylla session
    pub fn get_session(&self) -> &Session {
        &self.session
    }

    pub async fn use_keyspace(&self, keyspace: &str) -> Result<(), RosterError> {
        self.session
            .use_keyspace(keyspace, true)
            .await
            .map_err(|e| RosterError::QueryError(format!("Failed to use keyspace {}: {}", keyspace, e)))?;
        info!("Using keyspace: {}", keyspace);
        Ok(())
    }

    /// Execute a statement without values
    pub async fn execute_simple(&self, query: &str) -> Result<QueryResult, RosterError> {
        self.execute_with_values(query, ()).await
    }

    /// Execute a statement with serializable values, ignoring paging
    pub async fn execute_with_values<V: SerializeRow>(
        &self,
        query: &str,
        values: V,
    ) -> Result<QueryResult, RosterError> {
        let start = Instant::now();
        let result = self.session.query_unpaged(query, values).await;
        metrics::record_operation(
            "execute",
            DATABASE_LABEL,
            result.is_ok(),
            start.elapsed().as_secs_f64(),
        );

        result.map_err(|e| RosterError::QueryError(format!("Query execution failed: {}", e)))
    }

    /// Execute a query and decode its first row, if any
    pub async fn query_one<T: FromRow, V: SerializeRow>(
        &self,
        query: &str,
        values: V,
    ) -> Result<Option<T>, RosterError> {
        let result = self.execute_with_values(query, values).await?;
        result
            .rows
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(|row| row.into_typed::<T>().map_err(RosterError::from))
            .transpose()
    }

    /// Health check
    pub async fn health_check(&self) -> Result<(), RosterError> {
        self.execute_simple("SELECT now() FROM system.local")
            .await
            .map_err(|e| RosterError::ConnectionError(format!("Health check failed: {}", e)))?;
        Ok(())
    }
}

impl Drop for ScyllaConnection {
    fn drop(&mut self) {
        metrics::ACTIVE_CONNECTIONS
            .with_label_values(&[DATABASE_LABEL])
            .dec();
    }
}

#[async_trait]
impl PageSource for ScyllaConnection {
    type Row = Row;

    async fn fetch_page(
        &self,
        query: &QueryDescriptor,
        token: Option<ContinuationToken>,
    ) -> Result<Page<Row>, RosterError> {
        let mut statement = Query::new(query.statement.as_str());
        statement.set_page_size(query.page_size.get());

        let paging_state = token
            .as_ref()
            .map(ContinuationToken::to_paging_state)
            .unwrap_or_else(PagingState::start);

        let start = Instant::now();
        let result = self
            .session
            .query_single_page(statement, &query.params, paging_state)
            .await;
        metrics::record_operation(
            "fetch_page",
            DATABASE_LABEL,
            result.is_ok(),
            start.elapsed().as_secs_f64(),
        );

        let (result, paging) = result
            .map_err(|e| RosterError::QueryError(format!("Page request failed: {}", e)))?;

        let next = match paging {
            PagingStateResponse::HasMorePages { state } => ContinuationToken::from_paging_state(&state),
            PagingStateResponse::NoMorePages => None,
        };
        let rows = result.rows.unwrap_or_default();
        metrics::record_rows_fetched(DATABASE_LABEL, rows.len());
        debug!("Page of {} row(s), more pages: {}", rows.len(), next.is_some());

        Ok(Page { rows, next })
    }
}
