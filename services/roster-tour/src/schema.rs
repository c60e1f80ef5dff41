use rosterkit::database::ScyllaConnection;
use rosterkit::RosterError;
use tracing::info;

use crate::config::SchemaConfig;

pub fn create_keyspace(keyspace: &str, replication_factor: u32) -> String {
    format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
        keyspace,
        replication_factor.max(1)
    )
}

pub fn create_tables(keyspace: &str) -> Vec<String> {
    vec![
        format!(
            "CREATE TABLE IF NOT EXISTS {}.employees (id uuid PRIMARY KEY, firstname text, lastname text, age int)",
            keyspace
        ),
        // SELECT ... WHERE age = ? needs an index on a non-key column
        format!("CREATE INDEX IF NOT EXISTS ON {}.employees (age)", keyspace),
        format!(
            "CREATE TABLE IF NOT EXISTS {}.messages (channel uuid, msg_id int, username text, content text, PRIMARY KEY (channel, msg_id))",
            keyspace
        ),
    ]
}

/// Create the keyspace and tables the tour uses. Safe to run repeatedly.
pub async fn ensure_schema(
    conn: &ScyllaConnection,
    keyspace: &str,
    config: &SchemaConfig,
) -> Result<(), RosterError> {
    info!("Ensuring schema in keyspace {}", keyspace);

    conn.execute_simple(&create_keyspace(keyspace, config.replication_factor))
        .await?;
    for statement in create_tables(keyspace) {
        conn.execute_simple(&statement).await?;
    }

    conn.get_session()
        .await_schema_agreement()
        .await
        .map_err(|e| RosterError::QueryError(format!("Schema agreement failed: {}", e)))?;

    info!("Schema ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyspace_statement() {
        let cql = create_keyspace("roster", 3);
        assert!(cql.starts_with("CREATE KEYSPACE IF NOT EXISTS roster"));
        assert!(cql.contains("'replication_factor': 3"));
        assert!(create_keyspace("roster", 0).contains("'replication_factor': 1"));
    }

    #[test]
    fn test_messages_cluster_by_msg_id() {
        let tables = create_tables("roster");
        assert_eq!(tables.len(), 3);
        assert!(tables[2].contains("roster.messages"));
        assert!(tables[2].contains("PRIMARY KEY (channel, msg_id)"));
        assert!(tables[1].contains("roster.employees (age)"));
    }
}
