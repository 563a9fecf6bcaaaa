//! Schema setup for the ScyllaDB document store

use crate::{DbConfig, DbError, DbResult};
use scylla::Session;
use tracing::info;

/// Create the keyspace and the documents table if missing
pub async fn run_all(session: &Session, config: &DbConfig) -> DbResult<()> {
    info!("Running database migrations...");

    let keyspace = validated_keyspace(&config.keyspace)?;

    let create_keyspace = format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = \
         {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
        keyspace,
        config.replication_factor.max(1)
    );
    session
        .query_unpaged(create_keyspace, &[])
        .await
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let create_table = format!(
        "CREATE TABLE IF NOT EXISTS {}.documents (\
            collection text, \
            id text, \
            body text, \
            PRIMARY KEY (collection, id)\
        )",
        keyspace
    );
    session
        .query_unpaged(create_table, &[])
        .await
        .map_err(|e| DbError::Migration(e.to_string()))?;

    info!("Migrations complete");
    Ok(())
}

/// Keyspace names are interpolated into CQL, so only identifiers pass
fn validated_keyspace(name: &str) -> DbResult<&str> {
    let valid = !name.is_empty()
        && name.len() <= 48
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && name.chars().next().is_some_and(|c| c.is_ascii_alphabetic());

    if valid {
        Ok(name)
    } else {
        Err(DbError::Configuration(format!("invalid keyspace name '{}'", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyspace_validation() {
        assert!(validated_keyspace("rescue_fleet").is_ok());
        assert!(validated_keyspace("1fleet").is_err());
        assert!(validated_keyspace("fleet; DROP").is_err());
        assert!(validated_keyspace("").is_err());
    }
}
