use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::db::Database;

impl Database {
    pub async fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.execute(move |conn| {
            conn.query_row(
                "SELECT value FROM kv_entries WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("failed to read key {key}"))
        })
        .await
    }

    pub async fn kv_set(&self, key: &str, value: String) -> Result<()> {
        let key = key.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO kv_entries (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .with_context(|| format!("failed to write key {key}"))?;
            Ok(())
        })
        .await
    }

    pub async fn kv_remove(&self, key: &str) -> Result<bool> {
        let key = key.to_string();
        self.execute(move |conn| {
            let removed = conn
                .execute("DELETE FROM kv_entries WHERE key = ?1", params![key])
                .with_context(|| format!("failed to remove key {key}"))?;
            Ok(removed > 0)
        })
        .await
    }

    pub async fn kv_keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = prefix.to_string();
        self.execute(move |conn| {
            // substr comparison avoids having to escape LIKE wildcards in ids.
            let mut stmt = conn.prepare(
                "SELECT key FROM kv_entries
                 WHERE substr(key, 1, length(?1)) = ?1
                 ORDER BY key ASC",
            )?;

            let mut rows = stmt.query(params![prefix])?;
            let mut keys = Vec::new();
            while let Some(row) = rows.next()? {
                keys.push(row.get::<_, String>(0)?);
            }

            Ok(keys)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;

    #[tokio::test]
    async fn set_get_overwrite_remove() {
        let db = Database::in_memory().unwrap();

        assert_eq!(db.kv_get("pets").await.unwrap(), None);

        db.kv_set("pets", "[]".into()).await.unwrap();
        assert_eq!(db.kv_get("pets").await.unwrap().as_deref(), Some("[]"));

        db.kv_set("pets", "[{}]".into()).await.unwrap();
        assert_eq!(db.kv_get("pets").await.unwrap().as_deref(), Some("[{}]"));

        assert!(db.kv_remove("pets").await.unwrap());
        assert!(!db.kv_remove("pets").await.unwrap());
        assert_eq!(db.kv_get("pets").await.unwrap(), None);
    }

    #[tokio::test]
    async fn prefix_listing_treats_wildcards_literally() {
        let db = Database::in_memory().unwrap();
        for key in ["meals:a", "meals:b", "meals_x", "walks:a"] {
            db.kv_set(key, "[]".into()).await.unwrap();
        }

        let keys = db.kv_keys_with_prefix("meals:").await.unwrap();
        assert_eq!(keys, vec!["meals:a".to_string(), "meals:b".to_string()]);

        // '_' is a LIKE wildcard; it must not match "meals:".
        let keys = db.kv_keys_with_prefix("meals_").await.unwrap();
        assert_eq!(keys, vec!["meals_x".to_string()]);
    }

    #[tokio::test]
    async fn file_database_persists_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("pawtrack.sqlite3");

        {
            let db = Database::new(path.clone()).unwrap();
            assert_eq!(db.path(), Some(path.as_path()));
            db.kv_set("walk_draft", "{}".into()).await.unwrap();
        }

        let reopened = Database::new(path).unwrap();
        assert_eq!(
            reopened.kv_get("walk_draft").await.unwrap().as_deref(),
            Some("{}")
        );
    }
}
