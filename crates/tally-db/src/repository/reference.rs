//! # Reference Repository
//!
//! Branches, warehouses, payment methods and sales reps: small id → name
//! lists used to label documents and report rows.
//!
//! Reports read names through a [`ReferenceCache`] loaded once per session,
//! so a dashboard fetch does not query the lists again.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;
use tally_core::reference::{ReferenceData, ReferenceEntry, ReferenceKind, ReferenceLookup};
use tally_core::validation::{validate_reference_id, validate_reference_name};
use tally_core::CoreError;

#[derive(Debug, sqlx::FromRow)]
struct EntryRow {
    id: String,
    name: String,
}

impl From<EntryRow> for ReferenceEntry {
    fn from(row: EntryRow) -> Self {
        ReferenceEntry {
            id: row.id,
            name: row.name,
        }
    }
}

/// Repository for the four reference lists.
#[derive(Debug, Clone)]
pub struct ReferenceRepository {
    pool: SqlitePool,
}

impl ReferenceRepository {
    /// Creates a new ReferenceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReferenceRepository { pool }
    }

    /// Lists one reference list, sorted by name.
    pub async fn list(&self, kind: ReferenceKind) -> DbResult<Vec<ReferenceEntry>> {
        // Table names come from a fixed set, never from input
        let sql = format!("SELECT id, name FROM {} ORDER BY name, id", kind.table());
        let rows: Vec<EntryRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        Ok(rows.into_iter().map(ReferenceEntry::from).collect())
    }

    /// Inserts an entry or renames an existing one.
    pub async fn upsert(&self, kind: ReferenceKind, entry: &ReferenceEntry) -> DbResult<()> {
        validate_reference_id(&entry.id).map_err(CoreError::from)?;
        validate_reference_name(&entry.name).map_err(CoreError::from)?;
        debug!(%kind, id = %entry.id, name = %entry.name, "Upserting reference entry");

        let sql = format!(
            "INSERT INTO {} (id, name) VALUES (?1, ?2) \
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
            kind.table()
        );
        sqlx::query(&sql)
            .bind(&entry.id)
            .bind(&entry.name)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Removes an entry. Returns whether it existed.
    ///
    /// Documents keep the removed id; reports then show the raw id.
    pub async fn remove(&self, kind: ReferenceKind, id: &str) -> DbResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", kind.table());
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Loads all four lists.
    pub async fn load(&self) -> DbResult<ReferenceData> {
        let mut data = ReferenceData::new();
        for kind in ReferenceKind::ALL {
            data.set(kind, self.list(kind).await?);
        }
        Ok(data)
    }
}

// =============================================================================
// Session Cache
// =============================================================================

/// Reference lists held in memory for one session.
///
/// Edits made through [`ReferenceRepository`] are not seen until
/// [`refresh`](Self::refresh).
#[derive(Debug, Clone)]
pub struct ReferenceCache {
    repo: ReferenceRepository,
    data: ReferenceData,
    loaded_at: DateTime<Utc>,
}

impl ReferenceCache {
    /// Loads every list once.
    pub async fn load(repo: ReferenceRepository) -> DbResult<Self> {
        let data = repo.load().await?;
        info!(entries = data.len(), "Reference lists loaded");

        Ok(ReferenceCache {
            repo,
            data,
            loaded_at: Utc::now(),
        })
    }

    /// Reloads every list from the store.
    pub async fn refresh(&mut self) -> DbResult<()> {
        self.data = self.repo.load().await?;
        self.loaded_at = Utc::now();
        debug!(entries = self.data.len(), "Reference lists refreshed");
        Ok(())
    }

    pub fn data(&self) -> &ReferenceData {
        &self.data
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

impl ReferenceLookup for ReferenceCache {
    fn name(&self, kind: ReferenceKind, id: &str) -> Option<&str> {
        self.data.name(kind, id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig, DbError};

    fn entry(id: &str, name: &str) -> ReferenceEntry {
        ReferenceEntry {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_upsert_list_remove() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.references();

        repo.upsert(ReferenceKind::Branch, &entry("b-2", "Riyadh")).await.unwrap();
        repo.upsert(ReferenceKind::Branch, &entry("b-1", "Jeddah")).await.unwrap();
        repo.upsert(ReferenceKind::Branch, &entry("b-2", "Riyadh Main")).await.unwrap();

        let branches = repo.list(ReferenceKind::Branch).await.unwrap();
        assert_eq!(branches, vec![entry("b-1", "Jeddah"), entry("b-2", "Riyadh Main")]);
        assert!(repo.list(ReferenceKind::SalesRep).await.unwrap().is_empty());

        assert!(repo.remove(ReferenceKind::Branch, "b-1").await.unwrap());
        assert!(!repo.remove(ReferenceKind::Branch, "b-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db
            .references()
            .upsert(ReferenceKind::Warehouse, &entry("w-1", "  "))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(_)));
    }

    #[tokio::test]
    async fn test_cache_sees_edits_after_refresh() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.references();
        repo.upsert(ReferenceKind::SalesRep, &entry("rep-1", "Omar")).await.unwrap();

        let mut cache = db.reference_cache().await.unwrap();
        assert_eq!(cache.sales_rep_name("rep-1"), Some("Omar"));
        assert_eq!(cache.label(ReferenceKind::SalesRep, "rep-9"), "rep-9");

        repo.upsert(ReferenceKind::SalesRep, &entry("rep-9", "Layla")).await.unwrap();
        assert_eq!(cache.sales_rep_name("rep-9"), None);

        cache.refresh().await.unwrap();
        assert_eq!(cache.sales_rep_name("rep-9"), Some("Layla"));
    }
}
