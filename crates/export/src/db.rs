//! The export database: one SQLite file per published channel version.

use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

use crate::error::{ErrorKind, Result};
use crate::models::{
    AssessmentMetadataRecord, AssessmentMetadataRow, ChannelMetadataRecord, ChannelMetadataRow, FileRecord, FileRow,
    KindCount, LocalFileRecord, LocalFileRow, NodeRecord, NodeRow, PublishStats, TreeIndex,
};
use crate::writer::ExportWriter;

/// Export schema, applied on connect.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
// One writer for the export transaction plus a few readers for stats.
const MAX_CONNECTIONS: u32 = 4;

/// Export database of a single channel.
///
/// Created empty for every publish, filled through an [`ExportWriter`] and
/// then read back for statistics before it is moved into place.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the export database at `path` and bring its
    /// schema up to date.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let options = Self::options().filename(path.as_ref()).create_if_missing(true);
        Self::open(options, MAX_CONNECTIONS).await
    }

    /// Not gated on `#[cfg(test)]` so other crates can use it in their tests.
    pub async fn connect_in_memory() -> Result<Self> {
        // Each connection to ":memory:" would see its own empty database.
        Self::open(Self::options().filename(":memory:"), 1).await
    }

    async fn open(options: SqliteConnectOptions, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            // Applied to every pooled connection, not just the first.
            .after_connect(|conn, meta| Box::pin(async move { Self::tune(conn, meta).await }))
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// The file is written once and then distributed, so durability only
    /// matters at the final checkpoint in [`close`](Self::close).
    fn options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Off)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(2))
    }

    async fn tune(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query("PRAGMA temp_store = MEMORY; PRAGMA cache_size = -16384; PRAGMA wal_autocheckpoint = 1000;")
            .execute(conn)
            .await?;
        Ok(())
    }

    #[instrument("migrating export database", skip(self))]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start the single write transaction of an export.
    pub async fn begin(&self) -> Result<ExportWriter> {
        let tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        Ok(ExportWriter::new(tx))
    }

    /// Every node with its tree position, in insertion order.
    pub async fn nodes(&self) -> Result<Vec<(NodeRecord, TreeIndex)>> {
        let rows: Vec<NodeRow> = sqlx::query_as(include_str!("../queries/list_nodes.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(NodeRow::into_record).collect()
    }

    pub async fn files(&self) -> Result<Vec<FileRecord>> {
        let rows: Vec<FileRow> = sqlx::query_as(include_str!("../queries/list_files.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(FileRecord::try_from).collect()
    }

    pub async fn local_files(&self) -> Result<Vec<LocalFileRecord>> {
        let rows: Vec<LocalFileRow> = sqlx::query_as(include_str!("../queries/list_local_files.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(LocalFileRecord::try_from).collect()
    }

    /// Tag names of a node, sorted.
    pub async fn node_tags(&self, node_id: &str) -> Result<Vec<String>> {
        sqlx::query_scalar(include_str!("../queries/list_node_tags.sql"))
            .bind(node_id)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    pub async fn assessment_metadata(&self, node_id: &str) -> Result<Option<AssessmentMetadataRecord>> {
        let row: Option<AssessmentMetadataRow> = sqlx::query_as(include_str!("../queries/get_assessment_metadata.sql"))
            .bind(node_id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(AssessmentMetadataRecord::try_from).transpose()
    }

    pub async fn channel_metadata(&self, channel_id: &str) -> Result<Option<ChannelMetadataRecord>> {
        let row: Option<ChannelMetadataRow> = sqlx::query_as(include_str!("../queries/get_channel_metadata.sql"))
            .bind(channel_id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(ChannelMetadataRecord::try_from).transpose()
    }

    /// Compute publish statistics from the committed export.
    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<PublishStats> {
        let resource_count: i64 = sqlx::query_scalar(include_str!("../queries/count_resources.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let kinds: Vec<(String, i64)> = sqlx::query_as(include_str!("../queries/count_kinds.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let size: i64 = sqlx::query_scalar(include_str!("../queries/total_size.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let languages: Vec<String> = sqlx::query_scalar(include_str!("../queries/list_languages.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;

        let kind_count = kinds
            .into_iter()
            .map(|(kind, count)| {
                let count = u64::try_from(count).or_raise(|| ErrorKind::InvalidData("kind count"))?;
                Ok(KindCount { kind, count })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(PublishStats {
            resource_count: u64::try_from(resource_count).or_raise(|| ErrorKind::InvalidData("resource count"))?,
            kind_count,
            size: u64::try_from(size).or_raise(|| ErrorKind::InvalidData("total size"))?,
            languages,
        })
    }

    /// Checkpoint the WAL into the main file and close every connection.
    /// Must be called before the file is copied anywhere.
    pub async fn close(&self) {
        // Ships planner statistics with the file for the importing side.
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closed_file_is_self_contained() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("channel.sqlite3");
        let db = Database::connect(&path).await.unwrap();
        assert!(!db.pool().is_closed());
        db.close().await;
        assert!(db.pool().is_closed());
        assert!(path.is_file());
        assert!(!dir.path().join("channel.sqlite3-wal").exists());
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = Database::connect_in_memory().await.unwrap();
        db.migrate().await.unwrap();
        db.close().await;
    }

    #[tokio::test]
    async fn test_pragmas_are_applied() {
        let db = Database::connect_in_memory().await.unwrap();
        let foreign_keys: i64 = sqlx::query_scalar("PRAGMA foreign_keys").fetch_one(db.pool()).await.unwrap();
        assert_eq!(foreign_keys, 1);
        let checkpoint: i64 = sqlx::query_scalar("PRAGMA wal_autocheckpoint").fetch_one(db.pool()).await.unwrap();
        assert_eq!(checkpoint, 1000);
        db.close().await;
    }

    #[tokio::test]
    async fn test_empty_export_has_empty_stats() {
        let db = Database::connect_in_memory().await.unwrap();
        assert_eq!(db.stats().await.unwrap(), PublishStats::default());
        assert!(db.nodes().await.unwrap().is_empty());
        assert!(db.channel_metadata("missing").await.unwrap().is_none());
        db.close().await;
    }
}
