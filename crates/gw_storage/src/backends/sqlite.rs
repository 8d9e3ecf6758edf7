use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqliteRow, SqliteSynchronous,
};
use sqlx::Row;
use tracing::info;

use gw_core::types::DEFAULT_CATEGORY;
use gw_core::{Article, ArticleStore, Error, NewArticle, Result};

/// Schema history. Entry `i` brings the database to `user_version`
/// `i + 1`; entries at or below the stored version are skipped. Append
/// only, never edit a shipped entry.
const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        category      TEXT,
        title         TEXT NOT NULL,
        url           TEXT NOT NULL UNIQUE,
        source_name   TEXT,
        source_url    TEXT,
        source_domain TEXT,
        published_at  TEXT,
        created_at    TEXT NOT NULL,
        summary       TEXT,
        summarized_at TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_articles_summarized_at ON articles(summarized_at)",
    "CREATE INDEX IF NOT EXISTS idx_articles_created_at ON articles(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_articles_category ON articles(category)",
];

pub struct SqliteStore {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SqliteStore {
    pub async fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| Error::Storage(format!("failed to open database: {e}")))?;

        migrate(&pool).await?;

        Ok(Self { pool, db_path })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

async fn migrate(pool: &SqlitePool) -> Result<()> {
    let version: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await
        .map_err(|e| Error::Storage(format!("failed to read schema version: {e}")))?;

    for (i, statement) in MIGRATIONS.iter().enumerate().skip(version as usize) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| Error::Storage(format!("migration {} failed: {e}", i + 1)))?;
        sqlx::query(&format!("PRAGMA user_version = {}", i + 1))
            .execute(pool)
            .await
            .map_err(|e| Error::Storage(format!("failed to record schema version: {e}")))?;
    }

    if (version as usize) < MIGRATIONS.len() {
        info!(
            from = version,
            to = MIGRATIONS.len(),
            "applied schema migrations"
        );
    }

    Ok(())
}

fn parse_instant(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    match value {
        None => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| Error::Storage(format!("bad timestamp {raw:?}: {e}"))),
    }
}

fn article_from_row(row: &SqliteRow) -> Result<Article> {
    Ok(Article {
        id: row.get("id"),
        title: row.get("title"),
        url: row.get("url"),
        category: row
            .get::<Option<String>, _>("category")
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        source_name: row
            .get::<Option<String>, _>("source_name")
            .unwrap_or_default(),
        source_url: row
            .get::<Option<String>, _>("source_url")
            .unwrap_or_default(),
        source_domain: row
            .get::<Option<String>, _>("source_domain")
            .unwrap_or_default(),
        published_at: parse_instant(row.get("published_at"))?,
        created_at: parse_instant(row.get("created_at"))?
            .ok_or_else(|| Error::Storage("article row missing created_at".to_string()))?,
        summary: row.get("summary"),
        summarized_at: parse_instant(row.get("summarized_at"))?,
    })
}

#[async_trait]
impl ArticleStore for SqliteStore {
    async fn insert_article(&self, article: &NewArticle) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO articles
            (category, title, url, source_name, source_url, source_domain, published_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&article.category)
        .bind(&article.title)
        .bind(&article.url)
        .bind(&article.source_name)
        .bind(&article.source_url)
        .bind(&article.source_domain)
        .bind(article.published_at.map(|dt| dt.to_rfc3339()))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Storage(format!("failed to insert article: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn unsummarized(&self, limit: u32) -> Result<Vec<Article>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM articles
            WHERE summary IS NULL OR summary = ''
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Storage(format!("failed to select unsummarized: {e}")))?;

        rows.iter().map(article_from_row).collect()
    }

    async fn set_summary(&self, id: i64, summary: &str, at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE articles
            SET summary = ?, summarized_at = ?
            WHERE id = ? AND (summary IS NULL OR summary = '')
            "#,
        )
        .bind(summary)
        .bind(at.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Storage(format!("failed to store summary: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(Error::Storage(format!(
                "article {id} missing or already summarized"
            )));
        }
        Ok(())
    }

    async fn summarized_page(&self, limit: u32, offset: u32) -> Result<Vec<Article>> {
        // RFC 3339 UTC strings compare lexicographically in time order
        let rows = sqlx::query(
            r#"
            SELECT * FROM articles
            WHERE summary IS NOT NULL AND summary != ''
            ORDER BY COALESCE(summarized_at, created_at) DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Storage(format!("failed to select summarized page: {e}")))?;

        rows.iter().map(article_from_row).collect()
    }

    async fn summarized_count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM articles WHERE summary IS NOT NULL AND summary != ''",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::Storage(format!("failed to count summarized: {e}")))?;

        Ok(count as u64)
    }

    async fn get(&self, id: i64) -> Result<Option<Article>> {
        let row = sqlx::query("SELECT * FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Storage(format!("failed to fetch article {id}: {e}")))?;

        row.as_ref().map(article_from_row).transpose()
    }
}
