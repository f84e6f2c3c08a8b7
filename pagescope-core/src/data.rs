use crate::error::{StoreError, StoreResult};
use crate::model::{Target, TargetId, TargetPage, TargetStatus};
use pagescope_scanner::{BrokenLink, HeadingProfile, HtmlVersion, LinkProfile, PageReport};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use url::Url;

pub const MAX_PAGE_SIZE: u32 = 50;

/// Persistence seam for targets and their analysis results.
///
/// Status changes into and out of `running` are conditional updates, so a
/// caller can tell whether it actually won the transition.
pub trait TargetStore: Send + Sync {
    fn create_target(&self, url: &str) -> StoreResult<TargetId>;
    fn get_target(&self, id: TargetId) -> StoreResult<Option<Target>>;
    fn list_targets(&self, page: u32, page_size: u32) -> StoreResult<TargetPage>;
    fn delete_target(&self, id: TargetId) -> StoreResult<()>;

    /// Move a non-running target to `running`. Returns false if it was
    /// already running or does not exist.
    fn claim_for_analysis(&self, id: TargetId) -> StoreResult<bool>;

    /// Move a running target to `error` with `message`. Returns false if the
    /// target was no longer running.
    fn fail_if_running(&self, id: TargetId, message: &str) -> StoreResult<bool>;

    /// Replace all results for a running target and mark it `done`, in one
    /// transaction. Returns false (and writes nothing) if the target was no
    /// longer running.
    fn store_report(&self, id: TargetId, report: &PageReport) -> StoreResult<bool>;

    fn get_heading_profile(&self, id: TargetId) -> StoreResult<Option<HeadingProfile>>;
    fn get_link_profile(&self, id: TargetId) -> StoreResult<Option<LinkProfile>>;
    fn get_broken_links(&self, id: TargetId) -> StoreResult<Vec<BrokenLink>>;
}

/// SQLite-backed [`TargetStore`].
pub struct Database {
    conn: Mutex<Connection>,
}

fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Accept only absolute http(s) URLs with a host.
pub fn validate_target_url(raw: &str) -> StoreResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| StoreError::InvalidUrl(format!("{}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(StoreError::InvalidUrl(format!(
                "{}: unsupported scheme '{}'",
                raw, other
            )));
        }
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(StoreError::InvalidUrl(format!("{}: missing host", raw)));
    }
    Ok(url)
}

fn row_to_target(row: &Row<'_>) -> rusqlite::Result<(Target, String)> {
    let status: String = row.get(2)?;
    let html_version: Option<String> = row.get(4)?;
    let target = Target {
        id: row.get(0)?,
        url: row.get(1)?,
        status: TargetStatus::Queued,
        title: row.get(3)?,
        html_version: html_version.as_deref().map(HtmlVersion::from_label),
        error_message: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    };
    Ok((target, status))
}

fn with_status((mut target, status): (Target, String)) -> StoreResult<Target> {
    target.status = TargetStatus::from_str(&status).ok_or_else(|| {
        StoreError::Corrupt(format!("target {} has unknown status '{}'", target.id, status))
    })?;
    Ok(target)
}

const TARGET_COLUMNS: &str =
    "id, url, status, title, html_version, error_message, created_at, updated_at";

impl Database {
    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn remove(path: &Path) -> std::io::Result<()> {
        fs::remove_file(path)
    }

    pub fn new(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        let db = Database {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Corrupt("database connection lock poisoned".to_string()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        self.conn()?.execute_batch(
            "
CREATE TABLE IF NOT EXISTS targets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'queued' CHECK(status IN ('queued', 'running', 'done', 'error')),
    title TEXT,
    html_version TEXT,
    error_message TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_targets_created ON targets(created_at);

CREATE TABLE IF NOT EXISTS heading_profiles (
    target_id INTEGER PRIMARY KEY,
    h1 INTEGER NOT NULL DEFAULT 0,
    h2 INTEGER NOT NULL DEFAULT 0,
    h3 INTEGER NOT NULL DEFAULT 0,
    h4 INTEGER NOT NULL DEFAULT 0,
    h5 INTEGER NOT NULL DEFAULT 0,
    h6 INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY(target_id) REFERENCES targets(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS link_profiles (
    target_id INTEGER PRIMARY KEY,
    internal_links INTEGER NOT NULL DEFAULT 0,
    external_links INTEGER NOT NULL DEFAULT 0,
    has_login_form BOOLEAN NOT NULL DEFAULT 0,
    FOREIGN KEY(target_id) REFERENCES targets(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS broken_links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    target_id INTEGER NOT NULL,
    url TEXT NOT NULL,
    status_code INTEGER NOT NULL,
    FOREIGN KEY(target_id) REFERENCES targets(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_broken_links_target ON broken_links(target_id);
            ",
        )?;
        Ok(())
    }
}

impl TargetStore for Database {
    fn create_target(&self, url: &str) -> StoreResult<TargetId> {
        let url = validate_target_url(url)?;
        let timestamp = current_timestamp();

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO targets (url, status, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![url.as_str(), TargetStatus::Queued.as_str(), timestamp],
        )?;

        let id = conn.last_insert_rowid();
        debug!("Created target {} for {}", id, url);
        Ok(id)
    }

    fn get_target(&self, id: TargetId) -> StoreResult<Option<Target>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM targets WHERE id = ?1",
            TARGET_COLUMNS
        ))?;

        let row = stmt.query_row(params![id], row_to_target).optional()?;
        row.map(with_status).transpose()
    }

    fn list_targets(&self, page: u32, page_size: u32) -> StoreResult<TargetPage> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let offset = (page as i64 - 1) * page_size as i64;

        let conn = self.conn()?;
        let total_count: i64 = conn.query_row("SELECT COUNT(*) FROM targets", [], |row| row.get(0))?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM targets ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
            TARGET_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![page_size as i64, offset], row_to_target)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let targets = rows.into_iter().map(with_status).collect::<StoreResult<Vec<_>>>()?;

        Ok(TargetPage {
            targets,
            total_count,
            page,
            page_size,
        })
    }

    fn delete_target(&self, id: TargetId) -> StoreResult<()> {
        let deleted = self
            .conn()?
            .execute("DELETE FROM targets WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    fn claim_for_analysis(&self, id: TargetId) -> StoreResult<bool> {
        let updated = self.conn()?.execute(
            "UPDATE targets SET status = 'running', error_message = NULL, updated_at = ?1
             WHERE id = ?2 AND status != 'running'",
            params![current_timestamp(), id],
        )?;
        Ok(updated == 1)
    }

    fn fail_if_running(&self, id: TargetId, message: &str) -> StoreResult<bool> {
        let updated = self.conn()?.execute(
            "UPDATE targets SET status = 'error', error_message = ?1, updated_at = ?2
             WHERE id = ?3 AND status = 'running'",
            params![message, current_timestamp(), id],
        )?;
        Ok(updated == 1)
    }

    fn store_report(&self, id: TargetId, report: &PageReport) -> StoreResult<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let updated = tx.execute(
            "UPDATE targets SET status = 'done', title = ?1, html_version = ?2,
                error_message = NULL, updated_at = ?3
             WHERE id = ?4 AND status = 'running'",
            params![
                &report.title,
                report.html_version.as_str(),
                current_timestamp(),
                id
            ],
        )?;
        if updated == 0 {
            // Dropping the transaction rolls it back.
            return Ok(false);
        }

        let h = &report.headings;
        tx.execute(
            "INSERT OR REPLACE INTO heading_profiles (target_id, h1, h2, h3, h4, h5, h6)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![id, h.h1, h.h2, h.h3, h.h4, h.h5, h.h6],
        )?;

        let l = &report.links;
        tx.execute(
            "INSERT OR REPLACE INTO link_profiles (target_id, internal_links, external_links, has_login_form)
             VALUES (?1, ?2, ?3, ?4)",
            params![id, l.internal_links, l.external_links, l.has_login_form],
        )?;

        tx.execute("DELETE FROM broken_links WHERE target_id = ?1", params![id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO broken_links (target_id, url, status_code) VALUES (?1, ?2, ?3)",
            )?;
            for link in &report.broken_links {
                stmt.execute(params![id, &link.url, link.status_code])?;
            }
        }

        tx.commit()?;
        debug!(
            "Stored report for target {} ({} broken links)",
            id,
            report.broken_links.len()
        );
        Ok(true)
    }

    fn get_heading_profile(&self, id: TargetId) -> StoreResult<Option<HeadingProfile>> {
        let conn = self.conn()?;
        let profile = conn
            .query_row(
                "SELECT h1, h2, h3, h4, h5, h6 FROM heading_profiles WHERE target_id = ?1",
                params![id],
                |row| {
                    Ok(HeadingProfile {
                        h1: row.get(0)?,
                        h2: row.get(1)?,
                        h3: row.get(2)?,
                        h4: row.get(3)?,
                        h5: row.get(4)?,
                        h6: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }

    fn get_link_profile(&self, id: TargetId) -> StoreResult<Option<LinkProfile>> {
        let conn = self.conn()?;
        let profile = conn
            .query_row(
                "SELECT internal_links, external_links, has_login_form FROM link_profiles WHERE target_id = ?1",
                params![id],
                |row| {
                    Ok(LinkProfile {
                        internal_links: row.get(0)?,
                        external_links: row.get(1)?,
                        has_login_form: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }

    fn get_broken_links(&self, id: TargetId) -> StoreResult<Vec<BrokenLink>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT url, status_code FROM broken_links WHERE target_id = ?1 ORDER BY id")?;

        let links = stmt
            .query_map(params![id], |row| {
                Ok(BrokenLink {
                    url: row.get(0)?,
                    status_code: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(links)
    }
}
