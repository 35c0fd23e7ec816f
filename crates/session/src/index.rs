//! The session index: a small `rusqlite` database
//! holding the active-session marker, session metadata (for crash/restore
//! scanning), and handoff summaries. Treated as a black-box lookup layer
//! beside the append-only journal — never a second source of truth for
//! event content.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection};

use ayati_domain::error::{Error, Result};
use ayati_domain::ids::SessionId;

pub struct SessionIndex {
    conn: Mutex<Connection>,
}

impl SessionIndex {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|e| Error::Index(e.to_string()))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS active_session (
                client_id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                session_path TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS session_meta (
                session_id TEXT PRIMARY KEY,
                client_id TEXT NOT NULL,
                started_at TEXT NOT NULL,
                crashed INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE IF NOT EXISTS handoff_summary (
                session_id TEXT PRIMARY KEY,
                summary TEXT NOT NULL
            );",
        )
        .map_err(|e| Error::Index(e.to_string()))?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::Index(e.to_string()))?;
        conn.execute_batch(
            "CREATE TABLE active_session (client_id TEXT PRIMARY KEY, session_id TEXT NOT NULL, session_path TEXT NOT NULL);
             CREATE TABLE session_meta (session_id TEXT PRIMARY KEY, client_id TEXT NOT NULL, started_at TEXT NOT NULL, crashed INTEGER NOT NULL DEFAULT 0);
             CREATE TABLE handoff_summary (session_id TEXT PRIMARY KEY, summary TEXT NOT NULL);",
        )
        .map_err(|e| Error::Index(e.to_string()))?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn set_active_session(&self, client_id: &str, session_id: SessionId, session_path: &str) -> Result<()> {
        self.conn
            .lock()
            .execute(
                "INSERT INTO active_session (client_id, session_id, session_path) VALUES (?1, ?2, ?3)
                 ON CONFLICT(client_id) DO UPDATE SET session_id = excluded.session_id, session_path = excluded.session_path",
                params![client_id, session_id.to_string(), session_path],
            )
            .map_err(|e| Error::Index(e.to_string()))?;
        Ok(())
    }

    pub fn active_session(&self, client_id: &str) -> Result<Option<(SessionId, String)>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT session_id, session_path FROM active_session WHERE client_id = ?1")
            .map_err(|e| Error::Index(e.to_string()))?;
        let mut rows = stmt.query(params![client_id]).map_err(|e| Error::Index(e.to_string()))?;
        if let Some(row) = rows.next().map_err(|e| Error::Index(e.to_string()))? {
            let sid: String = row.get(0).map_err(|e| Error::Index(e.to_string()))?;
            let path: String = row.get(1).map_err(|e| Error::Index(e.to_string()))?;
            let uuid: uuid::Uuid = sid.parse().map_err(|_| Error::Index("corrupt session_id in index".into()))?;
            return Ok(Some((uuid.into(), path)));
        }
        Ok(None)
    }

    pub fn record_session_meta(&self, session_id: SessionId, client_id: &str) -> Result<()> {
        self.conn
            .lock()
            .execute(
                "INSERT INTO session_meta (session_id, client_id, started_at, crashed) VALUES (?1, ?2, ?3, 0)
                 ON CONFLICT(session_id) DO NOTHING",
                params![session_id.to_string(), client_id, chrono::Utc::now().to_rfc3339()],
            )
            .map_err(|e| Error::Index(e.to_string()))?;
        Ok(())
    }

    pub fn mark_crashed(&self, session_id: SessionId) -> Result<()> {
        self.conn
            .lock()
            .execute("UPDATE session_meta SET crashed = 1 WHERE session_id = ?1", params![session_id.to_string()])
            .map_err(|e| Error::Index(e.to_string()))?;
        Ok(())
    }

    /// Recent, non-crashed sessions started within `within` of now —
    /// candidates for the time-bounded recovery scan.
    pub fn recent_sessions(&self, within: chrono::Duration) -> Result<Vec<(SessionId, String)>> {
        let cutoff = chrono::Utc::now() - within;
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT session_id, client_id FROM session_meta WHERE crashed = 0 AND started_at >= ?1 ORDER BY started_at DESC")
            .map_err(|e| Error::Index(e.to_string()))?;
        let rows = stmt
            .query_map(params![cutoff.to_rfc3339()], |row| {
                let sid: String = row.get(0)?;
                let cid: String = row.get(1)?;
                Ok((sid, cid))
            })
            .map_err(|e| Error::Index(e.to_string()))?;
        let mut out = Vec::new();
        for row in rows {
            let (sid, cid) = row.map_err(|e| Error::Index(e.to_string()))?;
            let uuid: uuid::Uuid = sid.parse().map_err(|_| Error::Index("corrupt session_id in index".into()))?;
            out.push((uuid.into(), cid));
        }
        Ok(out)
    }

    pub fn set_handoff_summary(&self, session_id: SessionId, summary: &str) -> Result<()> {
        self.conn
            .lock()
            .execute(
                "INSERT INTO handoff_summary (session_id, summary) VALUES (?1, ?2)
                 ON CONFLICT(session_id) DO UPDATE SET summary = excluded.summary",
                params![session_id.to_string(), summary],
            )
            .map_err(|e| Error::Index(e.to_string()))?;
        Ok(())
    }

    pub fn handoff_summary(&self, session_id: SessionId) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT summary FROM handoff_summary WHERE session_id = ?1")
            .map_err(|e| Error::Index(e.to_string()))?;
        let mut rows = stmt.query(params![session_id.to_string()]).map_err(|e| Error::Index(e.to_string()))?;
        if let Some(row) = rows.next().map_err(|e| Error::Index(e.to_string()))? {
            return Ok(Some(row.get(0).map_err(|e| Error::Index(e.to_string()))?));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_session_round_trips() {
        let index = SessionIndex::in_memory().unwrap();
        let sid = SessionId::new();
        index.set_active_session("client-1", sid, "sessions/2026/03/01/x.md").unwrap();
        let (found, path) = index.active_session("client-1").unwrap().unwrap();
        assert_eq!(found, sid);
        assert_eq!(path, "sessions/2026/03/01/x.md");
    }

    #[test]
    fn crashed_sessions_excluded_from_recent() {
        let index = SessionIndex::in_memory().unwrap();
        let sid = SessionId::new();
        index.record_session_meta(sid, "client-1").unwrap();
        assert_eq!(index.recent_sessions(chrono::Duration::hours(24)).unwrap().len(), 1);
        index.mark_crashed(sid).unwrap();
        assert_eq!(index.recent_sessions(chrono::Duration::hours(24)).unwrap().len(), 0);
    }
}
