// 🗄️ Snapshot Store - SQLite persistence for units, identities and events
//
// Records are stored whole as JSON snapshots keyed by (kind, record_id).
// The content hash makes saves idempotent: writing an unchanged snapshot
// is a no-op and reports `false`.

use crate::identity::SecurityIdentity;
use crate::ledger::GenerativeUnit;
use crate::pathway::Pathway;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const GENERATIVE_UNIT_KIND: &str = "generative_unit";
pub const SECURITY_IDENTITY_KIND: &str = "security_identity";

// ============================================================================
// EVENTS (audit trail)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS snapshots (
            kind TEXT NOT NULL,
            record_id TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            scope TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            payload TEXT NOT NULL,
            saved_at TEXT NOT NULL,
            PRIMARY KEY (kind, record_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_snapshots_entity ON snapshots(kind, entity_id, scope)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp)",
        [],
    )?;

    Ok(())
}

/// SHA-256 of a serialized snapshot, hex encoded
pub fn compute_content_hash(payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// SNAPSHOTS
// ============================================================================

/// Upsert a snapshot; returns false when the stored content is identical
fn save_snapshot(
    conn: &Connection,
    kind: &str,
    record_id: &str,
    entity_id: &str,
    scope: &str,
    payload: &str,
) -> Result<bool> {
    let hash = compute_content_hash(payload);

    let existing: Option<String> = conn
        .query_row(
            "SELECT content_hash FROM snapshots WHERE kind = ?1 AND record_id = ?2",
            params![kind, record_id],
            |row| row.get(0),
        )
        .optional()?;

    if existing.as_deref() == Some(hash.as_str()) {
        return Ok(false);
    }

    conn.execute(
        "INSERT OR REPLACE INTO snapshots (
            kind, record_id, entity_id, scope, content_hash, payload, saved_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            kind,
            record_id,
            entity_id,
            scope,
            hash,
            payload,
            Utc::now().to_rfc3339(),
        ],
    )?;

    Ok(true)
}

fn load_payloads(conn: &Connection, kind: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT payload FROM snapshots WHERE kind = ?1 ORDER BY entity_id, scope",
    )?;
    let payloads = stmt
        .query_map(params![kind], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(payloads)
}

pub fn save_generative_unit(conn: &Connection, unit: &GenerativeUnit) -> Result<bool> {
    let payload = serde_json::to_string(unit)?;
    save_snapshot(
        conn,
        GENERATIVE_UNIT_KIND,
        &unit.id,
        &unit.entity_id,
        unit.pathway.as_str(),
        &payload,
    )
}

/// Latest unit an entity holds on a pathway
pub fn load_generative_unit(
    conn: &Connection,
    entity_id: &str,
    pathway: Pathway,
) -> Result<Option<GenerativeUnit>> {
    let payload: Option<String> = conn
        .query_row(
            "SELECT payload FROM snapshots
             WHERE kind = ?1 AND entity_id = ?2 AND scope = ?3
             ORDER BY saved_at DESC LIMIT 1",
            params![GENERATIVE_UNIT_KIND, entity_id, pathway.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    payload
        .map(|p| serde_json::from_str(&p).context("Failed to deserialize generative unit"))
        .transpose()
}

pub fn load_all_generative_units(conn: &Connection) -> Result<Vec<GenerativeUnit>> {
    load_payloads(conn, GENERATIVE_UNIT_KIND)?
        .iter()
        .map(|p| serde_json::from_str(p).context("Failed to deserialize generative unit"))
        .collect()
}

pub fn save_identity(conn: &Connection, identity: &SecurityIdentity) -> Result<bool> {
    let payload = serde_json::to_string(identity)?;
    save_snapshot(
        conn,
        SECURITY_IDENTITY_KIND,
        &identity.id,
        &identity.entity_id,
        &identity.entity_type,
        &payload,
    )
}

pub fn load_identity(conn: &Connection, entity_id: &str) -> Result<Option<SecurityIdentity>> {
    let payload: Option<String> = conn
        .query_row(
            "SELECT payload FROM snapshots
             WHERE kind = ?1 AND entity_id = ?2
             ORDER BY saved_at DESC LIMIT 1",
            params![SECURITY_IDENTITY_KIND, entity_id],
            |row| row.get(0),
        )
        .optional()?;

    payload
        .map(|p| serde_json::from_str(&p).context("Failed to deserialize security identity"))
        .transpose()
}

pub fn load_all_identities(conn: &Connection) -> Result<Vec<SecurityIdentity>> {
    load_payloads(conn, SECURITY_IDENTITY_KIND)?
        .iter()
        .map(|p| serde_json::from_str(p).context("Failed to deserialize security identity"))
        .collect()
}

// ============================================================================
// EVENT LOG
// ============================================================================

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Get events for a specific entity, newest first
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY timestamp DESC, id DESC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?
                    .with_timezone(&Utc),
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?,
                actor: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

pub fn count_events(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
    Ok(count)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::badges::BadgeRegistry;
    use crate::identity::{ActivityReport, SecurityIdentityEngine};
    use crate::ledger::ResourceLedger;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    #[test]
    fn test_content_hash_is_stable() {
        let a = compute_content_hash("{\"units\":100}");
        let b = compute_content_hash("{\"units\":100}");
        let c = compute_content_hash("{\"units\":99}");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_unit_snapshot_is_idempotent() {
        let conn = test_conn();
        let mut ledger = ResourceLedger::new();
        let unit = ledger.create("user-1", "individual", Pathway::Job, 100);

        assert!(save_generative_unit(&conn, &unit).unwrap());
        assert!(!save_generative_unit(&conn, &unit).unwrap());

        ledger.consume(&unit.id, 30, "training").unwrap();
        let updated = ledger.get(&unit.id).unwrap();
        assert!(save_generative_unit(&conn, updated).unwrap());

        let loaded = load_generative_unit(&conn, "user-1", Pathway::Job)
            .unwrap()
            .unwrap();
        assert_eq!(loaded.id, unit.id);
        assert_eq!(loaded.consumed_units, 30);
        assert_eq!(loaded.remaining_units, 70);
        assert_eq!(loaded.consumption_log.len(), 1);

        assert!(load_generative_unit(&conn, "user-1", Pathway::Creative)
            .unwrap()
            .is_none());
        assert_eq!(load_all_generative_units(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_identity_snapshot_roundtrip_keeps_derived_fields() {
        let conn = test_conn();
        let mut engine = SecurityIdentityEngine::new();
        let identity = engine.create("user-1", "individual");
        engine
            .record_activity(&identity.id, ActivityReport::verification())
            .unwrap();
        let template = BadgeRegistry::find_badge("Identity Verified").unwrap();
        let outcome = engine.award_badge(&identity.id, template).unwrap();

        assert!(save_identity(&conn, &outcome.identity).unwrap());

        let loaded = load_identity(&conn, "user-1").unwrap().unwrap();
        assert_eq!(loaded.id, identity.id);
        assert_eq!(loaded.verification_count, 1);
        assert_eq!(loaded.badges.len(), 1);
        assert_eq!(loaded.security_level, outcome.identity.security_level);
        assert_eq!(loaded.fibonacci_score, outcome.identity.fibonacci_score);

        assert!(load_identity(&conn, "nobody").unwrap().is_none());
        assert_eq!(load_all_identities(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_event_log() {
        let conn = test_conn();

        let event = Event::new(
            "consumption_blocked",
            "generative_unit",
            "unit-123",
            serde_json::json!({"amount": 79}),
            "activity_replay",
        );

        insert_event(&conn, &event).unwrap();

        let events = get_events_for_entity(&conn, "generative_unit", "unit-123").unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "consumption_blocked");
        assert_eq!(events[0].actor, "activity_replay");
        assert_eq!(events[0].data["amount"], 79);
        assert_eq!(count_events(&conn).unwrap(), 1);
    }
}
