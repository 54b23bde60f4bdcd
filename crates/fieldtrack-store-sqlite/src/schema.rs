//! SQL schema for the fieldtrack SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id               TEXT PRIMARY KEY,
    identity_kind         TEXT NOT NULL,            -- 'email' | 'phone'
    identity              TEXT NOT NULL,            -- normalised address / E.164
    verified              INTEGER NOT NULL DEFAULT 0,
    is_active             INTEGER NOT NULL DEFAULT 1,
    credential_digest     TEXT,                     -- SHA-256 hex; NULL once consumed
    credential_expires_at TEXT,
    last_login_at         TEXT,
    created_at            TEXT NOT NULL,
    current_job_id        TEXT,
    UNIQUE (identity_kind, identity)
);

CREATE TABLE IF NOT EXISTS jobs (
    job_id       TEXT PRIMARY KEY,
    user_id      TEXT NOT NULL REFERENCES users(user_id),
    device_id    TEXT NOT NULL,
    started_at   TEXT NOT NULL,
    ended_at     TEXT,
    login_photo  TEXT,
    logout_photo TEXT,
    is_active    INTEGER NOT NULL DEFAULT 1
);

-- Location points are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
-- `seq` preserves arrival order for a job's location list.
CREATE TABLE IF NOT EXISTS locations (
    seq                 INTEGER PRIMARY KEY AUTOINCREMENT,
    location_id         TEXT NOT NULL UNIQUE,
    user_id             TEXT NOT NULL REFERENCES users(user_id),
    job_id              TEXT REFERENCES jobs(job_id),
    latitude            REAL NOT NULL,
    longitude           REAL NOT NULL,
    recorded_at         TEXT NOT NULL,   -- RFC 3339 UTC, microsecond precision
    place_name          TEXT,
    address             TEXT,
    accuracy            REAL,
    is_stationary       INTEGER NOT NULL DEFAULT 0,
    stationary_duration REAL
);

-- At most one active job per user.
CREATE UNIQUE INDEX IF NOT EXISTS jobs_one_active_idx
    ON jobs(user_id) WHERE is_active = 1;

CREATE INDEX IF NOT EXISTS jobs_user_started_idx     ON jobs(user_id, started_at);
CREATE INDEX IF NOT EXISTS users_credential_idx      ON users(credential_digest);
CREATE INDEX IF NOT EXISTS locations_user_time_idx   ON locations(user_id, recorded_at);
CREATE INDEX IF NOT EXISTS locations_job_time_idx    ON locations(job_id, recorded_at);

PRAGMA user_version = 1;
";
