//! SQL schema for the Waypost SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated
//! on `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS principals (
    principal_id TEXT PRIMARY KEY,
    email        TEXT NOT NULL UNIQUE,
    name         TEXT,
    avatar_uri   TEXT,
    created_at   TEXT NOT NULL,   -- ISO 8601 UTC; never updated after insert
    last_login   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS markers (
    marker_id     TEXT PRIMARY KEY,
    owner_email   TEXT NOT NULL,
    location_name TEXT NOT NULL,
    latitude      REAL NOT NULL,
    longitude     REAL NOT NULL,
    image_uri     TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS reviews (
    review_id             TEXT PRIMARY KEY,
    establishment_name    TEXT NOT NULL,
    address               TEXT NOT NULL,
    latitude              REAL NOT NULL,
    longitude             REAL NOT NULL,
    rating                INTEGER NOT NULL CHECK (rating BETWEEN 0 AND 5),
    images                TEXT NOT NULL DEFAULT '[]',  -- JSON array of URIs
    author_email          TEXT NOT NULL,               -- immutable after insert
    author_name           TEXT NOT NULL,
    credential            TEXT NOT NULL,
    created_at            TEXT NOT NULL,
    credential_expires_at TEXT NOT NULL
);

-- Visits are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS visits (
    visit_id      TEXT PRIMARY KEY,
    visitor_email TEXT NOT NULL,
    visited_email TEXT NOT NULL,
    credential    TEXT NOT NULL,
    visited_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS markers_owner_idx  ON markers(owner_email);
CREATE INDEX IF NOT EXISTS reviews_author_idx ON reviews(author_email);
CREATE INDEX IF NOT EXISTS visits_visited_idx ON visits(visited_email, visited_at);

PRAGMA user_version = 1;
";
