//! SQL schema for the phone directory SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Lookup dimensions. `name_key` is the trimmed, lowercased name and carries
-- the uniqueness; `name` keeps the first spelling seen.
CREATE TABLE IF NOT EXISTS divisions (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    name     TEXT    NOT NULL,
    name_key TEXT    NOT NULL UNIQUE,
    weight   INTEGER NOT NULL DEFAULT 0 CHECK (weight BETWEEN 0 AND 100)
);

CREATE TABLE IF NOT EXISTS departments (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    name     TEXT    NOT NULL,
    name_key TEXT    NOT NULL UNIQUE,
    weight   INTEGER NOT NULL DEFAULT 0 CHECK (weight BETWEEN 0 AND 100)
);

CREATE TABLE IF NOT EXISTS titles (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    name     TEXT    NOT NULL,
    name_key TEXT    NOT NULL UNIQUE,
    weight   INTEGER NOT NULL DEFAULT 0 CHECK (weight BETWEEN 0 AND 100)
);

CREATE TABLE IF NOT EXISTS companies (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    name     TEXT    NOT NULL,
    name_key TEXT    NOT NULL UNIQUE,
    weight   INTEGER NOT NULL DEFAULT 0 CHECK (weight BETWEEN 0 AND 100)
);

CREATE TABLE IF NOT EXISTS sources (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    name          TEXT    NOT NULL,
    server        TEXT    NOT NULL,
    port          INTEGER NOT NULL DEFAULT 389,
    base_dn       TEXT    NOT NULL DEFAULT '',
    bind_dn       TEXT    NOT NULL DEFAULT '',
    bind_password TEXT    NOT NULL DEFAULT '',
    search_filter TEXT    NOT NULL,
    use_ssl       INTEGER NOT NULL DEFAULT 0,
    is_active     INTEGER NOT NULL DEFAULT 1,
    last_sync_at  TEXT                          -- RFC 3339 UTC or NULL
);

-- Manual contacts have neither source_id nor distinguished_name; directory
-- contacts have both. A DN is unique within its source only.
CREATE TABLE IF NOT EXISTS contacts (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    display_name       TEXT    NOT NULL,
    email              TEXT    NOT NULL DEFAULT '',
    phone              TEXT    NOT NULL DEFAULT '',
    division_id        INTEGER REFERENCES divisions(id),
    department_id      INTEGER REFERENCES departments(id),
    title_id           INTEGER REFERENCES titles(id),
    company_id         INTEGER REFERENCES companies(id),
    last_updated       TEXT    NOT NULL,
    source_id          INTEGER REFERENCES sources(id) ON DELETE CASCADE,
    distinguished_name TEXT,
    CHECK  ((source_id IS NULL) = (distinguished_name IS NULL)),
    UNIQUE (source_id, distinguished_name)
);

CREATE INDEX IF NOT EXISTS contacts_source_idx     ON contacts(source_id);
CREATE INDEX IF NOT EXISTS contacts_division_idx   ON contacts(division_id);
CREATE INDEX IF NOT EXISTS contacts_department_idx ON contacts(department_id);
CREATE INDEX IF NOT EXISTS contacts_title_idx      ON contacts(title_id);
CREATE INDEX IF NOT EXISTS contacts_company_idx    ON contacts(company_id);

PRAGMA user_version = 1;
";
