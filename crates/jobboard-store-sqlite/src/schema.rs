//! SQL schema for the job-board SQLite store.
//!
//! Executed once at connection startup. Each account kind is its own table,
//! so emails are unique per kind. Secondary identifiers are nullable UNIQUE
//! columns: SQLite never treats two NULLs as equal, so absent values never
//! conflict.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS job_seekers (
    account_id        TEXT PRIMARY KEY,
    email             TEXT NOT NULL UNIQUE,
    password_hash     TEXT NOT NULL,
    is_verified       INTEGER NOT NULL DEFAULT 0,
    verification_code TEXT,            -- NULL once consumed
    code_expires_at   TEXT,            -- RFC 3339 UTC
    step              INTEGER NOT NULL DEFAULT 1 CHECK (step BETWEEN 1 AND 5),
    is_complete       INTEGER NOT NULL DEFAULT 0,
    trust_score       INTEGER NOT NULL DEFAULT 0 CHECK (trust_score BETWEEN 0 AND 100),
    created_at        TEXT NOT NULL,
    last_login_at     TEXT,
    national_id       TEXT UNIQUE,     -- mirrored from profile_json
    profile_json      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS companies (
    account_id          TEXT PRIMARY KEY,
    email               TEXT NOT NULL UNIQUE,
    password_hash       TEXT NOT NULL,
    is_verified         INTEGER NOT NULL DEFAULT 0,
    verification_code   TEXT,
    code_expires_at     TEXT,
    step                INTEGER NOT NULL DEFAULT 1 CHECK (step BETWEEN 1 AND 5),
    is_complete         INTEGER NOT NULL DEFAULT 0,
    trust_score         INTEGER NOT NULL DEFAULT 0 CHECK (trust_score BETWEEN 0 AND 100),
    created_at          TEXT NOT NULL,
    last_login_at       TEXT,
    tax_number          TEXT UNIQUE,
    commercial_register TEXT UNIQUE,
    profile_json        TEXT NOT NULL
);

PRAGMA user_version = 1;
";
