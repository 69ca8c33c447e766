//! Database schema and migrations for gamehub.
//!
//! Migrations are applied sequentially when the database is opened; the
//! `schema_version` table records which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: accounts, bearer tokens and permissions
    r#"
CREATE TABLE users (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT NOT NULL,
    email           TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash   TEXT NOT NULL,           -- Argon2id PHC string
    activated       INTEGER NOT NULL DEFAULT 0,
    version         INTEGER NOT NULL DEFAULT 1,
    created_at      TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Only the SHA-256 of a token is stored; expiry is a unix timestamp.
CREATE TABLE tokens (
    hash        BLOB PRIMARY KEY,
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    scope       TEXT NOT NULL,               -- 'authentication', 'activation'
    expiry      INTEGER NOT NULL
);

CREATE INDEX idx_tokens_user_scope ON tokens(user_id, scope);

CREATE TABLE permissions (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    code    TEXT NOT NULL UNIQUE
);

CREATE TABLE users_permissions (
    user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    permission_id   INTEGER NOT NULL REFERENCES permissions(id) ON DELETE CASCADE,
    PRIMARY KEY (user_id, permission_id)
);

INSERT INTO permissions (code) VALUES
    ('games:read'),
    ('games:write'),
    ('permissions:write');
"#,
    // v2: catalog
    r#"
CREATE TABLE publishers (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT NOT NULL,
    headquarters    TEXT NOT NULL,
    website         TEXT NOT NULL
);

INSERT INTO publishers (name, headquarters, website) VALUES
    ('Electronic Arts', 'Redwood City, California, USA', 'https://www.ea.com'),
    ('Ubisoft', 'Montreuil, France', 'https://www.ubisoft.com'),
    ('Nintendo', 'Kyoto, Japan', 'https://www.nintendo.com'),
    ('Activision Blizzard', 'Santa Monica, California, USA', 'https://www.activisionblizzard.com'),
    ('FromSoftware', 'Tokyo, Japan', 'https://www.fromsoftware.jp');

CREATE TABLE games (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    title           TEXT NOT NULL,
    genres          TEXT NOT NULL DEFAULT '[]',  -- JSON array of strings
    release_date    TEXT NOT NULL,               -- YYYY-MM-DD
    price           INTEGER NOT NULL CHECK (price >= 0),  -- cents
    publisher_id    INTEGER NOT NULL REFERENCES publishers(id),
    version         INTEGER NOT NULL DEFAULT 1,
    created_at      TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_games_publisher_id ON games(publisher_id);
"#,
    // v3: wallets and libraries
    r#"
CREATE TABLE wallets (
    user_id     INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    balance     INTEGER NOT NULL DEFAULT 0 CHECK (balance >= 0)  -- cents
);

CREATE TABLE library (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    game_id     INTEGER NOT NULL REFERENCES games(id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (user_id, game_id)
);
"#,
];
