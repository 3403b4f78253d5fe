use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Listing timestamps carry milliseconds so 'most recently updated'
        -- stays a total order even for rows written in the same second.
        CREATE TABLE IF NOT EXISTS listings (
            id          TEXT PRIMARY KEY,
            kind        TEXT NOT NULL CHECK (kind IN ('site', 'room')),
            title       TEXT NOT NULL,
            description TEXT NOT NULL,
            location    TEXT NOT NULL,
            longitude   REAL NOT NULL,
            latitude    REAL NOT NULL,
            price       INTEGER NOT NULL,
            author_id   TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
            updated_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_listings_kind_title
            ON listings(kind, title);

        CREATE INDEX IF NOT EXISTS idx_listings_kind_updated
            ON listings(kind, updated_at);

        CREATE TABLE IF NOT EXISTS listing_images (
            listing_id  TEXT NOT NULL REFERENCES listings(id),
            url         TEXT NOT NULL,
            filename    TEXT NOT NULL,
            position    INTEGER NOT NULL,
            PRIMARY KEY (listing_id, filename)
        );

        CREATE TABLE IF NOT EXISTS reviews (
            id          TEXT PRIMARY KEY,
            author_id   TEXT NOT NULL REFERENCES users(id),
            body        TEXT NOT NULL,
            rating      INTEGER NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Join table keeps the order reviews were attached in.
        CREATE TABLE IF NOT EXISTS listing_reviews (
            listing_id  TEXT NOT NULL REFERENCES listings(id),
            review_id   TEXT NOT NULL REFERENCES reviews(id),
            position    INTEGER NOT NULL,
            PRIMARY KEY (listing_id, review_id)
        );

        CREATE INDEX IF NOT EXISTS idx_listing_reviews_listing
            ON listing_reviews(listing_id, position);

        CREATE TABLE IF NOT EXISTS sessions (
            id            TEXT PRIMARY KEY,
            user_id       TEXT REFERENCES users(id),
            return_to     TEXT,
            flash_level   TEXT,
            flash_message TEXT,
            expires_at    TEXT NOT NULL,
            created_at    TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
