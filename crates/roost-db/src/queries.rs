use crate::Database;
use crate::models::{ImageRow, ListingPatch, ListingRow, NewListing, ReviewRow, SessionRow, UserRow};
use anyhow::Result;
use roost_types::models::{ImageRef, ListingKind};
use rusqlite::Connection;

const LISTING_SELECT: &str = "SELECT l.id, l.kind, l.title, l.description, l.location, l.longitude, l.latitude, l.price,
            l.author_id, u.username, l.created_at, l.updated_at
     FROM listings l
     LEFT JOIN users u ON l.author_id = u.id";

impl Database {
    // -- Users --

    /// Returns false when the username or email is already taken.
    pub fn create_user(&self, id: &str, username: &str, email: &str, password_hash: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            match conn.execute(
                "INSERT INTO users (id, username, email, password) VALUES (?1, ?2, ?3, ?4)",
                (id, username, email, password_hash),
            ) {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- Sessions --

    /// A negative TTL is allowed so tests can mint already-expired sessions.
    pub fn create_session(&self, id: &str, ttl_days: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, expires_at) VALUES (?1, datetime('now', ?2 || ' days'))",
                rusqlite::params![id, ttl_days],
            )?;
            Ok(())
        })
    }

    /// Fetches an unexpired session along with the signed-in username, if any.
    pub fn get_session(&self, id: &str) -> Result<Option<SessionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT s.id, s.user_id, u.username, s.return_to, s.flash_level, s.flash_message,
                        s.expires_at, s.created_at
                 FROM sessions s
                 LEFT JOIN users u ON s.user_id = u.id
                 WHERE s.id = ?1 AND s.expires_at > datetime('now')",
            )?;

            let row = stmt
                .query_row([id], |row| {
                    Ok(SessionRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        username: row.get(2)?,
                        return_to: row.get(3)?,
                        flash_level: row.get(4)?,
                        flash_message: row.get(5)?,
                        expires_at: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                })
                .optional()?;

            Ok(row)
        })
    }

    pub fn set_session_user(&self, id: &str, user_id: Option<&str>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE sessions SET user_id = ?2 WHERE id = ?1",
                rusqlite::params![id, user_id],
            )?;
            Ok(())
        })
    }

    pub fn set_session_flash(&self, id: &str, level: &str, message: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE sessions SET flash_level = ?2, flash_message = ?3 WHERE id = ?1",
                rusqlite::params![id, level, message],
            )?;
            Ok(())
        })
    }

    /// Reads and clears the flash in one transaction, so a notice renders
    /// exactly once no matter how many pages race for it.
    pub fn take_session_flash(&self, id: &str) -> Result<Option<(String, String)>> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            let flash = tx
                .query_row(
                    "SELECT flash_level, flash_message FROM sessions WHERE id = ?1",
                    [id],
                    |row| {
                        Ok((
                            row.get::<_, Option<String>>(0)?,
                            row.get::<_, Option<String>>(1)?,
                        ))
                    },
                )
                .optional()?;
            tx.execute(
                "UPDATE sessions SET flash_level = NULL, flash_message = NULL WHERE id = ?1",
                [id],
            )?;
            tx.commit()?;

            Ok(match flash {
                Some((Some(level), Some(message))) => Some((level, message)),
                _ => None,
            })
        })
    }

    pub fn set_session_return_to(&self, id: &str, url: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE sessions SET return_to = ?2 WHERE id = ?1",
                rusqlite::params![id, url],
            )?;
            Ok(())
        })
    }

    pub fn take_session_return_to(&self, id: &str) -> Result<Option<String>> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            let url = tx
                .query_row(
                    "SELECT return_to FROM sessions WHERE id = ?1",
                    [id],
                    |row| row.get::<_, Option<String>>(0),
                )
                .optional()?;
            tx.execute("UPDATE sessions SET return_to = NULL WHERE id = ?1", [id])?;
            tx.commit()?;

            Ok(url.flatten())
        })
    }

    // -- Listings --

    pub fn insert_listing(&self, listing: &NewListing<'_>, images: &[ImageRef]) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO listings (id, kind, title, description, location, longitude, latitude, price, author_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    listing.id,
                    listing.kind.singular(),
                    listing.title,
                    listing.description,
                    listing.location,
                    listing.longitude,
                    listing.latitude,
                    listing.price,
                    listing.author_id,
                ],
            )?;
            for (position, image) in images.iter().enumerate() {
                tx.execute(
                    "INSERT INTO listing_images (listing_id, url, filename, position) VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![listing.id, image.url, image.filename, position as i64],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Lookups are kind-scoped: a room id asked for as a site is a miss.
    pub fn get_listing(&self, kind: ListingKind, id: &str) -> Result<Option<ListingRow>> {
        self.with_conn(|conn| {
            let sql = format!("{LISTING_SELECT} WHERE l.kind = ?1 AND l.id = ?2");
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt
                .query_row(rusqlite::params![kind.singular(), id], listing_from_row)
                .optional()?;
            Ok(row)
        })
    }

    pub fn list_listings(&self, kind: ListingKind) -> Result<Vec<ListingRow>> {
        self.with_conn(|conn| {
            let sql = format!("{LISTING_SELECT} WHERE l.kind = ?1 ORDER BY l.created_at DESC, l.id");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([kind.singular()], listing_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn images_for_listing(&self, listing_id: &str) -> Result<Vec<ImageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT listing_id, url, filename, position FROM listing_images
                 WHERE listing_id = ?1 ORDER BY position",
            )?;
            let rows = stmt
                .query_map([listing_id], image_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch images for a set of listing IDs.
    pub fn images_for_listings(&self, listing_ids: &[String]) -> Result<Vec<ImageRow>> {
        if listing_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=listing_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT listing_id, url, filename, position FROM listing_images
                 WHERE listing_id IN ({}) ORDER BY listing_id, position",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = listing_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), image_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Applies field updates, appends new images, then drops the named ones,
    /// all in one transaction. Returns the filenames actually removed so the
    /// caller can release the stored files, or None when the listing is gone.
    pub fn update_listing(
        &self,
        kind: ListingKind,
        id: &str,
        patch: &ListingPatch<'_>,
        new_images: &[ImageRef],
        delete_filenames: &[String],
    ) -> Result<Option<Vec<String>>> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            let updated = tx.execute(
                "UPDATE listings
                 SET title = ?1, description = ?2, location = ?3, price = ?4,
                     updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
                 WHERE kind = ?5 AND id = ?6",
                rusqlite::params![
                    patch.title,
                    patch.description,
                    patch.location,
                    patch.price,
                    kind.singular(),
                    id,
                ],
            )?;
            if updated == 0 {
                return Ok(None);
            }

            let mut next_position: i64 = tx.query_row(
                "SELECT COALESCE(MAX(position) + 1, 0) FROM listing_images WHERE listing_id = ?1",
                [id],
                |row| row.get(0),
            )?;
            for image in new_images {
                // Re-uploading a filename the listing already holds is a no-op
                // rather than a constraint failure.
                let inserted = tx.execute(
                    "INSERT OR IGNORE INTO listing_images (listing_id, url, filename, position) VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![id, image.url, image.filename, next_position],
                )?;
                if inserted > 0 {
                    next_position += 1;
                }
            }

            let mut removed = Vec::new();
            for filename in delete_filenames {
                let n = tx.execute(
                    "DELETE FROM listing_images WHERE listing_id = ?1 AND filename = ?2",
                    rusqlite::params![id, filename],
                )?;
                if n > 0 {
                    removed.push(filename.clone());
                }
            }

            tx.commit()?;
            Ok(Some(removed))
        })
    }

    /// Removes the listing plus its reviews, join rows and image rows in a
    /// single transaction, so a crash never leaves orphans behind. Returns
    /// the stored image filenames for the caller to release, or None when
    /// the listing is missing.
    pub fn delete_listing(&self, kind: ListingKind, id: &str) -> Result<Option<Vec<String>>> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM listings WHERE kind = ?1 AND id = ?2)",
                rusqlite::params![kind.singular(), id],
                |row| row.get(0),
            )?;
            if !exists {
                return Ok(None);
            }

            let mut stmt = tx.prepare(
                "SELECT filename FROM listing_images WHERE listing_id = ?1 ORDER BY position",
            )?;
            let filenames = stmt
                .query_map([id], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            drop(stmt);

            // The join rows reference the reviews, so they go first.
            let mut stmt = tx.prepare("SELECT review_id FROM listing_reviews WHERE listing_id = ?1")?;
            let review_ids = stmt
                .query_map([id], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            drop(stmt);

            tx.execute("DELETE FROM listing_reviews WHERE listing_id = ?1", [id])?;
            for review_id in &review_ids {
                tx.execute("DELETE FROM reviews WHERE id = ?1", [review_id])?;
            }
            tx.execute("DELETE FROM listing_images WHERE listing_id = ?1", [id])?;
            tx.execute("DELETE FROM listings WHERE id = ?1", [id])?;

            tx.commit()?;
            Ok(Some(filenames))
        })
    }

    /// Case-insensitive substring match on titles, newest updates first,
    /// capped at 20 rows. Returns (id, title) pairs.
    pub fn autocomplete_titles(&self, kind: ListingKind, term: &str) -> Result<Vec<(String, String)>> {
        self.with_conn(|conn| {
            let pattern = format!("%{}%", escape_like(term));
            let mut stmt = conn.prepare(
                "SELECT id, title FROM listings
                 WHERE kind = ?1 AND title LIKE ?2 ESCAPE '\\'
                 ORDER BY updated_at DESC, created_at DESC
                 LIMIT 20",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![kind.singular(), pattern], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Exact-title lookup. When several listings share the title, the most
    /// recently updated one wins.
    pub fn find_listing_by_title(&self, kind: ListingKind, title: &str) -> Result<Option<ListingRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{LISTING_SELECT} WHERE l.kind = ?1 AND l.title = ?2
                 ORDER BY l.updated_at DESC, l.rowid DESC LIMIT 1"
            );
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt
                .query_row(rusqlite::params![kind.singular(), title], listing_from_row)
                .optional()?;
            Ok(row)
        })
    }

    // -- Reviews --

    /// Returns false without writing anything when no listing of that kind
    /// exists to attach the review to.
    pub fn insert_review(
        &self,
        kind: ListingKind,
        listing_id: &str,
        id: &str,
        author_id: &str,
        body: &str,
        rating: i64,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM listings WHERE kind = ?1 AND id = ?2)",
                rusqlite::params![kind.singular(), listing_id],
                |row| row.get(0),
            )?;
            if !exists {
                return Ok(false);
            }

            tx.execute(
                "INSERT INTO reviews (id, author_id, body, rating) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, author_id, body, rating],
            )?;
            tx.execute(
                "INSERT INTO listing_reviews (listing_id, review_id, position)
                 VALUES (?1, ?2, (SELECT COALESCE(MAX(position) + 1, 0) FROM listing_reviews WHERE listing_id = ?1))",
                rusqlite::params![listing_id, id],
            )?;

            tx.commit()?;
            Ok(true)
        })
    }

    /// Detaches the review from the listing and deletes it, in one
    /// transaction. Returns false without touching the review when it is not
    /// attached to that listing.
    pub fn delete_review(&self, listing_id: &str, review_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            let detached = tx.execute(
                "DELETE FROM listing_reviews WHERE listing_id = ?1 AND review_id = ?2",
                rusqlite::params![listing_id, review_id],
            )?;
            if detached > 0 {
                tx.execute("DELETE FROM reviews WHERE id = ?1", [review_id])?;
            }
            tx.commit()?;
            Ok(detached > 0)
        })
    }

    pub fn reviews_for_listing(&self, listing_id: &str) -> Result<Vec<ReviewRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.id, r.author_id, u.username, r.body, r.rating, r.created_at
                 FROM listing_reviews lr
                 JOIN reviews r ON lr.review_id = r.id
                 LEFT JOIN users u ON r.author_id = u.id
                 WHERE lr.listing_id = ?1
                 ORDER BY lr.position",
            )?;
            let rows = stmt
                .query_map([listing_id], review_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_review(&self, id: &str) -> Result<Option<ReviewRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.id, r.author_id, u.username, r.body, r.rating, r.created_at
                 FROM reviews r
                 LEFT JOIN users u ON r.author_id = u.id
                 WHERE r.id = ?1",
            )?;
            let row = stmt.query_row([id], review_from_row).optional()?;
            Ok(row)
        })
    }

    /// Listing-scoped review lookup: misses when the review exists but hangs
    /// off a different listing.
    pub fn get_review_for_listing(&self, listing_id: &str, review_id: &str) -> Result<Option<ReviewRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.id, r.author_id, u.username, r.body, r.rating, r.created_at
                 FROM listing_reviews lr
                 JOIN reviews r ON lr.review_id = r.id
                 LEFT JOIN users u ON r.author_id = u.id
                 WHERE lr.listing_id = ?1 AND lr.review_id = ?2",
            )?;
            let row = stmt
                .query_row(rusqlite::params![listing_id, review_id], review_from_row)
                .optional()?;
            Ok(row)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // column is one of our own identifiers, never caller input
    let sql = format!("SELECT id, username, email, password, created_at FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn listing_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<ListingRow, rusqlite::Error> {
    Ok(ListingRow {
        id: row.get(0)?,
        kind: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        location: row.get(4)?,
        longitude: row.get(5)?,
        latitude: row.get(6)?,
        price: row.get(7)?,
        author_id: row.get(8)?,
        author_username: row
            .get::<_, Option<String>>(9)?
            .unwrap_or_else(|| "unknown".to_string()),
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn image_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<ImageRow, rusqlite::Error> {
    Ok(ImageRow {
        listing_id: row.get(0)?,
        url: row.get(1)?,
        filename: row.get(2)?,
        position: row.get(3)?,
    })
}

fn review_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<ReviewRow, rusqlite::Error> {
    Ok(ReviewRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_username: row
            .get::<_, Option<String>>(2)?
            .unwrap_or_else(|| "unknown".to_string()),
        body: row.get(3)?,
        rating: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
