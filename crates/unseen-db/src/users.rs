use crate::models::UserRow;
use crate::{Database, OptionalExt};
use anyhow::Result;
use rusqlite::{Connection, Row};

/// Fields supplied at signup. Bio and mood tag fall back to the schema
/// defaults for new accounts.
#[derive(Debug)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
    pub email: Option<&'a str>,
    pub device_fingerprint: &'a str,
    pub avatar_gradient: &'a str,
    pub display_name: &'a str,
}

#[derive(Debug, Default)]
pub struct ProfileUpdate<'a> {
    pub display_name: Option<&'a str>,
    pub bio: Option<&'a str>,
    pub mood_tag: Option<&'a str>,
    pub avatar_gradient: Option<&'a str>,
}

const USER_COLUMNS: &str = "id, username, password_hash, email, device_fingerprint, is_banned, \
     report_count, bio, display_name, avatar_gradient, avatar_url, mood_tag, \
     followers_count, following_count, posts_count, created_at";

impl Database {
    pub fn create_user(&self, id: &str, user: &NewUser) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password_hash, email, device_fingerprint, avatar_gradient, display_name)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    id,
                    user.username,
                    user.password_hash,
                    user.email,
                    user.device_fingerprint,
                    user.avatar_gradient,
                    user.display_name,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
            conn.query_row(&sql, [username], map_user).optional()
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
            conn.query_row(&sql, [id], map_user).optional()
        })
    }

    /// Apply a partial profile update, skipping fields that were not
    /// provided. Returns the updated row, or None if the user is gone.
    pub fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<Option<UserRow>> {
        self.with_conn_mut(|conn| {
            let mut sets: Vec<&str> = Vec::new();
            let mut params: Vec<&dyn rusqlite::types::ToSql> = Vec::new();

            if let Some(display_name) = &update.display_name {
                sets.push("display_name = ?");
                params.push(display_name);
            }
            if let Some(bio) = &update.bio {
                sets.push("bio = ?");
                params.push(bio);
            }
            if let Some(mood_tag) = &update.mood_tag {
                sets.push("mood_tag = ?");
                params.push(mood_tag);
            }
            if let Some(avatar_gradient) = &update.avatar_gradient {
                sets.push("avatar_gradient = ?");
                params.push(avatar_gradient);
            }

            if !sets.is_empty() {
                let sql = format!("UPDATE users SET {} WHERE id = ?", sets.join(", "));
                params.push(&id);
                conn.execute(&sql, params.as_slice())?;
            }

            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
            conn.query_row(&sql, [id], map_user).optional()
        })
    }

    pub fn set_avatar_url(&self, id: &str, url: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("UPDATE users SET avatar_url = ?1 WHERE id = ?2", (url, id))?;
            Ok(())
        })
    }

    /// Bump the per-device account counter at signup. Informational only,
    /// never enforced as a limit.
    pub fn track_device(&self, fingerprint: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO device_tracking (device_fingerprint, account_count) VALUES (?1, 1)
                 ON CONFLICT(device_fingerprint) DO UPDATE SET account_count = account_count + 1",
                [fingerprint],
            )?;
            Ok(())
        })
    }

    pub fn device_account_count(&self, fingerprint: &str) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT account_count FROM device_tracking WHERE device_fingerprint = ?1",
                    [fingerprint],
                    |row| row.get(0),
                )
                .optional()?
                .unwrap_or(0))
        })
    }
}

pub(crate) fn map_user(row: &Row) -> std::result::Result<UserRow, rusqlite::Error> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        email: row.get(3)?,
        device_fingerprint: row.get(4)?,
        is_banned: row.get(5)?,
        report_count: row.get(6)?,
        bio: row.get(7)?,
        display_name: row.get(8)?,
        avatar_gradient: row.get(9)?,
        avatar_url: row.get(10)?,
        mood_tag: row.get(11)?,
        followers_count: row.get(12)?,
        following_count: row.get(13)?,
        posts_count: row.get(14)?,
        created_at: row.get(15)?,
    })
}

/// Insert a notification row inside an existing transaction.
pub(crate) fn insert_notification(
    conn: &Connection,
    recipient_id: &str,
    kind: &str,
    content: &str,
    actor_id: &str,
    post_id: Option<&str>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO notifications (id, user_id, type, content, profile_id, post_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            uuid::Uuid::new_v4().to_string(),
            recipient_id,
            kind,
            content,
            actor_id,
            post_id,
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user<'a>(username: &'a str, fingerprint: &'a str) -> NewUser<'a> {
        NewUser {
            username,
            password_hash: "$argon2id$fake",
            email: None,
            device_fingerprint: fingerprint,
            avatar_gradient: "from-violet-600 via-purple-600 to-indigo-600",
            display_name: username,
        }
    }

    #[test]
    fn create_and_fetch_user() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", &test_user("ghost", "fp-1")).unwrap();

        let user = db.get_user_by_username("ghost").unwrap().unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.bio, "New to UNSEEN");
        assert!(!user.is_banned);
        assert_eq!(user.posts_count, 0);

        assert!(db.get_user_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn duplicate_username_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", &test_user("ghost", "fp-1")).unwrap();
        let err = db.create_user("u2", &test_user("ghost", "fp-2"));
        assert!(err.is_err());
    }

    #[test]
    fn partial_profile_update() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", &test_user("ghost", "fp-1")).unwrap();

        let updated = db
            .update_profile(
                "u1",
                &ProfileUpdate {
                    bio: Some("whisper into the void"),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(updated.bio, "whisper into the void");
        // untouched fields keep their values
        assert_eq!(updated.display_name, "ghost");
        assert_eq!(updated.mood_tag, "✨ feeling reflective");
    }

    #[test]
    fn device_tracking_counts_accounts() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", &test_user("a", "fp-shared")).unwrap();
        db.track_device("fp-shared").unwrap();
        db.create_user("u2", &test_user("b", "fp-shared")).unwrap();
        db.track_device("fp-shared").unwrap();

        assert_eq!(db.device_account_count("fp-shared").unwrap(), 2);
        assert_eq!(db.device_account_count("fp-unknown").unwrap(), 0);
    }
}
