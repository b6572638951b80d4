use crate::models::RoomRow;
use crate::{Database, OptionalExt};
use anyhow::Result;
use rusqlite::Row;

const ROOM_SELECT: &str = "SELECT r.id, r.name, r.type, r.password_hash, r.created_by, r.created_at,
            u.username, u.display_name, u.avatar_gradient,
            (SELECT COUNT(*) FROM room_members rm WHERE rm.room_id = r.id)
     FROM rooms r
     JOIN users u ON r.created_by = u.id";

impl Database {
    /// Create a room and enroll the creator as its first member.
    pub fn create_room(
        &self,
        id: &str,
        name: &str,
        kind: &str,
        password_hash: Option<&str>,
        created_by: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO rooms (id, name, type, password_hash, created_by)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, name, kind, password_hash, created_by],
            )?;
            tx.execute(
                "INSERT INTO room_members (id, room_id, user_id) VALUES (?1, ?2, ?3)",
                rusqlite::params![uuid::Uuid::new_v4().to_string(), id, created_by],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_room(&self, id: &str) -> Result<Option<RoomRow>> {
        self.with_conn(|conn| {
            let sql = format!("{ROOM_SELECT} WHERE r.id = ?1");
            conn.query_row(&sql, [id], map_room).optional()
        })
    }

    /// Idempotent join: returns true when the membership was newly added,
    /// false when the user was already a member.
    pub fn add_member(&self, room_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO room_members (id, room_id, user_id) VALUES (?1, ?2, ?3)
                 ON CONFLICT(room_id, user_id) DO NOTHING",
                rusqlite::params![uuid::Uuid::new_v4().to_string(), room_id, user_id],
            )?;
            Ok(inserted > 0)
        })
    }

    pub fn remove_member(&self, room_id: &str, user_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "DELETE FROM room_members WHERE room_id = ?1 AND user_id = ?2",
                [room_id, user_id],
            )?;
            Ok(())
        })
    }

    pub fn is_member(&self, room_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<String> = conn
                .query_row(
                    "SELECT id FROM room_members WHERE room_id = ?1 AND user_id = ?2",
                    [room_id, user_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Newest rooms first, optionally filtered by type.
    pub fn list_rooms(&self, kind: Option<&str>) -> Result<Vec<RoomRow>> {
        self.with_conn(|conn| {
            let (sql, params): (String, Vec<&dyn rusqlite::types::ToSql>) = match kind {
                Some(ref k) => (
                    format!("{ROOM_SELECT} WHERE r.type = ?1 ORDER BY r.created_at DESC, r.id DESC"),
                    vec![k as &dyn rusqlite::types::ToSql],
                ),
                None => (
                    format!("{ROOM_SELECT} ORDER BY r.created_at DESC, r.id DESC"),
                    vec![],
                ),
            };
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params.as_slice(), map_room)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Rooms the user belongs to, newest first.
    pub fn rooms_for_member(&self, user_id: &str) -> Result<Vec<RoomRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{ROOM_SELECT}
                 JOIN room_members me ON me.room_id = r.id AND me.user_id = ?1
                 ORDER BY r.created_at DESC, r.id DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_room)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Room ids the user is a member of, for annotating room lists.
    pub fn member_room_ids(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT room_id FROM room_members WHERE user_id = ?1")?;
            let rows = stmt
                .query_map([user_id], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_room(row: &Row) -> std::result::Result<RoomRow, rusqlite::Error> {
    Ok(RoomRow {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: row.get(2)?,
        password_hash: row.get(3)?,
        created_by: row.get(4)?,
        created_at: row.get(5)?,
        creator_username: row.get(6)?,
        creator_display_name: row.get(7)?,
        creator_avatar_gradient: row.get(8)?,
        member_count: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posts::tests::seed_user;

    #[test]
    fn creator_is_enrolled_on_create() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "u1", "ghost");

        db.create_room("r1", "midnight", "public", None, "u1").unwrap();

        assert!(db.is_member("r1", "u1").unwrap());
        let room = db.get_room("r1").unwrap().unwrap();
        assert_eq!(room.member_count, 1);
        assert_eq!(room.creator_username, "ghost");
    }

    #[test]
    fn join_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "u1", "ghost");
        seed_user(&db, "u2", "shade");
        db.create_room("r1", "midnight", "public", None, "u1").unwrap();

        assert!(db.add_member("r1", "u2").unwrap());
        assert!(!db.add_member("r1", "u2").unwrap());
        assert_eq!(db.get_room("r1").unwrap().unwrap().member_count, 2);
    }

    #[test]
    fn leave_removes_membership() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "u1", "ghost");
        seed_user(&db, "u2", "shade");
        db.create_room("r1", "midnight", "public", None, "u1").unwrap();
        db.add_member("r1", "u2").unwrap();

        db.remove_member("r1", "u2").unwrap();
        assert!(!db.is_member("r1", "u2").unwrap());
        // leaving twice is harmless
        db.remove_member("r1", "u2").unwrap();
    }

    #[test]
    fn list_filters_by_type_and_membership() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "u1", "ghost");
        seed_user(&db, "u2", "shade");
        db.create_room("r1", "open", "public", None, "u1").unwrap();
        db.create_room("r2", "sealed", "private", Some("$argon2id$x"), "u1").unwrap();
        db.create_room("r3", "other", "public", None, "u2").unwrap();

        assert_eq!(db.list_rooms(None).unwrap().len(), 3);
        assert_eq!(db.list_rooms(Some("public")).unwrap().len(), 2);
        assert_eq!(db.list_rooms(Some("private")).unwrap().len(), 1);

        let mine = db.rooms_for_member("u1").unwrap();
        assert_eq!(mine.len(), 2);

        let ids = db.member_room_ids("u2").unwrap();
        assert_eq!(ids, vec!["r3".to_string()]);
    }
}
