use crate::Database;
use crate::models::NotificationRow;
use anyhow::Result;
use rusqlite::Row;

impl Database {
    /// Latest notifications for a user with the acting profile joined in.
    pub fn notifications_for(&self, user_id: &str, limit: u32) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT n.id, n.user_id, n.type, n.content, n.profile_id, n.post_id,
                        n.is_read, n.created_at,
                        u.username, u.display_name, u.avatar_gradient
                 FROM notifications n
                 JOIN users u ON n.profile_id = u.id
                 WHERE n.user_id = ?1
                 ORDER BY n.created_at DESC, n.id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], map_notification)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Mark one notification read. Scoped to the owner so a user cannot
    /// touch someone else's notifications.
    pub fn mark_notification_read(&self, user_id: &str, notification_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
                [notification_id, user_id],
            )?;
            Ok(())
        })
    }

    pub fn mark_all_notifications_read(&self, user_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
                [user_id],
            )?;
            Ok(())
        })
    }
}

fn map_notification(row: &Row) -> std::result::Result<NotificationRow, rusqlite::Error> {
    Ok(NotificationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: row.get(2)?,
        content: row.get(3)?,
        profile_id: row.get(4)?,
        post_id: row.get(5)?,
        is_read: row.get(6)?,
        created_at: row.get(7)?,
        actor_username: row.get(8)?,
        actor_display_name: row.get(9)?,
        actor_avatar_gradient: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posts::tests::{seed_post, seed_user};

    #[test]
    fn mark_read_is_owner_scoped() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "author", "ghost");
        seed_user(&db, "viewer", "shade");
        seed_post(&db, "p1", "author", "a thought");
        db.toggle_like("viewer", "p1").unwrap();

        let notif = &db.notifications_for("author", 50).unwrap()[0];
        assert!(!notif.is_read);

        // someone else cannot mark it
        db.mark_notification_read("viewer", &notif.id).unwrap();
        assert!(!db.notifications_for("author", 50).unwrap()[0].is_read);

        db.mark_notification_read("author", &notif.id).unwrap();
        assert!(db.notifications_for("author", 50).unwrap()[0].is_read);
    }

    #[test]
    fn mark_all_read() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "author", "ghost");
        seed_user(&db, "viewer", "shade");
        seed_post(&db, "p1", "author", "one");
        seed_post(&db, "p2", "author", "two");
        db.toggle_like("viewer", "p1").unwrap();
        db.toggle_like("viewer", "p2").unwrap();
        db.create_comment("c1", "viewer", "p1", "hm", None).unwrap();

        db.mark_all_notifications_read("author").unwrap();
        assert!(
            db.notifications_for("author", 50)
                .unwrap()
                .iter()
                .all(|n| n.is_read)
        );
    }
}
