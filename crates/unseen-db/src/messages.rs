use crate::models::{DirectMessageRow, MessageRow};
use crate::users::insert_notification;
use crate::{Database, OptionalExt};
use anyhow::Result;
use rusqlite::Row;

#[derive(Debug)]
pub struct NewMessage<'a> {
    pub sender_id: &'a str,
    pub recipient_id: Option<&'a str>,
    pub room_id: Option<&'a str>,
    pub content: Option<&'a str>,
    pub kind: &'a str,
    pub voice_url: Option<&'a str>,
    pub waveform: Option<&'a str>,
    pub duration: Option<f64>,
}

const MESSAGE_SELECT: &str = "SELECT m.id, m.sender_id, m.recipient_id, m.room_id, m.content, m.type,
            m.voice_url, m.waveform, m.duration, m.is_read, m.created_at,
            u.username, u.display_name, u.avatar_gradient
     FROM messages m
     JOIN users u ON m.sender_id = u.id";

impl Database {
    /// Insert a message. Direct messages fan out a `message` notification
    /// to the recipient in the same transaction; room messages do not.
    pub fn insert_message(&self, id: &str, msg: &NewMessage) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages (id, sender_id, recipient_id, room_id, content, type, voice_url, waveform, duration)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    id,
                    msg.sender_id,
                    msg.recipient_id,
                    msg.room_id,
                    msg.content,
                    msg.kind,
                    msg.voice_url,
                    msg.waveform,
                    msg.duration,
                ],
            )?;

            if let Some(recipient) = msg.recipient_id {
                insert_notification(
                    &tx,
                    recipient,
                    "message",
                    "New anonymous message received",
                    msg.sender_id,
                    None,
                )?;
            }

            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!("{MESSAGE_SELECT} WHERE m.id = ?1");
            conn.query_row(&sql, [id], map_message).optional()
        })
    }

    /// Direct-message thread between the viewer and a partner, ascending.
    /// Side effect: all unread messages from the partner to the viewer are
    /// marked read in the same transaction.
    pub fn thread_with_partner(&self, viewer_id: &str, partner_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let sql = format!(
                "{MESSAGE_SELECT}
                 WHERE (m.sender_id = ?1 AND m.recipient_id = ?2)
                    OR (m.sender_id = ?2 AND m.recipient_id = ?1)
                 ORDER BY m.created_at ASC, m.id ASC"
            );
            let rows = {
                let mut stmt = tx.prepare(&sql)?;
                stmt.query_map([viewer_id, partner_id], map_message)?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            };

            tx.execute(
                "UPDATE messages SET is_read = 1
                 WHERE recipient_id = ?1 AND sender_id = ?2 AND is_read = 0",
                [viewer_id, partner_id],
            )?;

            tx.commit()?;
            Ok(rows)
        })
    }

    /// Messages addressed to a room, ascending.
    pub fn room_messages(&self, room_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{MESSAGE_SELECT} WHERE m.room_id = ?1
                 ORDER BY m.created_at ASC, m.id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([room_id], map_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// All of a user's direct messages with both participants' profiles,
    /// newest first. The conversation grouping happens in the handler.
    pub fn direct_messages_for(&self, user_id: &str) -> Result<Vec<DirectMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.sender_id, m.recipient_id, m.content, m.is_read, m.created_at,
                        s.username, s.display_name, s.avatar_gradient,
                        r.username, r.display_name, r.avatar_gradient
                 FROM messages m
                 JOIN users s ON m.sender_id = s.id
                 JOIN users r ON m.recipient_id = r.id
                 WHERE m.room_id IS NULL AND (m.sender_id = ?1 OR m.recipient_id = ?1)
                 ORDER BY m.created_at DESC, m.id DESC",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(DirectMessageRow {
                        id: row.get(0)?,
                        sender_id: row.get(1)?,
                        recipient_id: row.get(2)?,
                        content: row.get(3)?,
                        is_read: row.get(4)?,
                        created_at: row.get(5)?,
                        sender_username: row.get(6)?,
                        sender_display_name: row.get(7)?,
                        sender_avatar_gradient: row.get(8)?,
                        recipient_username: row.get(9)?,
                        recipient_display_name: row.get(10)?,
                        recipient_avatar_gradient: row.get(11)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_message(row: &Row) -> std::result::Result<MessageRow, rusqlite::Error> {
    Ok(MessageRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        recipient_id: row.get(2)?,
        room_id: row.get(3)?,
        content: row.get(4)?,
        kind: row.get(5)?,
        voice_url: row.get(6)?,
        waveform: row.get(7)?,
        duration: row.get(8)?,
        is_read: row.get(9)?,
        created_at: row.get(10)?,
        sender_username: row.get(11)?,
        sender_display_name: row.get(12)?,
        sender_avatar_gradient: row.get(13)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posts::tests::seed_user;

    fn send(db: &Database, id: &str, sender: &str, recipient: &str, content: &str) {
        db.insert_message(
            id,
            &NewMessage {
                sender_id: sender,
                recipient_id: Some(recipient),
                room_id: None,
                content: Some(content),
                kind: "text",
                voice_url: None,
                waveform: None,
                duration: None,
            },
        )
        .unwrap();
    }

    #[test]
    fn direct_message_notifies_recipient() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "a", "ghost");
        seed_user(&db, "b", "shade");

        send(&db, "m1", "a", "b", "hello");

        let notifs = db.notifications_for("b", 50).unwrap();
        assert_eq!(notifs.len(), 1);
        assert_eq!(notifs[0].kind, "message");
        assert_eq!(notifs[0].profile_id, "a");
    }

    #[test]
    fn fetching_thread_marks_partner_messages_read() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "a", "ghost");
        seed_user(&db, "b", "shade");

        send(&db, "m1", "b", "a", "one");
        send(&db, "m2", "b", "a", "two");
        send(&db, "m3", "a", "b", "reply");

        // the fetched thread itself still shows the pre-fetch read state
        let thread = db.thread_with_partner("a", "b").unwrap();
        assert_eq!(thread.len(), 3);
        assert_eq!(thread[0].content.as_deref(), Some("one"));

        // but B's messages to A are now read
        let unread: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM messages WHERE recipient_id = 'a' AND is_read = 0",
                    [],
                    |row| row.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(unread, 0);

        // A's own message to B stays unread until B fetches
        let b_unread: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM messages WHERE recipient_id = 'b' AND is_read = 0",
                    [],
                    |row| row.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(b_unread, 1);
    }

    #[test]
    fn conversations_source_rows_cover_both_directions() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "a", "ghost");
        seed_user(&db, "b", "shade");
        seed_user(&db, "c", "wisp");

        send(&db, "m1", "b", "a", "hey");
        send(&db, "m2", "a", "c", "yo");

        let rows = db.direct_messages_for("a").unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().any(|r| r.sender_id == "b"));
        assert!(rows.iter().any(|r| r.recipient_id == "c"));
    }
}
