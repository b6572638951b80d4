use crate::models::PostRow;
use crate::{Database, OptionalExt};
use anyhow::Result;
use rusqlite::Row;

#[derive(Debug)]
pub struct NewPost<'a> {
    pub user_id: &'a str,
    pub content: &'a str,
    pub kind: &'a str,
    pub voice_url: Option<&'a str>,
    pub waveform: Option<&'a str>,
    pub duration: Option<f64>,
}

const POST_SELECT: &str = "SELECT p.id, p.user_id, p.content, p.type, p.voice_url, p.waveform,
            p.duration, p.likes_count, p.comments_count, p.is_reported, p.created_at,
            u.username, u.display_name, u.avatar_gradient, u.mood_tag
     FROM posts p
     JOIN users u ON p.user_id = u.id";

impl Database {
    /// Insert a post and bump the author's denormalized post counter in
    /// the same transaction.
    pub fn create_post(&self, id: &str, post: &NewPost) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO posts (id, user_id, content, type, voice_url, waveform, duration)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    id,
                    post.user_id,
                    post.content,
                    post.kind,
                    post.voice_url,
                    post.waveform,
                    post.duration,
                ],
            )?;
            tx.execute(
                "UPDATE users SET posts_count = posts_count + 1 WHERE id = ?1",
                [post.user_id],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    /// A reported post stays loadable by id even though it is hidden
    /// from the feed.
    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!("{POST_SELECT} WHERE p.id = ?1");
            conn.query_row(&sql, [id], map_post).optional()
        })
    }

    /// Public feed, newest first, reported posts excluded.
    pub fn feed(&self, limit: u32, offset: u32) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{POST_SELECT} WHERE p.is_reported = 0
                 ORDER BY p.created_at DESC, p.id DESC
                 LIMIT ?1 OFFSET ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![limit, offset], map_post)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn posts_by_user(&self, user_id: &str) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{POST_SELECT} WHERE p.user_id = ?1 AND p.is_reported = 0
                 ORDER BY p.created_at DESC, p.id DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_post)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Posts the viewer has saved, most recently saved first.
    pub fn saved_posts(&self, user_id: &str) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT p.id, p.user_id, p.content, p.type, p.voice_url, p.waveform,
                        p.duration, p.likes_count, p.comments_count, p.is_reported, p.created_at,
                        u.username, u.display_name, u.avatar_gradient, u.mood_tag
                 FROM saves s
                 JOIN posts p ON s.post_id = p.id
                 JOIN users u ON p.user_id = u.id
                 WHERE s.user_id = ?1
                 ORDER BY s.created_at DESC, s.id DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_post)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_post(row: &Row) -> std::result::Result<PostRow, rusqlite::Error> {
    Ok(PostRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        content: row.get(2)?,
        kind: row.get(3)?,
        voice_url: row.get(4)?,
        waveform: row.get(5)?,
        duration: row.get(6)?,
        likes_count: row.get(7)?,
        comments_count: row.get(8)?,
        is_reported: row.get(9)?,
        created_at: row.get(10)?,
        author_username: row.get(11)?,
        author_display_name: row.get(12)?,
        author_avatar_gradient: row.get(13)?,
        author_mood_tag: row.get(14)?,
    })
}
