//! Social-graph mutations: likes, saves, follows, comments, reports.
//!
//! Every operation here runs as a single transaction so that join rows,
//! denormalized counters and notification fan-out can never drift apart.
//! Toggles use insert-or-conflict against the unique indexes as the
//! discriminator instead of a separate existence check.

use crate::models::CommentRow;
use crate::users::insert_notification;
use crate::{Database, OptionalExt};
use anyhow::Result;
use rusqlite::Row;

/// Accounts are banned once their report count reaches this threshold.
pub const BAN_REPORT_THRESHOLD: i64 = 10;

/// Outcome of a comment insert.
#[derive(Debug, PartialEq, Eq)]
pub enum CommentOutcome {
    Created,
    PostMissing,
    /// `parent_id` does not name an existing comment on the same post.
    BadParent,
}

impl Database {
    /// Toggle a like on a post. Returns `Some(liked)` with the new state,
    /// or `None` when the post does not exist. Liking someone else's post
    /// fans out a `reaction` notification to its author.
    pub fn toggle_like(&self, actor_id: &str, post_id: &str) -> Result<Option<bool>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let author: Option<String> = tx
                .query_row("SELECT user_id FROM posts WHERE id = ?1", [post_id], |row| {
                    row.get(0)
                })
                .optional()?;
            let Some(author_id) = author else {
                return Ok(None);
            };

            let inserted = tx.execute(
                "INSERT INTO likes (id, user_id, post_id) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id, post_id) WHERE post_id IS NOT NULL DO NOTHING",
                rusqlite::params![uuid::Uuid::new_v4().to_string(), actor_id, post_id],
            )?;

            let liked = if inserted > 0 {
                tx.execute(
                    "UPDATE posts SET likes_count = likes_count + 1 WHERE id = ?1",
                    [post_id],
                )?;
                if author_id != actor_id {
                    insert_notification(
                        &tx,
                        &author_id,
                        "reaction",
                        "Someone felt your post ❤️",
                        actor_id,
                        Some(post_id),
                    )?;
                }
                true
            } else {
                tx.execute(
                    "DELETE FROM likes WHERE user_id = ?1 AND post_id = ?2",
                    [actor_id, post_id],
                )?;
                tx.execute(
                    "UPDATE posts SET likes_count = MAX(likes_count - 1, 0) WHERE id = ?1",
                    [post_id],
                )?;
                false
            };

            tx.commit()?;
            Ok(Some(liked))
        })
    }

    /// Toggle a save on a post. No counters, no notifications.
    pub fn toggle_save(&self, actor_id: &str, post_id: &str) -> Result<Option<bool>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let exists: Option<String> = tx
                .query_row("SELECT id FROM posts WHERE id = ?1", [post_id], |row| row.get(0))
                .optional()?;
            if exists.is_none() {
                return Ok(None);
            }

            let inserted = tx.execute(
                "INSERT INTO saves (id, user_id, post_id) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id, post_id) DO NOTHING",
                rusqlite::params![uuid::Uuid::new_v4().to_string(), actor_id, post_id],
            )?;

            let saved = if inserted > 0 {
                true
            } else {
                tx.execute(
                    "DELETE FROM saves WHERE user_id = ?1 AND post_id = ?2",
                    [actor_id, post_id],
                )?;
                false
            };

            tx.commit()?;
            Ok(Some(saved))
        })
    }

    /// Toggle a follow edge. Returns `Some(following)` with the new state,
    /// or `None` when the target user does not exist. Self-follow is the
    /// caller's responsibility to reject; the schema CHECK backs it up.
    pub fn toggle_follow(&self, actor_id: &str, target_id: &str) -> Result<Option<bool>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let exists: Option<String> = tx
                .query_row("SELECT id FROM users WHERE id = ?1", [target_id], |row| row.get(0))
                .optional()?;
            if exists.is_none() {
                return Ok(None);
            }

            let inserted = tx.execute(
                "INSERT INTO follows (id, follower_id, following_id) VALUES (?1, ?2, ?3)
                 ON CONFLICT(follower_id, following_id) DO NOTHING",
                rusqlite::params![uuid::Uuid::new_v4().to_string(), actor_id, target_id],
            )?;

            let following = if inserted > 0 {
                tx.execute(
                    "UPDATE users SET following_count = following_count + 1 WHERE id = ?1",
                    [actor_id],
                )?;
                tx.execute(
                    "UPDATE users SET followers_count = followers_count + 1 WHERE id = ?1",
                    [target_id],
                )?;
                insert_notification(
                    &tx,
                    target_id,
                    "follow",
                    "A new soul started following you",
                    actor_id,
                    None,
                )?;
                true
            } else {
                tx.execute(
                    "DELETE FROM follows WHERE follower_id = ?1 AND following_id = ?2",
                    [actor_id, target_id],
                )?;
                tx.execute(
                    "UPDATE users SET following_count = MAX(following_count - 1, 0) WHERE id = ?1",
                    [actor_id],
                )?;
                tx.execute(
                    "UPDATE users SET followers_count = MAX(followers_count - 1, 0) WHERE id = ?1",
                    [target_id],
                )?;
                false
            };

            tx.commit()?;
            Ok(Some(following))
        })
    }

    /// Insert a comment, bump the post's comment counter and notify the
    /// author. A parent comment, when given, must belong to the same post.
    pub fn create_comment(
        &self,
        id: &str,
        actor_id: &str,
        post_id: &str,
        content: &str,
        parent_id: Option<&str>,
    ) -> Result<CommentOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let author: Option<String> = tx
                .query_row("SELECT user_id FROM posts WHERE id = ?1", [post_id], |row| {
                    row.get(0)
                })
                .optional()?;
            let Some(author_id) = author else {
                return Ok(CommentOutcome::PostMissing);
            };

            if let Some(parent) = parent_id {
                let parent_post: Option<String> = tx
                    .query_row(
                        "SELECT post_id FROM comments WHERE id = ?1",
                        [parent],
                        |row| row.get(0),
                    )
                    .optional()?;
                if parent_post.as_deref() != Some(post_id) {
                    return Ok(CommentOutcome::BadParent);
                }
            }

            tx.execute(
                "INSERT INTO comments (id, post_id, user_id, content, parent_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, post_id, actor_id, content, parent_id],
            )?;
            tx.execute(
                "UPDATE posts SET comments_count = comments_count + 1 WHERE id = ?1",
                [post_id],
            )?;

            if author_id != actor_id {
                insert_notification(
                    &tx,
                    &author_id,
                    "reply",
                    "Someone replied to your thought",
                    actor_id,
                    Some(post_id),
                )?;
            }

            tx.commit()?;
            Ok(CommentOutcome::Created)
        })
    }

    pub fn get_comment(&self, id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let sql = format!("{COMMENT_SELECT} WHERE c.id = ?1");
            conn.query_row(&sql, [id], map_comment).optional()
        })
    }

    /// Comments on a post, newest first.
    pub fn comments_for_post(&self, post_id: &str) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{COMMENT_SELECT} WHERE c.post_id = ?1
                 ORDER BY c.created_at DESC, c.id DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([post_id], map_comment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// File a report against a post and/or a user. Marks the post as
    /// reported and increments the target user's report count (the post
    /// author when only a post is given), banning the account once the
    /// count reaches [`BAN_REPORT_THRESHOLD`]. The ban is an explicit
    /// step of the same transaction, not a trigger. Returns `false`
    /// without writing anything when a named target does not exist.
    pub fn create_report(
        &self,
        id: &str,
        reporter_id: &str,
        post_id: Option<&str>,
        user_id: Option<&str>,
        reason: &str,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if let Some(user) = user_id {
                let exists: Option<String> = tx
                    .query_row("SELECT id FROM users WHERE id = ?1", [user], |row| row.get(0))
                    .optional()?;
                if exists.is_none() {
                    return Ok(false);
                }
            }
            if let Some(post) = post_id {
                let exists: Option<String> = tx
                    .query_row("SELECT id FROM posts WHERE id = ?1", [post], |row| row.get(0))
                    .optional()?;
                if exists.is_none() {
                    return Ok(false);
                }
            }

            tx.execute(
                "INSERT INTO reports (id, reporter_id, reported_post_id, reported_user_id, reason)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, reporter_id, post_id, user_id, reason],
            )?;

            let mut target_user = user_id.map(str::to_owned);
            if let Some(post) = post_id {
                tx.execute("UPDATE posts SET is_reported = 1 WHERE id = ?1", [post])?;
                if target_user.is_none() {
                    target_user = tx
                        .query_row("SELECT user_id FROM posts WHERE id = ?1", [post], |row| {
                            row.get(0)
                        })
                        .optional()?;
                }
            }

            if let Some(target) = target_user {
                tx.execute(
                    "UPDATE users SET report_count = report_count + 1 WHERE id = ?1",
                    [&target],
                )?;
                tx.execute(
                    "UPDATE users SET is_banned = 1 WHERE id = ?1 AND report_count >= ?2",
                    rusqlite::params![target, BAN_REPORT_THRESHOLD],
                )?;
            }

            tx.commit()?;
            Ok(true)
        })
    }

    // -- Viewer-relative lookups --

    /// Of the given posts, which has the viewer liked.
    pub fn liked_post_ids(&self, viewer_id: &str, post_ids: &[String]) -> Result<Vec<String>> {
        self.ids_in("likes", "post_id", viewer_id, post_ids)
    }

    /// Of the given posts, which has the viewer saved.
    pub fn saved_post_ids(&self, viewer_id: &str, post_ids: &[String]) -> Result<Vec<String>> {
        self.ids_in("saves", "post_id", viewer_id, post_ids)
    }

    /// Of the given comments, which has the viewer liked.
    pub fn liked_comment_ids(
        &self,
        viewer_id: &str,
        comment_ids: &[String],
    ) -> Result<Vec<String>> {
        self.ids_in("likes", "comment_id", viewer_id, comment_ids)
    }

    pub fn is_following(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<String> = conn
                .query_row(
                    "SELECT id FROM follows WHERE follower_id = ?1 AND following_id = ?2",
                    [follower_id, following_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    fn ids_in(
        &self,
        table: &str,
        column: &str,
        viewer_id: &str,
        target_ids: &[String],
    ) -> Result<Vec<String>> {
        if target_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (2..=target_ids.len() + 1).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT {column} FROM {table} WHERE user_id = ?1 AND {column} IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&viewer_id];
            params.extend(target_ids.iter().map(|id| id as &dyn rusqlite::types::ToSql));

            let rows = stmt
                .query_map(params.as_slice(), |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

const COMMENT_SELECT: &str = "SELECT c.id, c.post_id, c.user_id, c.content, c.parent_id, c.created_at,
            u.username, u.display_name, u.avatar_gradient
     FROM comments c
     JOIN users u ON c.user_id = u.id";

fn map_comment(row: &Row) -> std::result::Result<CommentRow, rusqlite::Error> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        user_id: row.get(2)?,
        content: row.get(3)?,
        parent_id: row.get(4)?,
        created_at: row.get(5)?,
        author_username: row.get(6)?,
        author_display_name: row.get(7)?,
        author_avatar_gradient: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posts::tests::{seed_post, seed_user};

    fn db_with_post() -> Database {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "author", "ghost");
        seed_user(&db, "viewer", "shade");
        seed_post(&db, "p1", "author", "a thought");
        db
    }

    #[test]
    fn like_toggle_returns_to_original_state() {
        let db = db_with_post();

        assert_eq!(db.toggle_like("viewer", "p1").unwrap(), Some(true));
        assert_eq!(db.get_post("p1").unwrap().unwrap().likes_count, 1);

        assert_eq!(db.toggle_like("viewer", "p1").unwrap(), Some(false));
        let post = db.get_post("p1").unwrap().unwrap();
        assert_eq!(post.likes_count, 0);
        assert!(db.liked_post_ids("viewer", &["p1".into()]).unwrap().is_empty());
    }

    #[test]
    fn like_missing_post_is_none() {
        let db = db_with_post();
        assert_eq!(db.toggle_like("viewer", "nope").unwrap(), None);
    }

    #[test]
    fn like_notifies_author_but_not_self() {
        let db = db_with_post();

        db.toggle_like("viewer", "p1").unwrap();
        let notifs = db.notifications_for("author", 50).unwrap();
        assert_eq!(notifs.len(), 1);
        assert_eq!(notifs[0].kind, "reaction");
        assert_eq!(notifs[0].profile_id, "viewer");
        assert_eq!(notifs[0].post_id.as_deref(), Some("p1"));

        // unlike must not fan out again
        db.toggle_like("viewer", "p1").unwrap();
        assert_eq!(db.notifications_for("author", 50).unwrap().len(), 1);

        // self-like never notifies
        db.toggle_like("author", "p1").unwrap();
        assert_eq!(db.notifications_for("author", 50).unwrap().len(), 1);
    }

    #[test]
    fn likes_count_never_goes_negative() {
        let db = db_with_post();
        // force the counter down to zero, then unlike once more via a
        // stale row deletion path
        db.toggle_like("viewer", "p1").unwrap();
        db.toggle_like("viewer", "p1").unwrap();
        db.toggle_like("viewer", "p1").unwrap();
        db.toggle_like("viewer", "p1").unwrap();
        assert_eq!(db.get_post("p1").unwrap().unwrap().likes_count, 0);
    }

    #[test]
    fn save_toggle_has_no_side_effects() {
        let db = db_with_post();

        assert_eq!(db.toggle_save("viewer", "p1").unwrap(), Some(true));
        assert_eq!(db.saved_post_ids("viewer", &["p1".into()]).unwrap(), vec!["p1"]);
        // no counter, no notification
        assert_eq!(db.get_post("p1").unwrap().unwrap().likes_count, 0);
        assert!(db.notifications_for("author", 50).unwrap().is_empty());

        assert_eq!(db.toggle_save("viewer", "p1").unwrap(), Some(false));
        assert!(db.saved_post_ids("viewer", &["p1".into()]).unwrap().is_empty());
    }

    #[test]
    fn follow_maintains_both_counters() {
        let db = db_with_post();

        assert_eq!(db.toggle_follow("viewer", "author").unwrap(), Some(true));
        assert_eq!(db.get_user_by_id("viewer").unwrap().unwrap().following_count, 1);
        assert_eq!(db.get_user_by_id("author").unwrap().unwrap().followers_count, 1);
        assert!(db.is_following("viewer", "author").unwrap());
        assert!(!db.is_following("author", "viewer").unwrap());

        let notifs = db.notifications_for("author", 50).unwrap();
        assert_eq!(notifs.len(), 1);
        assert_eq!(notifs[0].kind, "follow");

        assert_eq!(db.toggle_follow("viewer", "author").unwrap(), Some(false));
        assert_eq!(db.get_user_by_id("viewer").unwrap().unwrap().following_count, 0);
        assert_eq!(db.get_user_by_id("author").unwrap().unwrap().followers_count, 0);
    }

    #[test]
    fn self_follow_rejected_by_schema() {
        let db = db_with_post();
        assert!(db.toggle_follow("viewer", "viewer").is_err());
    }

    #[test]
    fn comment_bumps_counter_and_notifies() {
        let db = db_with_post();

        let outcome = db
            .create_comment("c1", "viewer", "p1", "same here", None)
            .unwrap();
        assert_eq!(outcome, CommentOutcome::Created);
        assert_eq!(db.get_post("p1").unwrap().unwrap().comments_count, 1);

        let notifs = db.notifications_for("author", 50).unwrap();
        assert_eq!(notifs.len(), 1);
        assert_eq!(notifs[0].kind, "reply");

        // self-comment counts but does not notify
        db.create_comment("c2", "author", "p1", "thanks", None).unwrap();
        assert_eq!(db.get_post("p1").unwrap().unwrap().comments_count, 2);
        assert_eq!(db.notifications_for("author", 50).unwrap().len(), 1);
    }

    #[test]
    fn comment_parent_must_be_on_same_post() {
        let db = db_with_post();
        seed_post(&db, "p2", "author", "another thought");

        db.create_comment("c1", "viewer", "p1", "root", None).unwrap();

        let ok = db
            .create_comment("c2", "viewer", "p1", "reply", Some("c1"))
            .unwrap();
        assert_eq!(ok, CommentOutcome::Created);

        let wrong_post = db
            .create_comment("c3", "viewer", "p2", "reply", Some("c1"))
            .unwrap();
        assert_eq!(wrong_post, CommentOutcome::BadParent);

        let missing = db
            .create_comment("c4", "viewer", "p1", "reply", Some("cX"))
            .unwrap();
        assert_eq!(missing, CommentOutcome::BadParent);

        assert_eq!(db.create_comment("c5", "viewer", "pX", "x", None).unwrap(),
            CommentOutcome::PostMissing);
    }

    #[test]
    fn report_marks_post_and_counts_against_author() {
        let db = db_with_post();

        assert!(db.create_report("r1", "viewer", Some("p1"), None, "offensive").unwrap());

        assert!(db.get_post("p1").unwrap().unwrap().is_reported);
        let author = db.get_user_by_id("author").unwrap().unwrap();
        assert_eq!(author.report_count, 1);
        assert!(!author.is_banned);
    }

    #[test]
    fn report_against_unknown_target_writes_nothing() {
        let db = db_with_post();

        assert!(!db.create_report("r1", "viewer", Some("pX"), None, "spam").unwrap());
        assert!(!db.create_report("r2", "viewer", None, Some("nobody"), "spam").unwrap());

        assert!(!db.get_post("p1").unwrap().unwrap().is_reported);
        assert_eq!(db.get_user_by_id("author").unwrap().unwrap().report_count, 0);
        let reports: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM reports", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(reports, 0);
    }

    #[test]
    fn tenth_report_bans_the_user() {
        let db = db_with_post();

        for i in 0..BAN_REPORT_THRESHOLD {
            db.create_report(&format!("r{i}"), "viewer", None, Some("author"), "spam")
                .unwrap();
        }

        let author = db.get_user_by_id("author").unwrap().unwrap();
        assert_eq!(author.report_count, BAN_REPORT_THRESHOLD);
        assert!(author.is_banned);

        // ninth report alone would not have banned
        let other = Database::open_in_memory().unwrap();
        seed_user(&other, "u", "ghost");
        seed_user(&other, "r", "shade");
        for i in 0..BAN_REPORT_THRESHOLD - 1 {
            other
                .create_report(&format!("r{i}"), "r", None, Some("u"), "spam")
                .unwrap();
        }
        assert!(!other.get_user_by_id("u").unwrap().unwrap().is_banned);
    }

    #[test]
    fn double_like_impossible() {
        let db = db_with_post();
        db.toggle_like("viewer", "p1").unwrap();

        // direct insert around the toggle hits the partial unique index
        let dup = db.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO likes (id, user_id, post_id) VALUES ('dup', 'viewer', 'p1')",
                [],
            )?;
            Ok(())
        });
        assert!(dup.is_err());
    }

    #[test]
    fn follower_count_matches_edge_cardinality() {
        let db = db_with_post();
        seed_user(&db, "third", "wisp");

        db.toggle_follow("viewer", "author").unwrap();
        db.toggle_follow("third", "author").unwrap();
        db.toggle_follow("viewer", "author").unwrap(); // unfollow

        let count: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM follows WHERE following_id = 'author'",
                    [],
                    |row| row.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(db.get_user_by_id("author").unwrap().unwrap().followers_count, count);
    }
}
