use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id                  TEXT PRIMARY KEY,
            username            TEXT NOT NULL UNIQUE,
            password_hash       TEXT NOT NULL,
            email               TEXT,
            device_fingerprint  TEXT NOT NULL,
            is_banned           INTEGER NOT NULL DEFAULT 0,
            report_count        INTEGER NOT NULL DEFAULT 0,
            bio                 TEXT NOT NULL DEFAULT 'New to UNSEEN',
            display_name        TEXT NOT NULL,
            avatar_gradient     TEXT NOT NULL,
            avatar_url          TEXT,
            mood_tag            TEXT NOT NULL DEFAULT '✨ feeling reflective',
            followers_count     INTEGER NOT NULL DEFAULT 0,
            following_count     INTEGER NOT NULL DEFAULT 0,
            posts_count         INTEGER NOT NULL DEFAULT 0,
            created_at          TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS posts (
            id              TEXT PRIMARY KEY,
            user_id         TEXT NOT NULL REFERENCES users(id),
            content         TEXT NOT NULL,
            type            TEXT NOT NULL DEFAULT 'text',
            voice_url       TEXT,
            waveform        TEXT,
            duration        REAL,
            likes_count     INTEGER NOT NULL DEFAULT 0,
            comments_count  INTEGER NOT NULL DEFAULT 0,
            is_reported     INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_posts_feed
            ON posts(is_reported, created_at);
        CREATE INDEX IF NOT EXISTS idx_posts_user
            ON posts(user_id, created_at);

        CREATE TABLE IF NOT EXISTS comments (
            id          TEXT PRIMARY KEY,
            post_id     TEXT NOT NULL REFERENCES posts(id),
            user_id     TEXT NOT NULL REFERENCES users(id),
            content     TEXT NOT NULL,
            parent_id   TEXT REFERENCES comments(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_comments_post
            ON comments(post_id, created_at);

        -- A like targets exactly one of a post or a comment. Uniqueness
        -- per (user, target) is enforced by partial indexes so that
        -- toggling can use insert-or-conflict as the discriminator.
        CREATE TABLE IF NOT EXISTS likes (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            post_id     TEXT REFERENCES posts(id),
            comment_id  TEXT REFERENCES comments(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            CHECK ((post_id IS NULL) <> (comment_id IS NULL))
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_likes_user_post
            ON likes(user_id, post_id) WHERE post_id IS NOT NULL;
        CREATE UNIQUE INDEX IF NOT EXISTS idx_likes_user_comment
            ON likes(user_id, comment_id) WHERE comment_id IS NOT NULL;

        CREATE TABLE IF NOT EXISTS saves (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            post_id     TEXT NOT NULL REFERENCES posts(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_id, post_id)
        );

        CREATE TABLE IF NOT EXISTS follows (
            id              TEXT PRIMARY KEY,
            follower_id     TEXT NOT NULL REFERENCES users(id),
            following_id    TEXT NOT NULL REFERENCES users(id),
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(follower_id, following_id),
            CHECK (follower_id <> following_id)
        );

        CREATE INDEX IF NOT EXISTS idx_follows_following
            ON follows(following_id);

        CREATE TABLE IF NOT EXISTS messages (
            id              TEXT PRIMARY KEY,
            sender_id       TEXT NOT NULL REFERENCES users(id),
            recipient_id    TEXT REFERENCES users(id),
            room_id         TEXT REFERENCES rooms(id),
            content         TEXT,
            type            TEXT NOT NULL DEFAULT 'text',
            voice_url       TEXT,
            waveform        TEXT,
            duration        REAL,
            is_read         INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            CHECK ((recipient_id IS NULL) <> (room_id IS NULL))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_thread
            ON messages(sender_id, recipient_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_messages_room
            ON messages(room_id, created_at);

        CREATE TABLE IF NOT EXISTS rooms (
            id              TEXT PRIMARY KEY,
            name            TEXT NOT NULL,
            type            TEXT NOT NULL DEFAULT 'public',
            password_hash   TEXT,
            created_by      TEXT NOT NULL REFERENCES users(id),
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS room_members (
            id          TEXT PRIMARY KEY,
            room_id     TEXT NOT NULL REFERENCES rooms(id),
            user_id     TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(room_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS notifications (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            type        TEXT NOT NULL,
            content     TEXT NOT NULL,
            profile_id  TEXT NOT NULL REFERENCES users(id),
            post_id     TEXT REFERENCES posts(id),
            is_read     INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_user
            ON notifications(user_id, created_at);

        CREATE TABLE IF NOT EXISTS reports (
            id                  TEXT PRIMARY KEY,
            reporter_id         TEXT NOT NULL REFERENCES users(id),
            reported_post_id    TEXT REFERENCES posts(id),
            reported_user_id    TEXT REFERENCES users(id),
            reason              TEXT NOT NULL,
            created_at          TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS device_tracking (
            device_fingerprint  TEXT PRIMARY KEY,
            account_count       INTEGER NOT NULL DEFAULT 1,
            created_at          TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
