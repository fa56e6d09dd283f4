//! SQLite-backed stores using sqlx.

use std::collections::HashMap;

use {
    async_trait::async_trait,
    sqlx::{Row, SqlitePool, sqlite::SqliteRow},
};

use crate::{
    Error, Result,
    store::{PicStore, UserStore},
    types::{Pic, PicPatch, PicSnapshot, PicWithSchedules, Schedule, SchedulePatch, User},
};

/// Production persistence backend. Construct the pool with [`crate::connect`]
/// and run [`crate::run_migrations`] first.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &SqliteRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        phone: row.get("phone"),
        chat_id: row.get("chat_id"),
        link_code_hash: row.get("link_code_hash"),
        telegram_linked: row.get::<i64, _>("telegram_linked") != 0,
    }
}

fn pic_from_row(row: &SqliteRow) -> Pic {
    Pic {
        id: row.get("id"),
        user_id: row.get("user_id"),
        filename: row.get("filename"),
        timezone: row.get("timezone"),
    }
}

fn schedule_from_row(row: &SqliteRow) -> Schedule {
    Schedule {
        id: row.get("id"),
        pic_id: row.get("pic_id"),
        days_of_week: row.get("days_of_week"),
        day_time: row.get("day_time"),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.kind() == sqlx::error::ErrorKind::UniqueViolation)
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn create_user(&self, user: &User) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO users (id, username, password_hash, phone, chat_id, link_code_hash, telegram_linked)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.phone)
        .bind(user.chat_id)
        .bind(&user.link_code_hash)
        .bind(i64::from(user.telegram_linked))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(Error::UserExists {
                username: user.username.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn set_link_code_hash(&self, user_id: &str, hash: &str) -> Result<()> {
        let result = sqlx::query("UPDATE users SET link_code_hash = ? WHERE id = ?")
            .bind(hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("user", user_id));
        }
        Ok(())
    }

    async fn confirm_link(&self, user_id: &str) -> Result<()> {
        let result =
            sqlx::query("UPDATE users SET telegram_linked = 1, link_code_hash = NULL WHERE id = ?")
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("user", user_id));
        }
        Ok(())
    }

    async fn insert_session(&self, token: &str, user_id: &str, ttl_days: u32) -> Result<()> {
        sqlx::query(
            "INSERT INTO auth_sessions (token, user_id, expires_at)
             VALUES (?, ?, datetime('now', ?))",
        )
        .bind(token)
        .bind(user_id)
        .bind(format!("+{ttl_days} days"))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn user_for_session(&self, token: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT u.* FROM users u
             JOIN auth_sessions s ON s.user_id = u.id
             WHERE s.token = ? AND s.expires_at > datetime('now')",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn delete_session(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PicStore for SqliteStore {
    async fn create_pic(&self, pic: &Pic) -> Result<()> {
        sqlx::query("INSERT INTO pics (id, user_id, filename, timezone) VALUES (?, ?, ?, ?)")
            .bind(&pic.id)
            .bind(&pic.user_id)
            .bind(&pic.filename)
            .bind(&pic.timezone)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<Vec<PicWithSchedules>> {
        let offset = (page.saturating_sub(1)) * limit;
        let rows = sqlx::query(
            "SELECT * FROM pics WHERE user_id = ? ORDER BY rowid LIMIT ? OFFSET ?",
        )
        .bind(user_id)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        let mut pics = Vec::with_capacity(rows.len());
        for row in &rows {
            let pic = pic_from_row(row);
            let schedules = sqlx::query("SELECT * FROM schedules WHERE pic_id = ? ORDER BY rowid")
                .bind(&pic.id)
                .fetch_all(&self.pool)
                .await?
                .iter()
                .map(schedule_from_row)
                .collect();
            pics.push(PicWithSchedules { pic, schedules });
        }
        Ok(pics)
    }

    async fn get_for_user(&self, user_id: &str, pic_id: &str) -> Result<Option<Pic>> {
        let row = sqlx::query("SELECT * FROM pics WHERE user_id = ? AND id = ?")
            .bind(user_id)
            .bind(pic_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(pic_from_row))
    }

    async fn patch_pic(&self, user_id: &str, pic_id: &str, patch: &PicPatch) -> Result<Pic> {
        let mut pic = self
            .get_for_user(user_id, pic_id)
            .await?
            .ok_or_else(|| Error::not_found("pic", pic_id))?;

        if let Some(ref filename) = patch.filename {
            pic.filename = filename.clone();
        }
        if let Some(ref timezone) = patch.timezone {
            pic.timezone = timezone.clone();
        }

        sqlx::query("UPDATE pics SET filename = ?, timezone = ? WHERE id = ? AND user_id = ?")
            .bind(&pic.filename)
            .bind(&pic.timezone)
            .bind(pic_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(pic)
    }

    async fn delete_pic(&self, user_id: &str, pic_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM pics WHERE id = ? AND user_id = ?")
            .bind(pic_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("pic", pic_id));
        }
        Ok(())
    }

    async fn create_schedule(&self, schedule: &Schedule) -> Result<()> {
        sqlx::query(
            "INSERT INTO schedules (id, pic_id, days_of_week, day_time) VALUES (?, ?, ?, ?)",
        )
        .bind(&schedule.id)
        .bind(&schedule.pic_id)
        .bind(&schedule.days_of_week)
        .bind(&schedule.day_time)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn patch_schedule(
        &self,
        pic_id: &str,
        schedule_id: &str,
        patch: &SchedulePatch,
    ) -> Result<Schedule> {
        let row = sqlx::query("SELECT * FROM schedules WHERE pic_id = ? AND id = ?")
            .bind(pic_id)
            .bind(schedule_id)
            .fetch_optional(&self.pool)
            .await?;
        let mut schedule = row
            .as_ref()
            .map(schedule_from_row)
            .ok_or_else(|| Error::not_found("schedule", schedule_id))?;

        if let Some(ref days) = patch.days_of_week {
            schedule.days_of_week = days.clone();
        }
        if let Some(ref time) = patch.day_time {
            schedule.day_time = time.clone();
        }

        sqlx::query("UPDATE schedules SET days_of_week = ?, day_time = ? WHERE id = ?")
            .bind(&schedule.days_of_week)
            .bind(&schedule.day_time)
            .bind(schedule_id)
            .execute(&self.pool)
            .await?;
        Ok(schedule)
    }

    async fn delete_schedule(&self, pic_id: &str, schedule_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM schedules WHERE pic_id = ? AND id = ?")
            .bind(pic_id)
            .bind(schedule_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("schedule", schedule_id));
        }
        Ok(())
    }

    async fn load_all_with_schedules(&self) -> Result<Vec<PicSnapshot>> {
        // One transaction so matching sees a consistent view of all three
        // tables.
        let mut tx = self.pool.begin().await?;

        let user_rows = sqlx::query("SELECT * FROM users")
            .fetch_all(&mut *tx)
            .await?;
        let pic_rows = sqlx::query("SELECT * FROM pics ORDER BY rowid")
            .fetch_all(&mut *tx)
            .await?;
        let schedule_rows = sqlx::query("SELECT * FROM schedules ORDER BY rowid")
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;

        let users: HashMap<String, User> = user_rows
            .iter()
            .map(|row| {
                let user = user_from_row(row);
                (user.id.clone(), user)
            })
            .collect();

        let mut schedules_by_pic: HashMap<String, Vec<Schedule>> = HashMap::new();
        for row in &schedule_rows {
            let schedule = schedule_from_row(row);
            schedules_by_pic
                .entry(schedule.pic_id.clone())
                .or_default()
                .push(schedule);
        }

        let mut snapshot = Vec::with_capacity(pic_rows.len());
        for row in &pic_rows {
            let pic = pic_from_row(row);
            let Some(owner) = users.get(&pic.user_id).cloned() else {
                // FK guarantees an owner; a pic without one contributes nothing.
                continue;
            };
            let schedules = schedules_by_pic.remove(&pic.id).unwrap_or_default();
            snapshot.push(PicSnapshot {
                pic,
                schedules,
                owner,
            });
        }
        Ok(snapshot)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    async fn make_store() -> SqliteStore {
        let pool = crate::connect("sqlite::memory:", 1).await.unwrap();
        crate::run_migrations(&pool).await.unwrap();
        SqliteStore::new(pool)
    }

    fn make_user(id: &str, username: &str) -> User {
        User {
            id: id.into(),
            username: username.into(),
            password_hash: "$argon2$fake".into(),
            phone: "+15550100".into(),
            chat_id: 42,
            link_code_hash: None,
            telegram_linked: false,
        }
    }

    fn make_pic(id: &str, user_id: &str) -> Pic {
        Pic {
            id: id.into(),
            user_id: user_id.into(),
            filename: format!("{id}.jpg"),
            timezone: "+00:00".into(),
        }
    }

    fn make_schedule(id: &str, pic_id: &str) -> Schedule {
        Schedule {
            id: id.into(),
            pic_id: pic_id.into(),
            days_of_week: "1111111".into(),
            day_time: "09:00".into(),
        }
    }

    #[tokio::test]
    async fn user_roundtrip() {
        let store = make_store().await;
        store.create_user(&make_user("u1", "alice")).await.unwrap();

        let by_name = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, "u1");
        let by_id = store.find_by_id("u1").await.unwrap().unwrap();
        assert_eq!(by_id.username, "alice");
        assert!(store.find_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_username_rejected() {
        let store = make_store().await;
        store.create_user(&make_user("u1", "alice")).await.unwrap();
        let err = store
            .create_user(&make_user("u2", "alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UserExists { .. }));
    }

    #[tokio::test]
    async fn link_code_lifecycle() {
        let store = make_store().await;
        store.create_user(&make_user("u1", "alice")).await.unwrap();

        store.set_link_code_hash("u1", "abc123").await.unwrap();
        let user = store.find_by_id("u1").await.unwrap().unwrap();
        assert_eq!(user.link_code_hash.as_deref(), Some("abc123"));
        assert!(!user.telegram_linked);

        store.confirm_link("u1").await.unwrap();
        let user = store.find_by_id("u1").await.unwrap().unwrap();
        assert!(user.telegram_linked);
        assert!(user.link_code_hash.is_none());
    }

    #[tokio::test]
    async fn sessions_resolve_and_expire() {
        let store = make_store().await;
        store.create_user(&make_user("u1", "alice")).await.unwrap();

        store.insert_session("tok", "u1", 30).await.unwrap();
        let user = store.user_for_session("tok").await.unwrap().unwrap();
        assert_eq!(user.id, "u1");
        assert!(store.user_for_session("bogus").await.unwrap().is_none());

        store.delete_session("tok").await.unwrap();
        assert!(store.user_for_session("tok").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_session_is_invalid() {
        let store = make_store().await;
        store.create_user(&make_user("u1", "alice")).await.unwrap();
        // ttl of zero days expires immediately.
        store.insert_session("tok", "u1", 0).await.unwrap();
        assert!(store.user_for_session("tok").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn pic_crud_is_user_scoped() {
        let store = make_store().await;
        store.create_user(&make_user("u1", "alice")).await.unwrap();
        store.create_user(&make_user("u2", "bob")).await.unwrap();
        store.create_pic(&make_pic("p1", "u1")).await.unwrap();

        assert!(store.get_for_user("u1", "p1").await.unwrap().is_some());
        assert!(store.get_for_user("u2", "p1").await.unwrap().is_none());

        let err = store.delete_pic("u2", "p1").await.unwrap_err();
        assert!(err.is_not_found());
        store.delete_pic("u1", "p1").await.unwrap();
    }

    #[tokio::test]
    async fn patch_pic_applies_partial_update() {
        let store = make_store().await;
        store.create_user(&make_user("u1", "alice")).await.unwrap();
        store.create_pic(&make_pic("p1", "u1")).await.unwrap();

        let patched = store
            .patch_pic("u1", "p1", &PicPatch {
                timezone: Some("+02:00".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(patched.timezone, "+02:00");
        assert_eq!(patched.filename, "p1.jpg");
    }

    #[tokio::test]
    async fn list_pages_in_insertion_order() {
        let store = make_store().await;
        store.create_user(&make_user("u1", "alice")).await.unwrap();
        for i in 0..5 {
            store
                .create_pic(&make_pic(&format!("p{i}"), "u1"))
                .await
                .unwrap();
        }

        let first = store.list_for_user("u1", 1, 2).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].pic.id, "p0");

        let third = store.list_for_user("u1", 3, 2).await.unwrap();
        assert_eq!(third.len(), 1);
        assert_eq!(third[0].pic.id, "p4");
    }

    #[tokio::test]
    async fn deleting_pic_cascades_schedules() {
        let store = make_store().await;
        store.create_user(&make_user("u1", "alice")).await.unwrap();
        store.create_pic(&make_pic("p1", "u1")).await.unwrap();
        store
            .create_schedule(&make_schedule("s1", "p1"))
            .await
            .unwrap();

        store.delete_pic("u1", "p1").await.unwrap();
        let snapshot = store.load_all_with_schedules().await.unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn schedule_patch_and_delete() {
        let store = make_store().await;
        store.create_user(&make_user("u1", "alice")).await.unwrap();
        store.create_pic(&make_pic("p1", "u1")).await.unwrap();
        store
            .create_schedule(&make_schedule("s1", "p1"))
            .await
            .unwrap();

        let patched = store
            .patch_schedule("p1", "s1", &SchedulePatch {
                day_time: Some("18:30".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(patched.day_time, "18:30");
        assert_eq!(patched.days_of_week, "1111111");

        store.delete_schedule("p1", "s1").await.unwrap();
        assert!(store.delete_schedule("p1", "s1").await.is_err());
    }

    #[tokio::test]
    async fn snapshot_attaches_schedules_and_owner() {
        let store = make_store().await;
        store.create_user(&make_user("u1", "alice")).await.unwrap();
        store.create_pic(&make_pic("p1", "u1")).await.unwrap();
        store.create_pic(&make_pic("p2", "u1")).await.unwrap();
        store
            .create_schedule(&make_schedule("s1", "p1"))
            .await
            .unwrap();

        let snapshot = store.load_all_with_schedules().await.unwrap();
        assert_eq!(snapshot.len(), 2);
        let p1 = snapshot.iter().find(|s| s.pic.id == "p1").unwrap();
        assert_eq!(p1.schedules.len(), 1);
        assert_eq!(p1.owner.username, "alice");
        let p2 = snapshot.iter().find(|s| s.pic.id == "p2").unwrap();
        assert!(p2.schedules.is_empty());
    }
}
