//! Persistence traits for accounts and pics.

use async_trait::async_trait;

use crate::{
    Result,
    types::{Pic, PicPatch, PicSnapshot, PicWithSchedules, Schedule, SchedulePatch, User},
};

/// Account and session persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Fails with [`crate::Error::UserExists`] on a
    /// duplicate username.
    async fn create_user(&self, user: &User) -> Result<()>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;
    /// Record the hash of a freshly issued link code.
    async fn set_link_code_hash(&self, user_id: &str, hash: &str) -> Result<()>;
    /// Mark the Telegram link confirmed and clear the outstanding code hash.
    async fn confirm_link(&self, user_id: &str) -> Result<()>;

    /// Store a session token for `user_id`, valid for `ttl_days`.
    async fn insert_session(&self, token: &str, user_id: &str, ttl_days: u32) -> Result<()>;
    /// Resolve an unexpired session token to its user.
    async fn user_for_session(&self, token: &str) -> Result<Option<User>>;
    async fn delete_session(&self, token: &str) -> Result<()>;
}

/// Pic and schedule persistence.
#[async_trait]
pub trait PicStore: Send + Sync {
    async fn create_pic(&self, pic: &Pic) -> Result<()>;
    /// One page of the user's pics, schedules attached, insertion order.
    async fn list_for_user(
        &self,
        user_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<Vec<PicWithSchedules>>;
    /// Fetch a pic only if it belongs to `user_id`.
    async fn get_for_user(&self, user_id: &str, pic_id: &str) -> Result<Option<Pic>>;
    async fn patch_pic(&self, user_id: &str, pic_id: &str, patch: &PicPatch) -> Result<Pic>;
    /// Delete a pic; its schedules cascade.
    async fn delete_pic(&self, user_id: &str, pic_id: &str) -> Result<()>;

    async fn create_schedule(&self, schedule: &Schedule) -> Result<()>;
    async fn patch_schedule(
        &self,
        pic_id: &str,
        schedule_id: &str,
        patch: &SchedulePatch,
    ) -> Result<Schedule>;
    async fn delete_schedule(&self, pic_id: &str, schedule_id: &str) -> Result<()>;

    /// The whole table of pics with schedules and owners, read in one
    /// transaction so a tick evaluates a stable snapshot.
    async fn load_all_with_schedules(&self) -> Result<Vec<PicSnapshot>>;
}
