//! In-memory stores for testing. No persistence.

use std::{
    collections::HashMap,
    sync::Mutex,
};

use {
    async_trait::async_trait,
    chrono::{DateTime, Duration, Utc},
};

use crate::{
    Error, Result,
    store::{PicStore, UserStore},
    types::{Pic, PicPatch, PicSnapshot, PicWithSchedules, Schedule, SchedulePatch, User},
};

#[derive(Default)]
pub struct InMemoryStore {
    users: Mutex<HashMap<String, User>>,
    pics: Mutex<Vec<Pic>>,
    schedules: Mutex<Vec<Schedule>>,
    sessions: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        if users.values().any(|u| u.username == user.username) {
            return Err(Error::UserExists {
                username: user.username.clone(),
            });
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        Ok(users.get(id).cloned())
    }

    async fn set_link_code_hash(&self, user_id: &str, hash: &str) -> Result<()> {
        let mut users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| Error::not_found("user", user_id))?;
        user.link_code_hash = Some(hash.to_string());
        Ok(())
    }

    async fn confirm_link(&self, user_id: &str) -> Result<()> {
        let mut users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| Error::not_found("user", user_id))?;
        user.telegram_linked = true;
        user.link_code_hash = None;
        Ok(())
    }

    async fn insert_session(&self, token: &str, user_id: &str, ttl_days: u32) -> Result<()> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let expires = Utc::now() + Duration::days(i64::from(ttl_days));
        sessions.insert(token.to_string(), (user_id.to_string(), expires));
        Ok(())
    }

    async fn user_for_session(&self, token: &str) -> Result<Option<User>> {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let Some((user_id, expires)) = sessions.get(token) else {
            return Ok(None);
        };
        if *expires <= Utc::now() {
            return Ok(None);
        }
        let users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        Ok(users.get(user_id).cloned())
    }

    async fn delete_session(&self, token: &str) -> Result<()> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.remove(token);
        Ok(())
    }
}

#[async_trait]
impl PicStore for InMemoryStore {
    async fn create_pic(&self, pic: &Pic) -> Result<()> {
        let mut pics = self.pics.lock().unwrap_or_else(|e| e.into_inner());
        pics.push(pic.clone());
        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<Vec<PicWithSchedules>> {
        let pics = self.pics.lock().unwrap_or_else(|e| e.into_inner());
        let schedules = self.schedules.lock().unwrap_or_else(|e| e.into_inner());
        let offset = (page.saturating_sub(1) * limit) as usize;
        Ok(pics
            .iter()
            .filter(|p| p.user_id == user_id)
            .skip(offset)
            .take(limit as usize)
            .map(|pic| PicWithSchedules {
                pic: pic.clone(),
                schedules: schedules
                    .iter()
                    .filter(|s| s.pic_id == pic.id)
                    .cloned()
                    .collect(),
            })
            .collect())
    }

    async fn get_for_user(&self, user_id: &str, pic_id: &str) -> Result<Option<Pic>> {
        let pics = self.pics.lock().unwrap_or_else(|e| e.into_inner());
        Ok(pics
            .iter()
            .find(|p| p.user_id == user_id && p.id == pic_id)
            .cloned())
    }

    async fn patch_pic(&self, user_id: &str, pic_id: &str, patch: &PicPatch) -> Result<Pic> {
        let mut pics = self.pics.lock().unwrap_or_else(|e| e.into_inner());
        let pic = pics
            .iter_mut()
            .find(|p| p.user_id == user_id && p.id == pic_id)
            .ok_or_else(|| Error::not_found("pic", pic_id))?;
        if let Some(ref filename) = patch.filename {
            pic.filename = filename.clone();
        }
        if let Some(ref timezone) = patch.timezone {
            pic.timezone = timezone.clone();
        }
        Ok(pic.clone())
    }

    async fn delete_pic(&self, user_id: &str, pic_id: &str) -> Result<()> {
        let mut pics = self.pics.lock().unwrap_or_else(|e| e.into_inner());
        let before = pics.len();
        pics.retain(|p| !(p.user_id == user_id && p.id == pic_id));
        if pics.len() == before {
            return Err(Error::not_found("pic", pic_id));
        }
        let mut schedules = self.schedules.lock().unwrap_or_else(|e| e.into_inner());
        schedules.retain(|s| s.pic_id != pic_id);
        Ok(())
    }

    async fn create_schedule(&self, schedule: &Schedule) -> Result<()> {
        let mut schedules = self.schedules.lock().unwrap_or_else(|e| e.into_inner());
        schedules.push(schedule.clone());
        Ok(())
    }

    async fn patch_schedule(
        &self,
        pic_id: &str,
        schedule_id: &str,
        patch: &SchedulePatch,
    ) -> Result<Schedule> {
        let mut schedules = self.schedules.lock().unwrap_or_else(|e| e.into_inner());
        let schedule = schedules
            .iter_mut()
            .find(|s| s.pic_id == pic_id && s.id == schedule_id)
            .ok_or_else(|| Error::not_found("schedule", schedule_id))?;
        if let Some(ref days) = patch.days_of_week {
            schedule.days_of_week = days.clone();
        }
        if let Some(ref time) = patch.day_time {
            schedule.day_time = time.clone();
        }
        Ok(schedule.clone())
    }

    async fn delete_schedule(&self, pic_id: &str, schedule_id: &str) -> Result<()> {
        let mut schedules = self.schedules.lock().unwrap_or_else(|e| e.into_inner());
        let before = schedules.len();
        schedules.retain(|s| !(s.pic_id == pic_id && s.id == schedule_id));
        if schedules.len() == before {
            return Err(Error::not_found("schedule", schedule_id));
        }
        Ok(())
    }

    async fn load_all_with_schedules(&self) -> Result<Vec<PicSnapshot>> {
        let users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        let pics = self.pics.lock().unwrap_or_else(|e| e.into_inner());
        let schedules = self.schedules.lock().unwrap_or_else(|e| e.into_inner());
        Ok(pics
            .iter()
            .filter_map(|pic| {
                let owner = users.get(&pic.user_id)?.clone();
                Some(PicSnapshot {
                    pic: pic.clone(),
                    schedules: schedules
                        .iter()
                        .filter(|s| s.pic_id == pic.id)
                        .cloned()
                        .collect(),
                    owner,
                })
            })
            .collect())
    }
}
