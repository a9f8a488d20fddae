use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use async_trait::async_trait;
use time::OffsetDateTime;

use super::repo::{StoreError, UserStore};
use super::repo_types::{Role, User, UserFilter};

/// In-process `UserStore` for tests.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
    down: AtomicBool,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            users: Mutex::new(users),
            down: AtomicBool::new(false),
        }
    }

    /// Makes every call fail as if the database were unreachable.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn get(&self, user_id: i64) -> Option<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.user_id == user_id)
            .cloned()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(anyhow::anyhow!("connection refused")));
        }
        Ok(())
    }
}

pub fn user(user_id: i64, email: &str, role: Role) -> User {
    User {
        user_id,
        username: email.split('@').next().unwrap_or_default().to_string(),
        email: email.to_string(),
        role,
        created_at: OffsetDateTime::UNIX_EPOCH,
        last_login: None,
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        self.check()?;
        Ok(self.get(user_id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.check()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create(&self, email: &str, username: &str, role: Role) -> Result<User, StoreError> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == email) {
            return Err(StoreError::DuplicateEmail);
        }
        let now = OffsetDateTime::now_utc();
        let created = User {
            user_id: users.iter().map(|u| u.user_id).max().unwrap_or(0) + 1,
            username: username.to_string(),
            email: email.to_string(),
            role,
            created_at: now,
            last_login: Some(now),
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn touch_last_login(&self, user_id: i64) -> Result<OffsetDateTime, StoreError> {
        self.check()?;
        let now = OffsetDateTime::now_utc();
        let mut users = self.users.lock().unwrap();
        let u = users
            .iter_mut()
            .find(|u| u.user_id == user_id)
            .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("no user {user_id}")))?;
        u.last_login = Some(now);
        Ok(now)
    }

    async fn set_role(&self, user_id: i64, role: Role) -> Result<(), StoreError> {
        self.check()?;
        if let Some(u) = self.users.lock().unwrap().iter_mut().find(|u| u.user_id == user_id) {
            u.role = role;
        }
        Ok(())
    }

    async fn list(&self, filter: &UserFilter) -> Result<Vec<User>, StoreError> {
        self.check()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| filter.role.map_or(true, |r| u.role == r))
            .filter(|u| {
                filter.search.as_ref().map_or(true, |s| {
                    u.username.contains(s.as_str()) || u.email.contains(s.as_str())
                })
            })
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .cloned()
            .collect())
    }
}
