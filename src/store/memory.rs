//! In-memory stand-ins for the document store and the cache, used by the
//! dispatcher and content endpoint suites.

use super::error::StoreError;
use crate::auth::Session;
use crate::content::store::ContentStore;
use crate::content::types::{ContentType, ContentUnit};
use crate::dispatcher::cache::ResponseCache;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
pub struct MemoryStore {
    answers: DashMap<String, (ContentUnit, Session)>,
    units: DashMap<(String, String), ContentUnit>,
    sessions: DashMap<String, Session>,
    failing_titles: DashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_session(&self, sid: &str, uid: &str) -> Session {
        let session = Session {
            sid: sid.to_string(),
            uid: uid.to_string(),
            name: String::new(),
            email: String::new(),
        };
        self.sessions.insert(sid.to_string(), session.clone());
        session
    }

    /// Makes every `insert_answer` of a unit titled `title` fail.
    pub fn fail_title(&self, title: &str) {
        self.failing_titles.insert(title.to_string());
    }

    pub fn answer_count(&self) -> usize {
        self.answers.len()
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn insert_answer(&self, unit: &ContentUnit, session: &Session) -> Result<(), StoreError> {
        if self.failing_titles.contains(&unit.title) {
            return Err(StoreError::Backend(format!("refusing {}", unit.title)));
        }
        self.answers
            .insert(unit.id.clone(), (unit.clone(), session.clone()));
        Ok(())
    }

    async fn find_answer(
        &self,
        id: &str,
        session: &Session,
    ) -> Result<Option<ContentUnit>, StoreError> {
        Ok(self.answers.get(id).and_then(|entry| {
            let (unit, owner) = entry.value();
            (owner.sid == session.sid && owner.uid == session.uid).then(|| unit.clone())
        }))
    }

    async fn insert_unit(&self, unit: &ContentUnit, session: &Session) -> Result<(), StoreError> {
        let key = (session.uid.clone(), unit.id.clone());
        if self.units.contains_key(&key) {
            return Err(StoreError::Duplicate);
        }
        self.units.insert(key, unit.clone());
        Ok(())
    }

    async fn list_units(
        &self,
        session: &Session,
        content_type: Option<ContentType>,
    ) -> Result<Vec<ContentUnit>, StoreError> {
        let mut units: Vec<ContentUnit> = self
            .units
            .iter()
            .filter(|entry| entry.key().0 == session.uid)
            .filter(|entry| {
                content_type.is_none_or(|wanted| entry.value().content_type == wanted.as_str())
            })
            .map(|entry| entry.value().clone())
            .collect();
        units.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(units)
    }

    async fn update_unit(&self, unit: &ContentUnit, session: &Session) -> Result<bool, StoreError> {
        match self.units.get_mut(&(session.uid.clone(), unit.id.clone())) {
            Some(mut saved) => {
                saved.stars = unit.stars;
                saved.comment = unit.comment.clone();
                saved.edited = unit.edited;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_unit(&self, id: &str, session: &Session) -> Result<bool, StoreError> {
        Ok(self
            .units
            .remove(&(session.uid.clone(), id.to_string()))
            .is_some())
    }

    async fn find_session(&self, sid: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.get(sid).map(|entry| entry.value().clone()))
    }
}

#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, String>,
    gets: AtomicUsize,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.value(key))
    }

    async fn put(&self, key: &str, value: &str, _expiry: Duration) -> Result<(), StoreError> {
        if value.is_empty() {
            return Err(StoreError::EmptyPayload);
        }
        self.insert(key, value);
        Ok(())
    }
}
