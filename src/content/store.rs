//! Document-store seam used by the dispatcher, the content handlers and
//! session resolution.

use super::types::{ContentType, ContentUnit};
use crate::auth::Session;
use crate::store::error::StoreError;

use async_trait::async_trait;

pub const ANSWERS: &str = "answers";
pub const UNITS: &str = "units";
pub const SESSIONS: &str = "sessions";

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Persists one stamped answer item on behalf of `session`.
    async fn insert_answer(&self, unit: &ContentUnit, session: &Session) -> Result<(), StoreError>;

    /// Looks up an answer previously returned to the same session.
    async fn find_answer(
        &self,
        id: &str,
        session: &Session,
    ) -> Result<Option<ContentUnit>, StoreError>;

    /// Saves a unit into the user's collection.
    async fn insert_unit(&self, unit: &ContentUnit, session: &Session) -> Result<(), StoreError>;

    async fn list_units(
        &self,
        session: &Session,
        content_type: Option<ContentType>,
    ) -> Result<Vec<ContentUnit>, StoreError>;

    /// Updates `stars`, `comment` and `edited` of a saved unit. Returns whether
    /// a unit matched.
    async fn update_unit(&self, unit: &ContentUnit, session: &Session) -> Result<bool, StoreError>;

    /// Returns whether a unit was removed.
    async fn remove_unit(&self, id: &str, session: &Session) -> Result<bool, StoreError>;

    async fn find_session(&self, sid: &str) -> Result<Option<Session>, StoreError>;
}
