//! Document store backed by MongoDB.
//!
//! The driver pools and re-dials connections on its own, so refreshing the
//! handle only means re-validating it with a `ping`.

use super::error::StoreError;
use super::watchdog::{Connector, Watchdog};
use crate::auth::Session;
use crate::content::store::{ANSWERS, ContentStore, SESSIONS, UNITS};
use crate::content::types::{ContentType, ContentUnit};

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{Document, doc, from_document, to_document};
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use std::sync::Arc;
use std::time::Duration;

const DIAL_TIMEOUT: Duration = Duration::from_secs(30);

pub struct MongoConnector {
    uri: String,
    database: String,
}

impl MongoConnector {
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
        }
    }
}

pub struct MongoHandle {
    client: Client,
    database: Database,
}

async fn ping(database: &Database) -> Result<(), StoreError> {
    database.run_command(doc! { "ping": 1 }).await?;
    Ok(())
}

#[async_trait]
impl Connector for MongoConnector {
    type Handle = MongoHandle;

    fn name(&self) -> &str {
        "mongo"
    }

    async fn connect(&self) -> Result<MongoHandle, StoreError> {
        tracing::info!("Connecting to mongo database {}", self.database);

        let mut options = ClientOptions::parse(&self.uri).await?;
        options.connect_timeout = Some(DIAL_TIMEOUT);
        options.server_selection_timeout = Some(DIAL_TIMEOUT);

        let client = Client::with_options(options)?;
        let database = client.database(&self.database);
        ping(&database).await?;

        Ok(MongoHandle { client, database })
    }

    async fn refresh(&self, current: Arc<MongoHandle>) -> Result<Option<MongoHandle>, StoreError> {
        ping(&current.database).await?;
        Ok(None)
    }

    async fn release(&self, current: Arc<MongoHandle>) {
        current.client.clone().shutdown().await;
    }
}

/// Collection operations guarded by a [`Watchdog`].
pub struct MongoStore {
    watchdog: Watchdog<MongoConnector>,
}

impl MongoStore {
    pub async fn start(uri: &str, database: &str) -> Result<Self, StoreError> {
        let watchdog = Watchdog::start(MongoConnector::new(uri, database)).await?;
        Ok(Self { watchdog })
    }

    pub async fn is_active(&self) -> bool {
        self.watchdog.is_active().await
    }

    pub async fn close(&self) {
        self.watchdog.close().await;
    }

    async fn insert(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        tracing::debug!("Inserting into {}: {:?}", collection, document);

        self.watchdog
            .execute(|handle| {
                let document = document.clone();
                async move {
                    handle
                        .database
                        .collection::<Document>(collection)
                        .insert_one(document)
                        .await?;
                    Ok(())
                }
            })
            .await
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, StoreError> {
        self.watchdog
            .execute(|handle| {
                let filter = filter.clone();
                async move {
                    let found = handle
                        .database
                        .collection::<Document>(collection)
                        .find_one(filter)
                        .await?;
                    Ok(found)
                }
            })
            .await
    }

    async fn find_all(&self, collection: &str, filter: Document) -> Result<Vec<Document>, StoreError> {
        self.watchdog
            .execute(|handle| {
                let filter = filter.clone();
                async move {
                    let cursor = handle
                        .database
                        .collection::<Document>(collection)
                        .find(filter)
                        .await?;
                    let documents: Vec<Document> = cursor.try_collect().await?;
                    Ok(documents)
                }
            })
            .await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<bool, StoreError> {
        self.watchdog
            .execute(|handle| {
                let filter = filter.clone();
                let update = update.clone();
                async move {
                    let result = handle
                        .database
                        .collection::<Document>(collection)
                        .update_one(filter, update)
                        .await?;
                    Ok(result.matched_count > 0)
                }
            })
            .await
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> Result<bool, StoreError> {
        self.watchdog
            .execute(|handle| {
                let filter = filter.clone();
                async move {
                    let result = handle
                        .database
                        .collection::<Document>(collection)
                        .delete_one(filter)
                        .await?;
                    Ok(result.deleted_count > 0)
                }
            })
            .await
    }
}

/// Serializes `unit` and attaches the owner of the record.
fn owned_document(unit: &ContentUnit, session: &Session) -> Result<Document, StoreError> {
    let mut document = to_document(unit)?;
    document.insert("sid", session.sid.as_str());
    document.insert("uid", session.uid.as_str());
    Ok(document)
}

#[async_trait]
impl ContentStore for MongoStore {
    async fn insert_answer(&self, unit: &ContentUnit, session: &Session) -> Result<(), StoreError> {
        self.insert(ANSWERS, owned_document(unit, session)?).await
    }

    async fn find_answer(
        &self,
        id: &str,
        session: &Session,
    ) -> Result<Option<ContentUnit>, StoreError> {
        let filter = doc! { "id": id, "sid": session.sid.as_str(), "uid": session.uid.as_str() };
        match self.find_one(ANSWERS, filter).await? {
            Some(document) => Ok(Some(from_document(document)?)),
            None => Ok(None),
        }
    }

    async fn insert_unit(&self, unit: &ContentUnit, session: &Session) -> Result<(), StoreError> {
        self.insert(UNITS, owned_document(unit, session)?).await
    }

    async fn list_units(
        &self,
        session: &Session,
        content_type: Option<ContentType>,
    ) -> Result<Vec<ContentUnit>, StoreError> {
        let mut filter = doc! { "uid": session.uid.as_str() };
        if let Some(content_type) = content_type {
            filter.insert("type", content_type.as_str());
        }

        self.find_all(UNITS, filter)
            .await?
            .into_iter()
            .map(|document| from_document(document).map_err(StoreError::from))
            .collect()
    }

    async fn update_unit(&self, unit: &ContentUnit, session: &Session) -> Result<bool, StoreError> {
        let filter = doc! { "id": unit.id.as_str(), "uid": session.uid.as_str() };
        let update = doc! {
            "$set": {
                "stars": unit.stars,
                "comment": unit.comment.as_str(),
                "edited": unit.edited as i64,
            }
        };
        self.update_one(UNITS, filter, update).await
    }

    async fn remove_unit(&self, id: &str, session: &Session) -> Result<bool, StoreError> {
        self.delete_one(UNITS, doc! { "id": id, "uid": session.uid.as_str() })
            .await
    }

    async fn find_session(&self, sid: &str) -> Result<Option<Session>, StoreError> {
        match self.find_one(SESSIONS, doc! { "sid": sid }).await? {
            Some(document) => Ok(Some(from_document(document)?)),
            None => Ok(None),
        }
    }
}
