//! Country repository
//!
//! Sole writer of country documents. Constructed once at startup and
//! shared through AppState instead of ambient module-level state.

use bson::{doc, DateTime};
use tracing::warn;

use crate::db::mongo::{MongoClient, MongoCollection};
use crate::db::schemas::{CountryDoc, PolicyField, COUNTRY_COLLECTION};
use crate::types::{Result, StatehouseError};

/// Repository over the `countries` collection
#[derive(Clone)]
pub struct CountryStore {
    collection: MongoCollection<CountryDoc>,
}

impl CountryStore {
    /// Open the collection and apply its indexes
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        let collection = mongo.collection::<CountryDoc>(COUNTRY_COLLECTION).await?;
        Ok(Self { collection })
    }

    /// Look up a country by Discord user id
    pub async fn find_by_user(&self, user_id: &str) -> Result<Option<CountryDoc>> {
        self.collection.find_one(doc! { "userId": user_id }).await
    }

    /// Insert a new country with default policy values.
    ///
    /// Callers must have confirmed absence; the unique index on userId
    /// turns a lost race into a duplicate-key error.
    pub async fn create_default(&self, user_id: &str, username: &str) -> Result<CountryDoc> {
        let country = CountryDoc::new(user_id.to_string(), username.to_string());
        self.collection.insert_one(country.clone()).await?;
        Ok(country)
    }

    /// Atomic find-or-create for first login.
    ///
    /// Upserts with `$setOnInsert` so concurrent first logins for the
    /// same identity resolve to a single document. An existing country
    /// is returned unchanged, no field is reset to defaults.
    pub async fn find_or_create(&self, user_id: &str, username: &str) -> Result<CountryDoc> {
        let defaults = CountryDoc::new(user_id.to_string(), username.to_string());
        let mut on_insert = bson::to_document(&defaults)
            .map_err(|e| StatehouseError::Database(format!("Failed to encode country: {}", e)))?;
        // userId is supplied by the filter on insert
        on_insert.remove("userId");

        let result = self
            .collection
            .find_one_and_update(
                doc! { "userId": user_id },
                doc! { "$setOnInsert": on_insert },
                true,
            )
            .await;

        match result {
            Ok(Some(country)) => Ok(country),
            Ok(None) => {
                // Upsert without a returned document should not happen with
                // ReturnDocument::After; re-read defensively
                self.find_by_user(user_id).await?.ok_or_else(|| {
                    StatehouseError::Database("Upserted country not found".into())
                })
            }
            Err(e) => {
                // Two simultaneous upserts can both attempt the insert; the
                // loser hits the unique index and re-reads the winner
                let message = e.to_string();
                if message.contains("E11000") || message.contains("duplicate key") {
                    warn!("Concurrent first login for {}, re-reading winner", user_id);
                    self.find_by_user(user_id).await?.ok_or(e)
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Set one policy field and return the refreshed country.
    ///
    /// Returns `None` when no country exists for the user.
    pub async fn update_field(
        &self,
        user_id: &str,
        field: PolicyField,
        value: f64,
    ) -> Result<Option<CountryDoc>> {
        self.collection
            .find_one_and_update(
                doc! { "userId": user_id },
                doc! {
                    "$set": {
                        field.as_key(): value,
                        "metadata.updated_at": DateTime::now(),
                    }
                },
                false,
            )
            .await
    }
}
