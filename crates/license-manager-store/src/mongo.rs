//! MongoDB implementation of the RemoteStore trait.
//!
//! Enabled by the `mongo` feature. A client is built per call from the
//! target handed in, so a reloaded target takes effect immediately.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};

use license_manager_core::{LicenseRecord, RemoteTarget, DEFAULT_SOURCE};

use crate::error::{RemoteError, RemoteResult};
use crate::traits::RemoteStore;

/// How long the driver waits to find a usable server.
pub const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// MongoDB-backed remote replica.
pub struct MongoRemoteStore {
    /// Stamped on every document as `license_email`.
    license_email: String,
}

impl MongoRemoteStore {
    pub fn new(license_email: impl Into<String>) -> Self {
        Self {
            license_email: license_email.into(),
        }
    }

    async fn collection(&self, target: &RemoteTarget) -> RemoteResult<Collection<Document>> {
        if !target.is_configured() {
            return Err(RemoteError::NotConfigured);
        }

        let mut options = ClientOptions::parse(&target.uri).await.map_err(backend)?;
        options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);
        let client = Client::with_options(options).map_err(backend)?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(backend)?;

        Ok(client
            .database(&target.database)
            .collection::<Document>(&target.collection))
    }

    fn to_document(&self, record: &LicenseRecord) -> Document {
        let now = Utc::now();
        let generated_at = record.generated_at.unwrap_or(now);

        let mut document = doc! {
            "license_key": &record.license_key,
            "machine_id": &record.machine_id,
            "license_email": &self.license_email,
            "customer_name": &record.customer_name,
            "contact_email": &record.contact_email,
            "note": &record.note,
            "generated_by": &record.generated_by,
            "generated_at": to_bson_time(generated_at),
            "status": record.status.as_str(),
            "source": &record.source,
        };
        if let Some(valid_until) = record.valid_until {
            document.insert("valid_until", to_bson_time(valid_until));
        }
        document
    }
}

fn backend(err: mongodb::error::Error) -> RemoteError {
    RemoteError::Backend(err.to_string())
}

fn to_bson_time(at: DateTime<Utc>) -> mongodb::bson::DateTime {
    mongodb::bson::DateTime::from_millis(at.timestamp_millis())
}

fn get_time(document: &Document, key: &str) -> Option<DateTime<Utc>> {
    match document.get(key)? {
        Bson::DateTime(at) => Utc.timestamp_millis_opt(at.timestamp_millis()).single(),
        Bson::String(raw) => DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|at| at.with_timezone(&Utc)),
        _ => None,
    }
}

fn get_string(document: &Document, key: &str) -> String {
    document.get_str(key).unwrap_or_default().to_string()
}

/// Convert a stored document, tolerating missing fields.
///
/// A missing `valid_until` stays `None`; the reconciler derives it from the
/// generation time. Remote documents carry no update stamp, only the
/// insert-time `created_at`, so `updated_at` is left unset.
fn from_document(document: &Document) -> LicenseRecord {
    let source = document
        .get_str("source")
        .map(str::to_string)
        .unwrap_or_else(|_| DEFAULT_SOURCE.to_string());

    LicenseRecord {
        machine_id: get_string(document, "machine_id"),
        license_key: get_string(document, "license_key"),
        customer_name: get_string(document, "customer_name"),
        contact_email: get_string(document, "contact_email"),
        note: get_string(document, "note"),
        generated_by: get_string(document, "generated_by"),
        status: document
            .get_str("status")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default(),
        source,
        generated_at: get_time(document, "generated_at"),
        valid_until: get_time(document, "valid_until"),
        updated_at: None,
    }
}

#[async_trait]
impl RemoteStore for MongoRemoteStore {
    async fn fetch_recent(&self, target: &RemoteTarget, limit: usize) -> RemoteResult<Vec<LicenseRecord>> {
        let collection = self.collection(target).await?;
        let limit = i64::try_from(limit.max(1)).unwrap_or(i64::MAX);

        let mut cursor = collection
            .find(doc! {})
            .sort(doc! { "generated_at": -1 })
            .limit(limit)
            .projection(doc! { "_id": 0 })
            .await
            .map_err(backend)?;

        let mut records = Vec::new();
        while cursor.advance().await.map_err(backend)? {
            let document = cursor.deserialize_current().map_err(backend)?;
            records.push(from_document(&document));
        }

        tracing::debug!(count = records.len(), "fetched remote licenses");
        Ok(records)
    }

    async fn upsert_by_machine(&self, target: &RemoteTarget, record: &LicenseRecord) -> RemoteResult<()> {
        let collection = self.collection(target).await?;
        let document = self.to_document(record);

        collection
            .update_one(
                doc! { "machine_id": &record.machine_id },
                doc! {
                    "$set": document,
                    "$setOnInsert": { "created_at": to_bson_time(Utc::now()) },
                },
            )
            .upsert(true)
            .await
            .map_err(backend)?;

        let removed = collection
            .delete_many(doc! {
                "machine_id": &record.machine_id,
                "license_key": { "$ne": &record.license_key },
            })
            .await
            .map_err(backend)?;

        tracing::debug!(
            machine_id = %record.machine_id,
            stale_removed = removed.deleted_count,
            "upserted remote license"
        );
        Ok(())
    }
}
