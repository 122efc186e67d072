//! S3-backed object store

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::{
    presigning::PresigningConfig,
    primitives::ByteStream,
    types::{Delete, ObjectIdentifier},
    Client as S3Client,
};
use bytes::Bytes;
use chrono::DateTime;
use tracing::{debug, instrument, warn};

use super::{newest_first, ObjectEntry, ObjectStore, StoreError, StoreResult};

/// Object store backed by an S3 bucket
pub struct S3ObjectStore {
    s3_client: Arc<S3Client>,
    bucket_name: String,
}

impl S3ObjectStore {
    /// Creates a new S3 object store
    ///
    /// # Arguments
    ///
    /// * `s3_client` - Pre-configured S3 client
    /// * `bucket_name` - S3 bucket holding the images
    #[must_use]
    pub const fn new(s3_client: Arc<S3Client>, bucket_name: String) -> Self {
        Self {
            s3_client,
            bucket_name,
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    /// S3 lists keys lexicographically, so every page under the prefix is read before
    /// sorting by `last_modified`.
    ///
    /// `last_modified` only has second precision. Objects uploaded within the same second
    /// are ordered by key, and keys are random, so their relative order does not follow
    /// upload order.
    #[instrument(skip(self))]
    async fn list(&self, prefix: &str, limit: usize) -> StoreResult<Vec<ObjectEntry>> {
        let mut pages = self
            .s3_client
            .list_objects_v2()
            .bucket(&self.bucket_name)
            .prefix(prefix)
            .delimiter("/")
            .into_paginator()
            .send();

        let mut entries = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page?;
            for object in page.contents() {
                let (Some(key), Some(last_modified)) = (object.key(), object.last_modified())
                else {
                    continue;
                };

                let Some(created_at) =
                    DateTime::from_timestamp(last_modified.secs(), last_modified.subsec_nanos())
                else {
                    warn!("Skipping {key}: unrepresentable last_modified");
                    continue;
                };

                entries.push(ObjectEntry {
                    path: key.to_string(),
                    created_at,
                });
            }
        }

        debug!("Listed {} objects under {prefix}", entries.len());

        Ok(newest_first(entries, limit))
    }

    #[instrument(skip(self))]
    async fn create_signed_url(&self, path: &str, ttl: Duration) -> StoreResult<String> {
        let presigned_config = PresigningConfig::expires_in(ttl).map_err(|e| {
            StoreError::ConfigError(format!("Failed to create presigning config: {e}"))
        })?;

        let presigned = self
            .s3_client
            .get_object()
            .bucket(&self.bucket_name)
            .key(path)
            .presigned(presigned_config)
            .await
            .map_err(|e| StoreError::S3Error(format!("Failed to generate presigned URL: {e}")))?;

        Ok(presigned.uri().to_string())
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(&self, path: &str, bytes: Bytes, content_type: &str) -> StoreResult<()> {
        self.s3_client
            .put_object()
            .bucket(&self.bucket_name)
            .key(path)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, paths: &[String]) -> StoreResult<()> {
        let objects = paths
            .iter()
            .map(|path| ObjectIdentifier::builder().key(path).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::ConfigError(format!("Invalid object identifier: {e}")))?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|e| StoreError::ConfigError(format!("Invalid delete request: {e}")))?;

        let output = self
            .s3_client
            .delete_objects()
            .bucket(&self.bucket_name)
            .delete(delete)
            .send()
            .await?;

        if let Some(failure) = output.errors().first() {
            return Err(StoreError::S3Error(format!(
                "Failed to delete {}: {}",
                failure.key().unwrap_or_default(),
                failure.message().unwrap_or_default()
            )));
        }

        Ok(())
    }
}
