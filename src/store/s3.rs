use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use chrono::Utc;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::io::Write;
use tracing::info;

use super::{TableStore, WriteMode};
use crate::output::to_csv_bytes;

/// CSV objects in an S3 bucket.
///
/// `Replace` overwrites `<prefix>/<table>.csv`; `Append` adds a new part
/// object under `<prefix>/<table>/date=<YYYY-MM-DD>/`.
pub struct S3TableStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
    gzip: bool,
}

impl S3TableStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: &str, prefix: &str, gzip: bool) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            prefix: prefix.trim_matches('/').to_string(),
            gzip,
        }
    }

    /// Uses the ambient AWS configuration (env vars, instance profile, etc.).
    pub async fn from_env(bucket: &str, prefix: &str, gzip: bool) -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(aws_sdk_s3::Client::new(&config), bucket, prefix, gzip)
    }

    fn object_key(&self, table: &str, mode: WriteMode) -> String {
        let extension = if self.gzip { "csv.gz" } else { "csv" };
        let name = match mode {
            WriteMode::Replace => format!("{table}.{extension}"),
            WriteMode::Append => {
                let now = Utc::now();
                format!(
                    "{table}/date={}/part-{}.{extension}",
                    now.format("%Y-%m-%d"),
                    now.timestamp_millis()
                )
            }
        };
        if self.prefix.is_empty() {
            name
        } else {
            format!("{}/{}", self.prefix, name)
        }
    }
}

fn gzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

#[async_trait]
impl TableStore for S3TableStore {
    #[tracing::instrument(skip(self, rows), fields(bucket = %self.bucket, row_count = rows.len()))]
    async fn write_table<T: Serialize + Sync>(
        &self,
        table: &str,
        rows: &[T],
        mode: WriteMode,
    ) -> Result<usize> {
        let csv = to_csv_bytes(rows)?;
        let body = if self.gzip { gzip(&csv)? } else { csv };
        let key = self.object_key(table, mode);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type("text/csv")
            .body(ByteStream::from(body))
            .send()
            .await?;

        info!(key = %key, written = rows.len(), "Table uploaded to S3");
        Ok(rows.len())
    }
}
