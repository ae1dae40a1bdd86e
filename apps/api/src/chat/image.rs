//! Image intake: format sniffing, storage hand-off and the amount sign policy.

use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::chat::error::ChatError;
use crate::extraction::types::InsertCandidates;

const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Detects the format from magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(PNG_MAGIC) {
            Some(ImageFormat::Png)
        } else if bytes.starts_with(JPEG_MAGIC) {
            Some(ImageFormat::Jpeg)
        } else {
            None
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }
}

/// An upload whose format has been verified.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub bytes: Bytes,
    pub format: ImageFormat,
}

impl NormalizedImage {
    pub fn from_bytes(bytes: Bytes) -> Result<Self, ChatError> {
        match ImageFormat::sniff(&bytes) {
            Some(format) => Ok(Self { bytes, format }),
            None if bytes.is_empty() => {
                Err(ChatError::UnsupportedFormat("empty upload".to_string()))
            }
            None => Err(ChatError::UnsupportedFormat(
                "only JPEG and PNG images are accepted".to_string(),
            )),
        }
    }
}

/// Where user-submitted images are kept. Returns the URL recorded in the ledger.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn store(&self, user_id: i64, image: &NormalizedImage) -> Result<String>;
}

pub struct S3ImageStore {
    client: S3Client,
    bucket: String,
    public_url: String,
}

impl S3ImageStore {
    pub fn new(client: S3Client, bucket: String, public_url: String) -> Self {
        Self {
            client,
            bucket,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn store(&self, user_id: i64, image: &NormalizedImage) -> Result<String> {
        let key = format!(
            "receipts/{}/{}.{}",
            user_id,
            Uuid::new_v4(),
            image.format.extension()
        );

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(image.bytes.clone()))
            .content_type(image.format.mime_type())
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("S3 upload failed: {e}"))?;

        info!("Uploaded receipt image to s3://{}/{}", self.bucket, key);
        Ok(format!("{}/{}", self.public_url, key))
    }
}

/// Sign rule applied to amounts read from images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageAmountPolicy {
    /// Receipts and transfer slips are treated as spending: every amount becomes non-positive.
    #[default]
    ForceExpense,
    AsExtracted,
}

impl ImageAmountPolicy {
    pub fn apply(self, mut candidates: InsertCandidates) -> InsertCandidates {
        if self == ImageAmountPolicy::ForceExpense {
            for candidate in &mut candidates.expenses {
                candidate.amount = candidate.amount.map(|a| if a > 0 { -a } else { a });
            }
        }
        candidates
    }
}
