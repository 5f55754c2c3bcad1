//! Upload pipeline: validate, encode, and submit photos in batches.
//!
//! Each selected file goes through the same steps:
//!
//! ```text
//! validate (type, size) → cache lookup → read + encode → Photo → submit
//! ```
//!
//! Encoding runs on the blocking thread pool. The full-size representation is
//! only re-encoded when the file is larger than the compression threshold;
//! smaller files are embedded as-is. A thumbnail is always produced.
//!
//! [`Uploader::upload_many`] processes files in fixed-size batches. Every file
//! in a batch runs concurrently and the whole batch settles before the next one
//! starts. A file that fails is recorded and skipped; the batch only fails as a
//! whole when nothing succeeded.
//!
//! Progress is reported through an optional `std::sync::mpsc` channel of
//! [`UploadEvent`]s so a CLI can print lines as files complete.

use crate::cache::{CachedEncoding, EncodeCache, cache_key};
use crate::config::AppConfig;
use crate::data_uri;
use crate::imaging::{
    BackendError, CodecConfig, ImageBackend, MAX_FILE_SIZE, ValidationError, create_full_size,
    create_thumbnail, validate,
};
use crate::store::PhotoStore;
use crate::types::Photo;
use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::UNIX_EPOCH;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// Files uploaded concurrently per batch.
pub const DEFAULT_BATCH_SIZE: usize = 3;

/// Full-size images larger than this are re-encoded; smaller ones pass through.
pub const DEFAULT_COMPRESS_THRESHOLD: u64 = 2 * 1024 * 1024;

/// Failure reported by a [`PhotoSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitError {
    /// HTTP status when the sink is remote.
    pub status: Option<u16>,
    pub message: String,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for SubmitError {}

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("{filename}: {source}")]
    Invalid {
        filename: String,
        #[source]
        source: ValidationError,
    },
    #[error("{filename}: failed to read file: {source}")]
    Read {
        filename: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{filename}: {source}")]
    Encode {
        filename: String,
        #[source]
        source: BackendError,
    },
    #[error("{filename}: encoding task failed: {message}")]
    Task { filename: String, message: String },
    #[error("{filename}: upload failed: {source}")]
    Submit {
        filename: String,
        #[source]
        source: SubmitError,
    },
}

impl UploadError {
    pub fn filename(&self) -> &str {
        match self {
            UploadError::Invalid { filename, .. }
            | UploadError::Read { filename, .. }
            | UploadError::Encode { filename, .. }
            | UploadError::Task { filename, .. }
            | UploadError::Submit { filename, .. } => filename,
        }
    }

    /// HTTP status of a rejected submission, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            UploadError::Submit { source, .. } => source.status,
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("All {} uploads failed: {}", .0.len(), join_failures(.0))]
    AllFailed(Vec<UploadError>),
}

fn join_failures(failures: &[UploadError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Where finished photo records are delivered.
#[async_trait]
pub trait PhotoSink: Send + Sync {
    async fn submit(&self, photo: &Photo) -> Result<(), SubmitError>;
}

#[async_trait]
impl PhotoSink for PhotoStore {
    async fn submit(&self, photo: &Photo) -> Result<(), SubmitError> {
        self.insert(photo.clone())
            .await
            .map(|_| ())
            .map_err(|e| SubmitError {
                status: None,
                message: e.to_string(),
            })
    }
}

/// Where a source file's bytes come from.
#[derive(Debug, Clone)]
pub enum FileContent {
    Path(PathBuf),
    Memory(Arc<[u8]>),
}

/// A file selected for upload, described by what is visible before reading it.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    /// Last-modified time in milliseconds since the epoch.
    pub modified_ms: i64,
    pub content: FileContent,
}

impl SourceFile {
    /// Describe a file on disk. The MIME type is guessed from the extension.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let meta = tokio::fs::metadata(path).await?;
        let modified_ms = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self {
            name,
            mime_type,
            size: meta.len(),
            modified_ms,
            content: FileContent::Path(path.to_path_buf()),
        })
    }

    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
        modified_ms: i64,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size: bytes.len() as u64,
            modified_ms,
            content: FileContent::Memory(bytes.into()),
        }
    }

    async fn read(&self) -> std::io::Result<Vec<u8>> {
        match &self.content {
            FileContent::Path(path) => tokio::fs::read(path).await,
            FileContent::Memory(bytes) => Ok(bytes.to_vec()),
        }
    }
}

/// Progress notifications from the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    BatchStarted {
        /// 1-based batch number.
        batch: usize,
        batches: usize,
        files: usize,
    },
    Uploaded {
        filename: String,
        id: String,
        cached: bool,
    },
    Failed {
        filename: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    pub batch_size: usize,
    pub max_file_size: u64,
    pub compress_threshold: u64,
    pub codec: CodecConfig,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_file_size: MAX_FILE_SIZE,
            compress_threshold: DEFAULT_COMPRESS_THRESHOLD,
            codec: CodecConfig::default(),
        }
    }
}

impl UploadConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            batch_size: config.upload.batch_size.max(1),
            max_file_size: config.upload.max_file_size,
            compress_threshold: config.upload.compress_threshold,
            codec: config.images.codec(),
        }
    }
}

/// Result of [`Uploader::upload_many`] when at least one file succeeded.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Successful uploads, in input order.
    pub photos: Vec<Photo>,
    pub failures: Vec<UploadError>,
    pub attempted: usize,
}

pub struct Uploader<B: ImageBackend> {
    backend: Arc<B>,
    sink: Arc<dyn PhotoSink>,
    cache: Arc<EncodeCache>,
    config: UploadConfig,
    events: Option<Sender<UploadEvent>>,
}

impl<B: ImageBackend + 'static> Uploader<B> {
    pub fn new(backend: Arc<B>, sink: Arc<dyn PhotoSink>, config: UploadConfig) -> Self {
        Self {
            backend,
            sink,
            cache: Arc::new(EncodeCache::unbounded()),
            config,
            events: None,
        }
    }

    /// Share an encode cache between uploaders.
    pub fn with_cache(mut self, cache: Arc<EncodeCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_events(mut self, events: Sender<UploadEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn cache(&self) -> &EncodeCache {
        &self.cache
    }

    fn emit(&self, event: UploadEvent) {
        if let Some(tx) = &self.events {
            // A dropped receiver only means nobody is watching.
            let _ = tx.send(event);
        }
    }

    /// Validate, encode and submit one file.
    pub async fn upload_one(
        &self,
        file: &SourceFile,
        description: &str,
        uploaded_by: &str,
    ) -> Result<Photo, UploadError> {
        match self.try_upload_one(file, description, uploaded_by).await {
            Ok((photo, cached)) => {
                self.emit(UploadEvent::Uploaded {
                    filename: file.name.clone(),
                    id: photo.id.clone(),
                    cached,
                });
                Ok(photo)
            }
            Err(e) => {
                warn!(file = %file.name, error = %e, "Upload failed");
                self.emit(UploadEvent::Failed {
                    filename: file.name.clone(),
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn try_upload_one(
        &self,
        file: &SourceFile,
        description: &str,
        uploaded_by: &str,
    ) -> Result<(Photo, bool), UploadError> {
        validate(&file.mime_type, file.size, self.config.max_file_size).map_err(|source| {
            UploadError::Invalid {
                filename: file.name.clone(),
                source,
            }
        })?;

        let key = cache_key(&file.name, file.size, file.modified_ms);
        let (encoding, cached) = match self.cache.get(&key) {
            Some(hit) => {
                debug!(file = %file.name, "Reusing cached encoding");
                (hit, true)
            }
            None => {
                let encoding = self.encode(file).await?;
                (self.cache.insert(key, encoding), false)
            }
        };

        let photo = Photo {
            id: Uuid::new_v4().to_string(),
            filename: file.name.clone(),
            description: description.to_string(),
            uploaded_at: Utc::now(),
            uploaded_by: uploaded_by.to_string(),
            url: encoding.url.clone(),
            thumbnail_url: encoding.thumbnail_url.clone(),
        };

        self.sink
            .submit(&photo)
            .await
            .map_err(|source| UploadError::Submit {
                filename: file.name.clone(),
                source,
            })?;
        Ok((photo, cached))
    }

    async fn encode(&self, file: &SourceFile) -> Result<CachedEncoding, UploadError> {
        let bytes = file.read().await.map_err(|source| UploadError::Read {
            filename: file.name.clone(),
            source,
        })?;

        let backend = Arc::clone(&self.backend);
        let codec = self.config.codec;
        let threshold = self.config.compress_threshold;
        let mime_type = file.mime_type.clone();

        let encoded = tokio::task::spawn_blocking(move || {
            let url = if bytes.len() as u64 > threshold {
                let full = create_full_size(&*backend, &bytes, &codec)?;
                data_uri::encode(&full.mime_type, &full.bytes)
            } else {
                data_uri::encode(&mime_type, &bytes)
            };
            let thumb = create_thumbnail(&*backend, &bytes, &codec)?;
            Ok::<_, BackendError>(CachedEncoding {
                url,
                thumbnail_url: data_uri::encode(&thumb.mime_type, &thumb.bytes),
            })
        })
        .await
        .map_err(|e| UploadError::Task {
            filename: file.name.clone(),
            message: e.to_string(),
        })?;

        encoded.map_err(|source| UploadError::Encode {
            filename: file.name.clone(),
            source,
        })
    }

    /// Upload `files` in batches, pairing each with the description at the
    /// same index (empty when missing).
    pub async fn upload_many(
        &self,
        files: &[SourceFile],
        descriptions: &[String],
        uploaded_by: &str,
    ) -> Result<BatchOutcome, BatchError> {
        let batch_size = self.config.batch_size.max(1);
        let batches = files.len().div_ceil(batch_size);
        let mut photos = Vec::new();
        let mut failures = Vec::new();

        for (batch_index, chunk) in files.chunks(batch_size).enumerate() {
            self.emit(UploadEvent::BatchStarted {
                batch: batch_index + 1,
                batches,
                files: chunk.len(),
            });
            let offset = batch_index * batch_size;
            let uploads = chunk.iter().enumerate().map(|(i, file)| {
                let description = descriptions
                    .get(offset + i)
                    .map(String::as_str)
                    .unwrap_or("");
                self.upload_one(file, description, uploaded_by)
            });

            for result in join_all(uploads).await {
                match result {
                    Ok(photo) => photos.push(photo),
                    Err(e) => failures.push(e),
                }
            }
        }

        if photos.is_empty() && !failures.is_empty() {
            return Err(BatchError::AllFailed(failures));
        }
        Ok(BatchOutcome {
            photos,
            failures,
            attempted: files.len(),
        })
    }
}
