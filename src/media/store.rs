//! Photo evidence store.
//!
//! One store per (form instance, location). Photos are appended in batches,
//! deleted one at a time, and the whole collection is persisted as a JSON
//! array under `<prefix>_<projectId>_<location>` after every change.
//!
//! Encoding is synchronous: a batch is read and encoded file by file, in
//! input order, and appended and persisted as one unit when `add_photos`
//! returns. No two batches can interleave on one store.

use std::sync::Arc;

use base64::engine::general_purpose;
use base64::Engine as _;
use chrono::SecondsFormat;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::config::FormConfig;
use crate::logging::structured::LogContext;
use crate::runtime::notifier::Notice;
use crate::runtime::services::Services;
use crate::storage::keys::photo_blob_key;
use crate::storage::models::{PhotoRecord, RequirementStatus};

pub const PHOTO_STORAGE_FULL_NOTICE: &str =
    "Storage limit reached. Please delete some photos or contact support.";

/// A file picked or captured by the user, before ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl PhotoFile {
    pub fn new(name: &str, mime_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            bytes,
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// `data:<mime>;base64,<payload>`
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

struct MediaInner {
    location_id: String,
    key: String,
    max_photos: usize,
    services: Services,
    log_ctx: LogContext,
    photos: Mutex<Vec<PhotoRecord>>,
}

/// Photos for one location of one form instance. Cloning shares the store.
#[derive(Clone)]
pub struct MediaStore {
    inner: Arc<MediaInner>,
}

impl std::fmt::Debug for MediaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStore")
            .field("key", &self.inner.key)
            .field("count", &self.get_count())
            .field("max", &self.inner.max_photos)
            .finish()
    }
}

impl MediaStore {
    pub fn open(project_id: &str, location_id: &str, config: &FormConfig, services: Services) -> Self {
        let key = photo_blob_key(&config.photo_key_prefix, project_id, location_id);
        let log_ctx = LogContext::new(project_id).with_location(location_id);
        let photos = load_photos(&services, &key, &log_ctx);

        log::debug!("{} MEDIA_STORE_OPENED key={} photos={}", log_ctx, key, photos.len());

        Self {
            inner: Arc::new(MediaInner {
                location_id: location_id.to_string(),
                key,
                max_photos: config.max_photos_per_location,
                services,
                log_ctx,
                photos: Mutex::new(photos),
            }),
        }
    }

    pub fn location_id(&self) -> &str {
        &self.inner.location_id
    }

    pub fn storage_key(&self) -> &str {
        &self.inner.key
    }

    pub fn max_photos(&self) -> usize {
        self.inner.max_photos
    }

    /// Ingest a batch of files and return the records appended.
    ///
    /// The batch is cut to the remaining capacity first; non-image files in
    /// the kept slice are skipped. A store already at capacity rejects the
    /// whole call with a user notice.
    pub fn add_photos(&self, files: Vec<PhotoFile>) -> Vec<PhotoRecord> {
        if files.is_empty() {
            return Vec::new();
        }

        let ctx = &self.inner.log_ctx;
        let remaining = self.inner.max_photos.saturating_sub(self.get_count());
        if remaining == 0 {
            log::warn!(
                "{} PHOTO_CAPACITY_REACHED max={} offered={}",
                ctx,
                self.inner.max_photos,
                files.len()
            );
            self.inner.services.notifier.notify(Notice::warning(format!(
                "Maximum {} photos allowed. Please delete some photos first.",
                self.inner.max_photos
            )));
            return Vec::new();
        }

        let offered = files.len();
        let mut added = Vec::new();
        for file in files.into_iter().take(remaining) {
            if !file.is_image() {
                log::debug!("{} PHOTO_SKIPPED filename={} mime={}", ctx, file.name, file.mime_type);
                continue;
            }
            added.push(self.encode(&file));
        }

        if offered > remaining {
            log::info!("{} PHOTO_BATCH_TRUNCATED offered={} kept={}", ctx, offered, remaining);
        }

        if added.is_empty() {
            return added;
        }

        self.inner.photos.lock().extend(added.iter().cloned());
        log::info!("{} PHOTOS_ADDED added={} total={}", ctx, added.len(), self.get_count());
        self.persist();
        added
    }

    /// Remove one photo by id.
    pub fn delete_photo(&self, photo_id: &str) -> bool {
        let removed = {
            let mut photos = self.inner.photos.lock();
            match photos.iter().position(|p| p.id == photo_id) {
                Some(index) => {
                    photos.remove(index);
                    true
                }
                None => false,
            }
        };

        if removed {
            log::info!("{} PHOTO_DELETED id={}", self.inner.log_ctx, photo_id);
            self.persist();
        } else {
            log::debug!("{} PHOTO_DELETE_MISS id={}", self.inner.log_ctx, photo_id);
        }
        removed
    }

    pub fn get_all(&self) -> Vec<PhotoRecord> {
        self.inner.photos.lock().clone()
    }

    pub fn get_count(&self) -> usize {
        self.inner.photos.lock().len()
    }

    pub fn clear(&self) {
        self.inner.photos.lock().clear();
        log::info!("{} PHOTOS_CLEARED", self.inner.log_ctx);
        self.persist();
    }

    pub fn check_requirements(&self, required: usize) -> RequirementStatus {
        requirement_status(self.get_count(), required)
    }

    fn encode(&self, file: &PhotoFile) -> PhotoRecord {
        let clock = &self.inner.services.clock;
        let suffix = Uuid::new_v4().simple().to_string();
        PhotoRecord {
            id: format!("photo_{}_{}", clock.now_millis(), &suffix[..9]),
            data: file.to_data_url(),
            filename: file.name.clone(),
            timestamp: clock.now().to_rfc3339_opts(SecondsFormat::Millis, true),
            size: file.size(),
        }
    }

    /// Write the collection. A rejected write keeps memory as-is and warns
    /// the user; persisted state stays stale until a later write succeeds.
    fn persist(&self) -> bool {
        let json = {
            let photos = self.inner.photos.lock();
            match serde_json::to_string(&*photos) {
                Ok(json) => json,
                Err(e) => {
                    log::warn!("{} PHOTO_SERIALIZE_FAILED error={}", self.inner.log_ctx, e);
                    return false;
                }
            }
        };

        match self.inner.services.storage.set_item(&self.inner.key, &json) {
            Ok(()) => {
                log::debug!(
                    "{} PHOTOS_PERSISTED key={} bytes={}",
                    self.inner.log_ctx,
                    self.inner.key,
                    json.len()
                );
                true
            }
            Err(e) => {
                log::warn!("{} PHOTOS_PERSIST_FAILED error={}", self.inner.log_ctx, e);
                if e.is_capacity() {
                    self.inner
                        .services
                        .notifier
                        .notify(Notice::warning(PHOTO_STORAGE_FULL_NOTICE));
                }
                false
            }
        }
    }
}

/// `met` iff `count >= required`; `remaining = max(0, required - count)`.
pub fn requirement_status(count: usize, required: usize) -> RequirementStatus {
    RequirementStatus {
        met: count >= required,
        count,
        required,
        remaining: required.saturating_sub(count),
    }
}

fn load_photos(services: &Services, key: &str, ctx: &LogContext) -> Vec<PhotoRecord> {
    let Some(raw) = services.storage.get_item(key) else {
        return Vec::new();
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        log::warn!("{} PERSISTED_STATE_MALFORMED key={} error={}", ctx, key, e);
        Vec::new()
    })
}
