//! Debounced write-through field store.
//!
//! One store per form instance. Every `set` updates memory immediately and
//! (re)schedules a single flush; only the most recently scheduled flush runs,
//! so a burst of edits produces one write carrying the latest state. The
//! whole instance persists as one JSON object under
//! `<prefix>_<projectId>`.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::config::FormConfig;
use crate::error::{FormError, Result};
use crate::logging::structured::LogContext;
use crate::runtime::notifier::Notice;
use crate::runtime::scheduler::TimerHandle;
use crate::runtime::services::Services;
use crate::storage::keys::{field_blob_key, table_row_key};
use crate::storage::models::SaveStatus;

pub const STORAGE_FULL_NOTICE: &str =
    "Storage limit reached. Your latest changes are kept on screen but were not saved.";

#[derive(Debug, Default)]
struct StoreState {
    data: Map<String, Value>,
    pending: Option<TimerHandle>,
    last_saved: Option<DateTime<Utc>>,
    flush_count: u64,
}

struct StoreInner {
    key: String,
    debounce: Duration,
    services: Services,
    log_ctx: LogContext,
    state: Mutex<StoreState>,
}

/// Field values for one form instance. Cloning shares the store.
#[derive(Clone)]
pub struct FieldStore {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for FieldStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("FieldStore")
            .field("key", &self.inner.key)
            .field("fields", &state.data.len())
            .field("pending", &state.pending.is_some())
            .finish()
    }
}

impl FieldStore {
    /// Open the store for `project_id`, hydrating from any persisted blob.
    pub fn open(project_id: &str, config: &FormConfig, services: Services) -> Self {
        let key = field_blob_key(&config.field_key_prefix, project_id);
        let log_ctx = LogContext::new(project_id);
        let data = load_blob(&*services.storage, &key, &log_ctx);

        log::debug!("{} FIELD_STORE_OPENED key={} fields={}", log_ctx, key, data.len());

        Self {
            inner: Arc::new(StoreInner {
                key,
                debounce: config.debounce_delay,
                services,
                log_ctx,
                state: Mutex::new(StoreState {
                    data,
                    ..StoreState::default()
                }),
            }),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.inner.log_ctx.project_id
    }

    pub fn storage_key(&self) -> &str {
        &self.inner.key
    }

    pub(crate) fn services(&self) -> &Services {
        &self.inner.services
    }

    pub(crate) fn log_context(&self) -> &LogContext {
        &self.inner.log_ctx
    }

    /// Stored value, or an empty string when unset.
    pub fn get(&self, field_id: &str) -> Value {
        match self.inner.state.lock().data.get(field_id) {
            Some(Value::Null) | None => Value::String(String::new()),
            Some(value) => value.clone(),
        }
    }

    /// Stored value as text; objects and arrays come back as JSON.
    pub fn get_str(&self, field_id: &str) -> String {
        match self.get(field_id) {
            Value::String(s) => s,
            other => other.to_string(),
        }
    }

    pub fn contains(&self, field_id: &str) -> bool {
        self.inner.state.lock().data.contains_key(field_id)
    }

    pub fn set(&self, field_id: &str, value: impl Into<Value>) {
        let value = value.into();
        log::debug!("{} FIELD_SET field_id={} value={}", self.inner.log_ctx, field_id, value);
        self.inner
            .state
            .lock()
            .data
            .insert(field_id.to_string(), value);
        self.schedule_flush();
    }

    /// Batched update with a single flush scheduled.
    pub fn set_multiple<I, K, V>(&self, fields: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let count = {
            let mut state = self.inner.state.lock();
            let mut count = 0;
            for (k, v) in fields {
                state.data.insert(k.into(), v.into());
                count += 1;
            }
            count
        };
        log::debug!("{} FIELD_SET_MULTIPLE count={}", self.inner.log_ctx, count);
        self.schedule_flush();
    }

    pub fn get_all(&self) -> Map<String, Value> {
        self.inner.state.lock().data.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().data.is_empty()
    }

    /// Drop every value and the persisted blob.
    pub fn clear(&self) {
        let pending = {
            let mut state = self.inner.state.lock();
            state.data.clear();
            state.pending.take()
        };
        if let Some(handle) = pending {
            self.inner.services.scheduler.cancel(handle);
        }
        self.inner.services.storage.remove_item(&self.inner.key);
        log::info!("{} FIELD_STORE_CLEARED key={}", self.inner.log_ctx, self.inner.key);
    }

    /// Persist now, cancelling any pending debounced flush.
    pub fn flush(&self) -> Result<()> {
        let pending = self.inner.state.lock().pending.take();
        if let Some(handle) = pending {
            self.inner.services.scheduler.cancel(handle);
        }
        self.inner.save()
    }

    pub fn has_pending_flush(&self) -> bool {
        self.inner.state.lock().pending.is_some()
    }

    /// Successful persisted writes since the store was opened.
    pub fn flush_count(&self) -> u64 {
        self.inner.state.lock().flush_count
    }

    pub fn save_table_row(&self, table_id: &str, row: usize, bundle: Value) {
        self.set(&table_row_key(table_id, row), bundle);
    }

    /// Saved row bundle, or an empty object.
    pub fn load_table_row(&self, table_id: &str, row: usize) -> Value {
        match self.inner.state.lock().data.get(&table_row_key(table_id, row)) {
            Some(value @ Value::Object(_)) => value.clone(),
            _ => Value::Object(Map::new()),
        }
    }

    pub fn export(&self) -> Result<String> {
        let state = self.inner.state.lock();
        let json = serde_json::to_string_pretty(&state.data)?;
        log::info!(
            "{} FIELD_STORE_EXPORTED fields={} bytes={}",
            self.inner.log_ctx,
            state.data.len(),
            json.len()
        );
        Ok(json)
    }

    /// Merge a previously exported object into the store and persist it.
    ///
    /// A payload that is not a JSON object leaves the store untouched. Once
    /// parsed, the merge stands: a full storage backend is reported through
    /// the storage-full notice, like a debounced flush, and the import still
    /// returns `Ok`.
    pub fn import(&self, json: &str) -> Result<()> {
        let imported = match serde_json::from_str::<Value>(json) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                log::warn!(
                    "{} FIELD_IMPORT_FAILED reason=not_an_object kind={}",
                    self.inner.log_ctx,
                    json_kind(&other)
                );
                return Err(FormError::ImportParse("expected a JSON object".to_string()));
            }
            Err(e) => {
                log::warn!("{} FIELD_IMPORT_FAILED error={}", self.inner.log_ctx, e);
                return Err(FormError::ImportParse(e.to_string()));
            }
        };

        let count = imported.len();
        self.inner.state.lock().data.extend(imported);
        log::info!("{} FIELD_STORE_IMPORTED fields={}", self.inner.log_ctx, count);
        match self.flush() {
            Err(e) if e.is_capacity() => Ok(()),
            other => other,
        }
    }

    pub fn save_status(&self) -> SaveStatus {
        let state = self.inner.state.lock();
        SaveStatus {
            has_data: !state.data.is_empty(),
            last_saved: state.last_saved,
            data_size: Value::Object(state.data.clone()).to_string().len(),
        }
    }

    fn schedule_flush(&self) {
        let previous = self.inner.state.lock().pending.take();
        if let Some(handle) = previous {
            self.inner.services.scheduler.cancel(handle);
        }

        let weak: Weak<StoreInner> = Arc::downgrade(&self.inner);
        let handle = self.inner.services.scheduler.schedule(
            self.inner.debounce,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.state.lock().pending = None;
                    // Failures are already logged and surfaced as a notice.
                    let _ = inner.save();
                }
            }),
        );
        self.inner.state.lock().pending = Some(handle);
    }
}

impl StoreInner {
    fn save(&self) -> Result<()> {
        let (json, fields) = {
            let state = self.state.lock();
            (serde_json::to_string(&state.data)?, state.data.len())
        };

        match self.services.storage.set_item(&self.key, &json) {
            Ok(()) => {
                let mut state = self.state.lock();
                state.last_saved = Some(self.services.clock.now());
                state.flush_count += 1;
                log::debug!(
                    "{} FIELD_STORE_FLUSHED key={} fields={} bytes={}",
                    self.log_ctx,
                    self.key,
                    fields,
                    json.len()
                );
                Ok(())
            }
            Err(e) => {
                log::warn!("{} FIELD_STORE_FLUSH_FAILED key={} error={}", self.log_ctx, self.key, e);
                if e.is_capacity() {
                    self.services.notifier.notify(Notice::warning(STORAGE_FULL_NOTICE));
                }
                Err(e)
            }
        }
    }
}

fn load_blob(
    storage: &dyn crate::storage::backend::KeyValueStorage,
    key: &str,
    ctx: &LogContext,
) -> Map<String, Value> {
    let Some(raw) = storage.get_item(key) else {
        return Map::new();
    };
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            log::warn!(
                "{} PERSISTED_STATE_MALFORMED key={} reason=not_an_object kind={}",
                ctx,
                key,
                json_kind(&other)
            );
            Map::new()
        }
        Err(e) => {
            log::warn!("{} PERSISTED_STATE_MALFORMED key={} error={}", ctx, key, e);
            Map::new()
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::clock::FixedClock;
    use crate::runtime::notifier::NoticeQueue;
    use crate::runtime::scheduler::TimerQueue;
    use crate::storage::backend::{KeyValueStorage, MemoryStorage};
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use serde_json::json;

    struct Harness {
        storage: Arc<MemoryStorage>,
        timers: TimerQueue,
        notices: Arc<NoticeQueue>,
        store: FieldStore,
    }

    fn harness_with(storage: Arc<MemoryStorage>) -> Harness {
        let timers = TimerQueue::new();
        let notices = Arc::new(NoticeQueue::new());
        let clock = FixedClock::on_date(NaiveDate::from_ymd_opt(2026, 5, 1).unwrap());
        let services = Services::new(storage.clone(), Arc::new(timers.clone()))
            .with_clock(Arc::new(clock))
            .with_notifier(notices.clone());
        let store = FieldStore::open("P-001", &FormConfig::default(), services);
        Harness {
            storage,
            timers,
            notices,
            store,
        }
    }

    fn harness() -> Harness {
        harness_with(Arc::new(MemoryStorage::new()))
    }

    fn persisted(h: &Harness) -> Option<Value> {
        h.storage
            .get_item("dae_inspection_data_P-001")
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }

    #[test]
    fn test_get_unset_is_empty() {
        let h = harness();
        assert_eq!(h.store.get("msn"), json!(""));
        assert_eq!(h.store.get_str("msn"), "");
        assert!(!h.store.contains("msn"));
    }

    #[test]
    fn test_set_updates_memory_before_flush() {
        let h = harness();
        h.store.set("msn", "1234");
        assert_eq!(h.store.get_str("msn"), "1234");
        assert!(h.store.has_pending_flush());
        assert_eq!(persisted(&h), None);

        h.timers.advance(Duration::from_millis(300));
        assert_eq!(persisted(&h), Some(json!({"msn": "1234"})));
        assert!(!h.store.has_pending_flush());
    }

    #[test]
    fn test_burst_coalesces_into_one_flush() {
        let h = harness();
        for (i, v) in ["1", "12", "123", "1234"].iter().enumerate() {
            h.store.set("msn", *v);
            if i < 3 {
                h.timers.advance(Duration::from_millis(200));
            }
        }
        h.timers.advance(Duration::from_millis(299));
        assert_eq!(h.store.flush_count(), 0);

        h.timers.advance(Duration::from_millis(1));
        assert_eq!(h.store.flush_count(), 1);
        assert_eq!(persisted(&h), Some(json!({"msn": "1234"})));
    }

    #[test]
    fn test_set_multiple_schedules_one_flush() {
        let h = harness();
        h.store.set_multiple([("a", "1"), ("b", "2")]);
        assert_eq!(h.timers.pending_count(), 1);
        h.timers.run_all();
        assert_eq!(h.store.flush_count(), 1);
        assert_eq!(persisted(&h), Some(json!({"a": "1", "b": "2"})));
    }

    #[test]
    fn test_reopen_hydrates() {
        let h = harness();
        h.store.set("operator", "Acme Air");
        h.store.flush().unwrap();

        let reopened = harness_with(h.storage.clone());
        assert_eq!(reopened.store.get_str("operator"), "Acme Air");
    }

    #[test]
    fn test_malformed_blob_falls_back_to_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item("dae_inspection_data_P-001", "{oops").unwrap();
        let h = harness_with(storage.clone());
        assert!(h.store.is_empty());

        storage.set_item("dae_inspection_data_P-001", "[1,2]").unwrap();
        let h = harness_with(storage);
        assert!(h.store.is_empty());
    }

    #[test]
    fn test_flush_cancels_pending() {
        let h = harness();
        h.store.set("msn", "1");
        h.store.flush().unwrap();
        assert_eq!(h.timers.pending_count(), 0);
        h.timers.advance(Duration::from_secs(1));
        assert_eq!(h.store.flush_count(), 1);
    }

    #[test]
    fn test_capacity_exceeded_keeps_memory_and_notifies() {
        let h = harness_with(Arc::new(MemoryStorage::with_quota(40)));
        h.store.set("remarks", "x".repeat(100));
        h.timers.run_all();

        assert_eq!(h.store.get_str("remarks").len(), 100);
        assert_eq!(persisted(&h), None);
        assert_eq!(h.store.flush_count(), 0);
        let notices = h.notices.drain();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].message, STORAGE_FULL_NOTICE);

        // Caller frees space and retries
        h.storage.set_quota(None);
        h.store.flush().unwrap();
        assert!(persisted(&h).is_some());
    }

    #[test]
    fn test_export_import_round_trip() {
        let h = harness();
        h.store.set("msn", "1234");
        h.store.set("findings_A", "A");
        h.store.save_table_row("records", 0, json!({"date": "2026-01-01"}));
        let exported = h.store.export().unwrap();

        let fresh = harness_with(Arc::new(MemoryStorage::new()));
        fresh.store.import(&exported).unwrap();
        for key in ["msn", "findings_A", "records_row_0"] {
            assert_eq!(fresh.store.get(key), h.store.get(key));
        }
        // Import persists immediately
        assert_eq!(fresh.store.flush_count(), 1);
    }

    #[test]
    fn test_import_failure_leaves_store_unchanged() {
        let h = harness();
        h.store.set("msn", "1234");
        assert!(matches!(h.store.import("{broken"), Err(FormError::ImportParse(_))));
        assert!(matches!(h.store.import("[1]"), Err(FormError::ImportParse(_))));
        assert_eq!(h.store.get_all(), json!({"msn": "1234"}).as_object().unwrap().clone());
    }

    #[test]
    fn test_import_over_quota_keeps_merge_and_notifies() {
        let h = harness_with(Arc::new(MemoryStorage::with_quota(40)));
        let payload = json!({"remarks": "x".repeat(100), "msn": "1234"}).to_string();

        assert!(h.store.import(&payload).is_ok());
        assert_eq!(h.store.get_str("msn"), "1234");
        assert_eq!(h.store.get_str("remarks").len(), 100);
        assert_eq!(persisted(&h), None);
        assert_eq!(h.store.flush_count(), 0);
        let notices = h.notices.drain();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].message, STORAGE_FULL_NOTICE);
    }

    #[test]
    fn test_import_merges() {
        let h = harness();
        h.store.set("msn", "1");
        h.store.set("operator", "A");
        h.store.import(r#"{"msn": "2", "model": "ATR-72-600"}"#).unwrap();
        assert_eq!(h.store.get_str("msn"), "2");
        assert_eq!(h.store.get_str("operator"), "A");
        assert_eq!(h.store.get_str("model"), "ATR-72-600");
    }

    #[test]
    fn test_table_rows() {
        let h = harness();
        assert_eq!(h.store.load_table_row("records", 3), json!({}));
        h.store.save_table_row("records", 3, json!({"ref": "AMM 05"}));
        assert_eq!(h.store.load_table_row("records", 3), json!({"ref": "AMM 05"}));
    }

    #[test]
    fn test_clear_removes_blob() {
        let h = harness();
        h.store.set("msn", "1");
        h.store.flush().unwrap();
        h.store.set("msn", "2");
        h.store.clear();
        assert!(h.store.is_empty());
        assert_eq!(persisted(&h), None);
        assert_eq!(h.timers.pending_count(), 0);
    }

    #[test]
    fn test_save_status() {
        let h = harness();
        let status = h.store.save_status();
        assert!(!status.has_data);
        assert_eq!(status.last_saved, None);

        h.store.set("msn", "1");
        h.store.flush().unwrap();
        let status = h.store.save_status();
        assert!(status.has_data);
        assert_eq!(status.data_size, r#"{"msn":"1"}"#.len());
        assert_eq!(
            status.last_saved.unwrap().date_naive(),
            NaiveDate::from_ymd_opt(2026, 5, 1).unwrap()
        );
    }

    proptest! {
        #[test]
        fn prop_burst_flushes_once_with_last_value(
            values in proptest::collection::vec("[a-z0-9]{0,8}", 1..20),
            gaps in proptest::collection::vec(0u64..300, 20),
        ) {
            let h = harness();
            for (i, v) in values.iter().enumerate() {
                h.store.set("field", v.as_str());
                if i + 1 < values.len() {
                    h.timers.advance(Duration::from_millis(gaps[i] % 300));
                }
            }
            prop_assert_eq!(h.store.flush_count(), 0);

            h.timers.advance(Duration::from_millis(300));
            prop_assert_eq!(h.store.flush_count(), 1);
            let expected = json!({"field": values.last().unwrap()});
            prop_assert_eq!(persisted(&h), Some(expected));
        }
    }
}
