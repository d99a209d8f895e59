//! In-memory collaborators shared by the integration tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use checkwatch_service::alerts::{AlertDispatcher, AlertError};
use checkwatch_service::logs::{LogStep, LogStore, LogStoreError, LogWriter};
use checkwatch_service::monitoring::checker::{ProbeError, ProbeRequest, Prober};
use checkwatch_service::monitoring::types::CHECKS_CATEGORY;
use checkwatch_service::monitoring::{CheckExecutor, CheckScheduler, OutcomeProcessor};
use checkwatch_service::store::{RecordStore, StoreError};
use serde_json::{Value, json};

/// 20 character check id for `n`
pub fn check_id(n: usize) -> String {
    format!("check{n:015}")
}

/// A valid, never evaluated check record probing `http://{host}`
pub fn raw_check(id: &str, host: &str) -> Value {
    json!({
        "id": id,
        "userPhone": "5551234567",
        "protocol": "http",
        "url": host,
        "method": "get",
        "successCodes": [200],
        "timeoutSeconds": 2
    })
}

#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<BTreeMap<String, Value>>,
    fail_reads: Mutex<HashSet<String>>,
    fail_updates: Mutex<HashSet<String>>,
    pub updates: AtomicUsize,
}

impl MemoryRecordStore {
    fn key(category: &str, id: &str) -> String {
        format!("{category}/{id}")
    }

    pub fn insert(&self, id: &str, record: Value) {
        self.records.lock().unwrap().insert(Self::key(CHECKS_CATEGORY, id), record);
    }

    pub fn get(&self, id: &str) -> Option<Value> {
        self.records.lock().unwrap().get(&Self::key(CHECKS_CATEGORY, id)).cloned()
    }

    pub fn fail_read(&self, id: &str) {
        self.fail_reads.lock().unwrap().insert(id.to_string());
    }

    pub fn fail_update(&self, id: &str) {
        self.fail_updates.lock().unwrap().insert(id.to_string());
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn list(&self, category: &str) -> Result<Vec<String>, StoreError> {
        let prefix = format!("{category}/");
        Ok(self
            .records
            .lock()
            .unwrap()
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }

    async fn read(&self, category: &str, id: &str) -> Result<Value, StoreError> {
        if self.fail_reads.lock().unwrap().contains(id) {
            return Err(StoreError::Io(std::io::Error::other("read failure")));
        }
        self.records
            .lock()
            .unwrap()
            .get(&Self::key(category, id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound { category: category.into(), id: id.into() })
    }

    async fn update(&self, category: &str, id: &str, record: &Value) -> Result<(), StoreError> {
        if self.fail_updates.lock().unwrap().contains(id) {
            return Err(StoreError::Io(std::io::Error::other("update failure")));
        }
        let mut records = self.records.lock().unwrap();
        let slot = records
            .get_mut(&Self::key(category, id))
            .ok_or_else(|| StoreError::NotFound { category: category.into(), id: id.into() })?;
        *slot = record.clone();
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn create(&self, category: &str, id: &str, record: &Value) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap();
        let key = Self::key(category, id);
        if records.contains_key(&key) {
            return Err(StoreError::AlreadyExists { category: category.into(), id: id.into() });
        }
        records.insert(key, record.clone());
        Ok(())
    }

    async fn delete(&self, category: &str, id: &str) -> Result<(), StoreError> {
        self.records
            .lock()
            .unwrap()
            .remove(&Self::key(category, id))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound { category: category.into(), id: id.into() })
    }
}

/// Log store keeping active logs as strings; archives are stored uncompressed
#[derive(Default)]
pub struct MemoryLogStore {
    active: Mutex<BTreeMap<String, String>>,
    archives: Mutex<BTreeMap<String, String>>,
    fail_appends: Mutex<HashSet<String>>,
}

impl MemoryLogStore {
    pub fn lines(&self, log_id: &str) -> Vec<Value> {
        self.active
            .lock()
            .unwrap()
            .get(log_id)
            .map(|text| text.lines().map(|l| serde_json::from_str(l).unwrap()).collect())
            .unwrap_or_default()
    }

    pub fn fail_append(&self, log_id: &str) {
        self.fail_appends.lock().unwrap().insert(log_id.to_string());
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn append(&self, log_id: &str, line: &str) -> Result<(), LogStoreError> {
        if self.fail_appends.lock().unwrap().contains(log_id) {
            return Err(LogStoreError::Io {
                step: LogStep::Append,
                id: log_id.into(),
                source: std::io::Error::other("disk full"),
            });
        }
        let mut active = self.active.lock().unwrap();
        let log = active.entry(log_id.to_string()).or_default();
        log.push_str(line);
        log.push('\n');
        Ok(())
    }

    async fn list(&self, include_archived: bool) -> Result<Vec<String>, LogStoreError> {
        let mut ids: Vec<String> = self.active.lock().unwrap().keys().cloned().collect();
        if include_archived {
            ids.extend(self.archives.lock().unwrap().keys().cloned());
        }
        Ok(ids)
    }

    async fn read(&self, log_id: &str) -> Result<Vec<u8>, LogStoreError> {
        self.active
            .lock()
            .unwrap()
            .get(log_id)
            .map(|text| text.as_bytes().to_vec())
            .ok_or_else(|| LogStoreError::NotFound(log_id.into()))
    }

    async fn compress(&self, log_id: &str, archive_id: &str) -> Result<(), LogStoreError> {
        let text = String::from_utf8(self.read(log_id).await?).unwrap();
        let mut archives = self.archives.lock().unwrap();
        if archives.contains_key(archive_id) {
            return Err(LogStoreError::ArchiveExists(archive_id.into()));
        }
        archives.insert(archive_id.to_string(), text);
        Ok(())
    }

    async fn decompress(&self, archive_id: &str) -> Result<String, LogStoreError> {
        self.archives
            .lock()
            .unwrap()
            .get(archive_id)
            .cloned()
            .ok_or_else(|| LogStoreError::NotFound(archive_id.into()))
    }

    async fn truncate(&self, log_id: &str) -> Result<(), LogStoreError> {
        match self.active.lock().unwrap().get_mut(log_id) {
            Some(log) => {
                log.clear();
                Ok(())
            }
            None => Err(LogStoreError::NotFound(log_id.into())),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Behaviour {
    Status(u16),
    Refused,
    Hang,
}

/// Prober answering per host, counting calls
#[derive(Default)]
pub struct ScriptedProber {
    behaviours: Mutex<HashMap<String, Behaviour>>,
    pub calls: AtomicUsize,
}

impl ScriptedProber {
    pub fn set(&self, host: &str, behaviour: Behaviour) {
        self.behaviours.lock().unwrap().insert(host.to_string(), behaviour);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, request: &ProbeRequest) -> Result<u16, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let host = request.url.host_str().unwrap_or_default().to_string();
        let behaviour = self.behaviours.lock().unwrap().get(&host).copied().unwrap_or(Behaviour::Status(200));
        match behaviour {
            Behaviour::Status(code) => Ok(code),
            Behaviour::Refused => Err(ProbeError::Transport("connection refused".into())),
            Behaviour::Hang => std::future::pending().await,
        }
    }
}

#[derive(Default)]
pub struct RecordingDispatcher {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingDispatcher {
    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, m)| m.clone()).collect()
    }
}

#[async_trait]
impl AlertDispatcher for RecordingDispatcher {
    async fn notify(&self, recipient: &str, message: &str) -> Result<(), AlertError> {
        self.sent.lock().unwrap().push((recipient.to_string(), message.to_string()));
        Ok(())
    }
}

/// Scheduler wired to in-memory collaborators
pub struct Harness {
    pub records: Arc<MemoryRecordStore>,
    pub logs: Arc<MemoryLogStore>,
    pub prober: Arc<ScriptedProber>,
    pub alerts: Arc<RecordingDispatcher>,
    pub scheduler: Arc<CheckScheduler>,
}

impl Harness {
    pub fn new(max_concurrent_checks: usize) -> Self {
        let records = Arc::new(MemoryRecordStore::default());
        let logs = Arc::new(MemoryLogStore::default());
        let prober = Arc::new(ScriptedProber::default());
        let alerts = Arc::new(RecordingDispatcher::default());

        let processor = OutcomeProcessor::new(records.clone(), LogWriter::new(logs.clone()), alerts.clone());
        let scheduler = Arc::new(CheckScheduler::new(
            records.clone(),
            CheckExecutor::new(prober.clone()),
            processor,
            max_concurrent_checks,
        ));

        Self { records, logs, prober, alerts, scheduler }
    }
}
