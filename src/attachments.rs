//! Content-addressed attachment blob store (§4.E).
//!
//! Ported from `original_source/.../attachments_store.py`: two-level SHA
//! sharding, atomic `.tmp` + rename writes, a global metadata index and a
//! most-recent-first recency index, both rebuilt incrementally on every put.

use crate::error::{CoreError, CoreResult};
use crate::hashing::{sha256_of_bytes, sha256_of_obj, stable_json_dumps};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub sha256: String,
    pub kind: String,
    pub mime: String,
    pub filename: String,
    pub size_bytes: u64,
    pub created_at_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentMeta {
    pub kind: String,
    pub mime: String,
    pub filename: String,
    pub size_bytes: u64,
    pub created_at_utc: DateTime<Utc>,
    pub first_seen_run_id: String,
    pub last_seen_run_id: String,
    pub first_seen_at_utc: DateTime<Utc>,
    pub last_seen_at_utc: DateTime<Utc>,
    pub ref_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyReport {
    pub ok: bool,
    pub actual_sha256: Option<String>,
    pub size_bytes: Option<u64>,
    pub error: Option<String>,
}

const META_FILE: &str = "_attachment_meta.json";

pub struct AttachmentStore {
    root: PathBuf,
    lock: Mutex<()>,
}

impl AttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> CoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            lock: Mutex::new(()),
        })
    }

    fn shard_path(&self, sha: &str, ext: &str) -> PathBuf {
        self.root
            .join(&sha[0..2])
            .join(&sha[2..4])
            .join(format!("{sha}{ext}"))
    }

    fn find_existing(&self, sha: &str) -> Option<PathBuf> {
        let dir = self.root.join(&sha[0..2]).join(&sha[2..4]);
        if let Ok(entries) = fs::read_dir(&dir) {
            for entry in entries.flatten() {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if name.starts_with(sha) && !name.ends_with(".tmp") {
                    return Some(entry.path());
                }
            }
        }
        None
    }

    /// Store raw bytes, deduplicated by content hash. Idempotent.
    pub fn put_bytes(
        &self,
        data: &[u8],
        kind: &str,
        mime: &str,
        filename: &str,
        ext: &str,
        run_id: &str,
    ) -> CoreResult<AttachmentRef> {
        let _guard = self.lock.lock().unwrap();
        let sha = sha256_of_bytes(data);
        let path = self.shard_path(&sha, ext);
        if !path.exists() && self.find_existing(&sha).is_none() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let tmp = path.with_extension(format!("{ext}.tmp"));
            fs::write(&tmp, data)?;
            fs::rename(&tmp, &path)?;
        }
        let now = Utc::now();
        let size_bytes = data.len() as u64;
        self.upsert_meta(&sha, kind, mime, filename, size_bytes, run_id, now)?;
        Ok(AttachmentRef {
            sha256: sha,
            kind: kind.to_string(),
            mime: mime.to_string(),
            filename: filename.to_string(),
            size_bytes,
            created_at_utc: now,
        })
    }

    /// Serialize `object` canonically, hash, store the compact form under
    /// the hash path and a pretty-printed sibling for human inspection.
    pub fn put_json<T: Serialize>(
        &self,
        object: &T,
        kind: &str,
        filename: &str,
        ext: &str,
        run_id: &str,
    ) -> CoreResult<AttachmentRef> {
        let compact = stable_json_dumps(object)?;
        let sha = sha256_of_obj(object)?;
        let aref = self.put_bytes(compact.as_bytes(), kind, "application/json", filename, ext, run_id)?;
        debug_assert_eq!(aref.sha256, sha);

        let pretty_path = self.shard_path(&sha, &format!("{ext}.pretty.json"));
        if !pretty_path.exists() {
            if let Some(parent) = pretty_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let value: serde_json::Value = serde_json::from_str(&compact)?;
            let pretty = serde_json::to_string_pretty(&value)?;
            let tmp = pretty_path.with_extension("tmp");
            fs::write(&tmp, pretty)?;
            fs::rename(&tmp, &pretty_path)?;
        }
        Ok(aref)
    }

    pub fn get_bytes(&self, sha: &str) -> CoreResult<Option<Vec<u8>>> {
        match self.find_existing(sha) {
            Some(path) => Ok(Some(fs::read(path)?)),
            None => Ok(None),
        }
    }

    pub fn load_json(&self, sha: &str) -> CoreResult<Option<serde_json::Value>> {
        match self.get_bytes(sha)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Verify stored bytes for `sha` still hash to `sha`.
    pub fn verify(&self, sha: &str) -> VerifyReport {
        match self.find_existing(sha) {
            None => VerifyReport {
                ok: false,
                actual_sha256: None,
                size_bytes: None,
                error: Some("not found".into()),
            },
            Some(path) => match fs::read(&path) {
                Ok(bytes) => {
                    let actual = sha256_of_bytes(&bytes);
                    VerifyReport {
                        ok: actual == sha,
                        size_bytes: Some(bytes.len() as u64),
                        actual_sha256: Some(actual),
                        error: None,
                    }
                }
                Err(e) => VerifyReport {
                    ok: false,
                    actual_sha256: None,
                    size_bytes: None,
                    error: Some(e.to_string()),
                },
            },
        }
    }

    fn meta_path(&self) -> PathBuf {
        self.root.join(META_FILE)
    }

    fn load_meta_index(&self) -> CoreResult<HashMap<String, AttachmentMeta>> {
        let path = self.meta_path();
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let bytes = fs::read(&path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write_meta_index(&self, index: &HashMap<String, AttachmentMeta>) -> CoreResult<()> {
        let path = self.meta_path();
        let text = stable_json_dumps(index)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn upsert_meta(
        &self,
        sha: &str,
        kind: &str,
        mime: &str,
        filename: &str,
        size_bytes: u64,
        run_id: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        let mut index = self.load_meta_index()?;
        index
            .entry(sha.to_string())
            .and_modify(|m| {
                m.last_seen_run_id = run_id.to_string();
                m.last_seen_at_utc = now;
                m.ref_count += 1;
            })
            .or_insert_with(|| AttachmentMeta {
                kind: kind.to_string(),
                mime: mime.to_string(),
                filename: filename.to_string(),
                size_bytes,
                created_at_utc: now,
                first_seen_run_id: run_id.to_string(),
                last_seen_run_id: run_id.to_string(),
                first_seen_at_utc: now,
                last_seen_at_utc: now,
                ref_count: 1,
            });
        self.write_meta_index(&index)?;
        self.write_recency_index(&index)
    }

    fn recency_path(&self) -> PathBuf {
        self.root.join("_attachment_recent.json")
    }

    fn write_recency_index(&self, index: &HashMap<String, AttachmentMeta>) -> CoreResult<()> {
        let mut entries: Vec<(&String, &AttachmentMeta)> = index.iter().collect();
        entries.sort_by(|a, b| b.1.last_seen_at_utc.cmp(&a.1.last_seen_at_utc));
        let shas: Vec<&String> = entries.into_iter().map(|(k, _)| k).collect();
        let text = stable_json_dumps(&shas)?;
        let path = self.recency_path();
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    pub fn meta_for(&self, sha: &str) -> CoreResult<Option<AttachmentMeta>> {
        Ok(self.load_meta_index()?.remove(sha))
    }

    pub fn recent(&self, limit: usize) -> CoreResult<Vec<String>> {
        let path = self.recency_path();
        if !path.exists() {
            return Ok(vec![]);
        }
        let bytes = fs::read(&path)?;
        let all: Vec<String> = serde_json::from_slice(&bytes)?;
        Ok(all.into_iter().take(limit).collect())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Returns true if the bytes at `path` hash to `sha`.
pub fn verify_file(path: &Path, sha: &str) -> CoreResult<bool> {
    let bytes = fs::read(path)?;
    Ok(sha256_of_bytes(&bytes) == sha)
}

/// Convenience conversion used by store error propagation.
pub fn integrity_error(sha: &str) -> CoreError {
    CoreError::IntegrityMismatch {
        sha256: sha.to_string(),
    }
}
