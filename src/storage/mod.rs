use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const RECORD_FILE_EXTENSION: &str = "json";
const REMOTE_USER_AGENT: &str = "radiomark";
const REMOTE_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("record id is empty")]
    MissingRecordId,
    #[error("record id {record_id:?} may only contain ASCII letters, digits, '-' and '_'")]
    InvalidRecordId { record_id: String },
    #[error("stored record for {requested} belongs to {found}")]
    RecordMismatch { requested: String, found: String },
    #[error("io error while {operation} {record_id}: {source}")]
    Io {
        operation: &'static str,
        record_id: String,
        #[source]
        source: io::Error,
    },
    #[error("malformed annotation record {record_id}: {source}")]
    Json {
        record_id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("remote store answered {status} for {record_id}")]
    RemoteStatus { status: u16, record_id: String },
    #[error("remote store unreachable for {record_id}: {source}")]
    RemoteTransport {
        record_id: String,
        #[source]
        source: Box<ureq::Error>,
    },
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// What gets persisted for one annotated radiograph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRecord {
    pub record_id: String,
    /// Flattened canvas as a `data:image/png;base64,` URL.
    pub image: String,
    #[serde(default)]
    pub notes: String,
    pub saved_at: u64,
}

impl AnnotationRecord {
    pub fn new(record_id: impl Into<String>, image: String, notes: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            image,
            notes: notes.into(),
            saved_at: unix_now(),
        }
    }
}

pub trait AnnotationStore: Send + Sync {
    fn save(&self, record: &AnnotationRecord) -> StorageResult<()>;
    fn load(&self, record_id: &str) -> StorageResult<Option<AnnotationRecord>>;
}

/// Checks that `record_id` can be used verbatim as a file stem and URL
/// segment. Ids are never rewritten, so two distinct ids never share a slot.
pub fn validate_record_id(record_id: &str) -> StorageResult<&str> {
    if record_id.trim().is_empty() {
        return Err(StorageError::MissingRecordId);
    }
    if !record_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(StorageError::InvalidRecordId {
            record_id: record_id.to_string(),
        });
    }
    Ok(record_id)
}

fn ensure_record_matches(
    record_id: &str,
    record: AnnotationRecord,
) -> StorageResult<AnnotationRecord> {
    if record.record_id != record_id {
        return Err(StorageError::RecordMismatch {
            requested: record_id.to_string(),
            found: record.record_id,
        });
    }
    Ok(record)
}

/// One JSON document per record in a local directory.
#[derive(Debug, Clone)]
pub struct LocalAnnotationStore {
    root: PathBuf,
}

impl LocalAnnotationStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for_record(&self, record_id: &str) -> StorageResult<PathBuf> {
        let stem = validate_record_id(record_id)?;
        Ok(self.root.join(format!("{stem}.{RECORD_FILE_EXTENSION}")))
    }
}

impl AnnotationStore for LocalAnnotationStore {
    fn save(&self, record: &AnnotationRecord) -> StorageResult<()> {
        let path = self.path_for_record(&record.record_id)?;
        let io_error = |source| StorageError::Io {
            operation: "saving",
            record_id: record.record_id.clone(),
            source,
        };
        fs::create_dir_all(&self.root).map_err(io_error)?;
        let body = serde_json::to_vec_pretty(record).map_err(|source| StorageError::Json {
            record_id: record.record_id.clone(),
            source,
        })?;
        fs::write(&path, body).map_err(io_error)?;
        tracing::debug!(path = %path.display(), "annotation record written");
        Ok(())
    }

    fn load(&self, record_id: &str) -> StorageResult<Option<AnnotationRecord>> {
        let path = self.path_for_record(record_id)?;
        let body = match fs::read(&path) {
            Ok(body) => body,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StorageError::Io {
                    operation: "loading",
                    record_id: record_id.to_string(),
                    source,
                })
            }
        };
        let record = serde_json::from_slice(&body).map_err(|source| StorageError::Json {
            record_id: record_id.to_string(),
            source,
        })?;
        ensure_record_matches(record_id, record).map(Some)
    }
}

/// JSON over HTTP against the clinic backend.
#[derive(Debug, Clone)]
pub struct RemoteAnnotationStore {
    endpoint: String,
    agent: ureq::Agent,
}

impl RemoteAnnotationStore {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(REMOTE_TIMEOUT)
            .user_agent(REMOTE_USER_AGENT)
            .build();
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn url_for_record(&self, record_id: &str) -> StorageResult<String> {
        let id = validate_record_id(record_id)?;
        Ok(format!("{}/radiographs/{id}/annotation", self.endpoint))
    }
}

fn remote_error(record_id: &str, err: ureq::Error) -> StorageError {
    match err {
        ureq::Error::Status(status, _) => StorageError::RemoteStatus {
            status,
            record_id: record_id.to_string(),
        },
        other => StorageError::RemoteTransport {
            record_id: record_id.to_string(),
            source: Box::new(other),
        },
    }
}

impl AnnotationStore for RemoteAnnotationStore {
    fn save(&self, record: &AnnotationRecord) -> StorageResult<()> {
        let url = self.url_for_record(&record.record_id)?;
        self.agent
            .put(&url)
            .send_json(record)
            .map_err(|err| remote_error(&record.record_id, err))?;
        tracing::debug!(%url, "annotation record uploaded");
        Ok(())
    }

    fn load(&self, record_id: &str) -> StorageResult<Option<AnnotationRecord>> {
        let url = self.url_for_record(record_id)?;
        match self.agent.get(&url).call() {
            Ok(response) => {
                let record = response.into_json::<AnnotationRecord>().map_err(|source| {
                    StorageError::Io {
                        operation: "decoding",
                        record_id: record_id.to_string(),
                        source,
                    }
                })?;
                ensure_record_matches(record_id, record).map(Some)
            }
            Err(ureq::Error::Status(404, _)) => Ok(None),
            Err(err) => Err(remote_error(record_id, err)),
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}
