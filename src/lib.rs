pub mod config;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod input;
pub mod logging;
pub mod notification;
pub mod persist;
pub mod storage;
pub use error::{AppError, AppResult};

use std::path::PathBuf;
use std::sync::Arc;

use config::AppConfig;
use editor::{AnnotationSession, ImageSource, LoadOutcome};
use geometry::Size;
use notification::Notifier;
use persist::PersistJob;
use storage::{AnnotationStore, LocalAnnotationStore, RemoteAnnotationStore};

/// Everything a host needs to drive one radiograph: the editing session and
/// the store its saves go to.
pub struct Workspace {
    pub config: AppConfig,
    pub session: AnnotationSession,
    pub store: Arc<dyn AnnotationStore>,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("config", &self.config)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl Workspace {
    /// Writes the flattened canvas into the configured export directory.
    pub fn export(&self, record_id: &str) -> AppResult<PathBuf> {
        let dir = self.config.resolved_export_dir();
        Ok(self.session.export_png(&dir, record_id)?)
    }

    /// Saves the canvas and notes to the configured store in the background.
    pub fn save(&self, record_id: &str, notifier: Arc<dyn Notifier>) -> AppResult<PersistJob> {
        Ok(self
            .session
            .persist(record_id, Arc::clone(&self.store), notifier)?)
    }
}

/// Picks the remote backend when an endpoint is configured, else a local
/// directory store.
pub fn annotation_store(config: &AppConfig) -> AppResult<Arc<dyn AnnotationStore>> {
    if let Some(endpoint) = config.remote_endpoint.as_deref() {
        tracing::info!(endpoint, "using remote annotation store");
        return Ok(Arc::new(RemoteAnnotationStore::new(endpoint)));
    }
    let root = config.resolved_storage_dir()?;
    tracing::info!(root = %root.display(), "using local annotation store");
    Ok(Arc::new(LocalAnnotationStore::new(root)))
}

/// Entrypoint used by host integrations: loads config, installs logging and
/// opens `source` in a fresh session.
pub fn open(source: ImageSource, viewport: Size) -> AppResult<(Workspace, LoadOutcome)> {
    logging::init();
    let config = config::load_app_config();
    tracing::info!("starting radiomark");

    let store = annotation_store(&config)?;
    let mut session = AnnotationSession::from_config(&config, viewport);
    let outcome = session.load_image(source);
    tracing::info!(?outcome, "session ready");

    Ok((
        Workspace {
            config,
            session,
            store,
        },
        outcome,
    ))
}
