//! Background persistence with a pending/saved/failed status the host can poll.

use std::sync::mpsc;
use std::sync::Arc;

use crate::notification::Notifier;
use crate::storage::{AnnotationRecord, AnnotationStore};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PersistStatus {
    #[default]
    Idle,
    Pending,
    Saved {
        record_id: String,
    },
    Failed {
        record_id: String,
        message: String,
    },
}

impl PersistStatus {
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    fn notification_body(&self) -> Option<String> {
        match self {
            Self::Saved { record_id } => Some(format!("Anotação salva ({record_id})")),
            Self::Failed { record_id, message } => {
                Some(format!("Falha ao salvar anotação ({record_id}): {message}"))
            }
            Self::Idle | Self::Pending => None,
        }
    }
}

/// A save running on a worker thread. Not cancellable; it reports whenever
/// the store returns.
#[derive(Debug)]
pub struct PersistJob {
    status: PersistStatus,
    receiver: Option<mpsc::Receiver<PersistStatus>>,
}

impl PersistJob {
    pub fn spawn(
        store: Arc<dyn AnnotationStore>,
        record: AnnotationRecord,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<PersistStatus>();
        tracing::info!(record_id = %record.record_id, "persisting annotation");
        std::thread::spawn(move || {
            let status = match store.save(&record) {
                Ok(()) => PersistStatus::Saved {
                    record_id: record.record_id.clone(),
                },
                Err(err) => {
                    tracing::warn!(record_id = %record.record_id, %err, "annotation persist failed");
                    PersistStatus::Failed {
                        record_id: record.record_id.clone(),
                        message: err.to_string(),
                    }
                }
            };
            if let Some(body) = status.notification_body() {
                notifier.notify(&body);
            }
            let _ = tx.send(status);
        });

        Self {
            status: PersistStatus::Pending,
            receiver: Some(rx),
        }
    }

    /// Non-blocking status check.
    pub fn poll(&mut self) -> &PersistStatus {
        if let Some(receiver) = &self.receiver {
            match receiver.try_recv() {
                Ok(status) => {
                    self.status = status;
                    self.receiver = None;
                }
                Err(mpsc::TryRecvError::Empty) => {}
                Err(mpsc::TryRecvError::Disconnected) => {
                    self.status = PersistStatus::Failed {
                        record_id: String::new(),
                        message: "persist worker exited without a result".to_string(),
                    };
                    self.receiver = None;
                }
            }
        }
        &self.status
    }

    /// Blocks until the worker reports.
    pub fn wait(mut self) -> PersistStatus {
        if let Some(receiver) = self.receiver.take() {
            self.status = receiver.recv().unwrap_or_else(|_| PersistStatus::Failed {
                record_id: String::new(),
                message: "persist worker exited without a result".to_string(),
            });
        }
        self.status
    }
}
