use super::{DispatchError, DispatchKind, Dispatcher};
use crate::alerts::object::TransitionRecord;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// Appends one line per transition to a local file.
///
/// The file is opened, written and closed on every call so no handle is held
/// across objects or cycles. Each line goes out in a single append write.
pub struct FileDispatcher {
    path: PathBuf,
}

impl FileDispatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `[local-timestamp] StatusAlert: <alert> | <Kind>: <ns>/<name> | <prev> -> <curr> | <message>`
    pub fn format_line(record: &TransitionRecord, at: &DateTime<Local>) -> String {
        format!(
            "[{}] StatusAlert: {} | {}: {}/{} | {} -> {} | {}\n",
            at.format("%Y-%m-%d %H:%M:%S"),
            record.alert.name,
            record.alert.watch_kind,
            record.object_namespace,
            record.object_name,
            record.previous_state,
            record.current_state,
            record.message
        )
    }
}

#[async_trait]
impl Dispatcher for FileDispatcher {
    fn kind(&self) -> DispatchKind {
        DispatchKind::File
    }

    async fn dispatch(&self, record: &TransitionRecord) -> Result<(), DispatchError> {
        let line = Self::format_line(record, &record.detected_at.with_timezone(&Local));
        let path = self.path.display().to_string();

        let mut options = OpenOptions::new();
        options.append(true).create(true);
        #[cfg(unix)]
        options.mode(0o644);

        let mut file = options
            .open(&self.path)
            .await
            .map_err(|source| DispatchError::FileOpen {
                path: path.clone(),
                source,
            })?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|source| DispatchError::FileWrite {
                path: path.clone(),
                source,
            })?;

        file.flush()
            .await
            .map_err(|source| DispatchError::FileWrite { path, source })
    }
}
