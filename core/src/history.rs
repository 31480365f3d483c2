use crate::error::HistoryError;
use crate::status::StatusSink;
use crate::viewer::ResultViewer;
use graphex_protocol::ExecutionResult;
use graphex_protocol::HistoryMessage;
use graphex_protocol::is_result_file_name;
use graphex_protocol::result_file_name;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use time::Duration;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;

/// Durable, chronologically ordered log of query executions. Each record is
/// one immutable JSON file in the storage directory; the in-memory/UI view
/// is mirrored over an unbounded message channel to the presentation
/// surface and reconstructed from disk by [`HistoryLog::reload`].
pub struct HistoryLog {
    storage_dir: PathBuf,
    surface: UnboundedSender<HistoryMessage>,
    viewer: Arc<dyn ResultViewer>,
    status: Arc<dyn StatusSink>,
}

impl HistoryLog {
    pub fn new(
        storage_dir: PathBuf,
        viewer: Arc<dyn ResultViewer>,
        status: Arc<dyn StatusSink>,
    ) -> (Self, UnboundedReceiver<HistoryMessage>) {
        let (surface, receiver) = mpsc::unbounded_channel();
        (
            Self {
                storage_dir,
                surface,
                viewer,
                status,
            },
            receiver,
        )
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Persist one execution result under `file_name` and mirror it to the
    /// surface. `open_file` additionally routes the record through the
    /// viewer — set for freshly produced results, never during reload.
    pub fn record(
        &self,
        result: &ExecutionResult,
        file_name: &str,
        open_file: bool,
    ) -> Result<(), HistoryError> {
        fs::create_dir_all(&self.storage_dir)?;
        let data = serde_json::to_vec_pretty(result).map_err(HistoryError::Encode)?;
        fs::write(self.storage_dir.join(file_name), data)?;
        self.send(HistoryMessage::AddHistory {
            file_name: file_name.to_string(),
            result: result.clone(),
        });
        if open_file && let Err(err) = self.viewer.open(file_name) {
            self.status
                .error(&format!("failed to open {file_name}: {err}"));
        }
        Ok(())
    }

    /// Rebuild the surface view from disk: every history-prefixed file,
    /// oldest first, is re-fed through [`HistoryLog::record`]. The surface
    /// prepends entries, so the most recent record ends up on top.
    /// Malformed records are skipped with a warning; a storage failure
    /// aborts the remaining reconstruction.
    pub fn reload(&self) -> Result<(), HistoryError> {
        for file_name in self.history_file_names()? {
            let content = fs::read_to_string(self.storage_dir.join(&file_name))?;
            match serde_json::from_str::<ExecutionResult>(&content) {
                Ok(result) => self.record(&result, &file_name, false)?,
                Err(err) => self
                    .status
                    .warn(&format!("skipping malformed history record {file_name}: {err}")),
            }
        }
        Ok(())
    }

    /// Delete one record and mirror the removal.
    pub fn remove(&self, file_name: &str) -> Result<(), HistoryError> {
        fs::remove_file(self.storage_dir.join(file_name))?;
        self.send(HistoryMessage::RemoveHistory {
            file_name: file_name.to_string(),
        });
        Ok(())
    }

    /// Delete every history record, in sorted name order. Unrelated files in
    /// the directory are untouched.
    pub fn clear(&self) -> Result<(), HistoryError> {
        for file_name in self.history_file_names()? {
            self.remove(&file_name)?;
        }
        Ok(())
    }

    /// File name for a result captured at `when`, disambiguated against
    /// records already on disk: a same-millisecond collision advances the
    /// timestamp until the name is free, keeping name order == time order.
    pub fn unique_file_name(&self, mut when: OffsetDateTime) -> (OffsetDateTime, String) {
        loop {
            let name = result_file_name(when);
            if !self.storage_dir.join(&name).exists() {
                return (when, name);
            }
            when += Duration::milliseconds(1);
        }
    }

    fn history_file_names(&self) -> Result<Vec<String>, HistoryError> {
        fs::create_dir_all(&self.storage_dir)?;
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.storage_dir)? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if is_result_file_name(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    // The channel has no acknowledgement; a surface that went away just
    // stops receiving.
    fn send(&self, message: HistoryMessage) {
        let _ = self.surface.send(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::RecordingStatus;
    use crate::test_helpers::RecordingViewer;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;
    use time::macros::datetime;

    struct Fixture {
        log: HistoryLog,
        receiver: UnboundedReceiver<HistoryMessage>,
        viewer: Arc<RecordingViewer>,
        status: Arc<RecordingStatus>,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempdir().unwrap();
        fixture_in(dir)
    }

    fn fixture_in(dir: tempfile::TempDir) -> Fixture {
        let viewer = Arc::new(RecordingViewer::default());
        let status = Arc::new(RecordingStatus::default());
        let (log, receiver) = HistoryLog::new(
            dir.path().to_path_buf(),
            viewer.clone(),
            status.clone(),
        );
        Fixture {
            log,
            receiver,
            viewer,
            status,
            _dir: dir,
        }
    }

    fn sample_result(stamp: &str) -> ExecutionResult {
        ExecutionResult {
            when: stamp.to_string(),
            query: "g.V().count()".to_string(),
            target: "/dbs/db1/colls/coll1".to_string(),
            ..ExecutionResult::default()
        }
    }

    fn drain(receiver: &mut UnboundedReceiver<HistoryMessage>) -> Vec<HistoryMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = receiver.try_recv() {
            messages.push(message);
        }
        messages
    }

    #[test]
    fn record_then_remove_round_trip() {
        let mut fx = fixture();
        let name = "gremlin-result-2024-01-02-03-04-05-006.json";
        fx.log.record(&sample_result("t"), name, false).unwrap();
        assert!(fx.log.storage_dir().join(name).exists());

        fx.log.remove(name).unwrap();
        assert!(!fx.log.storage_dir().join(name).exists());

        let messages = drain(&mut fx.receiver);
        assert_eq!(messages.len(), 2);
        assert!(matches!(&messages[0], HistoryMessage::AddHistory { file_name, .. } if file_name == name));
        assert_eq!(
            messages[1],
            HistoryMessage::RemoveHistory {
                file_name: name.to_string(),
            }
        );
        assert!(fx.viewer.opened.lock().unwrap().is_empty());
    }

    #[test]
    fn record_with_open_file_routes_through_viewer() {
        let mut fx = fixture();
        let name = "gremlin-result-2024-01-02-03-04-05-006.json";
        fx.log.record(&sample_result("t"), name, true).unwrap();
        assert_eq!(fx.viewer.opened.lock().unwrap().as_slice(), [name]);
        drain(&mut fx.receiver);
    }

    #[test]
    fn reload_feeds_oldest_first_so_surface_shows_newest_on_top() {
        let mut fx = fixture();
        let stamps = [
            datetime!(2024-01-02 03:04:05.006 UTC),
            datetime!(2024-01-02 03:04:06.000 UTC),
            datetime!(2024-01-02 10:00:00.000 UTC),
        ];
        // Seed out of creation order; reload sorts by name, not mtime.
        for index in [1, 0, 2] {
            let name = result_file_name(stamps[index]);
            fx.log.record(&sample_result(&name), &name, false).unwrap();
        }
        drain(&mut fx.receiver);

        fx.log.reload().unwrap();
        let mut display: Vec<String> = Vec::new();
        for message in drain(&mut fx.receiver) {
            if let HistoryMessage::AddHistory { file_name, .. } = message {
                display.insert(0, file_name);
            }
        }
        assert_eq!(
            display,
            vec![
                result_file_name(stamps[2]),
                result_file_name(stamps[1]),
                result_file_name(stamps[0]),
            ]
        );
        // Reloaded records are never auto-opened.
        assert!(fx.viewer.opened.lock().unwrap().is_empty());
    }

    #[test]
    fn reload_skips_malformed_records_and_keeps_the_rest() {
        let mut fx = fixture();
        let good = result_file_name(datetime!(2024-01-02 03:04:05.006 UTC));
        fx.log.record(&sample_result("t"), &good, false).unwrap();
        drain(&mut fx.receiver);
        let bad = result_file_name(datetime!(2024-01-02 03:04:05.007 UTC));
        fs::write(fx.log.storage_dir().join(&bad), "not json").unwrap();

        fx.log.reload().unwrap();
        let messages = drain(&mut fx.receiver);
        assert_eq!(messages.len(), 1);
        assert!(matches!(&messages[0], HistoryMessage::AddHistory { file_name, .. } if *file_name == good));
        assert_eq!(fx.status.warnings.lock().unwrap().len(), 1);
    }

    #[test]
    fn clear_removes_only_history_files_in_sorted_order() {
        let mut fx = fixture();
        let stamps = [
            datetime!(2024-01-02 03:04:05.006 UTC),
            datetime!(2024-01-02 03:04:05.007 UTC),
            datetime!(2024-01-03 00:00:00.000 UTC),
        ];
        for stamp in stamps.iter().rev() {
            let name = result_file_name(*stamp);
            fx.log.record(&sample_result("t"), &name, false).unwrap();
        }
        fs::write(fx.log.storage_dir().join("notes.txt"), "keep me").unwrap();
        drain(&mut fx.receiver);

        fx.log.clear().unwrap();
        let removed: Vec<String> = drain(&mut fx.receiver)
            .into_iter()
            .filter_map(|message| match message {
                HistoryMessage::RemoveHistory { file_name } => Some(file_name),
                _ => None,
            })
            .collect();
        assert_eq!(
            removed,
            stamps.iter().map(|stamp| result_file_name(*stamp)).collect::<Vec<_>>()
        );
        assert!(fx.log.storage_dir().join("notes.txt").exists());
        assert!(fx.log.history_file_names().unwrap().is_empty());
    }

    #[test]
    fn colliding_names_advance_by_one_millisecond() {
        let fx = fixture();
        let when = datetime!(2024-01-02 03:04:05.006 UTC);
        let (first_when, first) = fx.log.unique_file_name(when);
        assert_eq!(first_when, when);
        fx.log.record(&sample_result("t"), &first, false).unwrap();

        let (second_when, second) = fx.log.unique_file_name(when);
        assert_eq!(second_when, when + Duration::milliseconds(1));
        assert_eq!(second, "gremlin-result-2024-01-02-03-04-05-007.json");
        assert!(first < second);
    }
}
