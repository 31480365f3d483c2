use crate::connection::ConnectionManager;
use crate::history::HistoryLog;
use crate::status::StatusSink;
use graphex_backend_client::attributes;
use graphex_protocol::ExecutionResult;
use graphex_protocol::display_timestamp;
use std::sync::Arc;
use time::OffsetDateTime;

/// Runs one query against a collection and feeds the outcome into the
/// history log. Failures never escape: they are surfaced to the operator
/// and the pipeline stops without writing a record.
pub struct QueryExecutor {
    connection: Arc<ConnectionManager>,
    history: Arc<HistoryLog>,
    status: Arc<dyn StatusSink>,
}

impl QueryExecutor {
    pub fn new(
        connection: Arc<ConnectionManager>,
        history: Arc<HistoryLog>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            connection,
            history,
            status,
        }
    }

    /// Execute `query_text` against `target`, connecting first if no session
    /// is open. Returns the recorded history file name on success.
    pub async fn execute(&self, target: &str, query_text: &str) -> Option<String> {
        let query = query_text.trim();
        if query.is_empty() {
            self.status.warn("no query text found");
            return None;
        }

        if !self.connection.is_connected().await {
            let _ = self.connection.connect(target).await;
        }
        if !self.connection.is_connected().await {
            self.status
                .warn("no query target selected, please select a collection to run the query on");
            return None;
        }

        let when = OffsetDateTime::now_utc();
        let (when, file_name) = self.history.unique_file_name(when);

        let response = match self.connection.submit(query).await {
            Ok(response) => response,
            Err(err) => {
                self.status.error(&format!("query failed: {err}"));
                return None;
            }
        };

        let result = ExecutionResult {
            when: display_timestamp(when),
            query: query.to_string(),
            target: target.to_string(),
            activity_id: response.attribute(attributes::ACTIVITY_ID),
            status_code: response.attribute(attributes::STATUS_CODE),
            request_charge: response.attribute(attributes::REQUEST_CHARGE),
            total_request_charge: response.attribute(attributes::TOTAL_REQUEST_CHARGE),
            server_time_milliseconds: response.attribute(attributes::SERVER_TIME_MS),
            total_server_time_milliseconds: response
                .attribute(attributes::TOTAL_SERVER_TIME_MS),
            items: response.items,
        };

        self.status.info(&format!(
            "total request charge: {}",
            result.total_request_charge
        ));

        if let Err(err) = self.history.record(&result, &file_name, true) {
            self.status
                .error(&format!("failed to record query result: {err}"));
            return None;
        }
        Some(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::FakeBackend;
    use crate::test_helpers::RecordingStatus;
    use crate::test_helpers::RecordingViewer;
    use graphex_protocol::HistoryMessage;
    use graphex_protocol::RESULT_FILE_PREFIX;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::sync::atomic::Ordering;
    use tempfile::tempdir;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Fixture {
        backend: FakeBackend,
        executor: QueryExecutor,
        receiver: UnboundedReceiver<HistoryMessage>,
        viewer: Arc<RecordingViewer>,
        status: Arc<RecordingStatus>,
        dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempdir().unwrap();
        let backend = FakeBackend::with_catalog(&[("db1", &["coll1"])]);
        let status = Arc::new(RecordingStatus::default());
        let viewer = Arc::new(RecordingViewer::default());
        let connection = Arc::new(ConnectionManager::new(
            Arc::new(backend.clone()),
            status.clone(),
        ));
        let (history, receiver) = HistoryLog::new(
            dir.path().to_path_buf(),
            viewer.clone(),
            status.clone(),
        );
        let executor = QueryExecutor::new(connection, Arc::new(history), status.clone());
        Fixture {
            backend,
            executor,
            receiver,
            viewer,
            status,
            dir,
        }
    }

    #[tokio::test]
    async fn execute_connects_records_and_opens_the_result() {
        let mut fx = fixture();
        let file_name = fx
            .executor
            .execute("/dbs/db1/colls/coll1", "g.V().count()")
            .await
            .expect("executed");
        assert!(file_name.starts_with(RESULT_FILE_PREFIX));

        // The session was opened against the requested target.
        assert_eq!(
            fx.backend.state.opened.lock().unwrap().as_slice(),
            ["/dbs/db1/colls/coll1"]
        );
        assert_eq!(
            fx.backend.state.submitted.lock().unwrap().as_slice(),
            [(
                "/dbs/db1/colls/coll1".to_string(),
                "g.V().count()".to_string()
            )]
        );

        // The record landed on disk with the echoed query and target.
        let content = fs::read_to_string(fx.dir.path().join(&file_name)).unwrap();
        let stored: ExecutionResult = serde_json::from_str(&content).unwrap();
        assert_eq!(stored.query, "g.V().count()");
        assert_eq!(stored.target, "/dbs/db1/colls/coll1");
        assert_eq!(stored.activity_id, "a-1");
        assert_eq!(stored.status_code, "200");
        assert_eq!(stored.total_request_charge, "5.58");

        // One add-history message, and the fresh result was auto-opened.
        let message = fx.receiver.try_recv().unwrap();
        assert!(
            matches!(&message, HistoryMessage::AddHistory { file_name: sent, .. } if *sent == file_name)
        );
        assert_eq!(fx.viewer.opened.lock().unwrap().as_slice(), [file_name]);
    }

    #[tokio::test]
    async fn blank_query_text_is_rejected_without_side_effects() {
        let mut fx = fixture();
        assert!(fx.executor.execute("/dbs/db1/colls/coll1", "  \n").await.is_none());
        assert_eq!(fx.status.warnings.lock().unwrap().len(), 1);
        assert!(fx.backend.state.opened.lock().unwrap().is_empty());
        assert!(fx.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn unreachable_target_produces_no_record() {
        let mut fx = fixture();
        fx.backend.state.fail_open.store(true, Ordering::SeqCst);
        assert!(
            fx.executor
                .execute("/dbs/db1/colls/coll1", "g.V()")
                .await
                .is_none()
        );
        // One error for the failed open, one warning for the missing target.
        assert_eq!(fx.status.errors.lock().unwrap().len(), 1);
        assert_eq!(fx.status.warnings.lock().unwrap().len(), 1);
        assert!(fx.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_submission_is_surfaced_and_not_recorded() {
        let mut fx = fixture();
        fx.backend.state.fail_submit.store(true, Ordering::SeqCst);
        assert!(
            fx.executor
                .execute("/dbs/db1/colls/coll1", "g.V()")
                .await
                .is_none()
        );
        assert_eq!(fx.status.errors.lock().unwrap().len(), 1);
        assert!(fx.receiver.try_recv().is_err());
        assert!(fx.viewer.opened.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn existing_session_is_reused_across_executions() {
        let fx = fixture();
        fx.executor
            .execute("/dbs/db1/colls/coll1", "g.V().count()")
            .await
            .expect("first");
        fx.executor
            .execute("/dbs/db1/colls/coll1", "g.E().count()")
            .await
            .expect("second");
        assert_eq!(fx.backend.state.opened.lock().unwrap().len(), 1);
        assert_eq!(fx.backend.state.submitted.lock().unwrap().len(), 2);
    }
}
