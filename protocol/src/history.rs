use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

/// File name prefix for persisted history records. Files in the storage
/// directory that do not carry this prefix are invisible to history
/// operations.
pub const RESULT_FILE_PREFIX: &str = "gremlin-result-";

/// Uri scheme under which stored results are exposed to the viewer.
pub const RESULT_SCHEME: &str = "gremlin-res";

/// One executed query and its outcome. Written to durable storage once and
/// never mutated in place; metric fields echo the backend's `x-ms-*`
/// response attributes verbatim.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub when: String,
    pub query: String,
    pub target: String,

    #[serde(default)]
    pub items: Vec<Value>,

    pub activity_id: String,

    pub status_code: String,
    pub request_charge: String,
    pub total_request_charge: String,
    pub server_time_milliseconds: String,
    pub total_server_time_milliseconds: String,
}

/// Message exchanged between the history log and the presentation surface.
/// `add-history`/`remove-history` flow log → surface; `rerun-query` and
/// `open-result` flow surface → log. The channel carries no acknowledgement
/// and no backpressure.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum HistoryMessage {
    AddHistory {
        file_name: String,
        result: ExecutionResult,
    },
    RemoveHistory {
        file_name: String,
    },
    RerunQuery {
        query: String,
        target: String,
    },
    OpenResult {
        file_name: String,
    },
}

/// History file name for a result captured at `when`. Every numeric field is
/// fixed width and zero padded so lexicographic ordering of names equals
/// chronological ordering of creation.
pub fn result_file_name(when: OffsetDateTime) -> String {
    format!(
        "{RESULT_FILE_PREFIX}{:04}-{:02}-{:02}-{:02}-{:02}-{:02}-{:03}.json",
        when.year(),
        u8::from(when.month()),
        when.day(),
        when.hour(),
        when.minute(),
        when.second(),
        when.millisecond(),
    )
}

/// Human-readable timestamp stored in [`ExecutionResult::when`].
pub fn display_timestamp(when: OffsetDateTime) -> String {
    format!(
        "{:04}.{:02}.{:02} - {:02}:{:02}:{:02}.{:03}",
        when.year(),
        u8::from(when.month()),
        when.day(),
        when.hour(),
        when.minute(),
        when.second(),
        when.millisecond(),
    )
}

pub fn is_result_file_name(name: &str) -> bool {
    name.starts_with(RESULT_FILE_PREFIX)
}

/// Uri under which the viewer resolves a stored result file.
pub fn result_uri(file_name: &str) -> String {
    format!("{RESULT_SCHEME}:{file_name}")
}
