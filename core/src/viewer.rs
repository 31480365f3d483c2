use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use graphex_protocol::RESULT_SCHEME;
use std::fs;
use std::path::PathBuf;

/// Hook invoked when a stored result should be shown to the operator:
/// freshly recorded results with `open_file` set, and explicit
/// `open-result` requests from the surface.
pub trait ResultViewer: Send + Sync {
    fn open(&self, file_name: &str) -> Result<()>;
}

/// Content provider for the `gremlin-res` scheme: given
/// `gremlin-res:{fileName}`, returns the UTF-8 content of the stored file.
#[derive(Clone, Debug)]
pub struct ResultDocumentStore {
    storage_dir: PathBuf,
}

impl ResultDocumentStore {
    pub fn new(storage_dir: PathBuf) -> Self {
        Self { storage_dir }
    }

    pub fn content(&self, uri: &str) -> Result<String> {
        let Some((scheme, file_name)) = uri.split_once(':') else {
            bail!("malformed document uri: {uri}");
        };
        if scheme != RESULT_SCHEME {
            bail!("unsupported document scheme: {scheme}");
        }
        // History files are flat; reject anything that escapes the directory.
        if file_name.contains('/') || file_name.contains("..") {
            bail!("invalid history file name: {file_name}");
        }
        fs::read_to_string(self.storage_dir.join(file_name))
            .with_context(|| format!("read stored result {file_name}"))
    }
}
