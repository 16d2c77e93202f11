use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Locations the router reads from and writes to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoConfig {
    /// File of newline delimited envelopes. Standard input is read when unset.
    #[serde(default)]
    pub input_path: Option<PathBuf>,
    /// Directory receiving one `<destination>.jsonl` file per destination.
    pub output_dir: PathBuf,
    /// File receiving dead letter records.
    pub dead_letter_path: PathBuf,
}

impl IoConfig {
    /// Returns the file records of `destination` are appended to.
    pub fn output_path(&self, destination: &str) -> PathBuf {
        self.output_dir.join(format!("{destination}.jsonl"))
    }
}
