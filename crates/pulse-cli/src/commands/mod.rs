pub mod report;
pub mod run;
pub mod validate;

use std::path::{Path, PathBuf};

pub const RESULT_FILE: &str = "pulse_result.json";
pub const LOG_FILE: &str = "pulse_log.json";
pub const REPORT_FILE: &str = "index.html";

/// Output file locations under one data directory.
pub struct DataPaths {
    pub result: PathBuf,
    pub log: PathBuf,
    pub report: PathBuf,
}

impl DataPaths {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            result: data_dir.join(RESULT_FILE),
            log: data_dir.join(LOG_FILE),
            report: data_dir.join(REPORT_FILE),
        }
    }
}
