use crate::models::ContentMode;
use serde::{Deserialize, Serialize};

/// User configuration from onionize.yaml
///
/// Every field has a default, so a partial (or missing) file is valid.
/// Any field can also be overridden with an `ONIONIZE_<FIELD>` environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Address of the engine's control interface
    pub control_address: String,

    /// Password for the control interface (empty for cookie/none auth)
    pub control_password: String,

    /// Verbose logging and engine diagnostics
    pub debug: bool,

    /// Mode preselected in the window
    pub default_mode: ContentMode,

    /// Initial state of the slug checkbox
    pub slug: bool,

    /// Executable the bundled engine adapter runs
    pub engine_program: String,

    /// Arguments placed before the generated flags (e.g. a wrapper script)
    pub engine_args: Vec<String>,

    /// Directory for rotating log files
    pub log_dir: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            control_address: default_control_address(),
            control_password: String::new(),
            debug: false,
            default_mode: ContentMode::File,
            slug: true,
            engine_program: "onionize".to_string(),
            engine_args: Vec::new(),
            log_dir: "logs".to_string(),
        }
    }
}

pub fn default_control_address() -> String {
    "default://".to_string()
}
