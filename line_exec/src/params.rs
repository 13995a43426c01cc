//! # Line Executable Parameters
//!
//! This module provide parameters for the line following executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LineExecParams {

    /// Directory under the software root in which session directories are created
    pub sessions_dir: String,

    /// Lowest level of log record to output, one of `info`, `debug` or `trace`
    pub log_level: String,

    /// Cycle limit used when none is given on the command line
    pub max_cycles: Option<u64>,
}

impl Default for LineExecParams {
    fn default() -> Self {
        Self {
            sessions_dir: String::from("sessions"),
            log_level: String::from("debug"),
            max_cycles: None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse() {
        let p: LineExecParams = util::params::parse("log_level = \"trace\"").unwrap();
        assert_eq!(p.log_level, "trace");
        assert_eq!(p.sessions_dir, "sessions");
        assert_eq!(p.max_cycles, None);
    }
}
