//! Run sessions
//!
//! Every run of an executable gets its own directory under the software root, holding the log
//! file and a copy of each parameter file the run was configured with. The session also fixes the
//! epoch used for the elapsed time stamp on every log record.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal imports
use crate::{host, params, time};

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static SESSION_EPOCH: OnceCell<DateTime<Utc>> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Chrono format of the timestamp appended to session directory names.
const DIR_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Name of the subdirectory of a session holding its parameter snapshot.
const PARAMS_SNAPSHOT_DIR: &str = "params";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Paths belonging to the current run.
#[derive(Clone, Debug)]
pub struct Session {
    /// Name of the executable which started the session
    pub exec_name: String,

    /// Directory holding everything written during this run
    pub session_root: PathBuf,

    /// The log file, inside `session_root`
    pub log_file_path: PathBuf,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("The software root environment variable ({}) is not set", host::SW_ROOT_ENV_VAR)]
    SwRootNotSet,

    #[error("A session has already been started by this process")]
    AlreadyStarted,

    #[error("Cannot create {0:?}: {1}")]
    CannotCreateDir(PathBuf, std::io::Error),

    #[error("Cannot snapshot parameter file {0:?}: {1}")]
    CannotSnapshotParams(PathBuf, std::io::Error),

    #[error("Cannot resolve parameter file path: {0}")]
    ParamsPath(params::LoadError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start the session for this process.
    ///
    /// Creates `$LINE_SW_ROOT/{sessions_dir}/{exec_name}_{timestamp}`. Only one session may be
    /// started per process.
    pub fn new(exec_name: &str, sessions_dir: &str) -> Result<Self, SessionError> {
        let root = host::get_sw_root().map_err(|_| SessionError::SwRootNotSet)?;

        Self::new_in(root.join(sessions_dir), exec_name)
    }

    /// Start the session inside an explicit parent directory.
    pub fn new_in<P: AsRef<Path>>(parent: P, exec_name: &str) -> Result<Self, SessionError> {
        SESSION_EPOCH
            .try_init_once(Utc::now)
            .map_err(|_| SessionError::AlreadyStarted)?;
        let epoch = get_epoch().ok_or(SessionError::AlreadyStarted)?;

        let session_root = parent.as_ref().join(format!(
            "{}_{}",
            exec_name,
            epoch.format(DIR_TIMESTAMP_FORMAT)
        ));
        fs::create_dir_all(&session_root)
            .map_err(|e| SessionError::CannotCreateDir(session_root.clone(), e))?;

        let log_file_path = session_root.join(format!("{}.log", exec_name));

        Ok(Session {
            exec_name: String::from(exec_name),
            session_root,
            log_file_path,
        })
    }

    /// Copy the named parameter files (relative to `$LINE_SW_ROOT/params`) into the session, so
    /// the configuration of a run can be recovered after the files are edited.
    pub fn snapshot_params(&self, param_files: &[&str]) -> Result<(), SessionError> {
        let snapshot_dir = self.session_root.join(PARAMS_SNAPSHOT_DIR);
        fs::create_dir_all(&snapshot_dir)
            .map_err(|e| SessionError::CannotCreateDir(snapshot_dir.clone(), e))?;

        for name in param_files {
            let src = params::path(name).map_err(SessionError::ParamsPath)?;
            let dst = snapshot_dir.join(name);

            fs::copy(&src, &dst)
                .map_err(|e| SessionError::CannotSnapshotParams(src.clone(), e))?;
            debug!("Saved {:?} to {:?}", src, dst);
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Seconds since the session was started, NaN if no session has been started yet.
pub fn get_elapsed_seconds() -> f64 {
    get_epoch()
        .and_then(|e| time::duration_to_seconds(Utc::now() - *e))
        .unwrap_or(std::f64::NAN)
}

/// The session's epoch, if a session has been started.
pub fn get_epoch() -> Option<&'static DateTime<Utc>> {
    SESSION_EPOCH.get()
}
