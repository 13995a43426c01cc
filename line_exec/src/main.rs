//! Main line follower executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and parameters
//!     - Initialise the equipment and all modules
//!     - Main loop (run by `FollowCtrl`), per tick:
//!         - Telecommand processing (from the script, if one is given)
//!         - Sensor acquisition and filtering
//!         - Line error estimation
//!         - Steering control or line recovery
//!         - Locomotion control
//!         - Chassis demands
//!     - Shutdown: stop the wheels and centre the steering
//!
//! # Modules
//!
//! All modules (e.g. `loco_ctrl`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.
//!
//! # Equipment
//!
//! The sensor and motor boards are driven by an external process, so this executable runs against
//! the simulated equipment in `eqpt::sim`, configured by `sim.toml`.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use line_lib::{
    eqpt::sim::{SimParams, SimWorld},
    follow_ctrl::{self, FollowCtrl},
    line_est::LineEst,
    loco_ctrl::LocoCtrl,
    params::LineExecParams,
    sensor_array::SensorArray,
    steer_ctrl::SteerCtrl
};

mod tc_processor;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::path::PathBuf;
use log::{debug, info};
use color_eyre::{Report, eyre::WrapErr};
use structopt::StructOpt;

// Internal
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
    script_interpreter::{ScriptInterpreter, PendingTcs}
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Parameter files copied into the session directory at startup
const PARAM_FILES: [&str; 7] = [
    "line_exec.toml",
    "sim.toml",
    "sensor_array.toml",
    "line_est.toml",
    "steer_ctrl.toml",
    "loco_ctrl.toml",
    "follow_ctrl.toml",
];

// ---------------------------------------------------------------------------
// STRUCTURES
// ---------------------------------------------------------------------------

/// Line follower executable
#[derive(Debug, StructOpt)]
#[structopt(name = "line_exec")]
struct Opt {
    /// Telecommand script to execute. The loop stops at the end of the script.
    #[structopt(parse(from_os_str))]
    script: Option<PathBuf>,

    /// Stop after this many cycles
    #[structopt(short, long)]
    cycles: Option<u64>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    let exec_params: LineExecParams = util::params::load("line_exec.toml")
        .wrap_err("Could not load exec params")?;

    // Initialise session
    let session = Session::new(
        "line_exec",
        &exec_params.sessions_dir
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    let log_level: LevelFilter = exec_params.log_level
        .parse()
        .wrap_err_with(|| format!("Invalid log level \"{}\"", exec_params.log_level))?;
    logger_init(log_level, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Line Follower Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI arguments: {:?}", opt);

    session.snapshot_params(&PARAM_FILES)
        .wrap_err("Failed to save the parameter snapshot")?;

    // ---- INITIALISE TC SOURCE ----

    let mut script = match opt.script {
        Some(ref path) => {
            info!("Loading script from {:?}", path);

            let si = ScriptInterpreter::new(path)
                .wrap_err("Failed to load script")?;

            info!(
                "Loaded script lasts {:.02} s and contains {} TCs\n",
                si.get_duration(),
                si.get_num_tcs()
            );

            Some(si)
        },
        None => {
            info!("No script provided, following until the cycle limit or a stop\n");
            None
        }
    };

    // ---- INITIALISE EQUIPMENT ----

    let sim_params: SimParams = util::params::load("sim.toml")
        .wrap_err("Could not load sim params")?;
    let world = SimWorld::new(sim_params);
    let (sensor, chassis) = SimWorld::eqpt(&world);
    info!("Simulated equipment initialised");

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut sensor_array = SensorArray::new(sensor, Default::default())
        .wrap_err("Failed to create SensorArray")?;
    sensor_array.init("sensor_array.toml")
        .wrap_err("Failed to initialise SensorArray")?;
    info!("SensorArray init complete");

    let mut line_est = LineEst::new(Default::default())
        .wrap_err("Failed to create LineEst")?;
    line_est.init("line_est.toml")
        .wrap_err("Failed to initialise LineEst")?;
    info!("LineEst init complete");

    let mut steer_ctrl = SteerCtrl::new(Default::default())
        .wrap_err("Failed to create SteerCtrl")?;
    steer_ctrl.init("steer_ctrl.toml")
        .wrap_err("Failed to initialise SteerCtrl")?;
    info!("SteerCtrl init complete");

    let mut loco_ctrl = LocoCtrl::new(Default::default())
        .wrap_err("Failed to create LocoCtrl")?;
    loco_ctrl.init("loco_ctrl.toml")
        .wrap_err("Failed to initialise LocoCtrl")?;
    info!("LocoCtrl init complete");

    let follow_params: follow_ctrl::Params = util::params::load("follow_ctrl.toml")
        .wrap_err("Could not load FollowCtrl params")?;
    let mut follow_ctrl = FollowCtrl::new(
        follow_params,
        sensor_array,
        line_est,
        steer_ctrl,
        loco_ctrl,
        chassis
    ).wrap_err("Failed to initialise FollowCtrl")?;
    info!("FollowCtrl init complete");

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    let max_cycles = opt.cycles.or(exec_params.max_cycles);

    let summary = follow_ctrl.run(max_cycles, |now_s, handle| {
        if let Some(ref mut si) = script {
            match si.get_pending_tcs(now_s) {
                PendingTcs::None => (),
                PendingTcs::Some(tc_vec) => {
                    for tc in tc_vec.iter() {
                        tc_processor::exec(handle, tc);
                    }
                },
                // Exit if end of script reached
                PendingTcs::EndOfScript => {
                    info!("End of TC script reached, stopping");
                    handle.request_stop();
                }
            }
        }
    }).wrap_err("Line following failed")?;

    // ---- SHUTDOWN ----

    let offset_m = match world.lock() {
        Ok(w) => Some(w.offset_m()),
        Err(_) => None
    };
    info!(
        "Ran {} cycles ({} overrun(s), {} skipped), final line offset {:?} m",
        summary.num_ticks,
        summary.num_overruns,
        summary.num_skipped_slots,
        offset_m
    );

    info!("End of execution");

    Ok(())
}
