//! Main aiming executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise AimCtrl from its parameter and calibration files
//!     - Start the IMU and detection stream clients, which forward events to one channel
//!     - Main loop:
//!         - Take the next event from the channel
//!         - AimCtrl processing of the event
//!         - Publish the velocity command, if the event produced one
//!         - Reload the AimCtrl parameters if the file has changed
//!
//! # Arguments
//!
//! An optional single argument names the calibration profile to use instead of the default in
//! `calib.toml`.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use aim_lib::{
    aim_ctrl::{AimCtrl, InitData, Params},
    cmd_server::{CmdServer, CmdSink},
    stream_client::StreamClient
};
use comms_if::net::NetParams;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error, info, warn};
use std::env;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};
use color_eyre::{Report, eyre::{WrapErr, eyre}};

// Internal
use util::{
    host,
    module::State,
    logger::{logger_init, LevelFilter},
    params::ParamWatcher,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Controller parameter file, reloaded when it changes.
const AIM_CTRL_PARAMS: &str = "aim_ctrl.toml";

/// Calibration profile file.
const CALIB_PARAMS: &str = "calib.toml";

/// Minimum time between checks of the parameter file.
const PARAM_POLL_PERIOD: Duration = Duration::from_secs(1);

/// Maximum time the loop waits for an event before doing its housekeeping.
const EVENT_TIMEOUT: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "aim_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Self-Aiming Gimbal Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let net_params: NetParams = util::params::load(
        "net.toml"
    ).wrap_err("Could not load net params")?;

    info!("Exec parameters loaded");

    // Collect all arguments
    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    let profile = match args.len() {
        1 => None,
        2 => {
            info!("Using calibration profile \"{}\" from the command line", &args[1]);
            Some(args[1].clone())
        },
        n => return Err(eyre!(
            "Expected either zero or one argument, found {}", n.saturating_sub(1)
        ))
    };

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut aim_ctrl = AimCtrl::default();
    aim_ctrl.init(
        InitData {
            params_file: AIM_CTRL_PARAMS.into(),
            calib_file: CALIB_PARAMS.into(),
            profile
        },
        &session
    ).wrap_err("Failed to initialise AimCtrl")?;
    info!("AimCtrl init complete");

    let mut param_watcher = ParamWatcher::new(AIM_CTRL_PARAMS)
        .wrap_err("Failed to watch the AimCtrl parameters")?;

    info!("Module initialisation complete\n");

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = comms_if::net::zmq::Context::new();

    let (event_tx, event_rx) = mpsc::channel();

    let imu_client = StreamClient::imu(&zmq_ctx, &net_params, event_tx.clone())
        .wrap_err("Failed to initialise the ImuClient")?;
    info!("ImuClient initialised");

    let det_client = StreamClient::detections(&zmq_ctx, &net_params, event_tx)
        .wrap_err("Failed to initialise the DetClient")?;
    info!("DetClient initialised");

    let mut cmd_server = CmdServer::new(&zmq_ctx, &net_params)
        .wrap_err("Failed to initialise the CmdServer")?;
    info!("CmdServer initialised");

    info!("Network initialisation complete");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut last_param_poll = Instant::now();

    loop {

        // ---- EVENT PROCESSING ----

        match event_rx.recv_timeout(EVENT_TIMEOUT) {
            Ok(event) => match aim_ctrl.proc(&event) {
                Ok((Some(cmd), report)) => {
                    debug!("AimCtrl report: {:?}", report);

                    if let Err(e) = cmd_server.send_cmd(&cmd) {
                        warn!("CmdServer error: {}", e);
                    }
                },
                Ok((None, _)) => (),
                Err(e) => warn!("Error during AimCtrl processing: {}", e)
            },
            Err(RecvTimeoutError::Timeout) => (),
            Err(RecvTimeoutError::Disconnected) => {
                error!("All stream clients have stopped");
                break
            }
        }

        // ---- CLIENT MONITORING ----

        for client in [&imu_client, &det_client].iter() {
            if !client.is_running() {
                return Err(eyre!("The {} has stopped", client.name()));
            }
        }

        // ---- PARAMETER RELOAD ----

        if last_param_poll.elapsed() >= PARAM_POLL_PERIOD {
            last_param_poll = Instant::now();

            match param_watcher.poll::<Params>() {
                Some(Ok(p)) => {
                    info!("AimCtrl parameters changed: {:?}", p);
                    aim_ctrl.set_params(p);
                },
                Some(Err(e)) => warn!(
                    "Could not reload the AimCtrl parameters, keeping the previous ones: {}", e
                ),
                None => ()
            }
        }
    }

    // ---- SHUTDOWN ----

    info!("{} commands sent", cmd_server.num_sent());
    info!("End of execution");

    Ok(())
}
