//! # Detection Test Publisher
//!
//! Publishes armor detections at random positions so that the aiming executable can be exercised
//! without a camera or detector. Each axis of the position is drawn uniformly from the integers in
//! `[-range, range)` and every detection is timestamped with the current time.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{thread, time::Duration};

use chrono::Utc;
use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use comms_if::{eqpt::aim::ArmorDetection, net::{zmq, MonitoredSocket}};
use log::info;
use rand::Rng;
use structopt::StructOpt;
use util::{
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "det_test_pub", about = "Publishes random armor detections")]
struct Args {
    /// Endpoint to bind the publisher to
    #[structopt(short, long, default_value = "tcp://*:5011")]
    endpoint: String,

    /// Number of detections published per second
    #[structopt(short, long, default_value = "2.0")]
    rate_hz: f64,

    /// Positions are drawn from [-range, range) on each axis
    #[structopt(long, default_value = "5000")]
    range: i64,

    /// Stop after this many detections, publish forever if not given
    #[structopt(short, long)]
    count: Option<u64>,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    let args = Args::from_args();

    if !(args.rate_hz.is_finite() && args.rate_hz > 0.0) {
        return Err(eyre!("The rate must be a positive number, found {}", args.rate_hz));
    }
    if args.range <= 0 {
        return Err(eyre!("The range must be positive, found {}", args.range));
    }

    // ---- EARLY INITIALISATION ----

    let session = Session::new("det_test_pub", "sessions")
        .wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Info, &session).wrap_err("Failed to initialise logging")?;

    info!("Detection Test Publisher\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- INITIALISE NETWORK ----

    let zmq_ctx = zmq::Context::new();
    let socket = MonitoredSocket::publisher(&zmq_ctx, &args.endpoint)
        .wrap_err("Failed to create the publisher")?;

    info!("Publishing on {} at {} Hz", args.endpoint, args.rate_hz);

    // ---- MAIN LOOP ----

    let period = Duration::from_secs_f64(1.0 / args.rate_hz);
    let mut rng = rand::thread_rng();
    let mut num_sent = 0u64;

    while args.count.map_or(true, |c| num_sent < c) {
        let det = ArmorDetection {
            timestamp: Utc::now(),
            position: [
                rng.gen_range(-args.range..args.range) as f64,
                rng.gen_range(-args.range..args.range) as f64,
                rng.gen_range(-args.range..args.range) as f64,
            ],
        };

        let msg = serde_json::to_string(&det).wrap_err("Failed to serialize the detection")?;
        socket.send(&msg, 0).wrap_err("Failed to send the detection")?;
        num_sent += 1;

        info!("Published detection at {:?}", det.position);

        thread::sleep(period);
    }

    info!("Published {} detections", num_sent);

    Ok(())
}
