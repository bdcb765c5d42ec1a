//! # Stream Client
//!
//! Subscribes to the IMU and detection streams. Each client owns a background thread which reads
//! messages from its socket, deserializes them and forwards them as [`AimEvent`]s onto a channel
//! shared by all clients. The receiving end of the channel is the executable's only dispatcher,
//! so events are handled one at a time in arrival order.
//!
//! Malformed messages are logged and dropped, they never reach the controller.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    convert::TryFrom,
    sync::{Arc, atomic::{AtomicBool, Ordering}, mpsc::Sender},
    thread::{self, JoinHandle}
};
use log::{error, warn};
use serde::de::DeserializeOwned;

use crate::{
    aim_ctrl::AimEvent,
    frame_tf::TargetDetection,
    orient_hist::{OrientationSample, SampleError}
};
use comms_if::{
    eqpt::{aim::ArmorDetection, imu::ImuSample},
    net::{MonitoredSocket, MonitoredSocketError, NetParams, zmq}
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Receive timeout of the stream sockets, bounds how long a stop request takes to be seen.
const RECV_TIMEOUT_MS: i32 = 50;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A subscriber to one stream.
pub struct StreamClient {
    name: &'static str,
    bg_jh: Option<JoinHandle<()>>,
    bg_run: Arc<AtomicBool>,
    bg_alive: Arc<AtomicBool>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StreamClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not deserialize the message: {0}")]
    DeserializeError(serde_json::Error),

    #[error("Invalid IMU sample: {0}")]
    InvalidSample(SampleError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl StreamClient {
    /// Subscribe to the IMU attitude stream.
    pub fn imu(
        ctx: &zmq::Context,
        params: &NetParams,
        tx: Sender<AimEvent>
    ) -> Result<Self, StreamClientError> {
        Self::new(ctx, &params.imu_endpoint, "ImuClient", tx, |sample: ImuSample| {
            OrientationSample::try_from(&sample)
                .map(AimEvent::Orientation)
                .map_err(StreamClientError::InvalidSample)
        })
    }

    /// Subscribe to the armor detection stream.
    pub fn detections(
        ctx: &zmq::Context,
        params: &NetParams,
        tx: Sender<AimEvent>
    ) -> Result<Self, StreamClientError> {
        Self::new(ctx, &params.det_endpoint, "DetClient", tx, |det: ArmorDetection| {
            Ok(AimEvent::Detection(TargetDetection::from(&det)))
        })
    }

    /// Subscribe to `endpoint`, converting each message of type `M` into an event.
    ///
    /// This function will not block until the publisher connects.
    pub fn new<M, F>(
        ctx: &zmq::Context,
        endpoint: &str,
        name: &'static str,
        tx: Sender<AimEvent>,
        convert: F
    ) -> Result<Self, StreamClientError>
    where
        M: DeserializeOwned + 'static,
        F: Fn(M) -> Result<AimEvent, StreamClientError> + Send + 'static
    {
        let socket = MonitoredSocket::subscriber(ctx, endpoint, RECV_TIMEOUT_MS)
            .map_err(StreamClientError::SocketError)?;

        let bg_run = Arc::new(AtomicBool::new(true));
        let bg_alive = Arc::new(AtomicBool::new(true));

        let bg_run_clone = bg_run.clone();
        let bg_alive_clone = bg_alive.clone();

        let bg_jh = Some(thread::spawn(move || {
            bg_thread(socket, name, bg_run_clone, tx, convert);
            bg_alive_clone.store(false, Ordering::Relaxed);
        }));

        Ok(Self {
            name,
            bg_jh,
            bg_run,
            bg_alive
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// False once the background thread has stopped.
    pub fn is_running(&self) -> bool {
        self.bg_alive.load(Ordering::Relaxed)
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        self.bg_run.store(false, Ordering::Relaxed);

        if let Some(jh) = self.bg_jh.take() {
            if jh.join().is_err() {
                error!("{} background thread panicked", self.name);
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Decode one message into an event.
fn decode<M, F>(msg: &str, convert: &F) -> Result<AimEvent, StreamClientError>
where
    M: DeserializeOwned,
    F: Fn(M) -> Result<AimEvent, StreamClientError>
{
    let record: M = serde_json::from_str(msg)
        .map_err(StreamClientError::DeserializeError)?;

    convert(record)
}

/// Background thread, forwards each valid message from the socket onto the channel.
fn bg_thread<M, F>(
    socket: MonitoredSocket,
    name: &'static str,
    run: Arc<AtomicBool>,
    tx: Sender<AimEvent>,
    convert: F
)
where
    M: DeserializeOwned,
    F: Fn(M) -> Result<AimEvent, StreamClientError>
{
    // While instructed to run
    while run.load(Ordering::Relaxed) {
        let msg = match socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => {
                warn!("{}: non UTF-8 message", name);
                continue
            },
            Err(zmq::Error::EAGAIN) => continue,
            Err(e) => {
                error!("{}: error receiving message: {}", name, e);
                break
            }
        };

        let event = match decode(&msg, &convert) {
            Ok(e) => e,
            Err(e) => {
                warn!("{}: dropping message: {}", name, e);
                continue
            }
        };

        // The dispatcher has gone, nothing left to do
        if tx.send(event).is_err() {
            break
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::{sync::mpsc, time::Duration};

    fn params(name: &str) -> NetParams {
        NetParams {
            imu_endpoint: format!("inproc://{}_imu", name),
            det_endpoint: format!("inproc://{}_det", name),
            cmd_endpoint: format!("inproc://{}_cmd", name),
        }
    }

    #[test]
    fn test_decode_imu() {
        let convert = |s: ImuSample| OrientationSample::try_from(&s)
            .map(AimEvent::Orientation)
            .map_err(StreamClientError::InvalidSample);

        let ok = decode(
            r#"{"timestamp": 1000000000, "quaternion": [1.0, 0.0, 0.0, 0.0]}"#,
            &convert
        );
        match ok {
            Ok(AimEvent::Orientation(s)) => assert_eq!(s.timestamp().timestamp(), 1),
            r => panic!("Expected an orientation, got {:?}", r)
        }

        assert!(matches!(
            decode(r#"{"timestamp": 0, "quaternion": [0.0, 0.0, 0.0, 0.0]}"#, &convert),
            Err(StreamClientError::InvalidSample(_))
        ));
        assert!(matches!(
            decode("not json", &convert),
            Err(StreamClientError::DeserializeError(_))
        ));
    }

    #[test]
    fn test_detection_stream() {
        let ctx = zmq::Context::new();
        let params = params("stream_client_test");

        let publisher = MonitoredSocket::publisher(&ctx, &params.det_endpoint).unwrap();

        let (tx, rx) = mpsc::channel();
        let client = StreamClient::detections(&ctx, &params, tx).unwrap();
        assert!(client.is_running());

        // Subscriptions propagate asynchronously, so keep publishing until one arrives
        let mut event = None;
        for _ in 0..50 {
            publisher.send("{\"garbage\": true}", 0).unwrap();
            publisher.send(
                r#"{"timestamp": 5000000, "position": [10.0, 20.0, 500.0]}"#,
                0
            ).unwrap();

            if let Ok(e) = rx.recv_timeout(Duration::from_millis(50)) {
                event = Some(e);
                break;
            }
        }

        match event {
            Some(AimEvent::Detection(det)) => {
                assert_eq!(det.timestamp().timestamp_millis(), 5);
                assert_eq!(det.position()[2], 500.0);
            },
            e => panic!("Expected a detection, got {:?}", e)
        }

        drop(client);
    }
}
