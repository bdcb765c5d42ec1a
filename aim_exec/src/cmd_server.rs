//! # Command Server
//!
//! Publishes the gimbal velocity commands. One command is sent for each processed detection,
//! including the zero command for detections that could not be aimed at.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::aim::VelocityCmd,
    net::{MonitoredSocket, MonitoredSocketError, NetParams, zmq}
};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Destination for velocity commands.
pub trait CmdSink {
    fn send_cmd(&mut self, cmd: &VelocityCmd) -> Result<(), CmdServerError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Velocity command server
pub struct CmdServer {
    socket: MonitoredSocket,

    num_sent: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CmdServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send the command: {0}")]
    SendError(zmq::Error),

    #[error("Could not serialize the command: {0}")]
    SerializationError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CmdServer {
    /// Create a new instance of the command server, bound to the command endpoint.
    ///
    /// This function will not block until a subscriber connects.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, CmdServerError> {
        let socket = MonitoredSocket::publisher(ctx, &params.cmd_endpoint)
            .map_err(CmdServerError::SocketError)?;

        Ok(Self {
            socket,
            num_sent: 0
        })
    }

    /// Whether a subscriber is connected.
    pub fn is_connected(&self) -> bool {
        self.socket.connected()
    }

    /// Number of commands sent since the server was created.
    pub fn num_sent(&self) -> u64 {
        self.num_sent
    }
}

impl CmdSink for CmdServer {
    fn send_cmd(&mut self, cmd: &VelocityCmd) -> Result<(), CmdServerError> {
        let cmd_string = serde_json::to_string(cmd)
            .map_err(CmdServerError::SerializationError)?;

        self.socket.send(&cmd_string, 0)
            .map_err(CmdServerError::SendError)?;

        self.num_sent += 1;

        Ok(())
    }
}

/// In memory sink, keeps every command in order.
impl CmdSink for Vec<VelocityCmd> {
    fn send_cmd(&mut self, cmd: &VelocityCmd) -> Result<(), CmdServerError> {
        self.push(*cmd);
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_vec_sink() {
        let mut sink: Vec<VelocityCmd> = Vec::new();

        sink.send_cmd(&VelocityCmd::zero()).unwrap();
        sink.send_cmd(&VelocityCmd { angular_yaw: 1.0, angular_pitch: -2.0 }).unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(sink[1].angular_pitch, -2.0);
    }

    #[test]
    fn test_server_publishes_json() {
        let ctx = zmq::Context::new();
        let params = NetParams {
            imu_endpoint: "inproc://cmd_test_imu".into(),
            det_endpoint: "inproc://cmd_test_det".into(),
            cmd_endpoint: "inproc://cmd_test_cmd".into(),
        };

        let mut server = CmdServer::new(&ctx, &params).unwrap();
        let sub = MonitoredSocket::subscriber(&ctx, &params.cmd_endpoint, 100).unwrap();

        // Subscriptions propagate asynchronously, so keep sending until one arrives
        let cmd = VelocityCmd { angular_yaw: 0.25, angular_pitch: -0.5 };
        let mut received = None;
        for _ in 0..50 {
            server.send_cmd(&cmd).unwrap();
            if let Ok(Ok(s)) = sub.recv_string(0) {
                received = Some(s);
                break;
            }
        }

        let received: VelocityCmd = serde_json::from_str(&received.unwrap()).unwrap();
        assert_eq!(received, cmd);
        assert!(server.num_sent() >= 1);
    }
}
