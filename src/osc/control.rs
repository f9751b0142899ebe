//! Inbound OSC control server.
//!
//! A single-threaded UDP server listening for tuning updates from the
//! engine. Three addresses are recognized:
//!
//! | Address | Arguments | Effect |
//! |---------|-----------|--------|
//! | `/sensors` | variadic ints | replace the sensor selection wholesale |
//! | `/analyzer_channels` | 2 ints (left, right) | retarget both trigger channels, resend |
//! | `/analyzer_thresholds` | 2 floats (left, right) | retune both trigger thresholds, resend |
//!
//! Arguments are validated before any state is touched: a malformed message
//! is logged and leaves both local state and the server untouched. Updates
//! that change an analyzer run the four-step resend sequence against the
//! acquisition server.

use crate::analyzer::AnalyzerDescriptor;
use crate::error::{Error, Result};
use crate::protocol::Command;
use crate::session::Session;
use rosc::{decoder, OscMessage, OscPacket, OscType};
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Sensor-selection replacement (variadic ints).
pub const ADDR_SENSORS: &str = "/sensors";
/// Left/right trigger channel pair (2 ints).
pub const ADDR_ANALYZER_CHANNELS: &str = "/analyzer_channels";
/// Left/right trigger threshold pair (2 floats).
pub const ADDR_ANALYZER_THRESHOLDS: &str = "/analyzer_thresholds";

/// How often the receive loop checks the shutdown flag.
const RECV_POLL: Duration = Duration::from_millis(500);

pub struct ControlServer {
    socket: UdpSocket,
    session: Arc<Session>,
    shutdown: Arc<AtomicBool>,
}

impl ControlServer {
    /// Bind the control socket.
    ///
    /// The read timeout exists only so the loop can observe the shutdown
    /// flag; message handling itself is blocking and single-threaded.
    pub fn bind(addr: &str, session: Arc<Session>, shutdown: Arc<AtomicBool>) -> Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(Some(RECV_POLL))?;
        Ok(Self {
            socket,
            session,
            shutdown,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Run the receive loop until shutdown.
    pub fn run(&mut self) {
        log::info!("listening for OSC control updates");

        let mut buf = [0u8; decoder::MTU];
        while !self.shutdown.load(Ordering::Relaxed) {
            let len = match self.socket.recv_from(&mut buf) {
                Ok((len, _)) => len,
                Err(e) if is_timeout(&e) => continue,
                Err(e) => {
                    log::error!("control socket receive error: {}", e);
                    break;
                }
            };

            match decoder::decode_udp(&buf[..len]) {
                Ok((_, packet)) => self.dispatch(packet),
                Err(e) => log::warn!("undecodable OSC packet: {:?}", e),
            }
        }

        log::info!("control server stopped");
    }

    fn dispatch(&self, packet: OscPacket) {
        match packet {
            OscPacket::Message(msg) => self.handle(msg),
            OscPacket::Bundle(bundle) => {
                for content in bundle.content {
                    self.dispatch(content);
                }
            }
        }
    }

    fn handle(&self, msg: OscMessage) {
        let result = match msg.addr.as_str() {
            ADDR_SENSORS => self.update_selection(&msg.args),
            ADDR_ANALYZER_CHANNELS => self.update_channels(&msg.args),
            ADDR_ANALYZER_THRESHOLDS => self.update_thresholds(&msg.args),
            other => {
                log::debug!("ignoring OSC message for {}", other);
                return;
            }
        };
        if let Err(e) = result {
            log::error!("{} update rejected: {}", msg.addr, e);
        }
    }

    /// Replace the sensor selection wholesale.
    fn update_selection(&self, args: &[OscType]) -> Result<()> {
        let selection = args.iter().map(arg_as_u32).collect::<Result<Vec<u32>>>()?;
        self.session.tuning.lock().selection = selection.clone();
        log::info!("changed current sensors to {:?}", selection);
        Ok(())
    }

    fn update_channels(&self, args: &[OscType]) -> Result<()> {
        let (left_arg, right_arg) = pair(args)?;
        let left = arg_as_u32(left_arg)?;
        let right = arg_as_u32(right_arg)?;

        let descriptor = {
            let mut tuning = self.session.tuning.lock();
            tuning.left.set_trigger_channel(left);
            tuning.right.set_trigger_channel(right);
            tuning.left.clone()
        };
        log::info!("updated analyzer channels: {}, {}", left, right);
        self.resend_analyzer(&descriptor);
        Ok(())
    }

    fn update_thresholds(&self, args: &[OscType]) -> Result<()> {
        let (left_arg, right_arg) = pair(args)?;
        let left = arg_as_f64(left_arg)?;
        let right = arg_as_f64(right_arg)?;

        let descriptor = {
            let mut tuning = self.session.tuning.lock();
            tuning.left.set_trigger_threshold(left);
            tuning.right.set_trigger_threshold(right);
            tuning.left.clone()
        };
        log::info!("updated analyzer thresholds: {}, {}", left, right);
        self.resend_analyzer(&descriptor);
        Ok(())
    }

    /// Re-register the analyzer on the acquisition server.
    ///
    /// Four round trips under one command-link lock: remove, push the name,
    /// add, push the full descriptor. The first failure aborts the remaining
    /// steps and leaves the remote side where the failed step left it; there
    /// is no local rollback.
    fn resend_analyzer(&self, descriptor: &AnalyzerDescriptor) {
        let mut link = self.session.link.lock();

        if !link.send_command(Command::RemoveAnalyzer) {
            log::error!("failed to remove existing analyzer, aborting resend");
            return;
        }
        if !link.send_extra_data(&serde_json::json!({ "analyzer": descriptor.name })) {
            log::error!("failed to send analyzer name, aborting resend");
            return;
        }
        if !link.send_command(Command::AddAnalyzer) {
            log::error!("failed to re-add analyzer, aborting resend");
            return;
        }
        if !link.send_extra_data(descriptor) {
            log::error!("failed to send analyzer configuration, aborting resend");
            return;
        }

        log::info!("analyzer configuration updated successfully");
    }
}

fn is_timeout(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

/// Exactly-two-argument accessor shared by the pair updates.
fn pair(args: &[OscType]) -> Result<(&OscType, &OscType)> {
    match args {
        [left, right] => Ok((left, right)),
        _ => Err(Error::Argument(format!(
            "expected 2 arguments, got {}",
            args.len()
        ))),
    }
}

fn arg_as_u32(arg: &OscType) -> Result<u32> {
    let value = match arg {
        OscType::Int(i) => i64::from(*i),
        OscType::Long(l) => *l,
        OscType::Float(f) => *f as i64,
        OscType::Double(d) => *d as i64,
        other => return Err(Error::Argument(format!("not an integer: {:?}", other))),
    };
    u32::try_from(value).map_err(|_| Error::Argument(format!("channel out of range: {}", value)))
}

fn arg_as_f64(arg: &OscType) -> Result<f64> {
    match arg {
        OscType::Float(f) => Ok(f64::from(*f)),
        OscType::Double(d) => Ok(*d),
        OscType::Int(i) => Ok(f64::from(*i)),
        OscType::Long(l) => Ok(*l as f64),
        other => Err(Error::Argument(format!("not a number: {:?}", other))),
    }
}
