//! Outbound OSC telemetry.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use rosc::{encoder, OscMessage, OscPacket, OscType};
use serde_json::Value;
use std::net::{SocketAddr, UdpSocket};

/// Shared OSC/UDP sender.
///
/// One socket serves the data-stream worker, the analyses-stream worker and
/// the control server, so every send passes through the one internal lock.
pub struct TelemetrySender {
    socket: Mutex<UdpSocket>,
    target: SocketAddr,
}

impl TelemetrySender {
    /// Bind an ephemeral local socket aimed at `target`.
    pub fn new(target: &str) -> Result<Self> {
        let target: SocketAddr = target
            .parse()
            .map_err(|_| Error::Config(format!("invalid telemetry address: {}", target)))?;
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        Ok(Self {
            socket: Mutex::new(socket),
            target,
        })
    }

    /// Send one OSC message to the fixed destination.
    pub fn send(&self, address: &str, args: Vec<OscType>) -> Result<()> {
        let packet = OscPacket::Message(OscMessage {
            addr: address.to_string(),
            args,
        });
        let socket = self.socket.lock();
        let bytes = encoder::encode(&packet).map_err(|e| Error::Osc(format!("{:?}", e)))?;
        socket.send_to(&bytes, self.target)?;
        Ok(())
    }

    /// Send a single float value.
    pub fn send_float(&self, address: &str, value: f32) -> Result<()> {
        self.send(address, vec![OscType::Float(value)])
    }
}

/// Map a JSON value onto the closest OSC argument type.
///
/// Values with no OSC counterpart (nested containers, null) are dropped.
pub fn osc_arg(value: &Value) -> Option<OscType> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                match i32::try_from(i) {
                    Ok(i) => Some(OscType::Int(i)),
                    Err(_) => Some(OscType::Long(i)),
                }
            } else {
                n.as_f64().map(|f| OscType::Float(f as f32))
            }
        }
        Value::String(s) => Some(OscType::String(s.clone())),
        Value::Bool(b) => Some(OscType::Bool(*b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_numbers_map_to_osc_numbers() {
        assert_eq!(osc_arg(&json!(3)), Some(OscType::Int(3)));
        assert_eq!(
            osc_arg(&json!(10_000_000_000i64)),
            Some(OscType::Long(10_000_000_000))
        );
        assert_eq!(osc_arg(&json!(0.25)), Some(OscType::Float(0.25)));
    }

    #[test]
    fn json_scalars_map_to_osc_scalars() {
        assert_eq!(
            osc_arg(&json!("toe_off")),
            Some(OscType::String("toe_off".to_string()))
        );
        assert_eq!(osc_arg(&json!(true)), Some(OscType::Bool(true)));
    }

    #[test]
    fn containers_and_null_are_dropped() {
        assert_eq!(osc_arg(&json!(null)), None);
        assert_eq!(osc_arg(&json!([1, 2])), None);
        assert_eq!(osc_arg(&json!({"a": 1})), None);
    }

    #[test]
    fn send_reaches_a_local_receiver() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        let target = receiver.local_addr().unwrap();

        let sender = TelemetrySender::new(&target.to_string()).unwrap();
        sender.send_float("/sensor_1", 1.5).unwrap();

        let mut buf = [0u8; rosc::decoder::MTU];
        let (len, _) = receiver.recv_from(&mut buf).unwrap();
        let (_, packet) = rosc::decoder::decode_udp(&buf[..len]).unwrap();
        match packet {
            OscPacket::Message(msg) => {
                assert_eq!(msg.addr, "/sensor_1");
                assert_eq!(msg.args, vec![OscType::Float(1.5)]);
            }
            OscPacket::Bundle(_) => panic!("expected a message"),
        }
    }
}
