use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::at::SOCKET_COUNT;
use crate::error::SaraError;

/// Availability of an operator as reported by `AT+COPS=?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatorStatus {
    Unknown,
    Available,
    Current,
    Forbidden,
}

impl OperatorStatus {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Unknown),
            1 => Some(Self::Available),
            2 => Some(Self::Current),
            3 => Some(Self::Forbidden),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorStats {
    pub status: OperatorStatus,
    pub long_name: String,
    pub short_name: String,
    /// MCC and MNC concatenated, e.g. `21401`.
    pub numeric_id: u32,
    pub access_technology: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PdpType {
    Invalid,
    Ip,
    NonIp,
    Ipv4v6,
    Ipv6,
}

impl PdpType {
    /// Maps the wire text exactly; anything unrecognised is `Invalid`.
    pub fn from_wire(text: &[u8]) -> Self {
        match text {
            b"IP" => Self::Ip,
            b"NONIP" => Self::NonIp,
            b"IPV4V6" => Self::Ipv4v6,
            b"IPV6" => Self::Ipv6,
            _ => Self::Invalid,
        }
    }

    pub fn as_wire(self) -> Option<&'static str> {
        match self {
            Self::Ip => Some("IP"),
            Self::NonIp => Some("NONIP"),
            Self::Ipv4v6 => Some("IPV4V6"),
            Self::Ipv6 => Some("IPV6"),
            Self::Invalid => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdpContext {
    pub cid: i32,
    pub pdp_type: PdpType,
    pub apn: String,
    pub address: Ipv4Addr,
}

/// Modem-assigned socket identifier, always below [`SOCKET_COUNT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64")]
pub struct SocketHandle(u8);

impl SocketHandle {
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for SocketHandle {
    type Error = SaraError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .filter(|h| *h < SOCKET_COUNT)
            .map(SocketHandle)
            .ok_or(SaraError::InvalidSocket)
    }
}

impl fmt::Display for SocketHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SocketProtocol {
    Tcp = 6,
    Udp = 17,
}

impl SocketProtocol {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Packet switched data actions of `AT+UPSDA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PdpAction {
    Reset = 0,
    Store = 1,
    Load = 2,
    Activate = 3,
    Deactivate = 4,
}

impl PdpAction {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Registration modes of `AT+COPS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkMode {
    Automatic = 0,
    Manual = 1,
    Deregister = 2,
}

impl NetworkMode {
    pub fn code(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MqttQos {
    #[default]
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

impl MqttQos {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for MqttQos {
    type Error = SaraError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::AtMostOnce),
            1 => Ok(Self::AtLeastOnce),
            2 => Ok(Self::ExactlyOnce),
            _ => Err(SaraError::UnexpectedParam("qos")),
        }
    }
}

/// A single MQTT publish request.
#[derive(Debug, Clone, Copy)]
pub struct Publish<'a> {
    pub topic: &'a str,
    pub payload: &'a [u8],
    pub qos: MqttQos,
    pub retain: bool,
    /// Send the payload hex encoded, for binary data.
    pub hex_mode: bool,
}

impl<'a> Publish<'a> {
    pub fn new(topic: &'a str, payload: &'a [u8]) -> Self {
        Self {
            topic,
            payload,
            qos: MqttQos::default(),
            retain: false,
            hex_mode: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_handle_range() {
        assert_eq!(SocketHandle::try_from(0).unwrap().get(), 0);
        assert_eq!(SocketHandle::try_from(5).unwrap().get(), 5);
        assert!(matches!(
            SocketHandle::try_from(6),
            Err(SaraError::InvalidSocket)
        ));
        assert!(matches!(
            SocketHandle::try_from(-1),
            Err(SaraError::InvalidSocket)
        ));
    }

    #[test]
    fn socket_handle_deserialize_checks_range() {
        let handle: SocketHandle = serde_json::from_str("4").unwrap();
        assert_eq!(handle.get(), 4);
        assert!(serde_json::from_str::<SocketHandle>("6").is_err());
        assert!(serde_json::from_str::<SocketHandle>("-1").is_err());
        assert_eq!(serde_json::to_string(&handle).unwrap(), "4");
    }

    #[test]
    fn pdp_type_wire_text() {
        assert_eq!(PdpType::from_wire(b"IP"), PdpType::Ip);
        assert_eq!(PdpType::from_wire(b"NONIP"), PdpType::NonIp);
        assert_eq!(PdpType::from_wire(b"IPV4V6"), PdpType::Ipv4v6);
        assert_eq!(PdpType::from_wire(b"ipv6"), PdpType::Invalid);
        assert_eq!(PdpType::Invalid.as_wire(), None);
        assert_eq!(PdpType::Ipv6.as_wire(), Some("IPV6"));
    }

    #[test]
    fn qos_from_u8() {
        assert_eq!(MqttQos::try_from(2).unwrap(), MqttQos::ExactlyOnce);
        assert!(MqttQos::try_from(3).is_err());
    }

    #[test]
    fn protocol_codes() {
        assert_eq!(SocketProtocol::Tcp.code(), 6);
        assert_eq!(SocketProtocol::Udp.code(), 17);
        assert_eq!(PdpAction::Deactivate.code(), 4);
        assert_eq!(NetworkMode::Deregister.code(), 2);
    }
}
