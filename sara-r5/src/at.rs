//! SARA-R5 AT command vocabulary, result tokens, timing and size limits.
//!
//! See the u-blox SARA-R5 series AT commands manual (UBX-19047455).

use std::time::Duration;

/// Final result code for a successful command.
pub const OK: &[u8] = b"\r\nOK\r\n";
/// Final result code for a failed command.
pub const ERROR: &[u8] = b"\r\nERROR\r\n";
/// Prompt emitted by the socket write commands when they are ready for data.
pub const DATA_PROMPT: &[u8] = b"@";

pub const ATTENTION: &str = "AT";
pub const ECHO_OFF: &str = "ATE0";
pub const OPERATOR_SELECTION: &str = "AT+COPS";
pub const PSD_ACTION: &str = "AT+UPSDA";
pub const PDP_CONTEXT: &str = "AT+CGDCONT";
pub const SOCKET_CREATE: &str = "AT+USOCR";
pub const SOCKET_CLOSE: &str = "AT+USOCL";
pub const SOCKET_CONNECT: &str = "AT+USOCO";
pub const SOCKET_WRITE: &str = "AT+USOWR";
pub const SOCKET_SEND_TO: &str = "AT+USOST";
pub const MQTT_PROFILE: &str = "AT+UMQTT";
pub const MQTT_COMMAND: &str = "AT+UMQTTC";

pub const PDP_CONTEXT_MARKER: &str = "+CGDCONT:";
pub const SOCKET_CREATE_MARKER: &str = "+USOCR:";

/// Simple acknowledgements.
pub const SHORT_TIMEOUT: Duration = Duration::from_secs(1);
/// Socket and PDP operations.
pub const MEDIUM_TIMEOUT: Duration = Duration::from_secs(10);
/// Socket connection establishment.
pub const IP_CONNECT_TIMEOUT: Duration = Duration::from_secs(130);
/// Operator scans and automatic registration.
pub const OPERATOR_SCAN_TIMEOUT: Duration = Duration::from_secs(180);
/// Data prompt of the socket write commands, and MQTT publish.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

pub const SMALL_RESPONSE_SIZE: usize = 64;
pub const STANDARD_RESPONSE_SIZE: usize = 128;
pub const LARGE_RESPONSE_SIZE: usize = 255;
/// Response bytes reserved per operator in an operator scan.
pub const OPERATOR_RESPONSE_SLOT: usize = 48;

pub const LONG_OPERATOR_LEN: usize = 25;
pub const SHORT_OPERATOR_LEN: usize = 10;
pub const PDP_TYPE_LEN: usize = 9;
pub const APN_LEN: usize = 127;
/// Longest dotted-quad IPv4 address.
pub const IPV4_TEXT_LEN: usize = 15;
/// Longest remote host accepted by the socket commands.
pub const ADDRESS_LEN: usize = 128;
/// Largest payload of one `+USOST` / `+USOWR` write.
pub const SOCKET_WRITE_LEN: usize = 1024;
pub const MQTT_CLIENT_ID_LEN: usize = 256;
pub const MQTT_SERVER_NAME_LEN: usize = 128;
pub const MQTT_TOPIC_LEN: usize = 256;
/// Largest publish payload once formatted (hex mode doubles the raw size).
pub const MQTT_MESSAGE_LEN: usize = 1024;

pub const MAX_OPERATORS: usize = 3;
pub const MAX_PDP_CONTEXTS: usize = 3;
/// Sockets the modem can hold open at once. Handles are `0..SOCKET_COUNT`.
pub const SOCKET_COUNT: u8 = 6;
