use std::net::Ipv4Addr;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::at;
use crate::error::Result;
use crate::transport::SerialTransport;
use crate::types::MqttQos;

/// Resolved configuration of the `orb-sara-r5` binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub serial: SerialConfig,
    pub pdp: PdpConfig,
    pub action: Action,
}

/// Serial link to the modem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Path to the modem's UART device
    pub device: String,

    pub baud: u32,

    /// Upper bound of a single blocking read
    pub read_timeout: Duration,
}

/// Packet switched data attach
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdpConfig {
    /// PSD profile that is deactivated, loaded and activated
    pub profile: u8,

    /// Pause between attach steps, doubled after activation
    pub step_delay: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UdpConfig {
    pub address: Ipv4Addr,
    pub port: u16,
    /// 0 lets the modem pick the local port
    pub local_port: u16,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    pub client_id: String,
    pub server: String,
    pub port: u16,
    pub topic: String,
    pub qos: MqttQos,
    pub retain: bool,
    pub hex_mode: bool,
    pub message: String,

    /// Successful publishes before the session is closed
    pub count: u32,

    /// Time between publish attempts
    pub interval: Duration,

    /// Consecutive failed publishes after which the loop gives up
    pub max_failures: u32,
}

/// What the binary does once the modem is up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    UdpSend(UdpConfig),
    MqttPublish(MqttConfig),
    Operators { max: usize },
    Apn,
}

impl Config {
    /// Create a new config from CLI arguments
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let serial = SerialConfig {
            device: cli.device.clone(),
            baud: cli.baud,
            read_timeout: Duration::from_millis(cli.read_timeout_ms),
        };

        let pdp = PdpConfig {
            profile: cli.pdp_profile,
            step_delay: Duration::from_millis(cli.step_delay_ms),
        };

        let action = match &cli.command {
            Commands::UdpSend {
                address,
                port,
                local_port,
                message,
            } => Action::UdpSend(UdpConfig {
                address: *address,
                port: *port,
                local_port: *local_port,
                message: message.clone(),
            }),
            Commands::MqttPublish {
                client_id,
                server,
                port,
                topic,
                qos,
                retain,
                hex,
                message,
                count,
                interval,
                max_failures,
            } => Action::MqttPublish(MqttConfig {
                client_id: client_id.clone(),
                server: server.clone(),
                port: *port,
                topic: topic.clone(),
                qos: MqttQos::try_from(*qos)?,
                retain: *retain,
                hex_mode: *hex,
                message: message.clone(),
                count: *count,
                interval: Duration::from_secs(*interval),
                max_failures: *max_failures,
            }),
            Commands::Operators { max } => Action::Operators { max: *max },
            Commands::Apn => Action::Apn,
        };

        Ok(Self {
            serial,
            pdp,
            action,
        })
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[arg(
        short = 'm',
        long = "modem",
        default_value = "/dev/ttyUSB0",
        help = "Path to the SARA-R5 serial device"
    )]
    pub device: String,

    #[arg(long = "baud", default_value_t = SerialTransport::DEFAULT_BAUD)]
    pub baud: u32,

    #[arg(
        long = "read-timeout-ms",
        help = "Upper bound of a single serial read in milliseconds",
        default_value = "100"
    )]
    pub read_timeout_ms: u64,

    #[arg(short = 'd', long = "debug", help = "Enables additional debug output")]
    pub debug: bool,

    #[arg(long = "print-config", help = "Print the resolved configuration as JSON")]
    pub print_config: bool,

    #[arg(
        long = "pdp-profile",
        help = "PSD profile used for the data attach",
        default_value = "1"
    )]
    pub pdp_profile: u8,

    #[arg(
        long = "step-delay-ms",
        help = "Pause between PDP attach steps in milliseconds",
        default_value = "1000"
    )]
    pub step_delay_ms: u64,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Attach, then send one UDP datagram
    UdpSend {
        #[arg(long, default_value = "35.180.39.173")]
        address: Ipv4Addr,

        #[arg(long, default_value = "55055")]
        port: u16,

        #[arg(long = "local-port", default_value = "0")]
        local_port: u16,

        #[arg(long, default_value = "Hello, World!")]
        message: String,
    },

    /// Attach, then publish to an MQTT broker until enough messages went out
    MqttPublish {
        #[arg(long = "client-id", env = "SARA_MQTT_CLIENT_ID")]
        client_id: String,

        #[arg(long, default_value = "test.mosquitto.org")]
        server: String,

        #[arg(long, default_value = "1883")]
        port: u16,

        #[arg(long)]
        topic: String,

        #[arg(
            long,
            default_value = "0",
            value_parser = clap::value_parser!(u8).range(0..=2)
        )]
        qos: u8,

        #[arg(long)]
        retain: bool,

        #[arg(long, help = "Send the message hex encoded")]
        hex: bool,

        #[arg(long)]
        message: String,

        #[arg(long, default_value = "5")]
        count: u32,

        #[arg(long, help = "Seconds between publishes", default_value = "20")]
        interval: u64,

        #[arg(long = "max-failures", default_value = "5")]
        max_failures: u32,
    },

    /// Scan for operators and print them as JSON
    Operators {
        #[arg(long, default_value_t = at::MAX_OPERATORS)]
        max: usize,
    },

    /// Print the defined PDP contexts as JSON
    Apn,
}
