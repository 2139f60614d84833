use std::time::Duration;

use clap::Parser;
use eyre::{Result, WrapErr};
use tracing_subscriber::{prelude::*, EnvFilter};

use orb_sara_r5::{Modem, SerialTransport};

/// Sends one AT command to the modem and prints the raw reply.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(
        short = 'm',
        long = "modem",
        default_value = "/dev/ttyUSB0",
        help = "Path to the SARA-R5 serial device"
    )]
    modem: String,

    #[arg(long = "baud", default_value_t = SerialTransport::DEFAULT_BAUD)]
    baud: u32,

    #[arg(
        short = 't',
        long = "timeout-ms",
        help = "How long to wait for the reply",
        default_value = "1000"
    )]
    timeout_ms: u64,

    /// Command to send, e.g. `AT+COPS?`
    command: String,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let transport =
        SerialTransport::open(&cli.modem, cli.baud, Duration::from_millis(100))
            .wrap_err_with(|| format!("failed to open serial port '{}'", cli.modem))?;
    let mut modem = Modem::new(transport);

    let command = format!("{}\r", cli.command.trim_end());
    let reply = modem
        .send_raw(&command, Duration::from_millis(cli.timeout_ms))
        .wrap_err_with(|| format!("no reply to '{}'", cli.command))?;
    println!("{}", reply.trim());

    Ok(())
}
