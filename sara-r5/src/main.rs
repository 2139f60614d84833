use clap::Parser;
use eyre::{Result, WrapErr};
use serde_json::to_string_pretty;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{prelude::*, EnvFilter};

use orb_sara_r5::{
    at,
    config::{Action, Cli, Config},
    flows, Modem, SerialTransport,
};

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let default_level = if cli.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .init();

    let config = Config::from_cli(&cli).wrap_err("invalid configuration")?;
    if cli.print_config {
        println!("{}", to_string_pretty(&config)?);
        return Ok(());
    }

    info!("Initializing modem on {}", config.serial.device);
    let transport = SerialTransport::open(
        &config.serial.device,
        config.serial.baud,
        config.serial.read_timeout,
    )
    .wrap_err_with(|| {
        format!("failed to open serial port '{}'", config.serial.device)
    })?;
    let mut modem = Modem::new(transport);

    let mut response = [0u8; at::STANDARD_RESPONSE_SIZE];
    modem
        .init(&mut response)
        .wrap_err("modem did not answer the AT handshake")?;

    let pace = config.pdp.step_delay;
    match &config.action {
        Action::UdpSend(udp) => {
            flows::log_active_context(&mut modem)
                .wrap_err("reading PDP contexts failed")?;
            flows::attach_pdp(&mut modem, config.pdp.profile, pace)
                .wrap_err("PDP attach failed")?;
            flows::udp_send_once(&mut modem, udp, pace)
                .wrap_err("UDP send failed")?;
            info!(address = %udp.address, port = udp.port, "Datagram sent");
        }
        Action::MqttPublish(mqtt) => {
            flows::log_active_context(&mut modem)
                .wrap_err("reading PDP contexts failed")?;
            flows::attach_pdp(&mut modem, config.pdp.profile, pace)
                .wrap_err("PDP attach failed")?;
            let published = flows::mqtt_publish_loop(&mut modem, mqtt, pace)
                .wrap_err("MQTT publish loop failed")?;
            info!(published, "MQTT publish loop finished");
        }
        Action::Operators { max } => {
            let operators = modem
                .get_operators(*max)
                .wrap_err("operator scan failed")?;
            println!("{}", to_string_pretty(&operators)?);
        }
        Action::Apn => {
            let contexts = modem.get_apn().wrap_err("reading PDP contexts failed")?;
            println!("{}", to_string_pretty(&contexts)?);
        }
    }

    Ok(())
}
