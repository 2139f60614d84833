//! End to end sequences run by the `orb-sara-r5` binary.

use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::at;
use crate::buffer::Allocator;
use crate::config::{MqttConfig, UdpConfig};
use crate::engine::Modem;
use crate::error::{Result, SaraError};
use crate::transport::Transport;
use crate::types::{PdpAction, Publish, SocketProtocol};

/// Brings up the packet data connection on `profile`.
///
/// The profile is deactivated first so a stale session does not block the
/// load. That step fails when nothing was active, which is only logged.
pub fn attach_pdp<T: Transport, A: Allocator>(
    modem: &mut Modem<T, A>,
    profile: u8,
    pace: Duration,
) -> Result<()> {
    let mut response = [0u8; at::STANDARD_RESPONSE_SIZE];

    if let Err(e) =
        modem.perform_pdp_action(profile, PdpAction::Deactivate, &mut response)
    {
        warn!(profile, error = %e, "PDP deactivate failed, continuing");
    }
    thread::sleep(pace);

    modem.perform_pdp_action(profile, PdpAction::Load, &mut response)?;
    thread::sleep(pace);

    modem.perform_pdp_action(profile, PdpAction::Activate, &mut response)?;
    thread::sleep(pace * 2);

    info!(profile, "PDP context active");
    Ok(())
}

/// Reads the PDP contexts and logs the active one.
pub fn log_active_context<T: Transport, A: Allocator>(
    modem: &mut Modem<T, A>,
) -> Result<()> {
    let contexts = modem.get_apn()?;
    if let Some(active) = contexts.first() {
        info!(
            cid = active.cid,
            apn = %active.apn,
            address = %active.address,
            pdp_type = ?active.pdp_type,
            "Active PDP context"
        );
    }
    Ok(())
}

/// Opens a UDP socket, sends the configured message once and closes it.
///
/// The socket is closed even if the send fails.
pub fn udp_send_once<T: Transport, A: Allocator>(
    modem: &mut Modem<T, A>,
    udp: &UdpConfig,
    pace: Duration,
) -> Result<()> {
    let mut response = [0u8; at::STANDARD_RESPONSE_SIZE];

    let handle = modem.socket_open(SocketProtocol::Udp, udp.local_port)?;
    thread::sleep(pace);

    let sent = modem
        .socket_connect(handle, udp.address, udp.port, &mut response)
        .and_then(|()| {
            thread::sleep(pace);
            let address = udp.address.to_string();
            modem.socket_write_udp(handle, &address, udp.port, udp.message.as_bytes())
        });
    thread::sleep(pace);

    let closed = modem.socket_close(handle, at::MEDIUM_TIMEOUT, &mut response);
    sent?;
    closed
}

/// Configures the MQTT session and publishes until `mqtt.count` messages
/// went out. Returns the number of successful publishes.
pub fn mqtt_publish_loop<T: Transport, A: Allocator>(
    modem: &mut Modem<T, A>,
    mqtt: &MqttConfig,
    pace: Duration,
) -> Result<u32> {
    let mut response = [0u8; at::STANDARD_RESPONSE_SIZE];

    if let Err(e) = modem.mqtt_disconnect(&mut response) {
        warn!(error = %e, "MQTT logout before setup failed, continuing");
    }
    modem.mqtt_set_client_id(&mqtt.client_id, &mut response)?;
    thread::sleep(pace);
    modem.mqtt_set_server(&mqtt.server, mqtt.port, &mut response)?;
    modem.mqtt_connect(&mut response)?;

    let publish = Publish {
        topic: &mqtt.topic,
        payload: mqtt.message.as_bytes(),
        qos: mqtt.qos,
        retain: mqtt.retain,
        hex_mode: mqtt.hex_mode,
    };

    let mut published = 0;
    let mut failures = 0;
    while published < mqtt.count {
        match modem.mqtt_publish(&publish, &mut response) {
            Ok(()) => {
                published += 1;
                failures = 0;
                info!(published, total = mqtt.count, "Published");
            }
            Err(e @ (SaraError::UnexpectedParam(_) | SaraError::Transport(_))) => {
                return Err(e);
            }
            Err(e) => {
                failures += 1;
                warn!(error = %e, failures, "Publish failed, retrying");
                if failures >= mqtt.max_failures {
                    return Err(e);
                }
            }
        }
        if published < mqtt.count {
            thread::sleep(mqtt.interval);
        }
    }

    if let Err(e) = modem.mqtt_disconnect(&mut response) {
        warn!(error = %e, "MQTT logout failed");
    }
    Ok(published)
}
