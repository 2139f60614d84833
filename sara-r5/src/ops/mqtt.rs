use tracing::{debug, info};

use crate::at;
use crate::buffer::Allocator;
use crate::command::{Arg, CommandSpec, Form, Param};
use crate::engine::Modem;
use crate::error::{Result, SaraError};
use crate::transport::Transport;
use crate::types::{MqttQos, Publish};

// AT+UMQTT profile parameters
const PROFILE_CLIENT_ID: u8 = 0;
const PROFILE_SERVER_NAME: u8 = 2;

// AT+UMQTTC operations
const LOGOUT: u8 = 0;
const LOGIN: u8 = 1;
const PUBLISH: u8 = 2;
const SUBSCRIBE: u8 = 4;
const UNSUBSCRIBE: u8 = 5;

const OP: Param = Param::Int { digits: 1 };
const FLAG: Param = Param::Int { digits: 1 };
const TOPIC: Param = Param::Text {
    max: at::MQTT_TOPIC_LEN,
};

const CLIENT_ID: CommandSpec = CommandSpec::new(
    at::MQTT_PROFILE,
    Form::Set,
    &[
        OP,
        Param::Text {
            max: at::MQTT_CLIENT_ID_LEN,
        },
    ],
);
const SERVER: CommandSpec = CommandSpec::new(
    at::MQTT_PROFILE,
    Form::Set,
    &[
        OP,
        Param::Text {
            max: at::MQTT_SERVER_NAME_LEN,
        },
        Param::Int { digits: 5 },
    ],
);
const SESSION: CommandSpec = CommandSpec::new(at::MQTT_COMMAND, Form::Set, &[OP]);
const SUBSCRIBE_TOPIC: CommandSpec =
    CommandSpec::new(at::MQTT_COMMAND, Form::Set, &[OP, FLAG, TOPIC]);
const UNSUBSCRIBE_TOPIC: CommandSpec =
    CommandSpec::new(at::MQTT_COMMAND, Form::Set, &[OP, TOPIC]);
const PUBLISH_MESSAGE: CommandSpec = CommandSpec::new(
    at::MQTT_COMMAND,
    Form::Set,
    &[
        OP,
        FLAG,
        FLAG,
        FLAG,
        TOPIC,
        Param::Text {
            max: at::MQTT_MESSAGE_LEN,
        },
    ],
);

fn check_topic(topic: &str) -> Result<()> {
    if topic.is_empty() {
        return Err(SaraError::UnexpectedParam("empty topic"));
    }
    Ok(())
}

impl<T: Transport, A: Allocator> Modem<T, A> {
    pub fn mqtt_set_client_id(
        &mut self,
        client_id: &str,
        response: &mut [u8],
    ) -> Result<()> {
        self.execute(
            &CLIENT_ID,
            &[PROFILE_CLIENT_ID.into(), client_id.into()],
            at::OK,
            response,
            at::SHORT_TIMEOUT,
        )?;
        Ok(())
    }

    pub fn mqtt_set_server(
        &mut self,
        server: &str,
        port: u16,
        response: &mut [u8],
    ) -> Result<()> {
        self.execute(
            &SERVER,
            &[PROFILE_SERVER_NAME.into(), server.into(), port.into()],
            at::OK,
            response,
            at::SHORT_TIMEOUT,
        )?;
        debug!(server, port, "MQTT server set");
        Ok(())
    }

    /// Logs in to the configured broker.
    pub fn mqtt_connect(&mut self, response: &mut [u8]) -> Result<()> {
        self.execute(
            &SESSION,
            &[LOGIN.into()],
            at::OK,
            response,
            at::SHORT_TIMEOUT,
        )?;
        info!("MQTT login requested");
        Ok(())
    }

    pub fn mqtt_disconnect(&mut self, response: &mut [u8]) -> Result<()> {
        self.execute(
            &SESSION,
            &[LOGOUT.into()],
            at::OK,
            response,
            at::SHORT_TIMEOUT,
        )?;
        info!("MQTT logout requested");
        Ok(())
    }

    pub fn mqtt_subscribe(&mut self, max_qos: MqttQos, topic: &str) -> Result<()> {
        check_topic(topic)?;
        let mut response = self.response_buffer(at::SMALL_RESPONSE_SIZE)?;
        self.execute(
            &SUBSCRIBE_TOPIC,
            &[SUBSCRIBE.into(), max_qos.code().into(), topic.into()],
            at::OK,
            &mut response,
            at::SHORT_TIMEOUT,
        )?;
        info!(topic, ?max_qos, "MQTT subscribed");
        Ok(())
    }

    pub fn mqtt_unsubscribe(&mut self, topic: &str) -> Result<()> {
        check_topic(topic)?;
        let mut response = self.response_buffer(at::SMALL_RESPONSE_SIZE)?;
        self.execute(
            &UNSUBSCRIBE_TOPIC,
            &[UNSUBSCRIBE.into(), topic.into()],
            at::OK,
            &mut response,
            at::SHORT_TIMEOUT,
        )?;
        info!(topic, "MQTT unsubscribed");
        Ok(())
    }

    /// Publishes one message.
    ///
    /// In hex mode the payload is sent hex encoded, so it may hold arbitrary
    /// bytes but can be at most half as long.
    pub fn mqtt_publish(
        &mut self,
        publish: &Publish<'_>,
        response: &mut [u8],
    ) -> Result<()> {
        check_topic(publish.topic)?;
        if publish.payload.is_empty() {
            return Err(SaraError::UnexpectedParam("empty message"));
        }

        let encoded = if publish.hex_mode {
            let len = publish
                .payload
                .len()
                .checked_mul(2)
                .filter(|len| *len <= at::MQTT_MESSAGE_LEN)
                .ok_or(SaraError::UnexpectedParam("message too long"))?;
            let mut buf = self.allocator().allocate(len)?;
            buf.resize(len, 0);
            hex::encode_to_slice(publish.payload, &mut buf)
                .map_err(|_| SaraError::UnexpectedParam("message"))?;
            Some(buf)
        } else {
            None
        };
        let message = encoded.as_deref().unwrap_or(publish.payload);

        self.execute(
            &PUBLISH_MESSAGE,
            &[
                PUBLISH.into(),
                publish.qos.code().into(),
                u8::from(publish.retain).into(),
                u8::from(publish.hex_mode).into(),
                publish.topic.into(),
                Arg::Text(message),
            ],
            at::OK,
            response,
            at::WRITE_TIMEOUT,
        )?;
        debug!(
            topic = publish.topic,
            len = publish.payload.len(),
            "MQTT message published"
        );
        Ok(())
    }
}
