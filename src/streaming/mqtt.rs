// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermowatch

//! MQTT transport: subscription loop and notification publisher

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::Notifier;
use crate::config::MqttConfig;
use crate::error::{Error, Result};
use crate::protocol::{Envelope, SUBSCRIPTION};

/// Largest accepted packet; surveillance captures arrive base64 encoded
const MAX_PACKET_SIZE: usize = 16 * 1024 * 1024;

/// Broker connection owned by the delivery loop
pub struct MqttTransport {
    client: AsyncClient,
    eventloop: EventLoop,
    config: MqttConfig,
}

impl MqttTransport {
    pub fn new(config: &MqttConfig) -> Self {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
        options.set_max_packet_size(MAX_PACKET_SIZE, MAX_PACKET_SIZE);

        let (client, eventloop) = AsyncClient::new(options, config.channel_capacity);
        info!("MQTT client initialized for {}:{}", config.host, config.port);

        Self {
            client,
            eventloop,
            config: config.clone(),
        }
    }

    /// Publisher sharing this connection
    pub fn notifier(&self) -> MqttNotifier {
        MqttNotifier::new(self.client.clone())
    }

    /// Deliver every inbound publish to `on_message`, one at a time, until
    /// `cancel` fires.
    ///
    /// The subscription is re-issued on every ConnAck so a reconnect picks
    /// up where it left off. `on_message` runs synchronously on this task
    /// and needs a multi-threaded runtime.
    pub async fn run<F>(mut self, mut on_message: F, cancel: CancellationToken)
    where
        F: FnMut(&str, &[u8]),
    {
        let retry = Duration::from_secs(self.config.reconnect_delay_secs);

        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = self.eventloop.poll() => event,
            };

            match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("MQTT connected");
                    match self.client.try_subscribe(SUBSCRIPTION, QoS::ExactlyOnce) {
                        Ok(()) => info!("Subscribed to MQTT topic: {}", SUBSCRIPTION),
                        Err(e) => warn!("MQTT subscribe failed: {}", e),
                    }
                }
                Ok(Event::Incoming(Packet::Publish(msg))) => {
                    info!("received message with topic {}", msg.topic);
                    tokio::task::block_in_place(|| on_message(&msg.topic, &msg.payload));
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("MQTT error: {}", e);
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(retry) => {}
                    }
                }
            }
        }

        debug!("MQTT delivery loop stopped");
        if let Err(e) = self.client.try_disconnect() {
            debug!("MQTT disconnect failed: {}", e);
        }
    }
}

/// [`Notifier`] publishing through the shared MQTT client
#[derive(Clone)]
pub struct MqttNotifier {
    client: AsyncClient,
}

impl MqttNotifier {
    pub fn new(client: AsyncClient) -> Self {
        Self { client }
    }
}

impl Notifier for MqttNotifier {
    fn publish(&self, topic: &str, envelope: &Envelope) -> Result<()> {
        let payload = envelope.to_bytes()?;
        self.client
            .try_publish(topic, QoS::ExactlyOnce, false, payload)
            .map_err(|e| Error::Publish(format!("{}: {}", topic, e)))?;
        debug!(topic, "notification queued");
        Ok(())
    }
}
