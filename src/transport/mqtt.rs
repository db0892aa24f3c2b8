//! MQTT summary publisher.
//!
//! Wraps a synchronous rumqttc client. The connection event loop runs on its
//! own thread; publish calls only enqueue, so a broker outage surfaces as
//! logged connection errors rather than blocking the inference loop.

use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use rumqttc::v5::{mqttbytes::QoS, Client, MqttOptions};

use crate::transport::SummaryPublisher;

const CHANNEL_CAPACITY: usize = 10;
const KEEP_ALIVE: Duration = Duration::from_secs(30);
const RECONNECT_PAUSE: Duration = Duration::from_secs(1);

/// Connection settings for the summary broker.
#[derive(Clone, Debug)]
pub struct MqttConfig {
    /// Broker address, `host:port`.
    pub broker_addr: String,
    /// Client identifier presented to the broker.
    pub client_id: String,
    /// Optional credentials.
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_addr: "127.0.0.1:1883".to_string(),
            client_id: "crittercam".to_string(),
            username: None,
            password: None,
        }
    }
}

/// MQTT-backed [`SummaryPublisher`].
pub struct MqttPublisher {
    client: Client,
}

impl MqttPublisher {
    /// Connect to the broker and start the event-loop drain thread.
    pub fn connect(config: &MqttConfig) -> Result<Self> {
        let (host, port) = split_broker_addr(&config.broker_addr)?;

        let mut options = MqttOptions::new(config.client_id.clone(), host, port);
        options.set_keep_alive(KEEP_ALIVE);
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            options.set_credentials(user.clone(), pass.clone());
        }

        let (client, mut connection) = Client::new(options, CHANNEL_CAPACITY);

        // Drain acknowledgements and connection events. Summaries are
        // per-frame and disposable, so errors are logged and the loop keeps
        // retrying rather than tearing the pipeline down.
        thread::Builder::new()
            .name("mqtt-drain".to_string())
            .spawn(move || {
                for event in connection.iter() {
                    if let Err(e) = event {
                        log::warn!("mqtt connection error: {}", e);
                        thread::sleep(RECONNECT_PAUSE);
                    }
                }
            })
            .map_err(|e| anyhow!("failed to spawn mqtt drain thread: {}", e))?;

        Ok(Self { client })
    }
}

impl SummaryPublisher for MqttPublisher {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<()> {
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload.to_string())
            .map_err(|e| anyhow!("mqtt publish to {} failed: {}", topic, e))
    }
}

fn split_broker_addr(addr: &str) -> Result<(String, u16)> {
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("broker address must be host:port, got {}", addr))?;
    if host.is_empty() {
        return Err(anyhow!("broker address has empty host: {}", addr));
    }
    let port: u16 = port
        .parse()
        .map_err(|_| anyhow!("broker address has invalid port: {}", addr))?;
    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_addr_parses_host_and_port() {
        let (host, port) = split_broker_addr("broker.local:1883").unwrap();
        assert_eq!(host, "broker.local");
        assert_eq!(port, 1883);
    }

    #[test]
    fn broker_addr_rejects_malformed_input() {
        assert!(split_broker_addr("no-port").is_err());
        assert!(split_broker_addr(":1883").is_err());
        assert!(split_broker_addr("host:notaport").is_err());
    }
}
