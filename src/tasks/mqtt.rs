// Console LED Trigger - MQTT Bridge
//
// Publishes the retained device snapshot and forwards inbound commands to the
// control loop. The receive side runs on its own thread and never touches
// device state; it only parses and sends `Command`s over the channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;

use esp_idf_svc::mqtt::client::{
    EspMqttClient, EspMqttConnection, EventPayload, LwtConfiguration, MqttClientConfiguration,
    QoS,
};

use crate::config::*;
use crate::remote::{Command, DeviceSnapshot, Topics, COMMAND_ACTIONS};
use crate::tasks::network::Credentials;

type SharedClient = Arc<Mutex<EspMqttClient<'static>>>;

pub struct MqttBridge {
    client: SharedClient,
    topics: Topics,
    /// Set by the receive thread on every (re)connect.
    connected: Arc<AtomicBool>,
}

impl MqttBridge {
    pub fn start(
        creds: &Credentials,
        topics: Topics,
        commands: Sender<Command>,
    ) -> anyhow::Result<Self> {
        let status_topic = topics.status();
        let conf = MqttClientConfiguration {
            client_id: Some(topics.node_id()),
            username: creds.mqtt_user.as_deref(),
            password: creds.mqtt_pass.as_deref(),
            lwt: Some(LwtConfiguration {
                topic: &status_topic,
                payload: b"0",
                qos: QoS::AtLeastOnce,
                retain: true,
            }),
            ..Default::default()
        };

        let (client, connection) = EspMqttClient::new(&creds.mqtt_url, &conf)?;
        let client = Arc::new(Mutex::new(client));
        let connected = Arc::new(AtomicBool::new(false));

        {
            let client = client.clone();
            let topics = topics.clone();
            let connected = connected.clone();
            thread::Builder::new()
                .name("mqtt".into())
                .stack_size(STACK_MQTT)
                .spawn(move || receive_task(connection, client, topics, commands, connected))?;
        }

        log::info!("MQTT bridge started for {}", topics.node_id());
        Ok(Self {
            client,
            topics,
            connected,
        })
    }

    /// `true` once after each (re)connect; the caller republishes its state.
    pub fn take_connected(&self) -> bool {
        self.connected.swap(false, Ordering::SeqCst)
    }

    pub fn publish_state(&self, snapshot: &DeviceSnapshot) {
        let json = match snapshot.to_json() {
            Ok(json) => json,
            Err(e) => {
                log::error!("Snapshot encoding failed: {}", e);
                return;
            }
        };
        let mut client = match self.client.lock() {
            Ok(client) => client,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = client.enqueue(&self.topics.state(), QoS::AtLeastOnce, true, json.as_bytes()) {
            log::warn!("State publish failed: {}", e);
        }
    }
}

fn receive_task(
    mut connection: EspMqttConnection,
    client: SharedClient,
    topics: Topics,
    commands: Sender<Command>,
    connected: Arc<AtomicBool>,
) {
    log::info!("MQTT receive task started");

    while let Ok(event) = connection.next() {
        let mut just_connected = false;
        match event.payload() {
            EventPayload::Connected(_) => {
                log::info!("MQTT connected");
                just_connected = true;
            }
            EventPayload::Disconnected => log::warn!("MQTT disconnected"),
            EventPayload::Received {
                topic: Some(topic),
                data,
                ..
            } => {
                let Some(action) = topics.action(topic) else {
                    continue;
                };
                match Command::parse(action, data) {
                    Ok(command) => {
                        if commands.send(command).is_err() {
                            log::warn!("Command channel closed, exiting MQTT task");
                            return;
                        }
                    }
                    Err(e) => log::warn!("Rejected {}: {}", topic, e),
                }
            }
            EventPayload::Error(e) => log::warn!("MQTT error: {}", e),
            _ => {}
        }
        // The client blocks while an event is still held.
        drop(event);

        if just_connected {
            if let Err(e) = on_connected(&client, &topics) {
                log::error!("MQTT subscribe failed: {}", e);
            }
            connected.store(true, Ordering::SeqCst);
        }
    }

    log::warn!("MQTT connection closed");
}

fn on_connected(client: &SharedClient, topics: &Topics) -> anyhow::Result<()> {
    let mut client = match client.lock() {
        Ok(client) => client,
        Err(poisoned) => poisoned.into_inner(),
    };
    for action in COMMAND_ACTIONS {
        client.subscribe(&topics.command(action), QoS::AtLeastOnce)?;
    }
    client.enqueue(&topics.status(), QoS::AtLeastOnce, true, b"1")?;
    Ok(())
}
