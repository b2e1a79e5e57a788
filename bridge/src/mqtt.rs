use crate::config::Config;
use crate::errors::{Error, Result};
use async_trait::async_trait;
use rumqttc::{
    AsyncClient, ConnectionError, Event, EventLoop, MqttOptions, Outgoing, Packet, Publish, QoS,
};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

const REQUEST_CAPACITY: usize = 10;
const KEEP_ALIVE: Duration = Duration::from_secs(30);
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Sends a pre-formatted payload to a topic and waits for it to go out
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: String) -> Result<()>;
}

/// Callbacks for what the broker connection does in the background
pub trait EventHandler: Send + Sync + 'static {
    fn on_connection_lost(&self, error: &ConnectionError);

    fn on_message(&self, publish: Publish);
}

/// Logs connection loss and forwards inbound messages into a channel
pub struct ForwardingHandler {
    tx: mpsc::Sender<Publish>,
}

impl ForwardingHandler {
    pub fn new(tx: mpsc::Sender<Publish>) -> Self {
        Self { tx }
    }
}

impl EventHandler for ForwardingHandler {
    fn on_connection_lost(&self, error: &ConnectionError) {
        warn!("Connection lost: {}", error);
    }

    fn on_message(&self, publish: Publish) {
        info!(
            "Received message: {} from topic: {}",
            String::from_utf8_lossy(&publish.payload),
            publish.topic
        );
        if let Err(e) = self.tx.try_send(publish) {
            debug!("Dropping inbound message: {}", e);
        }
    }
}

/// Connects to the broker and waits for its ConnAck before handing back a
/// publisher. Failing here is fatal to the caller, there is no retry.
pub async fn connect<H: EventHandler>(config: &Config, handler: H) -> Result<MqttPublisher> {
    info!(
        "Connecting to MQTT broker at {}:{} as {}",
        config.mqtt_broker, config.mqtt_port, config.client_id
    );

    let mut mqtt_options =
        MqttOptions::new(&config.client_id, &config.mqtt_broker, config.mqtt_port);
    mqtt_options.set_keep_alive(KEEP_ALIVE);
    mqtt_options.set_clean_session(true);

    let (client, mut eventloop) = AsyncClient::new(mqtt_options, REQUEST_CAPACITY);

    wait_for_connack(&mut eventloop).await?;
    info!("Connected to MQTT broker");

    let (ack_tx, ack_rx) = mpsc::unbounded_channel();
    tokio::spawn(run_event_loop(eventloop, handler, ack_tx));

    Ok(MqttPublisher::new(client, ack_rx, config.publish_timeout()))
}

async fn wait_for_connack(eventloop: &mut EventLoop) -> Result<()> {
    loop {
        if let Event::Incoming(Packet::ConnAck(connack)) = eventloop.poll().await? {
            debug!("ConnAck received: {:?}", connack.code);
            return Ok(());
        }
    }
}

async fn run_event_loop<H: EventHandler>(
    mut eventloop: EventLoop,
    handler: H,
    acks: mpsc::UnboundedSender<u16>,
) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => handler.on_message(publish),
            Ok(Event::Outgoing(Outgoing::Publish(pkid))) => {
                if acks.send(pkid).is_err() {
                    info!("Publisher dropped, stopping MQTT event loop");
                    return;
                }
            }
            Ok(_) => {}
            Err(e) => {
                handler.on_connection_lost(&e);
                // rumqttc reconnects on the next poll
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

/// Publishes at QoS 0 without the retained flag.
///
/// QoS 0 gets no PUBACK from the broker, so a publish counts as acknowledged
/// once the event loop has written it to the connection. Every QoS 0 publish
/// reports packet id 0, so acks cannot be matched to publishes: if a timed-out
/// publish goes out after the next one has drained the ack channel, its ack
/// is credited to the newer publish.
///
/// Requests are queued with `try_publish`. While the broker is unreachable the
/// event loop stops draining the request queue, and once it is full further
/// publishes fail at once instead of blocking the poll loop.
pub struct MqttPublisher {
    client: AsyncClient,
    acks: Mutex<mpsc::UnboundedReceiver<u16>>,
    ack_timeout: Duration,
}

impl MqttPublisher {
    fn new(
        client: AsyncClient,
        acks: mpsc::UnboundedReceiver<u16>,
        ack_timeout: Duration,
    ) -> Self {
        Self {
            client,
            acks: Mutex::new(acks),
            ack_timeout,
        }
    }
}

#[async_trait]
impl Publisher for MqttPublisher {
    async fn publish(&self, topic: &str, payload: String) -> Result<()> {
        let mut acks = self.acks.lock().await;

        // Acks for publishes that already timed out
        while acks.try_recv().is_ok() {}

        self.client
            .try_publish(topic, QoS::AtMostOnce, false, payload)?;

        match timeout(self.ack_timeout, acks.recv()).await {
            Ok(Some(_)) => Ok(()),
            Ok(None) => {
                error!("MQTT event loop is gone");
                Err(Error::EventLoopStopped)
            }
            Err(_) => Err(Error::PublishTimeout(self.ack_timeout)),
        }
    }
}
