//! Broker link: connection supervision and the `Link` handed to the alert logic.
//!
//! The supervisor task owns the socket and the MQTT client. It (re)connects
//! forever, announces itself on the online topic after every successful
//! connect, and then serves publish requests coming from [`MqttLink`] until
//! the network or the broker goes away.

use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use embassy_futures::select::{Either3, select, select3};
use embassy_net::{IpAddress, Ipv4Address, Stack, dns::DnsQueryType, tcp::TcpSocket};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel, signal::Signal};
use embassy_time::{Duration as EmbassyDuration, Instant, Timer, with_timeout};
use emergency_button::{Link, LinkError, Payloads, Receipt, Topics, await_receipt};
use log::{debug, error, info, warn};
use rust_mqtt::{
    client::{
        client::MqttClient,
        client_config::{ClientConfig as MqttClientConfig, MqttVersion},
    },
    packet::v5::{publish_packet::QualityOfService, reason_codes::ReasonCode},
    utils::rng_generator::CountingRng,
};

use crate::config::BrokerSettings;

/// Back-off between connection attempts
const RETRY_DELAY: EmbassyDuration = EmbassyDuration::from_secs(5);
/// Upper bound for one publish, queueing included
const PUBLISH_TIMEOUT: EmbassyDuration = EmbassyDuration::from_secs(5);
const PING_INTERVAL: EmbassyDuration = EmbassyDuration::from_secs(30);
const KEEP_ALIVE_SECS: u16 = 60;

static LINK_READY: AtomicBool = AtomicBool::new(false);
static NEXT_SEQ: AtomicU32 = AtomicU32::new(0);

static PUBLISH_REQUESTS: Channel<CriticalSectionRawMutex, PublishRequest, 1> = Channel::new();
static PUBLISH_RESULTS: Signal<CriticalSectionRawMutex, Receipt> = Signal::new();

struct PublishRequest {
    seq: u32,
    topic: heapless::String<64>,
    payload: heapless::Vec<u8, 16>,
    issued: Instant,
}

impl PublishRequest {
    fn new(topic: &str, payload: &[u8]) -> Option<Self> {
        Some(Self {
            seq: NEXT_SEQ.fetch_add(1, Ordering::Relaxed),
            topic: heapless::String::try_from(topic).ok()?,
            payload: heapless::Vec::from_slice(payload).ok()?,
            issued: Instant::now(),
        })
    }

    fn is_stale(&self) -> bool {
        self.issued.elapsed() >= PUBLISH_TIMEOUT
    }
}

#[derive(Debug)]
enum MqttError {
    NoBrokerHost,
    DnsFailed,
    ConnectFailed,
    Broker(ReasonCode),
}

impl fmt::Display for MqttError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MqttError::NoBrokerHost => write!(f, "No BROKER_HOST set"),
            MqttError::DnsFailed => write!(f, "DNS lookup failed"),
            MqttError::ConnectFailed => write!(f, "TCP connect failed"),
            MqttError::Broker(code) => write!(f, "Broker error: {code:?}"),
        }
    }
}

/// Handle used by the control task to reach the broker.
#[derive(Default)]
pub struct MqttLink;

impl Link for MqttLink {
    fn is_ready(&self) -> bool {
        LINK_READY.load(Ordering::Relaxed)
    }

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), LinkError> {
        if !self.is_ready() {
            return Err(LinkError::NotReady);
        }
        let Some(request) = PublishRequest::new(topic, payload) else {
            error!("Publish to {} does not fit the request buffer", topic);
            return Err(LinkError::Rejected);
        };

        let seq = request.seq;
        with_timeout(PUBLISH_TIMEOUT, async {
            PUBLISH_REQUESTS.send(request).await;
            await_receipt(seq, || PUBLISH_RESULTS.wait()).await
        })
        .await
        .map_err(|_| LinkError::Timeout)?
    }
}

#[embassy_executor::task]
pub async fn link_supervisor(
    stack: Stack<'static>,
    broker: BrokerSettings,
    topics: Topics,
    payloads: Payloads,
) {
    let mut rx_buffer = [0; 4096];
    let mut tx_buffer = [0; 4096];

    loop {
        LINK_READY.store(false, Ordering::Relaxed);

        debug!("MQTT: Waiting for WiFi link to come up...");
        stack.wait_link_up().await;
        debug!("MQTT: WiFi link up, waiting for network configuration...");
        stack.wait_config_up().await;
        if let Some(config) = stack.config_v4() {
            debug!("MQTT: Got IP: {}", config.address);
        }

        let address = match resolve(stack, &broker).await {
            Ok(address) => address,
            Err(e) => {
                error!("MQTT: {e}");
                Timer::after(RETRY_DELAY).await;
                continue;
            }
        };

        let mut socket = TcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
        socket.set_timeout(Some(EmbassyDuration::from_secs(10)));

        info!("Connecting to MQTT broker at {}:{}...", address, broker.port);
        if let Err(e) = socket.connect((address, broker.port)).await {
            error!("MQTT: {} ({:?}), trying again in 5 seconds", MqttError::ConnectFailed, e);
            Timer::after(RETRY_DELAY).await;
            continue;
        }

        let mut config = MqttClientConfig::new(MqttVersion::MQTTv5, CountingRng(20000));
        config.add_client_id(broker.client_id);
        if let Some(username) = broker.username {
            config.add_username(username);
        }
        if let Some(password) = broker.password {
            config.add_password(password);
        }
        config.keep_alive = KEEP_ALIVE_SECS;
        config.max_packet_size = 1024;

        let mut recv_buffer = [0; 512];
        let mut write_buffer = [0; 512];
        let write_len = write_buffer.len();
        let recv_len = recv_buffer.len();

        let mut client = MqttClient::<_, 5, _>::new(
            socket,
            &mut write_buffer,
            write_len,
            &mut recv_buffer,
            recv_len,
            config,
        );

        if let Err(code) = client.connect_to_broker().await {
            error!("MQTT: {}, trying again in 5 seconds", MqttError::Broker(code));
            Timer::after(RETRY_DELAY).await;
            continue;
        }
        info!("Connected!");

        if let Err(code) = client
            .send_message(topics.online, payloads.online, QualityOfService::QoS1, false)
            .await
        {
            error!("MQTT: Online announcement failed: {}", MqttError::Broker(code));
            Timer::after(RETRY_DELAY).await;
            continue;
        }

        // Requests that timed out while the link was down must not go out late
        while PUBLISH_REQUESTS.try_receive().is_ok() {}
        LINK_READY.store(true, Ordering::Relaxed);

        loop {
            if !stack.is_link_up() || !stack.is_config_up() {
                warn!("MQTT: Network connection lost, reconnecting...");
                break;
            }

            let link_lost = select(stack.wait_link_down(), stack.wait_config_down());
            match select3(PUBLISH_REQUESTS.receive(), Timer::after(PING_INTERVAL), link_lost).await {
                Either3::First(request) => {
                    if request.is_stale() {
                        warn!("MQTT: Dropping stale publish to {}", request.topic.as_str());
                        continue;
                    }
                    let result = client
                        .send_message(
                            request.topic.as_str(),
                            &request.payload,
                            QualityOfService::QoS1,
                            false,
                        )
                        .await;
                    let seq = request.seq;
                    match result {
                        Ok(()) => PUBLISH_RESULTS.signal(Receipt { seq, result: Ok(()) }),
                        Err(code) => {
                            error!("MQTT: Publish failed: {}", MqttError::Broker(code));
                            PUBLISH_RESULTS.signal(Receipt {
                                seq,
                                result: Err(LinkError::Rejected),
                            });
                            if matches!(code, ReasonCode::NetworkError) {
                                break;
                            }
                        }
                    }
                }
                Either3::Second(()) => {
                    if let Err(code) = client.send_ping().await {
                        error!("MQTT: Ping failed: {}", MqttError::Broker(code));
                        break;
                    }
                }
                Either3::Third(_) => {
                    warn!("MQTT: Network connection lost, reconnecting...");
                    break;
                }
            }
        }

        LINK_READY.store(false, Ordering::Relaxed);
        Timer::after(RETRY_DELAY).await;
    }
}

async fn resolve(stack: Stack<'static>, broker: &BrokerSettings) -> Result<IpAddress, MqttError> {
    let host = broker.host.ok_or(MqttError::NoBrokerHost)?;

    // If host is an IPv4 literal, bypass DNS
    if let Ok(ipv4) = host.parse::<Ipv4Address>() {
        return Ok(IpAddress::Ipv4(ipv4));
    }

    match stack.dns_query(host, DnsQueryType::A).await {
        Ok(addresses) => addresses.first().copied().ok_or(MqttError::DnsFailed),
        Err(e) => {
            error!("DNS lookup error: {e:?}");
            Err(MqttError::DnsFailed)
        }
    }
}
