mod auth;
mod broker;
mod config;
mod init;
mod logger;
mod mailbox;
mod session;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};

use mqttd_core::err::server::{self, ServerError};
use mqttd_core::io::read_packet;
use mqttd_core::qos::{QosLevel, SubAckReturnCode};
use mqttd_core::v3::{
    ConnAckPacket, ConnectPacket, MqttPacket, PingRespPacket, PubAckPacket, PubCompPacket,
    PubRecPacket, PubRelPacket, PublishPacket, SubAckPacket, SubscribePacket, UnsubAckPacket,
    UnsubscribePacket,
};
use mqttd_core::ConnectReturnCode;

use auth::MemoryCredentials;
use broker::Broker;
use config::MqttConfig;
use init::MqttEnv;
use mailbox::{spawn_writer, Mailbox};

struct MqttServer {
    config: MqttConfig,
    broker: Broker,
}

impl MqttServer {
    /// Builds the server around its single broker instance. The credential
    /// store backs both authentication ports; it is only consulted when the
    /// config enables authentication.
    pub fn new(config: MqttConfig, credentials: Arc<MemoryCredentials>) -> Self {
        let broker = Broker::new(config.require_auth(), credentials.clone(), credentials);

        return MqttServer { config, broker };
    }

    pub async fn start(self) {
        let addr = self.config.addr();

        let listener = TcpListener::bind(&addr)
            .await
            .unwrap_or_else(|err| panic!("Could not bind to {addr}: {err}"));

        log::info!("Server listening at: {}", addr);

        self.serve(listener).await;
    }

    async fn serve(self, listener: TcpListener) {
        let server = Arc::new(self);

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    log::info!("New connection attempt: {addr}");

                    let server_clone = Arc::clone(&server);

                    tokio::spawn(async move {
                        match handle_client(&server_clone, stream).await {
                            Ok(()) => {
                                log::info!("Gracefully closing connection: {addr}")
                            }
                            Err(err) => match err.kind() {
                                server::ErrorKind::UnexpectedEof => {
                                    log::info!("Client {addr} disconnected unexpectedly.")
                                }
                                _ => {
                                    log::error!(
                                        "Error handling client: {err} Closing connection: {addr}"
                                    )
                                }
                            },
                        }
                    });
                }
                Err(err) => {
                    log::error!("Rejected TCP connection: {}", err);
                }
            }
        }
    }
}

/// What a connection asserted at CONNECT time. Everything the CLEANUP pass
/// needs survives here even when the read loop dies mid-packet.
struct Connection {
    client_id: Option<String>,
    username: Option<String>,
    clean_session: bool,
}

impl Connection {
    fn new() -> Self {
        return Self {
            client_id: None,
            username: None,
            clean_session: false,
        };
    }
}

/// Handle a single TCP client connection event loop. The CLEANUP pass runs on
/// every exit path, graceful or not.
async fn handle_client(server: &Arc<MqttServer>, stream: TcpStream) -> Result<(), ServerError> {
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let (mailbox, outbound) = Mailbox::new();
    let _writer = spawn_writer(write_half, outbound);

    let mut conn = Connection::new();

    let result = drive_connection(server, &mut reader, &mailbox, &mut conn).await;

    {
        let mut state = server.broker.lock().await;
        state.cleanup(mailbox.id(), conn.client_id.as_deref(), conn.clean_session);
    }
    mailbox.close();

    match result {
        // a peer that closed cleanly at a packet boundary is a normal exit.
        Err(err) if matches!(err.kind(), server::ErrorKind::StreamClosed) => return Ok(()),
        other => return other,
    }
}

/// Drives the connection state machine: INITIAL (first packet MUST be
/// CONNECT), then the CONNECTED packet loop until DISCONNECT, EOF, error, or
/// a take-over closes the connection out from underneath us.
async fn drive_connection(
    server: &Arc<MqttServer>,
    reader: &mut BufReader<OwnedReadHalf>,
    mailbox: &Mailbox,
    conn: &mut Connection,
) -> Result<(), ServerError> {
    let client_id = match read_packet(reader).await? {
        MqttPacket::Connect(packet) => {
            match handle_connect(server, mailbox, conn, packet).await? {
                Some(client_id) => client_id,
                // REJECTED: the CONNACK with the failure code is already on
                // its way out, close with no further processing.
                None => return Ok(()),
            }
        }
        _ => {
            return Err(ServerError::new(
                server::ErrorKind::ProtocolError,
                String::from(
                    "Cannot initialize connection without first receiving a CONNECT packet",
                ),
            ))
        }
    };

    loop {
        let packet = tokio::select! {
            result = read_packet(reader) => result?,
            // a newer CONNECT with our client id closed this connection.
            _ = mailbox.closed() => return Ok(()),
        };

        let should_shutdown = handle_packet(server, mailbox, conn, &client_id, packet).await?;

        if should_shutdown {
            return Ok(());
        }
    }
}

/// CONNECT handling, atomic under the broker lock: credential check, session
/// resolve, duplicate client id take-over, registration, CONNACK.
///
/// Returns the accepted client id, or None when authentication rejected the
/// connection.
async fn handle_connect(
    server: &Arc<MqttServer>,
    mailbox: &Mailbox,
    conn: &mut Connection,
    packet: ConnectPacket,
) -> Result<Option<String>, ServerError> {
    let client_id = packet.client_id().to_string();

    conn.client_id = Some(client_id.clone());
    conn.username = packet.username().map(str::to_string);
    conn.clean_session = packet.clean_session();

    log::info!(
        "CONNECT: client_id={client_id}, clean_session={}",
        conn.clean_session
    );

    let mut state = server.broker.lock().await;

    if server.broker.auth_enabled() {
        let password = packet.password().map(|bytes| bytes.as_ref());

        if !server.broker.verify_credentials(packet.username(), password) {
            log::warn!(
                "Authentication failed for client_id={client_id}, username={}",
                packet.username().unwrap_or("<none>")
            );

            let connack = ConnAckPacket::new(false, ConnectReturnCode::BadUsernameOrPassword);
            let _ = mailbox.send(connack.encode());
            mailbox.close();
            return Ok(None);
        }

        log::info!(
            "Authentication successful for client_id={client_id}, username={}",
            packet.username().unwrap_or("<none>")
        );
    }

    state.resolve_session(&client_id, conn.clean_session);

    // a duplicate client id supersedes the older connection, whatever either
    // side's clean_session says.
    if let Some(old) = state.take_over(&client_id) {
        log::info!("Closing existing connection for client_id={client_id}");
        old.close();
    }

    state.register(&client_id, mailbox);

    // session_present is reported as 0 even when a session was resumed; a
    // strict 3.1.1 server would report 1 there.
    let connack = ConnAckPacket::new(false, ConnectReturnCode::Accept);
    let _ = mailbox.send(connack.encode());
    log::info!("Sent CONNACK to {client_id}");

    return Ok(Some(client_id));
}

/// Per-packet dispatch for a CONNECTED client. Returns Ok(true) when the
/// client disconnected gracefully.
async fn handle_packet(
    server: &Arc<MqttServer>,
    mailbox: &Mailbox,
    conn: &Connection,
    client_id: &str,
    packet: MqttPacket,
) -> Result<bool, ServerError> {
    match packet {
        MqttPacket::Connect(_) => {
            return Err(ServerError::new(
                server::ErrorKind::ProtocolError,
                String::from("Received a second CONNECT packet on an established connection."),
            ));
        }
        MqttPacket::Subscribe(packet) => {
            handle_subscribe(server, mailbox, conn, client_id, packet).await?;
        }
        MqttPacket::Unsubscribe(packet) => {
            handle_unsubscribe(server, mailbox, client_id, packet).await?;
        }
        MqttPacket::Publish(packet) => {
            handle_publish(server, mailbox, conn, packet).await?;
        }
        MqttPacket::PubAck(packet) => {
            // acknowledgement of a PUBLISH we forwarded at QoS 1; nothing to
            // release, the publisher owns retransmission.
            log::debug!("PUBACK: packet_id={}", packet.id());
        }
        MqttPacket::PubRec(packet) => {
            log::info!("PUBREC: packet_id={}", packet.id());
            let _ = mailbox.send(PubRelPacket::new(packet.id()).encode());
        }
        MqttPacket::PubRel(packet) => {
            log::info!("PUBREL: packet_id={}", packet.id());
            let _ = mailbox.send(PubCompPacket::new(packet.id()).encode());
        }
        MqttPacket::PubComp(packet) => {
            log::debug!("PUBCOMP: packet_id={}", packet.id());
        }
        MqttPacket::PingReq(_) => {
            let _ = mailbox.send(PingRespPacket::new().encode());
        }
        MqttPacket::Disconnect(_) => {
            log::info!("DISCONNECT from client_id={client_id}");
            mailbox.close();
            return Ok(true);
        }
        MqttPacket::ConnAck(_)
        | MqttPacket::SubAck(_)
        | MqttPacket::UnsubAck(_)
        | MqttPacket::PingResp(_) => {
            return Err(ServerError::new(
                server::ErrorKind::ProtocolError,
                String::from("Received a server-to-client packet from a client."),
            ));
        }
    }

    return Ok(false);
}

/// SUBSCRIBE handling under the broker lock. Collects one return code per
/// requested topic (0x80 where the ACL denies), sends the SUBACK, then
/// flushes the session's offline queue once when the SUBSCRIBE added at
/// least one new topic for this connection.
async fn handle_subscribe(
    server: &Arc<MqttServer>,
    mailbox: &Mailbox,
    conn: &Connection,
    client_id: &str,
    packet: SubscribePacket,
) -> Result<(), ServerError> {
    let mut state = server.broker.lock().await;

    let mut return_codes = Vec::with_capacity(packet.subscriptions().len());
    let mut added_new = false;

    for sub in packet.subscriptions() {
        if !server
            .broker
            .is_topic_authorized(conn.username.as_deref(), sub.topic())
        {
            log::warn!(
                "User '{}' is not authorized to subscribe to '{}'",
                conn.username.as_deref().unwrap_or("<none>"),
                sub.topic()
            );
            return_codes.push(SubAckReturnCode::Failure);
            continue;
        }

        if state.subscribe(client_id, mailbox, sub.topic()) {
            added_new = true;
            log::info!(
                "client_id={client_id} subscribed to topic '{}' with QoS {}",
                sub.topic(),
                sub.qos() as u8
            );
        } else {
            log::info!(
                "client_id={client_id} already subscribed to topic '{}'",
                sub.topic()
            );
        }

        // requested QoS is granted as-is, no downgrade.
        return_codes.push(SubAckReturnCode::Granted(sub.qos()));
    }

    let suback = SubAckPacket::new(packet.id(), return_codes);
    let _ = mailbox.send(suback.encode()?);
    log::info!("Sent SUBACK for packet_id={}", packet.id());

    if added_new {
        if let Some(session) = state.session_mut(client_id) {
            for queued in session.drain_queue() {
                let buf = queued.encode()?;
                if mailbox.send(buf).is_err() {
                    log::warn!("Could not deliver queued message to client_id={client_id}");
                    break;
                }
                log::info!("Delivered queued message to topic '{}'", queued.topic());
            }
        }
    }

    return Ok(());
}

/// UNSUBSCRIBE handling under the broker lock. Always answered with an
/// UNSUBACK, topics never subscribed to included.
async fn handle_unsubscribe(
    server: &Arc<MqttServer>,
    mailbox: &Mailbox,
    client_id: &str,
    packet: UnsubscribePacket,
) -> Result<(), ServerError> {
    let mut state = server.broker.lock().await;

    for topic in packet.topics() {
        state.unsubscribe(client_id, mailbox.id(), topic);
        log::info!("client_id={client_id} unsubscribed from topic '{topic}'");
    }

    let _ = mailbox.send(UnsubAckPacket::new(packet.id()).encode());
    log::info!("Sent UNSUBACK for packet_id={}", packet.id());

    return Ok(());
}

/// PUBLISH handling under the broker lock: fan-out to connected subscribers,
/// queueing for offline sessions, then the QoS acknowledgement to the sender.
async fn handle_publish(
    server: &Arc<MqttServer>,
    mailbox: &Mailbox,
    conn: &Connection,
    packet: PublishPacket,
) -> Result<(), ServerError> {
    log::info!(
        "PUBLISH: topic='{}', QoS={}",
        packet.topic(),
        packet.qos() as u8
    );

    let mut state = server.broker.lock().await;

    if !server
        .broker
        .is_topic_authorized(conn.username.as_deref(), packet.topic())
    {
        // dropped without an acknowledgement; a QoS 1/2 publisher will time
        // out and retransmit.
        log::warn!(
            "User '{}' is not authorized to publish to '{}'",
            conn.username.as_deref().unwrap_or("<none>"),
            packet.topic()
        );
        return Ok(());
    }

    // forwarded unchanged: same packet id, flags and payload.
    let buf = packet.encode()?;

    for subscriber in state.subscribers(packet.topic(), mailbox.id()) {
        if subscriber.send(buf.clone()).is_err() {
            log::error!(
                "Error forwarding PUBLISH to subscriber connection {}",
                subscriber.id()
            );
        }
    }

    state.queue_for_offline_sessions(&packet);

    match packet.qos() {
        QosLevel::AtMostOnce => {}
        QosLevel::AtLeastOnce => {
            if let Some(packet_id) = packet.id() {
                let _ = mailbox.send(PubAckPacket::new(packet_id).encode());
                log::info!("Sent PUBACK for packet_id={packet_id}");
            }
        }
        QosLevel::ExactlyOnce => {
            if let Some(packet_id) = packet.id() {
                let _ = mailbox.send(PubRecPacket::new(packet_id).encode());
                log::info!("Sent PUBREC for packet_id={packet_id}");
            }
        }
    }

    return Ok(());
}

#[tokio::main]
async fn main() {
    let config_path = PathBuf::from("config.toml");
    let env = MqttEnv::new(&config_path).init();

    let server = MqttServer::new(env.config(), Arc::new(MemoryCredentials::new()));

    tokio::select! {
        _ = server.start() => {}
        _ = tokio::signal::ctrl_c() => {
            log::info!("Received interrupt, shutting down.");
        }
    }
}

#[cfg(test)]
mod scenarios {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use mqttd_client::AsyncClient;
    use mqttd_core::err::client::ErrorKind;
    use mqttd_core::io::read_packet;
    use mqttd_core::qos::{QosLevel, SubAckReturnCode};
    use mqttd_core::v3::{ConnectPacket, MqttPacket, PublishPacket};

    use crate::auth::MemoryCredentials;
    use crate::config::MqttConfig;
    use crate::MqttServer;

    fn test_config(authenticate: bool) -> MqttConfig {
        let raw = format!(
            r#"
[connection]
ip = "127.0.0.1"
port = 0

[users]
authenticate = {authenticate}

[logger]
console = false
file = false
level = "Off"
"#
        );
        return toml::from_str(&raw).unwrap();
    }

    async fn start_server(credentials: Arc<MemoryCredentials>, authenticate: bool) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = MqttServer::new(test_config(authenticate), credentials);
        let _server = tokio::spawn(server.serve(listener));

        return addr;
    }

    async fn connect(
        addr: SocketAddr,
        client_id: &str,
        clean_session: bool,
    ) -> AsyncClient<TcpStream> {
        let stream = TcpStream::connect(addr).await.unwrap();
        let mut client = AsyncClient::new(stream);

        let packet = ConnectPacket::new(clean_session, 60, client_id.to_string(), None, None);
        assert!(client.connect(packet).await.unwrap());

        return client;
    }

    fn expect_publish(packet: MqttPacket) -> PublishPacket {
        match packet {
            MqttPacket::Publish(publish) => return publish,
            other => panic!("Expected a forwarded PUBLISH, received {other:?}"),
        }
    }

    #[tokio::test]
    async fn qos0_publish_reaches_subscriber() {
        let addr = start_server(Arc::new(MemoryCredentials::new()), false).await;

        let mut sub = connect(addr, "A", true).await;
        let suback = sub.subscribe("t", QosLevel::AtMostOnce).await.unwrap();
        assert_eq!(
            suback.return_codes(),
            &[SubAckReturnCode::Granted(QosLevel::AtMostOnce)]
        );

        let mut publisher = connect(addr, "B", true).await;
        publisher
            .publish("t", Bytes::from_static(b"hello"), QosLevel::AtMostOnce)
            .await
            .unwrap();

        let publish = expect_publish(sub.recv_packet().await.unwrap());
        assert_eq!(publish.topic().as_str(), "t");
        assert_eq!(&publish.payload()[..], b"hello");
        assert_eq!(publish.qos(), QosLevel::AtMostOnce);
        assert_eq!(publish.id(), None);
    }

    #[tokio::test]
    async fn qos1_publish_is_acked_and_forwarded() {
        let addr = start_server(Arc::new(MemoryCredentials::new()), false).await;

        let mut sub = connect(addr, "A", true).await;
        sub.subscribe("t", QosLevel::AtLeastOnce).await.unwrap();

        let mut publisher = connect(addr, "B", true).await;
        // publish_with_id resolves only after the PUBACK with packet id 7
        // comes back.
        publisher
            .publish_with_id("t", Bytes::from_static(b"x"), QosLevel::AtLeastOnce, 7)
            .await
            .unwrap();

        let publish = expect_publish(sub.recv_packet().await.unwrap());
        assert_eq!(publish.id(), Some(7));
        assert_eq!(&publish.payload()[..], b"x");
        assert_eq!(publish.qos(), QosLevel::AtLeastOnce);
    }

    #[tokio::test]
    async fn qos2_publish_completes_the_exchange() {
        let addr = start_server(Arc::new(MemoryCredentials::new()), false).await;

        let mut sub = connect(addr, "A", true).await;
        sub.subscribe("t", QosLevel::ExactlyOnce).await.unwrap();

        let mut publisher = connect(addr, "B", true).await;
        // the client drives PUBLISH -> PUBREC -> PUBREL -> PUBCOMP and fails
        // the test on any deviation.
        publisher
            .publish_with_id("t", Bytes::from_static(b"y"), QosLevel::ExactlyOnce, 9)
            .await
            .unwrap();

        let publish = expect_publish(sub.recv_packet().await.unwrap());
        assert_eq!(publish.id(), Some(9));
        assert_eq!(&publish.payload()[..], b"y");
        assert_eq!(publish.qos(), QosLevel::ExactlyOnce);
    }

    #[tokio::test]
    async fn offline_queue_flushes_on_resubscribe_in_order() {
        let addr = start_server(Arc::new(MemoryCredentials::new()), false).await;

        let mut sub = connect(addr, "A", false).await;
        sub.subscribe("t", QosLevel::AtLeastOnce).await.unwrap();
        sub.disconnect().await.unwrap();

        // give the broker a moment to run the disconnect cleanup.
        tokio::time::sleep(Duration::from_millis(200)).await;

        let mut publisher = connect(addr, "B", true).await;
        publisher
            .publish_with_id("t", Bytes::from_static(b"m1"), QosLevel::AtLeastOnce, 1)
            .await
            .unwrap();
        publisher
            .publish_with_id("t", Bytes::from_static(b"m2"), QosLevel::AtLeastOnce, 2)
            .await
            .unwrap();

        let mut sub = connect(addr, "A", false).await;
        sub.subscribe("t", QosLevel::AtLeastOnce).await.unwrap();

        let first = expect_publish(sub.recv_packet().await.unwrap());
        assert_eq!(&first.payload()[..], b"m1");
        let second = expect_publish(sub.recv_packet().await.unwrap());
        assert_eq!(&second.payload()[..], b"m2");

        // nothing queued is retransmitted: the next delivery is live traffic.
        publisher
            .publish_with_id("t", Bytes::from_static(b"m3"), QosLevel::AtLeastOnce, 3)
            .await
            .unwrap();
        let third = expect_publish(sub.recv_packet().await.unwrap());
        assert_eq!(&third.payload()[..], b"m3");
    }

    #[tokio::test]
    async fn duplicate_client_id_takes_over_the_connection() {
        let addr = start_server(Arc::new(MemoryCredentials::new()), false).await;

        let mut first = connect(addr, "A", true).await;
        let mut second = connect(addr, "A", true).await;

        // the broker closes the superseded socket.
        let err = first.recv_packet().await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::StreamClosed));

        // the survivor operates normally.
        let suback = second.subscribe("t", QosLevel::AtMostOnce).await.unwrap();
        assert_eq!(
            suback.return_codes(),
            &[SubAckReturnCode::Granted(QosLevel::AtMostOnce)]
        );
    }

    #[tokio::test]
    async fn auth_rejects_unknown_users_and_enforces_topic_acls() {
        let credentials = Arc::new(MemoryCredentials::new());
        credentials.register("u2", "pw");
        credentials.authorize_topic("u2", "t");

        let addr = start_server(credentials, true).await;

        // unknown user: CONNACK rc=4, then the socket closes.
        let stream = TcpStream::connect(addr).await.unwrap();
        let mut rejected = AsyncClient::new(stream);
        let packet = ConnectPacket::new(
            true,
            60,
            "X".to_string(),
            Some("u".to_string()),
            Some(Bytes::from_static(b"pw")),
        );
        assert!(!rejected.connect(packet).await.unwrap());

        // registered user with an ACL for "t" only.
        let stream = TcpStream::connect(addr).await.unwrap();
        let mut client = AsyncClient::new(stream);
        let packet = ConnectPacket::new(
            true,
            60,
            "Y".to_string(),
            Some("u2".to_string()),
            Some(Bytes::from_static(b"pw")),
        );
        assert!(client.connect(packet).await.unwrap());

        let granted = client.subscribe("t", QosLevel::AtLeastOnce).await.unwrap();
        assert_eq!(
            granted.return_codes(),
            &[SubAckReturnCode::Granted(QosLevel::AtLeastOnce)]
        );

        let denied = client.subscribe("forbidden", QosLevel::AtMostOnce).await.unwrap();
        assert_eq!(denied.return_codes(), &[SubAckReturnCode::Failure]);
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let addr = start_server(Arc::new(MemoryCredentials::new()), false).await;

        let mut sub = connect(addr, "A", true).await;
        sub.subscribe("t", QosLevel::AtMostOnce).await.unwrap();
        sub.subscribe("u", QosLevel::AtMostOnce).await.unwrap();
        sub.unsubscribe("t").await.unwrap();

        let mut publisher = connect(addr, "B", true).await;
        // processed in wire order on the publisher's connection; only the
        // second may reach the subscriber.
        publisher
            .publish("t", Bytes::from_static(b"dropped"), QosLevel::AtMostOnce)
            .await
            .unwrap();
        publisher
            .publish("u", Bytes::from_static(b"kept"), QosLevel::AtMostOnce)
            .await
            .unwrap();

        let publish = expect_publish(sub.recv_packet().await.unwrap());
        assert_eq!(publish.topic().as_str(), "u");
        assert_eq!(&publish.payload()[..], b"kept");
    }

    #[tokio::test]
    async fn pingreq_is_answered() {
        let addr = start_server(Arc::new(MemoryCredentials::new()), false).await;

        let mut client = connect(addr, "A", true).await;
        client.ping().await.unwrap();
    }

    #[tokio::test]
    async fn first_packet_must_be_connect() {
        let addr = start_server(Arc::new(MemoryCredentials::new()), false).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();

        // PINGREQ before CONNECT: the broker closes without answering.
        stream.write_all(&[0xC0, 0x00]).await.unwrap();

        let mut buf = [0u8; 1];
        let n = stream.read(&mut buf).await.unwrap();
        assert_eq!(n, 0, "expected the broker to close without a response");
    }

    #[tokio::test]
    async fn second_connect_is_a_protocol_error() {
        let addr = start_server(Arc::new(MemoryCredentials::new()), false).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();

        let packet = ConnectPacket::new(true, 60, "A".to_string(), None, None);
        stream.write_all(&packet.encode().unwrap()).await.unwrap();

        match read_packet(&mut stream).await.unwrap() {
            MqttPacket::ConnAck(_) => {}
            other => panic!("Expected CONNACK, received {other:?}"),
        }

        stream.write_all(&packet.encode().unwrap()).await.unwrap();

        let mut buf = [0u8; 1];
        let n = stream.read(&mut buf).await.unwrap();
        assert_eq!(n, 0, "expected the broker to close the connection");
    }
}
