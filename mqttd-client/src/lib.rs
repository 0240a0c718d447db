use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use mqttd_core::err::client::{self as client_err, ClientError};
use mqttd_core::err::ReadError;
use mqttd_core::io::read_packet;
use mqttd_core::qos::QosLevel;
use mqttd_core::topic::TopicName;
use mqttd_core::v3::{
    ConnectPacket, DisconnectPacket, MqttPacket, PingReqPacket, PubAckPacket, PubCompPacket,
    PubRecPacket, PubRelPacket, PublishPacket, SubAckPacket, SubscribePacket, TopicSubscription,
    UnsubAckPacket, UnsubscribePacket,
};
use mqttd_core::ConnectReturnCode;

/// An MQTT 3.1.1 client over any async byte stream.
///
/// The send methods drive each QoS exchange to completion from the sender
/// side before returning; [listen](Self::listen) plays the receiver side,
/// acknowledging forwarded messages as they arrive.
pub struct AsyncClient<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    stream: T,
    next_packet_id: u16,
}

impl<T> AsyncClient<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: T) -> Self {
        return Self {
            stream,
            next_packet_id: 0,
        };
    }

    /// Packet identifiers cycle through 1..=u16::MAX; zero is not a legal id.
    pub fn next_packet_id(&mut self) -> u16 {
        self.next_packet_id = self.next_packet_id.wrapping_add(1);
        if self.next_packet_id == 0 {
            self.next_packet_id = 1;
        }
        return self.next_packet_id;
    }

    /// Sends CONNECT and waits for CONNACK. Returns false when the broker
    /// refused the connection with a nonzero return code; the broker closes
    /// the stream afterwards.
    pub async fn connect(&mut self, packet: ConnectPacket) -> Result<bool, ClientError> {
        self.stream.write_all(&packet.encode()?).await?;
        self.stream.flush().await?;

        match self.recv_packet().await? {
            MqttPacket::ConnAck(connack) => {
                if connack.return_code() != ConnectReturnCode::Accept {
                    log::warn!(
                        "Connection refused by broker with return code: {}",
                        connack.return_code()
                    );
                    return Ok(false);
                }
                return Ok(true);
            }
            other => {
                return Err(ClientError::new(
                    client_err::ErrorKind::ProtocolError,
                    format!(
                        "First packet received from broker was not a CONNACK packet: {other:?}"
                    ),
                ))
            }
        }
    }

    /// Subscribes to a single topic and waits for the matching SUBACK.
    pub async fn subscribe(
        &mut self,
        topic: &str,
        qos: QosLevel,
    ) -> Result<SubAckPacket, ClientError> {
        let packet_id = self.next_packet_id();
        let packet = SubscribePacket::new(
            packet_id,
            vec![TopicSubscription::new(TopicName::from_str(topic)?, qos)],
        );

        self.stream.write_all(&packet.encode()?).await?;
        self.stream.flush().await?;

        match self.recv_packet().await? {
            MqttPacket::SubAck(suback) => {
                if suback.id() != packet_id {
                    return Err(ClientError::new(
                        client_err::ErrorKind::ProtocolError,
                        format!(
                            "SUBACK carried packet id {} for SUBSCRIBE {packet_id}.",
                            suback.id()
                        ),
                    ));
                }
                return Ok(suback);
            }
            other => {
                return Err(ClientError::new(
                    client_err::ErrorKind::ProtocolError,
                    format!("Expected SUBACK, instead received: {other:?}"),
                ))
            }
        }
    }

    /// Unsubscribes from a single topic and waits for the UNSUBACK.
    pub async fn unsubscribe(&mut self, topic: &str) -> Result<UnsubAckPacket, ClientError> {
        let packet_id = self.next_packet_id();
        let packet = UnsubscribePacket::new(packet_id, vec![TopicName::from_str(topic)?]);

        self.stream.write_all(&packet.encode()?).await?;
        self.stream.flush().await?;

        match self.recv_packet().await? {
            MqttPacket::UnsubAck(unsuback) => return Ok(unsuback),
            other => {
                return Err(ClientError::new(
                    client_err::ErrorKind::ProtocolError,
                    format!("Expected UNSUBACK, instead received: {other:?}"),
                ))
            }
        }
    }

    /// Publishes a message, driving the QoS 1 (PUBACK) or QoS 2
    /// (PUBREC / PUBREL / PUBCOMP) exchange to completion before returning.
    pub async fn publish(
        &mut self,
        topic: &str,
        payload: Bytes,
        qos: QosLevel,
    ) -> Result<(), ClientError> {
        let mut packet = PublishPacket::new(&TopicName::from_str(topic)?, payload);

        match qos {
            QosLevel::AtMostOnce => {
                self.stream.write_all(&packet.encode()?).await?;
                self.stream.flush().await?;
                return Ok(());
            }
            QosLevel::AtLeastOnce => {
                let packet_id = self.next_packet_id();
                packet.set_qos_atleastonce(packet_id);

                self.stream.write_all(&packet.encode()?).await?;
                self.stream.flush().await?;

                return self.await_puback(packet_id).await;
            }
            QosLevel::ExactlyOnce => {
                let packet_id = self.next_packet_id();
                packet.set_qos_exactlyonce(packet_id);

                self.stream.write_all(&packet.encode()?).await?;
                self.stream.flush().await?;

                return self.await_pubrec_cycle(packet_id).await;
            }
        }
    }

    /// Publishes with a caller-chosen packet id instead of the internal
    /// counter. The QoS exchange still runs to completion.
    pub async fn publish_with_id(
        &mut self,
        topic: &str,
        payload: Bytes,
        qos: QosLevel,
        packet_id: u16,
    ) -> Result<(), ClientError> {
        let mut packet = PublishPacket::new(&TopicName::from_str(topic)?, payload);

        match qos {
            QosLevel::AtMostOnce => {}
            QosLevel::AtLeastOnce => packet.set_qos_atleastonce(packet_id),
            QosLevel::ExactlyOnce => packet.set_qos_exactlyonce(packet_id),
        }

        self.stream.write_all(&packet.encode()?).await?;
        self.stream.flush().await?;

        match qos {
            QosLevel::AtMostOnce => return Ok(()),
            QosLevel::AtLeastOnce => return self.await_puback(packet_id).await,
            QosLevel::ExactlyOnce => return self.await_pubrec_cycle(packet_id).await,
        }
    }

    async fn await_puback(&mut self, packet_id: u16) -> Result<(), ClientError> {
        match self.recv_packet().await? {
            MqttPacket::PubAck(puback) => {
                if puback.id() != packet_id {
                    return Err(ClientError::new(
                        client_err::ErrorKind::ProtocolError,
                        format!("PUBACK carried packet id {} for PUBLISH {packet_id}.", puback.id()),
                    ));
                }
                return Ok(());
            }
            other => {
                return Err(ClientError::new(
                    client_err::ErrorKind::ProtocolError,
                    format!("Expected PUBACK, instead received: {other:?}"),
                ))
            }
        }
    }

    async fn await_pubrec_cycle(&mut self, packet_id: u16) -> Result<(), ClientError> {
        match self.recv_packet().await? {
            MqttPacket::PubRec(pubrec) => {
                if pubrec.id() != packet_id {
                    return Err(ClientError::new(
                        client_err::ErrorKind::ProtocolError,
                        format!("PUBREC carried packet id {} for PUBLISH {packet_id}.", pubrec.id()),
                    ));
                }
            }
            other => {
                return Err(ClientError::new(
                    client_err::ErrorKind::ProtocolError,
                    format!("Expected PUBREC, instead received: {other:?}"),
                ))
            }
        }

        self.stream
            .write_all(&PubRelPacket::new(packet_id).encode())
            .await?;
        self.stream.flush().await?;

        match self.recv_packet().await? {
            MqttPacket::PubComp(_) => return Ok(()),
            other => {
                return Err(ClientError::new(
                    client_err::ErrorKind::ProtocolError,
                    format!("Expected PUBCOMP, instead received: {other:?}"),
                ))
            }
        }
    }

    /// Sends PINGREQ and waits for the PINGRESP.
    pub async fn ping(&mut self) -> Result<(), ClientError> {
        self.stream.write_all(&PingReqPacket::new().encode()).await?;
        self.stream.flush().await?;

        match self.recv_packet().await? {
            MqttPacket::PingResp(_) => return Ok(()),
            other => {
                return Err(ClientError::new(
                    client_err::ErrorKind::ProtocolError,
                    format!("Expected PINGRESP, instead received: {other:?}"),
                ))
            }
        }
    }

    /// Reads the next packet off the stream.
    pub async fn recv_packet(&mut self) -> Result<MqttPacket, ClientError> {
        let packet = read_packet(&mut self.stream).await?;
        return Ok(packet);
    }

    /// Receive loop: hands every forwarded PUBLISH to the callback and plays
    /// the receiver side of the QoS exchanges (PUBACK for QoS 1, PUBREC then
    /// PUBCOMP for QoS 2). Returns cleanly when the broker closes the stream.
    pub async fn listen<F>(&mut self, mut on_publish: F) -> Result<(), ClientError>
    where
        F: FnMut(&PublishPacket),
    {
        loop {
            let packet = match read_packet(&mut self.stream).await {
                Ok(packet) => packet,
                Err(ReadError::StreamClosed) => return Ok(()),
                Err(err) => return Err(err.into()),
            };

            match packet {
                MqttPacket::Publish(publish) => {
                    match publish.qos() {
                        QosLevel::AtMostOnce => {}
                        QosLevel::AtLeastOnce => {
                            if let Some(id) = publish.id() {
                                self.stream.write_all(&PubAckPacket::new(id).encode()).await?;
                                self.stream.flush().await?;
                            }
                        }
                        QosLevel::ExactlyOnce => {
                            if let Some(id) = publish.id() {
                                self.stream.write_all(&PubRecPacket::new(id).encode()).await?;
                                self.stream.flush().await?;
                            }
                        }
                    }

                    on_publish(&publish);
                }
                MqttPacket::PubRel(pubrel) => {
                    self.stream
                        .write_all(&PubCompPacket::new(pubrel.id()).encode())
                        .await?;
                    self.stream.flush().await?;
                }
                MqttPacket::PingResp(_) => {}
                other => {
                    log::debug!("Ignoring unexpected packet while listening: {other:?}");
                }
            }
        }
    }

    /// Sends DISCONNECT and shuts the stream down.
    pub async fn disconnect(&mut self) -> Result<(), ClientError> {
        self.stream.write_all(&DisconnectPacket::new().encode()).await?;
        self.stream.flush().await?;
        self.stream.shutdown().await?;
        return Ok(());
    }
}
