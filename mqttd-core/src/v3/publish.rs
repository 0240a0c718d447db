use crate::err::{DecodeError, DecodeErrorKind, EncodeError};
use crate::io::{decode_u16, decode_utf8, encode_packet_length, encode_utf8};
use crate::qos::QosLevel;
use crate::topic::TopicName;
use crate::v3::{FixedHeader, PacketType};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/*
 * A PUBLISH Control Packet is sent from a Client to a Server or from Server to
 * a Client to transport an Application Message.
 *
 * The receiver of a PUBLISH Packet MUST respond according to the QoS in the
 * PUBLISH Packet [MQTT-3.3.4-1]: nothing for QoS 0, PUBACK for QoS 1, PUBREC
 * for QoS 2.
 *
 * The Packet Identifier field is only present where the QoS level is 1 or 2.
 * The payload is the remainder of the packet body, opaque to the broker; a
 * zero length payload is valid.
 */
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Debug)]
pub struct PublishPacket {
    flags: PublishFlags,
    topic_name: TopicName,
    packet_id: Option<u16>,
    payload: Bytes,
}

impl PublishPacket {
    pub fn new(topic_name: &TopicName, payload: Bytes) -> Self {
        return Self {
            flags: PublishFlags::zero(),
            topic_name: topic_name.clone(),
            packet_id: None,
            payload,
        };
    }

    pub fn decode(f_header: FixedHeader, bytes: &mut Bytes) -> Result<Self, DecodeError> {
        let flags = PublishFlags::from_byte(f_header.flags().as_byte())?;

        let topic_name_in = decode_utf8(bytes)?;
        let topic_name = TopicName::from_str(topic_name_in.as_str())?;

        let packet_id = if flags.qos() != QosLevel::AtMostOnce {
            Some(decode_u16(bytes)?)
        } else {
            None
        };

        return Ok(Self {
            flags,
            topic_name,
            packet_id,
            // the remainder of the body is the application payload.
            payload: bytes.copy_to_bytes(bytes.remaining()),
        });
    }

    pub fn encode(&self) -> Result<Bytes, EncodeError> {
        let mut len = 2 + self.topic_name.len();

        if self.packet_id.is_some() {
            len += 2;
        }

        len += self.payload.len();

        let mut bytes = BytesMut::with_capacity(len + 2);

        bytes.put_u8(PacketType::PUBLISH as u8 | self.flags.byte);

        encode_packet_length(&mut bytes, len)?;

        encode_utf8(&mut bytes, self.topic_name.as_str())?;

        if let Some(packet_id) = self.packet_id {
            bytes.put_u16(packet_id);
        }

        bytes.put_slice(&self.payload);

        return Ok(bytes.into());
    }

    pub fn set_qos_atmostonce(&mut self) {
        self.flags.set_qos(QosLevel::AtMostOnce);
        self.packet_id = None;
    }

    pub fn set_qos_atleastonce(&mut self, packet_id: u16) {
        self.flags.set_qos(QosLevel::AtLeastOnce);
        self.packet_id = Some(packet_id);
    }

    pub fn set_qos_exactlyonce(&mut self, packet_id: u16) {
        self.flags.set_qos(QosLevel::ExactlyOnce);
        self.packet_id = Some(packet_id);
    }

    pub fn topic(&self) -> &TopicName {
        return &self.topic_name;
    }

    pub fn qos(&self) -> QosLevel {
        return self.flags.qos();
    }

    pub fn retain(&self) -> bool {
        return self.flags.retain();
    }

    pub fn dup(&self) -> bool {
        return self.flags.dup();
    }

    pub fn set_dup(&mut self, val: bool) {
        self.flags.set_dup(val);
    }

    pub fn id(&self) -> Option<u16> {
        return self.packet_id;
    }

    pub fn payload(&self) -> &Bytes {
        return &self.payload;
    }
}

const RETAIN: u8 = 0b0000_0001;

/*
 * A PUBLISH Packet MUST NOT have both QoS bits set to 1. If a Server or
 * Client receives a PUBLISH Packet which has both QoS bits set to 1 it MUST
 * close the Network Connection [MQTT-3.3.1-4].
 */
const QOS_BITS: u8 = 0b0000_0110;

/*
 * The DUP flag MUST be set to 1 by the Client or Server when it attempts to
 * re-deliver a PUBLISH Packet [MQTT-3.3.1-1], and MUST be set to 0 for all
 * QoS 0 messages [MQTT-3.3.1-2].
 */
const DUP: u8 = 0b0000_1000;

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct PublishFlags {
    byte: u8,
}

impl PublishFlags {
    fn from_byte(byte: u8) -> Result<Self, DecodeError> {
        if byte & QOS_BITS == QOS_BITS {
            return Err(DecodeError::new(
                DecodeErrorKind::QoS,
                String::from("A PUBLISH packet cannot have both QoS bits set."),
            ));
        }

        return Ok(Self {
            byte: byte & 0b0000_1111,
        });
    }

    fn zero() -> Self {
        return Self { byte: 0 };
    }

    fn qos(&self) -> QosLevel {
        match (self.byte & QOS_BITS) >> 1 {
            1 => return QosLevel::AtLeastOnce,
            2 => return QosLevel::ExactlyOnce,
            _ => return QosLevel::AtMostOnce,
        }
    }

    fn set_qos(&mut self, val: QosLevel) {
        self.byte = self.byte & !QOS_BITS;
        self.byte = self.byte | ((val as u8) << 1);
    }

    fn retain(&self) -> bool {
        return self.byte & RETAIN == RETAIN;
    }

    fn dup(&self) -> bool {
        return self.byte & DUP == DUP;
    }

    fn set_dup(&mut self, val: bool) {
        if val {
            self.byte = self.byte | DUP;
        } else {
            self.byte = self.byte & !DUP;
        }
    }
}

#[cfg(test)]
mod packet {
    use bytes::Bytes;

    use crate::io::read_packet;
    use crate::qos::QosLevel;
    use crate::topic::TopicName;
    use crate::v3::MqttPacket;

    use super::PublishPacket;

    #[tokio::test]
    async fn serialize_deserialize_qos0() {
        let packet = PublishPacket::new(
            &TopicName::from_str("metrics/load").unwrap(),
            Bytes::from_static(b"hello"),
        );
        let buf = packet.encode().unwrap();

        let mut stream: &[u8] = &buf;
        let packet_de = read_packet(&mut stream).await.expect("Could not decode packet");

        assert_eq!(packet_de, MqttPacket::Publish(packet));
    }

    #[tokio::test]
    async fn serialize_deserialize_qos1() {
        let mut packet = PublishPacket::new(
            &TopicName::from_str("metrics/load").unwrap(),
            Bytes::from_static(&[117]),
        );
        packet.set_qos_atleastonce(1234);

        let buf = packet.encode().unwrap();

        let mut stream: &[u8] = &buf;
        match read_packet(&mut stream).await.expect("Could not decode packet") {
            MqttPacket::Publish(packet_de) => {
                assert_eq!(packet_de.qos(), QosLevel::AtLeastOnce);
                assert_eq!(packet_de.id(), Some(1234));
                assert_eq!(packet_de, packet);
            }
            other => panic!("Expected PUBLISH, decoded {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_payload_is_valid() {
        let packet = PublishPacket::new(&TopicName::from_str("t").unwrap(), Bytes::new());
        let buf = packet.encode().unwrap();

        let mut stream: &[u8] = &buf;
        let packet_de = read_packet(&mut stream).await.unwrap();
        assert_eq!(packet_de, MqttPacket::Publish(packet));
    }

    #[tokio::test]
    async fn rejects_both_qos_bits() {
        // fixed header with qos bits 0b11.
        let mut stream: &[u8] = &[0x36, 0x05, 0x00, 0x01, b't', 0x00, 0x07];
        assert!(read_packet(&mut stream).await.is_err());
    }
}
