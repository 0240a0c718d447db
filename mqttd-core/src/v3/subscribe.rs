use crate::err::{DecodeError, DecodeErrorKind, EncodeError};
use crate::io::{decode_u16, decode_u8, decode_utf8, encode_packet_length, encode_utf8};
use crate::qos::QosLevel;
use crate::topic::TopicName;
use crate::v3::PacketType;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/*
 * The SUBSCRIBE Packet is sent from the Client to the Server to create one or
 * more Subscriptions.
 *
 * The payload of a SUBSCRIBE Packet contains a list of Topic names, each
 * followed by a byte called the Requested QoS: the maximum QoS level at which
 * the Server can send Application Messages to the Client. The payload MUST
 * contain at least one Topic / QoS pair [MQTT-3.8.3-3].
 */
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Debug)]
pub struct SubscribePacket {
    packet_id: u16,
    subscriptions: Vec<TopicSubscription>,
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Debug)]
pub struct TopicSubscription {
    topic: TopicName,
    qos: QosLevel,
}

impl TopicSubscription {
    pub fn new(topic: TopicName, qos: QosLevel) -> Self {
        return Self { topic, qos };
    }

    pub fn topic(&self) -> &TopicName {
        return &self.topic;
    }

    pub fn qos(&self) -> QosLevel {
        return self.qos;
    }
}

impl SubscribePacket {
    pub fn new(packet_id: u16, subscriptions: Vec<TopicSubscription>) -> Self {
        return Self {
            packet_id,
            subscriptions,
        };
    }

    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        let packet_id = decode_u16(bytes)?;

        let mut subscriptions = Vec::new();

        // topic / requested QoS pairs are packed contiguously until the body
        // is exhausted.
        while bytes.remaining() > 0 {
            let topic_in = decode_utf8(bytes)?;
            let topic = TopicName::from_str(topic_in.as_str())?;
            let qos = QosLevel::try_from(decode_u8(bytes)? & 0b0000_0011)?;

            subscriptions.push(TopicSubscription::new(topic, qos));
        }

        if subscriptions.is_empty() {
            return Err(DecodeError::new(
                DecodeErrorKind::ProtocolError,
                String::from("A SUBSCRIBE packet must carry at least one topic."),
            ));
        }

        return Ok(Self {
            packet_id,
            subscriptions,
        });
    }

    pub fn encode(&self) -> Result<Bytes, EncodeError> {
        let mut len = 2;

        for sub in &self.subscriptions {
            // 2 for the length prefix, 1 for the requested QoS byte.
            len += 2 + sub.topic.len() + 1;
        }

        let mut bytes = BytesMut::with_capacity(len + 2);

        bytes.put_u8(PacketType::SUBSCRIBE as u8 | 0x02);

        encode_packet_length(&mut bytes, len)?;

        bytes.put_u16(self.packet_id);

        for sub in &self.subscriptions {
            encode_utf8(&mut bytes, sub.topic.as_str())?;
            bytes.put_u8(sub.qos as u8);
        }

        return Ok(bytes.into());
    }

    pub fn id(&self) -> u16 {
        return self.packet_id;
    }

    pub fn subscriptions(&self) -> &[TopicSubscription] {
        return &self.subscriptions;
    }
}
