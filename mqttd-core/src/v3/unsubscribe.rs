use crate::err::{DecodeError, DecodeErrorKind, EncodeError};
use crate::io::{decode_u16, decode_utf8, encode_packet_length, encode_utf8};
use crate::topic::TopicName;
use crate::v3::PacketType;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/*
 * An UNSUBSCRIBE Packet is sent by the Client to the Server to unsubscribe
 * from topics. The payload contains the list of Topics that the Client wants
 * to unsubscribe from, and MUST contain at least one Topic [MQTT-3.10.3-2].
 */
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Debug)]
pub struct UnsubscribePacket {
    packet_id: u16,
    topics: Vec<TopicName>,
}

impl UnsubscribePacket {
    pub fn new(packet_id: u16, topics: Vec<TopicName>) -> Self {
        return Self { packet_id, topics };
    }

    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        let packet_id = decode_u16(bytes)?;

        let mut topics = Vec::new();

        while bytes.remaining() > 0 {
            let topic_in = decode_utf8(bytes)?;
            topics.push(TopicName::from_str(topic_in.as_str())?);
        }

        if topics.is_empty() {
            return Err(DecodeError::new(
                DecodeErrorKind::ProtocolError,
                String::from("An UNSUBSCRIBE packet must carry at least one topic."),
            ));
        }

        return Ok(Self { packet_id, topics });
    }

    pub fn encode(&self) -> Result<Bytes, EncodeError> {
        let mut len = 2;

        for topic in &self.topics {
            len += 2 + topic.len();
        }

        let mut bytes = BytesMut::with_capacity(len + 2);

        bytes.put_u8(PacketType::UNSUBSCRIBE as u8 | 0x02);

        encode_packet_length(&mut bytes, len)?;

        bytes.put_u16(self.packet_id);

        for topic in &self.topics {
            encode_utf8(&mut bytes, topic.as_str())?;
        }

        return Ok(bytes.into());
    }

    pub fn id(&self) -> u16 {
        return self.packet_id;
    }

    pub fn topics(&self) -> &[TopicName] {
        return &self.topics;
    }
}

#[cfg(test)]
mod packet {
    use crate::io::read_packet;
    use crate::topic::TopicName;
    use crate::v3::MqttPacket;

    use super::UnsubscribePacket;

    #[tokio::test]
    async fn serialize_deserialize() {
        let packet = UnsubscribePacket::new(
            77,
            vec![
                TopicName::from_str("devices/alpha").unwrap(),
                TopicName::from_str("devices/beta").unwrap(),
            ],
        );
        let buf = packet.encode().unwrap();

        let mut stream: &[u8] = &buf;
        let packet_de = read_packet(&mut stream).await.expect("Could not decode packet");

        assert_eq!(packet_de, MqttPacket::Unsubscribe(packet));
    }
}
