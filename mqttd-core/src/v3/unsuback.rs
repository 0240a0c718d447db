use crate::err::DecodeError;
use crate::io::decode_u16;
use crate::v3::PacketType;
use bytes::{BufMut, Bytes, BytesMut};

/*
 * The UNSUBACK Packet is sent by the Server to the Client to confirm receipt
 * of an UNSUBSCRIBE Packet. It carries the same Packet Identifier as the
 * UNSUBSCRIBE Packet being acknowledged [MQTT-3.11.2-1].
 */
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct UnsubAckPacket {
    packet_id: u16,
}

impl UnsubAckPacket {
    pub fn new(packet_id: u16) -> Self {
        return Self { packet_id };
    }

    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        let packet_id = decode_u16(bytes)?;
        return Ok(Self { packet_id });
    }

    pub fn encode(&self) -> Bytes {
        let mut bytes = BytesMut::with_capacity(4);

        bytes.put_u8(PacketType::UNSUBACK as u8);
        bytes.put_u8(2);
        bytes.put_u16(self.packet_id);

        return bytes.into();
    }

    pub fn id(&self) -> u16 {
        return self.packet_id;
    }
}

#[cfg(test)]
mod packet {
    use crate::io::read_packet;
    use crate::v3::MqttPacket;

    use super::UnsubAckPacket;

    #[tokio::test]
    async fn serialize_deserialize() {
        let packet = UnsubAckPacket::new(77);
        let buf = packet.encode();

        let mut stream: &[u8] = &buf;
        let packet_de = read_packet(&mut stream).await.expect("Could not decode packet");

        assert_eq!(packet_de, MqttPacket::UnsubAck(packet));
    }
}
