use crate::err::DecodeError;
use crate::io::decode_u16;
use crate::v3::PacketType;
use bytes::{BufMut, Bytes, BytesMut};

/*
 * A PUBACK Packet is the response to a PUBLISH Packet with QoS level 1.
 */
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct PubAckPacket {
    packet_id: u16,
}

impl PubAckPacket {
    pub fn new(packet_id: u16) -> Self {
        return Self { packet_id };
    }

    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        let packet_id = decode_u16(bytes)?;
        return Ok(Self { packet_id });
    }

    pub fn encode(&self) -> Bytes {
        let mut bytes = BytesMut::with_capacity(4);

        bytes.put_u8(PacketType::PUBACK as u8);
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

    use super::PubAckPacket;

    #[tokio::test]
    async fn serialize_deserialize() {
        let packet = PubAckPacket::new(1234);
        let buf = packet.encode();

        let mut stream: &[u8] = &buf;
        let packet_de = read_packet(&mut stream).await.expect("Could not decode packet");

        assert_eq!(packet_de, MqttPacket::PubAck(packet));
    }
}
