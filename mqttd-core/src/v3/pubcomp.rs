use crate::err::DecodeError;
use crate::io::decode_u16;
use crate::v3::PacketType;
use bytes::{BufMut, Bytes, BytesMut};

/*
 * The PUBCOMP Packet is the response to a PUBREL Packet. It is the fourth and
 * final packet of the QoS 2 protocol exchange.
 */
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct PubCompPacket {
    packet_id: u16,
}

impl PubCompPacket {
    pub fn new(packet_id: u16) -> Self {
        return Self { packet_id };
    }

    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        let packet_id = decode_u16(bytes)?;
        return Ok(Self { packet_id });
    }

    pub fn encode(&self) -> Bytes {
        let mut bytes = BytesMut::with_capacity(4);

        bytes.put_u8(PacketType::PUBCOMP as u8);
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

    use super::PubCompPacket;

    #[tokio::test]
    async fn serialize_deserialize() {
        let packet = PubCompPacket::new(9);
        let buf = packet.encode();

        let mut stream: &[u8] = &buf;
        let packet_de = read_packet(&mut stream).await.expect("Could not decode packet");

        assert_eq!(packet_de, MqttPacket::PubComp(packet));
    }
}
