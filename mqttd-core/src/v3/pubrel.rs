use crate::err::DecodeError;
use crate::io::decode_u16;
use crate::v3::PacketType;
use bytes::{BufMut, Bytes, BytesMut};

/*
 * A PUBREL Packet is the response to a PUBREC Packet. It is the third packet
 * of the QoS 2 protocol exchange.
 *
 * Bits 3,2,1 and 0 of the fixed header in the PUBREL Control Packet are
 * reserved and MUST be set to 0,0,1 and 0 respectively [MQTT-3.6.1-1].
 */
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct PubRelPacket {
    packet_id: u16,
}

impl PubRelPacket {
    pub fn new(packet_id: u16) -> Self {
        return Self { packet_id };
    }

    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        let packet_id = decode_u16(bytes)?;
        return Ok(Self { packet_id });
    }

    pub fn encode(&self) -> Bytes {
        let mut bytes = BytesMut::with_capacity(4);

        bytes.put_u8(PacketType::PUBREL as u8 | 0x02);
        bytes.put_u8(2);
        bytes.put_u16(self.packet_id);

        return bytes.into();
    }

    pub fn id(&self) -> u16 {
        return self.packet_id;
    }
}
