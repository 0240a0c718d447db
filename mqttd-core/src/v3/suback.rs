use crate::err::{DecodeError, EncodeError};
use crate::io::{decode_u16, decode_u8, encode_packet_length};
use crate::qos::SubAckReturnCode;
use crate::v3::PacketType;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/*
 * A SUBACK Packet is sent by the Server to the Client to confirm receipt and
 * processing of a SUBSCRIBE Packet.
 *
 * The payload contains a list of return codes. Each return code corresponds
 * to a Topic in the SUBSCRIBE Packet being acknowledged, and the order of
 * return codes MUST match the order of Topics in the SUBSCRIBE Packet
 * [MQTT-3.9.3-1].
 */
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Debug)]
pub struct SubAckPacket {
    packet_id: u16,
    return_codes: Vec<SubAckReturnCode>,
}

impl SubAckPacket {
    pub fn new(packet_id: u16, return_codes: Vec<SubAckReturnCode>) -> Self {
        return Self {
            packet_id,
            return_codes,
        };
    }

    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        let packet_id = decode_u16(bytes)?;

        let mut return_codes = Vec::new();

        while bytes.remaining() > 0 {
            return_codes.push(SubAckReturnCode::try_from(decode_u8(bytes)?)?);
        }

        return Ok(Self {
            packet_id,
            return_codes,
        });
    }

    pub fn encode(&self) -> Result<Bytes, EncodeError> {
        let len = 2 + self.return_codes.len();

        let mut bytes = BytesMut::with_capacity(len + 2);

        bytes.put_u8(PacketType::SUBACK as u8);
        encode_packet_length(&mut bytes, len)?;

        bytes.put_u16(self.packet_id);

        for code in &self.return_codes {
            bytes.put_u8((*code).into());
        }

        return Ok(bytes.into());
    }

    pub fn id(&self) -> u16 {
        return self.packet_id;
    }

    pub fn return_codes(&self) -> &[SubAckReturnCode] {
        return &self.return_codes;
    }
}

#[cfg(test)]
mod packet {
    use crate::io::read_packet;
    use crate::qos::{QosLevel, SubAckReturnCode};
    use crate::v3::MqttPacket;

    use super::SubAckPacket;

    #[tokio::test]
    async fn serialize_deserialize() {
        let packet = SubAckPacket::new(
            1234,
            vec![
                SubAckReturnCode::Granted(QosLevel::AtLeastOnce),
                SubAckReturnCode::Failure,
            ],
        );
        let buf = packet.encode().unwrap();

        let mut stream: &[u8] = &buf;
        let packet_de = read_packet(&mut stream).await.expect("Could not decode packet");

        assert_eq!(packet_de, MqttPacket::SubAck(packet));
    }
}
