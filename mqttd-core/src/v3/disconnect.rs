use crate::err::{DecodeError, DecodeErrorKind};
use crate::v3::PacketType;
use bytes::{Buf, Bytes};

/*
 * The DISCONNECT Packet is the final Control Packet sent from the Client to
 * the Server. It indicates that the Client is disconnecting cleanly. It has
 * no variable header and no payload.
 */
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct DisconnectPacket;

impl DisconnectPacket {
    pub fn new() -> Self {
        return Self;
    }

    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        if bytes.remaining() != 0 {
            return Err(DecodeError::new(
                DecodeErrorKind::ProtocolError,
                String::from("A DISCONNECT packet cannot carry a body."),
            ));
        }
        return Ok(Self);
    }

    pub fn encode(&self) -> Bytes {
        return Bytes::from_static(&[PacketType::DISCONNECT as u8, 0]);
    }
}

impl Default for DisconnectPacket {
    fn default() -> Self {
        return Self::new();
    }
}

#[cfg(test)]
mod packet {
    use crate::io::read_packet;
    use crate::v3::MqttPacket;

    use super::DisconnectPacket;

    #[tokio::test]
    async fn serialize_deserialize() {
        let packet = DisconnectPacket::new();
        let buf = packet.encode();

        let mut stream: &[u8] = &buf;
        let packet_de = read_packet(&mut stream).await.expect("Could not decode packet");

        assert_eq!(packet_de, MqttPacket::Disconnect(packet));
    }
}
