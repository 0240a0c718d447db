use crate::err::{DecodeError, DecodeErrorKind};
use crate::v3::PacketType;
use bytes::{Buf, Bytes};

/*
 * A PINGRESP Packet is sent by the Server to the Client in response to a
 * PINGREQ Packet. It has no variable header and no payload.
 */
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct PingRespPacket;

impl PingRespPacket {
    pub fn new() -> Self {
        return Self;
    }

    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        if bytes.remaining() != 0 {
            return Err(DecodeError::new(
                DecodeErrorKind::ProtocolError,
                String::from("A PINGRESP packet cannot carry a body."),
            ));
        }
        return Ok(Self);
    }

    pub fn encode(&self) -> Bytes {
        return Bytes::from_static(&[PacketType::PINGRESP as u8, 0]);
    }
}

impl Default for PingRespPacket {
    fn default() -> Self {
        return Self::new();
    }
}
