use crate::err::{DecodeError, DecodeErrorKind};
use crate::v3::PacketType;
use bytes::{Buf, Bytes};

/*
 * The PINGREQ Packet is sent from a Client to the Server. It has no variable
 * header and no payload.
 */
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct PingReqPacket;

impl PingReqPacket {
    pub fn new() -> Self {
        return Self;
    }

    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        if bytes.remaining() != 0 {
            return Err(DecodeError::new(
                DecodeErrorKind::ProtocolError,
                String::from("A PINGREQ packet cannot carry a body."),
            ));
        }
        return Ok(Self);
    }

    pub fn encode(&self) -> Bytes {
        return Bytes::from_static(&[PacketType::PINGREQ as u8, 0]);
    }
}

impl Default for PingReqPacket {
    fn default() -> Self {
        return Self::new();
    }
}
