use crate::err::DecodeError;
use crate::io::decode_u8;
use crate::v3::PacketType;
use crate::ConnectReturnCode;
use bytes::{BufMut, Bytes, BytesMut};

/*
 * The CONNACK Packet is the packet sent by the Server in response to a CONNECT
 * Packet received from a Client. The first packet sent from the Server to the
 * Client MUST be a CONNACK Packet [MQTT-3.2.0-1].
 *
 * If the Server sends a CONNACK packet containing a non-zero return code it
 * MUST set Session Present to 0 [MQTT-3.2.2-4] and then close the Network
 * Connection [MQTT-3.2.2-5].
 */
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct ConnAckPacket {
    session_present: bool,
    return_code: ConnectReturnCode,
}

impl ConnAckPacket {
    pub fn new(session_present: bool, return_code: ConnectReturnCode) -> Self {
        return Self {
            session_present,
            return_code,
        };
    }

    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        let ack_flags = decode_u8(bytes)?;
        let session_present = ack_flags & 0x01 == 0x01;
        let return_code = ConnectReturnCode::try_from(decode_u8(bytes)?)?;

        return Ok(Self {
            session_present,
            return_code,
        });
    }

    pub fn encode(&self) -> Bytes {
        let mut bytes = BytesMut::with_capacity(4);

        bytes.put_u8(PacketType::CONNACK as u8);
        bytes.put_u8(2);
        bytes.put_u8(self.session_present as u8);
        bytes.put_u8(self.return_code as u8);

        return bytes.into();
    }

    pub fn session_present(&self) -> bool {
        return self.session_present;
    }

    pub fn return_code(&self) -> ConnectReturnCode {
        return self.return_code;
    }
}
