use crate::err::{DecodeError, DecodeErrorKind, EncodeError};
use crate::io::{decode_bytes, decode_u16, decode_u8, decode_utf8, encode_bytes, encode_packet_length, encode_utf8};
use crate::qos::QosLevel;
use crate::topic::TopicName;
use crate::v3::PacketType;
use bytes::{BufMut, Bytes, BytesMut};

/*
 * After a Network Connection is established by a Client to a Server, the first
 * Packet sent from the Client to the Server MUST be a CONNECT Packet
 * [MQTT-3.1.0-1].
 *
 * A Client can only send the CONNECT Packet once over a Network Connection.
 * The Server MUST process a second CONNECT Packet sent from a Client as a
 * protocol violation and disconnect the Client [MQTT-3.1.0-2].
 *
 * The payload contains one or more length-prefixed fields whose presence is
 * determined by the flags in the variable header: the Client Identifier, Will
 * Topic, Will Message, User Name and Password.
 */
#[derive(Clone, PartialEq, Debug)]
pub struct ConnectPacket {
    /*
     * The Protocol Name is the UTF-8 encoded string "MQTT", capitalized, and
     * the Protocol Level for version 3.1.1 is 4 (0x04). The Server MUST
     * respond to a CONNECT Packet with an unsupported Protocol Level with a
     * CONNACK return code 0x01 and then disconnect the Client [MQTT-3.1.2-2].
     */
    level: u8,
    conn_flags: ConnectFlags,

    /*
     * The Keep Alive is a time interval in seconds: the maximum permitted
     * interval between Control Packets sent by the Client. A value of zero
     * turns the keep alive mechanism off. This broker records the value but
     * does not disconnect idle clients.
     */
    keep_alive: u16,

    /*
     * The Client Identifier MUST be present and MUST be the first field in
     * the CONNECT packet payload [MQTT-3.1.3-3]. It keys the Session state
     * the Server holds for the Client.
     */
    client_id: String,

    /// Parsed when the will flag is set, never delivered by this broker.
    will: Option<Will>,

    username: Option<String>,
    password: Option<Bytes>,
}

impl ConnectPacket {
    pub fn new(
        clean_session: bool,
        keep_alive: u16,
        client_id: String,
        username: Option<String>,
        password: Option<Bytes>,
    ) -> Self {
        let mut conn_flags = ConnectFlags::default();

        if username.is_some() {
            conn_flags.set_username(true);
        }

        if password.is_some() {
            conn_flags.set_password(true);
        }

        conn_flags.set_clean_session(clean_session);

        return Self {
            level: 4,
            conn_flags,
            keep_alive,
            client_id,
            will: None,
            username,
            password,
        };
    }

    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        let protocol_name = decode_utf8(bytes)?;

        if protocol_name != "MQTT" {
            return Err(DecodeError::new(
                DecodeErrorKind::InvalidProtocol,
                format!("Expected protocol name MQTT, instead received: {protocol_name}"),
            ));
        }

        let level = decode_u8(bytes)?;

        if level != 4 {
            return Err(DecodeError::new(
                DecodeErrorKind::InvalidProtocol,
                format!("MQTT v3.1.1 requires protocol level 4, instead received: {level}"),
            ));
        }

        let conn_flags = ConnectFlags::from_byte(decode_u8(bytes)?)?;

        let keep_alive = decode_u16(bytes)?;

        let client_id = decode_utf8(bytes)?;

        if client_id.is_empty() {
            return Err(DecodeError::new(
                DecodeErrorKind::ProtocolError,
                String::from("Client id must be at least one byte long."),
            ));
        }

        let mut will = None;

        if conn_flags.will() {
            let topic = decode_utf8(bytes)?;
            let message = decode_bytes(bytes)?;

            will = Some(Will::new(
                TopicName::from_str(topic.as_str())?,
                message,
                conn_flags.will_qos(),
                conn_flags.will_retain(),
            ));
        }

        let username = if conn_flags.username() {
            Some(decode_utf8(bytes)?)
        } else {
            None
        };

        let password = if conn_flags.password() {
            Some(decode_bytes(bytes)?)
        } else {
            None
        };

        return Ok(Self {
            level,
            conn_flags,
            keep_alive,
            client_id,
            will,
            username,
            password,
        });
    }

    pub fn encode(&self) -> Result<Bytes, EncodeError> {
        // protocol name, level byte, connect flags byte, keep alive.
        let mut len = 2 + 4 + 1 + 1 + 2;

        len += 2 + self.client_id.len();

        if let Some(will) = &self.will {
            len += 2 + will.topic.len();
            len += 2 + will.message.len();
        }

        if let Some(username) = &self.username {
            len += 2 + username.len();
        }

        if let Some(password) = &self.password {
            len += 2 + password.len();
        }

        let mut bytes = BytesMut::with_capacity(len + 2);

        bytes.put_u8(PacketType::CONNECT as u8);

        encode_packet_length(&mut bytes, len)?;

        encode_utf8(&mut bytes, "MQTT")?;

        bytes.put_u8(self.level);

        bytes.put_u8(self.conn_flags.as_byte());

        bytes.put_u16(self.keep_alive);

        encode_utf8(&mut bytes, &self.client_id)?;

        if let Some(will) = &self.will {
            encode_utf8(&mut bytes, will.topic.as_str())?;
            encode_bytes(&mut bytes, &will.message)?;
        }

        if let Some(username) = &self.username {
            encode_utf8(&mut bytes, username)?;
        }

        if let Some(password) = &self.password {
            encode_bytes(&mut bytes, password)?;
        }

        return Ok(bytes.into());
    }

    pub fn client_id(&self) -> &str {
        return &self.client_id;
    }

    pub fn clean_session(&self) -> bool {
        return self.conn_flags.clean_session();
    }

    pub fn keep_alive(&self) -> u16 {
        return self.keep_alive;
    }

    pub fn will(&self) -> &Option<Will> {
        return &self.will;
    }

    pub fn username(&self) -> Option<&str> {
        return self.username.as_deref();
    }

    pub fn password(&self) -> Option<&Bytes> {
        return self.password.as_ref();
    }
}

/// Will topic and message carried in the CONNECT payload. The broker parses
/// the fields to stay aligned with the stream but does not publish wills.
#[derive(Debug, Clone, PartialEq)]
pub struct Will {
    topic: TopicName,
    message: Bytes,
    qos: QosLevel,
    retain: bool,
}

impl Will {
    pub fn new(topic: TopicName, message: Bytes, qos: QosLevel, retain: bool) -> Self {
        return Self {
            topic,
            message,
            qos,
            retain,
        };
    }

    pub fn topic(&self) -> &TopicName {
        return &self.topic;
    }

    pub fn message(&self) -> &Bytes {
        return &self.message;
    }

    pub fn qos(&self) -> QosLevel {
        return self.qos;
    }

    pub fn retain(&self) -> bool {
        return self.retain;
    }
}

const USERNAME: u8 = 0b1000_0000;
const PASSWORD: u8 = 0b0100_0000;
const WILL_RETAIN: u8 = 0b0010_0000;
const WILL_QOS_BITS: u8 = 0b0001_1000;
const WILL: u8 = 0b0000_0100;
const CLEAN_SESSION: u8 = 0b0000_0010;
const RESERVED_BIT: u8 = 0b0000_0001;

/*
 * The Connect Flags byte, most significant bits first:
 * username(1) | password(1) | will_retain(1) | will_qos(2) | will(1) |
 * clean_session(1) | reserved(1)
 *
 * The Server MUST validate that the reserved flag is set to zero and
 * disconnect the Client if it is not zero [MQTT-3.1.2-3].
 */
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct ConnectFlags {
    byte: u8,
}

impl ConnectFlags {
    pub fn from_byte(byte: u8) -> Result<Self, DecodeError> {
        if byte & RESERVED_BIT == RESERVED_BIT {
            return Err(DecodeError::new(
                DecodeErrorKind::ProtocolError,
                format!("Connect packet cannot have reserved bit (index 0) set, received: {byte}"),
            ));
        }

        if (byte & WILL_QOS_BITS) >> 3 > 2 {
            return Err(DecodeError::new(
                DecodeErrorKind::WillQoS,
                String::from("Will QoS cannot be set to 3."),
            ));
        }

        if byte & WILL == 0 {
            // the will qos and will retain bits only carry meaning underneath
            // the will flag itself [MQTT-3.1.2-13, MQTT-3.1.2-15].
            if byte & (WILL_QOS_BITS | WILL_RETAIN) != 0 {
                return Err(DecodeError::new(
                    DecodeErrorKind::Will,
                    format!(
                        "Optional will bits were set, but the will bit itself was unset, received: {byte}"
                    ),
                ));
            }
        }

        if byte & PASSWORD == PASSWORD && byte & USERNAME == 0 {
            return Err(DecodeError::new(
                DecodeErrorKind::UsernamePassword,
                format!("Password bit is set and username bit is unset, received: {byte}"),
            ));
        }

        return Ok(Self { byte });
    }

    pub fn as_byte(&self) -> u8 {
        return self.byte;
    }

    pub fn username(&self) -> bool {
        return self.byte & USERNAME == USERNAME;
    }

    pub fn set_username(&mut self, val: bool) {
        if val {
            self.byte = self.byte | USERNAME;
        } else {
            self.byte = self.byte & !USERNAME;
        }
    }

    pub fn password(&self) -> bool {
        return self.byte & PASSWORD == PASSWORD;
    }

    pub fn set_password(&mut self, val: bool) {
        if val {
            self.byte = self.byte | PASSWORD;
        } else {
            self.byte = self.byte & !PASSWORD;
        }
    }

    pub fn will(&self) -> bool {
        return self.byte & WILL == WILL;
    }

    pub fn will_retain(&self) -> bool {
        return self.byte & WILL_RETAIN == WILL_RETAIN;
    }

    pub fn will_qos(&self) -> QosLevel {
        match (self.byte & WILL_QOS_BITS) >> 3 {
            1 => return QosLevel::AtLeastOnce,
            2 => return QosLevel::ExactlyOnce,
            _ => return QosLevel::AtMostOnce,
        }
    }

    pub fn clean_session(&self) -> bool {
        return self.byte & CLEAN_SESSION == CLEAN_SESSION;
    }

    pub fn set_clean_session(&mut self, val: bool) {
        if val {
            self.byte = self.byte | CLEAN_SESSION;
        } else {
            self.byte = self.byte & !CLEAN_SESSION;
        }
    }
}

impl Default for ConnectFlags {
    fn default() -> Self {
        return Self { byte: 0 };
    }
}

#[cfg(test)]
mod packet {
    use bytes::Bytes;

    use crate::io::read_packet;
    use crate::v3::MqttPacket;

    use super::{ConnectFlags, ConnectPacket};

    async fn round_trip(packet: ConnectPacket) -> ConnectPacket {
        let buf = packet.encode().unwrap();
        let mut stream: &[u8] = &buf;
        match read_packet(&mut stream).await.unwrap() {
            MqttPacket::Connect(packet) => return packet,
            other => panic!("Expected CONNECT, decoded {other:?}"),
        }
    }

    #[tokio::test]
    async fn serialize_deserialize() {
        let packet = ConnectPacket::new(true, 100, "id_1".to_string(), None, None);
        assert_eq!(round_trip(packet.clone()).await, packet);

        let packet = ConnectPacket::new(
            false,
            60,
            String::from("TestClientId"),
            Some(String::from("alice")),
            Some(Bytes::from_static(b"hunter2")),
        );
        let packet_de = round_trip(packet.clone()).await;
        assert_eq!(packet_de, packet);
        assert_eq!(packet_de.username(), Some("alice"));
        assert!(!packet_de.clean_session());
    }

    #[test]
    fn rejects_reserved_bit() {
        assert!(ConnectFlags::from_byte(0b0000_0001).is_err());
    }

    #[test]
    fn rejects_will_qos_3() {
        assert!(ConnectFlags::from_byte(0b0001_1100).is_err());
    }

    #[test]
    fn rejects_password_without_username() {
        assert!(ConnectFlags::from_byte(0b0100_0000).is_err());
        assert!(ConnectFlags::from_byte(0b1100_0000).is_ok());
    }

    #[test]
    fn rejects_will_bits_without_will_flag() {
        assert!(ConnectFlags::from_byte(0b0010_0000).is_err());
        assert!(ConnectFlags::from_byte(0b0000_1000).is_err());
    }
}
