use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::err::{DecodeError, DecodeErrorKind, EncodeError, EncodeErrorKind, ReadError};
use crate::v3::{FixedHeader, MqttPacket};

/*
 * MQTT v3.1.1 standard, the Remaining Length field on the fixed header can be
 * at most 4 bytes.
 */
pub const MAX_REMAINING_LEN: usize = (128 as u64).pow(4) as usize - 1;

/// Encodes the Remaining Length as base-128 with a continuation bit on every
/// non-final byte. Returns the number of bytes written (1-4).
pub fn encode_packet_length(bytes: &mut BytesMut, mut len: usize) -> Result<usize, EncodeError> {
    if len > MAX_REMAINING_LEN {
        return Err(EncodeError::new(
            EncodeErrorKind::OversizedPayload,
            format!("Packet payload exceeded max length of 128^4 - 1, found length {len}"),
        ));
    }

    let mut num_bytes = 0;

    loop {
        let mut d: u8 = (len % 128) as u8;

        len /= 128;

        if len > 0 {
            d |= 128;
        }

        bytes.put_u8(d);

        num_bytes += 1;

        if len == 0 {
            break;
        }
    }

    return Ok(num_bytes);
}

/// Decodes a Remaining Length from a buffer, consuming the length bytes.
/// A fifth continuation byte is a protocol violation.
pub fn decode_packet_length(bytes: &mut Bytes) -> Result<usize, DecodeError> {
    let mut len: usize = 0;
    let mut multiplier: usize = 1;

    for i in 0.. {
        if i == 4 {
            return Err(DecodeError::new(
                DecodeErrorKind::MalformedLength,
                String::from("Remaining length exceeded the 4 byte maximum."),
            ));
        }

        let byte = decode_u8(bytes)?;
        len += (byte & 0x7F) as usize * multiplier;
        multiplier *= 128;

        if byte & 0x80 == 0 {
            break;
        }
    }

    return Ok(len);
}

pub fn encode_utf8(bytes: &mut BytesMut, val: &str) -> Result<(), EncodeError> {
    return encode_bytes(bytes, val.as_bytes());
}

pub fn encode_bytes(bytes: &mut BytesMut, val: &[u8]) -> Result<(), EncodeError> {
    let len = val.len() as u16;

    bytes.put_slice(&len.to_be_bytes());
    bytes.put_slice(val);

    return Ok(());
}

/// Decodes a two-byte length prefix followed by that many bytes of UTF-8.
pub fn decode_utf8(bytes: &mut Bytes) -> Result<String, DecodeError> {
    let buf = decode_bytes(bytes)?;

    match String::from_utf8(buf.to_vec()) {
        Ok(string) => return Ok(string),
        Err(e) => {
            return Err(DecodeError::new(
                DecodeErrorKind::Utf8ParseError,
                e.to_string(),
            ))
        }
    }
}

pub fn decode_bytes(bytes: &mut Bytes) -> Result<Bytes, DecodeError> {
    let len = decode_u16(bytes)?;

    if len as usize > bytes.len() {
        return Err(DecodeError::new(
            DecodeErrorKind::MalformedLength,
            format!(
                "Attempted invalid memory access, packet remaining length: {}, encoded length: {len}",
                bytes.len()
            ),
        ));
    }

    let slice = bytes.slice(0..len as usize);
    bytes.advance(len as usize);
    return Ok(slice);
}

pub fn decode_u16(bytes: &mut Bytes) -> Result<u16, DecodeError> {
    if bytes.len() < 2 {
        return Err(DecodeError::new(
            DecodeErrorKind::MalformedLength,
            format!(
                "Expected a two byte field, packet remaining length: {}",
                bytes.len()
            ),
        ));
    }

    return Ok(bytes.get_u16());
}

pub fn decode_u8(bytes: &mut Bytes) -> Result<u8, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::new(
            DecodeErrorKind::MalformedLength,
            String::from("Expected a one byte field, packet body was exhausted."),
        ));
    }

    return Ok(bytes.get_u8());
}

/// Reads exactly one MQTT control packet off the stream.
///
/// Reads the fixed header byte, the 1-4 byte Remaining Length, then exactly
/// that many body bytes before handing the body to the per-type decoder.
///
/// Errors with [ReadError::StreamClosed] when the peer closes cleanly at a
/// packet boundary, [ReadError::UnexpectedEof] when it closes mid-packet,
/// and [ReadError::Malformed] on any decoder-level violation.
pub async fn read_packet<S>(stream: &mut S) -> Result<MqttPacket, ReadError>
where
    S: AsyncRead + Unpin,
{
    let first = match stream.read_u8().await {
        Ok(byte) => byte,
        Err(err) => {
            // EOF before the first header byte is an orderly close, not a
            // truncated packet.
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                return Err(ReadError::StreamClosed);
            }
            return Err(err.into());
        }
    };

    let f_header = FixedHeader::from_byte(first)?;

    let rest_len = read_remaining_length(stream).await?;

    let mut body = vec![0u8; rest_len];
    stream.read_exact(&mut body).await?;
    let mut body = Bytes::from(body);

    let packet = MqttPacket::decode(f_header, &mut body)?;
    return Ok(packet);
}

async fn read_remaining_length<S>(stream: &mut S) -> Result<usize, ReadError>
where
    S: AsyncRead + Unpin,
{
    let mut len: usize = 0;
    let mut multiplier: usize = 1;

    for i in 0.. {
        if i == 4 {
            return Err(ReadError::Malformed(DecodeError::new(
                DecodeErrorKind::MalformedLength,
                String::from("Remaining length exceeded the 4 byte maximum."),
            )));
        }

        let byte = stream.read_u8().await?;
        len += (byte & 0x7F) as usize * multiplier;
        multiplier *= 128;

        if byte & 0x80 == 0 {
            break;
        }
    }

    return Ok(len);
}

#[cfg(test)]
mod packet_length {
    use bytes::{Bytes, BytesMut};

    use super::{decode_packet_length, encode_packet_length, MAX_REMAINING_LEN};

    #[test]
    fn round_trip() {
        for len in [0, 1, 127, 128, 16_383, 16_384, 2_097_151, 2_097_152, MAX_REMAINING_LEN] {
            let mut bytes = BytesMut::new();
            encode_packet_length(&mut bytes, len).unwrap();

            let mut bytes = Bytes::from(bytes);
            assert_eq!(decode_packet_length(&mut bytes).unwrap(), len);
            assert!(bytes.is_empty());
        }
    }

    #[test]
    fn encoded_width_at_thresholds() {
        let widths = [
            (0, 1),
            (127, 1),
            (128, 2),
            (16_383, 2),
            (16_384, 3),
            (2_097_151, 3),
            (2_097_152, 4),
            (MAX_REMAINING_LEN, 4),
        ];

        for (len, width) in widths {
            let mut bytes = BytesMut::new();
            let n = encode_packet_length(&mut bytes, len).unwrap();
            assert_eq!(n, width, "length {len}");
        }
    }

    #[test]
    fn zero_encodes_as_single_null_byte() {
        let mut bytes = BytesMut::new();
        encode_packet_length(&mut bytes, 0).unwrap();
        assert_eq!(&bytes[..], &[0x00]);
    }

    #[test]
    fn oversized_length_errors() {
        let mut bytes = BytesMut::new();
        assert!(encode_packet_length(&mut bytes, MAX_REMAINING_LEN + 1).is_err());
    }

    #[test]
    fn fifth_continuation_byte_errors() {
        let mut bytes = Bytes::from_static(&[0xFF, 0xFF, 0xFF, 0xFF, 0x7F]);
        assert!(decode_packet_length(&mut bytes).is_err());
    }
}

#[cfg(test)]
mod strings {
    use bytes::{Bytes, BytesMut};

    use super::{decode_utf8, encode_utf8};

    #[test]
    fn round_trip() {
        let mut bytes = BytesMut::new();
        encode_utf8(&mut bytes, "devices/alpha").unwrap();

        let mut bytes = Bytes::from(bytes);
        assert_eq!(decode_utf8(&mut bytes).unwrap(), "devices/alpha");
    }

    #[test]
    fn truncated_body_errors() {
        // Length prefix claims 5 bytes, only 2 are present.
        let mut bytes = Bytes::from_static(&[0x00, 0x05, b'h', b'i']);
        assert!(decode_utf8(&mut bytes).is_err());
    }

    #[test]
    fn invalid_utf8_errors() {
        let mut bytes = Bytes::from_static(&[0x00, 0x02, 0xC3, 0x28]);
        assert!(decode_utf8(&mut bytes).is_err());
    }
}
