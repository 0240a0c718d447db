use crate::err::{DecodeError, DecodeErrorKind};

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug, Hash)]
pub enum QosLevel {
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

impl TryFrom<u8> for QosLevel {
    type Error = DecodeError;
    /// Takes a byte with the non-QoS bits masked off and the QoS bits
    /// right-shifted to index 0.
    fn try_from(value: u8) -> Result<Self, DecodeError> {
        let out = match value {
            0 => Self::AtMostOnce,
            1 => Self::AtLeastOnce,
            2 => Self::ExactlyOnce,
            _ => {
                return Err(DecodeError::new(
                    DecodeErrorKind::QoS,
                    format!("Invalid QoS: {value}, only values 0-2 are valid"),
                ));
            }
        };

        return Ok(out);
    }
}

/*
 * Allowed SUBACK return codes:
 * 0x00 - Success - Maximum QoS 0
 * 0x01 - Success - Maximum QoS 1
 * 0x02 - Success - Maximum QoS 2
 * 0x80 - Failure
 */
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub enum SubAckReturnCode {
    Granted(QosLevel),
    Failure,
}

impl From<QosLevel> for SubAckReturnCode {
    fn from(value: QosLevel) -> Self {
        return Self::Granted(value);
    }
}

impl From<SubAckReturnCode> for u8 {
    fn from(value: SubAckReturnCode) -> u8 {
        match value {
            SubAckReturnCode::Failure => return 0b1000_0000,
            SubAckReturnCode::Granted(qos) => return qos as u8,
        }
    }
}

impl TryFrom<u8> for SubAckReturnCode {
    type Error = DecodeError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value == 0b1000_0000 {
            return Ok(Self::Failure);
        } else {
            return Ok(Self::Granted(QosLevel::try_from(value)?));
        }
    }
}
