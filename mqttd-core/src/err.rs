use std::{error::Error, fmt::Display};

#[derive(Debug, Clone)]
pub struct EncodeError {
    kind: EncodeErrorKind,
    message: String,
}

impl EncodeError {
    pub fn new(kind: EncodeErrorKind, message: String) -> Self {
        return Self { kind, message };
    }

    pub fn kind(&self) -> EncodeErrorKind {
        return self.kind;
    }
}

impl Error for EncodeError {}

impl Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

#[derive(Clone, Debug, Copy, PartialEq)]
pub enum EncodeErrorKind {
    OversizedPayload,
}

#[derive(Debug, Clone)]
pub struct DecodeError {
    kind: DecodeErrorKind,
    message: String,
}

impl Error for DecodeError {}

impl Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl DecodeError {
    pub fn new(kind: DecodeErrorKind, message: String) -> Self {
        return Self { kind, message };
    }

    pub fn kind(&self) -> DecodeErrorKind {
        return self.kind;
    }

    pub fn message(&self) -> &str {
        return &self.message;
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DecodeErrorKind {
    FlagBits,
    PacketType,
    WillQoS,
    Will,
    QoS,
    Utf8ParseError,
    MalformedLength,
    MalformedTopicName,
    UsernamePassword,
    InvalidProtocol,
    InvalidReturnCode,
    ProtocolError,
}

/// Raised by the packet reader. Distinguishes a peer that closed cleanly at a
/// packet boundary from one that vanished mid-packet, so callers can log the
/// two cases at different levels.
#[derive(Debug)]
pub enum ReadError {
    StreamClosed,
    UnexpectedEof,
    Malformed(DecodeError),
    Io(std::io::Error),
}

impl Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StreamClosed => write!(f, "Stream closed by peer."),
            Self::UnexpectedEof => write!(f, "Stream closed mid-packet."),
            Self::Malformed(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ReadError {}

impl From<DecodeError> for ReadError {
    fn from(value: DecodeError) -> Self {
        return Self::Malformed(value);
    }
}

impl From<std::io::Error> for ReadError {
    fn from(value: std::io::Error) -> Self {
        match value.kind() {
            std::io::ErrorKind::UnexpectedEof => return Self::UnexpectedEof,
            _ => return Self::Io(value),
        }
    }
}

pub mod client {
    use std::fmt::Display;

    use tokio::io;

    use super::{DecodeError, EncodeError, ReadError};

    #[derive(Debug)]
    pub enum ErrorKind {
        IoError(io::Error),
        ProtocolError,
        StreamClosed,
        DecodeError,
        EncodeError,
    }

    impl Display for ErrorKind {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            return write!(f, "{:?}", self);
        }
    }

    #[derive(Debug)]
    pub struct ClientError {
        kind: ErrorKind,
        message: String,
    }

    impl ClientError {
        pub fn new(kind: ErrorKind, message: String) -> Self {
            return Self { kind, message };
        }

        pub fn kind(&self) -> &ErrorKind {
            return &self.kind;
        }
    }

    impl From<DecodeError> for ClientError {
        fn from(value: DecodeError) -> Self {
            return Self {
                kind: ErrorKind::DecodeError,
                message: value.message,
            };
        }
    }

    impl From<EncodeError> for ClientError {
        fn from(value: EncodeError) -> Self {
            return Self {
                kind: ErrorKind::EncodeError,
                message: value.message,
            };
        }
    }

    impl From<std::io::Error> for ClientError {
        fn from(value: io::Error) -> Self {
            return Self {
                kind: ErrorKind::IoError(value),
                message: String::new(),
            };
        }
    }

    impl From<ReadError> for ClientError {
        fn from(value: ReadError) -> Self {
            match value {
                ReadError::StreamClosed | ReadError::UnexpectedEof => {
                    return Self {
                        kind: ErrorKind::StreamClosed,
                        message: value.to_string(),
                    }
                }
                ReadError::Malformed(err) => return err.into(),
                ReadError::Io(err) => return err.into(),
            }
        }
    }

    impl Display for ClientError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            return write!(f, "{}. {}", self.kind, self.message);
        }
    }

    impl std::error::Error for ClientError {}
}

pub mod server {
    use std::fmt::Display;

    use tokio::io;

    use super::{DecodeError, EncodeError, ReadError};

    #[derive(Debug)]
    pub struct ServerError {
        kind: ErrorKind,
        message: String,
    }

    #[derive(Debug)]
    pub enum ErrorKind {
        DecodeError,
        EncodeError,
        IoError(io::Error),
        StreamClosed,
        UnexpectedEof,
        ProtocolError,
    }

    impl Display for ErrorKind {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            return write!(f, "{:?}", self);
        }
    }

    impl From<DecodeError> for ServerError {
        fn from(value: DecodeError) -> Self {
            return Self {
                kind: ErrorKind::DecodeError,
                message: value.message,
            };
        }
    }

    impl From<EncodeError> for ServerError {
        fn from(value: EncodeError) -> Self {
            return Self {
                kind: ErrorKind::EncodeError,
                message: value.message,
            };
        }
    }

    impl From<std::io::Error> for ServerError {
        fn from(value: io::Error) -> Self {
            return Self {
                kind: ErrorKind::IoError(value),
                message: String::new(),
            };
        }
    }

    impl From<ReadError> for ServerError {
        fn from(value: ReadError) -> Self {
            match value {
                ReadError::StreamClosed => {
                    return Self {
                        kind: ErrorKind::StreamClosed,
                        message: String::new(),
                    }
                }
                ReadError::UnexpectedEof => {
                    return Self {
                        kind: ErrorKind::UnexpectedEof,
                        message: String::from("Peer closed the stream mid-packet."),
                    }
                }
                ReadError::Malformed(err) => return err.into(),
                ReadError::Io(err) => return err.into(),
            }
        }
    }

    impl ServerError {
        pub fn new(kind: ErrorKind, message: String) -> Self {
            Self { kind, message }
        }

        pub fn kind(&self) -> &ErrorKind {
            return &self.kind;
        }

        pub fn message(&self) -> &str {
            return &self.message;
        }
    }

    impl Display for ServerError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            return write!(f, "{}. {}", self.kind, self.message);
        }
    }

    impl std::error::Error for ServerError {}
}
