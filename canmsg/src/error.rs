//! Layered error model
//!
//! Message-level kinds are structured values. Kinds caused by a controller failure carry the
//! controller's own code as a second field. [`Error::code`] folds both into the packed 16-bit
//! encoding used in diagnostic logs:
//!
//! | Kind | Code |
//! |---|---|
//! | `NotInitialized` | `0x1000` |
//! | `ValueOutOfRange` | `0x2000` |
//! | `MethodNotAllowedForDirection` | `0x3000` |
//! | `BufferAlreadyFilled` | `0x4000` |
//! | `MessageNotComplete` | `0x5000` |
//! | `NoFreeTransmitBuffer` | `0x6000` or slot status (low byte) |
//! | `FillingTransmitBufferFailed` | `0x7000` |
//! | `ReceivedDataStillBuffered` | `0x8000` |
//! | `Init(..)` | `0xF100` to `0xF600` |
//! | `MessageNotSent` | controller code or `0x000E` |
//! | `MessageNotReceived` | controller code or `0x000F` |

use crate::driver::controller::ControllerError;

/// Descriptor validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitError {
    /// Raw frame kind code is neither standard nor extended.
    FrameKindNotPlausible,
    /// Raw direction code is neither receive nor transmit.
    DirectionNotPlausible,
    /// Identifier exceeds 29 bits.
    IdOutOfRange,
    /// Identifier exceeds 11 bits on a standard frame.
    IdNotPlausibleForFrameKind,
    /// Remote transmission request on a receive message.
    RemoteRequestNotAllowed,
    /// Data length exceeds 8 bytes.
    LengthNotValid,
}

impl InitError {
    pub const fn code(&self) -> u16 {
        match self {
            InitError::FrameKindNotPlausible => 0xF100,
            InitError::DirectionNotPlausible => 0xF200,
            InitError::IdOutOfRange => 0xF300,
            InitError::IdNotPlausibleForFrameKind => 0xF400,
            InitError::RemoteRequestNotAllowed => 0xF500,
            InitError::LengthNotValid => 0xF600,
        }
    }
}

impl core::fmt::Display for InitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            InitError::FrameKindNotPlausible => "frame kind is neither standard nor extended",
            InitError::DirectionNotPlausible => "direction is neither receive nor transmit",
            InitError::IdOutOfRange => "identifier exceeds 29 bits",
            InitError::IdNotPlausibleForFrameKind => {
                "identifier exceeds 11 bits of a standard frame"
            }
            InitError::RemoteRequestNotAllowed => {
                "remote request is only allowed on transmit messages"
            }
            InitError::LengthNotValid => "data length exceeds 8 bytes",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for InitError {}

/// Message operation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The message was never successfully initialized.
    NotInitialized,
    /// The operation does not apply to the message direction.
    MethodNotAllowedForDirection,
    /// Slot index is beyond the message data length.
    ValueOutOfRange,
    /// Slot already holds a byte for the current cycle.
    BufferAlreadyFilled,
    /// Not every slot within the data length is filled.
    MessageNotComplete,
    /// The controller has no free transmit mailbox. Carries the slot status code.
    NoFreeTransmitBuffer(ControllerError),
    /// The controller rejected the frame while staging it.
    FillingTransmitBufferFailed,
    /// The controller failed to request transmission.
    MessageNotSent(ControllerError),
    /// The previous frame has not been fully drained yet.
    ReceivedDataStillBuffered,
    /// No matching frame could be fetched from the controller.
    MessageNotReceived(ControllerError),
    /// Descriptor validation failed.
    Init(InitError),
}

impl Error {
    const MESSAGE_NOT_SENT: u16 = 0x000E;
    const MESSAGE_NOT_RECEIVED: u16 = 0x000F;

    /// Underlying controller error of the composite kinds
    pub const fn controller_error(&self) -> Option<ControllerError> {
        match self {
            Error::NoFreeTransmitBuffer(error)
            | Error::MessageNotSent(error)
            | Error::MessageNotReceived(error) => Some(*error),
            _ => None,
        }
    }

    /// Packed 16-bit encoding of the error
    pub const fn code(&self) -> u16 {
        match self {
            Error::NotInitialized => 0x1000,
            Error::ValueOutOfRange => 0x2000,
            Error::MethodNotAllowedForDirection => 0x3000,
            Error::BufferAlreadyFilled => 0x4000,
            Error::MessageNotComplete => 0x5000,
            Error::NoFreeTransmitBuffer(status) => 0x6000 | (status.code() & 0x00FF),
            Error::FillingTransmitBufferFailed => 0x7000,
            Error::ReceivedDataStillBuffered => 0x8000,
            Error::MessageNotSent(error) => (error.code() & 0xFFF0) | Self::MESSAGE_NOT_SENT,
            Error::MessageNotReceived(error) => {
                (error.code() & 0xFFF0) | Self::MESSAGE_NOT_RECEIVED
            }
            Error::Init(error) => error.code(),
        }
    }
}

impl From<InitError> for Error {
    fn from(value: InitError) -> Self {
        Error::Init(value)
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::NotInitialized => f.write_str("message is not initialized"),
            Error::MethodNotAllowedForDirection => {
                f.write_str("operation not allowed for the message direction")
            }
            Error::ValueOutOfRange => f.write_str("slot index out of range"),
            Error::BufferAlreadyFilled => f.write_str("slot is already filled"),
            Error::MessageNotComplete => f.write_str("message is not complete"),
            Error::NoFreeTransmitBuffer(status) => {
                write!(f, "no free transmit buffer (status {:#06x})", status.code())
            }
            Error::FillingTransmitBufferFailed => f.write_str("filling transmit buffer failed"),
            Error::MessageNotSent(error) => {
                write!(
                    f,
                    "message not sent (controller error {:#06x})",
                    error.code()
                )
            }
            Error::ReceivedDataStillBuffered => f.write_str("received data is still buffered"),
            Error::MessageNotReceived(error) => {
                write!(
                    f,
                    "message not received (controller error {:#06x})",
                    error.code()
                )
            }
            Error::Init(error) => write!(f, "initialization failed: {error}"),
        }
    }
}

impl core::error::Error for Error {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Error::Init(error) => Some(error),
            _ => None,
        }
    }
}
