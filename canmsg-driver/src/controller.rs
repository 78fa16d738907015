//! Capability contract between a CAN controller driver and message objects

use crate::core::{DataLength, Id};
use crate::frame::{Data, Frame};

/// Raw controller error code
///
/// The encoding is driver-specific. The lowest nibble is reserved: message objects merge their
/// own error kind into it when reporting a failed transmission or reception, so drivers should
/// keep their codes in the upper 12 bits. Slot allocation codes are the exception and live in
/// the low byte (see [`Controller::find_free_tx_slot`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerError(u16);

impl ControllerError {
    pub const NONE: Self = Self(0);

    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    pub const fn code(&self) -> u16 {
        self.0
    }

    pub const fn is_none(&self) -> bool {
        self.0 == Self::NONE.0
    }
}

impl From<ControllerError> for u16 {
    fn from(value: ControllerError) -> Self {
        value.code()
    }
}

/// Handle to a controller transmit mailbox
///
/// A slot is only meaningful between the `find_free_tx_slot` call that returned it and the
/// following `transmit`. Message objects never keep it across operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TxSlot(u8);

impl TxSlot {
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    pub const fn index(&self) -> u8 {
        self.0
    }
}

/// Transmit request priority
///
/// Arbitration between pending mailboxes of the same controller. Bus arbitration is still
/// decided by the identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TxPriority {
    #[default]
    Lowest = 0,
    Low = 1,
    High = 2,
    Highest = 3,
}

impl TxPriority {
    pub const fn into_u8(self) -> u8 {
        self as u8
    }
}

/// Options passed along with a transmission request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TxOptions {
    pub priority: TxPriority,
}

/// CAN controller capability consumed by message objects
///
/// The controller owns all bus-level mutable state (mailbox allocation, receive buffer
/// release). It is shared by reference among all messages bound to the bus, hence `&self`
/// receivers. Every method must be non-blocking.
///
/// Methods may be called from interrupt context (a receive message polled in an interrupt
/// handler). Implementations should synchronize with a mutex that is safe at that level.
pub trait Controller {
    /// Finds a free transmit mailbox.
    ///
    /// When every mailbox is pending, returns a status code. By convention the code occupies
    /// the low byte and is `>= 0xE0`.
    fn find_free_tx_slot(&self) -> Result<TxSlot, ControllerError>;

    /// Writes the frame into the given mailbox without requesting transmission.
    fn stage_frame(&self, slot: TxSlot, frame: &Frame) -> Result<(), ControllerError>;

    /// Requests transmission of a staged mailbox.
    fn transmit(&self, slot: TxSlot, options: TxOptions) -> Result<(), ControllerError>;

    /// Checks whether a remote transmission request for `id` has arrived and consumes it.
    fn poll_remote_request(&self, id: Id) -> bool;

    /// Fetches a received data frame matching `id` and `length`, releasing the controller-side
    /// receive buffer.
    fn poll_received(&self, id: Id, length: DataLength) -> Result<Data, ControllerError>;

    /// Returns the code of the most recent controller failure.
    fn last_error(&self) -> ControllerError;
}
