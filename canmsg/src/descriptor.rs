//! Message descriptor and validator
//!
//! A descriptor is the fixed configuration of a message: identifier, data length, frame kind,
//! direction and remote-request flag. It is validated once as a unit and is immutable
//! afterwards.

use crate::core::{DataLength, Direction, FrameKind, Id};
use crate::driver::controller::Controller;
use crate::error::InitError;
use crate::rx::RxMessage;
use crate::tx::TxMessage;
use embassy_sync::blocking_mutex::raw::RawMutex;

/// Validated message configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Descriptor {
    id: Id,
    length: DataLength,
    remote_request: bool,
    direction: Direction,
}

impl Descriptor {
    /// Validates a descriptor given as raw codes.
    ///
    /// `frame` is 0 for standard, 1 for extended frames. `direction` is 0 for receive,
    /// 1 for transmit. Checks run in order and the first failure wins: frame kind, direction,
    /// identifier range, identifier width for the frame kind, remote request, length.
    pub fn from_raw(
        id: u32,
        length: u8,
        remote_request: bool,
        frame: u8,
        direction: u8,
    ) -> Result<Self, InitError> {
        let frame_kind = FrameKind::try_from_u8(frame).ok_or(InitError::FrameKindNotPlausible)?;
        let direction =
            Direction::try_from_u8(direction).ok_or(InitError::DirectionNotPlausible)?;
        Self::new(id, length, remote_request, frame_kind, direction)
    }

    /// Validates a descriptor.
    ///
    /// Checks run in order and the first failure wins: identifier range, identifier width for
    /// the frame kind, remote request, length.
    pub fn new(
        id: u32,
        length: u8,
        remote_request: bool,
        frame_kind: FrameKind,
        direction: Direction,
    ) -> Result<Self, InitError> {
        if id > FrameKind::Extended.max_id() {
            return Err(InitError::IdOutOfRange);
        }
        let id = Id::new(id, frame_kind).ok_or(InitError::IdNotPlausibleForFrameKind)?;

        if remote_request && direction != Direction::Transmit {
            return Err(InitError::RemoteRequestNotAllowed);
        }

        let length = DataLength::new(usize::from(length)).ok_or(InitError::LengthNotValid)?;

        Ok(Self {
            id,
            length,
            remote_request,
            direction,
        })
    }

    /// Shorthand for a transmit data message
    pub fn transmit(id: Id, length: DataLength) -> Self {
        Self {
            id,
            length,
            remote_request: false,
            direction: Direction::Transmit,
        }
    }

    /// Shorthand for a transmit message that sends remote transmission requests
    pub fn transmit_remote(id: Id, length: DataLength) -> Self {
        Self {
            id,
            length,
            remote_request: true,
            direction: Direction::Transmit,
        }
    }

    /// Shorthand for a receive message
    pub fn receive(id: Id, length: DataLength) -> Self {
        Self {
            id,
            length,
            remote_request: false,
            direction: Direction::Receive,
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn raw_id(&self) -> u32 {
        self.id.as_raw()
    }

    pub fn length(&self) -> DataLength {
        self.length
    }

    pub fn remote_request(&self) -> bool {
        self.remote_request
    }

    pub fn frame_kind(&self) -> FrameKind {
        self.id.kind()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Binds the descriptor to a controller, producing the message variant for its direction.
    pub fn bind<'a, M: RawMutex, C: Controller + ?Sized>(
        self,
        controller: &'a C,
    ) -> Bound<'a, M, C> {
        match self.direction {
            Direction::Transmit => Bound::Transmit(TxMessage::from_descriptor(self, controller)),
            Direction::Receive => Bound::Receive(RxMessage::from_descriptor(self, controller)),
        }
    }
}

/// Message bound to a controller, typed by direction
pub enum Bound<'a, M: RawMutex, C: Controller + ?Sized> {
    Transmit(TxMessage<'a, M, C>),
    Receive(RxMessage<'a, M, C>),
}
