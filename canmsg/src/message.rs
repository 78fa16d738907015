//! Message with its direction chosen at run time
//!
//! [`Message`] wraps [`TxMessage`] and [`RxMessage`] behind a single type. It starts
//! uninitialized and is configured from raw codes with [`Message::init`]. Operations on an
//! uninitialized message fail with [`Error::NotInitialized`], operations meant for the other
//! direction fail with [`Error::MethodNotAllowedForDirection`].
//!
//! Prefer the typed messages when the direction is known at compile time.

use core::cell::Cell;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::descriptor::{Bound, Descriptor};
use crate::driver::controller::Controller;
use crate::error::Error;
use crate::rx::RxMessage;
use crate::tx::TxMessage;

pub struct Message<'a, M: RawMutex, C: Controller + ?Sized> {
    bound: Option<Bound<'a, M, C>>,
    last_error: Mutex<M, Cell<Option<Error>>>,
}

impl<'a, M: RawMutex, C: Controller + ?Sized> Message<'a, M, C> {
    pub const fn new() -> Self {
        Self {
            bound: None,
            last_error: Mutex::new(Cell::new(None)),
        }
    }

    /// Validates the configuration and binds the message to `controller`.
    ///
    /// Any previous configuration is discarded, including buffered bytes. On failure the
    /// message is left uninitialized.
    pub fn init(
        &mut self,
        id: u32,
        length: u8,
        remote_request: bool,
        frame: u8,
        direction: u8,
        controller: &'a C,
    ) -> Result<(), Error> {
        self.bound = None;
        let res = Descriptor::from_raw(id, length, remote_request, frame, direction)
            .map(|descriptor| {
                debug!("{:?}: initialized", descriptor.id());
                self.bound = Some(descriptor.bind(controller));
            })
            .map_err(|error| {
                warn!("initialization failed ({:#x})", error.code());
                Error::Init(error)
            });
        self.record(res)
    }

    pub fn is_initialized(&self) -> bool {
        self.bound.is_some()
    }

    pub fn descriptor(&self) -> Option<&Descriptor> {
        match self.bound.as_ref()? {
            Bound::Transmit(msg) => Some(msg.descriptor()),
            Bound::Receive(msg) => Some(msg.descriptor()),
        }
    }

    /// Error of the most recent fallible operation, if it failed
    pub fn last_error(&self) -> Option<Error> {
        self.last_error.lock(|cell| cell.get())
    }

    pub fn as_transmit(&self) -> Option<&TxMessage<'a, M, C>> {
        match self.bound.as_ref()? {
            Bound::Transmit(msg) => Some(msg),
            Bound::Receive(_) => None,
        }
    }

    pub fn as_receive(&self) -> Option<&RxMessage<'a, M, C>> {
        match self.bound.as_ref()? {
            Bound::Receive(msg) => Some(msg),
            Bound::Transmit(_) => None,
        }
    }

    pub fn set_byte(&self, value: u8, slot: usize) -> Result<(), Error> {
        self.record(self.tx().and_then(|msg| msg.set_byte(value, slot)))
    }

    pub fn release_slot(&self, slot: usize) -> Result<(), Error> {
        self.record(self.tx().and_then(|msg| msg.release_slot(slot)))
    }

    /// Returns `false` for receive and uninitialized messages.
    pub fn is_ready_to_send(&self) -> bool {
        self.as_transmit().is_some_and(|msg| msg.is_ready_to_send())
    }

    pub fn check_remote_request_received(&self) -> Result<bool, Error> {
        self.record(self.tx().map(|msg| msg.check_remote_request_received()))
    }

    pub fn send(&self) -> Result<(), Error> {
        self.record(self.tx().and_then(|msg| msg.send()))
    }

    pub fn check_for_new_frame(&self) -> Result<(), Error> {
        self.record(self.rx().and_then(|msg| msg.check_for_new_frame()))
    }

    /// Returns `false` for transmit and uninitialized messages.
    pub fn has_data(&self) -> bool {
        self.as_receive().is_some_and(|msg| msg.has_data())
    }

    /// Returns 0 for transmit and uninitialized messages.
    pub fn next_byte(&self) -> u8 {
        self.as_receive().map_or(0, |msg| msg.next_byte())
    }

    fn tx(&self) -> Result<&TxMessage<'a, M, C>, Error> {
        match &self.bound {
            None => Err(Error::NotInitialized),
            Some(Bound::Transmit(msg)) => Ok(msg),
            Some(Bound::Receive(_)) => Err(Error::MethodNotAllowedForDirection),
        }
    }

    fn rx(&self) -> Result<&RxMessage<'a, M, C>, Error> {
        match &self.bound {
            None => Err(Error::NotInitialized),
            Some(Bound::Receive(msg)) => Ok(msg),
            Some(Bound::Transmit(_)) => Err(Error::MethodNotAllowedForDirection),
        }
    }

    fn record<U>(&self, res: Result<U, Error>) -> Result<U, Error> {
        let error = res.as_ref().err().copied();
        self.last_error.lock(|cell| cell.set(error));
        res
    }
}

impl<M: RawMutex, C: Controller + ?Sized> Default for Message<'_, M, C> {
    fn default() -> Self {
        Self::new()
    }
}
