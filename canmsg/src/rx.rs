use core::cell::RefCell;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::core::{DataLength, Id, MAX_DATA_LENGTH};
use crate::descriptor::Descriptor;
use crate::driver::controller::{Controller, ControllerError};
use crate::error::Error;

/// Receive message
///
/// The message holds at most one frame. [`check_for_new_frame`](Self::check_for_new_frame)
/// fetches a matching frame from the controller, which releases the controller-side receive
/// buffer. The payload is then drained one byte at a time with [`next_byte`](Self::next_byte).
/// No new frame is accepted until the held one is fully drained.
///
/// The message does not queue frames. Frames that arrive at the controller while a frame is
/// held stay in the controller and may be overwritten there. This loss is not detected.
///
/// Every operation runs inside the message mutex. With `CriticalSectionRawMutex` the message
/// can be polled from an interrupt handler and drained in thread mode, and a drain never
/// observes a partially written frame.
pub struct RxMessage<'a, M: RawMutex, C: Controller + ?Sized> {
    descriptor: Descriptor,
    controller: &'a C,
    state: Mutex<M, RefCell<State>>,
}

struct State {
    data: [u8; MAX_DATA_LENGTH],
    /// Index of the next byte to hand out, `None` if no frame is held
    cursor: Option<usize>,
    last_error: Option<Error>,
}

impl<'a, M: RawMutex, C: Controller + ?Sized> RxMessage<'a, M, C> {
    pub fn new(id: Id, length: DataLength, controller: &'a C) -> Self {
        Self::from_descriptor(Descriptor::receive(id, length), controller)
    }

    pub(crate) fn from_descriptor(descriptor: Descriptor, controller: &'a C) -> Self {
        debug_assert!(descriptor.direction() == crate::core::Direction::Receive);
        Self {
            descriptor,
            controller,
            state: Mutex::new(RefCell::new(State {
                data: [0; MAX_DATA_LENGTH],
                cursor: None,
                last_error: None,
            })),
        }
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Error of the most recent operation, if it failed
    pub fn last_error(&self) -> Option<Error> {
        self.state.lock(|cell| cell.borrow().last_error)
    }

    /// Most recent failure reported by the controller
    pub fn last_controller_error(&self) -> ControllerError {
        self.controller.last_error()
    }

    /// Fetches a new frame from the controller.
    ///
    /// Fails with `ReceivedDataStillBuffered` while the previous frame is not fully drained.
    /// In that case neither the held bytes nor the cursor change and the controller is not
    /// consulted. Fails with `MessageNotReceived` if the controller has no matching frame.
    ///
    /// A zero-length frame is accepted but leaves nothing to drain.
    pub fn check_for_new_frame(&self) -> Result<(), Error> {
        self.access(|state| {
            if state.cursor.is_some() {
                return Err(Error::ReceivedDataStillBuffered);
            }

            let id = self.descriptor.id();
            let length = self.descriptor.length().as_usize();
            let data = self
                .controller
                .poll_received(id, self.descriptor.length())
                .map_err(|error| {
                    trace!("{:?}: nothing received ({:#x})", id, error.code());
                    Error::MessageNotReceived(error)
                })?;

            let n = data.len().min(length);
            state.data[..n].copy_from_slice(&data[..n]);
            state.data[n..].fill(0);
            state.cursor = if length > 0 { Some(0) } else { None };
            trace!("{:?}: frame received", id);
            Ok(())
        })
    }

    /// Checks whether a received frame still has bytes to hand out.
    pub fn has_data(&self) -> bool {
        self.state.lock(|cell| cell.borrow().cursor.is_some())
    }

    /// Returns the next byte of the held frame and advances the cursor.
    ///
    /// Returning the last byte releases the frame. Returns `None` if no frame is held.
    pub fn pop_byte(&self) -> Option<u8> {
        let length = self.descriptor.length().as_usize();
        self.state.lock(|cell| {
            let mut state = cell.borrow_mut();
            let cursor = state.cursor?;
            let byte = state.data[cursor];
            state.cursor = if cursor + 1 < length {
                Some(cursor + 1)
            } else {
                None
            };
            Some(byte)
        })
    }

    /// Returns the next byte of the held frame, or 0 if no frame is held.
    ///
    /// The value 0 is not an error indication. Check [`has_data`](Self::has_data) first.
    pub fn next_byte(&self) -> u8 {
        self.pop_byte().unwrap_or(0)
    }

    fn access<U>(&self, f: impl FnOnce(&mut State) -> Result<U, Error>) -> Result<U, Error> {
        self.state.lock(|cell| {
            let mut state = cell.borrow_mut();
            state.last_error = None;
            let res = f(&mut *state);
            if let Err(error) = &res {
                state.last_error = Some(*error);
            }
            res
        })
    }
}
