use core::cell::RefCell;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::core::{DataLength, Id, MAX_DATA_LENGTH, SlotSet};
use crate::descriptor::Descriptor;
use crate::driver::controller::{Controller, ControllerError, TxOptions};
use crate::driver::frame::{Data, Frame};
use crate::error::Error;

/// Transmit message
///
/// The message collects its payload byte by byte. Each slot within the data length is
/// write-once per cycle: a filled slot must be released before it can be overwritten.
/// Once every slot is filled, [`send`](Self::send) hands the frame to the controller and,
/// on success, starts a new empty cycle.
///
/// A message configured as a remote transmission request carries no payload and can be sent
/// at any time.
///
/// A failed send leaves the payload in place, so it can be retried without refilling.
///
/// Every operation runs inside the message mutex. With `CriticalSectionRawMutex` the same
/// message may be filled in one execution context and sent from another.
pub struct TxMessage<'a, M: RawMutex, C: Controller + ?Sized> {
    descriptor: Descriptor,
    options: TxOptions,
    controller: &'a C,
    state: Mutex<M, RefCell<State>>,
}

struct State {
    data: [u8; MAX_DATA_LENGTH],
    filled: SlotSet,
    last_error: Option<Error>,
}

impl<'a, M: RawMutex, C: Controller + ?Sized> TxMessage<'a, M, C> {
    /// Creates a data message.
    pub fn new(id: Id, length: DataLength, controller: &'a C) -> Self {
        Self::from_descriptor(Descriptor::transmit(id, length), controller)
    }

    /// Creates a message that sends remote transmission requests for `length` bytes.
    pub fn new_remote(id: Id, length: DataLength, controller: &'a C) -> Self {
        Self::from_descriptor(Descriptor::transmit_remote(id, length), controller)
    }

    pub(crate) fn from_descriptor(descriptor: Descriptor, controller: &'a C) -> Self {
        debug_assert!(descriptor.direction() == crate::core::Direction::Transmit);
        Self {
            descriptor,
            options: TxOptions::default(),
            controller,
            state: Mutex::new(RefCell::new(State {
                data: [0; MAX_DATA_LENGTH],
                filled: SlotSet::NONE,
                last_error: None,
            })),
        }
    }

    /// Sets the options passed to the controller with every transmission request.
    pub fn with_options(mut self, options: TxOptions) -> Self {
        self.options = options;
        self
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn options(&self) -> TxOptions {
        self.options
    }

    /// Error of the most recent operation, if it failed
    pub fn last_error(&self) -> Option<Error> {
        self.state.lock(|cell| cell.borrow().last_error)
    }

    /// Most recent failure reported by the controller
    pub fn last_controller_error(&self) -> ControllerError {
        self.controller.last_error()
    }

    /// Slots filled in the current cycle
    pub fn filled_slots(&self) -> SlotSet {
        self.state.lock(|cell| cell.borrow().filled)
    }

    /// Writes `value` into `slot` and marks it filled.
    ///
    /// Fails with `ValueOutOfRange` if the slot is beyond the data length and with
    /// `BufferAlreadyFilled` if the slot was already written in this cycle.
    pub fn set_byte(&self, value: u8, slot: usize) -> Result<(), Error> {
        self.access(|state| {
            self.check_slot(slot)?;
            if state.filled.contains(slot) {
                return Err(Error::BufferAlreadyFilled);
            }
            state.data[slot] = value;
            state.filled.insert(slot);
            Ok(())
        })
    }

    /// Writes `bytes` into the leading slots.
    ///
    /// Either all bytes are written or, on failure, none.
    pub fn fill(&self, bytes: &[u8]) -> Result<(), Error> {
        self.access(|state| {
            let length = DataLength::new(bytes.len())
                .filter(|length| *length <= self.descriptor.length())
                .ok_or(Error::ValueOutOfRange)?;
            if !(state.filled & SlotSet::new_lt(length)).is_empty() {
                return Err(Error::BufferAlreadyFilled);
            }
            state.data[..bytes.len()].copy_from_slice(bytes);
            state.filled |= SlotSet::new_lt(length);
            Ok(())
        })
    }

    /// Clears the fill marker of `slot`, allowing it to be written again.
    pub fn release_slot(&self, slot: usize) -> Result<(), Error> {
        self.access(|state| {
            self.check_slot(slot)?;
            state.filled.remove(slot);
            Ok(())
        })
    }

    /// Checks whether every slot within the data length is filled.
    pub fn is_ready_to_send(&self) -> bool {
        let required = SlotSet::new_lt(self.descriptor.length());
        self.state
            .lock(|cell| cell.borrow().filled.is_superset(required))
    }

    /// Asks the controller whether a remote transmission request for this message arrived.
    pub fn check_remote_request_received(&self) -> bool {
        self.state.lock(|cell| cell.borrow_mut().last_error = None);
        self.controller.poll_remote_request(self.descriptor.id())
    }

    /// Sends the message.
    ///
    /// Data messages must be complete, otherwise `MessageNotComplete` is returned and nothing
    /// changes. The frame then goes through mailbox allocation, staging and the transmission
    /// request. Any failure leaves the fill markers untouched. On success all markers are
    /// cleared within the same critical section.
    pub fn send(&self) -> Result<(), Error> {
        self.access(|state| {
            let id = self.descriptor.id();
            let length = self.descriptor.length();

            let frame = if self.descriptor.remote_request() {
                Frame::new_remote(id, length)
            } else {
                if !state.filled.is_superset(SlotSet::new_lt(length)) {
                    return Err(Error::MessageNotComplete);
                }
                Frame::new_data(id, Data::from_array(state.data, length))
            };

            let slot = self.controller.find_free_tx_slot().map_err(|status| {
                debug!("{:?}: no free transmit mailbox ({:#x})", id, status.code());
                Error::NoFreeTransmitBuffer(status)
            })?;

            self.controller.stage_frame(slot, &frame).map_err(|error| {
                warn!("{:?}: staging failed ({:#x})", id, error.code());
                Error::FillingTransmitBufferFailed
            })?;

            self.controller.transmit(slot, self.options).map_err(|error| {
                warn!(
                    "{:?}: transmission request failed ({:#x})",
                    id,
                    error.code()
                );
                Error::MessageNotSent(error)
            })?;

            state.filled = SlotSet::NONE;
            trace!("{:?}: sent through mailbox {}", id, slot.index());
            Ok(())
        })
    }

    fn check_slot(&self, slot: usize) -> Result<(), Error> {
        if slot < self.descriptor.length().as_usize() {
            Ok(())
        } else {
            Err(Error::ValueOutOfRange)
        }
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

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    use crate::core::FrameKind;
    use crate::driver::loopback::{self, Loopback};

    type TestController = Loopback<NoopRawMutex, 4>;

    fn id() -> Id {
        Id::new(0x321, FrameKind::Standard).unwrap()
    }

    fn len(value: usize) -> DataLength {
        DataLength::new(value).unwrap()
    }

    #[test]
    fn test_slot_range() {
        let controller = TestController::new();
        let msg = TxMessage::<NoopRawMutex, _>::new(id(), len(3), &controller);

        assert_eq!(msg.set_byte(0, 3), Err(Error::ValueOutOfRange));
        assert_eq!(msg.set_byte(0, 8), Err(Error::ValueOutOfRange));
        assert_eq!(msg.release_slot(3), Err(Error::ValueOutOfRange));
        assert_eq!(msg.last_error(), Some(Error::ValueOutOfRange));

        msg.set_byte(0, 2).unwrap();
        assert_eq!(msg.last_error(), None);
        assert_eq!(msg.filled_slots(), SlotSet::from_bits(0b100));
    }

    #[test]
    fn test_write_once() {
        let controller = TestController::new();
        let msg = TxMessage::<NoopRawMutex, _>::new(id(), len(2), &controller);

        msg.set_byte(0x11, 1).unwrap();
        assert_eq!(msg.set_byte(0x22, 1), Err(Error::BufferAlreadyFilled));
        msg.release_slot(1).unwrap();
        msg.set_byte(0x22, 1).unwrap();
        msg.set_byte(0x33, 0).unwrap();

        msg.send().unwrap();
        let frame = controller.pop_frame().unwrap();
        assert_eq!(frame.data.as_ref(), [0x33, 0x22]);
    }

    #[test]
    fn test_fill_is_all_or_nothing() {
        let controller = TestController::new();
        let msg = TxMessage::<NoopRawMutex, _>::new(id(), len(4), &controller);

        assert_eq!(msg.fill(&[1, 2, 3, 4, 5]), Err(Error::ValueOutOfRange));
        msg.set_byte(9, 2).unwrap();
        assert_eq!(msg.fill(&[1, 2, 3]), Err(Error::BufferAlreadyFilled));
        assert_eq!(msg.filled_slots(), SlotSet::from_bits(0b0100));

        msg.fill(&[1, 2]).unwrap();
        msg.set_byte(4, 3).unwrap();
        assert!(msg.is_ready_to_send());
        msg.send().unwrap();
        assert_eq!(controller.pop_frame().unwrap().data.as_ref(), [1, 2, 9, 4]);
    }

    #[test]
    fn test_zero_length_is_always_ready() {
        let controller = TestController::new();
        let msg = TxMessage::<NoopRawMutex, _>::new(id(), len(0), &controller);

        assert!(msg.is_ready_to_send());
        assert_eq!(msg.set_byte(0, 0), Err(Error::ValueOutOfRange));
        msg.send().unwrap();
        assert_eq!(controller.pop_frame().unwrap().data.len(), 0);
    }

    #[test]
    fn test_remote_request_skips_completeness() {
        let controller = TestController::new();
        let msg = TxMessage::<NoopRawMutex, _>::new_remote(id(), len(6), &controller);

        assert!(!msg.is_ready_to_send());
        msg.send().unwrap();

        let frame = controller.pop_frame().unwrap();
        assert!(frame.header.remote_request);
        assert_eq!(frame.header.length, len(6));
    }

    #[test]
    fn test_no_free_mailbox() {
        let controller = TestController::new();
        controller.hold_transmission(true);
        let msg = TxMessage::<NoopRawMutex, _>::new_remote(id(), len(0), &controller);

        for _ in 0..loopback::MAILBOX_COUNT {
            msg.send().unwrap();
        }
        let res = msg.send();
        assert_eq!(
            res,
            Err(Error::NoFreeTransmitBuffer(loopback::NO_FREE_MAILBOX))
        );
        assert_eq!(res.unwrap_err().code(), 0x60E0);
        assert_eq!(msg.last_controller_error(), loopback::NO_FREE_MAILBOX);
    }

    #[test]
    fn test_options_reach_controller() {
        use crate::driver::controller::TxPriority;

        let controller = TestController::new();
        controller.hold_transmission(true);
        let low = TxMessage::<NoopRawMutex, _>::new_remote(id(), len(0), &controller);
        let high_id = Id::new(0x322, FrameKind::Standard).unwrap();
        let high = TxMessage::<NoopRawMutex, _>::new_remote(high_id, len(0), &controller)
            .with_options(TxOptions {
                priority: TxPriority::Highest,
            });
        assert_eq!(high.options().priority, TxPriority::Highest);

        low.send().unwrap();
        high.send().unwrap();
        controller.hold_transmission(false);

        assert_eq!(controller.pop_frame().unwrap().header.id, high_id);
        assert_eq!(controller.pop_frame().unwrap().header.id, id());
    }
}
