//! In-memory loop-back controller
//!
//! Transmitted frames are delivered back into the controller's own receive queue, as in an
//! internal loop-back test mode. Frames from other bus nodes can be simulated with
//! [`Loopback::inject`]. Transmission can be held back to exhaust the mailboxes, and
//! single-shot faults can be injected into staging and transmission.

use core::cell::RefCell;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;
use heapless::Vec;

use crate::controller::{Controller, ControllerError, TxOptions, TxSlot};
use crate::core::{DataLength, Id};
use crate::frame::{Data, Frame};

/// Number of transmit mailboxes, matching the common three-mailbox controllers.
pub const MAILBOX_COUNT: usize = 3;

/// All transmit mailboxes are staged or pending.
pub const NO_FREE_MAILBOX: ControllerError = ControllerError::new(0x00E0);
/// Transmission was requested for a mailbox that holds no staged frame.
pub const MAILBOX_NOT_STAGED: ControllerError = ControllerError::new(0x0100);
/// Staging was requested for a mailbox that is pending transmission or does not exist.
pub const MAILBOX_UNAVAILABLE: ControllerError = ControllerError::new(0x0200);
/// No received frame matches the requested identifier and length.
pub const NO_MATCHING_FRAME: ControllerError = ControllerError::new(0x0300);
/// The receive queue has no room for another frame.
pub const RX_QUEUE_FULL: ControllerError = ControllerError::new(0x0400);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mailbox {
    Free,
    Staged(Frame),
    Pending(Frame, TxOptions),
}

struct State<const Q: usize> {
    mailboxes: [Mailbox; MAILBOX_COUNT],
    rx_queue: Vec<Frame, Q>,
    hold_transmission: bool,
    stage_fault: Option<ControllerError>,
    transmit_fault: Option<ControllerError>,
    last_error: ControllerError,
    overrun_count: usize,
}

impl<const Q: usize> State<Q> {
    const fn new() -> Self {
        Self {
            mailboxes: [Mailbox::Free; MAILBOX_COUNT],
            rx_queue: Vec::new(),
            hold_transmission: false,
            stage_fault: None,
            transmit_fault: None,
            last_error: ControllerError::NONE,
            overrun_count: 0,
        }
    }

    fn fail<T>(&mut self, error: ControllerError) -> Result<T, ControllerError> {
        self.last_error = error;
        Err(error)
    }

    fn deliver(&mut self, frame: Frame) {
        if self.rx_queue.push(frame).is_err() {
            warn!(
                "loop-back frame {:?} dropped, receive queue full",
                frame.header.id
            );
            self.overrun_count += 1;
        }
    }

    fn flush(&mut self) {
        // Higher priority mailboxes go first, ties resolve to the lower mailbox index
        while let Some(idx) = self.next_pending() {
            if let Mailbox::Pending(frame, _) = self.mailboxes[idx] {
                self.mailboxes[idx] = Mailbox::Free;
                self.deliver(frame);
            }
        }
    }

    fn next_pending(&self) -> Option<usize> {
        let mut best: Option<(usize, TxOptions)> = None;
        for (idx, mailbox) in self.mailboxes.iter().enumerate() {
            if let Mailbox::Pending(_, options) = mailbox {
                match best {
                    Some((_, current)) if current.priority >= options.priority => {}
                    _ => best = Some((idx, *options)),
                }
            }
        }
        best.map(|(idx, _)| idx)
    }
}

/// Loop-back controller with a `Q`-frame receive queue
///
/// The mutex type selects the context the controller may be shared across. Use
/// `CriticalSectionRawMutex` when messages are polled from interrupt handlers.
pub struct Loopback<M: RawMutex, const Q: usize> {
    state: Mutex<M, RefCell<State<Q>>>,
}

impl<M: RawMutex, const Q: usize> Loopback<M, Q> {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(State::new())),
        }
    }

    /// Places a frame from another bus node into the receive queue.
    pub fn inject(&self, frame: Frame) -> Result<(), ControllerError> {
        self.state.lock(|cell| {
            let mut state = cell.borrow_mut();
            match state.rx_queue.push(frame) {
                Ok(()) => Ok(()),
                Err(_) => state.fail(RX_QUEUE_FULL),
            }
        })
    }

    /// Removes the oldest frame from the receive queue regardless of its identifier.
    pub fn pop_frame(&self) -> Option<Frame> {
        self.state.lock(|cell| {
            let mut state = cell.borrow_mut();
            if state.rx_queue.is_empty() {
                None
            } else {
                Some(state.rx_queue.remove(0))
            }
        })
    }

    /// Number of frames waiting in the receive queue
    pub fn queued(&self) -> usize {
        self.state.lock(|cell| cell.borrow().rx_queue.len())
    }

    /// Number of looped-back frames lost to a full receive queue
    pub fn overrun_count(&self) -> usize {
        self.state.lock(|cell| cell.borrow().overrun_count)
    }

    /// Keeps requested transmissions pending in their mailboxes instead of completing them.
    ///
    /// Releasing the hold completes all pending transmissions in mailbox priority order.
    pub fn hold_transmission(&self, hold: bool) {
        self.state.lock(|cell| {
            let mut state = cell.borrow_mut();
            state.hold_transmission = hold;
            if !hold {
                state.flush();
            }
        });
    }

    /// Makes the next `stage_frame` call fail with `error`.
    pub fn fail_next_stage(&self, error: ControllerError) {
        self.state
            .lock(|cell| cell.borrow_mut().stage_fault = Some(error));
    }

    /// Makes the next `transmit` call fail with `error`. The staged frame is kept.
    pub fn fail_next_transmit(&self, error: ControllerError) {
        self.state
            .lock(|cell| cell.borrow_mut().transmit_fault = Some(error));
    }
}

impl<M: RawMutex, const Q: usize> Default for Loopback<M, Q> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex, const Q: usize> Controller for Loopback<M, Q> {
    fn find_free_tx_slot(&self) -> Result<TxSlot, ControllerError> {
        self.state.lock(|cell| {
            let mut state = cell.borrow_mut();
            let free = state
                .mailboxes
                .iter()
                .position(|mailbox| *mailbox == Mailbox::Free);
            match free {
                Some(idx) => Ok(TxSlot::new(idx as u8)),
                None => state.fail(NO_FREE_MAILBOX),
            }
        })
    }

    fn stage_frame(&self, slot: TxSlot, frame: &Frame) -> Result<(), ControllerError> {
        self.state.lock(|cell| {
            let mut state = cell.borrow_mut();
            if let Some(error) = state.stage_fault.take() {
                return state.fail(error);
            }
            let idx = usize::from(slot.index());
            match state.mailboxes.get(idx) {
                Some(Mailbox::Free | Mailbox::Staged(_)) => {
                    state.mailboxes[idx] = Mailbox::Staged(*frame);
                    Ok(())
                }
                _ => state.fail(MAILBOX_UNAVAILABLE),
            }
        })
    }

    fn transmit(&self, slot: TxSlot, options: TxOptions) -> Result<(), ControllerError> {
        self.state.lock(|cell| {
            let mut state = cell.borrow_mut();
            let idx = usize::from(slot.index());
            let frame = match state.mailboxes.get(idx) {
                Some(Mailbox::Staged(frame)) => *frame,
                _ => return state.fail(MAILBOX_NOT_STAGED),
            };
            if let Some(error) = state.transmit_fault.take() {
                return state.fail(error);
            }

            state.mailboxes[idx] = Mailbox::Pending(frame, options);
            if !state.hold_transmission {
                state.flush();
            }
            trace!("mailbox {} transmission requested", idx);
            Ok(())
        })
    }

    fn poll_remote_request(&self, id: Id) -> bool {
        self.state.lock(|cell| {
            let mut state = cell.borrow_mut();
            let pos = state
                .rx_queue
                .iter()
                .position(|frame| frame.header.id == id && frame.header.remote_request);
            match pos {
                Some(pos) => {
                    state.rx_queue.remove(pos);
                    true
                }
                None => false,
            }
        })
    }

    fn poll_received(&self, id: Id, length: DataLength) -> Result<Data, ControllerError> {
        self.state.lock(|cell| {
            let mut state = cell.borrow_mut();
            let pos = state.rx_queue.iter().position(|frame| {
                frame.header.id == id
                    && !frame.header.remote_request
                    && frame.header.length == length
            });
            match pos {
                Some(pos) => Ok(state.rx_queue.remove(pos).data),
                None => state.fail(NO_MATCHING_FRAME),
            }
        })
    }

    fn last_error(&self) -> ControllerError {
        self.state.lock(|cell| cell.borrow().last_error)
    }
}
