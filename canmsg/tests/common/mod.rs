#![allow(dead_code)]

use canmsg::core::{DataLength, Id};
use canmsg::driver::controller::{Controller, ControllerError, TxOptions, TxSlot};
use canmsg::driver::frame::{Data, Frame};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::vec::Vec;

/// Reported by [`ScriptedController`] when no received frame is scripted
pub const NOTHING_RECEIVED: ControllerError = ControllerError::new(0x0010);

/// Controller call, as seen by [`ScriptedController`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    FindFreeTxSlot,
    StageFrame(TxSlot, Frame),
    Transmit(TxSlot, TxOptions),
    PollRemoteRequest(Id),
    PollReceived(Id, DataLength),
}

#[derive(Default)]
struct Script {
    calls: Vec<Call>,
    slot_status: Option<ControllerError>,
    stage_error: Option<ControllerError>,
    transmit_error: Option<ControllerError>,
    remote_requests: VecDeque<Id>,
    received: VecDeque<Result<Data, ControllerError>>,
    last_error: ControllerError,
}

/// Controller that records every call and answers from a script
#[derive(Default)]
pub struct ScriptedController {
    script: Mutex<Script>,
}

impl ScriptedController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.script.lock().unwrap().calls.clear();
    }

    /// Every mailbox reports `status` until cleared with `None`.
    pub fn set_slot_status(&self, status: Option<ControllerError>) {
        self.script.lock().unwrap().slot_status = status;
    }

    pub fn set_stage_error(&self, error: Option<ControllerError>) {
        self.script.lock().unwrap().stage_error = error;
    }

    pub fn set_transmit_error(&self, error: Option<ControllerError>) {
        self.script.lock().unwrap().transmit_error = error;
    }

    pub fn push_remote_request(&self, id: Id) {
        self.script.lock().unwrap().remote_requests.push_back(id);
    }

    pub fn push_received(&self, res: Result<Data, ControllerError>) {
        self.script.lock().unwrap().received.push_back(res);
    }

    fn respond<T>(
        script: &mut Script,
        error: Option<ControllerError>,
        value: T,
    ) -> Result<T, ControllerError> {
        match error {
            Some(error) => {
                script.last_error = error;
                Err(error)
            }
            None => Ok(value),
        }
    }
}

impl Controller for ScriptedController {
    fn find_free_tx_slot(&self) -> Result<TxSlot, ControllerError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(Call::FindFreeTxSlot);
        let status = script.slot_status;
        Self::respond(&mut script, status, TxSlot::new(1))
    }

    fn stage_frame(&self, slot: TxSlot, frame: &Frame) -> Result<(), ControllerError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(Call::StageFrame(slot, *frame));
        let error = script.stage_error;
        Self::respond(&mut script, error, ())
    }

    fn transmit(&self, slot: TxSlot, options: TxOptions) -> Result<(), ControllerError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(Call::Transmit(slot, options));
        let error = script.transmit_error;
        Self::respond(&mut script, error, ())
    }

    fn poll_remote_request(&self, id: Id) -> bool {
        let mut script = self.script.lock().unwrap();
        script.calls.push(Call::PollRemoteRequest(id));
        match script.remote_requests.iter().position(|pending| *pending == id) {
            Some(pos) => script.remote_requests.remove(pos).is_some(),
            None => false,
        }
    }

    fn poll_received(&self, id: Id, length: DataLength) -> Result<Data, ControllerError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(Call::PollReceived(id, length));
        let res = script.received.pop_front().unwrap_or(Err(NOTHING_RECEIVED));
        if let Err(error) = res {
            script.last_error = error;
        }
        res
    }

    fn last_error(&self) -> ControllerError {
        self.script.lock().unwrap().last_error
    }
}
