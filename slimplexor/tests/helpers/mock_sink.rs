//! Scripted sink for driving the engine in tests
//!
//! A [`MockDevice`] is a shared handle to everything the sinks opened from
//! a [`MockProvider`] did: the calls made, the bytes accepted, and the
//! script of write outcomes still to play.

use slimplexor::sink::{
    PcmSink, SinkError, SinkParams, SinkProvider, SinkState, SwParams, WriteOutcome,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// What the next write does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Accept at most this many frames
    Accept(usize),
    WouldBlock,
    /// Fail with a device error
    Fail,
}

/// One call into a sink or provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Open { device: String, params: SinkParams },
    SetSwParams(SwParams),
    Prepare,
    Write { offered: usize },
    Recover,
    Drain,
    Close,
}

#[derive(Default)]
struct Shared {
    calls: Vec<SinkCall>,
    accepted: Vec<u8>,
    script: VecDeque<Step>,
    open_error: Option<fn() -> SinkError>,
    fail_recover: bool,
    fail_prepare: bool,
    fail_drain: bool,
}

#[derive(Clone, Default)]
pub struct MockDevice {
    shared: Arc<Mutex<Shared>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue write outcomes; writes past the script accept everything
    pub fn script(&self, steps: &[Step]) {
        self.shared.lock().unwrap().script.extend(steps.iter().copied());
    }

    pub fn fail_open_with(&self, error: fn() -> SinkError) {
        self.shared.lock().unwrap().open_error = Some(error);
    }

    pub fn fail_recover(&self, fail: bool) {
        self.shared.lock().unwrap().fail_recover = fail;
    }

    pub fn fail_prepare(&self, fail: bool) {
        self.shared.lock().unwrap().fail_prepare = fail;
    }

    pub fn fail_drain(&self, fail: bool) {
        self.shared.lock().unwrap().fail_drain = fail;
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.shared.lock().unwrap().calls.clone()
    }

    pub fn count(&self, call: &SinkCall) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn write_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, SinkCall::Write { .. }))
            .count()
    }

    pub fn opened_devices(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SinkCall::Open { device, .. } => Some(device),
                _ => None,
            })
            .collect()
    }

    /// Every byte accepted by any sink, in order
    pub fn accepted(&self) -> Vec<u8> {
        self.shared.lock().unwrap().accepted.clone()
    }

    /// Accepted bytes split into target frames
    pub fn accepted_frames(&self, frame_size: usize) -> Vec<Vec<u8>> {
        self.accepted()
            .chunks_exact(frame_size)
            .map(|f| f.to_vec())
            .collect()
    }

    fn record(&self, call: SinkCall) {
        self.shared.lock().unwrap().calls.push(call);
    }
}

pub struct MockSink {
    device: MockDevice,
    params: SinkParams,
    state: SinkState,
}

impl PcmSink for MockSink {
    fn params(&self) -> &SinkParams {
        &self.params
    }

    fn state(&self) -> SinkState {
        self.state
    }

    fn set_sw_params(&mut self, params: &SwParams) -> Result<(), SinkError> {
        self.device.record(SinkCall::SetSwParams(*params));
        if params.avail_min > self.params.buffer_frames() {
            return Err(SinkError::Config("avail_min beyond buffer".to_string()));
        }
        Ok(())
    }

    fn prepare(&mut self) -> Result<(), SinkError> {
        self.device.record(SinkCall::Prepare);
        if self.device.shared.lock().unwrap().fail_prepare {
            return Err(SinkError::Device("prepare failed".to_string()));
        }
        self.state = SinkState::Prepared;
        Ok(())
    }

    fn write(&mut self, bytes: &[u8], frames: usize) -> Result<WriteOutcome, SinkError> {
        self.device.record(SinkCall::Write { offered: frames });
        let frame_size = self.params.frame_size();
        assert!(bytes.len() >= frames * frame_size, "short write buffer");

        let mut shared = self.device.shared.lock().unwrap();
        let step = shared.script.pop_front().unwrap_or(Step::Accept(usize::MAX));
        match step {
            Step::Accept(limit) => {
                let n = frames.min(limit);
                shared.accepted.extend_from_slice(&bytes[..n * frame_size]);
                self.state = SinkState::Running;
                Ok(WriteOutcome::Written(n))
            }
            Step::WouldBlock => Ok(WriteOutcome::WouldBlock),
            Step::Fail => {
                self.state = SinkState::Failed;
                Err(SinkError::Device("injected write failure".to_string()))
            }
        }
    }

    fn recover(&mut self) -> Result<(), SinkError> {
        self.device.record(SinkCall::Recover);
        if self.device.shared.lock().unwrap().fail_recover {
            return Err(SinkError::Device("recovery failed".to_string()));
        }
        self.state = SinkState::Prepared;
        Ok(())
    }

    fn drain(&mut self) -> Result<(), SinkError> {
        self.device.record(SinkCall::Drain);
        if self.device.shared.lock().unwrap().fail_drain {
            return Err(SinkError::Device("drain failed".to_string()));
        }
        self.state = SinkState::Setup;
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), SinkError> {
        self.device.record(SinkCall::Close);
        Ok(())
    }
}

/// Provider handing out [`MockSink`]s that all report to one [`MockDevice`]
pub struct MockProvider {
    device: MockDevice,
}

impl MockProvider {
    pub fn new(device: &MockDevice) -> Self {
        Self {
            device: device.clone(),
        }
    }
}

impl SinkProvider for MockProvider {
    fn open(&self, device_id: &str, params: &SinkParams) -> Result<Box<dyn PcmSink>, SinkError> {
        self.device.record(SinkCall::Open {
            device: device_id.to_string(),
            params: *params,
        });
        if let Some(error) = self.device.shared.lock().unwrap().open_error {
            return Err(error());
        }

        Ok(Box::new(MockSink {
            device: self.device.clone(),
            params: *params,
            state: SinkState::Setup,
        }))
    }
}
