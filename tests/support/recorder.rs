//! Observer that records scheduler events in order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use objdl_core::{RemoteObject, TransferObserver};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    WaveStarted(usize),
    TaskStarted(String),
    TaskFinished(String, bool),
    WaveFinished(usize),
}

#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<Event>>,
    bytes: Mutex<u64>,
    /// Flag raised once the given wave has finished.
    interrupt_after: Option<(usize, Arc<AtomicBool>)>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `flag` when wave `wave` finishes.
    pub fn interrupting_after(wave: usize, flag: Arc<AtomicBool>) -> Self {
        Self {
            interrupt_after: Some((wave, flag)),
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn bytes(&self) -> u64 {
        *self.bytes.lock().unwrap()
    }

    /// Index of the first event equal to `event`.
    pub fn position(&self, event: &Event) -> usize {
        self.events()
            .iter()
            .position(|recorded| recorded == event)
            .unwrap_or_else(|| panic!("event {event:?} not recorded"))
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl TransferObserver for Recorder {
    fn wave_started(&self, wave: usize, _total: usize, _objects: &[RemoteObject]) {
        self.push(Event::WaveStarted(wave));
    }

    fn task_started(&self, object: &RemoteObject) {
        self.push(Event::TaskStarted(object.key.clone()));
    }

    fn bytes_written(&self, _key: &str, len: u64) {
        *self.bytes.lock().unwrap() += len;
    }

    fn task_finished(&self, key: &str, succeeded: bool) {
        self.push(Event::TaskFinished(key.to_string(), succeeded));
    }

    fn wave_finished(&self, wave: usize) {
        self.push(Event::WaveFinished(wave));
        if let Some((after, flag)) = &self.interrupt_after
            && *after == wave
        {
            flag.store(true, Ordering::SeqCst);
        }
    }
}
