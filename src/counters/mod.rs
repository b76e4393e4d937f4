//! Hardware cache-miss counters wrapped around kernel calls.
//!
//! A [`Session`] owns one backend and at most one event set holding the
//! L1 and L2 data-cache miss events. It moves through
//!
//! ```text
//! Initialized -> Armed -> Running -> Stopped -> Armed ... -> Destroyed
//! ```
//!
//! Backend initialization is the only fatal step. Every later backend
//! failure is logged, kept as an advisory on the session, and the
//! measurement carries on with whatever the counters report.
//!
//! ```
//! use matprod::counters::{NullBackend, Session};
//! use matprod::Kernel;
//!
//! let mut session = Session::new(NullBackend);
//! session.arm().unwrap();
//! let m = session.measure(|| Kernel::Line.run(4, 4)).unwrap();
//! assert_eq!(m.output.unwrap().matrix.get(0, 0), 10.0);
//! session.reset().unwrap();
//! assert!(session.shutdown().is_empty());
//! ```

pub mod perf_events;

use crate::error::CounterError;
use std::fmt;
use std::time::{Duration, Instant};

pub use perf_events::{PerfBackend, PerfEventSet};

/// The two events every session registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheEvent {
    L1DataMiss,
    L2DataMiss,
}

impl CacheEvent {
    /// Registration order.
    pub const ALL: [CacheEvent; 2] = [CacheEvent::L1DataMiss, CacheEvent::L2DataMiss];

    pub fn label(&self) -> &'static str {
        match self {
            CacheEvent::L1DataMiss => "L1 DCM",
            CacheEvent::L2DataMiss => "L2 DCM",
        }
    }
}

impl fmt::Display for CacheEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Counter readings for one measurement. Missing channels read 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterValues {
    pub l1_dcm: u64,
    pub l2_dcm: u64,
}

impl CounterValues {
    pub fn set(&mut self, event: CacheEvent, value: u64) {
        match event {
            CacheEvent::L1DataMiss => self.l1_dcm = value,
            CacheEvent::L2DataMiss => self.l2_dcm = value,
        }
    }

    pub fn get(&self, event: CacheEvent) -> u64 {
        match event {
            CacheEvent::L1DataMiss => self.l1_dcm,
            CacheEvent::L2DataMiss => self.l2_dcm,
        }
    }
}

/// A group of counters armed, started, stopped and reset as a unit.
pub trait EventSet {
    fn add(&mut self, event: CacheEvent) -> Result<(), CounterError>;
    fn remove(&mut self, event: CacheEvent) -> Result<(), CounterError>;
    fn start(&mut self) -> Result<(), CounterError>;
    /// Stop counting and read every registered event.
    fn stop(&mut self) -> Result<CounterValues, CounterError>;
    fn reset(&mut self) -> Result<(), CounterError>;
    fn destroy(self) -> Result<(), CounterError>;
}

/// An initialized counter library that can hand out event sets.
pub trait CounterBackend {
    type Events: EventSet;

    fn create_event_set(&mut self) -> Result<Self::Events, CounterError>;
}

/// Backend that counts nothing. Every operation succeeds and reads 0.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

/// Event set of [`NullBackend`].
#[derive(Debug, Default)]
pub struct NullEvents {
    registered: Vec<CacheEvent>,
}

impl CounterBackend for NullBackend {
    type Events = NullEvents;

    fn create_event_set(&mut self) -> Result<NullEvents, CounterError> {
        Ok(NullEvents::default())
    }
}

impl EventSet for NullEvents {
    fn add(&mut self, event: CacheEvent) -> Result<(), CounterError> {
        self.registered.push(event);
        Ok(())
    }

    fn remove(&mut self, event: CacheEvent) -> Result<(), CounterError> {
        self.registered.retain(|&e| e != event);
        Ok(())
    }

    fn start(&mut self) -> Result<(), CounterError> {
        Ok(())
    }

    fn stop(&mut self) -> Result<CounterValues, CounterError> {
        Ok(CounterValues::default())
    }

    fn reset(&mut self) -> Result<(), CounterError> {
        Ok(())
    }

    fn destroy(self) -> Result<(), CounterError> {
        Ok(())
    }
}

/// Where a [`Session`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initialized,
    Armed,
    Running,
    Stopped,
    Destroyed,
}

/// Result of one measured call.
#[derive(Debug)]
pub struct Measurement<T> {
    pub output: T,
    pub counters: CounterValues,
    /// Wall time of the whole call, valid across threads.
    pub wall: Duration,
}

/// One counter session over a backend.
///
/// Only one measurement can be in flight: [`Session::measure`] takes
/// `&mut self` and runs the closure to completion before returning.
pub struct Session<B: CounterBackend> {
    backend: B,
    events: Option<B::Events>,
    registered: Vec<CacheEvent>,
    state: SessionState,
    advisories: Vec<CounterError>,
}

impl<B: CounterBackend> Session<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            events: None,
            registered: Vec::new(),
            state: SessionState::Initialized,
            advisories: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Events that were registered successfully.
    pub fn registered(&self) -> &[CacheEvent] {
        &self.registered
    }

    /// Drain advisory failures recorded since the last call.
    pub fn take_advisories(&mut self) -> Vec<CounterError> {
        std::mem::take(&mut self.advisories)
    }

    /// Create the event set and register L1 then L2 data-cache misses.
    ///
    /// A failure to create the set or add an event is advisory: the session
    /// still becomes `Armed` and the affected channels read 0.
    pub fn arm(&mut self) -> Result<(), CounterError> {
        self.expect(&[SessionState::Initialized], "arm")?;

        match self.backend.create_event_set() {
            Ok(mut events) => {
                for event in CacheEvent::ALL {
                    match events.add(event) {
                        Ok(()) => self.registered.push(event),
                        Err(e) => self.advise(e),
                    }
                }
                self.events = Some(events);
            }
            Err(e) => self.advise(e),
        }

        self.state = SessionState::Armed;
        Ok(())
    }

    /// Start the counters, run `f`, stop them and read the values.
    pub fn measure<T>(&mut self, f: impl FnOnce() -> T) -> Result<Measurement<T>, CounterError> {
        self.expect(&[SessionState::Armed], "start")?;

        if let Some(Err(e)) = self.events.as_mut().map(EventSet::start) {
            self.advise(e);
        }
        self.state = SessionState::Running;

        let started = Instant::now();
        let output = f();
        let wall = started.elapsed();

        let counters = match self.events.as_mut().map(EventSet::stop) {
            Some(Ok(values)) => values,
            Some(Err(e)) => {
                self.advise(e);
                CounterValues::default()
            }
            None => CounterValues::default(),
        };
        self.state = SessionState::Stopped;

        Ok(Measurement {
            output,
            counters,
            wall,
        })
    }

    /// Zero the counters so the next [`measure`](Self::measure) starts clean.
    pub fn reset(&mut self) -> Result<(), CounterError> {
        self.expect(&[SessionState::Stopped], "reset")?;

        if let Some(Err(e)) = self.events.as_mut().map(EventSet::reset) {
            self.advise(e);
        }
        self.state = SessionState::Armed;
        Ok(())
    }

    /// Remove the registered events and destroy the event set.
    ///
    /// Consumes the session, so teardown happens once. Works whether or not
    /// any measurement ran. Returns every advisory not yet taken.
    pub fn shutdown(mut self) -> Vec<CounterError> {
        if let Some(mut events) = self.events.take() {
            for event in std::mem::take(&mut self.registered) {
                if let Err(e) = events.remove(event) {
                    self.advise(e);
                }
            }
            if let Err(e) = events.destroy() {
                self.advise(e);
            }
        }

        self.state = SessionState::Destroyed;
        log::debug!("counter session destroyed");
        self.advisories
    }

    fn expect(&self, allowed: &[SessionState], operation: &'static str) -> Result<(), CounterError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(CounterError::InvalidTransition {
                state: self.state,
                operation,
            })
        }
    }

    fn advise(&mut self, error: CounterError) {
        log::warn!("{error}");
        self.advisories.push(error);
    }
}
