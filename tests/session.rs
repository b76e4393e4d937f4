use matprod::counters::{
    CacheEvent, CounterBackend, CounterValues, EventSet, NullBackend, Session, SessionState,
};
use matprod::report::{write_counters, write_product};
use matprod::{CounterError, Kernel, Severity};
use std::cell::RefCell;
use std::io;
use std::rc::Rc;

/// Backend that records calls and fails the operations it is told to.
#[derive(Default, Clone)]
struct FakeBackend {
    log: Rc<RefCell<Vec<String>>>,
    fail_create: bool,
    fail_add: Option<CacheEvent>,
    fail_start: bool,
}

struct FakeEvents {
    log: Rc<RefCell<Vec<String>>>,
    registered: Vec<CacheEvent>,
    fail_add: Option<CacheEvent>,
    fail_start: bool,
    cycles: u64,
}

fn os_err() -> io::Error {
    io::Error::from_raw_os_error(13)
}

impl CounterBackend for FakeBackend {
    type Events = FakeEvents;

    fn create_event_set(&mut self) -> Result<FakeEvents, CounterError> {
        self.log.borrow_mut().push("create".into());
        if self.fail_create {
            return Err(CounterError::CreateEventSet(os_err()));
        }
        Ok(FakeEvents {
            log: Rc::clone(&self.log),
            registered: Vec::new(),
            fail_add: self.fail_add,
            fail_start: self.fail_start,
            cycles: 0,
        })
    }
}

impl EventSet for FakeEvents {
    fn add(&mut self, event: CacheEvent) -> Result<(), CounterError> {
        self.log.borrow_mut().push(format!("add {event}"));
        if self.fail_add == Some(event) {
            return Err(CounterError::AddEvent {
                event,
                source: os_err(),
            });
        }
        self.registered.push(event);
        Ok(())
    }

    fn remove(&mut self, event: CacheEvent) -> Result<(), CounterError> {
        self.log.borrow_mut().push(format!("remove {event}"));
        self.registered.retain(|&e| e != event);
        Ok(())
    }

    fn start(&mut self) -> Result<(), CounterError> {
        self.log.borrow_mut().push("start".into());
        if self.fail_start {
            return Err(CounterError::Start(os_err()));
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<CounterValues, CounterError> {
        self.log.borrow_mut().push("stop".into());
        self.cycles += 1;
        let mut values = CounterValues::default();
        for &event in &self.registered {
            values.set(event, self.cycles * 100);
        }
        Ok(values)
    }

    fn reset(&mut self) -> Result<(), CounterError> {
        self.log.borrow_mut().push("reset".into());
        Ok(())
    }

    fn destroy(self) -> Result<(), CounterError> {
        self.log.borrow_mut().push("destroy".into());
        Ok(())
    }
}

#[test]
fn test_full_cycle_then_second_cycle() {
    let backend = FakeBackend::default();
    let log = Rc::clone(&backend.log);
    let mut session = Session::new(backend);
    assert_eq!(session.state(), SessionState::Initialized);

    session.arm().unwrap();
    assert_eq!(session.state(), SessionState::Armed);
    assert_eq!(session.registered(), &CacheEvent::ALL);

    let first = session.measure(|| Kernel::Line.run(4, 4)).unwrap();
    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(first.counters, CounterValues { l1_dcm: 100, l2_dcm: 100 });
    assert_eq!(first.output.unwrap().matrix.get(3, 3), 10.0);

    session.reset().unwrap();
    assert_eq!(session.state(), SessionState::Armed);

    let second = session.measure(|| Kernel::Naive.run(6, 6)).unwrap();
    assert_eq!(second.counters.l2_dcm, 200);
    session.reset().unwrap();

    assert!(session.shutdown().is_empty());
    assert_eq!(
        *log.borrow(),
        [
            "create", "add L1 DCM", "add L2 DCM", "start", "stop", "reset", "start", "stop",
            "reset", "remove L1 DCM", "remove L2 DCM", "destroy",
        ]
    );
}

#[test]
fn test_zero_cycle_shutdown() {
    let backend = FakeBackend::default();
    let log = Rc::clone(&backend.log);
    let mut session = Session::new(backend);
    session.arm().unwrap();
    assert!(session.shutdown().is_empty());
    assert_eq!(log.borrow().last().map(String::as_str), Some("destroy"));

    // Never armed: nothing to tear down.
    let backend = FakeBackend::default();
    let log = Rc::clone(&backend.log);
    assert!(Session::new(backend).shutdown().is_empty());
    assert!(log.borrow().is_empty());
}

#[test]
fn test_failed_event_is_advisory() {
    let backend = FakeBackend {
        fail_add: Some(CacheEvent::L2DataMiss),
        ..Default::default()
    };
    let mut session = Session::new(backend);
    session.arm().unwrap();
    assert_eq!(session.state(), SessionState::Armed);
    assert_eq!(session.registered(), &[CacheEvent::L1DataMiss]);

    let advisories = session.take_advisories();
    assert_eq!(advisories.len(), 1);
    assert_eq!(advisories[0].severity(), Severity::Advisory);
    assert!(matches!(
        advisories[0],
        CounterError::AddEvent {
            event: CacheEvent::L2DataMiss,
            ..
        }
    ));

    let m = session.measure(|| 7).unwrap();
    assert_eq!(m.output, 7);
    assert_eq!(m.counters.l1_dcm, 100);
    assert_eq!(m.counters.l2_dcm, 0);
}

#[test]
fn test_failed_create_still_measures() {
    let backend = FakeBackend {
        fail_create: true,
        ..Default::default()
    };
    let mut session = Session::new(backend);
    session.arm().unwrap();
    assert!(session.registered().is_empty());
    assert_eq!(session.take_advisories().len(), 1);

    let m = session.measure(|| Kernel::Block { block_size: 3 }.run(6, 6)).unwrap();
    assert_eq!(m.counters, CounterValues::default());
    assert_eq!(m.output.unwrap().matrix.get(0, 5), 21.0);
    session.reset().unwrap();
    assert!(session.shutdown().is_empty());
}

#[test]
fn test_failed_start_is_reported_and_run_continues() {
    let backend = FakeBackend {
        fail_start: true,
        ..Default::default()
    };
    let mut session = Session::new(backend);
    session.arm().unwrap();
    let m = session.measure(|| Kernel::Line.run(2, 2)).unwrap();
    assert!(m.output.is_ok());
    let advisories = session.take_advisories();
    assert!(matches!(advisories.as_slice(), [CounterError::Start(_)]));
}

#[test]
fn test_wrong_state_is_rejected() {
    let mut session = Session::new(NullBackend);
    assert!(matches!(
        session.measure(|| ()),
        Err(CounterError::InvalidTransition {
            state: SessionState::Initialized,
            ..
        })
    ));
    assert!(session.reset().is_err());

    session.arm().unwrap();
    assert!(session.arm().is_err());
    assert!(session.reset().is_err());
    assert_eq!(session.state(), SessionState::Armed);

    session.measure(|| ()).unwrap();
    assert!(session.measure(|| ()).is_err());
    session.reset().unwrap();
    assert!(session.shutdown().is_empty());
}

#[test]
fn test_null_backend_counts_are_zero() {
    let mut session = Session::new(NullBackend);
    session.arm().unwrap();
    for kernel in [
        Kernel::LineParallelRows { threads: 1 },
        Kernel::LineParallelCols { threads: 4 },
    ] {
        let m = session.measure(|| kernel.run(8, 8)).unwrap();
        assert_eq!(m.counters, CounterValues::default());
        assert!(m.wall >= m.output.unwrap().elapsed);
        session.reset().unwrap();
    }
    assert!(session.shutdown().is_empty());
}

#[test]
fn test_fatal_errors() {
    let unavailable = CounterError::BackendUnavailable {
        reason: "no perf".into(),
    };
    let mismatch = CounterError::VersionMismatch {
        reason: "attr size".into(),
    };
    assert_eq!(unavailable.severity(), Severity::Fatal);
    assert_eq!(mismatch.severity(), Severity::Fatal);
    assert_eq!(CounterError::Reset(os_err()).severity(), Severity::Advisory);
}

// ============================================================
// Reporter
// ============================================================

#[test]
fn test_report_product() {
    let product = Kernel::Line.run(4, 4).unwrap();
    let mut out = Vec::new();
    write_product(&mut out, &product).unwrap();
    let text = String::from_utf8(out).unwrap();

    let mut lines = text.lines();
    let time = lines.next().unwrap();
    assert!(time.starts_with("Time: ") && time.ends_with(" seconds"), "{time}");
    let secs = time["Time: ".len()..time.len() - " seconds".len()].to_string();
    assert_eq!(secs.split('.').nth(1).map(str::len), Some(3));
    assert_eq!(lines.next(), Some("Result matrix: "));
    assert_eq!(lines.next(), Some("10 10 10 10 "));
}

#[test]
fn test_report_truncates_to_ten() {
    let product = Kernel::Naive.run(12, 12).unwrap();
    let mut out = Vec::new();
    write_product(&mut out, &product).unwrap();
    let text = String::from_utf8(out).unwrap();
    let sample = text.lines().nth(2).unwrap();
    assert_eq!(sample.split_whitespace().count(), 10);
    assert!(sample.split_whitespace().all(|v| v == "78"));
}

#[test]
fn test_report_counters() {
    let mut out = Vec::new();
    write_counters(&mut out, &CounterValues { l1_dcm: 42, l2_dcm: 7 }).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "L1 DCM: 42 \nL2 DCM: 7 \n");
}
