//! Linux `perf_event_open` backend for the cache-miss counters.
//!
//! Each event gets its own file descriptor, opened disabled, counting user
//! space only, and inherited by threads spawned after it was opened so the
//! workers of the parallel kernels are included.
//!
//! Linux has no generic L2 cache event; the second-level channel counts
//! last-level cache read misses instead.
//!
//! On non-Linux platforms [`PerfBackend::init`] always fails.

use super::{CacheEvent, CounterBackend, CounterValues, EventSet};
use crate::error::CounterError;

#[cfg(target_os = "linux")]
mod linux {
    use super::{CacheEvent, CounterBackend, CounterError, CounterValues, EventSet};
    use std::io;
    use std::os::unix::io::RawFd;

    // perf_event_open constants (from linux/perf_event.h)
    const PERF_TYPE_SOFTWARE: u32 = 1;
    const PERF_COUNT_SW_TASK_CLOCK: u64 = 1;

    const PERF_TYPE_HW_CACHE: u32 = 3;
    const PERF_COUNT_HW_CACHE_L1D: u64 = 0;
    const PERF_COUNT_HW_CACHE_LL: u64 = 2;
    const PERF_COUNT_HW_CACHE_OP_READ: u64 = 0;
    const PERF_COUNT_HW_CACHE_RESULT_MISS: u64 = 1;

    const PERF_EVENT_IOC_ENABLE: u64 = 0x2400;
    const PERF_EVENT_IOC_DISABLE: u64 = 0x2401;
    const PERF_EVENT_IOC_RESET: u64 = 0x2403;

    // bit 0 = disabled, bit 1 = inherit, bit 5 = exclude_kernel, bit 6 = exclude_hv
    const ATTR_FLAGS: u64 = (1 << 0) | (1 << 1) | (1 << 5) | (1 << 6);

    const PARANOID_PATH: &str = "/proc/sys/kernel/perf_event_paranoid";

    #[inline]
    fn cache_event(cache_id: u64, op: u64, result: u64) -> u64 {
        cache_id | (op << 8) | (result << 16)
    }

    fn event_config(event: CacheEvent) -> u64 {
        let cache_id = match event {
            CacheEvent::L1DataMiss => PERF_COUNT_HW_CACHE_L1D,
            CacheEvent::L2DataMiss => PERF_COUNT_HW_CACHE_LL,
        };
        cache_event(cache_id, PERF_COUNT_HW_CACHE_OP_READ, PERF_COUNT_HW_CACHE_RESULT_MISS)
    }

    /// `perf_event_attr` up to `PERF_ATTR_SIZE_VER5` (112 bytes).
    #[repr(C)]
    #[derive(Default)]
    struct PerfEventAttr {
        type_: u32,
        size: u32,
        config: u64,
        sample_period_or_freq: u64,
        sample_type: u64,
        read_format: u64,
        flags: u64,
        wakeup_events_or_watermark: u32,
        bp_type: u32,
        config1_or_bp_addr: u64,
        config2_or_bp_len: u64,
        branch_sample_type: u64,
        sample_regs_user: u64,
        sample_stack_user: u32,
        clockid: i32,
        sample_regs_intr: u64,
        aux_watermark: u32,
        sample_max_stack: u16,
        reserved_2: u16,
    }

    fn open_counter(type_: u32, config: u64) -> io::Result<RawFd> {
        let attr = PerfEventAttr {
            type_,
            size: std::mem::size_of::<PerfEventAttr>() as u32,
            config,
            flags: ATTR_FLAGS,
            ..Default::default()
        };

        // pid = 0 (this process), cpu = -1 (any), no group leader, no flags
        let fd = unsafe {
            libc::syscall(
                libc::SYS_perf_event_open,
                &attr as *const PerfEventAttr as usize,
                0,
                -1,
                -1,
                0,
            )
        };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(fd as RawFd)
    }

    fn ioctl(fd: RawFd, request: u64) -> io::Result<()> {
        if unsafe { libc::ioctl(fd, request as _, 0) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn read_counter(fd: RawFd) -> io::Result<u64> {
        let mut val: u64 = 0;
        let ret = unsafe { libc::read(fd, &mut val as *mut u64 as *mut libc::c_void, 8) };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        if ret != 8 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "short counter read"));
        }
        Ok(val)
    }

    fn close(fd: RawFd) -> io::Result<()> {
        if unsafe { libc::close(fd) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Initialized perf_event support for the current process.
    #[derive(Debug)]
    pub struct PerfBackend {
        paranoid: i32,
    }

    impl PerfBackend {
        /// Check that the kernel exposes perf events and accepts our
        /// attribute layout.
        ///
        /// # Errors
        ///
        /// - [`CounterError::BackendUnavailable`] if perf events are missing
        ///   or not permitted
        /// - [`CounterError::VersionMismatch`] if the kernel rejects the
        ///   attribute size (`E2BIG`)
        pub fn init() -> Result<Self, CounterError> {
            let paranoid = std::fs::read_to_string(PARANOID_PATH)
                .map_err(|e| CounterError::BackendUnavailable {
                    reason: format!("{PARANOID_PATH}: {e}"),
                })?
                .trim()
                .parse::<i32>()
                .map_err(|e| CounterError::BackendUnavailable {
                    reason: format!("{PARANOID_PATH}: {e}"),
                })?;

            match open_counter(PERF_TYPE_SOFTWARE, PERF_COUNT_SW_TASK_CLOCK) {
                Ok(fd) => {
                    let _ = close(fd);
                }
                Err(e) if e.raw_os_error() == Some(libc::E2BIG) => {
                    return Err(CounterError::VersionMismatch {
                        reason: format!(
                            "kernel rejected perf_event_attr of {} bytes",
                            std::mem::size_of::<PerfEventAttr>()
                        ),
                    });
                }
                Err(e) => {
                    return Err(CounterError::BackendUnavailable {
                        reason: format!("perf_event_open (paranoid level {paranoid}): {e}"),
                    });
                }
            }

            log::info!("perf_event backend ready, paranoid level {paranoid}");
            Ok(Self { paranoid })
        }

        /// Value of `perf_event_paranoid` read at init.
        pub fn paranoid(&self) -> i32 {
            self.paranoid
        }
    }

    impl CounterBackend for PerfBackend {
        type Events = PerfEventSet;

        fn create_event_set(&mut self) -> Result<PerfEventSet, CounterError> {
            Ok(PerfEventSet { fds: Vec::new() })
        }
    }

    /// Open file descriptors for the registered events.
    #[derive(Debug)]
    pub struct PerfEventSet {
        fds: Vec<(CacheEvent, RawFd)>,
    }

    impl PerfEventSet {
        fn each(&self, request: u64) -> io::Result<()> {
            for &(_, fd) in &self.fds {
                ioctl(fd, request)?;
            }
            Ok(())
        }
    }

    impl EventSet for PerfEventSet {
        fn add(&mut self, event: CacheEvent) -> Result<(), CounterError> {
            if self.fds.iter().any(|&(e, _)| e == event) {
                return Err(CounterError::AddEvent {
                    event,
                    source: io::Error::new(io::ErrorKind::AlreadyExists, "event already registered"),
                });
            }
            let fd = open_counter(PERF_TYPE_HW_CACHE, event_config(event))
                .map_err(|source| CounterError::AddEvent { event, source })?;
            self.fds.push((event, fd));
            Ok(())
        }

        fn remove(&mut self, event: CacheEvent) -> Result<(), CounterError> {
            let Some(pos) = self.fds.iter().position(|&(e, _)| e == event) else {
                return Err(CounterError::RemoveEvent {
                    event,
                    source: io::Error::new(io::ErrorKind::NotFound, "event not registered"),
                });
            };
            let (_, fd) = self.fds.remove(pos);
            close(fd).map_err(|source| CounterError::RemoveEvent { event, source })
        }

        fn start(&mut self) -> Result<(), CounterError> {
            self.each(PERF_EVENT_IOC_ENABLE).map_err(CounterError::Start)
        }

        fn stop(&mut self) -> Result<CounterValues, CounterError> {
            self.each(PERF_EVENT_IOC_DISABLE).map_err(CounterError::Stop)?;
            let mut values = CounterValues::default();
            for &(event, fd) in &self.fds {
                values.set(event, read_counter(fd).map_err(CounterError::Stop)?);
            }
            Ok(values)
        }

        fn reset(&mut self) -> Result<(), CounterError> {
            self.each(PERF_EVENT_IOC_RESET).map_err(CounterError::Reset)
        }

        fn destroy(mut self) -> Result<(), CounterError> {
            let mut first_err = None;
            for (_, fd) in self.fds.drain(..) {
                if let Err(e) = close(fd) {
                    first_err.get_or_insert(e);
                }
            }
            match first_err {
                Some(e) => Err(CounterError::Destroy(e)),
                None => Ok(()),
            }
        }
    }

    impl Drop for PerfEventSet {
        fn drop(&mut self) {
            for &(_, fd) in &self.fds {
                let _ = close(fd);
            }
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod stub {
    use super::{CacheEvent, CounterBackend, CounterError, CounterValues, EventSet};

    #[derive(Debug)]
    pub struct PerfBackend {
        _private: (),
    }

    impl PerfBackend {
        pub fn init() -> Result<Self, CounterError> {
            Err(CounterError::BackendUnavailable {
                reason: "perf_event is only available on Linux".to_string(),
            })
        }

        pub fn paranoid(&self) -> i32 {
            0
        }
    }

    impl CounterBackend for PerfBackend {
        type Events = PerfEventSet;

        fn create_event_set(&mut self) -> Result<PerfEventSet, CounterError> {
            Ok(PerfEventSet)
        }
    }

    #[derive(Debug)]
    pub struct PerfEventSet;

    impl EventSet for PerfEventSet {
        fn add(&mut self, _event: CacheEvent) -> Result<(), CounterError> {
            Ok(())
        }
        fn remove(&mut self, _event: CacheEvent) -> Result<(), CounterError> {
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
}

#[cfg(target_os = "linux")]
pub use linux::{PerfBackend, PerfEventSet};

#[cfg(not(target_os = "linux"))]
pub use stub::{PerfBackend, PerfEventSet};
