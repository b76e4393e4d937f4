//! Scripted size sweeps over the kernels.
//!
//! Each case runs `repetitions` times inside the session's
//! measure/reset cycle, printing the usual per-run report, then one summary
//! line with the averages.

use crate::counters::{CounterBackend, CounterValues, Session};
use crate::error::SweepError;
use crate::kernels::Kernel;
use crate::report;
use std::io::Write;
use std::time::Duration;

/// Which sizes and block sizes a sweep visits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepPlan {
    /// Matrix sizes for every kernel except the blocked one.
    pub sizes: Vec<usize>,
    /// Matrix sizes for the blocked kernel.
    pub block_dims: Vec<usize>,
    /// Block sizes tried at every entry of `block_dims`.
    pub block_sizes: Vec<usize>,
    pub repetitions: usize,
}

impl Default for SweepPlan {
    /// 600..=3000 step 400, and 4096..=10240 step 2048 with blocks of
    /// 128..=512 step 128, three runs each.
    fn default() -> Self {
        Self {
            sizes: (600..=3000).step_by(400).collect(),
            block_dims: (4096..=10240).step_by(2048).collect(),
            block_sizes: (128..=512).step_by(128).collect(),
            repetitions: 3,
        }
    }
}

/// One kernel at one size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepCase {
    pub kernel: Kernel,
    pub n: usize,
}

/// Averages over the repetitions of one case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepSummary {
    pub case: SweepCase,
    /// Runs that produced a result.
    pub runs: usize,
    pub avg_elapsed: Duration,
    pub avg_counters: CounterValues,
}

impl SweepSummary {
    pub fn gflops(&self) -> f64 {
        let secs = self.avg_elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        2.0 * (self.case.n as f64).powi(3) / secs / 1e9
    }
}

impl SweepPlan {
    /// Expand menu selections into cases, in selection order.
    ///
    /// Selections outside 1-5 are skipped.
    pub fn cases(&self, selections: &[u32], threads: usize) -> Vec<SweepCase> {
        let mut cases = Vec::new();
        for &selection in selections {
            if Kernel::needs_block_size(selection) {
                for &n in &self.block_dims {
                    for &block_size in &self.block_sizes {
                        if let Some(kernel) = Kernel::from_selection(selection, block_size, threads) {
                            cases.push(SweepCase { kernel, n });
                        }
                    }
                }
            } else {
                for &n in &self.sizes {
                    if let Some(kernel) = Kernel::from_selection(selection, 0, threads) {
                        cases.push(SweepCase { kernel, n });
                    }
                }
            }
        }
        cases
    }
}

/// Run every case `repetitions` times under `session`.
///
/// The session must be armed; it is left armed. A kernel error is printed
/// and that run is left out of the averages.
pub fn run_sweep<B: CounterBackend, W: Write>(
    session: &mut Session<B>,
    cases: &[SweepCase],
    repetitions: usize,
    out: &mut W,
) -> Result<Vec<SweepSummary>, SweepError> {
    let mut summaries = Vec::with_capacity(cases.len());

    for &case in cases {
        writeln!(out, "{} {} * {}", case.kernel, case.n, case.n)?;

        let mut total = Duration::ZERO;
        let mut l1_total = 0u64;
        let mut l2_total = 0u64;
        let mut runs = 0usize;

        for _ in 0..repetitions {
            let measurement = session.measure(|| case.kernel.run(case.n, case.n))?;
            for advisory in session.take_advisories() {
                writeln!(out, "{advisory}")?;
            }

            match &measurement.output {
                Ok(product) => {
                    report::write_product(out, product)?;
                    total += product.elapsed;
                    l1_total = l1_total.saturating_add(measurement.counters.l1_dcm);
                    l2_total = l2_total.saturating_add(measurement.counters.l2_dcm);
                    runs += 1;
                }
                Err(e) => writeln!(out, "{e}")?,
            }
            report::write_counters(out, &measurement.counters)?;

            session.reset()?;
            for advisory in session.take_advisories() {
                writeln!(out, "{advisory}")?;
            }
        }

        let summary = if runs == 0 {
            SweepSummary {
                case,
                runs,
                avg_elapsed: Duration::ZERO,
                avg_counters: CounterValues::default(),
            }
        } else {
            SweepSummary {
                case,
                runs,
                avg_elapsed: total / runs as u32,
                avg_counters: CounterValues {
                    l1_dcm: l1_total / runs as u64,
                    l2_dcm: l2_total / runs as u64,
                },
            }
        };
        writeln!(
            out,
            "avg over {} runs: {:.3} s  {:.2} GFLOPS  L1 DCM {}  L2 DCM {}\n",
            summary.runs,
            summary.avg_elapsed.as_secs_f64(),
            summary.gflops(),
            summary.avg_counters.l1_dcm,
            summary.avg_counters.l2_dcm
        )?;
        summaries.push(summary);
    }

    Ok(summaries)
}
