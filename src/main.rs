//! Interactive benchmark driver.
//!
//! Pick a kernel from the menu, give the matrix size (and a block size for
//! the blocked kernel), and get back the time, a sample of the result and
//! the cache-miss counters. `0` quits.
//!
//! With `--sweep` the menu is skipped and the selected kernels run over a
//! fixed grid of sizes, several times each.

use clap::Parser;
use matprod::counters::{CounterBackend, NullBackend, PerfBackend, Session};
use matprod::sweep::{SweepPlan, run_sweep};
use matprod::{Kernel, SweepError, report};
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

#[derive(Parser)]
#[command(version, about = "Measure matrix multiplication loop orders")]
struct Opt {
    #[arg(
        short,
        long,
        default_value_t = 0,
        help = "worker threads for the parallel kernels (0 = all cores)"
    )]
    threads: usize,
    #[arg(long, help = "run without hardware counters (they report 0)")]
    no_counters: bool,
    #[arg(long, help = "run the size sweep instead of the interactive menu")]
    sweep: bool,
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = [1, 2, 3, 4, 5],
        help = "menu selections to include in the sweep"
    )]
    select: Vec<u32>,
    #[arg(long, default_value_t = 3, help = "runs per sweep case")]
    repetitions: usize,
}

fn main() -> ExitCode {
    env_logger::init();
    let opt = Opt::parse();

    let result = if opt.no_counters {
        run(Session::new(NullBackend), &opt)
    } else {
        match PerfBackend::init() {
            Ok(backend) => run(Session::new(backend), &opt),
            Err(e) => {
                println!("{e}");
                return ExitCode::FAILURE;
            }
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run<B: CounterBackend>(mut session: Session<B>, opt: &Opt) -> Result<(), SweepError> {
    let mut out = io::stdout().lock();

    session.arm()?;
    print_advisories(&mut out, &mut session);

    if opt.sweep {
        let plan = SweepPlan {
            repetitions: opt.repetitions,
            ..SweepPlan::default()
        };
        let cases = plan.cases(&opt.select, opt.threads);
        run_sweep(&mut session, &cases, plan.repetitions, &mut out)?;
    } else {
        interactive(&mut session, opt, &mut out)?;
    }

    for advisory in session.shutdown() {
        writeln!(out, "{advisory}")?;
    }
    Ok(())
}

fn interactive<B: CounterBackend, W: Write>(
    session: &mut Session<B>,
    opt: &Opt,
    out: &mut W,
) -> Result<(), SweepError> {
    let stdin = io::stdin();
    let mut input = Tokens::new(stdin.lock());

    loop {
        let _ = print_menu(out);
        let Some(selection) = input.next_number::<u32>() else {
            break;
        };
        if selection == 0 {
            break;
        }
        if !Kernel::is_selection(selection) {
            let _ = writeln!(out, "Invalid selection {selection}");
            continue;
        }

        let _ = write!(out, "Dimensions: lins=cols ? ");
        let _ = out.flush();
        let Some(n) = input.next_number::<usize>() else {
            break;
        };

        let block_size = if Kernel::needs_block_size(selection) {
            let _ = write!(out, "Block Size? ");
            let _ = out.flush();
            match input.next_number::<usize>() {
                Some(bs) => bs,
                None => break,
            }
        } else {
            0
        };

        let Some(kernel) = Kernel::from_selection(selection, block_size, opt.threads) else {
            continue;
        };

        let measurement = session.measure(|| kernel.run(n, n))?;
        print_advisories(out, session);

        let _ = match &measurement.output {
            Ok(product) => report::write_product(out, product),
            Err(e) => writeln!(out, "{e}"),
        };
        let _ = report::write_counters(out, &measurement.counters);

        session.reset()?;
        print_advisories(out, session);
    }
    Ok(())
}

fn print_menu<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out)?;
    for (i, label) in Kernel::MENU.iter().enumerate() {
        writeln!(out, "{}. {label}", i + 1)?;
    }
    write!(out, "Selection?: ")?;
    out.flush()
}

fn print_advisories<W: Write, B: CounterBackend>(out: &mut W, session: &mut Session<B>) {
    for advisory in session.take_advisories() {
        let _ = writeln!(out, "{advisory}");
    }
}

/// Whitespace-separated tokens from a line reader.
struct Tokens<R> {
    reader: R,
    pending: Vec<String>,
}

impl<R: BufRead> Tokens<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            pending: Vec::new(),
        }
    }

    /// Next token that parses as `T`. Unparseable tokens are skipped;
    /// `None` at end of input.
    fn next_number<T: std::str::FromStr>(&mut self) -> Option<T> {
        loop {
            while let Some(token) = self.pending.pop() {
                match token.parse() {
                    Ok(value) => return Some(value),
                    Err(_) => log::warn!("ignoring non-numeric input {token:?}"),
                }
            }
            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                Ok(0) | Err(_) => return None,
                Ok(_) => self.pending = line.split_whitespace().rev().map(String::from).collect(),
            }
        }
    }
}
