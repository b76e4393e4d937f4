//! Text output for one measurement.

use crate::counters::{CacheEvent, CounterValues};
use crate::kernels::Product;
use std::io::{self, Write};
use std::time::Duration;

/// Elements of the first result row printed as a spot check.
pub const SAMPLE_LEN: usize = 10;

/// Write the elapsed time (three decimals) and the first
/// `min(10, n)` elements of the first row of the result.
pub fn write_product<W: Write>(out: &mut W, product: &Product) -> io::Result<()> {
    write_elapsed(out, product.elapsed)?;
    writeln!(out, "Result matrix: ")?;
    let n = product.matrix.dim();
    if n > 0 {
        for value in &product.matrix.row(0)[..n.min(SAMPLE_LEN)] {
            write!(out, "{value} ")?;
        }
    }
    writeln!(out)
}

pub fn write_elapsed<W: Write>(out: &mut W, elapsed: Duration) -> io::Result<()> {
    writeln!(out, "Time: {:.3} seconds", elapsed.as_secs_f64())
}

/// One labelled line per counter.
pub fn write_counters<W: Write>(out: &mut W, counters: &CounterValues) -> io::Result<()> {
    for event in CacheEvent::ALL {
        writeln!(out, "{}: {} ", event.label(), counters.get(event))?;
    }
    Ok(())
}
