//! Multi-threaded line multiplication.
//!
//! Both variants run on a rayon pool in fork-join style and never lock:
//! correctness rests on every task writing a range of C that no other
//! task touches.
//!
//! - `line_rows`: splits the i loop, each task owns a contiguous band of
//!   rows of C for the whole computation.
//! - `line_cols`: keeps i and k sequential and splits the j range of the
//!   current row of C across tasks, joining after every (i, k) step.
//!
//! Both cut their work with `par_chunks_mut(chunk_len(..))`. [`partition`]
//! spells out the ranges that split produces, so disjointness can be
//! checked independently of the arithmetic.

pub mod line_cols;
pub mod line_rows;

use crate::error::MatmulError;
use std::ops::Range;

/// Build the pool the parallel kernels run on.
///
/// `threads == 0` sizes the pool to the available hardware parallelism.
pub fn thread_pool(threads: usize) -> Result<rayon::ThreadPool, MatmulError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("matprod-worker-{i}"))
        .build()?;
    log::debug!("thread pool ready with {} workers", pool.current_num_threads());
    Ok(pool)
}

/// Length of each part when `len` items are split into `parts` contiguous
/// pieces. The last piece may be shorter.
pub fn chunk_len(len: usize, parts: usize) -> usize {
    len.div_ceil(parts.max(1)).max(1)
}

/// Contiguous, ascending, non-overlapping ranges covering `0..len`.
///
/// This is the same split `par_chunks_mut(chunk_len(len, parts))` makes.
pub fn partition(len: usize, parts: usize) -> Vec<Range<usize>> {
    let step = chunk_len(len, parts);
    (0..len)
        .step_by(step)
        .map(|start| start..(start + step).min(len))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn partition_covers_every_index_once() {
        for len in [1, 2, 5, 10, 17, 64, 101] {
            for parts in [1, 2, 3, 4, 7, 16, 200] {
                let ranges = partition(len, parts);
                assert!(ranges.len() <= parts.max(1));
                let mut next = 0;
                for r in &ranges {
                    assert_eq!(r.start, next, "len {len} parts {parts}: gap or overlap");
                    assert!(r.end > r.start);
                    next = r.end;
                }
                assert_eq!(next, len);
            }
        }
    }

    #[test]
    fn partition_matches_par_chunks() {
        for (len, parts) in [(10, 4), (7, 3), (64, 8), (5, 9)] {
            let data = vec![0u8; len];
            let chunk_sizes: Vec<usize> = data.chunks(chunk_len(len, parts)).map(<[u8]>::len).collect();
            let range_sizes: Vec<usize> = partition(len, parts).iter().map(|r| r.len()).collect();
            assert_eq!(chunk_sizes, range_sizes);
        }
    }

    #[test]
    fn no_two_tasks_write_the_same_cell() {
        let n = 13;
        for threads in [1, 2, 4, 5] {
            let cells: Vec<AtomicU32> = (0..n * n).map(|_| AtomicU32::new(0)).collect();

            // Row ownership (line_rows).
            partition(n, threads).into_par_iter().for_each(|rows| {
                for i in rows {
                    for j in 0..n {
                        cells[i * n + j].fetch_add(1, Ordering::Relaxed);
                    }
                }
            });
            assert!(cells.iter().all(|c| c.swap(0, Ordering::Relaxed) == 1));

            // Column ranges within one (i, k) step (line_cols).
            for i in 0..n {
                partition(n, threads).into_par_iter().for_each(|cols| {
                    for j in cols {
                        cells[i * n + j].fetch_add(1, Ordering::Relaxed);
                    }
                });
            }
            assert!(cells.iter().all(|c| c.load(Ordering::Relaxed) == 1));
        }
    }

    #[test]
    fn zero_threads_uses_hardware_parallelism() {
        let pool = thread_pool(0).unwrap();
        assert!(pool.current_num_threads() >= 1);
        assert_eq!(thread_pool(3).unwrap().current_num_threads(), 3);
    }
}
