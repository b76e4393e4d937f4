//! Parallel line multiplication, rows split across workers.

use super::chunk_len;
use crate::matrix::line_ikj::add_scaled_row;
use rayon::ThreadPool;
use rayon::prelude::*;

/// Multi-threaded i-k-j multiplication, parallel over the i loop.
///
/// Rows of C are split into one contiguous band per worker. A task reads
/// all of B but writes only its own band, so bands never overlap and no
/// synchronization is needed before the final join.
///
/// C is accumulated into (C += A * B).
pub fn matmul_line_rows(pool: &ThreadPool, a: &[f64], b: &[f64], c: &mut [f64], n: usize) {
    assert_eq!(a.len(), n * n, "A: expected {}x{}={} elements", n, n, n * n);
    assert_eq!(b.len(), n * n, "B: expected {}x{}={} elements", n, n, n * n);
    assert_eq!(c.len(), n * n, "C: expected {}x{}={} elements", n, n, n * n);
    if n == 0 {
        return;
    }

    let rows_per_task = chunk_len(n, pool.current_num_threads());

    pool.install(|| {
        c.par_chunks_mut(rows_per_task * n)
            .enumerate()
            .for_each(|(task, band)| {
                let first_row = task * rows_per_task;
                for (offset, c_row) in band.chunks_exact_mut(n).enumerate() {
                    let i = first_row + offset;
                    for k in 0..n {
                        add_scaled_row(c_row, &b[k * n..(k + 1) * n], a[i * n + k]);
                    }
                }
            });
    });
}
