//! Parallel line multiplication, columns split per row update.

use super::chunk_len;
use crate::matrix::line_ikj::add_scaled_row;
use rayon::ThreadPool;
use rayon::prelude::*;

/// Multi-threaded i-k-j multiplication, parallel over the j loop only.
///
/// For every (i, k) pair all workers share the update of row `i` of C:
/// the j range is cut into disjoint column spans and the pool joins
/// before moving to the next k. That is `n²` small fork-joins, against
/// the single coarse split of [`matmul_line_rows`](super::line_rows::matmul_line_rows).
///
/// C is accumulated into (C += A * B).
pub fn matmul_line_cols(pool: &ThreadPool, a: &[f64], b: &[f64], c: &mut [f64], n: usize) {
    assert_eq!(a.len(), n * n, "A: expected {}x{}={} elements", n, n, n * n);
    assert_eq!(b.len(), n * n, "B: expected {}x{}={} elements", n, n, n * n);
    assert_eq!(c.len(), n * n, "C: expected {}x{}={} elements", n, n, n * n);
    if n == 0 {
        return;
    }

    let cols_per_task = chunk_len(n, pool.current_num_threads());

    pool.install(|| {
        for (i, c_row) in c.chunks_exact_mut(n).enumerate() {
            for k in 0..n {
                let t = a[i * n + k];
                let b_row = &b[k * n..(k + 1) * n];
                c_row
                    .par_chunks_mut(cols_per_task)
                    .zip(b_row.par_chunks(cols_per_task))
                    .for_each(|(c_span, b_span)| add_scaled_row(c_span, b_span, t));
            }
        }
    });
}
