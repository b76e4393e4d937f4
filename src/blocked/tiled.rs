//! Block-by-block line multiplication.

use crate::matrix::line_ikj::add_scaled_row;

/// Cache-tiled i-k-j matrix multiplication.
///
/// Three block loops (i0, k0, j0) step by `block`; inside each tile the
/// line kernel runs over `[i0, min(i0 + block, n))` and likewise for k and
/// j. Edge tiles are clamped with `min`, so `block` need not divide `n`
/// and may exceed it.
///
/// C is zeroed here before accumulation starts.
///
/// # Panics
///
/// Panics if `block` is 0 or the slice sizes don't match `n`.
pub fn matmul_blocked(a: &[f64], b: &[f64], c: &mut [f64], n: usize, block: usize) {
    assert!(block > 0, "block size must be at least 1");
    assert_eq!(a.len(), n * n, "A: expected {}x{}={} elements", n, n, n * n);
    assert_eq!(b.len(), n * n, "B: expected {}x{}={} elements", n, n, n * n);
    assert_eq!(c.len(), n * n, "C: expected {}x{}={} elements", n, n, n * n);

    c.fill(0.0);

    for i0 in (0..n).step_by(block) {
        let i_end = (i0 + block).min(n);
        for k0 in (0..n).step_by(block) {
            let k_end = (k0 + block).min(n);
            for j0 in (0..n).step_by(block) {
                let j_end = (j0 + block).min(n);

                for i in i0..i_end {
                    let c_tile = &mut c[i * n + j0..i * n + j_end];
                    for k in k0..k_end {
                        let t = a[i * n + k];
                        add_scaled_row(c_tile, &b[k * n + j0..k * n + j_end], t);
                    }
                }
            }
        }
    }
}
