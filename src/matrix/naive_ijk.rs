/// Naive matrix multiplication using i-j-k loop order.
///
/// This is the textbook triple loop: each `C[i][j]` is a dot product of
/// row `i` of A and column `j` of B. It's slow because the innermost loop
/// walks B with stride `n` (column-wise), missing cache on nearly every
/// iteration once a column no longer fits.
///
/// C is overwritten, not accumulated into.
///
/// # Arguments
///
/// * `a` - Matrix A (n × n), row-major
/// * `b` - Matrix B (n × n), row-major
/// * `c` - Matrix C (n × n), row-major, receives A * B
/// * `n` - Row length of all three matrices
pub fn matmul_naive_ijk(a: &[f64], b: &[f64], c: &mut [f64], n: usize) {
    assert_eq!(a.len(), n * n, "A: expected {}x{}={} elements", n, n, n * n);
    assert_eq!(b.len(), n * n, "B: expected {}x{}={} elements", n, n, n * n);
    assert_eq!(c.len(), n * n, "C: expected {}x{}={} elements", n, n, n * n);

    for i in 0..n {
        for j in 0..n {
            let mut sum = 0.0;
            for k in 0..n {
                sum += a[i * n + k] * b[k * n + j];
            }
            c[i * n + j] = sum;
        }
    }
}
