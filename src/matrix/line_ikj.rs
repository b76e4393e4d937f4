/// Line-by-line matrix multiplication using i-k-j loop order.
///
/// By swapping the j and k loops, `A[i][k]` is loaded once and the
/// innermost loop streams across row `k` of B and row `i` of C, both
/// stride 1. Each step adds a scaled row of B into a row of C.
///
/// C is accumulated into (C += A * B), so it must start zeroed to get
/// the plain product.
///
/// # Arguments
///
/// * `a` - Matrix A (n × n), row-major
/// * `b` - Matrix B (n × n), row-major
/// * `c` - Matrix C (n × n), row-major, accumulated into
/// * `n` - Row length of all three matrices
pub fn matmul_line(a: &[f64], b: &[f64], c: &mut [f64], n: usize) {
    assert_eq!(a.len(), n * n, "A: expected {}x{}={} elements", n, n, n * n);
    assert_eq!(b.len(), n * n, "B: expected {}x{}={} elements", n, n, n * n);
    assert_eq!(c.len(), n * n, "C: expected {}x{}={} elements", n, n, n * n);

    for i in 0..n {
        let c_row = &mut c[i * n..(i + 1) * n];
        for k in 0..n {
            let t = a[i * n + k];
            let b_row = &b[k * n..(k + 1) * n];
            add_scaled_row(c_row, b_row, t);
        }
    }
}

/// `c_row += t * b_row`, element by element.
#[inline]
pub(crate) fn add_scaled_row(c_row: &mut [f64], b_row: &[f64], t: f64) {
    for (cj, &bj) in c_row.iter_mut().zip(b_row) {
        *cj += t * bj;
    }
}
