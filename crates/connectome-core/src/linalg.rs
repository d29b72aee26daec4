// ─────────────────────────────────────────────────────────────────────
// Connectome Kernel — Dense Linear Solver
// ─────────────────────────────────────────────────────────────────────
//! Pure-Rust dense direct solver for `A X = B` (row-major, square A).
//!
//! Gaussian elimination with partial pivoting; rows of `A` and `B` are
//! swapped physically so no pivot vector is needed and all storage comes
//! from the caller.

use connectome_types::{ConnectomeError, ConnectomeResult};

/// Solve `A X = B` in place. On return `b` holds `X`; `a` is destroyed.
///
/// `a` is n×n, `b` is n×nrhs, both row-major. Fails with `Numerical` when a
/// pivot is negligible relative to the largest entry of `A`.
pub fn solve_in_place(a: &mut [f64], b: &mut [f64], n: usize, nrhs: usize) -> ConnectomeResult<()> {
    debug_assert_eq!(a.len(), n * n);
    debug_assert_eq!(b.len(), n * nrhs);

    let scale = a.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    if !scale.is_finite() {
        return Err(ConnectomeError::Numerical(
            "linear system contains non-finite entries".to_string(),
        ));
    }
    let tol = scale * n as f64 * f64::EPSILON;

    // Forward elimination
    for col in 0..n {
        let mut pivot_row = col;
        let mut pivot_abs = a[col * n + col].abs();
        for r in (col + 1)..n {
            let v = a[r * n + col].abs();
            if v > pivot_abs {
                pivot_abs = v;
                pivot_row = r;
            }
        }
        if pivot_abs <= tol {
            return Err(ConnectomeError::Numerical(format!(
                "singular or ill-conditioned system: pivot {pivot_abs:.3e} at column {col} (tolerance {tol:.3e})"
            )));
        }
        if pivot_row != col {
            swap_rows(a, n, col, pivot_row);
            swap_rows(b, nrhs, col, pivot_row);
        }

        let pivot = a[col * n + col];
        for r in (col + 1)..n {
            let factor = a[r * n + col] / pivot;
            if factor == 0.0 {
                continue;
            }
            a[r * n + col] = 0.0;
            for c in (col + 1)..n {
                a[r * n + c] -= factor * a[col * n + c];
            }
            for c in 0..nrhs {
                b[r * nrhs + c] -= factor * b[col * nrhs + c];
            }
        }
    }

    // Back substitution
    for row in (0..n).rev() {
        let pivot = a[row * n + row];
        for c in 0..nrhs {
            let mut acc = b[row * nrhs + c];
            for k in (row + 1)..n {
                acc -= a[row * n + k] * b[k * nrhs + c];
            }
            b[row * nrhs + c] = acc / pivot;
        }
    }

    if b.iter().any(|v| !v.is_finite()) {
        return Err(ConnectomeError::Numerical(
            "solution contains non-finite values".to_string(),
        ));
    }
    Ok(())
}

/// Overwrite `a` with its inverse, using `work` (n×n) as the right-hand side.
pub fn invert_into(a: &mut [f64], work: &mut [f64], n: usize) -> ConnectomeResult<()> {
    work.fill(0.0);
    for i in 0..n {
        work[i * n + i] = 1.0;
    }
    solve_in_place(a, work, n, n)?;
    a.copy_from_slice(work);
    Ok(())
}

fn swap_rows(m: &mut [f64], width: usize, r1: usize, r2: usize) {
    let (lo, hi) = if r1 < r2 { (r1, r2) } else { (r2, r1) };
    let (head, tail) = m.split_at_mut(hi * width);
    head[lo * width..(lo + 1) * width].swap_with_slice(&mut tail[..width]);
}
