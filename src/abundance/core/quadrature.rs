//! One-dimensional numerical integration over a distance bin.
//!
//! Two rules, selected through [`Quadrature`]:
//! - composite trapezoid with a fixed number of equal panels;
//! - adaptive Simpson with Richardson correction, refining each half
//!   interval until `|S_left + S_right − S| <= 15·tol`, where `tol` starts
//!   at `rel_tol·|S|` on the whole interval and halves at every split.
//!
//! Both rules evaluate the integrand only at finite points in `[a, b]` and
//! return `0` for an empty interval.
use crate::abundance::core::options::Quadrature;

/// Integrate `f` over `[a, b]` with the chosen rule.
pub fn integrate<F>(f: F, a: f64, b: f64, rule: Quadrature) -> f64
where
    F: Fn(f64) -> f64,
{
    if b <= a {
        return 0.0;
    }
    match rule {
        Quadrature::Trapezoid { subdivisions } => trapezoid(&f, a, b, subdivisions.max(1)),
        Quadrature::AdaptiveSimpson { rel_tol, max_depth } => {
            adaptive_simpson(&f, a, b, rel_tol, max_depth)
        }
    }
}

/// Composite trapezoid rule with `n` equal panels.
pub fn trapezoid<F: Fn(f64) -> f64>(f: &F, a: f64, b: f64, n: usize) -> f64 {
    let h = (b - a) / n as f64;
    let interior: f64 = (1..n).map(|i| f(a + i as f64 * h)).sum();
    h * (0.5 * (f(a) + f(b)) + interior)
}

fn adaptive_simpson<F: Fn(f64) -> f64>(f: &F, a: f64, b: f64, rel_tol: f64, max_depth: u32) -> f64 {
    let fa = f(a);
    let fb = f(b);
    let m = 0.5 * (a + b);
    let fm = f(m);
    let whole = simpson(a, b, fa, fm, fb);
    let tol = rel_tol * whole.abs().max(f64::MIN_POSITIVE);
    refine(f, Panel { a, b, fa, fm, fb, whole }, tol, max_depth)
}

#[derive(Clone, Copy)]
struct Panel {
    a: f64,
    b: f64,
    fa: f64,
    fm: f64,
    fb: f64,
    whole: f64,
}

#[inline]
fn simpson(a: f64, b: f64, fa: f64, fm: f64, fb: f64) -> f64 {
    (b - a) / 6.0 * (fa + 4.0 * fm + fb)
}

fn refine<F: Fn(f64) -> f64>(f: &F, panel: Panel, tol: f64, depth: u32) -> f64 {
    let Panel { a, b, fa, fm, fb, whole } = panel;
    let m = 0.5 * (a + b);
    let lm = 0.5 * (a + m);
    let rm = 0.5 * (m + b);
    let flm = f(lm);
    let frm = f(rm);
    let left = simpson(a, m, fa, flm, fm);
    let right = simpson(m, b, fm, frm, fb);
    let delta = left + right - whole;
    if depth == 0 || delta.abs() <= 15.0 * tol {
        return left + right + delta / 15.0;
    }
    refine(f, Panel { a, b: m, fa, fm: flm, fb: fm, whole: left }, 0.5 * tol, depth - 1)
        + refine(f, Panel { a: m, b, fa: fm, fm: frm, fb, whole: right }, 0.5 * tol, depth - 1)
}
