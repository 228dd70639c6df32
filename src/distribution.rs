//! Numerical helpers for Student's t distribution.

use std::f64::consts::PI;

/// Natural log of the gamma function (Lanczos approximation, g = 7).
pub fn ln_gamma(x: f64) -> f64 {
    const COEFFS: [f64; 8] = [
        676.5203681218851,
        -1259.1392167224028,
        771.32342877765313,
        -176.61502916214059,
        12.507343278686905,
        -0.13857109526572012,
        9.9843695780195716e-6,
        1.5056327351493116e-7,
    ];

    if x < 0.5 {
        // Reflection: Γ(x) = π / (sin(πx) · Γ(1-x))
        (PI / (PI * x).sin()).ln() - ln_gamma(1.0 - x)
    } else {
        let x = x - 1.0;
        let mut ag = 0.99999999999980993_f64;
        for (i, &c) in COEFFS.iter().enumerate() {
            ag += c / (x + i as f64 + 1.0);
        }
        let t = x + 7.5;
        0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + ag.ln()
    }
}

/// Regularized incomplete beta function I_x(a, b).
///
/// Evaluated as a continued fraction with the modified Lentz method. Returns
/// `None` for `x` outside `[0, 1]` or non-finite arguments.
pub fn betai(a: f64, b: f64, x: f64) -> Option<f64> {
    if !(0.0..=1.0).contains(&x) || !a.is_finite() || !b.is_finite() {
        return None;
    }
    if x == 0.0 || x == 1.0 {
        return Some(x);
    }
    if x > (a + 1.0) / (a + b + 2.0) {
        return betai(b, a, 1.0 - x).map(|v| 1.0 - v);
    }

    let ln_prefactor =
        ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let prefactor = ln_prefactor.exp();

    const TINY: f64 = 1e-30;
    const EPS: f64 = 1e-12;
    const MAX_ITER: usize = 300;

    let clamp = |v: f64| if v.abs() < TINY { TINY } else { v };

    let mut c = 1.0_f64;
    let mut d = clamp(1.0 - (a + b) * x / (a + 1.0)).recip();
    let mut h = d;

    for m in 1..=MAX_ITER {
        let m = m as f64;

        let even = m * (b - m) * x / ((a + 2.0 * m - 1.0) * (a + 2.0 * m));
        d = clamp(1.0 + even * d).recip();
        c = clamp(1.0 + even / c);
        h *= d * c;

        let odd = -((a + m) * (a + b + m) * x) / ((a + 2.0 * m) * (a + 2.0 * m + 1.0));
        d = clamp(1.0 + odd * d).recip();
        c = clamp(1.0 + odd / c);
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < EPS {
            break;
        }
    }

    Some(prefactor * h / a)
}

/// Two-tailed p-value of statistic `t` with `df` degrees of freedom.
pub fn t_two_tailed_p(t: f64, df: f64) -> Option<f64> {
    if !t.is_finite() || !df.is_finite() || df <= 0.0 {
        return None;
    }
    let x = df / (df + t * t);
    betai(df / 2.0, 0.5, x).map(|p| p.clamp(0.0, 1.0))
}
