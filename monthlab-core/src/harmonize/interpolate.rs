//! Gap filling over evenly spaced positions.
//!
//! Values are indexed by position (month number on a grid, or record index
//! for the chain linker). Known points are never modified.

use crate::config::InterpolationMethod;

/// Fill interior gaps with `method` and hold the nearest known value outward
/// at both ends. A column with no known value is returned unchanged.
pub fn fill_outward(values: &[Option<f64>], method: InterpolationMethod) -> Vec<Option<f64>> {
    let mut filled = fill_interior(values, method);
    let first = filled.iter().position(Option::is_some);
    let last = filled.iter().rposition(Option::is_some);
    if let (Some(first), Some(last)) = (first, last) {
        let head = filled[first];
        let tail = filled[last];
        for v in filled.iter_mut().take(first) {
            *v = head;
        }
        for v in filled.iter_mut().skip(last + 1) {
            *v = tail;
        }
    }
    filled
}

/// Fill gaps strictly between the first and last known values. Leading and
/// trailing gaps stay missing.
pub fn fill_interior(values: &[Option<f64>], method: InterpolationMethod) -> Vec<Option<f64>> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|y| (i as f64, y)))
        .unzip();

    if xs.len() < 2 {
        return values.to_vec();
    }

    let curve = Curve::fit(&xs, &ys, method);
    let (lo, hi) = (xs[0], xs[xs.len() - 1]);

    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let x = i as f64;
            match v {
                Some(_) => *v,
                None if x > lo && x < hi => Some(curve.eval(x)),
                None => None,
            }
        })
        .collect()
}

/// Interpolant through known points. Falls back to linear when there are
/// too few points for the requested method.
enum Curve<'a> {
    Linear { xs: &'a [f64], ys: &'a [f64] },
    Quadratic { xs: &'a [f64], ys: &'a [f64] },
    Cubic(NaturalCubicSpline<'a>),
}

impl<'a> Curve<'a> {
    fn fit(xs: &'a [f64], ys: &'a [f64], method: InterpolationMethod) -> Self {
        match method {
            InterpolationMethod::Cubic if xs.len() >= 3 => {
                Self::Cubic(NaturalCubicSpline::fit(xs, ys))
            }
            InterpolationMethod::Quadratic if xs.len() >= 3 => Self::Quadratic { xs, ys },
            _ => Self::Linear { xs, ys },
        }
    }

    fn eval(&self, x: f64) -> f64 {
        match self {
            Self::Linear { xs, ys } => {
                let i = segment(xs, x);
                let t = (x - xs[i]) / (xs[i + 1] - xs[i]);
                ys[i] + t * (ys[i + 1] - ys[i])
            }
            Self::Quadratic { xs, ys } => {
                // Three consecutive knots around the segment containing x.
                let i = segment(xs, x);
                let start = if i + 2 < xs.len() { i } else { i - 1 };
                lagrange3(&xs[start..start + 3], &ys[start..start + 3], x)
            }
            Self::Cubic(spline) => spline.eval(x),
        }
    }
}

/// Index `i` of the knot segment `[xs[i], xs[i + 1]]` containing `x`.
fn segment(xs: &[f64], x: f64) -> usize {
    xs.partition_point(|&k| k <= x)
        .saturating_sub(1)
        .min(xs.len() - 2)
}

fn lagrange3(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let (x0, x1, x2) = (xs[0], xs[1], xs[2]);
    let l0 = (x - x1) * (x - x2) / ((x0 - x1) * (x0 - x2));
    let l1 = (x - x0) * (x - x2) / ((x1 - x0) * (x1 - x2));
    let l2 = (x - x0) * (x - x1) / ((x2 - x0) * (x2 - x1));
    ys[0] * l0 + ys[1] * l1 + ys[2] * l2
}

/// Cubic spline with zero second derivative at both ends.
struct NaturalCubicSpline<'a> {
    xs: &'a [f64],
    ys: &'a [f64],
    second: Vec<f64>,
}

impl<'a> NaturalCubicSpline<'a> {
    fn fit(xs: &'a [f64], ys: &'a [f64]) -> Self {
        let n = xs.len();
        let mut second = vec![0.0; n];

        // Tridiagonal system for interior second derivatives (Thomas algorithm).
        let mut cp = vec![0.0; n];
        let mut dp = vec![0.0; n];
        for i in 1..n - 1 {
            let h0 = xs[i] - xs[i - 1];
            let h1 = xs[i + 1] - xs[i];
            let rhs = 6.0 * ((ys[i + 1] - ys[i]) / h1 - (ys[i] - ys[i - 1]) / h0);
            let denom = 2.0 * (h0 + h1) - h0 * cp[i - 1];
            cp[i] = h1 / denom;
            dp[i] = (rhs - h0 * dp[i - 1]) / denom;
        }
        for i in (1..n - 1).rev() {
            second[i] = dp[i] - cp[i] * second[i + 1];
        }

        Self { xs, ys, second }
    }

    fn eval(&self, x: f64) -> f64 {
        let i = segment(self.xs, x);
        let h = self.xs[i + 1] - self.xs[i];
        let a = (self.xs[i + 1] - x) / h;
        let b = (x - self.xs[i]) / h;
        a * self.ys[i]
            + b * self.ys[i + 1]
            + ((a.powi(3) - a) * self.second[i] + (b.powi(3) - b) * self.second[i + 1]) * h * h
                / 6.0
    }
}
