//! Numerical methods behind the solve blocks. Every method drives one
//! compiled objective by writing the iteration variable and reading back
//! the result, so units of both sides are tracked along the way.

use std::sync::Arc;

use num_complex::Complex64;
use once_cell::sync::Lazy;
use unidades::Unit;

use crate::compiler::Compiled;
use crate::context::MathContext;
use crate::value::Value;
use crate::variable::VarRef;
use crate::MathError;

const LIMITS: f64 = 1e8;
const TANH_SINH_DEPTH: usize = 11;
const TANH_SINH_NODES: [usize; TANH_SINH_DEPTH] = [6, 7, 13, 26, 53, 106, 212, 423, 846, 1693, 3385];

/// Abscissas and weights of the Tanh-Sinh rule, one row per level.
struct TanhSinhTable {
    r: Vec<Vec<f64>>,
    w: Vec<Vec<f64>>,
}

static TANH_SINH: Lazy<TanhSinhTable> = Lazy::new(|| {
    let mut r = Vec::with_capacity(TANH_SINH_DEPTH);
    let mut w = Vec::with_capacity(TANH_SINH_DEPTH);
    let mut h = 2.0f64;
    for (i, &m) in TANH_SINH_NODES.iter().enumerate() {
        h /= 2.0;
        let mut eh = h.exp();
        let mut t = eh;
        if i > 0 {
            eh *= eh;
        }
        let (mut ri, mut wi) = (Vec::with_capacity(m), Vec::with_capacity(m));
        for _ in 0..m {
            let u = (1.0 / t - t).exp();
            let d = 2.0 * u / (1.0 + u);
            ri.push(d);
            wi.push((1.0 / t + t) * d / (1.0 + u));
            t *= eh;
        }
        r.push(ri);
        w.push(wi);
    }
    TanhSinhTable{r, w}
});

fn next_up(a: f64) -> f64 {
    if a > 0.0 {
        f64::from_bits(a.to_bits() + 1)
    } else {
        f64::from_bits(a.to_bits() - 1)
    }
}

fn is_infinite(z: Complex64) -> bool {
    z.re.is_infinite() || z.im.is_infinite()
}

/// Rounds the bounds of an iteration half away from zero.
fn bounds(start: f64, end: f64) -> Result<(i64, i64), MathError> {
    if start.abs() > LIMITS || end.abs() > LIMITS {
        return Err(MathError::IterationLimits(format!("{}", -LIMITS), format!("{}", LIMITS)));
    }
    Ok((start.round() as i64, end.round() as i64))
}

fn as_units(unit: Option<Unit>) -> Option<Arc<Unit>> {
    unit.map(Arc::new)
}

pub(crate) struct Solver<'a> {
    cx: &'a MathContext,
    function: Compiled,
    variable: VarRef,
    var_units: Option<Arc<Unit>>,
    precision: f64,
    /// Units of the last objective evaluation, and of the answer once a
    /// method returns.
    pub units: Option<Arc<Unit>>,
}

impl<'a> Solver<'a> {
    pub fn new(cx: &'a MathContext, function: Compiled, variable: VarRef) -> Solver<'a> {
        let var_units = variable.borrow().value.unit.clone();
        Solver{cx, function, variable, var_units, precision: cx.precision(), units: None}
    }

    fn eval(&mut self, x: Complex64) -> Result<Value, MathError> {
        self.cx.check_cancel()?;
        {
            let mut var = self.variable.borrow_mut();
            var.value = Value::new(x, self.var_units.clone());
            var.initialized = true;
        }
        let value = (self.function)(self.cx)?;
        self.units = value.unit.clone();
        Ok(value)
    }

    fn fd(&mut self, x: f64) -> Result<f64, MathError> {
        let value = self.eval(Complex64::new(x, 0.0))?;
        if self.cx.is_complex() && !value.is_real() {
            return Err(MathError::CannotEvaluateAt(x.to_string()));
        }
        if !value.re().is_finite() {
            return Err(MathError::NotDefinedAt(x.to_string()));
        }
        Ok(value.re())
    }

    /// Like `fd` but singular points come back as None.
    fn probe(&mut self, x: f64) -> Result<Option<f64>, MathError> {
        let value = self.eval(Complex64::new(x, 0.0))?;
        if self.cx.is_complex() && !value.is_real() {
            return Err(MathError::CannotEvaluateAt(x.to_string()));
        }
        Ok(Some(value.re()).filter(|y| y.is_finite()))
    }

    fn fc(&mut self, x: f64) -> Result<Complex64, MathError> {
        let value = self.eval(Complex64::new(x, 0.0))?;
        if value.re().is_nan() && value.im().is_nan() {
            return Err(MathError::CannotEvaluateAt(x.to_string()));
        }
        Ok(value.num)
    }

    fn fi(&mut self, x: f64) -> Result<Value, MathError> {
        let value = self.eval(Complex64::new(x, 0.0))?;
        if !value.re().is_finite() {
            return Err(MathError::NotDefinedAt(x.to_string()));
        }
        Ok(value)
    }

    /// Modified Anderson-Björk bracketing: bisection until the function
    /// looks linear, then Illinois style false position. Returns the root
    /// and the last residual.
    pub fn mod_ab(&mut self, left: f64, right: f64, target: f64) -> Result<(f64, f64), MathError> {
        let prec = self.precision;
        let (mut x1, mut x2) = (left.min(right), left.max(right));
        let mut y1 = self.fd(x1)? - target;
        if y1.abs() <= prec {
            self.units = self.var_units.clone();
            return Ok((x1, 0.0));
        }
        let mut y2 = self.fd(x2)? - target;
        if y2.abs() <= prec {
            self.units = self.var_units.clone();
            return Ok((x2, 0.0));
        }
        let n_max = -(prec.log2() / 2.0) as i32 + 1;
        let mut eps1 = prec / 4.0;
        let eps = prec * (x2 - x1) / 2.0;
        if target.abs() > 1.0 {
            eps1 *= target;
        }
        let mut side = 0;
        let mut ans = x1;
        let mut bisection = true;
        let k = 0.25;
        let mut err = 0.0;
        for i in 1..=100 {
            let x3;
            let y3;
            if bisection {
                x3 = (x1 + x2) / 2.0;
                y3 = self.fd(x3)? - target;
                let ym = (y1 + y2) / 2.0;
                if (ym - y3).abs() < k * (y3.abs() + ym.abs()) {
                    bisection = false;
                }
            } else {
                x3 = (x1 * y2 - y1 * x2) / (y2 - y1);
                if x3 < x1 - eps || x3 > x2 + eps {
                    self.units = self.var_units.clone();
                    return Ok((f64::NAN, 1.0));
                }
                y3 = self.fd(x3)? - target;
            }
            err = y3.abs();
            log::trace!("mod_ab #{}: x = {}, y = {}", i, x3, y3);
            if err < eps1.abs() || (x3 - ans).abs() < eps {
                self.units = self.var_units.clone();
                return Ok((x3, err));
            }
            ans = x3;
            if y1.signum() == y3.signum() {
                if side == 1 {
                    let m = 1.0 - y3 / y1;
                    if m <= 0.0 { y2 /= 2.0 } else { y2 *= m }
                } else if !bisection {
                    side = 1;
                }
                x1 = x3;
                y1 = y3;
            } else {
                if side == -1 {
                    let m = 1.0 - y3 / y2;
                    if m <= 0.0 { y1 /= 2.0 } else { y1 *= m }
                } else if !bisection {
                    side = -1;
                }
                x2 = x3;
                y2 = y3;
            }
            if i % n_max.max(1) == 0 {
                bisection = true;
            }
        }
        self.units = self.var_units.clone();
        Ok((ans, err))
    }

    pub fn find(&mut self, left: f64, right: f64) -> Result<f64, MathError> {
        Ok(self.mod_ab(left, right, 0.0)?.0)
    }

    /// Root of `f(x) = target`; NaN when the residual stays too large.
    pub fn root(&mut self, left: f64, right: f64, target: f64) -> Result<f64, MathError> {
        let (x, err) = self.mod_ab(left, right, target)?;
        let mut eps = self.precision.sqrt();
        if target != 0.0 {
            eps *= target.abs();
        }
        Ok(if err > eps { f64::NAN } else { x })
    }

    pub fn sup(&mut self, left: f64, right: f64) -> Result<f64, MathError> {
        self.extremum(left, right, false)
    }

    pub fn inf(&mut self, left: f64, right: f64) -> Result<f64, MathError> {
        self.extremum(left, right, true)
    }

    // golden section search
    fn extremum(&mut self, left: f64, right: f64, is_min: bool) -> Result<f64, MathError> {
        const K: f64 = 0.6180339887498948482;
        const TOL2: f64 = 1e-30;
        let (mut x1, mut x2) = (left, right);
        let mut d = x2 - x1;
        let d0 = 0.1 * d;
        let mut x3 = x2 - K * d;
        let mut x4 = x1 + K * d;
        let mut y3 = self.fd(x3)?;
        let mut y4 = self.fd(x4)?;
        let mut eps = self.precision * (x3.abs() + x4.abs()) / 2.0;
        while d > eps {
            if y3 == y4 && d < d0 {
                break;
            }
            if is_min == (y3 < y4) {
                x2 = x4;
                x4 = x3;
                y4 = y3;
                d = x2 - x1;
                x3 = x2 - K * d;
                y3 = self.fd(x3)?;
            } else {
                x1 = x3;
                x3 = x4;
                y3 = y4;
                d = x2 - x1;
                x4 = x1 + K * d;
                y4 = self.fd(x4)?;
            }
            eps = (self.precision * (x3.abs() + x4.abs())).max(TOL2);
        }
        if x1 == left {
            self.fd(left)
        } else if x2 == right {
            self.fd(right)
        } else {
            self.fd((x1 + x2) / 2.0)
        }
    }

    pub fn area(&mut self, left: f64, right: f64) -> Result<f64, MathError> {
        self.quadrature(left, right, false)
    }

    pub fn integral(&mut self, left: f64, right: f64) -> Result<f64, MathError> {
        self.quadrature(left, right, true)
    }

    fn quadrature(&mut self, left: f64, right: f64, tanh_sinh: bool) -> Result<f64, MathError> {
        let (mut l, mut r, mut k) = (left, right, 1.0);
        if l > r {
            std::mem::swap(&mut l, &mut r);
            k = -1.0;
        }
        let area = if r - l <= 1e-14 * (l.abs() + r.abs()) {
            (r - l) * self.fd((l + r) / 2.0)? * k
        } else if tanh_sinh {
            self.tanh_sinh(l, r)? * k
        } else {
            self.adaptive_lobatto(l, r)? * k
        };
        let u = match &self.var_units {
            Some(u) => u.clone(),
            None => return Ok(area),
        };
        match self.units.clone() {
            None => {
                self.units = Some(u);
                Ok(area)
            },
            Some(fu) => {
                let (factor, unit) = fu.multiply(&u);
                self.units = as_units(unit);
                Ok(area * factor)
            },
        }
    }

    fn adaptive_lobatto(&mut self, left: f64, right: f64) -> Result<f64, MathError> {
        let mut eps = self.precision.clamp(1e-14, 1e-4) / 2.0;
        let (y1, y3) = (self.fd(left)?, self.fd(right)?);
        self.lobatto(left, right, y1, y3, 1, &mut eps)
    }

    fn lobatto(&mut self, x1: f64, x3: f64, y1: f64, y3: f64, depth: u32, eps: &mut f64)
        -> Result<f64, MathError>
    {
        const K1: f64 = 1.0 / 1470.0;
        const K2: f64 = 1.0 / 6.0;
        let alpha = (2.0f64 / 3.0).sqrt();
        let beta = (1.0f64 / 5.0).sqrt();
        let h = (x3 - x1) / 2.0;
        let x2 = (x1 + x3) / 2.0;
        let (x4, x5, x6, x7) = (x2 - alpha * h, x2 - beta * h, x2 + beta * h, x2 + alpha * h);
        let y4 = self.fd(x4)?;
        let y5 = self.fd(x5)?;
        let y2 = self.fd(x2)?;
        let y6 = self.fd(x6)?;
        let y7 = self.fd(x7)?;
        let a1 = h * K1 * (77.0 * (y1 + y3) + 432.0 * (y4 + y7) + 625.0 * (y5 + y6) + 672.0 * y2);
        if depth == 1 {
            if a1.is_finite() && a1.abs() > 1.0 {
                *eps *= a1.abs();
            }
        } else {
            let a2 = h * K2 * (y1 + y3 + 5.0 * (y5 + y6));
            if (a1 - a2).abs() < *eps || depth > 15 {
                return Ok(a1);
            }
        }
        let depth = depth + 1;
        Ok(self.lobatto(x1, x4, y1, y4, depth, eps)?
            + self.lobatto(x4, x5, y4, y5, depth, eps)?
            + self.lobatto(x5, x2, y5, y2, depth, eps)?
            + self.lobatto(x2, x6, y2, y6, depth, eps)?
            + self.lobatto(x6, x7, y6, y7, depth, eps)?
            + self.lobatto(x7, x3, y7, y3, depth, eps)?)
    }

    fn tanh_sinh(&mut self, left: f64, right: f64) -> Result<f64, MathError> {
        let table = &*TANH_SINH;
        let c = (left + right) / 2.0;
        let d = (right - left) / 2.0;
        let mut s = self.fd(c)?;
        let eps = (self.precision * 0.1).clamp(1e-15, 1e-8);
        let tol = 10.0 * self.precision;
        let mut err;
        let mut i = 0;
        loop {
            let (mut p, mut fp, mut fm) = (0.0, 0.0, 0.0);
            let mut j = 0;
            loop {
                let x = table.r[i][j] * d;
                if left + x > left {
                    if let Some(y) = self.probe(left + x)? {
                        fp = y;
                    }
                }
                if right - x < right {
                    if let Some(y) = self.probe(right - x)? {
                        fm = y;
                    }
                }
                let q = table.w[i][j] * (fp + fm);
                p += q;
                j += 1;
                if q.abs() <= eps * p.abs() || j >= TANH_SINH_NODES[i] {
                    break;
                }
            }
            err = 2.0 * s;
            s += p;
            err = (err - s).abs();
            i += 1;
            log::trace!("tanh-sinh level {}: s = {}, err = {}", i, s, err);
            if err <= tol * s.abs() || i >= TANH_SINH_DEPTH {
                break;
            }
        }
        if s.abs() > 1.0 {
            err /= s.abs();
        }
        if err > 10.0 * tol {
            return Ok(f64::NAN);
        }
        Ok(d * s * 2f64.powi(1 - i as i32))
    }

    /// Richardson extrapolation on a two node stencil.
    pub fn slope(&mut self, x: f64) -> Result<f64, MathError> {
        const N: usize = 7;
        let delta = self.precision.sqrt().min(1e-3);
        let max_err = (50.0 * self.precision).max(1e-3);
        let a = if x.abs() < 1.0 { 1.0 } else { x };
        let eps = (next_up(a) - a).abs().cbrt();
        let mut h = 2f64.powi(N as i32) * eps;
        let mut h2 = 2.0 * h;
        let mut r = [0.0; N];
        let mut err = delta / 2.0;
        for i in 0..N {
            let x1 = x - h;
            let x2 = x1 + h2;
            let r0 = r[0];
            r[i] = (self.fd(x2)? - self.fd(x1)?) / h2;
            let mut d = 1.0;
            for k in (0..i).rev() {
                d *= 4.0;
                r[k] = r[k + 1] + (r[k + 1] - r[k]) / (d - 1.0);
            }
            if i >= 1 {
                err = if r[0].abs() <= delta {
                    (r[0] - r0).abs()
                } else {
                    ((r[0] - r0) / r[0]).abs()
                };
                if err < delta {
                    break;
                }
            }
            h2 = h;
            h = h2 / 2.0;
        }
        let slope = if err > max_err { f64::NAN } else { r[0] };
        let u = match &self.var_units {
            Some(u) => u.clone(),
            None => return Ok(slope),
        };
        match self.units.clone() {
            None => {
                self.units = Some(Arc::new(u.pow(-1.0)));
                Ok(slope)
            },
            Some(fu) => {
                let (factor, unit) = fu.divide(&u);
                self.units = as_units(unit);
                Ok(slope * factor)
            },
        }
    }

    /// Evaluates the objective for every integer in range and keeps the last.
    pub fn repeat(&mut self, start: f64, end: f64) -> Result<Value, MathError> {
        let (n1, n2) = bounds(start, end)?;
        let mut result = Value::nan();
        for i in n1..=n2 {
            result = self.fi(i as f64)?;
            if result.re().is_infinite() {
                break;
            }
        }
        Ok(result)
    }

    /// Kahan summation over the integers in range.
    pub fn sum(&mut self, start: f64, end: f64) -> Result<f64, MathError> {
        let (n1, n2) = bounds(start, end)?;
        let mut sum = self.fd(n1 as f64)?;
        let units = self.units.clone();
        let mut c = 0.0;
        for i in n1 + 1..=n2 {
            let d = self.fd(i as f64)? * self.conversion(&units)?;
            let y = d - c;
            let t = sum + y;
            c = (t - sum) - y;
            sum = t;
            if sum.is_infinite() {
                break;
            }
        }
        self.units = units;
        Ok(sum)
    }

    pub fn product(&mut self, start: f64, end: f64) -> Result<f64, MathError> {
        let (n1, n2) = bounds(start, end)?;
        let mut number = self.fd(n1 as f64)?;
        let mut units = self.units.clone();
        let has_units = units.is_some();
        for i in n1 + 1..=n2 {
            number *= self.fd(i as f64)?;
            number *= self.combine(has_units, &mut units);
            if number.is_infinite() {
                break;
            }
        }
        self.units = units;
        Ok(number)
    }

    pub fn complex_repeat(&mut self, start: f64, end: f64) -> Result<Complex64, MathError> {
        let (n1, n2) = bounds(start, end)?;
        let mut number = Complex64::new(0.0, 0.0);
        for i in n1..=n2 {
            number = self.fc(i as f64)?;
            if is_infinite(number) {
                break;
            }
        }
        Ok(number)
    }

    pub fn complex_sum(&mut self, start: f64, end: f64) -> Result<Complex64, MathError> {
        let (n1, n2) = bounds(start, end)?;
        let mut sum = self.fc(n1 as f64)?;
        let units = self.units.clone();
        let mut c = Complex64::new(0.0, 0.0);
        for i in n1 + 1..=n2 {
            let d = self.fc(i as f64)? * self.conversion(&units)?;
            let y = d - c;
            let t = sum + y;
            c = (t - sum) - y;
            sum = t;
            if is_infinite(sum) {
                break;
            }
        }
        self.units = units;
        Ok(sum)
    }

    pub fn complex_product(&mut self, start: f64, end: f64) -> Result<Complex64, MathError> {
        let (n1, n2) = bounds(start, end)?;
        let mut number = self.fc(n1 as f64)?;
        let mut units = self.units.clone();
        let has_units = units.is_some();
        for i in n1 + 1..=n2 {
            number *= self.fc(i as f64)?;
            number *= self.combine(has_units, &mut units);
            if is_infinite(number) {
                break;
            }
        }
        self.units = units;
        Ok(number)
    }

    // factor taking the last result into the units of the first term
    fn conversion(&self, units: &Option<Arc<Unit>>) -> Result<f64, MathError> {
        match (units, &self.units) {
            (None, None) => Ok(1.0),
            (Some(a), Some(b)) if a.is_consistent(b) => Ok(b.convert_to(a)),
            (a, b) => Err(MathError::InconsistentUnits(
                unidades::text_of(a.as_deref()), unidades::text_of(b.as_deref()))),
        }
    }

    fn combine(&self, has_units: bool, units: &mut Option<Arc<Unit>>) -> f64 {
        match (has_units, units.as_ref(), &self.units) {
            (true, Some(acc), Some(u)) => {
                let (factor, unit) = acc.multiply(u);
                *units = as_units(unit);
                factor
            },
            _ => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tanh_sinh_table() {
        let table = &*TANH_SINH;
        assert_eq!(table.r.len(), TANH_SINH_DEPTH);
        assert_eq!(table.w[10].len(), 3385);
        // abscissas run from the middle of the interval towards its ends
        assert!(table.r[0][0] > table.r[0][5]);
        assert!(table.r.iter().flatten().all(|r| (0.0..=1.0).contains(r)));
    }

    #[test]
    fn iteration_bounds() {
        assert_eq!(bounds(0.5, 2.5), Ok((1, 3)));
        assert_eq!(bounds(-1.5, 1.4), Ok((-2, 1)));
        assert!(matches!(bounds(0.0, 1e9), Err(MathError::IterationLimits(_, _))));
    }
}
