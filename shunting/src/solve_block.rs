use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use num_complex::Complex64;

use crate::compiler::{self, Compiled};
use crate::context::MathContext;
use crate::function::bind_parameters;
use crate::solver::Solver;
use crate::token::{RPNExpr, TokenKind};
use crate::value::Value;
use crate::variable::{Invalidate, Subscriber, VarRef, Variable};
use crate::MathError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverKind {
    Find,
    Root,
    Sup,
    Inf,
    Area,
    Integral,
    Slope,
    Repeat,
    Sum,
    Product,
}

impl SolverKind {
    pub fn from_keyword(keyword: &str) -> Option<SolverKind> {
        Some(match keyword.to_lowercase().as_str() {
            "find" => SolverKind::Find,
            "root" => SolverKind::Root,
            "sup" => SolverKind::Sup,
            "inf" => SolverKind::Inf,
            "area" => SolverKind::Area,
            "integral" => SolverKind::Integral,
            "slope" => SolverKind::Slope,
            "repeat" => SolverKind::Repeat,
            "sum" => SolverKind::Sum,
            "product" => SolverKind::Product,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            SolverKind::Find => "$Find",
            SolverKind::Root => "$Root",
            SolverKind::Sup => "$Sup",
            SolverKind::Inf => "$Inf",
            SolverKind::Area => "$Area",
            SolverKind::Integral => "$Integral",
            SolverKind::Slope => "$Slope",
            SolverKind::Repeat => "$Repeat",
            SolverKind::Sum => "$Sum",
            SolverKind::Product => "$Product",
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            SolverKind::Area | SolverKind::Integral => "∫",
            SolverKind::Sum => "∑",
            SolverKind::Product => "∏",
            other => other.name(),
        }
    }

    fn segments(self) -> usize {
        match self {
            SolverKind::Slope => 3,
            _ => 4,
        }
    }
}

struct Item {
    text: String,
    rpn: RPNExpr,
}

/// Closures built on the first calculation.
struct Program {
    objective: Compiled,
    lower: Compiled,
    upper: Option<Compiled>,
    target: Option<Compiled>,
}

/// An inline numerical method: `$find{f(x) @ x = a : b}` and friends.
/// Items are the objective, the variable, the bounds and, for `$root`, the
/// right hand side.
pub struct SolveBlock {
    kind: SolverKind,
    items: RefCell<Vec<Item>>,
    target: RefCell<Option<Item>>,
    variable: String,
    param: VarRef,
    extremum: Option<VarRef>,
    program: RefCell<Option<Rc<Program>>>,
    subscribers: RefCell<Vec<Subscriber>>,
}

const DELIMITERS: [char; 4] = ['@', '@', '=', ':'];

/// Cuts the script at `@`, then `=` or `:`, then `:` outside nested blocks.
fn split(script: &str, max: usize) -> Vec<String> {
    let mut items = Vec::with_capacity(max);
    let mut depth = 0;
    let mut start = 0;
    for (i, c) in script.char_indices() {
        let expected = match items.len() {
            0 => c == '@',
            1 => c == '=' || c == ':',
            n if n + 1 < max => c == ':',
            _ => false,
        };
        match c {
            '{' => depth += 1,
            '}' => depth -= 1,
            _ if depth == 0 && expected => {
                items.push(script[start..i].trim().to_string());
                start = i + c.len_utf8();
            },
            _ => (),
        }
    }
    items.push(script[start..].trim().to_string());
    items
}

// splits `f(x) = y` at top level
fn split_equation(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let (mut depth, mut start) = (0, 0);
    for (i, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth -= 1,
            '=' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            },
            _ => (),
        }
    }
    parts.push(&text[start..]);
    parts
}

impl SolveBlock {
    /// Parses the script of a block, registers it in the session and
    /// returns its index.
    pub(crate) fn create(cx: &MathContext, kind: SolverKind, script: &str) -> Result<usize, MathError> {
        let _guard = cx.enter_solver();
        let count = kind.segments();
        let max = if kind == SolverKind::Root { count + 1 } else { count };
        let mut texts = split(script, max);
        if texts.len() < count {
            return Err(MathError::MissingDelimiter(DELIMITERS[texts.len()], script.to_string()));
        }
        if let Some(i) = texts.iter().position(|t| t.is_empty()) {
            return Err(MathError::MissingDelimiter(DELIMITERS[i], script.to_string()));
        }

        let mut target = texts.get(count).cloned();
        if kind == SolverKind::Root {
            let parts = split_equation(&texts[0]);
            if parts.len() > 2 || parts.len() == 2 && target.is_some() {
                return Err(MathError::MultipleAssignments(texts[0].clone()));
            }
            if let [lhs, rhs] = parts.as_slice() {
                target = Some(rhs.trim().to_string());
                texts[0] = lhs.trim().to_string();
            }
        }

        let mut items = Vec::with_capacity(count);
        for (i, text) in texts.into_iter().take(count).enumerate() {
            let allow_assignment = i == 0 && kind == SolverKind::Repeat;
            let rpn = cx.parse_statement(&text, allow_assignment)?.rpn;
            items.push(Item{text, rpn});
        }
        let target = match target {
            Some(text) if !text.is_empty() => {
                let rpn = cx.parse_statement(&text, false)?.rpn;
                Some(Item{text, rpn})
            },
            _ => None,
        };

        let variable = match items[1].rpn.0.as_slice() {
            [t] if t.kind == TokenKind::Variable => t.content.clone(),
            _ => return Err(MathError::InvalidSolverVariable(items[1].text.clone())),
        };
        let param = Variable::new(Value::default());
        let names = [variable.clone()];
        let vars = [param.clone()];
        bind_parameters(cx, &mut items[0].rpn, &names, &vars);
        let mut target = target;
        if let Some(t) = target.as_mut() {
            bind_parameters(cx, &mut t.rpn, &names, &vars);
        }

        let extremum = match kind {
            SolverKind::Sup | SolverKind::Inf => {
                let suffix = if kind == SolverKind::Sup { "sup" } else { "inf" };
                let var = cx.variable(&format!("{}_{}", variable, suffix));
                cx.assign(&var, Value::nan());
                Some(var)
            },
            _ => None,
        };

        let block = Rc::new(SolveBlock{
            kind,
            items: RefCell::new(items),
            target: RefCell::new(target),
            variable,
            param,
            extremum,
            program: RefCell::new(None),
            subscribers: RefCell::new(Vec::new()),
        });
        let index = cx.add_solve_block(block.clone());
        block.subscribe_to_dependencies(cx, index);
        log::debug!("solve block #{}: {}", index, block);
        Ok(index)
    }

    pub fn kind(&self) -> SolverKind {
        self.kind
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub(crate) fn subscribe(&self, subscriber: Subscriber) {
        let mut subscribers = self.subscribers.borrow_mut();
        if !subscribers.contains(&subscriber) {
            subscribers.push(subscriber);
        }
    }

    fn subscribe_to_dependencies(&self, cx: &MathContext, index: usize) {
        let me = Subscriber::SolveBlock(index);
        let items = self.items.borrow();
        let target = self.target.borrow();
        for t in items.iter().chain(target.iter()).flat_map(|item| item.rpn.0.iter()) {
            match t.kind {
                TokenKind::Variable => {
                    if let Some(var) = &t.var {
                        if !Rc::ptr_eq(var, &self.param) {
                            var.borrow_mut().subscribe(me);
                        }
                    }
                },
                TokenKind::CustomFunction if t.index >= 0 => {
                    if let Some(f) = cx.functions.get(t.index as usize) {
                        f.subscribe(me);
                    }
                },
                TokenKind::Solver => {
                    if let Some(block) = cx.solve_block(t.index as usize) {
                        block.subscribe(me);
                    }
                },
                _ => (),
            }
        }
    }

    /// Rebinds the parameters of an enclosing function, except the one the
    /// block iterates over.
    pub(crate) fn bind_parameters(&self, cx: &MathContext, names: &[String], vars: &[VarRef]) {
        let (names, vars): (Vec<String>, Vec<VarRef>) = names.iter().zip(vars)
            .filter(|(n, _)| **n != self.variable)
            .map(|(n, v)| (n.clone(), v.clone()))
            .unzip();
        for (i, item) in self.items.borrow_mut().iter_mut().enumerate() {
            if i != 1 {
                bind_parameters(cx, &mut item.rpn, &names, &vars);
            }
        }
        if let Some(t) = self.target.borrow_mut().as_mut() {
            bind_parameters(cx, &mut t.rpn, &names, &vars);
        }
        self.program.borrow_mut().take();
    }

    /// Custom functions called from this block or blocks nested in it.
    pub(crate) fn function_refs(&self, cx: &MathContext) -> Vec<usize> {
        let mut refs = Vec::new();
        let items = self.items.borrow();
        let target = self.target.borrow();
        for t in items.iter().chain(target.iter()).flat_map(|item| item.rpn.0.iter()) {
            match t.kind {
                TokenKind::CustomFunction if t.index >= 0 => refs.push(t.index as usize),
                TokenKind::Solver => {
                    if let Some(block) = cx.solve_block(t.index as usize) {
                        refs.extend(block.function_refs(cx));
                    }
                },
                _ => (),
            }
        }
        refs
    }

    fn program(&self, cx: &MathContext) -> Result<Rc<Program>, MathError> {
        if let Some(p) = self.program.borrow().clone() {
            return Ok(p);
        }
        let items = self.items.borrow();
        let target = self.target.borrow();
        let program = Rc::new(Program{
            objective: compiler::compile(cx, &items[0].rpn)?,
            lower: compiler::compile(cx, &items[2].rpn)?,
            upper: match items.get(3) {
                Some(item) => Some(compiler::compile(cx, &item.rpn)?),
                None => None,
            },
            target: match target.as_ref() {
                Some(item) => Some(compiler::compile(cx, &item.rpn)?),
                None => None,
            },
        });
        log::debug!("compiled {}", self);
        *self.program.borrow_mut() = Some(program.clone());
        Ok(program)
    }

    fn set_param(&self, value: &Value) {
        let mut var = self.param.borrow_mut();
        var.value = Value::new(Complex64::new(value.re(), 0.0), value.unit.clone());
        var.initialized = true;
    }

    fn item_text(&self, i: usize) -> String {
        self.items.borrow().get(i).map(|item| item.text.clone()).unwrap_or_default()
    }

    pub(crate) fn calculate(&self, cx: &MathContext) -> Result<Value, MathError> {
        cx.check_cancel()?;
        let p = self.program(cx)?;
        let x1 = (p.lower)(cx)?;
        let x2 = match &p.upper {
            Some(upper) => {
                let x2 = upper(cx)?;
                let k = unidades::convert(x1.unit_ref(), x2.unit_ref(), ':')
                    .map_err(|_| MathError::InconsistentUnits2(
                        self.item_text(0), self.item_text(2), self.item_text(3)))?;
                Value::new(x2.num * k, x1.unit.clone())
            },
            None => x1.clone(),
        };
        self.set_param(&x1);

        let mut y = 0.0;
        if let (SolverKind::Root, Some(target)) = (self.kind, &p.target) {
            let uy = (p.objective)(cx)?.unit;
            let y1 = target(cx)?;
            self.set_param(&x2);
            let y2 = target(cx)?;
            self.set_param(&x1);
            let text = self.target.borrow().as_ref().map(|t| t.text.clone()).unwrap_or_default();
            if (y1.re() - y2.re()).abs() > 1e-14 {
                return Err(MathError::NotConstantExpression(text));
            }
            let k = unidades::convert(uy.as_deref(), y1.unit_ref(), '=')
                .map_err(|_| MathError::InconsistentUnits1(self.item_text(0), text))?;
            y = y1.re() * k;
        }

        let mut solver = Solver::new(cx, p.objective.clone(), self.param.clone());
        let (a, b) = (x1.re(), x2.re());
        let complex = cx.is_complex();
        let real = |x: Result<f64, MathError>| x.map(|x| Complex64::new(x, 0.0));
        let num = match self.kind {
            SolverKind::Find => real(solver.find(a, b)),
            SolverKind::Root => real(solver.root(a, b, y)),
            SolverKind::Sup => real(solver.sup(a, b)),
            SolverKind::Inf => real(solver.inf(a, b)),
            SolverKind::Area => real(solver.area(a, b)),
            SolverKind::Integral => real(solver.integral(a, b)),
            SolverKind::Slope => real(solver.slope(a)),
            SolverKind::Repeat if complex => solver.complex_repeat(a, b),
            SolverKind::Repeat => solver.repeat(a, b).map(|v| v.num),
            SolverKind::Sum if complex => solver.complex_sum(a, b),
            SolverKind::Sum => real(solver.sum(a, b)),
            SolverKind::Product if complex => solver.complex_product(a, b),
            SolverKind::Product => real(solver.product(a, b)),
        }
        .map_err(|e| e.with_placeholders(&self.item_text(0), &self.variable))?;

        if let Some(var) = &self.extremum {
            let x = self.param.borrow().value.clone();
            cx.assign(var, x);
        }
        if num.re.is_nan() && !cx.is_plotting() {
            return Err(MathError::NoSolution(self.to_string()));
        }
        log::trace!("{} = {}", self, num);
        Ok(Value::new(num, solver.units.clone()))
    }
}

impl Invalidate for SolveBlock {
    fn invalidate(&self) {
        self.program.borrow_mut().take();
    }

    fn subscribers(&self) -> Vec<Subscriber> {
        self.subscribers.borrow().clone()
    }
}

impl fmt::Display for SolveBlock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let items = self.items.borrow();
        let text = |i: usize| items.get(i).map_or(String::new(), |item| item.rpn.to_string());
        let (objective, var) = (text(0), &self.variable);
        match self.kind {
            SolverKind::Slope => write!(f, "$Slope{{{}; {} = {}}}", objective, var, text(2)),
            SolverKind::Root => {
                let target = self.target.borrow();
                let rhs = target.as_ref().map_or("0".to_string(), |t| t.rpn.to_string());
                write!(f, "$Root{{{} = {}; {} ∈ [{}; {}]}}", objective, rhs, var, text(2), text(3))
            },
            kind => write!(f, "{}{{{}; {} ∈ [{}; {}]}}", kind.symbol(), objective, var, text(2), text(3)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_script() {
        assert_eq!(split("x^2 - 4 @ x = 0 : 10", 4), vec!["x^2 - 4", "x", "0", "10"]);
        assert_eq!(split("x^2@x:0:10", 4), vec!["x^2", "x", "0", "10"]);
        assert_eq!(split("x@x:1", 3), vec!["x", "x", "1"]);
        // nested blocks keep their delimiters
        assert_eq!(split("$sum{k@k:1:x}@x:0:1", 4), vec!["$sum{k@k:1:x}", "x", "0", "1"]);
        assert_eq!(split("x@x:0:1:2", 5), vec!["x", "x", "0", "1", "2"]);
        assert_eq!(split("x^2", 4), vec!["x^2"]);
    }

    #[test]
    fn split_root_equation() {
        assert_eq!(split_equation("x^2 = 4"), vec!["x^2 ", " 4"]);
        assert_eq!(split_equation("$find{x = 1}"), vec!["$find{x = 1}"]);
    }

    #[test]
    fn keywords() {
        assert_eq!(SolverKind::from_keyword("Find"), Some(SolverKind::Find));
        assert_eq!(SolverKind::from_keyword("integral"), Some(SolverKind::Integral));
        assert_eq!(SolverKind::from_keyword("solve"), None);
        assert_eq!(SolverKind::Sum.symbol(), "∑");
    }
}
