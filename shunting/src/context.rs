use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use unidades::{Unit, CUSTOM};

use crate::calculator::{Calculator, ComplexCalculator, RealCalculator};
use crate::compiler::{self, Compiled};
use crate::function::{bind_parameters, FunctionRegistry, FunctionStats};
use crate::lexer::Lexer;
use crate::parser::ShuntingParser;
use crate::rpneval::Evaluator;
use crate::settings::Settings;
use crate::solve_block::SolveBlock;
use crate::token::RPNExpr;
use crate::validator;
use crate::value::{apply_units, Value};
use crate::variable::{Invalidate, Subscriber, VarRef, Variable};
use crate::MathError;

const DEFAULT_PRECISION: f64 = 1e-14;

type InputProvider = Box<dyn FnMut() -> Option<String>>;

/// A parsed statement ready to be evaluated.
#[derive(Clone, Debug)]
pub struct Statement {
    pub rpn: RPNExpr,
    pub target: Option<Arc<Unit>>,
    /// Index of the custom function this statement defined.
    pub function: Option<usize>,
    pub text: String,
}

impl Statement {
    pub fn is_function_definition(&self) -> bool {
        self.function.is_some()
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_function_definition() {
            return write!(f, "{}", self.text.trim());
        }
        write!(f, "{}", self.rpn)?;
        match &self.target {
            Some(unit) => write!(f, " | {}", unit),
            None => Ok(()),
        }
    }
}

/// Result of one evaluation plus what a renderer needs to substitute
/// variables in the echoed expression.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    pub value: Value,
    pub has_variables: bool,
    /// Value of the assigned variable before the assignment.
    pub previous: Option<Value>,
}

/// An expression compiled over named parameters, as used for plotting.
pub struct CompiledExpr {
    params: Vec<VarRef>,
    function: Compiled,
    target: Option<Arc<Unit>>,
}

impl CompiledExpr {
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub fn call(&self, cx: &MathContext, args: &[Value]) -> Result<Value, MathError> {
        if args.len() != self.params.len() {
            return Err(MathError::InvalidNumberOfArguments);
        }
        for (param, arg) in self.params.iter().zip(args) {
            let mut param = param.borrow_mut();
            param.value = arg.clone();
            param.initialized = true;
        }
        apply_units((self.function)(cx)?, self.target.as_ref())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlotSettings {
    pub width: f64,
    pub height: f64,
    pub step: f64,
}

/// Marks the session as parsing solve block items while alive.
pub(crate) struct SolverGuard<'a>(&'a Cell<usize>);

impl<'a> Drop for SolverGuard<'a> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

/// One calculation session: variables, session units, custom functions
/// and solve blocks, plus the calculator selected by the settings.
pub struct MathContext {
    pub settings: Settings,
    pub(crate) calc: Box<dyn Calculator>,
    variables: RefCell<HashMap<String, VarRef>>,
    units: RefCell<HashMap<String, Arc<Unit>>>,
    pub(crate) functions: FunctionRegistry,
    solve_blocks: RefCell<Vec<Rc<SolveBlock>>>,
    cancel: Arc<AtomicBool>,
    enabled: Cell<bool>,
    plotting: Cell<bool>,
    solver_depth: Cell<usize>,
    input: RefCell<Option<InputProvider>>,
}

impl Default for MathContext {
    fn default() -> Self {
        MathContext::with_settings(Settings::default())
    }
}

impl MathContext {
    pub fn new() -> MathContext {
        MathContext::default()
    }

    pub fn with_settings(settings: Settings) -> MathContext {
        let calc: Box<dyn Calculator> = if settings.complex {
            Box::new(ComplexCalculator::new(settings.angle))
        } else {
            Box::new(RealCalculator::new(settings.angle))
        };
        let cx = MathContext{
            settings,
            calc,
            variables: RefCell::new(HashMap::new()),
            units: RefCell::new(HashMap::new()),
            functions: FunctionRegistry::default(),
            solve_blocks: RefCell::new(Vec::new()),
            cancel: Arc::new(AtomicBool::new(false)),
            enabled: Cell::new(true),
            plotting: Cell::new(false),
            solver_depth: Cell::new(0),
            input: RefCell::new(None),
        };
        cx.init_variables();
        cx
    }

    fn init_variables(&self) {
        let (e, pi) = (std::f64::consts::E, std::f64::consts::PI);
        self.setvar("e", Value::real(e));
        self.setvar("pi", Value::real(pi));
        self.setvar("π", Value::real(pi));
        self.setvar("g", Value::real(9.80665));
        if self.settings.complex {
            self.setvar("i", Value::complex(0.0, 1.0));
            self.setvar("ei", Value::complex(0.0, e));
            self.setvar("πi", Value::complex(0.0, pi));
        }
    }

    /// Forgets variables, session units, custom functions and solve blocks.
    /// Settings, the cancel token and the input provider are kept.
    /// Statements parsed before the reset must be parsed again.
    pub fn clear(&self) {
        log::debug!("clearing session: {} functions, {} solve blocks",
                    self.functions.len(), self.solve_blocks.borrow().len());
        self.solve_blocks.borrow_mut().clear();
        self.functions.clear();
        self.units.borrow_mut().clear();
        self.variables.borrow_mut().clear();
        self.init_variables();
    }

    /// Lexes, validates and orders `text`. Function definitions are
    /// registered right away.
    pub fn parse(&self, text: &str) -> Result<Statement, MathError> {
        self.functions.purge_caches();
        self.parse_statement(text, true)
    }

    pub(crate) fn parse_statement(&self, text: &str, allow_assignment: bool) -> Result<Statement, MathError> {
        let lexed = Lexer::new(self, text, allow_assignment).tokenize()?;
        let mut tokens = lexed.tokens;
        if tokens.is_empty() {
            return Err(MathError::ExpressionEmpty);
        }
        let is_definition = validator::check(&mut tokens)?;
        if is_definition && self.in_solver() {
            return Err(MathError::FunctionDefinitionInSolver);
        }
        let resolve = |name: &str| self.unit(name);
        let resolver: Option<&dyn Fn(&str) -> Option<Arc<Unit>>> =
            if is_definition || self.in_solver() || self.is_plotting() { None } else { Some(&resolve) };
        ShuntingParser::order_operators(&mut tokens, lexed.assignment_index, resolver);

        if is_definition {
            let index = self.functions.define(self, tokens, lexed.target.clone())?;
            return Ok(Statement{
                rpn: RPNExpr::default(),
                target: lexed.target,
                function: Some(index),
                text: text.to_string(),
            });
        }
        Ok(Statement{
            rpn: ShuntingParser::parse(tokens)?,
            target: lexed.target,
            function: None,
            text: text.to_string(),
        })
    }

    /// Interprets a parsed statement. Definitions evaluate to NaN.
    pub fn eval(&self, statement: &Statement) -> Result<Evaluation, MathError> {
        if !self.enabled.get() {
            return Err(MathError::CalculationsNotActive);
        }
        if statement.is_function_definition() {
            return Ok(Evaluation{value: Value::nan(), has_variables: false, previous: None});
        }
        let return_angles = self.getvar("ReturnAngleUnits").map_or(false, |v| v.re() != 0.0);
        self.calc.set_return_angle_units(return_angles);
        let mut evaluator = Evaluator::new(self);
        let result = evaluator.run(&statement.rpn, statement.target.as_ref());
        if let Err(MathError::InterruptedByUser) = result {
            self.cancel.store(false, Ordering::Relaxed);
        }
        Ok(Evaluation{
            value: result?,
            has_variables: evaluator.has_variables,
            previous: evaluator.previous,
        })
    }

    pub fn evaluate(&self, text: &str) -> Result<Evaluation, MathError> {
        let statement = self.parse(text)?;
        self.eval(&statement)
    }

    pub fn calculate(&self, text: &str) -> Result<Value, MathError> {
        self.evaluate(text).map(|e| e.value)
    }

    pub fn calculate_real(&self, text: &str) -> Result<f64, MathError> {
        let value = self.calculate(text)?;
        if !value.is_real() {
            return Err(MathError::ResultNotReal(value.to_string()));
        }
        Ok(value.re())
    }

    /// Compiles `expr` into a closure over `params`, in plotting mode.
    pub fn compile(&self, expr: &str, params: &[&str]) -> Result<CompiledExpr, MathError> {
        let plotting = self.plotting.replace(true);
        let statement = self.parse_statement(expr, false);
        self.plotting.set(plotting);
        let statement = statement?;
        if statement.is_function_definition() {
            return Err(MathError::InvalidFunctionDefinition);
        }
        let names: Vec<String> = params.iter().map(|p| p.to_string()).collect();
        let vars: Vec<VarRef> = names.iter().map(|_| Variable::new(Value::default())).collect();
        let mut rpn = statement.rpn;
        bind_parameters(self, &mut rpn, &names, &vars);
        Ok(CompiledExpr{
            params: vars,
            function: compiler::compile(self, &rpn)?,
            target: statement.target,
        })
    }

    pub fn setvar(&self, name: &str, value: Value) {
        let var = self.variable(name);
        self.assign(&var, value);
    }

    pub fn getvar(&self, name: &str) -> Option<Value> {
        let variables = self.variables.borrow();
        let var = variables.get(name)?.borrow();
        if var.initialized { Some(var.value.clone()) } else { None }
    }

    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    pub fn set_plotting(&self, plotting: bool) {
        self.plotting.set(plotting);
    }

    pub fn set_input_provider(&self, provider: impl FnMut() -> Option<String> + 'static) {
        *self.input.borrow_mut() = Some(Box::new(provider));
    }

    pub fn function_stats(&self, name: &str) -> Option<FunctionStats> {
        self.functions.by_name(name).map(|f| f.stats())
    }

    pub fn plot_settings(&self) -> PlotSettings {
        let read = |name: &str, default: f64| self.getvar(name).map_or(default, |v| v.re());
        PlotSettings{
            width: read("PlotWidth", 500.0),
            height: read("PlotHeight", 300.0),
            step: read("PlotStep", 0.0),
        }
    }

    /// Renders a postfix expression, showing solve blocks in full.
    pub fn render(&self, rpn: &RPNExpr) -> String {
        let solver = |i: usize| self.solve_block(i).map(|b| b.to_string());
        rpn.infix_with(&solver).to_string()
    }

    pub(crate) fn variable(&self, name: &str) -> VarRef {
        self.variables.borrow_mut()
            .entry(name.to_string())
            .or_insert_with(Variable::undefined)
            .clone()
    }

    /// Session units shadow the registry.
    pub(crate) fn unit(&self, name: &str) -> Option<Arc<Unit>> {
        let custom = self.units.borrow().get(name).cloned();
        custom.or_else(|| unidades::lookup(name))
    }

    /// `€ = 1` creates a base unit, `£ = 1.17€` one derived from it.
    pub(crate) fn define_unit(&self, name: &str, value: &Value) -> Result<(), MathError> {
        if !value.is_real() {
            return Err(MathError::ResultNotReal(value.to_string()));
        }
        let unit = match value.unit_ref() {
            None => Unit::named(name, CUSTOM, value.re()),
            Some(u) => Unit::named(name, u.dimension(), u.factor() * value.re()),
        };
        log::debug!("defined unit {} = {}", name, value);
        let redefined = self.units.borrow_mut().insert(name.to_string(), Arc::new(unit)).is_some();
        if redefined {
            // compiled code may hold the old factor
            let functions = (0..self.functions.len()).map(Subscriber::Function);
            let blocks = (0..self.solve_blocks.borrow().len()).map(Subscriber::SolveBlock);
            self.notify(functions.chain(blocks).collect());
        }
        Ok(())
    }

    pub(crate) fn assign(&self, var: &VarRef, value: Value) {
        let subscribers = var.borrow_mut().assign(value);
        self.notify(subscribers);
    }

    /// Invalidates `subscribers` and everything that depends on them.
    pub(crate) fn notify(&self, subscribers: Vec<Subscriber>) {
        let mut visited = HashSet::new();
        let mut pending = subscribers;
        while let Some(s) = pending.pop() {
            if !visited.insert(s) {
                continue;
            }
            let target: Option<Rc<dyn Invalidate>> = match s {
                Subscriber::Function(i) => self.functions.get(i).map(|f| f as Rc<dyn Invalidate>),
                Subscriber::SolveBlock(i) => self.solve_block(i).map(|b| b as Rc<dyn Invalidate>),
            };
            if let Some(target) = target {
                log::debug!("invalidating {:?}", s);
                target.invalidate();
                pending.extend(target.subscribers());
            }
        }
    }

    pub(crate) fn check_cancel(&self) -> Result<(), MathError> {
        if self.cancel.load(Ordering::Relaxed) {
            Err(MathError::InterruptedByUser)
        } else {
            Ok(())
        }
    }

    pub(crate) fn precision(&self) -> f64 {
        self.getvar("Precision")
            .map_or(DEFAULT_PRECISION, |v| v.re())
            .clamp(1e-15, 1e-2)
    }

    pub(crate) fn is_complex(&self) -> bool {
        self.calc.is_complex()
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub(crate) fn is_plotting(&self) -> bool {
        self.plotting.get()
    }

    pub(crate) fn in_solver(&self) -> bool {
        self.solver_depth.get() > 0
    }

    pub(crate) fn enter_solver(&self) -> SolverGuard {
        self.solver_depth.set(self.solver_depth.get() + 1);
        SolverGuard(&self.solver_depth)
    }

    pub(crate) fn read_input(&self) -> Option<String> {
        self.input.borrow_mut().as_mut().and_then(|provider| provider())
    }

    pub(crate) fn call_function(&self, index: usize, args: &[Value]) -> Result<Value, MathError> {
        let function = self.functions.get(index)
            .ok_or_else(|| MathError::FunctionNotDefined(format!("#{}", index)))?;
        function.call(self, args)
    }

    pub(crate) fn add_solve_block(&self, block: Rc<SolveBlock>) -> usize {
        let mut blocks = self.solve_blocks.borrow_mut();
        blocks.push(block);
        blocks.len() - 1
    }

    pub(crate) fn solve_block(&self, index: usize) -> Option<Rc<SolveBlock>> {
        self.solve_blocks.borrow().get(index).cloned()
    }

    pub(crate) fn solve(&self, index: usize) -> Result<Value, MathError> {
        let block = self.solve_block(index)
            .ok_or_else(|| MathError::InvalidSolver(format!("#{}", index)))?;
        block.calculate(self)
    }
}
