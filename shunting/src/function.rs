use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;

use unidades::Unit;

use crate::compiler::{self, Compiled};
use crate::context::MathContext;
use crate::parser::ShuntingParser;
use crate::token::{RPNExpr, Token, TokenKind};
use crate::value::{apply_units, Value};
use crate::variable::{Invalidate, Subscriber, VarRef, Variable};
use crate::MathError;

pub const MAX_CACHE_SIZE: usize = 1000;

/// Hashable image of an argument: the bits of the number plus its units.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ArgKey(u64, u64, Option<String>);

impl From<&Value> for ArgKey {
    fn from(v: &Value) -> ArgKey {
        ArgKey(v.re().to_bits(), v.im().to_bits(), v.unit.as_ref().map(|u| u.text().to_string()))
    }
}

enum Cache {
    One(HashMap<ArgKey, Value>),
    Two(HashMap<(ArgKey, ArgKey), Value>),
    Off,
}

impl Cache {
    fn new(params: usize) -> Cache {
        match params {
            1 => Cache::One(HashMap::new()),
            2 => Cache::Two(HashMap::new()),
            _ => Cache::Off,
        }
    }

    fn get(&self, args: &[Value]) -> Option<Value> {
        match (self, args) {
            (Cache::One(map), [a]) => map.get(&ArgKey::from(a)).cloned(),
            (Cache::Two(map), [a, b]) => map.get(&(ArgKey::from(a), ArgKey::from(b))).cloned(),
            _ => None,
        }
    }

    fn insert(&mut self, args: &[Value], value: Value) {
        match (self, args) {
            (Cache::One(map), [a]) => { map.insert(a.into(), value); },
            (Cache::Two(map), [a, b]) => { map.insert((a.into(), b.into()), value); },
            _ => (),
        }
    }

    fn len(&self) -> usize {
        match self {
            Cache::One(map) => map.len(),
            Cache::Two(map) => map.len(),
            Cache::Off => 0,
        }
    }

    fn clear(&mut self) {
        match self {
            Cache::One(map) => map.clear(),
            Cache::Two(map) => map.clear(),
            Cache::Off => (),
        }
    }
}

/// Cache counters of one custom function.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FunctionStats {
    pub hits: u64,
    pub misses: u64,
    pub cached: usize,
}

pub struct CustomFunction {
    pub name: String,
    params: Vec<String>,
    param_vars: Vec<VarRef>,
    rpn: RPNExpr,
    units: Option<Arc<Unit>>,
    function: RefCell<Option<Compiled>>,
    cache: RefCell<Cache>,
    is_recursion: Cell<bool>,
    subscribers: RefCell<Vec<Subscriber>>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl CustomFunction {
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn body(&self) -> &RPNExpr {
        &self.rpn
    }

    pub fn is_recursion(&self) -> bool {
        self.is_recursion.get()
    }

    pub fn stats(&self) -> FunctionStats {
        FunctionStats{
            hits: self.hits.get(),
            misses: self.misses.get(),
            cached: self.cache.borrow().len(),
        }
    }

    pub(crate) fn subscribe(&self, subscriber: Subscriber) {
        let mut subscribers = self.subscribers.borrow_mut();
        if !subscribers.contains(&subscriber) {
            subscribers.push(subscriber);
        }
    }

    /// Clears the cache once it reached its capacity.
    pub(crate) fn purge_cache(&self) {
        let mut cache = self.cache.borrow_mut();
        if cache.len() >= MAX_CACHE_SIZE {
            log::warn!("cache of {} reached {} entries, clearing it", self.name, cache.len());
            cache.clear();
        }
    }

    fn compiled(&self, cx: &MathContext) -> Result<Compiled, MathError> {
        if let Some(f) = self.function.borrow().clone() {
            return Ok(f);
        }
        let f = compiler::compile(cx, &self.rpn)?;
        log::debug!("compiled {}({})", self.name, self.params.join("; "));
        *self.function.borrow_mut() = Some(f.clone());
        Ok(f)
    }

    pub(crate) fn call(&self, cx: &MathContext, args: &[Value]) -> Result<Value, MathError> {
        if self.is_recursion.get() {
            return Ok(Value::nan());
        }
        cx.check_cancel()?;
        if args.len() != self.params.len() {
            return Err(MathError::InvalidNumberOfArguments);
        }
        if let Some(v) = self.cache.borrow().get(args) {
            self.hits.set(self.hits.get() + 1);
            log::trace!("cache hit for {}", self.name);
            return Ok(v);
        }
        self.misses.set(self.misses.get() + 1);
        for (var, arg) in self.param_vars.iter().zip(args) {
            let mut var = var.borrow_mut();
            var.value = arg.clone();
            var.initialized = true;
        }
        let f = self.compiled(cx)?;
        let result = apply_units(f(cx)?, self.units.as_ref())?;
        self.purge_cache();
        self.cache.borrow_mut().insert(args, result.clone());
        Ok(result)
    }

    /// Indices of the custom functions this one calls, directly or from
    /// inside its solve blocks.
    fn references(&self, cx: &MathContext) -> Vec<usize> {
        let mut refs = Vec::new();
        for t in &self.rpn.0 {
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
}

impl Invalidate for CustomFunction {
    fn invalidate(&self) {
        self.cache.borrow_mut().clear();
        self.function.borrow_mut().take();
    }

    fn subscribers(&self) -> Vec<Subscriber> {
        self.subscribers.borrow().clone()
    }
}

/// Points the variables named like the parameters at the parameter cells,
/// inside nested solve blocks too.
pub(crate) fn bind_parameters(cx: &MathContext, rpn: &mut RPNExpr, names: &[String], vars: &[VarRef]) {
    for t in rpn.0.iter_mut() {
        match t.kind {
            TokenKind::Variable => {
                if let Some(i) = names.iter().position(|n| *n == t.content) {
                    t.var = Some(vars[i].clone());
                }
            },
            TokenKind::Solver => {
                if let Some(block) = cx.solve_block(t.index as usize) {
                    block.bind_parameters(cx, names, vars);
                }
            },
            _ => (),
        }
    }
}

/// Splits `f(x; y) = body` into the name, the parameters and the body.
fn parse_header(tokens: Vec<Token>) -> Result<(String, Vec<String>, Vec<Token>), MathError> {
    let mut it = tokens.into_iter();
    let name = match it.next() {
        Some(t) if t.kind == TokenKind::CustomFunction => t.content,
        _ => return Err(MathError::InvalidFunctionDefinition),
    };
    match it.next() {
        Some(t) if t.kind == TokenKind::BracketLeft => (),
        _ => return Err(MathError::InvalidFunctionDefinition),
    }
    let mut params = Vec::new();
    let mut expect_param = true;
    loop {
        let t = it.next().ok_or(MathError::InvalidFunctionDefinition)?;
        match t.kind {
            TokenKind::Variable | TokenKind::Unit if expect_param => {
                if params.contains(&t.content) {
                    return Err(MathError::InvalidFunctionToken(t.content));
                }
                params.push(t.content);
                expect_param = false;
            },
            TokenKind::Divisor | TokenKind::BracketRight if expect_param => {
                return Err(MathError::MissingFunctionParameter);
            },
            TokenKind::Divisor => expect_param = true,
            TokenKind::BracketRight => break,
            _ if expect_param => return Err(MathError::InvalidFunctionToken(t.content)),
            _ => return Err(MathError::MissingFunctionDelimiter),
        }
    }
    match it.next() {
        Some(t) if t.is_assignment() => (),
        _ => return Err(MathError::InvalidFunctionDefinition),
    }
    Ok((name, params, it.collect()))
}

#[derive(Default)]
pub struct FunctionRegistry {
    functions: RefCell<Vec<Rc<CustomFunction>>>,
    names: RefCell<HashMap<String, usize>>,
}

impl FunctionRegistry {
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.borrow().get(name).copied()
    }

    pub fn get(&self, index: usize) -> Option<Rc<CustomFunction>> {
        self.functions.borrow().get(index).cloned()
    }

    pub fn by_name(&self, name: &str) -> Option<Rc<CustomFunction>> {
        self.index_of(name).and_then(|i| self.get(i))
    }

    pub fn param_count(&self, index: usize) -> usize {
        self.get(index).map_or(0, |f| f.param_count())
    }

    pub fn len(&self) -> usize {
        self.functions.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn clear(&self) {
        self.names.borrow_mut().clear();
        self.functions.borrow_mut().clear();
    }

    pub(crate) fn purge_caches(&self) {
        for f in self.functions.borrow().iter() {
            f.purge_cache();
        }
    }

    /// Registers the function defined by `tokens`, replacing an earlier
    /// definition with the same name and number of parameters.
    pub(crate) fn define(&self, cx: &MathContext, tokens: Vec<Token>, units: Option<Arc<Unit>>)
        -> Result<usize, MathError>
    {
        let (name, params, body) = parse_header(tokens)?;
        let mut rpn = ShuntingParser::parse(body)?;
        if rpn.is_empty() {
            return Err(MathError::IncompleteExpression);
        }
        let param_vars: Vec<VarRef> = params.iter().map(|_| Variable::new(Value::default())).collect();
        bind_parameters(cx, &mut rpn, &params, &param_vars);

        let function = Rc::new(CustomFunction{
            name: name.clone(),
            cache: RefCell::new(Cache::new(params.len())),
            params,
            param_vars,
            rpn,
            units,
            function: RefCell::new(None),
            is_recursion: Cell::new(false),
            subscribers: RefCell::new(Vec::new()),
            hits: Cell::new(0),
            misses: Cell::new(0),
        });

        let existing = self.index_of(&name).and_then(|i| self.get(i).map(|f| (i, f)));
        let (index, notify) = match existing {
            Some((i, old)) if old.param_count() == function.param_count() => {
                *function.subscribers.borrow_mut() = old.subscribers();
                self.functions.borrow_mut()[i] = function.clone();
                (i, old.subscribers())
            },
            _ => {
                let mut functions = self.functions.borrow_mut();
                functions.push(function.clone());
                let i = functions.len() - 1;
                self.names.borrow_mut().insert(name.clone(), i);
                (i, Vec::new())
            },
        };
        log::debug!("defined {}({}) as #{}", name, function.params.join("; "), index);

        if self.reaches(cx, index, index, &mut HashSet::new()) {
            function.is_recursion.set(true);
            cx.notify(notify);
            return Err(MathError::CircularReference(name));
        }

        for t in &function.rpn.0 {
            match t.kind {
                TokenKind::Variable => {
                    let is_param = function.params.contains(&t.content);
                    if let (false, Some(var)) = (is_param, &t.var) {
                        var.borrow_mut().subscribe(Subscriber::Function(index));
                    }
                },
                TokenKind::CustomFunction if t.index >= 0 => {
                    if let Some(f) = self.get(t.index as usize) {
                        f.subscribe(Subscriber::Function(index));
                    }
                },
                TokenKind::Solver => {
                    if let Some(block) = cx.solve_block(t.index as usize) {
                        block.subscribe(Subscriber::Function(index));
                    }
                },
                _ => (),
            }
        }
        cx.notify(notify);
        Ok(index)
    }

    // depth first walk of the call graph looking for `origin`
    fn reaches(&self, cx: &MathContext, from: usize, origin: usize, visited: &mut HashSet<usize>) -> bool {
        let f = match self.get(from) {
            Some(f) => f,
            None => return false,
        };
        for next in f.references(cx) {
            if next == origin {
                return true;
            }
            if visited.insert(next) && self.reaches(cx, next, origin, visited) {
                return true;
            }
        }
        false
    }
}
