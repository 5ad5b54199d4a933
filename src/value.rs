//! Runtime values.
//!
//! Scalars are held inline. Functions, classes and instances live behind
//! `Rc` so copies of a value alias the same object, which is what gives
//! callables and instances their identity.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::{FunctionDecl, LiteralValue};
use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::token::Token;

/// Host function signature. An `Err` becomes a runtime error at the call site.
pub type NativeFn = fn(&[Value]) -> std::result::Result<Value, String>;

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Number(f64),
    String(String),
    Bool(bool),
    Callable(Rc<Callable>),
    Instance(Rc<RefCell<Instance>>),
}

/// Anything that can appear on the left of `( args )`.
#[derive(Clone)]
pub struct Callable {
    pub name: String,
    pub arity: usize,
    pub kind: CallableKind,
}

#[derive(Clone)]
pub enum CallableKind {
    /// User function or method, closed over the environment active where it
    /// was declared (or, for bound methods, over the `this` scope).
    Function {
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    },

    Native(NativeFn),

    Class {
        methods: HashMap<String, Rc<Callable>>,
    },
}

/// An object created by calling a class.
pub struct Instance {
    pub class: Rc<Callable>,
    pub fields: HashMap<String, Value>,
}

impl Value {
    /// `nil` and `false` are falsey, everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }
}

impl From<&LiteralValue> for Value {
    fn from(literal: &LiteralValue) -> Self {
        match literal {
            LiteralValue::Number(n) => Value::Number(*n),
            LiteralValue::Str(s) => Value::String(s.clone()),
            LiteralValue::True => Value::Bool(true),
            LiteralValue::False => Value::Bool(false),
            LiteralValue::Nil => Value::Nil,
        }
    }
}

impl PartialEq for Value {
    /// Same variant and same payload; no coercion. Objects compare by
    /// identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Integral doubles print without a fractional part (`12.0` → `12`).
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 {
        format!("{:.0}", n)
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),

            Value::Number(n) => f.write_str(&format_number(*n)),

            Value::String(s) => write!(f, "{}", s),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Callable(callable) => write!(f, "{}", callable),

            Value::Instance(instance) => write!(f, "<{}>", instance.borrow().class.name),
        }
    }
}

impl Callable {
    pub fn function(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        Self {
            name: declaration.name.lexeme.clone(),
            arity: declaration.params.len(),
            kind: CallableKind::Function {
                declaration,
                closure,
                is_initializer,
            },
        }
    }

    pub fn native(name: &str, arity: usize, func: NativeFn) -> Self {
        Self {
            name: name.to_string(),
            arity,
            kind: CallableKind::Native(func),
        }
    }

    /// A class is called with the arguments of its `init`, if it has one.
    pub fn class(name: &str, methods: HashMap<String, Rc<Callable>>) -> Self {
        let arity: usize = methods.get("init").map_or(0, |init| init.arity);

        Self {
            name: name.to_string(),
            arity,
            kind: CallableKind::Class { methods },
        }
    }

    pub fn find_method(&self, name: &str) -> Option<&Rc<Callable>> {
        match &self.kind {
            CallableKind::Class { methods } => methods.get(name),
            _ => None,
        }
    }

    /// Produce a copy of this method whose closure is a fresh scope, child of
    /// the original closure, with `this` bound to `instance`.
    pub fn bind(&self, instance: Rc<RefCell<Instance>>) -> Callable {
        match &self.kind {
            CallableKind::Function {
                declaration,
                closure,
                is_initializer,
            } => {
                debug!("Binding method '{}'", self.name);

                let mut env: Environment = Environment::with_enclosing(Rc::clone(closure));
                env.define("this", Value::Instance(instance));

                Callable::function(
                    Rc::clone(declaration),
                    Rc::new(RefCell::new(env)),
                    *is_initializer,
                )
            }

            _ => self.clone(),
        }
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            CallableKind::Function { .. } => write!(f, "<fn {}>", self.name),
            CallableKind::Native(_) => write!(f, "<native fn {}>", self.name),
            CallableKind::Class { .. } => write!(f, "{}", self.name),
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

impl Instance {
    pub fn new(class: Rc<Callable>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }

    /// Field lookup falling through to the class's methods. Methods come back
    /// bound to `this`, freshly on every access.
    pub fn get(this: &Rc<RefCell<Instance>>, name: &Token) -> Result<Value> {
        if let Some(value) = this.borrow().fields.get(&name.lexeme) {
            return Ok(value.clone());
        }

        let class: Rc<Callable> = Rc::clone(&this.borrow().class);

        if let Some(method) = class.find_method(&name.lexeme) {
            return Ok(Value::Callable(Rc::new(method.bind(Rc::clone(this)))));
        }

        Err(LoxError::runtime(
            name,
            format!("Undefined property '{}'.", name.lexeme),
        ))
    }

    pub fn set(&mut self, name: &Token, value: Value) {
        self.fields.insert(name.lexeme.clone(), value);
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<&String> = self.fields.keys().collect();
        fields.sort();

        f.debug_struct("Instance")
            .field("class", &self.class.name)
            .field("fields", &fields)
            .finish()
    }
}
