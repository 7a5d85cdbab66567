//! The expression evaluator: a small interpreter over a typed, partially
//! lazy expression language with strict three-valued logic.
//!
//! Every evaluation produces exactly one [`ExpressionResult`]; errors are
//! carried inline as statuses and short-circuit enclosing expressions.
//! Structural problems (duplicate quantifier variables, malformed selector
//! paths) are rejected by a one-shot `validate` pass at policy load time —
//! evaluation never re-validates.

mod quantified;
mod retrieval;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::context::EvaluationContext;
use crate::functions;
use crate::types::{AttributeValue, Bag, Identifier, Status};

pub use quantified::{QuantifiedExpression, Quantifier};
pub use retrieval::{AttributeDesignator, AttributeSelector};

/// The result of evaluating one expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionResult {
    /// Evaluation failed; the status says why. Short-circuits enclosing
    /// expressions.
    Error(Status),
    /// No value, e.g. an optional attribute that was absent.
    Empty,
    Single(AttributeValue),
    Bag(Bag),
}

impl ExpressionResult {
    pub fn is_error(&self) -> bool {
        matches!(self, ExpressionResult::Error(_))
    }

    pub fn status(&self) -> Status {
        match self {
            ExpressionResult::Error(status) => status.clone(),
            _ => Status::ok(),
        }
    }

    /// The boolean payload, if this is a single boolean value.
    pub fn boolean(&self) -> Option<bool> {
        match self {
            ExpressionResult::Single(value) => value.as_boolean(),
            _ => None,
        }
    }

    /// A bag view: singles become singleton bags, `Empty` the empty bag.
    /// `None` for errors.
    pub fn to_bag(&self) -> Option<Bag> {
        match self {
            ExpressionResult::Error(_) => None,
            ExpressionResult::Empty => Some(Bag::new()),
            ExpressionResult::Single(value) => Some(Bag::of(vec![value.clone()])),
            ExpressionResult::Bag(bag) => Some(bag.clone()),
        }
    }
}

/// A named expression, resolvable by [`Expression::VariableReference`] within
/// the lexical scope of the policy that declared it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDefinition {
    pub id: String,
    pub expression: Expression,
}

impl VariableDefinition {
    pub fn new(id: impl Into<String>, expression: Expression) -> Self {
        VariableDefinition {
            id: id.into(),
            expression,
        }
    }
}

/// The closed set of expression variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// A pre-built value; always evaluates to `Single`.
    Literal(AttributeValue),
    /// A function id as a value (anyURI), for higher-order arguments.
    Function(Identifier),
    /// Function application over evaluated (or, for lazy functions,
    /// deferred) argument expressions.
    Apply {
        function: Identifier,
        args: Vec<Expression>,
    },
    Designator(AttributeDesignator),
    Selector(AttributeSelector),
    VariableReference(String),
    Quantified(Box<QuantifiedExpression>),
}

impl Expression {
    pub fn literal(value: AttributeValue) -> Self {
        Expression::Literal(value)
    }

    pub fn apply(function: impl Into<Identifier>, args: Vec<Expression>) -> Self {
        Expression::Apply {
            function: function.into(),
            args,
        }
    }

    pub fn function(id: impl Into<Identifier>) -> Self {
        Expression::Function(id.into())
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expression::VariableReference(name.into())
    }

    pub fn quantified(q: QuantifiedExpression) -> Self {
        Expression::Quantified(Box::new(q))
    }

    pub(crate) fn evaluate(
        &self,
        ctx: &mut EvaluationContext<'_>,
        env: &LexicalEnv<'_>,
    ) -> ExpressionResult {
        match self {
            Expression::Literal(value) => ExpressionResult::Single(value.clone()),
            Expression::Function(id) => {
                ExpressionResult::Single(AttributeValue::any_uri(id.as_str()))
            }
            Expression::Apply { function, args } => functions::apply(ctx, env, function, args),
            Expression::Designator(designator) => designator.evaluate(ctx),
            Expression::Selector(selector) => selector.evaluate(ctx),
            Expression::VariableReference(name) => resolve_variable(ctx, env, name),
            Expression::Quantified(quantified) => quantified.evaluate(ctx, env),
        }
    }

    pub(crate) fn validate(&self, scope: &mut ValidationScope) -> Result<(), Status> {
        match self {
            Expression::Literal(_) => Ok(()),
            Expression::Function(id) => {
                if id.as_str().is_empty() {
                    return Err(Status::syntax_error("missing function id"));
                }
                Ok(())
            }
            Expression::Apply { function, args } => {
                if function.as_str().is_empty() {
                    return Err(Status::syntax_error("missing function id"));
                }
                for arg in args {
                    arg.validate(scope)?;
                }
                Ok(())
            }
            Expression::Designator(designator) => designator.validate(),
            Expression::Selector(selector) => selector.validate(),
            Expression::VariableReference(name) => {
                if name.is_empty() {
                    return Err(Status::syntax_error("missing variable id"));
                }
                Ok(())
            }
            Expression::Quantified(quantified) => quantified.validate(scope),
        }
    }
}

/// A variable binding visible in some lexical scope.
pub(crate) enum Binding<'a> {
    /// A policy-level variable definition, evaluated on demand.
    Definition(&'a Expression),
    /// A quantifier iteration value.
    Value(AttributeValue),
}

/// The chain of lexical scopes: policy frame outermost, one frame per nested
/// quantified expression. Lookups walk outward until found or exhausted.
pub(crate) struct LexicalEnv<'a> {
    parent: Option<&'a LexicalEnv<'a>>,
    scope: Option<&'a Identifier>,
    frame: HashMap<String, Binding<'a>>,
}

impl<'a> LexicalEnv<'a> {
    /// The policy root frame, holding its variable definitions.
    pub(crate) fn root(policy_id: &'a Identifier, definitions: &'a [VariableDefinition]) -> Self {
        let mut frame = HashMap::with_capacity(definitions.len());
        for definition in definitions {
            frame.insert(
                definition.id.clone(),
                Binding::Definition(&definition.expression),
            );
        }
        LexicalEnv {
            parent: None,
            scope: Some(policy_id),
            frame,
        }
    }

    /// A scope with nothing in it, for evaluation outside any policy
    /// (targets, tests).
    pub(crate) fn empty() -> LexicalEnv<'a> {
        LexicalEnv {
            parent: None,
            scope: None,
            frame: HashMap::new(),
        }
    }

    /// A child frame binding one quantifier variable to a value.
    pub(crate) fn child<'s>(&'s self, name: &str, value: AttributeValue) -> LexicalEnv<'s> {
        let mut frame = HashMap::with_capacity(1);
        frame.insert(name.to_string(), Binding::Value(value));
        LexicalEnv {
            parent: Some(self),
            scope: None,
            frame,
        }
    }

    fn lookup(&self, name: &str) -> Option<&Binding<'a>> {
        self.frame
            .get(name)
            .or_else(|| self.parent.and_then(|p| p.lookup(name)))
    }

    fn root_env<'s>(&'s self) -> &'s LexicalEnv<'a> {
        match self.parent {
            Some(parent) => parent.root_env(),
            None => self,
        }
    }

    /// The declaring policy's id, if this chain is rooted in a policy.
    fn scope_id(&self) -> Option<&'a Identifier> {
        self.root_env().scope
    }
}

/// Resolve a variable reference through the lexical environment. Definition
/// results are memoized per request in the evaluation context, keyed by
/// (policy id, variable id); definitions always evaluate against the policy
/// root frame where they were declared.
fn resolve_variable(
    ctx: &mut EvaluationContext<'_>,
    env: &LexicalEnv<'_>,
    name: &str,
) -> ExpressionResult {
    let expression = match env.lookup(name) {
        None => {
            return ExpressionResult::Error(Status::syntax_error(format!(
                "unresolved variable reference '{name}'"
            )));
        }
        Some(Binding::Value(value)) => return ExpressionResult::Single(value.clone()),
        Some(Binding::Definition(expression)) => *expression,
    };

    let Some(scope_id) = env.scope_id() else {
        return expression.evaluate(ctx, env.root_env());
    };
    let key = (scope_id.clone(), name.to_string());
    if let Some(cached) = ctx.variable_cached(&key) {
        return cached;
    }
    if !ctx.push_variable(key.clone()) {
        return ExpressionResult::Error(Status::processing_error(format!(
            "circular variable reference '{name}'"
        )));
    }
    let result = expression.evaluate(ctx, env.root_env());
    ctx.pop_variable();
    ctx.cache_variable(key, result.clone());
    result
}

/// Tracks declared variable ids during the pre-evaluation validate pass.
pub(crate) struct ValidationScope {
    frames: Vec<HashSet<String>>,
}

impl ValidationScope {
    pub(crate) fn new() -> Self {
        ValidationScope {
            frames: vec![HashSet::new()],
        }
    }

    /// Declare a variable in the innermost frame. Rejects ids already visible
    /// anywhere in the chain.
    pub(crate) fn declare(&mut self, name: &str) -> Result<(), Status> {
        if name.is_empty() {
            return Err(Status::syntax_error("missing variable id"));
        }
        if self.frames.iter().any(|frame| frame.contains(name)) {
            return Err(Status::syntax_error(format!(
                "variable '{name}' is already defined in an enclosing scope"
            )));
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string());
        }
        Ok(())
    }

    pub(crate) fn push(&mut self) {
        self.frames.push(HashSet::new());
    }

    pub(crate) fn pop(&mut self) {
        self.frames.pop();
    }
}
