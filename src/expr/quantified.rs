//! Quantified iteration over bags: ForAll, ForAny, Map, Select.

use serde::{Deserialize, Serialize};

use crate::context::EvaluationContext;
use crate::types::{Bag, Status};

use super::{Expression, ExpressionResult, LexicalEnv, ValidationScope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quantifier {
    /// True iff the domain is empty or every iterant is true.
    ForAll,
    /// False iff the domain is empty or every iterant is false.
    ForAny,
    /// The bag of iterant results, bags flattened.
    Map,
    /// The bag of domain elements whose iterant is true.
    Select,
}

/// Evaluates a domain expression to a bag, then evaluates an iterant once per
/// element with a private variable bound to that element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantifiedExpression {
    quantifier: Quantifier,
    variable: String,
    domain: Expression,
    iterant: Expression,
}

impl QuantifiedExpression {
    pub fn new(
        quantifier: Quantifier,
        variable: impl Into<String>,
        domain: Expression,
        iterant: Expression,
    ) -> Self {
        QuantifiedExpression {
            quantifier,
            variable: variable.into(),
            domain,
            iterant,
        }
    }

    pub(crate) fn evaluate(
        &self,
        ctx: &mut EvaluationContext<'_>,
        env: &LexicalEnv<'_>,
    ) -> ExpressionResult {
        let domain = self.domain.evaluate(ctx, env);
        let Some(elements) = domain.to_bag() else {
            return domain; // domain error short-circuits
        };

        match self.quantifier {
            Quantifier::ForAll => self.quantify(ctx, env, &elements, true),
            Quantifier::ForAny => self.quantify(ctx, env, &elements, false),
            Quantifier::Map => self.map(ctx, env, &elements),
            Quantifier::Select => self.select(ctx, env, &elements),
        }
    }

    /// ForAll/ForAny share one shape: iterate until an iterant differs from
    /// `expected`, short-circuiting on the first non-`expected`, non-ok
    /// result.
    fn quantify(
        &self,
        ctx: &mut EvaluationContext<'_>,
        env: &LexicalEnv<'_>,
        elements: &Bag,
        expected: bool,
    ) -> ExpressionResult {
        for element in elements.iter() {
            let frame = env.child(&self.variable, element.clone());
            let result = self.iterant.evaluate(ctx, &frame);
            if result.is_error() {
                return result;
            }
            match result.boolean() {
                Some(value) if value == expected => continue,
                Some(value) => return boolean(value),
                None => return self.non_boolean_iterant(),
            }
        }
        boolean(expected)
    }

    fn map(
        &self,
        ctx: &mut EvaluationContext<'_>,
        env: &LexicalEnv<'_>,
        elements: &Bag,
    ) -> ExpressionResult {
        let mut out = Bag::new();
        for element in elements.iter() {
            let frame = env.child(&self.variable, element.clone());
            match self.iterant.evaluate(ctx, &frame) {
                error @ ExpressionResult::Error(_) => return error,
                ExpressionResult::Empty => {}
                ExpressionResult::Single(value) => out.add(value),
                ExpressionResult::Bag(bag) => {
                    for value in bag.iter() {
                        out.add(value.clone());
                    }
                }
            }
        }
        ExpressionResult::Bag(out)
    }

    fn select(
        &self,
        ctx: &mut EvaluationContext<'_>,
        env: &LexicalEnv<'_>,
        elements: &Bag,
    ) -> ExpressionResult {
        let mut out = Bag::new();
        for element in elements.iter() {
            let frame = env.child(&self.variable, element.clone());
            let result = self.iterant.evaluate(ctx, &frame);
            if result.is_error() {
                return result;
            }
            match result.boolean() {
                Some(true) => out.add(element.clone()),
                Some(false) => {}
                None => return self.non_boolean_iterant(),
            }
        }
        ExpressionResult::Bag(out)
    }

    fn non_boolean_iterant(&self) -> ExpressionResult {
        ExpressionResult::Error(Status::processing_error(format!(
            "iterant over '{}' must evaluate to a boolean",
            self.variable
        )))
    }

    pub(crate) fn validate(&self, scope: &mut ValidationScope) -> Result<(), Status> {
        // the domain cannot see the quantifier variable
        self.domain.validate(scope)?;
        scope.push();
        let declared = scope.declare(&self.variable);
        let result = declared.and_then(|()| self.iterant.validate(scope));
        scope.pop();
        result
    }
}

fn boolean(value: bool) -> ExpressionResult {
    ExpressionResult::Single(crate::types::AttributeValue::boolean(value))
}
