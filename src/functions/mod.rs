//! The function library: one immutable registry mapping function ids to
//! definitions, built once at first use and shared by every evaluation.
//!
//! Most functions are *eager*: their arguments are evaluated before the body
//! runs, and the first argument error short-circuits the application. The
//! logical connectives are *lazy*: they receive the unevaluated argument
//! expressions and stop evaluating once their outcome is decided. Arity and
//! per-position data types are checked before any body logic runs; a
//! mismatch is a processing error, never a language-level fault.

mod arithmetic;
mod bags;
mod comparison;
mod equality;
mod higher_order;
mod logical;
mod names;
mod strings;

use std::borrow::Cow;
use std::collections::HashMap;

use once_cell::sync::Lazy;
use tracing::trace;

use crate::context::EvaluationContext;
use crate::expr::{Expression, ExpressionResult, LexicalEnv};
use crate::types::{AttributeValue, Bag, Identifier, Status};

type EagerBody = dyn Fn(&mut EvaluationContext<'_>, &[ExpressionResult]) -> Result<ExpressionResult, Status>
    + Send
    + Sync;
type LazyBody = dyn Fn(
        &mut EvaluationContext<'_>,
        &LexicalEnv<'_>,
        &[Expression],
    ) -> Result<ExpressionResult, Status>
    + Send
    + Sync;

enum FunctionKind {
    Eager(Box<EagerBody>),
    Lazy(Box<LazyBody>),
}

/// One entry in the function library: an identifier plus its evaluation
/// body. This shape is the whole per-function contract; the standard
/// catalogue is a long list of these.
pub struct FunctionDefinition {
    id: Identifier,
    kind: FunctionKind,
}

impl FunctionDefinition {
    pub(crate) fn eager(
        id: &str,
        body: impl Fn(&mut EvaluationContext<'_>, &[ExpressionResult]) -> Result<ExpressionResult, Status>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        FunctionDefinition {
            id: Identifier::from(id),
            kind: FunctionKind::Eager(Box::new(body)),
        }
    }

    pub(crate) fn lazy(
        id: &str,
        body: impl Fn(
            &mut EvaluationContext<'_>,
            &LexicalEnv<'_>,
            &[Expression],
        ) -> Result<ExpressionResult, Status>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        FunctionDefinition {
            id: Identifier::from(id),
            kind: FunctionKind::Lazy(Box::new(body)),
        }
    }

    pub fn id(&self) -> &Identifier {
        &self.id
    }
}

static REGISTRY: Lazy<HashMap<Identifier, FunctionDefinition>> = Lazy::new(|| {
    let mut defs: Vec<FunctionDefinition> = Vec::new();
    logical::register(&mut defs);
    equality::register(&mut defs);
    arithmetic::register(&mut defs);
    comparison::register(&mut defs);
    strings::register(&mut defs);
    names::register(&mut defs);
    bags::register(&mut defs);
    higher_order::register(&mut defs);
    defs.into_iter().map(|d| (d.id.clone(), d)).collect()
});

/// Apply a function to argument expressions, the `Apply` evaluation path.
pub(crate) fn apply(
    ctx: &mut EvaluationContext<'_>,
    env: &LexicalEnv<'_>,
    function: &Identifier,
    args: &[Expression],
) -> ExpressionResult {
    let Some(definition) = REGISTRY.get(function) else {
        return ExpressionResult::Error(Status::processing_error(format!(
            "unknown function '{function}'"
        )));
    };
    trace!(event = "Apply", function = function.as_str(), args = args.len());

    let outcome = match &definition.kind {
        FunctionKind::Lazy(body) => body(ctx, env, args),
        FunctionKind::Eager(body) => {
            let mut evaluated = Vec::with_capacity(args.len());
            for arg in args {
                match arg.evaluate(ctx, env) {
                    error @ ExpressionResult::Error(_) => return error,
                    result => evaluated.push(result),
                }
            }
            body(ctx, &evaluated)
        }
    };
    match outcome {
        Ok(result) => result,
        Err(status) => ExpressionResult::Error(status),
    }
}

/// Invoke a function over pre-evaluated arguments, the higher-order and
/// target-match path.
pub(crate) fn invoke(
    ctx: &mut EvaluationContext<'_>,
    function: &Identifier,
    args: &[ExpressionResult],
) -> ExpressionResult {
    let Some(definition) = REGISTRY.get(function) else {
        return ExpressionResult::Error(Status::processing_error(format!(
            "unknown function '{function}'"
        )));
    };
    match &definition.kind {
        FunctionKind::Eager(body) => match body(ctx, args) {
            Ok(result) => result,
            Err(status) => ExpressionResult::Error(status),
        },
        FunctionKind::Lazy(_) => ExpressionResult::Error(Status::processing_error(format!(
            "function '{function}' cannot be applied to pre-evaluated arguments"
        ))),
    }
}

// ---- shared argument checking -------------------------------------------

pub(crate) fn check_arity(
    id: &str,
    args: &[ExpressionResult],
    expected: usize,
) -> Result<(), Status> {
    if args.len() != expected {
        return Err(Status::processing_error(format!(
            "{id} expects {expected} arguments, got {}",
            args.len()
        )));
    }
    Ok(())
}

pub(crate) fn check_min_arity(
    id: &str,
    args: &[ExpressionResult],
    minimum: usize,
) -> Result<(), Status> {
    if args.len() < minimum {
        return Err(Status::processing_error(format!(
            "{id} expects at least {minimum} arguments, got {}",
            args.len()
        )));
    }
    Ok(())
}

/// The argument at `index`, required to be a single value of `data_type`.
pub(crate) fn single<'a>(
    id: &str,
    args: &'a [ExpressionResult],
    index: usize,
    data_type: &str,
) -> Result<&'a AttributeValue, Status> {
    match args.get(index) {
        Some(ExpressionResult::Single(value)) if value.is_type(data_type) => Ok(value),
        Some(ExpressionResult::Single(value)) => Err(Status::processing_error(format!(
            "{id}: argument {} has type {}, expected {data_type}",
            index + 1,
            value.data_type()
        ))),
        Some(_) => Err(Status::processing_error(format!(
            "{id}: argument {} must be a single value of {data_type}",
            index + 1
        ))),
        None => Err(Status::processing_error(format!(
            "{id}: missing argument {}",
            index + 1
        ))),
    }
}

/// The argument at `index` as a bag, optionally checked to be homogeneous in
/// `data_type`. `Empty` reads as the empty bag, a single as a singleton.
pub(crate) fn bag<'a>(
    id: &str,
    args: &'a [ExpressionResult],
    index: usize,
    data_type: Option<&str>,
) -> Result<Cow<'a, Bag>, Status> {
    let values: Cow<'a, Bag> = match args.get(index) {
        Some(ExpressionResult::Bag(bag)) => Cow::Borrowed(bag),
        Some(ExpressionResult::Empty) => Cow::Owned(Bag::new()),
        Some(ExpressionResult::Single(value)) => Cow::Owned(Bag::of(vec![value.clone()])),
        Some(ExpressionResult::Error(status)) => return Err(status.clone()),
        None => {
            return Err(Status::processing_error(format!(
                "{id}: missing argument {}",
                index + 1
            )));
        }
    };
    if let Some(data_type) = data_type {
        if let Some(stray) = values.iter().find(|v| !v.is_type(data_type)) {
            return Err(Status::processing_error(format!(
                "{id}: bag argument {} holds a {} value, expected {data_type}",
                index + 1,
                stray.data_type()
            )));
        }
    }
    Ok(values)
}

pub(crate) fn boolean_arg(
    id: &str,
    args: &[ExpressionResult],
    index: usize,
) -> Result<bool, Status> {
    single(id, args, index, crate::types::ids::DT_BOOLEAN)?
        .as_boolean()
        .ok_or_else(|| Status::processing_error(format!("{id}: argument {} is not a boolean", index + 1)))
}

pub(crate) fn boolean(value: bool) -> ExpressionResult {
    ExpressionResult::Single(AttributeValue::boolean(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_holds_the_catalogue_subset() {
        for id in [
            "urn:oasis:names:tc:xacml:1.0:function:and",
            "urn:oasis:names:tc:xacml:1.0:function:string-equal",
            "urn:oasis:names:tc:xacml:1.0:function:integer-add",
            "urn:oasis:names:tc:xacml:1.0:function:string-one-and-only",
            "urn:oasis:names:tc:xacml:1.0:function:string-regexp-match",
            "urn:oasis:names:tc:xacml:3.0:function:any-of",
            "urn:oasis:names:tc:xacml:1.0:function:x500Name-match",
        ] {
            assert!(REGISTRY.contains_key(&Identifier::from(id)), "missing {id}");
        }
    }

    #[test]
    fn test_arity_errors_are_processing_errors() {
        let args = vec![ExpressionResult::Single(AttributeValue::string("a"))];
        let status = check_arity("f", &args, 2).unwrap_err();
        assert_eq!(
            status.code().value().as_str(),
            crate::types::ids::STATUS_PROCESSING_ERROR
        );
    }

    #[test]
    fn test_single_rejects_type_mismatch() {
        let args = vec![ExpressionResult::Single(AttributeValue::integer(1))];
        assert!(single("f", &args, 0, crate::types::ids::DT_STRING).is_err());
        assert!(single("f", &args, 0, crate::types::ids::DT_INTEGER).is_ok());
    }

    #[test]
    fn test_bag_accepts_empty_and_single() {
        let args = vec![
            ExpressionResult::Empty,
            ExpressionResult::Single(AttributeValue::string("a")),
        ];
        assert!(bag("f", &args, 0, None).unwrap().is_empty());
        assert_eq!(bag("f", &args, 1, None).unwrap().size(), 1);
    }

    #[test]
    fn test_bag_checks_element_types() {
        let args = vec![ExpressionResult::Bag(Bag::of(vec![
            AttributeValue::string("a"),
            AttributeValue::integer(1),
        ]))];
        assert!(bag("f", &args, 0, Some(crate::types::ids::DT_STRING)).is_err());
        assert!(bag("f", &args, 0, None).is_ok());
    }
}
