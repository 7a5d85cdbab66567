//! Higher-order bag functions. The first argument is a function-as-value
//! (an anyURI naming the predicate); iteration stops as soon as the logical
//! outcome is determined, in bag order.

use itertools::Itertools;

use crate::context::EvaluationContext;
use crate::expr::ExpressionResult;
use crate::types::{AttributeValue, Bag, Identifier, Status, Value};

use super::{FunctionDefinition, bag, boolean, check_arity, check_min_arity, invoke};

const FN_ANY_OF: &str = "urn:oasis:names:tc:xacml:3.0:function:any-of";
const FN_ALL_OF: &str = "urn:oasis:names:tc:xacml:3.0:function:all-of";
const FN_ANY_OF_ANY: &str = "urn:oasis:names:tc:xacml:3.0:function:any-of-any";
const FN_ALL_OF_ANY: &str = "urn:oasis:names:tc:xacml:1.0:function:all-of-any";
const FN_ANY_OF_ALL: &str = "urn:oasis:names:tc:xacml:1.0:function:any-of-all";
const FN_ALL_OF_ALL: &str = "urn:oasis:names:tc:xacml:1.0:function:all-of-all";
const FN_MAP: &str = "urn:oasis:names:tc:xacml:3.0:function:map";

/// The predicate id carried by the first argument.
fn function_arg(id: &str, args: &[ExpressionResult]) -> Result<Identifier, Status> {
    match args.first() {
        Some(ExpressionResult::Single(value)) => match value.value() {
            Value::AnyUri(uri) => Ok(Identifier::from(uri.as_str())),
            Value::String(uri) => Ok(Identifier::from(uri.as_str())),
            _ => Err(Status::processing_error(format!(
                "{id}: first argument must name a function"
            ))),
        },
        _ => Err(Status::processing_error(format!(
            "{id}: first argument must name a function"
        ))),
    }
}

/// Split the non-function arguments into singles plus the position of the
/// one bag the iteration runs over.
fn one_bag_among(
    id: &str,
    args: &[ExpressionResult],
) -> Result<(Vec<AttributeValue>, usize, Bag), Status> {
    let mut singles = Vec::with_capacity(args.len() - 1);
    let mut found: Option<(usize, Bag)> = None;
    for (index, arg) in args.iter().enumerate().skip(1) {
        match arg {
            ExpressionResult::Single(value) => singles.push(value.clone()),
            ExpressionResult::Bag(_) | ExpressionResult::Empty => {
                if found.is_some() {
                    return Err(Status::processing_error(format!(
                        "{id}: exactly one bag argument is allowed"
                    )));
                }
                let values = bag(id, args, index, None)?.into_owned();
                // placeholder keeps the argument positions aligned
                singles.push(AttributeValue::boolean(false));
                found = Some((index - 1, values));
            }
            ExpressionResult::Error(status) => return Err(status.clone()),
        }
    }
    let Some((position, values)) = found else {
        return Err(Status::processing_error(format!(
            "{id}: one argument must be a bag"
        )));
    };
    Ok((singles, position, values))
}

/// Invoke the predicate and read its boolean outcome.
fn predicate(
    ctx: &mut EvaluationContext<'_>,
    id: &str,
    function: &Identifier,
    call: &[ExpressionResult],
) -> Result<bool, ExpressionResult> {
    let result = invoke(ctx, function, call);
    if result.is_error() {
        return Err(result);
    }
    match result.boolean() {
        Some(value) => Ok(value),
        None => Err(ExpressionResult::Error(Status::processing_error(format!(
            "{id}: predicate must evaluate to a boolean"
        )))),
    }
}

fn singles_call(singles: &[AttributeValue], position: usize, element: &AttributeValue) -> Vec<ExpressionResult> {
    singles
        .iter()
        .enumerate()
        .map(|(index, value)| {
            if index == position {
                ExpressionResult::Single(element.clone())
            } else {
                ExpressionResult::Single(value.clone())
            }
        })
        .collect()
}

/// any-of / all-of: one bag among the arguments, quantified existentially or
/// universally.
fn quantified_body(
    id: &'static str,
    expected: bool,
) -> impl Fn(&mut EvaluationContext<'_>, &[ExpressionResult]) -> Result<ExpressionResult, Status>
+ Send
+ Sync
+ 'static {
    move |ctx, args| {
        check_min_arity(id, args, 2)?;
        let function = function_arg(id, args)?;
        let (singles, position, values) = one_bag_among(id, args)?;
        for element in values.iter() {
            let call = singles_call(&singles, position, element);
            match predicate(ctx, id, &function, &call) {
                Ok(value) if value != expected => return Ok(boolean(value)),
                Ok(_) => continue,
                Err(error) => return Ok(error),
            }
        }
        Ok(boolean(expected))
    }
}

/// Two-bag quantifiers: for `outer` elements, test the `inner` bag with the
/// given inner quantifier.
fn two_bag_body(
    id: &'static str,
    inner_expected: bool,
    outer_expected: bool,
) -> impl Fn(&mut EvaluationContext<'_>, &[ExpressionResult]) -> Result<ExpressionResult, Status>
+ Send
+ Sync
+ 'static {
    move |ctx, args| {
        check_arity(id, args, 3)?;
        let function = function_arg(id, args)?;
        let outer = bag(id, args, 1, None)?.into_owned();
        let inner = bag(id, args, 2, None)?.into_owned();
        for a in outer.iter() {
            let mut inner_holds = inner_expected;
            for b in inner.iter() {
                let call = vec![
                    ExpressionResult::Single(a.clone()),
                    ExpressionResult::Single(b.clone()),
                ];
                match predicate(ctx, id, &function, &call) {
                    Ok(value) if value == inner_expected => continue,
                    Ok(value) => {
                        inner_holds = value;
                        break;
                    }
                    Err(error) => return Ok(error),
                }
            }
            if inner_holds != outer_expected {
                return Ok(boolean(inner_holds));
            }
        }
        Ok(boolean(outer_expected))
    }
}

pub(super) fn register(defs: &mut Vec<FunctionDefinition>) {
    defs.push(FunctionDefinition::eager(
        FN_ANY_OF,
        quantified_body(FN_ANY_OF, false),
    ));
    defs.push(FunctionDefinition::eager(
        FN_ALL_OF,
        quantified_body(FN_ALL_OF, true),
    ));

    // full Cartesian product over every argument read as a bag
    defs.push(FunctionDefinition::eager(FN_ANY_OF_ANY, |ctx, args| {
        check_min_arity(FN_ANY_OF_ANY, args, 2)?;
        let function = function_arg(FN_ANY_OF_ANY, args)?;
        let mut columns: Vec<Vec<AttributeValue>> = Vec::with_capacity(args.len() - 1);
        for index in 1..args.len() {
            columns.push(bag(FN_ANY_OF_ANY, args, index, None)?.iter().cloned().collect());
        }
        for combination in columns.into_iter().multi_cartesian_product() {
            let call: Vec<ExpressionResult> = combination
                .into_iter()
                .map(ExpressionResult::Single)
                .collect();
            match predicate(ctx, FN_ANY_OF_ANY, &function, &call) {
                Ok(true) => return Ok(boolean(true)),
                Ok(false) => continue,
                Err(error) => return Ok(error),
            }
        }
        Ok(boolean(false))
    }));

    // for every a: some b matches
    defs.push(FunctionDefinition::eager(
        FN_ALL_OF_ANY,
        two_bag_body(FN_ALL_OF_ANY, false, true),
    ));
    // some a matches every b
    defs.push(FunctionDefinition::eager(
        FN_ANY_OF_ALL,
        two_bag_body(FN_ANY_OF_ALL, true, false),
    ));
    // every a matches every b
    defs.push(FunctionDefinition::eager(
        FN_ALL_OF_ALL,
        two_bag_body(FN_ALL_OF_ALL, true, true),
    ));

    defs.push(FunctionDefinition::eager(FN_MAP, |ctx, args| {
        check_min_arity(FN_MAP, args, 2)?;
        let function = function_arg(FN_MAP, args)?;
        let (singles, position, values) = one_bag_among(FN_MAP, args)?;
        let mut out = Bag::new();
        for element in values.iter() {
            let call = singles_call(&singles, position, element);
            match invoke(ctx, &function, &call) {
                error @ ExpressionResult::Error(_) => return Ok(error),
                ExpressionResult::Empty => {}
                ExpressionResult::Single(value) => out.add(value),
                ExpressionResult::Bag(values) => {
                    for value in values.iter() {
                        out.add(value.clone());
                    }
                }
            }
        }
        Ok(ExpressionResult::Bag(out))
    }));
}
