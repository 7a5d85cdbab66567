//! Logical connectives. These are the lazy functions: arguments are
//! evaluated in order and evaluation stops as soon as the outcome is
//! decided, so an error in a later argument is never surfaced.

use num_traits::ToPrimitive;

use crate::expr::ExpressionResult;
use crate::types::{Status, Value};

use super::{FunctionDefinition, boolean, boolean_arg, check_arity};

const FN_AND: &str = "urn:oasis:names:tc:xacml:1.0:function:and";
const FN_OR: &str = "urn:oasis:names:tc:xacml:1.0:function:or";
const FN_N_OF: &str = "urn:oasis:names:tc:xacml:1.0:function:n-of";
const FN_NOT: &str = "urn:oasis:names:tc:xacml:1.0:function:not";

pub(super) fn register(defs: &mut Vec<FunctionDefinition>) {
    defs.push(FunctionDefinition::lazy(FN_AND, |ctx, env, args| {
        for arg in args {
            let result = arg.evaluate(ctx, env);
            if result.is_error() {
                return Ok(result);
            }
            match result.boolean() {
                Some(true) => continue,
                Some(false) => return Ok(boolean(false)),
                None => {
                    return Err(Status::processing_error("and: arguments must be boolean"));
                }
            }
        }
        Ok(boolean(true))
    }));

    defs.push(FunctionDefinition::lazy(FN_OR, |ctx, env, args| {
        for arg in args {
            let result = arg.evaluate(ctx, env);
            if result.is_error() {
                return Ok(result);
            }
            match result.boolean() {
                Some(false) => continue,
                Some(true) => return Ok(boolean(true)),
                None => {
                    return Err(Status::processing_error("or: arguments must be boolean"));
                }
            }
        }
        Ok(boolean(false))
    }));

    defs.push(FunctionDefinition::lazy(FN_N_OF, |ctx, env, args| {
        let Some((first, rest)) = args.split_first() else {
            return Err(Status::processing_error("n-of expects at least 1 argument"));
        };
        let threshold = first.evaluate(ctx, env);
        if threshold.is_error() {
            return Ok(threshold);
        }
        let needed = match threshold {
            ExpressionResult::Single(value) => match value.value() {
                Value::Integer(n) => n.to_usize().ok_or_else(|| {
                    Status::processing_error("n-of: threshold out of range")
                })?,
                _ => {
                    return Err(Status::processing_error(
                        "n-of: first argument must be an integer",
                    ));
                }
            },
            _ => {
                return Err(Status::processing_error(
                    "n-of: first argument must be a single integer",
                ));
            }
        };
        if needed > rest.len() {
            return Err(Status::processing_error(format!(
                "n-of: needs {needed} true arguments but only {} remain",
                rest.len()
            )));
        }

        let mut outstanding = needed;
        for (index, arg) in rest.iter().enumerate() {
            if outstanding == 0 {
                break;
            }
            // not enough arguments left to ever reach the threshold
            if rest.len() - index < outstanding {
                return Ok(boolean(false));
            }
            let result = arg.evaluate(ctx, env);
            if result.is_error() {
                return Ok(result);
            }
            match result.boolean() {
                Some(true) => outstanding -= 1,
                Some(false) => continue,
                None => {
                    return Err(Status::processing_error("n-of: arguments must be boolean"));
                }
            }
        }
        Ok(boolean(outstanding == 0))
    }));

    defs.push(FunctionDefinition::eager(FN_NOT, |_, args| {
        check_arity(FN_NOT, args, 1)?;
        let value = boolean_arg(FN_NOT, args, 0)?;
        Ok(boolean(!value))
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvaluationContext;
    use crate::expr::{Expression, LexicalEnv};
    use crate::policy::PolicyFinder;
    use crate::traits::EmptyAttributeSource;
    use crate::types::{AttributeValue, Request};
    use yare::parameterized;

    fn lit(value: bool) -> Expression {
        Expression::literal(AttributeValue::boolean(value))
    }

    fn broken() -> Expression {
        Expression::apply("urn:example:function:no-such", vec![])
    }

    fn eval(expression: &Expression) -> ExpressionResult {
        let request = Request::new();
        let finder = PolicyFinder::new(vec![]).unwrap();
        let mut ctx = EvaluationContext::new(&request, &EmptyAttributeSource, &finder);
        let env = LexicalEnv::empty();
        expression.evaluate(&mut ctx, &env)
    }

    #[parameterized(
        empty_and_is_true = { FN_AND, vec![], Some(true) },
        and_all_true = { FN_AND, vec![lit(true), lit(true)], Some(true) },
        and_one_false = { FN_AND, vec![lit(true), lit(false)], Some(false) },
        empty_or_is_false = { FN_OR, vec![], Some(false) },
        or_one_true = { FN_OR, vec![lit(false), lit(true)], Some(true) },
        or_all_false = { FN_OR, vec![lit(false), lit(false)], Some(false) },
    )]
    fn test_connectives(function: &str, args: Vec<Expression>, expected: Option<bool>) {
        assert_eq!(eval(&Expression::apply(function, args)).boolean(), expected);
    }

    #[test]
    fn test_and_short_circuit_skips_error() {
        let expression = Expression::apply(FN_AND, vec![lit(false), broken()]);
        assert_eq!(eval(&expression).boolean(), Some(false));
    }

    #[test]
    fn test_or_short_circuit_skips_error() {
        let expression = Expression::apply(FN_OR, vec![lit(true), broken()]);
        assert_eq!(eval(&expression).boolean(), Some(true));
    }

    #[test]
    fn test_and_surfaces_error_before_decision() {
        let expression = Expression::apply(FN_AND, vec![broken(), lit(false)]);
        assert!(eval(&expression).is_error());
    }

    #[parameterized(
        met = { 2, vec![lit(true), lit(false), lit(true)], Some(true) },
        unmet = { 2, vec![lit(true), lit(false), lit(false)], Some(false) },
        zero_is_trivially_true = { 0, vec![lit(false)], Some(true) },
    )]
    fn test_n_of(threshold: i64, rest: Vec<Expression>, expected: Option<bool>) {
        let mut args = vec![Expression::literal(AttributeValue::integer(threshold))];
        args.extend(rest);
        assert_eq!(eval(&Expression::apply(FN_N_OF, args)).boolean(), expected);
    }

    #[test]
    fn test_n_of_threshold_above_arity_is_error() {
        let args = vec![Expression::literal(AttributeValue::integer(3)), lit(true)];
        assert!(eval(&Expression::apply(FN_N_OF, args)).is_error());
    }

    #[test]
    fn test_not() {
        assert_eq!(
            eval(&Expression::apply(FN_NOT, vec![lit(false)])).boolean(),
            Some(true)
        );
    }
}
