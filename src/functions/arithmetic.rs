//! Integer and double arithmetic. Integers are arbitrary-precision, so there
//! is no silent overflow; division and modulus by zero are processing
//! errors.

use num_bigint::BigInt;
use num_traits::{FromPrimitive, Signed, ToPrimitive, Zero};

use crate::context::EvaluationContext;
use crate::expr::ExpressionResult;
use crate::types::{AttributeValue, Status, Value, ids};

use super::{FunctionDefinition, check_arity, check_min_arity, single};

const FN_INTEGER_ADD: &str = "urn:oasis:names:tc:xacml:1.0:function:integer-add";
const FN_INTEGER_SUBTRACT: &str = "urn:oasis:names:tc:xacml:1.0:function:integer-subtract";
const FN_INTEGER_MULTIPLY: &str = "urn:oasis:names:tc:xacml:1.0:function:integer-multiply";
const FN_INTEGER_DIVIDE: &str = "urn:oasis:names:tc:xacml:1.0:function:integer-divide";
const FN_INTEGER_MOD: &str = "urn:oasis:names:tc:xacml:1.0:function:integer-mod";
const FN_INTEGER_ABS: &str = "urn:oasis:names:tc:xacml:1.0:function:integer-abs";
const FN_DOUBLE_ADD: &str = "urn:oasis:names:tc:xacml:1.0:function:double-add";
const FN_DOUBLE_SUBTRACT: &str = "urn:oasis:names:tc:xacml:1.0:function:double-subtract";
const FN_DOUBLE_MULTIPLY: &str = "urn:oasis:names:tc:xacml:1.0:function:double-multiply";
const FN_DOUBLE_DIVIDE: &str = "urn:oasis:names:tc:xacml:1.0:function:double-divide";
const FN_DOUBLE_ABS: &str = "urn:oasis:names:tc:xacml:1.0:function:double-abs";
const FN_ROUND: &str = "urn:oasis:names:tc:xacml:1.0:function:round";
const FN_FLOOR: &str = "urn:oasis:names:tc:xacml:1.0:function:floor";
const FN_INTEGER_TO_DOUBLE: &str = "urn:oasis:names:tc:xacml:1.0:function:integer-to-double";
const FN_DOUBLE_TO_INTEGER: &str = "urn:oasis:names:tc:xacml:1.0:function:double-to-integer";

fn integer_at(id: &str, args: &[ExpressionResult], index: usize) -> Result<BigInt, Status> {
    match single(id, args, index, ids::DT_INTEGER)?.value() {
        Value::Integer(n) => Ok(n.clone()),
        _ => Err(Status::processing_error(format!(
            "{id}: argument {} is not an integer",
            index + 1
        ))),
    }
}

fn double_at(id: &str, args: &[ExpressionResult], index: usize) -> Result<f64, Status> {
    match single(id, args, index, ids::DT_DOUBLE)?.value() {
        Value::Double(d) => Ok(*d),
        _ => Err(Status::processing_error(format!(
            "{id}: argument {} is not a double",
            index + 1
        ))),
    }
}

fn integer_fold(
    id: &'static str,
    fold: fn(BigInt, BigInt) -> BigInt,
) -> impl Fn(&mut EvaluationContext<'_>, &[ExpressionResult]) -> Result<ExpressionResult, Status>
+ Send
+ Sync
+ 'static {
    move |_, args| {
        check_min_arity(id, args, 2)?;
        let mut total = integer_at(id, args, 0)?;
        for index in 1..args.len() {
            total = fold(total, integer_at(id, args, index)?);
        }
        Ok(ExpressionResult::Single(AttributeValue::integer(total)))
    }
}

fn double_fold(
    id: &'static str,
    fold: fn(f64, f64) -> f64,
) -> impl Fn(&mut EvaluationContext<'_>, &[ExpressionResult]) -> Result<ExpressionResult, Status>
+ Send
+ Sync
+ 'static {
    move |_, args| {
        check_min_arity(id, args, 2)?;
        let mut total = double_at(id, args, 0)?;
        for index in 1..args.len() {
            total = fold(total, double_at(id, args, index)?);
        }
        Ok(ExpressionResult::Single(AttributeValue::double(total)))
    }
}

pub(super) fn register(defs: &mut Vec<FunctionDefinition>) {
    defs.push(FunctionDefinition::eager(
        FN_INTEGER_ADD,
        integer_fold(FN_INTEGER_ADD, |a, b| a + b),
    ));
    defs.push(FunctionDefinition::eager(
        FN_INTEGER_MULTIPLY,
        integer_fold(FN_INTEGER_MULTIPLY, |a, b| a * b),
    ));
    defs.push(FunctionDefinition::eager(FN_INTEGER_SUBTRACT, |_, args| {
        check_arity(FN_INTEGER_SUBTRACT, args, 2)?;
        let a = integer_at(FN_INTEGER_SUBTRACT, args, 0)?;
        let b = integer_at(FN_INTEGER_SUBTRACT, args, 1)?;
        Ok(ExpressionResult::Single(AttributeValue::integer(a - b)))
    }));
    defs.push(FunctionDefinition::eager(FN_INTEGER_DIVIDE, |_, args| {
        check_arity(FN_INTEGER_DIVIDE, args, 2)?;
        let a = integer_at(FN_INTEGER_DIVIDE, args, 0)?;
        let b = integer_at(FN_INTEGER_DIVIDE, args, 1)?;
        if b.is_zero() {
            return Err(Status::processing_error("integer-divide: divide by zero"));
        }
        Ok(ExpressionResult::Single(AttributeValue::integer(a / b)))
    }));
    defs.push(FunctionDefinition::eager(FN_INTEGER_MOD, |_, args| {
        check_arity(FN_INTEGER_MOD, args, 2)?;
        let a = integer_at(FN_INTEGER_MOD, args, 0)?;
        let b = integer_at(FN_INTEGER_MOD, args, 1)?;
        if b.is_zero() {
            return Err(Status::processing_error("integer-mod: modulus by zero"));
        }
        Ok(ExpressionResult::Single(AttributeValue::integer(a % b)))
    }));
    defs.push(FunctionDefinition::eager(FN_INTEGER_ABS, |_, args| {
        check_arity(FN_INTEGER_ABS, args, 1)?;
        let a = integer_at(FN_INTEGER_ABS, args, 0)?;
        Ok(ExpressionResult::Single(AttributeValue::integer(a.abs())))
    }));

    defs.push(FunctionDefinition::eager(
        FN_DOUBLE_ADD,
        double_fold(FN_DOUBLE_ADD, |a, b| a + b),
    ));
    defs.push(FunctionDefinition::eager(
        FN_DOUBLE_MULTIPLY,
        double_fold(FN_DOUBLE_MULTIPLY, |a, b| a * b),
    ));
    defs.push(FunctionDefinition::eager(FN_DOUBLE_SUBTRACT, |_, args| {
        check_arity(FN_DOUBLE_SUBTRACT, args, 2)?;
        let a = double_at(FN_DOUBLE_SUBTRACT, args, 0)?;
        let b = double_at(FN_DOUBLE_SUBTRACT, args, 1)?;
        Ok(ExpressionResult::Single(AttributeValue::double(a - b)))
    }));
    defs.push(FunctionDefinition::eager(FN_DOUBLE_DIVIDE, |_, args| {
        check_arity(FN_DOUBLE_DIVIDE, args, 2)?;
        let a = double_at(FN_DOUBLE_DIVIDE, args, 0)?;
        let b = double_at(FN_DOUBLE_DIVIDE, args, 1)?;
        if b == 0.0 {
            return Err(Status::processing_error("double-divide: divide by zero"));
        }
        Ok(ExpressionResult::Single(AttributeValue::double(a / b)))
    }));
    defs.push(FunctionDefinition::eager(FN_DOUBLE_ABS, |_, args| {
        check_arity(FN_DOUBLE_ABS, args, 1)?;
        let a = double_at(FN_DOUBLE_ABS, args, 0)?;
        Ok(ExpressionResult::Single(AttributeValue::double(a.abs())))
    }));

    defs.push(FunctionDefinition::eager(FN_ROUND, |_, args| {
        check_arity(FN_ROUND, args, 1)?;
        let a = double_at(FN_ROUND, args, 0)?;
        Ok(ExpressionResult::Single(AttributeValue::double(a.round())))
    }));
    defs.push(FunctionDefinition::eager(FN_FLOOR, |_, args| {
        check_arity(FN_FLOOR, args, 1)?;
        let a = double_at(FN_FLOOR, args, 0)?;
        Ok(ExpressionResult::Single(AttributeValue::double(a.floor())))
    }));

    defs.push(FunctionDefinition::eager(FN_INTEGER_TO_DOUBLE, |_, args| {
        check_arity(FN_INTEGER_TO_DOUBLE, args, 1)?;
        let a = integer_at(FN_INTEGER_TO_DOUBLE, args, 0)?;
        let d = a.to_f64().ok_or_else(|| {
            Status::processing_error("integer-to-double: value out of range")
        })?;
        Ok(ExpressionResult::Single(AttributeValue::double(d)))
    }));
    defs.push(FunctionDefinition::eager(FN_DOUBLE_TO_INTEGER, |_, args| {
        check_arity(FN_DOUBLE_TO_INTEGER, args, 1)?;
        let a = double_at(FN_DOUBLE_TO_INTEGER, args, 0)?;
        let truncated = BigInt::from_f64(a.trunc()).ok_or_else(|| {
            Status::processing_error("double-to-integer: value is not a finite number")
        })?;
        Ok(ExpressionResult::Single(AttributeValue::integer(truncated)))
    }));
}
