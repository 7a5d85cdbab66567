//! Per-type equality. One entry per data type, all sharing the strict
//! two-argument shape: mismatched argument types are an error at
//! argument-check time, never a `false`.

use crate::context::EvaluationContext;
use crate::expr::ExpressionResult;
use crate::types::{Status, ids};

use super::{FunctionDefinition, boolean, check_arity, single};

const EQUAL: &[(&str, &str)] = &[
    ("urn:oasis:names:tc:xacml:1.0:function:string-equal", ids::DT_STRING),
    ("urn:oasis:names:tc:xacml:1.0:function:boolean-equal", ids::DT_BOOLEAN),
    ("urn:oasis:names:tc:xacml:1.0:function:integer-equal", ids::DT_INTEGER),
    ("urn:oasis:names:tc:xacml:1.0:function:double-equal", ids::DT_DOUBLE),
    ("urn:oasis:names:tc:xacml:1.0:function:date-equal", ids::DT_DATE),
    ("urn:oasis:names:tc:xacml:1.0:function:time-equal", ids::DT_TIME),
    ("urn:oasis:names:tc:xacml:1.0:function:dateTime-equal", ids::DT_DATE_TIME),
    (
        "urn:oasis:names:tc:xacml:3.0:function:dayTimeDuration-equal",
        ids::DT_DAY_TIME_DURATION,
    ),
    (
        "urn:oasis:names:tc:xacml:3.0:function:yearMonthDuration-equal",
        ids::DT_YEAR_MONTH_DURATION,
    ),
    ("urn:oasis:names:tc:xacml:1.0:function:anyURI-equal", ids::DT_ANY_URI),
    ("urn:oasis:names:tc:xacml:1.0:function:x500Name-equal", ids::DT_X500_NAME),
    ("urn:oasis:names:tc:xacml:1.0:function:rfc822Name-equal", ids::DT_RFC822_NAME),
    ("urn:oasis:names:tc:xacml:1.0:function:hexBinary-equal", ids::DT_HEX_BINARY),
    ("urn:oasis:names:tc:xacml:1.0:function:base64Binary-equal", ids::DT_BASE64_BINARY),
];

const FN_STRING_EQUAL_IGNORE_CASE: &str =
    "urn:oasis:names:tc:xacml:3.0:function:string-equal-ignore-case";

fn equal_body(
    id: &'static str,
    data_type: &'static str,
) -> impl Fn(&mut EvaluationContext<'_>, &[ExpressionResult]) -> Result<ExpressionResult, Status>
+ Send
+ Sync
+ 'static {
    move |_, args| {
        check_arity(id, args, 2)?;
        let a = single(id, args, 0, data_type)?;
        let b = single(id, args, 1, data_type)?;
        Ok(boolean(a.value() == b.value()))
    }
}

pub(super) fn register(defs: &mut Vec<FunctionDefinition>) {
    for &(id, data_type) in EQUAL {
        defs.push(FunctionDefinition::eager(id, equal_body(id, data_type)));
    }

    defs.push(FunctionDefinition::eager(
        FN_STRING_EQUAL_IGNORE_CASE,
        |_, args| {
            check_arity(FN_STRING_EQUAL_IGNORE_CASE, args, 2)?;
            let a = single(FN_STRING_EQUAL_IGNORE_CASE, args, 0, ids::DT_STRING)?;
            let b = single(FN_STRING_EQUAL_IGNORE_CASE, args, 1, ids::DT_STRING)?;
            match (a.as_string(), b.as_string()) {
                (Some(a), Some(b)) => Ok(boolean(a.to_lowercase() == b.to_lowercase())),
                _ => Err(Status::processing_error(format!(
                    "{FN_STRING_EQUAL_IGNORE_CASE}: arguments must be strings"
                ))),
            }
        },
    ));
}
