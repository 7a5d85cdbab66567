//! Order comparisons for the orderable types, four operators per type.

use std::cmp::Ordering;

use crate::context::EvaluationContext;
use crate::expr::ExpressionResult;
use crate::types::{Status, ids};

use super::{FunctionDefinition, boolean, check_arity, single};

/// (URN segment, data type) per orderable type.
const ORDERED: &[(&str, &str)] = &[
    ("string", ids::DT_STRING),
    ("integer", ids::DT_INTEGER),
    ("double", ids::DT_DOUBLE),
    ("time", ids::DT_TIME),
    ("date", ids::DT_DATE),
    ("dateTime", ids::DT_DATE_TIME),
];

const OPERATORS: &[(&str, fn(Ordering) -> bool)] = &[
    ("greater-than", |o| o == Ordering::Greater),
    ("greater-than-or-equal", |o| o != Ordering::Less),
    ("less-than", |o| o == Ordering::Less),
    ("less-than-or-equal", |o| o != Ordering::Greater),
];

fn compare_body(
    id: String,
    data_type: &'static str,
    test: fn(Ordering) -> bool,
) -> impl Fn(&mut EvaluationContext<'_>, &[ExpressionResult]) -> Result<ExpressionResult, Status>
+ Send
+ Sync
+ 'static {
    move |_, args| {
        check_arity(&id, args, 2)?;
        let a = single(&id, args, 0, data_type)?;
        let b = single(&id, args, 1, data_type)?;
        match a.value().partial_cmp_same_type(b.value()) {
            Some(ordering) => Ok(boolean(test(ordering))),
            None => Err(Status::processing_error(format!(
                "{id}: values are not comparable"
            ))),
        }
    }
}

pub(super) fn register(defs: &mut Vec<FunctionDefinition>) {
    for &(segment, data_type) in ORDERED {
        for &(operator, test) in OPERATORS {
            let id = format!("urn:oasis:names:tc:xacml:1.0:function:{segment}-{operator}");
            defs.push(FunctionDefinition::eager(
                &id,
                compare_body(id.clone(), data_type, test),
            ));
        }
    }
}
