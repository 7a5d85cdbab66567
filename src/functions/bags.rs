//! Bag and set functions, instantiated per data type. All element
//! comparisons use the data type's value equality, never container
//! identity.

use crate::context::EvaluationContext;
use crate::expr::ExpressionResult;
use crate::types::{AttributeValue, Bag, Status, ids};

use super::{FunctionDefinition, bag, boolean, check_arity, single};

/// (URN segment, data type) per bag-capable type in the subset.
const BAG_TYPES: &[(&str, &str)] = &[
    ("string", ids::DT_STRING),
    ("boolean", ids::DT_BOOLEAN),
    ("integer", ids::DT_INTEGER),
    ("double", ids::DT_DOUBLE),
    ("time", ids::DT_TIME),
    ("date", ids::DT_DATE),
    ("dateTime", ids::DT_DATE_TIME),
    ("anyURI", ids::DT_ANY_URI),
];

fn one_and_only(
    id: String,
    data_type: &'static str,
) -> impl Fn(&mut EvaluationContext<'_>, &[ExpressionResult]) -> Result<ExpressionResult, Status>
+ Send
+ Sync
+ 'static {
    move |_, args| {
        check_arity(&id, args, 1)?;
        let values = bag(&id, args, 0, Some(data_type))?;
        match values.single() {
            Some(value) => Ok(ExpressionResult::Single(value.clone())),
            None => Err(Status::processing_error(format!(
                "{id} expects a bag with a single value, got {}",
                values.size()
            ))),
        }
    }
}

fn bag_size(
    id: String,
    data_type: &'static str,
) -> impl Fn(&mut EvaluationContext<'_>, &[ExpressionResult]) -> Result<ExpressionResult, Status>
+ Send
+ Sync
+ 'static {
    move |_, args| {
        check_arity(&id, args, 1)?;
        let values = bag(&id, args, 0, Some(data_type))?;
        Ok(ExpressionResult::Single(AttributeValue::integer(
            values.size() as i64,
        )))
    }
}

fn is_in(
    id: String,
    data_type: &'static str,
) -> impl Fn(&mut EvaluationContext<'_>, &[ExpressionResult]) -> Result<ExpressionResult, Status>
+ Send
+ Sync
+ 'static {
    move |_, args| {
        check_arity(&id, args, 2)?;
        let value = single(&id, args, 0, data_type)?;
        let values = bag(&id, args, 1, Some(data_type))?;
        Ok(boolean(values.contains(value)))
    }
}

fn bag_of(
    id: String,
    data_type: &'static str,
) -> impl Fn(&mut EvaluationContext<'_>, &[ExpressionResult]) -> Result<ExpressionResult, Status>
+ Send
+ Sync
+ 'static {
    move |_, args| {
        let mut out = Bag::new();
        for index in 0..args.len() {
            out.add(single(&id, args, index, data_type)?.clone());
        }
        Ok(ExpressionResult::Bag(out))
    }
}

fn set_op(
    id: String,
    data_type: &'static str,
    op: fn(&Bag, &Bag) -> ExpressionResult,
) -> impl Fn(&mut EvaluationContext<'_>, &[ExpressionResult]) -> Result<ExpressionResult, Status>
+ Send
+ Sync
+ 'static {
    move |_, args| {
        check_arity(&id, args, 2)?;
        let a = bag(&id, args, 0, Some(data_type))?;
        let b = bag(&id, args, 1, Some(data_type))?;
        Ok(op(&a, &b))
    }
}

pub(super) fn register(defs: &mut Vec<FunctionDefinition>) {
    for &(segment, data_type) in BAG_TYPES {
        let urn = |suffix: &str| format!("urn:oasis:names:tc:xacml:1.0:function:{segment}-{suffix}");

        let id = urn("one-and-only");
        defs.push(FunctionDefinition::eager(&id, one_and_only(id.clone(), data_type)));
        let id = urn("bag-size");
        defs.push(FunctionDefinition::eager(&id, bag_size(id.clone(), data_type)));
        let id = urn("is-in");
        defs.push(FunctionDefinition::eager(&id, is_in(id.clone(), data_type)));
        let id = urn("bag");
        defs.push(FunctionDefinition::eager(&id, bag_of(id.clone(), data_type)));

        let id = urn("intersection");
        defs.push(FunctionDefinition::eager(
            &id,
            set_op(id.clone(), data_type, |a, b| {
                ExpressionResult::Bag(a.intersection(b))
            }),
        ));
        let id = urn("union");
        defs.push(FunctionDefinition::eager(
            &id,
            set_op(id.clone(), data_type, |a, b| ExpressionResult::Bag(a.union(b))),
        ));
        let id = urn("subset");
        defs.push(FunctionDefinition::eager(
            &id,
            set_op(id.clone(), data_type, |a, b| boolean(a.is_subset_of(b))),
        ));
        let id = urn("set-equals");
        defs.push(FunctionDefinition::eager(
            &id,
            set_op(id.clone(), data_type, |a, b| boolean(a.set_equals(b))),
        ));
        let id = urn("at-least-one-member-of");
        defs.push(FunctionDefinition::eager(
            &id,
            set_op(id.clone(), data_type, |a, b| {
                boolean(a.iter().any(|v| b.contains(v)))
            }),
        ));
    }
}
