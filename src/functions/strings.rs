//! String functions.

use crate::expr::ExpressionResult;
use crate::types::{AttributeValue, Status, ids};

use super::{FunctionDefinition, boolean, check_arity, check_min_arity, single};

const FN_CONCATENATE: &str = "urn:oasis:names:tc:xacml:2.0:function:string-concatenate";
const FN_NORMALIZE_SPACE: &str =
    "urn:oasis:names:tc:xacml:1.0:function:string-normalize-space";
const FN_NORMALIZE_LOWER: &str =
    "urn:oasis:names:tc:xacml:1.0:function:string-normalize-to-lower-case";
const FN_STARTS_WITH: &str = "urn:oasis:names:tc:xacml:3.0:function:string-starts-with";
const FN_ENDS_WITH: &str = "urn:oasis:names:tc:xacml:3.0:function:string-ends-with";
const FN_CONTAINS: &str = "urn:oasis:names:tc:xacml:3.0:function:string-contains";

fn string_at<'a>(
    id: &str,
    args: &'a [crate::expr::ExpressionResult],
    index: usize,
) -> Result<&'a str, Status> {
    single(id, args, index, ids::DT_STRING)?
        .as_string()
        .ok_or_else(|| {
            Status::processing_error(format!("{id}: argument {} is not a string", index + 1))
        })
}

pub(super) fn register(defs: &mut Vec<FunctionDefinition>) {
    defs.push(FunctionDefinition::eager(FN_CONCATENATE, |_, args| {
        check_min_arity(FN_CONCATENATE, args, 2)?;
        let mut out = String::new();
        for index in 0..args.len() {
            out.push_str(string_at(FN_CONCATENATE, args, index)?);
        }
        Ok(ExpressionResult::Single(AttributeValue::string(out)))
    }));

    defs.push(FunctionDefinition::eager(FN_NORMALIZE_SPACE, |_, args| {
        check_arity(FN_NORMALIZE_SPACE, args, 1)?;
        let value = string_at(FN_NORMALIZE_SPACE, args, 0)?;
        Ok(ExpressionResult::Single(AttributeValue::string(
            value.trim(),
        )))
    }));

    defs.push(FunctionDefinition::eager(FN_NORMALIZE_LOWER, |_, args| {
        check_arity(FN_NORMALIZE_LOWER, args, 1)?;
        let value = string_at(FN_NORMALIZE_LOWER, args, 0)?;
        Ok(ExpressionResult::Single(AttributeValue::string(
            value.to_lowercase(),
        )))
    }));

    // for the 3.0 substring tests the needle is the first argument
    defs.push(FunctionDefinition::eager(FN_STARTS_WITH, |_, args| {
        check_arity(FN_STARTS_WITH, args, 2)?;
        let needle = string_at(FN_STARTS_WITH, args, 0)?;
        let haystack = string_at(FN_STARTS_WITH, args, 1)?;
        Ok(boolean(haystack.starts_with(needle)))
    }));

    defs.push(FunctionDefinition::eager(FN_ENDS_WITH, |_, args| {
        check_arity(FN_ENDS_WITH, args, 2)?;
        let needle = string_at(FN_ENDS_WITH, args, 0)?;
        let haystack = string_at(FN_ENDS_WITH, args, 1)?;
        Ok(boolean(haystack.ends_with(needle)))
    }));

    defs.push(FunctionDefinition::eager(FN_CONTAINS, |_, args| {
        check_arity(FN_CONTAINS, args, 2)?;
        let needle = string_at(FN_CONTAINS, args, 0)?;
        let haystack = string_at(FN_CONTAINS, args, 1)?;
        Ok(boolean(haystack.contains(needle)))
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvaluationContext;
    use crate::expr::{Expression, LexicalEnv};
    use crate::policy::PolicyFinder;
    use crate::traits::EmptyAttributeSource;
    use crate::types::Request;
    use yare::parameterized;

    fn s(value: &str) -> Expression {
        Expression::literal(AttributeValue::string(value))
    }

    fn eval(expression: &Expression) -> ExpressionResult {
        let request = Request::new();
        let finder = PolicyFinder::new(vec![]).unwrap();
        let mut ctx = EvaluationContext::new(&request, &EmptyAttributeSource, &finder);
        let env = LexicalEnv::empty();
        expression.evaluate(&mut ctx, &env)
    }

    #[test]
    fn test_concatenate() {
        let expression = Expression::apply(FN_CONCATENATE, vec![s("foo"), s("-"), s("bar")]);
        assert_eq!(
            eval(&expression),
            ExpressionResult::Single(AttributeValue::string("foo-bar"))
        );
    }

    #[parameterized(
        starts_hit = { FN_STARTS_WITH, "web", "web-01", true },
        starts_miss = { FN_STARTS_WITH, "db", "web-01", false },
        ends_hit = { FN_ENDS_WITH, ".com", "example.com", true },
        contains_hit = { FN_CONTAINS, "amp", "example", true },
        contains_miss = { FN_CONTAINS, "xyz", "example", false },
    )]
    fn test_substring_tests(function: &str, needle: &str, haystack: &str, expected: bool) {
        let expression = Expression::apply(function, vec![s(needle), s(haystack)]);
        assert_eq!(eval(&expression).boolean(), Some(expected));
    }

    #[test]
    fn test_normalizers() {
        assert_eq!(
            eval(&Expression::apply(FN_NORMALIZE_SPACE, vec![s("  x  ")])),
            ExpressionResult::Single(AttributeValue::string("x"))
        );
        assert_eq!(
            eval(&Expression::apply(FN_NORMALIZE_LOWER, vec![s("MiXeD")])),
            ExpressionResult::Single(AttributeValue::string("mixed"))
        );
    }
}
