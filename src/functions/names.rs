//! Regular-expression matching and the X.500 / RFC 822 name-matching
//! functions.

use regex::Regex;

use crate::context::EvaluationContext;
use crate::expr::ExpressionResult;
use crate::types::{Status, Value, ids};

use super::{FunctionDefinition, boolean, check_arity, single};

const FN_STRING_REGEXP: &str = "urn:oasis:names:tc:xacml:1.0:function:string-regexp-match";
const FN_ANY_URI_REGEXP: &str = "urn:oasis:names:tc:xacml:2.0:function:anyURI-regexp-match";
const FN_RFC822_REGEXP: &str =
    "urn:oasis:names:tc:xacml:2.0:function:rfc822Name-regexp-match";
const FN_RFC822_MATCH: &str = "urn:oasis:names:tc:xacml:1.0:function:rfc822Name-match";
const FN_X500_MATCH: &str = "urn:oasis:names:tc:xacml:1.0:function:x500Name-match";

/// XML Schema regular expressions match the whole string, so the pattern is
/// anchored before compiling.
fn whole_string_match(id: &str, pattern: &str, value: &str) -> Result<bool, Status> {
    let regex = Regex::new(&format!("^(?:{pattern})$"))
        .map_err(|e| Status::processing_error(format!("{id}: invalid pattern: {e}")))?;
    Ok(regex.is_match(value))
}

fn regexp_body(
    id: &'static str,
    value_type: &'static str,
) -> impl Fn(&mut EvaluationContext<'_>, &[ExpressionResult]) -> Result<ExpressionResult, Status>
+ Send
+ Sync
+ 'static {
    move |_, args| {
        check_arity(id, args, 2)?;
        let pattern = single(id, args, 0, ids::DT_STRING)?
            .as_string()
            .ok_or_else(|| Status::processing_error(format!("{id}: pattern must be a string")))?
            .to_string();
        let value = single(id, args, 1, value_type)?.to_string();
        Ok(boolean(whole_string_match(id, &pattern, &value)?))
    }
}

pub(super) fn register(defs: &mut Vec<FunctionDefinition>) {
    defs.push(FunctionDefinition::eager(
        FN_STRING_REGEXP,
        regexp_body(FN_STRING_REGEXP, ids::DT_STRING),
    ));
    defs.push(FunctionDefinition::eager(
        FN_ANY_URI_REGEXP,
        regexp_body(FN_ANY_URI_REGEXP, ids::DT_ANY_URI),
    ));
    defs.push(FunctionDefinition::eager(
        FN_RFC822_REGEXP,
        regexp_body(FN_RFC822_REGEXP, ids::DT_RFC822_NAME),
    ));

    // Three pattern forms: "anne@sun.com" (whole mailbox), "sun.com" (exact
    // domain), ".east.sun.com" (domain suffix).
    defs.push(FunctionDefinition::eager(FN_RFC822_MATCH, |_, args| {
        check_arity(FN_RFC822_MATCH, args, 2)?;
        let pattern = single(FN_RFC822_MATCH, args, 0, ids::DT_STRING)?
            .as_string()
            .ok_or_else(|| {
                Status::processing_error(format!("{FN_RFC822_MATCH}: pattern must be a string"))
            })?;
        let Value::Rfc822Name(name) = single(FN_RFC822_MATCH, args, 1, ids::DT_RFC822_NAME)?.value()
        else {
            return Err(Status::processing_error(format!(
                "{FN_RFC822_MATCH}: second argument must be an rfc822Name"
            )));
        };

        let matched = if let Some((local, domain)) = pattern.split_once('@') {
            name.local() == local && name.domain().eq_ignore_ascii_case(domain)
        } else if let Some(suffix) = pattern.strip_prefix('.') {
            name.domain()
                .to_ascii_lowercase()
                .ends_with(&format!(".{}", suffix.to_ascii_lowercase()))
        } else {
            name.domain().eq_ignore_ascii_case(pattern)
        };
        Ok(boolean(matched))
    }));

    // true when the first name is a suffix of the second's RDN sequence
    defs.push(FunctionDefinition::eager(FN_X500_MATCH, |_, args| {
        check_arity(FN_X500_MATCH, args, 2)?;
        let Value::X500Name(wanted) = single(FN_X500_MATCH, args, 0, ids::DT_X500_NAME)?.value()
        else {
            return Err(Status::processing_error(format!(
                "{FN_X500_MATCH}: first argument must be an x500Name"
            )));
        };
        let Value::X500Name(name) = single(FN_X500_MATCH, args, 1, ids::DT_X500_NAME)?.value()
        else {
            return Err(Status::processing_error(format!(
                "{FN_X500_MATCH}: second argument must be an x500Name"
            )));
        };
        let wanted = wanted.rdns();
        let name = name.rdns();
        let matched = wanted.len() <= name.len() && name[name.len() - wanted.len()..] == wanted[..];
        Ok(boolean(matched))
    }));
}
