//! Target matching: the boolean pre-filter deciding whether a rule, policy,
//! or policy set applies to a request at all, independent of condition
//! logic.
//!
//! A target is a conjunction of `AnyOf` groups; an `AnyOf` is a disjunction
//! of `AllOf` groups; an `AllOf` is a conjunction of `Match`es. An empty
//! target matches everything.

use serde::{Deserialize, Serialize};

use crate::context::EvaluationContext;
use crate::expr::{Expression, ExpressionResult, LexicalEnv, ValidationScope};
use crate::functions;
use crate::types::{AttributeValue, Identifier, Status};

/// The three-valued outcome of target matching.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MatchResult {
    Match,
    NoMatch,
    Indeterminate(Status),
}

/// One match test: a match function applied between a literal value and each
/// element of a retrieved bag; any true element matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    function: Identifier,
    value: AttributeValue,
    source: Expression,
}

impl Match {
    /// `source` must be a designator or selector; anything else is rejected
    /// by validation.
    pub fn new(
        function: impl Into<Identifier>,
        value: AttributeValue,
        source: Expression,
    ) -> Self {
        Match {
            function: function.into(),
            value,
            source,
        }
    }

    pub(crate) fn matches(&self, ctx: &mut EvaluationContext<'_>) -> MatchResult {
        let env = LexicalEnv::empty();
        let retrieved = match self.source.evaluate(ctx, &env) {
            ExpressionResult::Error(status) => return MatchResult::Indeterminate(status),
            ExpressionResult::Empty => return MatchResult::NoMatch,
            ExpressionResult::Single(value) => vec![value],
            ExpressionResult::Bag(bag) => bag.values().to_vec(),
        };

        let mut error: Option<Status> = None;
        for element in retrieved {
            let args = [
                ExpressionResult::Single(self.value.clone()),
                ExpressionResult::Single(element),
            ];
            let outcome = functions::invoke(ctx, &self.function, &args);
            if outcome.boolean() == Some(true) {
                return MatchResult::Match;
            }
            if error.is_none() && outcome.is_error() {
                error = Some(outcome.status());
            }
        }
        match error {
            Some(status) => MatchResult::Indeterminate(status),
            None => MatchResult::NoMatch,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Status> {
        if self.function.as_str().is_empty() {
            return Err(Status::syntax_error("match is missing its function id"));
        }
        match &self.source {
            Expression::Designator(_) | Expression::Selector(_) => {
                let mut scope = ValidationScope::new();
                self.source.validate(&mut scope)
            }
            _ => Err(Status::syntax_error(
                "match source must be an attribute designator or selector",
            )),
        }
    }
}

/// A conjunction of matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllOf {
    matches: Vec<Match>,
}

impl AllOf {
    pub fn new(matches: Vec<Match>) -> Self {
        AllOf { matches }
    }

    fn matches(&self, ctx: &mut EvaluationContext<'_>) -> MatchResult {
        let mut error: Option<Status> = None;
        for m in &self.matches {
            match m.matches(ctx) {
                MatchResult::NoMatch => return MatchResult::NoMatch,
                MatchResult::Indeterminate(status) => {
                    if error.is_none() {
                        error = Some(status);
                    }
                }
                MatchResult::Match => {}
            }
        }
        match error {
            Some(status) => MatchResult::Indeterminate(status),
            None => MatchResult::Match,
        }
    }
}

/// A disjunction of `AllOf` groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnyOf {
    all_of: Vec<AllOf>,
}

impl AnyOf {
    pub fn new(all_of: Vec<AllOf>) -> Self {
        AnyOf { all_of }
    }

    fn matches(&self, ctx: &mut EvaluationContext<'_>) -> MatchResult {
        let mut error: Option<Status> = None;
        for group in &self.all_of {
            match group.matches(ctx) {
                MatchResult::Match => return MatchResult::Match,
                MatchResult::Indeterminate(status) => {
                    if error.is_none() {
                        error = Some(status);
                    }
                }
                MatchResult::NoMatch => {}
            }
        }
        match error {
            Some(status) => MatchResult::Indeterminate(status),
            None => MatchResult::NoMatch,
        }
    }
}

/// A conjunction of `AnyOf` groups; empty matches every request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Target {
    any_of: Vec<AnyOf>,
}

impl Target {
    pub fn new(any_of: Vec<AnyOf>) -> Self {
        Target { any_of }
    }

    /// The match-everything target.
    pub fn match_all() -> Self {
        Target::default()
    }

    /// Convenience for the common single-match target.
    pub fn matching(m: Match) -> Self {
        Target::new(vec![AnyOf::new(vec![AllOf::new(vec![m])])])
    }

    pub(crate) fn matches(&self, ctx: &mut EvaluationContext<'_>) -> MatchResult {
        let mut error: Option<Status> = None;
        for group in &self.any_of {
            match group.matches(ctx) {
                MatchResult::NoMatch => return MatchResult::NoMatch,
                MatchResult::Indeterminate(status) => {
                    if error.is_none() {
                        error = Some(status);
                    }
                }
                MatchResult::Match => {}
            }
        }
        match error {
            Some(status) => MatchResult::Indeterminate(status),
            None => MatchResult::Match,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Status> {
        for any_of in &self.any_of {
            for all_of in &any_of.all_of {
                for m in &all_of.matches {
                    m.validate()?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvaluationContext;
    use crate::expr::AttributeDesignator;
    use crate::policy::PolicyFinder;
    use crate::traits::EmptyAttributeSource;
    use crate::types::{Attribute, Request, ids};

    const STRING_EQUAL: &str = "urn:oasis:names:tc:xacml:1.0:function:string-equal";

    fn action_match(action: &str) -> Match {
        Match::new(
            STRING_EQUAL,
            AttributeValue::string(action),
            Expression::Designator(AttributeDesignator::new(
                ids::CATEGORY_ACTION,
                "urn:example:action-id",
                ids::DT_STRING,
            )),
        )
    }

    fn action_request(action: &str) -> Request {
        Request::new().with_attribute(Attribute::new(
            ids::CATEGORY_ACTION,
            "urn:example:action-id",
            vec![AttributeValue::string(action)],
        ))
    }

    fn match_against(target: &Target, request: &Request) -> MatchResult {
        let finder = PolicyFinder::new(vec![]).unwrap();
        let mut ctx = EvaluationContext::new(request, &EmptyAttributeSource, &finder);
        target.matches(&mut ctx)
    }

    #[test]
    fn test_empty_target_matches_everything() {
        assert_eq!(
            match_against(&Target::match_all(), &Request::new()),
            MatchResult::Match
        );
    }

    #[test]
    fn test_single_match_hit_and_miss() {
        let target = Target::matching(action_match("read"));
        assert_eq!(
            match_against(&target, &action_request("read")),
            MatchResult::Match
        );
        assert_eq!(
            match_against(&target, &action_request("write")),
            MatchResult::NoMatch
        );
    }

    #[test]
    fn test_absent_attribute_is_no_match() {
        let target = Target::matching(action_match("read"));
        assert_eq!(
            match_against(&target, &Request::new()),
            MatchResult::NoMatch
        );
    }

    #[test]
    fn test_any_of_is_a_disjunction() {
        let target = Target::new(vec![AnyOf::new(vec![
            AllOf::new(vec![action_match("read")]),
            AllOf::new(vec![action_match("list")]),
        ])]);
        assert_eq!(
            match_against(&target, &action_request("list")),
            MatchResult::Match
        );
        assert_eq!(
            match_against(&target, &action_request("write")),
            MatchResult::NoMatch
        );
    }

    #[test]
    fn test_target_is_a_conjunction_of_any_of() {
        let target = Target::new(vec![
            AnyOf::new(vec![AllOf::new(vec![action_match("read")])]),
            AnyOf::new(vec![AllOf::new(vec![action_match("list")])]),
        ]);
        // one action value cannot satisfy both conjuncts
        assert_eq!(
            match_against(&target, &action_request("read")),
            MatchResult::NoMatch
        );
    }

    #[test]
    fn test_unknown_match_function_is_indeterminate() {
        let target = Target::matching(Match::new(
            "urn:example:function:no-such",
            AttributeValue::string("read"),
            Expression::Designator(AttributeDesignator::new(
                ids::CATEGORY_ACTION,
                "urn:example:action-id",
                ids::DT_STRING,
            )),
        ));
        assert!(matches!(
            match_against(&target, &action_request("read")),
            MatchResult::Indeterminate(_)
        ));
    }

    #[test]
    fn test_validate_rejects_non_retrieval_source() {
        let m = Match::new(
            STRING_EQUAL,
            AttributeValue::string("read"),
            Expression::literal(AttributeValue::string("read")),
        );
        assert!(m.validate().is_err());
    }
}
