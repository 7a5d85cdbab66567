//! Rule- and policy-combining algorithms.
//!
//! One closed enum covers both levels; the two URN tables below map each
//! standard algorithm id onto it. A child is target-matched before it is
//! evaluated — NoMatch children are skipped unevaluated — and obligations
//! survive combination only when their child's decision equals the combined
//! decision. That filtering is shared here, not re-implemented per
//! algorithm.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use strum_macros::Display as StrumDisplay;
use tracing::trace;

use crate::context::EvaluationContext;
use crate::policy::MatchResult;
use crate::types::{
    Advice, Decision, Effect, ExtendedIndeterminate, Identifier, Obligation, Status,
};

/// A child decision together with its supporting output.
#[derive(Debug, Clone)]
pub(crate) struct Evaluation {
    pub decision: Decision,
    pub status: Status,
    pub obligations: Vec<Obligation>,
    pub advice: Vec<Advice>,
}

impl Evaluation {
    pub(crate) fn new(decision: Decision, status: Status) -> Self {
        Evaluation {
            decision,
            status,
            obligations: Vec::new(),
            advice: Vec::new(),
        }
    }

    pub(crate) fn not_applicable() -> Self {
        Evaluation::new(Decision::NotApplicable, Status::ok())
    }

    pub(crate) fn indeterminate(extended: ExtendedIndeterminate, status: Status) -> Self {
        Evaluation::new(Decision::Indeterminate(extended), status)
    }
}

/// One element a combining algorithm reduces: a rule, an inline policy or
/// policy set, or a policy reference.
pub(crate) trait Combinable {
    fn match_target(&self, ctx: &mut EvaluationContext<'_>) -> MatchResult;
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> Evaluation;
    /// The child's contribution when its own target evaluation failed.
    fn target_failure(&self, status: Status) -> Evaluation;
}

/// The closed set of combining algorithms, shared by the rule and policy
/// levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay)]
#[strum(serialize_all = "kebab-case")]
pub enum CombiningAlgorithm {
    DenyOverrides,
    PermitOverrides,
    DenyUnlessPermit,
    PermitUnlessDeny,
    FirstApplicable,
    OnlyOneApplicable,
    /// XACML 1.0 deny-overrides: an indeterminate child is elevated straight
    /// to Deny, no D/P sub-codes.
    LegacyDenyOverrides,
    /// XACML 1.0 permit-overrides: Permit wins; otherwise Deny beats a
    /// remembered Indeterminate.
    LegacyPermitOverrides,
}

const RULE_ALGORITHMS: &[(&str, CombiningAlgorithm)] = &[
    (
        "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:deny-overrides",
        CombiningAlgorithm::DenyOverrides,
    ),
    (
        "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:ordered-deny-overrides",
        CombiningAlgorithm::DenyOverrides,
    ),
    (
        "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:permit-overrides",
        CombiningAlgorithm::PermitOverrides,
    ),
    (
        "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:ordered-permit-overrides",
        CombiningAlgorithm::PermitOverrides,
    ),
    (
        "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:deny-unless-permit",
        CombiningAlgorithm::DenyUnlessPermit,
    ),
    (
        "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:permit-unless-deny",
        CombiningAlgorithm::PermitUnlessDeny,
    ),
    (
        "urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:first-applicable",
        CombiningAlgorithm::FirstApplicable,
    ),
    (
        "urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:deny-overrides",
        CombiningAlgorithm::LegacyDenyOverrides,
    ),
    (
        "urn:oasis:names:tc:xacml:1.1:rule-combining-algorithm:ordered-deny-overrides",
        CombiningAlgorithm::LegacyDenyOverrides,
    ),
    (
        "urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:permit-overrides",
        CombiningAlgorithm::LegacyPermitOverrides,
    ),
    (
        "urn:oasis:names:tc:xacml:1.1:rule-combining-algorithm:ordered-permit-overrides",
        CombiningAlgorithm::LegacyPermitOverrides,
    ),
];

const POLICY_ALGORITHMS: &[(&str, CombiningAlgorithm)] = &[
    (
        "urn:oasis:names:tc:xacml:3.0:policy-combining-algorithm:deny-overrides",
        CombiningAlgorithm::DenyOverrides,
    ),
    (
        "urn:oasis:names:tc:xacml:3.0:policy-combining-algorithm:ordered-deny-overrides",
        CombiningAlgorithm::DenyOverrides,
    ),
    (
        "urn:oasis:names:tc:xacml:3.0:policy-combining-algorithm:permit-overrides",
        CombiningAlgorithm::PermitOverrides,
    ),
    (
        "urn:oasis:names:tc:xacml:3.0:policy-combining-algorithm:ordered-permit-overrides",
        CombiningAlgorithm::PermitOverrides,
    ),
    (
        "urn:oasis:names:tc:xacml:3.0:policy-combining-algorithm:deny-unless-permit",
        CombiningAlgorithm::DenyUnlessPermit,
    ),
    (
        "urn:oasis:names:tc:xacml:3.0:policy-combining-algorithm:permit-unless-deny",
        CombiningAlgorithm::PermitUnlessDeny,
    ),
    (
        "urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:first-applicable",
        CombiningAlgorithm::FirstApplicable,
    ),
    (
        "urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:only-one-applicable",
        CombiningAlgorithm::OnlyOneApplicable,
    ),
    (
        "urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:deny-overrides",
        CombiningAlgorithm::LegacyDenyOverrides,
    ),
    (
        "urn:oasis:names:tc:xacml:1.1:policy-combining-algorithm:ordered-deny-overrides",
        CombiningAlgorithm::LegacyDenyOverrides,
    ),
    (
        "urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:permit-overrides",
        CombiningAlgorithm::LegacyPermitOverrides,
    ),
    (
        "urn:oasis:names:tc:xacml:1.1:policy-combining-algorithm:ordered-permit-overrides",
        CombiningAlgorithm::LegacyPermitOverrides,
    ),
];

static RULE_TABLE: Lazy<HashMap<Identifier, CombiningAlgorithm>> = Lazy::new(|| {
    RULE_ALGORITHMS
        .iter()
        .map(|(id, alg)| (Identifier::from(*id), *alg))
        .collect()
});

static POLICY_TABLE: Lazy<HashMap<Identifier, CombiningAlgorithm>> = Lazy::new(|| {
    POLICY_ALGORITHMS
        .iter()
        .map(|(id, alg)| (Identifier::from(*id), *alg))
        .collect()
});

pub(crate) fn rule_algorithm(id: &Identifier) -> Option<CombiningAlgorithm> {
    RULE_TABLE.get(id).copied()
}

pub(crate) fn policy_algorithm(id: &Identifier) -> Option<CombiningAlgorithm> {
    POLICY_TABLE.get(id).copied()
}

/// Target-match the child, then evaluate it. `None` means NoMatch: the child
/// is skipped without being evaluated.
fn child_evaluation<C: Combinable>(
    ctx: &mut EvaluationContext<'_>,
    child: &C,
) -> Option<Evaluation> {
    match child.match_target(ctx) {
        MatchResult::NoMatch => None,
        MatchResult::Match => Some(child.evaluate(ctx)),
        MatchResult::Indeterminate(status) => Some(child.target_failure(status)),
    }
}

impl CombiningAlgorithm {
    pub(crate) fn combine<C: Combinable>(
        self,
        ctx: &mut EvaluationContext<'_>,
        children: &[C],
    ) -> Evaluation {
        let combined = match self {
            CombiningAlgorithm::DenyOverrides => override_combine(ctx, children, Effect::Deny),
            CombiningAlgorithm::PermitOverrides => override_combine(ctx, children, Effect::Permit),
            CombiningAlgorithm::DenyUnlessPermit => unless_combine(ctx, children, Effect::Permit),
            CombiningAlgorithm::PermitUnlessDeny => unless_combine(ctx, children, Effect::Deny),
            CombiningAlgorithm::FirstApplicable => first_applicable(ctx, children),
            CombiningAlgorithm::OnlyOneApplicable => only_one_applicable(ctx, children),
            CombiningAlgorithm::LegacyDenyOverrides => {
                legacy_override(ctx, children, Effect::Deny)
            }
            CombiningAlgorithm::LegacyPermitOverrides => {
                legacy_override(ctx, children, Effect::Permit)
            }
        };
        trace!(event = "Combine", algorithm = %self, decision = %combined.decision);
        combined
    }
}

/// XACML 3.0 deny-overrides / permit-overrides, parameterized by the
/// overriding effect. Tracks which indeterminate branches were seen so the
/// result carries the precise D/P sub-code.
fn override_combine<C: Combinable>(
    ctx: &mut EvaluationContext<'_>,
    children: &[C],
    overriding: Effect,
) -> Evaluation {
    let overriding_decision = overriding.decision();
    let other_decision = overriding.opposite().decision();
    let overriding_branch = ExtendedIndeterminate::for_effect(overriding);
    let other_branch = ExtendedIndeterminate::for_effect(overriding.opposite());

    let mut saw_other = false;
    let mut other_obligations: Vec<Obligation> = Vec::new();
    let mut other_advice: Vec<Advice> = Vec::new();
    let mut error_overriding: Option<Status> = None;
    let mut error_other: Option<Status> = None;
    let mut error_both: Option<Status> = None;

    for child in children {
        let Some(evaluation) = child_evaluation(ctx, child) else {
            continue;
        };
        match evaluation.decision {
            decision if decision == overriding_decision => return evaluation,
            decision if decision == other_decision => {
                saw_other = true;
                other_obligations.extend(evaluation.obligations);
                other_advice.extend(evaluation.advice);
            }
            Decision::Indeterminate(extended) => {
                let slot = if extended == ExtendedIndeterminate::DenyOrPermit {
                    &mut error_both
                } else if extended == overriding_branch {
                    &mut error_overriding
                } else {
                    &mut error_other
                };
                if slot.is_none() {
                    *slot = Some(evaluation.status);
                }
            }
            _ => {} // NotApplicable
        }
    }

    if let Some(status) = error_both {
        return Evaluation::indeterminate(ExtendedIndeterminate::DenyOrPermit, status);
    }
    if let Some(status) = error_overriding {
        if saw_other || error_other.is_some() {
            return Evaluation::indeterminate(ExtendedIndeterminate::DenyOrPermit, status);
        }
        return Evaluation::indeterminate(overriding_branch, status);
    }
    if saw_other {
        let mut evaluation = Evaluation::new(other_decision, Status::ok());
        evaluation.obligations = other_obligations;
        evaluation.advice = other_advice;
        return evaluation;
    }
    if let Some(status) = error_other {
        return Evaluation::indeterminate(other_branch, status);
    }
    Evaluation::not_applicable()
}

/// deny-unless-permit / permit-unless-deny: the winning effect returns
/// immediately, anything else collapses into the default. Never
/// NotApplicable or Indeterminate.
fn unless_combine<C: Combinable>(
    ctx: &mut EvaluationContext<'_>,
    children: &[C],
    winning: Effect,
) -> Evaluation {
    let winning_decision = winning.decision();
    let default_decision = winning.opposite().decision();
    let mut default_obligations: Vec<Obligation> = Vec::new();
    let mut default_advice: Vec<Advice> = Vec::new();

    for child in children {
        let Some(evaluation) = child_evaluation(ctx, child) else {
            continue;
        };
        if evaluation.decision == winning_decision {
            return evaluation;
        }
        if evaluation.decision == default_decision {
            default_obligations.extend(evaluation.obligations);
            default_advice.extend(evaluation.advice);
        }
    }

    let mut evaluation = Evaluation::new(default_decision, Status::ok());
    evaluation.obligations = default_obligations;
    evaluation.advice = default_advice;
    evaluation
}

/// The first child whose target matches and whose decision is not
/// NotApplicable wins.
fn first_applicable<C: Combinable>(
    ctx: &mut EvaluationContext<'_>,
    children: &[C],
) -> Evaluation {
    for child in children {
        match child.match_target(ctx) {
            MatchResult::NoMatch => continue,
            MatchResult::Indeterminate(status) => return child.target_failure(status),
            MatchResult::Match => {
                let evaluation = child.evaluate(ctx);
                if evaluation.decision != Decision::NotApplicable {
                    return evaluation;
                }
            }
        }
    }
    Evaluation::not_applicable()
}

/// Exactly one child's target may match; the matching child's decision is
/// the result.
fn only_one_applicable<C: Combinable>(
    ctx: &mut EvaluationContext<'_>,
    children: &[C],
) -> Evaluation {
    let mut applicable: Option<&C> = None;
    for child in children {
        match child.match_target(ctx) {
            MatchResult::NoMatch => continue,
            MatchResult::Indeterminate(status) => {
                return Evaluation::indeterminate(ExtendedIndeterminate::DenyOrPermit, status);
            }
            MatchResult::Match => {
                if applicable.is_some() {
                    return Evaluation::indeterminate(
                        ExtendedIndeterminate::DenyOrPermit,
                        Status::processing_error("more than one applicable policy"),
                    );
                }
                applicable = Some(child);
            }
        }
    }
    match applicable {
        Some(child) => child.evaluate(ctx),
        None => Evaluation::not_applicable(),
    }
}

/// The XACML 1.0 override algorithms. For deny-overrides an indeterminate
/// child is elevated straight to Deny; for permit-overrides it is remembered
/// and reported only when nothing else applied, without D/P sub-codes.
fn legacy_override<C: Combinable>(
    ctx: &mut EvaluationContext<'_>,
    children: &[C],
    overriding: Effect,
) -> Evaluation {
    let overriding_decision = overriding.decision();
    let other_decision = overriding.opposite().decision();
    let mut saw_other = false;
    let mut other_obligations: Vec<Obligation> = Vec::new();
    let mut other_advice: Vec<Advice> = Vec::new();
    let mut error: Option<Status> = None;

    for child in children {
        let Some(evaluation) = child_evaluation(ctx, child) else {
            continue;
        };
        match evaluation.decision {
            decision if decision == overriding_decision => return evaluation,
            decision if decision == other_decision => {
                saw_other = true;
                other_obligations.extend(evaluation.obligations);
                other_advice.extend(evaluation.advice);
            }
            Decision::Indeterminate(_) => {
                if overriding == Effect::Deny {
                    // 1.0: an error while any rule could still deny denies
                    return Evaluation::new(Decision::Deny, Status::ok());
                }
                if error.is_none() {
                    error = Some(evaluation.status);
                }
            }
            _ => {} // NotApplicable
        }
    }

    if saw_other {
        let mut evaluation = Evaluation::new(other_decision, Status::ok());
        evaluation.obligations = other_obligations;
        evaluation.advice = other_advice;
        return evaluation;
    }
    if let Some(status) = error {
        return Evaluation::indeterminate(ExtendedIndeterminate::DenyOrPermit, status);
    }
    Evaluation::not_applicable()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvaluationContext;
    use crate::policy::PolicyFinder;
    use crate::traits::EmptyAttributeSource;
    use crate::types::Request;
    use yare::parameterized;

    /// A combinable stub with a fixed target result and decision.
    struct Child {
        matches: MatchResult,
        evaluation: Evaluation,
    }

    impl Child {
        fn deciding(decision: Decision) -> Self {
            Child {
                matches: MatchResult::Match,
                evaluation: Evaluation::new(decision, Status::ok()),
            }
        }

        fn no_match() -> Self {
            Child {
                matches: MatchResult::NoMatch,
                evaluation: Evaluation::not_applicable(),
            }
        }

        fn with_obligation(mut self, id: &str) -> Self {
            self.evaluation.obligations.push(Obligation {
                id: Identifier::from(id),
                assignments: vec![],
            });
            self
        }
    }

    impl Combinable for Child {
        fn match_target(&self, _ctx: &mut EvaluationContext<'_>) -> MatchResult {
            self.matches.clone()
        }

        fn evaluate(&self, _ctx: &mut EvaluationContext<'_>) -> Evaluation {
            self.evaluation.clone()
        }

        fn target_failure(&self, status: Status) -> Evaluation {
            Evaluation::indeterminate(ExtendedIndeterminate::DenyOrPermit, status)
        }
    }

    fn combine(algorithm: CombiningAlgorithm, children: &[Child]) -> Evaluation {
        let request = Request::new();
        let finder = PolicyFinder::new(vec![]).unwrap();
        let mut ctx = EvaluationContext::new(&request, &EmptyAttributeSource, &finder);
        algorithm.combine(&mut ctx, children)
    }

    use Decision::{Deny, NotApplicable, Permit};

    fn ind(extended: ExtendedIndeterminate) -> Decision {
        Decision::Indeterminate(extended)
    }

    #[parameterized(
        deny_wins = {
            CombiningAlgorithm::DenyOverrides,
            vec![NotApplicable, Permit, Deny, Permit],
            Deny,
        },
        permit_without_deny = {
            CombiningAlgorithm::DenyOverrides,
            vec![NotApplicable, Permit],
            Permit,
        },
        all_inapplicable = {
            CombiningAlgorithm::DenyOverrides,
            vec![NotApplicable, NotApplicable],
            NotApplicable,
        },
        permit_wins = {
            CombiningAlgorithm::PermitOverrides,
            vec![NotApplicable, Deny, Permit],
            Permit,
        },
        deny_without_permit = {
            CombiningAlgorithm::PermitOverrides,
            vec![NotApplicable, Deny],
            Deny,
        },
        first_applicable_takes_first_decision = {
            CombiningAlgorithm::FirstApplicable,
            vec![NotApplicable, Permit, Deny],
            Permit,
        },
        deny_unless_permit_defaults = {
            CombiningAlgorithm::DenyUnlessPermit,
            vec![NotApplicable],
            Deny,
        },
        deny_unless_permit_finds_permit = {
            CombiningAlgorithm::DenyUnlessPermit,
            vec![Deny, Permit],
            Permit,
        },
        permit_unless_deny_defaults = {
            CombiningAlgorithm::PermitUnlessDeny,
            vec![NotApplicable],
            Permit,
        },
    )]
    fn test_combining_tables(
        algorithm: CombiningAlgorithm,
        decisions: Vec<Decision>,
        expected: Decision,
    ) {
        let children: Vec<Child> = decisions.into_iter().map(Child::deciding).collect();
        assert_eq!(combine(algorithm, &children).decision, expected);
    }

    #[test]
    fn test_deny_overrides_indeterminate_d_blocks_permit() {
        let children = vec![
            Child::deciding(ind(ExtendedIndeterminate::Deny)),
            Child::deciding(Permit),
        ];
        assert_eq!(
            combine(CombiningAlgorithm::DenyOverrides, &children).decision,
            ind(ExtendedIndeterminate::DenyOrPermit)
        );
    }

    #[test]
    fn test_deny_overrides_indeterminate_d_alone() {
        let children = vec![
            Child::deciding(ind(ExtendedIndeterminate::Deny)),
            Child::deciding(NotApplicable),
        ];
        assert_eq!(
            combine(CombiningAlgorithm::DenyOverrides, &children).decision,
            ind(ExtendedIndeterminate::Deny)
        );
    }

    #[test]
    fn test_deny_overrides_indeterminate_p_with_no_permit() {
        let children = vec![Child::deciding(ind(ExtendedIndeterminate::Permit))];
        assert_eq!(
            combine(CombiningAlgorithm::DenyOverrides, &children).decision,
            ind(ExtendedIndeterminate::Permit)
        );
    }

    #[test]
    fn test_unless_algorithms_never_indeterminate() {
        let children = vec![Child::deciding(ind(ExtendedIndeterminate::DenyOrPermit))];
        assert_eq!(
            combine(CombiningAlgorithm::DenyUnlessPermit, &children).decision,
            Deny
        );
        assert_eq!(
            combine(CombiningAlgorithm::PermitUnlessDeny, &children).decision,
            Permit
        );
    }

    #[test]
    fn test_no_match_children_are_skipped() {
        let children = vec![Child::no_match(), Child::deciding(Permit)];
        assert_eq!(
            combine(CombiningAlgorithm::FirstApplicable, &children).decision,
            Permit
        );
    }

    #[test]
    fn test_only_one_applicable() {
        let both_match = vec![Child::deciding(Permit), Child::deciding(Deny)];
        let result = combine(CombiningAlgorithm::OnlyOneApplicable, &both_match);
        assert_eq!(result.decision, ind(ExtendedIndeterminate::DenyOrPermit));
        assert!(!result.status.is_ok());

        let one_match = vec![Child::no_match(), Child::deciding(Deny)];
        assert_eq!(
            combine(CombiningAlgorithm::OnlyOneApplicable, &one_match).decision,
            Deny
        );

        let no_match = vec![Child::no_match()];
        assert_eq!(
            combine(CombiningAlgorithm::OnlyOneApplicable, &no_match).decision,
            NotApplicable
        );
    }

    #[test]
    fn test_legacy_deny_overrides_elevates_indeterminate() {
        let children = vec![
            Child::deciding(ind(ExtendedIndeterminate::Permit)),
            Child::deciding(Permit),
        ];
        assert_eq!(
            combine(CombiningAlgorithm::LegacyDenyOverrides, &children).decision,
            Deny
        );
    }

    #[test]
    fn test_legacy_permit_overrides_remembers_indeterminate() {
        let permit_wins = vec![
            Child::deciding(ind(ExtendedIndeterminate::Deny)),
            Child::deciding(Permit),
        ];
        assert_eq!(
            combine(CombiningAlgorithm::LegacyPermitOverrides, &permit_wins).decision,
            Permit
        );

        let nothing_applies = vec![Child::deciding(ind(ExtendedIndeterminate::Deny))];
        assert_eq!(
            combine(CombiningAlgorithm::LegacyPermitOverrides, &nothing_applies).decision,
            ind(ExtendedIndeterminate::DenyOrPermit)
        );
    }

    #[test]
    fn test_obligations_follow_the_final_decision() {
        let children = vec![
            Child::deciding(Permit).with_obligation("urn:example:on-permit"),
            Child::deciding(Deny).with_obligation("urn:example:on-deny"),
        ];
        let result = combine(CombiningAlgorithm::DenyOverrides, &children);
        assert_eq!(result.decision, Deny);
        assert_eq!(result.obligations.len(), 1);
        assert_eq!(result.obligations[0].id.as_str(), "urn:example:on-deny");

        let result = combine(CombiningAlgorithm::PermitOverrides, &children);
        assert_eq!(result.decision, Permit);
        assert_eq!(result.obligations.len(), 1);
        assert_eq!(result.obligations[0].id.as_str(), "urn:example:on-permit");
    }

    #[test]
    fn test_permit_obligations_accumulate_across_children() {
        let children = vec![
            Child::deciding(Permit).with_obligation("urn:example:one"),
            Child::deciding(Permit).with_obligation("urn:example:two"),
        ];
        let result = combine(CombiningAlgorithm::DenyOverrides, &children);
        assert_eq!(result.decision, Permit);
        assert_eq!(result.obligations.len(), 2);
    }

    #[test]
    fn test_algorithm_table_lookup() {
        assert_eq!(
            rule_algorithm(&Identifier::from(
                "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:deny-overrides"
            )),
            Some(CombiningAlgorithm::DenyOverrides)
        );
        assert_eq!(
            policy_algorithm(&Identifier::from(
                "urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:only-one-applicable"
            )),
            Some(CombiningAlgorithm::OnlyOneApplicable)
        );
        // only-one-applicable is policy-level only
        assert_eq!(
            rule_algorithm(&Identifier::from(
                "urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:only-one-applicable"
            )),
            None
        );
        insta::assert_snapshot!(CombiningAlgorithm::DenyUnlessPermit, @"deny-unless-permit");
    }
}
