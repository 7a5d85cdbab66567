//! The policy tree: rules, policies, policy sets, and their evaluation.
//!
//! The tree is built once (by a parsing layer out of scope here, or
//! programmatically), validated once, and never mutated afterwards — it is
//! shared read-only across concurrent evaluations.

mod finder;
mod target;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::combining::{self, Combinable, Evaluation};
use crate::context::EvaluationContext;
use crate::expr::{Expression, ExpressionResult, LexicalEnv, ValidationScope, VariableDefinition};
use crate::types::{
    Advice, AttributeAssignment, Decision, Effect, ExtendedIndeterminate, IdReferenceMatch,
    Identifier, Obligation, PolicyIdentifier, Status, Version,
};

pub use finder::PolicyFinder;
pub(crate) use finder::RootSelection;
pub use target::{AllOf, AnyOf, Match, Target};
pub(crate) use target::MatchResult;

/// One attribute assignment inside an obligation or advice expression; the
/// expression is evaluated when the obligation fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeAssignmentExpression {
    attribute_id: Identifier,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    category: Option<Identifier>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    issuer: Option<String>,
    expression: Expression,
}

impl AttributeAssignmentExpression {
    pub fn new(attribute_id: impl Into<Identifier>, expression: Expression) -> Self {
        AttributeAssignmentExpression {
            attribute_id: attribute_id.into(),
            category: None,
            issuer: None,
            expression,
        }
    }

    pub fn with_category(mut self, category: impl Into<Identifier>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// A bag-valued expression yields one assignment per element; an empty
    /// result yields none.
    fn evaluate(
        &self,
        ctx: &mut EvaluationContext<'_>,
        env: &LexicalEnv<'_>,
    ) -> Result<Vec<AttributeAssignment>, Status> {
        let assignment = |value| AttributeAssignment {
            attribute_id: self.attribute_id.clone(),
            category: self.category.clone(),
            issuer: self.issuer.clone(),
            value,
        };
        match self.expression.evaluate(ctx, env) {
            ExpressionResult::Error(status) => Err(status),
            ExpressionResult::Empty => Ok(Vec::new()),
            ExpressionResult::Single(value) => Ok(vec![assignment(value)]),
            ExpressionResult::Bag(bag) => {
                Ok(bag.iter().cloned().map(assignment).collect())
            }
        }
    }

    fn validate(&self, scope: &mut ValidationScope) -> Result<(), Status> {
        if self.attribute_id.as_str().is_empty() {
            return Err(Status::syntax_error(
                "attribute assignment is missing its attribute id",
            ));
        }
        self.expression.validate(scope)
    }
}

/// An obligation template, fired only when the decision matches
/// `fulfill_on`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObligationExpression {
    id: Identifier,
    fulfill_on: Effect,
    #[serde(default)]
    assignments: Vec<AttributeAssignmentExpression>,
}

impl ObligationExpression {
    pub fn new(id: impl Into<Identifier>, fulfill_on: Effect) -> Self {
        ObligationExpression {
            id: id.into(),
            fulfill_on,
            assignments: Vec::new(),
        }
    }

    pub fn with_assignment(mut self, assignment: AttributeAssignmentExpression) -> Self {
        self.assignments.push(assignment);
        self
    }
}

/// An advice template, attached only when the decision matches `applies_to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdviceExpression {
    id: Identifier,
    applies_to: Effect,
    #[serde(default)]
    assignments: Vec<AttributeAssignmentExpression>,
}

impl AdviceExpression {
    pub fn new(id: impl Into<Identifier>, applies_to: Effect) -> Self {
        AdviceExpression {
            id: id.into(),
            applies_to,
            assignments: Vec::new(),
        }
    }

    pub fn with_assignment(mut self, assignment: AttributeAssignmentExpression) -> Self {
        self.assignments.push(assignment);
        self
    }
}

fn evaluate_obligations(
    ctx: &mut EvaluationContext<'_>,
    env: &LexicalEnv<'_>,
    expressions: &[ObligationExpression],
    effect: Effect,
) -> Result<Vec<Obligation>, Status> {
    let mut out = Vec::new();
    for expression in expressions.iter().filter(|o| o.fulfill_on == effect) {
        let mut assignments = Vec::new();
        for assignment in &expression.assignments {
            assignments.extend(assignment.evaluate(ctx, env)?);
        }
        out.push(Obligation {
            id: expression.id.clone(),
            assignments,
        });
    }
    Ok(out)
}

fn evaluate_advice(
    ctx: &mut EvaluationContext<'_>,
    env: &LexicalEnv<'_>,
    expressions: &[AdviceExpression],
    effect: Effect,
) -> Result<Vec<Advice>, Status> {
    let mut out = Vec::new();
    for expression in expressions.iter().filter(|a| a.applies_to == effect) {
        let mut assignments = Vec::new();
        for assignment in &expression.assignments {
            assignments.extend(assignment.evaluate(ctx, env)?);
        }
        out.push(Advice {
            id: expression.id.clone(),
            assignments,
        });
    }
    Ok(out)
}

/// A single rule: an effect guarded by an optional target and condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    id: String,
    effect: Effect,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    target: Option<Target>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    condition: Option<Expression>,
    #[serde(default)]
    obligations: Vec<ObligationExpression>,
    #[serde(default)]
    advice: Vec<AdviceExpression>,
}

impl Rule {
    pub fn new(id: impl Into<String>, effect: Effect) -> Self {
        Rule {
            id: id.into(),
            effect,
            description: None,
            target: None,
            condition: None,
            obligations: Vec::new(),
            advice: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_condition(mut self, condition: Expression) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_obligation(mut self, obligation: ObligationExpression) -> Self {
        self.obligations.push(obligation);
        self
    }

    pub fn with_advice(mut self, advice: AdviceExpression) -> Self {
        self.advice.push(advice);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }

    fn match_target(&self, ctx: &mut EvaluationContext<'_>) -> MatchResult {
        match &self.target {
            Some(target) => target.matches(ctx),
            None => MatchResult::Match,
        }
    }

    fn evaluate(&self, ctx: &mut EvaluationContext<'_>, env: &LexicalEnv<'_>) -> Evaluation {
        let decision = match &self.condition {
            None => self.effect.decision(),
            Some(condition) => {
                let outcome = condition.evaluate(ctx, env);
                if outcome.is_error() {
                    return Evaluation::new(self.effect.indeterminate(), outcome.status());
                }
                match outcome.boolean() {
                    Some(true) => self.effect.decision(),
                    Some(false) => Decision::NotApplicable,
                    None => {
                        return Evaluation::new(
                            self.effect.indeterminate(),
                            Status::processing_error(format!(
                                "condition of rule '{}' is not boolean",
                                self.id
                            )),
                        );
                    }
                }
            }
        };

        let mut evaluation = Evaluation::new(decision, Status::ok());
        if decision == self.effect.decision() {
            match evaluate_obligations(ctx, env, &self.obligations, self.effect) {
                Ok(obligations) => evaluation.obligations = obligations,
                Err(status) => return Evaluation::new(self.effect.indeterminate(), status),
            }
            match evaluate_advice(ctx, env, &self.advice, self.effect) {
                Ok(advice) => evaluation.advice = advice,
                Err(status) => return Evaluation::new(self.effect.indeterminate(), status),
            }
        }
        evaluation
    }

    fn validate(&self, scope: &mut ValidationScope) -> Result<(), Status> {
        if self.id.is_empty() {
            return Err(Status::syntax_error("rule is missing its id"));
        }
        if let Some(target) = &self.target {
            target.validate()?;
        }
        if let Some(condition) = &self.condition {
            condition.validate(scope)?;
        }
        for obligation in &self.obligations {
            for assignment in &obligation.assignments {
                assignment.validate(scope)?;
            }
        }
        for advice in &self.advice {
            for assignment in &advice.assignments {
                assignment.validate(scope)?;
            }
        }
        Ok(())
    }
}

/// Adapts a rule to the combining interface, carrying the policy's lexical
/// environment.
struct RuleChild<'a> {
    rule: &'a Rule,
    env: &'a LexicalEnv<'a>,
}

impl Combinable for RuleChild<'_> {
    fn match_target(&self, ctx: &mut EvaluationContext<'_>) -> MatchResult {
        self.rule.match_target(ctx)
    }

    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> Evaluation {
        self.rule.evaluate(ctx, self.env)
    }

    fn target_failure(&self, status: Status) -> Evaluation {
        Evaluation::new(self.rule.effect.indeterminate(), status)
    }
}

/// A policy: a target, variable definitions, and rules reduced by a
/// rule-combining algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    id: Identifier,
    version: Version,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    description: Option<String>,
    #[serde(default)]
    target: Target,
    rule_combining: Identifier,
    #[serde(default)]
    rules: Vec<Rule>,
    #[serde(default)]
    variables: Vec<VariableDefinition>,
    #[serde(default)]
    obligations: Vec<ObligationExpression>,
    #[serde(default)]
    advice: Vec<AdviceExpression>,
}

impl Policy {
    pub fn new(
        id: impl Into<Identifier>,
        version: Version,
        rule_combining: impl Into<Identifier>,
    ) -> Self {
        Policy {
            id: id.into(),
            version,
            description: None,
            target: Target::match_all(),
            rule_combining: rule_combining.into(),
            rules: Vec::new(),
            variables: Vec::new(),
            obligations: Vec::new(),
            advice: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_variable(mut self, variable: VariableDefinition) -> Self {
        self.variables.push(variable);
        self
    }

    pub fn with_obligation(mut self, obligation: ObligationExpression) -> Self {
        self.obligations.push(obligation);
        self
    }

    pub fn with_advice(mut self, advice: AdviceExpression) -> Self {
        self.advice.push(advice);
        self
    }

    pub fn id(&self) -> &Identifier {
        &self.id
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub(crate) fn match_target(&self, ctx: &mut EvaluationContext<'_>) -> MatchResult {
        self.target.matches(ctx)
    }

    pub(crate) fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> Evaluation {
        let env = LexicalEnv::root(&self.id, &self.variables);
        let Some(algorithm) = combining::rule_algorithm(&self.rule_combining) else {
            return Evaluation::indeterminate(
                ExtendedIndeterminate::DenyOrPermit,
                Status::processing_error(format!(
                    "unknown rule-combining algorithm '{}'",
                    self.rule_combining
                )),
            );
        };

        let children: Vec<RuleChild<'_>> = self
            .rules
            .iter()
            .map(|rule| RuleChild { rule, env: &env })
            .collect();
        let mut evaluation = algorithm.combine(ctx, &children);
        attach_own_output(
            ctx,
            &env,
            &mut evaluation,
            &self.obligations,
            &self.advice,
        );

        if matches!(evaluation.decision, Decision::Permit | Decision::Deny) {
            ctx.record_policy(PolicyIdentifier {
                id: self.id.clone(),
                version: self.version.clone(),
            });
        }
        debug!(
            event = "Policy",
            id = self.id.as_str(),
            decision = %evaluation.decision,
        );
        evaluation
    }

    pub(crate) fn validate(&self) -> Result<(), Status> {
        if self.id.as_str().is_empty() {
            return Err(Status::syntax_error("policy is missing its id"));
        }
        if combining::rule_algorithm(&self.rule_combining).is_none() {
            return Err(Status::syntax_error(format!(
                "unknown rule-combining algorithm '{}'",
                self.rule_combining
            )));
        }
        self.target.validate()?;

        let mut scope = ValidationScope::new();
        for variable in &self.variables {
            scope.declare(&variable.id)?;
        }
        for variable in &self.variables {
            variable.expression.validate(&mut scope)?;
        }
        for rule in &self.rules {
            rule.validate(&mut scope)?;
        }
        for obligation in &self.obligations {
            for assignment in &obligation.assignments {
                assignment.validate(&mut scope)?;
            }
        }
        for advice in &self.advice {
            for assignment in &advice.assignments {
                assignment.validate(&mut scope)?;
            }
        }
        Ok(())
    }
}

/// A policy set's ordered children: inline definitions or unresolved id
/// references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PolicySetChild {
    Policy(Policy),
    PolicySet(PolicySet),
    PolicyReference(IdReferenceMatch),
    PolicySetReference(IdReferenceMatch),
}

/// Adapts a policy-set child to the combining interface, resolving
/// references through the evaluation context's finder.
struct SetChild<'a> {
    child: &'a PolicySetChild,
}

impl Combinable for SetChild<'_> {
    fn match_target(&self, ctx: &mut EvaluationContext<'_>) -> MatchResult {
        match self.child {
            PolicySetChild::Policy(policy) => policy.match_target(ctx),
            PolicySetChild::PolicySet(set) => set.match_target(ctx),
            PolicySetChild::PolicyReference(reference) => match ctx.resolve_policy(reference) {
                Ok(def) => def.match_target(ctx),
                Err(status) => MatchResult::Indeterminate(status),
            },
            PolicySetChild::PolicySetReference(reference) => {
                match ctx.resolve_policy_set(reference) {
                    Ok(def) => def.match_target(ctx),
                    Err(status) => MatchResult::Indeterminate(status),
                }
            }
        }
    }

    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> Evaluation {
        match self.child {
            PolicySetChild::Policy(policy) => policy.evaluate(ctx),
            PolicySetChild::PolicySet(set) => set.evaluate(ctx),
            PolicySetChild::PolicyReference(reference) => match ctx.resolve_policy(reference) {
                Ok(def) => def.evaluate(ctx),
                Err(status) => {
                    Evaluation::indeterminate(ExtendedIndeterminate::DenyOrPermit, status)
                }
            },
            PolicySetChild::PolicySetReference(reference) => {
                match ctx.resolve_policy_set(reference) {
                    Ok(def) => def.evaluate(ctx),
                    Err(status) => {
                        Evaluation::indeterminate(ExtendedIndeterminate::DenyOrPermit, status)
                    }
                }
            }
        }
    }

    fn target_failure(&self, status: Status) -> Evaluation {
        Evaluation::indeterminate(ExtendedIndeterminate::DenyOrPermit, status)
    }
}

/// A policy set: a target and ordered children reduced by a policy-combining
/// algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySet {
    id: Identifier,
    version: Version,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    description: Option<String>,
    #[serde(default)]
    target: Target,
    policy_combining: Identifier,
    #[serde(default)]
    children: Vec<PolicySetChild>,
    #[serde(default)]
    obligations: Vec<ObligationExpression>,
    #[serde(default)]
    advice: Vec<AdviceExpression>,
}

impl PolicySet {
    pub fn new(
        id: impl Into<Identifier>,
        version: Version,
        policy_combining: impl Into<Identifier>,
    ) -> Self {
        PolicySet {
            id: id.into(),
            version,
            description: None,
            target: Target::match_all(),
            policy_combining: policy_combining.into(),
            children: Vec::new(),
            obligations: Vec::new(),
            advice: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn with_child(mut self, child: PolicySetChild) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_policy(self, policy: Policy) -> Self {
        self.with_child(PolicySetChild::Policy(policy))
    }

    pub fn with_obligation(mut self, obligation: ObligationExpression) -> Self {
        self.obligations.push(obligation);
        self
    }

    pub fn with_advice(mut self, advice: AdviceExpression) -> Self {
        self.advice.push(advice);
        self
    }

    pub fn id(&self) -> &Identifier {
        &self.id
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn children(&self) -> &[PolicySetChild] {
        &self.children
    }

    pub(crate) fn match_target(&self, ctx: &mut EvaluationContext<'_>) -> MatchResult {
        self.target.matches(ctx)
    }

    pub(crate) fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> Evaluation {
        let Some(algorithm) = combining::policy_algorithm(&self.policy_combining) else {
            return Evaluation::indeterminate(
                ExtendedIndeterminate::DenyOrPermit,
                Status::processing_error(format!(
                    "unknown policy-combining algorithm '{}'",
                    self.policy_combining
                )),
            );
        };

        let children: Vec<SetChild<'_>> = self
            .children
            .iter()
            .map(|child| SetChild { child })
            .collect();
        let mut evaluation = algorithm.combine(ctx, &children);
        let env = LexicalEnv::empty();
        attach_own_output(
            ctx,
            &env,
            &mut evaluation,
            &self.obligations,
            &self.advice,
        );

        if matches!(evaluation.decision, Decision::Permit | Decision::Deny) {
            ctx.record_policy(PolicyIdentifier {
                id: self.id.clone(),
                version: self.version.clone(),
            });
        }
        debug!(
            event = "PolicySet",
            id = self.id.as_str(),
            decision = %evaluation.decision,
        );
        evaluation
    }

    pub(crate) fn validate(&self) -> Result<(), Status> {
        if self.id.as_str().is_empty() {
            return Err(Status::syntax_error("policy set is missing its id"));
        }
        if combining::policy_algorithm(&self.policy_combining).is_none() {
            return Err(Status::syntax_error(format!(
                "unknown policy-combining algorithm '{}'",
                self.policy_combining
            )));
        }
        self.target.validate()?;
        for child in &self.children {
            match child {
                PolicySetChild::Policy(policy) => policy.validate()?,
                PolicySetChild::PolicySet(set) => set.validate()?,
                PolicySetChild::PolicyReference(reference)
                | PolicySetChild::PolicySetReference(reference) => {
                    if reference.id().as_str().is_empty() {
                        return Err(Status::syntax_error(
                            "policy reference is missing its id",
                        ));
                    }
                }
            }
        }
        let mut scope = ValidationScope::new();
        for obligation in &self.obligations {
            for assignment in &obligation.assignments {
                assignment.validate(&mut scope)?;
            }
        }
        for advice in &self.advice {
            for assignment in &advice.assignments {
                assignment.validate(&mut scope)?;
            }
        }
        Ok(())
    }
}

/// Attach a node's own obligations and advice, filtered to the decision's
/// effect. An evaluation failure degrades the node's decision to the
/// matching indeterminate branch.
fn attach_own_output(
    ctx: &mut EvaluationContext<'_>,
    env: &LexicalEnv<'_>,
    evaluation: &mut Evaluation,
    obligations: &[ObligationExpression],
    advice: &[AdviceExpression],
) {
    let effect = match evaluation.decision {
        Decision::Permit => Effect::Permit,
        Decision::Deny => Effect::Deny,
        _ => return,
    };
    match evaluate_obligations(ctx, env, obligations, effect) {
        Ok(out) => evaluation.obligations.extend(out),
        Err(status) => {
            *evaluation = Evaluation::new(effect.indeterminate(), status);
            return;
        }
    }
    match evaluate_advice(ctx, env, advice, effect) {
        Ok(out) => evaluation.advice.extend(out),
        Err(status) => {
            *evaluation = Evaluation::new(effect.indeterminate(), status);
        }
    }
}

/// A root-level policy definition: a policy or a policy set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PolicyDef {
    Policy(Policy),
    PolicySet(PolicySet),
}

impl PolicyDef {
    pub fn id(&self) -> &Identifier {
        match self {
            PolicyDef::Policy(policy) => policy.id(),
            PolicyDef::PolicySet(set) => set.id(),
        }
    }

    pub fn version(&self) -> &Version {
        match self {
            PolicyDef::Policy(policy) => policy.version(),
            PolicyDef::PolicySet(set) => set.version(),
        }
    }

    pub(crate) fn match_target(&self, ctx: &mut EvaluationContext<'_>) -> MatchResult {
        match self {
            PolicyDef::Policy(policy) => policy.match_target(ctx),
            PolicyDef::PolicySet(set) => set.match_target(ctx),
        }
    }

    pub(crate) fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> Evaluation {
        match self {
            PolicyDef::Policy(policy) => policy.evaluate(ctx),
            PolicyDef::PolicySet(set) => set.evaluate(ctx),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Status> {
        match self {
            PolicyDef::Policy(policy) => policy.validate(),
            PolicyDef::PolicySet(set) => set.validate(),
        }
    }
}

impl From<Policy> for PolicyDef {
    fn from(policy: Policy) -> Self {
        PolicyDef::Policy(policy)
    }
}

impl From<PolicySet> for PolicyDef {
    fn from(set: PolicySet) -> Self {
        PolicyDef::PolicySet(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvaluationContext;
    use crate::expr::{QuantifiedExpression, Quantifier};
    use crate::traits::EmptyAttributeSource;
    use crate::types::{AttributeValue, Request};

    const RULE_DENY_OVERRIDES: &str =
        "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:deny-overrides";
    const STRING_BAG: &str = "urn:oasis:names:tc:xacml:1.0:function:string-bag";
    const STRING_EQUAL: &str = "urn:oasis:names:tc:xacml:1.0:function:string-equal";

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    fn true_condition() -> Expression {
        Expression::literal(AttributeValue::boolean(true))
    }

    fn evaluate(policy: &Policy, request: &Request) -> Evaluation {
        let finder = PolicyFinder::new(vec![]).unwrap();
        let mut ctx = EvaluationContext::new(request, &EmptyAttributeSource, &finder);
        policy.evaluate(&mut ctx)
    }

    #[test]
    fn test_rule_without_condition_yields_its_effect() {
        let policy = Policy::new("urn:example:policy", v("1.0"), RULE_DENY_OVERRIDES)
            .with_rule(Rule::new("permit-all", Effect::Permit));
        assert_eq!(evaluate(&policy, &Request::new()).decision, Decision::Permit);
    }

    #[test]
    fn test_false_condition_is_not_applicable() {
        let policy = Policy::new("urn:example:policy", v("1.0"), RULE_DENY_OVERRIDES).with_rule(
            Rule::new("never", Effect::Permit)
                .with_condition(Expression::literal(AttributeValue::boolean(false))),
        );
        assert_eq!(
            evaluate(&policy, &Request::new()).decision,
            Decision::NotApplicable
        );
    }

    #[test]
    fn test_condition_error_is_indeterminate_on_the_effect_branch() {
        let policy = Policy::new("urn:example:policy", v("1.0"), RULE_DENY_OVERRIDES).with_rule(
            Rule::new("broken", Effect::Deny)
                .with_condition(Expression::apply("urn:example:function:no-such", vec![])),
        );
        assert_eq!(
            evaluate(&policy, &Request::new()).decision,
            Decision::Indeterminate(ExtendedIndeterminate::Deny)
        );
    }

    #[test]
    fn test_non_boolean_condition_is_indeterminate() {
        let policy = Policy::new("urn:example:policy", v("1.0"), RULE_DENY_OVERRIDES).with_rule(
            Rule::new("odd", Effect::Permit)
                .with_condition(Expression::literal(AttributeValue::integer(7))),
        );
        assert_eq!(
            evaluate(&policy, &Request::new()).decision,
            Decision::Indeterminate(ExtendedIndeterminate::Permit)
        );
    }

    #[test]
    fn test_policy_variables_feed_rule_conditions() {
        let greeting_is_hello = Expression::apply(
            STRING_EQUAL,
            vec![
                Expression::variable("greeting"),
                Expression::literal(AttributeValue::string("hello")),
            ],
        );
        let policy = Policy::new("urn:example:policy", v("1.0"), RULE_DENY_OVERRIDES)
            .with_variable(VariableDefinition::new(
                "greeting",
                Expression::literal(AttributeValue::string("hello")),
            ))
            .with_rule(Rule::new("uses-variable", Effect::Permit).with_condition(greeting_is_hello));
        assert_eq!(evaluate(&policy, &Request::new()).decision, Decision::Permit);
    }

    #[test]
    fn test_obligation_fires_only_on_matching_effect() {
        let policy = Policy::new("urn:example:policy", v("1.0"), RULE_DENY_OVERRIDES)
            .with_rule(Rule::new("permit-all", Effect::Permit))
            .with_obligation(
                ObligationExpression::new("urn:example:obligation:log", Effect::Permit)
                    .with_assignment(AttributeAssignmentExpression::new(
                        "urn:example:level",
                        Expression::literal(AttributeValue::string("audit")),
                    )),
            )
            .with_obligation(ObligationExpression::new(
                "urn:example:obligation:alert",
                Effect::Deny,
            ));
        let evaluation = evaluate(&policy, &Request::new());
        assert_eq!(evaluation.decision, Decision::Permit);
        assert_eq!(evaluation.obligations.len(), 1);
        assert_eq!(
            evaluation.obligations[0].id.as_str(),
            "urn:example:obligation:log"
        );
        assert_eq!(evaluation.obligations[0].assignments.len(), 1);
    }

    #[test]
    fn test_failing_obligation_degrades_to_indeterminate() {
        let policy = Policy::new("urn:example:policy", v("1.0"), RULE_DENY_OVERRIDES)
            .with_rule(Rule::new("permit-all", Effect::Permit))
            .with_obligation(
                ObligationExpression::new("urn:example:obligation:log", Effect::Permit)
                    .with_assignment(AttributeAssignmentExpression::new(
                        "urn:example:level",
                        Expression::apply("urn:example:function:no-such", vec![]),
                    )),
            );
        let evaluation = evaluate(&policy, &Request::new());
        assert_eq!(
            evaluation.decision,
            Decision::Indeterminate(ExtendedIndeterminate::Permit)
        );
        assert!(evaluation.obligations.is_empty());
    }

    #[test]
    fn test_validate_rejects_unknown_algorithm() {
        let policy = Policy::new("urn:example:policy", v("1.0"), "urn:example:alg:bogus");
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_only_one_applicable_on_rules() {
        let policy = Policy::new(
            "urn:example:policy",
            v("1.0"),
            "urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:only-one-applicable",
        );
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_variable_shadowing_a_policy_variable() {
        let quantified = Expression::quantified(QuantifiedExpression::new(
            Quantifier::ForAny,
            "greeting", // shadows the policy-level definition
            Expression::apply(STRING_BAG, vec![]),
            Expression::literal(AttributeValue::boolean(true)),
        ));
        let policy = Policy::new("urn:example:policy", v("1.0"), RULE_DENY_OVERRIDES)
            .with_variable(VariableDefinition::new("greeting", true_condition()))
            .with_rule(Rule::new("shadowing", Effect::Permit).with_condition(quantified));
        let status = policy.validate().unwrap_err();
        assert_eq!(
            status.code().value().as_str(),
            crate::types::ids::STATUS_SYNTAX_ERROR
        );
    }

    #[test]
    fn test_validate_rejects_duplicate_variable_definitions() {
        let policy = Policy::new("urn:example:policy", v("1.0"), RULE_DENY_OVERRIDES)
            .with_variable(VariableDefinition::new("x", true_condition()))
            .with_variable(VariableDefinition::new("x", true_condition()));
        assert!(policy.validate().is_err());
    }
}
