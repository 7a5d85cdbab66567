//! Policy resolution: selecting the applicable root policy and resolving
//! id/version references.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use itertools::Itertools;
use tracing::{debug, warn};

use crate::context::EvaluationContext;
use crate::error::PdpError;
use crate::traits::DocumentLoader;
use crate::types::{IdReferenceMatch, Identifier, PolicyIdentifier, Status};

use super::{MatchResult, PolicyDef, PolicySetChild};

/// The outcome of selecting the applicable root policy for a request.
pub(crate) enum RootSelection {
    Matched(Arc<PolicyDef>),
    NotFound,
    Error(Status),
}

/// Owns the validated policy tree for the lifetime of the process (or until
/// the engine reloads it): the root definitions plus an index from id to
/// every known version of that id. Remotely loaded references are cached;
/// concurrent requests may race to populate an entry, and last-writer-wins
/// is fine because a given id+version loads to identical content.
pub struct PolicyFinder {
    roots: Vec<Arc<PolicyDef>>,
    index: HashMap<Identifier, Vec<Arc<PolicyDef>>>,
    loader: Option<Arc<dyn DocumentLoader>>,
    loaded: RwLock<HashMap<Identifier, Vec<Arc<PolicyDef>>>>,
}

impl PolicyFinder {
    pub fn new(roots: Vec<PolicyDef>) -> Result<Self, PdpError> {
        Self::build(roots, None)
    }

    pub fn with_loader(
        roots: Vec<PolicyDef>,
        loader: Arc<dyn DocumentLoader>,
    ) -> Result<Self, PdpError> {
        Self::build(roots, Some(loader))
    }

    fn build(
        roots: Vec<PolicyDef>,
        loader: Option<Arc<dyn DocumentLoader>>,
    ) -> Result<Self, PdpError> {
        let mut index: HashMap<Identifier, Vec<Arc<PolicyDef>>> = HashMap::new();
        let mut shared = Vec::with_capacity(roots.len());
        for root in roots {
            root.validate()
                .map_err(|status| PdpError::InvalidPolicy(status.to_string()))?;
            let root = Arc::new(root);
            register(&mut index, &root);
            shared.push(root);
        }
        Ok(PolicyFinder {
            roots: shared,
            index,
            loader,
            loaded: RwLock::new(HashMap::new()),
        })
    }

    pub(crate) fn loader(&self) -> Option<Arc<dyn DocumentLoader>> {
        self.loader.clone()
    }

    /// Every registered policy id and version, sorted.
    pub fn policies(&self) -> Vec<PolicyIdentifier> {
        self.index
            .values()
            .flatten()
            .map(|def| PolicyIdentifier {
                id: def.id().clone(),
                version: def.version().clone(),
            })
            .sorted_by(|a, b| a.id.cmp(&b.id).then_with(|| a.version.cmp(&b.version)))
            .collect()
    }

    /// Match each root's target against the request. Exactly one match wins;
    /// several are an error; an indeterminate root surfaces only when
    /// nothing matched.
    pub(crate) fn root_policy(&self, ctx: &mut EvaluationContext<'_>) -> RootSelection {
        let mut matched: Option<Arc<PolicyDef>> = None;
        let mut error: Option<Status> = None;
        for root in &self.roots {
            match root.match_target(ctx) {
                MatchResult::Match => {
                    if matched.is_some() {
                        return RootSelection::Error(Status::processing_error(
                            "multiple applicable root policies",
                        ));
                    }
                    matched = Some(Arc::clone(root));
                }
                MatchResult::NoMatch => {}
                MatchResult::Indeterminate(status) => {
                    warn!(
                        event = "RootSelection",
                        id = root.id().as_str(),
                        status = %status,
                    );
                    if error.is_none() {
                        error = Some(status);
                    }
                }
            }
        }
        match (matched, error) {
            (Some(def), _) => RootSelection::Matched(def),
            (None, Some(status)) => RootSelection::Error(status),
            (None, None) => RootSelection::NotFound,
        }
    }

    pub(crate) fn policy(&self, reference: &IdReferenceMatch) -> Result<Arc<PolicyDef>, Status> {
        self.resolve(reference, false)
    }

    pub(crate) fn policy_set(
        &self,
        reference: &IdReferenceMatch,
    ) -> Result<Arc<PolicyDef>, Status> {
        self.resolve(reference, true)
    }

    fn resolve(
        &self,
        reference: &IdReferenceMatch,
        want_set: bool,
    ) -> Result<Arc<PolicyDef>, Status> {
        if let Some(found) = self.best_candidate(&self.index, reference, want_set) {
            return Ok(found);
        }
        if let Ok(loaded) = self.loaded.read() {
            if let Some(found) = self.best_candidate(&loaded, reference, want_set) {
                return Ok(found);
            }
        }
        self.load_remote(reference, want_set)
    }

    fn best_candidate(
        &self,
        index: &HashMap<Identifier, Vec<Arc<PolicyDef>>>,
        reference: &IdReferenceMatch,
        want_set: bool,
    ) -> Option<Arc<PolicyDef>> {
        index
            .get(reference.id())?
            .iter()
            .filter(|def| matches!(def.as_ref(), PolicyDef::PolicySet(_)) == want_set)
            .filter(|def| reference.matches(def.id(), def.version()))
            .max_by(|a, b| a.version().cmp(b.version()))
            .cloned()
    }

    fn load_remote(
        &self,
        reference: &IdReferenceMatch,
        want_set: bool,
    ) -> Result<Arc<PolicyDef>, Status> {
        let kind = if want_set { "policy set" } else { "policy" };
        let not_found = || {
            Status::processing_error(format!(
                "{kind} reference '{}' cannot be resolved",
                reference.id()
            ))
        };

        let loader = self.loader.as_ref().ok_or_else(not_found)?;
        if !reference.id().is_absolute_uri() {
            return Err(not_found());
        }

        let def = loader.load(reference.id()).map_err(|e| {
            Status::processing_error(format!(
                "failed to load {kind} '{}': {e}",
                reference.id()
            ))
        })?;
        def.validate()?;
        if matches!(def, PolicyDef::PolicySet(_)) != want_set
            || !reference.matches(def.id(), def.version())
        {
            return Err(not_found());
        }
        debug!(
            event = "ReferenceLoad",
            id = def.id().as_str(),
            version = %def.version(),
        );

        let def = Arc::new(def);
        if let Ok(mut loaded) = self.loaded.write() {
            loaded
                .entry(def.id().clone())
                .or_default()
                .push(Arc::clone(&def));
        }
        Ok(def)
    }
}

/// A policy set registers itself, then each inline child, recursively.
fn register(index: &mut HashMap<Identifier, Vec<Arc<PolicyDef>>>, def: &Arc<PolicyDef>) {
    index
        .entry(def.id().clone())
        .or_default()
        .push(Arc::clone(def));
    if let PolicyDef::PolicySet(set) = def.as_ref() {
        for child in set.children() {
            match child {
                PolicySetChild::Policy(policy) => {
                    register(index, &Arc::new(PolicyDef::Policy(policy.clone())));
                }
                PolicySetChild::PolicySet(child_set) => {
                    register(index, &Arc::new(PolicyDef::PolicySet(child_set.clone())));
                }
                PolicySetChild::PolicyReference(_) | PolicySetChild::PolicySetReference(_) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{Policy, PolicySet};
    use crate::types::{Version, VersionMatch};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const RULE_DENY_OVERRIDES: &str =
        "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:deny-overrides";
    const POLICY_DENY_OVERRIDES: &str =
        "urn:oasis:names:tc:xacml:3.0:policy-combining-algorithm:deny-overrides";

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    fn policy(id: &str, version: &str) -> PolicyDef {
        PolicyDef::Policy(Policy::new(id, v(version), RULE_DENY_OVERRIDES))
    }

    #[test]
    fn test_unconstrained_reference_selects_highest_version() {
        let finder = PolicyFinder::new(vec![
            policy("urn:example:policy", "1.0"),
            policy("urn:example:policy", "2.0"),
        ])
        .unwrap();
        let reference = IdReferenceMatch::new("urn:example:policy");
        let found = finder.policy(&reference).unwrap();
        assert_eq!(found.version(), &v("2.0"));
    }

    #[test]
    fn test_version_ordering_is_numeric_during_selection() {
        let finder = PolicyFinder::new(vec![
            policy("urn:example:policy", "9.0"),
            policy("urn:example:policy", "10.0"),
        ])
        .unwrap();
        let found = finder.policy(&IdReferenceMatch::new("urn:example:policy")).unwrap();
        assert_eq!(found.version(), &v("10.0"));
    }

    #[test]
    fn test_version_constraint_filters_before_selection() {
        let finder = PolicyFinder::new(vec![
            policy("urn:example:policy", "1.0"),
            policy("urn:example:policy", "1.5"),
            policy("urn:example:policy", "2.0"),
        ])
        .unwrap();
        let reference = IdReferenceMatch::new("urn:example:policy")
            .with_version("1.+".parse::<VersionMatch>().unwrap());
        let found = finder.policy(&reference).unwrap();
        assert_eq!(found.version(), &v("1.5"));
    }

    #[test]
    fn test_unresolvable_reference_is_processing_error() {
        let finder = PolicyFinder::new(vec![]).unwrap();
        let status = finder
            .policy(&IdReferenceMatch::new("urn:example:policy"))
            .unwrap_err();
        assert_eq!(
            status.code().value().as_str(),
            crate::types::ids::STATUS_PROCESSING_ERROR
        );
    }

    #[test]
    fn test_kind_mismatch_does_not_resolve() {
        let set = PolicySet::new("urn:example:set", v("1.0"), POLICY_DENY_OVERRIDES);
        let finder = PolicyFinder::new(vec![PolicyDef::PolicySet(set)]).unwrap();
        assert!(finder.policy(&IdReferenceMatch::new("urn:example:set")).is_err());
        assert!(
            finder
                .policy_set(&IdReferenceMatch::new("urn:example:set"))
                .is_ok()
        );
    }

    #[test]
    fn test_nested_policies_are_registered_recursively() {
        let set = PolicySet::new("urn:example:set", v("1.0"), POLICY_DENY_OVERRIDES)
            .with_policy(Policy::new("urn:example:inner", v("1.0"), RULE_DENY_OVERRIDES));
        let finder = PolicyFinder::new(vec![PolicyDef::PolicySet(set)]).unwrap();
        assert!(
            finder
                .policy(&IdReferenceMatch::new("urn:example:inner"))
                .is_ok()
        );
        let listed = finder.policies();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id.as_str(), "urn:example:inner");
    }

    #[test]
    fn test_invalid_root_is_rejected_at_construction() {
        let bogus = PolicyDef::Policy(Policy::new("urn:example:policy", v("1.0"), "urn:bogus"));
        assert!(matches!(
            PolicyFinder::new(vec![bogus]),
            Err(PdpError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn test_loader_is_consulted_once_then_cached() {
        struct CountingLoader(AtomicUsize);
        impl DocumentLoader for CountingLoader {
            fn load(&self, id: &Identifier) -> Result<PolicyDef, PdpError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(policy(id.as_str(), "1.0"))
            }
        }

        let loader = Arc::new(CountingLoader(AtomicUsize::new(0)));
        let finder = PolicyFinder::with_loader(vec![], Arc::clone(&loader) as Arc<dyn DocumentLoader>)
            .unwrap();
        let reference = IdReferenceMatch::new("https://example.org/policies/leaf");
        assert!(finder.policy(&reference).is_ok());
        assert!(finder.policy(&reference).is_ok());
        assert_eq!(loader.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_loader_is_not_consulted_for_relative_ids() {
        struct PanickyLoader;
        impl DocumentLoader for PanickyLoader {
            fn load(&self, _id: &Identifier) -> Result<PolicyDef, PdpError> {
                panic!("should not be called for a relative id");
            }
        }

        let finder = PolicyFinder::with_loader(vec![], Arc::new(PanickyLoader)).unwrap();
        assert!(finder.policy(&IdReferenceMatch::new("leaf")).is_err());
    }
}
