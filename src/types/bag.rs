//! Bags of attribute values.

use serde::{Deserialize, Serialize};

use super::attribute_value::AttributeValue;

/// An ordered multiset of attribute values, the unit of intermediate
/// computation in the expression language. Duplicates are preserved; order is
/// evaluation order. Homogeneity of data type is a convention enforced by
/// functions and attribute retrieval, not by the container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bag {
    values: Vec<AttributeValue>,
}

impl Bag {
    pub fn new() -> Self {
        Bag { values: Vec::new() }
    }

    pub fn of(values: Vec<AttributeValue>) -> Self {
        Bag { values }
    }

    pub fn add(&mut self, value: AttributeValue) {
        self.values.push(value);
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[AttributeValue] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeValue> {
        self.values.iter()
    }

    /// The sole element, if the bag holds exactly one.
    pub fn single(&self) -> Option<&AttributeValue> {
        match self.values.as_slice() {
            [value] => Some(value),
            _ => None,
        }
    }

    /// Membership by the element data type's value equality.
    pub fn contains(&self, value: &AttributeValue) -> bool {
        self.values.iter().any(|v| v == value)
    }

    /// Unique elements present in both bags, in this bag's order.
    pub fn intersection(&self, other: &Bag) -> Bag {
        let mut out = Vec::new();
        for value in &self.values {
            if other.contains(value) && !out.contains(value) {
                out.push(value.clone());
            }
        }
        Bag::of(out)
    }

    /// Unique elements present in either bag, first occurrence wins.
    pub fn union(&self, other: &Bag) -> Bag {
        let mut out = Vec::new();
        for value in self.values.iter().chain(other.values.iter()) {
            if !out.contains(value) {
                out.push(value.clone());
            }
        }
        Bag::of(out)
    }

    pub fn is_subset_of(&self, other: &Bag) -> bool {
        self.values.iter().all(|v| other.contains(v))
    }

    pub fn set_equals(&self, other: &Bag) -> bool {
        self.is_subset_of(other) && other.is_subset_of(self)
    }
}

impl From<Vec<AttributeValue>> for Bag {
    fn from(values: Vec<AttributeValue>) -> Self {
        Bag::of(values)
    }
}

impl FromIterator<AttributeValue> for Bag {
    fn from_iter<I: IntoIterator<Item = AttributeValue>>(iter: I) -> Self {
        Bag::of(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Bag {
        values.iter().map(|s| AttributeValue::string(*s)).collect()
    }

    #[test]
    fn test_duplicates_are_preserved() {
        let bag = strings(&["a", "a", "b"]);
        assert_eq!(bag.size(), 3);
    }

    #[test]
    fn test_single() {
        assert!(strings(&[]).single().is_none());
        assert!(strings(&["a", "b"]).single().is_none());
        assert_eq!(
            strings(&["a"]).single(),
            Some(&AttributeValue::string("a"))
        );
    }

    #[test]
    fn test_intersection_is_unique() {
        let a = strings(&["a", "a", "b", "c"]);
        let b = strings(&["a", "c", "d"]);
        assert_eq!(a.intersection(&b), strings(&["a", "c"]));
    }

    #[test]
    fn test_union_dedups() {
        let a = strings(&["a", "b"]);
        let b = strings(&["b", "c"]);
        assert_eq!(a.union(&b), strings(&["a", "b", "c"]));
    }

    #[test]
    fn test_set_equals_ignores_order_and_multiplicity() {
        let a = strings(&["a", "b", "a"]);
        let b = strings(&["b", "a"]);
        assert!(a.set_equals(&b));
        assert!(!a.set_equals(&strings(&["a"])));
    }

    #[test]
    fn test_subset() {
        let a = strings(&["a", "b"]);
        let b = strings(&["c", "b", "a"]);
        assert!(a.is_subset_of(&b));
        assert!(!b.is_subset_of(&a));
        assert!(strings(&[]).is_subset_of(&a));
    }

    #[test]
    fn test_contains_uses_value_equality() {
        use crate::types::identifier::{Identifier, ids};
        let dt = Identifier::from(ids::DT_DATE_TIME);
        let bag = Bag::of(vec![
            AttributeValue::from_lexical(&dt, "2024-05-01T12:00:00+01:00").unwrap(),
        ]);
        let same_instant = AttributeValue::from_lexical(&dt, "2024-05-01T11:00:00Z").unwrap();
        assert!(bag.contains(&same_instant));
    }
}
