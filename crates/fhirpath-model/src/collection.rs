//! Ordered, type-polymorphic multiset used as the `Collection` System value.

use crate::provider::ModelAdapter;
use crate::value::FhirPathValue;

/// An ordered collection of values, preserving insertion order and
/// duplicates. `contains`/`add_unique`/`distinct`/`is_subset_of` take an
/// optional `ModelAdapter`: when supplied, `(Node, Node)` pairs compare
/// structurally through it; without one, two nodes are equal only if
/// they're the same allocation (see `FhirPathValue::equal`).
#[derive(Debug, Clone, Default)]
pub struct Collection {
    items: Vec<FhirPathValue>,
}

impl Collection {
    /// The empty collection.
    pub fn empty() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a collection from an existing vector, preserving order.
    pub fn from_vec(items: Vec<FhirPathValue>) -> Self {
        Self { items }
    }

    /// A single-element collection.
    pub fn single(value: FhirPathValue) -> Self {
        Self { items: vec![value] }
    }

    /// Number of elements.
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// `true` iff this collection has no elements.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append unconditionally.
    pub fn add(&mut self, value: FhirPathValue) {
        self.items.push(value);
    }

    /// Append only if no existing element is `Equal` to `value`.
    pub fn add_unique(&mut self, value: FhirPathValue, model: Option<&dyn ModelAdapter>) {
        if !self.contains(&value, model) {
            self.items.push(value);
        }
    }

    /// Append every element of `other`.
    pub fn add_all(&mut self, other: &Collection) {
        self.items.extend(other.items.iter().cloned());
    }

    /// Append every element of `other` not already present.
    pub fn add_all_unique(&mut self, other: &Collection, model: Option<&dyn ModelAdapter>) {
        for item in &other.items {
            self.add_unique(item.clone(), model);
        }
    }

    /// Whether any element is `Equal` to `value`.
    pub fn contains(&self, value: &FhirPathValue, model: Option<&dyn ModelAdapter>) -> bool {
        self.items.iter().any(|item| item.equal(value, model))
    }

    /// Element at position `i`, or `None` if out of range.
    pub fn get(&self, i: usize) -> Option<&FhirPathValue> {
        self.items.get(i)
    }

    /// Iterate over the elements in order.
    pub fn iter(&self) -> std::slice::Iter<'_, FhirPathValue> {
        self.items.iter()
    }

    /// Consume into the underlying vector.
    pub fn into_vec(self) -> Vec<FhirPathValue> {
        self.items
    }

    /// Borrow the underlying slice.
    pub fn as_slice(&self) -> &[FhirPathValue] {
        &self.items
    }

    /// A new collection keeping only the first occurrence of each distinct
    /// (model-aware) element.
    pub fn distinct(&self, model: Option<&dyn ModelAdapter>) -> Collection {
        let mut result = Collection::empty();
        result.add_all_unique(self, model);
        result
    }

    /// `true` iff every element of `self` is contained in `other`; vacuously
    /// `true` when `self` is empty.
    pub fn is_subset_of(&self, other: &Collection, model: Option<&dyn ModelAdapter>) -> bool {
        self.items.iter().all(|item| other.contains(item, model))
    }
}

impl FromIterator<FhirPathValue> for Collection {
    fn from_iter<T: IntoIterator<Item = FhirPathValue>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Collection {
    type Item = FhirPathValue;
    type IntoIter = std::vec::IntoIter<FhirPathValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: i64) -> FhirPathValue {
        FhirPathValue::Integer(v as i32)
    }

    #[test]
    fn add_unique_drops_duplicates() {
        let mut c = Collection::empty();
        c.add_unique(int(1), None);
        c.add_unique(int(1), None);
        c.add_unique(int(2), None);
        assert_eq!(c.count(), 2);
    }

    #[test]
    fn distinct_preserves_first_occurrence_order() {
        let c = Collection::from_vec(vec![int(3), int(1), int(3), int(2)]);
        let d = c.distinct(None);
        assert_eq!(d.count(), 3);
        assert_eq!(d.get(0), Some(&int(3)));
        assert_eq!(d.get(1), Some(&int(1)));
        assert_eq!(d.get(2), Some(&int(2)));
    }

    #[test]
    fn subset_vacuously_true_on_empty() {
        let empty = Collection::empty();
        let other = Collection::from_vec(vec![int(1)]);
        assert!(empty.is_subset_of(&other, None));
    }
}
