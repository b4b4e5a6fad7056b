//! `OneOrMany<T>`: exactly one or several items, never empty.

use serde::{Deserialize, Serialize};

/// Holds exactly one `T`, or several. Used wherever an API may answer
/// with a single item or a batch of them but never with nothing (e.g.
/// a broker tick subscription ack, a single-fill or multi-fill order
/// result).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn one(item: T) -> Self {
        Self::One(item)
    }

    /// Builds a `OneOrMany` from a non-empty vec. Returns `None` for an
    /// empty one rather than silently constructing a degenerate value.
    pub fn many(items: Vec<T>) -> Option<Self> {
        if items.is_empty() {
            None
        } else {
            Some(Self::Many(items))
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T>
    where
        T: 'static,
    {
        match self {
            Self::One(item) => std::slice::from_ref(item).iter(),
            Self::Many(items) => items.iter(),
        }
    }
}

impl<T> From<T> for OneOrMany<T> {
    fn from(value: T) -> Self {
        Self::One(value)
    }
}

impl<T> IntoIterator for OneOrMany<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_vec().into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn many_rejects_empty_vec() {
        assert!(OneOrMany::<u32>::many(Vec::new()).is_none());
    }

    #[test]
    fn one_has_len_one() {
        assert_eq!(OneOrMany::one(7).len(), 1);
    }

    #[test]
    fn into_vec_flattens_either_variant() {
        assert_eq!(OneOrMany::one(1).into_vec(), vec![1]);
        assert_eq!(
            OneOrMany::many(vec![1, 2, 3]).unwrap().into_vec(),
            vec![1, 2, 3]
        );
    }
}
