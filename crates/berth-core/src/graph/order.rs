use berth_model::UnitId;
use serde::{Deserialize, Serialize};

/// Units in the order they may be started.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StartOrder(Vec<UnitId>);

impl StartOrder {
    pub(crate) fn new(ids: Vec<UnitId>) -> Self {
        Self(ids)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UnitId> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[UnitId] {
        &self.0
    }

    /// Zero-based start position of `id`.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.0.iter().position(|u| u.as_str() == id)
    }

    pub fn into_vec(self) -> Vec<UnitId> {
        self.0
    }
}

impl<'a> IntoIterator for &'a StartOrder {
    type Item = &'a UnitId;
    type IntoIter = std::slice::Iter<'a, UnitId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
