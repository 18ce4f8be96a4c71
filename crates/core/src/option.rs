//! Options: the binary levers whose combinations make up the state space.
//!
//! Options live in a single master list owned by the conflict. Decision
//! makers and conditions refer to them through stable [`OptionId`]s, so
//! reordering the master list (which changes every state's decimal value)
//! never invalidates a reference; removing an option does, and the model
//! prunes whatever pointed at it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of an option, independent of its position in the master list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OptionId(pub u32);

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which way an option may be moved once the conflict is under way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PermittedDirection {
    #[default]
    #[serde(rename = "both")]
    Both,
    /// Once taken, the option cannot be withdrawn.
    #[serde(rename = "fwd")]
    Forward,
    /// Once withdrawn, the option cannot be taken again.
    #[serde(rename = "back")]
    Backward,
}

impl PermittedDirection {
    /// Whether moving this option from `from` to `to` (taken = true) is allowed.
    pub fn allows(self, from: bool, to: bool) -> bool {
        match self {
            PermittedDirection::Both => true,
            PermittedDirection::Forward => !(from && !to),
            PermittedDirection::Backward => !(!from && to),
        }
    }
}

/// A single binary option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictOption {
    pub id: OptionId,
    pub name: String,
    pub permitted_direction: PermittedDirection,
    /// Number of decision makers that control this option.
    pub refs: usize,
}

/// The conflict's master option list. Position in the list is the option's
/// master index; its decimal weight is `2^index`.
#[derive(Debug, Clone, Default)]
pub struct OptionList {
    items: Vec<ConflictOption>,
    next_id: u32,
}

impl OptionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConflictOption> {
        self.items.iter()
    }

    pub fn push(&mut self, name: impl Into<String>, direction: PermittedDirection) -> OptionId {
        let id = OptionId(self.next_id);
        self.next_id += 1;
        self.items.push(ConflictOption {
            id,
            name: name.into(),
            permitted_direction: direction,
            refs: 0,
        });
        id
    }

    pub fn remove(&mut self, id: OptionId) -> Option<ConflictOption> {
        let idx = self.index_of(id)?;
        Some(self.items.remove(idx))
    }

    pub fn contains(&self, id: OptionId) -> bool {
        self.index_of(id).is_some()
    }

    /// Master index of an option.
    pub fn index_of(&self, id: OptionId) -> Option<usize> {
        self.items.iter().position(|o| o.id == id)
    }

    pub fn get(&self, id: OptionId) -> Option<&ConflictOption> {
        self.items.iter().find(|o| o.id == id)
    }

    pub fn get_mut(&mut self, id: OptionId) -> Option<&mut ConflictOption> {
        self.items.iter_mut().find(|o| o.id == id)
    }

    pub fn at(&self, index: usize) -> Option<&ConflictOption> {
        self.items.get(index)
    }

    /// Decimal weight (`2^master_index`) of an option.
    pub fn weight(&self, id: OptionId) -> Option<u64> {
        self.index_of(id).map(|idx| 1u64 << idx)
    }

    /// Reorder the master list so that `order` comes first (in that order),
    /// followed by every other option in its current relative order.
    pub fn reorder_front(&mut self, order: &[OptionId]) {
        let mut front = Vec::with_capacity(self.items.len());
        for id in order {
            if let Some(idx) = self.items.iter().position(|o| o.id == *id) {
                front.push(self.items.remove(idx));
            }
        }
        front.append(&mut self.items);
        self.items = front;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_follow_master_order() {
        let mut list = OptionList::new();
        let a = list.push("a", PermittedDirection::Both);
        let b = list.push("b", PermittedDirection::Both);
        let c = list.push("c", PermittedDirection::Both);
        assert_eq!(list.weight(a), Some(1));
        assert_eq!(list.weight(b), Some(2));
        assert_eq!(list.weight(c), Some(4));

        list.reorder_front(&[c]);
        assert_eq!(list.weight(c), Some(1));
        assert_eq!(list.weight(a), Some(2));
        assert_eq!(list.weight(b), Some(4));
    }

    #[test]
    fn test_ids_survive_removal() {
        let mut list = OptionList::new();
        let a = list.push("a", PermittedDirection::Both);
        let b = list.push("b", PermittedDirection::Both);
        list.remove(a);
        assert!(!list.contains(a));
        assert_eq!(list.index_of(b), Some(0));
        let c = list.push("c", PermittedDirection::Both);
        assert_ne!(c, a);
    }

    #[test]
    fn test_direction_allows() {
        assert!(PermittedDirection::Both.allows(true, false));
        assert!(!PermittedDirection::Forward.allows(true, false));
        assert!(PermittedDirection::Forward.allows(false, true));
        assert!(!PermittedDirection::Backward.allows(false, true));
        assert!(PermittedDirection::Backward.allows(true, false));
        assert!(PermittedDirection::Forward.allows(true, true));
    }

    #[test]
    fn test_direction_serde_names() {
        let json = serde_json::to_string(&PermittedDirection::Forward).unwrap();
        assert_eq!(json, "\"fwd\"");
        let back: PermittedDirection = serde_json::from_str("\"back\"").unwrap();
        assert_eq!(back, PermittedDirection::Backward);
    }
}
