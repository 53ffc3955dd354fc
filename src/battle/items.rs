//! Battle items
//!
//! Items are never physically removed: deleting one moves it to the
//! `Deleted` list so property can still be accounted for after the
//! battle. Bodies keep a handle back to the unit they came from.

use serde::{Deserialize, Serialize};

use crate::core::types::{ItemId, Position, UnitId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    Weapon,
    Ammo,
    Grenade,
    Medikit,
    Corpse,
    UnconsciousBody,
    Artefact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemLocation {
    Carried(UnitId),
    Ground(Position),
    Nowhere,
}

/// Which persisted list an item belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ItemList {
    #[default]
    Active,
    GuaranteedRecovery,
    ConditionalRecovery,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleItem {
    pub id: ItemId,
    pub item_type: String,
    pub kind: ItemKind,
    pub location: ItemLocation,
    #[serde(skip)]
    pub list: ItemList,
    /// Unit a corpse or unconscious body belongs to
    #[serde(default)]
    pub body: Option<UnitId>,
}

/// Owning arena for every item of a battle
#[derive(Debug, Clone, Default)]
pub struct ItemStore {
    items: Vec<BattleItem>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, item_type: &str, kind: ItemKind, location: ItemLocation) -> ItemId {
        let id = ItemId(self.items.len() as u32);
        self.items.push(BattleItem {
            id,
            item_type: item_type.to_string(),
            kind,
            location,
            list: ItemList::Active,
            body: None,
        });
        id
    }

    /// Append a loaded item; ids must arrive densely and in order
    pub(crate) fn restore(&mut self, mut item: BattleItem, list: ItemList) -> bool {
        if item.id.index() != self.items.len() {
            return false;
        }
        item.list = list;
        self.items.push(item);
        true
    }

    /// Add a body item for `unit` lying at `position`
    pub fn add_body(&mut self, unit: UnitId, kind: ItemKind, position: Position) -> ItemId {
        let id = self.add("body", kind, ItemLocation::Ground(position));
        self.items[id.index()].body = Some(unit);
        id
    }

    pub fn get(&self, id: ItemId) -> Option<&BattleItem> {
        self.items.get(id.index())
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut BattleItem> {
        self.items.get_mut(id.index())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BattleItem> {
        self.items.iter()
    }

    pub fn in_list(&self, list: ItemList) -> impl Iterator<Item = &BattleItem> {
        self.items.iter().filter(move |i| i.list == list)
    }

    /// Live (not deleted) items lying on `position`
    pub fn on_ground_at(&self, position: Position) -> impl Iterator<Item = &BattleItem> {
        self.items.iter().filter(move |i| {
            i.list != ItemList::Deleted && i.location == ItemLocation::Ground(position)
        })
    }

    pub fn carried_by(&self, unit: UnitId) -> impl Iterator<Item = &BattleItem> {
        self.items.iter().filter(move |i| {
            i.list != ItemList::Deleted && i.location == ItemLocation::Carried(unit)
        })
    }

    pub fn is_armed(&self, unit: UnitId) -> bool {
        self.carried_by(unit)
            .any(|i| matches!(i.kind, ItemKind::Weapon | ItemKind::Grenade))
    }

    /// The live body item that belongs to `unit`
    pub fn body_of(&self, unit: UnitId) -> Option<ItemId> {
        self.items
            .iter()
            .find(|i| i.list != ItemList::Deleted && i.body == Some(unit))
            .map(|i| i.id)
    }

    pub fn move_to(&mut self, id: ItemId, location: ItemLocation) -> bool {
        match self.get_mut(id) {
            Some(item) => {
                item.location = location;
                true
            }
            None => false,
        }
    }

    /// Soft-delete: the item keeps its data but leaves play
    pub fn soft_delete(&mut self, id: ItemId) -> bool {
        match self.get_mut(id) {
            Some(item) => {
                item.list = ItemList::Deleted;
                item.location = ItemLocation::Nowhere;
                true
            }
            None => false,
        }
    }

    /// Items carried by a unit that just went down fall to its tile
    pub fn drop_all(&mut self, unit: UnitId, position: Position) {
        for item in self.items.iter_mut().filter(|i| {
            i.list != ItemList::Deleted && i.location == ItemLocation::Carried(unit)
        }) {
            item.location = ItemLocation::Ground(position);
        }
    }

    /// Sort live items into recovery lists at battle end
    ///
    /// Items inside the extraction zone (or carried by a unit standing in
    /// it) are guaranteed; everything else is conditional on the outcome.
    pub fn sort_for_recovery(
        &mut self,
        in_extraction_zone: impl Fn(Position) -> bool,
        unit_position: impl Fn(UnitId) -> Option<Position>,
    ) {
        for item in self.items.iter_mut().filter(|i| i.list == ItemList::Active) {
            let position = match item.location {
                ItemLocation::Ground(pos) => Some(pos),
                ItemLocation::Carried(unit) => unit_position(unit),
                ItemLocation::Nowhere => None,
            };
            item.list = match position {
                Some(pos) if in_extraction_zone(pos) => ItemList::GuaranteedRecovery,
                _ => ItemList::ConditionalRecovery,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_delete_keeps_item() {
        let mut store = ItemStore::new();
        let rifle = store.add("rifle", ItemKind::Weapon, ItemLocation::Carried(UnitId(0)));
        assert!(store.is_armed(UnitId(0)));

        assert!(store.soft_delete(rifle));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(rifle).map(|i| i.list), Some(ItemList::Deleted));
        assert!(!store.is_armed(UnitId(0)));
        assert_eq!(store.in_list(ItemList::Deleted).count(), 1);
    }

    #[test]
    fn test_body_back_reference() {
        let mut store = ItemStore::new();
        let pos = Position::new(2, 2, 0);
        let body = store.add_body(UnitId(4), ItemKind::Corpse, pos);
        assert_eq!(store.body_of(UnitId(4)), Some(body));
        assert_eq!(store.on_ground_at(pos).count(), 1);
        store.soft_delete(body);
        assert_eq!(store.body_of(UnitId(4)), None);
    }

    #[test]
    fn test_drop_all() {
        let mut store = ItemStore::new();
        store.add("rifle", ItemKind::Weapon, ItemLocation::Carried(UnitId(1)));
        store.add("grenade", ItemKind::Grenade, ItemLocation::Carried(UnitId(1)));
        store.drop_all(UnitId(1), Position::new(3, 3, 0));
        assert_eq!(store.carried_by(UnitId(1)).count(), 0);
        assert_eq!(store.on_ground_at(Position::new(3, 3, 0)).count(), 2);
    }

    #[test]
    fn test_sort_for_recovery() {
        let mut store = ItemStore::new();
        let near = store.add("clip", ItemKind::Ammo, ItemLocation::Ground(Position::new(0, 0, 0)));
        let far = store.add("clip", ItemKind::Ammo, ItemLocation::Ground(Position::new(9, 9, 0)));
        let carried = store.add("rifle", ItemKind::Weapon, ItemLocation::Carried(UnitId(2)));

        store.sort_for_recovery(|p| p.x < 3 && p.y < 3, |_| Some(Position::new(1, 1, 0)));

        assert_eq!(store.get(near).map(|i| i.list), Some(ItemList::GuaranteedRecovery));
        assert_eq!(store.get(far).map(|i| i.list), Some(ItemList::ConditionalRecovery));
        assert_eq!(store.get(carried).map(|i| i.list), Some(ItemList::GuaranteedRecovery));
    }
}
