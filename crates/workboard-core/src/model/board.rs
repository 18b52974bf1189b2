//! The board: sole owner of its work items and of every parent/child link.
//!
//! Items live in a single map keyed by id and refer to one another only by
//! id. Every public mutation leaves the board in a state where, for any two
//! items A and B, `B ∈ A.children_ids` holds exactly when
//! `B.parent_id == A.id`, and every referenced id resolves. Operations that
//! can fail check everything up front and leave the board untouched on error.
//!
//! # Reparenting
//!
//! Linking a child that already has a different parent first detaches it
//! from that parent, so a child is never listed under two parents.
//!
//! # Cycles
//!
//! Linking an item under itself or under one of its descendants closes a
//! cycle. What happens then is governed by [`CyclePolicy`].

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{BoardConfig, CyclePolicy};
use crate::error::{BoardError, ValidationError};
use crate::graph::hierarchy;
use crate::model::item::{
    ItemId, ItemType, MAX_CHILDREN, MAX_DESCRIPTION_LENGTH, Status, WorkItem, validate_text,
};

/// Opaque 128-bit board identifier.
pub type BoardId = Uuid;

/// Hard upper bound on the number of items a board may hold.
pub const MAX_WORK_ITEMS: usize = 5000;
pub const MAX_NAME_LENGTH: usize = 255;

/// Partial field update for [`WorkBoard::update_work_item`].
///
/// Only the fields set here change. Identity, type, creation time and link
/// fields cannot be changed through this path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkItemUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<Status>,
}

impl WorkItemUpdate {
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }
}

/// A named collection of work items with symmetric parent/child links.
///
/// Deserializing does not re-check links; run
/// [`check_links`](crate::verify::check_links) on boards read from storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkBoard {
    id: BoardId,
    created_at: DateTime<Local>,
    name: String,
    description: String,
    work_items: HashMap<ItemId, WorkItem>,
    #[serde(default = "default_max_work_items")]
    max_work_items: usize,
    #[serde(default = "default_max_children")]
    max_children: usize,
    #[serde(default)]
    cycles: CyclePolicy,
}

const fn default_max_work_items() -> usize {
    MAX_WORK_ITEMS
}

const fn default_max_children() -> usize {
    MAX_CHILDREN
}

impl WorkBoard {
    /// Create an empty board with default limits.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Validation`] if `name` is not 1-255 chars or
    /// `description` is not 1-2000 chars.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, BoardError> {
        Self::with_config(name, description, &BoardConfig::default())
    }

    /// Create an empty board using `config`.
    ///
    /// Limits above the built-in bounds are clamped to them; run
    /// [`BoardConfig::validate`] first to reject such configs instead.
    ///
    /// # Errors
    ///
    /// Same as [`WorkBoard::new`].
    pub fn with_config(
        name: impl Into<String>,
        description: impl Into<String>,
        config: &BoardConfig,
    ) -> Result<Self, BoardError> {
        let name = name.into();
        let description = description.into();
        validate_text("name", &name, MAX_NAME_LENGTH)?;
        validate_text("description", &description, MAX_DESCRIPTION_LENGTH)?;

        Ok(Self {
            id: Uuid::new_v4(),
            created_at: Local::now(),
            name,
            description,
            work_items: HashMap::new(),
            max_work_items: config.limits.max_work_items.clamp(1, MAX_WORK_ITEMS),
            max_children: config.limits.max_children.clamp(1, MAX_CHILDREN),
            cycles: config.links.cycles,
        })
    }

    #[must_use]
    pub const fn id(&self) -> BoardId {
        self.id
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub const fn max_work_items(&self) -> usize {
        self.max_work_items
    }

    #[must_use]
    pub const fn max_children(&self) -> usize {
        self.max_children
    }

    /// # Errors
    ///
    /// Returns [`ValidationError`] if `name` is out of bounds; the board is
    /// left unchanged.
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), ValidationError> {
        let name = name.into();
        validate_text("name", &name, MAX_NAME_LENGTH)?;
        self.name = name;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ValidationError`] if `description` is out of bounds; the
    /// board is left unchanged.
    pub fn set_description(
        &mut self,
        description: impl Into<String>,
    ) -> Result<(), ValidationError> {
        let description = description.into();
        validate_text("description", &description, MAX_DESCRIPTION_LENGTH)?;
        self.description = description;
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.work_items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.work_items.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.work_items.contains_key(&id)
    }

    // -----------------------------------------------------------------------
    // CRUD
    // -----------------------------------------------------------------------

    /// Register `item` and link it to the parent and children it names.
    ///
    /// Capacity, id uniqueness, the existence of every referenced item, the
    /// parent's fan-out and the cycle policy are all checked before anything
    /// is registered. Children that already have another parent are moved
    /// under `item`.
    ///
    /// # Errors
    ///
    /// - [`BoardError::BoardFull`] if the board is at capacity.
    /// - [`BoardError::Validation`] if an item with the same id is present.
    /// - [`BoardError::NotFound`] if the parent or a child is not on the board.
    /// - [`BoardError::ChildrenFull`] if the parent (or `item` itself) would
    ///   exceed the child limit.
    /// - [`BoardError::CycleDetected`] under [`CyclePolicy::Reject`].
    pub fn add_work_item(&mut self, item: WorkItem) -> Result<&WorkItem, BoardError> {
        if self.work_items.len() >= self.max_work_items {
            return Err(BoardError::BoardFull {
                max: self.max_work_items,
            });
        }

        let id = item.id();
        if self.contains(id) {
            return Err(ValidationError::DuplicateItem { id }.into());
        }

        let resolves = |other: ItemId| other == id || self.contains(other);

        if let Some(parent_id) = item.parent_id() {
            if !resolves(parent_id) {
                return Err(BoardError::NotFound { id: parent_id });
            }
            let siblings = if parent_id == id {
                item.children_ids()
            } else {
                self.get_work_item(parent_id)?.children_ids()
            };
            if !siblings.contains(&id) && siblings.len() >= self.max_children {
                return Err(BoardError::ChildrenFull {
                    parent_id,
                    max: self.max_children,
                });
            }
        }

        if let Some(missing) = item.children_ids().iter().find(|c| !resolves(**c)) {
            return Err(BoardError::NotFound { id: *missing });
        }
        if item.children_ids().len() > self.max_children {
            return Err(BoardError::ChildrenFull {
                parent_id: id,
                max: self.max_children,
            });
        }

        if let Some((parent_id, child_id)) = self.pending_cycle(&item) {
            self.guard_cycle(parent_id, child_id)?;
        }

        let parent_id = item.parent_id();
        let children = item.children_ids().to_vec();
        self.work_items.insert(id, item);

        if let Some(parent_id) = parent_id {
            self.attach(parent_id, id)?;
        }
        for child_id in children {
            self.attach(id, child_id)?;
        }

        debug!(item_id = %id, parent_id = ?parent_id, "added work item");
        self.get_work_item(id)
    }

    /// Look up an item, returning `None` if it is not on the board.
    #[must_use]
    pub fn find_work_item(&self, id: ItemId) -> Option<&WorkItem> {
        self.work_items.get(&id)
    }

    /// Look up an item that must exist.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NotFound`] if `id` is not on the board.
    pub fn get_work_item(&self, id: ItemId) -> Result<&WorkItem, BoardError> {
        self.work_items.get(&id).ok_or(BoardError::NotFound { id })
    }

    /// Replace the fields set in `update` on a copy of the item and install
    /// the copy. Link fields carry over untouched.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NotFound`] if `id` is absent or
    /// [`BoardError::Validation`] if a supplied field is out of bounds. The
    /// stored item is unchanged on failure.
    pub fn update_work_item(
        &mut self,
        id: ItemId,
        update: WorkItemUpdate,
    ) -> Result<&WorkItem, BoardError> {
        let slot = self
            .work_items
            .get_mut(&id)
            .ok_or(BoardError::NotFound { id })?;

        let mut updated = slot.clone();
        if let Some(title) = update.title {
            updated.set_title(title)?;
        }
        if let Some(description) = update.description {
            updated.set_description(description)?;
        }
        if let Some(status) = update.status {
            updated.set_status(status);
        }

        *slot = updated;
        debug!(item_id = %id, "updated work item");
        Ok(&*slot)
    }

    /// Remove an item, detaching it from its parent and orphaning its
    /// children. Children stay on the board with no parent.
    ///
    /// Returns the removed item with its link fields cleared.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NotFound`] if `id` is not on the board.
    pub fn delete_work_item(&mut self, id: ItemId) -> Result<WorkItem, BoardError> {
        if let Some(parent_id) = self.get_work_item(id)?.parent_id() {
            self.unlink_parent_and_child(parent_id, id)?;
        }

        let children = self.get_work_item(id)?.children_ids().to_vec();
        for child_id in &children {
            self.unlink_parent_and_child(id, *child_id)?;
        }
        if !children.is_empty() {
            info!(item_id = %id, orphaned = children.len(), "deleted parent, children orphaned");
        }

        let removed = self
            .work_items
            .remove(&id)
            .ok_or(BoardError::NotFound { id })?;
        debug!(item_id = %id, "deleted work item");
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// All items, in no meaningful order.
    #[must_use]
    pub fn list_work_items(&self) -> Vec<&WorkItem> {
        self.work_items.values().collect()
    }

    #[must_use]
    pub fn list_by_type(&self, item_type: ItemType) -> Vec<&WorkItem> {
        self.work_items
            .values()
            .filter(|item| item.item_type() == item_type)
            .collect()
    }

    #[must_use]
    pub fn list_by_status(&self, status: Status) -> Vec<&WorkItem> {
        self.work_items
            .values()
            .filter(|item| item.status() == status)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorkItem> {
        self.work_items.values()
    }

    // -----------------------------------------------------------------------
    // Relationships
    // -----------------------------------------------------------------------

    /// Make `child_id` a child of `parent_id`, updating both ends.
    ///
    /// If the child already has a different parent it is detached from that
    /// parent first. Linking a pair that is already linked does nothing.
    ///
    /// # Errors
    ///
    /// - [`BoardError::NotFound`] if either item is absent.
    /// - [`BoardError::ChildrenFull`] if the parent is at its child limit.
    /// - [`BoardError::CycleDetected`] under [`CyclePolicy::Reject`].
    ///
    /// Nothing changes on failure.
    pub fn link_parent_and_child(
        &mut self,
        parent_id: ItemId,
        child_id: ItemId,
    ) -> Result<(), BoardError> {
        let parent = self.get_work_item(parent_id)?;
        self.get_work_item(child_id)?;

        if parent.has_child(child_id) {
            return Ok(());
        }
        if parent.children_ids().len() >= self.max_children {
            return Err(BoardError::ChildrenFull {
                parent_id,
                max: self.max_children,
            });
        }
        if hierarchy::would_create_cycle(self, parent_id, child_id) {
            self.guard_cycle(parent_id, child_id)?;
        }

        self.attach(parent_id, child_id)?;
        debug!(parent_id = %parent_id, child_id = %child_id, "linked work items");
        Ok(())
    }

    /// Remove the link between `parent_id` and `child_id` on both ends.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NotFound`] if either item is absent, or
    /// [`BoardError::NotAChild`] if `child_id` is not a child of `parent_id`.
    /// The child's `parent_id` is untouched on failure.
    pub fn unlink_parent_and_child(
        &mut self,
        parent_id: ItemId,
        child_id: ItemId,
    ) -> Result<(), BoardError> {
        self.get_work_item(parent_id)?;
        self.get_work_item(child_id)?;

        self.item_mut(parent_id)?.remove_child(child_id)?;
        self.item_mut(child_id)?.remove_parent();
        debug!(parent_id = %parent_id, child_id = %child_id, "unlinked work items");
        Ok(())
    }

    /// Resolve the children of `parent_id`, in link order.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NotFound`] if the parent is absent, or
    /// [`BoardError::DanglingReference`] if a listed child does not resolve.
    pub fn get_children(&self, parent_id: ItemId) -> Result<Vec<&WorkItem>, BoardError> {
        let parent = self.get_work_item(parent_id)?;
        parent
            .children_ids()
            .iter()
            .map(|child_id| {
                self.work_items
                    .get(child_id)
                    .ok_or(BoardError::DanglingReference {
                        from: parent_id,
                        to: *child_id,
                    })
            })
            .collect()
    }

    /// Resolve the parent of `child_id`, if it has one.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NotFound`] if the child is absent, or
    /// [`BoardError::DanglingReference`] if its parent does not resolve.
    pub fn get_parent(&self, child_id: ItemId) -> Result<Option<&WorkItem>, BoardError> {
        let Some(parent_id) = self.get_work_item(child_id)?.parent_id() else {
            return Ok(None);
        };
        self.work_items
            .get(&parent_id)
            .map(Some)
            .ok_or(BoardError::DanglingReference {
                from: child_id,
                to: parent_id,
            })
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn item_mut(&mut self, id: ItemId) -> Result<&mut WorkItem, BoardError> {
        self.work_items
            .get_mut(&id)
            .ok_or(BoardError::NotFound { id })
    }

    /// Point `child_id` at `parent_id` and list it under the parent,
    /// detaching it from any previous parent. Both ids must exist and the
    /// parent's fan-out must already have been checked.
    fn attach(&mut self, parent_id: ItemId, child_id: ItemId) -> Result<(), BoardError> {
        let previous = self.get_work_item(child_id)?.parent_id();
        if let Some(old_parent_id) = previous.filter(|old| *old != parent_id) {
            if let Some(old_parent) = self.work_items.get_mut(&old_parent_id) {
                if old_parent.has_child(child_id) {
                    old_parent.remove_child(child_id)?;
                }
            }
            warn!(
                child_id = %child_id,
                old_parent_id = %old_parent_id,
                new_parent_id = %parent_id,
                "reparenting work item, detached from previous parent"
            );
        }

        self.item_mut(child_id)?.add_parent(parent_id);
        self.item_mut(parent_id)?.add_child(child_id)
    }

    /// The first link in `item`'s own parent/children fields that would
    /// close a cycle once it is registered, as `(parent, child)`.
    fn pending_cycle(&self, item: &WorkItem) -> Option<(ItemId, ItemId)> {
        let id = item.id();
        let parent_id = item.parent_id();
        if parent_id == Some(id) {
            return Some((id, id));
        }

        let lineage: Vec<ItemId> = parent_id
            .map(|p| {
                let mut chain = vec![p];
                chain.extend(hierarchy::ancestor_ids(self, p));
                chain
            })
            .unwrap_or_default();

        item.children_ids()
            .iter()
            .find(|child_id| **child_id == id || lineage.contains(child_id))
            .map(|child_id| (id, *child_id))
    }

    fn guard_cycle(&self, parent_id: ItemId, child_id: ItemId) -> Result<(), BoardError> {
        match self.cycles {
            CyclePolicy::Allow => Ok(()),
            CyclePolicy::Warn => {
                warn!(
                    parent_id = %parent_id,
                    child_id = %child_id,
                    "link closes a hierarchy cycle"
                );
                Ok(())
            }
            CyclePolicy::Reject => Err(BoardError::CycleDetected {
                parent_id,
                child_id,
            }),
        }
    }
}
