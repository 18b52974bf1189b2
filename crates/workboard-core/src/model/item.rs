use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use crate::error::{BoardError, ErrorCode, ValidationError};

/// Opaque 128-bit work item identifier.
pub type ItemId = Uuid;

pub const MAX_TITLE_LENGTH: usize = 255;
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;

/// Hard upper bound on `children_ids` for any item.
pub const MAX_CHILDREN: usize = 100;

/// The four kinds of work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Task,
    Story,
    Feature,
    Epic,
}

impl ItemType {
    pub const ALL: [Self; 4] = [Self::Task, Self::Story, Self::Feature, Self::Epic];

    const fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Story => "story",
            Self::Feature => "feature",
            Self::Epic => "epic",
        }
    }
}

/// The three workflow states. Any state may move to any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    ToDo,
    InProgress,
    Done,
}

impl Status {
    pub const ALL: [Self; 3] = [Self::ToDo, Self::InProgress, Self::Done];

    const fn as_str(self) -> &'static str {
        match self {
            Self::ToDo => "to_do",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl ParseEnumError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::InvalidEnumValue
    }
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize(input: &str) -> String {
    input.trim().to_ascii_lowercase()
}

impl FromStr for ItemType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        match normalized.as_str() {
            "task" => Ok(Self::Task),
            "story" => Ok(Self::Story),
            "feature" => Ok(Self::Feature),
            "epic" => Ok(Self::Epic),
            _ => Err(ParseEnumError {
                expected: "type",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for Status {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        match normalized.as_str() {
            "to_do" | "todo" => Ok(Self::ToDo),
            "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            _ => Err(ParseEnumError {
                expected: "status",
                got: s.to_string(),
            }),
        }
    }
}

/// Check a free-text field is non-empty and at most `max` characters.
pub(crate) fn validate_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    let len = value.chars().count();
    if len > max {
        return Err(ValidationError::TooLong { field, max, len });
    }
    Ok(())
}

fn validate_children(children_ids: &[ItemId]) -> Result<(), ValidationError> {
    if children_ids.len() > MAX_CHILDREN {
        return Err(ValidationError::TooManyChildren {
            max: MAX_CHILDREN,
            len: children_ids.len(),
        });
    }
    let mut seen = std::collections::HashSet::with_capacity(children_ids.len());
    for id in children_ids {
        if !seen.insert(*id) {
            return Err(ValidationError::DuplicateChild { id: *id });
        }
    }
    Ok(())
}

/// Construction arguments for a [`WorkItem`].
///
/// `item_type`, `title` and `description` are required; the rest default to
/// `to_do`, no parent and no children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWorkItem {
    pub item_type: ItemType,
    pub title: String,
    pub description: String,
    pub status: Status,
    pub parent_id: Option<ItemId>,
    pub children_ids: Vec<ItemId>,
}

impl NewWorkItem {
    #[must_use]
    pub fn new(
        item_type: ItemType,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            item_type,
            title: title.into(),
            description: description.into(),
            status: Status::default(),
            parent_id: None,
            children_ids: Vec::new(),
        }
    }

    #[must_use]
    pub fn status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn parent(mut self, parent_id: ItemId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    #[must_use]
    pub fn children(mut self, children_ids: Vec<ItemId>) -> Self {
        self.children_ids = children_ids;
        self
    }

    /// Validate and build the item.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Validation`] if the title or description is out
    /// of bounds, or `children_ids` has duplicates or more than
    /// [`MAX_CHILDREN`] entries. No item is produced on failure.
    pub fn build(self) -> Result<WorkItem, BoardError> {
        WorkItem::create(self)
    }
}

/// A trackable unit of work.
///
/// `id`, `item_type` and `created_at` are fixed at construction. Link fields
/// are only well-formed locally (no duplicate children, bounded fan-out);
/// keeping both ends of a link in sync is the board's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    id: ItemId,
    item_type: ItemType,
    created_at: DateTime<Local>,
    status: Status,
    title: String,
    description: String,
    parent_id: Option<ItemId>,
    children_ids: Vec<ItemId>,
}

impl WorkItem {
    /// Create a `to_do` item with no links.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Validation`] if the title or description is out
    /// of bounds.
    pub fn new(
        item_type: ItemType,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, BoardError> {
        Self::create(NewWorkItem::new(item_type, title, description))
    }

    /// Create an item from full construction arguments.
    ///
    /// # Errors
    ///
    /// See [`NewWorkItem::build`].
    pub fn create(init: NewWorkItem) -> Result<Self, BoardError> {
        validate_text("title", &init.title, MAX_TITLE_LENGTH)?;
        validate_text("description", &init.description, MAX_DESCRIPTION_LENGTH)?;
        validate_children(&init.children_ids)?;

        Ok(Self {
            id: Uuid::new_v4(),
            item_type: init.item_type,
            created_at: Local::now(),
            status: init.status,
            title: init.title,
            description: init.description,
            parent_id: init.parent_id,
            children_ids: init.children_ids,
        })
    }

    #[must_use]
    pub const fn id(&self) -> ItemId {
        self.id
    }

    #[must_use]
    pub const fn item_type(&self) -> ItemType {
        self.item_type
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub const fn parent_id(&self) -> Option<ItemId> {
        self.parent_id
    }

    #[must_use]
    pub fn children_ids(&self) -> &[ItemId] {
        &self.children_ids
    }

    #[must_use]
    pub fn has_child(&self, child_id: ItemId) -> bool {
        self.children_ids.contains(&child_id)
    }

    pub fn start(&mut self) {
        self.status = Status::InProgress;
    }

    pub fn complete(&mut self) {
        self.status = Status::Done;
    }

    pub fn reset(&mut self) {
        self.status = Status::ToDo;
    }

    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    /// # Errors
    ///
    /// Returns [`ValidationError`] if `title` is empty or too long; the item
    /// is left unchanged.
    pub fn set_title(&mut self, title: impl Into<String>) -> Result<(), ValidationError> {
        let title = title.into();
        validate_text("title", &title, MAX_TITLE_LENGTH)?;
        self.title = title;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ValidationError`] if `description` is empty or too long; the
    /// item is left unchanged.
    pub fn set_description(
        &mut self,
        description: impl Into<String>,
    ) -> Result<(), ValidationError> {
        let description = description.into();
        validate_text("description", &description, MAX_DESCRIPTION_LENGTH)?;
        self.description = description;
        Ok(())
    }

    /// Point this item at `parent_id`, overwriting any previous parent.
    ///
    /// The previous parent's `children_ids` is not touched.
    pub fn add_parent(&mut self, parent_id: ItemId) {
        self.parent_id = Some(parent_id);
    }

    pub fn remove_parent(&mut self) {
        self.parent_id = None;
    }

    /// Append `child_id`, keeping insertion order. Adding a child that is
    /// already present is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::ChildrenFull`] if the item already has
    /// [`MAX_CHILDREN`] children.
    pub fn add_child(&mut self, child_id: ItemId) -> Result<(), BoardError> {
        if self.has_child(child_id) {
            return Ok(());
        }
        if self.children_ids.len() >= MAX_CHILDREN {
            return Err(BoardError::ChildrenFull {
                parent_id: self.id,
                max: MAX_CHILDREN,
            });
        }
        self.children_ids.push(child_id);
        Ok(())
    }

    /// Remove `child_id`, preserving the order of the remaining children.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NotAChild`] if `child_id` is not a child.
    pub fn remove_child(&mut self, child_id: ItemId) -> Result<(), BoardError> {
        let Some(pos) = self.children_ids.iter().position(|id| *id == child_id) else {
            return Err(BoardError::NotAChild {
                parent_id: self.id,
                child_id,
            });
        };
        self.children_ids.remove(pos);
        Ok(())
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.item_type, self.title)
    }
}
