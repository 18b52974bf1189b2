use std::fmt;

use crate::model::item::ItemId;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ItemNotFound,
    NotARelationship,
    CycleDetected,
    BoardFull,
    TooManyChildren,
    InvalidField,
    DuplicateId,
    InvalidEnumValue,
    DanglingReference,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ItemNotFound => "E2001",
            Self::NotARelationship => "E2002",
            Self::CycleDetected => "E2003",
            Self::InvalidField => "E2004",
            Self::InvalidEnumValue => "E2005",
            Self::DuplicateId => "E2006",
            Self::BoardFull => "E4001",
            Self::TooManyChildren => "E4002",
            Self::DanglingReference => "E3003",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ItemNotFound => "Work item not found",
            Self::NotARelationship => "Items are not linked",
            Self::CycleDetected => "Cycle would be created",
            Self::BoardFull => "Board is at capacity",
            Self::TooManyChildren => "Parent is at child capacity",
            Self::InvalidField => "Invalid field value",
            Self::DuplicateId => "Duplicate work item ID",
            Self::InvalidEnumValue => "Invalid enum value",
            Self::DanglingReference => "Dangling link reference",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ItemNotFound => None,
            Self::NotARelationship => Some("Check the parent's children before unlinking."),
            Self::CycleDetected => Some("Link the item under a node outside its own subtree."),
            Self::BoardFull => Some("Delete finished items before adding new ones."),
            Self::TooManyChildren => Some("Split the parent or attach the item elsewhere."),
            Self::InvalidField => {
                Some("Titles and names take 1-255 chars, descriptions 1-2000 chars.")
            }
            Self::DuplicateId => None,
            Self::InvalidEnumValue => Some("Use one of the documented values for that field."),
            Self::DanglingReference => Some("Report a bug: links must only change via the board."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Coarse failure category, for callers that map errors onto transport
/// responses (HTTP status, exit code).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    RelationshipInvalid,
    CapacityExceeded,
    ValidationFailed,
    CycleDetected,
    Corrupt,
}

/// A field or construction argument that violates its bounds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must be at most {max} characters (got {len})")]
    TooLong {
        field: &'static str,
        max: usize,
        len: usize,
    },

    #[error("children_ids must contain unique ids ({id} appears more than once)")]
    DuplicateChild { id: ItemId },

    #[error("children_ids must not exceed {max} entries (got {len})")]
    TooManyChildren { max: usize, len: usize },

    #[error("work item {id} is already on the board")]
    DuplicateItem { id: ItemId },
}

/// Every failure the board and its items can report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("work item {id} not found on board")]
    NotFound { id: ItemId },

    #[error("work item {child_id} is not a child of {parent_id}")]
    NotAChild { parent_id: ItemId, child_id: ItemId },

    #[error("board already holds the maximum of {max} work items")]
    BoardFull { max: usize },

    #[error("work item {parent_id} already has the maximum of {max} children")]
    ChildrenFull { parent_id: ItemId, max: usize },

    #[error("linking {child_id} under {parent_id} would create a cycle")]
    CycleDetected { parent_id: ItemId, child_id: ItemId },

    #[error("work item {from} references missing item {to}")]
    DanglingReference { from: ItemId, to: ItemId },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl BoardError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::NotAChild { .. } => ErrorKind::RelationshipInvalid,
            Self::BoardFull { .. } | Self::ChildrenFull { .. } => ErrorKind::CapacityExceeded,
            Self::CycleDetected { .. } => ErrorKind::CycleDetected,
            Self::DanglingReference { .. } => ErrorKind::Corrupt,
            Self::Validation(_) => ErrorKind::ValidationFailed,
        }
    }

    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::ItemNotFound,
            Self::NotAChild { .. } => ErrorCode::NotARelationship,
            Self::BoardFull { .. } => ErrorCode::BoardFull,
            Self::ChildrenFull { .. } => ErrorCode::TooManyChildren,
            Self::CycleDetected { .. } => ErrorCode::CycleDetected,
            Self::DanglingReference { .. } => ErrorCode::DanglingReference,
            Self::Validation(ValidationError::DuplicateItem { .. }) => ErrorCode::DuplicateId,
            Self::Validation(_) => ErrorCode::InvalidField,
        }
    }

    /// Optional remediation hint for operators and agents.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}
