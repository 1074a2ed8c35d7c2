//! `nesk-core`: shared building blocks for the help desk.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod email;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use email::{EmailAddress, normalize_email};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{
    ActivityEntryId, CategoryId, EmailTemplateId, KbArticleId, PriorityId, ReplyId, SettingId,
    TeamMemberId, TicketId, UserId,
};
pub use value_object::ValueObject;
