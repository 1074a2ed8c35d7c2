//! Help-desk records and their validated inputs.
//!
//! Records are plain data with small state-transition helpers; who may call
//! those helpers is decided by `nesk-auth` and enforced by the guarded
//! operation layer.

pub mod activity;
pub mod admin;
pub mod catalog;
pub mod kb;
pub mod ticket;
pub mod user;

pub use activity::{ActivityEntry, EntityType, NewActivity};
pub use admin::{
    EmailTemplate, EmailTemplateInput, EmailTemplatePatch, Setting, TeamMember, TeamMemberInput,
    TeamMemberPatch, ValidTeamMemberPatch,
};
pub use catalog::{Category, CategoryInput, CategoryPatch, Priority};
pub use kb::{ArticleInput, KbArticle, ValidArticle};
pub use ticket::{
    AuthorType, CreateTicketInput, ReplyInput, Ticket, TicketContent, TicketFilters, TicketReply,
    TicketStatus,
};
pub use user::{ServerAssigned, UpdateUserInput, UserAccount, ValidUserPatch};
