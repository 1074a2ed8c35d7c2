//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Tables in the data layer are keyed by [`Entity::id`].
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + Send + Sync + 'static;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
