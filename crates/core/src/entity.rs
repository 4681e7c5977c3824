//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Returns the user that owns this entity.
    ///
    /// Every mutable marketplace record (products, bank accounts) is owned by
    /// exactly one user; orders are owned by their buyer.
    fn owner_id(&self) -> crate::UserId;

    /// `true` when `user_id` owns this entity.
    fn is_owned_by(&self, user_id: crate::UserId) -> bool {
        self.owner_id() == user_id
    }
}

/// Collect the ids of a slice of entities, preserving order.
pub fn ids_of<E: Entity>(items: &[E]) -> Vec<E::Id> {
    items.iter().map(|e| e.id().clone()).collect()
}
