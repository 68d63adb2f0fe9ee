/// How a body takes part in collision resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CollisionType {
    /// No events, no interaction.
    PreventCollision,
    /// Emits events but never moves or is moved.
    Passive,
    /// Emits events, pushes and is pushed by `Active` and `Fixed` bodies.
    #[default]
    Active,
    /// Emits events and pushes `Active` bodies but never moves. Two fixed bodies ignore each other.
    Fixed,
}

impl CollisionType {
    /// True for the only type a solver may displace or impulse.
    pub fn is_movable(self) -> bool {
        self == CollisionType::Active
    }
}

/// Category/mask filter deciding which bodies may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollisionGroup {
    pub category: u32,
    pub mask: u32,
}

impl CollisionGroup {
    /// Collides with every group.
    pub const ALL: CollisionGroup = CollisionGroup {
        category: u32::MAX,
        mask: u32::MAX,
    };

    /// Collides with nothing.
    pub const NONE: CollisionGroup = CollisionGroup { category: 0, mask: 0 };

    pub fn new(category: u32, mask: u32) -> Self {
        Self { category, mask }
    }

    /// Both sides must accept the other's category.
    pub fn can_collide(&self, other: &CollisionGroup) -> bool {
        (self.category & other.mask) != 0 && (other.category & self.mask) != 0
    }
}

impl Default for CollisionGroup {
    fn default() -> Self {
        Self::ALL
    }
}
