use super::rigid_body::{BodyHandle, RigidBody};

/// Storage for every body in a world. Bodies are never removed, only killed,
/// so a handle stays valid for the lifetime of the set.
#[derive(Debug, Clone, Default)]
pub struct BodySet {
    bodies: Vec<RigidBody>,
}

impl BodySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, body: RigidBody) -> BodyHandle {
        let handle = BodyHandle(self.bodies.len());
        self.bodies.push(body);
        handle
    }

    pub fn get(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle.0)
    }

    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle.0)
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        handle.0 < self.bodies.len()
    }

    /// True if the body exists and has not been killed.
    pub fn is_live(&self, handle: BodyHandle) -> bool {
        self.get(handle).is_some_and(|b| b.is_active())
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyHandle, &RigidBody)> {
        self.bodies.iter().enumerate().map(|(i, b)| (BodyHandle(i), b))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BodyHandle, &mut RigidBody)> {
        self.bodies.iter_mut().enumerate().map(|(i, b)| (BodyHandle(i), b))
    }

    /// Mutable references to two distinct bodies. `None` if either handle is missing or they are equal.
    pub fn get_pair_mut(&mut self, a: BodyHandle, b: BodyHandle) -> Option<(&mut RigidBody, &mut RigidBody)> {
        let (idx_a, idx_b) = (a.0, b.0);
        if idx_a == idx_b || idx_a >= self.bodies.len() || idx_b >= self.bodies.len() {
            return None;
        }
        // split_at_mut needs the lower index first
        if idx_a < idx_b {
            let (slice_a, slice_b) = self.bodies.split_at_mut(idx_b);
            Some((&mut slice_a[idx_a], &mut slice_b[0]))
        } else {
            let (slice_b, slice_a) = self.bodies.split_at_mut(idx_a);
            Some((&mut slice_a[0], &mut slice_b[idx_b]))
        }
    }
}
