use std::fmt;

use crate::error::{PhysicsError, Result};
use crate::math::{Transform, Vec2};
use crate::objects::{BodyHandle, BodySet};
use crate::shapes::{Shape, WorldShape};

use super::aabb::AABB;
use super::closest_line::closest_line_between;
use super::events::{CollisionEvent, EventChannel, EventResponse};

/// Stable numeric collider id. Ids are handed out in increasing order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColliderId(pub u32);

impl fmt::Display for ColliderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Blueprint for a collider; composites may nest, they are flattened on insertion.
#[derive(Debug, Clone, PartialEq)]
pub enum ColliderDesc {
    Shape { shape: Shape, offset: Vec2 },
    Composite { children: Vec<ColliderDesc>, offset: Vec2 },
}

impl ColliderDesc {
    pub fn shape(shape: impl Into<Shape>) -> Self {
        ColliderDesc::Shape {
            shape: shape.into(),
            offset: Vec2::ZERO,
        }
    }

    pub fn composite(children: Vec<ColliderDesc>) -> Self {
        ColliderDesc::Composite {
            children,
            offset: Vec2::ZERO,
        }
    }

    pub fn with_offset(self, offset: Vec2) -> Self {
        match self {
            ColliderDesc::Shape { shape, .. } => ColliderDesc::Shape { shape, offset },
            ColliderDesc::Composite { children, .. } => ColliderDesc::Composite { children, offset },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColliderKind {
    Leaf(Shape),
    /// Flattened children, all leaves.
    Composite(Vec<ColliderId>),
}

#[derive(Debug)]
pub struct Collider {
    pub id: ColliderId,
    pub kind: ColliderKind,
    /// Body-local offset. For composite children this already includes every parent offset.
    pub offset: Vec2,
    /// Owning body; `None` for static world geometry.
    pub owner: Option<BodyHandle>,
    /// Composite this collider belongs to, if any.
    pub composite: Option<ColliderId>,
    pub events: EventChannel,
}

impl Collider {
    pub fn is_composite(&self) -> bool {
        matches!(self.kind, ColliderKind::Composite(_))
    }

    pub fn shape(&self) -> Option<&Shape> {
        match &self.kind {
            ColliderKind::Leaf(shape) => Some(shape),
            ColliderKind::Composite(_) => None,
        }
    }

    /// Transform of the owning body, or identity for body-less geometry.
    pub fn transform(&self, bodies: &BodySet) -> Transform {
        self.owner
            .and_then(|h| bodies.get(h))
            .map(|b| b.transform())
            .unwrap_or_default()
    }
}

/// Arena of colliders indexed by id.
#[derive(Debug, Default)]
pub struct ColliderSet {
    colliders: Vec<Option<Collider>>,
}

impl ColliderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a collider tree. Returns the id of the root (the composite for composite descriptions).
    /// Fails if `owner` is not a body of `bodies` or a composite has no children.
    pub fn insert(&mut self, desc: ColliderDesc, owner: Option<BodyHandle>, bodies: &BodySet) -> Result<ColliderId> {
        if let Some(handle) = owner {
            if !bodies.contains(handle) {
                return Err(PhysicsError::UnknownBody(handle.0));
            }
        }
        validate(&desc)?;

        match desc {
            ColliderDesc::Shape { shape, offset } => Ok(self.push(ColliderKind::Leaf(shape), offset, owner, None)),
            ColliderDesc::Composite { children, offset } => {
                let root = self.push(ColliderKind::Composite(Vec::new()), offset, owner, None);
                let mut leaves = Vec::new();
                for child in children {
                    self.flatten(child, offset, owner, root, &mut leaves);
                }
                if let Some(Collider {
                    kind: ColliderKind::Composite(ids),
                    ..
                }) = self.get_mut(root)
                {
                    *ids = leaves;
                }
                Ok(root)
            }
        }
    }

    fn flatten(
        &mut self,
        desc: ColliderDesc,
        parent_offset: Vec2,
        owner: Option<BodyHandle>,
        root: ColliderId,
        leaves: &mut Vec<ColliderId>,
    ) {
        match desc {
            ColliderDesc::Shape { shape, offset } => {
                let id = self.push(ColliderKind::Leaf(shape), parent_offset + offset, owner, Some(root));
                leaves.push(id);
            }
            ColliderDesc::Composite { children, offset } => {
                for child in children {
                    self.flatten(child, parent_offset + offset, owner, root, leaves);
                }
            }
        }
    }

    fn push(&mut self, kind: ColliderKind, offset: Vec2, owner: Option<BodyHandle>, composite: Option<ColliderId>) -> ColliderId {
        let id = ColliderId(self.colliders.len() as u32);
        self.colliders.push(Some(Collider {
            id,
            kind,
            offset,
            owner,
            composite,
            events: EventChannel::new(),
        }));
        id
    }

    /// Removes a collider (and the children of a composite). Returns the removed leaf ids.
    pub fn remove(&mut self, id: ColliderId) -> Vec<ColliderId> {
        let Some(collider) = self.colliders.get_mut(id.0 as usize).and_then(Option::take) else {
            return Vec::new();
        };
        match collider.kind {
            ColliderKind::Leaf(_) => vec![id],
            ColliderKind::Composite(children) => {
                for child in &children {
                    if let Some(slot) = self.colliders.get_mut(child.0 as usize) {
                        *slot = None;
                    }
                }
                children
            }
        }
    }

    pub fn get(&self, id: ColliderId) -> Option<&Collider> {
        self.colliders.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: ColliderId) -> Option<&mut Collider> {
        self.colliders.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Collider> {
        self.colliders.iter().flatten()
    }

    /// Ids of every leaf collider, composite children included.
    pub fn leaves(&self) -> impl Iterator<Item = ColliderId> + '_ {
        self.iter().filter(|c| !c.is_composite()).map(|c| c.id)
    }

    /// Leaf ids making up `id`: itself for a leaf, the children for a composite.
    pub fn flatten_ids(&self, id: ColliderId) -> Vec<ColliderId> {
        match self.get(id).map(|c| &c.kind) {
            Some(ColliderKind::Leaf(_)) => vec![id],
            Some(ColliderKind::Composite(children)) => children.clone(),
            None => Vec::new(),
        }
    }

    /// World-space geometry of a leaf collider.
    pub fn world_shape(&self, id: ColliderId, bodies: &BodySet) -> Result<WorldShape> {
        let collider = self.get(id).ok_or(PhysicsError::UnknownCollider(id.0))?;
        match &collider.kind {
            ColliderKind::Leaf(shape) => Ok(shape.to_world(collider.transform(bodies), collider.offset)),
            ColliderKind::Composite(_) => Err(PhysicsError::MissingGeometry {
                collider: id.0,
                reason: "composite colliders have no single shape; query their children",
            }),
        }
    }

    /// Shortest segment from leaf `a` to leaf `b`, as `(point on a, point on b)`.
    ///
    /// Fails with [`PhysicsError::MissingGeometry`] for composites and for colliders whose
    /// owning body is not in `bodies`.
    pub fn closest_line(&self, a: ColliderId, b: ColliderId, bodies: &BodySet) -> Result<(Vec2, Vec2)> {
        let shape_a = self.positioned_shape(a, bodies)?;
        let shape_b = self.positioned_shape(b, bodies)?;
        Ok(closest_line_between(&shape_a, &shape_b))
    }

    fn positioned_shape(&self, id: ColliderId, bodies: &BodySet) -> Result<WorldShape> {
        let collider = self.get(id).ok_or(PhysicsError::UnknownCollider(id.0))?;
        if let Some(handle) = collider.owner {
            if !bodies.contains(handle) {
                return Err(PhysicsError::MissingGeometry {
                    collider: id.0,
                    reason: "owning body is not in the body set",
                });
            }
        }
        self.world_shape(id, bodies)
    }

    /// World bounds of a leaf, or the union of a composite's children.
    pub fn bounds(&self, id: ColliderId, bodies: &BodySet) -> Option<AABB> {
        self.flatten_ids(id)
            .into_iter()
            .filter_map(|leaf| self.world_shape(leaf, bodies).ok())
            .map(|shape| shape.bounds())
            .reduce(|acc, b| acc.combine(&b))
    }

    /// Leaf colliders attached to `body`, in id order.
    pub fn attached_to(&self, body: BodyHandle) -> Vec<ColliderId> {
        self.iter()
            .filter(|c| c.owner == Some(body) && !c.is_composite())
            .map(|c| c.id)
            .collect()
    }

    /// Delivers `event` to its target collider, then to the target's composite parent.
    pub fn emit(&mut self, event: &CollisionEvent<'_>) -> EventResponse {
        let mut response = EventResponse::default();
        let parent = match self.get_mut(event.this) {
            Some(collider) => {
                collider.events.emit(event, &mut response);
                collider.composite
            }
            None => None,
        };
        if let Some(parent) = parent.and_then(|p| self.get_mut(p)) {
            parent.events.emit(event, &mut response);
        }
        response
    }
}

fn validate(desc: &ColliderDesc) -> Result<()> {
    match desc {
        ColliderDesc::Shape { .. } => Ok(()),
        ColliderDesc::Composite { children, .. } => {
            if children.is_empty() {
                return Err(PhysicsError::EmptyComposite);
            }
            children.iter().try_for_each(validate)
        }
    }
}
