//! Typed collision notifications delivered per collider.
//!
//! Not thread-safe: handlers are plain `FnMut` closures and run on the simulation thread,
//! in the order the pipeline raises them (collider A before collider B).

use std::fmt;

use crate::common::Side;
use crate::math::vec2::Vec2;

use super::collider::ColliderId;
use super::contact::Contact;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionEventKind {
    /// A contact was found and is about to be solved.
    PreCollision,
    /// A contact was solved.
    PostCollision,
    /// Impulse solver only: last chance to cancel the contact.
    BeforeCollisionResolve,
    /// Impulse solver only: the contact was resolved.
    AfterCollisionResolve,
    /// Two colliders (or composites) started touching this step.
    CollisionStart,
    /// Two colliders (or composites) stopped touching this step.
    CollisionEnd,
}

/// Payload delivered to handlers.
#[derive(Debug, Clone, Copy)]
pub struct CollisionEvent<'a> {
    pub kind: CollisionEventKind,
    /// Collider receiving the event.
    pub this: ColliderId,
    /// The other participant; `None` for tile map collisions.
    pub other: Option<ColliderId>,
    pub side: Side,
    pub mtv: Vec2,
    pub contact: Option<&'a Contact>,
}

/// What a handler asks the pipeline to do after it returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventResponse {
    cancelled: bool,
    killed: bool,
}

impl EventResponse {
    /// Skip physical resolution of the contact this step. Overlap is still tracked.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// Remove the receiving collider's body from the simulation.
    pub fn kill(&mut self) {
        self.killed = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn is_killed(&self) -> bool {
        self.killed
    }

    pub(crate) fn merge(&mut self, other: EventResponse) {
        self.cancelled |= other.cancelled;
        self.killed |= other.killed;
    }
}

pub type CollisionHandler = Box<dyn FnMut(&CollisionEvent<'_>, &mut EventResponse)>;

/// Handlers registered on one collider.
#[derive(Default)]
pub struct EventChannel {
    handlers: Vec<(CollisionEventKind, CollisionHandler)>,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for events of `kind`.
    pub fn on<F>(&mut self, kind: CollisionEventKind, handler: F)
    where
        F: FnMut(&CollisionEvent<'_>, &mut EventResponse) + 'static,
    {
        self.handlers.push((kind, Box::new(handler)));
    }

    /// Removes every handler for `kind`.
    pub fn off(&mut self, kind: CollisionEventKind) {
        self.handlers.retain(|(k, _)| *k != kind);
    }

    pub fn has_handlers(&self, kind: CollisionEventKind) -> bool {
        self.handlers.iter().any(|(k, _)| *k == kind)
    }

    /// Runs the matching handlers in registration order.
    pub fn emit(&mut self, event: &CollisionEvent<'_>, response: &mut EventResponse) {
        for (kind, handler) in self.handlers.iter_mut() {
            if *kind == event.kind {
                handler(event, response);
            }
        }
    }
}

impl fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
