use crate::math::vec2::Vec2;

/// Which face of a collider a contact happened on. The y axis points down, so `Top` is `-y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Side {
    #[default]
    None,
    Top,
    Bottom,
    Left,
    Right,
}

impl Side {
    /// Side whose outward direction best matches `direction`.
    /// Ties resolve in the order Left, Right, Top, Bottom; the zero vector has no side.
    pub fn from_direction(direction: Vec2) -> Side {
        if direction == Vec2::ZERO || !direction.is_finite() {
            return Side::None;
        }
        let candidates = [
            (Vec2::LEFT, Side::Left),
            (Vec2::RIGHT, Side::Right),
            (Vec2::UP, Side::Top),
            (Vec2::DOWN, Side::Bottom),
        ];
        let mut best = Side::None;
        let mut max = f64::NEG_INFINITY;
        for (dir, side) in candidates {
            let d = dir.dot(direction);
            if d > max {
                max = d;
                best = side;
            }
        }
        best
    }

    /// Side an actor was hit on, given the correction that pushes it out of a tile.
    pub fn from_intersection(intersection: Option<Vec2>) -> Side {
        let Some(v) = intersection else {
            return Side::None;
        };
        if v.x.abs() > v.y.abs() {
            if v.x < 0.0 {
                Side::Right
            } else {
                Side::Left
            }
        } else if v.y < 0.0 {
            Side::Bottom
        } else {
            Side::Top
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::None => Side::None,
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}
