//! Axis-aligned geometry shared by the simulation

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle, origin at the top-left, y grows downward
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.h / 2.0
    }

    /// Strict overlap test; touching edges do not count
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }
}

/// Visible arena bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Playfield {
    pub width: f32,
    pub height: f32,
}

impl Playfield {
    /// True once `rect` lies entirely outside the arena on any side
    pub fn fully_outside(&self, rect: &Rect) -> bool {
        rect.right() < 0.0 || rect.left() > self.width || rect.bottom() < 0.0 || rect.top() > self.height
    }
}

impl Default for Playfield {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

/// Default arena layout
pub fn default_platforms() -> Vec<Rect> {
    vec![
        Rect::new(291.0, 468.0, 835.0, 46.0),
        Rect::new(1122.0, 494.0, 116.0, 16.0),
        Rect::new(1128.0, 476.0, 62.0, 18.0),
        Rect::new(150.0, 491.0, 139.0, 20.0),
        Rect::new(213.0, 472.0, 76.0, 17.0),
    ]
}

/// Platform geometry owned by the presentation layer.
///
/// The whole list is swapped on window resize; the simulation takes a
/// snapshot per tick and never holds the lock across an update.
#[derive(Debug, Clone)]
pub struct SharedPlatforms {
    inner: Arc<RwLock<Arc<[Rect]>>>,
}

impl SharedPlatforms {
    pub fn new(platforms: Vec<Rect>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(platforms.into())),
        }
    }

    /// Replace the platform list wholesale
    pub fn replace(&self, platforms: Vec<Rect>) {
        *self.inner.write() = platforms.into();
    }

    /// Cheap handle to the current list
    pub fn snapshot(&self) -> Arc<[Rect]> {
        self.inner.read().clone()
    }
}

impl Default for SharedPlatforms {
    fn default() -> Self {
        Self::new(default_platforms())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_edges_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
        let c = Rect::new(9.0, 9.0, 10.0, 10.0);
        assert!(a.intersects(&c));
    }

    #[test]
    fn fully_outside_requires_full_exit() {
        let field = Playfield::default();
        assert!(!field.fully_outside(&Rect::new(-5.0, 100.0, 10.0, 10.0)));
        assert!(field.fully_outside(&Rect::new(-11.0, 100.0, 10.0, 10.0)));
        assert!(field.fully_outside(&Rect::new(100.0, 721.0, 10.0, 10.0)));
        assert!(field.fully_outside(&Rect::new(1281.0, 100.0, 10.0, 10.0)));
    }

    #[test]
    fn replaced_platforms_are_visible_to_new_snapshots() {
        let shared = SharedPlatforms::default();
        let before = shared.snapshot();
        shared.replace(vec![Rect::new(0.0, 600.0, 1280.0, 40.0)]);
        assert_eq!(before.len(), default_platforms().len());
        assert_eq!(shared.snapshot().len(), 1);
    }
}
