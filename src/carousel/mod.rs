//! Headless infinite-menu carousel: discs on a sphere, dragged with an
//! arcball, snapping to the disc nearest the camera.
//!
//! Rendering is left to the host. `InfiniteMenu::instance_matrices` yields
//! one model matrix per disc and `active_item` the item under the camera.

pub mod control;
pub mod geometry;

use glam::{Mat4, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

pub use control::ArcballControl;
pub use geometry::{disc_anchors, nearest_vertex, DiscLayout, SphereGeometry};

/// Camera looks down -Z, so the disc facing it sits on +Z.
const CAMERA_DIR: Vec3 = Vec3::Z;

/// An anchor within this angle of the camera counts as aligned.
const ALIGN_TOLERANCE: f32 = 1e-2;

/// One carousel entry, as stored in the `visual` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MenuItem {
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

type ChangeCallback = Box<dyn FnMut(usize) + Send>;

pub struct InfiniteMenu {
    items: Vec<MenuItem>,
    anchors: Vec<Vec3>,
    layout: DiscLayout,
    control: ArcballControl,
    active: usize,
    /// Item a navigation call is heading to, until the snap lands.
    pending: Option<usize>,
    on_change: Option<ChangeCallback>,
}

impl std::fmt::Debug for InfiniteMenu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfiniteMenu")
            .field("items", &self.items.len())
            .field("active", &self.active)
            .field("pending", &self.pending)
            .field("control", &self.control)
            .finish()
    }
}

impl InfiniteMenu {
    /// Starts with vertex 0 (item 0) facing the camera.
    pub fn new(items: Vec<MenuItem>) -> Self {
        let anchors = disc_anchors();
        let orientation = Quat::from_rotation_arc(anchors[0], CAMERA_DIR);
        Self {
            items,
            anchors,
            layout: DiscLayout::default(),
            control: ArcballControl::new(orientation),
            active: 0,
            pending: None,
            on_change: None,
        }
    }

    pub fn with_layout(mut self, layout: DiscLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Called with the new item index whenever the active item changes.
    pub fn on_change(mut self, callback: impl FnMut(usize) + Send + 'static) -> Self {
        self.on_change = Some(Box::new(callback));
        self
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_item(&self) -> Option<&MenuItem> {
        self.items.get(self.active)
    }

    pub fn orientation(&self) -> Quat {
        self.control.orientation()
    }

    pub fn is_moving(&self) -> bool {
        !self.control.is_at_rest()
    }

    /// Item shown on a disc. Vertices wrap around the item list.
    pub fn item_for_vertex(&self, vertex: usize) -> Option<usize> {
        if self.items.is_empty() {
            None
        } else {
            Some(vertex % self.items.len())
        }
    }

    /// Items beyond the vertex count never get a disc of their own.
    fn reachable(&self) -> usize {
        self.items.len().min(self.anchors.len())
    }

    fn current(&self) -> usize {
        self.pending.unwrap_or(self.active)
    }

    pub fn navigate_next(&mut self) -> bool {
        let next = self.current() + 1;
        self.navigate_to_item(next)
    }

    pub fn navigate_prev(&mut self) -> bool {
        match self.current().checked_sub(1) {
            Some(prev) => self.navigate_to_item(prev),
            None => false,
        }
    }

    /// Starts a snap toward `index`. `false` when there is nothing to do and
    /// the host should move on at the page level instead.
    pub fn navigate_to_item(&mut self, index: usize) -> bool {
        if index >= self.reachable() || index == self.current() || self.control.is_dragging() {
            return false;
        }
        let rotated = self.control.orientation() * self.anchors[index];
        self.control.snap_to(rotated, CAMERA_DIR);
        self.pending = Some(index);
        true
    }

    /// Pointer in normalized device coordinates.
    pub fn pointer_down(&mut self, point: Vec2) {
        self.pending = None;
        self.control.pointer_down(point);
    }

    pub fn pointer_move(&mut self, point: Vec2) {
        self.control.pointer_move(point);
    }

    pub fn pointer_up(&mut self) {
        self.control.pointer_up();
    }

    /// Advances the simulation by `dt` seconds. Once the sphere stops it is
    /// snapped onto the nearest disc, and a landing on a new item fires the
    /// change callback.
    pub fn tick(&mut self, dt: f32) {
        self.control.update(dt);
        if !self.control.is_at_rest() {
            return;
        }

        let orientation = self.control.orientation();
        let Some(vertex) = nearest_vertex(&self.anchors, orientation, CAMERA_DIR) else {
            return;
        };
        let rotated = orientation * self.anchors[vertex];
        if rotated.angle_between(CAMERA_DIR) > ALIGN_TOLERANCE {
            self.control.snap_to(rotated, CAMERA_DIR);
            return;
        }

        self.pending = None;
        let Some(item) = self.item_for_vertex(vertex) else {
            return;
        };
        if item != self.active {
            self.active = item;
            tracing::debug!(item, vertex, "carousel item changed");
            if let Some(callback) = self.on_change.as_mut() {
                callback(item);
            }
        }
    }

    /// Model matrices for every disc, in vertex order.
    pub fn instance_matrices(&self) -> Vec<Mat4> {
        self.layout
            .instance_matrices(&self.anchors, self.control.orientation(), CAMERA_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::sections::{default_content, SectionKey};
    use std::sync::{Arc, Mutex};

    const FRAME: f32 = 1.0 / 60.0;

    fn items(n: usize) -> Vec<MenuItem> {
        (0..n)
            .map(|i| MenuItem {
                title: format!("Item {i}"),
                ..MenuItem::default()
            })
            .collect()
    }

    fn run(menu: &mut InfiniteMenu, frames: usize) {
        for _ in 0..frames {
            menu.tick(FRAME);
        }
    }

    #[test]
    fn test_navigation_boundaries() {
        let mut menu = InfiniteMenu::new(items(3));
        assert!(!menu.navigate_prev());
        assert!(!menu.navigate_to_item(0));
        assert!(!menu.navigate_to_item(3));

        assert!(menu.navigate_to_item(2));
        run(&mut menu, 300);
        assert_eq!(menu.active_index(), 2);
        assert!(!menu.navigate_next());
        assert!(menu.navigate_prev());
    }

    #[test]
    fn test_empty_menu_never_navigates() {
        let mut menu = InfiniteMenu::new(Vec::new());
        assert!(!menu.navigate_next());
        assert!(!menu.navigate_prev());
        assert!(menu.active_item().is_none());
        run(&mut menu, 10);
        assert_eq!(menu.instance_matrices().len(), 42);
    }

    #[test]
    fn test_next_fires_change_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut menu = InfiniteMenu::new(items(5)).on_change(move |i| sink.lock().unwrap().push(i));

        assert!(menu.navigate_next());
        assert!(menu.is_moving());
        run(&mut menu, 300);

        assert_eq!(*seen.lock().unwrap(), vec![1]);
        assert_eq!(menu.active_item().map(|i| i.title.as_str()), Some("Item 1"));
        assert!(!menu.is_moving());
    }

    #[test]
    fn test_drag_release_comes_to_rest_on_a_disc() {
        let mut menu = InfiniteMenu::new(items(4));
        menu.pointer_down(Vec2::new(0.0, 0.0));
        menu.pointer_move(Vec2::new(0.15, 0.05));
        menu.pointer_move(Vec2::new(0.3, 0.1));
        menu.pointer_up();
        assert!(menu.is_moving());

        run(&mut menu, 600);
        assert!(!menu.is_moving());

        let orientation = menu.orientation();
        let anchors = disc_anchors();
        let vertex = nearest_vertex(&anchors, orientation, CAMERA_DIR).unwrap();
        assert!((orientation * anchors[vertex]).angle_between(CAMERA_DIR) <= ALIGN_TOLERANCE);
        assert_eq!(menu.active_index(), vertex % 4);
    }

    #[test]
    fn test_item_for_vertex_wraps() {
        let menu = InfiniteMenu::new(items(5));
        assert_eq!(menu.item_for_vertex(0), Some(0));
        assert_eq!(menu.item_for_vertex(41), Some(1));
    }

    #[test]
    fn test_visual_section_items_deserialize() {
        let content = default_content(SectionKey::Visual);
        let items: Vec<MenuItem> = serde_json::from_value(content["items"].clone()).unwrap();
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|i| !i.image.is_empty() && !i.link.is_empty()));
        assert_eq!(InfiniteMenu::new(items).reachable(), 3);
    }
}
