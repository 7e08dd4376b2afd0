//! Arcball rotation with momentum and snapping.

use glam::{Quat, Vec2, Vec3};

/// Velocity kept per 60 Hz frame after release.
const DAMPING: f32 = 0.95;
/// Below this (radians per frame) the sphere counts as at rest.
const REST_VELOCITY: f32 = 1e-3;
/// Share of the remaining snap angle covered per frame.
const SNAP_RATE: f32 = 0.2;
/// Snap finishes within this angle (radians).
const SNAP_EPSILON: f32 = 1e-3;

/// Maps a pointer in normalized device coordinates (`-1..=1`, y up) onto
/// the unit arcball.
fn project_to_sphere(point: Vec2) -> Vec3 {
    let d = point.length_squared();
    if d <= 1.0 {
        Vec3::new(point.x, point.y, (1.0 - d).sqrt())
    } else {
        point.normalize().extend(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct ArcballControl {
    orientation: Quat,
    dragging: bool,
    last_point: Option<Vec3>,
    axis: Vec3,
    /// Radians per frame.
    velocity: f32,
    target: Option<Quat>,
}

impl Default for ArcballControl {
    fn default() -> Self {
        Self::new(Quat::IDENTITY)
    }
}

impl ArcballControl {
    pub fn new(orientation: Quat) -> Self {
        Self {
            orientation: orientation.normalize(),
            dragging: false,
            last_point: None,
            axis: Vec3::Y,
            velocity: 0.0,
            target: None,
        }
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Not dragging, no momentum left and no snap in progress.
    pub fn is_at_rest(&self) -> bool {
        !self.dragging && self.velocity <= REST_VELOCITY && self.target.is_none()
    }

    pub fn is_snapping(&self) -> bool {
        self.target.is_some()
    }

    pub fn pointer_down(&mut self, point: Vec2) {
        self.dragging = true;
        self.last_point = Some(project_to_sphere(point));
        self.velocity = 0.0;
        self.target = None;
    }

    pub fn pointer_move(&mut self, point: Vec2) {
        if !self.dragging {
            return;
        }
        let current = project_to_sphere(point);
        if let Some(previous) = self.last_point {
            let axis = previous.cross(current);
            if axis.length_squared() > f32::EPSILON {
                let angle = previous.angle_between(current);
                self.axis = axis.normalize();
                self.velocity = angle;
                self.orientation = (Quat::from_axis_angle(self.axis, angle) * self.orientation).normalize();
            }
        }
        self.last_point = Some(current);
    }

    /// Release keeps the last drag velocity as momentum.
    pub fn pointer_up(&mut self) {
        self.dragging = false;
        self.last_point = None;
    }

    /// Rotates so that `world_point` (already in rotated space) faces
    /// `towards`, easing over the next frames.
    pub fn snap_to(&mut self, world_point: Vec3, towards: Vec3) {
        let from = world_point.normalize_or_zero();
        let to = towards.normalize_or_zero();
        if from == Vec3::ZERO || to == Vec3::ZERO {
            return;
        }
        self.velocity = 0.0;
        self.target = Some((Quat::from_rotation_arc(from, to) * self.orientation).normalize());
    }

    /// Advances momentum or snapping by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        if self.dragging || dt <= 0.0 {
            return;
        }
        let frames = dt * 60.0;

        if self.velocity > REST_VELOCITY {
            let step = Quat::from_axis_angle(self.axis, self.velocity * frames);
            self.orientation = (step * self.orientation).normalize();
            self.velocity *= DAMPING.powf(frames);
            if self.velocity <= REST_VELOCITY {
                self.velocity = 0.0;
            }
            return;
        }

        if let Some(target) = self.target {
            let t = 1.0 - (1.0 - SNAP_RATE).powf(frames);
            self.orientation = self.orientation.slerp(target, t.clamp(0.0, 1.0)).normalize();
            if self.orientation.angle_between(target) < SNAP_EPSILON {
                self.orientation = target;
                self.target = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_stays_on_sphere() {
        for p in [Vec2::ZERO, Vec2::new(0.3, -0.4), Vec2::new(2.0, 2.0)] {
            assert!((project_to_sphere(p).length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_drag_rotates_and_momentum_decays_to_rest() {
        let mut control = ArcballControl::default();
        control.pointer_down(Vec2::new(0.0, 0.0));
        control.pointer_move(Vec2::new(0.2, 0.0));
        assert!(control.is_dragging());
        assert!(control.orientation().angle_between(Quat::IDENTITY) > 0.1);

        control.pointer_up();
        assert!(!control.is_at_rest());
        let released = control.orientation();
        control.update(1.0 / 60.0);
        assert!(control.orientation().angle_between(released) > 0.0);

        for _ in 0..600 {
            control.update(1.0 / 60.0);
        }
        assert!(control.is_at_rest());
    }

    #[test]
    fn test_snap_converges_exactly() {
        let mut control = ArcballControl::default();
        let point = Vec3::new(1.0, 1.0, 0.0).normalize();
        control.snap_to(point, Vec3::Z);
        assert!(control.is_snapping());
        for _ in 0..600 {
            control.update(1.0 / 60.0);
        }
        assert!(control.is_at_rest());
        let facing = control.orientation() * point;
        assert!((facing - Vec3::Z).length() < 1e-2);
    }

    #[test]
    fn test_pointer_down_cancels_snap() {
        let mut control = ArcballControl::default();
        control.snap_to(Vec3::X, Vec3::Z);
        control.pointer_down(Vec2::ZERO);
        assert!(!control.is_snapping());
    }
}
