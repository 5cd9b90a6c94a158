//! View state of the map surface and its animation.
//!
//! All positions are in the display system (web mercator meters). Zoom is
//! tied to resolution the usual way: level 0 shows the world on one 256 px
//! tile.

use foundation::math::{Coord, WEB_MERCATOR_HALF_WORLD};
use foundation::{Extent, Millis};

/// Meters per pixel at zoom 0.
pub const MAX_RESOLUTION: f64 = 2.0 * WEB_MERCATOR_HALF_WORLD / 256.0;

pub fn resolution_for_zoom(zoom: f64) -> f64 {
    MAX_RESOLUTION / 2f64.powf(zoom)
}

/// Limits every view change is clamped to.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewConstraints {
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub extent: Extent,
    /// Round zoom to whole levels.
    pub constrain_resolution: bool,
}

impl ViewConstraints {
    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        let zoom = if zoom.is_finite() { zoom } else { self.min_zoom };
        let zoom = if self.constrain_resolution {
            zoom.round()
        } else {
            zoom
        };
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    /// Nearest center whose visible extent stays inside `extent`. On an axis
    /// where the view is larger than the box, the box center is used.
    pub fn clamp_center(&self, center: Coord, resolution: f64, size_px: [f64; 2]) -> Coord {
        let half_w = size_px[0] * 0.5 * resolution;
        let half_h = size_px[1] * 0.5 * resolution;
        let mid = self.extent.center();
        let center = if center.is_finite() { center } else { mid };
        Coord::new(
            clamp_axis(center.x, self.extent.min[0], self.extent.max[0], half_w, mid.x),
            clamp_axis(center.y, self.extent.min[1], self.extent.max[1], half_h, mid.y),
        )
    }
}

fn clamp_axis(v: f64, min: f64, max: f64, half: f64, mid: f64) -> f64 {
    if max - min <= 2.0 * half {
        mid
    } else {
        v.clamp(min + half, max - half)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewportState {
    pub center: Coord,
    pub zoom: f64,
}

impl ViewportState {
    pub fn resolution(&self) -> f64 {
        resolution_for_zoom(self.zoom)
    }

    pub fn visible_extent(&self, size_px: [f64; 2]) -> Extent {
        let res = self.resolution();
        Extent::around(self.center, size_px[0] * 0.5 * res, size_px[1] * 0.5 * res)
    }

    fn lerp(self, other: Self, t: f64) -> Self {
        Self {
            center: self.center.lerp(other.center, t),
            zoom: self.zoom + (other.zoom - self.zoom) * t,
        }
    }
}

/// Slow start, slow finish.
pub fn ease_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[derive(Debug, Clone, PartialEq)]
struct Animation {
    from: ViewportState,
    to: ViewportState,
    start: Millis,
    duration_ms: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    constraints: ViewConstraints,
    size_px: [f64; 2],
    state: ViewportState,
    animation: Option<Animation>,
}

impl Viewport {
    pub fn new(constraints: ViewConstraints, size_px: [f64; 2], center: Coord, zoom: f64) -> Self {
        let mut viewport = Self {
            constraints,
            size_px,
            state: ViewportState { center, zoom },
            animation: None,
        };
        viewport.state = viewport.constrain(center, zoom);
        viewport
    }

    pub fn constraints(&self) -> &ViewConstraints {
        &self.constraints
    }

    pub fn size_px(&self) -> [f64; 2] {
        self.size_px
    }

    /// What is on screen right now.
    pub fn state(&self) -> ViewportState {
        self.state
    }

    /// Where the view is heading; equals `state()` when idle.
    pub fn target(&self) -> ViewportState {
        self.animation.as_ref().map_or(self.state, |a| a.to)
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn resolution(&self) -> f64 {
        self.state.resolution()
    }

    pub fn visible_extent(&self) -> Extent {
        self.state.visible_extent(self.size_px)
    }

    /// Resizing re-clamps the current view and any pending target.
    pub fn set_size(&mut self, size_px: [f64; 2]) {
        if !(size_px[0] > 0.0 && size_px[1] > 0.0) {
            return;
        }
        self.size_px = size_px;
        self.state = self.constrain(self.state.center, self.state.zoom);
        if let Some(mut animation) = self.animation.take() {
            animation.to = self.constrain(animation.to.center, animation.to.zoom);
            self.animation = Some(animation);
        }
    }

    fn constrain(&self, center: Coord, zoom: f64) -> ViewportState {
        let zoom = self.constraints.clamp_zoom(zoom);
        let center =
            self.constraints
                .clamp_center(center, resolution_for_zoom(zoom), self.size_px);
        ViewportState { center, zoom }
    }

    /// Moves the view to `center`/`zoom`, clamped to the constraints.
    ///
    /// With a positive `duration_ms` the change is animated from wherever the
    /// view is at `now`; a request made mid-flight replaces the running
    /// animation. Returns the clamped target.
    pub fn set(
        &mut self,
        center: Coord,
        zoom: f64,
        duration_ms: Option<f64>,
        now: Millis,
    ) -> ViewportState {
        self.tick(now);
        let to = self.constrain(center, zoom);
        match duration_ms {
            Some(duration_ms) if duration_ms > 0.0 && to != self.state => {
                self.animation = Some(Animation {
                    from: self.state,
                    to,
                    start: now,
                    duration_ms,
                });
            }
            _ => {
                self.animation = None;
                self.state = to;
            }
        }
        to
    }

    /// Advances a running animation. Returns true when the view changed.
    pub fn tick(&mut self, now: Millis) -> bool {
        let Some(animation) = &self.animation else {
            return false;
        };
        let t = now.since(animation.start) / animation.duration_ms;
        let before = self.state;
        if t >= 1.0 {
            self.state = animation.to;
            self.animation = None;
        } else {
            self.state = animation.from.lerp(animation.to, ease_in_out(t));
        }
        self.state != before
    }

    /// Display coordinate under a canvas pixel (origin top-left, y down).
    pub fn pixel_to_coord(&self, pixel: [f64; 2]) -> Coord {
        let res = self.resolution();
        Coord::new(
            self.state.center.x + (pixel[0] - self.size_px[0] * 0.5) * res,
            self.state.center.y - (pixel[1] - self.size_px[1] * 0.5) * res,
        )
    }

    pub fn coord_to_pixel(&self, coord: Coord) -> [f64; 2] {
        let res = self.resolution();
        [
            (coord.x - self.state.center.x) / res + self.size_px[0] * 0.5,
            (self.state.center.y - coord.y) / res + self.size_px[1] * 0.5,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::{MAX_RESOLUTION, ViewConstraints, Viewport, ease_in_out, resolution_for_zoom};
    use foundation::math::Coord;
    use foundation::{Extent, Millis};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn constraints() -> ViewConstraints {
        ViewConstraints {
            min_zoom: 13.0,
            max_zoom: 18.0,
            extent: Extent::from_array([-4_989_000.0, -2_271_000.0, -4_948_000.0, -2_235_000.0]),
            constrain_resolution: true,
        }
    }

    const SIZE: [f64; 2] = [800.0, 600.0];
    const TOWN: Coord = Coord::new(-4_966_000.0, -2_256_000.0);

    #[test]
    fn resolution_halves_per_level() {
        assert_close(MAX_RESOLUTION, 156_543.033_928_040_97, 1e-6);
        assert_close(resolution_for_zoom(1.0), MAX_RESOLUTION / 2.0, 1e-9);
        assert_close(resolution_for_zoom(18.0), 0.597_164_283_559_817_1, 1e-9);
    }

    #[test]
    fn zoom_is_clamped_and_snapped() {
        let c = constraints();
        assert_eq!(c.clamp_zoom(3.0), 13.0);
        assert_eq!(c.clamp_zoom(21.0), 18.0);
        assert_eq!(c.clamp_zoom(15.4), 15.0);
        assert_eq!(c.clamp_zoom(f64::NAN), 13.0);

        let free = ViewConstraints {
            constrain_resolution: false,
            ..constraints()
        };
        assert_eq!(free.clamp_zoom(15.4), 15.4);
    }

    #[test]
    fn center_keeps_view_inside_the_box() {
        let c = constraints();
        let res = resolution_for_zoom(16.0);
        let clamped = c.clamp_center(Coord::new(0.0, 0.0), res, SIZE);
        let view = Extent::around(clamped, SIZE[0] * 0.5 * res, SIZE[1] * 0.5 * res);
        assert!(view.min[0] >= c.extent.min[0] && view.max[0] <= c.extent.max[0] + 1e-6);
        assert!(view.min[1] >= c.extent.min[1] && view.max[1] <= c.extent.max[1] + 1e-6);
        assert_close(clamped.x, c.extent.max[0] - SIZE[0] * 0.5 * res, 1e-6);

        // A view wider than the box sits on the box center.
        let huge = c.clamp_center(TOWN, resolution_for_zoom(10.0), SIZE);
        assert_eq!(huge, c.extent.center());
    }

    #[test]
    fn instant_set_applies_immediately() {
        let mut v = Viewport::new(constraints(), SIZE, TOWN, 14.0);
        let to = v.set(Coord::new(-4_960_000.0, -2_250_000.0), 17.0, None, Millis(0.0));
        assert!(!v.is_animating());
        assert_eq!(v.state(), to);
        assert_eq!(v.state().zoom, 17.0);
    }

    #[test]
    fn animation_eases_to_target() {
        let mut v = Viewport::new(constraints(), SIZE, TOWN, 14.0);
        let target = Coord::new(-4_960_000.0, -2_250_000.0);
        v.set(target, 18.0, Some(1000.0), Millis(100.0));
        assert!(v.is_animating());
        assert_eq!(v.target().zoom, 18.0);

        assert!(v.tick(Millis(600.0)));
        assert_close(v.state().zoom, 16.0, 1e-9);
        assert_close(v.state().center.x, (TOWN.x + target.x) * 0.5, 1e-6);

        v.tick(Millis(1100.0));
        assert!(!v.is_animating());
        assert_eq!(v.state().zoom, 18.0);
        assert_eq!(v.state().center, target);
        assert!(!v.tick(Millis(2000.0)));
    }

    #[test]
    fn later_request_supersedes_running_animation() {
        let mut v = Viewport::new(constraints(), SIZE, TOWN, 14.0);
        let a = Coord::new(-4_960_000.0, -2_250_000.0);
        let b = Coord::new(-4_970_000.0, -2_260_000.0);
        v.set(a, 18.0, Some(1000.0), Millis(0.0));
        v.set(b, 16.0, Some(1000.0), Millis(500.0));
        v.tick(Millis(1500.0));
        assert_eq!(v.state().center, b);
        assert_eq!(v.state().zoom, 16.0);
    }

    #[test]
    fn pixels_and_coords_agree() {
        let v = Viewport::new(constraints(), SIZE, TOWN, 16.0);
        let center = v.pixel_to_coord([400.0, 300.0]);
        assert_eq!(center, v.state().center);
        let p = v.coord_to_pixel(v.pixel_to_coord([10.0, 20.0]));
        assert_close(p[0], 10.0, 1e-6);
        assert_close(p[1], 20.0, 1e-6);
        assert!(v.pixel_to_coord([400.0, 0.0]).y > center.y);
    }

    #[test]
    fn easing_is_symmetric() {
        assert_eq!(ease_in_out(0.0), 0.0);
        assert_eq!(ease_in_out(0.5), 0.5);
        assert_eq!(ease_in_out(1.0), 1.0);
        assert_close(ease_in_out(0.25) + ease_in_out(0.75), 1.0, 1e-12);
    }
}
