/// A 2D coordinate in some reference system.
///
/// For geographic systems `x` is longitude and `y` is latitude, both in
/// degrees. Projected systems use meters.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn as_array(self) -> [f64; 2] {
        [self.x, self.y]
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    pub fn distance(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<[f64; 2]> for Coord {
    fn from(v: [f64; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

impl std::ops::Add for Coord {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl std::ops::Sub for Coord {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

#[cfg(test)]
mod tests {
    use super::Coord;

    #[test]
    fn add_sub() {
        let a = Coord::new(1.0, 2.0);
        let b = Coord::new(-0.5, 4.0);
        assert_eq!(a + b, Coord::new(0.5, 6.0));
        assert_eq!(a - b, Coord::new(1.5, -2.0));
    }

    #[test]
    fn lerp_endpoints_and_midpoint() {
        let a = Coord::new(0.0, 10.0);
        let b = Coord::new(4.0, -2.0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 0.5), Coord::new(2.0, 4.0));
    }

    #[test]
    fn rejects_non_finite() {
        assert!(Coord::new(1.0, 2.0).is_finite());
        assert!(!Coord::new(f64::NAN, 2.0).is_finite());
        assert!(!Coord::new(1.0, f64::INFINITY).is_finite());
    }
}
