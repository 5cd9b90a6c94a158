use crate::math::Coord;

/// Axis-aligned extent `[min_x, min_y, max_x, max_y]` in a single CRS.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Extent {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Extent {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Extent { min, max }
    }

    pub fn from_array(v: [f64; 4]) -> Self {
        Extent::new([v[0], v[1]], [v[2], v[3]])
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.min[0], self.min[1], self.max[0], self.max[1]]
    }

    /// Extent centered on `center` with the given half sizes.
    pub fn around(center: Coord, half_width: f64, half_height: f64) -> Self {
        Extent::new(
            [center.x - half_width, center.y - half_height],
            [center.x + half_width, center.y + half_height],
        )
    }

    /// True when min <= max on both axes and every bound is finite.
    pub fn is_valid(&self) -> bool {
        self.as_array().iter().all(|v| v.is_finite())
            && self.min[0] <= self.max[0]
            && self.min[1] <= self.max[1]
    }

    pub fn width(&self) -> f64 {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> f64 {
        self.max[1] - self.min[1]
    }

    pub fn center(&self) -> Coord {
        Coord::new(
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
        )
    }

    pub fn contains(&self, p: Coord) -> bool {
        p.x >= self.min[0] && p.x <= self.max[0] && p.y >= self.min[1] && p.y <= self.max[1]
    }

    pub fn contains_extent(&self, other: &Extent) -> bool {
        other.min[0] >= self.min[0]
            && other.min[1] >= self.min[1]
            && other.max[0] <= self.max[0]
            && other.max[1] <= self.max[1]
    }

    /// Smallest extent covering every coordinate, or `None` for an empty input.
    pub fn covering(coords: impl IntoIterator<Item = Coord>) -> Option<Self> {
        let mut out: Option<Extent> = None;
        for c in coords {
            let e = out.get_or_insert(Extent::new([c.x, c.y], [c.x, c.y]));
            e.min[0] = e.min[0].min(c.x);
            e.min[1] = e.min[1].min(c.y);
            e.max[0] = e.max[0].max(c.x);
            e.max[1] = e.max[1].max(c.y);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::Extent;
    use crate::math::Coord;

    #[test]
    fn size_center_contains() {
        let e = Extent::from_array([-10.0, 0.0, 10.0, 4.0]);
        assert_eq!(e.width(), 20.0);
        assert_eq!(e.height(), 4.0);
        assert_eq!(e.center(), Coord::new(0.0, 2.0));
        assert!(e.contains(Coord::new(10.0, 4.0)));
        assert!(!e.contains(Coord::new(10.1, 4.0)));
        assert!(e.is_valid());
        assert!(!Extent::from_array([1.0, 0.0, 0.0, 1.0]).is_valid());
    }

    #[test]
    fn covering_points() {
        assert_eq!(Extent::covering(Vec::new()), None);
        let e = Extent::covering([Coord::new(1.0, 5.0), Coord::new(-2.0, 3.0)]).unwrap();
        assert_eq!(e.as_array(), [-2.0, 3.0, 1.0, 5.0]);
        assert!(e.contains_extent(&Extent::around(Coord::new(0.0, 4.0), 1.0, 1.0)));
    }
}
