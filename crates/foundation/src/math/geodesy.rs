/// WGS84 semi-major axis (meters).
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening.
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// GRS80 flattening. Same semi-major axis as WGS84.
pub const GRS80_F: f64 = 1.0 / 298.257_222_101;

/// Reference ellipsoid.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis (meters).
    pub a: f64,
    /// Flattening.
    pub f: f64,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid {
        a: WGS84_A,
        f: WGS84_F,
    };

    pub const GRS80: Ellipsoid = Ellipsoid {
        a: WGS84_A,
        f: GRS80_F,
    };

    /// Looks up an ellipsoid by its proj name (`WGS84`, `GRS80`).
    pub fn by_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "WGS84" => Some(Self::WGS84),
            "GRS80" => Some(Self::GRS80),
            _ => None,
        }
    }

    /// First eccentricity squared.
    pub fn e2(&self) -> f64 {
        self.f * (2.0 - self.f)
    }

    /// First eccentricity.
    pub fn e(&self) -> f64 {
        self.e2().sqrt()
    }

    /// Third flattening.
    pub fn n(&self) -> f64 {
        self.f / (2.0 - self.f)
    }
}

#[cfg(test)]
mod tests {
    use super::{Ellipsoid, WGS84_F};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn wgs84_eccentricity() {
        assert_close(Ellipsoid::WGS84.e2(), 0.006_694_379_990_14, 1e-14);
        assert_close(Ellipsoid::WGS84.n(), WGS84_F / (2.0 - WGS84_F), 0.0);
    }

    #[test]
    fn looks_up_by_name_case_insensitively() {
        assert_eq!(Ellipsoid::by_name("wgs84"), Some(Ellipsoid::WGS84));
        assert_eq!(Ellipsoid::by_name("GRS80"), Some(Ellipsoid::GRS80));
        assert_eq!(Ellipsoid::by_name("intl"), None);
    }
}
