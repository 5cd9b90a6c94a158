//! Ellipsoidal transverse mercator (Krüger series to sixth order in `n`).
//!
//! Accurate to well under a millimeter within a few thousand kilometers of
//! the central meridian, which covers every UTM zone.

use super::{Coord, Ellipsoid};

/// Scale factor on the central meridian for UTM.
pub const UTM_SCALE: f64 = 0.9996;
/// False easting for UTM (meters).
pub const UTM_FALSE_EASTING: f64 = 500_000.0;
/// False northing for southern-hemisphere UTM (meters).
pub const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

const NEWTON_MAX_ITERATIONS: usize = 8;
const NEWTON_TOLERANCE: f64 = 1e-14;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TransverseMercator {
    pub ellipsoid: Ellipsoid,
    /// Central meridian (degrees).
    pub lon0_deg: f64,
    pub k0: f64,
    pub false_easting: f64,
    pub false_northing: f64,
}

impl TransverseMercator {
    /// UTM zone `1..=60`, northern or southern hemisphere.
    pub fn utm(zone: u8, south: bool, ellipsoid: Ellipsoid) -> Self {
        Self {
            ellipsoid,
            lon0_deg: f64::from(zone) * 6.0 - 183.0,
            k0: UTM_SCALE,
            false_easting: UTM_FALSE_EASTING,
            false_northing: if south {
                UTM_FALSE_NORTHING_SOUTH
            } else {
                0.0
            },
        }
    }

    /// Geographic lon/lat (degrees) to easting/northing (meters).
    pub fn forward(&self, lon_lat: Coord) -> Coord {
        let series = Series::new(self.ellipsoid);
        let e = self.ellipsoid.e();

        let lam = normalize_lon_deg(lon_lat.x - self.lon0_deg).to_radians();
        let phi = lon_lat.y.to_radians();

        let tau = phi.tan();
        let tau_c = conformal_tau(tau, e);
        let (sin_lam, cos_lam) = lam.sin_cos();

        let xi_p = tau_c.atan2(cos_lam);
        let eta_p = (sin_lam / tau_c.hypot(cos_lam)).asinh();

        let mut xi = xi_p;
        let mut eta = eta_p;
        for (j, alpha) in series.alpha.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi += alpha * (k * xi_p).sin() * (k * eta_p).cosh();
            eta += alpha * (k * xi_p).cos() * (k * eta_p).sinh();
        }

        Coord::new(
            self.false_easting + self.k0 * series.rectifying_radius * eta,
            self.false_northing + self.k0 * series.rectifying_radius * xi,
        )
    }

    /// Easting/northing (meters) to geographic lon/lat (degrees).
    pub fn inverse(&self, xy: Coord) -> Coord {
        let series = Series::new(self.ellipsoid);
        let e = self.ellipsoid.e();

        let scale = self.k0 * series.rectifying_radius;
        let xi = (xy.y - self.false_northing) / scale;
        let eta = (xy.x - self.false_easting) / scale;

        let mut xi_p = xi;
        let mut eta_p = eta;
        for (j, beta) in series.beta.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi_p -= beta * (k * xi).sin() * (k * eta).cosh();
            eta_p -= beta * (k * xi).cos() * (k * eta).sinh();
        }

        let sinh_eta = eta_p.sinh();
        let (sin_xi, cos_xi) = xi_p.sin_cos();
        let tau_c = sin_xi / sinh_eta.hypot(cos_xi);
        let lam = sinh_eta.atan2(cos_xi);
        let tau = tau_from_conformal(tau_c, e);

        Coord::new(
            normalize_lon_deg(self.lon0_deg + lam.to_degrees()),
            tau.atan().to_degrees(),
        )
    }
}

struct Series {
    rectifying_radius: f64,
    alpha: [f64; 6],
    beta: [f64; 6],
}

impl Series {
    fn new(ellipsoid: Ellipsoid) -> Self {
        let n = ellipsoid.n();
        let n2 = n * n;
        let n3 = n2 * n;
        let n4 = n3 * n;
        let n5 = n4 * n;
        let n6 = n5 * n;

        let rectifying_radius =
            ellipsoid.a / (1.0 + n) * (1.0 + n2 / 4.0 + n4 / 64.0 + n6 / 256.0);

        let alpha = [
            n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0 + 41.0 * n4 / 180.0 - 127.0 * n5 / 288.0
                + 7891.0 * n6 / 37800.0,
            13.0 * n2 / 48.0 - 3.0 * n3 / 5.0 + 557.0 * n4 / 1440.0 + 281.0 * n5 / 630.0
                - 1_983_433.0 * n6 / 1_935_360.0,
            61.0 * n3 / 240.0 - 103.0 * n4 / 140.0 + 15061.0 * n5 / 26880.0
                + 167_603.0 * n6 / 181_440.0,
            49561.0 * n4 / 161_280.0 - 179.0 * n5 / 168.0 + 6_601_661.0 * n6 / 7_257_600.0,
            34729.0 * n5 / 80640.0 - 3_418_889.0 * n6 / 1_995_840.0,
            212_378_941.0 * n6 / 319_334_400.0,
        ];

        let beta = [
            n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0 - n4 / 360.0 - 81.0 * n5 / 512.0
                + 96199.0 * n6 / 604_800.0,
            n2 / 48.0 + n3 / 15.0 - 437.0 * n4 / 1440.0 + 46.0 * n5 / 105.0
                - 1_118_711.0 * n6 / 3_870_720.0,
            17.0 * n3 / 480.0 - 37.0 * n4 / 840.0 - 209.0 * n5 / 4480.0 + 5569.0 * n6 / 90720.0,
            4397.0 * n4 / 161_280.0 - 11.0 * n5 / 504.0 - 830_251.0 * n6 / 7_257_600.0,
            4583.0 * n5 / 161_280.0 - 108_847.0 * n6 / 3_991_680.0,
            20_648_693.0 * n6 / 638_668_800.0,
        ];

        Self {
            rectifying_radius,
            alpha,
            beta,
        }
    }
}

/// tan of the conformal latitude for a given tan of geodetic latitude.
fn conformal_tau(tau: f64, e: f64) -> f64 {
    let tau1 = tau.hypot(1.0);
    let sigma = (e * (e * tau / tau1).atanh()).sinh();
    tau * sigma.hypot(1.0) - sigma * tau1
}

/// Inverts `conformal_tau` by Newton iteration.
fn tau_from_conformal(tau_c: f64, e: f64) -> f64 {
    let e2m = 1.0 - e * e;
    let mut tau = tau_c;
    for _ in 0..NEWTON_MAX_ITERATIONS {
        let tau_i = conformal_tau(tau, e);
        let d_tau = (tau_c - tau_i) / tau_i.hypot(1.0) * (1.0 + e2m * tau * tau)
            / (e2m * tau.hypot(1.0));
        tau += d_tau;
        if d_tau.abs() <= NEWTON_TOLERANCE * tau.abs().max(1.0) {
            break;
        }
    }
    tau
}

fn normalize_lon_deg(lon: f64) -> f64 {
    let mut l = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if l == -180.0 && lon > 0.0 {
        l = 180.0;
    }
    l
}
