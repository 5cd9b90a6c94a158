use super::{Coord, WGS84_A};

/// Latitude limit of the square web mercator world (degrees).
pub const WEB_MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

/// Half the side of the web mercator world square (meters).
pub const WEB_MERCATOR_HALF_WORLD: f64 = std::f64::consts::PI * WGS84_A;

/// Geographic lon/lat (degrees) to spherical web mercator meters.
///
/// Latitude is clamped to the mercator square so the poles stay finite.
pub fn lon_lat_to_web_mercator(lon_lat: Coord) -> Coord {
    let lat = lon_lat
        .y
        .clamp(-WEB_MERCATOR_MAX_LAT, WEB_MERCATOR_MAX_LAT)
        .to_radians();
    let x = WGS84_A * lon_lat.x.to_radians();
    let y = WGS84_A * (std::f64::consts::FRAC_PI_4 + lat / 2.0).tan().ln();
    Coord::new(x, y)
}

/// Spherical web mercator meters to geographic lon/lat (degrees).
pub fn web_mercator_to_lon_lat(xy: Coord) -> Coord {
    let lon = (xy.x / WGS84_A).to_degrees();
    let lat = (2.0 * (xy.y / WGS84_A).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    Coord::new(lon, lat)
}
