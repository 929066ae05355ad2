use crate::source::Coord;
use crate::types::{Dimension, PgPoint};

/// A 2D point yields (x, y) or (x, y, m); a 3D point (x, y, z) or (x, y, z, m).
pub(crate) fn to_source_coord(p: &PgPoint) -> Coord {
    let m = if p.have_measure() { p.m } else { None };
    match p.dimension() {
        Dimension::XY => Coord::new(p.x, p.y, None, m),
        Dimension::XYZ => Coord::new(p.x, p.y, p.z, m),
    }
}

pub(crate) fn to_source_coords(points: &[PgPoint]) -> Vec<Coord> {
    points.iter().map(to_source_coord).collect()
}

/// The point is 3D exactly when the coordinate has a z; a measure is copied when present.
pub(crate) fn to_pg_point(c: &Coord) -> PgPoint {
    PgPoint::new(c.x, c.y)
        .with_z(c.z.filter(|z| z.is_finite()))
        .with_m(c.m.filter(|m| m.is_finite()))
}

pub(crate) fn to_pg_points(coords: &[Coord]) -> Vec<PgPoint> {
    coords.iter().map(to_pg_point).collect()
}
