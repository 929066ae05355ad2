//! Native → source.

use super::coord::{to_source_coord, to_source_coords};
use crate::config::ConverterConfig;
use crate::result::{Error, Result};
use crate::source::*;
use crate::types::*;

/// Walks a [PgGeometry] and rebuilds it with a [GeometryFactory].
///
/// Everything below the root is built with SRID 0; the root gets the SRID of the native root
/// once the whole tree is assembled.
pub struct ToSource {
    factory: GeometryFactory,
    max_depth: usize,
}

impl ToSource {
    pub fn new(config: &ConverterConfig) -> Self {
        ToSource {
            factory: GeometryFactory::new(config.precision, 0),
            max_depth: config.max_depth,
        }
    }

    pub fn convert(&self, root: &PgGeometry) -> Result<Geometry> {
        let out = self.geometry(root, 0)?;
        Ok(out.with_srid(root.srid()))
    }

    fn geometry(&self, geom: &PgGeometry, depth: usize) -> Result<Geometry> {
        if depth > self.max_depth {
            return Err(Error::NestingTooDeep(self.max_depth));
        }
        let out = match geom {
            PgGeometry::Point(p) => Geometry::Point(self.point(p)),
            PgGeometry::LineString(ls) => Geometry::LineString(self.line_string(ls)),
            PgGeometry::LinearRing(lr) => Geometry::LinearRing(self.linear_ring(lr)),
            PgGeometry::Polygon(poly) => Geometry::Polygon(self.polygon(poly)),
            PgGeometry::MultiPoint(mp) => Geometry::MultiPoint(
                self.factory
                    .create_multi_point(mp.points().iter().map(|p| self.point(p)).collect()),
            ),
            PgGeometry::MultiLineString(mls) => {
                Geometry::MultiLineString(self.factory.create_multi_line_string(
                    mls.lines().iter().map(|ls| self.line_string(ls)).collect(),
                ))
            }
            PgGeometry::MultiPolygon(mp) => Geometry::MultiPolygon(
                self.factory
                    .create_multi_polygon(mp.polygons().iter().map(|p| self.polygon(p)).collect()),
            ),
            PgGeometry::GeometryCollection(gc) => {
                let members = gc
                    .geometries()
                    .iter()
                    .map(|g| self.geometry(g, depth + 1))
                    .collect::<Result<Vec<_>>>()?;
                // the factory resets every member to SRID 0
                Geometry::GeometryCollection(self.factory.create_geometry_collection(members))
            }
        };
        Ok(out)
    }

    fn point(&self, p: &PgPoint) -> Point {
        if p.is_empty() {
            return self.factory.create_point(None);
        }
        self.factory.create_point(Some(to_source_coord(p)))
    }

    // the measure flag only shows up in the coordinate shape
    fn line_string(&self, ls: &PgLineString) -> LineString {
        self.factory.create_line_string(to_source_coords(ls.points()))
    }

    fn linear_ring(&self, lr: &PgLinearRing) -> LinearRing {
        self.factory.create_linear_ring(to_source_coords(lr.points()))
    }

    fn polygon(&self, poly: &PgPolygon) -> Polygon {
        let Some((shell, holes)) = poly.rings().split_first() else {
            return self.factory.create_empty_polygon();
        };
        let shell = self.linear_ring(shell);
        let holes = if holes.is_empty() {
            None
        } else {
            Some(holes.iter().map(|r| self.linear_ring(r)).collect())
        };
        self.factory.create_polygon(shell, holes)
    }
}
