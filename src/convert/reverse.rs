//! Source → native.

use super::coord::{to_pg_point, to_pg_points};
use crate::config::ConverterConfig;
use crate::result::{Error, Result};
use crate::source::*;
use crate::types::*;

/// Walks a [Geometry] and rebuilds it as a [PgGeometry].
///
/// PostGIS has no empty polygons or lines, only empty collections, so an empty root and every
/// empty member of a geometry collection is replaced by an empty [PgGeometryCollection] before
/// its kind is looked at.
pub struct ToNative {
    max_depth: usize,
}

impl ToNative {
    pub fn new(config: &ConverterConfig) -> Self {
        ToNative {
            max_depth: config.max_depth,
        }
    }

    pub fn convert(&self, root: &Geometry) -> Result<PgGeometry> {
        let out = self.geometry(root, 0)?;
        Ok(out.with_srid(root.srid()))
    }

    fn geometry(&self, geom: &Geometry, depth: usize) -> Result<PgGeometry> {
        if depth > self.max_depth {
            return Err(Error::NestingTooDeep(self.max_depth));
        }
        if geom.is_empty() {
            tracing::trace!(kind = geom.geometry_type(), depth, "empty geometry stored as collection");
            return Ok(PgGeometry::GeometryCollection(PgGeometryCollection::empty()));
        }
        let out = match geom {
            Geometry::Point(p) => PgGeometry::Point(self.point(p)),
            Geometry::LineString(ls) => PgGeometry::LineString(self.line_string(ls)),
            Geometry::LinearRing(lr) => PgGeometry::LinearRing(self.linear_ring(lr)),
            Geometry::Polygon(poly) => PgGeometry::Polygon(self.polygon(poly)),
            Geometry::MultiPoint(mp) => PgGeometry::MultiPoint(PgMultiPoint::new(
                mp.points().iter().map(|p| self.point(p)).collect(),
            )),
            Geometry::MultiLineString(mls) => PgGeometry::MultiLineString(
                PgMultiLineString::new(mls.lines().iter().map(|l| self.line_string(l)).collect())
                    .with_measure(true),
            ),
            Geometry::MultiPolygon(mp) => PgGeometry::MultiPolygon(PgMultiPolygon::new(
                mp.polygons().iter().map(|p| self.polygon(p)).collect(),
            )),
            Geometry::GeometryCollection(gc) => {
                let members = gc
                    .geometries()
                    .iter()
                    .map(|g| self.geometry(g, depth + 1))
                    .collect::<Result<Vec<_>>>()?;
                PgGeometry::GeometryCollection(PgGeometryCollection::new(members))
            }
        };
        Ok(out)
    }

    // an empty member of a multi point is kept as PostGIS's NaN point
    fn point(&self, p: &Point) -> PgPoint {
        match p.coord() {
            Some(c) => to_pg_point(c),
            None => PgPoint::empty(),
        }
    }

    // always flagged as measured so m values survive whether or not this line has any
    fn line_string(&self, ls: &LineString) -> PgLineString {
        PgLineString::new(to_pg_points(ls.coords())).with_measure(true)
    }

    fn linear_ring(&self, lr: &LinearRing) -> PgLinearRing {
        PgLinearRing::new(to_pg_points(lr.coords()))
    }

    fn polygon(&self, poly: &Polygon) -> PgPolygon {
        if poly.is_empty() {
            return PgPolygon::new(Vec::new());
        }
        let rings = std::iter::once(poly.exterior())
            .chain(poly.interiors())
            .map(|r| self.linear_ring(r))
            .collect();
        PgPolygon::new(rings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PrecisionModel;

    fn factory(srid: i32) -> GeometryFactory {
        GeometryFactory::new(PrecisionModel::Floating, srid)
    }

    fn to_native(geom: &Geometry) -> PgGeometry {
        ToNative::new(&ConverterConfig::default()).convert(geom).unwrap()
    }

    fn square(f: &GeometryFactory, offset: f64, size: f64) -> LinearRing {
        f.create_linear_ring(vec![
            Coord::xy(offset, offset),
            Coord::xy(offset + size, offset),
            Coord::xy(offset + size, offset + size),
            Coord::xy(offset, offset + size),
            Coord::xy(offset, offset),
        ])
    }

    #[test]
    fn point_with_measure() {
        let f = factory(0);
        let p = Geometry::Point(f.create_point(Some(Coord::xym(34.1037, 60.1005, 100.0))));
        match to_native(&p) {
            PgGeometry::Point(pt) => {
                assert_eq!((pt.x, pt.y), (34.1037, 60.1005));
                assert!(pt.have_measure());
                assert_eq!(pt.m, Some(100.0));
                assert_eq!(pt.dimension(), Dimension::XY);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn point_dimension_from_z() {
        let f = factory(4326);
        let p = Geometry::Point(f.create_point(Some(Coord::xyz(1.0, 2.0, 3.0))));
        match to_native(&p) {
            PgGeometry::Point(pt) => {
                assert_eq!(pt.dimension(), Dimension::XYZ);
                assert_eq!(pt.z, Some(3.0));
                assert_eq!(pt.srid, 4326);
                assert!(!pt.have_measure());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn line_strings_are_always_measured() {
        let f = factory(0);
        let ls = Geometry::LineString(
            f.create_line_string(vec![Coord::xy(0.0, 0.0), Coord::xy(1.0, 1.0)]),
        );
        let out = to_native(&ls);
        assert_eq!(out.kind(), PgGeometryKind::LineString);
        assert!(out.have_measure());

        let mls = Geometry::MultiLineString(f.create_multi_line_string(vec![
            f.create_line_string(vec![Coord::xy(0.0, 0.0), Coord::xy(1.0, 1.0)]),
        ]));
        assert!(to_native(&mls).have_measure());
    }

    #[test]
    fn every_empty_kind_becomes_empty_collection() {
        let f = factory(3857);
        let empties = vec![
            Geometry::Point(f.create_point(None)),
            Geometry::LineString(f.create_line_string(vec![])),
            Geometry::LinearRing(f.create_linear_ring(vec![])),
            Geometry::Polygon(f.create_empty_polygon()),
            Geometry::MultiPoint(f.create_multi_point(vec![])),
            Geometry::MultiLineString(f.create_multi_line_string(vec![])),
            Geometry::MultiPolygon(f.create_multi_polygon(vec![])),
            Geometry::GeometryCollection(f.create_geometry_collection(vec![])),
        ];
        for geom in empties {
            match to_native(&geom) {
                PgGeometry::GeometryCollection(gc) => {
                    assert!(gc.geometries().is_empty(), "{}", geom.geometry_type());
                    assert_eq!(gc.srid(), 3857, "{}", geom.geometry_type());
                }
                other => panic!("{} became {:?}", geom.geometry_type(), other),
            }
        }
    }

    #[test]
    fn empty_collection_members_are_substituted() {
        let f = factory(4326);
        let gc = Geometry::GeometryCollection(f.create_geometry_collection(vec![
            Geometry::Point(f.create_point(Some(Coord::xy(1.0, 1.0)))),
            Geometry::Polygon(f.create_empty_polygon()),
        ]));
        match to_native(&gc) {
            PgGeometry::GeometryCollection(out) => {
                assert_eq!(out.srid(), 4326);
                assert_eq!(out.geometries()[0].kind(), PgGeometryKind::Point);
                assert_eq!(out.geometries()[1].kind(), PgGeometryKind::GeometryCollection);
                assert!(out.geometries().iter().all(|g| g.srid() == 0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn empty_multi_point_member_is_nan_point() {
        let f = factory(0);
        let mp = Geometry::MultiPoint(f.create_multi_point(vec![
            f.create_point(Some(Coord::xy(1.0, 1.0))),
            f.create_point(None),
        ]));
        match to_native(&mp) {
            PgGeometry::MultiPoint(out) => {
                assert_eq!(out.points().len(), 2);
                assert!(out.points()[1].is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn polygon_ring_order() {
        let f = factory(0);
        let poly = f.create_polygon(
            square(&f, 0.0, 10.0),
            Some(vec![square(&f, 1.0, 1.0), square(&f, 5.0, 2.0)]),
        );
        match to_native(&Geometry::Polygon(poly)) {
            PgGeometry::Polygon(out) => {
                assert_eq!(out.rings().len(), 3);
                assert_eq!(out.rings()[0].points()[1], PgPoint::new(10.0, 0.0));
                assert_eq!(out.rings()[1].points()[0], PgPoint::new(1.0, 1.0));
                assert_eq!(out.rings()[2].points()[0], PgPoint::new(5.0, 5.0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn multi_member_srid_is_zero() {
        let f = factory(4326);
        let member = f.create_point(Some(Coord::xy(1.0, 1.0))).with_srid(2056);
        let mp = Geometry::MultiPoint(f.create_multi_point(vec![member]));
        match to_native(&mp) {
            PgGeometry::MultiPoint(out) => {
                assert_eq!(out.srid(), 4326);
                assert_eq!(out.points()[0].srid, 0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn multi_line_and_polygon_members_get_srid_zero() {
        let root = factory(4326);
        let other = factory(2056);

        let line = other.create_line_string(vec![Coord::xy(0.0, 0.0), Coord::xy(1.0, 1.0)]);
        assert_eq!(line.srid(), 2056);
        let mls = Geometry::MultiLineString(root.create_multi_line_string(vec![line]));
        match to_native(&mls) {
            PgGeometry::MultiLineString(out) => {
                assert_eq!(out.srid(), 4326);
                assert_eq!(out.lines()[0].srid(), 0);
            }
            other => panic!("unexpected {:?}", other),
        }

        let poly = other.create_polygon(square(&other, 0.0, 1.0), None);
        assert_eq!(poly.srid(), 2056);
        let mpoly = Geometry::MultiPolygon(root.create_multi_polygon(vec![poly]));
        match to_native(&mpoly) {
            PgGeometry::MultiPolygon(out) => {
                assert_eq!(out.srid(), 4326);
                assert_eq!(out.polygons()[0].srid(), 0);
                assert_eq!(out.polygons()[0].rings()[0].srid(), 0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
