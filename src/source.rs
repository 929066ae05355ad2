//! The immutable geometry tree handed to callers.
//!
//! Geometries are only built through a [GeometryFactory], which stamps them with its SRID and
//! snaps their coordinates to its [PrecisionModel]. Multi-geometries and collections reset the
//! SRID of their members to 0.

use crate::config::PrecisionModel;
use crate::result::{Error, Result};

/// A coordinate with independently optional z and m ordinates.
///
/// Non-finite z or m values are stored as absent, so `z.is_some()` always means a finite
/// third dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
    pub m: Option<f64>,
}

impl Coord {
    pub fn new(x: f64, y: f64, z: Option<f64>, m: Option<f64>) -> Self {
        Coord {
            x,
            y,
            z: z.filter(|v| v.is_finite()),
            m: m.filter(|v| v.is_finite()),
        }
    }

    pub fn xy(x: f64, y: f64) -> Self {
        Coord::new(x, y, None, None)
    }

    pub fn xyz(x: f64, y: f64, z: f64) -> Self {
        Coord::new(x, y, Some(z), None)
    }

    pub fn xym(x: f64, y: f64, m: f64) -> Self {
        Coord::new(x, y, None, Some(m))
    }

    pub fn xyzm(x: f64, y: f64, z: f64, m: f64) -> Self {
        Coord::new(x, y, Some(z), Some(m))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    coord: Option<Coord>,
    srid: i32,
}

impl Point {
    pub fn coord(&self) -> Option<&Coord> {
        self.coord.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.coord.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineString {
    coords: Vec<Coord>,
    srid: i32,
}

impl LineString {
    pub fn coords(&self) -> &[Coord] {
        &self.coords
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearRing {
    coords: Vec<Coord>,
    srid: i32,
}

impl LinearRing {
    pub fn coords(&self) -> &[Coord] {
        &self.coords
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    exterior: LinearRing,
    interiors: Vec<LinearRing>,
    srid: i32,
}

impl Polygon {
    pub fn exterior(&self) -> &LinearRing {
        &self.exterior
    }

    pub fn interiors(&self) -> &[LinearRing] {
        &self.interiors
    }

    pub fn is_empty(&self) -> bool {
        self.exterior.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultiPoint {
    points: Vec<Point>,
    srid: i32,
}

impl MultiPoint {
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.iter().all(Point::is_empty)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultiLineString {
    lines: Vec<LineString>,
    srid: i32,
}

impl MultiLineString {
    pub fn lines(&self) -> &[LineString] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(LineString::is_empty)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultiPolygon {
    polygons: Vec<Polygon>,
    srid: i32,
}

impl MultiPolygon {
    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.iter().all(Polygon::is_empty)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeometryCollection {
    geometries: Vec<Geometry>,
    srid: i32,
}

impl GeometryCollection {
    pub fn geometries(&self) -> &[Geometry] {
        &self.geometries
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.iter().all(Geometry::is_empty)
    }
}

macro_rules! impl_srid {
    ($($t:ty),*) => {
        $(
            impl $t {
                pub fn srid(&self) -> i32 {
                    self.srid
                }

                pub fn with_srid(self, srid: i32) -> Self {
                    Self { srid, ..self }
                }
            }
        )*
    };
}

impl_srid!(
    Point,
    LineString,
    LinearRing,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection
);

impl Polygon {
    pub fn srid(&self) -> i32 {
        self.srid
    }

    /// The rings follow the polygon's SRID.
    pub fn with_srid(self, srid: i32) -> Self {
        Polygon {
            exterior: self.exterior.with_srid(srid),
            interiors: self
                .interiors
                .into_iter()
                .map(|r| r.with_srid(srid))
                .collect(),
            srid,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point),
    LineString(LineString),
    LinearRing(LinearRing),
    Polygon(Polygon),
    MultiPoint(MultiPoint),
    MultiLineString(MultiLineString),
    MultiPolygon(MultiPolygon),
    GeometryCollection(GeometryCollection),
}

macro_rules! dispatch {
    ($self:expr, $g:ident => $body:expr) => {
        match $self {
            Geometry::Point($g) => $body,
            Geometry::LineString($g) => $body,
            Geometry::LinearRing($g) => $body,
            Geometry::Polygon($g) => $body,
            Geometry::MultiPoint($g) => $body,
            Geometry::MultiLineString($g) => $body,
            Geometry::MultiPolygon($g) => $body,
            Geometry::GeometryCollection($g) => $body,
        }
    };
}

impl Geometry {
    /// The type name, `"Point"`, `"MultiPolygon"` and so on
    pub fn geometry_type(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::LineString(_) => "LineString",
            Geometry::LinearRing(_) => "LinearRing",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::MultiPolygon(_) => "MultiPolygon",
            Geometry::GeometryCollection(_) => "GeometryCollection",
        }
    }

    pub fn srid(&self) -> i32 {
        dispatch!(self, g => g.srid())
    }

    pub fn with_srid(self, srid: i32) -> Self {
        match self {
            Geometry::Point(g) => Geometry::Point(g.with_srid(srid)),
            Geometry::LineString(g) => Geometry::LineString(g.with_srid(srid)),
            Geometry::LinearRing(g) => Geometry::LinearRing(g.with_srid(srid)),
            Geometry::Polygon(g) => Geometry::Polygon(g.with_srid(srid)),
            Geometry::MultiPoint(g) => Geometry::MultiPoint(g.with_srid(srid)),
            Geometry::MultiLineString(g) => Geometry::MultiLineString(g.with_srid(srid)),
            Geometry::MultiPolygon(g) => Geometry::MultiPolygon(g.with_srid(srid)),
            Geometry::GeometryCollection(g) => Geometry::GeometryCollection(g.with_srid(srid)),
        }
    }

    pub fn is_empty(&self) -> bool {
        dispatch!(self, g => g.is_empty())
    }

    /// The first coordinate of the geometry, if it has any
    pub fn coordinate(&self) -> Option<Coord> {
        self.coordinates().into_iter().next()
    }

    /// Every coordinate in depth-first order
    pub fn coordinates(&self) -> Vec<Coord> {
        let mut out = Vec::new();
        self.collect_coords(&mut out);
        out
    }

    fn collect_coords(&self, out: &mut Vec<Coord>) {
        match self {
            Geometry::Point(p) => out.extend(p.coord),
            Geometry::LineString(ls) => out.extend_from_slice(ls.coords()),
            Geometry::LinearRing(lr) => out.extend_from_slice(lr.coords()),
            Geometry::Polygon(poly) => polygon_coords(poly, out),
            Geometry::MultiPoint(mp) => out.extend(mp.points().iter().filter_map(|p| p.coord)),
            Geometry::MultiLineString(mls) => {
                for ls in mls.lines() {
                    out.extend_from_slice(ls.coords());
                }
            }
            Geometry::MultiPolygon(mp) => {
                for poly in mp.polygons() {
                    polygon_coords(poly, out);
                }
            }
            Geometry::GeometryCollection(gc) => {
                for g in gc.geometries() {
                    g.collect_coords(out);
                }
            }
        }
    }
}

fn polygon_coords(poly: &Polygon, out: &mut Vec<Coord>) {
    out.extend_from_slice(poly.exterior().coords());
    for ring in poly.interiors() {
        out.extend_from_slice(ring.coords());
    }
}

/// Builds every geometry kind for one SRID and precision model.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeometryFactory {
    precision: PrecisionModel,
    srid: i32,
}

impl GeometryFactory {
    pub fn new(precision: PrecisionModel, srid: i32) -> Self {
        GeometryFactory { precision, srid }
    }

    pub fn srid(&self) -> i32 {
        self.srid
    }

    pub fn precision(&self) -> PrecisionModel {
        self.precision
    }

    /// A factory with the same precision model stamping a different SRID
    pub fn with_srid(self, srid: i32) -> Self {
        GeometryFactory { srid, ..self }
    }

    fn precise(&self, c: Coord) -> Coord {
        Coord {
            x: self.precision.make_precise(c.x),
            y: self.precision.make_precise(c.y),
            z: c.z.map(|z| self.precision.make_precise(z)),
            m: c.m,
        }
    }

    fn precise_all(&self, coords: Vec<Coord>) -> Vec<Coord> {
        coords.into_iter().map(|c| self.precise(c)).collect()
    }

    /// `None` builds an empty point
    pub fn create_point(&self, coord: Option<Coord>) -> Point {
        Point {
            coord: coord.map(|c| self.precise(c)),
            srid: self.srid,
        }
    }

    pub fn create_line_string(&self, coords: Vec<Coord>) -> LineString {
        LineString {
            coords: self.precise_all(coords),
            srid: self.srid,
        }
    }

    pub fn create_linear_ring(&self, coords: Vec<Coord>) -> LinearRing {
        LinearRing {
            coords: self.precise_all(coords),
            srid: self.srid,
        }
    }

    /// `None` for `holes` means the polygon has no interior rings.
    pub fn create_polygon(&self, shell: LinearRing, holes: Option<Vec<LinearRing>>) -> Polygon {
        Polygon {
            exterior: shell,
            interiors: holes.unwrap_or_default(),
            srid: self.srid,
        }
        .with_srid(self.srid)
    }

    pub fn create_empty_polygon(&self) -> Polygon {
        self.create_polygon(self.create_linear_ring(Vec::new()), None)
    }

    pub fn create_multi_point(&self, points: Vec<Point>) -> MultiPoint {
        MultiPoint {
            points: points.into_iter().map(|p| p.with_srid(0)).collect(),
            srid: self.srid,
        }
    }

    pub fn create_multi_line_string(&self, lines: Vec<LineString>) -> MultiLineString {
        MultiLineString {
            lines: lines.into_iter().map(|l| l.with_srid(0)).collect(),
            srid: self.srid,
        }
    }

    pub fn create_multi_polygon(&self, polygons: Vec<Polygon>) -> MultiPolygon {
        MultiPolygon {
            polygons: polygons.into_iter().map(|p| p.with_srid(0)).collect(),
            srid: self.srid,
        }
    }

    pub fn create_geometry_collection(&self, geometries: Vec<Geometry>) -> GeometryCollection {
        GeometryCollection {
            geometries: geometries.into_iter().map(|g| g.with_srid(0)).collect(),
            srid: self.srid,
        }
    }
}

fn to_geo_coord(c: &Coord) -> geo_types::Coord<f64> {
    geo_types::coord! { x: c.x, y: c.y }
}

fn to_geo_line(coords: &[Coord]) -> geo_types::LineString<f64> {
    geo_types::LineString::new(coords.iter().map(to_geo_coord).collect())
}

fn to_geo_polygon(poly: &Polygon) -> geo_types::Polygon<f64> {
    geo_types::Polygon::new(
        to_geo_line(poly.exterior().coords()),
        poly.interiors().iter().map(|r| to_geo_line(r.coords())).collect(),
    )
}

/// Drops z, m and the SRID. `geo-types` has no empty point, so one becomes an empty collection.
impl From<&Geometry> for geo_types::Geometry<f64> {
    fn from(geom: &Geometry) -> Self {
        match geom {
            Geometry::Point(p) => match p.coord() {
                Some(c) => geo_types::Geometry::Point(geo_types::Point(to_geo_coord(c))),
                None => geo_types::Geometry::GeometryCollection(
                    geo_types::GeometryCollection::new_from(Vec::new()),
                ),
            },
            Geometry::LineString(ls) => geo_types::Geometry::LineString(to_geo_line(ls.coords())),
            Geometry::LinearRing(lr) => geo_types::Geometry::LineString(to_geo_line(lr.coords())),
            Geometry::Polygon(poly) => geo_types::Geometry::Polygon(to_geo_polygon(poly)),
            Geometry::MultiPoint(mp) => geo_types::Geometry::MultiPoint(geo_types::MultiPoint::new(
                mp.points()
                    .iter()
                    .filter_map(|p| p.coord().map(|c| geo_types::Point(to_geo_coord(c))))
                    .collect(),
            )),
            Geometry::MultiLineString(mls) => {
                geo_types::Geometry::MultiLineString(geo_types::MultiLineString::new(
                    mls.lines().iter().map(|l| to_geo_line(l.coords())).collect(),
                ))
            }
            Geometry::MultiPolygon(mp) => geo_types::Geometry::MultiPolygon(
                geo_types::MultiPolygon::new(mp.polygons().iter().map(to_geo_polygon).collect()),
            ),
            Geometry::GeometryCollection(gc) => geo_types::Geometry::GeometryCollection(
                geo_types::GeometryCollection::new_from(
                    gc.geometries().iter().map(geo_types::Geometry::from).collect(),
                ),
            ),
        }
    }
}

fn from_geo_line(line: &geo_types::LineString<f64>) -> Vec<Coord> {
    line.0.iter().map(|c| Coord::xy(c.x, c.y)).collect()
}

fn from_geo_polygon(factory: &GeometryFactory, poly: &geo_types::Polygon<f64>) -> Polygon {
    let shell = factory.create_linear_ring(from_geo_line(poly.exterior()));
    let holes: Vec<LinearRing> = poly
        .interiors()
        .iter()
        .map(|r| factory.create_linear_ring(from_geo_line(r)))
        .collect();
    factory.create_polygon(shell, (!holes.is_empty()).then_some(holes))
}

fn geo_kind_name(geom: &geo_types::Geometry<f64>) -> &'static str {
    match geom {
        geo_types::Geometry::Line(_) => "Line",
        geo_types::Geometry::Rect(_) => "Rect",
        geo_types::Geometry::Triangle(_) => "Triangle",
        _ => "Geometry",
    }
}

/// Builds a 2D geometry with SRID 0. `Line`, `Rect` and `Triangle` have no counterpart and are
/// rejected with [Error::UnsupportedKind].
impl TryFrom<geo_types::Geometry<f64>> for Geometry {
    type Error = Error;

    fn try_from(geom: geo_types::Geometry<f64>) -> Result<Self> {
        let factory = GeometryFactory::default();
        let out = match &geom {
            geo_types::Geometry::Point(p) => {
                Geometry::Point(factory.create_point(Some(Coord::xy(p.x(), p.y()))))
            }
            geo_types::Geometry::LineString(ls) => {
                Geometry::LineString(factory.create_line_string(from_geo_line(ls)))
            }
            geo_types::Geometry::Polygon(poly) => {
                Geometry::Polygon(from_geo_polygon(&factory, poly))
            }
            geo_types::Geometry::MultiPoint(mp) => Geometry::MultiPoint(
                factory.create_multi_point(
                    mp.0.iter()
                        .map(|p| factory.create_point(Some(Coord::xy(p.x(), p.y()))))
                        .collect(),
                ),
            ),
            geo_types::Geometry::MultiLineString(mls) => Geometry::MultiLineString(
                factory.create_multi_line_string(
                    mls.0.iter()
                        .map(|ls| factory.create_line_string(from_geo_line(ls)))
                        .collect(),
                ),
            ),
            geo_types::Geometry::MultiPolygon(mp) => Geometry::MultiPolygon(
                factory.create_multi_polygon(
                    mp.0.iter().map(|p| from_geo_polygon(&factory, p)).collect(),
                ),
            ),
            geo_types::Geometry::GeometryCollection(gc) => {
                let members = gc
                    .0
                    .iter()
                    .cloned()
                    .map(Geometry::try_from)
                    .collect::<Result<Vec<_>>>()?;
                Geometry::GeometryCollection(factory.create_geometry_collection(members))
            }
            other => return Err(Error::UnsupportedKind(geo_kind_name(other).to_owned())),
        };
        Ok(out)
    }
}
