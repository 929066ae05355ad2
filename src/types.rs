//! Geometry values as the PostGIS driver hands them over.
//!
//! Every node exposes an SRID, a [Dimension] and a measure flag. Nodes nested inside a
//! multi-geometry, a collection or a polygon always carry an SRID of 0; the constructors
//! enforce this so only the root of a tree is stamped with a reference system.

use std::fmt;

/// Number of spatial ordinates per coordinate, not counting the measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    XY,
    XYZ,
}

impl Dimension {
    pub fn ordinates(self) -> u8 {
        match self {
            Dimension::XY => 2,
            Dimension::XYZ => 3,
        }
    }

    fn max(self, other: Dimension) -> Dimension {
        if self == Dimension::XYZ || other == Dimension::XYZ {
            Dimension::XYZ
        } else {
            Dimension::XY
        }
    }
}

/// The eight geometry kinds PostGIS stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PgGeometryKind {
    Point,
    LineString,
    LinearRing,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

impl PgGeometryKind {
    pub fn type_name(self) -> &'static str {
        match self {
            PgGeometryKind::Point => "POINT",
            PgGeometryKind::LineString => "LINESTRING",
            PgGeometryKind::LinearRing => "LINEARRING",
            PgGeometryKind::Polygon => "POLYGON",
            PgGeometryKind::MultiPoint => "MULTIPOINT",
            PgGeometryKind::MultiLineString => "MULTILINESTRING",
            PgGeometryKind::MultiPolygon => "MULTIPOLYGON",
            PgGeometryKind::GeometryCollection => "GEOMETRYCOLLECTION",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PgPoint {
    pub srid: i32,
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
    pub m: Option<f64>,
}

impl PgPoint {
    pub fn new(x: f64, y: f64) -> Self {
        PgPoint {
            srid: 0,
            x,
            y,
            z: None,
            m: None,
        }
    }

    pub fn new_3d(x: f64, y: f64, z: f64) -> Self {
        PgPoint::new(x, y).with_z(Some(z))
    }

    /// The PostGIS encoding of `POINT EMPTY`
    pub fn empty() -> Self {
        PgPoint::new(f64::NAN, f64::NAN)
    }

    pub fn with_z(self, z: Option<f64>) -> Self {
        PgPoint { z, ..self }
    }

    pub fn with_m(self, m: Option<f64>) -> Self {
        PgPoint { m, ..self }
    }

    pub fn with_srid(self, srid: i32) -> Self {
        PgPoint { srid, ..self }
    }

    pub fn dimension(&self) -> Dimension {
        match self.z {
            Some(_) => Dimension::XYZ,
            None => Dimension::XY,
        }
    }

    pub fn have_measure(&self) -> bool {
        self.m.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_nan() && self.y.is_nan()
    }
}

// line strings and linear rings only differ in name, so they share one definition
macro_rules! point_composed {
    ($(#[$doc:meta])* $t:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $t {
            srid: i32,
            points: Vec<PgPoint>,
            have_measure: bool,
        }

        impl $t {
            /// The measure flag is raised when any of the points carries a measure.
            pub fn new(points: Vec<PgPoint>) -> Self {
                let have_measure = points.iter().any(PgPoint::have_measure);
                $t {
                    srid: 0,
                    points: points.into_iter().map(|p| p.with_srid(0)).collect(),
                    have_measure,
                }
            }

            pub fn points(&self) -> &[PgPoint] {
                &self.points
            }

            pub fn dimension(&self) -> Dimension {
                self.points
                    .iter()
                    .fold(Dimension::XY, |d, p| d.max(p.dimension()))
            }

            pub fn is_empty(&self) -> bool {
                self.points.is_empty()
            }
        }

        impl_node_header!($t);
    };
}

// srid and measure accessors shared by every composite node
macro_rules! impl_node_header {
    ($($t:ty),*) => {
        $(
            impl $t {
                pub fn srid(&self) -> i32 {
                    self.srid
                }

                pub fn with_srid(self, srid: i32) -> Self {
                    Self { srid, ..self }
                }

                pub fn have_measure(&self) -> bool {
                    self.have_measure
                }

                pub fn with_measure(self, have_measure: bool) -> Self {
                    Self { have_measure, ..self }
                }
            }
        )*
    };
}

point_composed!(PgLineString);
point_composed!(
    /// A closed line string used as a polygon ring
    PgLinearRing
);

#[derive(Debug, Clone, PartialEq)]
pub struct PgPolygon {
    srid: i32,
    rings: Vec<PgLinearRing>,
    have_measure: bool,
}

impl PgPolygon {
    /// Ring 0 is the shell, the rest are holes.
    pub fn new(rings: Vec<PgLinearRing>) -> Self {
        let have_measure = rings.iter().any(PgLinearRing::have_measure);
        PgPolygon {
            srid: 0,
            rings: rings.into_iter().map(|r| r.with_srid(0)).collect(),
            have_measure,
        }
    }

    pub fn rings(&self) -> &[PgLinearRing] {
        &self.rings
    }

    pub fn dimension(&self) -> Dimension {
        self.rings
            .iter()
            .fold(Dimension::XY, |d, r| d.max(r.dimension()))
    }

    pub fn is_empty(&self) -> bool {
        self.rings.iter().all(PgLinearRing::is_empty)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PgMultiPoint {
    srid: i32,
    points: Vec<PgPoint>,
    have_measure: bool,
}

impl PgMultiPoint {
    pub fn new(points: Vec<PgPoint>) -> Self {
        let have_measure = points.iter().any(PgPoint::have_measure);
        PgMultiPoint {
            srid: 0,
            points: points.into_iter().map(|p| p.with_srid(0)).collect(),
            have_measure,
        }
    }

    pub fn points(&self) -> &[PgPoint] {
        &self.points
    }

    pub fn dimension(&self) -> Dimension {
        self.points
            .iter()
            .fold(Dimension::XY, |d, p| d.max(p.dimension()))
    }

    pub fn is_empty(&self) -> bool {
        self.points.iter().all(PgPoint::is_empty)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PgMultiLineString {
    srid: i32,
    lines: Vec<PgLineString>,
    have_measure: bool,
}

impl PgMultiLineString {
    pub fn new(lines: Vec<PgLineString>) -> Self {
        let have_measure = lines.iter().any(PgLineString::have_measure);
        PgMultiLineString {
            srid: 0,
            lines: lines.into_iter().map(|l| l.with_srid(0)).collect(),
            have_measure,
        }
    }

    pub fn lines(&self) -> &[PgLineString] {
        &self.lines
    }

    pub fn dimension(&self) -> Dimension {
        self.lines
            .iter()
            .fold(Dimension::XY, |d, l| d.max(l.dimension()))
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(PgLineString::is_empty)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PgMultiPolygon {
    srid: i32,
    polygons: Vec<PgPolygon>,
    have_measure: bool,
}

impl PgMultiPolygon {
    pub fn new(polygons: Vec<PgPolygon>) -> Self {
        let have_measure = polygons.iter().any(PgPolygon::have_measure);
        PgMultiPolygon {
            srid: 0,
            polygons: polygons.into_iter().map(|p| p.with_srid(0)).collect(),
            have_measure,
        }
    }

    pub fn polygons(&self) -> &[PgPolygon] {
        &self.polygons
    }

    pub fn dimension(&self) -> Dimension {
        self.polygons
            .iter()
            .fold(Dimension::XY, |d, p| d.max(p.dimension()))
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.iter().all(PgPolygon::is_empty)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PgGeometryCollection {
    srid: i32,
    geometries: Vec<PgGeometry>,
    have_measure: bool,
}

impl PgGeometryCollection {
    pub fn new(geometries: Vec<PgGeometry>) -> Self {
        let have_measure = geometries.iter().any(PgGeometry::have_measure);
        PgGeometryCollection {
            srid: 0,
            geometries: geometries.into_iter().map(|g| g.with_srid(0)).collect(),
            have_measure,
        }
    }

    pub fn empty() -> Self {
        PgGeometryCollection::new(Vec::new())
    }

    pub fn geometries(&self) -> &[PgGeometry] {
        &self.geometries
    }

    pub fn dimension(&self) -> Dimension {
        self.geometries
            .iter()
            .fold(Dimension::XY, |d, g| d.max(g.dimension()))
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.iter().all(PgGeometry::is_empty)
    }
}

impl_node_header!(
    PgPolygon,
    PgMultiPoint,
    PgMultiLineString,
    PgMultiPolygon,
    PgGeometryCollection
);

#[derive(Debug, Clone, PartialEq)]
pub enum PgGeometry {
    Point(PgPoint),
    LineString(PgLineString),
    LinearRing(PgLinearRing),
    Polygon(PgPolygon),
    MultiPoint(PgMultiPoint),
    MultiLineString(PgMultiLineString),
    MultiPolygon(PgMultiPolygon),
    GeometryCollection(PgGeometryCollection),
}

// every variant exposes the same header methods, this just forwards to them
macro_rules! dispatch {
    ($self:expr, $g:ident => $body:expr) => {
        match $self {
            PgGeometry::Point($g) => $body,
            PgGeometry::LineString($g) => $body,
            PgGeometry::LinearRing($g) => $body,
            PgGeometry::Polygon($g) => $body,
            PgGeometry::MultiPoint($g) => $body,
            PgGeometry::MultiLineString($g) => $body,
            PgGeometry::MultiPolygon($g) => $body,
            PgGeometry::GeometryCollection($g) => $body,
        }
    };
}

impl PgGeometry {
    pub fn kind(&self) -> PgGeometryKind {
        match self {
            PgGeometry::Point(_) => PgGeometryKind::Point,
            PgGeometry::LineString(_) => PgGeometryKind::LineString,
            PgGeometry::LinearRing(_) => PgGeometryKind::LinearRing,
            PgGeometry::Polygon(_) => PgGeometryKind::Polygon,
            PgGeometry::MultiPoint(_) => PgGeometryKind::MultiPoint,
            PgGeometry::MultiLineString(_) => PgGeometryKind::MultiLineString,
            PgGeometry::MultiPolygon(_) => PgGeometryKind::MultiPolygon,
            PgGeometry::GeometryCollection(_) => PgGeometryKind::GeometryCollection,
        }
    }

    pub fn srid(&self) -> i32 {
        dispatch!(self, g => g.srid)
    }

    pub fn with_srid(self, srid: i32) -> Self {
        match self {
            PgGeometry::Point(p) => PgGeometry::Point(p.with_srid(srid)),
            PgGeometry::LineString(g) => PgGeometry::LineString(g.with_srid(srid)),
            PgGeometry::LinearRing(g) => PgGeometry::LinearRing(g.with_srid(srid)),
            PgGeometry::Polygon(g) => PgGeometry::Polygon(g.with_srid(srid)),
            PgGeometry::MultiPoint(g) => PgGeometry::MultiPoint(g.with_srid(srid)),
            PgGeometry::MultiLineString(g) => PgGeometry::MultiLineString(g.with_srid(srid)),
            PgGeometry::MultiPolygon(g) => PgGeometry::MultiPolygon(g.with_srid(srid)),
            PgGeometry::GeometryCollection(g) => {
                PgGeometry::GeometryCollection(g.with_srid(srid))
            }
        }
    }

    pub fn dimension(&self) -> Dimension {
        dispatch!(self, g => g.dimension())
    }

    pub fn have_measure(&self) -> bool {
        dispatch!(self, g => g.have_measure())
    }

    pub fn is_empty(&self) -> bool {
        dispatch!(self, g => g.is_empty())
    }
}

/// Which of the two PostGIS box types a [PgBox] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxKind {
    Box2d,
    Box3d,
}

impl BoxKind {
    /// The SQL type name
    pub fn type_name(self) -> &'static str {
        match self {
            BoxKind::Box2d => "box2d",
            BoxKind::Box3d => "box3d",
        }
    }

    /// The keyword that starts the textual form
    pub fn prefix(self) -> &'static str {
        match self {
            BoxKind::Box2d => "BOX",
            BoxKind::Box3d => "BOX3D",
        }
    }
}

/// A bounding box as returned by PostGIS. The SRID lives on the lower-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct PgBox {
    pub kind: BoxKind,
    pub llb: PgPoint,
    pub urt: PgPoint,
}

impl PgBox {
    pub fn new_2d(llb: PgPoint, urt: PgPoint) -> Self {
        PgBox {
            kind: BoxKind::Box2d,
            llb,
            urt,
        }
    }

    pub fn new_3d(llb: PgPoint, urt: PgPoint) -> Self {
        PgBox {
            kind: BoxKind::Box3d,
            llb,
            urt,
        }
    }

    pub fn srid(&self) -> i32 {
        self.llb.srid
    }
}

fn write_ordinates(f: &mut fmt::Formatter<'_>, p: &PgPoint, dim: Dimension, m: bool) -> fmt::Result {
    write!(f, "{} {}", p.x, p.y)?;
    if dim == Dimension::XYZ {
        write!(f, " {}", p.z.unwrap_or(0.0))?;
    }
    if m {
        write!(f, " {}", p.m.unwrap_or(0.0))?;
    }
    Ok(())
}

fn write_point_list(
    f: &mut fmt::Formatter<'_>,
    points: &[PgPoint],
    dim: Dimension,
    m: bool,
) -> fmt::Result {
    f.write_str("(")?;
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write_ordinates(f, p, dim, m)?;
    }
    f.write_str(")")
}

fn write_polygon_body(f: &mut fmt::Formatter<'_>, poly: &PgPolygon, dim: Dimension, m: bool) -> fmt::Result {
    f.write_str("(")?;
    for (i, ring) in poly.rings().iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write_point_list(f, ring.points(), dim, m)?;
    }
    f.write_str(")")
}

impl PgGeometry {
    // EWKT without the SRID prefix, nested members are written in the same form
    fn write_wkt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dim = self.dimension();
        let m = self.have_measure();
        f.write_str(self.kind().type_name())?;
        // the M suffix is only written when there is no z to disambiguate the third ordinate
        if m && dim == Dimension::XY {
            f.write_str("M")?;
        }
        if self.is_empty() {
            return f.write_str(" EMPTY");
        }
        match self {
            PgGeometry::Point(p) => {
                f.write_str("(")?;
                write_ordinates(f, p, dim, m)?;
                f.write_str(")")
            }
            PgGeometry::LineString(ls) => write_point_list(f, ls.points(), dim, m),
            PgGeometry::LinearRing(lr) => write_point_list(f, lr.points(), dim, m),
            PgGeometry::Polygon(poly) => write_polygon_body(f, poly, dim, m),
            PgGeometry::MultiPoint(mp) => write_point_list(f, mp.points(), dim, m),
            PgGeometry::MultiLineString(mls) => {
                f.write_str("(")?;
                for (i, ls) in mls.lines().iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write_point_list(f, ls.points(), dim, m)?;
                }
                f.write_str(")")
            }
            PgGeometry::MultiPolygon(mp) => {
                f.write_str("(")?;
                for (i, poly) in mp.polygons().iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write_polygon_body(f, poly, dim, m)?;
                }
                f.write_str(")")
            }
            PgGeometry::GeometryCollection(gc) => {
                f.write_str("(")?;
                for (i, g) in gc.geometries().iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    g.write_wkt(f)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Extended WKT, `SRID=4326;POINT(1 2)`
impl fmt::Display for PgGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.srid() != 0 {
            write!(f, "SRID={};", self.srid())?;
        }
        self.write_wkt(f)
    }
}

impl fmt::Display for PgBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.srid() != 0 {
            write!(f, "SRID={};", self.srid())?;
        }
        let dim = match self.kind {
            BoxKind::Box2d => Dimension::XY,
            BoxKind::Box3d => Dimension::XYZ,
        };
        write!(f, "{}(", self.kind.prefix())?;
        write_ordinates(f, &self.llb, dim, false)?;
        f.write_str(",")?;
        write_ordinates(f, &self.urt, dim, false)?;
        f.write_str(")")
    }
}
