//! Reading and writing PostGIS extended WKB (EWKB).
//!
//! The reader understands both byte orders, the PostGIS flag bits for Z, M and SRID, and the ISO
//! type codes (1001, 2002, 3003 and so on). The writer always produces little endian output and
//! only puts an SRID on the root geometry.

use crate::config::DEFAULT_MAX_DEPTH;
use crate::result::{Error, Result};
use crate::types::*;
use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

const Z_FLAG: u32 = 0x8000_0000;
const M_FLAG: u32 = 0x4000_0000;
const SRID_FLAG: u32 = 0x2000_0000;
const FLAG_MASK: u32 = Z_FLAG | M_FLAG | SRID_FLAG;

// counts read from the input are not trusted for preallocation
const MAX_PREALLOC: usize = 1024;

struct GeomHeader {
    code: u32,
    has_z: bool,
    has_m: bool,
    srid: Option<i32>,
}

impl GeomHeader {
    fn read<T: ByteOrder, R: Read>(r: &mut R) -> Result<Self> {
        let type_word = r.read_u32::<T>()?;
        let mut has_z = type_word & Z_FLAG != 0;
        let mut has_m = type_word & M_FLAG != 0;
        let srid = if type_word & SRID_FLAG != 0 {
            Some(r.read_i32::<T>()?)
        } else {
            None
        };
        let iso_code = type_word & !FLAG_MASK;
        match iso_code / 1000 {
            0 => {}
            1 => has_z = true,
            2 => has_m = true,
            3 => {
                has_z = true;
                has_m = true;
            }
            _ => return Err(Error::UnsupportedKind(format!("WKB type {}", iso_code))),
        }
        Ok(GeomHeader {
            code: iso_code % 1000,
            has_z,
            has_m,
            srid,
        })
    }

    fn write<W: Write>(
        w: &mut W,
        code: u32,
        has_z: bool,
        has_m: bool,
        srid: Option<i32>,
    ) -> Result<()> {
        let mut type_word = code;
        if has_z {
            type_word |= Z_FLAG;
        }
        if has_m {
            type_word |= M_FLAG;
        }
        if srid.is_some() {
            type_word |= SRID_FLAG;
        }
        // we will always write as little endian
        w.write_u8(1)?;
        w.write_u32::<LittleEndian>(type_word)?;
        if let Some(srid) = srid {
            w.write_i32::<LittleEndian>(srid)?;
        }
        Ok(())
    }
}

fn wkb_code(kind: PgGeometryKind) -> u32 {
    match kind {
        PgGeometryKind::Point => 1,
        // there is no ring type on the wire
        PgGeometryKind::LineString | PgGeometryKind::LinearRing => 2,
        PgGeometryKind::Polygon => 3,
        PgGeometryKind::MultiPoint => 4,
        PgGeometryKind::MultiLineString => 5,
        PgGeometryKind::MultiPolygon => 6,
        PgGeometryKind::GeometryCollection => 7,
    }
}

/// Decode a single geometry, following at most [DEFAULT_MAX_DEPTH] levels of nesting.
pub fn read_ewkb(r: &mut impl Read) -> Result<PgGeometry> {
    read_ewkb_with_limit(r, DEFAULT_MAX_DEPTH)
}

pub fn read_ewkb_with_limit(r: &mut impl Read, max_depth: usize) -> Result<PgGeometry> {
    let geom = read_geometry(r, 0, max_depth)?;
    tracing::trace!(kind = ?geom.kind(), srid = geom.srid(), "decoded EWKB geometry");
    Ok(geom)
}

fn read_geometry<R: Read>(r: &mut R, depth: usize, max_depth: usize) -> Result<PgGeometry> {
    if depth > max_depth {
        return Err(Error::NestingTooDeep(max_depth));
    }
    match r.read_u8()? {
        0 => read_body::<BigEndian, _>(r, depth, max_depth),
        1 => read_body::<LittleEndian, _>(r, depth, max_depth),
        _ => Err(Error::GeomDecodeError),
    }
}

fn read_point<T: ByteOrder, R: Read>(r: &mut R, header: &GeomHeader) -> Result<PgPoint> {
    let x = r.read_f64::<T>()?;
    let y = r.read_f64::<T>()?;
    let z = if header.has_z {
        Some(r.read_f64::<T>()?)
    } else {
        None
    };
    let m = if header.has_m {
        Some(r.read_f64::<T>()?)
    } else {
        None
    };
    Ok(PgPoint::new(x, y).with_z(z).with_m(m))
}

fn read_points<T: ByteOrder, R: Read>(r: &mut R, header: &GeomHeader) -> Result<Vec<PgPoint>> {
    let num_points = r.read_u32::<T>()?;
    let mut out_vec = Vec::with_capacity((num_points as usize).min(MAX_PREALLOC));
    for _ in 0..num_points {
        out_vec.push(read_point::<T, _>(r, header)?);
    }
    Ok(out_vec)
}

fn read_polygon<T: ByteOrder, R: Read>(r: &mut R, header: &GeomHeader) -> Result<PgPolygon> {
    let num_rings = r.read_u32::<T>()?;
    let mut rings = Vec::with_capacity((num_rings as usize).min(MAX_PREALLOC));
    for _ in 0..num_rings {
        rings.push(PgLinearRing::new(read_points::<T, _>(r, header)?).with_measure(header.has_m));
    }
    Ok(PgPolygon::new(rings).with_measure(header.has_m))
}

fn read_members<T: ByteOrder, R: Read>(
    r: &mut R,
    depth: usize,
    max_depth: usize,
) -> Result<Vec<PgGeometry>> {
    let num_geoms = r.read_u32::<T>()?;
    let mut geoms = Vec::with_capacity((num_geoms as usize).min(MAX_PREALLOC));
    for _ in 0..num_geoms {
        geoms.push(read_geometry(r, depth + 1, max_depth)?);
    }
    Ok(geoms)
}

fn read_body<T: ByteOrder, R: Read>(r: &mut R, depth: usize, max_depth: usize) -> Result<PgGeometry> {
    let header = GeomHeader::read::<T, _>(r)?;
    let geom = match header.code {
        1 => PgGeometry::Point(read_point::<T, _>(r, &header)?),
        2 => PgGeometry::LineString(
            PgLineString::new(read_points::<T, _>(r, &header)?).with_measure(header.has_m),
        ),
        3 => PgGeometry::Polygon(read_polygon::<T, _>(r, &header)?),
        4 => {
            let points = read_members::<T, _>(r, depth, max_depth)?
                .into_iter()
                .map(|g| match g {
                    PgGeometry::Point(p) => Ok(p),
                    _ => Err(Error::GeomDecodeError),
                })
                .collect::<Result<Vec<_>>>()?;
            PgGeometry::MultiPoint(PgMultiPoint::new(points).with_measure(header.has_m))
        }
        5 => {
            let lines = read_members::<T, _>(r, depth, max_depth)?
                .into_iter()
                .map(|g| match g {
                    PgGeometry::LineString(ls) => Ok(ls),
                    _ => Err(Error::GeomDecodeError),
                })
                .collect::<Result<Vec<_>>>()?;
            PgGeometry::MultiLineString(PgMultiLineString::new(lines).with_measure(header.has_m))
        }
        6 => {
            let polygons = read_members::<T, _>(r, depth, max_depth)?
                .into_iter()
                .map(|g| match g {
                    PgGeometry::Polygon(poly) => Ok(poly),
                    _ => Err(Error::GeomDecodeError),
                })
                .collect::<Result<Vec<_>>>()?;
            PgGeometry::MultiPolygon(PgMultiPolygon::new(polygons).with_measure(header.has_m))
        }
        7 => {
            let geoms = read_members::<T, _>(r, depth, max_depth)?;
            PgGeometry::GeometryCollection(
                PgGeometryCollection::new(geoms).with_measure(header.has_m),
            )
        }
        // curves, surfaces, TINs and the like
        other => return Err(Error::UnsupportedKind(format!("WKB type {}", other))),
    };
    Ok(match header.srid {
        Some(srid) => geom.with_srid(srid),
        None => geom,
    })
}

/// Encode a geometry. The root carries the SRID flag when its SRID is not 0.
pub fn write_ewkb(geom: &PgGeometry, w: &mut impl Write) -> Result<()> {
    let srid = Some(geom.srid()).filter(|&s| s != 0);
    let has_z = geom.dimension() == Dimension::XYZ;
    write_geometry(geom, w, has_z, geom.have_measure(), srid)
}

// members are written with the dimensions of their root, PostGIS rejects mixed dimensions
fn write_geometry<W: Write>(
    geom: &PgGeometry,
    w: &mut W,
    has_z: bool,
    has_m: bool,
    srid: Option<i32>,
) -> Result<()> {
    GeomHeader::write(w, wkb_code(geom.kind()), has_z, has_m, srid)?;
    match geom {
        PgGeometry::Point(p) => write_point(p, w, has_z, has_m),
        PgGeometry::LineString(ls) => write_points(ls.points(), w, has_z, has_m),
        PgGeometry::LinearRing(lr) => write_points(lr.points(), w, has_z, has_m),
        PgGeometry::Polygon(poly) => write_polygon(poly, w, has_z, has_m),
        PgGeometry::MultiPoint(mp) => {
            w.write_u32::<LittleEndian>(mp.points().len() as u32)?;
            for p in mp.points() {
                GeomHeader::write(w, 1, has_z, has_m, None)?;
                write_point(p, w, has_z, has_m)?;
            }
            Ok(())
        }
        PgGeometry::MultiLineString(mls) => {
            w.write_u32::<LittleEndian>(mls.lines().len() as u32)?;
            for ls in mls.lines() {
                GeomHeader::write(w, 2, has_z, has_m, None)?;
                write_points(ls.points(), w, has_z, has_m)?;
            }
            Ok(())
        }
        PgGeometry::MultiPolygon(mp) => {
            w.write_u32::<LittleEndian>(mp.polygons().len() as u32)?;
            for poly in mp.polygons() {
                GeomHeader::write(w, 3, has_z, has_m, None)?;
                write_polygon(poly, w, has_z, has_m)?;
            }
            Ok(())
        }
        PgGeometry::GeometryCollection(gc) => {
            w.write_u32::<LittleEndian>(gc.geometries().len() as u32)?;
            for g in gc.geometries() {
                write_geometry(g, w, has_z, has_m, None)?;
            }
            Ok(())
        }
    }
}

// ordinates missing from a point are written as 0 when the header promises them
fn write_point<W: Write>(p: &PgPoint, w: &mut W, has_z: bool, has_m: bool) -> Result<()> {
    w.write_f64::<LittleEndian>(p.x)?;
    w.write_f64::<LittleEndian>(p.y)?;
    if has_z {
        w.write_f64::<LittleEndian>(p.z.unwrap_or(0.0))?;
    }
    if has_m {
        w.write_f64::<LittleEndian>(p.m.unwrap_or(0.0))?;
    }
    Ok(())
}

fn write_points<W: Write>(points: &[PgPoint], w: &mut W, has_z: bool, has_m: bool) -> Result<()> {
    w.write_u32::<LittleEndian>(points.len() as u32)?;
    for p in points {
        write_point(p, w, has_z, has_m)?;
    }
    Ok(())
}

fn write_polygon<W: Write>(poly: &PgPolygon, w: &mut W, has_z: bool, has_m: bool) -> Result<()> {
    w.write_u32::<LittleEndian>(poly.rings().len() as u32)?;
    for ring in poly.rings() {
        write_points(ring.points(), w, has_z, has_m)?;
    }
    Ok(())
}

/// Encode as upper case hex, the text form PostGIS returns for geometry columns
pub fn to_hex_ewkb(geom: &PgGeometry) -> Result<String> {
    let mut buf: Vec<u8> = Vec::new();
    write_ewkb(geom, &mut buf)?;
    Ok(hex::encode_upper(buf))
}

pub fn from_hex_ewkb(text: &str) -> Result<PgGeometry> {
    from_hex_ewkb_with_limit(text, DEFAULT_MAX_DEPTH)
}

pub fn from_hex_ewkb_with_limit(text: &str, max_depth: usize) -> Result<PgGeometry> {
    let bytes = hex::decode(text.trim()).map_err(|e| Error::MalformedValue(e.to_string()))?;
    let mut cursor = Cursor::new(bytes);
    read_ewkb_with_limit(&mut cursor, max_depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn square(offset: f64, size: f64) -> PgLinearRing {
        PgLinearRing::new(vec![
            PgPoint::new(offset, offset),
            PgPoint::new(offset + size, offset),
            PgPoint::new(offset + size, offset + size),
            PgPoint::new(offset, offset + size),
            PgPoint::new(offset, offset),
        ])
    }

    #[test]
    fn read_geography_point() {
        let geom = from_hex_ewkb("0101000020E6100000304CA60A460D4140BE9F1A2FDD0C4E40").unwrap();
        assert_eq!(geom.srid(), 4326);
        match geom {
            PgGeometry::Point(p) => {
                assert_abs_diff_eq!(p.x, 34.1037, epsilon = 1e-4);
                assert_abs_diff_eq!(p.y, 60.1005, epsilon = 1e-4);
                assert_eq!(p.dimension(), Dimension::XY);
                assert!(!p.have_measure());
            }
            other => panic!("expected a point, got {:?}", other),
        }
    }

    #[test]
    fn write_point_hex() {
        // 'POINT (10 -20)'
        let point = PgGeometry::Point(PgPoint::new(10.0, -20.0));
        assert_eq!(to_hex_ewkb(&point).unwrap(), "0101000000000000000000244000000000000034C0");

        // 'POINT (10 -20 100)'
        let point = PgGeometry::Point(PgPoint::new_3d(10.0, -20.0, 100.0));
        assert_eq!(
            to_hex_ewkb(&point).unwrap(),
            "0101000080000000000000244000000000000034C00000000000005940"
        );

        // 'POINTM (10 -20 1)'
        let point = PgGeometry::Point(PgPoint::new(10.0, -20.0).with_m(Some(1.0)));
        assert_eq!(
            to_hex_ewkb(&point).unwrap(),
            "0101000040000000000000244000000000000034C0000000000000F03F"
        );

        // 'SRID=4326;POINT (10 -20)'
        let point = PgGeometry::Point(PgPoint::new(10.0, -20.0).with_srid(4326));
        assert_eq!(
            to_hex_ewkb(&point).unwrap(),
            "0101000020E6100000000000000000244000000000000034C0"
        );
    }

    #[test]
    fn read_big_endian_polygon() {
        let mut be_buf = Vec::new();
        be_buf.write_u8(0).unwrap();
        be_buf.write_u32::<BigEndian>(3 | SRID_FLAG).unwrap();
        be_buf.write_i32::<BigEndian>(3857).unwrap();
        // number of rings
        be_buf.write_u32::<BigEndian>(2).unwrap();
        for (offset, size) in [(0.0, 10.0), (2.0, 1.0)] {
            let ring = square(offset, size);
            be_buf.write_u32::<BigEndian>(ring.points().len() as u32).unwrap();
            for p in ring.points() {
                be_buf.write_f64::<BigEndian>(p.x).unwrap();
                be_buf.write_f64::<BigEndian>(p.y).unwrap();
            }
        }

        let geom = read_ewkb(&mut Cursor::new(be_buf)).unwrap();
        let expected = PgGeometry::Polygon(
            PgPolygon::new(vec![square(0.0, 10.0), square(2.0, 1.0)]).with_srid(3857),
        );
        assert_eq!(geom, expected);
    }

    #[test]
    fn iso_type_codes() {
        let mut le_buf = Vec::new();
        le_buf.write_u8(1).unwrap();
        le_buf.write_u32::<LittleEndian>(3001).unwrap();
        for v in [1.0, 2.0, 3.0, 4.0] {
            le_buf.write_f64::<LittleEndian>(v).unwrap();
        }
        let geom = read_ewkb(&mut Cursor::new(le_buf)).unwrap();
        assert_eq!(
            geom,
            PgGeometry::Point(PgPoint::new_3d(1.0, 2.0, 3.0).with_m(Some(4.0)))
        );
    }

    #[test]
    fn unknown_type_is_unsupported() {
        // CIRCULARSTRING
        let mut le_buf = Vec::new();
        le_buf.write_u8(1).unwrap();
        le_buf.write_u32::<LittleEndian>(8).unwrap();
        le_buf.write_u32::<LittleEndian>(0).unwrap();
        match read_ewkb(&mut Cursor::new(le_buf)) {
            Err(Error::UnsupportedKind(name)) => assert_eq!(name, "WKB type 8"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn malformed_input() {
        assert!(matches!(from_hex_ewkb("0201"), Err(Error::GeomDecodeError)));
        assert!(matches!(from_hex_ewkb("010"), Err(Error::MalformedValue(_))));
        assert!(matches!(from_hex_ewkb("01ZZ"), Err(Error::MalformedValue(_))));
        // surrounding whitespace is tolerated, lower case digits too
        assert!(from_hex_ewkb(" 0101000000000000000000f03f0000000000000040\n").is_ok());
        // truncated after the type word
        assert!(matches!(from_hex_ewkb("0101000000"), Err(Error::Io(_))));
    }

    #[test]
    fn multi_point_rejects_other_members() {
        let mut le_buf = Vec::new();
        le_buf.write_u8(1).unwrap();
        le_buf.write_u32::<LittleEndian>(4).unwrap();
        le_buf.write_u32::<LittleEndian>(1).unwrap();
        le_buf.write_u8(1).unwrap();
        le_buf.write_u32::<LittleEndian>(2).unwrap();
        le_buf.write_u32::<LittleEndian>(0).unwrap();
        assert!(matches!(
            read_ewkb(&mut Cursor::new(le_buf)),
            Err(Error::GeomDecodeError)
        ));
    }

    #[test]
    fn nested_collections_and_depth_limit() {
        let mut geom = PgGeometry::Point(PgPoint::new(1.0, 2.0));
        for _ in 0..5 {
            geom = PgGeometry::GeometryCollection(PgGeometryCollection::new(vec![geom]));
        }
        let geom = geom.with_srid(4326);
        let hex = to_hex_ewkb(&geom).unwrap();
        assert_eq!(from_hex_ewkb(&hex).unwrap(), geom);
        assert!(matches!(
            from_hex_ewkb_with_limit(&hex, 3),
            Err(Error::NestingTooDeep(3))
        ));
    }

    #[test]
    fn measure_flag_fills_missing_ordinates() {
        let ls = PgGeometry::LineString(
            PgLineString::new(vec![PgPoint::new(0.0, 0.0), PgPoint::new(1.0, 1.0)])
                .with_measure(true),
        );
        let mut buf = Vec::new();
        write_ewkb(&ls, &mut buf).unwrap();
        // header, count, two points of three ordinates
        assert_eq!(buf.len(), 1 + 4 + 4 + 2 * 3 * 8);

        let back = read_ewkb(&mut Cursor::new(buf)).unwrap();
        match back {
            PgGeometry::LineString(ls) => {
                assert!(ls.have_measure());
                assert!(ls.points().iter().all(|p| p.m == Some(0.0)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn linear_ring_written_as_line_string() {
        let ring = PgGeometry::LinearRing(square(0.0, 1.0));
        let back = from_hex_ewkb(&to_hex_ewkb(&ring).unwrap()).unwrap();
        assert_eq!(back.kind(), PgGeometryKind::LineString);
    }

    #[test]
    fn multi_geometries_round_trip() {
        let mp = PgGeometry::MultiPolygon(
            PgMultiPolygon::new(vec![
                PgPolygon::new(vec![square(0.0, 4.0), square(1.0, 1.0)]),
                PgPolygon::new(vec![square(10.0, 2.0)]),
            ])
            .with_srid(2056),
        );
        assert_eq!(from_hex_ewkb(&to_hex_ewkb(&mp).unwrap()).unwrap(), mp);

        let mls = PgGeometry::MultiLineString(PgMultiLineString::new(vec![
            PgLineString::new(vec![PgPoint::new_3d(0.0, 0.0, 1.0), PgPoint::new_3d(1.0, 1.0, 2.0)]),
            PgLineString::new(vec![]),
        ]));
        assert_eq!(from_hex_ewkb(&to_hex_ewkb(&mls).unwrap()).unwrap(), mls);
    }
}
