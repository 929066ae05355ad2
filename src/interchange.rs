//! The tagged values exchanged with the database driver.

use crate::ewkb;
use crate::result::{Error, Result};
use crate::types::{BoxKind, PgBox, PgGeometry, PgPoint};
use std::str::FromStr;

/// A value as the driver returns it for a non-builtin column type: the SQL type name and the
/// textual payload, absent for SQL `NULL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgObject {
    pub type_name: String,
    pub value: Option<String>,
}

/// What a [PgObject] holds once parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Geometry(PgGeometry),
    Box(PgBox),
}

impl PgObject {
    pub fn new(type_name: impl Into<String>, value: impl Into<String>) -> Self {
        PgObject {
            type_name: type_name.into(),
            value: Some(value.into()),
        }
    }

    /// A `geometry` value holding the hex EWKB of `geom`
    pub fn from_geometry(geom: &PgGeometry) -> Result<Self> {
        Ok(PgObject::new("geometry", ewkb::to_hex_ewkb(geom)?))
    }

    pub fn parse(&self) -> Result<NativeValue> {
        self.parse_with_limit(crate::config::DEFAULT_MAX_DEPTH)
    }

    pub fn parse_with_limit(&self, max_depth: usize) -> Result<NativeValue> {
        let value = self.value.as_deref().ok_or(Error::InvalidInput)?;
        let tag = self.type_name.to_ascii_lowercase();
        match tag.as_str() {
            "geometry" | "geography" => Ok(NativeValue::Geometry(ewkb::from_hex_ewkb_with_limit(
                value, max_depth,
            )?)),
            "box2d" | "box3d" => {
                let b: PgBox = value.parse()?;
                // the payload keyword has to agree with the column type
                if b.kind.type_name() != tag {
                    return Err(Error::MalformedValue(format!(
                        "{} value holds a {} payload",
                        tag,
                        b.kind.type_name()
                    )));
                }
                Ok(NativeValue::Box(b))
            }
            _ => Err(Error::UnrecognizedInterchangeShape(self.type_name.clone())),
        }
    }
}

// splits off an optional `SRID=4326;` prefix
fn split_srid(text: &str) -> Result<(i32, &str)> {
    let text = text.trim();
    match text.strip_prefix("SRID=") {
        Some(rest) => {
            let (srid, body) = rest
                .split_once(';')
                .ok_or_else(|| Error::MalformedValue(format!("missing ';' after SRID in {}", text)))?;
            let srid = srid
                .trim()
                .parse::<i32>()
                .map_err(|_| Error::MalformedValue(format!("invalid SRID in {}", text)))?;
            Ok((srid, body.trim()))
        }
        None => Ok((0, text)),
    }
}

fn parse_corner(text: &str, kind: BoxKind) -> Result<PgPoint> {
    let ordinates = text
        .split_whitespace()
        .map(f64::from_str)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| Error::MalformedValue(format!("invalid box corner '{}'", text)))?;
    match (kind, ordinates.as_slice()) {
        (BoxKind::Box2d, &[x, y]) => Ok(PgPoint::new(x, y)),
        (BoxKind::Box3d, &[x, y, z]) => Ok(PgPoint::new_3d(x, y, z)),
        _ => Err(Error::MalformedValue(format!(
            "expected {} ordinates in box corner '{}'",
            match kind {
                BoxKind::Box2d => 2,
                BoxKind::Box3d => 3,
            },
            text
        ))),
    }
}

/// Parses `BOX(1 2,3 4)` and `BOX3D(1 2 3,4 5 6)`, optionally prefixed with `SRID=<n>;`.
impl FromStr for PgBox {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (srid, body) = split_srid(s)?;
        // BOX3D has to be tried first, BOX is a prefix of it
        let (kind, rest) = if let Some(rest) = body.strip_prefix(BoxKind::Box3d.prefix()) {
            (BoxKind::Box3d, rest)
        } else if let Some(rest) = body.strip_prefix(BoxKind::Box2d.prefix()) {
            (BoxKind::Box2d, rest)
        } else {
            return Err(Error::MalformedValue(format!("not a box: {}", s)));
        };
        let inner = rest
            .trim()
            .strip_prefix('(')
            .and_then(|r| r.strip_suffix(')'))
            .ok_or_else(|| Error::MalformedValue(format!("unbalanced parentheses in {}", s)))?;
        let (ll, ur) = inner
            .split_once(',')
            .ok_or_else(|| Error::MalformedValue(format!("expected two corners in {}", s)))?;
        Ok(PgBox {
            kind,
            llb: parse_corner(ll, kind)?.with_srid(srid),
            urt: parse_corner(ur, kind)?,
        })
    }
}
