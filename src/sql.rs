//! rusqlite bindings, so geometries can be stored in and read from SQLite columns.
//!
//! Values are written as hex EWKB text, the same payload PostGIS uses for its text output.
//! Reads accept that text form as well as raw EWKB blobs.

use crate::ewkb;
use crate::result::{Error, Result};
use crate::source::Geometry;
use crate::types::PgGeometry;
use crate::GeometryConverter;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use std::io::Cursor;

fn decode_native(value: ValueRef<'_>) -> Result<PgGeometry> {
    match value {
        ValueRef::Text(text) => {
            let text = std::str::from_utf8(text)
                .map_err(|_| Error::MalformedValue("EWKB text is not UTF-8".to_owned()))?;
            ewkb::from_hex_ewkb(text)
        }
        ValueRef::Blob(blob) => ewkb::read_ewkb(&mut Cursor::new(blob)),
        _ => Err(Error::InvalidInput),
    }
}

fn encode_native(geom: &PgGeometry) -> Result<String> {
    ewkb::to_hex_ewkb(geom)
}

fn decode_source(value: ValueRef<'_>) -> Result<Geometry> {
    let converter = GeometryConverter::default();
    converter.native_to_source(&decode_native(value)?)
}

fn encode_source(geom: &Geometry) -> Result<String> {
    let converter = GeometryConverter::default();
    encode_native(&converter.to_native(geom)?)
}

// the to/from sql impls only differ in the conversion functions
macro_rules! impl_sql_ewkb {
    ($($t:ty => $encode:ident, $decode:ident);* $(;)?) => {
       $(
            impl ToSql for $t {
                #[inline]
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    let hex = $encode(self)
                        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                    Ok(ToSqlOutput::from(hex))
                }
            }

            impl FromSql for $t {
                #[inline]
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    match value {
                        ValueRef::Text(_) | ValueRef::Blob(_) => {
                            $decode(value).map_err(|e| FromSqlError::Other(Box::new(e)))
                        }
                        _ => Err(FromSqlError::InvalidType),
                    }
                }
            }
       )*
    };
}

impl_sql_ewkb! {
    PgGeometry => encode_native, decode_native;
    Geometry => encode_source, decode_source;
}
