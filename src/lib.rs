//! Converts geometries between the values a PostGIS driver exchanges and an immutable geometry
//! tree that carries z, m and an SRID.
//!
//! ```ignore
//! let converter = GeometryConverter::default();
//! let value = PgObject::new("geometry", "0101000020E6100000304CA60A460D4140BE9F1A2FDD0C4E40");
//! let point = converter.from_sql(Some(&value))?.unwrap();
//! assert_eq!(point.srid(), 4326);
//! ```
pub mod config;
pub mod convert;
pub mod ewkb;
pub mod interchange;
pub mod result;
pub mod source;
mod sql;
pub mod types;

use crate::convert::{box_to_polygon, ToNative, ToSource};
use crate::source::Geometry;
use crate::types::PgGeometry;

pub use crate::config::{ConverterConfig, PrecisionModel};
pub use crate::interchange::{NativeValue, PgObject};
pub use crate::result::{Error, Result};

/// Converts between driver values and [Geometry] trees, in both directions.
///
/// The converter holds no state besides its configuration and can be shared between threads.
#[derive(Debug, Clone, Default)]
pub struct GeometryConverter {
    config: ConverterConfig,
}

impl GeometryConverter {
    pub fn new(config: ConverterConfig) -> Self {
        GeometryConverter { config }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Read a column value. SQL `NULL` (no object at all) gives `None`.
    pub fn from_sql(&self, value: Option<&PgObject>) -> Result<Option<Geometry>> {
        value.map(|obj| self.object_to_source(obj)).transpose()
    }

    /// Produce a column value, `None` stays `None`.
    pub fn to_sql(&self, geom: Option<&Geometry>) -> Result<Option<PgObject>> {
        geom.map(|g| self.to_object(g)).transpose()
    }

    /// Parse a tagged driver value and convert it.
    ///
    /// Fails with [Error::InvalidInput] when the object has no payload and with
    /// [Error::UnrecognizedInterchangeShape] when its type is neither a geometry nor a box.
    pub fn object_to_source(&self, obj: &PgObject) -> Result<Geometry> {
        let value = obj.parse_with_limit(self.config.max_depth)?;
        self.to_source(&value)
    }

    pub fn to_source(&self, value: &NativeValue) -> Result<Geometry> {
        match value {
            NativeValue::Geometry(geom) => self.native_to_source(geom),
            NativeValue::Box(b) => {
                tracing::debug!(srid = b.srid(), kind = b.kind.type_name(), "converting box");
                Ok(box_to_polygon(b, self.config.precision))
            }
        }
    }

    pub fn native_to_source(&self, geom: &PgGeometry) -> Result<Geometry> {
        tracing::debug!(srid = geom.srid(), kind = ?geom.kind(), "converting native geometry");
        ToSource::new(&self.config).convert(geom)
    }

    pub fn to_native(&self, geom: &Geometry) -> Result<PgGeometry> {
        tracing::debug!(
            srid = geom.srid(),
            kind = geom.geometry_type(),
            "converting geometry to native"
        );
        ToNative::new(&self.config).convert(geom)
    }

    /// Convert and encode as a `geometry` value with a hex EWKB payload.
    pub fn to_object(&self, geom: &Geometry) -> Result<PgObject> {
        let native = self.to_native(geom)?;
        tracing::trace!(ewkt = %native, "encoding");
        PgObject::from_geometry(&native)
    }
}
