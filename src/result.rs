/// The result returned by many methods within the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Can't convert a null value to a geometry")]
    InvalidInput,
    #[error("Can't convert an interchange value of type {0}")]
    UnrecognizedInterchangeShape(String),
    #[error("Conversion of {0} is not supported")]
    UnsupportedKind(String),
    #[error("Malformed interchange value: {0}")]
    MalformedValue(String),
    #[error("Error decoding EWKB geometry")]
    GeomDecodeError,
    #[error("Geometry nesting exceeds the limit of {0} levels")]
    NestingTooDeep(usize),
    #[error("I/O error while reading or writing EWKB")]
    Io(#[from] std::io::Error),
    #[error("Error when accessing the SQLite database")]
    SQLiteError(#[from] rusqlite::Error),
}
