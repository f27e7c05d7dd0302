//! Error types for the `graphsim-world` crate.
//!
//! Every failure while building a [`World`](crate::World) is a
//! [`LoadError`]. Load errors are fatal: the simulation refuses to start on
//! bad reference data.

/// Errors that can occur while loading reference data into a world.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// A required reference file was not supplied.
    #[error("missing required reference file: {file}")]
    MissingFile {
        /// Logical file name, e.g. `cities.csv`.
        file: String,
    },

    /// A reference file could not be parsed as CSV.
    #[error("malformed reference file {file}: {source}")]
    Malformed {
        /// Logical file name.
        file: String,
        /// The underlying CSV error.
        source: csv::Error,
    },

    /// A record references a parent entity that does not exist.
    #[error("{file}: {name} references unknown {kind} {reference}")]
    UnknownReference {
        /// Logical file name holding the record.
        file: String,
        /// Name of the record doing the referencing.
        name: String,
        /// Kind of entity being referenced (`continent`, `country`).
        kind: &'static str,
        /// The unresolved reference.
        reference: String,
    },

    /// Two entities of the same kind share a name.
    #[error("duplicate {kind} name: {name}")]
    Duplicate {
        /// Kind of entity (`continent`, `country`, `city`).
        kind: &'static str,
        /// The duplicated name.
        name: String,
    },

    /// A name pool file contained no entries.
    #[error("reference file {file} contains no entries")]
    EmptyPool {
        /// Logical file name.
        file: String,
    },

    /// The scale factor must be a positive integer.
    #[error("scale factor must be at least 1")]
    InvalidScaleFactor,

    /// Reading a reference file from disk failed.
    #[error("failed to read reference file {path}: {source}")]
    Io {
        /// Path that could not be read.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
