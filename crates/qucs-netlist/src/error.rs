use std::path::PathBuf;

use qucs_core::{FileProviderError, ResolveError};

#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    /// `port` counts from 1.
    #[error("port {port} of '{instance}' is not connected")]
    UnconnectedPort { instance: String, port: usize },

    #[error("'{instance}' has no definition")]
    Unresolved {
        instance: String,
        #[source]
        source: ResolveError,
    },

    #[error("'{instance}' is a primitive {record_type} component")]
    Primitive {
        instance: String,
        record_type: String,
    },

    #[error("'{type_name}' has no {section} section")]
    MissingModel { type_name: String, section: String },

    #[error("cannot read include file {}", path.display())]
    Include {
        path: PathBuf,
        #[source]
        source: FileProviderError,
    },

    #[error("failed to write netlist")]
    Write(#[from] std::io::Error),
}
