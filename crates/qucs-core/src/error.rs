use std::path::PathBuf;

use qucs_format::FormatError;

use crate::FileProviderError;

/// Failure to resolve a component type to its prototype.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("cannot locate '{reference}'")]
    NotFound { reference: String },

    #[error("{}: {source}", path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: FormatError,
    },

    #[error("circular definition of '{type_name}' ({})", chain.join(" -> "))]
    CyclicDefinition {
        type_name: String,
        /// Type names being resolved, outermost first, ending with the repeat.
        chain: Vec<String>,
    },

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: FileProviderError,
    },
}

/// The failure taxonomy, flattened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    FormatMismatch,
    VersionTooNew,
    MalformedVersion,
    MalformedLine,
    UnterminatedSection,
    ComponentNotFound,
    SectionNotFound,
    CyclicDefinition,
    Io,
}

impl ResolveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::NotFound { .. } => ErrorKind::NotFound,
            ResolveError::CyclicDefinition { .. } => ErrorKind::CyclicDefinition,
            ResolveError::Io { .. } => ErrorKind::Io,
            ResolveError::Format { source, .. } => match source {
                FormatError::FormatMismatch { .. } => ErrorKind::FormatMismatch,
                FormatError::VersionTooNew { .. } => ErrorKind::VersionTooNew,
                FormatError::MalformedVersion(_) => ErrorKind::MalformedVersion,
                FormatError::MalformedLine { .. } => ErrorKind::MalformedLine,
                FormatError::UnterminatedSection { .. } => ErrorKind::UnterminatedSection,
                FormatError::SectionNotFound { .. } => ErrorKind::SectionNotFound,
                FormatError::ComponentNotFound { .. } => ErrorKind::ComponentNotFound,
            },
        }
    }

    /// Wrap a provider error for `path`; a missing file becomes `NotFound`.
    pub(crate) fn read(path: PathBuf, source: FileProviderError) -> Self {
        match source {
            FileProviderError::NotFound(_) => ResolveError::NotFound {
                reference: path.display().to_string(),
            },
            source => ResolveError::Io { path, source },
        }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, source: FormatError) -> Self {
        ResolveError::Format {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qucs_format::VersionTriplet;

    #[test]
    fn test_kind_flattens_format_errors() {
        let err = ResolveError::format(
            "/lib/x.lib",
            FormatError::VersionTooNew {
                declared: VersionTriplet::new(2, 0, 0),
                running: VersionTriplet::new(0, 1, 0),
            },
        );
        assert_eq!(err.kind(), ErrorKind::VersionTooNew);
        assert_eq!(
            err.to_string(),
            "/lib/x.lib: document version 2.0.0 is newer than the supported version 0.1.0"
        );
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = ResolveError::read(
            PathBuf::from("/p/a.sch"),
            FileProviderError::NotFound(PathBuf::from("/p/a.sch")),
        );
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = ResolveError::read(
            PathBuf::from("/p/a.sch"),
            FileProviderError::PermissionDenied(PathBuf::from("/p/a.sch")),
        );
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_cycle_message() {
        let err = ResolveError::CyclicDefinition {
            type_name: "Sub:a".into(),
            chain: vec!["Sub:a".into(), "Sub:b".into(), "Sub:a".into()],
        };
        assert_eq!(
            err.to_string(),
            "circular definition of 'Sub:a' (Sub:a -> Sub:b -> Sub:a)"
        );
    }
}
