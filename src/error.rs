//! Errores de compilación y su presentación.
//!
//! Cada fase define su propio tipo de error. [`CompileError`] los reúne
//! junto con su ubicación original, y [`Diagnostics`] los presenta al
//! estilo de rustc: ubicación, línea afectada y subrayado.

use std::{
    error::Error,
    fmt::{self, Display},
};

use crate::{
    codegen::CodeGenError,
    lex::LexError,
    parse::{ParserError, SyntaxError},
    source::{Located, Location},
    table::LookupError,
};

/// Primer error encontrado al compilar un programa.
#[derive(thiserror::Error, Debug, Clone)]
pub enum CompileError {
    #[error("{0}")]
    Lex(Located<LexError>),

    #[error("{0}")]
    Syntax(Located<SyntaxError>),

    #[error("{0}")]
    UnknownSensorMethod(Located<LookupError>),

    #[error("{0}")]
    UnknownActuatorMethod(Located<LookupError>),

    #[error("{0}")]
    CodeGen(Located<CodeGenError>),
}

impl CompileError {
    /// Ubicación del error en el código fuente.
    pub fn location(&self) -> &Location {
        match self {
            CompileError::Lex(error) => error.location(),
            CompileError::Syntax(error) => error.location(),
            CompileError::UnknownSensorMethod(error) => error.location(),
            CompileError::UnknownActuatorMethod(error) => error.location(),
            CompileError::CodeGen(error) => error.location(),
        }
    }

    fn inner(&self) -> &(dyn Error + Send + Sync + 'static) {
        match self {
            CompileError::Lex(error) => error.val(),
            CompileError::Syntax(error) => error.val(),
            CompileError::UnknownSensorMethod(error) => error.val(),
            CompileError::UnknownActuatorMethod(error) => error.val(),
            CompileError::CodeGen(error) => error.val(),
        }
    }
}

impl From<Located<LexError>> for CompileError {
    fn from(error: Located<LexError>) -> Self {
        CompileError::Lex(error)
    }
}

impl From<Located<ParserError>> for CompileError {
    fn from(error: Located<ParserError>) -> Self {
        let (location, error) = error.split();

        match error {
            ParserError::Syntax(error) => CompileError::Syntax(Located::at(error, location)),
            ParserError::Lookup(error) => lookup(error, location),
        }
    }
}

impl From<Located<CodeGenError>> for CompileError {
    fn from(error: Located<CodeGenError>) -> Self {
        let (location, error) = error.split();

        match error {
            CodeGenError::Lookup(error) => lookup(error, location),
            error => CompileError::CodeGen(Located::at(error, location)),
        }
    }
}

// Un fallo de búsqueda se reporta según la tabla, sin importar la fase
fn lookup(error: LookupError, location: Location) -> CompileError {
    match error {
        LookupError::UnknownSensorMethod { .. } => {
            CompileError::UnknownSensorMethod(Located::at(error, location))
        }

        LookupError::UnknownActuatorMethod { .. } => {
            CompileError::UnknownActuatorMethod(Located::at(error, location))
        }
    }
}

mod sealed {
    pub trait Sealed {}
}

pub trait LocatedError: sealed::Sealed {
    fn source(&self) -> &dyn Error;
    fn location(&self) -> &Location;
}

/// Presentación de un error para la terminal.
pub struct Diagnostics {
    errors: Vec<Box<dyn 'static + LocatedError + Send + Sync>>,
}

impl<E: 'static + LocatedError + Send + Sync> From<E> for Diagnostics {
    fn from(error: E) -> Self {
        Diagnostics {
            errors: vec![Box::new(error)],
        }
    }
}

impl Display for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Diagnostics { errors } = self;

        for error in errors {
            writeln!(fmt, "error: {}", error.source())?;

            let location = error.location();
            writeln!(fmt, " --> {}", location)?;

            let digits = location.end().line().to_string().chars().count();
            writeln!(fmt, "{:digits$} |", "", digits = digits)?;

            for line_number in location.start().line()..=location.end().line() {
                location.source().with_line(line_number, |line| {
                    writeln!(fmt, "{:>digits$} | {}", line_number, line, digits = digits)
                })?
            }

            // El final de una ubicación es exclusivo
            let from = location.start().column();
            let to = location.end().column().saturating_sub(1).max(1);
            let min = from.min(to);
            let max = from.max(to);

            let skip = (min - 1) as usize;
            let highlight = (max - min + 1) as usize;

            writeln!(
                fmt,
                "{:digits$} | {:skip$}{:^<highlight$}",
                "",
                "",
                "",
                digits = digits,
                skip = skip,
                highlight = highlight
            )?;

            writeln!(fmt)?;
        }

        let error_or_errors = if errors.len() == 1 { "error" } else { "errors" };
        writeln!(
            fmt,
            "Build failed with {} {}",
            errors.len(),
            error_or_errors
        )
    }
}

impl<E: Error> sealed::Sealed for Located<E> {}

impl<E: Error> LocatedError for Located<E> {
    fn source(&self) -> &dyn Error {
        self.as_ref()
    }

    fn location(&self) -> &Location {
        Located::location(self)
    }
}

impl sealed::Sealed for CompileError {}

impl LocatedError for CompileError {
    fn source(&self) -> &dyn Error {
        self.inner()
    }

    fn location(&self) -> &Location {
        CompileError::location(self)
    }
}
