//! Rastreo de ubicaciones originales en código fuente.
//!
//! Los distintos objetos internos que el compilador construye
//! deben llevar cuenta de posiciones o rangos de ubicaciones en
//! el código fuente original, lo cual permite determinar un punto
//! exacto o aproximado en donde ocurre un error, sin importar la
//! fase del compilador que lo detecte.
//!
//! El texto fuente se comparte por medio de [`Arc`]. Los errores
//! de compilación conservan una referencia al mismo para poder
//! mostrar la línea afectada, y deben poder cruzar hilos.

use std::{
    fmt::{self, Debug, Display, Formatter},
    ops::Range,
    sync::Arc,
};

/// Ancho de los divisores de tabulador.
const TAB_STOP: u32 = 4;

/// Un objeto cualquiera con una posición original asociada.
#[derive(Debug, Clone)]
pub struct Located<T> {
    location: Location,
    value: T,
}

impl<T> Located<T> {
    /// Obtiene el valor.
    pub fn val(&self) -> &T {
        &self.value
    }

    /// Obtiene la ubicación.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Descarta la ubicación y toma ownership del valor.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Descompone y toma ownership de las dos partes.
    pub fn split(self) -> (Location, T) {
        (self.location, self.value)
    }

    /// Construye a partir de un valor y una ubicación.
    pub fn at(value: T, location: Location) -> Self {
        Located { value, location }
    }

    /// Transforma el valor con la misma ubicación.
    pub fn map<U, F>(self, map: F) -> Located<U>
    where
        F: FnOnce(T) -> U,
    {
        Located {
            value: map(self.value),
            location: self.location,
        }
    }
}

impl<T> AsRef<T> for Located<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

impl<T: Display> Display for Located<T> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.value, formatter)
    }
}

/// Una ubicación está conformada por un origen y un rango de posiciones.
///
/// El final del rango es exclusivo.
#[derive(Clone)]
pub struct Location {
    from: Arc<Source>,
    position: Range<Position>,
}

impl Location {
    /// Construye una ubicación dentro de un origen.
    pub fn new(from: &Arc<Source>, position: Range<Position>) -> Self {
        Location {
            from: Arc::clone(from),
            position,
        }
    }

    /// Ubicación del primer carácter de un origen.
    pub fn start_of(from: &Arc<Source>) -> Self {
        let start = Position::default();
        Location::new(from, start..start.advance())
    }

    /// Unifica un rango de ubicaciones. Se asume el mismo origen.
    pub fn span(from: Location, to: &Location) -> Self {
        Location {
            from: from.from,
            position: from.position.start..to.position.end,
        }
    }

    /// Obtiene la posición de inicio.
    pub fn start(&self) -> Position {
        self.position.start
    }

    /// Obtiene la posición de fin.
    pub fn end(&self) -> Position {
        self.position.end
    }

    /// Obtiene el origen.
    pub fn source(&self) -> &Source {
        &self.from
    }
}

impl Display for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:", self.from.name)?;

        let Range { start, end } = self.position;
        if end == start.advance() || end == start {
            // Solo se señala una columna en específico
            write!(formatter, "{}", start)
        } else {
            write!(formatter, "[{}-{}]", start, end.back())
        }
    }
}

impl Debug for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, formatter)
    }
}

/// Una posición línea-columna en un archivo.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Position {
    line: u32,
    column: u32,
}

impl Position {
    /// Obtiene el número de línea.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Obtiene el número de columna.
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Incrementa el número de columna.
    pub fn advance(self) -> Position {
        Position {
            line: self.line,
            column: self.column + 1,
        }
    }

    /// Decrementa el número de columna, sin pasar de la primera.
    pub fn back(self) -> Position {
        Position {
            line: self.line,
            column: self.column.saturating_sub(1).max(1),
        }
    }

    /// Incrementa el número de línea y retorna a la columna 1.
    pub fn newline(self) -> Position {
        Position {
            line: self.line + 1,
            column: 1,
        }
    }

    /// Ajusta la posición a la siguiente columna de tabulador.
    pub fn tab(self) -> Position {
        let column = 1 + ((self.column - 1) / TAB_STOP + 1) * TAB_STOP;
        Position {
            line: self.line,
            column,
        }
    }

    /// Posición que sigue a un carácter dado.
    pub fn after(self, c: char) -> Position {
        match c {
            '\n' => self.newline(),
            '\t' => self.tab(),
            _ => self.advance(),
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position { line: 1, column: 1 }
    }
}

impl Display for Position {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.line, self.column)
    }
}

/// Nombre de origen y texto completo de un programa.
pub struct Source {
    name: String,
    text: String,
}

impl Source {
    /// Crea un origen compartido a partir de un nombre y su texto.
    pub fn new<N, T>(name: N, text: T) -> Arc<Self>
    where
        N: Into<String>,
        T: Into<String>,
    {
        Arc::new(Source {
            name: name.into(),
            text: text.into(),
        })
    }

    /// Nombre del origen, usualmente una ruta.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Texto completo.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Invoca `f` sobre la línea indicada (contando desde 1), o sobre
    /// una línea vacía si no existe.
    pub fn with_line<F, R>(&self, line_number: u32, f: F) -> R
    where
        F: FnOnce(&str) -> R,
    {
        let line = self
            .text
            .lines()
            .nth(line_number.saturating_sub(1) as usize)
            .unwrap_or("");

        f(line)
    }
}

impl Debug for Source {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.debug_tuple("Source").field(&self.name).finish()
    }
}
