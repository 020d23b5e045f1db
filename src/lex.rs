//! Análisis léxico.
//!
//! # Tokenization
//! Esta es la primera fase del compilador. Descompone el texto de un
//! [`Source`] en unidades léxicas denominadas tokens. Los espacios
//! en blanco y los comentarios (`// ...` y `/* ... */`) se descartan
//! durante esta operación. Cada token emitido está asociado a una
//! ubicación en el código fuente original, lo cual permite rastrear
//! errores tanto en los mismos como en constructos más elevados de
//! fases posteriores.
//!
//! # Contenido de un token
//! Operadores, puntuación y palabras clave se identifican por el hecho de
//! lo que son y no incluyen lexemas. Los identificadores sí incluyen su
//! lexema original. Las constantes numéricas se resuelven a su valor,
//! conservando signo y parte fraccionaria; la fase de generación de código
//! decide si truncarlas.
//!
//! # Palabras clave
//! Las palabras clave no son una clase léxica aparte. Todo término se
//! escanea primero como identificador y luego se busca en una tabla fija.
//! Esto mantiene uniforme la gramática de cadenas de métodos como
//! `imu.getPitch()` o `color_sensor.is_object(RED)`. Los nombres de colores
//! y melodías se reconocen sin distinguir mayúsculas de minúsculas, el
//! resto de palabras clave sí las distingue.
//!
//! # Errores
//! El lexer se detiene en el primer error encontrado.

use crate::source::{Located, Location, Position, Source};
use std::{
    fmt::{self, Display},
    iter::Peekable,
    str::{Chars, FromStr},
    sync::Arc,
};

use thiserror::Error;

// Case-insensitive
pub use unicase::Ascii as NoCase;

/// Error de escaneo.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    /// Carácter desconocido o inesperado en el flujo de entrada.
    #[error("Bad character {0:?} in input stream")]
    BadChar(char),

    /// Se esperaba un carácter específico en esta posición.
    #[error("Expected {0:?}")]
    Expected(char),

    /// Un `-` que no antecede a una constante numérica.
    #[error("Expected digits after '-'")]
    DanglingSign,

    /// Una constante numérica que no se pudo interpretar.
    #[error("Malformed numeric literal `{0}`")]
    BadNumber(String),

    /// Fin de línea o de archivo dentro de una cadena.
    #[error("Unterminated string literal")]
    UnterminatedString,

    /// Fin de línea o de archivo dentro de un literal de carácter.
    #[error("Unterminated character literal")]
    UnterminatedChar,

    /// `''`
    #[error("Empty character literal")]
    EmptyChar,

    /// Fin de archivo dentro de `/* ... */`.
    #[error("Unterminated block comment")]
    UnterminatedComment,
}

/// Un identificador.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Identifier {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(&self.0)
    }
}

/// Objeto resultante del análisis léxico.
///
/// Un token contiene suficiente información para describir completamente
/// a una entidad léxica en el programa fuente.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identificador.
    Id(Identifier),

    /// Palabra clave.
    Keyword(Keyword),

    /// Literal numérico, con signo y parte fraccionaria.
    Number(f64),

    /// Literal de cadena.
    Text(String),

    /// Literal de carácter.
    Char(char),

    /// `=`
    Assign,

    /// `==`
    Equal,

    /// `!=`
    NotEqual,

    /// `<`
    Less,

    /// `<=`
    LessOrEqual,

    /// `>`
    Greater,

    /// `>=`
    GreaterOrEqual,

    /// `&&`
    And,

    /// `,`
    Comma,

    /// `.`
    Period,

    /// `;`
    Semicolon,

    /// `(`
    OpenParen,

    /// `{`
    OpenCurly,

    /// `)`
    CloseParen,

    /// `}`
    CloseCurly,
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Token::*;

        match self {
            Id(id) => write!(fmt, "identifier `{}`", id),
            Keyword(keyword) => write!(fmt, "keyword `{}`", keyword),
            Number(number) => write!(fmt, "literal `{}`", number),
            Text(text) => write!(fmt, "string {:?}", text),
            Char(c) => write!(fmt, "character {:?}", c),
            Assign => fmt.write_str("`=`"),
            Equal => fmt.write_str("`==`"),
            NotEqual => fmt.write_str("`!=`"),
            Less => fmt.write_str("`<`"),
            LessOrEqual => fmt.write_str("`<=`"),
            Greater => fmt.write_str("`>`"),
            GreaterOrEqual => fmt.write_str("`>=`"),
            And => fmt.write_str("`&&`"),
            Comma => fmt.write_str("`,`"),
            Period => fmt.write_str("`.`"),
            Semicolon => fmt.write_str("`;`"),
            OpenParen => fmt.write_str("`(`"),
            OpenCurly => fmt.write_str("`{`"),
            CloseParen => fmt.write_str("`)`"),
            CloseCurly => fmt.write_str("`}`"),
        }
    }
}

/// Una palabra clave.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Keyword {
    If,
    Else,
    Bool,
    Int,
    Float,
    True,
    False,
    Color(Color),
    Tune(Tune),
}

impl Display for Keyword {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Keyword::*;
        let string = match self {
            If    => "if",
            Else  => "else",
            Bool  => "bool",
            Int   => "int",
            Float => "float",
            True  => "true",
            False => "false",

            Color(color) => return Display::fmt(color, fmt),
            Tune(tune) => return Display::fmt(tune, fmt),
        };

        fmt.write_str(string)
    }
}

impl FromStr for Keyword {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        use Keyword::*;

        const KEYWORDS: &[(&str, Keyword)] = &[
            ("if",    If),
            ("else",  Else),
            ("bool",  Bool),
            ("int",   Int),
            ("float", Float),
            ("true",  True),
            ("false", False),
        ];

        KEYWORDS
            .iter()
            .find(|&&(name, _)| name == string)
            .map(|&(_, keyword)| keyword)
            .or_else(|| string.parse().ok().map(Color))
            .or_else(|| string.parse().ok().map(Tune))
            .ok_or(())
    }
}

/// Nombre de color literal, como en `all_leds.set_color(RED)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    Red,
    Green,
    Blue,
    Yellow,
    White,
    Black,
    Cyan,
    Magenta,
    Orange,
    Purple,
}

impl Color {
    const NAMES: &'static [(NoCase<&'static str>, Color)] = &[
        (NoCase::new("RED"),     Color::Red),
        (NoCase::new("GREEN"),   Color::Green),
        (NoCase::new("BLUE"),    Color::Blue),
        (NoCase::new("YELLOW"),  Color::Yellow),
        (NoCase::new("WHITE"),   Color::White),
        (NoCase::new("BLACK"),   Color::Black),
        (NoCase::new("CYAN"),    Color::Cyan),
        (NoCase::new("MAGENTA"), Color::Magenta),
        (NoCase::new("ORANGE"),  Color::Orange),
        (NoCase::new("PURPLE"),  Color::Purple),
    ];
}

impl FromStr for Color {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        lookup_name(Color::NAMES, string)
    }
}

impl Display for Color {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(reverse_name(Color::NAMES, *self))
    }
}

/// Nombre de melodía literal, como en `speaker.play_tune(HAPPY)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Tune {
    Beep,
    Happy,
    Sad,
    Alarm,
    Chime,
    Siren,
}

impl Tune {
    const NAMES: &'static [(NoCase<&'static str>, Tune)] = &[
        (NoCase::new("BEEP"),  Tune::Beep),
        (NoCase::new("HAPPY"), Tune::Happy),
        (NoCase::new("SAD"),   Tune::Sad),
        (NoCase::new("ALARM"), Tune::Alarm),
        (NoCase::new("CHIME"), Tune::Chime),
        (NoCase::new("SIREN"), Tune::Siren),
    ];
}

impl FromStr for Tune {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        lookup_name(Tune::NAMES, string)
    }
}

impl Display for Tune {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(reverse_name(Tune::NAMES, *self))
    }
}

fn lookup_name<T: Copy>(names: &[(NoCase<&'static str>, T)], string: &str) -> Result<T, ()> {
    names
        .iter()
        .find(|&&(name, _)| name == NoCase::new(string))
        .map(|&(_, value)| value)
        .ok_or(())
}

fn reverse_name<T: Copy + PartialEq>(names: &[(NoCase<&'static str>, T)], value: T) -> &'static str {
    names
        .iter()
        .find(|&&(_, other)| other == value)
        .map(|&(name, _)| name.into_inner())
        .unwrap_or("?")
}

/// Reduce un programa completo a tokens, fallando en el primer error.
pub fn tokenize(from: &Arc<Source>) -> Result<Vec<Located<Token>>, Located<LexError>> {
    let tokens = Lexer::new(from).collect::<Result<Vec<_>, _>>()?;
    log::debug!("{}: {} tokens", from.name(), tokens.len());

    Ok(tokens)
}

/// Máquina de estados para análisis léxico.
///
/// Un lexer puede encontrarse en uno de diversos estados. La
/// salida del lexer, así como su siguiente estado, se define
/// a partir de tanto su estado actual como el siguiente carácter
/// encontrado en el flujo de entrada.
pub struct Lexer<'a> {
    from: &'a Arc<Source>,
    chars: Peekable<Chars<'a>>,
    state: State,
    start: Position,
    next: Position,
}

/// Posibles estados del lexer.
enum State {
    /// Estado que ocurre antes de encontrar el inicio de un token.
    Start,

    /// Estado terminal luego de un error.
    Failed,

    /// Estado de completitud; siempre emite el token incluido,
    /// sin consumir la entrada actual, y pasa a [`State::Start`].
    Complete(Token),

    /// Se encontró `/`.
    ///
    /// Debería seguir otro `/` o un `*` para entrar en un comentario.
    Slash,

    /// Comentario de línea.
    ///
    /// Este estado vuelve a [`State::Start`] al encontrar `'\n'`.
    LineComment,

    /// Comentario de bloque. `star` indica si el último carácter fue `*`.
    BlockComment { star: bool },

    /// Constante numérica, acumulada como texto.
    Numeral(String),

    /// Primer carácter de un operador que puede extenderse con un segundo.
    Operator(char),

    /// Interior de una cadena.
    Quoted(String),

    /// Interior de un literal de carácter.
    CharQuote(Option<char>),

    /// Término que puede ser un identificador o una palabra clave.
    Word(String),
}

impl<'a> Lexer<'a> {
    /// Crea un lexer en estado inicial a partir de un origen.
    pub fn new(from: &'a Arc<Source>) -> Self {
        Lexer {
            from,
            chars: from.text().chars().peekable(),
            state: State::Start,
            start: Position::default(),
            next: Position::default(),
        }
    }

    /// Intenta construir un siguiente token.
    fn lex(&mut self) -> Result<Option<Token>, LexError> {
        use {State::*, Token::*};

        loop {
            let next_char = self.chars.peek().copied();

            // La posición de origen se mueve junto a la posición
            // siguiente siempre que no se haya encontrado una
            // frontera de token
            if let Start = self.state {
                self.start = self.next;
            }

            // Switch table principal, determina cambios de estado
            // y de salida del lexer a partir de combinaciones del
            // estado actual y el siguiente carácter
            match (&mut self.state, next_char) {
                (Failed, _) => return Ok(None),

                // Tokens triviales
                (Start, None) => return Ok(None),
                (Start, Some(',')) => self.state = Complete(Comma),
                (Start, Some('.')) => self.state = Complete(Period),
                (Start, Some(';')) => self.state = Complete(Semicolon),
                (Start, Some('(')) => self.state = Complete(OpenParen),
                (Start, Some('{')) => self.state = Complete(OpenCurly),
                (Start, Some(')')) => self.state = Complete(CloseParen),
                (Start, Some('}')) => self.state = Complete(CloseCurly),
                (Start, Some('/')) => self.state = Slash,
                (Start, Some('"')) => self.state = Quoted(String::new()),
                (Start, Some('\'')) => self.state = CharQuote(None),
                (Start, Some('-')) => self.state = Numeral(String::from("-")),

                (Start, Some(c @ ('=' | '!' | '<' | '>' | '&'))) => self.state = Operator(c),

                // Identificadores y palabras clave
                (Start, Some(c)) if c.is_ascii_alphabetic() || c == '_' => {
                    self.state = Word(c.to_string())
                }

                // Inicio de una constante numérica. No se consume el
                // dígito, ya que esta lógica ya está implementada en el
                // caso de acumulación de dígitos.
                (Start, Some(c)) if c.is_ascii_digit() => {
                    self.state = Numeral(String::new());
                    continue;
                }

                // Espacios en blanco y caracteres inesperados
                (Start, Some(c)) if c.is_whitespace() => (),
                (Start, Some(c)) => return Err(LexError::BadChar(c)),

                // Emisión retardada de tokens cualesquiera
                (Complete(token), _) => return Ok(Some(std::mem::replace(token, Comma))),

                // `/` siempre debería iniciar un comentario
                (Slash, Some('/')) => self.state = LineComment,
                (Slash, Some('*')) => self.state = BlockComment { star: false },
                (Slash, _) => return Err(LexError::Expected('/')),

                // Los comentarios de línea descartan la línea donde ocurren
                (LineComment, Some('\n') | None) => self.state = Start,
                (LineComment, Some(_)) => (),

                (BlockComment { .. }, None) => return Err(LexError::UnterminatedComment),
                (BlockComment { star: true }, Some('/')) => self.state = Start,
                (BlockComment { star }, Some(c)) => *star = c == '*',

                // Acumulación dígito por dígito de constantes numéricas
                (Numeral(digits), Some(c)) if c.is_ascii_digit() => digits.push(c),
                (Numeral(digits), Some('.')) if is_integral(digits.as_str()) => digits.push('.'),

                // Si sigue algo que no es un dígito, la constante ha terminado
                (Numeral(digits), _) => {
                    let digits = std::mem::take(digits);
                    if digits == "-" {
                        return Err(LexError::DanglingSign);
                    }

                    return match digits.parse() {
                        Ok(number) => Ok(Some(Number(number))),
                        Err(_) => Err(LexError::BadNumber(digits)),
                    };
                }

                // Operadores de uno o dos caracteres
                (Operator(first), second) => {
                    let (token, both) = match (*first, second) {
                        ('=', Some('=')) => (Equal, true),
                        ('=', _) => (Assign, false),
                        ('!', Some('=')) => (NotEqual, true),
                        ('<', Some('=')) => (LessOrEqual, true),
                        ('<', _) => (Less, false),
                        ('>', Some('=')) => (GreaterOrEqual, true),
                        ('>', _) => (Greater, false),
                        ('&', Some('&')) => (And, true),

                        ('!', _) => return Err(LexError::Expected('=')),
                        _ => return Err(LexError::Expected('&')),
                    };

                    if !both {
                        return Ok(Some(token));
                    }

                    self.state = Complete(token);
                }

                // Cadenas, sin secuencias de escape
                (Quoted(_), Some('\n') | None) => return Err(LexError::UnterminatedString),
                (Quoted(text), Some('"')) => {
                    let text = std::mem::take(text);
                    self.state = Complete(Text(text));
                }

                (Quoted(text), Some(c)) => text.push(c),

                // Literales de carácter
                (CharQuote(_), Some('\n') | None) => return Err(LexError::UnterminatedChar),
                (CharQuote(None), Some('\'')) => return Err(LexError::EmptyChar),
                (CharQuote(Some(c)), Some('\'')) => {
                    let c = *c;
                    self.state = Complete(Char(c));
                }

                (CharQuote(Some(_)), Some(_)) => return Err(LexError::UnterminatedChar),
                (CharQuote(pending), Some(c)) => *pending = Some(c),

                // Extensión de términos
                (Word(word), Some(c)) if is_word_char(c) => word.push(c),

                // Si sigue algo que no puede formar parte del término, ha terminado
                (Word(word), _) => {
                    let word = std::mem::take(word);
                    return Ok(Some(match self::Keyword::from_str(&word) {
                        Ok(keyword) => Keyword(keyword),
                        Err(()) => Id(Identifier(word)),
                    }));
                }
            }

            // Si no hubo `continue` ni retorno, aquí se consume el
            // carácter que se observó con lookahead anteriormente
            if let Some(c) = self.chars.next() {
                self.next = self.next.after(c);
            }
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Located<Token>, Located<LexError>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.lex() {
            Ok(None) => None,
            Ok(Some(token)) => {
                self.state = State::Start;

                let location = Location::new(self.from, self.start..self.next);
                Some(Ok(Located::at(token, location)))
            }

            Err(error) => {
                self.state = State::Failed;

                // Un error sin caracteres consumidos señala al siguiente
                let end = if self.next == self.start {
                    self.start.advance()
                } else {
                    self.next
                };

                let location = Location::new(self.from, self.start..end);
                Some(Err(Located::at(error, location)))
            }
        }
    }
}

/// Determina si una constante acumulada puede recibir un punto decimal.
fn is_integral(digits: &str) -> bool {
    !digits.contains('.') && digits.chars().any(|c| c.is_ascii_digit())
}

/// Determina si un carácter puede pertenecer a un término.
fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
