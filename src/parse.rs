//! Análisis sintáctico.
//!
//! Parser descendente recursivo sobre el flujo de tokens. La gramática
//! es LL(1), por lo cual basta un token de lookahead y no existe
//! backtracking. Ante cualquier discrepancia estructural se reporta un
//! error con la expectativa que no se cumplió; el parser nunca se
//! recupera.
//!
//! ```text
//! program        := statement*
//! statement      := varDecl | ifStatement | exprStatement
//! varDecl        := type identifier '=' expression ';'
//! expression     := literal | sensorCall (compareOp literal)?
//! ifStatement    := 'if' '(' condition ')' block ('else' (block | ifStatement))?
//! condition      := conjunct ('&&' conjunct)*
//! conjunct       := '(' condition ')' | comparison | boolCall
//! comparison     := sensorCall compareOp literal
//! block          := '{' statement* '}'
//! call           := identifier '.' identifier '(' (literal (',' literal)*)? ')'
//! exprStatement  := call ';'
//! ```
//!
//! Las llamadas se resuelven contra [`crate::table`] tan pronto como se
//! terminan de leer. Los argumentos se conservan sin validar: su
//! cantidad y tipo se revisan en [`crate::codegen`]. Una llamada booleana usada sola como conjunción,
//! como `left_distance_sensor.is_object_near()`, se reescribe como una
//! comparación explícita contra `true`.

use std::{
    fmt::{self, Display},
    iter::Peekable,
    slice,
};

use thiserror::Error;

use crate::{
    bytecode::{CompareOp, VarType},
    lex::{Color, Identifier, Keyword, Token, Tune},
    source::{Located, Location},
    table::{self, Actuator, LookupError, Receiver, SensorMethod, ValueKind},
};

/// Profundidad máxima de anidamiento de bloques y condiciones.
const MAX_NESTING: usize = 64;

#[derive(Debug, Clone)]
pub enum Statement {
    VarDecl {
        typ: Located<VarType>,
        name: Located<Identifier>,
        init: Located<Expr>,
    },

    If {
        condition: Condition,
        then_branch: Vec<Statement>,
        else_branch: Option<Vec<Statement>>,
    },

    Call(Located<Call>),
}

/// Conjunciones de una condición, en orden de evaluación.
///
/// Las subcondiciones entre paréntesis se aplanan, ya que `&&` es el
/// único combinador.
#[derive(Debug, Clone)]
pub struct Condition {
    conjuncts: Vec<Located<Comparison>>,
    location: Location,
}

impl Condition {
    pub fn conjuncts(&self) -> &[Located<Comparison>] {
        &self.conjuncts
    }

    /// Ubicación de la condición, paréntesis incluidos.
    pub fn location(&self) -> &Location {
        &self.location
    }
}

/// Valor inicial de una variable.
#[derive(Debug, Clone)]
pub enum Expr {
    SensorRead(SensorRead),
    Comparison(Comparison),
    Literal(Literal),
}

/// Llamada usada como sentencia.
#[derive(Debug, Clone)]
pub enum Call {
    SensorRead(SensorRead),
    Actuator(ActuatorCall),
}

#[derive(Debug, Clone)]
pub struct SensorRead {
    pub target: SensorMethod,
    pub object: String,
    pub method: String,
    pub args: Vec<Located<Literal>>,
}

impl SensorRead {
    /// Nombre completo, como `imu.getPitch`.
    pub fn name(&self) -> String {
        format!("{}.{}", self.object, self.method)
    }

    pub fn kind(&self) -> ValueKind {
        self.target.kind()
    }
}

#[derive(Debug, Clone)]
pub struct Comparison {
    pub left: Located<SensorRead>,
    pub op: CompareOp,
    pub right: Located<Literal>,
}

#[derive(Debug, Clone)]
pub struct ActuatorCall {
    pub actuator: Actuator,
    pub method: String,
    pub args: Vec<Located<Literal>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Bool(bool),
    Color(Color),
    Tune(Tune),
    Text(String),
    Char(char),
}

impl Literal {
    /// Descripción de la clase de literal, para mensajes de error.
    pub fn kind(&self) -> &'static str {
        match self {
            Literal::Number(_) => "number",
            Literal::Bool(_) => "boolean",
            Literal::Color(_) => "color name",
            Literal::Tune(_) => "tune name",
            Literal::Text(_) => "string",
            Literal::Char(_) => "character",
        }
    }
}

impl Display for Literal {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(number) => write!(fmt, "{}", number),
            Literal::Bool(boolean) => write!(fmt, "{}", boolean),
            Literal::Color(color) => write!(fmt, "{}", color),
            Literal::Tune(tune) => write!(fmt, "{}", tune),
            Literal::Text(text) => write!(fmt, "{:?}", text),
            Literal::Char(c) => write!(fmt, "{:?}", c),
        }
    }
}

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyntaxError {
    #[error("Expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: Token },

    #[error("Expected {expected}, but the program ended")]
    UnexpectedEof { expected: String },

    #[error("Expected a declaration, `if` or method call, found {0}")]
    ExpectedStatement(Token),

    #[error("`{0}` produces a number and must be compared, as in `{0} > 10`")]
    MissingComparison(String),

    #[error("Actuator call `{0}` does not produce a value")]
    ActuatorValue(String),

    #[error("Blocks or conditions are nested more than {} levels deep", MAX_NESTING)]
    TooDeep,
}

/// Error de análisis sintáctico o de resolución de llamadas.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParserError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// Construye la lista de sentencias de un programa.
///
/// `start` es la ubicación que se reporta si el programa termina antes
/// de producir algún token.
pub fn parse(
    tokens: &[Located<Token>],
    start: Location,
) -> Result<Vec<Statement>, Located<ParserError>> {
    let mut parser = Parser {
        tokens: tokens.iter().peekable(),
        last_known: start,
        depth: 0,
    };

    let program = parser.program()?;
    log::debug!("parsed {} top-level statements", program.len());

    Ok(program)
}

struct Parser<'a> {
    tokens: Peekable<slice::Iter<'a, Located<Token>>>,
    last_known: Location,
    depth: usize,
}

/// Llamada `objeto.método(args)` antes de resolverse contra la tabla.
struct RawCall {
    object: Located<Identifier>,
    method: Located<Identifier>,
    args: Vec<Located<Literal>>,
}

impl RawCall {
    fn object(&self) -> &str {
        self.object.as_ref().as_ref()
    }

    fn method(&self) -> &str {
        self.method.as_ref().as_ref()
    }

    fn name(&self) -> String {
        format!("{}.{}", self.object(), self.method())
    }

    /// Si la llamada solo tiene sentido como actuador.
    fn is_actuator(&self) -> bool {
        table::resolve_sensor(self.object(), self.method()).is_err()
            && table::resolve_actuator(self.object(), self.method()).is_ok()
    }
}

type Parse<T> = Result<T, Located<ParserError>>;

impl<'a> Parser<'a> {
    fn program(&mut self) -> Parse<Vec<Statement>> {
        let mut statements = Vec::new();
        while self.peek().is_some() {
            statements.push(self.statement()?);
        }

        Ok(statements)
    }

    fn statement(&mut self) -> Parse<Statement> {
        match self.peek() {
            Some(Token::Keyword(Keyword::Bool | Keyword::Int | Keyword::Float)) => self.var_decl(),
            Some(Token::Keyword(Keyword::If)) => self.if_statement(),
            Some(Token::Id(_)) => self.expr_statement(),

            _ => {
                let found = self.next("a statement")?;
                self.fail(SyntaxError::ExpectedStatement(found.val().clone()))
            }
        }
    }

    fn var_decl(&mut self) -> Parse<Statement> {
        let (location, token) = self.next("a type")?.clone().split();
        let typ = match token {
            Token::Keyword(Keyword::Bool) => VarType::Bool,
            Token::Keyword(Keyword::Int) => VarType::Int,
            Token::Keyword(Keyword::Float) => VarType::Float,

            found => {
                return self.fail(SyntaxError::UnexpectedToken {
                    expected: String::from("`bool`, `int` or `float`"),
                    found,
                })
            }
        };

        let name = self.id("a variable name after the type")?;
        self.expect(Token::Assign, "`=` after the variable name")?;
        let init = self.expression()?;
        self.expect(Token::Semicolon, "`;` after the declaration")?;

        Ok(Statement::VarDecl {
            typ: Located::at(typ, location),
            name,
            init,
        })
    }

    fn expression(&mut self) -> Parse<Located<Expr>> {
        if !matches!(self.peek(), Some(Token::Id(_))) {
            return Ok(self.literal("a sensor call or literal")?.map(Expr::Literal));
        }

        let read = self.sensor_call()?;
        match self.compare_op() {
            Some(op) => {
                let comparison = self.comparison(read, op)?;
                Ok(comparison.map(Expr::Comparison))
            }

            None => Ok(read.map(Expr::SensorRead)),
        }
    }

    fn if_statement(&mut self) -> Parse<Statement> {
        self.expect(Token::Keyword(Keyword::If), "`if`")?;
        self.expect(Token::OpenParen, "`(` after `if`")?;
        let open = self.last_known.clone();

        let mut conjuncts = Vec::new();
        self.condition(&mut conjuncts)?;
        self.expect(Token::CloseParen, "`)` after condition")?;

        let condition = Condition {
            conjuncts,
            location: Location::span(open, &self.last_known),
        };

        let then_branch = self.block("`{` after condition")?;
        let else_branch = match self.peek() {
            Some(Token::Keyword(Keyword::Else)) => {
                self.next("`else`")?;

                if let Some(Token::Keyword(Keyword::If)) = self.peek() {
                    self.enter()?;
                    let chained = self.if_statement()?;
                    self.leave();

                    Some(vec![chained])
                } else {
                    Some(self.block("`{` or `if` after `else`")?)
                }
            }

            _ => None,
        };

        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn condition(&mut self, conjuncts: &mut Vec<Located<Comparison>>) -> Parse<()> {
        loop {
            self.conjunct(conjuncts)?;

            match self.peek() {
                Some(Token::And) => {
                    self.next("`&&`")?;
                }

                _ => break Ok(()),
            }
        }
    }

    fn conjunct(&mut self, conjuncts: &mut Vec<Located<Comparison>>) -> Parse<()> {
        match self.peek() {
            Some(Token::OpenParen) => {
                self.next("`(`")?;

                self.enter()?;
                self.condition(conjuncts)?;
                self.leave();

                self.expect(Token::CloseParen, "`)` to close the sub-condition")
            }

            Some(Token::Id(_)) => {
                let read = self.sensor_call()?;
                let comparison = match self.compare_op() {
                    Some(op) => self.comparison(read, op)?,

                    // Azúcar: `sensor.booleano()` equivale a `sensor.booleano() == true`
                    None if read.val().kind() == ValueKind::Boolean => {
                        let location = read.location().clone();
                        let right = Located::at(Literal::Bool(true), location.clone());

                        let comparison = Comparison {
                            left: read,
                            op: CompareOp::Equal,
                            right,
                        };

                        Located::at(comparison, location)
                    }

                    None => {
                        let (location, read) = read.split();
                        let name = format!("{}()", read.name());
                        return fail_at(location, SyntaxError::MissingComparison(name));
                    }
                };

                conjuncts.push(comparison);
                Ok(())
            }

            _ => {
                let found = self.next("a condition")?;
                self.fail(SyntaxError::UnexpectedToken {
                    expected: String::from("a sensor call or `(`"),
                    found: found.val().clone(),
                })
            }
        }
    }

    fn comparison(&mut self, left: Located<SensorRead>, op: CompareOp) -> Parse<Located<Comparison>> {
        self.next("a comparison operator")?;

        let expected = format!("a number or boolean after `{}`", op);
        let token = self.next(&expected)?;

        let literal = match token.val() {
            Token::Number(number) => Literal::Number(*number),
            Token::Keyword(Keyword::True) => Literal::Bool(true),
            Token::Keyword(Keyword::False) => Literal::Bool(false),

            found => {
                return self.fail(SyntaxError::UnexpectedToken {
                    expected,
                    found: found.clone(),
                })
            }
        };

        let right = Located::at(literal, token.location().clone());
        let location = Location::span(left.location().clone(), right.location());

        Ok(Located::at(Comparison { left, op, right }, location))
    }

    fn block(&mut self, opening: &str) -> Parse<Vec<Statement>> {
        self.expect(Token::OpenCurly, opening)?;
        self.enter()?;

        let mut statements = Vec::new();
        loop {
            match self.peek() {
                Some(Token::CloseCurly) => break,
                None => {
                    return self.fail(SyntaxError::UnexpectedEof {
                        expected: String::from("`}` to close the block"),
                    })
                }

                Some(_) => statements.push(self.statement()?),
            }
        }

        self.next("`}`")?;
        self.leave();

        Ok(statements)
    }

    fn expr_statement(&mut self) -> Parse<Statement> {
        let call = self.call()?;

        let reads = Receiver::from_name(call.val().object()).map_or(false, Receiver::is_sensor);
        let call = if reads {
            self.sensor_read(call)?.map(Call::SensorRead)
        } else {
            self.actuator_call(call)?.map(Call::Actuator)
        };

        self.expect(Token::Semicolon, "`;` after the call")?;
        Ok(Statement::Call(call))
    }

    /// Llamada en una posición que exige un valor.
    fn sensor_call(&mut self) -> Parse<Located<SensorRead>> {
        let call = self.call()?;
        if call.val().is_actuator() {
            let (location, call) = call.split();
            return fail_at(location, SyntaxError::ActuatorValue(call.name()));
        }

        self.sensor_read(call)
    }

    fn call(&mut self) -> Parse<Located<RawCall>> {
        let object = self.id("an object name")?;
        self.expect(Token::Period, &format!("`.` after `{}`", object.as_ref()))?;

        let method = self.id("a method name after `.`")?;
        self.expect(Token::OpenParen, &format!("`(` after `{}`", method.as_ref()))?;

        let mut args = Vec::new();
        if let Some(Token::CloseParen) = self.peek() {
            self.next("`)`")?;
        } else {
            loop {
                args.push(self.literal("an argument")?);

                let (_, token) = self.next("`,` or `)` after the argument")?.clone().split();
                match token {
                    Token::Comma => continue,
                    Token::CloseParen => break,

                    found => {
                        return self.fail(SyntaxError::UnexpectedToken {
                            expected: String::from("`,` or `)` after the argument"),
                            found,
                        })
                    }
                }
            }
        }

        let location = Location::span(object.location().clone(), &self.last_known);
        Ok(Located::at(RawCall { object, method, args }, location))
    }

    fn sensor_read(&mut self, call: Located<RawCall>) -> Parse<Located<SensorRead>> {
        let (location, call) = call.split();

        match table::resolve_sensor(call.object(), call.method()) {
            Err(error) => fail_at(location, error),
            Ok(target) => {
                let read = SensorRead {
                    target,
                    object: call.object().to_owned(),
                    method: call.method().to_owned(),
                    args: call.args,
                };

                Ok(Located::at(read, location))
            }
        }
    }

    fn actuator_call(&mut self, call: Located<RawCall>) -> Parse<Located<ActuatorCall>> {
        let (location, call) = call.split();

        match table::resolve_actuator(call.object(), call.method()) {
            Err(error) => fail_at(location, error),
            Ok(actuator) => {
                let method = call.name();
                let call = ActuatorCall {
                    actuator,
                    method,
                    args: call.args,
                };

                Ok(Located::at(call, location))
            }
        }
    }

    fn literal(&mut self, expected: &str) -> Parse<Located<Literal>> {
        let (location, token) = self.next(expected)?.clone().split();
        let literal = match token {
            Token::Number(number) => Literal::Number(number),
            Token::Keyword(Keyword::True) => Literal::Bool(true),
            Token::Keyword(Keyword::False) => Literal::Bool(false),
            Token::Keyword(Keyword::Color(color)) => Literal::Color(color),
            Token::Keyword(Keyword::Tune(tune)) => Literal::Tune(tune),
            Token::Text(text) => Literal::Text(text),
            Token::Char(c) => Literal::Char(c),

            found => {
                return self.fail(SyntaxError::UnexpectedToken {
                    expected: expected.to_owned(),
                    found,
                })
            }
        };

        Ok(Located::at(literal, location))
    }

    fn compare_op(&mut self) -> Option<CompareOp> {
        match self.peek()? {
            Token::Equal => Some(CompareOp::Equal),
            Token::NotEqual => Some(CompareOp::NotEqual),
            Token::Less => Some(CompareOp::Less),
            Token::LessOrEqual => Some(CompareOp::LessOrEqual),
            Token::Greater => Some(CompareOp::Greater),
            Token::GreaterOrEqual => Some(CompareOp::GreaterOrEqual),
            _ => None,
        }
    }

    fn enter(&mut self) -> Parse<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            self.fail(SyntaxError::TooDeep)
        } else {
            Ok(())
        }
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn id(&mut self, expected: &str) -> Parse<Located<Identifier>> {
        let (location, token) = self.next(expected)?.clone().split();
        match token {
            Token::Id(id) => Ok(Located::at(id, location)),
            found => self.fail(SyntaxError::UnexpectedToken {
                expected: expected.to_owned(),
                found,
            }),
        }
    }

    fn expect(&mut self, token: Token, expected: &str) -> Parse<()> {
        let found = self.next(expected)?;
        if *found.val() == token {
            Ok(())
        } else {
            self.fail(SyntaxError::UnexpectedToken {
                expected: expected.to_owned(),
                found: found.val().clone(),
            })
        }
    }

    fn peek(&mut self) -> Option<&'a Token> {
        self.tokens.peek().copied().map(Located::val)
    }

    fn next(&mut self, expected: &str) -> Parse<&'a Located<Token>> {
        match self.tokens.next() {
            Some(token) => {
                self.last_known = token.location().clone();
                Ok(token)
            }

            None => self.fail(SyntaxError::UnexpectedEof {
                expected: expected.to_owned(),
            }),
        }
    }

    fn fail<T, E: Into<ParserError>>(&self, error: E) -> Parse<T> {
        fail_at(self.last_known.clone(), error)
    }
}

fn fail_at<T, E: Into<ParserError>>(location: Location, error: E) -> Parse<T> {
    Err(Located::at(error.into(), location))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lex, source::Source, table::Sensor};

    fn parse_str(text: &str) -> Result<Vec<Statement>, Located<ParserError>> {
        let source = Source::new("<test>", text);
        let tokens = lex::tokenize(&source).expect("lexically valid");
        parse(&tokens, Location::start_of(&source))
    }

    fn syntax_error(text: &str) -> SyntaxError {
        match parse_str(text).unwrap_err().into_inner() {
            ParserError::Syntax(error) => error,
            other => panic!("expected a syntax error, found {:?}", other),
        }
    }

    fn lookup_error(text: &str) -> LookupError {
        match parse_str(text).unwrap_err().into_inner() {
            ParserError::Lookup(error) => error,
            other => panic!("expected a lookup error, found {:?}", other),
        }
    }

    fn single_if(text: &str) -> (Condition, Vec<Statement>, Option<Vec<Statement>>) {
        match parse_str(text).unwrap().into_iter().next() {
            Some(Statement::If {
                condition,
                then_branch,
                else_branch,
            }) => (condition, then_branch, else_branch),

            other => panic!("expected an if statement, found {:?}", other),
        }
    }

    #[test]
    fn declaration_with_sensor_initializer() {
        let program = parse_str("bool colorDetected = color_sensor.is_object(BLUE);").unwrap();

        match &program[..] {
            [Statement::VarDecl { typ, name, init }] => {
                assert_eq!(*typ.val(), VarType::Bool);
                assert_eq!(name.val().as_ref(), "colorDetected");

                match init.val() {
                    Expr::SensorRead(read) => {
                        assert_eq!(read.name(), "color_sensor.is_object");
                        assert_eq!(read.kind(), ValueKind::Boolean);

                        let args: Vec<_> = read.args.iter().map(|arg| arg.val().clone()).collect();
                        assert_eq!(args, vec![Literal::Color(Color::Blue)]);
                    }

                    other => panic!("unexpected initializer {:?}", other),
                }
            }

            other => panic!("unexpected program {:?}", other),
        }
    }

    #[test]
    fn declaration_with_comparison_and_literal() {
        let program = parse_str("bool tilted = imu.getRoll() <= -5; float limit = 2.5;").unwrap();
        assert_eq!(program.len(), 2);

        match &program[0] {
            Statement::VarDecl { init, .. } => match init.val() {
                Expr::Comparison(comparison) => {
                    assert_eq!(comparison.left.val().target, SensorMethod::Fixed(Sensor::ROLL));
                    assert_eq!(comparison.op, CompareOp::LessOrEqual);
                    assert_eq!(*comparison.right.val(), Literal::Number(-5.0));
                }

                other => panic!("unexpected initializer {:?}", other),
            },

            other => panic!("unexpected statement {:?}", other),
        }

        match &program[1] {
            Statement::VarDecl { init, .. } => {
                assert!(matches!(init.val(), Expr::Literal(Literal::Number(n)) if *n == 2.5))
            }

            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn boolean_call_is_desugared() {
        let (condition, then_branch, else_branch) =
            single_if("if (left_distance_sensor.is_object_near()) { speaker.stop(); }");

        let [conjunct] = condition.conjuncts() else {
            panic!("expected one conjunct");
        };

        assert_eq!(
            conjunct.val().left.val().target,
            SensorMethod::Fixed(Sensor::LEFT_PROXIMITY)
        );
        assert_eq!(conjunct.val().op, CompareOp::Equal);
        assert_eq!(*conjunct.val().right.val(), Literal::Bool(true));
        assert_eq!(then_branch.len(), 1);
        assert!(else_branch.is_none());

        // Desde el `(` hasta el `)`
        assert_eq!(condition.location().start().column(), 4);
    }

    #[test]
    fn nested_conjuncts_are_flattened() {
        let (condition, _, _) = single_if(
            "if ((color_sensor.is_object(RED)) && (imu.getPitch() > 10 && imu.getYaw() != 0)) {}",
        );

        let calls: Vec<_> = condition
            .conjuncts()
            .iter()
            .map(|conjunct| conjunct.val().left.val().name())
            .collect();

        assert_eq!(calls, vec!["color_sensor.is_object", "imu.getPitch", "imu.getYaw"]);
    }

    #[test]
    fn else_if_chains() {
        let (_, _, else_branch) = single_if(
            "if (imu.getPitch() > 10) { all_leds.set_color(RED); } \
             else if (imu.getPitch() < -10) { all_leds.set_color(BLUE); } \
             else { all_leds.turn_off(); }",
        );

        let else_branch = else_branch.unwrap();
        assert_eq!(else_branch.len(), 1);
        assert!(matches!(
            &else_branch[0],
            Statement::If { else_branch: Some(inner), .. } if inner.len() == 1
        ));
    }

    #[test]
    fn actuator_statement() {
        let program = parse_str("left_led.set_color(GREEN); speaker.play_tone(440, 250);").unwrap();

        match &program[1] {
            Statement::Call(call) => match call.val() {
                Call::Actuator(call) => {
                    assert_eq!(call.actuator, Actuator::PlayTone);
                    assert_eq!(call.args.len(), 2);
                }

                other => panic!("unexpected call {:?}", other),
            },

            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn missing_close_paren() {
        let error = syntax_error("if (imu.getPitch() > 10 { }");
        assert_eq!(error.to_string(), "Expected `)` after condition, found `{`");
    }

    #[test]
    fn missing_semicolon_at_end() {
        let error = syntax_error("all_leds.set_color(RED)");
        assert_eq!(
            error,
            SyntaxError::UnexpectedEof {
                expected: String::from("`;` after the call")
            }
        );
    }

    #[test]
    fn unclosed_block() {
        let error = syntax_error("if (imu.getPitch() > 10) { speaker.stop();");
        assert!(matches!(error, SyntaxError::UnexpectedEof { expected } if expected.contains('}')));
    }

    #[test]
    fn numeric_call_requires_comparison() {
        let error = syntax_error("if (imu.getPitch()) {}");
        assert_eq!(error, SyntaxError::MissingComparison(String::from("imu.getPitch()")));
    }

    #[test]
    fn comparison_requires_number_or_boolean() {
        let error = syntax_error("if (imu.getPitch() > RED) {}");
        assert!(matches!(error, SyntaxError::UnexpectedToken { .. }));
    }

    #[test]
    fn unknown_sensor_method() {
        let error = lookup_error("if (imu.getNonExistent() > 1) {}");
        assert_eq!(
            error,
            LookupError::UnknownSensorMethod {
                receiver: String::from("imu"),
                method: String::from("getNonExistent"),
            }
        );
    }

    #[test]
    fn unknown_actuator_method() {
        let error = lookup_error("all_leds.blink(RED);");
        assert!(matches!(error, LookupError::UnknownActuatorMethod { .. }));

        let error = lookup_error("wheels.spin();");
        assert!(matches!(error, LookupError::UnknownActuatorMethod { .. }));
    }

    #[test]
    fn sensor_arguments_are_left_to_codegen() {
        let program = parse_str(
            "int p = imu.getPitch(3); \
             bool b = color_sensor.is_object(); \
             color_sensor.is_object(5);",
        )
        .unwrap();

        assert_eq!(program.len(), 3);

        match &program[2] {
            Statement::Call(call) => match call.val() {
                Call::SensorRead(read) => {
                    assert_eq!(read.args.len(), 1);
                    assert_eq!(*read.args[0].val(), Literal::Number(5.0));
                }

                other => panic!("unexpected call {:?}", other),
            },

            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn actuator_has_no_value() {
        assert_eq!(
            syntax_error("bool b = all_leds.set_color(RED);"),
            SyntaxError::ActuatorValue(String::from("all_leds.set_color"))
        );
    }

    #[test]
    fn actuator_is_not_a_condition() {
        assert_eq!(
            syntax_error("if (all_leds.set_color(RED)) {}"),
            SyntaxError::ActuatorValue(String::from("all_leds.set_color"))
        );

        assert_eq!(
            syntax_error("if (imu.getPitch() > 1 && speaker.stop()) {}"),
            SyntaxError::ActuatorValue(String::from("speaker.stop"))
        );
    }

    #[test]
    fn stray_token() {
        assert!(matches!(
            syntax_error("} "),
            SyntaxError::ExpectedStatement(Token::CloseCurly)
        ));
    }

    #[test]
    fn nesting_is_bounded() {
        let depth = MAX_NESTING + 1;
        let text = format!(
            "if ({}imu.getPitch() > 1{}) {{}}",
            "(".repeat(depth),
            ")".repeat(depth)
        );

        assert_eq!(syntax_error(&text), SyntaxError::TooDeep);

        let shallow = format!(
            "if ({}imu.getPitch() > 1{}) {{}}",
            "(".repeat(8),
            ")".repeat(8)
        );

        assert!(parse_str(&shallow).is_ok());
    }
}
