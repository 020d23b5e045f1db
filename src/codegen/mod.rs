//! Generación de código.
//!
//! Traduce la lista de sentencias a instrucciones de ancho fijo. Las
//! condiciones se evalúan en cortocircuito: cada conjunción lee su
//! sensor, compara contra su literal y salta fuera de la rama si el
//! resultado es falso. Todos los saltos de salida de una misma condición
//! se resuelven hacia la misma dirección.
//!
//! Aquí también se validan los tipos: argumentos de sensores y
//! actuadores, literales de comparación y valores iniciales de variables.
//! Tanto los destinos de salto como los slots de variables deben caber
//! en un operando.

use std::collections::HashMap;
use thiserror::Error;

use crate::{
    bytecode::{Bytecode, CompareOp, Opcode, Operand, VarType, OPERAND_LIMIT},
    lex::Identifier,
    parse::{ActuatorCall, Call, Comparison, Condition, Expr, Literal, SensorRead, Statement},
    source::{Located, Location},
    table::{self, Actuator, LookupError, Parameter, Sensor, SensorMethod, ValueKind},
};

pub(crate) mod emit;

use emit::{Emitter, PendingJump};

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodeGenError {
    #[error("`{method}` expects {expected} argument(s), found {found}")]
    Arity {
        method: String,
        expected: usize,
        found: usize,
    },

    #[error("Argument {position} of `{method}` must be a {expected}, found {found}")]
    ArgumentType {
        method: String,
        position: usize,
        expected: Parameter,
        found: &'static str,
    },

    #[error("Argument {position} of `{method}` must be a {expected}, found {value}")]
    ArgumentRange {
        method: String,
        position: usize,
        expected: Parameter,
        value: f64,
    },

    #[error("Cannot compare the {kind} reading of `{method}` with a {found}")]
    ComparisonType {
        method: String,
        kind: ValueKind,
        found: &'static str,
    },

    #[error("Operator `{op}` cannot be applied to the boolean reading of `{method}`")]
    OrderingOnBoolean { method: String, op: CompareOp },

    #[error("Literal {0} does not fit in an operand")]
    OutOfRange(f64),

    #[error("Variable `{name}` is declared as `{typ}` but initialized with a {found} value")]
    TypeMismatch {
        name: String,
        typ: VarType,
        found: &'static str,
    },

    #[error("Variable `{0}` is already declared")]
    Redeclared(String),

    #[error("Jump target {0} is past the last addressable instruction ({})", OPERAND_LIMIT)]
    ProgramTooLarge(usize),

    #[error("Programs cannot declare more than {} variables", OPERAND_LIMIT + 1)]
    TooManyVariables,

    /// Color que el sensor no puede detectar.
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

type Generate<T> = Result<T, Located<CodeGenError>>;

/// Genera el bytecode de un programa, terminado en `END`.
pub fn generate(program: &[Statement]) -> Result<Bytecode, Located<CodeGenError>> {
    let mut generator = Generator {
        emitter: Emitter::default(),
        variables: HashMap::new(),
    };

    generator.block(program)?;

    let variables = generator.variables.len();
    let bytecode = generator.emitter.finish();
    log::debug!(
        "generated {} instructions, {} variables",
        bytecode.len(),
        variables
    );

    Ok(bytecode)
}

struct Generator {
    emitter: Emitter,
    // Un solo espacio de nombres por programa, cada variable en su propio slot
    variables: HashMap<Identifier, Operand>,
}

impl Generator {
    fn block(&mut self, statements: &[Statement]) -> Generate<()> {
        statements
            .iter()
            .try_for_each(|statement| self.statement(statement))
    }

    fn statement(&mut self, statement: &Statement) -> Generate<()> {
        match statement {
            Statement::VarDecl { typ, name, init } => self.declaration(*typ.val(), name, init),

            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let mut exits = Vec::with_capacity(condition.conjuncts().len());
                for conjunct in condition.conjuncts() {
                    self.comparison(conjunct)?;
                    exits.push(self.emitter.jump_if_false());
                }

                self.block(then_branch)?;

                match else_branch {
                    None => {
                        let end = self.emitter.next_address();
                        self.resolve(exits, end, condition)
                    }

                    Some(else_branch) => {
                        let skip = self.emitter.jump();
                        let else_start = self.emitter.next_address();
                        self.resolve(exits, else_start, condition)?;

                        self.block(else_branch)?;

                        let end = self.emitter.next_address();
                        self.resolve([skip], end, condition)
                    }
                }
            }

            Statement::Call(call) => match call.val() {
                Call::SensorRead(read) => {
                    let sensor = select_sensor(read, call.location())?;
                    self.emitter.sample(sensor);
                    Ok(())
                }

                Call::Actuator(actuator) => self.actuator(actuator, call.location()),
            },
        }
    }

    /// Resuelve los saltos pendientes de un `if` hacia `target`.
    fn resolve<J>(&mut self, jumps: J, target: usize, condition: &Condition) -> Generate<()>
    where
        J: IntoIterator<Item = PendingJump>,
    {
        for jump in jumps {
            self.emitter
                .patch(jump, target)
                .map_err(|error| Located::at(error, condition.location().clone()))?;
        }

        Ok(())
    }

    fn declaration(
        &mut self,
        typ: VarType,
        name: &Located<Identifier>,
        init: &Located<Expr>,
    ) -> Generate<()> {
        if self.variables.contains_key(name.val()) {
            return fail(
                name.location(),
                CodeGenError::Redeclared(name.val().to_string()),
            );
        }

        let check = |found: ValueKind| {
            let expected = match typ {
                VarType::Bool => ValueKind::Boolean,
                VarType::Int | VarType::Float => ValueKind::Numeric,
            };

            if found == expected {
                return Ok(());
            }

            let found = match found {
                ValueKind::Boolean => "boolean",
                ValueKind::Numeric => "numeric",
            };

            fail(
                init.location(),
                CodeGenError::TypeMismatch {
                    name: name.val().to_string(),
                    typ,
                    found,
                },
            )
        };

        match init.val() {
            Expr::Literal(literal) => {
                let (found, value) = match *literal {
                    Literal::Bool(value) => (ValueKind::Boolean, Operand::from(value)),
                    Literal::Number(value) => (ValueKind::Numeric, number(value, init.location())?),

                    ref other => {
                        return fail(
                            init.location(),
                            CodeGenError::TypeMismatch {
                                name: name.val().to_string(),
                                typ,
                                found: other.kind(),
                            },
                        )
                    }
                };

                check(found)?;
                let slot = self.declare(name)?;
                emit!(self.emitter, Opcode::DeclareVar, slot, typ.code(), value, 1);
            }

            Expr::SensorRead(read) => {
                check(read.kind())?;
                let sensor = select_sensor(read, init.location())?;

                let slot = self.declare(name)?;
                emit!(self.emitter, Opcode::DeclareVar, slot, typ.code());
                self.emitter.sample(sensor);
            }

            Expr::Comparison(comparison) => {
                check(ValueKind::Boolean)?;

                let slot = self.declare(name)?;
                emit!(self.emitter, Opcode::DeclareVar, slot, typ.code());
                self.comparison(&Located::at(comparison.clone(), init.location().clone()))?;
            }
        }

        Ok(())
    }

    /// Asigna el siguiente slot libre a una variable.
    fn declare(&mut self, name: &Located<Identifier>) -> Generate<Operand> {
        let slot = match emit::operand(self.variables.len()) {
            Some(slot) => slot,
            None => return fail(name.location(), CodeGenError::TooManyVariables),
        };

        self.variables.insert(name.val().clone(), slot);
        Ok(slot)
    }

    fn comparison(&mut self, comparison: &Located<Comparison>) -> Generate<()> {
        let Comparison { left, op, right } = comparison.val();
        let read = left.val();
        let sensor = select_sensor(read, left.location())?;

        let value = match (read.kind(), right.val()) {
            (ValueKind::Boolean, Literal::Bool(value)) if op.is_equality() => Operand::from(*value),

            (ValueKind::Boolean, Literal::Bool(_)) => {
                return fail(
                    comparison.location(),
                    CodeGenError::OrderingOnBoolean {
                        method: read.name(),
                        op: *op,
                    },
                )
            }

            (ValueKind::Numeric, &Literal::Number(value)) => number(value, right.location())?,

            (kind, found) => {
                return fail(
                    right.location(),
                    CodeGenError::ComparisonType {
                        method: read.name(),
                        kind,
                        found: found.kind(),
                    },
                )
            }
        };

        let reading = self.emitter.read(sensor);
        self.emitter.compare(reading, *op, value);

        Ok(())
    }

    fn actuator(&mut self, call: &ActuatorCall, location: &Location) -> Generate<()> {
        let parameters = call.actuator.parameters();
        if call.args.len() != parameters.len() {
            return fail(
                location,
                CodeGenError::Arity {
                    method: call.method.clone(),
                    expected: parameters.len(),
                    found: call.args.len(),
                },
            );
        }

        let mut values = Vec::with_capacity(4);
        if let Actuator::SetLed(led) = call.actuator {
            values.push(Operand::from(led.code()));
        }

        for (position, (&parameter, arg)) in parameters.iter().zip(&call.args).enumerate() {
            let position = position + 1;

            match (parameter, arg.val()) {
                (Parameter::Color, Literal::Color(color)) => {
                    values.extend(color.rgb().map(Operand::from));
                }

                (Parameter::Tune, Literal::Tune(tune)) => values.push(Operand::from(tune.id())),

                (Parameter::Number { max }, &Literal::Number(value)) => {
                    let truncated = value.trunc();
                    if !(0.0..=f64::from(max)).contains(&truncated) {
                        return fail(
                            arg.location(),
                            CodeGenError::ArgumentRange {
                                method: call.method.clone(),
                                position,
                                expected: parameter,
                                value,
                            },
                        );
                    }

                    values.push(truncated as Operand);
                }

                (expected, found) => {
                    return fail(
                        arg.location(),
                        CodeGenError::ArgumentType {
                            method: call.method.clone(),
                            position,
                            expected,
                            found: found.kind(),
                        },
                    )
                }
            }
        }

        // `turn_off()` equivale a apagar los tres canales
        if call.actuator == Actuator::TurnOffAllLeds {
            values.extend([0, 0, 0]);
        }

        self.emitter.push(call.actuator.opcode(), emit::args(&values));
        Ok(())
    }
}

/// Elige el sensor de una lectura a partir de sus argumentos.
fn select_sensor(read: &SensorRead, location: &Location) -> Generate<Sensor> {
    match (read.target, read.args.as_slice()) {
        (SensorMethod::Fixed(sensor), []) => Ok(sensor),

        (SensorMethod::ByColor(_), [arg]) => match *arg.val() {
            Literal::Color(color) => read.target.select(color).ok_or_else(|| {
                let method = format!("{}({})", read.method, color);
                let error = table::unknown_sensor(&read.object, &method);

                Located::at(CodeGenError::from(error), location.clone())
            }),

            ref other => fail(
                arg.location(),
                CodeGenError::ArgumentType {
                    method: read.name(),
                    position: 1,
                    expected: Parameter::Color,
                    found: other.kind(),
                },
            ),
        },

        (target, args) => fail(
            location,
            CodeGenError::Arity {
                method: read.name(),
                expected: target.arity(),
                found: args.len(),
            },
        ),
    }
}

/// Codifica un literal numérico como operando, truncado hacia cero.
fn number(value: f64, location: &Location) -> Generate<Operand> {
    let truncated = value.trunc();
    if truncated.is_finite() && truncated.abs() <= f64::from(OPERAND_LIMIT) {
        Ok(truncated as Operand)
    } else {
        fail(location, CodeGenError::OutOfRange(value))
    }
}

fn fail<T>(location: &Location, error: CodeGenError) -> Generate<T> {
    Err(Located::at(error, location.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bytecode::{Instruction, REGISTER},
        lex, parse,
        source::Source,
    };

    fn generate_str(text: &str) -> Result<Bytecode, Located<CodeGenError>> {
        let source = Source::new("<test>", text);
        let tokens = lex::tokenize(&source).expect("lexically valid");
        let program = parse::parse(&tokens, Location::start_of(&source)).expect("syntactically valid");

        generate(&program)
    }

    fn code(text: &str) -> Vec<Instruction> {
        generate_str(text).unwrap().instructions().to_vec()
    }

    fn error(text: &str) -> CodeGenError {
        generate_str(text).unwrap_err().into_inner()
    }

    fn opcodes(code: &[Instruction]) -> Vec<Opcode> {
        code.iter().map(|instruction| instruction.opcode).collect()
    }

    fn insn(opcode: Opcode, args: [Operand; 4]) -> Instruction {
        Instruction::new(opcode, args)
    }

    fn sensor(sensor: Sensor) -> Operand {
        Operand::from(sensor.code())
    }

    #[test]
    fn empty_program_is_just_end() {
        assert_eq!(code(""), vec![insn(Opcode::End, [0; 4])]);
    }

    #[test]
    fn single_if_without_else() {
        assert_eq!(
            code("if (imu.getPitch() > 10) { all_leds.set_color(RED); }"),
            vec![
                insn(Opcode::ReadSensor, [sensor(Sensor::PITCH), 0, 0, 0]),
                insn(Opcode::Compare, [4, REGISTER, 10, 0]),
                insn(Opcode::JumpIfFalse, [4, 0, 0, 0]),
                insn(Opcode::SetAllLeds, [255, 0, 0, 0]),
                insn(Opcode::End, [0; 4]),
            ]
        );
    }

    #[test]
    fn if_else_targets() {
        let code = code(
            "if (front_distance_sensor.get_distance() < 20) { speaker.play_tune(ALARM); } \
             else { all_leds.turn_off(); speaker.stop(); }",
        );

        assert_eq!(
            opcodes(&code),
            vec![
                Opcode::ReadSensor,
                Opcode::Compare,
                Opcode::JumpIfFalse,
                Opcode::PlayTune,
                Opcode::Jump,
                Opcode::SetAllLeds,
                Opcode::StopSound,
                Opcode::End,
            ]
        );

        // Falso salta al inicio del else, el final del then salta tras el else
        assert_eq!(code[2].args[0], 5);
        assert_eq!(code[4].args[0], 7);
        assert_eq!(code[5].args, [0, 0, 0, 0]);
    }

    #[test]
    fn every_conjunct_exits_to_the_same_address() {
        let code = code(
            "if (imu.getPitch() > 1 && imu.getRoll() < 2 && (right_distance_sensor.is_object_near())) \
             { speaker.play_tone(440, 100); }",
        );

        let compares = code.iter().filter(|i| i.opcode == Opcode::Compare).count();
        let exits: Vec<_> = code
            .iter()
            .filter(|i| i.opcode == Opcode::JumpIfFalse)
            .map(|i| i.args[0])
            .collect();

        assert_eq!(compares, 3);
        assert_eq!(exits, vec![10, 10, 10]);
        assert_eq!(code[10].opcode, Opcode::End);

        // Conjunción desazucarada a `== true`
        assert_eq!(code[7], insn(Opcode::Compare, [0, REGISTER, 1, 0]));
    }

    #[test]
    fn conjuncts_with_else_exit_to_the_else_branch() {
        let code = code(
            "if (imu.getPitch() > 1 && imu.getRoll() < 2 && imu.getYaw() == 3) { speaker.stop(); } \
             else { all_leds.turn_off(); } \
             speaker.play_tune(HAPPY);",
        );

        let exits: Vec<_> = code
            .iter()
            .filter(|i| i.opcode == Opcode::JumpIfFalse)
            .map(|i| i.args[0])
            .collect();

        // El salto incondicional cierra el then; el else empieza justo después
        assert_eq!(code[10].opcode, Opcode::Jump);
        assert_eq!(exits, vec![11, 11, 11]);
        assert_eq!(code[11], insn(Opcode::SetAllLeds, [0; 4]));

        assert_eq!(code[10].args[0], 12);
        assert_eq!(code[12].opcode, Opcode::PlayTune);
    }

    #[test]
    fn nested_if_inside_else_if() {
        let code = code(
            "if (imu.getYaw() >= 90) { left_led.set_color(BLUE); } \
             else if (imu.getYaw() <= -90) { right_led.set_color(ORANGE); }",
        );

        assert_eq!(
            opcodes(&code),
            vec![
                Opcode::ReadSensor,
                Opcode::Compare,
                Opcode::JumpIfFalse,
                Opcode::SetLed,
                Opcode::Jump,
                Opcode::ReadSensor,
                Opcode::Compare,
                Opcode::JumpIfFalse,
                Opcode::SetLed,
                Opcode::End,
            ]
        );

        assert_eq!(code[2].args[0], 5);
        assert_eq!(code[4].args[0], 9);
        assert_eq!(code[7].args[0], 9);
        assert_eq!(code[6].args[2], -90);
        assert_eq!(code[3].args, [0, 0, 0, 255]);
        assert_eq!(code[8].args, [1, 255, 165, 0]);
    }

    #[test]
    fn declarations() {
        assert_eq!(
            code("bool colorDetected = color_sensor.is_object(BLUE); int limit = -12.9; bool tilted = imu.getRoll() > 30;"),
            vec![
                insn(Opcode::DeclareVar, [0, VarType::Bool.code(), 0, 0]),
                insn(Opcode::ReadSensor, [sensor(Sensor::COLOR_BLUE), 0, 0, 0]),
                insn(Opcode::DeclareVar, [1, VarType::Int.code(), -12, 1]),
                insn(Opcode::DeclareVar, [2, VarType::Bool.code(), 0, 0]),
                insn(Opcode::ReadSensor, [sensor(Sensor::ROLL), 0, 0, 0]),
                insn(Opcode::Compare, [4, REGISTER, 30, 0]),
                insn(Opcode::End, [0; 4]),
            ]
        );
    }

    #[test]
    fn comparison_codes() {
        let ops = ["==", "!=", "<", "<=", ">", ">="];

        for (expected, op) in ops.iter().enumerate() {
            let text = format!("if (imu.getPitch() {} 0) {{}}", op);
            assert_eq!(code(&text)[1].args[0], expected as Operand, "operator {}", op);
        }
    }

    #[test]
    fn bare_reads_and_actuators() {
        assert_eq!(
            code("imu.getZAccel(); speaker.play_tone(20000, 32767); speaker.play_tune(happy);"),
            vec![
                insn(Opcode::ReadSensor, [sensor(Sensor::ACCEL_Z), 0, 0, 0]),
                insn(Opcode::PlayTone, [20_000, 0x7fff, 0, 0]),
                insn(Opcode::PlayTune, [1, 0, 0, 0]),
                insn(Opcode::End, [0; 4]),
            ]
        );
    }

    #[test]
    fn type_errors() {
        assert!(matches!(
            error("int x = left_distance_sensor.is_object_near();"),
            CodeGenError::TypeMismatch { found: "boolean", .. }
        ));

        assert!(matches!(
            error("bool x = 3;"),
            CodeGenError::TypeMismatch { typ: VarType::Bool, .. }
        ));

        assert!(matches!(
            error("if (left_distance_sensor.is_object_near() == 1) {}"),
            CodeGenError::ComparisonType { kind: ValueKind::Boolean, .. }
        ));

        assert!(matches!(
            error("if (imu.getPitch() == true) {}"),
            CodeGenError::ComparisonType { kind: ValueKind::Numeric, .. }
        ));

        assert_eq!(
            error("if (color_sensor.is_object(RED) < true) {}"),
            CodeGenError::OrderingOnBoolean {
                method: String::from("color_sensor.is_object"),
                op: CompareOp::Less,
            }
        );
    }

    #[test]
    fn actuator_errors() {
        assert!(matches!(
            error("all_leds.set_color();"),
            CodeGenError::Arity { expected: 1, found: 0, .. }
        ));

        assert!(matches!(
            error("speaker.play_tune(RED);"),
            CodeGenError::ArgumentType { position: 1, expected: Parameter::Tune, found: "color name", .. }
        ));

        assert!(matches!(
            error("speaker.play_tone(440, -1);"),
            CodeGenError::ArgumentRange { position: 2, .. }
        ));

        assert!(matches!(
            error("speaker.play_tone(20001, 10);"),
            CodeGenError::ArgumentRange { position: 1, .. }
        ));
    }

    #[test]
    fn sensor_argument_errors() {
        assert_eq!(
            error("imu.getPitch(5);"),
            CodeGenError::Arity {
                method: String::from("imu.getPitch"),
                expected: 0,
                found: 1,
            }
        );

        assert_eq!(
            error("bool b = color_sensor.is_object();"),
            CodeGenError::Arity {
                method: String::from("color_sensor.is_object"),
                expected: 1,
                found: 0,
            }
        );

        assert_eq!(
            error("if (color_sensor.is_object(5)) {}"),
            CodeGenError::ArgumentType {
                method: String::from("color_sensor.is_object"),
                position: 1,
                expected: Parameter::Color,
                found: "number",
            }
        );

        assert!(matches!(
            error("if (color_sensor.is_object(RED, BLUE) == true) {}"),
            CodeGenError::Arity { expected: 1, found: 2, .. }
        ));
    }

    #[test]
    fn undetectable_color() {
        let error = error("if (color_sensor.is_object(PURPLE)) {}");

        assert!(matches!(error, CodeGenError::Lookup(LookupError::UnknownSensorMethod { .. })));
        assert_eq!(error.to_string(), "Unknown sensor method `color_sensor.is_object(PURPLE)`");
    }

    #[test]
    fn jump_targets_must_fit_an_operand() {
        let guarded = |stops: usize| {
            format!(
                "{}if (imu.getPitch() > 1) {{ speaker.stop(); }}",
                "speaker.stop();".repeat(stops)
            )
        };

        // El salto de salida apunta justo al último operando válido
        let fits = code(&guarded(0x7fff - 4));
        assert_eq!(fits[0x7fff - 2].opcode, Opcode::JumpIfFalse);
        assert_eq!(fits[0x7fff - 2].args[0], OPERAND_LIMIT);

        assert_eq!(
            error(&guarded(0x7fff - 3)),
            CodeGenError::ProgramTooLarge(0x8000)
        );
    }

    #[test]
    fn variable_slots_must_fit_an_operand() {
        let declarations: String = (0..=0x8000).map(|i| format!("int v{} = 0;", i)).collect();
        assert_eq!(error(&declarations), CodeGenError::TooManyVariables);

        let fits: String = (0..0x8000).map(|i| format!("int v{} = 0;", i)).collect();
        assert_eq!(code(&fits)[0x7fff].args[0], OPERAND_LIMIT);
    }

    #[test]
    fn literals_must_fit_an_operand() {
        assert_eq!(
            error("if (imu.getPitch() > 32768) {}"),
            CodeGenError::OutOfRange(32768.0)
        );

        assert_eq!(code("if (imu.getPitch() > -32767) {}")[1].args[2], -0x7fff);
    }

    #[test]
    fn redeclaration() {
        let error = generate_str("int a = 1;\nif (imu.getPitch() > 1) { float a = 2; }").unwrap_err();

        assert_eq!(error.location().start().line(), 2);
        assert_eq!(error.into_inner(), CodeGenError::Redeclared(String::from("a")));
    }

    #[test]
    fn output_is_deterministic() {
        let program = "bool a = imu.getPitch() > 5; \
                       if (imu.getPitch() > 5 && imu.getYaw() < 3) { speaker.stop(); } \
                       else { all_leds.set_color(cyan); }";

        assert_eq!(code(program), code(program));
    }
}
