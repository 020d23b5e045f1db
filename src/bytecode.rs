//! Formato de bytecode.
//!
//! Un programa compilado es una secuencia plana de instrucciones de
//! ancho fijo. Cada instrucción ocupa exactamente cinco operandos
//! consecutivos `{opcode, arg1, arg2, arg3, arg4}`, sin prefijos de
//! longitud ni delimitadores. La posición de una instrucción en la
//! secuencia es su dirección: los saltos apuntan a índices de
//! instrucción, no a índices de operando.
//!
//! # Registro
//! La máquina virtual del firmware no tiene banco de registros. El único
//! valor implícito es la última lectura de sensor, a la cual se hace
//! referencia con el operando reservado [`REGISTER`]. Ningún literal
//! legítimo puede colisionar con este valor, ver [`OPERAND_LIMIT`].
//!
//! # Serialización
//! Al transmitirse al robot, cada operando se codifica como una palabra
//! de 16 bits little-endian. Los literales negativos usan complemento a
//! dos, de modo que [`REGISTER`] es la única palabra `0x8000` posible.

use std::fmt::{self, Display};
use thiserror::Error;

/// Un operando de instrucción.
pub type Operand = i32;

/// Operando reservado: "el valor leído más recientemente por `READ_SENSOR`".
pub const REGISTER: Operand = 0x8000;

/// Magnitud máxima de un operando literal.
pub const OPERAND_LIMIT: Operand = 0x7fff;

/// Código de operación.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    End = 0,
    DeclareVar = 1,
    ReadSensor = 2,
    Compare = 3,
    JumpIfFalse = 4,
    Jump = 5,
    SetAllLeds = 6,
    SetLed = 7,
    PlayTune = 8,
    PlayTone = 9,
    StopSound = 10,
}

impl Opcode {
    const ALL: &'static [Opcode] = &[
        Opcode::End,
        Opcode::DeclareVar,
        Opcode::ReadSensor,
        Opcode::Compare,
        Opcode::JumpIfFalse,
        Opcode::Jump,
        Opcode::SetAllLeds,
        Opcode::SetLed,
        Opcode::PlayTune,
        Opcode::PlayTone,
        Opcode::StopSound,
    ];

    /// Valor numérico en el flujo de bytecode.
    pub fn code(self) -> Operand {
        self as u8 as Operand
    }

    /// Búsqueda inversa a partir del valor numérico.
    pub fn from_code(code: Operand) -> Option<Self> {
        Opcode::ALL.iter().copied().find(|opcode| opcode.code() == code)
    }

    /// Nombre simbólico.
    pub fn mnemonic(self) -> &'static str {
        use Opcode::*;

        match self {
            End         => "END",
            DeclareVar  => "DECLARE_VAR",
            ReadSensor  => "READ_SENSOR",
            Compare     => "COMPARE",
            JumpIfFalse => "JUMP_IF_FALSE",
            Jump        => "JUMP",
            SetAllLeds  => "SET_ALL_LEDS",
            SetLed      => "SET_LED",
            PlayTune    => "PLAY_TUNE",
            PlayTone    => "PLAY_TONE",
            StopSound   => "STOP_SOUND",
        }
    }
}

impl Display for Opcode {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(self.mnemonic())
    }
}

/// Operador de comparación, con su código en `COMPARE`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl CompareOp {
    const ALL: &'static [CompareOp] = &[
        CompareOp::Equal,
        CompareOp::NotEqual,
        CompareOp::Less,
        CompareOp::LessOrEqual,
        CompareOp::Greater,
        CompareOp::GreaterOrEqual,
    ];

    pub fn code(self) -> Operand {
        match self {
            CompareOp::Equal => 0,
            CompareOp::NotEqual => 1,
            CompareOp::Less => 2,
            CompareOp::LessOrEqual => 3,
            CompareOp::Greater => 4,
            CompareOp::GreaterOrEqual => 5,
        }
    }

    pub fn from_code(code: Operand) -> Option<Self> {
        CompareOp::ALL.iter().copied().find(|op| op.code() == code)
    }

    /// Solo `==` y `!=` tienen sentido sobre lecturas booleanas.
    pub fn is_equality(self) -> bool {
        matches!(self, CompareOp::Equal | CompareOp::NotEqual)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Equal => "==",
            CompareOp::NotEqual => "!=",
            CompareOp::Less => "<",
            CompareOp::LessOrEqual => "<=",
            CompareOp::Greater => ">",
            CompareOp::GreaterOrEqual => ">=",
        }
    }
}

impl Display for CompareOp {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(self.symbol())
    }
}

/// Tipo declarado de una variable, con su código en `DECLARE_VAR`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VarType {
    Bool,
    Int,
    Float,
}

impl VarType {
    pub fn code(self) -> Operand {
        match self {
            VarType::Bool => 0,
            VarType::Int => 1,
            VarType::Float => 2,
        }
    }

    pub fn from_code(code: Operand) -> Option<Self> {
        [VarType::Bool, VarType::Int, VarType::Float]
            .into_iter()
            .find(|typ| typ.code() == code)
    }
}

impl Display for VarType {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarType::Bool => fmt.write_str("bool"),
            VarType::Int => fmt.write_str("int"),
            VarType::Float => fmt.write_str("float"),
        }
    }
}

/// Una instrucción de ancho fijo.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub args: [Operand; 4],
}

impl Instruction {
    /// Cantidad de operandos que ocupa cada instrucción, opcode incluido.
    pub const STRIDE: usize = 5;

    pub fn new(opcode: Opcode, args: [Operand; 4]) -> Self {
        Instruction { opcode, args }
    }

    /// Los cinco operandos, en orden de emisión.
    pub fn words(&self) -> [Operand; Instruction::STRIDE] {
        let [a1, a2, a3, a4] = self.args;
        [self.opcode.code(), a1, a2, a3, a4]
    }
}

/// Error al reconstruir bytecode desde su forma plana.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Input has an odd number of bytes")]
    OddLength,

    #[error("{0} trailing operands do not form a whole instruction")]
    PartialInstruction(usize),

    #[error("Unknown opcode {code} at instruction {index}")]
    BadOpcode { index: usize, code: Operand },
}

/// Un programa compilado.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bytecode(Vec<Instruction>);

impl Bytecode {
    /// Instrucciones, en orden.
    pub fn instructions(&self) -> &[Instruction] {
        &self.0
    }

    /// Cantidad de instrucciones.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Forma plana, cinco operandos por instrucción.
    pub fn words(&self) -> Vec<Operand> {
        self.0.iter().flat_map(Instruction::words).collect()
    }

    /// Forma serializada, una palabra de 16 bits little-endian por operando.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.words()
            .into_iter()
            .flat_map(|word| (word as u16).to_le_bytes())
            .collect()
    }

    /// Reconstruye desde la forma plana.
    pub fn from_words(words: &[Operand]) -> Result<Self, DecodeError> {
        let trailing = words.len() % Instruction::STRIDE;
        if trailing != 0 {
            return Err(DecodeError::PartialInstruction(trailing));
        }

        words
            .chunks_exact(Instruction::STRIDE)
            .enumerate()
            .map(|(index, chunk)| {
                Opcode::from_code(chunk[0])
                    .map(|opcode| Instruction::new(opcode, [chunk[1], chunk[2], chunk[3], chunk[4]]))
                    .ok_or(DecodeError::BadOpcode {
                        index,
                        code: chunk[0],
                    })
            })
            .collect::<Result<_, _>>()
            .map(Bytecode)
    }

    /// Reconstruye desde la forma serializada.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() % 2 != 0 {
            return Err(DecodeError::OddLength);
        }

        let words: Vec<Operand> = bytes
            .chunks_exact(2)
            .map(|pair| match u16::from_le_bytes([pair[0], pair[1]]) {
                word if word as Operand == REGISTER => REGISTER,
                word => Operand::from(word as i16),
            })
            .collect();

        Bytecode::from_words(&words)
    }
}

impl From<Vec<Instruction>> for Bytecode {
    fn from(instructions: Vec<Instruction>) -> Self {
        Bytecode(instructions)
    }
}
