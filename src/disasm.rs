//! Desensamblado.
//!
//! Presenta bytecode como un listado legible: una instrucción por línea,
//! con mnemónicos, nombres de sensores y colores en vez de códigos, y
//! destinos de salto explícitos.

use bitflags::bitflags;
use std::fmt::{self, Display};

use crate::{
    bytecode::{Bytecode, CompareOp, Instruction, Opcode, Operand, VarType, REGISTER},
    lex::Tune,
    table::Sensor,
};

bitflags! {
    /// Opciones de presentación del listado.
    pub struct ListingOptions: u32 {
        /// Prefijar cada línea con la dirección de la instrucción.
        const ADDRESSES = 0x01;

        /// Agregar los cinco operandos crudos como comentario.
        const RAW_WORDS = 0x02;
    }
}

impl Default for ListingOptions {
    fn default() -> Self {
        ListingOptions::ADDRESSES
    }
}

/// Listado de un programa, ver [`Display`].
pub struct Listing<'a> {
    bytecode: &'a Bytecode,
    options: ListingOptions,
}

impl<'a> Listing<'a> {
    pub fn new(bytecode: &'a Bytecode, options: ListingOptions) -> Self {
        Listing { bytecode, options }
    }
}

impl Display for Listing<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (address, instruction) in self.bytecode.instructions().iter().enumerate() {
            if self.options.contains(ListingOptions::ADDRESSES) {
                write!(fmt, "{:>4}: ", address)?;
            }

            let operands = operands(instruction);
            if operands.is_empty() {
                write!(fmt, "{}", instruction.opcode)?;
            } else {
                write!(fmt, "{:<13} {}", instruction.opcode.mnemonic(), operands)?;
            }

            if self.options.contains(ListingOptions::RAW_WORDS) {
                let words: Vec<_> = instruction.words().iter().map(Operand::to_string).collect();
                write!(fmt, "  ; {}", words.join(" "))?;
            }

            writeln!(fmt)?;
        }

        Ok(())
    }
}

fn operands(instruction: &Instruction) -> String {
    let [a1, a2, a3, a4] = instruction.args;

    match instruction.opcode {
        Opcode::End | Opcode::StopSound => String::new(),

        Opcode::DeclareVar => {
            let typ = VarType::from_code(a2).map_or_else(|| format!("?{}", a2), |typ| typ.to_string());
            if a4 == 1 {
                format!("slot {}, {} = {}", a1, typ, a3)
            } else {
                format!("slot {}, {}", a1, typ)
            }
        }

        Opcode::ReadSensor => match Sensor::from_code(a1) {
            Some(sensor) => sensor.name().to_owned(),
            None => format!("?{}", a1),
        },

        Opcode::Compare => {
            let op = CompareOp::from_code(a1).map_or_else(|| format!("?{}", a1), |op| op.to_string());
            format!("{} {} {}", register(a2), op, a3)
        }

        Opcode::JumpIfFalse | Opcode::Jump => format!("-> {}", a1),

        Opcode::SetAllLeds => format!("{}, {}, {}", a1, a2, a3),

        Opcode::SetLed => {
            let led = match a1 {
                0 => String::from("left"),
                1 => String::from("right"),
                other => format!("?{}", other),
            };

            format!("{}, {}, {}, {}", led, a2, a3, a4)
        }

        Opcode::PlayTune => match Tune::from_id(a1) {
            Some(tune) => tune.to_string(),
            None => format!("?{}", a1),
        },

        Opcode::PlayTone => format!("{} Hz, {} ms", a1, a2),
    }
}

fn register(operand: Operand) -> String {
    if operand == REGISTER {
        String::from("r")
    } else {
        operand.to_string()
    }
}
