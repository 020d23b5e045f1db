//! Búfer de instrucciones.
//!
//! El firmware no tiene registros de propósito general: solo existe un
//! acumulador que contiene la última lectura de sensor. [`Emitter::read`]
//! produce un [`Reading`] que no es `Copy` y que [`Emitter::compare`]
//! consume, de modo que cada lectura alimenta a exactamente un `COMPARE`.
//!
//! Los saltos se emiten con un destino provisional y se registran como
//! [`PendingJump`], que luego se resuelve con [`Emitter::patch`].

use crate::{
    bytecode::{Bytecode, CompareOp, Instruction, Opcode, Operand, OPERAND_LIMIT, REGISTER},
    table::Sensor,
};

use super::CodeGenError;

/// Lectura viva en el acumulador.
#[must_use]
pub struct Reading(());

/// Salto cuyo destino aún no se conoce.
#[must_use]
pub struct PendingJump {
    at: usize,
}

#[derive(Default)]
pub struct Emitter {
    code: Vec<Instruction>,
}

impl Emitter {
    /// Dirección que tendrá la siguiente instrucción emitida.
    pub fn next_address(&self) -> usize {
        self.code.len()
    }

    pub fn push(&mut self, opcode: Opcode, args: [Operand; 4]) -> usize {
        let at = self.code.len();
        log::trace!("{:>4}: {:<13} {:?}", at, opcode, args);

        self.code.push(Instruction::new(opcode, args));
        at
    }

    pub fn read(&mut self, sensor: Sensor) -> Reading {
        emit!(self, Opcode::ReadSensor, Operand::from(sensor.code()));
        Reading(())
    }

    /// Lectura cuyo valor queda en el acumulador sin compararse.
    pub fn sample(&mut self, sensor: Sensor) {
        let Reading(()) = self.read(sensor);
    }

    pub fn compare(&mut self, reading: Reading, op: CompareOp, literal: Operand) {
        let Reading(()) = reading;
        emit!(self, Opcode::Compare, op.code(), REGISTER, literal);
    }

    pub fn jump_if_false(&mut self) -> PendingJump {
        PendingJump {
            at: emit!(self, Opcode::JumpIfFalse, 0),
        }
    }

    pub fn jump(&mut self) -> PendingJump {
        PendingJump {
            at: emit!(self, Opcode::Jump, 0),
        }
    }

    /// Resuelve un salto pendiente hacia `target`.
    pub fn patch(&mut self, jump: PendingJump, target: usize) -> Result<(), CodeGenError> {
        let PendingJump { at } = jump;
        log::trace!("patch {} -> {}", at, target);

        self.code[at].args[0] = operand(target).ok_or(CodeGenError::ProgramTooLarge(target))?;
        Ok(())
    }

    /// Cierra el programa con `END`.
    pub fn finish(mut self) -> Bytecode {
        emit!(self, Opcode::End);
        Bytecode::from(self.code)
    }
}

/// Dirección o slot como operando, si no choca con [`REGISTER`].
pub fn operand(value: usize) -> Option<Operand> {
    Operand::try_from(value)
        .ok()
        .filter(|&value| value <= OPERAND_LIMIT)
}

/// Rellena con ceros los argumentos no usados.
pub fn args(values: &[Operand]) -> [Operand; 4] {
    let mut args = [0; 4];
    for (arg, value) in args.iter_mut().zip(values) {
        *arg = *value;
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jumps_are_patched_in_place() {
        let mut emitter = Emitter::default();

        let reading = emitter.read(Sensor::PITCH);
        emitter.compare(reading, CompareOp::Greater, 10);
        let exit = emitter.jump_if_false();
        emit!(emitter, Opcode::StopSound);

        let target = emitter.next_address();
        emitter.patch(exit, target).unwrap();

        let bytecode = emitter.finish();
        let code = bytecode.instructions();

        assert_eq!(code.len(), 5);
        assert_eq!(code[2], Instruction::new(Opcode::JumpIfFalse, [4, 0, 0, 0]));
        assert_eq!(code[4].opcode, Opcode::End);
    }

    #[test]
    fn targets_past_the_operand_range_are_rejected() {
        let mut emitter = Emitter::default();
        let exit = emitter.jump();

        let limit = OPERAND_LIMIT as usize;
        assert_eq!(
            emitter.patch(exit, limit + 1),
            Err(CodeGenError::ProgramTooLarge(limit + 1))
        );

        let exit = emitter.jump();
        assert_eq!(emitter.patch(exit, limit), Ok(()));
        assert_eq!(emitter.finish().instructions()[1].args[0], OPERAND_LIMIT);
    }

    #[test]
    fn addresses_never_reach_the_register_word() {
        assert_eq!(operand(0), Some(0));
        assert_eq!(operand(0x7fff), Some(OPERAND_LIMIT));
        assert_eq!(operand(0x8000), None);
        assert_eq!(operand(usize::MAX), None);
    }

    #[test]
    fn unused_arguments_are_zero() {
        assert_eq!(args(&[]), [0; 4]);
        assert_eq!(args(&[7, 8]), [7, 8, 0, 0]);
    }
}
