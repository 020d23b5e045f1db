//! Compilador de programas para el robot educativo.
//!
//! # Front end
//! Cada programa deriva de un único texto fuente, con sintaxis similar
//! a C++. Este texto se somete primero a análisis léxico en [`lex`], de
//! lo cual se obtiene un flujo de tokens. El flujo de tokens se dispone
//! en una lista de sentencias por medio de análisis sintáctico en
//! [`parse`]. Durante el análisis sintáctico cada llamada a método se
//! resuelve contra la tabla estática de sensores y actuadores en
//! [`table`].
//!
//! # Back end
//! Las sentencias se traducen en [`codegen`] a instrucciones de ancho
//! fijo, descritas en [`bytecode`], para la máquina virtual que ejecuta
//! el firmware del robot. Los saltos de control de flujo se resuelven
//! por backpatching. El resultado puede inspeccionarse con [`disasm`].
//!
//! La compilación es una función pura del texto: no hay estado entre
//! llamadas ni E/S, por lo cual se puede invocar concurrentemente.
//! El primer error de cualquier fase aborta la compilación, ver
//! [`error::CompileError`].

#[macro_use]
mod macros;

pub mod bytecode;
pub mod codegen;
pub mod disasm;
pub mod error;
pub mod lex;
pub mod parse;
pub mod source;
pub mod table;

use crate::{
    bytecode::Bytecode,
    error::CompileError,
    source::{Location, Source},
};

/// Compila un programa sin nombre de origen.
pub fn compile(source: &str) -> Result<Bytecode, CompileError> {
    compile_named("<input>", source)
}

/// Compila un programa, usando `name` para identificarlo en errores.
pub fn compile_named(name: &str, text: &str) -> Result<Bytecode, CompileError> {
    let source = Source::new(name, text);

    let tokens = lex::tokenize(&source)?;
    let program = parse::parse(&tokens, Location::start_of(&source))?;
    let bytecode = codegen::generate(&program)?;

    log::debug!("{}: compiled to {} instructions", name, bytecode.len());
    Ok(bytecode)
}
