//! Punto de entrada ("driver").
//!
//! Este módulo orquesta las diferentes fases del proceso de
//! compilación y expone una CLI.

use anyhow::{self, bail, Context};
use clap::{crate_version, Arg, ArgAction, Command};
use robotc::{
    bytecode::Bytecode,
    disasm::{Listing, ListingOptions},
    error::Diagnostics,
};

use std::{
    fs::{self, File},
    io::{self, Read, Write},
    process,
};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = cli().get_matches();

    // Se extraen argumentos necesarios
    let input = args
        .get_one::<String>("input")
        .context("Missing input file")?;

    let output = args
        .get_one::<String>("output")
        .context("Missing output file")?;

    let format = args
        .get_one::<String>("format")
        .map_or("binary", String::as_str);

    let mut options = ListingOptions::default();
    if args.get_flag("no-addresses") {
        options.remove(ListingOptions::ADDRESSES);
    }

    if args.get_flag("raw") {
        options |= ListingOptions::RAW_WORDS;
    }

    let contents = read_input(input)?;

    if args.get_flag("disassemble") {
        let bytecode = Bytecode::from_bytes(&contents)
            .with_context(|| format!("Malformed bytecode: {}", input))?;

        let listing = Listing::new(&bytecode, options).to_string();
        return write_output(output, listing.as_bytes());
    }

    let text = String::from_utf8(contents)
        .with_context(|| format!("Source is not valid UTF-8: {}", input))?;

    let name = if input == "-" { "<stdin>" } else { input.as_str() };
    let bytecode = match robotc::compile_named(name, &text) {
        Ok(bytecode) => bytecode,
        Err(error) => {
            eprint!("{}", Diagnostics::from(error));
            process::exit(1);
        }
    };

    let rendered = match (format, output.as_str()) {
        ("binary", "-") => bail!("Refusing to write binary bytecode to stdout"),
        ("binary", _) => bytecode.to_bytes(),

        ("words", _) => {
            let mut words = String::new();
            for instruction in bytecode.instructions() {
                let line: Vec<_> = instruction.words().iter().map(ToString::to_string).collect();
                words.push_str(&line.join(" "));
                words.push('\n');
            }

            words.into_bytes()
        }

        _ => Listing::new(&bytecode, options).to_string().into_bytes(),
    };

    write_output(output, &rendered)
}

/// Definición de la CLI.
fn cli() -> Command {
    Command::new("robotc")
        .about("Compiler for robot programs")
        .version(crate_version!())
        .arg(
            Arg::new("input")
                .value_name("INPUT")
                .required(true)
                .help("Source file, or compiled bytecode with -d ('-' for stdin)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .required(true)
                .help("Output file ('-' for stdout, except for binary output)"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .default_value("binary")
                .value_parser(["binary", "words", "listing"])
                .help("Output format"),
        )
        .arg(
            Arg::new("disassemble")
                .short('d')
                .long("disassemble")
                .action(ArgAction::SetTrue)
                .conflicts_with("format")
                .help("Read compiled bytecode and print a listing (no -f)"),
        )
        .arg(
            Arg::new("no-addresses")
                .long("no-addresses")
                .action(ArgAction::SetTrue)
                .help("Omit instruction addresses from listings"),
        )
        .arg(
            Arg::new("raw")
                .long("raw")
                .action(ArgAction::SetTrue)
                .help("Append raw operands to each listing line"),
        )
}

fn read_input(path: &str) -> anyhow::Result<Vec<u8>> {
    if path == "-" {
        let mut contents = Vec::new();
        io::stdin()
            .read_to_end(&mut contents)
            .context("Failed to read from stdin")?;

        Ok(contents)
    } else {
        fs::read(path).with_context(|| format!("Failed to read: {}", path))
    }
}

fn write_output(path: &str, contents: &[u8]) -> anyhow::Result<()> {
    if path == "-" {
        io::stdout()
            .write_all(contents)
            .context("Failed to write to stdout")
    } else {
        let mut file = File::create(path)
            .with_context(|| format!("Failed to open for writing: {}", path))?;

        file.write_all(contents)
            .with_context(|| format!("Failed to write to file: {}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn disassembly_rejects_an_output_format() {
        let words = ["robotc", "-d", "-f", "words", "-o", "-", "program.bin"];
        assert!(cli().try_get_matches_from(words).is_err());

        let args = cli()
            .try_get_matches_from(["robotc", "-d", "-o", "-", "program.bin"])
            .unwrap();

        assert!(args.get_flag("disassemble"));
    }
}
