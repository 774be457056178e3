use gpr16::{
    assembler::{assemble_file_with, AssemblerOptions, Assembly},
    emulator::{Bus, Emulator, Memory},
    error::AssemblyError,
};

use clap::{App, Arg, ArgMatches};
use itertools::Itertools;
use slog::{o, Discard, Drain, Logger};
use slog_term::{FullFormat, TermDecorator};

const OPERAND_A: u16 = 0x100;
const OPERAND_B: u16 = 0x101;
const RESULT: u16 = 0x102;

enum Error {
    Assembly(AssemblyError),
    InvalidArgument { name: &'static str, value: String },
}

impl From<AssemblyError> for Error {
    fn from(e: AssemblyError) -> Error {
        Error::Assembly(e)
    }
}

fn parse_arguments() -> ArgMatches<'static> {
    App::new("gpr16run")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Utility for assembling and executing GPR16 programs")
        .arg(Arg::with_name("source")
             .help("File containing assembly source")
             .value_name("SOURCE")
             .default_value("addition.asm")
             .index(1))
        .arg(Arg::with_name("operand-a")
             .help("Word stored at 0x100 before execution (decimal or 0x...)")
             .long("operand-a")
             .short("a")
             .value_name("VALUE")
             .takes_value(true))
        .arg(Arg::with_name("operand-b")
             .help("Word stored at 0x101 before execution (decimal or 0x...)")
             .long("operand-b")
             .short("b")
             .value_name("VALUE")
             .takes_value(true))
        .arg(Arg::with_name("trace")
             .help("Prints the processor state after every instruction")
             .long("trace")
             .short("t"))
        .arg(Arg::with_name("verbose")
             .help("Enables verbose logging")
             .long("verbose")
             .short("v"))
        .arg(Arg::with_name("legacy-operands")
             .help("Accepts labels and literals as the source operand of register instructions")
             .long("legacy-operands"))
        .arg(Arg::with_name("max-cycles")
             .help("Stops the execution after N instructions")
             .long("max-cycles")
             .value_name("N")
             .takes_value(true))
        .get_matches()
}

/// Parses a decimal or `0x`-prefixed hexadecimal number. Bits above the sixteenth are dropped.
fn parse_word(name: &'static str, value: &str) -> Result<u16, Error> {
    let value = value.trim();

    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse::<u64>(),
    };

    parsed
        .map(|v| (v & 0xFFFF) as u16)
        .map_err(|_| Error::InvalidArgument { name, value: value.to_string() })
}

fn main() {
    let args = parse_arguments();

    let logger = if args.is_present("verbose") {
        let decorator = TermDecorator::new().build();
        let drain = FullFormat::new(decorator).build().fuse();
        let drain = slog_async::Async::new(drain).build().fuse();
        Logger::root(drain, o!())
    } else {
        Logger::root(Discard, o!())
    };

    match run(&args, logger) {
        Ok(()) => (),
        Err(Error::Assembly(err)) => {
            eprintln!("Assembly error at line {}: {}", err.line, err.kind);
            std::process::exit(1);
        }
        Err(Error::InvalidArgument { name, value }) => {
            eprintln!("Invalid value for --{}: '{}'", name, value);
            std::process::exit(1);
        }
    }
}

fn run(args: &ArgMatches, logger: Logger) -> Result<(), Error> {
    let source = args.value_of("source").unwrap_or("addition.asm");

    let options = AssemblerOptions::new()
        .legacy_value_operands(args.is_present("legacy-operands"));

    let mut memory = Bus::new();
    let assembly = assemble_file_with(source, &mut memory, &options, logger.clone())?;

    if let Some(a) = args.value_of("operand-a") {
        memory.set_data(OPERAND_A, parse_word("operand-a", a)?);
    }

    if let Some(b) = args.value_of("operand-b") {
        memory.set_data(OPERAND_B, parse_word("operand-b", b)?);
    }

    let max_cycles = match args.value_of("max-cycles") {
        Some(n) => Some(n.parse::<usize>().map_err(|_| Error::InvalidArgument {
            name: "max-cycles",
            value: n.to_string(),
        })?),
        None => None,
    };

    let trace = args.is_present("trace");

    let mut emulator = Emulator::new(memory);
    emulator.set_logger(logger);

    println!("\n=== GPR16 Emulator ===");
    println!("Program: {}", source);

    if trace {
        if !assembly.symbol_table.is_empty() {
            let labels = assembly
                .symbol_table
                .iter()
                .sorted_by_key(|(_, address)| *address)
                .map(|(label, address)| format!("{}=0x{:04x}", label, address))
                .join(", ");

            println!("Labels: {}", labels);
        }

        print_trace_header();
    }

    let mut cycles = 0;

    while !emulator.is_halted() && max_cycles.map_or(true, |limit| cycles < limit) {
        let pc = emulator.pc();
        let instruction = emulator.get_current_instruction();

        if emulator.step() {
            cycles += 1;
        }

        if trace {
            print_trace_row(&emulator, pc, &instruction.to_string(), &assembly);
        }
    }

    if emulator.is_halted() {
        println!("\n--- HALTED ---");
    } else {
        println!("\n--- CYCLE LIMIT REACHED ---");
    }

    let r0 = emulator.registers()[0];
    let result = emulator.memory.get_data(RESULT);

    println!("Total cycles: {}", cycles);
    println!("R0: {} (0x{:04x})", r0, r0);
    println!("Result at 0x{:03x}: {} (0x{:04x})", RESULT, result, result);

    Ok(())
}

fn print_trace_header() {
    println!("\n  PC    | R0   R1   R2   R3   R4   R5   R6   R7   | Z C N | Line | Instruction");
    println!("--------+-----------------------------------------+-------+------+----------------");
}

fn print_trace_row<M: Memory>(emulator: &Emulator<M>, pc: u16, instruction: &str, assembly: &Assembly) {
    let flags = emulator.flags();

    let registers = emulator
        .registers()
        .iter()
        .map(|r| format!("{:04x}", r))
        .join(" ");

    let line = assembly
        .source_map
        .get_source_line(pc)
        .map(|line| line.to_string())
        .unwrap_or_default();

    println!(
        "  {:04x}  | {} | {} {} {} | {:>4} | {}",
        pc,
        registers,
        flags.zero() as u8,
        flags.carry() as u8,
        flags.negative() as u8,
        line,
        instruction,
    );
}
