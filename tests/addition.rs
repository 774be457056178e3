use gpr16::{
    assembler::{assemble, assemble_with, AssemblerOptions, Assembly},
    emulator::{Bus, Emulator, Memory},
    instruction::{Instruction, OpCode, Register},
};

use slog::{o, Drain, Logger};
use slog_term::{FullFormat, PlainSyncDecorator, TestStdoutWriter};

fn test_logger() -> Logger {
    let decorator = PlainSyncDecorator::new(TestStdoutWriter);
    let drain = FullFormat::new(decorator).build().fuse();
    Logger::root(drain, o!())
}

fn assemble_program() -> (Bus, Assembly) {
    let source = include_str!("addition.asm");

    let mut memory = Bus::new();
    let assembly = assemble_with(source, &mut memory, &AssemblerOptions::default(), test_logger())
        .expect("could not assemble addition.asm");

    (memory, assembly)
}

#[test]
fn test_addition_assemble_program() {
    let (memory, assembly) = assemble_program();

    assert_eq!(&memory.as_slice()[..9], &[
        0x1300, // MOVI  R1, 0x100
        0x3440, // LOAD  R2, (R1)
        0x1301, // MOVI  R1, 0x101
        0x3640, // LOAD  R3, (R1)
        0x54C0, // ADD   R2, R3
        0x1302, // MOVI  R1, 0x102
        0x4440, // STORE R2, (R1)
        0x2080, // MOV   R0, R2
        0x0000, // HALT
    ]);

    assert_eq!(memory.get_instruction(4).opcode(), OpCode::Add);
    assert_eq!(memory.get_instruction(6), Instruction::register_form(OpCode::Store, Register::R2, Register::R1));

    assert_eq!(assembly.symbol_table.get("start"), Some(0));
    assert_eq!(assembly.words_emitted, 9);
    assert_eq!(assembly.source_map.get_source_line(0), Some(5));
    assert_eq!(assembly.source_map.get_source_line(8), Some(13));
    assert_eq!(assembly.source_map.get_source_line(9), None);
}

#[test]
fn test_addition_emulate_program() {
    let cases = vec![
        (13, 15, 28),
        (0, 0, 0),
        (0xFFFF, 1, 0),
        (40000, 30000, 4464),
    ];

    for (a, b, sum) in cases {
        let (mut memory, _) = assemble_program();
        memory.set_data(0x100, a);
        memory.set_data(0x101, b);

        let mut emulator = Emulator::new(memory);
        emulator.set_logger(test_logger());

        assert_eq!(emulator.run(), 8);
        assert!(emulator.is_halted());

        assert_eq!(emulator.registers()[0], sum);
        assert_eq!(emulator.memory.get_data(0x102), sum);
        assert_eq!(emulator.flags().zero(), sum == 0);
    }
}

#[test]
fn test_movi_halt_runs_in_two_steps() {
    let mut memory = Bus::new();
    assemble("MOVI R0, 5\nHALT\n", &mut memory).unwrap();

    let mut emulator = Emulator::new(memory);

    assert!(emulator.step());
    assert!(!emulator.step());
    assert_eq!(emulator.registers()[0], 5);
    assert!(emulator.is_halted());

    emulator.reset();
    assert_eq!(emulator.run(), 1);
}
