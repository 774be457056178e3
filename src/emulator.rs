//! [Emulator] for executing programs placed in a [Memory].

use slog::{debug, o, trace, Discard, Logger};

use crate::event::{Event, EventDispatcher, EventListener};
use crate::instruction::{Instruction, OpCode, Register, SCRATCH_REGISTER};

/// Number of words in a [Bus] created with [Bus::new]. Covers the whole 16-bit address space.
pub const MEMORY_SIZE: usize = 0x10000;

/// Contains the execution environment of the GPR16 processor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    /// The Program Counter stores the address of the next instruction to be executed.
    pub pc: u16,

    /// Array containing values for all the eight general purpose registers.
    pub r: [u16; 8],

    /// The condition flags set by the latest flag-touching instruction.
    pub flags: Flags,
}

/// Represents the flags register.
///
/// Every ALU, move and load instruction replaces all three flags based on its own result.
/// The flags are never a function of their previous state. `MOVI` into the
/// [scratch register](SCRATCH_REGISTER) is the one move that leaves them alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    zero: bool,
    carry: bool,
    negative: bool,
}

const FLAG_ZERO: u16 = 1 << 0;
const FLAG_CARRY: u16 = 1 << 1;
const FLAG_NEGATIVE: u16 = 1 << 2;

impl Flags {
    /// Flags for a result with the carry flag cleared.
    pub fn from_result(result: u16) -> Flags {
        Flags {
            zero: result == 0,
            carry: false,
            negative: result & 0x8000 != 0,
        }
    }

    pub fn with_carry(mut self, carry: bool) -> Flags {
        self.carry = carry;
        self
    }

    /// Set when the result was zero.
    pub fn zero(&self) -> bool {
        self.zero
    }

    /// Set on unsigned overflow from `ADD`, when `SUB` did not borrow,
    /// or when a shift discarded a set bit.
    pub fn carry(&self) -> bool {
        self.carry
    }

    /// Set when bit 15 of the result was set.
    pub fn negative(&self) -> bool {
        self.negative
    }

    pub fn as_word(&self) -> u16 {
        let mut word = 0;

        if self.zero {
            word |= FLAG_ZERO;
        }

        if self.carry {
            word |= FLAG_CARRY;
        }

        if self.negative {
            word |= FLAG_NEGATIVE;
        }

        word
    }

    pub fn from_word(word: u16) -> Flags {
        Flags {
            zero: word & FLAG_ZERO != 0,
            carry: word & FLAG_CARRY != 0,
            negative: word & FLAG_NEGATIVE != 0,
        }
    }
}

/// Trait for implementing the memory of a GPR16 processor.
///
/// Addresses at or past the [capacity](Memory::capacity) are out of range. Reading them yields
/// zero and writing them does nothing; the processor has no way of signaling memory faults.
pub trait Memory {
    /// Number of addressable words.
    fn capacity(&self) -> usize;

    /// Fetch the data word from the specified address.
    fn get_data(&self, addr: u16) -> u16;

    /// Overwrite the data word in the specified address.
    fn set_data(&mut self, addr: u16, data: u16);

    /// Fetch the instruction from the specified address.
    fn get_instruction(&self, addr: u16) -> Instruction {
        Instruction::from(self.get_data(addr))
    }
}

impl Memory for Vec<u16> {
    fn capacity(&self) -> usize {
        self.len()
    }

    fn get_data(&self, addr: u16) -> u16 {
        self.get(addr as usize).copied().unwrap_or(0)
    }

    fn set_data(&mut self, addr: u16, data: u16) {
        if let Some(word) = self.get_mut(addr as usize) {
            *word = data;
        }
    }
}

impl<M> Memory for &mut M where M: Memory + ?Sized {
    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    fn get_data(&self, addr: u16) -> u16 {
        (**self).get_data(addr)
    }

    fn set_data(&mut self, addr: u16, data: u16) {
        (**self).set_data(addr, data)
    }
}

/// Zero-initialized memory of a fixed size.
#[derive(Clone, Debug, PartialEq)]
pub struct Bus {
    memory: Box<[u16]>,
}

impl Bus {
    /// Creates a memory spanning the whole address space.
    pub fn new() -> Bus {
        Bus::with_capacity(MEMORY_SIZE)
    }

    /// Creates a memory of `capacity` words. Capacities over [MEMORY_SIZE] are clamped.
    pub fn with_capacity(capacity: usize) -> Bus {
        Bus {
            memory: vec![0; std::cmp::min(capacity, MEMORY_SIZE)].into_boxed_slice(),
        }
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.memory
    }
}

impl Default for Bus {
    fn default() -> Bus {
        Bus::new()
    }
}

impl Memory for Bus {
    fn capacity(&self) -> usize {
        self.memory.len()
    }

    fn get_data(&self, addr: u16) -> u16 {
        self.memory.get(addr as usize).copied().unwrap_or(0)
    }

    fn set_data(&mut self, addr: u16, data: u16) {
        if let Some(word) = self.memory.get_mut(addr as usize) {
            *word = data;
        }
    }
}

/// Utility struct for implementing methods in the context of emulating a single instruction.
struct InstructionEmulationContext<'e, M> {
    /// The emulator in whose context the instruction is being emulated.
    emulator: &'e mut Emulator<M>,

    /// The instruction that we are currently emulating.
    instruction: Instruction,

    /// The address the instruction was fetched from.
    address: u16,
}

impl<'e, M> InstructionEmulationContext<'e, M> where M: Memory {
    /// Returns value of the destination register.
    fn first_operand(&self) -> u16 {
        self.emulator.context.r[self.instruction.rd().index()]
    }

    /// Returns value of the source register.
    fn second_operand(&self) -> u16 {
        self.emulator.context.r[self.instruction.rs().index()]
    }

    fn set_first_operand(&mut self, value: u16) {
        let register = self.instruction.rd();
        let slot = &mut self.emulator.context.r[register.index()];

        if *slot != value {
            *slot = value;
            self.emulator.events.dispatch(Event::RegisterChange { register, data: value });
        }
    }

    fn set_flags(&mut self, flags: Flags) {
        if self.emulator.context.flags != flags {
            self.emulator.context.flags = flags;
            self.emulator.events.dispatch(Event::FlagsChange { flags });
        }
    }

    /// Stores the result into the destination register and replaces the flags.
    fn set_result(&mut self, result: u16, carry: bool) {
        self.set_first_operand(result);
        self.set_flags(Flags::from_result(result).with_carry(carry));
    }

    fn write_memory(&mut self, address: u16, data: u16) {
        let memory = &mut self.emulator.memory;
        let before = memory.get_data(address);
        memory.set_data(address, data);

        if memory.get_data(address) != before {
            self.emulator.events.dispatch(Event::MemoryChange { address, data });
        }
    }

    fn jump(&mut self, target: u16) {
        self.emulator.context.pc = target;
        self.emulator.events.dispatch(Event::Jump { from: self.address, to: target });
    }

    /// Execute the instruction.
    fn emulate(&mut self) {
        match self.instruction.opcode() {
            OpCode::Halt => {
                self.emulator.halted = true;
                self.emulator.events.dispatch(Event::Halt { address: self.address });
            }
            OpCode::MoveImmediate => {
                let imm = self.instruction.imm9();

                if self.instruction.rd() == SCRATCH_REGISTER {
                    self.set_first_operand(imm);
                } else {
                    self.set_result(imm, false);
                }
            }
            OpCode::Move => {
                let op2 = self.second_operand();
                self.set_result(op2, false);
            }
            OpCode::Load => {
                let addr = self.second_operand();
                let value = self.emulator.memory.get_data(addr);
                self.set_result(value, false);
            }
            OpCode::Store => {
                let addr = self.second_operand();
                let value = self.first_operand();
                self.write_memory(addr, value);
            }
            OpCode::Add => {
                let (result, carry) = self.first_operand().overflowing_add(self.second_operand());
                self.set_result(result, carry);
            }
            OpCode::Subtract => {
                let op1 = self.first_operand();
                let op2 = self.second_operand();
                self.set_result(op1.wrapping_sub(op2), op1 >= op2);
            }
            OpCode::And => {
                let result = self.first_operand() & self.second_operand();
                self.set_result(result, false);
            }
            OpCode::Or => {
                let result = self.first_operand() | self.second_operand();
                self.set_result(result, false);
            }
            OpCode::Xor => {
                let result = self.first_operand() ^ self.second_operand();
                self.set_result(result, false);
            }
            OpCode::Not => {
                let result = !self.second_operand();
                self.set_result(result, false);
            }
            OpCode::ShiftLeft => {
                let op1 = self.first_operand();
                self.set_result(op1 << 1, op1 & 0x8000 != 0);
            }
            OpCode::ShiftRight => {
                let op1 = self.first_operand();
                self.set_result(op1 >> 1, op1 & 0x0001 != 0);
            }
            OpCode::Jump => {
                let target = self.second_operand();
                self.jump(target);
            }
            OpCode::JumpZero => {
                if self.emulator.context.flags.zero() {
                    let target = self.second_operand();
                    self.jump(target);
                }
            }
            OpCode::NoOperation => (),
        }
    }
}

/// The emulator contains all neccessary context for executing a GPR16 program.
pub struct Emulator<Mem> {
    /// The memory of the emulated machine.
    /// Contains all the instructions and data required by the program.
    /// Implements [Memory].
    pub memory: Mem,

    /// The execution context, which includes the registers and flags of the CPU.
    pub context: Context,

    halted: bool,
    logger: Logger,
    events: EventDispatcher,
}

impl<Mem> std::fmt::Debug for Emulator<Mem> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Emulator")
            .field("context", &self.context)
            .field("halted", &self.halted)
            .finish()
    }
}

impl<Mem> Emulator<Mem> where Mem: Memory {
    /// Create a new emulator with zeroed registers, flags and program counter.
    ///
    /// # Parameters
    /// - `memory`: A [Memory](Memory) object which has the program.
    pub fn new(memory: Mem) -> Emulator<Mem> {
        Emulator {
            memory,
            context: Context::default(),
            halted: false,
            logger: Logger::root(Discard, o!()),
            events: EventDispatcher::new(),
        }
    }

    pub fn set_logger<L: Into<Option<Logger>>>(&mut self, logger: L) {
        self.logger = logger
            .into()
            .unwrap_or_else(|| Logger::root(Discard, o!()))
            .new(o!("stage" => "execution"));
    }

    /// Registers a listener that is notified of every state change made by the program.
    pub fn add_listener<L: EventListener + 'static>(&mut self, listener: L) {
        self.events.add_listener(listener);
    }

    /// Clears the registers, flags, program counter and the halted state.
    /// The memory is left untouched.
    pub fn reset(&mut self) {
        self.context = Context::default();
        self.halted = false;
    }

    pub fn registers(&self) -> &[u16; 8] {
        &self.context.r
    }

    pub fn register(&self, register: Register) -> u16 {
        self.context.r[register.index()]
    }

    pub fn flags(&self) -> Flags {
        self.context.flags
    }

    pub fn pc(&self) -> u16 {
        self.context.pc
    }

    /// True if the execution has been halted.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Fetches the instruction from the address pointed by the Program Counter register.
    pub fn get_current_instruction(&self) -> Instruction {
        self.memory.get_instruction(self.context.pc)
    }

    /// Executes a single instruction.
    ///
    /// Does not increment the `PC` register or do anything else related to the instruction
    /// fetching. Events raised by the instruction report `PC - 1` as its address.
    pub fn emulate_instruction(&mut self, instruction: Instruction) {
        let address = self.context.pc.wrapping_sub(1);

        let mut ctx = InstructionEmulationContext {
            emulator: self,
            instruction,
            address,
        };

        ctx.emulate();
    }

    /// Fetches the next instruction, increments the program counter and executes the instruction.
    ///
    /// # Returns
    /// `false` if the processor is halted, either by this step or before it.
    pub fn step(&mut self) -> bool {
        if self.halted {
            return false;
        }

        let address = self.context.pc;
        let instruction = self.get_current_instruction();

        trace!(self.logger, "step";
            "pc" => format!("0x{:04x}", address),
            "word" => format!("0x{:04x}", instruction.word()),
            "instruction" => %instruction);

        self.context.pc = address.wrapping_add(1);
        self.emulate_instruction(instruction);

        if self.halted {
            debug!(self.logger, "halted"; "pc" => format!("0x{:04x}", address));
        }

        !self.halted
    }

    /// Executes the program until it halts the execution.
    ///
    /// # Returns
    /// The number of steps that left the processor running. The step that halts it is not
    /// counted, so `MOVI R0, 5; HALT` runs for one cycle.
    pub fn run(&mut self) -> usize {
        let mut cycles = 0;

        while self.step() {
            cycles += 1;
        }

        cycles
    }

    /// Like [run](Emulator::run), but gives up after `limit` cycles.
    pub fn run_for(&mut self, limit: usize) -> usize {
        let mut cycles = 0;

        while cycles < limit && self.step() {
            cycles += 1;
        }

        cycles
    }
}

#[cfg(test)]
macro_rules! assert_register {
    ($emulator:expr, $register:expr, $value:expr) => {
        assert_eq!($emulator.context.r[$register], $value, "Register {} != {}", $register, $value);
    };
}

#[cfg(test)]
fn emulator_with(words: &[u16]) -> Emulator<Vec<u16>> {
    let mut memory = vec![0; 1024];
    memory[..words.len()].copy_from_slice(words);
    Emulator::new(memory)
}

#[cfg(test)]
fn rr(opcode: OpCode, rd: Register, rs: Register) -> u16 {
    Instruction::register_form(opcode, rd, rs).into()
}

#[cfg(test)]
fn movi(rd: Register, imm: u16) -> u16 {
    Instruction::immediate(rd, imm).into()
}

#[cfg(test)]
const HALT: u16 = 0x0000;

#[test]
fn test_initial_state() {
    let emulator = Emulator::new(Bus::new());

    assert_eq!(emulator.registers(), &[0; 8]);
    assert_eq!(emulator.pc(), 0);
    assert_eq!(emulator.flags(), Flags::default());
    assert!(!emulator.is_halted());
}

#[test]
fn test_movi_halt() {
    let mut emulator = emulator_with(&[movi(Register::R0, 5), HALT]);

    assert!(emulator.step());
    assert!(!emulator.step());

    assert_register!(emulator, 0, 5);
    assert!(emulator.is_halted());
    assert_eq!(emulator.pc(), 2);
}

#[test]
fn test_step_after_halt_has_no_effect() {
    let mut emulator = emulator_with(&[HALT, movi(Register::R0, 1)]);

    assert!(!emulator.step());
    let context = emulator.context.clone();

    assert!(!emulator.step());
    assert_eq!(emulator.context, context);
    assert_eq!(emulator.run(), 0);
}

#[test]
fn test_run_excludes_halt_step() {
    let mut emulator = emulator_with(&[movi(Register::R0, 5), HALT]);

    assert_eq!(emulator.run(), 1);
    assert_register!(emulator, 0, 5);
    assert!(emulator.is_halted());
    assert_eq!(emulator.pc(), 2);

    let mut emulator = emulator_with(&[movi(Register::R0, 5), HALT]);

    assert_eq!(emulator.run_for(10), 1);
    assert!(emulator.is_halted());

    let mut emulator = emulator_with(&[movi(Register::R0, 5), movi(Register::R1, 6), HALT]);

    assert_eq!(emulator.run_for(1), 1);
    assert!(!emulator.is_halted());
    assert_eq!(emulator.run_for(10), 1);
    assert!(emulator.is_halted());
}

#[test]
fn test_add_carry() {
    let values = [0u16, 1, 2, 0x7FFF, 0x8000, 0x8001, 0xFFFE, 0xFFFF, 12345, 54321];

    for &a in values.iter() {
        for &b in values.iter() {
            let mut emulator = emulator_with(&[rr(OpCode::Add, Register::R1, Register::R2), HALT]);
            emulator.context.r[1] = a;
            emulator.context.r[2] = b;
            emulator.run();

            let sum = a as u32 + b as u32;
            assert_register!(emulator, 1, (sum % 65536) as u16);
            assert_eq!(emulator.flags().carry(), sum > 0xFFFF, "{} + {}", a, b);
            assert_eq!(emulator.flags().zero(), sum % 65536 == 0);
            assert_eq!(emulator.flags().negative(), (sum as u16) & 0x8000 != 0);
        }
    }
}

#[test]
fn test_add_same_register() {
    let mut emulator = emulator_with(&[rr(OpCode::Add, Register::R3, Register::R3), HALT]);
    emulator.context.r[3] = 0x8000;
    emulator.run();

    assert_register!(emulator, 3, 0);
    assert!(emulator.flags().carry());
    assert!(emulator.flags().zero());
}

#[test]
fn test_sub_carry_is_not_borrow() {
    let values = [0u16, 1, 2, 0x7FFF, 0x8000, 0xFFFF, 100, 200];

    for &a in values.iter() {
        for &b in values.iter() {
            let mut emulator = emulator_with(&[rr(OpCode::Subtract, Register::R0, Register::R1), HALT]);
            emulator.context.r[0] = a;
            emulator.context.r[1] = b;
            emulator.run();

            let result = a.wrapping_sub(b);
            assert_register!(emulator, 0, result);
            assert_eq!(emulator.flags().carry(), a >= b, "{} - {}", a, b);
            assert_eq!(emulator.flags().negative(), result & 0x8000 != 0);
            assert_eq!(emulator.flags().zero(), a == b);
        }
    }
}

#[test]
fn test_shifts() {
    let mut emulator = emulator_with(&[
        rr(OpCode::ShiftLeft, Register::R0, Register::R0),
        rr(OpCode::ShiftRight, Register::R1, Register::R1),
        HALT,
    ]);
    emulator.context.r[0] = 0xC001;
    emulator.context.r[1] = 0x0003;

    emulator.step();
    assert_register!(emulator, 0, 0x8002);
    assert!(emulator.flags().carry());
    assert!(emulator.flags().negative());

    emulator.step();
    assert_register!(emulator, 1, 0x0001);
    assert!(emulator.flags().carry());
    assert!(!emulator.flags().negative());
}

#[test]
fn test_shift_round_trip_depends_on_discarded_bit() {
    let program = [
        rr(OpCode::ShiftLeft, Register::R0, Register::R0),
        rr(OpCode::ShiftRight, Register::R0, Register::R0),
        HALT,
    ];

    let mut emulator = emulator_with(&program);
    emulator.context.r[0] = 0x1234;
    emulator.run();
    assert_register!(emulator, 0, 0x1234);

    let mut emulator = emulator_with(&program);
    emulator.context.r[0] = 0x9234;
    emulator.step();
    assert!(emulator.flags().carry());
    emulator.run();
    assert_register!(emulator, 0, 0x1234);
}

#[test]
fn test_logic_clears_carry() {
    let mut emulator = emulator_with(&[
        rr(OpCode::Add, Register::R0, Register::R1),
        rr(OpCode::And, Register::R0, Register::R2),
        HALT,
    ]);
    emulator.context.r[0] = 0xFFFF;
    emulator.context.r[1] = 0x0001;
    emulator.context.r[2] = 0xFFFF;

    emulator.step();
    assert!(emulator.flags().carry());
    assert!(emulator.flags().zero());

    emulator.step();
    assert_eq!(emulator.flags(), Flags::from_result(0));
    assert!(!emulator.flags().carry());
}

#[test]
fn test_bitwise() {
    let mut emulator = emulator_with(&[
        rr(OpCode::Or, Register::R0, Register::R1),
        rr(OpCode::Xor, Register::R2, Register::R1),
        rr(OpCode::Not, Register::R3, Register::R1),
        rr(OpCode::Move, Register::R4, Register::R3),
        HALT,
    ]);
    emulator.context.r[0] = 0x00F0;
    emulator.context.r[1] = 0x0F0F;
    emulator.context.r[2] = 0xFFFF;
    emulator.run();

    assert_register!(emulator, 0, 0x0FFF);
    assert_register!(emulator, 2, 0xF0F0);
    assert_register!(emulator, 3, 0xF0F0);
    assert_register!(emulator, 4, 0xF0F0);
    assert!(emulator.flags().negative());
}

#[test]
fn test_load_store() {
    let mut emulator = emulator_with(&[
        rr(OpCode::Store, Register::R0, Register::R1),
        rr(OpCode::Load, Register::R2, Register::R1),
        HALT,
    ]);
    emulator.context.r[0] = 0xBEEF;
    emulator.context.r[1] = 0x0100;
    emulator.run();

    assert_eq!(emulator.memory.get_data(0x0100), 0xBEEF);
    assert_register!(emulator, 2, 0xBEEF);
    assert!(emulator.flags().negative());
}

#[test]
fn test_out_of_range_memory_is_absorbed() {
    let mut bus = Bus::with_capacity(16);
    bus.set_data(0, rr(OpCode::Store, Register::R0, Register::R1));
    bus.set_data(1, rr(OpCode::Load, Register::R2, Register::R1));
    bus.set_data(2, HALT);

    let mut emulator = Emulator::new(bus);
    emulator.context.r[0] = 0x1234;
    emulator.context.r[1] = 0x0200;
    emulator.context.r[2] = 0x5555;
    emulator.run();

    assert_register!(emulator, 2, 0);
    assert!(emulator.flags().zero());
    assert_eq!(emulator.memory.get_data(0x0200), 0);
}

#[test]
fn test_store_does_not_touch_flags() {
    let mut emulator = emulator_with(&[
        rr(OpCode::Subtract, Register::R0, Register::R0),
        rr(OpCode::Store, Register::R1, Register::R2),
        HALT,
    ]);
    emulator.context.r[1] = 7;
    emulator.context.r[2] = 0x80;
    emulator.run();

    assert!(emulator.flags().zero());
    assert!(emulator.flags().carry());
}

#[test]
fn test_jumps() {
    let mut emulator = emulator_with(&[
        movi(Register::R7, 4),
        rr(OpCode::Jump, Register::R0, Register::R7),
        movi(Register::R0, 1),
        HALT,
        movi(Register::R6, 8),
        movi(Register::R1, 0),
        rr(OpCode::JumpZero, Register::R0, Register::R6),
        HALT,
        movi(Register::R2, 3),
        rr(OpCode::JumpZero, Register::R0, Register::R6),
        HALT,
    ]);

    assert_eq!(emulator.run(), 7);

    assert_register!(emulator, 0, 0);
    assert_register!(emulator, 2, 3);
    assert_eq!(emulator.pc(), 11);
}

#[test]
fn test_scratch_movi_keeps_flags() {
    let mut emulator = emulator_with(&[
        movi(Register::R1, 0),
        movi(Register::R7, 5),
        rr(OpCode::JumpZero, Register::R0, Register::R7),
        movi(Register::R0, 1),
        HALT,
        movi(Register::R7, 0),
        HALT,
    ]);

    assert_eq!(emulator.run(), 4);

    assert_register!(emulator, 0, 0);
    assert_register!(emulator, 7, 0);
    assert!(emulator.flags().zero());

    let mut emulator = emulator_with(&[movi(Register::R7, 0), HALT]);
    emulator.run();
    assert_eq!(emulator.flags(), Flags::default());

    let mut emulator = emulator_with(&[movi(Register::R1, 1), movi(Register::R7, 0), HALT]);
    emulator.run();
    assert_register!(emulator, 7, 0);
    assert!(!emulator.flags().zero());
}

#[test]
fn test_nop_and_unknown_patterns() {
    let mut emulator = emulator_with(&[0xF000, 0xFFFF, HALT]);
    emulator.context.flags = Flags::from_word(0b111);

    assert_eq!(emulator.run(), 2);
    assert_eq!(emulator.registers(), &[0; 8]);
    assert_eq!(emulator.flags().as_word(), 0b111);
}

#[test]
fn test_run_for_limit() {
    let mut emulator = emulator_with(&[rr(OpCode::Jump, Register::R0, Register::R0)]);

    assert_eq!(emulator.run_for(100), 100);
    assert!(!emulator.is_halted());
    assert_eq!(emulator.pc(), 0);
}

#[test]
fn test_reset() {
    let mut emulator = emulator_with(&[movi(Register::R0, 9), HALT]);
    emulator.run();
    emulator.reset();

    assert_eq!(emulator.context, Context::default());
    assert!(!emulator.is_halted());
    assert_eq!(emulator.run(), 1);
    assert_register!(emulator, 0, 9);
}

#[test]
fn test_pc_wraps() {
    let mut emulator = Emulator::new(Bus::new());
    emulator.context.pc = 0xFFFF;
    emulator.memory.set_data(0xFFFF, 0xF000);

    assert!(emulator.step());
    assert_eq!(emulator.pc(), 0);
}

#[test]
fn test_events() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let events = Rc::new(RefCell::new(Vec::new()));

    let mut emulator = emulator_with(&[
        movi(Register::R1, 0x40),
        movi(Register::R0, 0x40),
        rr(OpCode::Store, Register::R0, Register::R1),
        rr(OpCode::Store, Register::R0, Register::R1),
        HALT,
    ]);

    let sink = events.clone();
    emulator.add_listener(move |event: &Event| sink.borrow_mut().push(event.clone()));
    emulator.run();

    assert_eq!(*events.borrow(), vec![
        Event::RegisterChange { register: Register::R1, data: 0x40 },
        Event::RegisterChange { register: Register::R0, data: 0x40 },
        Event::MemoryChange { address: 0x40, data: 0x40 },
        Event::Halt { address: 4 },
    ]);
}

#[test]
fn test_flags_word() {
    let flags = Flags::from_result(0).with_carry(true);
    assert_eq!(flags.as_word(), 0b011);
    assert_eq!(Flags::from_word(flags.as_word()), flags);
    assert_eq!(Flags::from_result(0x8000).as_word(), 0b100);
}
