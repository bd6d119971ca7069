//! [Emulator] for executing bytecode programs against the machine's devices.

use std::time::Duration;

use slog::{error, info, o, trace, Discard, Logger};

use crate::display::Screen;
use crate::event::{Event, EventDispatcher, EventListener};
use crate::instruction::{Channel, ChannelSource, Instruction, JumpCondition, OpCode};
use crate::keyboard::Keyboard;
use crate::memory::{Memory, MemoryError};

/// Contains the register state of the processor.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// The accumulator, the single general-purpose register.
    pub acc: u8,

    /// The Program Counter stores the address of the next instruction to be
    /// executed. 16-bit, so memories larger than the 8-bit operand space can
    /// hold program text.
    pub pc: u16,

    /// The log register, a secondary accumulator driven by the `LOG_*`
    /// opcodes.
    pub log: u8,
}

/// The emulator contains all necessary context for executing a program:
/// the memory, the devices and the CPU registers.
pub struct Emulator {
    /// The memory of the emulated machine.
    pub memory: Memory,

    /// The framebuffer device.
    pub screen: Screen,

    /// Handle to the input device queue. Clone it to feed key codes from
    /// another thread.
    pub keyboard: Keyboard,

    /// The execution context, which includes the registers of the CPU.
    pub context: Context,

    /// True if the execution has been halted. Terminal; there is no resume.
    pub halted: bool,

    tick: Option<Duration>,
    logger: Logger,
    dispatcher: EventDispatcher,
}

impl Emulator {
    /// Create a new emulator with default-sized devices.
    ///
    /// # Parameters
    /// - `memory`: A [Memory] which has the program loaded at address 0.
    pub fn new(memory: Memory) -> Emulator {
        Emulator::with_devices(memory, Screen::default(), Keyboard::new())
    }

    pub fn with_devices(memory: Memory, screen: Screen, keyboard: Keyboard) -> Emulator {
        Emulator {
            memory,
            screen,
            keyboard,
            context: Context::default(),
            halted: false,
            tick: None,
            logger: Logger::root(Discard, o!()),
            dispatcher: EventDispatcher::new(),
        }
    }

    pub fn set_logger<L>(&mut self, logger: L)
    where
        L: Into<Option<Logger>>,
    {
        self.logger = logger
            .into()
            .unwrap_or(Logger::root(Discard, o!()))
            .new(o!("stage" => "execution"));
    }

    /// Sets a fixed pacing interval: [run](Emulator::run) sleeps this long
    /// after every instruction so a renderer polling the framebuffer can
    /// observe intermediate states. Pacing is an artificial clock, not a
    /// correctness requirement.
    pub fn set_tick(&mut self, tick: Duration) {
        self.tick = Some(tick);
    }

    pub fn add_listener<L: EventListener + 'static>(&mut self, listener: L) {
        self.dispatcher.add_listener(listener);
    }

    /// Fetches the instruction at the program counter without executing it.
    pub fn current_instruction(&self) -> Result<Option<Instruction>, MemoryError> {
        let pc = self.context.pc as usize;

        let bytes = [self.memory.get(pc)?, self.memory.get(pc + 1)?];

        Ok(Instruction::decode(bytes))
    }

    fn halt(&mut self, address: u16) {
        self.halted = true;
        self.dispatcher.dispatch(Event::Halted { address });
    }

    /// Fetches the next instruction, advances the program counter by 2 and
    /// executes the instruction.
    ///
    /// Running past the end of memory halts. An opcode byte with no mapping in
    /// the table is reported and halts the execution; it is not an `Err` since
    /// it is a program defect, not a host fault.
    ///
    /// # Errors
    /// Returns a [MemoryError] if an instruction makes an illegal memory
    /// access.
    pub fn step(&mut self) -> Result<(), MemoryError> {
        if self.halted {
            return Ok(());
        }

        let pc = self.context.pc;

        if pc as usize + 1 >= self.memory.size() {
            trace!(self.logger, "program counter ran past the end of memory"; "pc" => pc);
            self.halt(pc);
            return Ok(());
        }

        let opcode_byte = self.memory.get(pc as usize)?;
        let operand = self.memory.get(pc as usize + 1)?;
        self.context.pc += 2;

        let opcode = match OpCode::from_byte(opcode_byte) {
            Some(opcode) => opcode,
            None => {
                error!(self.logger, "unknown opcode";
                       "address" => pc,
                       "byte" => format!("0x{:02X}", opcode_byte));
                self.halt(pc);
                return Ok(());
            }
        };

        let ins = Instruction { opcode, operand };

        trace!(self.logger, "execute"; "pc" => pc, "instruction" => %ins, "acc" => self.context.acc);

        self.execute(ins, pc)
    }

    fn execute(&mut self, ins: Instruction, pc: u16) -> Result<(), MemoryError> {
        let operand = ins.operand;

        match ins.opcode {
            OpCode::NoOperation => (),

            OpCode::Load => {
                self.context.acc = self.memory.get(operand as usize)?;
            }
            OpCode::Store => {
                self.memory.set(operand as usize, self.context.acc)?;
            }
            OpCode::Add => {
                let value = self.memory.get(operand as usize)?;
                self.context.acc = self.context.acc.wrapping_add(value);
            }
            OpCode::Subtract => {
                let value = self.memory.get(operand as usize)?;
                self.context.acc = self.context.acc.wrapping_sub(value);
            }

            OpCode::Jump { condition } => {
                let jump = match condition {
                    JumpCondition::Unconditional => true,
                    JumpCondition::Zero => self.context.acc == 0,
                    JumpCondition::NotZero => self.context.acc != 0,
                };

                if jump {
                    self.context.pc = operand as u16;
                }
            }

            OpCode::Compare { immediate } => {
                let value = self.comparison_operand(operand, immediate)?;
                self.context.acc = (self.context.acc != value) as u8;
            }
            OpCode::Greater { immediate } => {
                let value = self.comparison_operand(operand, immediate)?;
                self.context.acc = (self.context.acc > value) as u8;
            }
            OpCode::Less { immediate } => {
                let value = self.comparison_operand(operand, immediate)?;
                self.context.acc = (self.context.acc < value) as u8;
            }
            OpCode::Not => {
                self.context.acc = (self.context.acc == 0) as u8;
            }

            OpCode::Halt => {
                self.halt(pc);
            }

            OpCode::SetChannel { channel, source } => {
                let value = match source {
                    ChannelSource::Operand => operand,
                    ChannelSource::Accumulator => self.context.acc,
                };

                *self.channel_register(channel) = value;
            }
            OpCode::DrawPixel => {
                if self.screen.draw_pixel() {
                    self.dispatcher.dispatch(Event::PixelDrawn {
                        x: self.screen.x,
                        y: self.screen.y,
                        r: self.screen.r,
                        g: self.screen.g,
                        b: self.screen.b,
                    });
                }
            }
            OpCode::ClearScreen => {
                self.screen.clear();
                self.dispatcher.dispatch(Event::ScreenCleared);
            }

            OpCode::KeyAvailable => {
                self.context.acc = self.keyboard.has_key() as u8;
            }
            OpCode::GetKey => {
                let code = self.keyboard.pop_key();
                self.context.acc = code;
                self.dispatcher.dispatch(Event::KeyConsumed { code });
            }
            OpCode::PeekKey => {
                self.context.acc = self.keyboard.peek_key();
            }

            OpCode::LogAdd => {
                self.context.log = self.context.log.wrapping_add(operand);
            }
            OpCode::LogLoad => {
                self.context.acc = self.context.log;
            }
            OpCode::LogStore => {
                self.context.log = self.context.acc;
            }
            OpCode::LogPrint => {
                self.print_log();
            }
        }

        Ok(())
    }

    fn channel_register(&mut self, channel: Channel) -> &mut u8 {
        match channel {
            Channel::X => &mut self.screen.x,
            Channel::Y => &mut self.screen.y,
            Channel::Red => &mut self.screen.r,
            Channel::Green => &mut self.screen.g,
            Channel::Blue => &mut self.screen.b,
        }
    }

    fn comparison_operand(&self, operand: u8, immediate: bool) -> Result<u8, MemoryError> {
        match immediate {
            true => Ok(operand),
            false => self.memory.get(operand as usize),
        }
    }

    fn print_log(&mut self) {
        let value = self.context.log;
        let rendered = render_log_register(value);

        info!(self.logger, "LOG_PRINT"; "log" => rendered.as_str());

        self.dispatcher.dispatch(Event::LogPrinted { value, rendered });
    }

    /// Executes the program until it halts.
    ///
    /// A program with no reachable `HLT` and no end-of-memory exit never
    /// returns; there is no timeout or cancellation.
    ///
    /// # Errors
    /// Returns a [MemoryError] if an instruction makes an illegal memory
    /// access.
    pub fn run(&mut self) -> Result<(), MemoryError> {
        while !self.halted {
            self.step()?;

            if let Some(tick) = self.tick {
                std::thread::sleep(tick);
            }
        }

        Ok(())
    }
}

/// Renders the log register the way `LOG_PRINT` reports it: binary,
/// hexadecimal, decimal and a printable character. Control values render as a
/// bracketed numeric tag instead of a raw glyph.
pub fn render_log_register(value: u8) -> String {
    let ch = value as char;

    let rendered = match ch.is_control() {
        true => format!("[CTRL:{}]", value),
        false => ch.to_string(),
    };

    format!(
        "Binary={:08b}, Hex=0x{:02X}, Decimal={}, Char='{}'",
        value, value, value, rendered,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;
    use crate::keyboard::Key;

    fn emulator_for(program: &[u8]) -> Emulator {
        let mut memory = Memory::default();
        memory.load(program).unwrap();
        Emulator::new(memory)
    }

    #[test]
    fn add_and_sub_wrap_modulo_256() {
        for &(a, b) in &[(0u8, 0u8), (1, 255), (255, 255), (100, 200), (7, 3)] {
            let mut emulator = emulator_for(&[
                0x01, 0x10, // LOAD 0x10
                0x03, 0x11, // ADD 0x11
                0x02, 0x12, // STORE 0x12
                0x01, 0x10, // LOAD 0x10
                0x04, 0x11, // SUB 0x11
                0x02, 0x13, // STORE 0x13
                0x0F, 0x00, // HLT
            ]);

            emulator.memory.set(0x10, a).unwrap();
            emulator.memory.set(0x11, b).unwrap();

            emulator.run().unwrap();

            assert_eq!(emulator.memory.get(0x12), Ok(a.wrapping_add(b)));
            assert_eq!(emulator.memory.get(0x13), Ok(a.wrapping_sub(b)));
        }
    }

    #[test]
    fn compare_signals_inequality() {
        // CMP_VAL leaves 1 when the operand differs from ACC, 0 when equal.
        for (acc, value, expected) in vec![(5u8, 5u8, 0u8), (5, 6, 1), (0, 0, 0), (255, 0, 1)] {
            let mut emulator = emulator_for(&[
                0x01, 0x10, // LOAD 0x10
                0x09, value, // CMP_VAL value
                0x0F, 0x00, // HLT
            ]);

            emulator.memory.set(0x10, acc).unwrap();
            emulator.run().unwrap();

            assert_eq!(emulator.context.acc, expected);
        }
    }

    #[test]
    fn not_is_logical_negation() {
        let mut emulator = emulator_for(&[0x0E, 0x00, 0x0F, 0x00]);
        emulator.run().unwrap();
        assert_eq!(emulator.context.acc, 1);

        let mut emulator = emulator_for(&[0x09, 0x07, 0x0E, 0x00, 0x0F, 0x00]);
        emulator.run().unwrap();
        // CMP_VAL 7 against ACC=0 leaves 1, NOT flips it back to 0.
        assert_eq!(emulator.context.acc, 0);
    }

    #[test]
    fn unknown_opcode_halts() {
        let mut emulator = emulator_for(&[0xFE, 0x00, 0x00, 0x00, 0x0F, 0x00]);
        emulator.run().unwrap();

        assert!(emulator.halted);
        // pc stopped right after the bad fetch, not at the HLT.
        assert_eq!(emulator.context.pc, 2);
    }

    #[test]
    fn running_off_the_end_halts() {
        let mut emulator = emulator_for(&[0x00, 0x00]);
        emulator.run().unwrap();

        assert!(emulator.halted);
    }

    #[test]
    fn conditional_jumps_follow_the_accumulator() {
        // JZ skips over the STORE when ACC != 0.
        let mut emulator = emulator_for(&[
            0x09, 0x07, // CMP_VAL 7   (ACC = 1)
            0x06, 0x08, // JZ 8        (not taken)
            0x02, 0x20, // STORE 0x20
            0x0F, 0x00, // HLT
            0x0F, 0x00, // HLT (JZ target)
        ]);

        emulator.run().unwrap();
        assert_eq!(emulator.memory.get(0x20), Ok(1));

        // JNZ skips the STORE entirely when ACC != 0.
        let mut emulator = emulator_for(&[
            0x09, 0x07, // CMP_VAL 7   (ACC = 1)
            0x07, 0x08, // JNZ 8       (taken)
            0x02, 0x20, // STORE 0x20  (skipped)
            0x0F, 0x00, // HLT
            0x0F, 0x00, // HLT (JNZ target)
        ]);

        emulator.run().unwrap();
        assert_eq!(emulator.memory.get(0x20), Ok(0));
    }

    #[test]
    fn pixel_program_draws_and_sets_dirty() {
        let program = assemble(&[
            "SET_X", "10",
            "SET_Y", "10",
            "SET_R", "255",
            "SET_G", "0",
            "SET_B", "0",
            "DRAW_PIXEL", "0",
            "HLT", "0",
        ])
        .unwrap();

        let mut emulator = emulator_for(&program);
        emulator.run().unwrap();

        assert_eq!(
            emulator.screen.pixel(10, 10),
            crate::display::Rgb { r: 255, g: 0, b: 0 },
        );
        assert!(emulator.screen.take_dirty());
    }

    #[test]
    fn key_queue_program() {
        let program = assemble(&[
            "KEY_AVAILABLE", "0",
            "STORE", "0x20",
            "GET_KEY", "0",
            "STORE", "0x21",
            "KEY_AVAILABLE", "0",
            "STORE", "0x22",
            "HLT", "0",
        ])
        .unwrap();

        let mut emulator = emulator_for(&program);
        emulator.keyboard.press(Key::A);

        emulator.run().unwrap();

        assert_eq!(emulator.memory.get(0x20), Ok(1));
        assert_eq!(emulator.memory.get(0x21), Ok(0x41));
        assert_eq!(emulator.memory.get(0x22), Ok(0));
    }

    #[test]
    fn log_register_accumulates_and_prints() {
        use std::sync::{Arc, Mutex};

        let program = assemble(&[
            "LOG_ADD", "65",
            "LOG_PRINT", "0",
            "LOG_LOAD", "0",
            "HLT", "0",
        ])
        .unwrap();

        let mut emulator = emulator_for(&program);

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        emulator.add_listener(move |event: &Event| {
            sink.lock().unwrap().push(event.clone());
        });

        emulator.run().unwrap();

        assert_eq!(emulator.context.acc, 65);

        let events = events.lock().unwrap();
        assert!(events.iter().any(|e| matches!(
            e,
            Event::LogPrinted { value: 65, .. }
        )));
    }

    #[test]
    fn control_characters_render_tagged() {
        assert_eq!(
            render_log_register(0x0D),
            "Binary=00001101, Hex=0x0D, Decimal=13, Char='[CTRL:13]'",
        );
        assert_eq!(
            render_log_register(b'A'),
            "Binary=01000001, Hex=0x41, Decimal=65, Char='A'",
        );
    }
}
