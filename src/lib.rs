//! A crate for doing anything related to an imaginary 8-bit pixel computer:
//! a single-accumulator CPU over a flat 256-byte memory, a 64x64 RGB
//! framebuffer and a keyboard queue, driven by fixed-width two-byte
//! instructions.
//!
//! Currently this crate provides the functionality to:
//! - Assemble bytecode from mnemonic listings.
//! - Compile bytecode from a small imperative source language.
//! - Execute bytecode against the emulated devices.
//!
//! # Future plans
//!
//! - A windowed frontend rendering the framebuffer
//! - PPM snapshots of the screen from `px8run`
//! - Sound device and opcodes
//!
//! # Example
//! ```
//! use px8::{compiler::compile, emulator::Emulator, memory::Memory};
//!
//! // Counts down from 5, then lights a pixel.
//! let source = "
//!     static void main() {
//!         byte i = 5;
//!         while (i > 0) {
//!             i = i - 1;
//!         }
//!         gpu.set_pixel(10, 20, 255, 0, 0);
//!     }
//! ";
//!
//! // Compile the source into a program and its constant pool.
//! let artifact = compile(source).unwrap();
//! assert!(artifact.diagnostics.is_empty());
//!
//! // Lay the program and its constants out into a memory image.
//! let mut memory = Memory::new(artifact.layout.image_size);
//! memory.load(&artifact.to_image()).unwrap();
//!
//! // Execute until HLT.
//! let mut emulator = Emulator::new(memory);
//! emulator.run().unwrap();
//!
//! assert_eq!(emulator.screen.pixel(10, 20).r, 255);
//! ```
//!
//! # Executables
//!
//! ## `px8run`
//!
//! The `px8run` executable compiles a source file and runs it to halt,
//! printing the final accumulator. Built with the `tools` feature.
//!
//! ```text
//! $ px8run --disasm program.px8
//! ```
pub mod assembler;
pub mod compiler;
pub mod display;
pub mod emulator;
pub mod event;
pub mod instruction;
pub mod keyboard;
pub mod memory;
