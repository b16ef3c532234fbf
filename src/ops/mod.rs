//! Instruction handlers.
//!
//! A handler runs after the decoder has fetched the operands and moved PC
//! past the instruction. It returns the cycles it costs on top of the
//! descriptor's base count: taken conditional branches and repeating block
//! instructions are the only ones that add anything.
//!
//! Handlers that exist in an HL, IX and IY flavour are generic over the
//! index selector (`HL`, `IX`, `IY`).
use crate::alu::{sz53, SZ53P};
use crate::registers::*;
use crate::z80::{IMode, Z80, HL};

mod alu;
mod bit;
mod block;
mod branch;
mod io;
mod load;
mod misc;

pub use alu::*;
pub use bit::*;
pub use block::*;
pub use branch::*;
pub use io::*;
pub use load::*;
pub use misc::*;
