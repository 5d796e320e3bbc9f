// SPDX-License-Identifier: GPL-2.0-only

//
// x86-64 code generation for NASM
//

pub mod block;
pub mod frame;
pub mod nasm;

pub use nasm::{generate,Assembly};
