// SPDX-License-Identifier: GPL-2.0-only

//
// Compiler for a small C-like language targeting x86-64 NASM
//

pub mod ast;
pub mod error;
pub mod gen;
pub mod il;
pub mod lex;
pub mod lower;
pub mod parser;
pub mod symtab;
pub mod util;

use crate::error::{Diagnostics,Error};
use std::path::PathBuf;
use tracing::debug;

/// Options affecting the generated program
#[derive(Clone,Debug,Default)]
pub struct Flags {
    pub output_file: Option<PathBuf>,
    pub mno_red_zone: bool,
    pub fdiagnostics_colour: bool,
    pub werror: bool,
}

/// Driver options for inspecting the pipeline
#[derive(Clone,Debug,Default)]
pub struct DebugFlags {
    pub show_timing: bool,
    pub dump_ast: bool,
    pub dump_asm: bool,
    pub dump_unformatted_asm: bool,
    pub quiet_mode: bool,
    pub no_assemble: bool,
    pub dump_ir: bool,
}

/// Results of a full compilation
#[derive(Debug)]
pub struct Artifacts {
    pub program: ast::Program,
    pub module: Option<il::Module>,
    pub asm: gen::Assembly,
}

fn check(diagnostics: &Diagnostics) -> Result<(), Error> {
    if diagnostics.has_errors() {
        Err(Error::Aborted(diagnostics.error_count()))
    } else {
        Ok(())
    }
}

/// Lex and parse, a parse error is recorded as a diagnostic
pub fn frontend(source: &str, diagnostics: &mut Diagnostics) -> Result<ast::Program, Error> {
    let (tokens, lex_diagnostics) = lex::tokenize(source);
    debug!(tokens = tokens.len(), "lexed source");
    diagnostics.extend(lex_diagnostics);

    let program = match parser::parse(tokens, diagnostics) {
        Ok(program) => program,
        Err(err) => {
            diagnostics.push(err.into());
            return Err(Error::Aborted(diagnostics.error_count()));
        },
    };
    check(diagnostics)?;
    debug!(statements = program.body.len(), "parsed program");
    Ok(program)
}

/// Compile source to assembly, lowering to IR as well when `lower` is set
pub fn compile(source: &str, flags: &Flags, lower: bool, diagnostics: &mut Diagnostics)
        -> Result<Artifacts, Error> {
    let program = frontend(source, diagnostics)?;
    let module = if lower {
        Some(lower::lower_program(&program)?)
    } else {
        None
    };
    let asm = gen::generate(&program, flags)?;
    Ok(Artifacts { program: program, module: module, asm: asm })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_compiles_to_nothing() {
        let mut diagnostics = Diagnostics::new(false);
        let artifacts = compile("", &Flags::default(), true, &mut diagnostics).unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(artifacts.asm.render(true), "");
    }

    #[test]
    fn errors_abort_before_codegen() {
        let mut diagnostics = Diagnostics::new(false);
        let result = compile("int main() { return x; }", &Flags::default(), false, &mut diagnostics);
        assert!(matches!(result, Err(Error::Aborted(1))));
        assert_eq!(diagnostics.error_count(), 1);
    }

    #[test]
    fn value_returned_from_void_function_aborts() {
        let mut diagnostics = Diagnostics::new(false);
        let result = compile("void f() { return 1; } int main() {}", &Flags::default(), true, &mut diagnostics);
        assert!(matches!(result, Err(Error::Aborted(1))));
        let diag = diagnostics.iter().next().unwrap();
        assert_eq!(diag.message, "void function should not return a value");
    }

    #[test]
    fn werror_aborts_on_warnings() {
        let source = "int main() { char c = 1000; return 0; }";
        let mut diagnostics = Diagnostics::new(false);
        assert!(compile(source, &Flags::default(), false, &mut diagnostics).is_ok());
        assert_eq!(diagnostics.warning_count(), 1);

        let flags = Flags { werror: true, ..Flags::default() };
        let mut diagnostics = Diagnostics::new(flags.werror);
        assert!(matches!(compile(source, &flags, false, &mut diagnostics), Err(Error::Aborted(1))));
    }

    #[test]
    fn missing_main() {
        let mut diagnostics = Diagnostics::new(false);
        let result = compile("int f() { return 0; }", &Flags::default(), false, &mut diagnostics);
        match result {
            Err(err) => assert_eq!(err.to_string(), "No entry point 'main'"),
            Ok(_) => panic!("expected failure"),
        }
    }
}
