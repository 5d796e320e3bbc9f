// SPDX-License-Identifier: GPL-2.0-only

//
// Command line driver
//

use clap::{App,Arg,ArgMatches};
use compiler::error::{Diagnostics,Error};
use compiler::{ast,gen,lower,DebugFlags,Flags};
use std::io::Write;
use std::path::{Path,PathBuf};
use std::time::Instant;
use tracing::{debug,warn,Level};

fn app() -> App<'static, 'static> {
    App::new("compiler")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compiles a C-like language to x86-64 NASM assembly")
        .arg(Arg::with_name("filename")
            .required(true)
            .index(1))
        .arg(Arg::with_name("optimize")
            .short("O")
            .takes_value(true)
            .help("Optimization level (accepted, no optimizations exist)"))
        .arg(Arg::with_name("dump-ast")
            .short("d")
            .long("dump-ast")
            .help("Print the syntax tree"))
        .arg(Arg::with_name("show_timing")
            .short("t")
            .long("show_timing")
            .help("Print the time spent in each stage"))
        .arg(Arg::with_name("asm")
            .short("a")
            .long("asm")
            .help("Print the assembly instead of writing a file"))
        .arg(Arg::with_name("dump-ir")
            .long("dump-ir")
            .help("Print the intermediate representation"))
        .arg(Arg::with_name("quiet")
            .short("q")
            .long("quiet")
            .help("Only log errors"))
        .arg(Arg::with_name("no-assemble")
            .short("S")
            .long("no-assemble")
            .help("Stop after generating assembly"))
        .arg(Arg::with_name("asm-no-format")
            .long("asm-no-format")
            .help("Do not indent instructions"))
        .arg(Arg::with_name("machine")
            .short("m")
            .takes_value(true)
            .multiple(true)
            .number_of_values(1)
            .help("Machine options: no-red-zone"))
        .arg(Arg::with_name("feature")
            .short("f")
            .takes_value(true)
            .multiple(true)
            .number_of_values(1)
            .help("Features: diagnostics-colour"))
        .arg(Arg::with_name("warning")
            .short("W")
            .takes_value(true)
            .multiple(true)
            .number_of_values(1)
            .help("Warning options: error"))
        .arg(Arg::with_name("output")
            .short("o")
            .takes_value(true)
            .help("Output file"))
}

fn values<'a>(matches: &'a ArgMatches, name: &str) -> Vec<&'a str> {
    matches.values_of(name).map(|v| v.collect()).unwrap_or_default()
}

fn flags(matches: &ArgMatches) -> (Flags, DebugFlags) {
    let mut flags = Flags::default();
    flags.output_file = matches.value_of("output").map(PathBuf::from);
    // Optimization levels are accepted, no optimizations exist
    if let Some(level) = matches.value_of("optimize") {
        if level.parse::<u8>().is_err() {
            warn!(value = level, "unknown optimization level");
        }
    }
    for opt in values(matches, "machine") {
        match opt {
            "no-red-zone" => flags.mno_red_zone = true,
            opt => warn!("ignoring unknown option '-m{}'", opt),
        }
    }
    for opt in values(matches, "feature") {
        match opt {
            "diagnostics-colour" | "diagnostics-color" => flags.fdiagnostics_colour = true,
            opt => warn!("ignoring unknown option '-f{}'", opt),
        }
    }
    for opt in values(matches, "warning") {
        match opt {
            "error" => flags.werror = true,
            opt => warn!("ignoring unknown option '-W{}'", opt),
        }
    }

    let debug = DebugFlags {
        show_timing: matches.is_present("show_timing"),
        dump_ast: matches.is_present("dump-ast"),
        dump_asm: matches.is_present("asm"),
        dump_unformatted_asm: matches.is_present("asm-no-format"),
        quiet_mode: matches.is_present("quiet"),
        no_assemble: matches.is_present("no-assemble"),
        dump_ir: matches.is_present("dump-ir"),
    };
    (flags, debug)
}

//
// Stage timing
//

struct Timer {
    enabled: bool,
    stages: Vec<(&'static str, f64)>,
}

impl Timer {
    fn time<T>(&mut self, stage: &'static str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = f();
        self.stages.push((stage, start.elapsed().as_secs_f64() * 1000.0));
        result
    }

    fn report(&self) {
        if !self.enabled {
            return;
        }
        for (stage, ms) in &self.stages {
            eprintln!("{:>10}: {:.3} ms", stage, ms);
        }
    }
}

fn default_output(input: &Path) -> PathBuf {
    input.with_extension("asm")
}

// Write through a temporary file in the destination directory, then rename into place
fn write_atomic(path: &Path, text: &str) -> Result<(), Error> {
    let io_err = |source| Error::Io { path: path.display().to_string(), source: source };
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    file.write_all(text.as_bytes()).map_err(io_err)?;
    file.persist(path).map_err(|err| io_err(err.error))?;
    Ok(())
}

fn report(diagnostics: &Diagnostics, file: &str, source: &str, flags: &Flags) {
    if diagnostics.is_empty() {
        return;
    }
    for diag in diagnostics.iter() {
        eprint!("{}", diag.render(file, source, flags.fdiagnostics_colour));
    }
    eprintln!("{}", diagnostics.summary());
}

fn run(matches: &ArgMatches, flags: &Flags, debug: &DebugFlags) -> Result<(), Error> {
    let mut timer = Timer { enabled: debug.show_timing, stages: Vec::new() };
    let input = PathBuf::from(matches.value_of("filename").unwrap_or_default());
    let file = input.display().to_string();
    let source = std::fs::read_to_string(&input)
        .map_err(|source| Error::Io { path: file.clone(), source: source })?;

    let mut diagnostics = Diagnostics::new(flags.werror);
    let program = timer.time("frontend", || compiler::frontend(&source, &mut diagnostics));
    report(&diagnostics, &file, &source, flags);
    let program: ast::Program = program?;

    if debug.dump_ast {
        println!("{:#?}", program);
    }
    if debug.dump_ir {
        let module = timer.time("lowering", || lower::lower_program(&program))?;
        print!("{}", module);
    }

    let asm = timer.time("codegen", || gen::generate(&program, flags))?;
    let text = asm.render(!debug.dump_unformatted_asm);
    if debug.no_assemble {
        debug!("assembly is the only output format");
    }
    if debug.dump_asm {
        print!("{}", text);
    } else if !asm.is_empty() {
        let output = flags.output_file.clone().unwrap_or_else(|| default_output(&input));
        timer.time("output", || write_atomic(&output, &text))?;
        debug!(output = %output.display(), "wrote assembly");
    }

    timer.report();
    Ok(())
}

fn main() {
    let matches = app().get_matches();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if matches.is_present("quiet") { Level::ERROR } else { Level::WARN })
        .init();
    let (flags, debug) = flags(&matches);

    match run(&matches, &flags, &debug) {
        Ok(()) => (),
        // Diagnostics were already reported
        Err(Error::Aborted(_)) => std::process::exit(1),
        Err(err) => {
            eprintln!("error: {}", err);
            std::process::exit(1);
        },
    }
}
