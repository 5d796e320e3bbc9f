// SPDX-License-Identifier: GPL-2.0-only

//
// Command line driver tests
//

use std::fs;
use std::path::Path;
use std::process::{Command,Output};

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_compiler"))
        .current_dir(dir)
        .args(args)
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn writes_asm_next_to_input() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("prog.c"), "int main() { return 3; }\n").unwrap();

    let output = run(dir.path(), &["prog.c"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let text = fs::read_to_string(dir.path().join("prog.asm")).unwrap();
    assert!(text.starts_with("global _start\n"));
    assert!(text.contains("    mov eax, 3\n"));
}

#[test]
fn explicit_output_path() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("prog.c"), "int main() {}").unwrap();

    let output = run(dir.path(), &["prog.c", "-O0", "-S", "-o", "out.s"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(dir.path().join("out.s").exists());
    assert!(!dir.path().join("prog.asm").exists());
}

#[test]
fn asm_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("prog.c"), "int main() { int a = 1; }").unwrap();

    let output = run(dir.path(), &["prog.c", "-a", "-mno-red-zone"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("    sub rsp, 16\n"), "{}", text);
    assert!(text.contains("    leave\n"));
    assert!(!dir.path().join("prog.asm").exists());
}

#[test]
fn unformatted_asm() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("prog.c"), "int main() {}").unwrap();

    let output = run(dir.path(), &["prog.c", "-a", "--asm-no-format"]);
    assert!(stdout(&output).contains("\nmain:\npush rbp\n"));
}

#[test]
fn dumps() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("prog.c"), "int main() { int a = 10; return a; }").unwrap();

    let output = run(dir.path(), &["prog.c", "-d", "--dump-ir", "-a"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("FunctionDeclaration"));
    assert!(text.contains("define i32 @main() {"), "{}", text);
    assert!(text.contains("%a = alloca i32, align 4"));
}

#[test]
fn empty_input_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("empty.c"), "").unwrap();

    let output = run(dir.path(), &["empty.c"]);
    assert!(output.status.success());
    assert!(stderr(&output).is_empty());
    assert!(!dir.path().join("empty.asm").exists());
}

#[test]
fn diagnostics_are_rendered() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("bad.c"), "int main() {\n    x = 1;\n}\n").unwrap();

    let output = run(dir.path(), &["bad.c"]);
    assert_eq!(output.status.code(), Some(1));
    let text = stderr(&output);
    assert!(text.contains("bad.c:2:5: error: use of undeclared identifier 'x'\n    x = 1;\n    ^\n"), "{}", text);
    assert!(text.contains("1 error, 0 warnings and 0 notes generated."));
    assert!(!dir.path().join("bad.asm").exists());
}

#[test]
fn werror_fails_on_narrowing() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("warn.c"), "int main() { char c = 1000; }").unwrap();

    let output = run(dir.path(), &["warn.c"]);
    assert!(output.status.success());
    assert!(stderr(&output).contains("warning: narrowing conversion"));

    let output = run(dir.path(), &["warn.c", "-Werror", "-fdiagnostics-colour"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("\x1b[1;31merror"));
}

#[test]
fn missing_entry_point() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("lib.c"), "int f() { return 1; }").unwrap();

    let output = run(dir.path(), &["lib.c"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("No entry point 'main'"));
    assert!(!dir.path().join("lib.asm").exists());
}

#[test]
fn missing_input_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), &["nope.c"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("nope.c"));
}
