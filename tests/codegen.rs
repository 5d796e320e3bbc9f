// SPDX-License-Identifier: GPL-2.0-only

//
// End to end code generation tests
//

use compiler::error::{Diagnostics,Error,GenError};
use compiler::{compile,Flags};

fn try_asm(source: &str, flags: &Flags) -> Result<String, Error> {
    let mut diagnostics = Diagnostics::new(flags.werror);
    compile(source, flags, false, &mut diagnostics).map(|a| a.asm.render(true))
}

fn asm(source: &str) -> String {
    try_asm(source, &Flags::default()).unwrap()
}

// Trimmed lines of one function, up to the next blank line
fn body(text: &str, name: &str) -> Vec<String> {
    let header = format!("{}:", name);
    text.lines()
        .skip_while(|line| *line != header)
        .skip(1)
        .take_while(|line| !line.is_empty())
        .map(|line| line.trim().to_string())
        .collect()
}

fn main_body(source: &str) -> Vec<String> {
    body(&asm(source), "main")
}

#[test]
fn empty_program() {
    let mut diagnostics = Diagnostics::new(false);
    let artifacts = compile("", &Flags::default(), true, &mut diagnostics).unwrap();
    assert!(diagnostics.is_empty());
    assert!(artifacts.asm.is_empty());
    assert_eq!(artifacts.asm.render(true), "");
}

#[test]
fn trivial_main() {
    assert_eq!(asm("int main() {}"), "\
global _start
section .bss
section .data
section .text
_start:
    xor rbp, rbp
    call main
    mov edi, eax
    mov eax, 60
    syscall

main:
    push rbp
    mov rbp, rsp
    xor eax, eax
    pop rbp
    ret
");
}

#[test]
fn unformatted_output() {
    let mut diagnostics = Diagnostics::new(false);
    let artifacts = compile("int main() {}", &Flags::default(), false, &mut diagnostics).unwrap();
    let text = artifacts.asm.render(false);
    assert!(text.contains("\nmain:\npush rbp\nmov rbp, rsp\n"));
    assert!(!text.contains("    "));
}

#[test]
fn arithmetic() {
    assert_eq!(main_body("int main() { int a = 10; int b = a + 10; }"), vec![
        "push rbp",
        "mov rbp, rsp",
        "mov DWORD [rbp-4], 10",
        "mov eax, DWORD [rbp-4]",
        "add eax, 10",
        "mov DWORD [rbp-8], eax",
        "xor eax, eax",
        "pop rbp",
        "ret",
    ]);
}

#[test]
fn boolean_from_integer_variable() {
    let lines = main_body("int main() { int a = 10; bool b = a; }");
    assert_eq!(&lines[2..6], &[
        "mov DWORD [rbp-4], 10",
        "cmp DWORD [rbp-4], 0",
        "setne al",
        "mov BYTE [rbp-5], al",
    ]);
}

#[test]
fn missing_entry_point() {
    let result = try_asm("int f() { return 1; }", &Flags::default());
    match result {
        Err(Error::Gen(GenError::NoEntryPoint)) => (),
        other => panic!("expected missing entry point, got {:?}", other),
    }
    assert_eq!(GenError::NoEntryPoint.to_string(), "No entry point 'main'");
}

#[test]
fn redefinition_is_reported() {
    let mut diagnostics = Diagnostics::new(false);
    let result = compile("int main() {\n    int a;\n    int a;\n}\n", &Flags::default(), false, &mut diagnostics);
    assert!(matches!(result, Err(Error::Aborted(1))));
    let diag = diagnostics.iter().next().unwrap();
    assert_eq!(diag.pos.line, 3);
    assert!(diag.message.contains("redefinition of 'a'"), "{}", diag.message);
    assert!(diag.message.contains("previous definition at 2:"), "{}", diag.message);
}

//
// Widths and extensions
//

const TYPES: [(&str, usize, bool); 5] = [
    ("bool", 1, false),
    ("char", 1, true),
    ("short", 2, true),
    ("int", 4, true),
    ("long", 8, true),
];

fn size_name(size: usize) -> &'static str {
    match size {
        1 => "BYTE",
        2 => "WORD",
        4 => "DWORD",
        _ => "QWORD",
    }
}

fn rax(size: usize) -> &'static str {
    match size {
        1 => "al",
        2 => "ax",
        4 => "eax",
        _ => "rax",
    }
}

fn align(value: usize, align: usize) -> usize {
    (value + align - 1) / align * align
}

#[test]
fn literal_stores_use_plain_mov() {
    for (name, size, _) in TYPES {
        let lines = main_body(&format!("int main() {{ {} v = 1; }}", name));
        assert_eq!(lines[2], format!("mov {} [rbp-{}], 1", size_name(size), size), "{}", name);
    }
}

#[test]
fn extension_table() {
    for (from, from_size, signed) in TYPES {
        for (to, to_size, _) in TYPES {
            let lines = main_body(&format!("int main() {{ {} a = 1; {} b = a; }}", from, to));
            let a = from_size;
            let b = align(a, to_size) + to_size;
            let src = format!("{} [rbp-{}]", size_name(from_size), a);

            let mut expect = vec![format!("mov {}, 1", src)];
            if to == "bool" && from != "bool" {
                expect.push(format!("cmp {}, 0", src));
                expect.push("setne al".to_string());
            } else if to_size <= from_size {
                expect.push(format!("mov {}, {} [rbp-{}]", rax(to_size), size_name(to_size), a));
            } else if to_size == from_size + 1 {
                expect.push("xor eax, eax".to_string());
                expect.push(format!("mov al, {}", src));
            } else if from_size == 4 {
                expect.push(format!("mov eax, {}", src));
                expect.push("cdqe".to_string());
            } else {
                let op = if signed { "movsx" } else { "movzx" };
                expect.push(format!("{} {}, {}", op, rax(to_size), src));
            }
            expect.push(format!("mov {} [rbp-{}], {}", size_name(to_size), b, rax(to_size)));

            assert_eq!(&lines[2..2 + expect.len()], &expect[..], "{} -> {}", from, to);
        }
    }
}

#[test]
fn literals_wrap_to_destination() {
    let lines = main_body("int main() { char c = 300; long l = 5000000000; }");
    assert_eq!(&lines[2..5], &[
        "mov BYTE [rbp-1], 44",
        "mov rax, 5000000000",
        "mov QWORD [rbp-16], rax",
    ]);
}

#[test]
fn typed_literals_are_immediates() {
    for (name, size, _) in TYPES {
        let lines = main_body(&format!("int main() {{ {} v = 'a'; }}", name));
        let val = if name == "bool" { 1 } else { 97 };
        assert_eq!(lines[2], format!("mov {} [rbp-{}], {}", size_name(size), size, val), "{}", name);
    }
    let lines = main_body("int main() { long l = true; int i = 5000000000; }");
    assert_eq!(&lines[2..4], &[
        "mov QWORD [rbp-8], 1",
        "mov DWORD [rbp-12], 705032704",
    ]);
}

#[test]
fn float_literals() {
    let lines = main_body("int main() { float f = 7f; double d = 2.5; }");
    assert_eq!(&lines[2..5], &[
        "mov DWORD [rbp-4], __float32__(7.0)",
        "mov rax, __float64__(2.5)",
        "mov QWORD [rbp-16], rax",
    ]);
}

#[test]
fn float_arithmetic_is_not_implemented() {
    let result = try_asm("int main() { float f = 1f; float g = f + f; }", &Flags::default());
    assert!(matches!(result, Err(Error::Gen(GenError::NotImplemented(_)))));
}

//
// Control flow
//

#[test]
fn if_else() {
    let lines = main_body("int main() { int a = 1; if (a) { a = 2; } else { a = 3; } return a; }");
    assert_eq!(&lines[2..], &[
        "mov DWORD [rbp-4], 1",
        "cmp DWORD [rbp-4], 0",
        "je .L1",
        "mov DWORD [rbp-4], 2",
        "jmp .L0",
        ".L1:",
        "mov DWORD [rbp-4], 3",
        ".L0:",
        "mov eax, DWORD [rbp-4]",
        "pop rbp",
        "ret",
    ]);
}

#[test]
fn else_if_chain_shares_end_label() {
    let text = asm("int main() { int a = 1; if (a == 1) { a = 2; } else if (a == 2) { a = 3; } else { a = 4; } return a; }");
    let lines = body(&text, "main");
    assert_eq!(lines.iter().filter(|l| *l == "jmp .L0").count(), 2);
    assert_eq!(lines.iter().filter(|l| *l == ".L0:").count(), 1);
}

#[test]
fn return_in_branch_skips_jump() {
    let lines = main_body("int main() { int a = 1; if (a) { return 1; } else { return 2; } }");
    assert!(!lines.iter().any(|l| l.starts_with("jmp")), "{:?}", lines);
    assert_eq!(&lines[2..], &[
        "mov DWORD [rbp-4], 1",
        "cmp DWORD [rbp-4], 0",
        "je .L1",
        "mov eax, 1",
        "pop rbp",
        "ret",
        ".L1:",
        "mov eax, 2",
        "pop rbp",
        "ret",
    ]);
}

#[test]
fn returning_else_if_chain_has_no_fallthrough() {
    let source = "int main() { int a = 1; if (a == 1) { return 1; } else if (a == 2) { return 2; } else { return 3; } }";
    let lines = main_body(source);
    assert_eq!(lines.iter().filter(|l| *l == "ret").count(), 3, "{:?}", lines);
    assert!(!lines.contains(&".L0:".to_string()));
    assert!(!lines.contains(&"xor eax, eax".to_string()));

    // Without an else the end of the if is reachable
    let lines = main_body("int main() { int a = 1; if (a) { return 1; } }");
    assert_eq!(&lines[lines.len() - 4..], &[".L0:", "xor eax, eax", "pop rbp", "ret"]);
}

#[test]
fn literal_condition_drops_dead_arm() {
    let lines = main_body("int main() { int a = 1; if (1) { a = 2; } else { a = 3; } }");
    assert!(lines.contains(&"mov DWORD [rbp-4], 2".to_string()));
    assert!(!lines.contains(&"mov DWORD [rbp-4], 3".to_string()));
    assert!(!lines.iter().any(|l| l.starts_with(".L")));
}

#[test]
fn while_loop_tests_at_bottom() {
    let lines = main_body("int main() { int i = 0; while (i < 10) { i += 1; } return i; }");
    assert_eq!(&lines[2..], &[
        "mov DWORD [rbp-4], 0",
        "jmp .L1",
        ".L0:",
        "mov eax, DWORD [rbp-4]",
        "add eax, 1",
        "mov DWORD [rbp-4], eax",
        ".L1:",
        "mov eax, DWORD [rbp-4]",
        "cmp eax, 10",
        "setl al",
        "cmp al, 0",
        "jne .L0",
        "mov eax, DWORD [rbp-4]",
        "pop rbp",
        "ret",
    ]);
}

#[test]
fn false_loop_is_skipped() {
    let lines = main_body("int main() { int i = 0; while (0) { i = 1; } }");
    assert!(!lines.iter().any(|l| l.contains(".L")));
}

//
// Expressions
//

#[test]
fn nested_operand_spills_through_stack() {
    let lines = main_body("int main() { int a = 1; int b = a + (a * 2); }");
    assert_eq!(lines, vec![
        "push rbp",
        "mov rbp, rsp",
        "sub rsp, 16",
        "mov DWORD [rbp-4], 1",
        "mov eax, DWORD [rbp-4]",
        "push rax",
        "mov eax, DWORD [rbp-4]",
        "imul eax, 2",
        "mov ecx, eax",
        "pop rax",
        "add eax, ecx",
        "mov DWORD [rbp-8], eax",
        "xor eax, eax",
        "leave",
        "ret",
    ]);
}

#[test]
fn division() {
    let lines = main_body("int main() { int a = 9; int b = a / 2; }");
    assert_eq!(&lines[3..8], &[
        "mov eax, DWORD [rbp-4]",
        "mov ecx, 2",
        "cdq",
        "idiv ecx",
        "mov DWORD [rbp-8], eax",
    ]);
}

#[test]
fn increments() {
    let lines = main_body("int main() { int a = 1; a++; int b = a++; int c = --a; }");
    assert_eq!(&lines[2..11], &[
        "mov DWORD [rbp-4], 1",
        "add DWORD [rbp-4], 1",
        "mov eax, DWORD [rbp-4]",
        "add DWORD [rbp-4], 1",
        "mov DWORD [rbp-8], eax",
        "sub DWORD [rbp-4], 1",
        "mov eax, DWORD [rbp-4]",
        "mov DWORD [rbp-12], eax",
        "xor eax, eax",
    ]);
}

#[test]
fn bool_increments_stay_boolean() {
    let lines = main_body("int main() { bool b = true; b++; b--; bool c = ++b; }");
    assert_eq!(&lines[2..8], &[
        "mov BYTE [rbp-1], 1",
        "mov BYTE [rbp-1], 1",
        "xor BYTE [rbp-1], 1",
        "mov BYTE [rbp-1], 1",
        "mov al, BYTE [rbp-1]",
        "mov BYTE [rbp-2], al",
    ]);
}

#[test]
fn negation_and_not() {
    let lines = main_body("int main() { int a = 1; int b = -a; bool c = !a; }");
    assert_eq!(&lines[3..10], &[
        "mov eax, DWORD [rbp-4]",
        "neg eax",
        "mov DWORD [rbp-8], eax",
        "mov eax, DWORD [rbp-4]",
        "cmp eax, 0",
        "sete al",
        "mov BYTE [rbp-9], al",
    ]);
}

#[test]
fn widened_arithmetic() {
    let lines = main_body("int main() { char c = 1; long l = 2; long r = c + l; }");
    assert_eq!(&lines[4..7], &[
        "movsx rax, BYTE [rbp-1]",
        "add rax, QWORD [rbp-16]",
        "mov QWORD [rbp-24], rax",
    ]);
}

//
// Frames, globals and aggregates
//

#[test]
fn red_zone_can_be_disabled() {
    let source = "int main() { int a = 1; return a; }";
    let flags = Flags { mno_red_zone: true, ..Flags::default() };
    let lines = body(&try_asm(source, &flags).unwrap(), "main");
    assert_eq!(lines, vec![
        "push rbp",
        "mov rbp, rsp",
        "sub rsp, 16",
        "mov DWORD [rbp-4], 1",
        "mov eax, DWORD [rbp-4]",
        "leave",
        "ret",
    ]);
}

#[test]
fn large_frames_reserve_stack() {
    let decls: String = (0..16).map(|i| format!("long v{} = {};", i, i)).collect();
    let lines = main_body(&format!("int main() {{ {} }}", decls));
    assert_eq!(lines[2], "sub rsp, 128");
    assert_eq!(lines[lines.len() - 2], "leave");
}

#[test]
fn globals_and_strings() {
    let text = asm("int g = 5; long z; string s = \"hi\"; int main() { return g; }");
    assert!(text.contains("section .bss\nz: resq 1\n"), "{}", text);
    assert!(text.contains("g: dd 5\n"));
    assert!(text.contains("s: dq __str0\n__str0: db 0x68, 0x69, 0\n"));
    assert_eq!(body(&text, "main")[2], "mov eax, DWORD [rel g]");
}

#[test]
fn struct_members() {
    let lines = main_body("struct P { int x; long y; }; int main() { P p; p.y = 7; return p.x; }");
    assert_eq!(&lines[2..4], &[
        "mov QWORD [rbp-8], 7",
        "mov eax, DWORD [rbp-16]",
    ]);
}

#[test]
fn parameters_spill_from_registers() {
    let text = asm("int add(int a, long b) { return a + b; } int main() { return 0; }");
    assert_eq!(body(&text, "add"), vec![
        "push rbp",
        "mov rbp, rsp",
        "mov DWORD [rbp-4], edi",
        "mov QWORD [rbp-16], rsi",
        "mov eax, DWORD [rbp-4]",
        "cdqe",
        "add rax, QWORD [rbp-16]",
        "pop rbp",
        "ret",
    ]);
}

#[test]
fn methods_are_not_emitted() {
    let text = asm("class C { public: int v; int get() { return 1; } }; int main() { return 0; }");
    assert!(!text.contains("get:"));
    assert!(text.contains("main:"));
}
