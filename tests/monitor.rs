use pretty_assertions::assert_eq;

use z80mon::{CodecConfig, LinearMemory, Monitor};

fn run(mon: &mut Monitor<LinearMemory>, line: &str) -> (String, Option<String>) {
    let mut out = String::new();
    let prompt = mon.execute(line, &mut out);
    (out, prompt)
}

fn monitor() -> Monitor<LinearMemory> {
    Monitor::new(LinearMemory::new(), CodecConfig::default())
}

#[test]
fn asm_writes_echoes_and_advances() {
    let mut mon = monitor();
    let (out, prompt) = run(&mut mon, "asm $8000 LD HL,$1234");
    assert_eq!(out, "8000:  LD HL,$1234\n");
    assert_eq!(prompt.as_deref(), Some("asm $8003 "));
    assert_eq!(mon.bus.bytes(0x8000, 3), vec![0x21, 0x34, 0x12]);

    let (out, prompt) = run(&mut mon, "asm $8003 jr $8000");
    assert_eq!(out, "8003:  JR $8000\n");
    assert_eq!(prompt.as_deref(), Some("asm $8005 "));
}

#[test]
fn typed_mnemonics_continue_the_asm_prompt() {
    let mut mon = monitor();
    let (_, prompt) = run(&mut mon, "asm $8000 LD A,1");
    let prompt = prompt.unwrap_or_default();
    assert_eq!(prompt, "asm $8002 ");

    let line = Monitor::<LinearMemory>::continue_line(&prompt, "INC A");
    let (out, prompt) = run(&mut mon, &line);
    assert_eq!(out, "8002:  INC A\n");
    assert_eq!(prompt.as_deref(), Some("asm $8003 "));
    assert_eq!(mon.bus.bytes(0x8000, 3), vec![0x3E, 0x01, 0x3C]);
}

#[test]
fn asm_failures_keep_the_address() {
    let mut mon = monitor();
    assert_eq!(run(&mut mon, "asm $8000 LD Q,1"), ("Q?\n".into(), Some("asm $8000 ".into())));
    assert_eq!(run(&mut mon, "asm $8000 JR $9000"), ("$9000?\n".into(), Some("asm $8000 ".into())));
    assert_eq!(run(&mut mon, "asm $8000"), ("op: ?\n".into(), Some("asm $8000 ".into())));
    assert_eq!(mon.bus.bytes(0x8000, 2), vec![0, 0]);
    assert_eq!(run(&mut mon, "asm zz NOP"), ("start: zz?\n".into(), None));
}

#[test]
fn dasm_lists_and_resumes_after_errors() {
    let mut mon = monitor();
    mon.bus.load(0x100, &[0xED, 0x00, 0x00, 0xDD, 0xDD, 0x23]);
    let (out, prompt) = run(&mut mon, "dasm $100 6");
    assert_eq!(out, "0100:  $ED00?\n0102:  NOP\n0103:  $DDDD?\n0104:  INC IX\n");
    assert_eq!(prompt.as_deref(), Some("dasm $0106 "));
}

#[test]
fn dasm_defaults_to_one_instruction() {
    let mut mon = monitor();
    mon.bus.load(0, &[0xC3, 0x00, 0x80, 0x00]);
    let (out, prompt) = run(&mut mon, "dasm 0");
    assert_eq!(out, "0000:  JP $8000\n");
    assert_eq!(prompt.as_deref(), Some("dasm $0003 "));
}

#[test]
fn labeled_argument_errors() {
    let mut mon = monitor();
    assert_eq!(run(&mut mon, "dasm"), ("start: ?\n".into(), None));
    assert_eq!(run(&mut mon, "dasm $10 x"), ("size: x?\n".into(), None));
    assert_eq!(run(&mut mon, "poke 1 2"), ("cmd: poke?\n".into(), None));
}

#[test]
fn strict_monitor_rejects_undocumented() {
    let mut mon = Monitor::new(LinearMemory::new(), CodecConfig::strict());
    assert_eq!(run(&mut mon, "asm 0 SL1 A"), ("op: SL1?\n".into(), Some("asm $0000 ".into())));
}
