use pretty_assertions::assert_eq;

use z80mon::encoder::Encoder;
use z80mon::parser::parse_instruction;
use z80mon::Z80Encoder;

fn asm(text: &str, addr: u16) -> Result<Vec<u8>, String> {
    let inst = parse_instruction(text).map_err(|e| e.to_string())?;
    Z80Encoder::default()
        .assemble(&inst, addr)
        .map(|c| c.as_slice().to_vec())
        .map_err(|e| e.to_string())
}

#[test]
fn relative_branch_limits() {
    assert_eq!(asm("JR $1081", 0x1000), Ok(vec![0x18, 0x7F]));
    assert_eq!(asm("JR $0F82", 0x1000), Ok(vec![0x18, 0x80]));
    assert_eq!(asm("JR $1082", 0x1000), Err("$1082?".into()));
    assert_eq!(asm("DJNZ $0F81", 0x1000), Err("$0F81?".into()));
    // Offsets wrap with the 16-bit address space
    assert_eq!(asm("JR $0010", 0xFFF0), Ok(vec![0x18, 0x1E]));
}

#[test]
fn jr_takes_only_the_first_four_conditions() {
    assert_eq!(asm("JR C,$0000", 0), Ok(vec![0x38, 0xFE]));
    assert_eq!(asm("JR PO,$0000", 0), Err("PO?".into()));
    assert_eq!(asm("JP PO,$0000", 0), Ok(vec![0xE2, 0x00, 0x00]));
    assert_eq!(asm("DJNZ NZ,$0000", 0), Err("NZ?".into()));
}

#[test]
fn restart_vectors() {
    assert_eq!(asm("RST $38", 0), Ok(vec![0xFF]));
    assert_eq!(asm("RST 8", 0), Ok(vec![0xCF]));
    assert_eq!(asm("RST $39", 0), Err("$0039?".into()));
    assert_eq!(asm("RST $40", 0), Err("$0040?".into()));
}

#[test]
fn small_immediates() {
    assert_eq!(asm("BIT 8,A", 0), Err("$0008?".into()));
    assert_eq!(asm("IM 3", 0), Err("$0003?".into()));
    assert_eq!(asm("LD A,$100", 0), Err("$0100?".into()));
    assert_eq!(asm("LD A,$FF", 0), Ok(vec![0x3E, 0xFF]));
    assert_eq!(asm("OUT (C),1", 0), Err("$0001?".into()));
}

#[test]
fn displacement_limits() {
    assert_eq!(asm("LD A,(IX+127)", 0), Ok(vec![0xDD, 0x7E, 0x7F]));
    assert_eq!(asm("LD A,(IX-128)", 0), Ok(vec![0xDD, 0x7E, 0x80]));
    assert_eq!(asm("LD A,(IX+128)", 0), Err("disp: 128?".into()));
    assert_eq!(asm("LD A,(IX-129)", 0), Err("disp: 129?".into()));
}

#[test]
fn bare_index_register_gets_a_zero_displacement() {
    assert_eq!(asm("LD A,(IX)", 0), Ok(vec![0xDD, 0x7E, 0x00]));
    assert_eq!(asm("RLC (IX)", 0), Ok(vec![0xDD, 0xCB, 0x00, 0x06]));
    assert_eq!(asm("LD (IY),$12", 0), Ok(vec![0xFD, 0x36, 0x00, 0x12]));
}

#[test]
fn operand_count() {
    assert_eq!(asm("LD A", 0), Err("arg?".into()));
    assert_eq!(asm("NOP A", 0), Err("A?".into()));
    assert_eq!(asm("LD A,B,C", 0), Err("C?".into()));
}
