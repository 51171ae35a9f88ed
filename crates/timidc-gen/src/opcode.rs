//! Opcode definitions.
//!
//! The discriminants are the wire format: a compiled `.timb` file stores
//! these exact byte values, so the table below is append-only and the
//! assigned numbers never move.

use static_assertions::const_assert_eq;

/// Declares the opcode enum together with its `TryFrom<u8>` decoding and
/// disassembly mnemonics.
macro_rules! opcodes {
    ($(#[$meta:meta])* $vis:vis enum $name:ident {
        $($(#[$vmeta:meta])* $vname:ident = $val:expr => $mnemonic:expr,)*
    }) => {
        $(#[$meta])*
        $vis enum $name {
            $($(#[$vmeta])* $vname = $val,)*
        }

        impl $name {
            /// The disassembly name of this opcode.
            pub fn mnemonic(self) -> &'static str {
                match self {
                    $($name::$vname => $mnemonic,)*
                }
            }
        }

        impl std::convert::TryFrom<u8> for $name {
            type Error = InvalidOpcode;

            fn try_from(byte: u8) -> Result<Self, Self::Error> {
                match byte {
                    $(x if x == $name::$vname as u8 => Ok($name::$vname),)*
                    _ => Err(InvalidOpcode(byte)),
                }
            }
        }
    }
}

/// A byte that decodes to no known opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidOpcode(pub u8);

opcodes! {
    /// A one-byte operation code for the Timid virtual machine.
    #[repr(u8)]
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum OpCode {
        Nop = 0 => "OP_NOP",
        /// Push a pool constant; 1-byte index operand
        Constant = 1 => "OP_CONSTANT",
        /// Push a pool constant; 3-byte little-endian index operand
        ConstantLong = 2 => "OP_CONSTANT_LONG",

        // Small-immediate integer pushes
        Neg1 = 3 => "OP_NEG1",
        Zero = 4 => "OP_0",
        One = 5 => "OP_1",
        Two = 6 => "OP_2",

        True = 7 => "OP_TRUE",
        False = 8 => "OP_FALSE",
        Null = 9 => "OP_NULL",

        Print = 10 => "OP_PRINT",
        Pop = 11 => "OP_POP",
        Negate = 12 => "OP_NEGATE",
        Not = 13 => "OP_NOT",
        Fact = 14 => "OP_FACT",

        Add = 15 => "OP_ADD",
        Sub = 16 => "OP_SUB",
        Mul = 17 => "OP_MUL",
        Div = 18 => "OP_DIV",
        Mod = 19 => "OP_MOD",
        Pow = 20 => "OP_POW",
        Eq = 21 => "OP_EQ",
        Lt = 22 => "OP_LT",
        Gt = 23 => "OP_GT",
        And = 24 => "OP_AND",
        Or = 25 => "OP_OR",

        // Control flow; all take a 16-bit little-endian distance operand
        JumpIfFls = 26 => "OP_JUMP_IF_FLS",
        Jump = 27 => "OP_JUMP",
        Loop = 28 => "OP_LOOP",

        // Globals are named by a pool index, encoded as a trailing
        // CONSTANT / CONSTANT_LONG instruction
        DefineGlobal = 29 => "OP_DEFINE_GLOBAL",
        GetGlobal = 30 => "OP_GET_GLOBAL",
        SetGlobal = 31 => "OP_SET_GLOBAL",
        /// 1-byte slot operand
        GetLocal = 32 => "OP_GET_LOCAL",
        /// 1-byte slot operand
        SetLocal = 33 => "OP_SET_LOCAL",

        GetInput = 34 => "OP_GET_INPUT",
        Subscript = 35 => "OP_SUBSCRIPT",
        Return = 36 => "OP_RETURN",
    }
}

// Pin the ends of the table; shifting any value breaks every compiled file.
const_assert_eq!(OpCode::Nop as u8, 0);
const_assert_eq!(OpCode::True as u8, 7);
const_assert_eq!(OpCode::JumpIfFls as u8, 26);
const_assert_eq!(OpCode::Return as u8, 36);
