//! Packing and unpacking of the 64-bit bus request register.
//!
//! Every command to the device travels through a single register.
//! Field layout, most significant bit first:
//!
//! | Bits   | Field      | Meaning                                 |
//! |--------|------------|-----------------------------------------|
//! | 63..56 | key1       | Opcode                                  |
//! | 55..48 | key2       | Reserved, zero                          |
//! | 47     | ret        | Device return code (responses only)     |
//! | 46..31 | cartridge1 | Cartridge argument                      |
//! | 30..15 | frame1     | Frame argument                          |
//! | 14..0  | reserved   | Zero                                    |

const KEY1_SHIFT: u32 = 56;
const RET_SHIFT: u32 = 47;
const CARTRIDGE_SHIFT: u32 = 31;
const FRAME_SHIFT: u32 = 15;
const FIELD16: u64 = 0xffff;

/// Commands understood by the device, carried in `key1`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Init = 0,
    ZeroCartridge = 1,
    LoadCartridge = 2,
    ReadFrame = 3,
    WriteFrame = 4,
    Shutdown = 5,
}

impl Opcode {
    pub fn from_key(key1: u8) -> Option<Self> {
        match key1 {
            0 => Some(Opcode::Init),
            1 => Some(Opcode::ZeroCartridge),
            2 => Some(Opcode::LoadCartridge),
            3 => Some(Opcode::ReadFrame),
            4 => Some(Opcode::WriteFrame),
            5 => Some(Opcode::Shutdown),
            _ => None,
        }
    }
}

/// The decoded fields of a bus register value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusWord {
    pub key1: u8,
    pub cartridge: u16,
    pub frame: u16,
    pub ret: bool,
}

impl BusWord {
    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::from_key(self.key1)
    }
}

/// Builds a request word. Requests always carry `ret = 0` and zeroed
/// reserved fields.
pub fn encode(op: Opcode, cartridge: u16, frame: u16) -> u64 {
    (op as u64) << KEY1_SHIFT | (cartridge as u64) << CARTRIDGE_SHIFT | (frame as u64) << FRAME_SHIFT
}

/// Extracts the fields of a register value. Never fails; an unknown
/// opcode is preserved raw in `key1`.
pub fn decode(word: u64) -> BusWord {
    BusWord {
        key1: (word >> KEY1_SHIFT) as u8,
        cartridge: (word >> CARTRIDGE_SHIFT & FIELD16) as u16,
        frame: (word >> FRAME_SHIFT & FIELD16) as u16,
        ret: word >> RET_SHIFT & 1 == 1,
    }
}
