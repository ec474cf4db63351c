//! Byte offsets of every field in a BOP Header block.
//!
//! ```text
//! ┌────────┬────────┬──────────────────────────────────────────────┐
//! │ Offset │ Size   │ Field                                        │
//! ├────────┼────────┼──────────────────────────────────────────────┤
//! │ 0x000  │ 4      │ Identifier (FSBL, FCB, ICB, PCB, UBOT)       │
//! │ 0x004  │ 4      │ Version (u32)                                │
//! │ 0x008  │ 8      │ Size of this BOP in bytes (u64)              │
//! │ 0x010  │ 32     │ Tool string                                  │
//! │ 0x030  │ 16     │ OPN string                                   │
//! │ 0x040  │ 4      │ JTAG ID (u32)                                │
//! │ 0x044  │ 4      │ JTAG mask (u32)                              │
//! │ 0x050  │ 16     │ Obscured chip id + CRC32                     │
//! │ 0x060  │ 1      │ Checksum selector                            │
//! │ 0x061  │ 1      │ Compression selector                         │
//! │ 0x062  │ 1      │ Integrity selector                           │
//! │ 0x080  │ 1      │ Encryption selector                          │
//! │ 0x081  │ 1      │ Authentication selector                      │
//! │ 0x0C0  │ 4      │ Action version (u32)                         │
//! │ 0x0C4  │ 4      │ Action count (u32)                           │
//! │ 0x0C8  │ 312    │ Embedded action records                      │
//! │ 0x200  │ 64     │ Integrity hash (32/48/64 bytes used)         │
//! │ 0x240  │ 64     │ Encrypted challenge                          │
//! │ 0x280  │ 16     │ IV                                           │
//! │ 0x570  │ 272    │ Public key                                   │
//! │ 0x680  │ 256    │ Signature over bytes 0x000..0x680            │
//! │ 0x780  │ 1      │ Flags (bit 0 = last BOP)                     │
//! │ 0x788  │ 8      │ End size (u64)                               │
//! │ 0x7FC  │ 4      │ CRC32 over bytes 0x000..0x7FC                │
//! └────────┴────────┴──────────────────────────────────────────────┘
//! ```
//!
//! All multi-byte integers are little endian.

pub const IDENTIFIER: usize = 0x000;
pub const IDENTIFIER_LEN: usize = 4;
pub const VERSION: usize = 0x004;
pub const SIZE: usize = 0x008;
pub const TOOL: usize = 0x010;
pub const TOOL_LEN: usize = 32;
pub const OPN: usize = 0x030;
pub const OPN_LEN: usize = 16;
pub const JTAG_ID: usize = 0x040;
pub const JTAG_MASK: usize = 0x044;
pub const OBSCURED: usize = 0x050;
pub const OBSCURED_LEN: usize = 16;
pub const CHECKSUM: usize = 0x060;
pub const COMPRESSION: usize = 0x061;
pub const INTEGRITY: usize = 0x062;
pub const ENCRYPTION: usize = 0x080;
pub const AUTHENTICATION: usize = 0x081;

/// Start of the action stream inside the header (version + count + records).
pub const ACTION_REGION: usize = 0x0C0;
pub const ACTION_REGION_LEN: usize = HASH - ACTION_REGION;
pub const ACTION_VERSION: usize = 0x0C0;
pub const ACTION_COUNT: usize = 0x0C4;
/// First action record word inside the header.
pub const ACTION_RECORDS: usize = 0x0C8;
/// Number of u32 words available to records inside the header (78).
pub const HEADER_ACTION_WORDS: usize = (HASH - ACTION_RECORDS) / 4;

pub const HASH: usize = 0x200;
/// Bytes reserved for the header digest; also the obscuring key length.
pub const HASH_LEN: usize = 64;
pub const CHALLENGE: usize = 0x240;
pub const CHALLENGE_LEN: usize = 64;
pub const IV: usize = 0x280;
pub const IV_LEN: usize = 16;
pub const PUBLIC_KEY: usize = 0x570;
pub const PUBLIC_KEY_MAX: usize = 272;
pub const SIGNATURE: usize = 0x680;
pub const SIGNATURE_MAX: usize = 0x100;
/// Signed region: everything before the signature.
pub const SIGNED_LEN: usize = SIGNATURE;
pub const FLAGS: usize = 0x780;
pub const END_SIZE: usize = 0x788;
pub const CRC: usize = 0x7FC;

/// Bit 0 of [`FLAGS`]: this is the last BOP of the stream.
pub const LAST_BOP_FLAG: u8 = 0x01;

/// Action stream format version written at [`ACTION_VERSION`].
pub const ACTION_STREAM_VERSION: u32 = 0;
