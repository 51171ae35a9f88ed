//! Bytecode file serialisation.
//!
//! Layout of a `.timb` file:
//!
//! ```text
//! offset 0   magic bytes 0xFA 0xCC
//! offset 2   constant count, 4 bytes little-endian
//! then       constant records (tag byte + payload each)
//! then       the code stream
//! ```
//!
//! The explicit constant count lets the consumer find the pool/code
//! boundary without walking type tags, which would be fragile the moment
//! an opcode value collided with a tag value.

use std::fs;
use std::io;
use std::path::Path;

use crate::chunk::Chunk;

/// The two magic bytes every compiled file starts with.
pub const MAGIC: [u8; 2] = [0xFA, 0xCC];

/// Serialises a chunk into the on-disk image.
pub fn to_bytes(chunk: &Chunk) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + chunk.code_len());

    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&(chunk.constant_count() as u32).to_le_bytes());

    for constant in chunk.constants() {
        constant.write_to(&mut out);
    }

    out.extend_from_slice(chunk.code());
    out
}

/// Writes a chunk to `path` atomically.
///
/// The image lands in a temporary sibling file first and is renamed over
/// the target, so a crash mid-write never leaves a truncated `.timb`.
pub fn write(chunk: &Chunk, path: &Path) -> io::Result<()> {
    let bytes = to_bytes(chunk);

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    fs::write(&tmp, &bytes)?;
    if let Err(error) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(error);
    }
    Ok(())
}
