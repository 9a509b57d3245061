use crate::errors::CoreError;

use super::encryption::{KdfParams, Sealed, NONCE_LEN, SALT_LEN};

/// Magic bytes of a workspace snapshot.
pub const MAGIC: &[u8; 4] = b"RJNL";

/// Current snapshot format version.
pub const CURRENT_VERSION: u16 = 1;

/// magic(4) + version(2) + kdf(3×4) + salt(16) + nonce(12)
pub const HEADER_LEN: usize = 4 + 2 + 12 + SALT_LEN + NONCE_LEN;

/// Snapshot layout, all integers little-endian:
///
/// ```text
/// [RJNL] [version u16] [m_cost u32] [t_cost u32] [p_cost u32]
/// [salt 16B] [nonce 12B] [ciphertext ..EOF]
/// ```
pub fn encode(sealed: &Sealed) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + sealed.ciphertext.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&CURRENT_VERSION.to_le_bytes());
    for word in [sealed.kdf.memory_cost, sealed.kdf.time_cost, sealed.kdf.parallelism] {
        out.extend_from_slice(&word.to_le_bytes());
    }
    out.extend_from_slice(&sealed.salt);
    out.extend_from_slice(&sealed.nonce);
    out.extend_from_slice(&sealed.ciphertext);
    out
}

/// Parse snapshot bytes back into a sealed payload.
pub fn decode(data: &[u8]) -> Result<Sealed, CoreError> {
    let mut rd = ByteReader { data, pos: 0 };

    if rd.take::<4>()? != *MAGIC {
        return Err(CoreError::InvalidSnapshot("Not a workspace snapshot (bad magic)".into()));
    }
    let version = u16::from_le_bytes(rd.take::<2>()?);
    if version == 0 || version > CURRENT_VERSION {
        return Err(CoreError::UnsupportedVersion(version));
    }

    let kdf = KdfParams {
        memory_cost: u32::from_le_bytes(rd.take::<4>()?),
        time_cost: u32::from_le_bytes(rd.take::<4>()?),
        parallelism: u32::from_le_bytes(rd.take::<4>()?),
    };
    kdf.check_bounds()?;

    let salt = rd.take::<SALT_LEN>()?;
    let nonce = rd.take::<NONCE_LEN>()?;
    let ciphertext = rd.rest();
    if ciphertext.is_empty() {
        return Err(CoreError::InvalidSnapshot("Snapshot has no payload".into()));
    }

    Ok(Sealed {
        kdf,
        salt,
        nonce,
        ciphertext: ciphertext.to_vec(),
    })
}

struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N], CoreError> {
        let end = self.pos + N;
        let chunk = self.data.get(self.pos..end).ok_or_else(|| {
            CoreError::InvalidSnapshot(format!("Snapshot truncated at byte {}", self.pos))
        })?;
        self.pos = end;
        let mut out = [0u8; N];
        out.copy_from_slice(chunk);
        Ok(out)
    }

    fn rest(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }
}
