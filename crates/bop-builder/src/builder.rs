use std::sync::Arc;

use bop_codec::compress;
use bop_crypto::{AesKey, CryptoProvider, RustCryptoProvider, SigningKey, increment_iv};
use bop_types::{
    Action, ActionFlags, ChecksumKind, CompressionKind, Diagnostics, Severity, TracingDiagnostics,
};
use bop_wire::checksum::{crc32, fletcher32};
use bop_wire::layout::{
    ACTION_STREAM_VERSION, AUTHENTICATION, CHALLENGE, CHALLENGE_LEN, CHECKSUM, COMPRESSION, CRC,
    ENCRYPTION, HASH, HASH_LEN, IDENTIFIER, INTEGRITY, IV, JTAG_ID, JTAG_MASK, OBSCURED,
    OBSCURED_LEN, OPN, PUBLIC_KEY, PUBLIC_KEY_MAX, SIGNATURE, SIGNATURE_MAX, SIGNED_LEN, SIZE,
    TOOL, VERSION,
};
use bop_wire::obscure::{obscure, seal_chip_id};
use bop_wire::{BLOCK_SIZE, Block, BlockKind};
use zeroize::Zeroizing;

use crate::action_writer::{ActionRecord, ActionWriter};
use crate::config::BopConfig;
use crate::error::BuildError;
use crate::hash_chain;
use crate::multi::patch_end_sizes;

/// Trailing CRC32 of the 64-byte challenge.
const CHALLENGE_CRC_LEN: usize = 4;

/// BOP package builder: turns actions plus header settings into a
/// `.cfgbit` byte stream.
///
/// Call [`add_bop`](Self::add_bop) to open a BOP and
/// [`add_action`](Self::add_action) to append actions to the most
/// recently opened one. Compression, the AES key and the signing key
/// apply to every BOP in the stream.
///
/// # Build order
///
/// Each BOP is produced in a fixed order, because later steps cover the
/// bytes written by earlier ones:
///
///   1. Basic header fields (identifier, strings, JTAG, sealed chip id,
///      feature selectors).
///   2. Encryption fields: the encrypted challenge and starting IV.
///   3. The action stream, with payload Data blocks in between.
///   4. The hash chain over every block after the header.
///   5. Chip-id obscuring against the header digest.
///   6. The size field.
///   7. The signature over bytes `0x000..0x680`.
///   8. The header CRC.
///
/// Once every BOP exists, end sizes and the last-BOP flag are patched
/// across the whole stream.
///
/// # Usage
///
/// ```rust
/// use bop_builder::{BopConfig, PackageBuilder};
/// use bop_types::{Action, BopIdentifier, CommandId};
///
/// let stream = PackageBuilder::new()
///     .add_bop(BopConfig::new(BopIdentifier::Fsbl))
///     .add_action(Action::new(CommandId::new(0x001).unwrap()).with_payload(vec![0; 64]).with_checksum())
///     .build()
///     .unwrap();
/// assert_eq!(stream.len() % 2048, 0);
/// ```
pub struct PackageBuilder {
    bops: Vec<PendingBop>,
    compression: bool,
    aes_key: Option<AesKey>,
    signing_key: Option<SigningKey>,
    crypto: Arc<dyn CryptoProvider>,
    diagnostics: Arc<dyn Diagnostics>,
}

struct PendingBop {
    config: BopConfig,
    actions: Vec<Action>,
}

impl Default for PackageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageBuilder {
    /// Compression on, no encryption, no signature, RustCrypto provider,
    /// diagnostics to `tracing`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bops: Vec::new(),
            compression: true,
            aes_key: None,
            signing_key: None,
            crypto: Arc::new(RustCryptoProvider),
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    /// Open a new BOP. Following actions are appended to it.
    pub fn add_bop(&mut self, config: BopConfig) -> &mut Self {
        self.bops.push(PendingBop {
            config,
            actions: Vec::new(),
        });
        self
    }

    /// Append an action to the current BOP, opening a default one if
    /// none exists yet.
    pub fn add_action(&mut self, action: Action) -> &mut Self {
        if self.bops.is_empty() {
            self.add_bop(BopConfig::default());
        }
        if let Some(bop) = self.bops.last_mut() {
            bop.actions.push(action);
        }
        self
    }

    pub fn with_compression(&mut self, enabled: bool) -> &mut Self {
        self.compression = enabled;
        self
    }

    /// Encrypt the challenge and every payload. The key length picks
    /// `ctr128` or `ctr256`.
    pub fn with_aes_key(&mut self, key: AesKey) -> &mut Self {
        self.aes_key = Some(key);
        self
    }

    pub fn with_signing_key(&mut self, key: SigningKey) -> &mut Self {
        self.signing_key = Some(key);
        self
    }

    pub fn set_crypto(&mut self, crypto: Arc<dyn CryptoProvider>) -> &mut Self {
        self.crypto = crypto;
        self
    }

    pub fn set_diagnostics(&mut self, diagnostics: Arc<dyn Diagnostics>) -> &mut Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Serialise every BOP into one stream.
    ///
    /// # Errors
    ///
    /// - [`BuildError::NoBops`] / [`BuildError::EmptyBop`] for nothing to
    ///   build.
    /// - [`BuildError::FieldTooLong`] for oversized header strings.
    /// - [`BuildError::UnalignedChecksumPayload`],
    ///   [`BuildError::RecordTooLarge`], [`BuildError::PayloadTooLarge`]
    ///   for actions that cannot be encoded.
    /// - Crypto and codec errors from the payload pipeline.
    pub fn build(&self) -> Result<Vec<u8>, BuildError> {
        if self.bops.is_empty() {
            return Err(BuildError::NoBops);
        }
        let mut stream = Vec::new();
        let mut sizes = Vec::with_capacity(self.bops.len());
        for (index, bop) in self.bops.iter().enumerate() {
            let blocks = self.build_bop(index, bop)?;
            sizes.push(blocks.len() * BLOCK_SIZE);
            for block in &blocks {
                stream.extend_from_slice(block.as_bytes());
            }
        }
        patch_end_sizes(&mut stream, &sizes)?;
        self.diagnostics.emit(
            Severity::Info,
            &format!("built {} BOP(s), {} bytes", self.bops.len(), stream.len()),
        );
        Ok(stream)
    }

    fn build_bop(&self, index: usize, bop: &PendingBop) -> Result<Vec<Block>, BuildError> {
        if bop.actions.is_empty() {
            return Err(BuildError::EmptyBop { index });
        }
        let config = &bop.config;
        config.validate()?;

        let mut header = Block::new(BlockKind::Header);
        self.write_basic_fields(&mut header, config)?;
        let mut iv = self.write_encryption_fields(&mut header, config)?;

        let mut writer = ActionWriter::new(header);
        let count = u32::try_from(bop.actions.len()).map_err(|_| BuildError::FieldTooLong {
            field: "action count",
            len: bop.actions.len(),
            max: u32::MAX as usize,
        })?;
        writer.write(&ACTION_STREAM_VERSION.to_le_bytes())?;
        writer.write(&count.to_le_bytes())?;
        for action in &bop.actions {
            self.write_action(&mut writer, action, config.checksum, &mut iv)?;
        }
        let (header, body) = writer.finish();

        let mut blocks = hash_chain::chain(
            header,
            body,
            config.integrity,
            self.crypto.as_ref(),
            self.diagnostics.as_ref(),
        )?;
        let len = blocks.len() * BLOCK_SIZE;
        let total = u64::try_from(len).map_err(|_| BuildError::MisalignedStream { len })?;
        let header = &mut blocks[0];
        obscure_chip_id(header)?;
        header.set_u64(SIZE, total);
        self.sign(header)?;
        let crc = crc32(&header.as_bytes()[..CRC]);
        header.set_u32(CRC, crc);

        self.diagnostics.emit(
            Severity::Debug,
            &format!("BOP #{index} {}: {} action(s), {total} bytes", config.identifier, bop.actions.len()),
        );
        Ok(blocks)
    }

    fn write_basic_fields(&self, header: &mut Block, config: &BopConfig) -> Result<(), BuildError> {
        header.write_at(IDENTIFIER, &config.identifier.to_wire())?;
        header.set_u32(VERSION, config.version);
        header.write_at(TOOL, config.tool.as_bytes())?;
        header.write_at(OPN, config.opn.as_bytes())?;
        header.set_u32(JTAG_ID, config.jtag_id);
        header.set_u32(JTAG_MASK, config.jtag_mask);
        header.write_at(OBSCURED, &seal_chip_id(config.chip_id))?;
        header.set_u8(CHECKSUM, config.checksum.to_wire_byte());
        let compression = if self.compression {
            CompressionKind::Dcmp0
        } else {
            CompressionKind::None
        };
        header.set_u8(COMPRESSION, compression.to_wire_byte());
        header.set_u8(INTEGRITY, config.integrity.to_wire_byte());
        Ok(())
    }

    /// Write the challenge and IV; returns the rolling IV for payloads.
    fn write_encryption_fields(&self, header: &mut Block, config: &BopConfig) -> Result<Zeroizing<[u8; 16]>, BuildError> {
        let mut iv = Zeroizing::new([0u8; 16]);
        let Some(key) = &self.aes_key else {
            return Ok(iv);
        };
        header.set_u8(ENCRYPTION, key.encryption_kind().to_wire_byte());
        match config.iv {
            Some(start) => *iv = start,
            None => self.crypto.random_bytes(&mut iv[..]),
        }

        let mut challenge = Zeroizing::new([0u8; CHALLENGE_LEN]);
        let body_len = CHALLENGE_LEN - CHALLENGE_CRC_LEN;
        self.crypto.random_bytes(&mut challenge[..body_len]);
        let crc = crc32(&challenge[..body_len]);
        challenge[body_len..].copy_from_slice(&crc.to_le_bytes());
        self.crypto.ctr(key, &iv, &mut challenge[..])?;

        header.write_at(CHALLENGE, &challenge[..])?;
        header.write_at(IV, &iv[..])?;
        increment_iv(&mut iv);
        Ok(iv)
    }

    fn write_action(
        &self,
        writer: &mut ActionWriter,
        action: &Action,
        checksum_kind: ChecksumKind,
        iv: &mut [u8; 16],
    ) -> Result<(), BuildError> {
        let cmd = action.cmd();
        let requested = action.flags();
        let original = action.payload();
        let original_len = u32::try_from(original.len()).map_err(|_| BuildError::PayloadTooLarge {
            cmd: cmd.get(),
            size: original.len(),
        })?;

        let mut flags = ActionFlags::NONE;
        let mut checksum = 0;
        let mut stored = Zeroizing::new(Vec::new());
        if action.has_payload() {
            if requested.has_checksum() {
                if original.len() % 4 != 0 {
                    return Err(BuildError::UnalignedChecksumPayload {
                        cmd: cmd.get(),
                        len: original.len(),
                    });
                }
                checksum = match checksum_kind {
                    ChecksumKind::Fletcher32 => fletcher32(original)?,
                };
                flags.insert(ActionFlags::CHECKSUM);
            }
            if requested.has_original_size() {
                flags.insert(ActionFlags::ORIGINAL_SIZE);
            }

            if self.compression {
                // Decompressed output is consumed in whole words.
                let compressed = if original.len() % 4 == 0 {
                    Some(Zeroizing::new(compress(original)?))
                } else {
                    None
                };
                match compressed.filter(|c| c.len() < original.len()) {
                    Some(compressed) => stored = compressed,
                    None => flags.insert(ActionFlags::NO_COMPRESSION),
                }
            }
            if stored.is_empty() {
                stored.extend_from_slice(original);
            }

            if let Some(key) = &self.aes_key {
                if let Some(dedicated) = action.dedicated_iv() {
                    self.crypto.ctr(key, dedicated, &mut stored)?;
                    flags.insert(ActionFlags::DEDICATED_IV);
                } else {
                    self.crypto.ctr(key, iv, &mut stored)?;
                    increment_iv(iv);
                }
            }
        }

        let stored_len = u32::try_from(stored.len()).map_err(|_| BuildError::PayloadTooLarge {
            cmd: cmd.get(),
            size: stored.len(),
        })?;
        let record = ActionRecord {
            cmd,
            flags,
            stored_len,
            original_len,
            checksum,
            fields: action.fields(),
            iv: action.dedicated_iv(),
        };
        writer.write(&record.encode()?)?;
        writer.push_payload(&stored);

        self.diagnostics.emit(
            Severity::Debug,
            &format!(
                "action 0x{:03X}: flags 0x{:04X}, payload {} -> {} bytes",
                cmd.get(),
                flags.raw(),
                original.len(),
                stored.len()
            ),
        );
        Ok(())
    }

    fn sign(&self, header: &mut Block) -> Result<(), BuildError> {
        let Some(key) = &self.signing_key else {
            return Ok(());
        };
        header.set_u8(AUTHENTICATION, key.scheme().to_wire_byte());
        let public = key.public_key_bytes();
        if public.len() > PUBLIC_KEY_MAX {
            return Err(BuildError::KeyMaterialTooLarge {
                what: "public key",
                len: public.len(),
                max: PUBLIC_KEY_MAX,
            });
        }
        header.write_at(PUBLIC_KEY, &public)?;

        let signature = self.crypto.sign(key, &header.as_bytes()[..SIGNED_LEN])?;
        if signature.len() > SIGNATURE_MAX {
            return Err(BuildError::KeyMaterialTooLarge {
                what: "signature",
                len: signature.len(),
                max: SIGNATURE_MAX,
            });
        }
        header.write_at(SIGNATURE, &signature)?;
        Ok(())
    }
}

/// Scramble the sealed chip-id field with the header digest.
fn obscure_chip_id(header: &mut Block) -> Result<(), BuildError> {
    let mut field = [0u8; OBSCURED_LEN];
    field.copy_from_slice(&header.as_bytes()[OBSCURED..OBSCURED + OBSCURED_LEN]);
    let mut key = [0u8; HASH_LEN];
    key.copy_from_slice(&header.as_bytes()[HASH..HASH + HASH_LEN]);
    obscure(&mut field, &key);
    header.write_at(OBSCURED, &field)?;
    Ok(())
}
