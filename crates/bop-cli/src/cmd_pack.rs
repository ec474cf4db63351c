/// Implementation of `bop pack`.
///
/// Reads a `.bitasm` JSON manifest describing one or more BOPs and their
/// actions, then writes the packed `.cfgbit` stream.
///
/// # Manifest format
///
/// ```json
/// {
///   "compression": true,
///   "bops": [
///     {
///       "identifier": "FSBL",
///       "tool": "bop 0.1",
///       "opn": "CFG-XL20",
///       "jtag_id": 305419896,
///       "integrity": "sha384",
///       "actions": [
///         { "type": "generic", "cmd": 2, "fields": [ { "u32": 16 } ] },
///         {
///           "type": "firmware_loading",
///           "payload_file": "fsbl.bin",
///           "checksum": true,
///           "original_size": true
///         }
///       ]
///     }
///   ]
/// }
/// ```
///
/// `payload_file` is resolved relative to the manifest; `payload_hex`
/// may be given inline instead.
///
/// # Action kinds
///
/// ```text
/// ┌──────────────────┬──────────────────────────────────────────────────┐
/// │ type             │ Meaning                                          │
/// ├──────────────────┼──────────────────────────────────────────────────┤
/// │ generic          │ any command id, optional fields and payload      │
/// │ firmware_loading │ cmd 0x001 with one payload (required)            │
/// └──────────────────┴──────────────────────────────────────────────────┘
/// ```
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use bop_builder::{BopConfig, PackageBuilder};
use bop_types::{Action, BopIdentifier, CommandId, FieldValue, IntegrityKind};

use crate::PackArgs;
use crate::keys::{load_aes_key, load_signing_key};

/// Command id of the firmware-loading action.
const FIRMWARE_LOADING: u16 = 0x001;

// ── Manifest serde types ──────────────────────────────────────────────────────

#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    #[serde(default = "default_true")]
    compression: bool,
    bops: Vec<ManifestBop>,
}

#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestBop {
    identifier: String,
    #[serde(default)]
    version: u32,
    #[serde(default)]
    tool: String,
    #[serde(default)]
    opn: String,
    #[serde(default)]
    jtag_id: u32,
    #[serde(default)]
    jtag_mask: u32,
    #[serde(default)]
    chip_id: u8,
    /// `sha256` (default) | `sha384` | `sha512`.
    integrity: Option<String>,
    /// 32 hex digits; random when absent.
    iv: Option<String>,
    actions: Vec<ManifestAction>,
}

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ManifestAction {
    Generic {
        cmd: u16,
        #[serde(default)]
        fields: Vec<ManifestField>,
        #[serde(flatten)]
        payload: PayloadSpec,
    },
    FirmwareLoading {
        #[serde(flatten)]
        payload: PayloadSpec,
    },
}

#[derive(serde::Deserialize, Default)]
struct PayloadSpec {
    payload_file: Option<String>,
    payload_hex: Option<String>,
    #[serde(default)]
    checksum: bool,
    #[serde(default)]
    original_size: bool,
    /// Dedicated IV for this payload, 32 hex digits.
    iv: Option<String>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "snake_case")]
enum ManifestField {
    U32(u32),
    U64(u64),
    /// Hex string of whole 4-byte words.
    Bytes(String),
}

fn default_true() -> bool {
    true
}

// ── Public entry point ────────────────────────────────────────────────────────

/// Run the `bop pack` command.
///
/// # Errors
///
/// Returns an error if the manifest or a payload file cannot be read, if
/// a manifest value is invalid, or if the builder rejects the package.
pub fn run(args: &PackArgs) -> Result<()> {
    let source =
        fs::read_to_string(&args.input).with_context(|| format!("cannot read {}", args.input.display()))?;
    let manifest: Manifest = serde_json::from_str(&source)
        .with_context(|| format!("failed to parse manifest {}", args.input.display()))?;
    if manifest.bops.is_empty() {
        bail!("manifest {} lists no BOPs", args.input.display());
    }
    let manifest_dir = args.input.parent().unwrap_or_else(|| Path::new("."));

    let mut builder = PackageBuilder::new();
    builder.with_compression(manifest.compression && !args.no_compression);
    if let Some(path) = &args.aes_key {
        builder.with_aes_key(load_aes_key(path)?);
    }
    if let Some(path) = &args.signing_key {
        builder.with_signing_key(load_signing_key(path)?);
    }

    for (bop_idx, bop) in manifest.bops.iter().enumerate() {
        builder.add_bop(bop_config(bop).with_context(|| format!("bop {bop_idx}: invalid header settings"))?);
        for (idx, action) in bop.actions.iter().enumerate() {
            let action = build_action(action, manifest_dir)
                .with_context(|| format!("bop {bop_idx}, action {idx}: failed to apply"))?;
            builder.add_action(action);
        }
    }

    let bytes = builder.build().context("PackageBuilder::build failed")?;
    fs::write(&args.output, &bytes).with_context(|| format!("cannot write {}", args.output.display()))?;

    println!(
        "Wrote {} bytes ({} BOP{}) to {}",
        bytes.len(),
        manifest.bops.len(),
        if manifest.bops.len() == 1 { "" } else { "s" },
        args.output.display()
    );
    Ok(())
}

// ── Manifest conversion ───────────────────────────────────────────────────────

fn bop_config(bop: &ManifestBop) -> Result<BopConfig> {
    let identifier: BopIdentifier = bop.identifier.parse()?;
    let mut config = BopConfig::new(identifier);
    config.version = bop.version;
    config.tool.clone_from(&bop.tool);
    config.opn.clone_from(&bop.opn);
    config.jtag_id = bop.jtag_id;
    config.jtag_mask = bop.jtag_mask;
    config.chip_id = bop.chip_id;
    if let Some(name) = &bop.integrity {
        config.integrity = name.parse::<IntegrityKind>()?;
    }
    config.iv = bop.iv.as_deref().map(parse_iv).transpose()?;
    config.validate()?;
    Ok(config)
}

fn build_action(action: &ManifestAction, manifest_dir: &Path) -> Result<Action> {
    let (cmd, fields, spec) = match action {
        ManifestAction::Generic { cmd, fields, payload } => (*cmd, fields.as_slice(), payload),
        ManifestAction::FirmwareLoading { payload } => {
            if payload.payload_file.is_none() && payload.payload_hex.is_none() {
                bail!("firmware_loading action requires \"payload_file\" or \"payload_hex\"");
            }
            (FIRMWARE_LOADING, &[][..], payload)
        }
    };

    let mut built = Action::new(CommandId::new(cmd)?);
    for field in fields {
        built = built.with_field(field_value(field)?)?;
    }
    if let Some(payload) = resolve_payload(spec, manifest_dir)? {
        built = built.with_payload(payload);
        if spec.checksum {
            built = built.with_checksum();
        }
        if spec.original_size {
            built = built.with_original_size();
        }
        if let Some(iv) = &spec.iv {
            built = built.with_dedicated_iv(parse_iv(iv)?);
        }
    } else if spec.checksum || spec.original_size || spec.iv.is_some() {
        bail!("\"checksum\", \"original_size\" and \"iv\" need a payload");
    }
    Ok(built)
}

fn field_value(field: &ManifestField) -> Result<FieldValue> {
    Ok(match field {
        ManifestField::U32(v) => FieldValue::U32(*v),
        ManifestField::U64(v) => FieldValue::U64(*v),
        ManifestField::Bytes(text) => {
            FieldValue::Bytes(hex::decode(text.trim()).with_context(|| format!("invalid hex field {text:?}"))?)
        }
    })
}

/// Inline hex wins over `payload_file`.
fn resolve_payload(spec: &PayloadSpec, manifest_dir: &Path) -> Result<Option<Vec<u8>>> {
    if let Some(text) = &spec.payload_hex {
        return hex::decode(text.trim()).map(Some).context("invalid payload_hex");
    }
    if let Some(name) = &spec.payload_file {
        let path = manifest_dir.join(name);
        return fs::read(&path)
            .map(Some)
            .with_context(|| format!("cannot read payload_file {}", path.display()));
    }
    Ok(None)
}

fn parse_iv(text: &str) -> Result<[u8; 16]> {
    let bytes = hex::decode(text.trim()).with_context(|| format!("invalid IV {text:?}"))?;
    bytes
        .try_into()
        .map_err(|v: Vec<u8>| anyhow!("IV must be 16 bytes, got {}", v.len()))
}
