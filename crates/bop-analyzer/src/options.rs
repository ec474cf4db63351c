use bop_crypto::AesKey;

/// Knobs for a full [`PackageAnalyzer`](crate::PackageAnalyzer) run.
#[derive(Clone, Debug)]
pub struct AnalyzerOptions {
    /// Key for the challenge and payload decryption. Without one,
    /// encrypted payloads are walked and hash-checked but not decoded.
    pub aes_key: Option<AesKey>,
    /// Decrypt and decompress every payload. The hash walk runs either
    /// way.
    pub decode_payloads: bool,
    /// Require the end-size and last-BOP fields to be consistent during
    /// the structural pass.
    pub check_end_size: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            aes_key: None,
            decode_payloads: true,
            check_end_size: true,
        }
    }
}
