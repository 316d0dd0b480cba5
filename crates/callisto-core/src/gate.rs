//! Access control gate: passphrase checks in front of report plaintext

use callisto_crypto::{decrypt_json, encrypt_json, KdfParams, Passphrase};

use crate::error::{CoreError, CoreResult};
use crate::record::ReportRecord;
use crate::report::Report;

/// Verifies a presented passphrase against a report's ciphertext.
///
/// Independent of any web session: each call is handed the credential and
/// the result borrows it for one operation only.
pub struct AccessGate;

impl AccessGate {
    /// Decrypt the report's record.
    ///
    /// A report with no ciphertext yet opens with any passphrase; the first
    /// [`Unlocked::seal`] then establishes the key. Every write that opens an
    /// unkeyed report seals it, so only a never-written report stays unkeyed.
    pub fn open<'a>(report: &Report, passphrase: &'a Passphrase) -> CoreResult<Unlocked<'a>> {
        if passphrase.is_empty() {
            return Err(CoreError::AccessDenied);
        }

        let record = if report.encrypted_data.is_empty() {
            ReportRecord::default()
        } else {
            decrypt_json(&report.encrypted_data, passphrase)
                .map_err(|e| rejected(report, e))?
        };

        Ok(Unlocked { passphrase, record })
    }

    /// Check the passphrase without keeping the plaintext around
    pub fn verify(report: &Report, passphrase: &Passphrase) -> CoreResult<()> {
        if passphrase.is_empty() {
            return Err(CoreError::AccessDenied);
        }
        if report.encrypted_data.is_empty() {
            return Ok(());
        }
        callisto_crypto::verify(&report.encrypted_data, passphrase)
            .map_err(|e| rejected(report, e))
    }
}

fn rejected(report: &Report, e: callisto_crypto::CryptoError) -> CoreError {
    tracing::info!(report = %report.id, "passphrase rejected");
    e.into()
}

/// A report record opened by a verified passphrase
pub struct Unlocked<'a> {
    passphrase: &'a Passphrase,
    record: ReportRecord,
}

impl Unlocked<'_> {
    pub fn record(&self) -> &ReportRecord {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut ReportRecord {
        &mut self.record
    }

    pub fn into_record(self) -> ReportRecord {
        self.record
    }

    /// Re-encrypt the (possibly modified) record under the same passphrase
    pub fn seal(&self, params: &KdfParams) -> CoreResult<Vec<u8>> {
        Ok(encrypt_json(&self.record, self.passphrase, params)?)
    }
}
