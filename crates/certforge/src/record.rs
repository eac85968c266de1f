//! Per-certificate value records.

use std::collections::BTreeMap;

use time::OffsetDateTime;
use time::format_description::FormatItem;
use time::macros::format_description;

use crate::attribute::{CERTIFICATE_ID, GENERATED_DATE};

/// The values for one certificate instance, keyed by attribute id.
/// Ephemeral: built per render, never persisted by the core.
pub type Record = BTreeMap<String, String>;

const DATE_FORMAT: &[FormatItem<'_>] =
    format_description!("[month repr:long] [day padding:none], [year]");

/// Fill in the system-provided values a caller does not supply: the
/// generated certificate identifier and today's date for the
/// `generatedDate` attribute. Values already present are kept.
pub fn inject_system_values(record: &mut Record, certificate_id: &str) {
    record
        .entry(CERTIFICATE_ID.to_string())
        .or_insert_with(|| certificate_id.to_string());
    record.entry(GENERATED_DATE.to_string()).or_insert_with(|| {
        OffsetDateTime::now_utc()
            .date()
            .format(&DATE_FORMAT)
            .unwrap_or_default()
    });
}
