//! CSV rendering of a run

use chrono::SecondsFormat;

use crate::error::{Error, Result};
use crate::monitor::RunOutput;

/// Column names of the results CSV
pub const CSV_HEADER: [&str; 4] = ["site", "has_promotion", "promotion_summaries", "checked_at"];

/// Separator between promotion summaries within one CSV cell
pub const SUMMARY_DELIMITER: &str = " || ";

/// Render one row per site
pub fn to_csv(output: &RunOutput) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for site in output.iter() {
        writer.write_record([
            site.site.as_str(),
            if site.has_promotion { "true" } else { "false" },
            site.promotion_summaries.join(SUMMARY_DELIMITER).as_str(),
            site.checked_at
                .to_rfc3339_opts(SecondsFormat::Secs, true)
                .as_str(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|err| Error::Io(err.into_error()))
}
