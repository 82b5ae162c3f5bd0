use serde::Serialize;
use url::Url;

use super::DataCenterClient;
use crate::error::Error;

/// Parameters of an Excel quick export over a time range.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuery {
    pub model_number: String,
    pub serial_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_channel: Option<String>,
    /// ISO-8601 start of the range (inclusive).
    pub start: String,
    /// ISO-8601 end of the range (inclusive).
    pub end: String,
}

impl DataCenterClient {
    /// Build the download link for an Excel export. No request is made;
    /// the browser or `curl` fetches the URL directly.
    pub fn excel_quick_export_url(&self, query: &ExportQuery) -> Result<Url, Error> {
        let mut url = self.inner.url("exports/excel/quick")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("modelNumber", &query.model_number);
            pairs.append_pair("serialNumber", &query.serial_number);
            if let Some(ch) = &query.upload_channel {
                pairs.append_pair("uploadChannel", ch);
            }
            pairs.append_pair("start", &query.start);
            pairs.append_pair("end", &query.end);
        }
        Ok(url)
    }
}
