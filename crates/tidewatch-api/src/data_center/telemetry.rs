// Telemetry feeds. The anchor-paged endpoints all return one
// `QueryResult` page ordered newest first when `reverse` is set.

use super::DataCenterClient;
use super::models::{
    BeidouQuery, BeidouRecord, DataQueryOptions, IridiumQuery, IridiumRecord, PageListQuery,
    ParsedDataQuery, StatusQuery, TelemetryRecord,
};
use crate::envelope::QueryResult;
use crate::error::Error;

impl DataCenterClient {
    pub async fn parsed_data(
        &self,
        query: &ParsedDataQuery,
    ) -> Result<QueryResult<TelemetryRecord>, Error> {
        self.inner.get_with_query("data/parsed", query).await
    }

    /// Range or anchor query straight against a bucket. Unlike the feeds
    /// this returns a bare list with no total.
    pub async fn query_data(
        &self,
        options: &DataQueryOptions,
    ) -> Result<Vec<TelemetryRecord>, Error> {
        self.inner.get_with_query("data/parsed/query", options).await
    }

    pub async fn device_status(
        &self,
        query: &StatusQuery,
    ) -> Result<QueryResult<TelemetryRecord>, Error> {
        self.inner.get_with_query("query/device-status", query).await
    }

    pub async fn beidou_raw(&self, query: &BeidouQuery) -> Result<QueryResult<BeidouRecord>, Error> {
        self.inner.get_with_query("data/beidou/raw", query).await
    }

    pub async fn iridium_raw(
        &self,
        query: &IridiumQuery,
    ) -> Result<QueryResult<IridiumRecord>, Error> {
        self.inner.get_with_query("data/iridium/raw", query).await
    }

    /// Offset-paged device data (`page` is 1-based).
    pub async fn device_data_page(
        &self,
        query: &PageListQuery,
    ) -> Result<QueryResult<TelemetryRecord>, Error> {
        self.inner.get_with_query("query/device-data", query).await
    }
}
