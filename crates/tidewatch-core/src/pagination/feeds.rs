// Concrete feeds over the data center telemetry endpoints.

use serde_json::Value;
use tidewatch_api::data_center::models::{
    Anchor, BeidouQuery, BeidouRecord, IridiumQuery, IridiumRecord, PageListQuery,
    ParsedDataQuery, StatusQuery,
};
use tidewatch_api::{DataCenterClient, Error, QueryResult};

use super::anchor::Feed;
use super::offset::PageSource;

/// The device a telemetry view is looking at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceTarget {
    pub device_model_id: String,
    pub model_number: String,
    pub serial_number: String,
    /// Restricts parsed data to one upload channel.
    pub upload_channel: Option<String>,
}

/// Parsed, model-specific telemetry (`data/parsed`).
#[derive(Debug, Clone)]
pub struct ParsedFeed(pub DataCenterClient);

impl Feed for ParsedFeed {
    type Selector = DeviceTarget;
    type Item = Value;

    async fn fetch(&self, target: &DeviceTarget, anchor: Anchor) -> Result<Vec<Value>, Error> {
        let query = ParsedDataQuery {
            model_number: Some(target.model_number.clone()),
            device_model_id: Some(target.device_model_id.clone()),
            serial_number: Some(target.serial_number.clone()),
            upload_channel: target.upload_channel.clone(),
            anchor,
        };
        Ok(self.0.parsed_data(&query).await?.items)
    }
}

/// Device status reports (`query/device-status`).
#[derive(Debug, Clone)]
pub struct StatusFeed(pub DataCenterClient);

impl Feed for StatusFeed {
    type Selector = DeviceTarget;
    type Item = Value;

    async fn fetch(&self, target: &DeviceTarget, anchor: Anchor) -> Result<Vec<Value>, Error> {
        let query = StatusQuery {
            model_number: target.model_number.clone(),
            serial_number: Some(target.serial_number.clone()),
            anchor,
        };
        Ok(self.0.device_status(&query).await?.items)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BeidouSelector {
    pub from_card: Option<String>,
    pub to_card: Option<String>,
}

/// Raw Beidou short messages.
#[derive(Debug, Clone)]
pub struct BeidouFeed(pub DataCenterClient);

impl Feed for BeidouFeed {
    type Selector = BeidouSelector;
    type Item = BeidouRecord;

    async fn fetch(
        &self,
        selector: &BeidouSelector,
        anchor: Anchor,
    ) -> Result<Vec<BeidouRecord>, Error> {
        let query = BeidouQuery {
            from_card: selector.from_card.clone(),
            to_card: selector.to_card.clone(),
            anchor,
        };
        Ok(self.0.beidou_raw(&query).await?.items)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IridiumSelector {
    pub imei: Option<String>,
}

/// Raw Iridium SBD messages.
#[derive(Debug, Clone)]
pub struct IridiumFeed(pub DataCenterClient);

impl Feed for IridiumFeed {
    type Selector = IridiumSelector;
    type Item = IridiumRecord;

    async fn fetch(
        &self,
        selector: &IridiumSelector,
        anchor: Anchor,
    ) -> Result<Vec<IridiumRecord>, Error> {
        let query = IridiumQuery {
            imei: selector.imei.clone(),
            anchor,
        };
        Ok(self.0.iridium_raw(&query).await?.items)
    }
}

/// Offset-paged device data (`query/device-data`).
#[derive(Debug, Clone)]
pub struct DeviceDataSource(pub DataCenterClient);

impl PageSource for DeviceDataSource {
    type Selector = DeviceTarget;
    type Item = Value;

    async fn fetch_page(
        &self,
        target: &DeviceTarget,
        channel: u8,
        page: u32,
        size: u32,
    ) -> Result<QueryResult<Value>, Error> {
        let query = PageListQuery {
            model: target.model_number.clone(),
            sn: target.serial_number.clone(),
            ch: channel,
            page,
            size,
        };
        self.0.device_data_page(&query).await
    }
}
