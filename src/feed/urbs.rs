use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::FeedSource;
use super::raw::{self, RawLine, RawShapePoint, RawStop};
use crate::fetch::auth::UrlParam;
use crate::fetch::{BasicClient, HttpClient, fetch_json};
use crate::model::{Line, ShapePoint, Stop};

pub const DEFAULT_BASE_URL: &str = "https://transporteservico.urbs.curitiba.pr.gov.br";

/// Live feed served by the transit operator's public endpoints.
pub struct UrbsFeed<C> {
    client: C,
    base_url: String,
}

impl UrbsFeed<UrlParam<BasicClient>> {
    /// Builds a feed that authenticates with `api_key` as the `c` parameter.
    pub fn with_api_key(base_url: &str, api_key: String) -> Result<Self> {
        let client = UrlParam::new(BasicClient::new()?, "c", api_key);
        Ok(Self::new(client, base_url))
    }
}

impl<C: HttpClient> UrbsFeed<C> {
    pub fn new(client: C, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, name: &str, line_number: Option<&str>) -> String {
        match line_number {
            Some(line) => format!("{}/{}.php?linha={}", self.base_url, name, line),
            None => format!("{}/{}.php", self.base_url, name),
        }
    }

    async fn get_list<T: DeserializeOwned>(&self, url: &str) -> Result<Vec<T>> {
        let records: Vec<T> = fetch_json(&self.client, url).await?;
        if records.is_empty() {
            warn!(url, "Feed returned an empty list");
        } else {
            debug!(url, records = records.len(), "Feed records received");
        }
        Ok(records)
    }
}

#[async_trait]
impl<C: HttpClient> FeedSource for UrbsFeed<C> {
    async fn lines(&self) -> Result<Vec<Line>> {
        let raw: Vec<RawLine> = self.get_list(&self.endpoint("getLinhas", None)).await?;
        Ok(raw::lines(raw))
    }

    async fn shape_points(&self, line_number: &str) -> Result<Vec<ShapePoint>> {
        let url = self.endpoint("getShapeLinha", Some(line_number));
        let raw: Vec<RawShapePoint> = self.get_list(&url).await?;
        Ok(raw::shape_points(line_number, raw))
    }

    async fn stops(&self, line_number: &str) -> Result<Vec<Stop>> {
        let url = self.endpoint("getPontosLinha", Some(line_number));
        let raw: Vec<RawStop> = self.get_list(&url).await?;
        Ok(raw::stops(line_number, raw))
    }
}
