use std::time::Duration;

use async_trait::async_trait;
use finsight_schema::{NewSchedule, Schedule, ScheduleUpdate, SchedulerStatus, SuccessResponse};
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;

use crate::{ApiError, ApiResult, SchedulerApi};

const API_PREFIX: [&str; 2] = ["api", "scheduler"];
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct HttpSchedulerApi {
    client: reqwest::Client,
    base_url: Url,
    bearer_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpSchedulerApiBuilder {
    base_url: String,
    bearer_token: Option<String>,
    timeout: Duration,
}

impl HttpSchedulerApiBuilder {
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> ApiResult<HttpSchedulerApi> {
        let base_url = Url::parse(&self.base_url).map_err(|e| ApiError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl {
                url: self.base_url,
                reason: "url cannot be used as a base".to_string(),
            });
        }
        let client = reqwest::Client::builder().timeout(self.timeout).build()?;
        Ok(HttpSchedulerApi {
            client,
            base_url,
            bearer_token: self.bearer_token,
        })
    }
}

impl HttpSchedulerApi {
    pub fn builder(base_url: impl Into<String>) -> HttpSchedulerApiBuilder {
        HttpSchedulerApiBuilder {
            base_url: base_url.into(),
            bearer_token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        Self::builder(base_url).build()
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(API_PREFIX).extend(segments);
        }
        url
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> ApiResult<T> {
        let req = match &self.bearer_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        };

        let resp = req.send().await.map_err(ApiError::from_send)?;
        let status = resp.status();
        let text = resp.text().await.map_err(ApiError::from_send)?;
        if !status.is_success() {
            tracing::debug!(%status, body = %text, "scheduler api returned error status");
            return Err(ApiError::Status { status, body: text });
        }

        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn acknowledge(&self, req: RequestBuilder) -> ApiResult<()> {
        let ack: SuccessResponse = self.send(req).await?;
        if ack.success {
            Ok(())
        } else {
            Err(ApiError::Rejected {
                message: ack.message,
            })
        }
    }
}

#[async_trait]
impl SchedulerApi for HttpSchedulerApi {
    async fn status(&self) -> ApiResult<SchedulerStatus> {
        self.send(self.client.get(self.url(&["status"]))).await
    }

    async fn start(&self) -> ApiResult<()> {
        self.acknowledge(self.client.post(self.url(&["start"]))).await
    }

    async fn stop(&self) -> ApiResult<()> {
        self.acknowledge(self.client.post(self.url(&["stop"]))).await
    }

    async fn list_schedules(&self) -> ApiResult<Vec<Schedule>> {
        self.send(self.client.get(self.url(&["workflows"]))).await
    }

    async fn create_schedule(&self, schedule: &NewSchedule) -> ApiResult<Schedule> {
        self.send(self.client.post(self.url(&["workflows"])).json(schedule))
            .await
    }

    async fn update_schedule(&self, id: &str, update: &ScheduleUpdate) -> ApiResult<Schedule> {
        self.send(self.client.put(self.url(&["workflows", id])).json(update))
            .await
    }

    async fn delete_schedule(&self, id: &str) -> ApiResult<()> {
        self.acknowledge(self.client.delete(self.url(&["workflows", id])))
            .await
    }

    async fn run_schedule(&self, id: &str) -> ApiResult<()> {
        self.acknowledge(self.client.post(self.url(&["workflows", id, "run"])))
            .await
    }
}
