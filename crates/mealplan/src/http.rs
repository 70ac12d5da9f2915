use std::time::Duration;

use async_trait::async_trait;
use mealsync_shared::{
    Error, Result, WeekKey,
    mealplan::{MealPlan, MealPlanChanges, PlanId},
};
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::PlanStore;

#[derive(Debug, Clone, thiserror::Error)]
pub enum HttpError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("rate limited")]
    RateLimited,
    #[error("unauthorized")]
    Unauthorized,
    #[error("json error: {0}")]
    Serde(String),
}

impl HttpError {
    /// Returns true if the error is transient and should be retried.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout | Self::RateLimited => true,
            Self::Http { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }
}

impl From<HttpError> for Error {
    fn from(value: HttpError) -> Self {
        if value.should_retry() {
            return Error::Server(value.to_string());
        }

        match value {
            HttpError::Unauthorized => Error::Forbidden,
            HttpError::Http { status: 403, .. } => Error::Forbidden,
            HttpError::Http { status: 404, .. } => Error::NotFound,
            HttpError::Http { body, .. } => Error::Validate(body),
            other => Error::Unknown(anyhow::anyhow!(other)),
        }
    }
}

fn map_reqwest_error(err: reqwest::Error) -> HttpError {
    if err.is_timeout() {
        HttpError::Timeout
    } else if err.is_decode() {
        HttpError::Serde(err.to_string())
    } else {
        HttpError::Transport(err.to_string())
    }
}

/// [`PlanStore`] client for the `/meal-plans` REST endpoints.
#[derive(Clone)]
pub struct HttpStore {
    http: Client,
    base_url: Url,
    token: String,
}

impl HttpStore {
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self> {
        let mut base_url = match Url::parse(base_url) {
            Ok(url) => url,
            Err(err) => mealsync_shared::invalid!("invalid store url '{}': {}", base_url, err),
        };

        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| Error::Unknown(err.into()))?;

        Ok(Self {
            http,
            base_url,
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|err| Error::Validate(err.to_string()))
    }

    async fn read<T: DeserializeOwned>(res: Response) -> std::result::Result<T, HttpError> {
        match res.status() {
            s if s.is_success() => res.json::<T>().await.map_err(map_reqwest_error),
            StatusCode::UNAUTHORIZED => Err(HttpError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => Err(HttpError::RateLimited),
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                Err(HttpError::Http { status, body })
            }
        }
    }
}

#[async_trait]
impl PlanStore for HttpStore {
    async fn find_week(&self, owner_id: &str, week: WeekKey) -> Result<Option<MealPlan>> {
        let mut url = self.url("meal-plans")?;
        url.query_pairs_mut()
            .append_pair("weekStart", &week.to_string());

        let res = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let plans: Vec<MealPlan> = Self::read(res).await?;

        Ok(plans
            .into_iter()
            .find(|plan| plan.owner_id.is_empty() || plan.owner_id == owner_id))
    }

    async fn create(&self, plan: &MealPlan) -> Result<String> {
        let res = self
            .http
            .post(self.url("meal-plans")?)
            .bearer_auth(&self.token)
            .json(plan)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let created: PlanId = Self::read(res).await?;

        Ok(created.id)
    }

    async fn update(&self, id: &str, plan: &MealPlan) -> Result<()> {
        let res = self
            .http
            .put(self.url(&format!("meal-plans/{id}"))?)
            .bearer_auth(&self.token)
            .json(&MealPlanChanges::from(plan))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let _: PlanId = Self::read(res).await?;

        Ok(())
    }
}
