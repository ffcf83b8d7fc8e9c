use async_trait::async_trait;
use url::Url;

use crate::api::{ApiError, LadderClient, ResultsCollection};

/// Anything a [`ResultsView`](super::ResultsView) can load results from.
#[async_trait]
pub trait ResultsSource: Send + Sync {
    async fn fetch_results(&self, url: &Url) -> Result<ResultsCollection, ApiError>;
}

#[async_trait]
impl ResultsSource for LadderClient {
    async fn fetch_results(&self, url: &Url) -> Result<ResultsCollection, ApiError> {
        if *url == self.results_url() {
            self.results().await
        } else {
            self.fetch_results_at(url).await
        }
    }
}
