//! Social and developer sentiment

use serde_json::json;

use super::{SourceClient, number};
use crate::config::SourcesConfig;
use crate::{MarketSentimentRecord, Result};

const QUERY: &str = r"query Sentiment($slug: String!) {
  socialVolume: socialVolumeQuery(slug: $slug) {
    mentionsCount
    sentiment
  }
  githubActivity: githubActivity(slug: $slug) {
    commits
    contributors
  }
}";

/// Queries the sentiment GraphQL API
pub struct SentimentAdapter {
    client: SourceClient,
    url: String,
}

impl SentimentAdapter {
    /// Create the adapter
    pub fn new(client: SourceClient, sources: &SourcesConfig) -> Self {
        Self {
            client,
            url: sources.santiment_url.clone(),
        }
    }

    /// Social volume, sentiment and GitHub activity in one query.
    ///
    /// `social_volume` and `twitter_mentions` both carry the upstream
    /// mention count. Absent sub-fields read as 0.
    ///
    /// # Errors
    ///
    /// Returns the upstream failure unchanged.
    pub async fn sentiment(&self, protocol: &str) -> Result<MarketSentimentRecord> {
        let body = json!({
            "query": QUERY,
            "variables": { "slug": protocol },
        });
        let response = self.client.post("sentiment", &self.url, &body).await?;

        let data = &response["data"];
        let social = &data["socialVolume"];
        let github = &data["githubActivity"];
        let mentions = number(&social["mentionsCount"]);

        Ok(MarketSentimentRecord {
            protocol: protocol.to_string(),
            social_volume: mentions,
            sentiment_score: number(&social["sentiment"]),
            twitter_mentions: mentions,
            github_activity: number(&github["commits"]),
            developer_activity: number(&github["contributors"]),
        })
    }
}
