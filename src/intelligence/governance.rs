//! Governance proposals from ranked providers
//!
//! Providers are consulted strictly in order. A provider answering with an
//! empty list hands over to the next one; a provider that fails ends the
//! lookup with its error. Results are never merged across providers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tracing::debug;

use super::{SourceClient, number, text};
use crate::config::SourcesConfig;
use crate::{Error, GovernanceProposal, Result, Votes};

const SNAPSHOT_QUERY: &str = r#"query Proposals($space: String!, $first: Int!) {
  proposals(
    first: $first,
    skip: 0,
    where: { space_in: [$space] },
    orderBy: "created",
    orderDirection: desc
  ) {
    id
    title
    body
    state
    scores_total
    quorum
    end
  }
}"#;

const TALLY_QUERY: &str = r"query Proposals($protocol: String!, $first: Int!) {
  proposals(
    where: { governanceId: $protocol }
    orderBy: CREATED_AT_DESC
    first: $first
  ) {
    nodes {
      id
      title
      description
      status
      totalVotes
      quorum
      endTime
    }
  }
}";

/// What a provider had for a protocol
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// At least one proposal
    Found(Vec<GovernanceProposal>),
    /// A well-formed answer with no proposals
    Empty,
}

impl Outcome {
    fn from_list(proposals: Vec<GovernanceProposal>) -> Self {
        if proposals.is_empty() {
            Self::Empty
        } else {
            Self::Found(proposals)
        }
    }
}

/// A source of governance proposals
#[async_trait]
pub trait GovernanceProvider: Send + Sync {
    /// Provider name for logs and errors
    fn name(&self) -> &str;

    /// Normalized proposals for `protocol`
    ///
    /// # Errors
    ///
    /// Upstream failures, and [`Error::Schema`] when the response has no
    /// proposal list at all.
    async fn proposals(&self, protocol: &str) -> Result<Outcome>;
}

/// Snapshot hub: spaces are named `<protocol>.eth`
pub struct SnapshotProvider {
    client: SourceClient,
    url: String,
    limit: u32,
}

impl SnapshotProvider {
    /// Create the provider
    pub fn new(client: SourceClient, url: impl Into<String>, limit: u32) -> Self {
        Self {
            client,
            url: url.into(),
            limit,
        }
    }
}

#[async_trait]
impl GovernanceProvider for SnapshotProvider {
    fn name(&self) -> &str {
        "snapshot"
    }

    async fn proposals(&self, protocol: &str) -> Result<Outcome> {
        let body = json!({
            "query": SNAPSHOT_QUERY,
            "variables": { "space": format!("{protocol}.eth"), "first": self.limit },
        });
        let response = self.client.post(self.name(), &self.url, &body).await?;

        let list = response["data"]["proposals"]
            .as_array()
            .ok_or_else(|| Error::schema(self.name(), "missing data.proposals"))?;

        Ok(Outcome::from_list(
            list.iter()
                .map(|p| {
                    normalize(
                        p,
                        &p["body"],
                        &p["state"],
                        &p["scores_total"],
                        unix_deadline(&p["end"]),
                    )
                })
                .collect(),
        ))
    }
}

/// Tally: proposals keyed by governance id
pub struct TallyProvider {
    client: SourceClient,
    url: String,
    limit: u32,
}

impl TallyProvider {
    /// Create the provider
    pub fn new(client: SourceClient, url: impl Into<String>, limit: u32) -> Self {
        Self {
            client,
            url: url.into(),
            limit,
        }
    }
}

#[async_trait]
impl GovernanceProvider for TallyProvider {
    fn name(&self) -> &str {
        "tally"
    }

    async fn proposals(&self, protocol: &str) -> Result<Outcome> {
        let body = json!({
            "query": TALLY_QUERY,
            "variables": { "protocol": protocol, "first": self.limit },
        });
        let response = self.client.post(self.name(), &self.url, &body).await?;

        let list = response["data"]["proposals"]["nodes"]
            .as_array()
            .ok_or_else(|| Error::schema(self.name(), "missing data.proposals.nodes"))?;

        Ok(Outcome::from_list(
            list.iter()
                .map(|p| {
                    normalize(
                        p,
                        &p["description"],
                        &p["status"],
                        &p["totalVotes"],
                        rfc3339_deadline(&p["endTime"]),
                    )
                })
                .collect(),
        ))
    }
}

fn normalize(
    proposal: &Value,
    description: &Value,
    status: &Value,
    votes_for: &Value,
    deadline: DateTime<Utc>,
) -> GovernanceProposal {
    GovernanceProposal {
        id: text(&proposal["id"]),
        title: text(&proposal["title"]),
        description: text(description),
        status: text(status).to_lowercase(),
        votes: Votes {
            for_votes: number(votes_for),
            // Neither provider reports opposing votes
            against: 0.0,
        },
        quorum: number(&proposal["quorum"]),
        deadline,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn unix_deadline(value: &Value) -> DateTime<Utc> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

fn rfc3339_deadline(value: &Value) -> DateTime<Utc> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map_or(DateTime::UNIX_EPOCH, |d| d.with_timezone(&Utc))
}

/// Ordered fallback over governance providers
pub struct GovernanceAdapter {
    providers: Vec<Box<dyn GovernanceProvider>>,
}

impl GovernanceAdapter {
    /// Snapshot first, Tally second
    pub fn new(client: SourceClient, sources: &SourcesConfig, limit: u32) -> Self {
        Self::with_providers(vec![
            Box::new(SnapshotProvider::new(
                client.clone(),
                sources.snapshot_url.clone(),
                limit,
            )),
            Box::new(TallyProvider::new(client, sources.tally_url.clone(), limit)),
        ])
    }

    /// Use an explicit provider order
    pub fn with_providers(providers: Vec<Box<dyn GovernanceProvider>>) -> Self {
        Self { providers }
    }

    /// Proposals from the first provider that has any.
    ///
    /// Providers run one after another; a later one is only queried when
    /// every earlier one answered empty.
    ///
    /// # Errors
    ///
    /// The first provider error, unchanged. No fallback happens on error.
    pub async fn proposals(&self, protocol: &str) -> Result<Vec<GovernanceProposal>> {
        for provider in &self.providers {
            match provider.proposals(protocol).await? {
                Outcome::Found(proposals) => {
                    debug!(
                        protocol = protocol,
                        provider = provider.name(),
                        count = proposals.len(),
                        "Governance proposals found"
                    );
                    return Ok(proposals);
                }
                Outcome::Empty => {
                    debug!(
                        protocol = protocol,
                        provider = provider.name(),
                        "No proposals, trying next provider"
                    );
                }
            }
        }
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::intelligence::mock::{self, MockTransport, Reply};

    fn adapter(mock: &Arc<MockTransport>) -> GovernanceAdapter {
        GovernanceAdapter::new(mock::client(mock), &mock::sources(), 10)
    }

    fn snapshot_one() -> Value {
        json!({"data": {"proposals": [{
            "id": "0x1",
            "title": "Raise cap",
            "body": "Raise the supply cap",
            "state": "Active",
            "scores_total": 1200.5,
            "quorum": 1000,
            "end": 1_700_000_000
        }]}})
    }

    fn tally_one() -> Value {
        json!({"data": {"proposals": {"nodes": [{
            "id": "42",
            "title": "Treasury grant",
            "description": "Fund the grants program",
            "status": "EXECUTED",
            "totalVotes": 5000,
            "quorum": 4000,
            "endTime": "2024-01-15T12:00:00Z"
        }]}}})
    }

    #[tokio::test]
    async fn test_primary_non_empty_skips_secondary() {
        let mock = Arc::new(
            MockTransport::new()
                .json("snapshot.test", snapshot_one())
                .json("tally.test", tally_one()),
        );

        let proposals = adapter(&mock).proposals("aave").await.unwrap();
        assert_eq!(proposals.len(), 1);
        assert_eq!(
            proposals[0],
            GovernanceProposal {
                id: "0x1".to_string(),
                title: "Raise cap".to_string(),
                description: "Raise the supply cap".to_string(),
                status: "active".to_string(),
                votes: Votes {
                    for_votes: 1200.5,
                    against: 0.0,
                },
                quorum: 1000.0,
                deadline: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            }
        );
        assert_eq!(mock.urls(), vec!["http://snapshot.test/graphql".to_string()]);

        let sent = mock.calls()[0].body.clone().unwrap();
        assert_eq!(sent["variables"]["space"], "aave.eth");
        assert_eq!(sent["variables"]["first"], 10);
    }

    #[tokio::test]
    async fn test_empty_primary_returns_secondary_only() {
        let mock = Arc::new(
            MockTransport::new()
                .json("snapshot.test", json!({"data": {"proposals": []}}))
                .json("tally.test", tally_one()),
        );

        let proposals = adapter(&mock).proposals("compound").await.unwrap();
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].id, "42");
        assert_eq!(proposals[0].status, "executed");
        assert_eq!(
            proposals[0].deadline,
            Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
        );
        assert_eq!(
            mock.urls(),
            vec![
                "http://snapshot.test/graphql".to_string(),
                "http://tally.test/query".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_both_empty() {
        let mock = Arc::new(
            MockTransport::new()
                .json("snapshot.test", json!({"data": {"proposals": []}}))
                .json("tally.test", json!({"data": {"proposals": {"nodes": []}}})),
        );

        let proposals = adapter(&mock).proposals("quiet").await.unwrap();
        assert!(proposals.is_empty());
        assert_eq!(mock.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_primary_error_does_not_fall_back() {
        let mock = Arc::new(
            MockTransport::new()
                .route("snapshot.test", Reply::Status(502))
                .json("tally.test", tally_one()),
        );

        let err = adapter(&mock).proposals("aave").await.unwrap_err();
        assert_eq!(err.status(), Some(502));
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_list_is_schema_error() {
        let mock = Arc::new(
            MockTransport::new()
                .json("snapshot.test", json!({"errors": [{"message": "bad query"}]}))
                .json("tally.test", tally_one()),
        );

        let err = adapter(&mock).proposals("aave").await.unwrap_err();
        assert!(matches!(err, Error::Schema { ref source_name, .. } if source_name == "snapshot"));
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_secondary_error_propagates() {
        let mock = Arc::new(
            MockTransport::new()
                .json("snapshot.test", json!({"data": {"proposals": []}}))
                .route("tally.test", Reply::Status(500)),
        );

        let err = adapter(&mock).proposals("aave").await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_deadline_defaults_to_epoch() {
        assert_eq!(unix_deadline(&Value::Null), DateTime::UNIX_EPOCH);
        assert_eq!(rfc3339_deadline(&json!("not a date")), DateTime::UNIX_EPOCH);
    }
}
