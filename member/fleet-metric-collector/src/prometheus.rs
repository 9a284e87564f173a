use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context as _, bail};
use serde::Deserialize;

use fleet_api::WorkloadSample;

/// The one query the collector runs; it is a uniform aggregator, not a
/// query planner.
const WORKLOAD_HEALTH_QUERY: &str = "workload_health";

/// Gauge threshold for "healthy". The metric app emits 1.0/0.0; `>=`
/// tolerates float drift introduced by JSON round-trips.
const HEALTHY_THRESHOLD: f64 = 1.0;

const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, Default)]
pub enum PromAuth {
    #[default]
    None,
    Bearer {
        token: String,
    },
    Basic {
        username: String,
        password: String,
    },
}

/// Client for the member-local Prometheus HTTP API.
#[derive(Clone)]
pub struct PromClient {
    http: reqwest::Client,
    auth: PromAuth,
}

#[derive(Deserialize, Debug)]
struct PromResponse {
    status: String,
    #[serde(default)]
    data: Option<PromData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct PromData {
    #[serde(default)]
    result: Vec<PromResult>,
}

#[derive(Deserialize, Debug)]
struct PromResult {
    #[serde(default)]
    metric: HashMap<String, String>,
    /// Instant vector value: `[timestamp, "value"]`.
    #[serde(default)]
    value: Option<(f64, String)>,
}

impl PromClient {
    pub fn new(auth: PromAuth) -> anyhow::Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(QUERY_TIMEOUT).build()?,
            auth,
        })
    }

    /// Execute the canonical instant query against `base_url` and map
    /// every well-labeled result to a sample. The caller owns retention
    /// policy on error.
    pub async fn query_workload_health(
        &self,
        base_url: &str,
    ) -> anyhow::Result<Vec<WorkloadSample>> {
        let url = format!("{}/api/v1/query", base_url.trim_end_matches('/'));
        let mut req = self
            .http
            .get(&url)
            .query(&[("query", WORKLOAD_HEALTH_QUERY)])
            .header("Accept", "application/json");
        req = match &self.auth {
            PromAuth::None => req,
            PromAuth::Bearer { token } => req.bearer_auth(token),
            PromAuth::Basic { username, password } => {
                req.basic_auth(username, Some(password))
            }
        };

        let res = req.send().await.context("failed to query Prometheus")?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            bail!("Prometheus query failed with status {status}: {body}");
        }

        let parsed: PromResponse = res
            .json()
            .await
            .context("failed to decode Prometheus response")?;
        if parsed.status != "success" {
            bail!(
                "Prometheus returned an error: {}",
                parsed.error.unwrap_or_else(|| "unknown".to_string())
            );
        }

        Ok(samples_from(parsed.data.unwrap_or_default()))
    }
}

/// Label contract: `namespace` and `app` identify the workload and are
/// mandatory (results without them are dropped); `workload_kind` and
/// `pod` are carried through when the scrape configuration provides them.
fn samples_from(data: PromData) -> Vec<WorkloadSample> {
    let mut samples = Vec::with_capacity(data.result.len());
    for res in data.result {
        let namespace =
            res.metric.get("namespace").cloned().unwrap_or_default();
        let workload_name = res.metric.get("app").cloned().unwrap_or_default();
        if namespace.is_empty() || workload_name.is_empty() {
            continue;
        }
        let value = res
            .value
            .as_ref()
            .map(|(_, v)| v.parse::<f64>().unwrap_or(0.0))
            .unwrap_or(0.0);
        samples.push(WorkloadSample {
            namespace,
            workload_name,
            workload_kind: res.metric.get("workload_kind").cloned(),
            pod_name: res.metric.get("pod").cloned(),
            health: value >= HEALTHY_THRESHOLD,
        });
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(labels: &[(&str, &str)], value: &str) -> PromResult {
        PromResult {
            metric: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            value: Some((1700000000.0, value.to_string())),
        }
    }

    #[test]
    fn sample_carries_optional_kind_and_pod_labels() {
        let data = PromData {
            result: vec![result(
                &[
                    ("namespace", "ns"),
                    ("app", "app"),
                    ("workload_kind", "Deployment"),
                    ("pod", "app-abc12"),
                ],
                "1",
            )],
        };
        let samples = samples_from(data);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].workload_kind.as_deref(), Some("Deployment"));
        assert_eq!(samples[0].pod_name.as_deref(), Some("app-abc12"));
        assert!(samples[0].health);
    }

    #[test]
    fn results_without_identity_labels_are_dropped() {
        let data = PromData {
            result: vec![
                result(&[("app", "app")], "1"),
                result(&[("namespace", "ns")], "1"),
                result(&[("namespace", "ns"), ("app", "app")], "1"),
            ],
        };
        assert_eq!(samples_from(data).len(), 1);
    }

    #[test]
    fn health_threshold_is_inclusive_at_one() {
        let healths: Vec<bool> = samples_from(PromData {
            result: vec![
                result(&[("namespace", "ns"), ("app", "a")], "1"),
                result(&[("namespace", "ns"), ("app", "b")], "1.0"),
                result(&[("namespace", "ns"), ("app", "c")], "0.999999"),
                result(&[("namespace", "ns"), ("app", "d")], "0"),
                result(&[("namespace", "ns"), ("app", "e")], "1.5"),
            ],
        })
        .into_iter()
        .map(|s| s.health)
        .collect();
        assert_eq!(healths, vec![true, true, false, false, true]);
    }

    #[test]
    fn missing_or_malformed_values_are_unhealthy() {
        let mut no_value = result(&[("namespace", "ns"), ("app", "a")], "1");
        no_value.value = None;
        let data = PromData {
            result: vec![
                no_value,
                result(&[("namespace", "ns"), ("app", "b")], "not-a-number"),
            ],
        };
        let samples = samples_from(data);
        assert_eq!(samples.len(), 2);
        assert!(samples.iter().all(|s| !s.health));
    }

    #[test]
    fn response_shape_deserializes() {
        let raw = serde_json::json!({
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [{
                    "metric": {"namespace": "ns", "app": "app"},
                    "value": [1700000000.0, "1"]
                }]
            }
        });
        let parsed: PromResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.status, "success");
        let samples = samples_from(parsed.data.unwrap());
        assert_eq!(samples[0].workload_name, "app");
    }
}
