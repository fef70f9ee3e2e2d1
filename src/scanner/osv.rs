//! OSV.dev advisory client.
//!
//! One `POST /v1/query` per pinned package, bounded concurrency. Only
//! the first advisory per package is kept; the reachability report
//! names one vulnerability, not the full advisory list.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::lockfile::PinnedPackage;
use super::VulnPackage;

const OSV_QUERY_URL: &str = "https://api.osv.dev/v1/query";
const CONCURRENT_QUERIES: usize = 16;
const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct Query<'a> {
    version: &'a str,
    package: QueryPackage<'a>,
}

#[derive(Serialize)]
struct QueryPackage<'a> {
    name: &'a str,
    ecosystem: &'static str,
}

#[derive(Deserialize, Default)]
struct QueryResponse {
    #[serde(default)]
    vulns: Vec<Advisory>,
}

#[derive(Deserialize)]
struct Advisory {
    id: String,
    #[serde(default)]
    summary: String,
}

pub(super) async fn query_all(
    packages: &[PinnedPackage],
) -> Vec<(String, Result<Option<VulnPackage>, reqwest::Error>)> {
    let client = Client::builder()
        .user_agent(concat!("reachcheck/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("failed to create HTTP client");

    stream::iter(packages)
        .map(|package| {
            let client = &client;
            async move {
                let result = query_one(client, package).await;
                (package.name.clone(), result)
            }
        })
        .buffer_unordered(CONCURRENT_QUERIES)
        .collect()
        .await
}

async fn query_one(
    client: &Client,
    package: &PinnedPackage,
) -> Result<Option<VulnPackage>, reqwest::Error> {
    let body = Query {
        version: &package.version,
        package: QueryPackage {
            name: &package.name,
            ecosystem: "PyPI",
        },
    };

    let response = client
        .post(OSV_QUERY_URL)
        .timeout(QUERY_TIMEOUT)
        .json(&body)
        .send()
        .await?
        .error_for_status()?;

    let parsed: QueryResponse = response.json().await?;
    Ok(parsed.vulns.into_iter().next().map(|advisory| VulnPackage {
        package: package.name.clone(),
        id: advisory.id,
        summary: advisory.summary,
    }))
}
