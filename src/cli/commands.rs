//! Command line surface over the client façade

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use super::credentials::Credentials;
use super::CliError;
use crate::cache::UpstashCacheStore;
use crate::gateway::{create_config, ConfigInput, DataForSeoClient, KeywordFilters, ANY_LANGUAGE};
use crate::output::csv::{write_csv, BalanceRow};
use crate::output::{open_destination, write_json, OutputFormat, ToCsvRow};
use crate::transform::TransformResult;
use crate::KeywordIntent;

/// Default location: United States
const DEFAULT_LOCATION_CODE: &str = "2840";

/// Keyword research against the DataForSEO API
#[derive(Parser, Debug)]
#[command(name = "keyword-data-gateway", version, about)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// API login (falls back to DATAFORSEO_LOGIN)
    #[arg(long, global = true)]
    pub login: Option<String>,

    /// API password (falls back to DATAFORSEO_PASSWORD)
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Send requests to the sandbox host
    #[arg(long, global = true, default_value_t = false)]
    pub sandbox: bool,

    /// Request timeout in milliseconds
    #[arg(long, global = true, allow_negative_numbers = true)]
    pub timeout_ms: Option<i64>,

    /// Retries after the first attempt
    #[arg(long, global = true, allow_negative_numbers = true)]
    pub max_retries: Option<i64>,

    /// Requests admitted per rolling minute
    #[arg(long, global = true, allow_negative_numbers = true)]
    pub rate_limit_per_minute: Option<i64>,

    /// Cache responses in Upstash Redis (needs UPSTASH_REDIS_REST_URL and UPSTASH_REDIS_REST_TOKEN)
    #[arg(long, global = true, default_value_t = false)]
    pub enable_caching: bool,

    /// Cache lifetime in days
    #[arg(long, global = true, allow_negative_numbers = true)]
    pub caching_duration_days: Option<i64>,

    /// Output format
    #[arg(long, global = true, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Write results to this file instead of stdout
    #[arg(long, short, global = true)]
    pub output: Option<PathBuf>,

    /// Expose Prometheus metrics on this address (e.g. 127.0.0.1:9090)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the remaining account balance
    Balance(BalanceArgs),

    /// Keyword ideas around a seed keyword
    Suggestions(SuggestionsArgs),

    /// Full metrics for a list of keywords
    Overview(OverviewArgs),

    /// Keywords a domain ranks for
    Domain(DomainArgs),
}

impl Cli {
    /// Client configuration from flags and environment
    pub fn config_input(&self) -> Result<ConfigInput, CliError> {
        let credentials = Credentials::resolve(self.login.as_deref(), self.password.as_deref())
            .ok_or_else(|| CliError::ConfigurationError("API credentials are missing".to_string()))?;

        info!(source = %credentials.source, "Using API credentials");

        Ok(ConfigInput {
            username: Some(credentials.username),
            password: Some(credentials.password),
            is_sandbox: Some(self.sandbox),
            enable_caching: Some(self.enable_caching),
            caching_duration_days: self.caching_duration_days,
            timeout: self.timeout_ms,
            max_retries: self.max_retries,
            rate_limit_per_minute: self.rate_limit_per_minute,
        })
    }

    /// Validated client, with the metrics exporter and cache store wired in when requested
    pub async fn client(&self) -> Result<DataForSeoClient, CliError> {
        let config = create_config(self.config_input()?)?;

        if let Some(addr) = self.metrics_addr {
            crate::metrics::init_metrics(addr)
                .await
                .map_err(|e| CliError::ConfigurationError(e.to_string()))?;
        }

        let wants_cache = config.enable_caching() && !config.is_sandbox();
        let mut builder = DataForSeoClient::builder(config);
        if wants_cache {
            match UpstashCacheStore::from_env() {
                Ok(store) => builder = builder.cache_store(Arc::new(store)),
                Err(e) => warn!(error = %e, "Cache store unavailable, continuing without cache"),
            }
        }
        Ok(builder.build()?)
    }

    fn emit_records<R>(&self, result: &TransformResult<Vec<R>>) -> Result<(), CliError>
    where
        R: ToCsvRow + Serialize,
    {
        if !result.is_ok() {
            warn!(status_code = result.status_code, "Task finished without results");
        }

        let out = open_destination(self.output.as_deref())?;
        match self.format {
            OutputFormat::Json => write_json(result, out)?,
            OutputFormat::Csv => {
                write_csv(&result.data, out)?;
            }
        }
        Ok(())
    }
}

fn log_session(client: &DataForSeoClient) {
    let m = client.get_metrics();
    info!(
        requests_made = m.requests_made,
        successful = m.successful_requests,
        failed = m.failed_requests,
        credits_used = m.credits_used,
        rate_limit_hits = m.rate_limit_hits,
        avg_response_time_ms = m.avg_response_time_ms,
        "Session metrics"
    );
}

/// Balance command arguments
#[derive(Args, Debug)]
pub struct BalanceArgs {}

impl BalanceArgs {
    /// Fetch and print the balance
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let client = cli.client().await?;
        let balance = client.get_account_balance().await;
        log_session(&client);
        let balance = balance?;

        if balance.is_none() {
            warn!("Balance missing from the response");
        }

        let out = open_destination(cli.output.as_deref())?;
        match cli.format {
            OutputFormat::Json => write_json(&serde_json::json!({ "balance": balance }), out)?,
            OutputFormat::Csv => {
                write_csv(&[BalanceRow { balance }], out)?;
            }
        }
        Ok(())
    }
}

/// Suggestions command arguments
#[derive(Args, Debug)]
pub struct SuggestionsArgs {
    /// Seed keyword
    pub keyword: String,

    /// Location code
    #[arg(long, default_value = DEFAULT_LOCATION_CODE)]
    pub location: u32,

    /// Language code, "any" for all languages
    #[arg(long, default_value = ANY_LANGUAGE)]
    pub language: String,

    /// Maximum suggestions returned
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub limit: u32,

    /// Suggestions to skip
    #[arg(long, default_value_t = 0)]
    pub offset: u32,

    /// Minimum monthly search volume
    #[arg(long)]
    pub min_volume: Option<u64>,

    /// Maximum monthly search volume
    #[arg(long)]
    pub max_volume: Option<u64>,

    /// Minimum cost per click
    #[arg(long)]
    pub min_cpc: Option<f64>,

    /// Maximum cost per click
    #[arg(long)]
    pub max_cpc: Option<f64>,

    /// Minimum paid competition, 0-100
    #[arg(long)]
    pub min_ppc: Option<f64>,

    /// Maximum paid competition, 0-100
    #[arg(long)]
    pub max_ppc: Option<f64>,

    /// Minimum keyword difficulty, 0-100
    #[arg(long)]
    pub min_kd: Option<u32>,

    /// Maximum keyword difficulty, 0-100
    #[arg(long)]
    pub max_kd: Option<u32>,

    /// Keep suggestions containing this text
    #[arg(long)]
    pub include: Option<String>,

    /// Drop suggestions containing this text
    #[arg(long)]
    pub exclude: Option<String>,

    /// Keep suggestions with this search intent (repeatable)
    #[arg(long = "intent")]
    pub intents: Vec<KeywordIntent>,
}

impl SuggestionsArgs {
    /// Filters assembled from the flags
    pub fn filters(&self) -> KeywordFilters {
        let mut filters = KeywordFilters::new()
            .search_volume(self.min_volume, self.max_volume)
            .cpc(self.min_cpc, self.max_cpc)
            .ppc(self.min_ppc, self.max_ppc)
            .keyword_difficulty(self.min_kd, self.max_kd)
            .intents(self.intents.iter().copied());
        if let Some(text) = &self.include {
            filters = filters.include(text.as_str());
        }
        if let Some(text) = &self.exclude {
            filters = filters.exclude(text.as_str());
        }
        filters
    }

    /// Fetch and print suggestions
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let filters = self.filters().build()?;
        let client = cli.client().await?;

        let result = client
            .get_keyword_suggestions(
                &self.keyword,
                self.location,
                &self.language,
                &filters,
                self.limit,
                self.offset,
            )
            .await;
        log_session(&client);
        let result = result?;

        info!(
            keyword = %self.keyword,
            returned = result.data.len(),
            total = result.total_results,
            cost = result.cost,
            "Keyword suggestions fetched"
        );
        cli.emit_records(&result)
    }
}

/// Overview command arguments
#[derive(Args, Debug)]
pub struct OverviewArgs {
    /// Keywords to look up
    #[arg(required = true, num_args = 1..)]
    pub keywords: Vec<String>,

    /// Location code
    #[arg(long, default_value = DEFAULT_LOCATION_CODE)]
    pub location: u32,

    /// Language code
    #[arg(long, default_value = "en")]
    pub language: String,

    /// Include clickstream demographics
    #[arg(long, default_value_t = false)]
    pub clickstream: bool,
}

impl OverviewArgs {
    /// Fetch and print keyword overviews
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let client = cli.client().await?;

        let result = client
            .get_keywords_overview(&self.keywords, self.location, &self.language, self.clickstream)
            .await;
        log_session(&client);
        let result = result?;

        info!(
            requested = self.keywords.len(),
            returned = result.data.len(),
            cost = result.cost,
            "Keyword overview fetched"
        );
        cli.emit_records(&result)
    }
}

/// Domain command arguments
#[derive(Args, Debug)]
pub struct DomainArgs {
    /// Domain or URL
    pub target: String,

    /// Location code
    #[arg(long, default_value = DEFAULT_LOCATION_CODE)]
    pub location: u32,

    /// Language code
    #[arg(long, default_value = "en")]
    pub language: String,

    /// Maximum keywords returned
    #[arg(long, default_value_t = 20)]
    pub limit: u32,

    /// Keywords to skip
    #[arg(long, default_value_t = 0)]
    pub offset: u32,
}

impl DomainArgs {
    /// Fetch and print domain keywords
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let client = cli.client().await?;

        let result = client
            .get_keywords_for_domain(&self.target, self.location, &self.language, self.limit, self.offset)
            .await;
        log_session(&client);
        let result = result?;

        info!(
            target = %self.target,
            returned = result.data.len(),
            total = result.total_results,
            cost = result.cost,
            "Domain keywords fetched"
        );
        cli.emit_records(&result)
    }
}
