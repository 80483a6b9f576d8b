mod args;
mod commands;

use anyhow::Result;
use args::{parse_aggregation, parse_interval, parse_range, WindowArgs};
use chrono::Utc;
use clap::{Parser, Subcommand};
use commands::Runner;
use sightline::config::LoggingConfig;
use sightline::query::{
    AggregationSpec, AvailabilityQuery, AverageResponseTimeQuery, CountQuery, DateHistogramQuery,
    GroupByQuery, GroupOrder, GroupRange, HealthField, Interval, LogsQuery, Query, SortDirection,
};
use sightline::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "sightline")]
#[command(about = "Sightline - analytics over date-partitioned Elasticsearch indices")]
#[command(version)]
struct Cli {
    /// Configuration file path (default: ~/.sightline/config.toml)
    #[arg(short, long, global = true, env = "SIGHTLINE_CONFIG")]
    config: Option<PathBuf>,

    /// Print the request that would be sent instead of sending it
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Count requests
    Count {
        #[command(flatten)]
        window: WindowArgs,
    },

    /// Group requests by a field
    GroupBy {
        #[command(flatten)]
        window: WindowArgs,

        /// Field to group on
        #[arg(short, long)]
        field: String,

        /// Numeric range bucket, e.g. 200-299 (repeatable)
        #[arg(long = "range", value_parser = parse_range)]
        ranges: Vec<GroupRange>,

        /// Order groups by the average of this field
        #[arg(long)]
        order_by: Option<String>,

        /// Ascending order (default descending)
        #[arg(long, requires = "order_by")]
        asc: bool,
    },

    /// Date histogram of requests
    Histogram {
        #[command(flatten)]
        window: WindowArgs,

        /// Bucket width, e.g. 1m, 1h, 1d
        #[arg(short, long, value_parser = parse_interval, default_value = "1h")]
        interval: u64,

        /// Series: <field> or <by|min|max|avg>:<field> (repeatable)
        #[arg(short, long = "aggregation", value_parser = parse_aggregation)]
        aggregations: Vec<AggregationSpec>,
    },

    /// Page of request logs, newest first
    Logs {
        #[command(flatten)]
        window: WindowArgs,

        #[arg(long, default_value = "1")]
        page: u32,

        #[arg(long, default_value = "20")]
        size: u32,
    },

    /// Full request log by id
    Log { id: String },

    /// Endpoint availability over the last minute, hour, day, week and month
    Availability {
        #[command(flatten)]
        window: WindowArgs,

        /// Group by gateway instead of endpoint
        #[arg(long)]
        by_gateway: bool,
    },

    /// Average health-check response time per endpoint
    ResponseTime {
        #[command(flatten)]
        window: WindowArgs,

        /// Group by gateway instead of endpoint
        #[arg(long)]
        by_gateway: bool,
    },

    /// Page of health-check logs
    HealthLogs {
        #[command(flatten)]
        window: WindowArgs,

        #[arg(long, default_value = "1")]
        page: u32,

        #[arg(long, default_value = "20")]
        size: u32,
    },

    /// Health check with its steps by id
    HealthLog { id: String },

    /// Latest monitoring data of a gateway
    Monitor { gateway_id: String },

    /// Check that the cluster is reachable
    Ping,
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let json = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or_else(|_| logging.format.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn health_field(by_gateway: bool) -> HealthField {
    if by_gateway {
        HealthField::Gateway
    } else {
        HealthField::Endpoint
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    init_logging(&config.logging);

    let now = Utc::now().timestamp_millis();
    let runner = Runner::new(&config, cli.dry_run)?;

    match cli.command {
        Commands::Count { window } => {
            runner
                .analytics(Query::Count(CountQuery {
                    filter: window.filter(now)?,
                }))
                .await?
        }
        Commands::GroupBy {
            window,
            field,
            ranges,
            order_by,
            asc,
        } => {
            let order = order_by.map(|field| GroupOrder {
                field,
                direction: if asc {
                    SortDirection::Asc
                } else {
                    SortDirection::Desc
                },
            });
            runner
                .analytics(Query::GroupBy(GroupByQuery {
                    filter: window.filter(now)?,
                    field,
                    ranges,
                    order,
                }))
                .await?
        }
        Commands::Histogram {
            window,
            interval,
            aggregations,
        } => {
            runner
                .analytics(Query::DateHistogram(DateHistogramQuery {
                    filter: window.filter(now)?,
                    interval: Interval::new(interval)?,
                    aggregations,
                }))
                .await?
        }
        Commands::Logs { window, page, size } => {
            runner
                .logs(LogsQuery::new(window.filter(now)?, page, size))
                .await?
        }
        Commands::Log { id } => runner.log(&id).await?,
        Commands::Availability { window, by_gateway } => {
            let query = Query::Availability(AvailabilityQuery {
                filter: window.filter(now)?,
                field: health_field(by_gateway),
            });
            runner.health(query, now).await?
        }
        Commands::ResponseTime { window, by_gateway } => {
            let query = Query::AverageResponseTime(AverageResponseTimeQuery {
                filter: window.filter(now)?,
                field: health_field(by_gateway),
            });
            runner.health(query, now).await?
        }
        Commands::HealthLogs { window, page, size } => {
            let query = Query::Logs(LogsQuery::new(window.filter(now)?, page, size));
            runner.health(query, now).await?
        }
        Commands::HealthLog { id } => runner.health_log(&id).await?,
        Commands::Monitor { gateway_id } => runner.monitor(&gateway_id).await?,
        Commands::Ping => runner.ping().await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_group_by() {
        let cli = Cli::try_parse_from([
            "sightline",
            "--dry-run",
            "group-by",
            "--field",
            "status",
            "--range",
            "100-199",
            "--range",
            "200-299",
            "--last",
            "1d",
        ])
        .unwrap();

        assert!(cli.dry_run);
        match cli.command {
            Commands::GroupBy { field, ranges, window, .. } => {
                assert_eq!(field, "status");
                assert_eq!(ranges.len(), 2);
                assert_eq!(window.last, Some(86_400_000));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_last_conflicts_with_from() {
        assert!(Cli::try_parse_from([
            "sightline",
            "count",
            "--last",
            "1h",
            "--from",
            "2024-01-01T00:00:00Z",
        ])
        .is_err());
    }
}
