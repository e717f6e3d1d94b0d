use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use fleetscope_apps::{get_cluster_count, get_cluster_count_string, group_by_repo_type, KNOWN_CHANNEL_TYPES};
use fleetscope_core::{Delta, FleetResource, NamespacedRef, ResourceKind};
use fleetscope_dashboard::{
    classify_alerts, classify_operators, filter_clusters, summarize_clusters, LabelSelection, PrometheusResponse,
};
use fleetscope_store::{load_path, queue_cap_from_env, spawn_ingest, Inventory};
use serde::Serialize;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "fleetctl", version, about = "Fleet application inspector")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Manifest files to read (YAML, multi-document YAML or JSON); repeatable
    #[arg(short = 'f', long = "file", global = true)]
    files: Vec<PathBuf>,

    /// Read from the current kube context
    #[arg(long = "live", global = true, env = "FLEETSCOPE_LIVE")]
    live: bool,

    /// Restrict live reads and tables to one namespace
    #[arg(long = "ns", global = true)]
    namespace: Option<String>,

    /// Hub console URL used to recognize Argo destinations on the hub
    #[arg(long = "hub-console-url", global = true, env = "FLEETSCOPE_HUB_CONSOLE_URL")]
    hub_console_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output {
    Human,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum AppKind {
    App,
    Argo,
    Appset,
}

impl AppKind {
    fn resource_kind(self) -> ResourceKind {
        match self {
            AppKind::App => ResourceKind::Application,
            AppKind::Argo => ResourceKind::ArgoApplication,
            AppKind::Appset => ResourceKind::ApplicationSet,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Repositories backing an application, grouped by type
    Repos {
        /// Target as namespace/name
        target: String,
        #[arg(long = "kind", value_enum, default_value_t = AppKind::App)]
        kind: AppKind,
    },
    /// Clusters an application is deployed to
    Clusters {
        /// Target as namespace/name
        target: String,
        #[arg(long = "kind", value_enum, default_value_t = AppKind::App)]
        kind: AppKind,
    },
    /// Resources deleting a subscription application would remove, and those it shares
    Children {
        /// Target as namespace/name
        target: String,
    },
    /// ApplicationSets drawing from the same placement
    AppsetSiblings {
        /// Target as namespace/name
        target: String,
    },
    /// Fleet overview counts
    Summary {
        /// Metrics query response (JSON) with operator condition and alert samples
        #[arg(long = "metrics")]
        metrics_file: Option<PathBuf>,
        /// Cluster label filter, key=value; keys are ORed
        #[arg(long = "label", value_parser = parse_label)]
        labels: Vec<(String, String)>,
    },
    /// Re-print the application table on every new snapshot
    Watch,
}

fn parse_label(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.trim().to_string())),
        _ => Err(format!("expected key=value, got {:?}", s)),
    }
}

fn parse_target(s: &str) -> Result<NamespacedRef> {
    let target = NamespacedRef::parse(s);
    if !target.is_complete() {
        bail!("target must be namespace/name, got {:?}", s);
    }
    Ok(target)
}

fn selection(labels: &[(String, String)]) -> LabelSelection {
    let mut sel = LabelSelection::new();
    for (k, v) in labels {
        sel.entry(k.clone()).or_default().push(v.clone());
    }
    sel
}

fn init_tracing() {
    let env = std::env::var("FLEETSCOPE_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("FLEETSCOPE_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            warn!(addr = %addr, "invalid FLEETSCOPE_METRICS_ADDR; expected host:port");
        }
    }
}

fn wait_secs_from_env() -> u64 {
    std::env::var("FLEETSCOPE_WAIT_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(8)
}

async fn read_objects(cli: &Cli) -> Result<Vec<serde_json::Value>> {
    if cli.files.is_empty() && !cli.live {
        bail!("no input: pass --file <path> or --live");
    }
    let mut objects = read_objects_files_only(cli)?;
    if cli.live {
        objects.extend(fleetscope_kubehub::prime_list(cli.namespace.as_deref()).await?);
    }
    Ok(objects)
}

async fn load_inventory(cli: &Cli) -> Result<Inventory> {
    let mut inv = Inventory::from_values(read_objects(cli).await?);
    if let Some(url) = &cli.hub_console_url {
        inv.set_hub_console_url(url);
    }
    info!(objects = inv.len(), "inventory loaded");
    Ok(inv)
}

fn lookup<'a>(inv: &'a Inventory, kind: ResourceKind, target: &NamespacedRef) -> Result<&'a FleetResource> {
    inv.find(kind, &target.namespace, &target.name).with_context(|| format!("{} {} not found", kind, target))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct AppRow {
    kind: ResourceKind,
    namespace: String,
    name: String,
    clusters: String,
    repos: Vec<String>,
}

fn app_rows(inv: &Inventory, namespace: Option<&str>) -> Vec<AppRow> {
    inv.objects()
        .iter()
        .filter(|o| match o {
            FleetResource::Application(_) | FleetResource::ApplicationSet(_) => true,
            FleetResource::ArgoApplication(a) => !a.metadata.owner_references.iter().any(|r| r.kind == "ApplicationSet"),
            _ => false,
        })
        .filter(|o| namespace.map(|ns| o.metadata().namespace() == ns).unwrap_or(true))
        .map(|o| {
            let clusters = inv.cluster_list(o);
            let repos = inv
                .application_repos(o)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|r| r.path_name)
                .collect();
            AppRow {
                kind: o.kind(),
                namespace: o.metadata().namespace().to_string(),
                name: o.metadata().name.clone(),
                clusters: get_cluster_count_string(get_cluster_count(&clusters), Some(clusters.as_slice())),
                repos,
            }
        })
        .collect()
}

fn print_app_table(rows: &[AppRow]) {
    println!("{:<16} {:<20} {:<28} {:<18} REPOS", "KIND", "NAMESPACE", "NAME", "CLUSTERS");
    for r in rows {
        println!("{:<16} {:<20} {:<28} {:<18} {}", r.kind, r.namespace, r.name, r.clusters, r.repos.join(","));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Repos { target, kind } => {
            let target = parse_target(target)?;
            let inv = load_inventory(&cli).await?;
            let res = lookup(&inv, kind.resource_kind(), &target)?;
            let repos = inv.application_repos(res).unwrap_or_default();
            match cli.output {
                Output::Json => print_json(&repos)?,
                Output::Human => {
                    let groups = group_by_repo_type(&repos);
                    for t in KNOWN_CHANNEL_TYPES {
                        let Some(members) = groups.get(&Some(t.to_string())) else { continue };
                        println!("{}:", t);
                        for r in members {
                            let mut line = format!("  {}", r.path_name.as_deref().unwrap_or("-"));
                            for (label, v) in [
                                ("chart", &r.chart),
                                ("branch", &r.git_branch),
                                ("path", &r.git_path),
                                ("package", &r.package),
                                ("version", &r.package_filter_version),
                                ("revision", &r.target_revision),
                            ] {
                                if let Some(v) = v {
                                    line.push_str(&format!(" {}={}", label, v));
                                }
                            }
                            println!("{}", line);
                        }
                    }
                    let unknown: usize = groups
                        .iter()
                        .filter(|(k, _)| k.as_deref().map(|t| !KNOWN_CHANNEL_TYPES.contains(&t)).unwrap_or(true))
                        .map(|(_, v)| v.len())
                        .sum();
                    if unknown > 0 {
                        println!("({} with unrecognized type)", unknown);
                    }
                }
            }
        }
        Commands::Clusters { target, kind } => {
            let target = parse_target(target)?;
            let inv = load_inventory(&cli).await?;
            let res = lookup(&inv, kind.resource_kind(), &target)?;
            let clusters = inv.cluster_list(res);
            let count = get_cluster_count(&clusters);
            match cli.output {
                Output::Json => {
                    #[derive(Serialize)]
                    struct Out<'a> {
                        clusters: &'a [String],
                        count: fleetscope_apps::ClusterCount,
                        summary: String,
                    }
                    let summary = get_cluster_count_string(count, Some(clusters.as_slice()));
                    print_json(&Out { clusters: &clusters, count, summary })?
                }
                Output::Human => {
                    println!("{}", get_cluster_count_string(count, Some(clusters.as_slice())));
                    for c in &clusters {
                        println!("  {}", c);
                    }
                }
            }
        }
        Commands::Children { target } => {
            let target = parse_target(target)?;
            let inv = load_inventory(&cli).await?;
            let FleetResource::Application(app) = lookup(&inv, ResourceKind::Application, &target)? else {
                bail!("{} is not a subscription application", target);
            };
            let (children, shared) = inv.child_resources(app);
            match cli.output {
                Output::Json => {
                    #[derive(Serialize)]
                    #[serde(rename_all = "camelCase")]
                    struct Out<'a> {
                        children: &'a [fleetscope_apps::ChildResource],
                        shared_children: &'a [fleetscope_apps::SharedChildResource],
                    }
                    print_json(&Out { children: &children, shared_children: &shared })?
                }
                Output::Human => {
                    println!("REMOVED WITH {}:", target);
                    for c in &children {
                        println!("  {}", c.label);
                        for sub in &c.sub_child_resources {
                            println!("    {}", sub);
                        }
                    }
                    if !shared.is_empty() {
                        println!("KEPT (shared):");
                        for s in &shared {
                            let with = match &s.shared_with {
                                fleetscope_apps::SharedWith::Applications(n) => format!("applications {}", n.join(", ")),
                                fleetscope_apps::SharedWith::Subscriptions(n) => format!("subscriptions {}", n.join(", ")),
                            };
                            println!("  {} (with {})", s.label, with);
                        }
                    }
                }
            }
        }
        Commands::AppsetSiblings { target } => {
            let target = parse_target(target)?;
            let inv = load_inventory(&cli).await?;
            let FleetResource::ApplicationSet(set) = lookup(&inv, ResourceKind::ApplicationSet, &target)? else {
                bail!("{} is not an ApplicationSet", target);
            };
            let (placement, siblings) = inv.app_set_related(set);
            match cli.output {
                Output::Json => print_json(&(placement, siblings))?,
                Output::Human if placement.is_empty() => println!("no placement"),
                Output::Human => {
                    println!("placement: {}", placement);
                    for s in &siblings {
                        println!("  {}", s);
                    }
                }
            }
        }
        Commands::Summary { metrics_file, labels } => {
            let inv = load_inventory(&cli).await?;
            let clusters = filter_clusters(inv.clusters(), &selection(labels));
            let response: PrometheusResponse = match metrics_file {
                Some(path) => {
                    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
                    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
                }
                None => PrometheusResponse::default(),
            };
            let samples = response.samples();
            let operators: Vec<_> = samples.iter().filter(|s| s.label("condition").is_some()).cloned().collect();
            let alerts: Vec<_> = samples.iter().filter(|s| s.label("alertstate").is_some()).cloned().collect();

            #[derive(Serialize)]
            struct Out {
                applications: fleetscope_apps::AppTypeCounts,
                clusters: fleetscope_dashboard::ClusterSummary,
                label_options: BTreeMap<String, BTreeSet<String>>,
                addons: fleetscope_dashboard::AddonSummary,
                policy_risk: fleetscope_dashboard::RiskBuckets,
                policy_risk_by_cluster: Vec<(String, fleetscope_dashboard::RiskBuckets)>,
                operators: fleetscope_dashboard::OperatorCounts,
                alerts: fleetscope_dashboard::AlertCounts,
            }
            let out = Out {
                applications: inv.type_counts(),
                clusters: summarize_clusters(clusters),
                label_options: inv.cluster_label_options(),
                addons: inv.addon_summary(),
                policy_risk: inv.policy_risk(),
                policy_risk_by_cluster: inv.policy_risk_by_cluster(),
                operators: classify_operators(&operators),
                alerts: classify_alerts(&alerts),
            };
            match cli.output {
                Output::Json => print_json(&out)?,
                Output::Human => {
                    let a = out.applications;
                    println!(
                        "applications  {} (subscription {}, argo {}, appset {}, ocp {}, flux {})",
                        a.total(),
                        a.subscription,
                        a.argo,
                        a.appset,
                        a.ocp,
                        a.flux
                    );
                    let c = out.clusters;
                    println!("clusters      {} (ready {}, offline {}, unknown {})", c.total, c.ready, c.offline, c.unknown);
                    for (key, values) in &out.label_options {
                        let values: Vec<&str> = values.iter().map(String::as_str).collect();
                        println!("  {}: {}", key, values.join(", "));
                    }
                    let d = out.addons;
                    println!(
                        "addons        available {}, degraded {}, progressing {}, unknown {}",
                        d.available, d.degraded, d.progressing, d.unknown
                    );
                    let p = out.policy_risk;
                    println!(
                        "policy risk   critical {}, important {}, moderate {}, low {}",
                        p.critical, p.important, p.moderate, p.low
                    );
                    for (cluster, b) in &out.policy_risk_by_cluster {
                        println!(
                            "  {}: critical {}, important {}, moderate {}, low {}",
                            cluster, b.critical, b.important, b.moderate, b.low
                        );
                    }
                    let o = out.operators;
                    println!("operators     degraded {}, not available {}, other {}", o.degraded, o.not_available, o.other);
                    let al = out.alerts;
                    println!(
                        "alerts        critical {}, warning {}, info {}, other {}",
                        al.critical, al.warning, al.info, al.other
                    );
                }
            }
        }
        Commands::Watch => {
            let ns = cli.namespace.as_deref();
            if !cli.live {
                if cli.files.is_empty() {
                    bail!("no input: pass --file <path> or --live");
                }
                let inv = replay_files(read_objects_files_only(&cli)?, queue_cap_from_env()).await?;
                render_snapshot(&cli, &inv)?;
                return Ok(());
            }
            let (ingest_tx, handle) = spawn_ingest(queue_cap_from_env());
            seed_ingest(&ingest_tx, read_objects_files_only(&cli)?).await?;
            let watchers = fleetscope_kubehub::watch_fleet(ns, ingest_tx.clone()).await?;
            if watchers.is_empty() && cli.files.is_empty() {
                bail!("no fleet kinds served and no --file input");
            }

            let first = handle.wait_for_epoch(1, Duration::from_secs(wait_secs_from_env())).await;
            render_snapshot(&cli, &first)?;
            let mut last = first.epoch;
            let mut rx = handle.subscribe_epoch();
            loop {
                tokio::select! {
                    changed = rx.changed() => {
                        if changed.is_err() {
                            warn!("ingest stopped; exiting watch loop");
                            break;
                        }
                        let inv = handle.current();
                        if inv.epoch != last {
                            last = inv.epoch;
                            render_snapshot(&cli, &inv)?;
                        }
                    }
                    _ = signal::ctrl_c() => {
                        info!("Ctrl-C received; shutting down watch loop");
                        break;
                    }
                }
            }
            drop(ingest_tx);
            for w in watchers {
                w.abort();
            }
        }
    }

    Ok(())
}

async fn seed_ingest(tx: &mpsc::Sender<Delta>, objects: Vec<serde_json::Value>) -> Result<()> {
    for v in objects {
        tx.send(Delta::applied(v)).await.context("ingest loop stopped while loading files")?;
    }
    Ok(())
}

/// Push `objects` through the ingest pipeline and return the snapshot left once it has drained.
async fn replay_files(objects: Vec<serde_json::Value>, cap: usize) -> Result<Arc<Inventory>> {
    let (tx, handle) = spawn_ingest(cap);
    seed_ingest(&tx, objects).await?;
    drop(tx);
    Ok(handle.wait_closed().await)
}

fn read_objects_files_only(cli: &Cli) -> Result<Vec<serde_json::Value>> {
    let mut objects = Vec::new();
    for path in &cli.files {
        objects.extend(load_path(path).with_context(|| format!("loading {}", path.display()))?);
    }
    Ok(objects)
}

fn render_snapshot(cli: &Cli, inv: &Inventory) -> Result<()> {
    let mut inv = inv.clone();
    if let Some(url) = &cli.hub_console_url {
        inv.set_hub_console_url(url);
    }
    let rows = app_rows(&inv, cli.namespace.as_deref());
    match cli.output {
        Output::Json => {
            println!("{}", serde_json::to_string(&serde_json::json!({"epoch": inv.epoch, "applications": rows}))?);
        }
        Output::Human => {
            println!("# epoch {} ({} objects)", inv.epoch, inv.len());
            print_app_table(&rows);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_and_target_parsing() {
        assert_eq!(parse_label("region=us-east-1").unwrap(), ("region".into(), "us-east-1".into()));
        assert!(parse_label("region").is_err());
        assert!(parse_label("=x").is_err());
        assert!(parse_target("ns/app").is_ok());
        assert!(parse_target("app").is_err());
        let sel = selection(&[("env".into(), "dev".into()), ("env".into(), "prod".into())]);
        assert_eq!(sel["env"], vec!["dev", "prod"]);
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::try_parse_from(["fleetctl", "-f", "a.yaml", "-f", "b.json", "-o", "json", "repos", "ns/app", "--kind", "argo"])
            .unwrap();
        assert_eq!(cli.files.len(), 2);
        assert_eq!(cli.output, Output::Json);
        assert!(matches!(cli.command, Commands::Repos { kind: AppKind::Argo, .. }));
    }

    #[tokio::test]
    async fn file_watch_renders_every_object() {
        let objects: Vec<serde_json::Value> = (0..3000)
            .map(|i| {
                serde_json::json!({
                    "apiVersion": "apps.open-cluster-management.io/v1",
                    "kind": "Subscription",
                    "metadata": {"name": format!("s{}", i), "namespace": "ns", "uid": format!("u{}", i)},
                    "spec": {"channel": "ns/c"},
                })
            })
            .collect();
        let inv = replay_files(objects, 4096).await.unwrap();
        assert_eq!(inv.subscriptions().len(), 3000);
        assert!(inv.epoch >= 1);
    }
}
