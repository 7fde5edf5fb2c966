//! CLI command implementations

use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use drf_core::{
    EnabledResourceTypes, EnvParser, PlaceholderStyle, Resource, ResourceType, ResourceWeights,
    WorkloadConfig,
};
use drf_scheduler::{calculate_shares, FairScheduler};
use serde::Serialize;
use tracing::debug;

/// Parse `memory,cpu,gpu`; missing trailing values are zero
pub fn parse_resource(s: &str) -> Result<Resource, String> {
    let values = parse_triple::<u64>(s)?;
    let mut resource = Resource::none();
    for (t, v) in ResourceType::ALL.iter().zip(values) {
        if let Some(v) = v {
            resource.set(*t, v);
        }
    }
    Ok(resource)
}

/// Parse `memory,cpu,gpu` weights; missing trailing values are 1.0
fn parse_weights(s: &str) -> Result<ResourceWeights> {
    let values = parse_triple::<f64>(s).map_err(anyhow::Error::msg)?;
    let mut weights = ResourceWeights::NEUTRAL;
    for (t, v) in ResourceType::ALL.iter().zip(values) {
        if let Some(v) = v {
            weights = weights.with(*t, v)?;
        }
    }
    Ok(weights)
}

fn parse_triple<T: std::str::FromStr>(s: &str) -> Result<[Option<T>; ResourceType::COUNT], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() > ResourceType::COUNT {
        return Err(format!(
            "expected at most {} comma-separated values, got {}",
            ResourceType::COUNT,
            parts.len()
        ));
    }

    let mut out: [Option<T>; ResourceType::COUNT] = std::array::from_fn(|_| None);
    for (slot, part) in out.iter_mut().zip(parts) {
        if part.is_empty() {
            continue;
        }
        *slot = Some(
            part.parse::<T>()
                .map_err(|_| format!("invalid value '{}'", part))?,
        );
    }
    Ok(out)
}

#[derive(Serialize)]
struct RankEntry {
    rank: usize,
    name: String,
    dominant: ResourceType,
    dominant_share: f64,
    needy: bool,
    usage: Resource,
}

fn build_scheduler(workload: &WorkloadConfig) -> Result<FairScheduler> {
    let scheduler = FairScheduler::from_config(&workload.cluster)?;
    for consumer in &workload.consumers {
        scheduler.register(consumer.clone())?;
    }
    debug!(consumers = scheduler.len(), "Loaded workload");
    Ok(scheduler)
}

fn rank_entries(workload: &WorkloadConfig) -> Result<Vec<RankEntry>> {
    let scheduler = build_scheduler(workload)?;
    let (comparator, mut consumers) = scheduler.snapshot()?;
    consumers.sort_by(|a, b| comparator.compare(a, b));

    let entries = consumers
        .into_iter()
        .enumerate()
        .map(|(i, c)| {
            let (shares, order) = comparator.cluster_shares(&c);
            RankEntry {
                rank: i + 1,
                dominant: order.dominant(),
                dominant_share: shares.get(order.dominant()),
                needy: comparator.is_needy(&c, &order),
                usage: c.usage,
                name: c.name,
            }
        })
        .collect();
    Ok(entries)
}

/// Print every consumer in allocation order
pub fn rank(workload: &WorkloadConfig, json: bool) -> Result<()> {
    let entries = rank_entries(workload)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!(
        "{:<5} {:<20} {:<8} {:>10} {:<6} USAGE",
        "RANK", "NAME", "DOMINANT", "SHARE", "NEEDY"
    );
    for e in entries {
        println!(
            "{:<5} {:<20} {:<8} {:>10.4} {:<6} {}",
            e.rank,
            e.name,
            e.dominant.to_string(),
            e.dominant_share,
            if e.needy { "yes" } else { "no" },
            e.usage
        );
    }
    Ok(())
}

/// Print the consumer that receives the next allocation
pub fn next(workload: &WorkloadConfig, json: bool) -> Result<()> {
    let scheduler = build_scheduler(workload)?;
    match scheduler.next_consumer()? {
        Some(c) if json => println!("{}", serde_json::to_string_pretty(&c)?),
        Some(c) => println!("{}", c.name),
        None => eprintln!("No consumers in workload"),
    }
    Ok(())
}

/// Print weighted fair shares
pub fn fair_shares(workload: &WorkloadConfig, json: bool) -> Result<()> {
    let scheduler = build_scheduler(workload)?;
    let shares = scheduler.fair_shares()?;
    let over = scheduler.over_fair_share()?;

    if json {
        let map: BTreeMap<String, Resource> = shares.into_iter().collect();
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    println!("{:<20} {:<40} OVER", "NAME", "FAIR SHARE");
    for (name, share) in shares {
        let flag = if over.contains(&name) { "yes" } else { "no" };
        println!("{:<20} {:<40} {}", name, share.to_string(), flag);
    }
    Ok(())
}

/// Print shares and dimension order for one usage vector
pub fn shares(capacity: Resource, usage: Resource, weights: Option<&str>, json: bool) -> Result<()> {
    let weights = match weights {
        Some(w) => parse_weights(w).context("invalid --weights")?,
        None => ResourceWeights::NEUTRAL,
    };
    let enabled = EnabledResourceTypes::all();
    let (shares, order) = calculate_shares(&usage, &capacity, &weights, &enabled);

    if json {
        #[derive(Serialize)]
        struct SharesOutput {
            shares: BTreeMap<ResourceType, f64>,
            order: Vec<ResourceType>,
        }

        let output = SharesOutput {
            shares: enabled.iter().map(|t| (t, shares.get(t))).collect(),
            order: order.as_slice().to_vec(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for t in enabled.iter() {
        println!("{:<8} {:.6}", t.to_string(), shares.get(t));
    }
    let order: Vec<String> = order.as_slice().iter().map(|t| t.to_string()).collect();
    println!("order    {}", order.join(" > "));
    Ok(())
}

/// Print the result of parsing an environment assignment list
pub fn env(input: &str, base: &[String], windows: bool, inherit: bool, json: bool) -> Result<()> {
    let mut environment: HashMap<String, String> = HashMap::new();
    for entry in base {
        let (key, value) = entry
            .split_once('=')
            .with_context(|| format!("invalid --base entry '{}', expected KEY=VALUE", entry))?;
        environment.insert(key.to_string(), value.to_string());
    }

    let style = if windows {
        PlaceholderStyle::Windows
    } else {
        PlaceholderStyle::Unix
    };
    EnvParser::default()
        .with_style(style)
        .inherit_process_env(inherit)
        .set_env_from_input_string(&mut environment, input);

    let sorted: BTreeMap<String, String> = environment.into_iter().collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&sorted)?);
    } else {
        for (key, value) in sorted {
            println!("{}={}", key, value);
        }
    }
    Ok(())
}
