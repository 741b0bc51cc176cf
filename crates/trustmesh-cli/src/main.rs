//! TrustMesh CLI - Command-line interface for the reputation substrate

use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use trustmesh_core::{ForkType, SledLedger, TrustMesh, TrustMeshConfig, TrustPolicy};

#[derive(Parser)]
#[command(name = "trustmesh")]
#[command(about = "TrustMesh - Bayesian reputation for autonomous agents")]
struct Cli {
    /// Path to the ledger database
    #[arg(long, default_value = "./trustmesh.db")]
    db: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Register a new root agent
    Register {
        /// Agent identifier
        agent: String,
    },
    /// Register a fork of an existing agent
    Fork {
        /// Parent agent identifier
        parent: String,
        /// Child agent identifier
        child: String,
        /// Fork type: bugfix, major or override
        #[arg(long)]
        fork_type: String,
        /// Claimed inheritance weight
        #[arg(long)]
        weight: f64,
    },
    /// Show an agent's reputation record
    Query {
        /// Agent identifier
        agent: String,
    },
    /// Evaluate an agent against a trust policy
    Evaluate {
        /// Agent identifier
        agent: String,
        /// Minimum score
        #[arg(long, default_value_t = 0.7)]
        min_score: f64,
        /// Minimum effective sample size
        #[arg(long, default_value_t = 10.0)]
        min_confidence: f64,
    },
    /// List an agent's archived reputation history paths
    History {
        /// Agent identifier
        agent: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt::init();

    let Some(command) = cli.command else {
        println!("TrustMesh v0.1.0 - Use --help for commands");
        return Ok(());
    };

    let ledger = Arc::new(SledLedger::open(&cli.db)?);
    let mut mesh = TrustMesh::new(TrustMeshConfig::default(), ledger);

    match command {
        Commands::Register { agent } => {
            let record = mesh.register_agent(&agent, Utc::now()).await?;
            println!("registered {} at score {:.3}", agent, record.score());
        }
        Commands::Fork {
            parent,
            child,
            fork_type,
            weight,
        } => {
            let fork_type = parse_fork_type(&fork_type)?;
            let fork_id = format!("fork-{}", Utc::now().timestamp());
            let record = mesh
                .register_fork(&parent, &child, &fork_id, fork_type, weight, Utc::now())
                .await?;
            println!(
                "forked {} -> {} at score {:.3} (probation until {})",
                parent,
                child,
                record.score(),
                record
                    .probation
                    .as_ref()
                    .map(|p| p.expires_at.to_rfc3339())
                    .unwrap_or_default()
            );
        }
        Commands::Query { agent } => {
            let record = mesh.query_reputation(&agent).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Evaluate {
            agent,
            min_score,
            min_confidence,
        } => {
            let policy = TrustPolicy {
                min_score,
                min_confidence,
            };
            let decision = mesh.evaluate_trust(&agent, &policy).await?;
            if decision.accept {
                println!(
                    "accept (score {:.3}, confidence {:.1})",
                    decision.score, decision.confidence
                );
            } else {
                println!("reject: {}", decision.reason());
            }
        }
        Commands::History { agent } => {
            for path in mesh.store().history(&agent).await? {
                println!("{path}");
            }
        }
    }

    Ok(())
}

fn parse_fork_type(raw: &str) -> anyhow::Result<ForkType> {
    match raw {
        "bugfix" => Ok(ForkType::Bugfix),
        "major" => Ok(ForkType::Major),
        "override" => Ok(ForkType::Override),
        other => anyhow::bail!("unknown fork type `{other}` (bugfix, major or override)"),
    }
}
