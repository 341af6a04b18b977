use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};

use health_intake::config::EngineConfig;
use health_intake::conversation::SessionType;
use health_intake::error::PipelineError;
use health_intake::extraction::FieldExtractor;
use health_intake::pipeline::{DecisionPipeline, HandoffPayload, PipelineOutput};
use health_intake::semantic::SemanticMatcher;
use health_intake::session::{PipelineRun, SessionRegistry};
use health_intake::store::InMemorySessionStore;

/// Stand-in pipeline that echoes the collected profile back as a plan.
struct ProfileEcho;

#[async_trait]
impl DecisionPipeline for ProfileEcho {
    fn name(&self) -> &str {
        "profile-echo"
    }

    async fn run(&self, payload: &HandoffPayload) -> Result<PipelineOutput, PipelineError> {
        let habits: Vec<_> = payload
            .interventions
            .iter()
            .map(|i| {
                json!({
                    "action": i.title,
                    "frequency": "daily",
                    "rationale": i.description,
                })
            })
            .collect();
        let profile = payload
            .fields
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(PipelineOutput::Json(json!({
            "duration_weeks": 4,
            "focus_areas": [payload.session_type.to_string()],
            "habits": habits,
            "motivational_message": format!("Based on what you shared ({profile}), small steps add up."),
        })))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let session_type: SessionType = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "intake".to_string())
        .parse()
        .map_err(anyhow::Error::msg)?;

    let mut config = EngineConfig::from_env().context("invalid HEALTH_INTAKE_* configuration")?;
    // No LLM adapter is wired into the demo.
    config.extractor.use_llm = false;

    eprintln!("🩺 Health Intake v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Session: {session_type}");
    eprintln!("   Type a message and press Enter. /quit to exit.\n");

    let extractor = Arc::new(FieldExtractor::new(
        Arc::new(SemanticMatcher::new()),
        config.extractor.clone(),
    ));
    let registry = SessionRegistry::new(extractor, config.session.clone())
        .with_store(Arc::new(InMemorySessionStore::new()));
    let pipeline = ProfileEcho;

    let (id, welcome) = registry.start("local-user", session_type, Vec::new()).await;
    println!("\n{welcome}\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprint!("> ");
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            eprint!("> ");
            continue;
        }
        if line == "/quit" {
            break;
        }

        let outcome = registry.process(id, line).await?;
        println!("\n{}\n", outcome.response);

        if let Some(handoff) = &outcome.handoff {
            println!("{}", serde_json::to_string_pretty(handoff)?);
            match registry.run_pipeline(id, &pipeline).await? {
                PipelineRun::Completed { response, .. } => {
                    println!("\n{response}\n");
                    break;
                }
                PipelineRun::Skipped { response, .. } => println!("\n{response}\n"),
            }
        }
        eprint!("> ");
    }

    Ok(())
}
