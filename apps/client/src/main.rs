use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use jobtrack::api::generation_feed::{subscribe_to_resume_generation, GenerationUpdate};
use jobtrack::models::auth::LoginRequest;
use jobtrack::models::job_application::{ApplicationStatus, ListJobApplicationsParams};
use jobtrack::models::ml::{GetRecommendationsParams, Tier};
use jobtrack::models::objectives::{HistoryPreset, HistoryWindow};
use jobtrack::models::resume::GenerateResumeRequest;
use jobtrack::{Config, Services};

#[derive(Parser, Debug)]
#[command(name = "jobtrack", version, about = "Job application tracker client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and store the issued tokens.
    Login {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: String,
    },
    /// Revoke the session and clear stored tokens.
    Logout {
        /// Sign out of every device.
        #[arg(long)]
        all: bool,
    },
    /// Show the signed-in user.
    Whoami,
    /// List job applications.
    Applications {
        #[arg(long, value_parser = parse_enum::<ApplicationStatus>)]
        status: Option<ApplicationStatus>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Daily objectives and progress.
    Objectives {
        #[command(subcommand)]
        view: ObjectivesView,
    },
    /// Ranked applications from the recommendation service.
    Recommendations {
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long, value_parser = parse_enum::<Tier>)]
        tier: Option<Tier>,
    },
    /// Generate a tailored resume and follow its progress.
    Generate {
        #[arg(long)]
        application: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Language name or two-letter code (en, pt, es, fr, de).
        #[arg(long)]
        language: Option<String>,
    },
    /// Download a resume file.
    Download {
        id: String,
        #[arg(long, short)]
        output: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum ObjectivesView {
    Today,
    History {
        #[arg(long, value_parser = parse_enum::<HistoryPreset>)]
        preset: Option<HistoryPreset>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let services = Services::new(&config).context("failed to build HTTP client")?;
    info!(
        "jobtrack v{} (jobs: {}, auth: {}, ml: {})",
        env!("CARGO_PKG_VERSION"),
        config.jobs_api_url,
        config.auth_api_url,
        config.ml_api_url
    );

    run(cli.command, &services).await
}

async fn run(command: Command, services: &Services) -> Result<()> {
    match command {
        Command::Login {
            email,
            username,
            password,
        } => {
            if email.is_none() && username.is_none() {
                bail!("pass --email or --username");
            }
            let auth = services
                .auth
                .login(&LoginRequest {
                    email,
                    username,
                    password,
                })
                .await?;
            services.auth_store.set_user(auth.user.clone(), None);
            println!("Signed in as {} <{}>", auth.user.username, auth.user.email);
        }

        Command::Logout { all } => {
            if all {
                services.auth.logout_all().await?;
            } else {
                let Some(refresh_token) = services.auth.refresh_token() else {
                    println!("Not signed in");
                    return Ok(());
                };
                services.auth.logout(&refresh_token).await?;
            }
            println!("Signed out");
        }

        Command::Whoami => {
            services.auth_store.init().await;
            match services.auth_store.current_user() {
                Some(user) => println!("{} <{}>", user.username, user.email),
                None => println!("Not signed in"),
            }
        }

        Command::Applications {
            status,
            page,
            limit,
            tags,
        } => {
            let page = services
                .job_applications
                .list(&ListJobApplicationsParams {
                    page,
                    limit,
                    status,
                    tags,
                    ..Default::default()
                })
                .await?;
            for app in &page.applications {
                println!(
                    "{:<38} {:<10} {} @ {}",
                    app.id,
                    app.status.as_str(),
                    app.job_title,
                    app.company_name
                );
            }
            println!("{} of {} application(s)", page.applications.len(), page.total);
        }

        Command::Objectives { view } => {
            let store = &services.objectives_store;
            match view {
                ObjectivesView::Today => {
                    store.init().await;
                    let state = store.snapshot();
                    if let Some(error) = state.error {
                        bail!(error);
                    }
                    print_json(&state.today_progress)?;
                }
                ObjectivesView::History { preset, from, to } => {
                    store
                        .load_historical_progress(HistoryWindow::new(preset, from, to))
                        .await;
                    let state = store.snapshot();
                    if let Some(error) = state.error {
                        bail!(error);
                    }
                    print_json(&state.historical_progress)?;
                }
            }
        }

        Command::Recommendations { limit, tier } => {
            let profile = services.auth.get_profile().await?;
            let recommendations = services
                .ml
                .get_recommendations(&profile.user_id, &GetRecommendationsParams { limit, tier })
                .await?;
            for rec in &recommendations.recommendations {
                println!(
                    "[{}] {:.2} {} @ {}: {}",
                    rec.tier.as_str(),
                    rec.score,
                    rec.job_title,
                    rec.company_name,
                    rec.explanation
                );
            }
        }

        Command::Generate {
            application,
            description,
            language,
        } => {
            let job = services
                .resumes
                .generate(&GenerateResumeRequest {
                    job_application_id: application,
                    job_description: description,
                    language,
                })
                .await?;
            println!("Queued generation job {}", job.job_id);

            let mut feed = subscribe_to_resume_generation(
                services.resumes.clone(),
                job.job_id,
                services.config.poll_interval,
            );
            while let Some(update) = feed.next().await {
                match update {
                    GenerationUpdate::Progress(event) => {
                        println!("{:>3}% {}", event.progress, event.message)
                    }
                    GenerationUpdate::Completed {
                        resume_id: Some(id),
                    } => println!("Resume ready: {id}"),
                    GenerationUpdate::Completed { resume_id: None } => {
                        println!("Generation finished without a resume id")
                    }
                    GenerationUpdate::Failed(reason) => bail!("generation failed: {reason}"),
                }
            }
        }

        Command::Download { id, output } => {
            let bytes = services.resumes.download(&id).await?;
            tokio::fs::write(&output, &bytes)
                .await
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!("Saved {} bytes to {}", bytes.len(), output.display());
        }
    }

    Ok(())
}

/// Parses a CLI value with the same spelling the API uses on the wire.
fn parse_enum<T: DeserializeOwned>(value: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| format!("unrecognised value '{value}'"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
