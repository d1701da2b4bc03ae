// Onboard Review - CLI Entry Point
//
// Command-line front end for the onboarding code-review service:
// - Sign in / out
// - Daily usage quotas
// - Reviews and code submissions
// - Feedback resolution tracking

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing::{error, info, warn};

use onboard_review::api::{ApiClient, NewReview, NewSubmission, User};
use onboard_review::config::Config;
use onboard_review::feedback::{latest_submission, FeedbackView};
use onboard_review::session::AuthSession;
use onboard_review::storage::{FileStore, KeyValueStore};
use onboard_review::usage::{FeatureKey, FeatureUsage, UsageSnapshot, UsageTracker};
use onboard_review::{logging, metrics, ClientError};

/// Onboard Review: AI-assisted code review for new employees
#[derive(Parser, Debug)]
#[command(name = "onboard-review")]
#[command(author = "Onboard Review Contributors")]
#[command(version)]
#[command(about = "AI-assisted code review for new employees", long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (default: ~/.config/onboard-review/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print JSON instead of tables
    #[arg(long)]
    json: bool,

    /// Dump client metrics to stderr after the command
    #[arg(long)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign out and forget the session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Show today's feature quotas
    Usage {
        /// Ignore the cache window and fetch now
        #[arg(long)]
        force: bool,
    },
    /// Change a feature's daily limit (admin only)
    SetLimit {
        /// Feature key, e.g. code_review or ai_chat
        feature: String,
        /// New daily limit (> 0)
        limit: u32,
    },
    /// List or create reviews
    Reviews {
        #[command(subcommand)]
        action: ReviewAction,
    },
    /// Submit a new version of code to a review
    Submit {
        #[arg(long)]
        review: i64,
        /// File containing the code
        #[arg(long)]
        file: PathBuf,
        /// What the code is supposed to do
        #[arg(long)]
        expectation: Option<String>,
    },
    /// Show feedback on the latest submission of a review
    Feedback {
        review: i64,
        /// Include resolved items
        #[arg(long)]
        all: bool,
    },
    /// Mark a feedback item as addressed (locally)
    Resolve {
        review: i64,
        feedback: i64,
        /// Mark as not addressed instead
        #[arg(long)]
        undo: bool,
    },
    /// Set the server-side resolution status of a feedback item
    Status {
        feedback: i64,
        #[arg(long, action = ArgAction::Set)]
        resolved: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ReviewAction {
    /// List your reviews
    List,
    /// Start a new review
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
    },
}

/// Everything a command needs
struct Context {
    config: Config,
    store: Arc<dyn KeyValueStore>,
    session: AuthSession,
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    logging::init(&config.logging, args.verbose);
    if let Err(e) = metrics::init() {
        warn!("Metrics registry unavailable: {}", e);
    }

    let Some(command) = args.command else {
        info!("No command specified. Use \"onboard-review --help\" for usage.");
        return Ok(());
    };

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(config.storage.state_file())?);
    let api = ApiClient::new(&config.api)?;
    let session = AuthSession::new(api, Arc::clone(&store));
    let mut ctx = Context {
        config,
        store,
        session,
        json: args.json,
    };

    let result = run(command, &mut ctx).await;

    if args.print_metrics {
        eprintln!("{}", metrics::gather());
    }

    if let Err(err) = result {
        let err = ctx.session.handle_error(err).await;
        error!("{}", err);
        if err.is_auth_failure() {
            eprintln!("Not signed in or session expired. Run `onboard-review login` to sign in again.");
        }
        std::process::exit(1);
    }

    Ok(())
}

async fn run(command: Commands, ctx: &mut Context) -> onboard_review::Result<()> {
    match command {
        Commands::Login { email, password } => {
            let user = ctx.session.login(&email, &password).await?;
            println!("Logged in as {} <{}> ({})", user.name, user.email, user.role);
        }
        Commands::Register {
            name,
            email,
            password,
        } => {
            let user = ctx.session.register(&name, &email, &password).await?;
            println!("Welcome, {}! Registered as {}", user.name, user.email);
        }
        Commands::Logout => {
            ctx.session.logout().await?;
            println!("Logged out");
        }
        Commands::Whoami => {
            let user = require_user(ctx).await?;
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&user)?);
            } else {
                println!("{} <{}> ({})", user.name, user.email, user.role);
            }
        }
        Commands::Usage { force } => {
            let tracker = usage_tracker(ctx).await?;
            tracker.refresh(force).await;
            print_usage(&tracker.snapshot().await, ctx.json)?;
        }
        Commands::SetLimit { feature, limit } => {
            require_user(ctx).await?;
            if !ctx.session.is_admin() {
                return Err(ClientError::InvalidInput(
                    "changing daily limits requires the admin role".to_string(),
                ));
            }
            let tracker = usage_tracker(ctx).await?;
            let feature = FeatureKey::new(feature);
            let snapshot = tracker.set_daily_limit(&feature, limit).await?;
            println!("Daily limit for {} is now {}", feature, limit);
            print_usage(&snapshot, ctx.json)?;
        }
        Commands::Reviews { action } => {
            require_user(ctx).await?;
            let api = ctx.session.api();
            match action {
                ReviewAction::List => {
                    let reviews = api.list_reviews().await?;
                    if ctx.json {
                        println!("{}", serde_json::to_string_pretty(&reviews)?);
                    } else if reviews.is_empty() {
                        println!("No reviews yet. Start one with `onboard-review reviews create`.");
                    } else {
                        for review in reviews {
                            println!(
                                "#{:<5} {:<40} {:<12} {}",
                                review.id,
                                review.title,
                                review.status.as_deref().unwrap_or("-"),
                                review.created_at.format("%Y-%m-%d")
                            );
                        }
                    }
                }
                ReviewAction::Create { title, description } => {
                    let review = api
                        .create_review(&NewReview { title, description })
                        .await?;
                    println!("Created review #{}: {}", review.id, review.title);
                }
            }
        }
        Commands::Submit {
            review,
            file,
            expectation,
        } => {
            let tracker = usage_tracker(ctx).await?;
            let feature = FeatureKey::code_review();
            tracker.refresh(false).await;
            if let Some(usage) = tracker.get_usage_info(&feature).await {
                if !usage.can_use() {
                    return Err(ClientError::InvalidInput(format!(
                        "daily {} quota used up ({}/{})",
                        feature,
                        usage.used(),
                        usage.limit()
                    )));
                }
            }

            let code_content = std::fs::read_to_string(&file)?;
            let submission = ctx
                .session
                .api()
                .create_submission(&NewSubmission {
                    review_id: review,
                    code_content,
                    expectation,
                })
                .await?;
            tracker.record_use(&feature).await;

            println!(
                "Submitted version {} to review #{} ({} feedback items)",
                submission.version,
                review,
                submission.feedbacks.len()
            );
            if let Some(usage) = tracker.get_usage_info(&feature).await {
                println!("{} remaining today: {}", feature, format_remaining(&usage));
            }
        }
        Commands::Feedback { review, all } => {
            require_user(ctx).await?;
            let submissions = ctx.session.api().review_submissions(review).await?;
            let view = FeedbackView::for_latest(review, &submissions, Arc::clone(&ctx.store))?;

            if ctx.json {
                let items: Vec<_> = view
                    .sorted()
                    .into_iter()
                    .filter(|f| all || !view.is_resolved(f.id))
                    .map(|f| {
                        serde_json::json!({
                            "feedback": f,
                            "resolved": view.is_resolved(f.id),
                        })
                    })
                    .collect();
                let out = serde_json::json!({
                    "items": items,
                    "summary": view.summary(),
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
                return Ok(());
            }

            match latest_submission(&submissions) {
                Some(latest) => println!("Review #{} - version {}", review, latest.version),
                None => {
                    println!("Review #{} has no submissions yet", review);
                    return Ok(());
                }
            }

            let items = if all { view.sorted() } else { view.unresolved() };
            for item in items {
                let mark = if view.is_resolved(item.id) { "x" } else { " " };
                let line = item
                    .line_number
                    .map(|n| format!("L{}", n))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "[{}] #{:<5} {:<6} {:<6} {}",
                    mark, item.id, item.priority, line, item.problem_point
                );
                println!("            -> {}", item.suggestion);
            }

            let summary = view.summary();
            println!(
                "{} of {} resolved ({:.0}%), {} open",
                summary.resolved,
                summary.total,
                summary.resolution_rate(),
                summary.unresolved
            );
        }
        Commands::Resolve {
            review,
            feedback,
            undo,
        } => {
            require_user(ctx).await?;
            let submissions = ctx.session.api().review_submissions(review).await?;
            let mut view =
                FeedbackView::for_latest(review, &submissions, Arc::clone(&ctx.store))?;
            if !view.contains(feedback) {
                return Err(ClientError::InvalidInput(format!(
                    "feedback #{} is not part of the latest submission of review #{}",
                    feedback, review
                )));
            }

            view.mark_resolved(feedback, !undo)?;
            println!(
                "Feedback #{} marked {}; {} open",
                feedback,
                if undo { "open" } else { "resolved" },
                view.unresolved_count()
            );
        }
        Commands::Status { feedback, resolved } => {
            require_user(ctx).await?;
            ctx.session
                .api()
                .set_feedback_status(feedback, resolved)
                .await?;
            println!(
                "Server status of feedback #{} set to {}",
                feedback,
                if resolved { "resolved" } else { "open" }
            );
        }
    }

    Ok(())
}

/// Restore the stored session or fail with `Unauthorized`
async fn require_user(ctx: &mut Context) -> onboard_review::Result<User> {
    if let Some(user) = ctx.session.current_user() {
        return Ok(user.clone());
    }
    match ctx.session.load().await? {
        Some(user) => Ok(user),
        None => Err(ClientError::Unauthorized),
    }
}

/// Tracker for the signed-in user, role injected from the session
async fn usage_tracker(ctx: &mut Context) -> onboard_review::Result<UsageTracker> {
    let user = require_user(ctx).await?;
    Ok(UsageTracker::new(
        Arc::new(ctx.session.api().clone()),
        ctx.config.usage.clone(),
        user.role,
    ))
}

fn format_remaining(usage: &FeatureUsage) -> String {
    if usage.is_unlimited() {
        "unlimited".to_string()
    } else {
        format!("{}/{}", usage.remaining(), usage.limit())
    }
}

fn print_usage(snapshot: &UsageSnapshot, json: bool) -> onboard_review::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(snapshot)?);
        return Ok(());
    }

    println!(
        "{:<16} {:>6} {:>10} {:>10} {:>6}  status",
        "feature", "used", "limit", "remaining", "used%"
    );
    for (feature, usage) in snapshot {
        if usage.is_unlimited() {
            println!(
                "{:<16} {:>6} {:>10} {:>10} {:>6}  ok",
                feature, "-", "unlimited", "-", "-"
            );
            continue;
        }
        println!(
            "{:<16} {:>6} {:>10} {:>10} {:>5.0}%  {}",
            feature,
            usage.used(),
            usage.limit(),
            usage.remaining(),
            usage.utilization_percent(),
            if usage.can_use() { "ok" } else { "limit reached" }
        );
    }
    Ok(())
}
