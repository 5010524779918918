use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ats_core::app::{GuardDecision, ListView, Route};
use ats_core::config::ClientConfig;
use ats_core::domain::{
    Application, ApplicationId, ApplicationStatus, CandidateFile, JobDraft, JobId, JobPosting,
};
use ats_core::impls::AutoConfirm;
use ats_core::ports::{Confirm, Notice, NoticeLevel, NoticeSink};
use ats_core::{AtsClient, ClientBuilder};

#[derive(Parser)]
#[command(name = "ats")]
#[command(about = "Applicant tracking from the terminal - jobs, applications and candidates")]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API base URL, e.g. http://localhost:8080/api
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in as a recruiter
    Login {
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Create a recruiter account
    Register {
        full_name: String,
        email: String,
        #[arg(long)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show who is signed in
    Whoami,

    /// Totals and the most recent applications
    Dashboard,

    /// Manage job postings
    Jobs {
        #[command(subcommand)]
        command: JobCommands,
    },

    /// List applications
    Applications {
        /// Free-text search over candidate name and email (ignores filters)
        #[arg(short, long)]
        search: Option<String>,

        /// Only applications for this job
        #[arg(short, long)]
        job: Option<JobId>,

        /// Only applications with this status (NEW, SHORTLISTED, INTERVIEWED, REJECTED, HIRED)
        #[arg(long)]
        status: Option<ApplicationStatus>,
    },

    /// Change an application's status
    Status {
        id: ApplicationId,
        status: ApplicationStatus,
    },

    /// Show a public job posting
    ViewJob { id: JobId },

    /// Apply to a job as a candidate
    Apply {
        job: JobId,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// PDF, DOC or DOCX, at most 10 MiB
        #[arg(long)]
        resume: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum JobCommands {
    /// List all postings with application counts
    List,

    /// Show one posting and its applications
    Show { id: JobId },

    /// Create a posting
    Create {
        title: String,
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Edit a posting's title and description
    Edit {
        id: JobId,
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Publish or unpublish a posting
    Toggle { id: JobId },

    /// Delete a posting and its applications
    Delete {
        id: JobId,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

impl Commands {
    /// The view each command corresponds to; decides whether a session is needed.
    fn route(&self) -> Option<Route> {
        let route = match self {
            Commands::Login { .. } => Route::Login,
            Commands::Register { .. } => Route::Register,
            Commands::Logout | Commands::Whoami => return None,
            Commands::Dashboard => Route::Dashboard,
            Commands::Jobs { command } => match command {
                JobCommands::List | JobCommands::Toggle { .. } | JobCommands::Delete { .. } => {
                    Route::Jobs
                }
                JobCommands::Show { id } => Route::JobDetail(*id),
                JobCommands::Create { .. } => Route::NewJob,
                JobCommands::Edit { id, .. } => Route::EditJob(*id),
            },
            Commands::Applications { .. } | Commands::Status { .. } => Route::Applications,
            Commands::ViewJob { id } => Route::Careers(*id),
            Commands::Apply { job, .. } => Route::Apply(*job),
        };
        Some(route)
    }
}

/// Prints notices to stderr.
struct StderrNotices;

impl NoticeSink for StderrNotices {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => eprintln!("{}", notice.message),
            NoticeLevel::Error => eprintln!("error: {}", notice.message),
        }
    }
}

/// Asks on the terminal.
struct PromptConfirm;

impl Confirm for PromptConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        eprint!("{prompt} [y/N] ");
        let _ = io::stderr().flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let config = match cli.config.clone().or_else(ClientConfig::default_path) {
        Some(path) => ClientConfig::load(&path)?,
        None => ClientConfig::default(),
    };
    let mut config = config.with_env_overrides();
    if let Some(url) = &cli.api_url {
        config.api_base_url = url.clone();
    }
    Ok(config)
}

fn read_password(given: Option<String>) -> Result<String> {
    if let Some(password) = given {
        return Ok(password);
    }
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let confirm: Arc<dyn Confirm> = match &cli.command {
        Commands::Jobs {
            command: JobCommands::Delete { yes: true, .. },
        } => Arc::new(AutoConfirm(true)),
        _ => Arc::new(PromptConfirm),
    };
    let client = ClientBuilder::production(config)?
        .notices(Arc::new(StderrNotices))
        .confirm(confirm)
        .build()
        .context("failed to set up the client")?;

    if let Some(route) = cli.command.route() {
        if let GuardDecision::Redirect(to) = client.guard(&route.path()) {
            bail!("{} requires a session (redirected to {to}); run `ats login` first", route.path());
        }
    }

    run(&client, cli.command).await
}

async fn run(client: &AtsClient, command: Commands) -> Result<()> {
    match command {
        Commands::Login { email, password } => {
            let password = read_password(password)?;
            let session = client.session().login(&email, &password).await?;
            println!("Signed in as {} <{}>", session.identity.display_name, session.identity.email);
        }

        Commands::Register {
            full_name,
            email,
            password,
        } => {
            let password = read_password(password)?;
            let session = client
                .session()
                .register(&full_name, &email, &password)
                .await?;
            println!("Welcome, {}!", session.identity.display_name);
        }

        Commands::Logout => {
            client.session().logout();
            println!("Signed out.");
        }

        Commands::Whoami => match client.session().current() {
            Some(session) => {
                println!("{} <{}>", session.identity.display_name, session.identity.email)
            }
            None => println!("Not signed in."),
        },

        Commands::Dashboard => {
            let dashboard = client.dashboard().await?;
            println!("Jobs:         {}", dashboard.stats.total_jobs);
            println!("Applications: {}", dashboard.stats.total_applications);
            for status in ApplicationStatus::ALL {
                println!("  {:<12} {}", status.label(), dashboard.stats.count(status));
            }
            println!();
            println!("Recent applications:");
            print_applications(&dashboard.recent, &client.config().api_base_url);
        }

        Commands::Jobs { command } => run_jobs(client, command).await?,

        Commands::Applications {
            search,
            job,
            status,
        } => {
            let updater = client.applications();
            let list = updater.list();
            if let Some(text) = search {
                if job.is_some() || status.is_some() {
                    eprintln!("note: filters are ignored while searching");
                }
                list.set_free_text(text);
            } else if job.is_some() || status.is_some() {
                list.set_job_filter(job);
                list.set_status_filter(status);
            } else {
                list.refresh();
            }
            let view = list.settled().await;
            ensure_loaded(&view)?;
            print_applications(&view.items, &client.config().api_base_url);
        }

        Commands::Status { id, status } => {
            let updater = client.applications();
            ensure_loaded(&updater.list().load().await)?;
            let pending = updater.update_status(id, status)?;
            let saved = pending.wait().await?;
            println!(
                "{} ({}) is now {}",
                saved.candidate_name,
                id.describe(),
                saved.status.label()
            );
        }

        Commands::ViewJob { id } => {
            let form = client.application_form(id).await?;
            print_job(form.job());
            println!();
            println!("Apply with: ats apply {id} --name <NAME> --email <EMAIL> [--resume <FILE>]");
        }

        Commands::Apply {
            job,
            name,
            email,
            resume,
        } => {
            let mut form = client.application_form(job).await?;
            form.set_name(name);
            form.set_email(email);
            if let Some(path) = resume {
                let file = CandidateFile::inspect(&path)
                    .await
                    .with_context(|| format!("cannot read {}", path.display()))?;
                form.select_resume(&file)?;
            }
            let application = form.submit().await?;
            println!(
                "Application #{} for {} received.",
                application.id,
                form.job().title
            );
        }
    }
    Ok(())
}

async fn run_jobs(client: &AtsClient, command: JobCommands) -> Result<()> {
    let board = client.job_board();
    match command {
        JobCommands::List => {
            let view = board.load().await;
            ensure_loaded(&view)?;
            print_jobs(&view.items);
        }

        JobCommands::Show { id } => {
            let detail = client.job_detail(id).await?;
            print_job(detail.job());
            println!();
            let view = detail.applications();
            ensure_loaded(&view)?;
            print_applications(&view.items, &client.config().api_base_url);
        }

        JobCommands::Create { title, description } => {
            let mut draft = JobDraft::new(title);
            draft.description = description;
            let job = board.create_job(&draft).await?;
            println!("Created job #{} ({})", job.id, job.title);
        }

        JobCommands::Edit {
            id,
            title,
            description,
        } => {
            let mut draft = JobDraft::new(title);
            draft.description = description;
            ensure_loaded(&board.load().await)?;
            let job = board.update_job(id, &draft).await?;
            println!("Updated job #{} ({})", job.id, job.title);
        }

        JobCommands::Toggle { id } => {
            ensure_loaded(&board.load().await)?;
            let job = board.toggle_active(id).await?;
            let state = if job.active { "active" } else { "inactive" };
            println!("Job #{} is now {state}", job.id);
        }

        JobCommands::Delete { id, .. } => {
            if board.delete_job(id).await? {
                println!("Deleted {}", id.describe());
            } else {
                println!("Cancelled.");
            }
        }
    }
    Ok(())
}

fn ensure_loaded<T>(view: &ListView<T>) -> Result<()> {
    match &view.last_error {
        Some(e) if view.applied.is_none() => Err(e.clone().into()),
        _ => Ok(()),
    }
}

fn print_jobs(jobs: &[JobPosting]) {
    if jobs.is_empty() {
        println!("No jobs found.");
        return;
    }
    println!("{:<6} {:<32} {:<9} {:>6}", "ID", "TITLE", "STATE", "APPS");
    println!("{}", "-".repeat(56));
    for job in jobs {
        println!(
            "{:<6} {:<32} {:<9} {:>6}",
            job.id,
            truncate(&job.title, 30),
            if job.active { "active" } else { "inactive" },
            job.application_count
        );
    }
}

fn print_job(job: &JobPosting) {
    println!("Job #{}", job.id);
    println!("Title: {}", job.title);
    println!("State: {}", if job.active { "active" } else { "inactive" });
    if let Some(created_by) = &job.created_by {
        println!("Posted by: {created_by}");
    }
    if let Some(created_at) = job.created_at {
        println!("Posted: {}", created_at.format("%Y-%m-%d"));
    }
    println!("Applications: {}", job.application_count);
    if let Some(description) = &job.description {
        println!();
        println!("{description}");
    }
}

fn print_applications(applications: &[Application], api_base_url: &str) {
    if applications.is_empty() {
        println!("No applications found.");
        return;
    }
    println!(
        "{:<6} {:<24} {:<28} {:<24} {:<12}",
        "ID", "CANDIDATE", "EMAIL", "JOB", "STATUS"
    );
    println!("{}", "-".repeat(98));
    for application in applications {
        println!(
            "{:<6} {:<24} {:<28} {:<24} {:<12}",
            application.id,
            truncate(&application.candidate_name, 22),
            truncate(&application.candidate_email, 26),
            truncate(&application.job_title, 22),
            application.status.label()
        );
        if let Some(resume) = application.resume() {
            println!(
                "       resume: {} {}",
                resume.display_name(),
                resume.absolute_url(api_base_url)
            );
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
