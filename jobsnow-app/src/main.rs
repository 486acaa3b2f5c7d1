use anyhow::{anyhow, bail, Context};
use clap::{Args as ClapArgs, Parser, Subcommand};
use jobsnow_app::auth::{RegisterData, GOOGLE_PROVIDER};
use jobsnow_app::config::AppConfig;
use jobsnow_app::database::seed::{seed_demo_data, DEMO_PASSWORD};
use jobsnow_app::listings::{
    format_salary, job_type_label, sector_label, CompaniesView, DisplayState, EnumFilter,
    JobsView, COMPANIES_SECTION, JOBS_SECTION,
};
use jobsnow_app::notifications::{Notifier, Toast, ToastKind, NOTIFICATIONS_SECTION};
use jobsnow_app::onboarding::{
    CandidateFlow, CompanyFlow, OnboardingFlow, ProfileDraft, Wizard, ONBOARDING_SECTION,
};
use jobsnow_app::routes::{
    complete_profile_guard, dashboard_guard, CompleteProfileAccess, DashboardAccess,
};
use jobsnow_app::settings::{CandidateSettings, CompanySettings, ProfileForm, SettingsForm};
use jobsnow_app::AppContext;
use shared_types::{AuthUser, Language, UserKind};
use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;

const DASHBOARD_SECTION: &str = "dashboard";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long)]
    log_file_path: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show or change the display language (pt, en, ja)
    Lang { language: Option<String> },
    #[command(subcommand)]
    Auth(AuthCommand),
    /// List open jobs
    Jobs {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long, default_value = "all")]
        job_type: String,
        #[arg(long, default_value = "all")]
        sector: String,
    },
    /// List companies
    Companies {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value = "all")]
        sector: String,
    },
    /// Complete the signed-in account's profile
    Onboard(FieldArgs),
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Check where the signed-in account lands
    Dashboard,
    #[command(subcommand)]
    Dev(DevCommand),
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
        #[arg(long, value_parser = parse_user_kind)]
        kind: UserKind,
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        company_name: Option<String>,
        #[arg(long)]
        responsible_name: Option<String>,
    },
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Print the provider sign-in URL
    Oauth {
        #[arg(long, value_parser = parse_user_kind)]
        kind: UserKind,
        #[arg(long, default_value = GOOGLE_PROVIDER)]
        provider: String,
    },
    Logout,
    ResetPassword {
        #[arg(long)]
        email: String,
    },
    UpdatePassword {
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
    Whoami,
}

#[derive(Subcommand, Debug)]
enum ProfileCommand {
    Show,
    Update(FieldArgs),
}

#[derive(Subcommand, Debug)]
enum DevCommand {
    /// Insert demo companies and jobs into the local database
    Seed,
}

#[derive(ClapArgs, Debug)]
struct FieldArgs {
    /// Field assignment, e.g. --set full_name="Maria Souza"
    #[arg(long = "set", value_parser = parse_assignment)]
    fields: Vec<(String, String)>,
}

fn parse_user_kind(value: &str) -> Result<UserKind, String> {
    value.parse().map_err(|e: shared_types::ParseEnumError| e.to_string())
}

fn parse_assignment(value: &str) -> Result<(String, String), String> {
    value
        .split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{}'", value))
}

/// Holds toasts until the command finishes, then they are printed in the
/// current language.
#[derive(Default)]
struct ConsoleNotifier {
    pending: Mutex<Vec<Toast>>,
}

impl ConsoleNotifier {
    fn flush(&self, context: &AppContext) {
        let toasts: Vec<Toast> = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        for toast in toasts {
            let (title, description) = toast.render(&context.translations);
            match toast.kind {
                ToastKind::Success => println!("✔ {}: {}", title, description),
                ToastKind::Destructive => eprintln!("✘ {}: {}", title, description),
            }
        }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, toast: Toast) {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(toast);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if let Some(log_path) = args.log_file_path {
        let log_path = std::path::Path::new(&log_path);
        let file_appender = tracing_appender::rolling::never(
            log_path.parent().unwrap_or(std::path::Path::new(".")),
            log_path
                .file_name()
                .unwrap_or(std::ffi::OsStr::new("jobsnow.log")),
        );
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        std::mem::forget(guard);

        tracing_subscriber::registry()
            .with(env_filter.clone())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let (config, config_path) = AppConfig::load().context("Failed to load config")?;
    tracing::debug!("Config loaded from {}", config_path.display());

    let notifier = Arc::new(ConsoleNotifier::default());
    let context = AppContext::build(config, notifier.clone())?;
    context.initialize().await;
    context
        .translations
        .request_section(NOTIFICATIONS_SECTION)
        .await;

    let result = run(args.command, &context).await;
    notifier.flush(&context);
    result
}

async fn run(command: Command, context: &AppContext) -> anyhow::Result<()> {
    match command {
        Command::Lang { language } => change_language(context, language).await,
        Command::Auth(command) => run_auth(command, context).await,
        Command::Jobs {
            search,
            location,
            job_type,
            sector,
        } => {
            let mut view = JobsView::new(context.data.clone(), context.translations.clone());
            view.filter.search = search;
            view.filter.location = location;
            view.filter.job_type = EnumFilter::parse(&job_type)?;
            view.filter.sector = EnumFilter::parse(&sector)?;
            view.load().await;
            print_jobs(context, &view);
            Ok(())
        }
        Command::Companies { search, sector } => {
            let mut view = CompaniesView::new(context.data.clone(), context.translations.clone());
            view.filter.search = search;
            view.filter.sector = EnumFilter::parse(&sector)?;
            view.load().await;
            print_companies(context, &view);
            Ok(())
        }
        Command::Onboard(args) => onboard(context, args.fields).await,
        Command::Profile(ProfileCommand::Show) => {
            let user = signed_in(context)?;
            match account_kind(context, &user).await? {
                UserKind::Candidate => show_profile::<CandidateSettings>(context, &user).await,
                UserKind::Company => show_profile::<CompanySettings>(context, &user).await,
            }
            Ok(())
        }
        Command::Profile(ProfileCommand::Update(args)) => {
            let user = signed_in(context)?;
            match account_kind(context, &user).await? {
                UserKind::Candidate => {
                    update_profile::<CandidateSettings>(context, &user, args.fields).await
                }
                UserKind::Company => {
                    update_profile::<CompanySettings>(context, &user, args.fields).await
                }
            }
        }
        Command::Dashboard => {
            let session = context.session.session();
            match dashboard_guard(context.data.as_ref(), session.as_ref()).await {
                DashboardAccess::Redirect(route) => println!("→ {}", route),
                DashboardAccess::Allow(kind) => {
                    let t = &context.translations;
                    t.request_section(DASHBOARD_SECTION).await;
                    let subtitle = match kind {
                        UserKind::Candidate => "welcome.candidateSubtitle",
                        UserKind::Company => "welcome.companySubtitle",
                    };
                    let email = session
                        .as_ref()
                        .and_then(|session| session.user.email.clone())
                        .unwrap_or_default();
                    println!("{}", t.t(DASHBOARD_SECTION, "welcome.title"));
                    println!("{}", t.t(DASHBOARD_SECTION, subtitle));
                    println!("{} ({})", email, kind);
                }
            }
            Ok(())
        }
        Command::Dev(DevCommand::Seed) => {
            let conn = context
                .local_db
                .clone()
                .ok_or_else(|| anyhow!("dev seed needs the local backend"))?;
            let summary = seed_demo_data(conn).await?;
            println!(
                "{} companies, {} jobs created ({} already present). Password: {}",
                summary.companies, summary.jobs, summary.skipped, DEMO_PASSWORD
            );
            Ok(())
        }
    }
}

async fn change_language(context: &AppContext, language: Option<String>) -> anyhow::Result<()> {
    if let Some(language) = language {
        let language: Language = language.parse()?;
        context.translations.change_language(language).await;
        context
            .translations
            .request_section(NOTIFICATIONS_SECTION)
            .await;
    }
    println!("{}", context.translations.language());
    Ok(())
}

async fn run_auth(command: AuthCommand, context: &AppContext) -> anyhow::Result<()> {
    let session = &context.session;
    match command {
        AuthCommand::Register {
            email,
            password,
            confirm_password,
            kind,
            full_name,
            company_name,
            responsible_name,
        } => {
            let data = RegisterData {
                email,
                password,
                confirm_password,
                user_kind: Some(kind),
                full_name,
                company_name,
                responsible_name,
            };
            if session.register(data).await?.is_none() {
                println!("Check your inbox to confirm the address before signing in.");
            }
        }
        AuthCommand::Login { email, password } => {
            session.login(&email, &password).await?;
        }
        AuthCommand::Oauth { kind, provider } => {
            println!("{}", session.login_with_oauth_provider(&provider, kind)?);
        }
        AuthCommand::Logout => session.logout().await?,
        AuthCommand::ResetPassword { email } => session.reset_password(&email).await?,
        AuthCommand::UpdatePassword {
            password,
            confirm_password,
        } => session.update_password(&password, &confirm_password).await?,
        AuthCommand::Whoami => match session.user() {
            Some(user) => println!(
                "{} {}",
                user.id,
                user.email.as_deref().unwrap_or_default()
            ),
            None => println!("not signed in"),
        },
    }
    Ok(())
}

fn signed_in(context: &AppContext) -> anyhow::Result<AuthUser> {
    context
        .session
        .user()
        .ok_or_else(|| anyhow!("not signed in, run `jobsnow auth login` first"))
}

async fn account_kind(context: &AppContext, user: &AuthUser) -> anyhow::Result<UserKind> {
    match context.data.fetch_account(user.id).await {
        Ok(account) => Ok(account.user_kind),
        Err(e) if e.is_no_rows() => user
            .user_kind()
            .ok_or_else(|| anyhow!("account {} has no kind", user.id)),
        Err(e) => Err(e.into()),
    }
}

fn print_jobs(context: &AppContext, view: &JobsView) {
    let t = &context.translations;
    match view.display_state() {
        DisplayState::Loading => println!("{}", t.t(JOBS_SECTION, "loading")),
        DisplayState::Empty => println!("{}", t.t(JOBS_SECTION, "noJobsFound")),
        DisplayState::Results(count) => {
            println!("{} {}", count, t.t(JOBS_SECTION, "jobsFound"));
            for listing in view.visible() {
                let job = &listing.job;
                println!();
                println!("{}", job.title);
                println!(
                    "  {} · {} · {}",
                    listing.company_name().unwrap_or("-"),
                    job.location,
                    job_type_label(job.job_type, t)
                );
                if let Some(sector) = job.sector {
                    println!("  {}", sector_label(sector, t));
                }
                if let Some(salary) = format_salary(job.salary_min, job.salary_max, t) {
                    println!("  {}", salary);
                }
            }
        }
    }
}

fn print_companies(context: &AppContext, view: &CompaniesView) {
    let t = &context.translations;
    match view.display_state() {
        DisplayState::Loading => println!("{}", t.t(COMPANIES_SECTION, "loading")),
        DisplayState::Empty => println!("{}", t.t(COMPANIES_SECTION, "noCompaniesFound")),
        DisplayState::Results(count) => {
            println!("{} {}", count, t.t(COMPANIES_SECTION, "companiesFound"));
            for listing in view.visible() {
                let company = &listing.company;
                println!();
                println!("{}", company.company_name.as_deref().unwrap_or_default());
                if let Some(sector) = company.sector {
                    println!("  {}", sector_label(sector, t));
                }
                println!(
                    "  {} {}",
                    listing.active_job_count(),
                    t.t(COMPANIES_SECTION, "openJobs")
                );
            }
        }
    }
}

async fn onboard(context: &AppContext, fields: Vec<(String, String)>) -> anyhow::Result<()> {
    let session = context.session.session();
    let kind = match complete_profile_guard(context.data.as_ref(), session.as_ref()).await {
        CompleteProfileAccess::Redirect(route) => {
            println!("→ {}", route);
            return Ok(());
        }
        CompleteProfileAccess::Onboard(Some(kind)) => kind,
        CompleteProfileAccess::Onboard(None) => bail!("account kind is unknown"),
    };
    context
        .translations
        .request_section(ONBOARDING_SECTION)
        .await;

    match kind {
        UserKind::Candidate => run_wizard(context, CandidateFlow, &fields).await,
        UserKind::Company => run_wizard(context, CompanyFlow, &fields).await,
    }
}

async fn run_wizard<F: OnboardingFlow>(
    context: &AppContext,
    flow: F,
    fields: &[(String, String)],
) -> anyhow::Result<()> {
    let t = &context.translations;
    let mut wizard = Wizard::new(flow, context.data.clone(), context.notifier.clone());
    for (name, value) in fields {
        wizard.set_field(name, value)?;
    }

    loop {
        println!(
            "[{}/{}] {}",
            wizard.current_step(),
            wizard.total_steps(),
            t.t(ONBOARDING_SECTION, wizard.step().title_key)
        );
        if wizard.is_last_step() {
            break;
        }
        if let Err(e) = wizard.next() {
            let missing = wizard
                .step()
                .fields
                .iter()
                .filter(|field| field.required)
                .filter(|field| wizard.draft().field_value(field.name).is_none());
            for field in missing {
                eprintln!(
                    "  --set {}=... ({})",
                    field.name,
                    t.t(ONBOARDING_SECTION, field.label_key)
                );
            }
            return Err(e.into());
        }
    }

    let user = context.session.user();
    let route = wizard.finish(user.as_ref()).await?;
    println!("→ {}", route);
    Ok(())
}

async fn show_profile<F: ProfileForm>(context: &AppContext, user: &AuthUser) {
    let mut form = SettingsForm::<F>::new(user.id, context.data.clone(), context.notifier.clone());
    form.load().await;
    for name in F::FIELDS {
        println!(
            "{:<18} {}",
            name,
            form.fields.field_value(name).unwrap_or_default()
        );
    }
}

async fn update_profile<F: ProfileForm>(
    context: &AppContext,
    user: &AuthUser,
    fields: Vec<(String, String)>,
) -> anyhow::Result<()> {
    let mut form = SettingsForm::<F>::new(user.id, context.data.clone(), context.notifier.clone());
    form.load().await;
    for (name, value) in &fields {
        form.set_field(name, value)?;
    }
    form.submit().await?;
    Ok(())
}
