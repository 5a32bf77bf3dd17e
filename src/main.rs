use anyhow::{Context, Result};
use harness::actions::{AdminActions, AgentActions, BuildActions};
use harness::api::{ApiClientConfig, RestClient};
use harness::cli::commands::{
    parse_seconds, AgentsCommand, CleanupProjectsCommand, TriggerCommand, WaitBuildCommand,
    WaitEntityCommand, WaitLatestCommand, WaitStateCommand,
};
use harness::cli::output::*;
use harness::cli::{Cli, Command};
use harness::core::config::HarnessConfig;
use harness::core::context::{CreatedObject, RunContext};
use harness::core::models::Properties;
use harness::core::state::{format_states, BuildLifecycleState};
use harness::wait::{self, BuildWaitOptions, RetryPolicy};
use tracing::{error, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Project the server cannot delete
const ROOT_PROJECT_ID: &str = "_Root";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging; RUST_LOG wins over --verbose when set
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    let config = HarnessConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Command::CheckConfig = cli.command {
        return check_config(&config);
    }

    let client = RestClient::new(ApiClientConfig::from_harness(&config))
        .context("Failed to create REST client")?;

    let result = match &cli.command {
        Command::WaitBuild(cmd) => wait_build(&client, &config, cmd).await,
        Command::WaitState(cmd) => wait_state(&client, &config, cmd).await,
        Command::WaitLatest(cmd) => wait_latest(&client, &config, cmd).await,
        Command::WaitProject(cmd) => wait_project(&client, &config, cmd).await,
        Command::WaitUser(cmd) => wait_user(&client, &config, cmd).await,
        Command::Trigger(cmd) => trigger(&client, &config, cmd).await,
        Command::Agents(cmd) => list_agents(&client, cmd).await,
        Command::CleanupProjects(cmd) => cleanup_projects(&client, cmd).await,
        Command::CheckConfig => Ok(()),
    };

    if let Err(e) = result {
        println!("\n{} {}", CROSS, style("failed").red());
        error!("{:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn build_options(config: &HarnessConfig, timeout: Option<f64>, poll_interval: Option<f64>) -> Result<BuildWaitOptions> {
    let mut options = BuildWaitOptions::from_settings(&config.waits);
    if let Some(secs) = timeout {
        options = options.with_timeout(parse_seconds(secs).map_err(anyhow::Error::msg)?);
    }
    if let Some(secs) = poll_interval {
        options = options.with_poll_interval(parse_seconds(secs).map_err(anyhow::Error::msg)?);
    }
    Ok(options)
}

fn entity_policy(config: &HarnessConfig, cmd: &WaitEntityCommand) -> Result<RetryPolicy> {
    let mut policy = RetryPolicy::from_settings(&config.waits);
    if let Some(attempts) = cmd.attempts {
        policy.max_attempts = attempts;
    }
    if let Some(secs) = cmd.delay {
        policy.delay = parse_seconds(secs).map_err(anyhow::Error::msg)?;
    }
    Ok(policy)
}

async fn wait_build(client: &RestClient, config: &HarnessConfig, cmd: &WaitBuildCommand) -> Result<()> {
    let options = build_options(config, cmd.timeout, cmd.poll_interval)?;
    let spinner = create_spinner(format!("Waiting for build {} to finish", cmd.build_id));
    let result = wait::wait_for_build_completion(client, cmd.build_id, &options).await;
    spinner.finish_and_clear();

    let build = result.with_context(|| format!("Waiting for build {}", cmd.build_id))?;
    println!("{}", format_build(&build));
    Ok(())
}

async fn wait_state(client: &RestClient, config: &HarnessConfig, cmd: &WaitStateCommand) -> Result<()> {
    let options = build_options(config, cmd.timeout, None)?;
    let states: Vec<BuildLifecycleState> = cmd.states.iter().map(|s| (*s).into()).collect();
    let spinner = create_spinner(format!(
        "Waiting for build {} to be {}",
        cmd.build_id,
        format_states(&states)
    ));
    let result = wait::wait_for_build_state(client, cmd.build_id, &states, &options).await;
    spinner.finish_and_clear();

    let build = result.with_context(|| format!("Waiting for build {}", cmd.build_id))?;
    println!("{}", format_build(&build));
    Ok(())
}

async fn wait_latest(client: &RestClient, config: &HarnessConfig, cmd: &WaitLatestCommand) -> Result<()> {
    let options = build_options(config, cmd.timeout, None)?;
    let spinner = create_spinner(format!("Looking for the latest build of {}", cmd.build_type));
    let result = wait::get_latest_build_and_wait(client, &cmd.build_type, &options).await;
    spinner.finish_and_clear();

    let build = result.with_context(|| format!("Waiting for the latest build of {}", cmd.build_type))?;
    println!("{}", format_build(&build));
    Ok(())
}

async fn wait_project(client: &RestClient, config: &HarnessConfig, cmd: &WaitEntityCommand) -> Result<()> {
    let policy = entity_policy(config, cmd)?;
    let project = wait::wait_project_appears_with(client, &cmd.id, policy)
        .await
        .with_context(|| format!("Waiting for project {}", cmd.id))?;
    println!("{}", format_project(&project));
    Ok(())
}

async fn wait_user(client: &RestClient, config: &HarnessConfig, cmd: &WaitEntityCommand) -> Result<()> {
    let policy = entity_policy(config, cmd)?;
    let user = wait::wait_user_appears_with(client, &cmd.id, policy)
        .await
        .with_context(|| format!("Waiting for user {}", cmd.id))?;
    println!(
        "{} User {} (id {})",
        CHECK,
        style(&user.username).bold(),
        style(user.id).dim()
    );
    Ok(())
}

async fn trigger(client: &RestClient, config: &HarnessConfig, cmd: &TriggerCommand) -> Result<()> {
    let builds = BuildActions::new(client).with_wait_options(BuildWaitOptions::from_settings(&config.waits));
    // Builds triggered from the CLI are kept on the server
    let mut ctx = RunContext::new();

    let properties = (!cmd.param.is_empty()).then(|| Properties::from_pairs(cmd.param.clone()));
    for (key, value) in &cmd.param {
        println!("{} Parameter: {} = {}", INFO, style(key).cyan(), style(value).dim());
    }

    let queued = builds
        .trigger_build(&mut ctx, &cmd.build_type, properties)
        .await
        .with_context(|| format!("Triggering {}", cmd.build_type))?;
    println!(
        "{} Triggered build {} of {}",
        ROCKET,
        style(queued.id).bold(),
        style(&queued.build_type_id).cyan()
    );

    if cmd.wait {
        let spinner = create_spinner(format!("Waiting for build {} to finish", queued.id));
        let result = builds.wait_for_completion(queued.id).await;
        spinner.finish_and_clear();
        let build = result.with_context(|| format!("Waiting for build {}", queued.id))?;
        println!("{}", format_build(&build));
    }
    Ok(())
}

async fn list_agents(client: &RestClient, cmd: &AgentsCommand) -> Result<()> {
    let agents = AgentActions::new(client);
    let locator = cmd.all.then_some(harness::actions::agents::ANY_AGENT_LOCATOR);
    let list = agents.get_all_agents(locator).await.context("Listing agents")?;

    if list.is_empty() {
        println!("{} No agents found", INFO);
        return Ok(());
    }
    println!("{} {} agent(s):", INFO, list.len());
    for agent in &list {
        println!("{}", format_agent(agent));
    }
    Ok(())
}

async fn cleanup_projects(client: &RestClient, cmd: &CleanupProjectsCommand) -> Result<()> {
    let projects = AdminActions::new(client)
        .get_all_projects()
        .await
        .context("Listing projects")?;
    let mut ctx = RunContext::new();

    for project in projects.iter().filter(|p| p.id != ROOT_PROJECT_ID) {
        if cmd.dry_run {
            println!("{} Would delete {}", INFO, style(&project.id).bold());
        } else {
            ctx.register(CreatedObject::Project(project.id.clone()));
        }
    }
    println!("{} Skipping {}", INFO, ROOT_PROJECT_ID);
    if cmd.dry_run {
        return Ok(());
    }

    let report = ctx.cleanup(client).await;
    println!("{}", format_cleanup_report(&report));
    if !report.is_clean() {
        anyhow::bail!("{} project(s) could not be deleted", report.failed.len());
    }
    Ok(())
}

fn check_config(config: &HarnessConfig) -> Result<()> {
    println!("{} Server: {}", INFO, style(config.base_url()).bold());
    println!(
        "{} Entity waits: {} attempts x {:?}",
        INFO,
        config.waits.entity_attempts,
        config.waits.entity_delay()
    );
    println!(
        "{} Build waits: {:?} budget, polling every {:?}",
        INFO,
        config.waits.build_timeout(),
        config.waits.build_poll_interval()
    );
    match config.agent_name() {
        Ok(name) => println!("{} Agent: {}", INFO, name),
        Err(_) => println!("{} No agent name configured", WARN),
    }
    println!("{} Configuration is {}", CHECK, style("valid").green());
    Ok(())
}
