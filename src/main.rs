// classroom-scanner CLI.
// The only place that turns an error into a process exit.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use classroom_scanner::config::{Cli, Command};
use classroom_scanner::queries::{self, CheckStatus};
use classroom_scanner::{GitHubClient, OrgCache, RecordExt, Result};

#[tokio::main]
async fn main() -> ExitCode {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("classroom_scanner=info"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("\nError: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let client =
        GitHubClient::new(&cli.token, cli.timeout())?.with_max_concurrency(cli.max_concurrency);

    match &cli.command {
        Command::RateLimit => {
            let limit = client.get_rate_limit().await?;
            println!("Core remaining / limit: {} / {}", limit.remaining, limit.limit);
            println!("Core reset time (local timezone): {}", limit.reset_local());
            return Ok(());
        }
        Command::OrgTeams => {
            for team in client.get_org_teams(cli.require_org()?).await? {
                println!(
                    "{}\t{}",
                    team.str_field("slug").unwrap_or("?"),
                    team.name().unwrap_or("")
                );
            }
            return Ok(());
        }
        Command::TeamMembers { slug } => {
            for member in client.get_team_members(cli.require_org()?, slug).await? {
                println!("{}", member.login().unwrap_or("?"));
            }
            return Ok(());
        }
        Command::Events { repos } => {
            let org = cli.require_org()?;
            for name in repos {
                let full_name = format!("{}/{}", org, name);
                println!("{}:", full_name);
                for commit in queries::get_push_events(&client, &full_name).await? {
                    println!(
                        "  {} {} {} {}",
                        commit.pushed_at.with_timezone(&chrono::Local),
                        commit.login,
                        commit.sha,
                        commit.message
                    );
                }
            }
            return Ok(());
        }
        Command::Repos | Command::Teams | Command::Status | Command::Timeline { .. } => {}
    }

    let org = cli.require_org()?;
    let mut cache = OrgCache::new(cli.cache_dir()).with_fetch_mode(cli.fetch_mode());
    let all = cache.get_org_repos(&client, org).await?;
    let mut repos = queries::gradable_repos(&all, &cli.prefix, &cli.ignore);
    repos.sort_by_key(|repo| repo.full_name().unwrap_or("").to_lowercase());
    println!("{} matching repos found for {}/{}", repos.len(), org, cli.prefix);

    match &cli.command {
        Command::Repos => {
            for (id, group) in queries::group_by_student(&cli.prefix, &repos) {
                if let [repo] = group.as_slice() {
                    println!("- [{}]({})", id, repo.final_url().unwrap_or(""));
                } else {
                    println!("- **Multiple repos for {}**", id);
                    for repo in &group {
                        println!(
                            "  - [{}]({})",
                            repo.name().unwrap_or(""),
                            repo.final_url().unwrap_or("")
                        );
                    }
                }
            }
        }
        Command::Teams => {
            let memberships = queries::get_team_memberships(&client, &repos).await?;
            for repo in &repos {
                let Some(full_name) = repo.full_name() else { continue };
                let members = memberships
                    .get(full_name)
                    .map(|m| m.iter().cloned().collect::<Vec<_>>().join(", "))
                    .unwrap_or_default();
                println!("{}: {}", full_name, members);
            }
        }
        Command::Status => {
            let statuses = queries::get_check_statuses(&client, &repos).await?;
            for (full_name, status) in &statuses {
                match status {
                    CheckStatus::Completed {
                        conclusion,
                        head_sha,
                        created_at,
                    } => {
                        let when = created_at
                            .as_ref()
                            .map(|dt| dt.with_timezone(&chrono::Local).to_string())
                            .unwrap_or_default();
                        println!("{}: {} ({}, {})", full_name, conclusion, when, head_sha);
                    }
                    CheckStatus::Missing => println!("MISSING CHECKS: {}", full_name),
                }
            }
            println!("Total repos scanned: {}", statuses.len());
            for (bucket, count) in queries::count_conclusions(statuses.values()) {
                println!("{}: {:4}", bucket, count);
            }
        }
        Command::Timeline { branch } => {
            let statuses =
                queries::get_branch_check_statuses(&client, &repos, Some(branch.as_str())).await?;
            let timeline = queries::completion_timeline(&statuses);
            for point in &timeline {
                println!(
                    "{}\t{}\t{}\t{}",
                    point.at.with_timezone(&chrono::Local),
                    point.passing,
                    point.conclusion,
                    point.repo
                );
            }
            println!("{} results, {} repos scanned", timeline.len(), statuses.len());
        }
        Command::RateLimit
        | Command::OrgTeams
        | Command::TeamMembers { .. }
        | Command::Events { .. } => {}
    }

    Ok(())
}
