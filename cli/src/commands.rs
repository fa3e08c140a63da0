//! Command execution. Every command prints one JSON document on stdout.

use std::io::BufRead;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use serde_json::json;
use solguard_core::Access;
use solguard_core::DashboardClient;
use solguard_core::RefreshOutcome;
use solguard_core::audit::VIEW_AUDIT_LOGS;
use solguard_core::models::AuditLogQuery;
use solguard_core::models::NewProject;
use solguard_core::models::ProjectUpdate;

use crate::cli::AiCommand;
use crate::cli::AnalysisCommand;
use crate::cli::AuditArgs;
use crate::cli::Command;
use crate::cli::ProjectsCommand;
use crate::cli::RolesCommand;

const PASSWORD_ENV: &str = "SOLGUARD_PASSWORD";

pub async fn run(client: &DashboardClient, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Login(args) => {
            let password = read_password()?;
            let user = client.auth().login(&args.email, &password).await?;
            print_json(&user)
        }
        Command::Register(args) => {
            let password = read_password()?;
            let user = client
                .auth()
                .register(&args.email, &password, &args.name)
                .await?;
            print_json(&user)
        }
        Command::Logout => {
            client.logout().await;
            print_json(&json!({"logged_out": true}))
        }
        Command::Whoami => print_json(&client.auth().me().await?),
        Command::Projects(command) => projects(client, command).await,
        Command::Analysis(command) => analysis(client, command).await,
        Command::Ai(command) => ai(client, command).await,
        Command::Roles(command) => roles(client, command).await,
        Command::AuditLogs(args) => audit_logs(client, args).await,
        Command::Can(args) => {
            refresh_permissions(client).await?;
            let access = match client.gate().guard(Some(&args.permission)) {
                Access::Granted => "granted",
                Access::RedirectToLogin => "login_required",
                Access::Denied { .. } => "denied",
            };
            print_json(&json!({
                "permission": args.permission,
                "access": access,
                "roles": client.permissions().roles(),
            }))
        }
    }
}

async fn projects(client: &DashboardClient, command: ProjectsCommand) -> anyhow::Result<()> {
    let api = client.projects();
    match command {
        ProjectsCommand::List => print_json(&api.list().await?),
        ProjectsCommand::Show { id } => print_json(&api.get(&id).await?),
        ProjectsCommand::Create { name, description } => {
            print_json(&api.create(&NewProject { name, description }).await?)
        }
        ProjectsCommand::Update {
            id,
            name,
            description,
        } => print_json(&api.update(&id, &ProjectUpdate { name, description }).await?),
        ProjectsCommand::Delete { id } => {
            api.delete(&id).await?;
            print_json(&json!({"deleted": id}))
        }
    }
}

async fn analysis(client: &DashboardClient, command: AnalysisCommand) -> anyhow::Result<()> {
    let api = client.analysis();
    match command {
        AnalysisCommand::Run {
            project_id,
            file_path,
        } => print_json(&api.run(&project_id, &file_path).await?),
        AnalysisCommand::Show { id } => print_json(&api.get(&id).await?),
        AnalysisCommand::History { project_id } => print_json(&api.history(&project_id).await?),
    }
}

async fn ai(client: &DashboardClient, command: AiCommand) -> anyhow::Result<()> {
    let api = client.ai();
    match command {
        AiCommand::Analyze(args) => {
            let code = read_source(&args.file)?;
            print_json(&api.analyze(&code, &args.project_id).await?)
        }
        AiCommand::Suggest(args) => {
            let code = read_source(&args.file)?;
            print_json(&api.suggest(&code, &args.project_id).await?)
        }
        AiCommand::Generate {
            project_id,
            requirements,
        } => print_json(&api.generate(&requirements, &project_id).await?),
        AiCommand::Vulnerability {
            project_id,
            vulnerability_id,
        } => print_json(
            &api.analyze_vulnerability(&vulnerability_id, &project_id)
                .await?,
        ),
        AiCommand::Patterns { project_id } => print_json(&api.patterns(&project_id).await?),
        AiCommand::ModelConfigs { project_id } => {
            print_json(&api.model_configs(&project_id).await?)
        }
    }
}

async fn roles(client: &DashboardClient, command: RolesCommand) -> anyhow::Result<()> {
    let api = client.roles();
    match command {
        RolesCommand::Mine => print_json(&api.mine().await?),
        RolesCommand::All => print_json(&api.list_all().await?),
        RolesCommand::Assign { user_id, role_id } => {
            print_json(&api.assign(user_id, role_id).await?)
        }
        RolesCommand::Remove { user_id, role_id } => {
            api.remove(user_id, role_id).await?;
            print_json(&json!({"user_id": user_id, "removed_role_id": role_id}))
        }
    }
}

async fn audit_logs(client: &DashboardClient, args: AuditArgs) -> anyhow::Result<()> {
    refresh_permissions(client).await?;
    client.gate().require(VIEW_AUDIT_LOGS)?;

    let query = AuditLogQuery {
        page: args.page,
        limit: args.limit,
        entity_type: args.entity_type,
        entity_id: args.entity_id,
        user_id: args.user_id,
    };
    print_json(&client.audit().list(&query).await?)
}

async fn refresh_permissions(client: &DashboardClient) -> anyhow::Result<()> {
    if !client.session().is_authenticated() {
        return Ok(());
    }
    if let RefreshOutcome::Partial { failures } = client.permissions().refresh().await? {
        for failure in failures {
            tracing::warn!(
                role = %failure.role_name,
                "permissions of role unavailable: {}",
                failure.error
            );
        }
    }
    Ok(())
}

fn read_password() -> anyhow::Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn read_source(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut code = String::new();
        std::io::stdin()
            .read_to_string(&mut code)
            .context("failed to read source from stdin")?;
        return Ok(code);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

#[allow(clippy::print_stdout)]
fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
