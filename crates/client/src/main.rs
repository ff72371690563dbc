use anyhow::Context;
use serde::Serialize;

use hospital_rbac_auth::{View, accessible_views};
use hospital_rbac_client::{AppContext, Route, SessionPhase};

#[derive(Debug, Serialize)]
struct Status {
    phase: SessionPhase,
    username: Option<String>,
    role: Option<String>,
    route: Route,
    views: Vec<View>,
}

fn status(ctx: &AppContext) -> Status {
    let session = ctx.snapshot();
    let views = session
        .role()
        .filter(|_| session.is_authenticated())
        .map(accessible_views)
        .unwrap_or_default();

    Status {
        phase: session.phase(),
        username: session.user.as_ref().map(|u| u.username.clone()),
        role: session.role().map(|r| r.to_string()),
        route: ctx.navigator().current(),
        views,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    hospital_rbac_observability::init();

    let command = std::env::args().nth(1).unwrap_or_else(|| "status".to_string());
    let ctx = AppContext::from_env().context("invalid client configuration")?;
    let session = ctx.session();

    let phase = session.bootstrap().await;
    tracing::info!(?phase, "bootstrap finished");

    match command.as_str() {
        "status" => {}
        "login" => {
            let username = std::env::var("HOSPITAL_USERNAME").context("HOSPITAL_USERNAME not set")?;
            let password = std::env::var("HOSPITAL_PASSWORD").context("HOSPITAL_PASSWORD not set")?;
            let user = session
                .login(&username, &password)
                .await
                .context("login failed")?;
            tracing::info!(username = %user.username, role = %user.role_name, "signed in");
        }
        "logout" => session.logout().await,
        other => anyhow::bail!("unknown command `{other}` (expected status, login or logout)"),
    }

    println!("{}", serde_json::to_string_pretty(&status(&ctx))?);
    Ok(())
}
