//src/main.rs

use anyhow::Context;
use chrono::Utc;
use tracing_subscriber::EnvFilter;

use farm_dashboard::{
    config::{AppState, Settings},
    middleware::guard::Gate,
    services::{session_cache::cleanup_expired_sessions, shell::DashboardShell},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let settings = Settings::from_env()?;
    let app_state = AppState::new(settings)
        .await
        .context("Falha ao inicializar o estado da aplicação.")?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados.")?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let removed = cleanup_expired_sessions(&app_state.store, Utc::now());
    if removed > 0 {
        tracing::info!("🧹 {} sessões locais expiradas removidas", removed);
    }

    let shell = DashboardShell::from_state(&app_state);
    let mut auth = shell.auth();
    let mut account = shell.account();
    let mut data = shell.data();

    let mut last_gate = None;
    loop {
        auth.borrow_and_update();
        account.borrow_and_update();
        let gate = shell.gate();
        if last_gate != Some(gate) {
            match gate {
                Gate::Loading => tracing::info!("⏳ Carregando sessão..."),
                Gate::Login => tracing::info!("🔒 Sem sessão: faça login"),
                Gate::TenantLoading => tracing::info!("⏳ Resolvendo conta..."),
                Gate::Ready(account_id) => tracing::info!("🚀 Painel pronto para a conta {}", account_id),
            }
            last_gate = Some(gate);
        }

        let state = data.borrow_and_update().clone();
        if let Some(error) = &state.error {
            tracing::warn!("Painel: {}", error);
        } else if !state.loading_data && matches!(gate, Gate::Ready(_)) {
            let summary = shell.summary();
            tracing::info!(
                "📊 {} culturas, {} tarefas ({} pendentes), {} itens ({} com estoque baixo), {} funcionários",
                state.data.crops.len(),
                state.data.tasks.len(),
                summary.pending_task_count,
                state.data.inventory.len(),
                summary.low_stock_count,
                state.data.employees.len()
            );
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = auth.changed() => if changed.is_err() { break },
            changed = account.changed() => if changed.is_err() { break },
            changed = data.changed() => if changed.is_err() { break },
        }
    }

    tracing::info!("Encerrando...");
    shell.shutdown();
    Ok(())
}
