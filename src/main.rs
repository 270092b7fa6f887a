//src/main.rs

use tokio::{net::TcpListener, sync::broadcast};
use tracing_subscriber::EnvFilter;

use ministerio::{
    build_router,
    config::{AppState, Config},
    services::session::SessionEvent,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG manda; sem ele, "info"
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;
    let listen_addr = config.listen_addr.clone();

    // Se a configuração ou o banco falharem, a aplicação não deve iniciar.
    let app_state = AppState::new(config).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Entradas e saídas de sessão ficam no log
    let mut events = app_state.sessions.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::SignedIn { session_id, user_id }) => {
                    tracing::info!("🔑 Sessão {} aberta para o usuário {}", session_id, user_id)
                }
                Ok(SessionEvent::SignedOut { session_id, user_id }) => {
                    tracing::info!("👋 Sessão {} encerrada (usuário {})", session_id, user_id)
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("⚠️ {} eventos de sessão descartados", skipped)
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Sessões abandonadas sem logout são varridas a cada 15 minutos
    let registry = app_state.sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(15 * 60));
        loop {
            interval.tick().await;
            registry.sweep_expired().await;
        }
    });

    let app = build_router(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&listen_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
