use item_manager::app::{App, AppContext, Page};
use item_manager::config::Config;
use item_manager::views::ListState;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "item_manager=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    tracing::info!("Starting item-manager...");
    let ctx = AppContext::from_config(&config).await?;

    let mut app = App::new(ctx);
    app.navigate("/view-items");

    let Page::ViewItems(view) = app.page_mut() else {
        anyhow::bail!("item list did not mount");
    };
    match view.settled().await {
        ListState::Populated(items) => {
            tracing::info!("{} items in inventory", items.len());
            for item in &items {
                tracing::info!(id = %item.id, item_type = %item.item_type, "{}", item.name);
            }
        }
        ListState::Error(message) => {
            anyhow::bail!("Failed to load items: {}", message);
        }
        state => {
            if let Some(message) = state.empty_message() {
                tracing::info!("{}", message);
            }
        }
    }

    Ok(())
}
