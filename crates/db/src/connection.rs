use agrimarket_config::Settings;
use mongodb::{Client, Database, options::ClientOptions};
use tracing::info;

pub async fn connect(settings: &Settings) -> Result<Database, mongodb::error::Error> {
    let mut client_options = ClientOptions::parse(&settings.database.url).await?;
    client_options.app_name = Some("agrimarket-api".to_string());
    client_options.max_pool_size = settings.database.max_pool_size;
    client_options.min_pool_size = settings.database.min_pool_size;

    let client = Client::with_options(client_options)?;
    let db = client.database(&settings.database.name);
    ping(&db).await?;

    info!(db = %settings.database.name, "Connected to MongoDB");
    Ok(db)
}

/// Round trip to the server backing `db`.
pub async fn ping(db: &Database) -> Result<(), mongodb::error::Error> {
    db.run_command(bson::doc! { "ping": 1 }).await.map(|_| ())
}
