use std::time::Duration;

use mongodb::{Client, Database, bson::doc, options::ClientOptions};

/// Connects to the template catalog database and checks it answers.
pub async fn setup_mongo(uri: &str, database: &str) -> Result<Database, mongodb::error::Error> {
    let mut options = ClientOptions::parse(uri).await?;
    options.app_name = Some("mockup-server".to_string());
    options.max_pool_size = Some(20);
    options.connect_timeout = Some(Duration::from_secs(5));
    options.server_selection_timeout = Some(Duration::from_secs(5));

    let client = Client::with_options(options)?;
    let db = client.database(database);
    db.run_command(doc! { "ping": 1 }).await?;
    log::info!("Connected to MongoDB database: {}", database);

    Ok(db)
}
