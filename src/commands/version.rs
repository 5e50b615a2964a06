use crate::api::PveClient;
use crate::config::Connection;
use crate::error::PmxError;

pub async fn run(conn: &Connection) -> Result<(), PmxError> {
    let client = PveClient::connect(conn).await?;
    let version = client.version().await?;
    println!("{}", version.release);
    Ok(())
}
