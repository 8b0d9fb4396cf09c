use async_trait::async_trait;
use rfs_facade::{remote::SftpFs, Facade, RemoteConfig};
use russh::*;
use russh_keys::*;
use std::sync::Arc;

struct Client;

#[async_trait]
impl client::Handler for Client {
    type Error = anyhow::Error;

    async fn check_server_key(
        self,
        server_public_key: &key::PublicKey,
    ) -> Result<(Self, bool), Self::Error> {
        println!("check_server_key: {:?}", server_public_key);
        Ok((self, true))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let remote = RemoteConfig::from_env()?;
    let password = std::env::var("RFS_PASSWORD").unwrap_or_default();

    let config = russh::client::Config::default();
    let mut session = russh::client::connect(Arc::new(config), remote.address(), Client).await?;
    if !session
        .authenticate_password(remote.user.as_str(), password)
        .await?
    {
        anyhow::bail!("authentication failed for {}", remote.user);
    }

    let mut channel = session.channel_open_session().await?;
    channel.request_subsystem(true, "sftp").await?;
    let fs = Facade::new(Arc::new(SftpFs::new(channel.into_stream()).await?));

    let dir = "./rfs_demo";
    println!("mkdir: {}", fs.mkdir(dir).await.is_success());
    println!("put: {:?}", fs.put("src/", dir).await.into_value());
    println!("ls: {:?}", fs.ls(dir).await.into_value());
    println!("heads: {:?}", fs.get_head(dir).await);
    println!("free: {}", fs.df(Some("G")).await?);
    println!("usage: {}", fs.disk_usage(dir, Some("K")).await?);
    println!("delete: {}", fs.delete(dir, true).await.is_success());

    Ok(())
}
