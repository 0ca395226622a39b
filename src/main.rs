use std::io::Write;

use anyhow::Context;
use clap::Parser;
use olm_addon::{
    agent::OlmAgent,
    assets::DirAssetStore,
    cluster::{ClusterDescriptor, ManagedCluster},
    config::Opts,
    values::FileConfigSource,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn inner_main() -> anyhow::Result<()> {
    let opts = Opts::parse();

    let cluster_file = std::fs::read_to_string(&opts.cluster).with_context(|| {
        format!(
            "failed to read cluster file at {}",
            opts.cluster.to_string_lossy()
        )
    })?;
    let cluster: ManagedCluster =
        serde_yaml::from_str(&cluster_file).context("cluster file is not a ManagedCluster")?;
    let cluster = ClusterDescriptor::from(&cluster);

    let agent = OlmAgent::new(
        opts.addon_name.as_str(),
        DirAssetStore::new(&opts.assets),
        FileConfigSource::new(opts.config.clone()),
    );
    info!(addon = %agent.addon_name(), cluster = %cluster.name, "rendering");

    let objects = agent.manifests(&cluster)?;
    let mut stdout = std::io::stdout().lock();
    for object in &objects {
        write!(stdout, "---\n{}", object.to_yaml()?)?;
    }
    stdout.flush()?;
    info!(count = objects.len(), "rendered manifests");
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = inner_main() {
        eprintln!("{:?}", e);
        std::process::exit(1);
    }
}
