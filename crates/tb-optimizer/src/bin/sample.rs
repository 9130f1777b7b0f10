use anyhow::Context;
use tb_optimizer::{InstanceCreator, InstanceFactory, ParameterSpace, RandomTrial};
use tb_types::KwArgs;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: tb-sample <schema.json> [seed] [count]";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let path = args.next().context(USAGE)?;

    let seed = match args.next() {
        Some(raw) => Some(raw),
        None => std::env::var("TUNEBRIDGE_SEED").ok(),
    };
    let seed = seed
        .map(|raw| raw.parse::<u64>().with_context(|| format!("invalid seed: {raw}")))
        .transpose()?;

    let count = match args.next() {
        Some(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("invalid count: {raw}"))?,
        None => 1,
    };

    let space = ParameterSpace::from_json_file(&path)?;
    let creator = InstanceCreator::<KwArgs>::new(space)?;
    tracing::info!(
        parameters = creator.space().len(),
        count,
        seed = ?seed,
        "sampling parameter space from {path}"
    );

    for number in 0..count {
        let mut trial = match seed {
            Some(seed) => RandomTrial::seeded(number, seed.wrapping_add(number as u64)),
            None => RandomTrial::new(number),
        };
        let kwargs = creator.create(&mut trial)?;
        tracing::debug!(trial = number, params = kwargs.len(), "sampled trial");
        println!("{}", serde_json::to_string(&trial.into_record())?);
    }

    Ok(())
}
