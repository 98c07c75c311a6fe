use clap::{crate_authors, crate_description, crate_version, Parser};
use rlagent::{
    get_agent_class, Agent, Algorithm, AlgorithmKind, Config, MockAlgorithm, PolicyGradient,
    Trainable,
};
use std::error::Error;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    version = crate_version!(),
    author = crate_authors!(),
    about = crate_description!(),
)]
pub struct Options {
    #[clap(long, default_value = "PG")]
    /// Algorithm to run
    pub run: String,

    #[clap(long)]
    /// Environment name; overrides the `env` config key
    pub env: Option<String>,

    #[clap(long, default_value = "{}", parse(try_from_str = parse_config))]
    /// Agent configuration as a JSON object
    pub config: Config,

    #[clap(long, default_value = "10")]
    /// Stop after this many training iterations
    pub stop_iters: u64,

    #[clap(long)]
    /// Checkpoint directory; defaults to the agent log directory
    pub checkpoint_dir: Option<PathBuf>,

    #[clap(long, default_value = "0")]
    /// Save a checkpoint every this many iterations; 0 disables checkpointing
    pub checkpoint_freq: u64,

    #[clap(long)]
    /// Checkpoint to restore before training
    pub restore: Option<PathBuf>,
}

fn parse_config(s: &str) -> Result<Config, serde_json::Error> {
    serde_json::from_str(s)
}

fn run<A: Algorithm>(opts: &Options) -> Result<(), Box<dyn Error>> {
    let resources = Agent::<A>::default_resource_request(&opts.config)?;
    println!("Requested resources: {:?}", resources);

    let mut builder = Agent::<A>::builder().config(opts.config.clone());
    if let Some(env) = &opts.env {
        builder = builder.env(env.as_str());
    }
    let mut agent = builder.build()?;
    println!("Logging results to {}", agent.logdir().display());

    if let Some(checkpoint) = &opts.restore {
        agent.restore(checkpoint)?;
        println!(
            "Restored {} at iteration {}",
            checkpoint.display(),
            agent.iteration()
        );
    }

    while agent.iteration() < opts.stop_iters {
        let result = agent.train()?;
        println!(
            "iter {:>4}  timesteps {:>8}  reward_mean {:>8}  len_mean {:>6}",
            result.training_iteration,
            result.timesteps_total,
            result
                .episodes
                .episode_reward_mean
                .map_or_else(|| "-".to_string(), |r| format!("{:.2}", r)),
            result
                .episodes
                .episode_len_mean
                .map_or_else(|| "-".to_string(), |l| format!("{:.1}", l)),
        );
        if opts.checkpoint_freq > 0 && agent.iteration() % opts.checkpoint_freq == 0 {
            let path = agent.save(opts.checkpoint_dir.as_deref())?;
            println!("Saved checkpoint {}", path.display());
        }
        if result.done {
            break;
        }
    }
    agent.stop();
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let opts = Options::parse();
    match get_agent_class(&opts.run)? {
        AlgorithmKind::PolicyGradient => run::<PolicyGradient>(&opts),
        AlgorithmKind::Mock => run::<MockAlgorithm>(&opts),
    }
}
