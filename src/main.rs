use {
    anyhow::Result,
    clap::Parser,
    td3_rl::{
        cli::{
            run,
            Args,
            Env,
        },
        envs::{
            PendulumEnv,
            PointEnv,
        },
    },
};

fn main() -> Result<()> {
    let args = Args::parse();

    match args.env {
        Env::Pendulum => run::<PendulumEnv>(&args)?,
        Env::Pointenv => run::<PointEnv>(&args)?,
    };
    Ok(())
}
