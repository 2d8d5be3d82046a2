use std::process::ExitCode;

fn main() -> anyhow::Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    Ok(profile_store::run()?)
}
