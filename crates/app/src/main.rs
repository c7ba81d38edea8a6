// CLI modules
mod cli;

use clap::{Parser, Subcommand};
use cli::{args::Args, op::Op, Init, Open, Share, Version};

command_enum! {
    (Init, Init),
    (Share, Share),
    (Open, Open),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let ctx = match cli::op::OpContext::new(args.remote, args.config_path) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let level = args
        .log_level
        .unwrap_or_else(|| ctx.state.config.log_level.clone());
    let log_dir = ctx.state.log_dir();
    let guards = veil::logging::init_logging(&level, log_dir.as_deref());

    let result = args.command.execute(&ctx).await;
    // flush logs before exiting
    drop(guards);

    match result {
        Ok(output) => {
            println!("{}", output);
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
