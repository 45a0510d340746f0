//! boundfs command-line entry point

use anyhow::{Context, Result};
use boundfs::cli::{Args, Command};
use boundfs::{directory, path, DeadlineFile, FileMode};
use clap::Parser;
use std::io::{Read, Write};

#[compio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    args.validate()?;

    tracing_subscriber::fmt()
        .with_max_level(args.output.log_level())
        .with_writer(std::io::stderr)
        .init();

    run(&args).await
}

async fn run(args: &Args) -> Result<()> {
    let mut stdout = std::io::stdout().lock();

    match &args.command {
        Command::Pwd => {
            let cwd = directory::working_directory()
                .await
                .context("Failed to read working directory")?;
            writeln!(stdout, "{cwd}")?;
        }
        Command::Ls { path } => {
            let mut names = directory::contents_of_directory(path)
                .await
                .with_context(|| format!("Failed to list {path}"))?;
            names.sort();
            for name in names {
                writeln!(stdout, "{name}")?;
            }
        }
        Command::Cat { path } => {
            let mut file = DeadlineFile::open(path.as_str(), FileMode::Read)
                .await
                .with_context(|| format!("Failed to open {path}"))?;
            let contents = file
                .read_all(args.io.chunk_size, args.io.deadline())
                .await
                .with_context(|| format!("Failed to read {path}"))?;
            file.close().await?;
            stdout.write_all(&contents)?;
        }
        Command::Write {
            path,
            append,
            exclusive,
        } => {
            let mut input = Vec::new();
            std::io::stdin()
                .read_to_end(&mut input)
                .context("Failed to read standard input")?;

            let mode = Command::write_mode(*append, *exclusive);
            let mut file = DeadlineFile::open(path.as_str(), mode)
                .await
                .with_context(|| format!("Failed to open {path}"))?;
            file.write(&input, args.io.deadline())
                .await
                .with_context(|| format!("Failed to write {path}"))?;
            file.flush(args.io.deadline()).await?;
            file.close().await?;
            tracing::info!("Wrote {} bytes to {}", input.len(), path);
        }
        Command::Mkdir { path, parents } => {
            directory::create_directory(path, *parents)
                .await
                .with_context(|| format!("Failed to create {path}"))?;
        }
        Command::Rm { path } => {
            directory::remove_file(path)
                .await
                .with_context(|| format!("Failed to remove {path}"))?;
        }
        Command::Rmdir { path } => {
            directory::remove_directory(path)
                .await
                .with_context(|| format!("Failed to remove {path}"))?;
        }
        Command::Exists { path } => {
            writeln!(stdout, "{}", directory::file_exists(path).await)?;
        }
        Command::IsDir { path } => {
            writeln!(stdout, "{}", directory::is_directory(path).await)?;
        }
        Command::Normalize { path } => {
            writeln!(stdout, "{}", path::normalize(path))?;
        }
        Command::Dirname { path } => {
            writeln!(stdout, "{}", path::drop_last_path_component(path))?;
        }
    }

    stdout.flush()?;
    Ok(())
}
