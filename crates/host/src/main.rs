use std::io::Read;
use std::sync::Arc;

use anyhow::Context;
use fsaccess_drive::Drive;
use fsaccess_host::cli::{self, Request};
use fsaccess_host::config::Config;
use fsaccess_vfs::LocalDirectory;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_help() {
    println!("fsaccess - content-service operations over a local directory");
    println!();
    println!("USAGE:");
    println!("    fsaccess <ROOT> <METHOD> [ARGS] [OPTIONS]");
    println!();
    println!("METHODS:");
    println!("    get [PATH]                   Fetch a file or directory listing");
    println!("    save PATH                    Write stdin to PATH (or create a directory)");
    println!("    delete PATH                  Delete a file or directory tree");
    println!("    rename FROM TO               Move an entry");
    println!("    copy PATH [DIR]              Copy an entry into DIR");
    println!("    new [DIR]                    Create an untitled file or directory");
    println!("    download_url PATH            Not supported by this drive");
    println!("    create_checkpoint PATH       Checkpoint stubs:");
    println!("    list_checkpoints PATH          no versions are ever stored");
    println!("    restore_checkpoint PATH [ID]");
    println!("    delete_checkpoint PATH [ID]");
    println!();
    println!("OPTIONS:");
    println!("    --format FORMAT  text, base64 or json");
    println!("    --type TYPE      file or directory");
    println!("    --dir            Same as --type directory");
    println!("    --ext EXT        Extension for untitled files");
    println!("    --no-content     Fetch metadata only");
    println!("    -h, --help       Print help information");
    println!("    -v, --version    Print version");
    println!();
    println!("CONFIG:");
    println!("    ~/.config/fsaccess/config.toml");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("--version" | "-v") => {
            println!("fsaccess {VERSION}");
            return Ok(());
        }
        Some("--help" | "-h") | None => {
            print_help();
            return Ok(());
        }
        Some(_) => {}
    }

    let config = Config::load();

    // Initialize structured logging (tracing); stdout is reserved for results
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(config.host.level())
        .with_writer(std::io::stderr)
        .init();

    let root_path = &args[1];
    let method = args.get(2).context("missing method; see --help")?;
    let mut request = Request::parse(method, &args[3..])?;

    if request.needs_input() {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .context("failed to read content from stdin")?;
        request = request.with_input(input)?;
    }

    let root = LocalDirectory::open(root_path)
        .with_context(|| format!("cannot open root directory {root_path}"))?;
    let drive = Drive::with_root(config.drive, Arc::new(root));
    let mut events = drive.subscribe();

    let mutation = request.method().is_mutation();
    let result = cli::execute(&drive, request).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    let mut reported = 0usize;
    while let Ok(event) = events.try_recv() {
        reported += 1;
        let path = event
            .new_value
            .as_ref()
            .or(event.old_value.as_ref())
            .map(|model| model.path.as_str())
            .unwrap_or_default();
        tracing::info!(change = ?event.change_type, path, "Drive changed");
    }
    if mutation && reported == 0 {
        tracing::debug!("Mutation reported no change");
    }
    drive.dispose();
    Ok(())
}
