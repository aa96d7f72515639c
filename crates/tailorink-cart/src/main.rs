//! TailorInk command-line companion.
//!
//! Works on the designs saved by the editor on this device.

use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tailorink_cart::{AddOutcome, CartBridge, CartConfig, Customer, HttpCartApi, PendingSubmission};
use tailorink_core::{
    DesignEditor, DirectorySink, EditorConfig, FileStore, LocalStore, SceneSurfaceFactory,
};

/// TailorInk garment designs on this device
#[derive(Parser, Debug)]
#[command(name = "tailorink")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write design.json and designs.zip into a directory
    Export { dir: PathBuf },
    /// Add the saved designs to the shopper's cart
    Checkout { customer_id: String, email: String },
    /// List the shopper's cart
    Cart { customer_id: String },
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        log::error!("{}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let store: Arc<dyn LocalStore> = Arc::new(FileStore::default_location()?);
    let editor_config = EditorConfig::from_env()?;

    match cli.command {
        Command::Export { dir } => {
            let mut editor = open_editor(store, editor_config)?;
            let mut sink = DirectorySink::new(dir.clone());
            editor.download_design_json(&mut sink)?;
            editor.download_zip(&mut sink)?;
            println!("Exported {} designs to {}", editor.aggregate().len(), dir.display());
        }
        Command::Checkout { customer_id, email } => {
            let customer = Customer {
                id: customer_id,
                email,
            };
            let bridge = connect(store.clone())?;
            let mut editor = if PendingSubmission::is_flagged(store.as_ref()) {
                DesignEditor::new(SceneSurfaceFactory, store, editor_config)
            } else {
                open_editor(store, editor_config)?
            };
            match bridge.checkout(&mut editor, &customer).await? {
                AddOutcome::Added(line) => {
                    println!("Added cart line {} ({} cents)", line.id, line.price)
                }
                AddOutcome::RedirectToLogin { return_to } => {
                    println!("Sign in required, return to {}", return_to)
                }
            }
        }
        Command::Cart { customer_id } => {
            let bridge = connect(store)?;
            let customer = Customer {
                id: customer_id,
                email: String::new(),
            };
            for line in bridge.refresh(&customer).await? {
                println!(
                    "{}\t{} x {}\t{} designs",
                    line.id,
                    line.quantity,
                    line.price,
                    line.designs.len()
                );
            }
        }
    }
    Ok(())
}

fn open_editor(
    store: Arc<dyn LocalStore>,
    config: EditorConfig,
) -> Result<DesignEditor<SceneSurfaceFactory>, Box<dyn Error>> {
    let mut editor = DesignEditor::new(SceneSurfaceFactory, store, config);
    if !editor.restore_state() {
        return Err("no saved designs on this device".into());
    }
    Ok(editor)
}

fn connect(store: Arc<dyn LocalStore>) -> Result<CartBridge<HttpCartApi>, Box<dyn Error>> {
    let config = CartConfig::from_env()?;
    let api = HttpCartApi::from_config(&config)?;
    log::info!("Using store backend at {}", api.api_url());
    Ok(CartBridge::new(Arc::new(api), store, config))
}
