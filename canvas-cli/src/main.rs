//! # Canvas CLI
//!
//! Operator tool over a file-backed canvas store. Every command addresses
//! one tenant canvas by suite and office id.
//!
//! ```text
//! canvas-cli --data-dir ./canvas --suite s1 --office o1 show
//! canvas-cli ... add --kind email --x 40 --y 60
//! canvas-cli ... move --id <widget> --x 200 --y 120
//! canvas-cli ... delete --id <widget>
//! canvas-cli ... clear
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use canvas_workspace::{
    CanvasConfig, CanvasStorage, DebouncedSaver, TenantKey, WidgetCanvas, WidgetId, WidgetKind,
    FRAME_INTERVAL,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Inspect and edit tenant canvas records.
#[derive(Debug, Parser)]
#[command(name = "canvas-cli", version, about)]
struct Cli {
    /// Directory holding canvas records [env: CANVAS_DATA_DIR].
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Suite id of the tenant.
    #[arg(long, env = "CANVAS_SUITE_ID")]
    suite: String,

    /// Office id of the tenant.
    #[arg(long, env = "CANVAS_OFFICE_ID")]
    office: String,

    /// Debounce delay for position updates, in milliseconds
    /// [env: CANVAS_DEBOUNCE_MS, default: 500].
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Finish delete animations instantly [env: CANVAS_REDUCED_MOTION].
    #[arg(long)]
    reduced_motion: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the stored canvas as JSON.
    Show,
    /// Place a new widget.
    Add {
        /// Widget kind (email, invoice, calendar, tasks, contacts, notes, ...).
        #[arg(long)]
        kind: WidgetKind,
        /// X position.
        #[arg(long, default_value_t = 0.0)]
        x: f64,
        /// Y position.
        #[arg(long, default_value_t = 0.0)]
        y: f64,
        /// Width.
        #[arg(long, default_value_t = 320.0)]
        width: f64,
        /// Height.
        #[arg(long, default_value_t = 240.0)]
        height: f64,
    },
    /// Move a widget.
    Move {
        /// Widget id.
        #[arg(long)]
        id: String,
        /// New X position.
        #[arg(long)]
        x: f64,
        /// New Y position.
        #[arg(long)]
        y: f64,
    },
    /// Delete a widget through the delete animation pipeline.
    Delete {
        /// Widget id.
        #[arg(long)]
        id: String,
    },
    /// Remove the tenant's stored canvas.
    Clear,
}

impl Cli {
    /// Environment settings, overridden by any flags given.
    fn config(&self) -> CanvasConfig {
        self.apply_flags(CanvasConfig::from_env())
    }

    fn apply_flags(&self, mut config: CanvasConfig) -> CanvasConfig {
        if let Some(dir) = &self.data_dir {
            config = config.with_data_dir(dir);
        }
        if let Some(ms) = self.debounce_ms {
            config = config.with_debounce(Duration::from_millis(ms));
        }
        if self.reduced_motion {
            config = config.with_reduced_motion(true);
        }
        config
    }

    fn tenant(&self) -> TenantKey {
        TenantKey::new(&self.suite, &self.office)
    }
}

/// Initialize structured tracing with optional JSON format.
///
/// Set `RUST_LOG` to control log levels (default: info,canvas_workspace=debug).
/// Set `RUST_LOG_FORMAT=json` for JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,canvas_workspace=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config();
    let tenant = cli.tenant();
    let Some(data_dir) = &config.data_dir else {
        bail!("No data directory: pass --data-dir or set CANVAS_DATA_DIR");
    };
    let storage = CanvasStorage::from_config(&config)
        .with_context(|| format!("Failed to open data dir {}", data_dir.display()))?;

    match cli.command {
        Command::Show => {
            match storage.load(&tenant) {
                Some(state) => println!("{}", serde_json::to_string_pretty(&state)?),
                None => println!("No saved canvas for {tenant}"),
            }
            return Ok(());
        }
        Command::Clear => {
            storage.clear(&tenant).context("Failed to clear canvas")?;
            println!("Cleared canvas for {tenant}");
            return Ok(());
        }
        Command::Add { .. } | Command::Move { .. } | Command::Delete { .. } => {}
    }

    let saver = DebouncedSaver::new(storage).context("Failed to start saver")?;
    let mut canvas = WidgetCanvas::open(tenant, saver, config);

    match cli.command {
        Command::Add {
            kind,
            x,
            y,
            width,
            height,
        } => {
            let id = canvas
                .spawn_widget(kind, x, y, width, height)
                .context("Failed to add widget")?;
            println!("{id}");
        }
        Command::Move { id, x, y } => {
            let id = WidgetId::from(id);
            canvas.move_widget(&id, x, y).context("Failed to move widget")?;
            canvas.flush().context("Failed to save position")?;
        }
        Command::Delete { id } => {
            let id = WidgetId::from(id);
            canvas.delete_widget(&id).context("Failed to delete widget")?;
            while canvas.is_deleting(&id) {
                tokio::time::sleep(FRAME_INTERVAL).await;
            }
            if canvas.widget(&id).is_some() {
                bail!("Widget {id} is still on the canvas");
            }
            println!("Deleted {id}");
        }
        Command::Show | Command::Clear => {}
    }

    canvas.close();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add() {
        let cli = Cli::try_parse_from([
            "canvas-cli",
            "--data-dir",
            "/tmp/c",
            "--suite",
            "s",
            "--office",
            "o",
            "add",
            "--kind",
            "invoice",
            "--x",
            "12.5",
        ])
        .expect("parse");

        assert!(matches!(
            cli.command,
            Command::Add {
                kind: WidgetKind::Invoice,
                ..
            }
        ));
        assert_eq!(cli.debounce_ms, None);
        assert!(!cli.reduced_motion);
        assert_eq!(cli.tenant(), TenantKey::new("s", "o"));
    }

    #[test]
    fn test_config_from_flags() {
        let cli = Cli::try_parse_from([
            "canvas-cli",
            "--data-dir",
            "/tmp/c",
            "--suite",
            "s",
            "--office",
            "o",
            "--debounce-ms",
            "120",
            "--reduced-motion",
            "clear",
        ])
        .expect("parse");

        let config = cli.apply_flags(CanvasConfig::default());
        assert_eq!(config.debounce, Duration::from_millis(120));
        assert!(config.reduced_motion);
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/c")));
    }

    #[test]
    fn test_flags_keep_unset_settings() {
        let cli = Cli::try_parse_from(["canvas-cli", "--suite", "s", "--office", "o", "show"])
            .expect("parse");
        let base = CanvasConfig::default()
            .with_data_dir("/srv/canvas")
            .with_debounce(Duration::from_millis(250))
            .with_reduced_motion(true);

        assert_eq!(cli.apply_flags(base.clone()), base);
    }

    #[tokio::test]
    async fn test_add_then_delete_round_trip() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dir = tmp.path().to_path_buf();
        let base = |command: &[&str]| {
            let mut args = vec![
                "canvas-cli",
                "--data-dir",
                dir.to_str().expect("utf8 path"),
                "--suite",
                "s",
                "--office",
                "o",
                "--reduced-motion",
            ];
            args.extend_from_slice(command);
            Cli::try_parse_from(args).expect("parse")
        };

        run(base(&["add", "--kind", "notes"])).await.expect("add");
        let config = CanvasConfig::default().with_data_dir(&dir);
        let storage = CanvasStorage::from_config(&config).expect("storage");
        let tenant = TenantKey::new("s", "o");
        let id = storage.load(&tenant).expect("saved").widgets[0].id.clone();

        run(base(&["delete", "--id", id.as_str()]))
            .await
            .expect("delete");
        assert!(storage.load(&tenant).expect("saved").widgets.is_empty());

        run(base(&["clear"])).await.expect("clear");
        assert!(storage.load(&tenant).is_none());
    }
}
