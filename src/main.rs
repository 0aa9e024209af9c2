use clap::{Parser, Subcommand};
use picturepi::archive::{self, Selection};
use picturepi::{config, naming, output, scan, server};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    if env!("PICTUREPI_ON_TAG") == "true" {
        return env!("CARGO_PKG_VERSION");
    }
    match env!("PICTUREPI_GIT_HASH") {
        "" => "dev@unknown",
        // Leaked once at startup
        hash => Box::leak(format!("dev@{hash}").into_boxed_str()),
    }
}

#[derive(Parser)]
#[command(name = "picturepi")]
#[command(about = "Browse raw photo folders and download albums as archives")]
#[command(long_about = "\
Browse raw photo folders and download albums as archives

Leaf directories under the photo root are albums. Each album holds raw and
video files plus a pre-generated preview per file:

  pictures/
  ├── 2020/
  │   └── trip/                    # album \"2020/trip\"
  │       ├── IMG_0001.CR2
  │       └── IMG_0001-preview1.jpg
  ├── 2021/                        # album \"2021\"
  │   └── MVI_0100.MOV
  └── .thumbs/                     # hidden, ignored

Run 'picturepi gen-config' to generate a documented config file.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (TOML); stock defaults when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Photo root directory, overriding the config file
    #[arg(long, global = true)]
    photo_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP gallery server
    Serve {
        /// Address to bind, overriding the config file
        #[arg(long)]
        listen: Option<String>,
    },
    /// List leaf albums below an optional prefix
    List {
        #[arg(default_value = "")]
        prefix: String,
    },
    /// Show the pictures of one album
    Album { path: String },
    /// Write an album archive to a file or stdout
    Export {
        path: String,
        /// Export only these file names (repeatable); all pictures otherwise
        #[arg(long = "file")]
        files: Vec<String>,
        /// Output file, '-' for stdout
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },
    /// Print a stock config file with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = config::load_config(cli.config.as_deref())?;
    if let Some(root) = cli.photo_root {
        config.photo_root = root;
    }

    match cli.command {
        Command::Serve { listen } => {
            if let Some(listen) = listen {
                config.listen = listen;
            }
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?
                .block_on(server::serve(config))?;
        }
        Command::List { prefix } => {
            let tree = scan::album_tree(config.photo_root(), &prefix, &config.scan_options())?;
            output::print_album_list(&tree);
        }
        Command::Album { path } => {
            let album = scan::read_album(
                config.photo_root(),
                &path,
                &config.classifier(),
                &config.previews,
            )?;
            output::print_album(&album);
        }
        Command::Export {
            path,
            files,
            output: out_path,
        } => {
            let selection = if files.is_empty() {
                Selection::AllQualifying
            } else {
                Selection::named(files)
            };
            let album = naming::normalize_album_path(&path)?;
            let file_name = naming::archive_file_name(&config.archive.name_prefix, &album);

            let sink: Box<dyn Write> = if out_path.as_os_str() == "-" {
                Box::new(BufWriter::new(io::stdout().lock()))
            } else {
                Box::new(BufWriter::new(File::create(&out_path)?))
            };
            let summary = archive::export_archive(
                config.photo_root(),
                &album,
                &selection,
                &config.classifier(),
                sink,
            )?;
            output::print_export_summary(&file_name, &summary);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr so `export -o -` can use stdout for the archive.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "picturepi=info,tower_http=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
