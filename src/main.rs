use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use soulpet::mint::{self, HttpTransport, LocalTransport, MintRequest, Transport};
use soulpet::quiz::{option_letter, parse_choice, Progress, QuizSession};
use soulpet::rendering::{CardRenderer, ResultImage};
use soulpet::server::Server;
use soulpet::{Animal, Router, ServiceConfig};

#[derive(Parser, Debug)]
#[command(name = "soulpet", version, about = "Spirit-animal quiz, result cards and NFT minting")]
struct Cli {
    /// Directory holding `{Animal}.png` artwork (overrides SOULPET_ASSETS_DIR)
    #[arg(long, global = true)]
    assets_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API server
    Serve {
        #[arg(long)]
        bind: Option<String>,
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Take the quiz on the terminal
    Quiz {
        #[arg(long)]
        name: String,
        /// Where to write the result card
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Score eight answer indices (0-3)
    Score {
        #[arg(num_args = 8, required = true)]
        answers: Vec<u8>,
    },
    /// Render a result card
    Render {
        #[arg(long)]
        name: String,
        #[arg(long)]
        animal: Animal,
        /// Footer date, YYYY-MM-DD (defaults to today, UTC)
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
        /// Print the card as a data URL instead of writing a file
        #[arg(long)]
        data_url: bool,
    },
    /// Render, upload and mint a result card
    Mint {
        #[arg(long)]
        name: String,
        #[arg(long)]
        animal: Animal,
        #[arg(long)]
        wallet: String,
        /// Drop contract from an earlier mint
        #[arg(long)]
        contract_address: Option<String>,
        /// Base URL of a running server; handled in-process when omitted
        #[arg(long)]
        server: Option<String>,
    },
}

fn init_logging() {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(log::LevelFilter::Info);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn write_card(image: &ResultImage, out: &Path) -> Result<()> {
    std::fs::write(out, &image.png_data).with_context(|| format!("writing {}", out.display()))?;
    println!("Saved {} ({}x{}, sha256 {})", out.display(), image.width, image.height, image.digest());
    Ok(())
}

fn run_quiz(renderer: &CardRenderer, name: &str, out: Option<PathBuf>) -> Result<()> {
    let mut session = QuizSession::new(name)?;
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut stdout = io::stdout();

    let animal = loop {
        let Some(question) = session.current() else {
            bail!("quiz ended without a result");
        };
        println!();
        println!(
            "Question {} of 8 ({:.0}%)",
            session.position() + 1,
            session.progress_percent()
        );
        println!("{}", question.prompt);
        for (i, option) in question.options.iter().enumerate() {
            println!("  {}) {}", option_letter(i), option);
        }

        let choice = loop {
            print!("> ");
            stdout.flush()?;
            let Some(line) = lines.next() else {
                bail!("input closed before the quiz was finished");
            };
            match parse_choice(&line?) {
                Some(c) => break c,
                None => println!("Please answer A, B, C or D."),
            }
        };
        if let Progress::Complete(animal) = session.answer(choice)? {
            break animal;
        }
    };

    println!();
    println!("{}, your Soulpet is the {}!", session.user_name(), animal);

    match renderer.render(session.user_name(), animal, None) {
        Ok(image) => {
            let out = out.unwrap_or_else(|| PathBuf::from(ResultImage::file_name(session.user_name(), animal)));
            write_card(&image, &out)?;
        }
        Err(soulpet::Error::Image(e)) => warn!("artwork unavailable, skipping card: {}", e),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn check_date(date: &str) -> Result<()> {
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .with_context(|| format!("invalid date '{}', expected YYYY-MM-DD", date))
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let mut config = ServiceConfig::from_env()?;
    if let Some(dir) = cli.assets_dir {
        config.assets_dir = dir;
    }
    let renderer = CardRenderer::new(config.assets_dir.clone());

    match cli.command {
        Command::Serve { bind, workers } => {
            if let Some(bind) = bind {
                config.bind = bind;
            }
            if let Some(workers) = workers {
                if workers == 0 {
                    bail!("--workers must be at least 1");
                }
                config.workers = workers;
            }
            let server = Server::bind(config)?;
            server.run()?;
        }
        Command::Quiz { name, out } => run_quiz(&renderer, &name, out)?,
        Command::Score { answers } => {
            let animal = soulpet::quiz::score_indices(&answers)?;
            println!("{}", animal);
        }
        Command::Render {
            name,
            animal,
            date,
            out,
            data_url,
        } => {
            if let Some(d) = &date {
                check_date(d)?;
            }
            let image = renderer.render(&name, animal, date.as_deref())?;
            if data_url {
                println!("{}", image.to_data_url());
            } else {
                let out = out.unwrap_or_else(|| PathBuf::from(ResultImage::file_name(name.trim(), animal)));
                write_card(&image, &out)?;
            }
        }
        Command::Mint {
            name,
            animal,
            wallet,
            contract_address,
            server,
        } => {
            let image = renderer.render(&name, animal, None)?;
            let request = MintRequest {
                wallet_address: wallet,
                user_name: name.trim().to_string(),
                animal,
                image_data_url: image.to_data_url(),
                contract_address,
            };
            let transport: Box<dyn Transport> = match server {
                Some(url) => {
                    info!("minting through {}", url);
                    Box::new(HttpTransport::new(&url, Duration::from_millis(config.timeout_ms))?)
                }
                None => Box::new(LocalTransport::new(Router::new(config)?)),
            };
            let outcome = mint::mint(transport.as_ref(), &request)?;
            println!("Minted! Image: {}", outcome.image_url);
            match (&outcome.contract_address, &outcome.collection_url) {
                (Some(addr), Some(url)) => println!("Contract {}\nView the collection: {}", addr, url),
                _ => println!("Contract address not reported"),
            }
        }
    }
    Ok(())
}
