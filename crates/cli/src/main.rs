use clap::{Parser, Subcommand};
use lib::api::BackendClient;
use lib::config;
use lib::models::size_description;
use lib::session::Message;

#[derive(Parser)]
#[command(name = "mocha")]
#[command(about = "Mocha CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and default config file.
    Init {
        /// Config file path (default: MOCHA_CONFIG_PATH or ~/.mocha/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Serve the bundled UI over loopback HTTP (foreground).
    Serve {
        /// Config file path (default: MOCHA_CONFIG_PATH or ~/.mocha/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Port to serve on (default from config or 8080)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// List models available on the backend.
    Models {
        /// Config file path (default: MOCHA_CONFIG_PATH or ~/.mocha/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// List chat sessions stored by the backend.
    Sessions {
        /// Config file path (default: MOCHA_CONFIG_PATH or ~/.mocha/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Chat with the backend interactively.
    Chat {
        /// Config file path (default: MOCHA_CONFIG_PATH or ~/.mocha/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Optional existing session id to continue.
        #[arg(long, value_name = "ID")]
        session: Option<i64>,

        /// Model to chat with (default from config, else first available).
        #[arg(long, short)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("mocha {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("serve failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Models { config }) => {
            if let Err(e) = run_models(config).await {
                log::error!("models failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Sessions { config }) => {
            if let Err(e) = run_sessions(config).await {
                log::error!("sessions failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Chat {
            config,
            session,
            model,
        }) => {
            if let Err(e) = run_chat(config, session, model).await {
                log::error!("chat failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(config::default_config_path);
    let dir = config::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_serve(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, _) = config::load_config(config_path)?;
    if let Some(p) = port {
        config.ui.port = p;
    }
    log::info!(
        "serving UI bundle on {}:{}",
        config.ui.bind,
        config.ui.port
    );
    lib::assets::run_asset_server(&config).await
}

/// Build a client against the configured (or env-overridden) backend.
fn backend_client(config_path: Option<std::path::PathBuf>) -> anyhow::Result<BackendClient> {
    let (config, _) = config::load_config(config_path)?;
    Ok(BackendClient::new(Some(config::resolve_backend_base_url(
        &config,
    ))))
}

async fn run_models(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let client = backend_client(config_path)?;
    let models = client.list_models().await?;
    if models.is_empty() {
        println!("no models available");
        return Ok(());
    }
    for m in models {
        println!("{}  ({})", m.name, size_description(m.size));
    }
    Ok(())
}

async fn run_sessions(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let client = backend_client(config_path)?;
    let sessions = client.chat_sessions().await?;
    if sessions.is_empty() {
        println!("no sessions stored");
        return Ok(());
    }
    for s in sessions {
        println!("{:>6}  {}  {}", s.id, s.model_name, s.created_at);
    }
    Ok(())
}

async fn run_chat(
    config_path: Option<std::path::PathBuf>,
    session: Option<i64>,
    model: Option<String>,
) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let (config, _) = config::load_config(config_path)?;
    let client = BackendClient::new(Some(config::resolve_backend_base_url(&config)));

    let model = match model.or_else(|| config.chat.default_model.clone()) {
        Some(m) => m,
        None => {
            let models = client.list_models().await?;
            models
                .first()
                .map(|m| m.name.clone())
                .ok_or_else(|| anyhow::anyhow!("no models available on the backend; pass --model"))?
        }
    };

    let mut current_session = session;
    println!("chatting with {} (/new to start over, /exit to quit)", model);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("/exit") || input.eq_ignore_ascii_case("/quit") {
            break;
        }
        if input.eq_ignore_ascii_case("/new") {
            current_session = None;
            println!("started a new chat");
            continue;
        }

        let messages = vec![Message::user(input)];
        match client.send_chat(&model, &messages, current_session).await {
            Ok(reply) => {
                if let Some(id) = reply.session_id {
                    current_session = Some(id);
                }
                let content = reply.message.map(|m| m.content).unwrap_or_default();
                println!("< {}", content.trim());
            }
            Err(e) => {
                eprintln!("chat error: {}", e);
            }
        }
    }

    Ok(())
}
