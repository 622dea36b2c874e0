use std::path::PathBuf;
use structopt::StructOpt;

use guardian::classifier::{OllamaBackend, ThreatClassifier};
use guardian::config::Config;
use guardian::{AuthLineParser, Event, EventSeverity, EventType, Guardian, ShutdownSignal};

/// Home Lab Guardian: model-assisted auth log monitoring
#[derive(StructOpt, Debug)]
#[structopt(name = "guardian", about = "Auth log monitor with AI threat analysis")]
pub enum Cli {
    /// Start monitoring the log file
    Run {
        /// Path to configuration file
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
        /// Log file to monitor (default: /var/log/auth.log)
        #[structopt(long)]
        log_path: Option<PathBuf>,
        /// Ollama model to use
        #[structopt(long)]
        model: Option<String>,
        /// Polling interval in seconds
        #[structopt(long)]
        poll_interval: Option<u64>,
        /// Discord webhook URL
        #[structopt(long)]
        discord_webhook: Option<String>,
        /// Slack webhook URL
        #[structopt(long)]
        slack_webhook: Option<String>,
    },
    /// Classify a sample failed-login event
    Test {
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// Show the effective configuration
    Config {
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// Generate a default configuration file
    InitConfig {
        /// Output path for the configuration file
        #[structopt(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
    /// Parse and display auth events from a file
    Parse {
        /// Path to log file
        #[structopt(short, long)]
        file: PathBuf,
        /// Number of lines to parse
        #[structopt(short, long, default_value = "10")]
        lines: usize,
    },
}

fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(e) = dispatch(Cli::from_args()) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: &PathBuf) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if path.exists() {
        Config::from_file(path)?
    } else {
        Config::default()
    };
    config.apply_env_overrides()?;
    Ok(config)
}

fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli {
        Cli::Run {
            config,
            log_path,
            model,
            poll_interval,
            discord_webhook,
            slack_webhook,
        } => {
            let mut config = load_config(&config)?;
            if let Some(path) = log_path {
                config.input.log_path = path;
            }
            if let Some(model) = model {
                config.classifier.model = model;
            }
            if let Some(secs) = poll_interval {
                config.input.poll_interval_secs = secs;
            }
            if let Some(url) = discord_webhook {
                config.notifiers.discord_webhook_url = Some(url);
            }
            if let Some(url) = slack_webhook {
                config.notifiers.slack_webhook_url = Some(url);
            }

            if !config.input.log_path.exists() {
                eprintln!("Error: Log file not found: {:?}", config.input.log_path);
                eprintln!("Tip: Use --log-path to specify a different file");
                std::process::exit(1);
            }

            if !config.notifiers.has_channels() {
                println!("Warning: No webhook URLs configured. Alerts will only be logged.");
                println!("Set DISCORD_WEBHOOK_URL or SLACK_WEBHOOK_URL, or add them to the config file");
                println!();
            }

            let shutdown = ShutdownSignal::new();
            shutdown.install_handler()?;

            println!("Guardian starting...");
            println!("Monitoring: {}", config.input.log_path.display());
            println!("AI Model: {}", config.classifier.model);
            println!("{}", "=".repeat(60));

            Guardian::from_config(&config).run(&shutdown)?;
        }
        Cli::Test { config } => {
            let config = load_config(&config)?;
            let event = Event {
                timestamp: chrono::Local::now().naive_local(),
                hostname: "testhost".to_string(),
                service: "sshd".to_string(),
                message: "Failed password for invalid user admin from 192.168.1.100 port 22 ssh2"
                    .to_string(),
                event_type: EventType::FailedLogin,
                username: Some("admin".to_string()),
                source_ip: Some("192.168.1.100".to_string()),
                severity: EventSeverity::High,
            };

            let backend = OllamaBackend::new(
                &config.classifier.base_url,
                &config.classifier.model,
                config.classifier.temperature,
                config.classifier.timeout(),
            );
            let classifier = ThreatClassifier::new(Box::new(backend));

            println!("Analyzing sample event: {}", event.event_type);
            let analysis = classifier.classify(&event);
            println!("\nAnalysis complete!");
            println!("Severity: {}", analysis.severity);
            println!("Explanation: {}", analysis.explanation);
            println!("Threat: {}", if analysis.is_threat { "yes" } else { "no" });
            println!("Recommendations:");
            for rec in &analysis.recommendations {
                println!("  - {}", rec);
            }
        }
        Cli::Config { config } => {
            let config = load_config(&config)?;
            let status = |v: &Option<String>| {
                if v.as_deref().is_some_and(|s| !s.is_empty()) {
                    "Configured"
                } else {
                    "Not set"
                }
            };

            println!("Current Configuration:");
            println!("{}", "=".repeat(50));
            println!("Log Path:         {}", config.input.log_path.display());
            println!("Poll Interval:    {}s", config.input.poll_interval_secs);
            println!("Ollama URL:       {}", config.classifier.base_url);
            println!("Ollama Model:     {}", config.classifier.model);
            println!("Discord Webhook:  {}", status(&config.notifiers.discord_webhook_url));
            println!("Slack Webhook:    {}", status(&config.notifiers.slack_webhook_url));
            println!("Other Webhooks:   {}", config.notifiers.webhooks.len());
            println!("Alert on Failed:  {}", config.alerts.alert_on_failed_login);
            println!("Alert on Sudo:    {}", config.alerts.alert_on_sudo);
            println!("Min Severity:     {}", config.alerts.min_severity);
        }
        Cli::InitConfig { output } => {
            Config::default().to_file(&output)?;
            println!("Default configuration written to: {:?}", output);
        }
        Cli::Parse { file, lines } => {
            if !file.exists() {
                eprintln!("File not found: {:?}", file);
                std::process::exit(1);
            }

            let contents = std::fs::read(&file)?;
            let contents = String::from_utf8_lossy(&contents);
            let parser = AuthLineParser::current_year();
            let events: Vec<Event> = contents.lines().filter_map(|l| parser.parse(l)).collect();
            let display_count = std::cmp::min(lines, events.len());

            println!("Parsed {} event(s) (showing {}):\n", events.len(), display_count);
            for event in events.iter().take(display_count) {
                println!(
                    "  {} [{}] user: {}, ip: {}, service: {}, at {}",
                    event.event_type,
                    event.severity,
                    event.username_or_na(),
                    event.source_ip_or_na(),
                    event.service,
                    event.display_timestamp()
                );
            }
        }
    }

    Ok(())
}
