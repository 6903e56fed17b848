//! Binary entrypoint for the QuizQuest CLI.
//!
//! Commands:
//! - `init` - create a starter `config.toml` and `data/questions.json`
//! - `play --user <name> [--phase <n>]` - run a quiz encounter in the terminal
//! - `profile --user <name>` - print the saved profile
//! - `shop --user <name> [--buy <item>] [--qty <n>]` - list or buy items
//! - `equip --user <name> <slot> <item>` - bind an item to a hotbar slot
//!
//! See the library crate docs for module-level details: `quizquest::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use quizquest::config::Config;
use quizquest::quiz::{
    equip, format_hotbar, format_shop_listing, next_open_phase, purchase, unequip,
    starter_bank_json, DisabledScoreSink, EncounterDriver, FeedbackEvent, GameSession,
    HotbarSlot, PhaseSummary, ProfileStore, QuestionBank, ScoreSink, SledProfileStore,
    StartOutcome,
};

#[derive(Parser)]
#[command(name = "quizquest")]
#[command(about = "Quiz encounters for a single-player RPG")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration and question bank
    Init,
    /// Play a phase
    Play {
        #[arg(short, long)]
        user: String,
        /// Phase to play (defaults to the first one not yet cleared)
        #[arg(short, long)]
        phase: Option<u32>,
    },
    /// Show a player's profile
    Profile {
        #[arg(short, long)]
        user: String,
    },
    /// List shop items, or buy one
    Shop {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        buy: Option<String>,
        #[arg(short, long, default_value_t = 1)]
        qty: u32,
    },
    /// Bind an owned item to a hotbar slot (use `-` as the item to clear it)
    Equip {
        #[arg(short, long)]
        user: String,
        slot: HotbarSlot,
        item: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            // Logging starts before any config exists
            init_logging(&None, cli.verbose);
            init(&cli.config).await?;
        }
        Commands::Play { user, phase } => {
            let (config, store) = prepare(&cli.config, cli.verbose).await?;
            let session = Arc::new(GameSession::new(
                &user,
                store,
                build_score_sink(&config)?,
                config.game.rules(),
            ));
            let bank = match QuestionBank::load_from_json(&config.questions.bank_path) {
                Ok(bank) => bank,
                Err(e) => {
                    warn!(
                        "could not load question bank {}: {}",
                        config.questions.bank_path, e
                    );
                    QuestionBank::new()
                }
            };
            let profile = session.load_or_create_profile()?;
            let phase = phase.unwrap_or_else(|| next_open_phase(&profile));
            info!(
                "session {} started for {} at phase {}",
                session.session_id(),
                user,
                phase
            );
            play(session, &bank, phase).await?;
        }
        Commands::Profile { user } => {
            let (config, store) = prepare(&cli.config, cli.verbose).await?;
            let profile = store.read(&user)?;
            let catalog = quizquest::quiz::ItemCatalog::standard();
            println!("{} (level {}, {} XP)", profile.username, profile.level(), profile.total_xp);
            println!(
                "Coins: {}  Lives: {}/{}  Mana: {}/{}",
                profile.coins,
                profile.lives,
                config.game.max_lives,
                profile.mana,
                config.game.max_mana
            );
            println!("Highest phase: {}", profile.highest_phase);
            for record in profile.phase_progress.values() {
                println!(
                    "  phase {:>2}: {} ({} correct, {} wrong, {} XP) {}",
                    record.phase,
                    if record.completed { "cleared" } else { "failed " },
                    record.correct_count,
                    record.wrong_count,
                    record.xp_earned,
                    record.recorded_at.format("%Y-%m-%d %H:%M")
                );
            }
            print!("{}", format_hotbar(&profile, &catalog));
            for (item, count) in &profile.inventory {
                let used = profile.item_usage.get(item).copied().unwrap_or(0);
                println!("  {:<14} x{:<3} used {}", item, count, used);
            }
        }
        Commands::Shop { user, buy, qty } => {
            let (config, store) = prepare(&cli.config, cli.verbose).await?;
            let session = GameSession::new(
                &user,
                store,
                Arc::new(DisabledScoreSink),
                config.game.rules(),
            );
            let mut profile = session.load_or_create_profile()?;
            match buy {
                Some(item) => {
                    let spent = purchase(&mut profile, session.catalog(), &item, qty)?;
                    session.store().write(&profile)?;
                    info!("{} bought {} x{} for {} coins", user, item, qty, spent);
                    println!(
                        "Bought {} x{} for {} coins ({} left).",
                        item, qty, spent, profile.coins
                    );
                }
                None => print!("{}", format_shop_listing(session.catalog(), profile.coins)),
            }
        }
        Commands::Equip { user, slot, item } => {
            let (config, store) = prepare(&cli.config, cli.verbose).await?;
            let session = GameSession::new(
                &user,
                store,
                Arc::new(DisabledScoreSink),
                config.game.rules(),
            );
            let mut profile = session.load_or_create_profile()?;
            if item == "-" {
                unequip(&mut profile, slot);
            } else {
                equip(&mut profile, session.catalog(), slot, &item)?;
            }
            session.store().write(&profile)?;
            print!("{}", format_hotbar(&profile, session.catalog()));
        }
    }

    Ok(())
}

/// Load the config (defaults if missing), start logging and open the profile store.
async fn prepare(config_path: &str, verbosity: u8) -> Result<(Config, Arc<dyn ProfileStore>)> {
    let config = match Config::load(config_path).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} (run `quizquest init` to create one; using defaults)", e);
            Config::default()
        }
    };
    init_logging(&Some(config.clone()), verbosity);
    let store: Arc<dyn ProfileStore> =
        Arc::new(SledProfileStore::open(config.storage.profile_db())?);
    Ok((config, store))
}

async fn init(config_path: &str) -> Result<()> {
    info!("Initializing new QuizQuest configuration");
    let cfg = Config::default();
    let serialized = toml::to_string_pretty(&cfg)?;
    tokio::fs::write(config_path, serialized).await?;
    info!("Configuration file created at {}", config_path);

    tokio::fs::create_dir_all(&cfg.storage.data_dir).await?;
    let bank_path = Path::new(&cfg.questions.bank_path);
    if bank_path.exists() {
        info!("Keeping existing question bank at {}", bank_path.display());
    } else {
        tokio::fs::write(bank_path, starter_bank_json()).await?;
        info!("Starter question bank written to {}", bank_path.display());
    }
    Ok(())
}

fn build_score_sink(config: &Config) -> Result<Arc<dyn ScoreSink>> {
    if !config.score.enabled {
        return Ok(Arc::new(DisabledScoreSink));
    }
    #[cfg(feature = "score-sync")]
    let sink: Arc<dyn ScoreSink> = Arc::new(quizquest::quiz::HttpScoreSink::new(
        &config.score.endpoint,
        std::time::Duration::from_secs(config.score.timeout_seconds as u64),
    )?);
    #[cfg(not(feature = "score-sync"))]
    let sink: Arc<dyn ScoreSink> = {
        warn!("score sync is enabled in config but this build lacks the 'score-sync' feature");
        Arc::new(DisabledScoreSink)
    };
    Ok(sink)
}

enum Input {
    Quit,
    Hotbar,
    Use(HotbarSlot),
    Answer(String),
}

fn parse_input(line: &str, options: &[&str]) -> Option<Input> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let lower = line.to_ascii_lowercase();
    if lower == "q" || lower == "quit" {
        return Some(Input::Quit);
    }
    if lower == "h" || lower == "hotbar" {
        return Some(Input::Hotbar);
    }
    if let Some(rest) = lower.strip_prefix("use ") {
        return rest.parse().ok().map(Input::Use);
    }
    // A bare option number picks that option.
    if let Ok(n) = line.parse::<usize>() {
        if let Some(option) = n.checked_sub(1).and_then(|idx| options.get(idx)) {
            return Some(Input::Answer(option.to_string()));
        }
    }
    Some(Input::Answer(line.to_string()))
}

async fn read_line(lines: &mut Lines<BufReader<Stdin>>) -> Result<Option<String>> {
    Ok(lines.next_line().await?)
}

async fn show_feedback(
    driver: &mut EncounterDriver,
    lines: &mut Lines<BufReader<Stdin>>,
) -> Result<()> {
    for event in driver.drain_feedback() {
        match event {
            FeedbackEvent::Correct { xp } => println!("  Correct! +{} XP", xp),
            FeedbackEvent::Wrong { lives_left } => {
                println!("  Wrong! {} lives left", lives_left)
            }
            FeedbackEvent::ItemUsed { slot, item } => println!("  [{}] {} used", slot, item),
            FeedbackEvent::Rejected(reason) => println!("  {}", reason),
            FeedbackEvent::ShowExample { text } => {
                println!("  --- Example ---\n  {}\n  (press Enter to continue)", text);
                read_line(lines).await?;
            }
        }
    }
    Ok(())
}

fn render_question(driver: &EncounterDriver) {
    let encounter = driver.encounter();
    let Some(question) = encounter.current_question() else {
        return;
    };
    let state = encounter.state();
    println!(
        "\nPhase {}  Q{}/{}  Lives {}  Mana {}  XP {}",
        encounter.phase(),
        encounter.question_number(),
        encounter.question_count(),
        state.lives,
        state.mana,
        state.total_xp_earned
    );
    if !state.active_effects.is_empty() {
        let effects: Vec<String> = state.active_effects.iter().map(|e| e.to_string()).collect();
        println!("Active: {}", effects.join(", "));
    }
    println!("{}", question.text);
    for (idx, option) in encounter.visible_options().iter().enumerate() {
        println!("  {}) {}", idx + 1, option);
    }
}

fn print_summary(summary: &PhaseSummary) {
    println!("\n{}", summary.result.summary_line());
    println!("Level {} ({} XP total)", summary.level, summary.total_xp);
    if !summary.saved {
        println!("(progress could not be saved)");
    }
}

async fn play(session: Arc<GameSession>, bank: &QuestionBank, phase: u32) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut driver = match EncounterDriver::start(session, bank, phase) {
        StartOutcome::Ready(driver) => driver,
        StartOutcome::ReturnToOverworld { phase, reason } => {
            println!("Phase {} is unavailable ({}). Returning to the overworld.", phase, reason);
            return Ok(());
        }
    };
    println!("Commands: <number> or answer text, `use <slot>`, `hotbar`, `quit`");

    loop {
        render_question(&driver);
        let Some(line) = read_line(&mut lines).await? else {
            driver.close();
            return Ok(());
        };
        let options: Vec<String> = driver
            .encounter()
            .visible_options()
            .iter()
            .map(|o| o.to_string())
            .collect();
        let option_refs: Vec<&str> = options.iter().map(String::as_str).collect();
        let Some(input) = parse_input(&line, &option_refs) else {
            continue;
        };

        match input {
            Input::Quit => {
                driver.close();
                return Ok(());
            }
            Input::Hotbar => {
                print!("{}", format_hotbar(driver.profile(), driver.session().catalog()));
            }
            Input::Use(slot) => {
                let _ = driver.use_slot(slot);
                show_feedback(&mut driver, &mut lines).await?;
            }
            Input::Answer(text) => {
                let outcome = driver.answer(&text)?;
                show_feedback(&mut driver, &mut lines).await?;
                if outcome.resolve_after.is_none() {
                    continue;
                }
                let summary = driver.finish().await?;
                print_summary(&summary);
                println!("[r]etry, [n]ext phase, or [q]uit?");
                let choice = read_line(&mut lines).await?.unwrap_or_default();
                match choice.trim().to_ascii_lowercase().as_str() {
                    "r" | "retry" => driver.retry()?,
                    "n" | "next" => {
                        driver = match driver.advance(bank) {
                            StartOutcome::Ready(next) => next,
                            StartOutcome::ReturnToOverworld { phase, reason } => {
                                println!(
                                    "Phase {} is unavailable ({}). Returning to the overworld.",
                                    phase, reason
                                );
                                return Ok(());
                            }
                        };
                    }
                    _ => {
                        driver.close_gracefully().await;
                        return Ok(());
                    }
                }
            }
        }
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .map(|cfg| cfg.logging.level_filter())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.clone())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    match log_file {
        Some(f) => {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            // The play loop owns the terminal; only mirror to stderr when it is not a TTY.
            let mirror = !atty::is(atty::Stream::Stderr);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if mirror {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    }
    let _ = builder.try_init();
}
