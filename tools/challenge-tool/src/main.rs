use challenge_common::types::*;
use challenge_common::Phase;
use challenge_engine::snapshot::{self, StoreSnapshot};
use challenge_engine::{
    audit, ChallengeService, EngineConfig, FixedClock, InMemoryCatalog, MemoryStore, VideoInfo,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

type CliResult<T = ()> = Result<T, Box<dyn Error>>;

/// Contents of the tool's TOML config file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ToolConfig {
    engine: EngineConfig,
    videos: Vec<VideoInfo>,
}

#[derive(Parser)]
#[command(name = "challenge-tool")]
#[command(about = "Run challenge lifecycle, entry and voting operations against a snapshot file")]
struct Cli {
    /// Snapshot file (default: <data dir>/challenge-tool/state.chlg)
    #[arg(long, global = true)]
    state: Option<PathBuf>,
    /// Config file (default: <config dir>/challenge-tool/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Pretend the current time is this Unix timestamp
    #[arg(long, global = true)]
    now: Option<Timestamp>,
    /// Id of the calling user
    #[arg(long = "as", global = true, default_value_t = 0)]
    caller: u64,
    #[arg(long, global = true, value_enum, default_value_t = RoleArg::Member)]
    role: RoleArg,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RoleArg {
    Member,
    Organizer,
    Moderator,
    Admin,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Member => Role::Member,
            RoleArg::Organizer => Role::Organizer,
            RoleArg::Moderator => Role::Moderator,
            RoleArg::Admin => Role::Admin,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StatusArg {
    Pending,
    Approved,
    Rejected,
}

impl From<StatusArg> for EntryStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Pending => EntryStatus::Pending,
            StatusArg::Approved => EntryStatus::Approved,
            StatusArg::Rejected => EntryStatus::Rejected,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PhaseArg {
    Draft,
    AcceptingEntries,
    Voting,
    Closed,
    Completed,
    Cancelled,
}

impl From<PhaseArg> for Phase {
    fn from(phase: PhaseArg) -> Self {
        match phase {
            PhaseArg::Draft => Phase::Draft,
            PhaseArg::AcceptingEntries => Phase::AcceptingEntries,
            PhaseArg::Voting => Phase::Voting,
            PhaseArg::Closed => Phase::Closed,
            PhaseArg::Completed => Phase::Completed,
            PhaseArg::Cancelled => Phase::Cancelled,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create a challenge in draft
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long, default_value = "")]
        rules: String,
        /// Unique hashtag, with or without the leading '#'
        #[arg(long)]
        hashtag: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        prize: Option<String>,
        #[arg(long)]
        prize_amount: Option<u64>,
        /// Unix timestamp entries open
        #[arg(long)]
        start: Timestamp,
        /// Unix timestamp entries close
        #[arg(long)]
        end: Timestamp,
        /// Unix timestamp voting closes
        #[arg(long)]
        voting_end: Option<Timestamp>,
        /// Minimum video duration in seconds
        #[arg(long)]
        min_duration: Option<u32>,
        /// Maximum video duration in seconds
        #[arg(long)]
        max_duration: Option<u32>,
        #[arg(long)]
        max_entries: Option<u32>,
    },
    /// Edit a draft challenge
    Update {
        challenge: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        hashtag: Option<String>,
        #[arg(long)]
        start: Option<Timestamp>,
        #[arg(long)]
        end: Option<Timestamp>,
        #[arg(long)]
        voting_end: Option<Timestamp>,
        #[arg(long)]
        max_entries: Option<u32>,
    },
    /// Open a draft challenge for entries
    Open { challenge: u64 },
    /// Stop accepting entries and start voting
    CloseEntries { challenge: u64 },
    /// Cancel a challenge that has not completed
    Cancel { challenge: u64 },
    /// Submit a video as the caller's entry
    Submit { challenge: u64, video: u64 },
    /// Remove an entry and every vote on it
    Remove { entry: u64 },
    /// Set the moderation status of an entry
    Moderate {
        entry: u64,
        #[arg(value_enum)]
        status: StatusArg,
    },
    /// Cast, switch or withdraw the caller's vote
    Vote { challenge: u64, entry: u64 },
    /// Print entries in leaderboard order
    Leaderboard {
        challenge: u64,
        #[arg(long, short)]
        limit: Option<u32>,
    },
    /// Rank entries and complete the challenge
    Finalize { challenge: u64 },
    /// Show one challenge, or list all of them
    Show {
        challenge: Option<u64>,
        /// Only list challenges currently in this phase
        #[arg(long, value_enum)]
        phase: Option<PhaseArg>,
    },
    /// Check the snapshot file and print its checksum
    Verify,
}

fn default_path(base: Option<PathBuf>, file: &str) -> CliResult<PathBuf> {
    let mut p = base.ok_or("Could not find a home directory for challenge-tool")?;
    p.push("challenge-tool");
    p.push(file);
    Ok(p)
}

fn load_config(path: Option<&Path>) -> CliResult<ToolConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let default = default_path(dirs::config_dir(), "config.toml")?;
            if !default.exists() {
                return Ok(ToolConfig::default());
            }
            default
        }
    };
    let config = toml::from_str(&fs::read_to_string(&path)?)?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

fn load_store(path: &Path) -> CliResult<MemoryStore> {
    if !path.exists() {
        return Ok(MemoryStore::new());
    }
    let bytes = fs::read(path)?;
    Ok(MemoryStore::restore(snapshot::decode(&bytes)?)?)
}

fn save_store(path: &Path, store: &MemoryStore) -> CliResult {
    let bytes = snapshot::encode(&store.snapshot())?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    // replace atomically
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, path)?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "saved snapshot");
    Ok(())
}

fn print_challenge(view: &challenge_engine::ChallengeView) {
    let c = &view.challenge;
    println!("#{} {} [{:?}, status {:?}]", c.id, c.title, view.phase, c.status);
    println!("  hashtag:  #{}", c.hashtag);
    println!("  window:   {} .. {}", c.start_date, c.end_date);
    if let Some(voting_end) = c.voting_end_date {
        println!("  voting:   until {voting_end}");
    }
    match c.max_entries {
        Some(max) => println!("  entries:  {}/{}", c.entries_count, max),
        None => println!("  entries:  {}", c.entries_count),
    }
    if let Some(prize) = &c.prize {
        println!("  prize:    {prize}");
    }
    if let Some(winner) = c.winner_id {
        println!("  winner:   user {winner}");
    }
}

fn print_entries(entries: &[Entry]) {
    for (i, e) in entries.iter().enumerate() {
        println!(
            "{:>4}. entry {} by user {} (video {}): {} votes, {:?}",
            e.rank.unwrap_or(i as u32 + 1),
            e.id,
            e.user_id,
            e.video_id,
            e.votes_count,
            e.status
        );
    }
}

fn verify(path: &Path) -> CliResult {
    let bytes = fs::read(path)?;
    let snapshot: StoreSnapshot = snapshot::decode(&bytes)?;
    // decode has verified the trailing sha256 of the payload
    let checksum = &bytes[bytes.len() - 32..];
    println!("Snapshot: {} ({} bytes)", path.display(), bytes.len());
    println!("Checksum: {}", bs58::encode(checksum).into_string());
    println!("Challenges: {}", snapshot.challenges.len());

    for record in &snapshot.challenges {
        if let Some(done) = &record.finalization {
            println!(
                "  #{} finalized, standings {}",
                record.challenge.id,
                bs58::encode(done.fingerprint()).into_string()
            );
        }
    }

    let violations = audit::audit(&snapshot);
    if violations.is_empty() {
        println!("Consistent");
        return Ok(());
    }
    for v in &violations {
        println!("  violation: {v}");
    }
    Err(format!("{} invariant violation(s)", violations.len()).into())
}

fn run(cli: Cli) -> CliResult {
    let state = match cli.state {
        Some(p) => p,
        None => default_path(dirs::data_dir(), "state.chlg")?,
    };
    if let Commands::Verify = cli.command {
        return verify(&state);
    }

    let config = load_config(cli.config.as_deref())?;
    let catalog: InMemoryCatalog = config.videos.into_iter().collect();
    let mut service = ChallengeService::new(load_store(&state)?, Arc::new(catalog))
        .with_config(config.engine);
    if let Some(now) = cli.now {
        service = service.with_clock(Arc::new(FixedClock::new(now)));
    }
    let caller = Caller::new(UserId(cli.caller), cli.role.into());

    let mutated = match cli.command {
        Commands::Create {
            title,
            description,
            rules,
            hashtag,
            category,
            prize,
            prize_amount,
            start,
            end,
            voting_end,
            min_duration,
            max_duration,
            max_entries,
        } => {
            let fields = NewChallenge {
                title,
                description,
                rules,
                category,
                hashtag,
                prize,
                prize_amount,
                start_date: start,
                end_date: end,
                voting_end_date: voting_end,
                min_duration,
                max_duration,
                max_entries,
            };
            let c = service.create_challenge(caller, fields)?;
            println!("Created challenge {} (#{})", c.id, c.hashtag);
            true
        }
        Commands::Update {
            challenge,
            title,
            description,
            hashtag,
            start,
            end,
            voting_end,
            max_entries,
        } => {
            let patch = ChallengePatch {
                title,
                description,
                hashtag,
                start_date: start,
                end_date: end,
                voting_end_date: voting_end.map(Some),
                max_entries: max_entries.map(Some),
                ..ChallengePatch::default()
            };
            let c = service.update_details(caller, ChallengeId(challenge), patch)?;
            println!("Updated challenge {}", c.id);
            true
        }
        Commands::Open { challenge } => {
            service.open(caller, ChallengeId(challenge))?;
            println!("Challenge {challenge} is open");
            true
        }
        Commands::CloseEntries { challenge } => {
            service.close_entries(caller, ChallengeId(challenge))?;
            println!("Challenge {challenge} is voting");
            true
        }
        Commands::Cancel { challenge } => {
            service.cancel(caller, ChallengeId(challenge))?;
            println!("Challenge {challenge} is cancelled");
            true
        }
        Commands::Submit { challenge, video } => {
            let e = service.submit_entry(ChallengeId(challenge), caller.id, VideoId(video))?;
            println!("Entry {} submitted", e.id);
            true
        }
        Commands::Remove { entry } => {
            let removed = service.remove_entry(EntryId(entry), caller)?;
            println!(
                "Entry {entry} removed with {} vote(s)",
                removed.votes_removed
            );
            true
        }
        Commands::Moderate { entry, status } => {
            let e = service.moderate_entry(EntryId(entry), caller, status.into())?;
            println!("Entry {} is {:?}", e.id, e.status);
            true
        }
        Commands::Vote { challenge, entry } => {
            let outcome =
                service.cast_or_switch_vote(ChallengeId(challenge), EntryId(entry), caller.id)?;
            match outcome {
                VoteOutcome::Recorded => println!("Vote recorded for entry {entry}"),
                VoteOutcome::Switched { from } => {
                    println!("Vote moved from entry {from} to entry {entry}")
                }
                VoteOutcome::Removed => println!("Vote withdrawn from entry {entry}"),
            }
            true
        }
        Commands::Leaderboard { challenge, limit } => {
            print_entries(&service.leaderboard(ChallengeId(challenge), limit)?);
            false
        }
        Commands::Finalize { challenge } => {
            let done = service.finalize(caller, ChallengeId(challenge))?;
            match done.winner_id {
                Some(winner) => println!("Challenge {challenge} won by user {winner}"),
                None => println!("Challenge {challenge} completed without entries"),
            }
            println!(
                "Standings: {}",
                bs58::encode(done.fingerprint()).into_string()
            );
            true
        }
        Commands::Show { challenge, phase } => {
            match challenge {
                Some(id) => {
                    let id = ChallengeId(id);
                    print_challenge(&service.challenge_view(id)?);
                    print_entries(&service.entries(id)?);
                }
                None => {
                    for view in service.challenges(phase.map(Phase::from))? {
                        print_challenge(&view);
                    }
                }
            }
            false
        }
        // checked before the store was loaded
        Commands::Verify => false,
    };

    if mutated {
        save_store(&state, service.store())?;
    }
    Ok(())
}

fn main() -> CliResult {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse())
}
