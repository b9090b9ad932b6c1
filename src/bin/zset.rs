use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::{Path, PathBuf},
};
use tracing::info;
use tracing_subscriber::EnvFilter;
use zset::{format, Config, ZSet};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Rebuild a set from `member score` lines and print its leaders.
    Replay {
        /// Input file; `-` reads stdin
        input: PathBuf,
        /// Keep only the N lowest-scored members
        #[arg(long, conflicts_with = "rev_limit")]
        limit: Option<usize>,
        /// Keep only the N highest-scored members
        #[arg(long)]
        rev_limit: Option<usize>,
        /// How many members to print
        #[arg(long, default_value_t = 10)]
        top: usize,
        /// Print in descending score order
        #[arg(long)]
        rev: bool,
        /// Seed for the level generator; overrides ZSET_SEED
        #[arg(long)]
        seed: Option<u64>,
        /// Print the whole set instead of the leaders
        #[arg(long)]
        dump: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Replay {
            input,
            limit,
            rev_limit,
            top,
            rev,
            seed,
            dump,
        } => {
            let mut config = Config::from_env().context("reading ZSET_* environment")?;
            if let Some(seed) = seed {
                config = config.with_seed(seed);
            }
            let set = ZSet::with_config(config)?;
            let entries = read_input(&input)?;
            set.add_all(entries.iter().map(|(m, s)| (m.as_str(), *s)));
            info!(lines = entries.len(), members = set.len(), "replayed input");

            let evicted = match (limit, rev_limit) {
                (Some(n), _) => set.limit(n),
                (_, Some(n)) => set.rev_limit(n),
                _ => 0,
            };
            if evicted > 0 {
                info!(evicted, "trimmed set");
            }

            let stdout = io::stdout();
            let mut out = stdout.lock();
            if dump {
                out.write_all(set.dump().as_bytes())?;
            } else {
                render_top(&set, top, rev, &mut out)?;
            }
            set.dispose();
            Ok(())
        }
    }
}

fn read_input(path: &Path) -> Result<Vec<(String, f64)>> {
    if path == Path::new("-") {
        return parse_entries(io::stdin().lock());
    }
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_entries(BufReader::new(file)).with_context(|| format!("reading {}", path.display()))
}

/// Parses `member score` lines; blank lines and `#` comments are skipped.
fn parse_entries<R: BufRead>(reader: R) -> Result<Vec<(String, f64)>> {
    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let lineno = idx + 1;
        let line = line.with_context(|| format!("line {lineno}"))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((member, score)) = line.rsplit_once(char::is_whitespace) else {
            bail!("line {lineno}: expected `member score`, got {line:?}");
        };
        let member = member.trim_end();
        let score: f64 = score
            .parse()
            .with_context(|| format!("line {lineno}: bad score {score:?}"))?;
        out.push((member.to_owned(), score));
    }
    Ok(out)
}

fn render_top<W: Write>(set: &ZSet, top: usize, rev: bool, out: &mut W) -> Result<()> {
    if top == 0 {
        return Ok(());
    }
    let top = isize::try_from(top).unwrap_or(isize::MAX);
    let rows = if rev {
        set.rev_range_with_scores(1, top)
    } else {
        set.range_with_scores(1, top)
    };
    format::with_fmt_buf(|buf| -> Result<()> {
        for (idx, (member, score)) in rows.iter().enumerate() {
            writeln!(out, "{} {member} {}", idx + 1, format::fmt_score(buf, *score))?;
        }
        Ok(())
    })
}
