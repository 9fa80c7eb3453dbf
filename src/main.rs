use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use seq_io::fasta::{self, Record as _};
use seq_io::fastq::{self, Record as _};
use tracing::info;
use tracing_subscriber::EnvFilter;

use unikmer::ops::{
    self, CountOptions, DiffOptions, UniqsOptions, DEFAULT_CHECK_INTERVAL, STDIO,
};
use unikmer::{Input, Reader, SequenceRecord, SequenceSource};

/// Extension appended to binary outputs
const EXT_DATA_FILE: &str = ".unik";

type BoxedRead = Box<dyn Read + Send>;

#[derive(Parser)]
#[command(author, version, about = "Binary k-mer sets and set operations", long_about = None)]
struct Cli {
    /// Print progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Count the distinct k-mers of FASTA/FASTQ sequences
    Count(CountArgs),
    /// Union of multiple binary files
    Union(UnionArgs),
    /// Codes of the first binary file absent from all the others
    Diff(DiffArgs),
    /// Genome regions covered by k-mers that map only once
    Uniqs(UniqsArgs),
    /// Print the k-mers of binary files, one per line
    View(ViewArgs),
    /// Print the header of binary files
    Info(InfoArgs),
}

#[derive(Args)]
struct Output {
    /// Out file prefix ("-" for stdout)
    #[arg(short = 'o', long, default_value = STDIO)]
    out_prefix: String,
}

#[derive(Args)]
struct CountArgs {
    /// Input FASTA/FASTQ files, optionally compressed ("-" for stdin)
    files: Vec<String>,

    #[command(flatten)]
    output: Output,

    /// k-mer length
    #[arg(short, long = "kmer-len", value_parser = clap::value_parser!(u8).range(1..=32))]
    k: u8,

    /// Circular genome
    #[arg(long)]
    circular: bool,

    /// Only keep the canonical k-mers
    #[arg(short = 'K', long)]
    canonical: bool,

    /// Sort the k-mers
    #[arg(short, long)]
    sort: bool,

    /// Write the compact representation
    #[arg(short, long)]
    compact: bool,
}

#[derive(Args)]
struct UnionArgs {
    /// Input binary files ("-" for stdin)
    files: Vec<String>,

    #[command(flatten)]
    output: Output,

    /// Write the compact representation
    #[arg(short, long)]
    compact: bool,
}

#[derive(Args)]
struct DiffArgs {
    /// Input binary files, the first one is the minuend ("-" for stdin)
    files: Vec<String>,

    #[command(flatten)]
    output: Output,

    /// Sweep k-mers found elsewhere every N files
    #[arg(short = 'i', long, default_value_t = DEFAULT_CHECK_INTERVAL)]
    check_interval: usize,

    /// Write the compact representation
    #[arg(short, long)]
    compact: bool,
}

#[derive(Args)]
struct UniqsArgs {
    /// Input binary files ("-" for stdin)
    files: Vec<String>,

    #[command(flatten)]
    output: Output,

    /// Genome in (compressed) FASTA/FASTQ
    #[arg(short, long)]
    genome: String,

    /// Circular genome
    #[arg(long)]
    circular: bool,

    /// Minimum length of a region
    #[arg(short, long, default_value_t = 200)]
    min_len: usize,

    /// Allow k-mers mapped to multiple genome positions
    #[arg(short = 'M', long = "allow-multiple-mapped-kmer")]
    allow_multiple_mapped: bool,

    /// Write FASTA instead of BED3
    #[arg(short = 'a', long)]
    output_fasta: bool,
}

#[derive(Args)]
struct ViewArgs {
    /// Input binary files ("-" for stdin)
    files: Vec<String>,

    #[command(flatten)]
    output: Output,

    /// Print the integer codes next to the k-mers
    #[arg(long)]
    show_code: bool,
}

#[derive(Args)]
struct InfoArgs {
    /// Input binary files ("-" for stdin)
    files: Vec<String>,
}

/// Opens a possibly compressed file, `-` reads stdin
fn open(path: &str) -> io::Result<BoxedRead> {
    let (reader, _format) = if path == STDIO {
        niffler::send::get_reader(Box::new(io::stdin()))
    } else {
        niffler::send::from_path(path)
    }
    .map_err(|e| io::Error::other(format!("{path}: {e}")))?;
    Ok(reader)
}

fn open_binary(path: &str) -> unikmer::Result<Input<BufReader<BoxedRead>>> {
    Ok(Input::new(path, BufReader::new(open(path)?)))
}

/// FASTA or FASTQ reader, chosen by the first byte of the stream
enum FastxReader {
    Fasta(fasta::Reader<BufReader<BoxedRead>>),
    Fastq(fastq::Reader<BufReader<BoxedRead>>),
}
impl FastxReader {
    fn from_path(path: &str) -> unikmer::Result<Self> {
        let mut reader = BufReader::new(open(path)?);
        let first = reader.fill_buf()?.first().copied();
        Ok(match first {
            Some(b'@') => Self::Fastq(fastq::Reader::new(reader)),
            _ => Self::Fasta(fasta::Reader::new(reader)),
        })
    }
}
impl SequenceSource for FastxReader {
    fn next_record(&mut self) -> Option<unikmer::Result<SequenceRecord>> {
        match self {
            Self::Fasta(reader) => reader.next().map(|record| -> unikmer::Result<_> {
                let record = record.map_err(io::Error::other)?;
                let id = record.id().map_err(invalid_data)?;
                Ok(SequenceRecord::new(id, record.full_seq()))
            }),
            Self::Fastq(reader) => reader.next().map(|record| -> unikmer::Result<_> {
                let record = record.map_err(io::Error::other)?;
                let id = record.id().map_err(invalid_data)?;
                Ok(SequenceRecord::new(id, record.seq()))
            }),
        }
    }
}

fn invalid_data(e: std::str::Utf8Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e)
}

/// Creates the output, `-` writes stdout
///
/// Binary outputs get [`EXT_DATA_FILE`] appended.
fn create(out_prefix: &str, binary: bool) -> Result<Box<dyn Write>> {
    if out_prefix == STDIO {
        return Ok(Box::new(BufWriter::new(io::stdout().lock())));
    }
    let path = if binary {
        format!("{out_prefix}{EXT_DATA_FILE}")
    } else {
        out_prefix.to_string()
    };
    let file = File::create(&path).with_context(|| format!("failed to create {path}"))?;
    Ok(Box::new(BufWriter::new(file)))
}

/// Positional files, stdin when none are given
fn files_or_stdin(files: Vec<String>) -> Vec<String> {
    if files.is_empty() {
        vec![STDIO.to_string()]
    } else {
        files
    }
}

fn count(args: CountArgs) -> Result<()> {
    let files = files_or_stdin(args.files);
    let out = create(&args.output.out_prefix, true)?;
    let options = CountOptions::new(usize::from(args.k))
        .circular(args.circular)
        .canonical(args.canonical)
        .sort(args.sort)
        .compact(args.compact);
    let summary = ops::count(
        files.iter().map(|path| {
            info!("reading sequence file: {path}");
            FastxReader::from_path(path)
        }),
        out,
        options,
    )?;
    info!(
        "{} unique k-mers saved from {} sequences",
        summary.written, summary.n_records
    );
    Ok(())
}

fn union(args: UnionArgs) -> Result<()> {
    let files = files_or_stdin(args.files);
    let out = create(&args.output.out_prefix, true)?;
    ops::union(files.iter().map(|path| open_binary(path)), out, args.compact)?;
    Ok(())
}

fn diff(args: DiffArgs) -> Result<()> {
    let files = files_or_stdin(args.files);
    let out = create(&args.output.out_prefix, true)?;
    let options = DiffOptions::default()
        .check_interval(args.check_interval)
        .compact(args.compact);
    ops::diff(files.iter().map(|path| open_binary(path)), out, options)?;
    Ok(())
}

fn uniqs(args: UniqsArgs) -> Result<()> {
    let files = files_or_stdin(args.files);
    if args.genome == STDIO {
        if files.iter().any(|path| path == STDIO) {
            bail!("stdin can not be used for both the genome and k-mer files");
        }
        if !args.allow_multiple_mapped {
            bail!("the genome is read twice, it can not come from stdin without -M");
        }
    }
    let out = create(&args.output.out_prefix, false)?;
    let options = UniqsOptions::default()
        .min_len(args.min_len)
        .circular(args.circular)
        .allow_multiple_mapped(args.allow_multiple_mapped)
        .output_fasta(args.output_fasta);
    let genome = args.genome;
    let summary = ops::uniqs(
        files.iter().map(|path| open_binary(path)),
        || FastxReader::from_path(&genome),
        out,
        options,
    )?;
    info!("{} regions found", summary.n_regions);
    Ok(())
}

fn view(args: ViewArgs) -> Result<()> {
    let files = files_or_stdin(args.files);
    let mut out = create(&args.output.out_prefix, false)?;
    let mut dbuf = Vec::new();
    let mut ibuf = itoa::Buffer::new();
    for path in &files {
        let input = open_binary(path)?;
        let reader = Reader::new(input.reader).with_context(|| format!("failed to read {path}"))?;
        for kmer in reader {
            let kmer = kmer.with_context(|| format!("failed to read {path}"))?;
            dbuf.clear();
            kmer.decode_into(&mut dbuf);
            out.write_all(&dbuf)?;
            if args.show_code {
                out.write_all(b"\t")?;
                out.write_all(ibuf.format(kmer.code()).as_bytes())?;
            }
            out.write_all(b"\n")?;
        }
    }
    out.flush()?;
    Ok(())
}

fn info(args: InfoArgs) -> Result<()> {
    let files = files_or_stdin(args.files);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for path in &files {
        let input = open_binary(path)?;
        let reader = Reader::new(input.reader).with_context(|| format!("failed to read {path}"))?;
        writeln!(out, "{path}: {}", reader.header())?;
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_env("UNIKMER_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Count(args) => count(args),
        Command::Union(args) => union(args),
        Command::Diff(args) => diff(args),
        Command::Uniqs(args) => uniqs(args),
        Command::View(args) => view(args),
        Command::Info(args) => info(args),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
