use bio::io::fasta;
use clap::Parser;
use phmmfb::{
    alphabet::{Alphabet, AlphabetType},
    common::NamedSequence,
    config::SearchConfig,
    dp::TaskStatus,
    hmm::{CoreHmm, HmmParams},
    search::{build_model, score_all, Hit},
};

#[derive(Parser, Debug)]
struct Opts {
    /// consensus sequence the model is built from
    #[clap(long, conflicts_with = "model")]
    consensus: Option<String>,
    /// core model in json
    #[clap(long)]
    model: Option<std::path::PathBuf>,
    #[clap(long, default_value = "dna")]
    alphabet: AlphabetType,
    #[clap(long)]
    config: Option<std::path::PathBuf>,
    /// error rate of the consensus-derived model
    #[clap(long, default_value = "0.01")]
    error_rate: f64,
    /// print the optimized profile before scoring
    #[clap(long)]
    dump: bool,
    fasta: std::path::PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let opts: Opts = Opts::parse();
    println!("# started_at={}", chrono::Local::now());
    println!("# opts={:?}", opts);

    let config = match &opts.config {
        Some(path) => SearchConfig::from_json_file(path)?,
        None => SearchConfig::default(),
    };
    println!("# config={}", config);

    let hmm = match (&opts.consensus, &opts.model) {
        (Some(consensus), _) => {
            let abc = Alphabet::new(opts.alphabet);
            CoreHmm::from_consensus(
                &abc,
                consensus.as_bytes(),
                &HmmParams::uniform(opts.error_rate),
            )?
        }
        (None, Some(path)) => {
            let file = std::fs::File::open(path)?;
            let hmm: CoreHmm = serde_json::from_reader(file)?;
            hmm.validate(1e-4)?;
            hmm
        }
        (None, None) => return Err("either --consensus or --model is required".into()),
    };
    let om = build_model(&hmm, &config)?;
    if opts.dump {
        println!("{}", om);
    }

    let reader = fasta::Reader::from_file(&opts.fasta)?;
    let mut seqs = Vec::new();
    for record in reader.records() {
        let record = record?;
        seqs.push(NamedSequence::new(record.id(), record.seq().to_vec()));
    }

    let hits = score_all(&om, &seqs, &config, &TaskStatus::new())?;
    println!("{}", Hit::tsv_header());
    for (seq, hit) in seqs.iter().zip(hits.iter()) {
        match hit {
            Ok(hit) => println!("{}", hit),
            Err(e) => println!("{}\t{}\tERROR\t{}", seq.name, seq.len(), e),
        }
    }

    println!("# finished_at={}", chrono::Local::now());
    Ok(())
}
