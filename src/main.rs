use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info, Level};

use kpabe::abe_attribute::AbeAttribute;
use kpabe::access_tree::AccessTree;
use kpabe::crypto::{decrypt_bytes, encrypt_bytes, keygen, setup};
use kpabe::demo::{run_demo, DemoConfig};
use kpabe::encoding::KeyValueEncoding;
use kpabe::errors::AbeError;
use kpabe::models::{AbeCipherText, AbeMasterKey, AbePublicKey, AbeSecretKey};

#[derive(Parser)]
#[command(name = "kpabe", version, about = "Key-policy attribute-based encryption")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct TreeSource {
    /// Policy expression, e.g. "2 of (1, 2 of (2, 3, 4), 5)"
    #[arg(long)]
    policy: Option<String>,

    /// JSON file holding the access tree node list
    #[arg(long)]
    tree: Option<PathBuf>,
}

impl TreeSource {
    fn load(&self) -> Result<AccessTree, AbeError> {
        match (&self.policy, &self.tree) {
            (Some(policy), _) => AccessTree::from_policy(policy),
            (None, Some(path)) => AccessTree::from_json(&fs::read_to_string(path)?),
            (None, None) => Err(AbeError::configuration("no access tree given")),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Create a public key and master key for attributes 1..=N
    Setup {
        #[arg(long, default_value_t = 20)]
        attributes: u32,
        #[arg(long, default_value = "pk.properties")]
        public_key: PathBuf,
        #[arg(long, default_value = "msk.properties")]
        master_key: PathBuf,
    },
    /// Issue a secret key for an access tree
    Keygen {
        #[command(flatten)]
        tree: TreeSource,
        #[arg(long, default_value = "pk.properties")]
        public_key: PathBuf,
        #[arg(long, default_value = "msk.properties")]
        master_key: PathBuf,
        #[arg(long, default_value = "sk.properties")]
        secret_key: PathBuf,
    },
    /// Encrypt a file under a set of attributes
    Encrypt {
        #[arg(long, default_value = "pk.properties")]
        public_key: PathBuf,
        /// Comma separated attributes, e.g. 1,2,4,5
        #[arg(long, value_delimiter = ',', required = true)]
        attributes: Vec<AbeAttribute>,
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "ct.properties")]
        ciphertext: PathBuf,
    },
    /// Decrypt a ciphertext with a secret key and the tree it was issued for
    Decrypt {
        #[command(flatten)]
        tree: TreeSource,
        #[arg(long, default_value = "sk.properties")]
        secret_key: PathBuf,
        #[arg(long, default_value = "ct.properties")]
        ciphertext: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Run setup, keygen, encrypt and decrypt on DIR/input.txt
    Demo {
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<(), AbeError> {
    fs::write(path, bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "wrote output");
    Ok(())
}

fn run(command: Command) -> Result<(), AbeError> {
    let rng = &mut rand::thread_rng();

    match command {
        Command::Setup {
            attributes,
            public_key,
            master_key,
        } => {
            let (pk, msk) = setup(attributes, rng)?;
            pk.store(&public_key)?;
            msk.store(&master_key)?;
        }
        Command::Keygen {
            tree,
            public_key,
            master_key,
            secret_key,
        } => {
            let tree = tree.load()?;
            let pk = AbePublicKey::load(&public_key)?;
            let msk = AbeMasterKey::load(&master_key)?;
            keygen(&pk, &msk, &tree, rng)?.store(&secret_key)?;
        }
        Command::Encrypt {
            public_key,
            attributes,
            input,
            ciphertext,
        } => {
            let pk = AbePublicKey::load(&public_key)?;
            let plaintext = fs::read(&input)?;
            encrypt_bytes(&pk, &plaintext, &attributes, rng)?.store(&ciphertext)?;
        }
        Command::Decrypt {
            tree,
            secret_key,
            ciphertext,
            output,
        } => {
            let tree = tree.load()?;
            let sk = AbeSecretKey::load(&secret_key)?;
            let ct = AbeCipherText::load(&ciphertext)?;
            let decrypted = decrypt_bytes(&ct, &sk, &tree)?;
            write_output(&output, &decrypted.message)?;
        }
        Command::Demo { data_dir } => {
            let config = DemoConfig::with_data_dir(data_dir);
            let decrypted = run_demo(&config, rng)?;
            println!(
                "Decrypted plaintext: {}",
                String::from_utf8_lossy(&decrypted.message)
            );
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
