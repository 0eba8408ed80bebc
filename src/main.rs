use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use facegate::{
    auth::{LoginAttempt, Rejection},
    common::{setup_logging, Config, Paths},
    core::{annotate_faces, decode_image, OnnxExtractor, SignatureExtractor},
    service::ServiceClient,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

const TOKEN_ENV: &str = "FACEGATE_TOKEN";

#[derive(Parser)]
#[command(name = "facegate")]
#[command(about = "Password and face login against a FaceGate service")]
struct Cli {
    /// Enable development mode (local config, data and socket)
    #[arg(long, global = true)]
    dev: bool,

    /// Socket of a running facegate-service
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with username and password
    Login {
        #[arg(short, long)]
        username: String,
        /// Read from stdin when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Log in with a face image
    FaceLogin {
        image: PathBuf,
        /// Only compare against this user
        #[arg(short, long)]
        username: Option<String>,
    },
    /// Print the face signature of an image as JSON
    Extract {
        image: PathBuf,
    },
    /// Register a user from one or more face images (admin session required)
    Enroll {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: Option<String>,
        /// Admin session token; defaults to $FACEGATE_TOKEN
        #[arg(long)]
        token: Option<String>,
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Run face detection locally and write an annotated copy of the image
    Detect {
        image: PathBuf,
        #[arg(short, long, default_value = "detections.png")]
        output: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.dev, None)?;

    let paths = Paths::new(cli.dev, false)?;
    let socket = cli.socket.clone().unwrap_or_else(|| paths.socket_path());
    let client = ServiceClient::new(&socket);

    match cli.command {
        Commands::Login { username, password } => {
            let password = password_or_prompt(password)?;
            report_login(client.password_login(&username, &password)?)
        }
        Commands::FaceLogin { image, username } => {
            let bytes = read_image(&image)?;
            report_login(client.face_login(bytes, username.as_deref())?)
        }
        Commands::Extract { image } => {
            match client.extract_signature(read_image(&image)?)? {
                Ok(signature) => {
                    println!("{}", serde_json::to_string(&signature)?);
                    Ok(())
                }
                Err(rejection) => bail!("No signature: {}", rejection),
            }
        }
        Commands::Enroll { username, password, token, images } => {
            let token = token
                .or_else(|| std::env::var(TOKEN_ENV).ok())
                .context("An admin token is required (--token or $FACEGATE_TOKEN)")?;
            let password = password_or_prompt(password)?;

            let mut signatures = Vec::with_capacity(images.len());
            for path in &images {
                match client.extract_signature(read_image(path)?)? {
                    Ok(signature) => {
                        println!("✅ {}", path.display());
                        signatures.push(signature);
                    }
                    Err(rejection) => bail!("{}: {}", path.display(), rejection),
                }
            }

            let registered = client.register(&token, &username, &password, signatures)?;
            println!("Registered '{}' with {} signature(s)", registered, images.len());
            Ok(())
        }
        Commands::Detect { image, output, config } => {
            let config_path = config.unwrap_or_else(|| paths.config_file());
            let config = Config::load_from_path(&config_path)?;
            let extractor = OnnxExtractor::new(&config, paths.models_dir().as_deref())?;

            let img = decode_image(&read_image(&image)?)?;
            let faces = extractor.locate_faces(&img)?;
            for (i, face) in faces.iter().enumerate() {
                println!(
                    "Face {}: ({:.0}, {:.0}) - ({:.0}, {:.0}), confidence {:.3}",
                    i + 1, face.x1, face.y1, face.x2, face.y2, face.confidence
                );
            }

            annotate_faces(&img, &faces)
                .save(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("{} face(s) found, saved {}", faces.len(), output.display());
            Ok(())
        }
    }
}

fn read_image(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn password_or_prompt(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    print!("Password: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn report_login(attempt: LoginAttempt) -> Result<()> {
    match attempt {
        Ok(outcome) => {
            match outcome.similarity {
                Some(similarity) => println!("✅ Logged in as {} ({:.2}%)", outcome.username, similarity),
                None => println!("✅ Logged in as {}", outcome.username),
            }
            println!("{}", outcome.token);
            Ok(())
        }
        Err(Rejection::NoMatch) => bail!("❌ Face not recognized"),
        Err(rejection) => bail!("❌ Login rejected: {}", rejection),
    }
}
