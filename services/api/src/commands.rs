use clap::Args;
use listing_wizard::config::AppConfig;
use listing_wizard::error::AppError;
use listing_wizard::telemetry;
use listing_wizard::wizard::{
    normalize, ContactInfo, DraftStore, ListingSchema, SubmissionCoordinator,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub(crate) struct NormalizeArgs {
    /// JSON file holding the accumulated draft (a partial object is fine)
    #[arg(long)]
    pub(crate) draft: PathBuf,
    /// Optional JSON file holding the contact details
    #[arg(long)]
    pub(crate) contact: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct SubmitArgs {
    /// JSON file holding the accumulated draft
    #[arg(long)]
    pub(crate) draft: PathBuf,
    /// JSON file holding the contact details
    #[arg(long)]
    pub(crate) contact: PathBuf,
    /// Override the configured submission endpoint
    #[arg(long)]
    pub(crate) endpoint: Option<String>,
}

pub(crate) fn run_normalize(args: NormalizeArgs) -> Result<(), AppError> {
    let schema = ListingSchema::standard();
    let mut store = DraftStore::new(&schema);
    store.update(&read_json::<Value>(&args.draft)?)?;
    let contact = match &args.contact {
        Some(path) => read_json::<ContactInfo>(path)?,
        None => ContactInfo::default(),
    };

    let normalized = normalize(&schema, &store.read(), &contact);
    println!("{}", serde_json::to_string_pretty(&normalized)?);
    Ok(())
}

pub(crate) async fn run_submit(args: SubmitArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(endpoint) = args.endpoint {
        config.submission.endpoint = endpoint;
    }
    telemetry::init(&config.telemetry)?;

    let schema = ListingSchema::standard();
    let mut store = DraftStore::new(&schema);
    store.update(&read_json::<Value>(&args.draft)?)?;
    let contact = read_json::<ContactInfo>(&args.contact)?;

    let coordinator = SubmissionCoordinator::from_config(&config.submission, config.environment);
    let outcome = coordinator.submit(&store.read(), &contact).await?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    println!("{}", outcome.user_message());
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
