use std::{process, sync::Arc};

use exambank::{
    application::error::AppError,
    cache::{CacheConfig, ListingCache, ListingParams},
    config::{self, ListingArgs},
    domain::{
        question::QuestionSummary,
        types::{QuestionId, SubjectId, UserId},
    },
    infra::{
        error::InfraError,
        redis::{self, RedisBackend},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match cli_args.command {
        config::Command::Key(args) => {
            let key = listing_params(&args.listing).key();
            println!("{key}");
            println!("{}", key.lock_key());
            Ok(())
        }
        config::Command::Show(args) => run_show(&settings, &args.listing).await,
        config::Command::Invalidate(args) => run_invalidate(&settings, args.question).await,
        config::Command::Index(args) => run_index(&settings, args.question).await,
    }
}

fn listing_params(args: &ListingArgs) -> ListingParams {
    let subject = args.subject.map(SubjectId::new);
    match args.user {
        Some(user) => ListingParams::for_user(UserId::new(user), args.page, args.size, subject),
        None => ListingParams::system(args.page, args.size, subject),
    }
}

fn connect_cache(settings: &config::Settings) -> Result<ListingCache, AppError> {
    let pool = redis::connect(&settings.redis)?;
    Ok(ListingCache::new(
        CacheConfig::from(&settings.cache),
        Arc::new(RedisBackend::new(pool)),
    ))
}

async fn run_show(settings: &config::Settings, args: &ListingArgs) -> Result<(), AppError> {
    let cache = connect_cache(settings)?;
    let key = listing_params(args).key();

    let page = cache
        .store()
        .get::<QuestionSummary>(&key)
        .await
        .map_err(InfraError::from)?;
    match page {
        Some(page) => {
            let rendered = serde_json::to_string_pretty(&page)
                .map_err(|err| AppError::unexpected(format!("failed to render page: {err}")))?;
            println!("{rendered}");
        }
        None => info!(key = %key, "No cached page"),
    }
    Ok(())
}

async fn run_invalidate(settings: &config::Settings, question: i64) -> Result<(), AppError> {
    let cache = connect_cache(settings)?;
    let targeted = cache
        .index()
        .invalidate(QuestionId::new(question))
        .await
        .map_err(InfraError::from)?;
    println!("{targeted}");
    Ok(())
}

async fn run_index(settings: &config::Settings, question: i64) -> Result<(), AppError> {
    let cache = connect_cache(settings)?;
    let keys = cache
        .index()
        .keys_for(QuestionId::new(question))
        .await
        .map_err(InfraError::from)?;
    for key in keys {
        println!("{key}");
    }
    Ok(())
}
