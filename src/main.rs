use std::{future::IntoFuture, process, sync::Arc};

use tokio::{sync::watch, try_join};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use yatube::{
    application::{
        accounts::{AccountsService, CreateGroupCommand},
        error::AppError,
        follows::FollowService,
        listing::ListingService,
        posts::PostService,
        repos::{
            CommentsRepo, FollowsRepo, GroupsRepo, PostsRepo, PostsWriteRepo, SessionsRepo,
            StoreHealth, UsersRepo,
        },
        sessions::SessionService,
    },
    cache::{PageCacheConfig, PageCacheState},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AdminState, HttpState},
        telemetry,
    },
};

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

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
        config::Command::Groups(args) => run_groups(settings, args).await,
        config::Command::Users(args) => run_users(settings, args).await,
        config::Command::Sessions(args) => run_sessions(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings, true).await?;
    let app = build_application_context(repositories, &settings);
    serve_http(&settings, app.http_state, app.admin_state).await
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    init_repositories(&settings, true).await?;
    info!(target = "yatube::migrate", "migrations applied");
    Ok(())
}

async fn run_groups(settings: config::Settings, args: config::GroupsArgs) -> Result<(), AppError> {
    let repositories = init_repositories(&settings, false).await?;
    let accounts = accounts_service(&repositories);

    match args.command {
        config::GroupsCommand::Create(create) => {
            let group = accounts
                .create_group(CreateGroupCommand {
                    title: create.title,
                    slug: create.slug,
                    description: create.description,
                })
                .await?;
            println!("{}\t{}\t{}", group.id, group.slug, group.title);
        }
    }
    Ok(())
}

async fn run_users(settings: config::Settings, args: config::UsersArgs) -> Result<(), AppError> {
    let repositories = init_repositories(&settings, false).await?;
    let accounts = accounts_service(&repositories);

    match args.command {
        config::UsersCommand::Create(create) => {
            let user = accounts.create_user(&create.username).await?;
            println!("{}\t{}", user.id, user.username);
        }
    }
    Ok(())
}

async fn run_sessions(
    settings: config::Settings,
    args: config::SessionsArgs,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings, false).await?;
    let sessions_repo: Arc<dyn SessionsRepo> = repositories.clone();
    let users_repo: Arc<dyn UsersRepo> = repositories;
    let sessions = SessionService::new(sessions_repo, users_repo);

    match args.command {
        config::SessionsCommand::Issue(issue) => {
            let ttl = issue
                .ttl_hours
                .map(|hours| time::Duration::hours(i64::from(hours)));
            let issued = sessions.issue(&issue.username, ttl).await?;
            println!("{}", issued.token);
        }
    }
    Ok(())
}

fn accounts_service(repositories: &Arc<PostgresRepositories>) -> AccountsService {
    let users_repo: Arc<dyn UsersRepo> = repositories.clone();
    let groups_repo: Arc<dyn GroupsRepo> = repositories.clone();
    AccountsService::new(users_repo, groups_repo)
}

async fn init_repositories(
    settings: &config::Settings,
    migrate: bool,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))?;

    let pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(InfraError::from)?;

    if migrate {
        PostgresRepositories::run_migrations(&pool)
            .await
            .map_err(InfraError::from)?;
    }

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

struct ApplicationContext {
    http_state: HttpState,
    admin_state: AdminState,
}

fn build_application_context(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> ApplicationContext {
    let users_repo: Arc<dyn UsersRepo> = repositories.clone();
    let groups_repo: Arc<dyn GroupsRepo> = repositories.clone();
    let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
    let posts_write_repo: Arc<dyn PostsWriteRepo> = repositories.clone();
    let comments_repo: Arc<dyn CommentsRepo> = repositories.clone();
    let follows_repo: Arc<dyn FollowsRepo> = repositories.clone();
    let sessions_repo: Arc<dyn SessionsRepo> = repositories.clone();
    let store: Arc<dyn StoreHealth> = repositories;

    let follows = Arc::new(FollowService::new(follows_repo, users_repo.clone()));
    let listing = Arc::new(ListingService::new(
        posts_repo.clone(),
        groups_repo.clone(),
        users_repo.clone(),
        follows.clone(),
    ));
    let posts = Arc::new(PostService::new(
        posts_repo,
        posts_write_repo,
        comments_repo,
        groups_repo,
    ));
    let sessions = Arc::new(SessionService::new(sessions_repo, users_repo));

    let cache_config = PageCacheConfig::from(&settings.cache);
    let page_cache = cache_config
        .enabled
        .then(|| PageCacheState::new(cache_config));

    let admin_state = AdminState {
        cache: page_cache.as_ref().map(|state| state.pages.clone()),
        store,
    };
    let http_state = HttpState {
        listing,
        posts,
        follows,
        sessions,
        auth: settings.auth.clone(),
        page_cache,
    };

    ApplicationContext {
        http_state,
        admin_state,
    }
}

async fn serve_http(
    settings: &config::Settings,
    http_state: HttpState,
    admin_state: AdminState,
) -> Result<(), AppError> {
    let public_router = http::build_router(http_state);
    let admin_router = http::build_admin_router(admin_state);

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(InfraError::from)?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(InfraError::from)?;

    info!(
        target = "yatube::serve",
        public = %settings.server.public_addr,
        admin = %settings.server.admin_addr,
        "listening"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let public_server = axum::serve(public_listener, public_router.into_make_service())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()));
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx));

    let mut servers = tokio::spawn(async move {
        try_join!(public_server.into_future(), admin_server.into_future()).map(|_| ())
    });

    tokio::select! {
        joined = &mut servers => return server_result(joined),
        () = shutdown_signal() => {}
    }

    info!(target = "yatube::serve", "shutdown requested, draining connections");
    let _ = shutdown_tx.send(true);

    match tokio::time::timeout(settings.server.graceful_shutdown, servers).await {
        Ok(joined) => server_result(joined),
        Err(_) => {
            warn!(
                target = "yatube::serve",
                timeout_secs = settings.server.graceful_shutdown.as_secs(),
                "graceful shutdown timed out"
            );
            Ok(())
        }
    }
}

fn server_result(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(AppError::from(InfraError::from(err))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
