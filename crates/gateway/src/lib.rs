#![forbid(unsafe_code)]

use std::net::TcpListener;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};

use services::identity::IdentityProvider;
use services::sessions::SessionRegistry;
use services::streak_service::StreakService;

pub mod error;
pub mod routes;

pub use error::GatewayError;

/// Shared handles behind every endpoint.
///
/// The identity provider is optional: without one, login reports
/// `Unauthenticated` rather than pretending to verify anything.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub streaks: Arc<StreakService>,
    pub identity: Option<Arc<dyn IdentityProvider>>,
}

/// Register every route on an actix app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(routes::health))
        .route("/users", web::post().to(routes::create_user))
        .route("/login", web::post().to(routes::login))
        .route("/stats", web::post().to(routes::stats))
        .route("/tasks", web::post().to(routes::record_task))
        .route("/streak/reset", web::post().to(routes::reset_streak))
        .route("/frames", web::post().to(routes::submit_frame))
        .route("/session/reset", web::post().to(routes::reset_session));
}

/// Serve the API on an already-bound listener until shutdown.
///
/// # Errors
///
/// Returns the underlying I/O error if the server cannot start.
pub fn serve(state: AppState, listener: TcpListener) -> std::io::Result<actix_web::dev::Server> {
    let data = web::Data::new(state);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .configure(configure)
    })
    .listen(listener)?
    .run();
    Ok(server)
}
