use actix_web::web::{Data, Json};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use services::streak_service::UserStats;
use trace_core::model::{Point, ShapeName, TaskId, TaskOutcome, UserId};

use crate::AppState;
use crate::error::GatewayError;
use services::sessions::TracePlan;

//
// ─── BODIES ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
pub struct CreateUserBody {
    /// Explicit id (e.g. from an external identity provider); minted when
    /// absent.
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserBody {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TaskBody {
    pub user_id: String,
    pub task: String,
}

#[derive(Debug, Deserialize)]
pub struct FrameBody {
    pub user_id: String,
    /// The pose detector's fingertip for this frame, absent when no hand was
    /// seen. Pixels never reach this service.
    pub point: Option<Point>,
}

#[derive(Debug, Deserialize)]
pub struct ResetSessionBody {
    pub user_id: String,
    pub shape: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

//
// ─── RESPONSES ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedUserDto {
    pub user_id: String,
    pub streak: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginDto {
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskDto {
    pub streak: u32,
    pub completed_tasks: Vec<TaskId>,
    pub credited_today: bool,
}

//
// ─── VALIDATION ────────────────────────────────────────────────────────────────
//

fn parse_user(raw: &str) -> Result<UserId, GatewayError> {
    UserId::new(raw).map_err(|e| GatewayError::InvalidInput(e.to_string()))
}

fn parse_task(raw: &str) -> Result<TaskId, GatewayError> {
    TaskId::new(raw).map_err(|e| GatewayError::InvalidInput(e.to_string()))
}

fn parse_shape(raw: &str) -> Result<ShapeName, GatewayError> {
    ShapeName::new(raw).map_err(|e| GatewayError::InvalidInput(e.to_string()))
}

//
// ─── HANDLERS ──────────────────────────────────────────────────────────────────
//

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub async fn create_user(
    state: Data<AppState>,
    body: Json<CreateUserBody>,
) -> Result<Json<CreatedUserDto>, GatewayError> {
    let user = match &body.user_id {
        Some(raw) => parse_user(raw)?,
        None => UserId::random(),
    };

    let stats = state.streaks.create_user(&user).await?;
    tracing::info!("created user {user}");
    Ok(Json(CreatedUserDto {
        user_id: user.to_string(),
        streak: stats.streak,
    }))
}

pub async fn login(
    state: Data<AppState>,
    body: Json<LoginBody>,
) -> Result<Json<LoginDto>, GatewayError> {
    let Some(identity) = &state.identity else {
        tracing::warn!("login attempted with no identity provider configured");
        return Err(services::error::IdentityError::Unauthenticated.into());
    };

    let user = identity.verify(&body.email, &body.password).await?;
    tracing::info!("login verified for {user}");
    Ok(Json(LoginDto {
        user_id: user.to_string(),
    }))
}

pub async fn stats(
    state: Data<AppState>,
    body: Json<UserBody>,
) -> Result<Json<UserStats>, GatewayError> {
    let user = parse_user(&body.user_id)?;
    let stats = state.streaks.stats(&user).await?;
    Ok(Json(stats))
}

pub async fn record_task(
    state: Data<AppState>,
    body: Json<TaskBody>,
) -> Result<Json<TaskDto>, GatewayError> {
    let user = parse_user(&body.user_id)?;
    let task = parse_task(&body.task)?;

    let progress = state.streaks.record_task(&user, task).await?;
    let credited_today = !matches!(progress.outcome, TaskOutcome::Pending { .. });
    if matches!(
        progress.outcome,
        TaskOutcome::Extended | TaskOutcome::Started
    ) {
        tracing::info!("streak credited for {user}: now {}", progress.streak);
    }

    Ok(Json(TaskDto {
        streak: progress.streak,
        completed_tasks: progress.completed_tasks,
        credited_today,
    }))
}

pub async fn reset_streak(
    state: Data<AppState>,
    body: Json<UserBody>,
) -> Result<Json<UserStats>, GatewayError> {
    let user = parse_user(&body.user_id)?;
    let stats = state.streaks.reset_streak(&user).await?;
    tracing::info!("streak reset for {user}");
    Ok(Json(stats))
}

pub async fn submit_frame(
    state: Data<AppState>,
    body: Json<FrameBody>,
) -> Result<Json<TracePlan>, GatewayError> {
    let user = parse_user(&body.user_id)?;
    let plan = state.registry.advance(&user, body.point);
    tracing::debug!(
        "frame for {user}: {}/{} on {}",
        plan.progress,
        plan.total,
        plan.shape_name
    );
    Ok(Json(plan))
}

pub async fn reset_session(
    state: Data<AppState>,
    body: Json<ResetSessionBody>,
) -> Result<Json<TracePlan>, GatewayError> {
    let user = parse_user(&body.user_id)?;
    let shape = body.shape.as_deref().map(parse_shape).transpose()?;

    let plan = state.registry.reset(&user, shape.as_ref())?;
    tracing::info!("session reset for {user}: tracing {}", plan.shape_name);
    Ok(Json(plan))
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configure;

    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use async_trait::async_trait;

    use services::error::IdentityError;
    use services::identity::IdentityProvider;
    use services::sessions::SessionRegistry;
    use services::streak_service::StreakService;
    use storage::repository::InMemoryUserStore;
    use trace_core::catalog::ShapeCatalog;
    use trace_core::time::fixed_clock;

    struct SingleUserIdentity;

    #[async_trait]
    impl IdentityProvider for SingleUserIdentity {
        async fn verify(&self, email: &str, password: &str) -> Result<UserId, IdentityError> {
            if email == "det@precinct.example" && password == "hunch" {
                Ok(UserId::new("det-1").unwrap())
            } else {
                Err(IdentityError::Unauthenticated)
            }
        }
    }

    fn state(identity: Option<Arc<dyn IdentityProvider>>) -> AppState {
        let store = InMemoryUserStore::new();
        AppState {
            registry: Arc::new(SessionRegistry::with_seed(
                Arc::new(ShapeCatalog::builtin()),
                11,
            )),
            streaks: Arc::new(StreakService::new(Arc::new(store)).with_clock(fixed_clock())),
            identity,
        }
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(Data::new($state))
                    .configure(configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn health_reports_healthy() {
        let app = app!(state(None));
        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request())
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "healthy");
    }

    #[actix_web::test]
    async fn create_user_then_duplicate_conflicts() {
        let app = app!(state(None));

        let req = test::TestRequest::post()
            .uri("/users")
            .set_json(json!({ "user_id": "alice" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let created: CreatedUserDto = test::read_body_json(resp).await;
        assert_eq!(created.user_id, "alice");
        assert_eq!(created.streak, 0);

        let req = test::TestRequest::post()
            .uri("/users")
            .set_json(json!({ "user_id": "alice" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn create_user_without_id_mints_one() {
        let app = app!(state(None));
        let req = test::TestRequest::post()
            .uri("/users")
            .set_json(json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let created: CreatedUserDto = test::read_body_json(resp).await;
        assert!(!created.user_id.is_empty());
    }

    #[actix_web::test]
    async fn blank_user_id_is_a_bad_request() {
        let app = app!(state(None));
        let req = test::TestRequest::post()
            .uri("/stats")
            .set_json(json!({ "user_id": "  " }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn stats_for_unknown_user_is_not_found() {
        let app = app!(state(None));
        let req = test::TestRequest::post()
            .uri("/stats")
            .set_json(json!({ "user_id": "ghost" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn five_tasks_credit_a_streak_over_http() {
        let app = app!(state(None));

        let req = test::TestRequest::post()
            .uri("/users")
            .set_json(json!({ "user_id": "alice" }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::OK
        );

        let mut last: Option<TaskDto> = None;
        for name in ["recall", "focus", "motor", "speech", "vision"] {
            let req = test::TestRequest::post()
                .uri("/tasks")
                .set_json(json!({ "user_id": "alice", "task": name }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
            last = Some(test::read_body_json(resp).await);
        }

        let last = last.unwrap();
        assert_eq!(last.streak, 1);
        assert!(last.credited_today);
        assert_eq!(last.completed_tasks.len(), 5);

        let req = test::TestRequest::post()
            .uri("/stats")
            .set_json(json!({ "user_id": "alice" }))
            .to_request();
        let stats: UserStats = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(stats.streak, 1);

        let req = test::TestRequest::post()
            .uri("/streak/reset")
            .set_json(json!({ "user_id": "alice" }))
            .to_request();
        let stats: UserStats = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(stats.streak, 0);
        assert!(stats.completed_tasks.is_empty());
    }

    #[actix_web::test]
    async fn frames_drive_a_session_to_completion() {
        let app = app!(state(None));

        let req = test::TestRequest::post()
            .uri("/session/reset")
            .set_json(json!({ "user_id": "alice", "shape": "square" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let plan: TracePlan = test::read_body_json(resp).await;
        assert_eq!(plan.shape_name.as_str(), "square");
        assert_eq!(plan.progress, 0);

        let corners = [(200, 120), (440, 120), (440, 360), (200, 360)];
        let mut last: Option<TracePlan> = None;
        for (x, y) in corners {
            let req = test::TestRequest::post()
                .uri("/frames")
                .set_json(json!({ "user_id": "alice", "point": { "x": x, "y": y } }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
            last = Some(test::read_body_json(resp).await);
        }

        let plan = last.unwrap();
        assert!(plan.completed);
        assert_eq!(plan.progress, 4);
    }

    #[actix_web::test]
    async fn empty_frame_is_valid_input() {
        let app = app!(state(None));
        let req = test::TestRequest::post()
            .uri("/frames")
            .set_json(json!({ "user_id": "alice", "point": null }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let plan: TracePlan = test::read_body_json(resp).await;
        assert_eq!(plan.progress, 0);
        assert!(!plan.completed);
    }

    #[actix_web::test]
    async fn reset_to_unknown_shape_is_not_found() {
        let app = app!(state(None));
        let req = test::TestRequest::post()
            .uri("/session/reset")
            .set_json(json!({ "user_id": "alice", "shape": "heptagon" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn login_without_a_provider_is_unauthorized() {
        let app = app!(state(None));
        let req = test::TestRequest::post()
            .uri("/login")
            .set_json(json!({ "email": "det@precinct.example", "password": "hunch" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn login_passes_through_the_identity_provider() {
        let app = app!(state(Some(Arc::new(SingleUserIdentity))));

        let req = test::TestRequest::post()
            .uri("/login")
            .set_json(json!({ "email": "det@precinct.example", "password": "hunch" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let login: LoginDto = test::read_body_json(resp).await;
        assert_eq!(login.user_id, "det-1");

        let req = test::TestRequest::post()
            .uri("/login")
            .set_json(json!({ "email": "det@precinct.example", "password": "wrong" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
