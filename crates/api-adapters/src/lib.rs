//! # api-adapters
//!
//! The web routing and orchestration layer for the idea board.
//!
//! | Route                              | Handler                       |
//! |------------------------------------|-------------------------------|
//! | `GET    {base}/ideas`              | [`handlers::list_ideas`]      |
//! | `POST   {base}/ideas`              | [`handlers::create_idea`]     |
//! | `PATCH  {base}/ideas/{id}`         | [`handlers::update_idea`]     |
//! | `DELETE {base}/ideas/{id}`         | [`handlers::delete_idea`]     |
//! | `GET    {base}/messages?idea_id=`  | [`handlers::list_messages`]   |
//! | `POST   {base}/messages`           | [`handlers::post_message`]    |
//! | `GET    {base}/realtime/ideas`     | [`realtime::board_events`]    |
//! | `GET    {base}/realtime/messages`  | [`realtime::thread_events`]   |
//! | `GET    /healthz`, `GET /metrics`  | operational endpoints         |

pub mod metrics;

#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod extract;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod middleware;
#[cfg(feature = "web-axum")]
pub mod realtime;

#[cfg(feature = "web-axum")]
pub use handlers::AppState;
#[cfg(feature = "web-axum")]
pub use routes::{router, RouterConfig};

#[cfg(feature = "web-axum")]
mod routes {
    use axum::routing::{get, patch};
    use axum::Router;
    use tower::ServiceBuilder;

    use crate::handlers::{self, AppState};
    use crate::{middleware, realtime};

    #[derive(Debug, Clone)]
    pub struct RouterConfig {
        /// Mount point of the API routes, e.g. `/api`. Empty mounts at the root.
        pub base_path: String,
        pub cors_permissive: bool,
    }

    impl Default for RouterConfig {
        fn default() -> Self {
            Self {
                base_path: "/api".to_string(),
                cors_permissive: true,
            }
        }
    }

    /// Builds the full application router.
    ///
    /// The base path allows the binary to mount the API under a different
    /// prefix (e.g. `/api/v1`) without touching the handlers.
    pub fn router(state: AppState, config: &RouterConfig) -> Router {
        let api = Router::new()
            .route("/ideas", get(handlers::list_ideas).post(handlers::create_idea))
            .route(
                "/ideas/{id}",
                patch(handlers::update_idea).delete(handlers::delete_idea),
            )
            .route(
                "/messages",
                get(handlers::list_messages).post(handlers::post_message),
            )
            .route("/realtime/ideas", get(realtime::board_events))
            .route("/realtime/messages", get(realtime::thread_events));

        let app = if config.base_path.is_empty() {
            api
        } else {
            Router::new().nest(&config.base_path, api)
        };

        app.route("/healthz", get(handlers::health))
            .route("/metrics", get(handlers::metrics))
            .layer(axum::middleware::from_fn_with_state(
                state.metrics.clone(),
                middleware::track_errors,
            ))
            .layer(
                ServiceBuilder::new()
                    .layer(middleware::set_request_id())
                    .layer(middleware::trace_layer())
                    .layer(middleware::propagate_request_id())
                    .layer(middleware::compression_layer())
                    .layer(middleware::cors_policy(config.cors_permissive)),
            )
            .with_state(state)
    }
}
