use {
    crate::{deployment::Deployer, record},
    axum::{
        Router,
        http::StatusCode,
        response::{IntoResponse, Json, Response},
        routing::get,
    },
    serde::Serialize,
    std::{borrow::Cow, path::PathBuf, sync::Arc},
    tower_http::{cors::CorsLayer, trace::TraceLayer},
};

mod deploy;
mod get_deployed;
mod index;

/// State shared across all API handlers.
pub struct AppState {
    pub deployer: Arc<Deployer>,
    pub records: Arc<record::Store>,
    pub static_dir: PathBuf,
}

pub fn handle_all_routes(state: AppState) -> Router {
    let index = index::index_service(&state.static_dir);

    let router = Router::new()
        .route("/deploy", get(deploy::deploy_handler))
        .route("/deployed", get(get_deployed::get_deployed_handler))
        .route_service("/", index)
        .with_state(Arc::new(state))
        .merge(observe::metrics::handle_metrics());

    finalize_router(router)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Error {
    pub error_type: Cow<'static, str>,
    pub description: Cow<'static, str>,
}

pub fn error(error_type: &'static str, description: impl AsRef<str>) -> Json<Error> {
    Json(Error {
        error_type: error_type.into(),
        description: Cow::Owned(description.as_ref().to_owned()),
    })
}

pub fn internal_error_reply() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        error("InternalServerError", ""),
    )
        .into_response()
}

impl IntoResponse for record::Error {
    fn into_response(self) -> Response {
        tracing::error!(err = %self, "deployment record unavailable");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            error("FileError", self.to_string()),
        )
            .into_response()
    }
}

/// Sets up cors and request tracing for all routes.
fn finalize_router(router: Router) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods(vec![
            axum::http::Method::GET,
            axum::http::Method::OPTIONS,
            axum::http::Method::HEAD,
        ])
        .allow_headers(vec![axum::http::header::ORIGIN, axum::http::header::CONTENT_TYPE]);

    let trace_layer = TraceLayer::new_for_http().make_span_with(observe::request_span::make_span);

    router.layer(cors).layer(trace_layer)
}

#[cfg(test)]
pub async fn response_body(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}
