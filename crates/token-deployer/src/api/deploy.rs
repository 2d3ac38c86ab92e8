use {
    crate::{api::AppState, deployment},
    axum::{
        extract::State,
        http::StatusCode,
        response::{IntoResponse, Json, Response},
    },
    serde::Serialize,
    std::sync::Arc,
};

#[derive(Serialize)]
struct Deployed {
    status: &'static str,
    contract_address: String,
}

pub async fn deploy_handler(State(state): State<Arc<AppState>>) -> Response {
    let deployer = state.deployer.clone();
    // Detached so a client disconnect can't abort a transaction in flight.
    let deployment = tokio::spawn(async move { deployer.deploy().await });
    match deployment.await {
        Ok(Ok(address)) => (
            StatusCode::OK,
            Json(Deployed {
                status: "deployed",
                contract_address: address.to_checksum(None),
            }),
        )
            .into_response(),
        Ok(Err(err)) => err.into_response(),
        Err(err) => {
            tracing::error!(?err, "deployment task failed");
            crate::api::internal_error_reply()
        }
    }
}

impl IntoResponse for deployment::Error {
    fn into_response(self) -> Response {
        match self {
            deployment::Error::Record(err) => err.into_response(),
            deployment::Error::Configuration(_) => {
                tracing::error!(err = %self, "deployment misconfigured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    crate::api::error("ConfigurationError", self.to_string()),
                )
                    .into_response()
            }
            deployment::Error::Chain(_) => {
                tracing::error!(err = %self, "deployment failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    crate::api::error("ChainError", self.to_string()),
                )
                    .into_response()
            }
        }
    }
}
