use crate::{error::ApiResult, repository_from_request, state::AppState};
use axum::{extract::Path, response::IntoResponse, routing::get, Json};
use http::StatusCode;
use movies_dal::genre::GenreRepository;

repository_from_request!(GenreRepository);

pub async fn list_genres(repository: GenreRepository) -> ApiResult<impl IntoResponse> {
    let genres = repository.list_all().await?;
    Ok((StatusCode::OK, Json(genres)))
}

pub async fn get_genre(
    Path(id): Path<i64>,
    repository: GenreRepository,
) -> ApiResult<impl IntoResponse> {
    let genre = repository.get(id).await?;
    Ok((StatusCode::OK, Json(genre)))
}

/// Read only API over genre reference data
pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(list_genres))
        .route("/{id}", get(get_genre))
}
