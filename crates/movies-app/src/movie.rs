use axum::{
    extract::{DefaultBodyLimit, FromRequestParts, Multipart, Query, RawPathParams, State},
    response::{IntoResponse, Redirect, Response},
    routing::{delete, get},
    Router,
};
use http::{header, request::Parts, StatusCode};
use movies_dal::{
    genre::{Genre, GenreRepository},
    movie::{MovieRepository, Relation},
    ListingParams, Order,
};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    error::{ApiError, ApiResult},
    form::{FieldErrors, MovieFields, MovieSubmission, POSTER_FIELD},
    poster::{poster_content_type, PosterError, UploadedPoster},
    repository_from_request,
    state::AppState,
    toast::Toasts,
    view::{MovieFormView, MovieListView, View, MOVIE_DETAILS_VIEW, MOVIE_LIST_VIEW},
};

/// Where the movie router is nested, target of redirects after successful changes
pub const MOVIES_PATH: &str = "/movies";

const MOVIE_CREATED: &str = "Movie created successfully";
const MOVIE_UPDATED: &str = "Movie Updated successfully";

repository_from_request!(MovieRepository);

#[derive(Debug, Deserialize)]
struct IdQuery {
    id: Option<String>,
}

/// Movie id as requested in path (`/{id}`) or query (`?id=`), if any
#[derive(Debug, Clone, Copy)]
pub struct RequestedId(pub Option<i64>);

impl<S> FromRequestParts<S> for RequestedId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let from_path = RawPathParams::from_request_parts(parts, state)
            .await
            .ok()
            .and_then(|params| {
                params
                    .iter()
                    .find(|(key, _)| *key == "id")
                    .map(|(_, value)| value.to_string())
            });
        let raw = match from_path {
            Some(value) => Some(value),
            None => Query::<IdQuery>::try_from_uri(&parts.uri)
                .ok()
                .and_then(|Query(query)| query.id),
        };

        match raw.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            Some(value) => value
                .parse::<i64>()
                .map(|id| RequestedId(Some(id)))
                .map_err(|_| ApiError::BadRequest(format!("Invalid movie id {value}"))),
            None => Ok(RequestedId(None)),
        }
    }
}

/// Required movie id, missing id is bad request
#[derive(Debug, Clone, Copy)]
pub struct MovieId(pub i64);

impl<S> FromRequestParts<S> for MovieId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequestedId(id) = RequestedId::from_request_parts(parts, state).await?;
        id.map(MovieId)
            .ok_or_else(|| ApiError::BadRequest("Missing movie id".to_string()))
    }
}

async fn check_genre(
    genres: &GenreRepository,
    fields: &MovieFields,
    errors: &mut FieldErrors,
) -> ApiResult<()> {
    if !errors.contains("genre_id") && !genres.exists(fields.genre_id).await? {
        errors.add("genre_id", "Selected genre does not exist");
    }
    Ok(())
}

async fn invalid_form(
    genres: &GenreRepository,
    fields: MovieFields,
    poster: Option<Vec<u8>>,
    errors: FieldErrors,
) -> ApiResult<Response> {
    debug!("Invalid movie form: {errors:?}");
    let genres: Vec<Genre> = genres.list_all().await?;
    Ok(MovieFormView::invalid(fields, poster, genres, errors)
        .render()
        .into_response())
}

pub async fn list(repository: MovieRepository, toasts: Toasts) -> ApiResult<impl IntoResponse> {
    let params = ListingParams::default().with_order(vec![
        Order::Desc("rate".to_string()),
        Order::Asc("id".to_string()),
    ]);
    let movies = repository.list(params).await?;
    let model = MovieListView {
        movies,
        toasts: toasts.take(),
    };
    Ok(View::new(MOVIE_LIST_VIEW, model))
}

pub async fn prepare_create(genres: GenreRepository) -> ApiResult<impl IntoResponse> {
    let genres = genres.list_all().await?;
    Ok(MovieFormView::new(genres).render())
}

pub async fn create(
    State(state): State<AppState>,
    repository: MovieRepository,
    genres: GenreRepository,
    toasts: Toasts,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let MovieSubmission {
        fields,
        poster,
        mut errors,
    } = MovieSubmission::from_multipart(&mut multipart, state.poster_policy()).await?;

    check_genre(&genres, &fields, &mut errors).await?;
    if !errors.is_empty() {
        return invalid_form(&genres, fields, None, errors).await;
    }

    let poster = match poster
        .ok_or(PosterError::Missing)
        .and_then(UploadedPoster::into_bytes)
    {
        Ok(poster) => poster,
        Err(e) => {
            errors.add(POSTER_FIELD, e.to_string());
            return invalid_form(&genres, fields, None, errors).await;
        }
    };

    let movie = repository.create(fields.into_create(poster)).await?;
    info!("Created movie {} ({})", movie.id, movie.name);
    toasts.success(MOVIE_CREATED);

    Ok(Redirect::to(MOVIES_PATH).into_response())
}

pub async fn prepare_edit(
    MovieId(id): MovieId,
    repository: MovieRepository,
    genres: GenreRepository,
) -> ApiResult<impl IntoResponse> {
    let movie = repository.get(id).await?;
    let genres = genres.list_all().await?;
    Ok(MovieFormView::from_movie(&movie, genres).render())
}

/// Update from submitted form, id is taken from path or query, else from `id` form field.
///
/// New poster is validated before it replaces anything, a rejected poster is never
/// redisplayed - form shows poster currently stored.
pub async fn update(
    RequestedId(requested_id): RequestedId,
    State(state): State<AppState>,
    repository: MovieRepository,
    genres: GenreRepository,
    toasts: Toasts,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let MovieSubmission {
        mut fields,
        poster,
        mut errors,
    } = MovieSubmission::from_multipart(&mut multipart, state.poster_policy()).await?;

    let id = requested_id
        .or(fields.id)
        .ok_or_else(|| ApiError::BadRequest("Missing movie id".to_string()))?;
    fields.id = Some(id);

    check_genre(&genres, &fields, &mut errors).await?;
    if !errors.is_empty() {
        return invalid_form(&genres, fields, None, errors).await;
    }

    let current = repository.get(id).await?;

    let new_poster = match poster.map(UploadedPoster::into_bytes).transpose() {
        Ok(new_poster) => new_poster,
        Err(e) => {
            errors.add(POSTER_FIELD, e.to_string());
            return invalid_form(&genres, fields, Some(current.poster), errors).await;
        }
    };

    let movie = repository.update(id, fields.into_update(new_poster)).await?;
    info!("Updated movie {} ({})", movie.id, movie.name);
    toasts.success(MOVIE_UPDATED);

    Ok(Redirect::to(MOVIES_PATH).into_response())
}

pub async fn details(
    MovieId(id): MovieId,
    repository: MovieRepository,
) -> ApiResult<impl IntoResponse> {
    let movie = repository.get_with(id, &[Relation::Genre]).await?;
    Ok(View::new(MOVIE_DETAILS_VIEW, movie))
}

pub async fn delete_movie(
    MovieId(id): MovieId,
    repository: MovieRepository,
) -> ApiResult<impl IntoResponse> {
    repository.delete(id).await?;
    info!("Deleted movie {id}");
    Ok(StatusCode::OK)
}

pub async fn poster(
    MovieId(id): MovieId,
    repository: MovieRepository,
) -> ApiResult<impl IntoResponse> {
    let data = repository.poster(id).await?;
    let content_type = poster_content_type(&data);
    Ok(([(header::CONTENT_TYPE, content_type)], data))
}

/// Builds movie router - must be nested on [`MOVIES_PATH`]
pub fn router(limit_mb: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/create", get(prepare_create).post(create))
        .route("/edit", get(prepare_edit).post(update))
        .route("/edit/{id}", get(prepare_edit).post(update))
        .route("/details", get(details))
        .route("/details/{id}", get(details))
        .route("/delete", get(delete_movie).post(delete_movie))
        .route("/delete/{id}", get(delete_movie).post(delete_movie))
        .route("/poster/{id}", get(poster))
        .route("/{id}", delete(delete_movie))
        .layer(DefaultBodyLimit::max(1024 * 1024 * limit_mb))
}
